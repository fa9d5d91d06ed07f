use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing::{info, warn};

use docgroup::{
    render_text, structure_document, to_element_stream, PageInput, StructuredPage,
    StructuringRules,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Group by unit / question type / question number anchors
    Worksheet,
    /// No anchors, plain top-to-bottom reading order
    ReadingOrder,
}

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Structure layout detections of scanned pages into ordered question groups.",
    arg_required_else_help = true
)]
pub struct Args {
    /// Path to a JSON page (or an array of pages) of detections
    pub input: PathBuf,

    /// Optional JSON rules file. Overrides --mode.
    #[clap(short, long)]
    pub rules: Option<PathBuf>,

    /// Built-in rule set to use when no rules file is given
    #[clap(long, value_enum, default_value_t = Mode::Worksheet)]
    pub mode: Mode,

    /// Optional output file path. If omitted, writes to stdout.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty print JSON output.
    #[clap(short, long)]
    pub pretty: bool,

    /// Write tagged plain text instead of JSON
    #[clap(long)]
    pub text: bool,

    /// Enable debug logging of the engine stages
    #[clap(short, long)]
    pub verbose: bool,

    /// Directory for log files
    #[clap(long)]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageSet {
    One(PageInput),
    Many(Vec<PageInput>),
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn load_rules(args: &Args) -> Result<StructuringRules> {
    match &args.rules {
        Some(path) => {
            let path = expand(path);
            StructuringRules::load(&path)
                .with_context(|| format!("loading rules from {}", path.display()))
        }
        None => Ok(match args.mode {
            Mode::Worksheet => StructuringRules::worksheet(),
            Mode::ReadingOrder => StructuringRules::reading_order(),
        }),
    }
}

fn render(pages: &[StructuredPage], single: bool, args: &Args) -> Result<String> {
    if args.text {
        let mut out = String::new();
        for page in pages {
            if !single {
                out.push_str(&format!("=== page {} ===\n", page.page_number));
            }
            out.push_str(&render_text(&to_element_stream(page)));
        }
        return Ok(out);
    }

    let json = match (single, args.pretty) {
        (true, true) => serde_json::to_string_pretty(&pages[0])?,
        (true, false) => serde_json::to_string(&pages[0])?,
        (false, true) => serde_json::to_string_pretty(pages)?,
        (false, false) => serde_json::to_string(pages)?,
    };
    Ok(json)
}

fn main() -> Result<()> {
    let args = Args::parse_args();

    // Keep the guard alive until output is written
    let _guard = match &args.log_dir {
        Some(dir) => docgroup::logging::init_logging_with_dir(args.verbose, &expand(dir))
            .context("creating log directory")?,
        None => docgroup::logging::init_logging(args.verbose),
    };

    let rules = load_rules(&args)?;

    let input_path = expand(&args.input);
    let input = fs::read_to_string(&input_path)
        .with_context(|| format!("reading {}", input_path.display()))?;
    let (pages, single) = match serde_json::from_str::<PageSet>(&input)
        .with_context(|| format!("parsing {}", input_path.display()))?
    {
        PageSet::One(page) => (vec![page], true),
        PageSet::Many(pages) => (pages, false),
    };

    let structured = structure_document(&pages, &rules);
    for page in &structured {
        for anomaly in &page.anomalies {
            warn!(page = page.page_number, ?anomaly, "anomaly");
        }
    }
    info!(pages = structured.len(), "structured document");

    if structured.is_empty() {
        return Ok(());
    }
    let output = render(&structured, single, &args)?;

    match &args.output {
        Some(path) => {
            let path = expand(path);
            fs::write(&path, output).with_context(|| format!("writing {}", path.display()))?;
            info!("Output written to: {:?}", path);
        }
        None => println!("{}", output),
    }
    Ok(())
}
