use std::path::Path;
use std::sync::Once;

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::{Directive, EnvFilter},
    fmt::format::FmtSpan,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer,
};

// Log targets, one per engine stage
pub const PATTERN_MATCH: &str = "docgroup_pattern";
pub const COLUMN_DETECTION: &str = "docgroup_columns";
pub const GROUPING: &str = "docgroup_layout";
pub const SEQUENCE_CHECK: &str = "docgroup_sequence";
pub const SPATIAL_ASSIGNMENT: &str = "docgroup_spatial";
pub const PIPELINE: &str = "docgroup_pipeline";

const ENGINE_TARGETS: &[&str] = &[
    PATTERN_MATCH,
    COLUMN_DETECTION,
    GROUPING,
    SEQUENCE_CHECK,
    SPATIAL_ASSIGNMENT,
    PIPELINE,
];

static INIT: Once = Once::new();

/// `RUST_LOG` if set, otherwise `info`. Verbose mode raises every engine
/// target to `debug` on top of that.
fn engine_filter(verbose: bool) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if !verbose {
        return base;
    }
    ENGINE_TARGETS
        .iter()
        .filter_map(|target| format!("{target}=debug").parse::<Directive>().ok())
        .fold(base, |filter, directive| filter.add_directive(directive))
}

/// Log to stderr through a non-blocking writer. Keep the returned guard alive
/// for as long as logs should be flushed.
pub fn init_logging(verbose: bool) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(writer)
                    .with_filter(engine_filter(verbose)),
            )
            .try_init();
    });

    guard
}

/// Log to stderr and additionally to `docgroup.log` in `log_dir`, with span
/// timings in the file.
pub fn init_logging_with_dir(verbose: bool, log_dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, "docgroup.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    INIT.call_once(|| {
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(non_blocking_appender)
            .with_filter(engine_filter(verbose));

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(engine_filter(false));

        let _ = tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .try_init();
    });

    Ok(guard)
}
