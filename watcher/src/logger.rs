use slog::{o, Drain, Level, Logger};
use sloggers::{null::NullLoggerBuilder, Build};

/// Builds the `slog` asynchronous logger.
///
/// Logs are written to stdout by a dedicated thread, in the terminal format unless `log_format`
/// is `JSON`.
pub fn async_logger(debug_level: &str, log_format: Option<&str>) -> Result<Logger, String> {
    let drain = if let Some(format) = log_format {
        match format.to_uppercase().as_str() {
            "JSON" => {
                let drain = slog_json::Json::default(std::io::stdout()).fuse();
                slog_async::Async::new(drain).build()
            }
            _ => return Err("Logging format provided is not supported".to_string()),
        }
    } else {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        slog_async::Async::new(drain).build()
    };

    let drain = match debug_level {
        "info" => drain.filter_level(Level::Info),
        "debug" => drain.filter_level(Level::Debug),
        "trace" => drain.filter_level(Level::Trace),
        "warn" => drain.filter_level(Level::Warning),
        "error" => drain.filter_level(Level::Error),
        "crit" => drain.filter_level(Level::Critical),
        unknown => return Err(format!("Unknown debug-level: {}", unknown)),
    };

    Ok(Logger::root(drain.fuse(), o!()))
}

pub fn null_logger() -> Result<Logger, String> {
    let log_builder = NullLoggerBuilder;
    log_builder
        .build()
        .map_err(|e| format!("Failed to start null logger: {:?}", e))
}
