use crate::config::LoggingConfig;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging, plus a daily-rotated JSON file when `config.dir` is set.
///
/// The returned guard flushes the file writer on drop; keep it alive for the process lifetime.
pub fn init_logging(config: &LoggingConfig, debug: bool) -> Option<WorkerGuard> {
    let filter = env_filter(std::env::var("RUST_LOG").ok().as_deref(), debug);

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            let _ = fs::create_dir_all(dir);
            let file_appender = tracing_appender::rolling::daily(dir, "relay.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    let (json_console, plain_console) = if config.json {
        (Some(fmt::layer().json().with_writer(std::io::stdout)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stdout)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(json_console)
        .with(plain_console)
        .init();

    guard
}

/// `RUST_LOG` when set, else this crate at `info`. Debug mode always enables
/// this crate's `debug` events on top of whatever `RUST_LOG` says.
fn env_filter(rust_log: Option<&str>, debug: bool) -> EnvFilter {
    let mut filter = rust_log
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("{}=info", CRATE_TARGET)));
    if debug {
        if let Ok(directive) = format!("{}=debug", CRATE_TARGET).parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

const CRATE_TARGET: &str = "http_transport_firehose";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_survives_an_explicit_rust_log() {
        let filter = env_filter(Some("info"), true).to_string();
        assert!(filter.contains("http_transport_firehose=debug"), "{}", filter);
    }

    #[test]
    fn defaults_to_crate_info_without_rust_log() {
        assert_eq!(env_filter(None, false).to_string(), "http_transport_firehose=info");
        assert!(!env_filter(Some("warn"), false).to_string().contains("debug"));
    }
}
