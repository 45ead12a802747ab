use std::{fs, path::Path, sync::OnceLock};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;
pub mod writer;

pub use formatter::*;
pub use writer::*;

use crate::configs::Config;

pub(crate) static GLOBAL_FILE_WRITER: OnceLock<CircularFileWriter> = OnceLock::new();

/// `println!` that also lands in the log file, for output emitted before or
/// outside the subscriber (banner, config path).
#[macro_export]
macro_rules! log_println {
    () => {{
        std::println!();
        $crate::common::logger::append_to_file_raw("\n");
    }};
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        std::println!("{}", msg);
        $crate::common::logger::append_to_file_raw(&format!("{}\n", msg));
    }};
}

pub fn append_to_file_raw(msg: &str) {
    if let Some(mut writer) = GLOBAL_FILE_WRITER.get().cloned() {
        use std::io::Write;
        let _ = writer.write_all(strip_ansi_escapes(msg).as_bytes());
    }
}

/// Builds the filter directive: config level, then our quieting of noisy
/// dependencies, then user filters (which win on conflict).
pub fn filter_directive(config: &Config) -> String {
    let logging = config.logging.as_ref();
    let level = logging.and_then(|l| l.level.as_deref()).unwrap_or("info");
    let filters = logging.and_then(|l| l.filters.as_deref()).unwrap_or("");

    let base = format!("{},hyper=warn,reqwest=warn,symphonia=warn", level);
    if filters.is_empty() {
        base
    } else {
        format!("{},{}", base, filters)
    }
}

pub fn init(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let stdout_layer = fmt::layer()
        .event_format(CustomFormatter::new(true))
        .with_ansi(true);

    let file_layer = config
        .logging
        .as_ref()
        .and_then(|logging| logging.file.as_ref())
        .map(|file_config| {
            if let Some(parent) = Path::new(&file_config.path).parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!("Failed to create log directory: {}", e);
                }
            }

            let writer = CircularFileWriter::new(file_config.path.clone(), file_config.max_lines);
            let _ = GLOBAL_FILE_WRITER.set(writer.clone());
            fmt::layer()
                .with_writer(writer)
                .event_format(CustomFormatter::new(false))
                .with_ansi(false)
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::LoggingConfig;

    #[test]
    fn directive_defaults_to_info() {
        let config = Config::default();
        assert_eq!(filter_directive(&config), "info,hyper=warn,reqwest=warn,symphonia=warn");
    }

    #[test]
    fn directive_appends_user_filters() {
        let config = Config {
            logging: Some(LoggingConfig {
                level: Some("debug".into()),
                filters: Some("skywave::relay=trace".into()),
                file: None,
            }),
            ..Config::default()
        };
        let directive = filter_directive(&config);
        assert!(directive.starts_with("debug,"));
        assert!(directive.ends_with(",skywave::relay=trace"));
    }
}
