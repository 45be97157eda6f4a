use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Console output style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn log_dir() -> PathBuf {
    std::env::var_os("REGISTRY_SCD2_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Initializes the logging system with both console and file output.
///
/// Console logs go to stderr so stdout stays free for the run summary. The
/// returned guard flushes the file writer when dropped; hold it for the life
/// of the process.
pub fn init_logging(format: LogFormat) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("registry_scd2=info"));

    let dir = log_dir();
    let appender = fs::create_dir_all(&dir)
        .map_err(|e| e.to_string())
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("registry_scd2")
                .filename_suffix("log")
                .build(&dir)
                .map_err(|e| e.to_string())
        });

    let (file_layer, guard, file_error) = match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    let (pretty_layer, json_layer) = match format {
        LogFormat::Pretty => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(pretty_layer)
        .with(json_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!(dir = %dir.display(), error = %e, "File logging disabled");
    }
    guard
}
