use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Stdout logging, plus an append-mode file layer when a path is given.
pub fn init_logging(log_level: Level, log_file: Option<&str>) {
    let level_filter = LevelFilter::from_level(log_level);
    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    if let Some(path) = log_file {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file));
                tracing_subscriber::registry()
                    .with(stdout_layer.with_filter(level_filter))
                    .with(file_layer.with_filter(level_filter))
                    .init();
                return;
            }
            Err(e) => eprintln!("Failed to open log file {}: {}", path, e),
        }
    }

    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(level_filter))
        .init();
}
