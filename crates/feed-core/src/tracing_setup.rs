use std::fs::OpenOptions;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber.
///
/// `FEED_LOG_FILE` sends DEBUG output to that file; otherwise INFO goes to stderr.
/// `RUST_LOG` overrides the default level either way.
pub fn init_tracing() {
    let registry = tracing_subscriber::registry();

    if let Ok(log_path) = std::env::var("FEED_LOG_FILE") {
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_filter(env_filter(LevelFilter::DEBUG));

                registry.with(file_layer).init();
                eprintln!("File logging enabled: {}", log_path);
                return;
            }
            Err(e) => eprintln!("Failed to open log file {}: {}", log_path, e),
        }
    }

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter(LevelFilter::INFO));
    registry.with(stderr_layer).init();
}

fn env_filter(default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy()
}
