//! Logging initialization

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize logging based on debug flag
///
/// Without `--debug`, warnings go to stderr (`RUST_LOG` overrides the level).
/// With it, everything down to debug is written to a temp file whose path is
/// returned so it can be shown to the user.
pub fn init_logging(debug: bool) -> Option<PathBuf> {
    if debug {
        // Named temp file that outlives this process
        let temp_file = tempfile::Builder::new()
            .prefix("kubediscovery-")
            .suffix(".log")
            .tempfile()
            .map(|f| {
                let path = f.path().to_path_buf();
                std::mem::forget(f);
                path
            })
            .unwrap_or_else(|_| {
                std::env::temp_dir().join(format!("kubediscovery-{}.log", std::process::id()))
            });

        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&temp_file);

        match file {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_writer(file)
                    .with_env_filter(
                        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
                    )
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .init();
                return Some(temp_file);
            }
            Err(e) => {
                eprintln!(
                    "Failed to open log file {}: {}, logging to stderr",
                    temp_file.display(),
                    e
                );
                init_stderr("debug");
                return None;
            }
        }
    }

    init_stderr("warn");
    None
}

fn init_stderr(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}
