use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "EXACTO_LOG";
pub const LOG_FILE: &str = "exacto.log";

/// Route `tracing` events to `dir/exacto.log`; the terminal belongs to the UI.
///
/// The filter is read from `EXACTO_LOG` and defaults to `warn`. Keep the
/// returned guard alive until exit or buffered lines are lost.
pub fn init(dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    // a subscriber installed earlier (tests) takes precedence
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_log_dir() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("state");

        let guard = init(&log_dir).unwrap();
        tracing::warn!("logging smoke test");
        drop(guard);

        assert!(log_dir.is_dir());
    }
}
