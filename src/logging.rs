use std::path::PathBuf;

use eyre::{Result, WrapErr};
use log::{LevelFilter, info};

/// Map a level name to a filter. `verbose` is `trace` and `none` disables logging.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_lowercase().as_str() {
        "verbose" | "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "none" | "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytsub")
        .join("logs")
}

/// Append log output to `<data dir>/ytsub/logs/ytsub.log`.
///
/// `RUST_LOG` overrides `level`. Meant for the embedding application's
/// startup; the library itself only emits through the `log` facade.
pub fn setup_logging(level: LevelFilter) -> Result<PathBuf> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).wrap_err_with(|| format!("creating {}", log_dir.display()))?;
    let log_file = log_dir.join("ytsub.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(target))
        .try_init()
        .wrap_err("logger already initialized")?;

    info!("Logging initialized: {}", log_file.display());
    Ok(log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_names() {
        assert_eq!(parse_level("verbose"), Some(LevelFilter::Trace));
        assert_eq!(parse_level("DEBUG"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" info "), Some(LevelFilter::Info));
        assert_eq!(parse_level("warn"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("error"), Some(LevelFilter::Error));
        assert_eq!(parse_level("none"), Some(LevelFilter::Off));
    }

    #[test]
    fn test_parse_level_unknown() {
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_log_dir_layout() {
        let dir = log_dir();
        assert!(dir.ends_with("ytsub/logs"));
    }
}
