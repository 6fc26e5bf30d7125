//! Tracing/logging setup shared by the binaries.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Output format of the log lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human readable output, for local debugging.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("expected json or pretty, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Fallback directive when `RUST_LOG` is not set, e.g. `info`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LogConfig {
    /// `debug` switches to pretty output.
    pub fn new(level: impl Into<String>, debug: bool) -> Self {
        Self {
            level: level.into().to_ascii_lowercase(),
            format: if debug { LogFormat::Pretty } else { LogFormat::Json },
        }
    }

    /// `RUST_LOG` wins; otherwise the configured level; an unparsable level
    /// falls back to `info`.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: &LogConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_selects_pretty_output() {
        assert_eq!(LogConfig::new("DEBUG", true).format, LogFormat::Pretty);
        assert_eq!(LogConfig::new("info", false).format, LogFormat::Json);
        assert_eq!(LogConfig::new("WARN", false).level, "warn");
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = LogConfig::default();
        init(&config);
        init(&config);
    }
}
