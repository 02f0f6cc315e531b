use clap::Parser;
use std::path::PathBuf;

/// Default location of the pipeline configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "configurations/params.toml";

/// File name of the persistent run log.
pub const LOG_FILE_NAME: &str = "monetization_monitor.log";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Forecast revenue and recommend a pricing strategy
#[derive(Parser, Debug, Clone)]
#[command(
    name = "monetization-monitor",
    about = "Forecast revenue and recommend a pricing strategy",
    version
)]
pub struct Settings {
    /// Pipeline configuration file (TOML)
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_PATH, env = "MONETIZATION_MONITOR_CONFIG")]
    pub config: PathBuf,

    /// Override the revenue threshold from the configuration file
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Re-run the pipeline every N seconds instead of once
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: Option<u64>,

    /// Directory receiving one JSON report per run
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Write the trained model weights to this file
    #[arg(long)]
    pub model_out: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and resolve defaults.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`load`](Self::load) but from an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    /// Fill in the log file default and apply the `--debug` flag.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.log_file.is_none() {
            settings.log_file = Some(default_log_file());
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }
}

/// `~/.monetization-monitor/`, or `./.monetization-monitor/` without a home.
pub fn monitor_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".monetization-monitor")
}

/// `~/.monetization-monitor/logs/monetization_monitor.log`.
pub fn default_log_file() -> PathBuf {
    monitor_home().join("logs").join(LOG_FILE_NAME)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
