//! Configuration loading and management.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use mlog_core::RecorderConfig;
use serde::{Deserialize, Serialize};

/// Prints the focused window's class, then its title. X11 only.
pub const DEFAULT_SENSOR_COMMAND: &str = r#"id=$(xdotool getactivewindow) && xprop -id "$id" WM_CLASS | sed -e 's/.*"\(.*\)"$/\1/' && xdotool getwindowname "$id""#;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Seconds between samples.
    pub sample_interval_secs: u64,

    /// Samples per bucket before it is written.
    pub samples_per_bucket: u32,

    /// Default report threshold in minutes.
    pub threshold_minutes: u64,

    /// Address for `mlog serve`.
    pub listen_addr: SocketAddr,

    /// Shell command printing the focused application, then the window label.
    pub sensor_command: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let recorder = RecorderConfig::default();
        Self {
            database_path: data_dir.join("mlog.db"),
            sample_interval_secs: recorder.interval_secs,
            samples_per_bucket: recorder.samples_per_bucket,
            threshold_minutes: 5,
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 5000)),
            sensor_command: DEFAULT_SENSOR_COMMAND.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `~/.config/mlog/config.toml`, the given
    /// file, then `MLOG_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("MLOG_"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would stall or busy-loop the recorder.
    #[expect(
        clippy::result_large_err,
        reason = "reported through the same error as extraction"
    )]
    fn validate(&self) -> Result<(), figment::Error> {
        if self.sample_interval_secs == 0 {
            return Err(figment::Error::from(
                "sample_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.samples_per_bucket == 0 {
            return Err(figment::Error::from(
                "samples_per_bucket must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn recorder(&self) -> RecorderConfig {
        RecorderConfig {
            interval_secs: self.sample_interval_secs,
            samples_per_bucket: self.samples_per_bucket,
        }
    }
}

/// Returns the platform-specific config directory for mlog.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mlog"))
}

/// Returns the platform-specific data directory for mlog.
///
/// On Linux: `~/.local/share/mlog`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("mlog"))
}
