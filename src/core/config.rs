use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// One external command in the processing pipeline.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineStep {
    pub name: String,
    /// Program and arguments, executed as-is.
    pub command: Vec<String>,
    #[serde(default = "default_step_timeout")]
    pub timeout_secs: u64,
}

fn default_step_timeout() -> u64 {
    600
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MonitorConfig {
    pub state_file: PathBuf,
    pub pending_dir: PathBuf,
    /// Public summary page polled for new reporting periods.
    pub summary_url: String,
    /// Where the pipeline leaves its processed record output.
    pub processed_output: PathBuf,
    #[serde(default = "default_check_interval")]
    pub check_interval_hours: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    #[serde(default)]
    pub pipeline: Vec<PipelineStep>,
}

fn default_check_interval() -> u64 {
    24
}

fn default_retention_days() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// The JSON record store.
    pub database_path: PathBuf,
    pub backup_dir: PathBuf,
    /// Where CSV exports land.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub monitor: Option<MonitorConfig>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("mx", "siset", "siset")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// The monitor section, required for monitor subcommands.
    pub fn monitor(&self) -> Result<&MonitorConfig> {
        self.monitor
            .as_ref()
            .context("Config has no `monitor` section")
    }
}

/// Email settings for approval notifications, read from the environment so
/// credentials stay out of the config file.
#[derive(Debug, Clone)]
pub struct EmailEnv {
    pub user: Option<String>,
    pub password: Option<String>,
    pub notify_address: Option<String>,
}

impl EmailEnv {
    pub fn from_env() -> Self {
        EmailEnv {
            user: std::env::var("SISET_EMAIL_USER").ok(),
            password: std::env::var("SISET_EMAIL_PASSWORD").ok(),
            notify_address: std::env::var("SISET_NOTIFY_EMAIL").ok(),
        }
    }

    /// True when user, password and recipient are all present.
    pub fn is_complete(&self) -> bool {
        self.user.is_some() && self.password.is_some() && self.notify_address.is_some()
    }
}
