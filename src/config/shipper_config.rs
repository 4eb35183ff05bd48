use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::expand_in_place;
use crate::constants::{DEFAULT_CONFIG_NAME, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::transfer::{MissingDatePolicy, TransferOptions};

/// Which namespace the files are read from
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local filesystem, rooted at `source.root`
    #[default]
    Local,
    /// HDFS over the WebHDFS REST API at `source.url`
    WebHdfs,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// WebHDFS base URL, e.g. `http://namenode:9870`
    pub url: Option<String>,
    /// Value for the `user.name` query parameter
    pub user: Option<String>,
    /// Root directory for the local namespace
    pub root: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DestinationConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TransferSettings {
    pub temp_dir: Option<String>,
    pub compress: bool,
    pub date_naming: bool,
    pub missing_date: MissingDatePolicy,
    pub request_timeout_secs: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        TransferSettings {
            temp_dir: None,
            compress: true,
            date_naming: false,
            missing_date: MissingDatePolicy::Abort,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Settings for the `hdfs-shipper` binary, stored as YAML.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShipperConfig {
    pub version: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default)]
    pub transfer: TransferSettings,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        ShipperConfig {
            version: "1.0".to_string(),
            source: SourceConfig::default(),
            destination: DestinationConfig::default(),
            transfer: TransferSettings::default(),
        }
    }
}

impl ShipperConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: ShipperConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Expand `$VAR` and `${VAR}` in every string setting
    pub fn process_environment_variables(&mut self) {
        expand_in_place(&mut self.source.url);
        expand_in_place(&mut self.source.user);
        expand_in_place(&mut self.source.root);
        expand_in_place(&mut self.destination.bucket);
        expand_in_place(&mut self.destination.region);
        expand_in_place(&mut self.destination.profile);
        expand_in_place(&mut self.destination.endpoint);
        expand_in_place(&mut self.transfer.temp_dir);
    }

    /// Reject settings that cannot work before anything is contacted
    pub fn validate(&self) -> Result<()> {
        if self.source.kind == SourceKind::WebHdfs && self.source.url.is_none() {
            bail!("source.url is required when source.kind is webhdfs");
        }
        if self.transfer.request_timeout_secs == 0 {
            bail!("transfer.request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Create a default configuration YAML file
    pub fn create_default_config_file(path: &Path) -> Result<()> {
        ShipperConfig::default().save_to_yaml_file(path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer.request_timeout_secs)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.transfer.temp_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            temp_dir: self.temp_dir(),
            missing_date: self.transfer.missing_date,
        }
    }
}

/// Load the configuration the binary runs with.
///
/// An explicit path must exist. Without one, `hdfs-shipper.yaml` in the
/// working directory is used when present, otherwise the defaults. Environment
/// variables are expanded and the result is validated either way.
pub fn load_config(config_path: Option<&Path>) -> Result<ShipperConfig> {
    let mut config = match config_path {
        Some(path) => ShipperConfig::from_yaml_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_NAME);
            if default_path.exists() {
                info!("Using config file {}", default_path.display());
                ShipperConfig::from_yaml_file(default_path)?
            } else {
                info!("No config file found, using defaults");
                ShipperConfig::default()
            }
        }
    };

    config.process_environment_variables();
    config.validate()?;
    Ok(config)
}
