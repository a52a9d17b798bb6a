//! Installer configuration.
//!
//! Stored as TOML:
//!
//! ```toml
//! data_dir = "/opt/survox/demodata"
//! account = "survox"
//!
//! [api]
//! host = "localhost"
//! api_key = "..."
//!
//! [install]
//! clients = ["survoxhealth"]
//! surveys = ["ph_waittime"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use survox_api::ClientConfig;

use crate::error::InstallError;

/// Installer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallerConfig {
    /// Root holding the `config/` and `data/` trees.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Runtime account the demo data belongs to.
    #[serde(default = "default_account")]
    pub account: String,

    /// Connection settings for the Survox API.
    #[serde(default = "default_api")]
    pub api: ClientConfig,

    /// What to install. Defaults to the operations manager demo set.
    #[serde(default = "InstallPlan::ops_manager")]
    pub install: InstallPlan,
}

fn default_api() -> ClientConfig {
    ClientConfig {
        host: "localhost".into(),
        verbose: true,
        ..Default::default()
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_account() -> String {
    "survox".into()
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            account: default_account(),
            api: default_api(),
            install: InstallPlan::ops_manager(),
        }
    }
}

impl InstallerConfig {
    /// Loads configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, InstallError> {
        let content = std::fs::read_to_string(path).map_err(|e| InstallError::io(path, e))?;
        toml::from_str(&content).map_err(|source| InstallError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Names of the config files to install, per step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPlan {
    #[serde(default)]
    pub clients: Vec<String>,
    #[serde(default)]
    pub dncs: Vec<String>,
    #[serde(default)]
    pub sample_setup_rules: Vec<String>,
    #[serde(default)]
    pub sample_calling_rules: Vec<String>,
    #[serde(default)]
    pub surveys: Vec<String>,
    /// Drop existing sample before reinstalling a survey.
    #[serde(default = "default_delete_sample")]
    pub delete_sample: bool,
}

fn default_delete_sample() -> bool {
    true
}

impl InstallPlan {
    /// The demo set shipped for the operations manager.
    pub fn ops_manager() -> Self {
        Self {
            clients: vec!["survoxhealth".into()],
            dncs: vec!["global".into()],
            sample_setup_rules: vec!["my_default_us".into()],
            sample_calling_rules: vec!["my_basic".into()],
            surveys: vec!["ph_waittime".into(), "rr_customer_care".into()],
            delete_sample: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
            && self.dncs.is_empty()
            && self.sample_setup_rules.is_empty()
            && self.sample_calling_rules.is_empty()
            && self.surveys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: InstallerConfig = toml::from_str("").unwrap();
        assert_eq!(config, InstallerConfig::default());
        assert_eq!(config.api.host, "localhost");
        assert_eq!(config.install.surveys, ["ph_waittime", "rr_customer_care"]);
    }

    #[test]
    fn partial_install_section() {
        let config: InstallerConfig = toml::from_str(
            r#"
            account = "demo"

            [api]
            host = "https://survox.example.com"
            api_key = "secret"

            [install]
            clients = ["acme"]
            "#,
        )
        .unwrap();
        assert_eq!(config.account, "demo");
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert!(config.api.verbose);
        assert_eq!(config.install.clients, ["acme"]);
        assert!(config.install.surveys.is_empty());
        assert!(config.install.delete_sample);
    }

    #[test]
    fn roundtrip_toml() {
        let config = InstallerConfig {
            data_dir: "/srv/demo".into(),
            ..InstallerConfig::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: InstallerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn load_reports_path_on_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demodata.toml");
        std::fs::write(&path, "data_dir = [").unwrap();
        let err = InstallerConfig::load(&path).unwrap_err();
        assert!(matches!(err, InstallError::Toml { .. }));
        assert!(err.to_string().contains("demodata.toml"));
    }

    #[test]
    fn ops_manager_plan_is_not_empty() {
        assert!(!InstallPlan::ops_manager().is_empty());
        assert!(InstallPlan::default().is_empty());
    }
}
