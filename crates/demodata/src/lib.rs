//! Demo-data installer for the Survox API.
//!
//! Reads client, DNC, template, and survey configs from a data directory
//! and installs them through [`survox_api::Client`].

pub mod account;
pub mod config;
pub mod error;
pub mod installer;
pub mod quota;

pub use account::AccountSettings;
pub use config::{InstallPlan, InstallerConfig};
pub use error::InstallError;
pub use installer::{DataDir, Installer};
pub use quota::{QuotaDef, from_aqu, parse_aqu};
