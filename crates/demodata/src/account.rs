//! Runtime account settings read from `.acct` files and the account's
//! `parmfile`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::InstallError;

/// Default location of `{account}.acct` files.
pub const ACCOUNTS_DIR: &str = "/cfmc/cfg/accounts";

const REQUIRED: [&str; 3] = ["cfmcpath", "cfmcgo", "control"];

/// Merged settings of one runtime account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSettings {
    account: String,
    settings: BTreeMap<String, String>,
}

impl AccountSettings {
    /// Loads `account` from [`ACCOUNTS_DIR`].
    pub fn load(account: &str) -> Result<Self, InstallError> {
        Self::load_from(Path::new(ACCOUNTS_DIR), account)
    }

    /// Loads `{accounts_dir}/{account}.acct` and the parmfile it points at.
    /// Account entries override parmfile entries.
    pub fn load_from(accounts_dir: &Path, account: &str) -> Result<Self, InstallError> {
        let path = accounts_dir.join(format!("{account}.acct"));
        let text = std::fs::read_to_string(&path).map_err(|e| InstallError::io(&path, e))?;
        let account_settings = parse_account(&text);

        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|key| !account_settings.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(InstallError::Account {
                account: account.to_string(),
                reason: format!(
                    "Account file \"{account}\" missing required parameter(s): {}",
                    missing.join(", ")
                ),
            });
        }

        let mut settings = match account_settings.get("control") {
            Some(control) => read_parmfile(Path::new(control))?,
            None => BTreeMap::new(),
        };
        settings.extend(account_settings);

        Ok(Self {
            account: account.to_string(),
            settings,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }

    /// Runtime root (`cfmcpath`).
    pub fn runtime(&self) -> &Path {
        Path::new(self.settings.get("cfmcpath").map_or("", String::as_str))
    }

    /// Environment for runtime command-line tools.
    pub fn command_env(&self) -> Result<BTreeMap<String, String>, InstallError> {
        let mut env: BTreeMap<String, String> = self
            .settings
            .iter()
            .filter(|(key, _)| key.as_str() != "comment")
            .map(|(key, value)| (key.replace('~', ""), value.clone()))
            .collect();

        let cfmc = self.required("cfmcpath")?;
        let cfmccfg = self.required("cfmccfg")?;
        env.insert("CFMC".into(), with_trailing_slash(cfmc));
        env.insert("CFMCCFG".into(), with_trailing_slash(cfmccfg));
        Ok(env)
    }

    /// Builds a command for `script` run in `cwd` with [`command_env`]
    /// layered over the inherited environment.
    ///
    /// [`command_env`]: Self::command_env
    pub fn command(&self, script: &Path, cwd: &Path) -> Result<tokio::process::Command, InstallError> {
        let mut cmd = tokio::process::Command::new(script);
        cmd.current_dir(cwd).envs(self.command_env()?);
        Ok(cmd)
    }

    fn required(&self, key: &str) -> Result<&str, InstallError> {
        self.settings
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| InstallError::Account {
                account: self.account.clone(),
                reason: format!("missing setting {key}"),
            })
    }
}

fn parse_account(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Reads `{control}/parmfile`. Text from the first `'` or `#` is dropped,
/// keys are lower-cased.
pub fn read_parmfile(control: &Path) -> Result<BTreeMap<String, String>, InstallError> {
    let path: PathBuf = control.join("parmfile");
    let text = std::fs::read_to_string(&path).map_err(|e| InstallError::io(&path, e))?;
    Ok(parse_parmfile(&text))
}

fn parse_parmfile(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(|line| match line.find(['\'', '#']) {
            Some(idx) => &line[..idx],
            None => line,
        })
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once([':', '=']))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
        .collect()
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}
