//! Installs demo clients, DNC lists, sample templates, and surveys.
//!
//! Each step reads JSON config files from the data directory and drives
//! the API with `exists_okay` set, so re-running an install converges
//! instead of failing. Steps run in order and stop at the first error.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use survox_api::{Client, DncType, QuotaValues};
use tracing::{debug, info, warn};

use crate::account::AccountSettings;
use crate::config::InstallPlan;
use crate::error::InstallError;
use crate::quota::from_aqu;

/// Quota every demo survey tracks completes in.
pub const COMPLETE_QUOTA: &str = "survox_complete";

/// Script run from a survey's runtime directory after its files are copied.
pub const CONFIGURE_SCRIPT: &str = "configure_survey.sh";

// ---------------------------------------------------------------------------
// Data directory layout
// ---------------------------------------------------------------------------

/// `{root}/config/{kind}/{name}.json` and `{root}/data/...`.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Config file `name` of `kind`; `.json` is appended when missing.
    pub fn config_file(&self, kind: &str, name: &str) -> PathBuf {
        let file = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{name}.json")
        };
        self.root.join("config").join(kind).join(file)
    }

    pub fn data_file(&self, file: &str) -> PathBuf {
        self.root.join("data").join(file)
    }

    pub fn survey_dir(&self, client: &str, surveycode: &str) -> PathBuf {
        self.root.join("data").join("surveys").join(client).join(surveycode)
    }

    pub fn survey_file(&self, client: &str, surveycode: &str, file: &str) -> PathBuf {
        self.survey_dir(client, surveycode).join(file)
    }

    pub fn read_config<T: DeserializeOwned>(&self, kind: &str, name: &str) -> Result<T, InstallError> {
        read_json(&self.config_file(kind, name))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, InstallError> {
    info!(file = %path.display(), "reading config");
    let text = std::fs::read_to_string(path).map_err(|e| InstallError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| InstallError::Json {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Config file shapes
// ---------------------------------------------------------------------------

/// `config/client/{name}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConf {
    pub client: String,
    pub name: String,
}

/// `config/dnc/{name}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DncConf {
    pub create_data: DncCreate,
    /// Relative to `data/`.
    pub dnc_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DncCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "dcn_type")]
    pub dnc_type: String,
    pub account: String,
}

/// `config/survey/{name}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConf {
    pub create_data: SurveyCreate,
    /// Sample config, relative to the survey data directory.
    pub survey_sample: String,
    /// `.aqu` quota file, relative to the survey data directory.
    pub quota_file: String,
    #[serde(default)]
    pub survox_complete_total: i64,
}

/// Body sent to create the survey. Unknown fields pass through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyCreate {
    pub surveycode: String,
    pub client: String,
    #[serde(default)]
    pub survox_complete_target: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Survey sample config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConf {
    /// CSV under the survey's `sample/` directory.
    pub sample_file: String,
    pub sample_map: Value,
    pub sample_setup_rules: Value,
    pub sample_calling_rules: Value,
}

// ---------------------------------------------------------------------------
// Installer
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Installer<'a> {
    client: &'a Client,
    data: DataDir,
    account: Option<AccountSettings>,
}

impl<'a> Installer<'a> {
    pub fn new(client: &'a Client, data: DataDir) -> Self {
        Self {
            client,
            data,
            account: None,
        }
    }

    /// Also copy survey files into this account's runtime tree.
    pub fn with_account(mut self, account: AccountSettings) -> Self {
        self.account = Some(account);
        self
    }

    pub fn data(&self) -> &DataDir {
        &self.data
    }

    /// Runs every step of `plan` in order.
    pub async fn run(&self, plan: &InstallPlan) -> Result<(), InstallError> {
        if plan.is_empty() {
            warn!("install plan is empty");
            return Ok(());
        }
        self.install_clients(&plan.clients).await?;
        self.install_dncs(&plan.dncs).await?;
        self.install_setup_rule_templates(&plan.sample_setup_rules)
            .await?;
        self.install_calling_rule_templates(&plan.sample_calling_rules)
            .await?;
        for survey in &plan.surveys {
            self.install_survey(survey, plan.delete_sample).await?;
        }
        Ok(())
    }

    pub async fn install_clients(&self, names: &[String]) -> Result<(), InstallError> {
        for name in names {
            info!(client = %name, "creating client");
            let conf: ClientConf = self.data.read_config("client", name)?;
            let result = self
                .client
                .clients()
                .create(&conf.client, &conf.name, true)
                .await?;
            debug!(client = %name, %result, "client installed");
        }
        Ok(())
    }

    pub async fn install_dncs(&self, names: &[String]) -> Result<(), InstallError> {
        for name in names {
            let conf: DncConf = self.data.read_config("dnc", name)?;
            let file = self.data.data_file(&conf.dnc_file);
            info!(dnc = %name, file = %file.display(), "installing DNC file");
            let data = &conf.create_data;
            let dnc_type: DncType = data.dnc_type.parse()?;
            let result = self
                .client
                .library()
                .dncs()
                .create(
                    &data.name,
                    &data.description,
                    dnc_type,
                    &data.account,
                    Some(&file),
                    true,
                )
                .await?;
            debug!(dnc = %name, %result, "DNC installed");
        }
        Ok(())
    }

    pub async fn install_setup_rule_templates(&self, names: &[String]) -> Result<(), InstallError> {
        for name in names {
            info!(template = %name, "creating sample setup rule template");
            let conf: Value = self.data.read_config("sample_setup_rules", name)?;
            let result = self
                .client
                .library()
                .sample_setup_rules()
                .create(conf, true)
                .await?;
            debug!(template = %name, %result, "setup rule template installed");
        }
        Ok(())
    }

    pub async fn install_calling_rule_templates(&self, names: &[String]) -> Result<(), InstallError> {
        for name in names {
            info!(template = %name, "creating sample calling rule template");
            let conf: Value = self.data.read_config("sample_calling_rules", name)?;
            let result = self
                .client
                .library()
                .sample_calling_rules()
                .create(conf, true)
                .await?;
            debug!(template = %name, %result, "calling rule template installed");
        }
        Ok(())
    }

    /// Installs the survey described by `config/survey/{name}.json`, then
    /// copies its files into the runtime when an account is attached.
    pub async fn install_survey(&self, name: &str, delete_sample: bool) -> Result<(), InstallError> {
        let conf: SurveyConf = self.data.read_config("survey", name)?;
        let create = &conf.create_data;
        let code = create.surveycode.as_str();
        let survey = self.client.survey(code)?;

        info!(survey = %code, "installing survey");
        let body = serde_json::to_value(create).map_err(|source| InstallError::Json {
            path: self.data.config_file("survey", name),
            source,
        })?;
        let result = self.client.surveys().create(body, true).await?;
        debug!(survey = %code, %result, "survey created");

        if delete_sample {
            survey.sample().await?.delete().await?;
        }
        let status = survey.status().await?;
        if has_sample(&status) {
            info!(survey = %code, "sample already exists");
        } else {
            self.install_survey_sample(&create.client, code, &conf.survey_sample)
                .await?;
        }

        self.install_survey_quotas(&create.client, code, &conf.quota_file)
            .await?;
        self.install_complete_quota(code, create.survox_complete_target, conf.survox_complete_total)
            .await?;
        info!(survey = %code, "survey installed");

        if let Some(account) = &self.account {
            self.install_survey_files(account, &create.client, code)
                .await?;
        }
        Ok(())
    }

    /// Uploads and imports sample for a survey from its sample config.
    pub async fn install_survey_sample(
        &self,
        client: &str,
        surveycode: &str,
        sample_config: &str,
    ) -> Result<(), InstallError> {
        let conf: SampleConf = read_json(&self.data.survey_file(client, surveycode, sample_config))?;
        let csv = self
            .data
            .survey_dir(client, surveycode)
            .join("sample")
            .join(&conf.sample_file);
        info!(survey = %surveycode, file = %csv.display(), "uploading sample file");

        let result = self
            .client
            .survey(surveycode)?
            .sample()
            .await?
            .add(
                &csv,
                conf.sample_map,
                conf.sample_setup_rules,
                conf.sample_calling_rules,
                true,
                None,
            )
            .await?;
        debug!(survey = %surveycode, %result, "sample installed");
        Ok(())
    }

    /// Creates the quotas of an `.aqu` file that are missing and updates
    /// the rest. Returns the number created.
    pub async fn install_survey_quotas(
        &self,
        client: &str,
        surveycode: &str,
        quota_file: &str,
    ) -> Result<usize, InstallError> {
        let path = self.data.survey_file(client, surveycode, quota_file);
        info!(survey = %surveycode, file = %path.display(), "installing quotas");
        let quotas = from_aqu(&path)?;
        if quotas.is_empty() {
            warn!(survey = %surveycode, file = %path.display(), "no quotas in file");
            return Ok(0);
        }

        let survey = self.client.survey(surveycode)?;
        let values: Vec<Value> = quotas.iter().map(|q| q.to_value()).collect();
        let created = survey.quotas().await?.create(&values).await?;
        let created_names = quota_names(&created);
        info!(
            survey = %surveycode,
            created = created_names.len(),
            updating = quotas.len().saturating_sub(created_names.len()),
            "quotas created"
        );

        for (quota, value) in quotas.iter().zip(values) {
            if created_names.iter().any(|n| *n == quota.name) {
                continue;
            }
            survey
                .quota(&quota.name)
                .await?
                .set(QuotaValues::default(), Some(value))
                .await?;
        }
        Ok(created_names.len())
    }

    async fn install_complete_quota(&self, surveycode: &str, target: i64, total: i64) -> Result<(), InstallError> {
        let survey = self.client.survey(surveycode)?;
        let quotas = survey.quotas().await?;
        let existing = quotas.list().await?;
        if !quota_names(&existing).iter().any(|n| n == COMPLETE_QUOTA) {
            quotas
                .create(&[json!({
                    "name": COMPLETE_QUOTA,
                    "current": 0,
                    "target": target,
                    "total": total,
                })])
                .await?;
        }
        survey
            .quota(COMPLETE_QUOTA)
            .await?
            .set(
                QuotaValues {
                    total: Some(total),
                    ..Default::default()
                },
                None,
            )
            .await?;
        Ok(())
    }

    /// Copies `data/surveys/{client}/{code}` into
    /// `{runtime}/surveys/{client}/{code}` and runs its configure script.
    pub async fn install_survey_files(
        &self,
        account: &AccountSettings,
        client: &str,
        surveycode: &str,
    ) -> Result<(), InstallError> {
        let source = self.data.survey_dir(client, surveycode);
        let target = account
            .runtime()
            .join("surveys")
            .join(client)
            .join(surveycode);
        info!(
            survey = %surveycode,
            from = %source.display(),
            to = %target.display(),
            "copying survey files"
        );

        let (src, dst) = (source.clone(), target.clone());
        tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
            .await
            .map_err(|e| InstallError::io(&source, std::io::Error::other(e)))??;

        let script = target.join(CONFIGURE_SCRIPT);
        if script.is_file() {
            make_executable(&script)?;
            info!(survey = %surveycode, script = CONFIGURE_SCRIPT, "running");
            let status = account
                .command(&script, &target)?
                .status()
                .await
                .map_err(|e| InstallError::io(&script, e))?;
            if !status.success() {
                warn!(survey = %surveycode, %status, "configure script failed");
            }
        }
        Ok(())
    }
}

/// Whether a survey status entry reports installed sample.
fn has_sample(status: &Value) -> bool {
    status.pointer("/status/sample").is_some_and(truthy)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn quota_names(list: &Value) -> Vec<String> {
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(|q| q.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

fn copy_tree(source: &Path, target: &Path) -> Result<(), InstallError> {
    std::fs::create_dir_all(target).map_err(|e| InstallError::io(target, e))?;
    let entries = std::fs::read_dir(source).map_err(|e| InstallError::io(source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| InstallError::io(source, e))?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| InstallError::io(&from, e))?;
        if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            // fs::copy carries permission bits along.
            std::fs::copy(&from, &to).map_err(|e| InstallError::io(&from, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path).map_err(|e| InstallError::io(path, e))?;
    let mut perms = meta.permissions();
    perms.set_mode(perms.mode() | 0o111);
    std::fs::set_permissions(path, perms).map_err(|e| InstallError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), InstallError> {
    Ok(())
}
