//! Survey sample: record upload and import, the per-survey sample
//! documents, and sample selections.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value, json};
use tracing::info;

use crate::client::{Client, RequestBody};
use crate::error::Error;
use crate::resources::is_empty_body;
use crate::upload::base_name;

/// Block size for sample and questionnaire uploads.
pub const SAMPLE_BLOCK_SIZE: usize = 100_000;

/// `/surveys/{s}/sample/`.
#[derive(Debug)]
pub struct SurveySample<'a> {
    client: &'a Client,
    survey: String,
    endpoint: String,
}

impl<'a> SurveySample<'a> {
    pub(crate) fn new(client: &'a Client, survey: &str) -> Self {
        Self {
            client,
            survey: survey.to_string(),
            endpoint: format!("/surveys/{survey}/sample/"),
        }
    }

    fn action(&self, action: &str) -> String {
        format!("{}{action}/", self.endpoint)
    }

    pub async fn get(&self) -> Result<Value, Error> {
        self.client.get(&self.endpoint).await
    }

    pub async fn delete(&self) -> Result<Value, Error> {
        self.client.delete(&self.endpoint).await
    }

    /// Uploads a sample file. `None` uses [`SAMPLE_BLOCK_SIZE`].
    pub async fn upload(&self, path: &Path, block_size: Option<usize>) -> Result<Value, Error> {
        self.client
            .upload(
                &self.action("upload"),
                path,
                Some(block_size.unwrap_or(SAMPLE_BLOCK_SIZE)),
            )
            .await
    }

    /// Builds sample records from a previously uploaded file.
    pub async fn import_csv(&self, path: &Path) -> Result<Value, Error> {
        self.client
            .post(
                &self.action("import"),
                RequestBody::form(json!({ "samplefile": base_name(path) })),
            )
            .await
    }

    /// Sample fields; `system` includes the system fields.
    pub async fn fields(&self, system: bool) -> Result<Value, Error> {
        let system = if system { "True" } else { "False" };
        self.client
            .get(&format!("{}?system={system}", self.action("fields")))
            .await
    }

    pub async fn rebuild(&self) -> Result<Value, Error> {
        self.client.post(&self.action("rebuild"), RequestBody::Empty).await
    }

    pub async fn repair(&self) -> Result<Value, Error> {
        self.client.post(&self.action("repair"), RequestBody::Empty).await
    }

    pub async fn recover(&self) -> Result<Value, Error> {
        self.client.post(&self.action("recover"), RequestBody::Empty).await
    }

    pub fn map(&self) -> SampleDocument<'a> {
        SampleDocument::new(self.client, &self.survey, SampleDocumentKind::Map)
    }

    pub fn setup_rules(&self) -> SampleDocument<'a> {
        SampleDocument::new(self.client, &self.survey, SampleDocumentKind::SetupRules)
    }

    pub fn calling_rules(&self) -> SampleDocument<'a> {
        SampleDocument::new(self.client, &self.survey, SampleDocumentKind::CallingRules)
    }

    pub fn selection(&self) -> SampleSelection<'a> {
        SampleSelection::new(self.client, &self.survey)
    }

    /// Uploads `path`, installs the three sample documents, then imports.
    ///
    /// Returns every step's result keyed by step.
    pub async fn add(
        &self,
        path: &Path,
        sample_map: Value,
        setup_rules: Value,
        calling_rules: Value,
        exists_okay: bool,
        block_size: Option<usize>,
    ) -> Result<Value, Error> {
        info!(survey = %self.survey, file = %path.display(), "uploading sample file");
        let upload = self.upload(path, block_size).await?;
        info!(survey = %self.survey, "installing sample map");
        let map = self.map().create(sample_map, exists_okay).await?;
        info!(survey = %self.survey, "installing sample setup rules");
        let setup = self.setup_rules().create(setup_rules, exists_okay).await?;
        info!(survey = %self.survey, "installing sample calling rules");
        let calling = self.calling_rules().create(calling_rules, exists_okay).await?;
        info!(survey = %self.survey, file = %path.display(), "generating sample from file");
        let import = self.import_csv(path).await?;

        Ok(json!({
            "sample_upload_result": upload,
            "sample_map_result": map,
            "sample_setup_rules_result": setup,
            "sample_calling_rules_result": calling,
            "sample_import_result": import,
        }))
    }
}

// ---------------------------------------------------------------------------
// Sample documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDocumentKind {
    Map,
    SetupRules,
    CallingRules,
}

impl SampleDocumentKind {
    fn segment(self) -> &'static str {
        match self {
            SampleDocumentKind::Map => "map",
            SampleDocumentKind::SetupRules => "setup-rules",
            SampleDocumentKind::CallingRules => "calling-rules",
        }
    }

    fn parameter(self) -> &'static str {
        match self {
            SampleDocumentKind::Map => "sample_map",
            SampleDocumentKind::SetupRules => "setup_rules",
            SampleDocumentKind::CallingRules => "calling_rules",
        }
    }

    fn title(self) -> &'static str {
        match self {
            SampleDocumentKind::Map => "Sample map",
            SampleDocumentKind::SetupRules => "Sample setup rules",
            SampleDocumentKind::CallingRules => "Sample calling rules",
        }
    }
}

/// A survey's sample map, setup rules, or calling rules document.
#[derive(Debug)]
pub struct SampleDocument<'a> {
    client: &'a Client,
    survey: String,
    kind: SampleDocumentKind,
    endpoint: String,
}

impl<'a> SampleDocument<'a> {
    fn new(client: &'a Client, survey: &str, kind: SampleDocumentKind) -> Self {
        Self {
            client,
            survey: survey.to_string(),
            kind,
            endpoint: format!("/surveys/{survey}/sample/{}/", kind.segment()),
        }
    }

    pub fn kind(&self) -> SampleDocumentKind {
        self.kind
    }

    pub async fn get(&self) -> Result<Value, Error> {
        self.client.get(&self.endpoint).await
    }

    /// Installs `doc` unless a non-empty document is already there.
    pub async fn create(&self, doc: Value, exists_okay: bool) -> Result<Value, Error> {
        if is_empty_body(&doc) {
            return Err(Error::MissingParameter(self.kind.parameter()));
        }
        if let Some(existing) = self.client.get_optional(&self.endpoint).await? {
            if !is_empty_body(&existing) {
                if !exists_okay {
                    return Err(Error::runtime(format!(
                        "{} already exist for survey: {}",
                        self.kind.title(),
                        self.survey
                    )));
                }
                return Ok(existing);
            }
        }
        self.client
            .post(&self.endpoint, RequestBody::Json(doc))
            .await
    }

    pub async fn set(&self, doc: Value) -> Result<Value, Error> {
        if is_empty_body(&doc) {
            return Err(Error::MissingParameter(self.kind.parameter()));
        }
        self.client.put(&self.endpoint, RequestBody::Json(doc)).await
    }

    pub async fn delete(&self) -> Result<Value, Error> {
        self.client.delete(&self.endpoint).await
    }
}

// ---------------------------------------------------------------------------
// Sample selection
// ---------------------------------------------------------------------------

/// Operations on a selection of sample records, `/surveys/{s}/sample-selection/`.
///
/// Every call takes the selection criteria as a JSON object. Action fields
/// are merged under it, so the criteria win on a key clash.
#[derive(Debug)]
pub struct SampleSelection<'a> {
    client: &'a Client,
    endpoint: String,
}

impl<'a> SampleSelection<'a> {
    fn new(client: &'a Client, survey: &str) -> Self {
        Self {
            client,
            endpoint: format!("/surveys/{survey}/sample-selection/"),
        }
    }

    async fn act(&self, action: &str, fields: Value, selection: &Value) -> Result<Value, Error> {
        let body = merge(fields, selection);
        self.client
            .post(&format!("{}{action}/", self.endpoint), RequestBody::Json(body))
            .await
    }

    /// Previews the selection. The answer carries the `fid` used for download.
    pub async fn list(&self, selection: &Value) -> Result<Value, Error> {
        self.act("list", json!({}), selection).await
    }

    /// Previews the selection and downloads it as a file.
    pub async fn download(
        &self,
        selection: &Value,
        path: &Path,
    ) -> Result<HashMap<String, String>, Error> {
        let preview = self.list(selection).await?;
        let fid = match preview.get("fid") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(Error::runtime("sample selection preview has no fid")),
        };
        self.client
            .download(&format!("{}list/download/?fid={fid}", self.endpoint), path)
            .await
    }

    pub async fn hide(&self, selection: &Value, name: Option<&str>) -> Result<Value, Error> {
        self.act("hide", hide_fields("hide", name), selection).await
    }

    pub async fn unhide(&self, selection: &Value, name: Option<&str>) -> Result<Value, Error> {
        self.act("hide", hide_fields("unhide", name), selection).await
    }

    pub async fn resolve(&self, selection: &Value, resolution_code: &str) -> Result<Value, Error> {
        self.act("resolve", json!({ "resolution_code": resolution_code }), selection)
            .await
    }

    pub async fn gather_special(
        &self,
        selection: &Value,
        sort_by_timezone: bool,
    ) -> Result<Value, Error> {
        self.act(
            "gather-special",
            json!({ "sort_by_timezone": sort_by_timezone }),
            selection,
        )
        .await
    }

    pub async fn delete(&self, selection: &Value) -> Result<Value, Error> {
        self.act("delete", json!({ "delete": true }), selection).await
    }

    /// Removes call attempts; `None` removes the last one.
    pub async fn remove_attempts(
        &self,
        selection: &Value,
        attempts: Option<Value>,
    ) -> Result<Value, Error> {
        let attempts = attempts.unwrap_or_else(|| json!("last"));
        self.act("remove-attempts", json!({ "attempts": attempts }), selection)
            .await
    }

    pub async fn replicate(&self, selection: &Value, replicate: Value) -> Result<Value, Error> {
        self.act("replicate", json!({ "replicate": replicate }), selection)
            .await
    }

    pub async fn return_owned(&self, selection: &Value) -> Result<Value, Error> {
        self.act("return-owned", json!({ "return_owned": true }), selection)
            .await
    }
}

fn hide_fields(mode: &str, name: Option<&str>) -> Value {
    let mut fields = json!({ "hide": mode });
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        fields["name"] = json!(name);
    }
    fields
}

/// `fields` overlaid with the keys of `selection`.
fn merge(fields: Value, selection: &Value) -> Value {
    let mut out = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(selection) = selection.as_object() {
        for (k, v) in selection {
            out.insert(k.clone(), v.clone());
        }
    }
    Value::Object(out)
}
