//! Library resources shared across surveys: Do-Not-Contact lists and the
//! sample map, setup rule, and calling rule templates.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_json::{Map, Value, json};
use tracing::info;

use crate::client::{Client, RequestBody};
use crate::error::Error;
use crate::resources::{
    Collection, DNCS, Item, ResourceKind, SAMPLE_CALLING_RULES, SAMPLE_MAPS, SAMPLE_SETUP_RULES,
};

/// Entry point for library resources.
#[derive(Debug)]
pub struct Library<'a> {
    client: &'a Client,
}

impl<'a> Library<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn dncs(&self) -> DncList<'a> {
        DncList {
            inner: Collection::new(self.client, &DNCS),
        }
    }

    pub fn dnc(&self, name: &str) -> Result<Dnc<'a>, Error> {
        Ok(Dnc {
            inner: self.dncs().inner.item(name)?,
        })
    }

    pub fn sample_maps(&self) -> Templates<'a> {
        Templates::new(self.client, &SAMPLE_MAPS)
    }

    pub fn sample_map(&self, name: &str) -> Result<Item<'a>, Error> {
        self.sample_maps().item(name)
    }

    pub fn sample_setup_rules(&self) -> Templates<'a> {
        Templates::new(self.client, &SAMPLE_SETUP_RULES)
    }

    pub fn sample_setup_rule(&self, name: &str) -> Result<Item<'a>, Error> {
        self.sample_setup_rules().item(name)
    }

    pub fn sample_calling_rules(&self) -> Templates<'a> {
        Templates::new(self.client, &SAMPLE_CALLING_RULES)
    }

    pub fn sample_calling_rule(&self, name: &str) -> Result<Item<'a>, Error> {
        self.sample_calling_rules().item(name)
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// A library of named JSON templates. Each template carries its own `name`.
#[derive(Debug)]
pub struct Templates<'a> {
    inner: Collection<'a>,
}

impl<'a> Templates<'a> {
    fn new(client: &'a Client, kind: &'static ResourceKind) -> Self {
        Self {
            inner: Collection::new(client, kind),
        }
    }

    pub async fn list(&self) -> Result<Value, Error> {
        self.inner.list().await
    }

    /// Installs `template` under its `name`.
    pub async fn create(&self, template: Value, exists_okay: bool) -> Result<Value, Error> {
        let name = template
            .get("name")
            .and_then(Value::as_str)
            .ok_or(Error::MissingParameter("name"))?
            .to_string();
        self.inner.create(&name, template, exists_okay).await
    }

    pub async fn delete_all(&self) -> Result<Value, Error> {
        self.inner.delete_all().await
    }

    pub fn item(&self, name: &str) -> Result<Item<'a>, Error> {
        self.inner.item(name)
    }
}

// ---------------------------------------------------------------------------
// Do-Not-Contact lists
// ---------------------------------------------------------------------------

/// What a DNC list matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DncType {
    Phone,
    Prefix,
    Email,
}

impl DncType {
    pub const ALL: [DncType; 3] = [DncType::Phone, DncType::Prefix, DncType::Email];

    pub fn as_str(self) -> &'static str {
        match self {
            DncType::Phone => "phone",
            DncType::Prefix => "prefix",
            DncType::Email => "email",
        }
    }
}

impl fmt::Display for DncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DncType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DncType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let opts: Vec<&str> = DncType::ALL.iter().map(|t| t.as_str()).collect();
                Error::runtime(format!(
                    "Unknown DNC type \"{s}\".  Must be one of {}",
                    opts.join(", ")
                ))
            })
    }
}

/// `/sample/dnc/`.
#[derive(Debug)]
pub struct DncList<'a> {
    inner: Collection<'a>,
}

impl<'a> DncList<'a> {
    pub async fn list(&self) -> Result<Value, Error> {
        self.inner.list().await
    }

    /// Creates a DNC list and, with `file`, loads its records.
    ///
    /// The upload answer is attached to the result as `upload_result`.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        dnc_type: DncType,
        account: &str,
        file: Option<&Path>,
        exists_okay: bool,
    ) -> Result<Value, Error> {
        if let Some(file) = file {
            if !tokio::fs::try_exists(file).await.unwrap_or(false) {
                return Err(Error::runtime(format!(
                    "No such filename for Do-Not-Contact: {}",
                    file.display()
                )));
            }
        }

        let mut created = self
            .inner
            .create(
                name,
                json!({
                    "name": name,
                    "dnc_type": dnc_type.as_str(),
                    "description": description,
                    "account": account,
                }),
                exists_okay,
            )
            .await?;

        if let Some(file) = file {
            let dnc = Dnc {
                inner: self.inner.item(name)?,
            };
            let upload = dnc.upload(file, None).await?;
            match created.as_object_mut() {
                Some(obj) => {
                    obj.insert("upload_result".into(), upload);
                }
                None => created = json!({ "upload_result": upload }),
            }
        }
        Ok(created)
    }

    pub async fn delete_all(&self) -> Result<Value, Error> {
        self.inner.delete_all().await
    }
}

/// One DNC list, `/sample/dnc/{name}/`.
#[derive(Debug)]
pub struct Dnc<'a> {
    inner: Item<'a>,
}

impl Dnc<'_> {
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn get(&self) -> Result<Option<Value>, Error> {
        self.inner.get().await
    }

    /// Updates the description and realtime flag, sending only what changed.
    ///
    /// Returns the current list unchanged when nothing differs.
    pub async fn set(&self, description: Option<&str>, realtime: Option<bool>) -> Result<Value, Error> {
        let current = self.inner.require().await?;
        if description.is_none() && realtime.is_none() {
            return Err(Error::runtime(format!(
                "No properties passed to set for DNC named: {}",
                self.name()
            )));
        }

        let mut changes = Map::new();
        if let Some(description) = description {
            if current.get("description").and_then(Value::as_str) != Some(description) {
                changes.insert("description".into(), json!(description));
            }
        }
        if let Some(realtime) = realtime {
            if current.get("realtime").and_then(Value::as_bool) != Some(realtime) {
                changes.insert("realtime".into(), json!(realtime));
            }
        }

        if changes.is_empty() {
            return Ok(current);
        }
        self.inner
            .client()
            .put(self.inner.endpoint(), RequestBody::Form(changes))
            .await
    }

    pub async fn delete(&self) -> Result<Value, Error> {
        self.inner.delete().await
    }

    /// Loads records into the list.
    pub async fn upload(&self, path: &Path, block_size: Option<usize>) -> Result<Value, Error> {
        info!(dnc = %self.name(), file = %path.display(), "uploading DNC records");
        self.inner
            .client()
            .upload(&format!("{}upload/", self.inner.endpoint()), path, block_size)
            .await
    }

    /// Saves the list as CSV to `path`.
    pub async fn download(&self, path: &Path) -> Result<HashMap<String, String>, Error> {
        let client = self.inner.client();
        let location = client
            .get(&format!("{}download/", self.inner.endpoint()))
            .await?;
        let Some(location) = location.as_str().filter(|l| !l.is_empty()) else {
            return Err(Error::runtime(format!(
                "No DNC available for download: {}",
                self.name()
            )));
        };
        client.download(location, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockResponse, MockServer};
    use std::io::Write;

    #[test]
    fn dnc_type_parses_known_values() {
        assert_eq!("phone".parse::<DncType>().unwrap(), DncType::Phone);
        assert_eq!("email".parse::<DncType>().unwrap(), DncType::Email);
        let err = "fax".parse::<DncType>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error[0] - Unknown DNC type \"fax\".  Must be one of phone, prefix, email"
        );
    }

    #[tokio::test]
    async fn template_create_uses_embedded_name() {
        let server = MockServer::start(vec![
            MockResponse::raw(404, ""),
            MockResponse::success(json!({"name": "std_setup"})),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let template = json!({"name": "std_setup", "rules": [{"field": "tz"}]});

        client
            .library()
            .sample_setup_rules()
            .create(template.clone(), true)
            .await
            .unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].path, "/survoxapi/v0/sample/setup-rules/std_setup/");
        assert_eq!(reqs[1].path, "/survoxapi/v0/sample/setup-rules/");
        assert_eq!(reqs[1].json(), template);
    }

    #[tokio::test]
    async fn template_without_name_is_rejected() {
        let client = Client::with_api_key("h.com", "k").unwrap();
        let err = client
            .library()
            .sample_maps()
            .create(json!({"fields": []}), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter("name")));
    }

    #[tokio::test]
    async fn dnc_create_uploads_file_and_attaches_result() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"5551234\n5555678\n").unwrap();
        file.flush().unwrap();

        let server = MockServer::start_with(|url| {
            vec![
                MockResponse::raw(404, ""),
                MockResponse::success(json!({"name": "dnc_phone"})),
                MockResponse::success(json!({"url": format!("{url}/up/1/")})),
                MockResponse::success(json!({"loaded": 2})),
            ]
        })
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();

        let created = client
            .library()
            .dncs()
            .create(
                "dnc_phone",
                "Phone DNC",
                DncType::Phone,
                "survox",
                Some(file.path()),
                true,
            )
            .await
            .unwrap();
        assert_eq!(created["name"], "dnc_phone");
        assert_eq!(created["upload_result"], json!({"loaded": 2}));

        let reqs = server.requests();
        let form = reqs[1].form();
        assert_eq!(form["dnc_type"], "phone");
        assert_eq!(form["account"], "survox");
        assert_eq!(reqs[2].path, "/survoxapi/v0/sample/dnc/dnc_phone/upload/");
        assert_eq!(reqs[3].path, "/up/1/");
    }

    #[tokio::test]
    async fn dnc_create_with_missing_file_sends_nothing() {
        let server = MockServer::start(vec![]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = client
            .library()
            .dncs()
            .create(
                "dnc_phone",
                "",
                DncType::Phone,
                "survox",
                Some(&dir.path().join("nope.csv")),
                true,
            )
            .await
            .unwrap_err();
        assert!(err.is_runtime());
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn dnc_set_only_sends_changes() {
        let current = json!({"name": "d1", "description": "old", "realtime": false});
        let server = MockServer::start(vec![
            MockResponse::success(current.clone()),
            MockResponse::success(json!({"realtime": true})),
            MockResponse::success(current.clone()),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let dnc = client.library().dnc("d1").unwrap();

        dnc.set(Some("old"), Some(true)).await.unwrap();
        let unchanged = dnc.set(Some("old"), None).await.unwrap();
        assert_eq!(unchanged, current);

        let reqs = server.requests();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[1].method, "PUT");
        let form = reqs[1].form();
        assert_eq!(form.get("realtime").map(String::as_str), Some("True"));
        assert!(!form.contains_key("description"));
    }

    #[tokio::test]
    async fn dnc_download_follows_location() {
        let server = MockServer::start_with(|url| {
            vec![
                MockResponse::success(json!(format!("{url}/files/d1.csv"))),
                MockResponse::raw(200, "5551234\n"),
            ]
        })
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("d1.csv");

        client.library().dnc("d1").unwrap().download(&dest).await.unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].path, "/survoxapi/v0/sample/dnc/d1/download/");
        assert_eq!(reqs[1].path, "/files/d1.csv");
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "5551234\n");
    }
}
