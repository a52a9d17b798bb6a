//! Generic named-resource collections.
//!
//! Most Survox resources follow the same shape: a list endpoint that can be
//! listed, posted to, and cleared, and one `{list}{name}/` endpoint per item
//! that can be fetched, replaced, and deleted. Each resource is described by
//! a static [`ResourceKind`] and driven through [`Collection`] and [`Item`].

use serde_json::Value;
use tracing::info;

use crate::client::{Client, RequestBody};
use crate::error::Error;
use crate::valid::{NAME_MAX_LEN, require_url_field};

/// How create/set bodies are put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Form,
    Json,
}

impl Encoding {
    pub(crate) fn body(self, value: Value) -> RequestBody {
        match self {
            Encoding::Form => RequestBody::form(value),
            Encoding::Json => RequestBody::Json(value),
        }
    }
}

/// Static description of one resource type.
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceKind {
    /// Used in error messages, e.g. `No client available named: acme`.
    pub capability: &'static str,
    /// Label used when validating item names.
    pub label: &'static str,
    /// List endpoint, always with a trailing slash. Empty for scoped kinds.
    pub list_endpoint: &'static str,
    pub encoding: Encoding,
}

pub const CLIENTS: ResourceKind = ResourceKind {
    capability: "client",
    label: "Client name",
    list_endpoint: "/clients/",
    encoding: Encoding::Form,
};

/// Third-party credentials, listed under `/clients/{client}/credentials/`.
pub const CLIENT_CREDENTIALS: ResourceKind = ResourceKind {
    capability: "client credential",
    label: "Third party name",
    list_endpoint: "",
    encoding: Encoding::Form,
};

pub const DNCS: ResourceKind = ResourceKind {
    capability: "Do-Not-Contact",
    label: "Do-Not-Contact",
    list_endpoint: "/sample/dnc/",
    encoding: Encoding::Form,
};

pub const SAMPLE_MAPS: ResourceKind = ResourceKind {
    capability: "sample map template",
    label: "Sample map name",
    list_endpoint: "/sample/map/",
    encoding: Encoding::Json,
};

pub const SAMPLE_SETUP_RULES: ResourceKind = ResourceKind {
    capability: "sample setup rule template",
    label: "Sample setup name",
    list_endpoint: "/sample/setup-rules/",
    encoding: Encoding::Json,
};

pub const SAMPLE_CALLING_RULES: ResourceKind = ResourceKind {
    capability: "sample calling rule template",
    label: "Sample calling rule",
    list_endpoint: "/sample/calling-rules/",
    encoding: Encoding::Json,
};

pub const LOCATIONS: ResourceKind = ResourceKind {
    capability: "location",
    label: "location name",
    list_endpoint: "/admin/locations/",
    encoding: Encoding::Form,
};

pub const ORGANIZATIONAL_UNITS: ResourceKind = ResourceKind {
    capability: "organizational unit",
    label: "organizational unit name",
    list_endpoint: "/admin/organizational-unit/",
    encoding: Encoding::Form,
};

pub const LANGUAGES: ResourceKind = ResourceKind {
    capability: "language",
    label: "language name",
    list_endpoint: "/admin/languages/",
    encoding: Encoding::Form,
};

pub const QUALIFICATIONS: ResourceKind = ResourceKind {
    capability: "qualification",
    label: "qualification name",
    list_endpoint: "/admin/qualifications/",
    encoding: Encoding::Form,
};

pub const SKILLS: ResourceKind = ResourceKind {
    capability: "skill",
    label: "skill name",
    list_endpoint: "/admin/skills/",
    encoding: Encoding::Form,
};

/// `true` for payloads that carry nothing to send.
pub(crate) fn is_empty_body(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// The list endpoint of one resource kind.
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    client: &'a Client,
    kind: &'static ResourceKind,
    endpoint: String,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(client: &'a Client, kind: &'static ResourceKind) -> Self {
        Self::scoped(client, kind, kind.list_endpoint.to_string())
    }

    /// A collection whose list endpoint depends on a parent resource.
    pub(crate) fn scoped(client: &'a Client, kind: &'static ResourceKind, endpoint: String) -> Self {
        Self {
            client,
            kind,
            endpoint,
        }
    }

    pub fn kind(&self) -> &'static ResourceKind {
        self.kind
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn list(&self) -> Result<Value, Error> {
        self.client.get(&self.endpoint).await
    }

    /// Handle to one named item. The name is validated, not fetched.
    pub fn item(&self, name: &str) -> Result<Item<'a>, Error> {
        let name = require_url_field(self.kind.label, name, 1, NAME_MAX_LEN)?;
        Ok(Item::under(self.client, self.kind, &self.endpoint, name))
    }

    /// Creates `name` by posting `body` to the list endpoint.
    ///
    /// If the item already exists it is returned when `exists_okay`, and
    /// rejected otherwise.
    pub async fn create(&self, name: &str, body: Value, exists_okay: bool) -> Result<Value, Error> {
        let item = self.item(name)?;
        if let Some(existing) = item.get().await? {
            if !exists_okay {
                return Err(Error::runtime(format!(
                    "{} already exists: {}",
                    self.kind.capability, item.name
                )));
            }
            return Ok(existing);
        }

        let created = self
            .client
            .post(&self.endpoint, self.kind.encoding.body(body))
            .await?;
        info!(capability = self.kind.capability, name = %item.name, "created");
        Ok(created)
    }

    /// Deletes every item of this kind.
    pub async fn delete_all(&self) -> Result<Value, Error> {
        self.client.delete(&self.endpoint).await
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// One named item, `{list}{name}/`.
#[derive(Debug, Clone)]
pub struct Item<'a> {
    client: &'a Client,
    kind: &'static ResourceKind,
    name: String,
    endpoint: String,
}

impl<'a> Item<'a> {
    /// Item `name` below `list_endpoint`. `name` must already be validated.
    pub(crate) fn under(
        client: &'a Client,
        kind: &'static ResourceKind,
        list_endpoint: &str,
        name: String,
    ) -> Self {
        Self {
            client,
            kind,
            endpoint: format!("{list_endpoint}{name}/"),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn client(&self) -> &'a Client {
        self.client
    }

    pub async fn get(&self) -> Result<Option<Value>, Error> {
        self.client.get_optional(&self.endpoint).await
    }

    /// Replaces the item. It must already exist.
    pub async fn set(&self, body: Value) -> Result<Value, Error> {
        if is_empty_body(&body) {
            return Err(Error::MissingParameter(self.kind.capability));
        }
        self.require().await?;
        self.client
            .put(&self.endpoint, self.kind.encoding.body(body))
            .await
    }

    pub async fn delete(&self) -> Result<Value, Error> {
        self.client.delete(&self.endpoint).await
    }

    /// Fetches the item, failing when it does not exist.
    pub(crate) async fn require(&self) -> Result<Value, Error> {
        self.get().await?.ok_or_else(|| {
            Error::runtime(format!(
                "No {} available named: {}",
                self.kind.capability, self.name
            ))
        })
    }
}
