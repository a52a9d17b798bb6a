//! Call-center administration lists: locations, organizational units,
//! languages, qualifications, and skills.

use serde_json::{Value, json};

use crate::client::Client;
use crate::error::Error;
use crate::resources::{
    Collection, Item, LANGUAGES, LOCATIONS, ORGANIZATIONAL_UNITS, QUALIFICATIONS, ResourceKind,
    SKILLS,
};

#[derive(Debug)]
pub struct Admin<'a> {
    client: &'a Client,
}

impl<'a> Admin<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn list(&self, kind: &'static ResourceKind) -> AdminList<'a> {
        AdminList {
            inner: Collection::new(self.client, kind),
        }
    }

    pub fn locations(&self) -> AdminList<'a> {
        self.list(&LOCATIONS)
    }

    pub fn location(&self, name: &str) -> Result<Item<'a>, Error> {
        self.locations().item(name)
    }

    pub fn organizational_units(&self) -> AdminList<'a> {
        self.list(&ORGANIZATIONAL_UNITS)
    }

    pub fn organizational_unit(&self, name: &str) -> Result<Item<'a>, Error> {
        self.organizational_units().item(name)
    }

    pub fn languages(&self) -> AdminList<'a> {
        self.list(&LANGUAGES)
    }

    pub fn language(&self, name: &str) -> Result<Item<'a>, Error> {
        self.languages().item(name)
    }

    pub fn qualifications(&self) -> AdminList<'a> {
        self.list(&QUALIFICATIONS)
    }

    pub fn qualification(&self, name: &str) -> Result<Item<'a>, Error> {
        self.qualifications().item(name)
    }

    pub fn skills(&self) -> AdminList<'a> {
        self.list(&SKILLS)
    }

    pub fn skill(&self, name: &str) -> Result<Item<'a>, Error> {
        self.skills().item(name)
    }
}

/// A `{name, description}` admin list.
#[derive(Debug)]
pub struct AdminList<'a> {
    inner: Collection<'a>,
}

impl<'a> AdminList<'a> {
    pub async fn list(&self) -> Result<Value, Error> {
        self.inner.list().await
    }

    pub async fn create(&self, name: &str, description: &str, exists_okay: bool) -> Result<Value, Error> {
        self.inner
            .create(
                name,
                json!({ "name": name, "description": description }),
                exists_okay,
            )
            .await
    }

    pub async fn delete_all(&self) -> Result<Value, Error> {
        self.inner.delete_all().await
    }

    pub fn item(&self, name: &str) -> Result<Item<'a>, Error> {
        self.inner.item(name)
    }
}
