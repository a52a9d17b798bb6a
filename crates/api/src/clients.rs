//! Survey clients and their third-party credentials.

use serde_json::{Value, json};

use crate::client::Client;
use crate::error::Error;
use crate::resources::{CLIENT_CREDENTIALS, CLIENTS, Collection, Item};

#[derive(Debug)]
pub struct Clients<'a> {
    inner: Collection<'a>,
}

impl<'a> Clients<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self {
            inner: Collection::new(client, &CLIENTS),
        }
    }

    pub async fn list(&self) -> Result<Value, Error> {
        self.inner.list().await
    }

    /// Creates client `name` with a display `description`.
    pub async fn create(&self, name: &str, description: &str, exists_okay: bool) -> Result<Value, Error> {
        self.inner
            .create(
                name,
                json!({ "client": name, "name": description }),
                exists_okay,
            )
            .await
    }

    pub async fn delete_all(&self) -> Result<Value, Error> {
        self.inner.delete_all().await
    }
}

/// One survey client, `/clients/{client}/`.
#[derive(Debug)]
pub struct ClientItem<'a> {
    inner: Item<'a>,
}

impl<'a> ClientItem<'a> {
    pub(crate) fn new(client: &'a Client, name: String) -> Self {
        Self {
            inner: Item::under(client, &CLIENTS, CLIENTS.list_endpoint, name),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn get(&self) -> Result<Option<Value>, Error> {
        self.inner.get().await
    }

    pub async fn set(&self, client: Value) -> Result<Value, Error> {
        self.inner.set(client).await
    }

    pub async fn delete(&self) -> Result<Value, Error> {
        self.inner.delete().await
    }

    pub fn credentials(&self) -> Credentials<'a> {
        Credentials {
            inner: Collection::scoped(
                self.inner.client(),
                &CLIENT_CREDENTIALS,
                format!("{}credentials/", self.inner.endpoint()),
            ),
        }
    }

    pub fn credential(&self, third_party: &str) -> Result<Item<'a>, Error> {
        self.credentials().inner.item(third_party)
    }
}

/// Third-party credentials of one client, keyed by `third_party`.
#[derive(Debug)]
pub struct Credentials<'a> {
    inner: Collection<'a>,
}

impl<'a> Credentials<'a> {
    pub async fn list(&self) -> Result<Value, Error> {
        self.inner.list().await
    }

    pub async fn create(
        &self,
        third_party: &str,
        credentials: Value,
        exists_okay: bool,
    ) -> Result<Value, Error> {
        self.inner
            .create(
                third_party,
                json!({ "third_party": third_party, "credentials": credentials }),
                exists_okay,
            )
            .await
    }

    pub fn item(&self, third_party: &str) -> Result<Item<'a>, Error> {
        self.inner.item(third_party)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockResponse, MockServer};

    #[tokio::test]
    async fn create_client_posts_form() {
        let server = MockServer::start(vec![
            MockResponse::raw(404, ""),
            MockResponse::success(json!({"client": "acme", "name": "Acme Research"})),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();

        client
            .clients()
            .create("acme", "Acme Research", true)
            .await
            .unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].path, "/survoxapi/v0/clients/acme/");
        let form = reqs[1].form();
        assert_eq!(form["client"], "acme");
        assert_eq!(form["name"], "Acme Research");
    }

    #[tokio::test]
    async fn client_get_absent_is_none() {
        let server = MockServer::start(vec![MockResponse::raw(404, "")]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        assert!(client.client("acme").unwrap().get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn credentials_are_scoped_to_client() {
        let server = MockServer::start(vec![
            MockResponse::success(json!([])),
            MockResponse::raw(404, ""),
            MockResponse::success(json!({"third_party": "twilio"})),
            MockResponse::success(json!({})),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let acme = client.client("acme").unwrap();

        acme.credentials().list().await.unwrap();
        acme.credentials()
            .create("twilio", json!("sid:token"), false)
            .await
            .unwrap();
        acme.credential("twilio").unwrap().delete().await.unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].path, "/survoxapi/v0/clients/acme/credentials/");
        assert_eq!(reqs[1].path, "/survoxapi/v0/clients/acme/credentials/twilio/");
        assert_eq!(reqs[2].form()["third_party"], "twilio");
        assert_eq!(reqs[2].form()["credentials"], "sid:token");
        assert_eq!(reqs[3].method, "DELETE");
        assert_eq!(reqs[3].path, "/survoxapi/v0/clients/acme/credentials/twilio/");
    }
}
