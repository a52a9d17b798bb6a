//! Survox runtime accounts and their survey servers.

use serde_json::{Value, json};

use crate::client::{Client, RequestBody};
use crate::error::Error;

const ACCOUNTS_ENDPOINT: &str = "/accounts/";

#[derive(Debug)]
pub struct Accounts<'a> {
    client: &'a Client,
}

impl<'a> Accounts<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Value, Error> {
        self.client.get(ACCOUNTS_ENDPOINT).await
    }
}

/// One runtime account, by validated name.
#[derive(Debug)]
pub struct Account<'a> {
    client: &'a Client,
    name: String,
}

impl<'a> Account<'a> {
    pub(crate) fn new(client: &'a Client, name: String) -> Self {
        Self { client, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The account's entry in the account list, if present.
    pub async fn get(&self) -> Result<Option<Value>, Error> {
        let accounts = self.client.get(ACCOUNTS_ENDPOINT).await?;
        let found = accounts.as_array().and_then(|list| {
            list.iter()
                .find(|a| {
                    a.get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|n| n.eq_ignore_ascii_case(&self.name))
                })
                .cloned()
        });
        Ok(found)
    }

    pub fn server(&self) -> AccountServer<'a> {
        AccountServer {
            client: self.client,
            endpoint: format!("{ACCOUNTS_ENDPOINT}{}/server/", self.name),
        }
    }
}

/// The survey server process of an account.
#[derive(Debug)]
pub struct AccountServer<'a> {
    client: &'a Client,
    endpoint: String,
}

impl AccountServer<'_> {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn get(&self) -> Result<Value, Error> {
        self.client.get(&self.endpoint).await
    }

    pub async fn start(&self) -> Result<Value, Error> {
        self.client
            .post(&format!("{}start/", self.endpoint), RequestBody::Empty)
            .await
    }

    /// Stops the server. `force` stops it immediately.
    pub async fn stop(&self, force: bool) -> Result<Value, Error> {
        self.client
            .post(&self.endpoint, RequestBody::form(json!({ "force": force })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockResponse, MockServer};

    #[tokio::test]
    async fn get_finds_account_in_list() {
        let server = MockServer::start(vec![
            MockResponse::success(json!([{"name": "survox"}, {"name": "demo", "id": 2}])),
            MockResponse::success(json!([{"name": "survox"}])),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let account = client.account("demo").unwrap();

        assert_eq!(account.get().await.unwrap(), Some(json!({"name": "demo", "id": 2})));
        assert_eq!(account.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_lifecycle_endpoints() {
        let server = MockServer::start(vec![
            MockResponse::success(json!({"running": false})),
            MockResponse::success(json!({"running": true})),
            MockResponse::success(json!({"running": false})),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let account = client.account("survox").unwrap();
        let srv = account.server();

        srv.get().await.unwrap();
        srv.start().await.unwrap();
        srv.stop(true).await.unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].path, "/survoxapi/v0/accounts/survox/server/");
        assert_eq!(reqs[1].method, "POST");
        assert_eq!(reqs[1].path, "/survoxapi/v0/accounts/survox/server/start/");
        assert_eq!(reqs[2].method, "POST");
        assert_eq!(reqs[2].path, "/survoxapi/v0/accounts/survox/server/");
        assert_eq!(reqs[2].form()["force"], "True");
    }

    #[tokio::test]
    async fn list_returns_accounts() {
        let server = MockServer::start(vec![MockResponse::success(json!([{"name": "survox"}]))]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        assert_eq!(client.accounts().list().await.unwrap(), json!([{"name": "survox"}]));
    }
}
