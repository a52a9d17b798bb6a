//! Survey quotas.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::client::{Client, RequestBody};
use crate::error::Error;

/// Quota counters. `None` means "not supplied".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<i64>,
}

impl QuotaValues {
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.total.is_none() && self.target.is_none()
    }

    /// Full `{current, total, target}` body: values from `base` (0 when
    /// missing) overridden by whatever `self` supplies.
    pub fn fill(&self, base: Option<&Value>) -> Value {
        let field = |name: &str| {
            base.and_then(|q| q.get(name))
                .and_then(Value::as_i64)
                .unwrap_or(0)
        };
        json!({
            "current": self.current.unwrap_or_else(|| field("current")),
            "total": self.total.unwrap_or_else(|| field("total")),
            "target": self.target.unwrap_or_else(|| field("target")),
        })
    }
}

/// `/surveys/{s}/quotas/`.
#[derive(Debug)]
pub struct QuotaList<'a> {
    client: &'a Client,
    endpoint: String,
    reset_endpoint: String,
}

impl<'a> QuotaList<'a> {
    pub(crate) fn new(client: &'a Client, survey: &str) -> Self {
        Self {
            client,
            endpoint: format!("/surveys/{survey}/quotas/"),
            reset_endpoint: format!("/surveys/{survey}/quotas-reset/"),
        }
    }

    pub async fn list(&self) -> Result<Value, Error> {
        self.client.get(&self.endpoint).await
    }

    /// Creates the quotas in `quotas` whose name is not taken yet.
    ///
    /// Returns the server's answer for the created quotas, or `[]` when
    /// every quota already existed.
    pub async fn create(&self, quotas: &[Value]) -> Result<Value, Error> {
        if quotas.is_empty() {
            return Err(Error::MissingParameter("quota_list"));
        }

        let current = self.list().await?;
        let existing: HashSet<&str> = current
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|q| q.get("name").and_then(Value::as_str))
            .collect();

        let missing: Vec<Value> = quotas
            .iter()
            .filter(|q| {
                q.get("name")
                    .and_then(Value::as_str)
                    .is_none_or(|name| !existing.contains(name))
            })
            .cloned()
            .collect();

        if missing.is_empty() {
            return Ok(json!([]));
        }
        info!(endpoint = %self.endpoint, count = missing.len(), "creating quotas");
        self.client
            .post(&self.endpoint, RequestBody::Json(Value::Array(missing)))
            .await
    }

    /// Zeroes the `current` counter of every quota.
    pub async fn reset(&self) -> Result<Value, Error> {
        self.client
            .post(&self.reset_endpoint, RequestBody::Empty)
            .await
    }
}

/// `/surveys/{s}/quotas/{name}/`.
#[derive(Debug)]
pub struct Quota<'a> {
    client: &'a Client,
    name: String,
    endpoint: String,
}

impl<'a> Quota<'a> {
    pub(crate) fn new(client: &'a Client, survey: &str, name: &str) -> Self {
        Self {
            client,
            name: name.to_string(),
            endpoint: format!("/surveys/{survey}/quotas/{name}/"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self) -> Result<Option<Value>, Error> {
        self.client.get_optional(&self.endpoint).await
    }

    /// Writes the quota's counters.
    ///
    /// Unsupplied values come from `quota`, or from the server's copy when
    /// `quota` is `None`.
    pub async fn set(&self, values: QuotaValues, quota: Option<Value>) -> Result<Value, Error> {
        let base = match quota {
            Some(q) => Some(q),
            None => self.get().await?,
        };
        if values.is_empty() && base.is_none() {
            return Err(Error::runtime(
                "must specify at least one component of the quota",
            ));
        }
        let body = values.fill(base.as_ref());
        self.client
            .put(&self.endpoint, RequestBody::form(body))
            .await
    }

    pub async fn delete(&self) -> Result<Value, Error> {
        self.client.delete(&self.endpoint).await
    }

    /// Adds `amount` (default 1, may be negative) to `current`.
    pub async fn increment(&self, amount: Option<i64>) -> Result<Value, Error> {
        let amount = amount.unwrap_or(1);
        self.client
            .post(
                &format!("{}increment/", self.endpoint),
                RequestBody::form(json!({ "increment": amount })),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockResponse, MockServer};

    #[test]
    fn fill_overrides_base_with_supplied_values() {
        let base = json!({"current": 4, "total": 10, "target": 8, "name": "q1"});
        let values = QuotaValues {
            total: Some(20),
            ..Default::default()
        };
        assert_eq!(
            values.fill(Some(&base)),
            json!({"current": 4, "total": 20, "target": 8})
        );
    }

    #[test]
    fn fill_defaults_to_zero() {
        let values = QuotaValues {
            target: Some(0),
            ..Default::default()
        };
        assert_eq!(values.fill(None), json!({"current": 0, "total": 0, "target": 0}));
    }

    #[tokio::test]
    async fn create_only_posts_missing_quotas() {
        let server = MockServer::start(vec![
            MockResponse::success(json!([{"name": "q1"}])),
            MockResponse::success(json!([{"name": "q2"}])),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let quotas = QuotaList::new(&client, "demo1");

        let created = quotas
            .create(&[json!({"name": "q1", "total": 5}), json!({"name": "q2", "total": 7})])
            .await
            .unwrap();
        assert_eq!(created, json!([{"name": "q2"}]));

        let reqs = server.requests();
        assert_eq!(reqs[1].path, "/survoxapi/v0/surveys/demo1/quotas/");
        assert_eq!(reqs[1].json(), json!([{"name": "q2", "total": 7}]));
    }

    #[tokio::test]
    async fn create_with_nothing_missing_returns_empty_list() {
        let server = MockServer::start(vec![MockResponse::success(json!([{"name": "q1"}]))]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let created = QuotaList::new(&client, "demo1")
            .create(&[json!({"name": "q1"})])
            .await
            .unwrap();
        assert_eq!(created, json!([]));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_empty_list() {
        let client = Client::with_api_key("h.com", "k").unwrap();
        let err = QuotaList::new(&client, "demo1").create(&[]).await.unwrap_err();
        assert!(matches!(err, Error::MissingParameter("quota_list")));
    }

    #[tokio::test]
    async fn set_fetches_missing_values_from_server() {
        let server = MockServer::start(vec![
            MockResponse::success(json!({"name": "q1", "current": 3, "total": 9, "target": 6})),
            MockResponse::success(json!({})),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let quota = Quota::new(&client, "demo1", "q1");

        quota
            .set(
                QuotaValues {
                    current: Some(0),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[1].method, "PUT");
        let form = reqs[1].form();
        assert_eq!(form["current"], "0");
        assert_eq!(form["total"], "9");
        assert_eq!(form["target"], "6");
    }

    #[tokio::test]
    async fn set_with_nothing_fails() {
        let server = MockServer::start(vec![MockResponse::raw(404, "")]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let err = Quota::new(&client, "demo1", "q1")
            .set(QuotaValues::default(), None)
            .await
            .unwrap_err();
        assert!(err.is_runtime());
    }

    #[tokio::test]
    async fn increment_defaults_to_one_and_keeps_zero() {
        let server = MockServer::start(vec![
            MockResponse::success(json!({})),
            MockResponse::success(json!({})),
            MockResponse::success(json!({})),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let quota = Quota::new(&client, "demo1", "q1");

        quota.increment(None).await.unwrap();
        quota.increment(Some(0)).await.unwrap();
        quota.increment(Some(-2)).await.unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].path, "/survoxapi/v0/surveys/demo1/quotas/q1/increment/");
        assert_eq!(reqs[0].form()["increment"], "1");
        assert_eq!(reqs[1].form()["increment"], "0");
        assert_eq!(reqs[2].form()["increment"], "-2");
    }

    #[tokio::test]
    async fn reset_posts_to_reset_endpoint() {
        let server = MockServer::start(vec![MockResponse::success(json!(null))]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        QuotaList::new(&client, "demo1").reset().await.unwrap();
        assert_eq!(server.requests()[0].path, "/survoxapi/v0/surveys/demo1/quotas-reset/");
    }
}
