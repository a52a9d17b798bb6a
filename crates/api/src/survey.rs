//! Surveys and the per-survey resources hanging off them.

use serde_json::{Value, json};
use tracing::info;

use crate::client::{Client, RequestBody};
use crate::error::Error;
use crate::questionnaire::Questionnaire;
use crate::quota::{Quota, QuotaList};
use crate::resources::is_empty_body;
use crate::sample::SurveySample;
use crate::valid::{NAME_MAX_LEN, SURVEY_CODE_MAX_LEN, require_url_field};

const SURVEYS_ENDPOINT: &str = "/surveys/";
const SURVEYS_STATUS_ENDPOINT: &str = "/surveys-status/";

#[derive(Debug)]
pub struct Surveys<'a> {
    client: &'a Client,
}

impl<'a> Surveys<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Value, Error> {
        self.client.get(SURVEYS_ENDPOINT).await
    }

    /// Status entries of every survey.
    pub async fn status(&self) -> Result<Value, Error> {
        self.client.get(SURVEYS_STATUS_ENDPOINT).await
    }

    /// Creates a survey from `info`, which must carry a `surveycode`.
    pub async fn create(&self, info: Value, exists_okay: bool) -> Result<Value, Error> {
        if is_empty_body(&info) {
            return Err(Error::MissingParameter("survey_info"));
        }
        let code = info
            .get("surveycode")
            .and_then(Value::as_str)
            .ok_or(Error::MissingParameter("surveycode"))?;
        let code = require_url_field("Survey surveycode", code, 1, SURVEY_CODE_MAX_LEN)?;

        let existing = self
            .client
            .get_optional(&format!("{SURVEYS_ENDPOINT}{code}/"))
            .await?;
        if let Some(existing) = existing {
            if !exists_okay {
                return Err(Error::runtime(format!("Survey already exists: {code}")));
            }
            return Ok(existing);
        }

        let created = self
            .client
            .post(SURVEYS_ENDPOINT, RequestBody::form(info))
            .await?;
        info!(survey = %code, "survey created");
        Ok(created)
    }
}

/// One survey, `/surveys/{surveycode}/`.
#[derive(Debug)]
pub struct Survey<'a> {
    client: &'a Client,
    code: String,
    endpoint: String,
}

impl<'a> Survey<'a> {
    pub(crate) fn new(client: &'a Client, code: String) -> Self {
        Self {
            client,
            endpoint: format!("{SURVEYS_ENDPOINT}{code}/"),
            code,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn get(&self) -> Result<Option<Value>, Error> {
        self.client.get_optional(&self.endpoint).await
    }

    /// This survey's entry in the status list, `{}` when it has none.
    pub async fn status(&self) -> Result<Value, Error> {
        let all = self.client.get(SURVEYS_STATUS_ENDPOINT).await?;
        let found = all.as_array().and_then(|list| {
            list.iter()
                .find(|s| s.get("surveycode").and_then(Value::as_str) == Some(self.code.as_str()))
                .cloned()
        });
        Ok(found.unwrap_or_else(|| json!({})))
    }

    pub async fn sample(&self) -> Result<SurveySample<'a>, Error> {
        self.require().await?;
        Ok(SurveySample::new(self.client, &self.code))
    }

    pub async fn questionnaire(&self) -> Result<Questionnaire<'a>, Error> {
        self.require().await?;
        Ok(Questionnaire::new(self.client, &self.code))
    }

    pub async fn quotas(&self) -> Result<QuotaList<'a>, Error> {
        self.require().await?;
        Ok(QuotaList::new(self.client, &self.code))
    }

    pub async fn quota(&self, name: &str) -> Result<Quota<'a>, Error> {
        if name.is_empty() {
            return Err(Error::MissingParameter("quota name"));
        }
        let name = require_url_field("Quota name", name, 1, NAME_MAX_LEN)?;
        self.require().await?;
        Ok(Quota::new(self.client, &self.code, &name))
    }

    /// Fetches the survey; a missing survey surfaces as `NotFound`.
    async fn require(&self) -> Result<Value, Error> {
        self.client.get(&self.endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockResponse, MockServer};

    #[tokio::test]
    async fn quota_name_is_validated_before_any_request() {
        let server = MockServer::start(vec![MockResponse::success(json!({"surveycode": "s1"}))]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let survey = client.survey("s1").unwrap();

        for bad in ["a/b", "../../accounts/x", "9lives"] {
            let err = survey.quota(bad).await.unwrap_err();
            assert!(err.is_runtime(), "{bad}: {err}");
        }
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn quota_name_is_lower_cased_into_endpoint() {
        let server = MockServer::start(vec![
            MockResponse::success(json!({"surveycode": "s1"})),
            MockResponse::success(json!({"name": "male"})),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();

        let quota = client.survey("s1").unwrap().quota("Male").await.unwrap();
        assert_eq!(quota.name(), "male");
        quota.get().await.unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[1].path, "/survoxapi/v0/surveys/s1/quotas/male/");
    }

    #[tokio::test]
    async fn create_requires_surveycode() {
        let client = Client::with_api_key("h.com", "k").unwrap();
        let err = client
            .surveys()
            .create(json!({"client": "acme"}), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter("surveycode")));

        let err = client.surveys().create(json!({}), true).await.unwrap_err();
        assert!(matches!(err, Error::MissingParameter("survey_info")));
    }

    #[tokio::test]
    async fn create_posts_survey_info() {
        let server = MockServer::start(vec![
            MockResponse::raw(404, ""),
            MockResponse::success(json!({"surveycode": "demo1"})),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();

        client
            .surveys()
            .create(
                json!({"surveycode": "demo1", "client": "acme", "survox_complete_target": 500}),
                false,
            )
            .await
            .unwrap();

        let reqs = server.requests();
        assert_eq!(reqs[0].path, "/survoxapi/v0/surveys/demo1/");
        assert_eq!(reqs[1].path, "/survoxapi/v0/surveys/");
        let form = reqs[1].form();
        assert_eq!(form["surveycode"], "demo1");
        assert_eq!(form["survox_complete_target"], "500");
    }

    #[tokio::test]
    async fn create_existing_without_exists_okay_fails() {
        let server = MockServer::start(vec![MockResponse::success(json!({"surveycode": "demo1"}))]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let err = client
            .surveys()
            .create(json!({"surveycode": "demo1"}), false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error[0] - Survey already exists: demo1");
    }

    #[tokio::test]
    async fn status_finds_entry_or_empty() {
        let statuses = json!([{"surveycode": "demo1", "status": {"sample": true}}]);
        let server = MockServer::start(vec![
            MockResponse::success(statuses.clone()),
            MockResponse::success(statuses),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();

        let status = client.survey("demo1").unwrap().status().await.unwrap();
        assert_eq!(status["status"]["sample"], true);
        let status = client.survey("other").unwrap().status().await.unwrap();
        assert_eq!(status, json!({}));
    }

    #[tokio::test]
    async fn sub_resources_require_existing_survey() {
        let server = MockServer::start(vec![MockResponse::raw(404, "no survey")]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let err = client
            .survey("missing")
            .unwrap()
            .sample()
            .await
            .err()
            .unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn empty_quota_name_is_rejected_locally() {
        let server = MockServer::start(vec![]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let err = client.survey("demo1").unwrap().quota("").await.err().unwrap();
        assert!(matches!(err, Error::MissingParameter("quota name")));
        assert!(server.requests().is_empty());
    }
}
