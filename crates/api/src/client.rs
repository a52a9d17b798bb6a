//! Survox API session and raw HTTP verbs.
//!
//! A [`Client`] owns the validated base URL and the authorization header.
//! Every verb resolves its endpoint against the base URL, sends the request
//! with the session's auth header, and unwraps the response envelope.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::account::{Account, Accounts};
use crate::admin::Admin;
use crate::clients::{ClientItem, Clients};
use crate::endpoint::{API_VERSION, base_url_from_host, resolve};
use crate::envelope::{check_response, request_error};
use crate::error::{Error, Method};
use crate::library::Library;
use crate::resources::CLIENTS;
use crate::survey::{Survey, Surveys};
use crate::valid::{NAME_MAX_LEN, SURVEY_CODE_MAX_LEN, require_url_field};

const DISGUISED_AUTHORIZATION: &str = "x-disguised-authorization";
const NO_TOKEN: &str = "TokenType no-token-to-send";

/// Connection settings for a [`Client`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Host name or base URL, e.g. `localhost` or `https://h.com/survoxapi/v0`.
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Log every request and response at `info` instead of `debug`.
    #[serde(default = "default_verbose")]
    pub verbose: bool,

    /// Per-request network timeout. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_verbose() -> bool {
    true
}

impl ClientConfig {
    pub fn with_api_key(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: Some(api_key.into()),
            verbose: true,
            ..Default::default()
        }
    }
}

/// Login credentials for the `/auth/login/` exchange.
#[derive(Debug, Clone)]
pub enum Credentials {
    Password { username: String, password: String },
    RefreshToken(String),
}

/// Token pair returned by a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Sent url-encoded. Scalars are stringified, arrays repeat the key,
    /// nested objects are sent as JSON text.
    Form(Map<String, Value>),
    Json(Value),
}

impl RequestBody {
    /// Form body from a JSON object; anything else is sent as JSON.
    pub fn form(value: Value) -> Self {
        match value {
            Value::Object(map) => RequestBody::Form(map),
            other => RequestBody::Json(other),
        }
    }

    pub(crate) fn apply(self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            RequestBody::Empty => req,
            RequestBody::Form(map) => req.form(&form_pairs(&map)),
            RequestBody::Json(value) => req.json(&value),
        }
    }
}

/// Flattens a JSON object into form pairs.
pub(crate) fn form_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), form_scalar(item)));
                }
            }
            other => pairs.push((key.clone(), form_scalar(other))),
        }
    }
    pairs
}

fn form_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        // The service parses Python-style booleans.
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Authenticated Survox API session.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    auth: (HeaderName, HeaderValue),
    token: Option<OAuthToken>,
    verbose: bool,
}

impl Client {
    /// Validates the host and authenticates with an API key or a login.
    pub async fn connect(config: &ClientConfig) -> Result<Self, Error> {
        let mut client = Self::unauthenticated(config)?;

        match (&config.api_key, &config.username, &config.password) {
            (Some(key), _, _) if !key.is_empty() => {
                client.set_authorization("ApiKey", key)?;
            }
            (_, Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                client
                    .login(Credentials::Password {
                        username: username.clone(),
                        password: password.clone(),
                    })
                    .await?;
            }
            _ => {
                return Err(Error::runtime(
                    "Missing authentication credentials.  Must provide api_key or username/password",
                ));
            }
        }

        Ok(client)
    }

    /// Builds a client authenticated with a static API key.
    pub fn with_api_key(host: &str, api_key: &str) -> Result<Self, Error> {
        let mut client = Self::unauthenticated(&ClientConfig::with_api_key(host, api_key))?;
        client.set_authorization("ApiKey", api_key)?;
        Ok(client)
    }

    fn unauthenticated(config: &ClientConfig) -> Result<Self, Error> {
        let base_url = base_url_from_host(&config.host, API_VERSION)?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            auth: no_token_header(),
            token: None,
            verbose: config.verbose,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Token from the last successful login, if any.
    pub fn token(&self) -> Option<&OAuthToken> {
        self.token.as_ref()
    }

    /// Installs `Authorization: <token_type> <value>`.
    pub fn set_authorization(&mut self, token_type: &str, value: &str) -> Result<(), Error> {
        let header = HeaderValue::from_str(&format!("{token_type} {value}"))
            .map_err(|_| Error::runtime("invalid authorization header value"))?;
        self.auth = (AUTHORIZATION, header);
        Ok(())
    }

    /// Drops the authorization header and any login token.
    pub fn clear_authorization(&mut self) {
        self.auth = no_token_header();
        self.token = None;
    }

    /// Logs in and installs the returned bearer token.
    pub async fn login(&mut self, credentials: Credentials) -> Result<&OAuthToken, Error> {
        self.clear_authorization();

        let url = format!("{}/auth/login/", self.base_url);
        let form = match credentials {
            Credentials::Password { username, password } => {
                vec![("username", username), ("password", password)]
            }
            Credentials::RefreshToken(token) => vec![("refresh_token", token)],
        };

        self.log_request(Method::Post, &url);
        let resp = self.http.post(&url).form(&form).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        self.log_response(Method::Post, &url, status, body.len());

        let token = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("data")?.get("token").cloned())
            .filter(|t| t.get("access_token").is_some());
        let Some(token) = token else {
            return Err(request_error(Method::Post, &url, status, &body));
        };
        if token.get("refresh_token").is_none() {
            return Err(Error::runtime(format!(
                "Login failed - POST {url} - {body}"
            )));
        }

        let token: OAuthToken = serde_json::from_value(token)?;
        self.set_authorization("Bearer", &token.access_token)?;
        info!(base_url = %self.base_url, "logged in");
        Ok(self.token.insert(token))
    }

    /// Logs in again with the refresh token from the last login.
    pub async fn refresh(&mut self) -> Result<&OAuthToken, Error> {
        let refresh_token = self
            .token
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .ok_or_else(|| Error::runtime("Missing login credentials"))?;
        self.login(Credentials::RefreshToken(refresh_token)).await
    }

    // -----------------------------------------------------------------------
    // Raw verbs
    // -----------------------------------------------------------------------

    pub async fn get(&self, endpoint: &str) -> Result<Value, Error> {
        self.send(Method::Get, endpoint, RequestBody::Empty).await
    }

    pub async fn post(&self, endpoint: &str, body: RequestBody) -> Result<Value, Error> {
        self.send(Method::Post, endpoint, body).await
    }

    pub async fn put(&self, endpoint: &str, body: RequestBody) -> Result<Value, Error> {
        self.send(Method::Put, endpoint, body).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value, Error> {
        self.send(Method::Delete, endpoint, RequestBody::Empty).await
    }

    /// `GET` that maps 404 to `Ok(None)`.
    pub async fn get_optional(&self, endpoint: &str) -> Result<Option<Value>, Error> {
        match self.get(endpoint).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Service status.
    pub async fn status(&self) -> Result<Value, Error> {
        self.get("/status/").await
    }

    pub async fn health(&self) -> Result<Value, Error> {
        self.status().await
    }

    /// The service's swagger document. Not enveloped.
    pub async fn swagger(&self) -> Result<Value, Error> {
        let url = self.url(Method::Get, "/swagger/");
        let (status, body) = self.send_raw(self.request(Method::Get, &url)).await?;
        self.log_response(Method::Get, &url, status, body.len());
        if status != 200 {
            return Err(request_error(Method::Get, &url, status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    // -----------------------------------------------------------------------
    // Resource accessors
    // -----------------------------------------------------------------------

    pub fn accounts(&self) -> Accounts<'_> {
        Accounts::new(self)
    }

    pub fn account(&self, name: &str) -> Result<Account<'_>, Error> {
        let name = require_url_field("Account name", name, 1, NAME_MAX_LEN)?;
        Ok(Account::new(self, name))
    }

    pub fn clients(&self) -> Clients<'_> {
        Clients::new(self)
    }

    pub fn client(&self, name: &str) -> Result<ClientItem<'_>, Error> {
        let name = require_url_field(CLIENTS.label, name, 1, NAME_MAX_LEN)?;
        Ok(ClientItem::new(self, name))
    }

    pub fn surveys(&self) -> Surveys<'_> {
        Surveys::new(self)
    }

    pub fn survey(&self, surveycode: &str) -> Result<Survey<'_>, Error> {
        let code = require_url_field("Survey surveycode", surveycode, 1, SURVEY_CODE_MAX_LEN)?;
        Ok(Survey::new(self, code))
    }

    pub fn library(&self) -> Library<'_> {
        Library::new(self)
    }

    pub fn admin(&self) -> Admin<'_> {
        Admin::new(self)
    }

    // -----------------------------------------------------------------------
    // Plumbing shared with upload/download
    // -----------------------------------------------------------------------

    /// Resolves `endpoint` and logs the outgoing request.
    pub(crate) fn url(&self, method: Method, endpoint: &str) -> String {
        let url = resolve(&self.base_url, endpoint);
        self.log_request(method, &url);
        url
    }

    /// Request builder carrying the session auth header.
    pub(crate) fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let m = match method {
            Method::Get | Method::Download => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        self.http
            .request(m, url)
            .header(self.auth.0.clone(), self.auth.1.clone())
    }

    /// Sends and returns the status and body text without interpretation.
    pub(crate) async fn send_raw(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<(u16, String), Error> {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok((status, body))
    }

    async fn send(&self, method: Method, endpoint: &str, body: RequestBody) -> Result<Value, Error> {
        let url = self.url(method, endpoint);
        let req = body.apply(self.request(method, &url));
        let (status, text) = self.send_raw(req).await?;
        self.log_response(method, &url, status, text.len());
        check_response(method, &url, status, &text)
    }

    pub(crate) fn log_request(&self, method: Method, url: &str) {
        if self.verbose {
            info!(%method, %url, "request");
        } else {
            debug!(%method, %url, "request");
        }
    }

    pub(crate) fn log_response(&self, method: Method, url: &str, status: u16, len: usize) {
        if self.verbose {
            info!(%method, %url, status, len, "response");
        } else {
            debug!(%method, %url, status, len, "response");
        }
    }
}

fn no_token_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(DISGUISED_AUTHORIZATION),
        HeaderValue::from_static(NO_TOKEN),
    )
}
