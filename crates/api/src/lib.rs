//! Async client for the Survox survey-management REST API.
//!
//! Every endpoint answers with a `{"status": "success", "data": ...}`
//! envelope. [`Client`] resolves endpoints against the session base URL,
//! unwraps the envelope, and maps failures onto [`Error`]. Resource
//! accessors (accounts, clients, surveys, library templates, quotas, sample)
//! are thin wrappers over the raw verbs.

pub mod account;
pub mod admin;
pub mod client;
pub mod clients;
pub mod download;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod library;
pub mod questionnaire;
pub mod quota;
pub mod resources;
pub mod sample;
pub mod survey;
pub mod upload;
pub mod valid;

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

pub use client::{Client, ClientConfig, Credentials, OAuthToken, RequestBody};
pub use error::{Error, Method, RequestFailure};
pub use library::DncType;
pub use quota::QuotaValues;
pub use upload::{ContentRange, DEFAULT_BLOCK_SIZE};
