//! Survey questionnaires, one per interviewing mode.

use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::client::Client;
use crate::error::Error;
use crate::sample::SAMPLE_BLOCK_SIZE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Phone interviewing.
    #[default]
    Cati,
    Online,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Cati => "cati",
            Mode::Online => "online",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A survey's questionnaires. The bare methods act on [`Mode::Cati`].
#[derive(Debug)]
pub struct Questionnaire<'a> {
    client: &'a Client,
    survey: String,
}

impl<'a> Questionnaire<'a> {
    pub(crate) fn new(client: &'a Client, survey: &str) -> Self {
        Self {
            client,
            survey: survey.to_string(),
        }
    }

    pub fn mode(&self, mode: Mode) -> QuestionnaireMode<'a> {
        QuestionnaireMode {
            client: self.client,
            endpoint: format!("/surveys/{}/questionnaire/{mode}/", self.survey),
        }
    }

    pub fn cati(&self) -> QuestionnaireMode<'a> {
        self.mode(Mode::Cati)
    }

    pub fn online(&self) -> QuestionnaireMode<'a> {
        self.mode(Mode::Online)
    }

    pub async fn get(&self) -> Result<Option<Value>, Error> {
        self.cati().get().await
    }

    pub async fn upload(&self, path: &Path, block_size: Option<usize>) -> Result<Value, Error> {
        self.cati().upload(path, block_size).await
    }

    pub async fn delete(&self) -> Result<Value, Error> {
        self.cati().delete().await
    }
}

/// `/surveys/{s}/questionnaire/{mode}/`.
#[derive(Debug)]
pub struct QuestionnaireMode<'a> {
    client: &'a Client,
    endpoint: String,
}

impl QuestionnaireMode<'_> {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn get(&self) -> Result<Option<Value>, Error> {
        self.client.get_optional(&self.endpoint).await
    }

    /// Uploads a questionnaire source file. `None` uses [`SAMPLE_BLOCK_SIZE`].
    pub async fn upload(&self, path: &Path, block_size: Option<usize>) -> Result<Value, Error> {
        self.client
            .upload(
                &format!("{}upload/", self.endpoint),
                path,
                Some(block_size.unwrap_or(SAMPLE_BLOCK_SIZE)),
            )
            .await
    }

    pub async fn delete(&self) -> Result<Value, Error> {
        self.client.delete(&self.endpoint).await
    }
}
