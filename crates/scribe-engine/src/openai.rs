//! Chat-completions client used as the production [`TextGenerator`].

use std::time::Duration;

use reqwest::Client;
use scribe_core::generator::TextGenerator;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum OpenAiError {
  #[error("no API key configured for text generation")]
  MissingApiKey,

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("completion request failed with status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("completion response contained no text")]
  EmptyReply,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
  model:    &'a str,
  messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role:    &'a str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
  #[serde(default)]
  content: Option<String>,
}

/// Sends each prompt as a single user message to `{base_url}/chat/completions`.
///
/// The HTTP client is built on first use. A failed build (including a missing
/// API key) is returned to that caller and retried on the next call.
pub struct OpenAiGenerator {
  api_key:  String,
  model:    String,
  base_url: String,
  client:   OnceCell<Client>,
}

impl OpenAiGenerator {
  pub fn new(api_key: String, model: String, base_url: String) -> Self {
    Self { api_key, model, base_url, client: OnceCell::new() }
  }

  async fn client(&self) -> Result<&Client, OpenAiError> {
    self
      .client
      .get_or_try_init(|| async {
        if self.api_key.is_empty() {
          return Err(OpenAiError::MissingApiKey);
        }
        Ok(Client::builder().timeout(Duration::from_secs(120)).build()?)
      })
      .await
  }

  fn url(&self) -> String {
    format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
  }
}

impl TextGenerator for OpenAiGenerator {
  type Error = OpenAiError;

  #[instrument(skip_all, fields(model = %self.model))]
  async fn complete(&self, prompt: String) -> Result<String, OpenAiError> {
    let client = self.client().await?;
    let body = ChatRequest {
      model:    &self.model,
      messages: [ChatMessage { role: "user", content: &prompt }],
    };

    let resp = client.post(self.url()).bearer_auth(&self.api_key).json(&body).send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(OpenAiError::Status { status: status.as_u16(), body });
    }

    let reply: ChatResponse = resp.json().await?;
    reply
      .choices
      .into_iter()
      .next()
      .and_then(|choice| choice.message.content)
      .filter(|text| !text.is_empty())
      .ok_or(OpenAiError::EmptyReply)
  }
}
