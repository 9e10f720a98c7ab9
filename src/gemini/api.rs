use super::stream::{decode_events, ChunkStream};
use super::Content;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Model {
  #[serde(rename = "gemini-3-pro-preview")]
  Gemini3ProPreview,
  #[serde(rename = "gemini-2.5-pro")]
  Gemini25Pro,
  #[serde(rename = "gemini-2.5-flash")]
  Gemini25Flash,
}

impl Model {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Gemini3ProPreview => "gemini-3-pro-preview",
      Self::Gemini25Pro => "gemini-2.5-pro",
      Self::Gemini25Flash => "gemini-2.5-flash",
    }
  }
}

impl Default for Model {
  fn default() -> Self {
    Self::Gemini3ProPreview
  }
}

impl Display for Model {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Model {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    [Self::Gemini3ProPreview, Self::Gemini25Pro, Self::Gemini25Flash]
      .into_iter()
      .find(|m| m.as_str() == s.trim())
      .ok_or_else(|| format!("unknown model {:?}", s))
  }
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
  pub temperature: f32,
  pub top_p: f32,
  pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self {
      temperature: 0.2,
      top_p: 0.95,
      max_output_tokens: 8192,
    }
  }
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HarmCategory {
  #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
  Harassment,
  #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
  HateSpeech,
  #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
  SexuallyExplicit,
  #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
  DangerousContent,
}

impl HarmCategory {
  pub const ALL: [HarmCategory; 4] = [
    Self::Harassment,
    Self::HateSpeech,
    Self::SexuallyExplicit,
    Self::DangerousContent,
  ];
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyThreshold {
  BlockLowAndAbove,
  BlockMediumAndAbove,
  BlockOnlyHigh,
  BlockNone,
  Off,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct SafetySetting {
  pub category: HarmCategory,
  pub threshold: SafetyThreshold,
}

/// Retrieval augmentation offered to the model. Only one kind is sent per request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
  FileSearch {
    #[serde(rename = "fileSearchStoreNames")]
    store_names: Vec<String>,
  },
  GoogleSearch {},
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
  pub contents: Vec<Content>,
  pub system_instruction: Content,
  pub generation_config: GenerationConfig,
  pub safety_settings: Vec<SafetySetting>,
  pub tools: Vec<Tool>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
  #[serde(default)]
  pub prompt_token_count: u64,
  #[serde(default)]
  pub candidates_token_count: u64,
  #[serde(default)]
  pub total_token_count: u64,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
  pub content: Option<Content>,
  pub finish_reason: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
  pub block_reason: Option<String>,
}

/// One chunk of a streamed generation.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Response {
  #[serde(default)]
  pub candidates: Vec<Candidate>,
  pub prompt_feedback: Option<PromptFeedback>,
  pub usage_metadata: Option<Usage>,
  pub model_version: Option<String>,
}

impl Response {
  /// The answer text carried by this chunk, or None when the chunk has no content
  /// parts at all. Thought parts are not part of the answer.
  pub fn text(&self) -> Option<String> {
    let parts = &self.candidates.first()?.content.as_ref()?.parts;
    let texts = parts
      .iter()
      .filter(|p| !p.is_thought())
      .filter_map(|p| p.text.as_deref())
      .filter(|t| !t.is_empty())
      .collect::<Vec<_>>();

    if texts.is_empty() {
      None
    } else {
      Some(texts.concat())
    }
  }

  pub fn block_reason(&self) -> Option<&str> {
    self
      .prompt_feedback
      .as_ref()
      .and_then(|f| f.block_reason.as_deref())
  }
}

#[derive(Deserialize, Clone, Debug)]
pub struct APIError {
  pub code: u16,
  pub message: String,
  #[serde(default)]
  pub status: String,
}

impl APIError {
  pub fn is_auth(&self) -> bool {
    self.code == 401
      || self.code == 403
      || self.status == "UNAUTHENTICATED"
      || self.status == "PERMISSION_DENIED"
      || self.message.contains("API key not valid")
  }

  /// Decode an error body. Gemini wraps errors in `{"error": {..}}`, sometimes inside
  /// an array; anything else becomes a plain message.
  pub fn from_body(code: u16, body: &str) -> Self {
    #[derive(Deserialize)]
    struct Envelope {
      error: APIError,
    }

    if let Ok(Envelope { error }) = serde_json::from_str(body) {
      return error;
    }
    if let Ok(mut list) = serde_json::from_str::<Vec<Envelope>>(body) {
      if !list.is_empty() {
        return list.swap_remove(0).error;
      }
    }

    Self {
      code,
      message: body.trim().to_owned(),
      status: String::new(),
    }
  }
}

impl Display for APIError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.status.is_empty() {
      write!(f, "{} ({})", self.message, self.code)
    } else {
      write!(f, "{} ({} {})", self.message, self.code, self.status)
    }
  }
}

impl std::error::Error for APIError {}

const API_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

pub struct Client {
  api_key: String,
  model: Model,
  base_url: String,
  http: reqwest::Client,
}

impl Client {
  pub fn new<S: Into<String>>(api_key: S, model: Model) -> Self {
    Self {
      api_key: api_key.into(),
      model,
      base_url: API_URL.into(),
      http: reqwest::Client::new(),
    }
  }

  /// Point the client at another server, such as a local stand-in.
  #[cfg(test)]
  pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
    self.base_url = base_url.into();
    self
  }

  pub fn model(&self) -> Model {
    self.model
  }

  fn endpoint(&self) -> String {
    format!(
      "{}/models/{}:streamGenerateContent?alt=sse",
      self.base_url.trim_end_matches('/'),
      self.model
    )
  }

  /// Start a streamed generation. Errors returned here mean nothing was generated;
  /// errors inside the stream mean the transfer broke part way.
  pub async fn stream_generate_content(
    &self,
    request: &GenerateRequest,
  ) -> Result<ChunkStream, super::Error> {
    let body = serde_json::to_string(request)?;
    debug!("POST {} ({} bytes)", self.endpoint(), body.len());

    let resp = self
      .http
      .post(self.endpoint())
      .header("Content-Type", "application/json")
      .header("x-goog-api-key", &self.api_key)
      .body(body)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await?;
      let error = APIError::from_body(status.as_u16(), &body);
      warn!("generation rejected: {}", error);
      return Err(error.into());
    }

    Ok(decode_events(resp.bytes_stream()))
  }
}
