use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug)]
pub enum Error {
  HttpError(reqwest::Error),
  JsonError(serde_json::Error),
  APIError(super::api::APIError),
  /// The stream finished without a single text fragment.
  EmptyStream { block_reason: Option<String> },
}

impl Error {
  /// True when the provider rejected our credential.
  pub fn is_auth(&self) -> bool {
    match self {
      Self::APIError(e) => e.is_auth(),
      Self::HttpError(e) => e
        .status()
        .map(|s| s.as_u16() == 401 || s.as_u16() == 403)
        .unwrap_or(false),
      _ => false,
    }
  }
}

impl From<reqwest::Error> for Error {
  fn from(value: reqwest::Error) -> Self {
    Self::HttpError(value)
  }
}

impl From<serde_json::Error> for Error {
  fn from(value: serde_json::Error) -> Self {
    Self::JsonError(value)
  }
}

impl From<super::api::APIError> for Error {
  fn from(value: super::api::APIError) -> Self {
    Self::APIError(value)
  }
}

impl Display for Error {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::HttpError(e) => write!(f, "HTTP Error: {}", e),
      Self::JsonError(e) => write!(f, "JSON Error: {}", e),
      Self::APIError(e) => write!(f, "API Error: {}", e),
      Self::EmptyStream { block_reason: None } => write!(f, "Empty response from model"),
      Self::EmptyStream {
        block_reason: Some(reason),
      } => write!(f, "Empty response from model (prompt blocked: {})", reason),
    }
  }
}

impl std::error::Error for Error {}
