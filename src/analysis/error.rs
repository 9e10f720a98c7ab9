use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::gemini;

/// Bad input shape. Always raised before anything is sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
  NoImages,
  TooManyImages(usize),
  MismatchedTypes { images: usize, types: usize },
  UnsupportedMediaType(String),
  ContentMismatch { declared: String, index: usize },
  EmptyAge,
  UnknownGender(String),
}

impl Display for ValidationError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::NoImages => write!(f, "Please upload at least one image."),
      Self::TooManyImages(n) => write!(
        f,
        "Please upload at most {} images ({} were provided).",
        super::MAX_IMAGES,
        n
      ),
      Self::MismatchedTypes { images, types } => write!(
        f,
        "Received {} images but {} content types.",
        images, types
      ),
      Self::UnsupportedMediaType(t) => {
        write!(f, "Unsupported file type {:?}; please upload PNG or JPEG images.", t)
      }
      Self::ContentMismatch { declared, index } => write!(
        f,
        "Image {} is not a valid {} file.",
        index + 1,
        declared
      ),
      Self::EmptyAge => write!(f, "Please enter the child's age."),
      Self::UnknownGender(g) => write!(f, "Unknown gender selection {:?}.", g),
    }
  }
}

impl std::error::Error for ValidationError {}

/// Why an analysis did not produce an outcome. A response that is not valid JSON is
/// not an error; see `Outcome::Raw`.
#[derive(Debug)]
pub enum AnalysisError {
  Validation(ValidationError),
  Transport(gemini::Error),
}

impl From<ValidationError> for AnalysisError {
  fn from(value: ValidationError) -> Self {
    Self::Validation(value)
  }
}

impl From<gemini::Error> for AnalysisError {
  fn from(value: gemini::Error) -> Self {
    Self::Transport(value)
  }
}

impl Display for AnalysisError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Validation(e) => write!(f, "{}", e),
      Self::Transport(e) => write!(f, "An error occurred during analysis: {}", e),
    }
  }
}

impl std::error::Error for AnalysisError {}
