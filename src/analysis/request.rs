use image::ImageFormat;
use std::fmt::Display;
use std::str::FromStr;

use super::{AnalysisConfig, ValidationError, MAX_IMAGES};
use crate::gemini::{Content, GenerateRequest, Part};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MediaType {
  Png,
  Jpeg,
}

impl MediaType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Png => "image/png",
      Self::Jpeg => "image/jpeg",
    }
  }

  fn format(&self) -> ImageFormat {
    match self {
      Self::Png => ImageFormat::Png,
      Self::Jpeg => ImageFormat::Jpeg,
    }
  }
}

impl FromStr for MediaType {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "image/png" => Ok(Self::Png),
      "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
      _ => Err(ValidationError::UnsupportedMediaType(s.to_owned())),
    }
  }
}

/// One uploaded photo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAttachment {
  bytes: Vec<u8>,
  media_type: MediaType,
}

impl ImageAttachment {
  pub fn new(bytes: Vec<u8>, content_type: &str) -> Result<Self, ValidationError> {
    let media_type: MediaType = content_type.parse()?;
    Ok(Self { bytes, media_type })
  }

  /// Pair images with their content types, position by position.
  pub fn pair_up(
    images: Vec<Vec<u8>>,
    content_types: Vec<String>,
  ) -> Result<Vec<Self>, ValidationError> {
    if images.len() != content_types.len() {
      return Err(ValidationError::MismatchedTypes {
        images: images.len(),
        types: content_types.len(),
      });
    }

    images
      .into_iter()
      .zip(content_types)
      .map(|(bytes, content_type)| Self::new(bytes, &content_type))
      .collect()
  }

  pub fn media_type(&self) -> MediaType {
    self.media_type
  }

  pub fn size(&self) -> usize {
    self.bytes.len()
  }

  /// Whether the bytes really are the declared format.
  fn content_matches(&self) -> bool {
    image::guess_format(&self.bytes)
      .map(|format| format == self.media_type.format())
      .unwrap_or(false)
  }

  fn into_part(self) -> Part {
    Part::inline(self.media_type.as_str(), &self.bytes)
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Gender {
  Male,
  Female,
  Other,
  PreferNotToSay,
}

impl Gender {
  pub const ALL: [Gender; 4] = [Self::Male, Self::Female, Self::Other, Self::PreferNotToSay];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Male => "Male",
      Self::Female => "Female",
      Self::Other => "Other",
      Self::PreferNotToSay => "Prefer not to say",
    }
  }
}

impl Display for Gender {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Gender {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| ValidationError::UnknownGender(s.to_owned()))
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectContext {
  age: String,
  gender: Gender,
}

impl SubjectContext {
  pub fn new<S: Into<String>>(age: S, gender: Gender) -> Result<Self, ValidationError> {
    let age = age.into().trim().to_owned();
    if age.is_empty() {
      return Err(ValidationError::EmptyAge);
    }
    Ok(Self { age, gender })
  }

  pub fn age(&self) -> &str {
    &self.age
  }

  pub fn gender(&self) -> Gender {
    self.gender
  }

  fn describe(&self) -> String {
    format!("Age is {}, {}", self.age, self.gender)
  }
}

/// Assemble the provider request: every image in upload order, then the subject
/// description, under the fixed instruction and tool bundle.
pub fn build_request(
  attachments: Vec<ImageAttachment>,
  subject: &SubjectContext,
  config: &AnalysisConfig,
) -> Result<GenerateRequest, ValidationError> {
  match attachments.len() {
    0 => return Err(ValidationError::NoImages),
    n if n > MAX_IMAGES => return Err(ValidationError::TooManyImages(n)),
    _ => {}
  }

  if let Some(index) = attachments.iter().position(|a| !a.content_matches()) {
    return Err(ValidationError::ContentMismatch {
      declared: attachments[index].media_type.as_str().to_owned(),
      index,
    });
  }

  let mut parts = attachments
    .into_iter()
    .map(ImageAttachment::into_part)
    .collect::<Vec<_>>();
  parts.push(Part::text(subject.describe()));

  Ok(GenerateRequest {
    contents: vec![Content::user(parts)],
    system_instruction: Content::system(config.system_instruction()),
    generation_config: config.generation(),
    safety_settings: config.safety_settings(),
    tools: vec![config.tool().clone()],
  })
}
