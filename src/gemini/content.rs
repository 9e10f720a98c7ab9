use base64::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  User,
  Model,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<Role>,
  #[serde(default)]
  pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
  pub mime_type: String,
  pub data: String,
}

/// A single segment of a content. Gemini sends parts as objects with exactly one
/// payload field set, so unknown payload kinds (function calls, citations) simply
/// leave `text` and `inline_data` empty.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub inline_data: Option<Blob>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thought: Option<bool>,
}

impl Part {
  pub fn text<S: Into<String>>(text: S) -> Self {
    Self {
      text: Some(text.into()),
      ..Default::default()
    }
  }

  /// Create an inline data part, base64 encoding the raw bytes.
  pub fn inline<S: Into<String>>(mime_type: S, bytes: &[u8]) -> Self {
    Self {
      inline_data: Some(Blob {
        mime_type: mime_type.into(),
        data: BASE64_STANDARD.encode(bytes),
      }),
      ..Default::default()
    }
  }

  #[cfg(test)]
  pub fn is_image(&self) -> bool {
    self
      .inline_data
      .as_ref()
      .map(|blob| blob.mime_type.starts_with("image/"))
      .unwrap_or(false)
  }

  pub fn is_thought(&self) -> bool {
    self.thought.unwrap_or(false)
  }
}

impl Content {
  pub fn user(parts: Vec<Part>) -> Self {
    Self {
      role: Some(Role::User),
      parts,
    }
  }

  /// System instructions are sent without a role.
  pub fn system<S: Into<String>>(text: S) -> Self {
    Self {
      role: None,
      parts: vec![Part::text(text)],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn inline_parts_are_base64_encoded() {
    let part = Part::inline("image/png", b"hello");
    let value = serde_json::to_value(&part).unwrap();

    assert_eq!(
      value,
      json!({ "inlineData": { "mimeType": "image/png", "data": "aGVsbG8=" } })
    );
    assert!(part.is_image());
  }

  #[test]
  fn system_content_has_no_role() {
    let value = serde_json::to_value(Content::system("be brief")).unwrap();
    assert_eq!(value, json!({ "parts": [{ "text": "be brief" }] }));
  }

  #[test]
  fn unknown_part_kinds_deserialize_as_empty() {
    let part: Part =
      serde_json::from_value(json!({ "functionCall": { "name": "x", "args": {} } })).unwrap();
    assert_eq!(part, Part::default());
  }
}
