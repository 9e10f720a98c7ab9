use axum::extract::multipart::{Multipart, MultipartError};
use log::debug;

use super::view::FormState;
use crate::analysis::{ImageAttachment, SubjectContext, ValidationError};

/// The raw contents of a submitted form.
#[derive(Debug, Default)]
pub struct Submission {
  pub images: Vec<Vec<u8>>,
  pub content_types: Vec<String>,
  pub age: String,
  pub gender: String,
}

impl Submission {
  /// Read every field. Images are kept in the order the browser sent them; file
  /// inputs left empty are dropped.
  pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
    let mut submission = Self::default();

    while let Some(field) = multipart.next_field().await? {
      let name = field.name().unwrap_or_default().to_owned();
      match name.as_str() {
        "images" => {
          let file_name = field.file_name().unwrap_or_default().to_owned();
          let content_type = field.content_type().unwrap_or_default().to_owned();
          let bytes = field.bytes().await?;
          if bytes.is_empty() && file_name.is_empty() {
            continue;
          }
          debug!("received {} ({}, {} bytes)", file_name, content_type, bytes.len());
          submission.images.push(bytes.to_vec());
          submission.content_types.push(content_type);
        }
        "age" => submission.age = field.text().await?,
        "gender" => submission.gender = field.text().await?,
        other => debug!("ignoring form field {:?}", other),
      }
    }

    Ok(submission)
  }

  pub fn form_state(&self) -> FormState {
    FormState {
      age: self.age.clone(),
      gender: self.gender.parse().ok(),
    }
  }

  /// Check the form the way the page asks for it: photos first, then the age.
  pub fn into_parts(self) -> Result<(Vec<ImageAttachment>, SubjectContext), ValidationError> {
    if self.images.is_empty() {
      return Err(ValidationError::NoImages);
    }
    let subject = SubjectContext::new(self.age, self.gender.parse()?)?;
    let attachments = ImageAttachment::pair_up(self.images, self.content_types)?;
    Ok((attachments, subject))
  }
}
