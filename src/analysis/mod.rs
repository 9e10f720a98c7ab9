//! Turning a form submission into a model request and the model's answer into
//! something displayable.

mod config;
mod error;
mod findings;
mod interpret;
mod request;
mod util;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, ValidationError};
pub use findings::{Assessment, CategoryResult};
pub use interpret::{classify, interpret, Interpretation, Outcome};
pub use request::{build_request, Gender, ImageAttachment, SubjectContext};

use log::{debug, info};
use std::sync::Arc;

use crate::gemini::Client;

/// Most photos accepted in one submission.
pub const MAX_IMAGES: usize = 6;

pub struct Analyzer {
  client: Client,
  config: Arc<AnalysisConfig>,
}

impl Analyzer {
  pub fn new(client: Client, config: AnalysisConfig) -> Self {
    Self {
      client,
      config: Arc::new(config),
    }
  }

  /// Validate, send and interpret one submission. Validation failures never reach
  /// the network.
  pub async fn analyze(
    &self,
    attachments: Vec<ImageAttachment>,
    subject: &SubjectContext,
  ) -> Result<Interpretation, AnalysisError> {
    let bytes: usize = attachments.iter().map(ImageAttachment::size).sum();
    let types = attachments
      .iter()
      .map(|a| a.media_type().as_str())
      .collect::<Vec<_>>()
      .join(", ");
    debug!("subject: age {}, {}", subject.age(), subject.gender());
    let request = build_request(attachments, subject, &self.config)?;

    info!("analyzing [{}], {} bytes, with {}", types, bytes, self.client.model());
    let stream = self.client.stream_generate_content(&request).await?;
    let interpretation = interpret(stream).await?;

    match &interpretation.outcome {
      Outcome::Structured(findings) => info!(
        "structured answer, {} schema issue(s), {:?} tokens",
        findings.issues.len(),
        interpretation.total_tokens()
      ),
      Outcome::Raw(text) => info!(
        "raw answer ({} bytes), {:?} tokens",
        text.len(),
        interpretation.total_tokens()
      ),
    }
    if let Some(usage) = &interpretation.usage {
      debug!(
        "tokens: {} prompt, {} candidates, {} total",
        usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
      );
    }

    Ok(interpretation)
  }
}

#[cfg(test)]
mod tests {
  use super::interpret::tests::{chunk, sample_answer};
  use super::request::tests::{JPEG, PNG};
  use super::*;
  use crate::gemini::{Model, Tool};
  use futures_util::stream;
  use serde_json::Value;

  #[tokio::test]
  async fn builds_then_interprets_a_submission() {
    let config = AnalysisConfig::new("inspect the eyes", Tool::GoogleSearch {});
    let attachments = ImageAttachment::pair_up(
      vec![JPEG.to_vec(), PNG.to_vec()],
      vec!["image/jpeg".into(), "image/png".into()],
    )
    .unwrap();
    let subject = SubjectContext::new("5", "Male".parse().unwrap()).unwrap();

    let request = build_request(attachments, &subject, &config).unwrap();
    let parts = &request.contents[0].parts;
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].inline_data.as_ref().unwrap().mime_type, "image/jpeg");
    assert_eq!(parts[1].inline_data.as_ref().unwrap().mime_type, "image/png");
    assert_eq!(parts[2].text.as_deref(), Some("Age is 5, Male"));

    let answer = sample_answer().to_string();
    let fragments = answer
      .as_bytes()
      .chunks(17)
      .map(|c| chunk(std::str::from_utf8(c).unwrap()))
      .collect::<Vec<_>>();
    let interpretation = interpret(stream::iter(fragments)).await.unwrap();

    match interpretation.outcome {
      Outcome::Structured(findings) => {
        assert_eq!(Value::Object(findings.mapping), sample_answer())
      }
      other => panic!("expected structured outcome, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn validation_fails_before_any_request() {
    let analyzer = Analyzer::new(
      Client::new("key", Model::Gemini25Flash),
      AnalysisConfig::new("x", Tool::GoogleSearch {}),
    );
    let subject = SubjectContext::new("5", Gender::Other).unwrap();

    let result = analyzer.analyze(vec![], &subject).await;
    assert!(matches!(
      result,
      Err(AnalysisError::Validation(ValidationError::NoImages))
    ));
  }
}
