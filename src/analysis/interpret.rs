use futures_util::{Stream, StreamExt};
use log::{debug, warn};
use serde_json::{Map, Value};

use super::findings::{self, CategoryResult, SchemaIssue};
use super::util::{fixup_json, strip_code_fence};
use crate::gemini::{self, Usage};

/// Price of one token in USD, used for the cost estimate shown next to a result.
pub const PRICE_PER_TOKEN: f64 = 0.15 / 1_000_000.0;

/// A decoded answer: the object exactly as the model sent it plus anything in it
/// that does not follow the schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Findings {
  pub mapping: Map<String, Value>,
  pub issues: Vec<SchemaIssue>,
}

impl Findings {
  fn new(mapping: Map<String, Value>) -> Self {
    let issues = findings::check(&CategoryResult::schema(), &mapping);
    Self { mapping, issues }
  }

  /// The typed view, when every field is present and a string.
  pub fn categories(&self) -> Option<CategoryResult> {
    serde_json::from_value(Value::Object(self.mapping.clone())).ok()
  }

  pub fn pretty(&self) -> String {
    serde_json::to_string_pretty(&self.mapping).unwrap_or_default()
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
  Structured(Findings),
  /// The answer was not a JSON object; shown verbatim.
  Raw(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Interpretation {
  pub outcome: Outcome,
  pub usage: Option<Usage>,
  pub model_version: Option<String>,
}

impl Interpretation {
  pub fn total_tokens(&self) -> Option<u64> {
    self.usage.as_ref().map(|u| u.total_token_count)
  }

  pub fn estimated_cost(&self) -> Option<f64> {
    self.total_tokens().map(|t| t as f64 * PRICE_PER_TOKEN)
  }
}

/// Drain `stream` and classify the accumulated text. Chunks without content are
/// skipped; any error ends the interpretation, as does a stream with no text at all.
pub async fn interpret<S>(mut stream: S) -> Result<Interpretation, gemini::Error>
where
  S: Stream<Item = Result<gemini::Response, gemini::Error>> + Unpin,
{
  let mut text = String::new();
  let mut fragments = 0usize;
  let mut usage = None;
  let mut model_version = None;
  let mut block_reason = None;

  while let Some(chunk) = stream.next().await {
    let chunk = chunk?;

    if let Some(reason) = chunk.block_reason() {
      warn!("prompt blocked: {}", reason);
      block_reason = Some(reason.to_owned());
    }
    if chunk.usage_metadata.is_some() {
      usage = chunk.usage_metadata.clone();
    }
    if chunk.model_version.is_some() {
      model_version = chunk.model_version.clone();
    }
    match chunk.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
      Some("STOP") | None => {}
      Some(reason) => warn!("generation stopped early: {}", reason),
    }

    match chunk.text() {
      Some(fragment) => {
        fragments += 1;
        text.push_str(&fragment);
      }
      None => debug!("skipping chunk without content"),
    }
  }

  if fragments == 0 || text.trim().is_empty() {
    return Err(gemini::Error::EmptyStream { block_reason });
  }
  debug!("accumulated {} fragments, {} bytes", fragments, text.len());

  Ok(Interpretation {
    outcome: classify(text),
    usage,
    model_version,
  })
}

/// Decide between a structured and a raw outcome for a complete answer.
pub fn classify(text: String) -> Outcome {
  let body = strip_code_fence(&text);
  let parsed = serde_json::from_str::<Value>(body)
    .or_else(|_| serde_json::from_str::<Value>(&fixup_json(body)));

  match parsed {
    Ok(Value::Object(mapping)) => {
      let findings = Findings::new(mapping);
      if !findings.issues.is_empty() {
        warn!(
          "answer does not follow the schema: {}",
          findings
            .issues
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ")
        );
      }
      Outcome::Structured(findings)
    }
    Ok(_) => {
      debug!("answer is JSON but not an object");
      Outcome::Raw(text)
    }
    Err(e) => {
      debug!("answer is not JSON: {}", e);
      Outcome::Raw(text)
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::gemini::APIError;
  use futures_util::stream;
  use serde_json::json;

  pub fn chunk(text: &str) -> Result<gemini::Response, gemini::Error> {
    Ok(
      serde_json::from_value(json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
      }))
      .unwrap(),
    )
  }

  fn control(value: Value) -> Result<gemini::Response, gemini::Error> {
    Ok(serde_json::from_value(value).unwrap())
  }

  pub fn sample_answer() -> Value {
    json!({
      "image_quality": "clear, well lit",
      "red_reflex": "normal",
      "eye_alignment": "normal",
      "pupils": "normal",
      "eyelids": "normal",
      "cornea_and_iris": "normal",
      "conjunctiva_and_sclera": "possibly_concerning",
      "concerning_signs": "mild redness of the right eye",
      "recommendation": "routine_follow_up"
    })
  }

  #[tokio::test]
  async fn accumulates_fragments_before_parsing() {
    let chunks = vec![chunk("{\"a\":1,"), chunk("\"b\":2}")];
    let result = interpret(stream::iter(chunks)).await.unwrap();

    match result.outcome {
      Outcome::Structured(findings) => {
        assert_eq!(Value::Object(findings.mapping), json!({ "a": 1, "b": 2 }));
        assert_eq!(findings.issues.len(), 9);
      }
      other => panic!("expected structured outcome, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn non_json_is_a_raw_outcome() {
    let result = interpret(stream::iter(vec![chunk("not json")])).await.unwrap();
    assert_eq!(result.outcome, Outcome::Raw("not json".into()));
  }

  #[tokio::test]
  async fn zero_fragments_is_an_error() {
    let empty = stream::iter(Vec::<Result<gemini::Response, gemini::Error>>::new());
    assert!(matches!(
      interpret(empty).await,
      Err(gemini::Error::EmptyStream { block_reason: None })
    ));

    let blocked = stream::iter(vec![control(json!({
      "promptFeedback": { "blockReason": "SAFETY" }
    }))]);
    match interpret(blocked).await {
      Err(gemini::Error::EmptyStream { block_reason }) => {
        assert_eq!(block_reason.as_deref(), Some("SAFETY"))
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn blank_text_is_not_an_answer() {
    let chunks = vec![
      chunk(""),
      control(json!({
        "candidates": [{ "content": { "parts": [{ "text": "" }] }, "finishReason": "SAFETY" }]
      })),
    ];
    assert!(matches!(
      interpret(stream::iter(chunks)).await,
      Err(gemini::Error::EmptyStream { block_reason: None })
    ));
  }

  #[tokio::test]
  async fn skips_control_chunks_and_keeps_last_usage() {
    let chunks = vec![
      control(json!({ "candidates": [] })),
      chunk("[1,"),
      control(json!({ "candidates": [{ "finishReason": "STOP" }], "usageMetadata": { "totalTokenCount": 10 } })),
      chunk("2]"),
      control(json!({ "usageMetadata": { "totalTokenCount": 2000000 }, "modelVersion": "gemini-3-pro-preview" })),
    ];
    let result = interpret(stream::iter(chunks)).await.unwrap();

    assert_eq!(result.outcome, Outcome::Raw("[1,2]".into()));
    assert_eq!(result.total_tokens(), Some(2_000_000));
    assert!((result.estimated_cost().unwrap() - 0.3).abs() < 1e-9);
    assert_eq!(result.model_version.as_deref(), Some("gemini-3-pro-preview"));
  }

  #[tokio::test]
  async fn errors_mid_stream_abort_interpretation() {
    let chunks = vec![
      chunk("{\"a\":"),
      Err(gemini::Error::APIError(APIError {
        code: 500,
        message: "internal".into(),
        status: "INTERNAL".into(),
      })),
      chunk("1}"),
    ];
    assert!(matches!(
      interpret(stream::iter(chunks)).await,
      Err(gemini::Error::APIError(_))
    ));
  }

  #[tokio::test]
  async fn complete_answers_decode_to_categories() {
    let text = sample_answer().to_string();
    let (a, b) = text.split_at(text.len() / 2);
    let result = interpret(stream::iter(vec![chunk(a), chunk(b)])).await.unwrap();

    assert_eq!(result.usage, None);
    assert_eq!(result.estimated_cost(), None);
    let findings = match result.outcome {
      Outcome::Structured(f) => f,
      other => panic!("expected structured outcome, got {:?}", other),
    };
    assert!(findings.issues.is_empty());
    assert_eq!(Value::Object(findings.mapping.clone()), sample_answer());
    let categories = findings.categories().unwrap();
    assert_eq!(categories.concerning_signs, "mild redness of the right eye");
  }

  #[test]
  fn fenced_and_multiline_answers_still_parse() {
    let fenced = format!("```json\n{}\n```", sample_answer());
    assert!(matches!(classify(fenced), Outcome::Structured(_)));

    let multiline = "{\"image_quality\": \"blurry\nbut usable\"}".to_string();
    match classify(multiline) {
      Outcome::Structured(f) => assert_eq!(f.mapping["image_quality"], "blurry\nbut usable"),
      other => panic!("expected structured outcome, got {:?}", other),
    }
  }

  #[test]
  fn raw_outcome_keeps_original_text() {
    let text = "```json\n{ broken\n```".to_string();
    assert_eq!(classify(text.clone()), Outcome::Raw(text));
  }
}
