use regex::{Captures, Regex};
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n(.*?)\n?\s*```\s*$").expect("fence regex"));

static STRING_LITERAL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?s)"(?:[^"\\]|\\.)*""#).expect("string regex"));

/// Models like to wrap JSON answers in a markdown code block; unwrap it.
pub fn strip_code_fence(s: &str) -> &str {
  match FENCE.captures(s).and_then(|caps| caps.get(1)) {
    Some(body) => body.as_str(),
    None => s.trim(),
  }
}

/// Escape raw newlines that appear inside string literals.
pub fn fixup_json(s: &str) -> String {
  STRING_LITERAL
    .replace_all(s, |caps: &Captures| caps[0].replace('\n', "\\n"))
    .into()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_fences() {
    assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("  ```\n[1]\n```\n"), "[1]");
    assert_eq!(strip_code_fence(" {\"a\":1} "), "{\"a\":1}");
    assert_eq!(strip_code_fence("text ```json\n{}\n``` more"), "text ```json\n{}\n``` more");
  }

  #[test]
  fn escapes_newlines_in_strings_only() {
    let fixed = fixup_json("{\n\"a\": \"one\ntwo\"\n}");
    assert_eq!(fixed, "{\n\"a\": \"one\\ntwo\"\n}");
    assert!(serde_json::from_str::<serde_json::Value>(&fixed).is_ok());
  }
}
