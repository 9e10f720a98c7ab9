use log::info;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use super::findings::CategoryResult;
use crate::gemini::{GenerationConfig, HarmCategory, SafetySetting, SafetyThreshold, Tool};

/// Everything about a request that does not depend on the submission. Built once at
/// start-up and shared read-only.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
  system_instruction: String,
  tool: Tool,
  generation: GenerationConfig,
  safety: BTreeMap<HarmCategory, SafetyThreshold>,
}

impl AnalysisConfig {
  /// Every harm category starts out unfiltered: photos of children's faces trip the
  /// default filters without any harmful content.
  pub fn new<S: Into<String>>(system_instruction: S, tool: Tool) -> Self {
    Self {
      system_instruction: system_instruction.into(),
      tool,
      generation: GenerationConfig::default(),
      safety: HarmCategory::ALL
        .into_iter()
        .map(|c| (c, SafetyThreshold::BlockNone))
        .collect(),
    }
  }

  /// Read the instruction text from `path` and append the answer schema to it.
  pub fn load(path: &Path, tool: Tool) -> io::Result<Self> {
    let prompt = std::fs::read_to_string(path)?;
    info!(
      "loaded system instruction from {} ({} bytes)",
      path.display(),
      prompt.len()
    );
    Ok(Self::new(with_schema(&prompt), tool))
  }

  #[cfg(test)]
  pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
    self.generation = generation;
    self
  }

  #[cfg(test)]
  pub fn with_threshold(mut self, category: HarmCategory, threshold: SafetyThreshold) -> Self {
    self.safety.insert(category, threshold);
    self
  }

  pub fn system_instruction(&self) -> &str {
    &self.system_instruction
  }

  pub fn tool(&self) -> &Tool {
    &self.tool
  }

  pub fn generation(&self) -> GenerationConfig {
    self.generation
  }

  pub fn safety_settings(&self) -> Vec<SafetySetting> {
    self
      .safety
      .iter()
      .map(|(&category, &threshold)| SafetySetting {
        category,
        threshold,
      })
      .collect()
  }
}

fn with_schema(prompt: &str) -> String {
  format!(
    "{}\n\nRespond only with a JSON object, without any additional text before or after, in the following schema:\n\n{}\n",
    prompt.trim_end(),
    CategoryResult::schema().render()
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn defaults_cover_every_harm_category() {
    let config = AnalysisConfig::new("x", Tool::GoogleSearch {});
    let settings = config.safety_settings();

    assert_eq!(settings.len(), 4);
    assert!(settings
      .iter()
      .all(|s| s.threshold == SafetyThreshold::BlockNone));
    assert_eq!(config.generation(), GenerationConfig::default());
  }

  #[test]
  fn overrides_replace_single_entries() {
    let config = AnalysisConfig::new("x", Tool::GoogleSearch {})
      .with_threshold(HarmCategory::HateSpeech, SafetyThreshold::BlockLowAndAbove)
      .with_generation(GenerationConfig {
        temperature: 0.0,
        top_p: 0.5,
        max_output_tokens: 100,
      });

    let settings = config.safety_settings();
    assert_eq!(settings.len(), 4);
    assert_eq!(
      settings[1],
      SafetySetting {
        category: HarmCategory::HateSpeech,
        threshold: SafetyThreshold::BlockLowAndAbove,
      }
    );
    assert_eq!(config.generation().max_output_tokens, 100);
  }

  #[test]
  fn loaded_instruction_carries_the_schema() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prompt.txt");
    std::fs::write(&path, "You review photos of children's eyes.\n").unwrap();

    let tool = Tool::FileSearch {
      store_names: vec!["fileSearchStores/eyes".into()],
    };
    let config = AnalysisConfig::load(&path, tool.clone()).unwrap();

    let instruction = config.system_instruction();
    assert!(instruction.starts_with("You review photos of children's eyes.\n\nRespond only"));
    assert!(instruction.contains("\"conjunctiva_and_sclera\""));
    assert!(instruction.contains("\"urgent_evaluation\""));
    assert_eq!(config.tool(), &tool);
  }

  #[test]
  fn missing_prompt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = AnalysisConfig::load(&dir.path().join("prompt.txt"), Tool::GoogleSearch {});
    assert!(result.is_err());
  }
}
