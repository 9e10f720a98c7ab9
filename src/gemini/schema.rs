use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Schema {
  Object {
    properties: BTreeMap<String, Schema>,
    required: Vec<String>,
  },
  String {
    description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
  },
}

/// the default Schema is an empty Schema::Object
impl Default for Schema {
  fn default() -> Self {
    Schema::Object {
      properties: BTreeMap::default(),
      required: Vec::default(),
    }
  }
}

impl Schema {
  /// Create a new free text Schema::String
  pub fn string<S: Into<String>>(description: S) -> Self {
    Schema::String {
      description: description.into(),
      values: Vec::default(),
    }
  }

  /// Create a new Schema::String restricted to the given values
  pub fn one_of<S: Into<String>>(description: S, values: &[&str]) -> Self {
    Schema::String {
      description: description.into(),
      values: values.iter().map(|v| v.to_string()).collect(),
    }
  }

  /// Create a new Schema::Object
  pub fn object() -> Self {
    Self::default()
  }

  /// Add a new property to the Schema::Object
  pub fn with_property<S: Into<String>>(
    mut self,
    name: S,
    schema: Schema,
    is_required: bool,
  ) -> Self {
    let name = name.into();
    if let Schema::Object {
      properties,
      required,
      ..
    } = &mut self
    {
      if is_required {
        required.push(name.clone());
      }
      properties.insert(name, schema);
    }
    self
  }

  /// Names of the required properties, empty for anything but an object.
  pub fn required(&self) -> &[String] {
    match self {
      Schema::Object { required, .. } => required,
      _ => &[],
    }
  }

  pub fn property(&self, name: &str) -> Option<&Schema> {
    match self {
      Schema::Object { properties, .. } => properties.get(name),
      _ => None,
    }
  }

  /// Pretty printed JSON, suitable for embedding in an instruction.
  pub fn render(&self) -> String {
    serde_json::to_string_pretty(self).unwrap_or_default()
  }
}
