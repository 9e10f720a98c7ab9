//! The structured answer the model is instructed to produce.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

use crate::gemini::Schema;

pub const IMAGE_QUALITY: &str = "image_quality";
pub const CONCERNING_SIGNS: &str = "concerning_signs";
pub const RECOMMENDATION: &str = "recommendation";

/// The six graded categories, in display order, with their labels.
pub const ASSESSED_CATEGORIES: [(&str, &str); 6] = [
  ("red_reflex", "Red reflex"),
  ("eye_alignment", "Eye alignment"),
  ("pupils", "Pupils"),
  ("eyelids", "Eyelids"),
  ("cornea_and_iris", "Cornea and iris"),
  ("conjunctiva_and_sclera", "Conjunctiva and sclera"),
];

const ASSESSMENTS: [&str; 3] = ["normal", "possibly_concerning", "not_assessable"];
const RECOMMENDATIONS: [&str; 3] = ["routine_follow_up", "see_eye_doctor_soon", "urgent_evaluation"];

/// Grade of one category. Values outside the agreed set are kept verbatim.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum Assessment {
  Normal,
  PossiblyConcerning,
  NotAssessable,
  Other(String),
}

impl From<String> for Assessment {
  fn from(value: String) -> Self {
    match value.as_str() {
      "normal" => Self::Normal,
      "possibly_concerning" => Self::PossiblyConcerning,
      "not_assessable" => Self::NotAssessable,
      _ => Self::Other(value),
    }
  }
}

impl From<Assessment> for String {
  fn from(value: Assessment) -> Self {
    match value {
      Assessment::Normal => "normal".into(),
      Assessment::PossiblyConcerning => "possibly_concerning".into(),
      Assessment::NotAssessable => "not_assessable".into(),
      Assessment::Other(s) => s,
    }
  }
}

impl Display for Assessment {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Normal => write!(f, "Normal"),
      Self::PossiblyConcerning => write!(f, "Possibly concerning"),
      Self::NotAssessable => write!(f, "Not assessable"),
      Self::Other(s) => write!(f, "{}", s),
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum Recommendation {
  RoutineFollowUp,
  SeeEyeDoctorSoon,
  UrgentEvaluation,
  Other(String),
}

impl From<String> for Recommendation {
  fn from(value: String) -> Self {
    match value.as_str() {
      "routine_follow_up" => Self::RoutineFollowUp,
      "see_eye_doctor_soon" => Self::SeeEyeDoctorSoon,
      "urgent_evaluation" => Self::UrgentEvaluation,
      _ => Self::Other(value),
    }
  }
}

impl From<Recommendation> for String {
  fn from(value: Recommendation) -> Self {
    match value {
      Recommendation::RoutineFollowUp => "routine_follow_up".into(),
      Recommendation::SeeEyeDoctorSoon => "see_eye_doctor_soon".into(),
      Recommendation::UrgentEvaluation => "urgent_evaluation".into(),
      Recommendation::Other(s) => s,
    }
  }
}

impl Display for Recommendation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::RoutineFollowUp => write!(f, "Routine follow-up"),
      Self::SeeEyeDoctorSoon => write!(f, "See an eye doctor soon"),
      Self::UrgentEvaluation => write!(f, "Urgent evaluation"),
      Self::Other(s) => write!(f, "{}", s),
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CategoryResult {
  pub image_quality: String,
  pub red_reflex: Assessment,
  pub eye_alignment: Assessment,
  pub pupils: Assessment,
  pub eyelids: Assessment,
  pub cornea_and_iris: Assessment,
  pub conjunctiva_and_sclera: Assessment,
  pub concerning_signs: String,
  pub recommendation: Recommendation,
}

impl CategoryResult {
  /// The graded categories paired with their display labels.
  pub fn assessments(&self) -> [(&'static str, &Assessment); 6] {
    [
      (ASSESSED_CATEGORIES[0].1, &self.red_reflex),
      (ASSESSED_CATEGORIES[1].1, &self.eye_alignment),
      (ASSESSED_CATEGORIES[2].1, &self.pupils),
      (ASSESSED_CATEGORIES[3].1, &self.eyelids),
      (ASSESSED_CATEGORIES[4].1, &self.cornea_and_iris),
      (ASSESSED_CATEGORIES[5].1, &self.conjunctiva_and_sclera),
    ]
  }

  /// JSON schema of the answer, embedded into the system instruction.
  pub fn schema() -> Schema {
    let schema = Schema::object().with_property(
      IMAGE_QUALITY,
      Schema::string("whether the photos are sharp, well lit and show both eyes"),
      true,
    );

    let schema = ASSESSED_CATEGORIES
      .iter()
      .fold(schema, |schema, (key, label)| {
        schema.with_property(
          *key,
          Schema::one_of(format!("assessment of: {}", label.to_lowercase()), &ASSESSMENTS),
          true,
        )
      });

    schema
      .with_property(
        CONCERNING_SIGNS,
        Schema::string("short summary of anything that looked concerning, or an empty string"),
        true,
      )
      .with_property(
        RECOMMENDATION,
        Schema::one_of("how soon the child should see an eye-care professional", &RECOMMENDATIONS),
        true,
      )
  }
}

/// Something in a decoded answer that does not follow the schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaIssue {
  Missing(String),
  NotAString(String),
  UnexpectedValue { key: String, value: String },
}

impl Display for SchemaIssue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Missing(key) => write!(f, "missing field {}", key),
      Self::NotAString(key) => write!(f, "field {} is not a string", key),
      Self::UnexpectedValue { key, value } => {
        write!(f, "field {} has unexpected value {:?}", key, value)
      }
    }
  }
}

/// Compare a decoded object against `schema`. Advisory only: the caller still gets
/// the object.
pub fn check(schema: &Schema, mapping: &Map<String, Value>) -> Vec<SchemaIssue> {
  let mut issues = vec![];

  for key in schema.required() {
    let value = match mapping.get(key) {
      Some(v) => v,
      None => {
        issues.push(SchemaIssue::Missing(key.clone()));
        continue;
      }
    };

    let value = match value.as_str() {
      Some(s) => s,
      None => {
        issues.push(SchemaIssue::NotAString(key.clone()));
        continue;
      }
    };

    if let Some(Schema::String { values, .. }) = schema.property(key) {
      if !values.is_empty() && !values.iter().any(|v| v == value) {
        issues.push(SchemaIssue::UnexpectedValue {
          key: key.clone(),
          value: value.to_owned(),
        });
      }
    }
  }

  issues
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn sample() -> Value {
    json!({
      "image_quality": "good lighting, both eyes visible",
      "red_reflex": "normal",
      "eye_alignment": "possibly_concerning",
      "pupils": "normal",
      "eyelids": "not_assessable",
      "cornea_and_iris": "normal",
      "conjunctiva_and_sclera": "normal",
      "concerning_signs": "slight inward turn of the left eye",
      "recommendation": "see_eye_doctor_soon"
    })
  }

  #[test]
  fn decodes_all_nine_fields() {
    let result: CategoryResult = serde_json::from_value(sample()).unwrap();
    assert_eq!(result.red_reflex, Assessment::Normal);
    assert_eq!(result.eye_alignment, Assessment::PossiblyConcerning);
    assert_eq!(result.eyelids, Assessment::NotAssessable);
    assert_eq!(result.recommendation, Recommendation::SeeEyeDoctorSoon);
    assert_eq!(result.assessments()[1], ("Eye alignment", &Assessment::PossiblyConcerning));
  }

  #[test]
  fn round_trips_field_for_field() {
    let result: CategoryResult = serde_json::from_value(sample()).unwrap();
    let text = serde_json::to_string(&result).unwrap();
    let again: CategoryResult = serde_json::from_str(&text).unwrap();

    assert_eq!(again, result);
    assert_eq!(serde_json::to_value(&again).unwrap(), sample());
  }

  #[test]
  fn unexpected_labels_pass_through() {
    let mut value = sample();
    value["pupils"] = json!("unequal");
    value["recommendation"] = json!("asap");

    let result: CategoryResult = serde_json::from_value(value.clone()).unwrap();
    assert_eq!(result.pupils, Assessment::Other("unequal".into()));
    assert_eq!(result.recommendation, Recommendation::Other("asap".into()));
    assert_eq!(serde_json::to_value(&result).unwrap(), value);
  }

  #[test]
  fn schema_requires_every_field() {
    let schema = CategoryResult::schema();
    assert_eq!(schema.required().len(), 9);
    assert_eq!(schema.required()[0], IMAGE_QUALITY);
    assert_eq!(schema.required()[8], RECOMMENDATION);
    assert!(check(&schema, sample().as_object().unwrap()).is_empty());
  }

  #[test]
  fn check_reports_but_does_not_reject() {
    let mut value = sample();
    let obj = value.as_object_mut().unwrap();
    obj.remove("eyelids");
    obj.insert("pupils".into(), json!("unequal"));
    obj.insert("concerning_signs".into(), json!(["a", "b"]));

    let issues = check(&CategoryResult::schema(), obj);
    assert_eq!(
      issues,
      vec![
        SchemaIssue::UnexpectedValue {
          key: "pupils".into(),
          value: "unequal".into()
        },
        SchemaIssue::Missing("eyelids".into()),
        SchemaIssue::NotAString("concerning_signs".into()),
      ]
    );
  }
}
