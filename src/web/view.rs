use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use crate::analysis::{Assessment, CategoryResult, Gender, Interpretation, Outcome, MAX_IMAGES};
use crate::gemini;

const HEADER: &str = include_str!("../../templates/header.hbs");
const FOOTER: &str = include_str!("../../templates/footer.hbs");
const INDEX: &str = include_str!("../../templates/index.hbs");
const RESULT: &str = include_str!("../../templates/result.hbs");

/// What the user typed, so a rejected form comes back filled in.
#[derive(Clone, Debug, Default)]
pub struct FormState {
  pub age: String,
  pub gender: Option<Gender>,
}

#[derive(Serialize)]
struct GenderOption {
  value: &'static str,
  selected: bool,
}

#[derive(Serialize)]
struct IndexPage<'a> {
  max_images: usize,
  warning: Option<&'a str>,
  age: &'a str,
  genders: Vec<GenderOption>,
}

#[derive(Serialize)]
struct Row {
  label: &'static str,
  value: String,
  class: &'static str,
}

#[derive(Serialize, Default)]
struct ResultPage {
  error: Option<String>,
  hint: Option<String>,
  rows: Vec<Row>,
  json: Option<String>,
  issues: Vec<String>,
  raw_text: Option<String>,
  tokens: Option<u64>,
  cost: Option<String>,
  model: Option<String>,
}

pub struct Views {
  hb: Handlebars<'static>,
}

impl Views {
  pub fn new() -> Result<Self, TemplateError> {
    let mut hb = Handlebars::new();
    hb.register_partial("header", HEADER)?;
    hb.register_partial("footer", FOOTER)?;
    hb.register_template_string("index", INDEX)?;
    hb.register_template_string("result", RESULT)?;
    Ok(Self { hb })
  }

  pub fn index(&self, form: &FormState, warning: Option<&str>) -> Result<String, RenderError> {
    let selected = form.gender.unwrap_or(Gender::Male);
    let page = IndexPage {
      max_images: MAX_IMAGES,
      warning,
      age: &form.age,
      genders: Gender::ALL
        .into_iter()
        .map(|g| GenderOption {
          value: g.as_str(),
          selected: g == selected,
        })
        .collect(),
    };
    self.hb.render("index", &page)
  }

  pub fn result(&self, interpretation: &Interpretation) -> Result<String, RenderError> {
    let mut page = ResultPage {
      tokens: interpretation.total_tokens(),
      cost: interpretation.estimated_cost().map(|c| format!("${:.6}", c)),
      model: interpretation.model_version.clone(),
      ..Default::default()
    };

    match &interpretation.outcome {
      Outcome::Structured(findings) => {
        match findings.categories() {
          Some(categories) => page.rows = rows(&categories),
          None => page.json = Some(findings.pretty()),
        }
        page.issues = findings.issues.iter().map(|i| i.to_string()).collect();
      }
      Outcome::Raw(text) => page.raw_text = Some(text.clone()),
    }

    self.hb.render("result", &page)
  }

  pub fn failure(&self, error: &gemini::Error) -> Result<String, RenderError> {
    let hint = if error.is_auth() {
      "Please ensure your GEMINI_API_KEY is correctly set."
    } else {
      "No analysis was performed. Please try submitting the photos again."
    };
    let page = ResultPage {
      error: Some(format!("An error occurred during analysis: {}", error)),
      hint: Some(hint.into()),
      ..Default::default()
    };
    self.hb.render("result", &page)
  }
}

fn assessment_class(assessment: &Assessment) -> &'static str {
  match assessment {
    Assessment::Normal => "normal",
    Assessment::PossiblyConcerning => "possibly_concerning",
    Assessment::NotAssessable => "not_assessable",
    Assessment::Other(_) => "other",
  }
}

fn rows(categories: &CategoryResult) -> Vec<Row> {
  let mut rows = vec![Row {
    label: "Image quality",
    value: categories.image_quality.clone(),
    class: "",
  }];

  rows.extend(categories.assessments().into_iter().map(|(label, a)| Row {
    label,
    value: a.to_string(),
    class: assessment_class(a),
  }));

  rows.push(Row {
    label: "Concerning signs",
    value: categories.concerning_signs.clone(),
    class: "",
  });
  rows.push(Row {
    label: "Recommendation",
    value: categories.recommendation.to_string(),
    class: "",
  });
  rows
}
