mod api;
mod content;
mod error;
mod schema;
mod stream;

pub use api::{
  APIError, Client, GenerateRequest, GenerationConfig, HarmCategory, Model, Response,
  SafetySetting, SafetyThreshold, Tool, Usage,
};
pub use content::{Content, Part};
pub use error::Error;
pub use schema::Schema;

#[cfg(test)]
pub(crate) use api::tests::{fake_gemini, GOOD_KEY};
