use anyhow::{anyhow, Context};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::gemini::{Model, Tool};

const DEFAULT_BIND: &str = "127.0.0.1:8501";
const DEFAULT_PROMPT_FILE: &str = "prompt.txt";

/// Process settings, read from the environment (and `.env`) once at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
  pub api_key: String,
  pub model: Model,
  pub prompt_file: PathBuf,
  pub tool: Tool,
  pub bind: SocketAddr,
}

impl Settings {
  pub fn from_env() -> anyhow::Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> anyhow::Result<Self> {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let api_key = var("GEMINI_API_KEY")
      .or_else(|| var("API_KEY"))
      .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))?;

    let model = match var("EYECHECK_MODEL") {
      Some(m) => m.parse().map_err(|e: String| anyhow!(e))?,
      None => Model::default(),
    };

    let prompt_file = var("EYECHECK_PROMPT_FILE")
      .unwrap_or_else(|| DEFAULT_PROMPT_FILE.into())
      .into();

    let tool = match var("EYECHECK_FILE_SEARCH_STORE") {
      Some(store) => Tool::FileSearch {
        store_names: vec![store.trim().to_owned()],
      },
      None => Tool::GoogleSearch {},
    };

    let bind = var("EYECHECK_BIND").unwrap_or_else(|| DEFAULT_BIND.into());
    let bind = bind
      .parse()
      .with_context(|| format!("EYECHECK_BIND {:?} is not a socket address", bind))?;

    Ok(Self {
      api_key,
      model,
      prompt_file,
      tool,
      bind,
    })
  }
}
