use anyhow::Context;
use env_logger::Builder;
use log::{info, warn};

mod analysis;
mod gemini;
mod settings;
mod web;

use analysis::{AnalysisConfig, Analyzer};
use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  Builder::new()
    .filter_module("eyecheck", log::LevelFilter::Info)
    .format_module_path(false)
    .parse_default_env()
    .init();

  if let Err(e) = dotenv::dotenv() {
    warn!("Failed to load .env file: {}", e);
  }

  let settings = Settings::from_env()?;
  let config = AnalysisConfig::load(&settings.prompt_file, settings.tool.clone())
    .with_context(|| format!("reading {}", settings.prompt_file.display()))?;
  info!("using {} with {:?}", settings.model, config.tool());

  let client = gemini::Client::new(&settings.api_key, settings.model);
  let views = web::Views::new()?;
  let state = web::AppState::new(Analyzer::new(client, config), views);

  web::serve(settings.bind, state).await?;

  Ok(())
}
