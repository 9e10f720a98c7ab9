//! The upload form and result pages.

mod form;
mod view;

pub use view::Views;

use axum::{
  extract::{DefaultBodyLimit, Multipart, State},
  http::StatusCode,
  response::{Html, IntoResponse, Response},
  routing::{get, post},
  Router,
};
use handlebars::RenderError;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::analysis::{AnalysisError, Analyzer};
use form::Submission;
use view::FormState;

/// Six full size phone photos fit comfortably.
const BODY_LIMIT: usize = 48 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
  analyzer: Arc<Analyzer>,
  views: Arc<Views>,
}

impl AppState {
  pub fn new(analyzer: Analyzer, views: Views) -> Self {
    Self {
      analyzer: Arc::new(analyzer),
      views: Arc::new(views),
    }
  }
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(index))
    .route("/analyze", post(analyze))
    .layer(DefaultBodyLimit::max(BODY_LIMIT))
    .with_state(state)
}

pub async fn serve(bind: SocketAddr, state: AppState) -> std::io::Result<()> {
  let listener = TcpListener::bind(bind).await?;
  info!("listening on http://{}", listener.local_addr()?);
  axum::serve(listener, router(state)).await
}

fn page(status: StatusCode, rendered: Result<String, RenderError>) -> Response {
  match rendered {
    Ok(html) => (status, Html(html)).into_response(),
    Err(e) => {
      error!("Rendering page: {}", e);
      (StatusCode::INTERNAL_SERVER_ERROR, "page could not be rendered").into_response()
    }
  }
}

async fn index(State(state): State<AppState>) -> Response {
  page(StatusCode::OK, state.views.index(&FormState::default(), None))
}

async fn analyze(State(state): State<AppState>, multipart: Multipart) -> Response {
  let submission = match Submission::read(multipart).await {
    Ok(submission) => submission,
    Err(e) => {
      warn!("Reading form: {}", e);
      let warning = format!("The upload could not be read: {}", e);
      return page(
        StatusCode::BAD_REQUEST,
        state.views.index(&FormState::default(), Some(&warning)),
      );
    }
  };

  let form = submission.form_state();
  let (attachments, subject) = match submission.into_parts() {
    Ok(parts) => parts,
    Err(e) => {
      info!("Rejected form: {}", e);
      return page(
        StatusCode::UNPROCESSABLE_ENTITY,
        state.views.index(&form, Some(&e.to_string())),
      );
    }
  };

  match state.analyzer.analyze(attachments, &subject).await {
    Ok(interpretation) => page(StatusCode::OK, state.views.result(&interpretation)),
    Err(AnalysisError::Validation(e)) => {
      info!("Rejected submission: {}", e);
      page(
        StatusCode::UNPROCESSABLE_ENTITY,
        state.views.index(&form, Some(&e.to_string())),
      )
    }
    Err(AnalysisError::Transport(e)) => {
      error!("Analysis failed: {}", e);
      page(StatusCode::BAD_GATEWAY, state.views.failure(&e))
    }
  }
}
