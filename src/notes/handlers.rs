use axum::{http::StatusCode, routing::post, Json, Router};
use tracing::{debug, instrument, warn};

use super::dto::CreateNoteRequest;
use crate::{error::AppError, state::AppState};

pub fn note_routes() -> Router<AppState> {
    Router::new().route("/api/notes", post(create_note))
}

/// POST /api/notes
// TODO: persist notes once the notes table and its ownership model exist.
#[instrument(skip(payload))]
pub async fn create_note(payload: Option<Json<CreateNoteRequest>>) -> Result<StatusCode, AppError> {
    match payload {
        Some(Json(note)) if note.is_valid() => {
            debug!(title_len = note.title.len(), has_content = note.content.is_some(), "note accepted");
            Ok(StatusCode::NO_CONTENT)
        }
        _ => {
            warn!("invalid note payload");
            Err(AppError::validation("invalid input"))
        }
    }
}
