use serde::Deserialize;

/// Create-note payload: a non-empty title and optional body text.
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl CreateNoteRequest {
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }
}
