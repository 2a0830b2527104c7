use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod services;
pub mod token;

pub fn router() -> Router<AppState> {
    handlers::verify_routes()
}
