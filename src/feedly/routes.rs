use axum::{
    Router,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stream", get(handler::get_stream))
        .route("/subscriptions", get(handler::get_subscriptions))
        .route("/mark-read/:id", post(handler::mark_read))
        .route("/save-later/:id", post(handler::save_for_later))
}
