use axum::{
    Router,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(handler::add))
        .route("/bookmarks", get(handler::list_bookmarks))
}
