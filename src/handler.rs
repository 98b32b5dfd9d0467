use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{APIResponse, ErrorResponse, LoginRequest};
use crate::articles::ArticleCache;
use crate::dedup::IdempotencyCache;
use crate::feedly::{self, FeedProvider};
use crate::instapaper::{self, InstapaperClient};
use crate::session::{SessionStore, require_session};

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<dyn FeedProvider>,
    pub instapaper: Arc<InstapaperClient>,
    pub dedup: Arc<IdempotencyCache>,
    pub articles: Arc<ArticleCache>,
    pub sessions: Arc<SessionStore>,
    pub stream_count: u32,
}

pub fn router(state: AppState) -> Router {
    let guard = middleware::from_fn_with_state(state.clone(), require_session);

    Router::new()
        .route("/", get(healthcheck))
        .route("/api/login", post(login))
        .nest("/api/feedly", feedly::routes().route_layer(guard.clone()))
        .nest("/api/instapaper", instapaper::routes().route_layer(guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(APIResponse::new_from_msg("ok"))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Response {
    match state.sessions.login(&payload.password) {
        Some(session_id) => {
            info!("login succeeded");
            (
                jar.add(SessionStore::cookie(session_id)),
                Json(APIResponse::new_from_msg("logged in")),
            )
                .into_response()
        }
        None => {
            info!("login rejected");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new_from_msg("Invalid password")),
            )
                .into_response()
        }
    }
}

/// Synthesized answer for an action already handled within the dedup window.
pub fn duplicate_response() -> Response {
    crate::good_response(APIResponse::new_from_msg("Duplicate request ignored"))
}
