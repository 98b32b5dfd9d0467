use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::{APIResponse, BookmarkParams, ErrorResponse, InstapaperAddRequest, ItemsResponse};
use crate::dedup::instapaper_fingerprint;
use crate::error::{HandlerError, InstapaperError};
use crate::handler::{AppState, duplicate_response};

const DEFAULT_FOLDER: &str = "unread";
const DEFAULT_LIMIT: u32 = 25;
const MAX_LIMIT: u32 = 500;

fn instapaper_error(err: InstapaperError, fallback: &str) -> Response {
    let (status, message) = match &err {
        InstapaperError::Configuration(_) => (
            StatusCode::UNAUTHORIZED,
            "Instapaper credentials not configured",
        ),
        InstapaperError::ProviderRejected { status, .. } if *status == StatusCode::BAD_REQUEST => {
            (StatusCode::BAD_REQUEST, "Invalid request to Instapaper")
        }
        InstapaperError::ProviderRejected { status, .. }
            if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
        {
            (StatusCode::FORBIDDEN, "Invalid Instapaper credentials")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, fallback),
    };

    tracing::error!(error = %HandlerError::from(err), "instapaper request failed");
    (status, Json(ErrorResponse::new_from_msg(message))).into_response()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn add(State(state): State<AppState>, Json(payload): Json<InstapaperAddRequest>) -> Response {
    let Some(url) = non_empty(payload.url).or(non_empty(payload.origin_url)) else {
        let err = HandlerError::ValidationError("neither url nor originUrl given".to_string());
        tracing::warn!(error = %err, "rejecting instapaper save");
        return crate::bad_request(ErrorResponse::new_from_msg("URL is required"));
    };

    let title = non_empty(payload.title);
    let article_id = non_empty(payload.id);

    let fingerprint = instapaper_fingerprint(
        article_id.as_deref().unwrap_or(&url),
        title.as_deref().unwrap_or_default(),
    );
    if state.dedup.is_duplicate_request(&fingerprint) {
        return duplicate_response();
    }

    tracing::info!(
        call_id = payload.call_id.as_deref().unwrap_or("unknown"),
        url = %url,
        "processing instapaper save"
    );

    let description = non_empty(payload.description).or(non_empty(payload.summary));
    let result = state
        .instapaper
        .add_to_instapaper(&url, title.as_deref(), description.as_deref())
        .await;

    match result {
        Ok(()) => {
            if let Some(id) = &article_id {
                state.articles.remove(id);
            }
            crate::good_response(APIResponse::new_from_msg("Article saved to Instapaper"))
        }
        Err(e) => instapaper_error(e, "Failed to add article to Instapaper"),
    }
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    Query(params): Query<BookmarkParams>,
) -> Response {
    let folder = non_empty(params.folder).unwrap_or_else(|| DEFAULT_FOLDER.to_string());
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    match state.instapaper.list_bookmarks(&folder, limit).await {
        Ok(bookmarks) => (
            StatusCode::OK,
            Json(ItemsResponse {
                items: bookmarks,
                continuation: None,
            }),
        )
            .into_response(),
        Err(e) => instapaper_error(e, "Failed to fetch Instapaper bookmarks"),
    }
}
