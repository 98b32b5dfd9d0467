use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::provider::StreamQuery;
use crate::api::{APIResponse, ActionRequest, ErrorResponse, ItemsResponse, StreamParams};
use crate::dedup::{mark_read_fingerprint, save_later_fingerprint};
use crate::error::{FeedError, HandlerError};
use crate::handler::{AppState, duplicate_response};
use crate::model::ArticlePage;

fn feed_error(err: FeedError) -> Response {
    let status = match &err {
        FeedError::Provider { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = err.to_string();
    tracing::error!(error = %HandlerError::from(err), "feed request failed");
    (status, Json(ErrorResponse::new_from_msg(&message))).into_response()
}

fn page_response(page: ArticlePage) -> Response {
    (
        StatusCode::OK,
        Json(ItemsResponse {
            items: page.items,
            continuation: page.continuation,
        }),
    )
        .into_response()
}

fn call_id(body: Option<Json<ActionRequest>>) -> String {
    body.and_then(|Json(b)| b.call_id)
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn get_stream(State(state): State<AppState>, Query(params): Query<StreamParams>) -> Response {
    let query = StreamQuery::new(params.count.unwrap_or(state.stream_count))
        .with_continuation(params.continuation);

    // Only the default-sized first page is cached; continuation pages and
    // other counts always go upstream.
    let cacheable = query.continuation.is_none()
        && query.count == StreamQuery::new(state.stream_count).count;

    if cacheable {
        if let Some(page) = state.articles.get_fresh() {
            tracing::info!(count = page.items.len(), "serving cached articles");
            return page_response(page);
        }
    }

    match state.feed.list_articles(&query).await {
        Ok(page) if cacheable => page_response(state.articles.store(page)),
        Ok(page) => page_response(page),
        Err(e) => feed_error(e),
    }
}

pub async fn get_subscriptions(State(state): State<AppState>) -> Response {
    match state.feed.subscriptions().await {
        Ok(subscriptions) => (
            StatusCode::OK,
            Json(serde_json::json!({ "subscriptions": subscriptions })),
        )
            .into_response(),
        Err(e) => feed_error(e),
    }
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    body: Option<Json<ActionRequest>>,
) -> Response {
    if state.dedup.is_duplicate_request(&mark_read_fingerprint(&article_id)) {
        return duplicate_response();
    }

    let call_id = call_id(body);
    tracing::info!(call_id = %call_id, article_id = %article_id, "processing mark-as-read");

    match state.feed.mark_read(&article_id).await {
        Ok(()) => {
            state.articles.remove(&article_id);
            crate::good_response(APIResponse::new_from_msg("Article marked as read"))
        }
        Err(e) => feed_error(e),
    }
}

pub async fn save_for_later(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    body: Option<Json<ActionRequest>>,
) -> Response {
    if state.dedup.is_duplicate_request(&save_later_fingerprint(&article_id)) {
        return duplicate_response();
    }

    let call_id = call_id(body);
    tracing::info!(call_id = %call_id, article_id = %article_id, "processing save-for-later");

    match state.feed.save_for_later(&article_id).await {
        Ok(()) => {
            state.articles.remove(&article_id);
            crate::good_response(APIResponse::new_from_msg("Article saved for later"))
        }
        Err(e) => feed_error(e),
    }
}
