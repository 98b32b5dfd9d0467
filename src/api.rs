use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub count: Option<u32>,
    pub continuation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookmarkParams {
    pub folder: Option<String>,
    pub limit: Option<u32>,
}

/// Optional body of the swipe actions; `callId` is only used for logging.
#[derive(Debug, Deserialize, Default)]
pub struct ActionRequest {
    #[serde(rename = "callId")]
    pub call_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstapaperAddRequest {
    pub id: Option<String>,
    pub url: Option<String>,
    pub origin_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub call_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct APIResponse {
    pub success: bool,
    pub message: String,
}

impl APIResponse {
    pub fn new_from_msg(msg: &str) -> Self {
        return APIResponse {
            success: true,
            message: msg.to_owned(),
        };
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(rename = "needLogin", skip_serializing_if = "std::ops::Not::not")]
    pub need_login: bool,
}

impl ErrorResponse {
    pub fn new_from_msg(msg: &str) -> Self {
        return ErrorResponse {
            error: msg.to_owned(),
            need_login: false,
        };
    }

    pub fn login_required() -> Self {
        return ErrorResponse {
            error: "Authentication required".to_owned(),
            need_login: true,
        };
    }
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
}
