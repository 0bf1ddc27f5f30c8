use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::{borrow::Cow, future::Future};
use thiserror::Error;
use tracing::error;

use qz_common::db::{DbPoolError, MigrationError};
use qz_common::quiz::CoreError;

tokio::task_local! {
    static REQUEST_ID: String;
}

const PUBLIC_MESSAGE_MAX: usize = 240;

fn redact_token(token: &str) -> Cow<'_, str> {
    if token.contains("://") {
        Cow::Borrowed("[redacted-url]")
    } else if let Some((base, _)) = token.split_once('?') {
        if base.is_empty() {
            Cow::Borrowed("[redacted-query]")
        } else {
            Cow::Owned(format!("{base}?[redacted]"))
        }
    } else if token.starts_with('/') || token.contains('\\') {
        Cow::Borrowed("[redacted-path]")
    } else {
        Cow::Borrowed(token)
    }
}

fn sanitize_message(message: &str) -> String {
    let mut cleaned = String::new();
    for raw in message.split_whitespace() {
        let token: String = raw.chars().filter(|c| !c.is_control()).collect();
        if token.is_empty() {
            continue;
        }
        if !cleaned.is_empty() {
            cleaned.push(' ');
        }
        cleaned.push_str(&redact_token(&token));
    }

    if cleaned.len() > PUBLIC_MESSAGE_MAX {
        let mut cut = PUBLIC_MESSAGE_MAX;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
        cleaned.push('…');
    }

    if cleaned.is_empty() {
        "unexpected error".to_string()
    } else {
        cleaned
    }
}

pub async fn with_request_id<Fut, T>(request_id: Option<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    if let Some(request_id) = request_id {
        REQUEST_ID.scope(request_id, fut).await
    } else {
        fut.await
    }
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|value| value.clone()).ok()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("too many requests: {0}")]
    TooManyRequests(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = self.code();
        let request_id = current_request_id();

        error!(
            code,
            status = %status,
            request_id = request_id.as_deref().unwrap_or(""),
            error = %self,
            "api_error"
        );

        let body = Json(ErrorResponse {
            code,
            message: self.public_message().into_owned(),
            request_id,
        });

        (status, body).into_response()
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::TooManyRequests(_) => "too_many_requests",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Database(_) => "database_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> Cow<'static, str> {
        match self {
            ApiError::BadRequest(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::Unauthorized(_) => Cow::Borrowed("unauthorized"),
            // Gate refusals carry their reason through to the caller.
            ApiError::Forbidden(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::NotFound(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::Conflict(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::TooManyRequests(_) => Cow::Borrowed("too many requests"),
            ApiError::ServiceUnavailable(_) => Cow::Borrowed("service unavailable"),
            ApiError::Database(_) | ApiError::Internal(_) => Cow::Borrowed("internal server error"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            CoreError::Conflict(msg) => ApiError::Conflict(msg),
            CoreError::Unavailable(msg) => ApiError::Database(msg),
        }
    }
}

impl From<DbPoolError> for ApiError {
    fn from(value: DbPoolError) -> Self {
        ApiError::Database(value.to_string())
    }
}

impl From<MigrationError> for ApiError {
    fn from(value: MigrationError) -> Self {
        ApiError::Database(value.to_string())
    }
}
