//! Crate-wide error type shared by both tiers.
//!
//! Mirrors the five error kinds the control plane distinguishes: a bad
//! request from a client, an unknown resource, a forbidden recipe, a
//! transient failure talking to a peer, and an internal invariant
//! violation. Only the HTTP layer (`tier1::handlers`, `tier2::handlers`)
//! translates these into status codes; everything below absorbs or
//! propagates the variant itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("request cancelled or timed out: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Timeout(_) => StatusCode::BAD_REQUEST,
            Error::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Http(_) | Error::Serde(_) | Error::Io(_) | Error::Csv(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        // `Internal` carries the message verbatim (no "internal error: "
        // prefix) since it's already client-facing text, matching the
        // original's `ProblemException(500, "Error", "Something went
        // wrong")` detail string.
        let message = match &self {
            Error::Internal(message) => message.clone(),
            other => other.to_string(),
        };
        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
