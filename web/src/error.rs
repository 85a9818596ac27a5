use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors a web handler can return; each maps onto one HTTP status.
#[derive(Debug)]
pub enum Error {
    /// The request was understood but its contents are unusable.
    Invalid(String),
    /// Something on our side broke while handling the request.
    Internal(String),
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        match self {
            Error::Invalid(msg) => write!(fmt, "Invalid request: {msg}"),
            Error::Internal(msg) => write!(fmt, "Internal error: {msg}"),
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Invalid(msg) => {
                debug!("Rejecting request: {msg}");
                (StatusCode::UNPROCESSABLE_ENTITY, msg).into_response()
            }
            Error::Internal(msg) => {
                error!("Internal server error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl From<sse::Error> for Error {
    fn from(err: sse::Error) -> Self {
        match err {
            sse::Error::Parse(msg) | sse::Error::Serialization(msg) => Error::Invalid(msg),
            other => Error::Internal(other.to_string()),
        }
    }
}
