use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use color_eyre::eyre::Report;
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Failures that are shown to the user instead of failing the request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Poll {0} does not exist.")]
    NotFound(String),
    #[error("This poll is closed.")]
    PollClosed,
    #[error("You didn't select a choice.")]
    MissingSelection,
}

/// Infrastructure failure surfaced at the request boundary as a 500.
pub struct ServerError(pub Report);

impl From<Report> for ServerError {
    fn from(report: Report) -> Self {
        Self(report)
    }
}

impl fmt::Debug for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        error!("Request failed: {:?}", self.0);
        HttpResponse::InternalServerError().body("Internal server error")
    }
}
