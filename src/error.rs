use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("identifier is empty or contains reserved character '{0}'")]
    InvalidIdentifier(char),

    #[error("invalid ticket")]
    MalformedTicketId,

    #[error("payload does not fit in a QR code")]
    PayloadTooLarge,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("ticket check failed")]
    CheckFailed(#[source] anyhow::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl TicketError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TicketError::InvalidIdentifier(_)
            | TicketError::MalformedTicketId
            | TicketError::BadRequest(_) => StatusCode::BAD_REQUEST,
            TicketError::NotFound(_) => StatusCode::NOT_FOUND,
            TicketError::CheckFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            TicketError::PayloadTooLarge | TicketError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TicketError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            TicketError::MalformedTicketId => "MALFORMED_TICKET_ID",
            TicketError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            TicketError::NotFound(_) => "NOT_FOUND",
            TicketError::CheckFailed(_) => "CHECK_FAILED",
            TicketError::BadRequest(_) => "BAD_REQUEST",
            TicketError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

impl IntoResponse for TicketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            TicketError::CheckFailed(e) => error!(error = ?e, "ticket check failed"),
            TicketError::Internal(e) => error!(error = ?e, "internal error"),
            TicketError::PayloadTooLarge => error!("qr rendering failed"),
            other => warn!(error = %other, "request rejected"),
        }

        // Store failures and rendering failures stay generic for the client.
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
