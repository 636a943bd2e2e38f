use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Session error")]
    SessionError,
    #[error("Password hashing failed")]
    HashingError,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Event not found")]
    EventNotFound,
    #[error("Participation not found")]
    ParticipationNotFound,
    #[error("Voting is closed for this event")]
    EventClosed,
    #[error("Participant name does not match this response")]
    NameMismatch,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AuthError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid email or password"),
            AuthError::EmailTaken => (StatusCode::CONFLICT, "Email already registered"),
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AuthError::SessionError => (StatusCode::INTERNAL_SERVER_ERROR, "Session error"),
            AuthError::HashingError => (StatusCode::INTERNAL_SERVER_ERROR, "Password hashing failed"),
            AuthError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.as_str()),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl IntoResponse for EventError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            EventError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            EventError::Forbidden => (StatusCode::FORBIDDEN, "Only the creator can do that"),
            EventError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            EventError::EventNotFound => (StatusCode::NOT_FOUND, "Event not found"),
            EventError::ParticipationNotFound => {
                (StatusCode::NOT_FOUND, "Participation not found")
            }
            EventError::EventClosed => (StatusCode::CONFLICT, "Voting is closed for this event"),
            EventError::NameMismatch => (
                StatusCode::CONFLICT,
                "Participant name does not match this response",
            ),
            EventError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.as_str()),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for EventError {
    fn from(error: sqlx::Error) -> Self {
        EventError::DatabaseError(error.to_string())
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(error: sqlx::Error) -> Self {
        AuthError::DatabaseError(error.to_string())
    }
}
