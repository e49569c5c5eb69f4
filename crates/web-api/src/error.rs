use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use domain::{DomainError, RepositoryError};

        match error {
            ApplicationError::Domain(DomainError::InvalidArgument { field, reason }) => {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "INVALID_ARGUMENT",
                    format!("{}: {}", field, reason),
                )
            }
            ApplicationError::Domain(DomainError::InvalidParticipants { reason }) => {
                ApiError::new(StatusCode::CONFLICT, "INVALID_PARTICIPANTS", reason)
            }
            ApplicationError::Domain(DomainError::UserAlreadyExists) => {
                ApiError::new(StatusCode::CONFLICT, "USER_EXISTS", "user already exists")
            }
            ApplicationError::Domain(DomainError::UserNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "user not found")
            }
            ApplicationError::Domain(DomainError::RoomNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "ROOM_NOT_FOUND", "room not found")
            }
            ApplicationError::Domain(DomainError::MessageNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "MESSAGE_NOT_FOUND",
                "message not found",
            ),
            ApplicationError::Domain(DomainError::NotRoomParticipant) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_ROOM_PARTICIPANT",
                "user is not a participant of the room",
            ),
            ApplicationError::Domain(DomainError::NotMessageAuthor) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_MESSAGE_AUTHOR",
                "user is not the author of the message",
            ),
            ApplicationError::Repository(RepositoryError::NotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "requested resource not found",
            ),
            ApplicationError::Repository(RepositoryError::Conflict) => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
            }
            // 底层细节只进日志，不出网
            ApplicationError::Repository(RepositoryError::Storage { .. }) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "database error",
            ),
            ApplicationError::Password(_) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "PASSWORD_ERROR",
                "password processing failed",
            ),
            ApplicationError::Token(_) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TOKEN_ERROR",
                "token processing failed",
            ),
            ApplicationError::Authentication => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_FAILED",
                "authentication failed",
            ),
            ApplicationError::Authorization => ApiError::new(
                StatusCode::FORBIDDEN,
                "AUTHORIZATION_FAILED",
                "authorization failed",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
