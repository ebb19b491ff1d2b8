//! Error types for the books API client.
//!
//! # Design
//! Each operation has its own failure variant so callers can tell which step
//! of the contract broke. `NotFound` stays separate: after a delete it is the
//! expected answer. Round-trips that never produced a status code surface as
//! `Timeout` or `Transport`, tagged with the operation that was in flight.

use std::fmt;

use thiserror::Error;

/// The API call an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    HealthCheck,
    Register,
    Login,
    CreateBook,
    ListBooks,
    GetBook,
    UpdateBook,
    DeleteBook,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::HealthCheck => "health_check",
            Operation::Register => "register",
            Operation::Login => "login",
            Operation::CreateBook => "create_book",
            Operation::ListBooks => "list_books",
            Operation::GetBook => "get_book",
            Operation::UpdateBook => "update_book",
            Operation::DeleteBook => "delete_book",
        };
        f.write_str(name)
    }
}

/// Errors returned by `BooksClient` parse methods and round-trips.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("health check failed: expected HTTP 200, got {status}: {body}")]
    HealthCheck { status: u16, body: String },

    #[error("registration rejected: expected HTTP 200, 201 or 409, got {status}: {body}")]
    Registration { status: u16, body: String },

    /// Login answered something other than 200, or 200 without a token.
    #[error("authentication failed: expected HTTP 200 with a token, got {status}: {reason}")]
    Authentication { status: u16, reason: String },

    #[error("create failed: expected HTTP 201, got {status}: {body}")]
    Create { status: u16, body: String },

    #[error("list failed: expected HTTP 200, got {status}: {body}")]
    List { status: u16, body: String },

    /// A get-by-id answered 404.
    #[error("book not found: expected HTTP 200, got 404")]
    NotFound,

    /// A get-by-id answered neither 200 nor 404.
    #[error("{operation}: expected HTTP {expected}, got {status}: {body}")]
    UnexpectedStatus {
        operation: Operation,
        expected: u16,
        status: u16,
        body: String,
    },

    #[error("update failed: expected HTTP 200, got {status}: {body}")]
    Update { status: u16, body: String },

    #[error("delete failed: expected HTTP 204, got {status}: {body}")]
    Delete { status: u16, body: String },

    #[error("{operation} timed out")]
    Timeout { operation: Operation },

    #[error("{operation}: {message}")]
    Transport { operation: Operation, message: String },

    /// The body did not match the typed schema for this operation.
    #[error("{operation}: response does not match schema: {message}")]
    Schema { operation: Operation, message: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status the server answered with, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HealthCheck { status, .. }
            | ApiError::Registration { status, .. }
            | ApiError::Authentication { status, .. }
            | ApiError::Create { status, .. }
            | ApiError::List { status, .. }
            | ApiError::UnexpectedStatus { status, .. }
            | ApiError::Update { status, .. }
            | ApiError::Delete { status, .. } => Some(*status),
            ApiError::NotFound => Some(404),
            ApiError::Timeout { .. }
            | ApiError::Transport { .. }
            | ApiError::Schema { .. }
            | ApiError::Serialization(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }
}
