//! Typed schema for the books API.
//!
//! # Design
//! Every response body is parsed into one of these structs. A body missing a
//! required field fails deserialization, which the client reports as a
//! schema mismatch instead of a runtime key lookup failure.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Server-assigned book identifier.
///
/// The service may hand out numeric or string ids; both are kept verbatim
/// and escaped as a single segment when they go into a URL path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookId::Numeric(id) => write!(f, "{id}"),
            BookId::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for BookId {
    fn from(id: u64) -> Self {
        BookId::Numeric(id)
    }
}

impl From<&str> for BookId {
    fn from(id: &str) -> Self {
        BookId::Text(id.to_string())
    }
}

/// A book record as returned by the API. Unknown fields such as timestamps
/// are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    pub id: BookId,
    pub author: String,
    pub title: String,
}

/// Request payload for both create and update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookInput {
    pub author: String,
    pub title: String,
}

impl BookInput {
    pub fn new(author: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            title: title.into(),
        }
    }
}

/// Username and password sent to `/register` and `/login`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// `{"data": ...}` wrapper used by every book endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: Option<String>,
}

/// An authenticated identity obtained from `/login`.
///
/// The token is never empty; `Session::new` refuses to build one otherwise.
#[derive(Clone)]
pub struct Session {
    username: String,
    token: String,
    obtained_at: Instant,
}

impl Session {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ApiError::Authentication {
                status: 200,
                reason: "login response carried an empty token".to_string(),
            });
        }
        Ok(Self {
            username: username.into(),
            token,
            obtained_at: Instant::now(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Time elapsed since login.
    pub fn age(&self) -> Duration {
        self.obtained_at.elapsed()
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// What `/register` reported. Login decides whether authentication worked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyExists,
}
