//! Synchronous API client core for the books service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). A `Transport` supplied by the
//! caller performs the round-trip, so the core stays deterministic.
//!
//! # Design
//! - `BooksClient` is stateless: it holds only the base URL and API key.
//! - Each wire call is split into `build_*` and `parse_*`.
//! - Response bodies are parsed into typed envelopes; a missing field is an
//!   `ApiError::Schema`, not a panic.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::{send, BooksClient};
pub use error::{ApiError, Operation};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use types::{Book, BookId, BookInput, Credentials, DataEnvelope, Registration, Session};
