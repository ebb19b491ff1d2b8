//! Contract failures found by the verifier.
//!
//! `ApiError` covers everything the wire can report; the remaining variants
//! are responses that were well-formed but said the wrong thing.

use books_core::{ApiError, BookId, Operation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{step}: field `{field}` expected {expected:?}, got {actual:?}")]
    FieldMismatch {
        step: Operation,
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("list_books does not contain book {id}")]
    MissingFromList { id: BookId },

    #[error("book {id} is still readable after deletion")]
    DeletionNotEffective { id: BookId },
}

impl VerifyError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, VerifyError::Api(e) if e.is_timeout())
    }
}
