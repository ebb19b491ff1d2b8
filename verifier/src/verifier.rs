//! The verifier operations.
//!
//! Each method performs exactly one wire call (plus the register/login pair
//! in `authenticate`) and checks the answer against the contract: status
//! code, body schema, and echoed fields. Nothing is retried.

use books_core::{
    send, ApiError, Book, BookId, BookInput, BooksClient, Credentials, Operation, Registration,
    Session, Transport,
};
use tracing::{info, warn};

use crate::config::VerifierConfig;
use crate::error::VerifyError;

pub struct Verifier<T> {
    client: BooksClient,
    credentials: Credentials,
    transport: T,
}

impl<T: Transport> Verifier<T> {
    pub fn new(config: &VerifierConfig, transport: T) -> Self {
        Self {
            client: config.client(),
            credentials: config.credentials.clone(),
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn health_check(&self) -> Result<(), VerifyError> {
        let response = send(
            &self.transport,
            Operation::HealthCheck,
            self.client.build_health_check(),
        )?;
        self.client.parse_health_check(response)?;
        info!("health check passed");
        Ok(())
    }

    /// Registers the configured user, then logs in.
    ///
    /// Registration is best-effort: an existing account or a rejected
    /// registration is logged and login still runs. Only a round-trip that
    /// never got an answer aborts before login.
    #[tracing::instrument(name = "authenticate", skip_all, fields(username = %self.credentials.username))]
    pub fn authenticate(&self) -> Result<Session, VerifyError> {
        let request = self.client.build_register(&self.credentials)?;
        let registered = send(&self.transport, Operation::Register, request)
            .and_then(|response| self.client.parse_register(response));
        match registered {
            Ok(Registration::Created) => info!("registered new account"),
            Ok(Registration::AlreadyExists) => info!("account already registered"),
            Err(e @ (ApiError::Timeout { .. } | ApiError::Transport { .. })) => {
                return Err(e.into())
            }
            Err(e) => warn!(error = %e, "registration rejected, attempting login anyway"),
        }

        let request = self.client.build_login(&self.credentials)?;
        let response = send(&self.transport, Operation::Login, request)?;
        let session = self
            .client
            .parse_login(response, &self.credentials.username)?;
        info!("obtained bearer token");
        Ok(session)
    }

    #[tracing::instrument(name = "create_book", skip(self, session))]
    pub fn create_book(
        &self,
        session: &Session,
        author: &str,
        title: &str,
    ) -> Result<Book, VerifyError> {
        let input = BookInput::new(author, title);
        let request = self.client.build_create_book(session, &input)?;
        let response = send(&self.transport, Operation::CreateBook, request)?;
        let book = self.client.parse_create_book(response)?;
        expect_field(Operation::CreateBook, "author", author, &book.author)?;
        expect_field(Operation::CreateBook, "title", title, &book.title)?;
        info!(id = %book.id, "book created");
        Ok(book)
    }

    pub fn list_books(&self, session: &Session) -> Result<Vec<Book>, VerifyError> {
        let response = send(
            &self.transport,
            Operation::ListBooks,
            self.client.build_list_books(session),
        )?;
        let books = self.client.parse_list_books(response)?;
        info!(count = books.len(), "listed books");
        Ok(books)
    }

    /// Fetches one book. A 404 comes back as `ApiError::NotFound`.
    pub fn get_book(&self, session: &Session, id: &BookId) -> Result<Book, VerifyError> {
        let response = send(
            &self.transport,
            Operation::GetBook,
            self.client.build_get_book(session, id),
        )?;
        let book = self.client.parse_get_book(response)?;
        expect_field(
            Operation::GetBook,
            "id",
            &id.to_string(),
            &book.id.to_string(),
        )?;
        info!(%id, "fetched book");
        Ok(book)
    }

    #[tracing::instrument(name = "update_book", skip(self, session))]
    pub fn update_book(
        &self,
        session: &Session,
        id: &BookId,
        author: &str,
        title: &str,
    ) -> Result<Book, VerifyError> {
        let input = BookInput::new(author, title);
        let request = self.client.build_update_book(session, id, &input)?;
        let response = send(&self.transport, Operation::UpdateBook, request)?;
        let book = self.client.parse_update_book(response)?;
        expect_field(
            Operation::UpdateBook,
            "id",
            &id.to_string(),
            &book.id.to_string(),
        )?;
        expect_field(Operation::UpdateBook, "author", author, &book.author)?;
        expect_field(Operation::UpdateBook, "title", title, &book.title)?;
        info!("book updated");
        Ok(book)
    }

    pub fn delete_book(&self, session: &Session, id: &BookId) -> Result<(), VerifyError> {
        let response = send(
            &self.transport,
            Operation::DeleteBook,
            self.client.build_delete_book(session, id),
        )?;
        self.client.parse_delete_book(response)?;
        info!(%id, "book deleted");
        Ok(())
    }

    /// Succeeds only if reading `id` now yields not-found. Any 200 counts as
    /// a surviving book, whatever its body says.
    pub fn confirm_deleted(&self, session: &Session, id: &BookId) -> Result<(), VerifyError> {
        let response = send(
            &self.transport,
            Operation::GetBook,
            self.client.build_get_book(session, id),
        )?;
        if response.status == 200 {
            return Err(VerifyError::DeletionNotEffective { id: id.clone() });
        }
        match self.client.parse_get_book(response) {
            Err(ApiError::NotFound) => {
                info!(%id, "deletion confirmed");
                Ok(())
            }
            Ok(_) => Err(VerifyError::DeletionNotEffective { id: id.clone() }),
            Err(e) => Err(e.into()),
        }
    }
}

fn expect_field(
    step: Operation,
    field: &'static str,
    expected: &str,
    actual: &str,
) -> Result<(), VerifyError> {
    if expected == actual {
        return Ok(());
    }
    Err(VerifyError::FieldMismatch {
        step,
        field,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}
