//! Scenarios and the per-run state machine.
//!
//! Every scenario starts from an authenticated session, creates its own book
//! and advances a `Progress` tracker through `RunState`. The first failed
//! step aborts the scenario; the state it had reached is kept in the
//! resulting `ScenarioFailure`.

use std::fmt;

use books_core::{Book, Session, Transport};
use clap::ValueEnum;
use tracing::warn;

use crate::error::VerifyError;
use crate::verifier::Verifier;

pub const LIFECYCLE_CREATE: (&str, &str) = ("Jane Doe", "New Book Title");
pub const LIFECYCLE_UPDATE: (&str, &str) = ("John Smith", "Updated Book Title");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    Unauthenticated,
    Authenticated,
    BookCreated,
    BookVerified,
    BookUpdated,
    BookDeleted,
    DeletionConfirmed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Unauthenticated => "UNAUTHENTICATED",
            RunState::Authenticated => "AUTHENTICATED",
            RunState::BookCreated => "BOOK_CREATED",
            RunState::BookVerified => "BOOK_VERIFIED",
            RunState::BookUpdated => "BOOK_UPDATED",
            RunState::BookDeleted => "BOOK_DELETED",
            RunState::DeletionConfirmed => "DELETION_CONFIRMED",
        };
        f.write_str(name)
    }
}

/// A scenario stopped at `state` because of `error`.
#[derive(Debug)]
pub struct ScenarioFailure {
    pub state: RunState,
    pub error: VerifyError,
}

impl fmt::Display for ScenarioFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_FAILED: {}", self.state, self.error)
    }
}

impl std::error::Error for ScenarioFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Forward-only tracker of the current `RunState`.
#[derive(Debug)]
pub struct Progress {
    state: RunState,
}

impl Progress {
    pub fn authenticated() -> Self {
        Self {
            state: RunState::Authenticated,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn advance(&mut self, next: RunState) {
        debug_assert!(next > self.state, "{} cannot follow {}", next, self.state);
        tracing::debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    /// Run `step`, keeping the current state attached to any failure.
    pub fn step<R>(&self, step: impl FnOnce() -> Result<R, VerifyError>) -> Result<R, ScenarioFailure> {
        step().map_err(|error| ScenarioFailure {
            state: self.state,
            error,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Scenario {
    /// Create, list, read, update, delete, confirm deletion
    Lifecycle,
    /// A read right after create returns the created fields
    ReadAfterCreate,
    /// A read after update returns the new fields
    ReadAfterUpdate,
    /// The list after create includes the new id
    ListContainsCreated,
    /// A read after delete yields not-found
    DeleteIsPermanent,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::Lifecycle,
        Scenario::ReadAfterCreate,
        Scenario::ReadAfterUpdate,
        Scenario::ListContainsCreated,
        Scenario::DeleteIsPermanent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Lifecycle => "lifecycle",
            Scenario::ReadAfterCreate => "read-after-create",
            Scenario::ReadAfterUpdate => "read-after-update",
            Scenario::ListContainsCreated => "list-contains-created",
            Scenario::DeleteIsPermanent => "delete-is-permanent",
        }
    }

    /// Runs the scenario and returns the final state reached.
    pub fn run<T: Transport>(
        self,
        verifier: &Verifier<T>,
        session: &Session,
    ) -> Result<RunState, ScenarioFailure> {
        let span = tracing::info_span!("scenario", name = self.name());
        let _guard = span.enter();
        match self {
            Scenario::Lifecycle => lifecycle(verifier, session),
            Scenario::ReadAfterCreate => read_after_create(verifier, session),
            Scenario::ReadAfterUpdate => read_after_update(verifier, session),
            Scenario::ListContainsCreated => list_contains_created(verifier, session),
            Scenario::DeleteIsPermanent => delete_is_permanent(verifier, session),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn lifecycle<T: Transport>(
    verifier: &Verifier<T>,
    session: &Session,
) -> Result<RunState, ScenarioFailure> {
    let mut progress = Progress::authenticated();
    let (author, title) = LIFECYCLE_CREATE;

    let book = progress.step(|| verifier.create_book(session, author, title))?;
    progress.advance(RunState::BookCreated);

    progress.step(|| expect_listed(verifier, session, &book))?;
    progress.step(|| expect_readable(verifier, session, &book))?;
    progress.advance(RunState::BookVerified);

    let (new_author, new_title) = LIFECYCLE_UPDATE;
    progress.step(|| verifier.update_book(session, &book.id, new_author, new_title))?;
    progress.advance(RunState::BookUpdated);

    progress.step(|| verifier.delete_book(session, &book.id))?;
    progress.advance(RunState::BookDeleted);

    progress.step(|| verifier.confirm_deleted(session, &book.id))?;
    progress.advance(RunState::DeletionConfirmed);
    Ok(progress.state())
}

fn read_after_create<T: Transport>(
    verifier: &Verifier<T>,
    session: &Session,
) -> Result<RunState, ScenarioFailure> {
    let mut progress = Progress::authenticated();
    let book = progress.step(|| verifier.create_book(session, "Jane Doe", "Read After Create"))?;
    progress.advance(RunState::BookCreated);

    let outcome = progress.step(|| expect_readable(verifier, session, &book));
    cleanup(verifier, session, &book);
    outcome?;
    progress.advance(RunState::BookVerified);
    Ok(progress.state())
}

fn read_after_update<T: Transport>(
    verifier: &Verifier<T>,
    session: &Session,
) -> Result<RunState, ScenarioFailure> {
    let mut progress = Progress::authenticated();
    let book = progress.step(|| verifier.create_book(session, "Jane Doe", "Before Update"))?;
    progress.advance(RunState::BookCreated);

    let outcome = progress.step(|| {
        let updated = verifier.update_book(session, &book.id, "John Smith", "After Update")?;
        expect_readable(verifier, session, &updated)
    });
    cleanup(verifier, session, &book);
    outcome?;
    progress.advance(RunState::BookUpdated);
    Ok(progress.state())
}

fn list_contains_created<T: Transport>(
    verifier: &Verifier<T>,
    session: &Session,
) -> Result<RunState, ScenarioFailure> {
    let mut progress = Progress::authenticated();
    let book = progress.step(|| verifier.create_book(session, "Jane Doe", "Listed Book"))?;
    progress.advance(RunState::BookCreated);

    let outcome = progress.step(|| expect_listed(verifier, session, &book));
    cleanup(verifier, session, &book);
    outcome?;
    progress.advance(RunState::BookVerified);
    Ok(progress.state())
}

fn delete_is_permanent<T: Transport>(
    verifier: &Verifier<T>,
    session: &Session,
) -> Result<RunState, ScenarioFailure> {
    let mut progress = Progress::authenticated();
    let book = progress.step(|| verifier.create_book(session, "Jane Doe", "Short Lived"))?;
    progress.advance(RunState::BookCreated);

    progress.step(|| verifier.delete_book(session, &book.id))?;
    progress.advance(RunState::BookDeleted);

    progress.step(|| verifier.confirm_deleted(session, &book.id))?;
    progress.advance(RunState::DeletionConfirmed);
    Ok(progress.state())
}

fn expect_readable<T: Transport>(
    verifier: &Verifier<T>,
    session: &Session,
    expected: &Book,
) -> Result<(), VerifyError> {
    let fetched = verifier.get_book(session, &expected.id)?;
    for (field, want, got) in [
        ("author", &expected.author, &fetched.author),
        ("title", &expected.title, &fetched.title),
    ] {
        if want != got {
            return Err(VerifyError::FieldMismatch {
                step: books_core::Operation::GetBook,
                field,
                expected: want.clone(),
                actual: got.clone(),
            });
        }
    }
    Ok(())
}

fn expect_listed<T: Transport>(
    verifier: &Verifier<T>,
    session: &Session,
    book: &Book,
) -> Result<(), VerifyError> {
    let books = verifier.list_books(session)?;
    if books.iter().any(|b| b.id == book.id) {
        Ok(())
    } else {
        Err(VerifyError::MissingFromList {
            id: book.id.clone(),
        })
    }
}

/// Best-effort removal of a scenario's own book.
fn cleanup<T: Transport>(verifier: &Verifier<T>, session: &Session, book: &Book) {
    if let Err(e) = verifier.delete_book(session, &book.id) {
        warn!(id = %book.id, error = %e, "cleanup failed");
    }
}
