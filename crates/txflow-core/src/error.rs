//! Transaction error types.

use thiserror::Error;

/// Errors reported by a storage backend through the [`ResourceAdapter`]
/// capability surface.
///
/// Any of these is wrapped as [`TransactionError::System`] by the engine and
/// always treated as rollback-triggering.
///
/// [`ResourceAdapter`]: crate::resource::ResourceAdapter
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A connection or session could not be acquired.
    #[error("failed to open connection: {0}")]
    Connection(String),

    /// A physical transaction could not be started.
    #[error("failed to begin transaction: {0}")]
    Begin(String),

    /// The physical commit failed.
    #[error("commit failed: {0}")]
    Commit(String),

    /// The physical rollback failed.
    #[error("rollback failed: {0}")]
    Rollback(String),

    /// An operation executed against the resource failed.
    #[error("operation failed: {0}")]
    Operation(String),

    /// A write was attempted on a read-only session.
    #[error("session is read-only")]
    ReadOnly,
}

/// Errors surfaced to callers of the propagation engine.
///
/// The type is generic over `E`, the caller's own application error type.
/// Application errors are re-raised unchanged in
/// [`TransactionError::Application`] when they are the original cause of a
/// rollback.
#[derive(Debug, Error)]
pub enum TransactionError<E> {
    /// A propagation rule was violated: `Never` with an active transaction,
    /// `Mandatory` without one, mismatched begin/complete nesting, or a
    /// double completion. Always fatal to the current call; never retried.
    #[error("illegal transaction state: {0}")]
    IllegalState(String),

    /// The storage backend failed to open, begin, commit, or roll back.
    /// Always rollback-triggering; retry policy belongs to the caller.
    #[error("transaction system error: {0}")]
    System(#[source] ResourceError),

    /// The local operation succeeded, but the transaction was rolled back
    /// because a nested participant demanded it. Signals silent data loss
    /// risk; the engine never swallows this internally.
    #[error("transaction was rolled back because a participant demanded rollback")]
    UnexpectedRollback,

    /// The caller's own error, re-raised unchanged.
    #[error("application error: {0}")]
    Application(E),
}

impl<E> TransactionError<E> {
    /// Construct an [`TransactionError::IllegalState`] from any message.
    #[must_use]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    /// Unwrap the application error, if this is one.
    pub fn into_application(self) -> Option<E> {
        match self {
            Self::Application(err) => Some(err),
            _ => None,
        }
    }

    /// `true` if this is an application error.
    #[must_use]
    pub const fn is_application(&self) -> bool {
        matches!(self, Self::Application(_))
    }
}

impl<E> From<ResourceError> for TransactionError<E> {
    fn from(err: ResourceError) -> Self {
        Self::System(err)
    }
}

/// Result type alias for engine operations.
pub type TransactionResult<T, E> = Result<T, TransactionError<E>>;
