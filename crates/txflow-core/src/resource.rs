//! The resource adapter trait.
//!
//! This is the thin capability surface the engine requires from a storage
//! backend: open a session, start a physical transaction on a fresh session,
//! and complete a transactional session with exactly one commit or rollback.
//!
//! The engine never interprets what a handle *is*; business operations run
//! against it opaquely. Isolation level and the read-only flag from the
//! [`TransactionDefinition`] are passed through for the backend to honor or
//! ignore.

use crate::definition::TransactionDefinition;
use crate::error::ResourceError;

/// A transactional capability provided by a storage backend.
///
/// Implementations must be thread-safe (`Send + Sync`): one adapter is
/// shared by every call chain, while each handle belongs to a single chain.
///
/// # Handle Lifecycle
///
/// A handle produced by [`begin`](ResourceAdapter::begin) is completed by
/// exactly one call to [`commit`](ResourceAdapter::commit) or
/// [`rollback`](ResourceAdapter::rollback); both consume it. A handle
/// produced by [`open`](ResourceAdapter::open) is non-transactional
/// (auto-commit) and is released by dropping it.
///
/// # Example
///
/// ```ignore
/// use txflow_core::{ResourceAdapter, TransactionDefinition};
///
/// fn example<R: ResourceAdapter>(adapter: &R) -> Result<(), txflow_core::ResourceError> {
///     let handle = adapter.begin(&TransactionDefinition::required())?;
///     // ... run operations against the handle ...
///     adapter.commit(handle)?;
///     Ok(())
/// }
/// ```
pub trait ResourceAdapter: Send + Sync {
    /// The connection/session handle type for this backend.
    type Handle: Send;

    /// Open a non-transactional (auto-commit) session.
    ///
    /// Used when a boundary runs without a transaction (`Supports` with no
    /// active transaction, `NotSupported`, `Never`).
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Connection`] if a session cannot be
    /// acquired.
    fn open(&self) -> Result<Self::Handle, ResourceError>;

    /// Open a session and start a physical transaction on it.
    ///
    /// The definition's isolation level and read-only flag are passed
    /// through opaquely.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Connection`] or [`ResourceError::Begin`] if
    /// the transaction cannot be started.
    fn begin(&self, definition: &TransactionDefinition) -> Result<Self::Handle, ResourceError>;

    /// Commit and destroy a transactional handle.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Commit`] if the commit fails. The handle is
    /// consumed either way.
    fn commit(&self, handle: Self::Handle) -> Result<(), ResourceError>;

    /// Roll back and destroy a transactional handle.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Rollback`] if the rollback fails. The handle
    /// is consumed either way.
    fn rollback(&self, handle: Self::Handle) -> Result<(), ResourceError>;
}
