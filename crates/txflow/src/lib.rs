//! `txflow` - A Transactional Unit-of-Work Manager
//!
//! txflow lets independent pieces of business logic declare "this operation
//! must run inside a transaction" without knowing whether a transaction is
//! already active. For each nested boundary the engine decides whether to
//! join the active physical transaction, start a new one (optionally
//! suspending the outer one), or run non-transactionally - and coordinates
//! how commit/rollback decisions and errors cascade back out.
//!
//! # Quick Start
//!
//! ```
//! use txflow::backends::MemoryResource;
//! use txflow::transaction::TransactionManager;
//! use txflow::{TransactionDefinition, TransactionError};
//!
//! let manager: TransactionManager<MemoryResource, String> =
//!     TransactionManager::new(MemoryResource::new());
//! let mut ctx = manager.context();
//!
//! let result: Result<(), TransactionError<String>> =
//!     manager.with_transaction(&mut ctx, &TransactionDefinition::required(), |scope| {
//!         scope.run(|session| {
//!             session.put("accounts", b"alice", b"100").map_err(|e| e.to_string())
//!         })?;
//!         Ok(())
//!     });
//! assert!(result.is_ok());
//! ```
//!
//! # Nested Boundaries
//!
//! Boundaries nest strictly (stack-like) within one call chain. A nested
//! `Required` boundary joins the outer physical transaction and only *votes*
//! on its fate: a rollback-triggering failure marks the shared transaction
//! rollback-only and re-raises, and the owning (outermost) boundary performs
//! the single physical rollback. If the owner's own operation succeeded, it
//! surfaces [`TransactionError::UnexpectedRollback`] so the silent undo is
//! never hidden.
//!
//! A nested `RequiresNew` boundary suspends the outer transaction, runs in
//! its own physical transaction, and resumes the outer one afterwards - so
//! an inner failure rolls back only the inner work.
//!
//! # Explicit Context
//!
//! There is no ambient thread-local state. Each logical call chain owns a
//! [`context::TransactionContext`] and threads it explicitly through the
//! chain; two concurrent chains can never observe each other's transaction.
//!
//! # Modules
//!
//! - [`context`] - Per-call-chain registry binding the active transaction
//! - [`transaction`] - The propagation engine and completion coordinator
//! - [`backends`] - Resource adapter implementations

pub mod backends;
pub mod context;
pub mod transaction;

pub use txflow_core::{
    Isolation, Propagation, ResourceAdapter, ResourceError, TransactionDefinition,
    TransactionError, TransactionResult,
};

pub use context::TransactionContext;
pub use transaction::{
    RollbackPolicy, TransactionManager, TransactionManagerConfig, TransactionScope,
    TransactionStatus,
};
