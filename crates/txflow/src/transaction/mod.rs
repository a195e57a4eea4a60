//! The propagation engine and completion coordinator.
//!
//! This module provides the [`TransactionManager`] and the types that flow
//! through a transactional boundary:
//!
//! - [`TransactionManager::begin`] consults the chain's context and the
//!   definition's propagation mode, then either joins the active physical
//!   transaction, starts a new one (suspending the active one if required),
//!   or sets up a non-transactional boundary. It returns a
//!   [`TransactionStatus`] describing what it did.
//! - The caller's operation runs inside a [`TransactionScope`], which gives
//!   it access to the current resource handle, nested boundaries, and the
//!   rollback-only vote.
//! - [`TransactionManager::complete`] coordinates completion: participants
//!   vote and re-raise, the owner performs the single physical commit or
//!   rollback, and suspended transactions are resumed.
//!
//! [`TransactionManager::with_transaction`] wraps the three steps as a
//! scoped acquisition so that completion runs on every exit path.
//!
//! # Example
//!
//! ```
//! use txflow::backends::MemoryResource;
//! use txflow::transaction::TransactionManager;
//! use txflow::TransactionDefinition;
//!
//! let manager: TransactionManager<MemoryResource, String> =
//!     TransactionManager::new(MemoryResource::new());
//! let mut ctx = manager.context();
//!
//! manager
//!     .with_transaction(&mut ctx, &TransactionDefinition::required(), |scope| {
//!         scope.run(|session| {
//!             session.put("events", b"e1", b"created").map_err(|e| e.to_string())
//!         })
//!     })
//!     .expect("transaction failed");
//! ```

mod manager;
mod physical;
mod scope;
mod status;

pub use manager::{RollbackPolicy, TransactionManager, TransactionManagerConfig};
pub use physical::{PhysicalTransaction, SharedTransaction};
pub use scope::TransactionScope;
pub use status::TransactionStatus;
