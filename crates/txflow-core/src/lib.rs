//! Core transaction contracts for `txflow`.
//!
//! This crate defines the types shared between the propagation engine and
//! storage backends:
//!
//! - [`TransactionDefinition`] - Describes one logical transaction request
//!   (propagation mode, isolation level, read-only flag)
//! - [`TransactionError`] - The error taxonomy surfaced to callers
//! - [`ResourceAdapter`] - The capability surface a storage backend provides
//!
//! The engine itself lives in the `txflow` crate; this crate holds only the
//! contract layer so that backends can be implemented without depending on
//! the engine.
//!
//! # Error Handling
//!
//! All engine operations return [`TransactionResult<T, E>`], an alias for
//! `Result<T, TransactionError<E>>` where `E` is the caller's application
//! error type. Backend failures are reported as [`ResourceError`] and wrapped
//! in [`TransactionError::System`].

pub mod definition;
pub mod error;
pub mod resource;

pub use definition::{Isolation, Propagation, TransactionDefinition};
pub use error::{ResourceError, TransactionError, TransactionResult};
pub use resource::ResourceAdapter;
