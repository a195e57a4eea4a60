//! Resource adapter implementations.
//!
//! - [`memory`] - An in-memory tabled key-value resource, used by tests and
//!   as a reference implementation of the [`ResourceAdapter`] contract.
//!
//! [`ResourceAdapter`]: txflow_core::ResourceAdapter

pub mod memory;

pub use memory::{MemoryResource, MemorySession};
