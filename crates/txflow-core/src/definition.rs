//! Transaction definitions.
//!
//! A [`TransactionDefinition`] is an immutable description of one logical
//! transaction request: how it joins (or refuses to join) an already-active
//! transaction, which isolation level the backend should use, and whether
//! the work is read-only. Definitions are cheap to create and are typically
//! built once per call site.

use serde::{Deserialize, Serialize};

/// How a transactional boundary relates to an already-active transaction.
///
/// The propagation mode is consulted at boundary entry. "Active transaction"
/// refers to the physical transaction currently bound to the call chain's
/// transaction context, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Propagation {
    /// Join the active transaction, or start a new one if none is active.
    #[default]
    Required,

    /// Always start a new physical transaction, suspending the active one
    /// for the duration of the boundary.
    RequiresNew,

    /// Join the active transaction if present, otherwise run without one.
    Supports,

    /// Run without a transaction, suspending the active one if present.
    NotSupported,

    /// Run without a transaction; fail if one is active.
    Never,

    /// Join the active transaction; fail if none is active.
    Mandatory,
}

/// Transaction isolation level.
///
/// Isolation is passed through to the backend opaquely; the propagation
/// engine itself never interprets it. Backends that do not distinguish
/// levels may ignore anything other than [`Isolation::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Isolation {
    /// Use the backend's default isolation level.
    #[default]
    Default,
    /// Read uncommitted (dirty reads allowed).
    ReadUncommitted,
    /// Read committed.
    ReadCommitted,
    /// Repeatable read.
    RepeatableRead,
    /// Serializable.
    Serializable,
}

/// An immutable description of one logical transaction request.
///
/// # Example
///
/// ```
/// use txflow_core::{Isolation, Propagation, TransactionDefinition};
///
/// let def = TransactionDefinition::requires_new()
///     .with_isolation(Isolation::Serializable)
///     .read_only(true);
///
/// assert_eq!(def.propagation(), Propagation::RequiresNew);
/// assert!(def.is_read_only());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionDefinition {
    propagation: Propagation,
    isolation: Isolation,
    read_only: bool,
}

impl TransactionDefinition {
    /// Create a definition with the given propagation mode and defaults for
    /// everything else.
    #[must_use]
    pub const fn new(propagation: Propagation) -> Self {
        Self { propagation, isolation: Isolation::Default, read_only: false }
    }

    /// `Required` propagation: join the active transaction or start one.
    #[must_use]
    pub const fn required() -> Self {
        Self::new(Propagation::Required)
    }

    /// `RequiresNew` propagation: always start a new physical transaction.
    #[must_use]
    pub const fn requires_new() -> Self {
        Self::new(Propagation::RequiresNew)
    }

    /// `Supports` propagation: join if active, otherwise run without one.
    #[must_use]
    pub const fn supports() -> Self {
        Self::new(Propagation::Supports)
    }

    /// `NotSupported` propagation: suspend any active transaction and run
    /// without one.
    #[must_use]
    pub const fn not_supported() -> Self {
        Self::new(Propagation::NotSupported)
    }

    /// `Never` propagation: run without a transaction, failing if one is
    /// active.
    #[must_use]
    pub const fn never() -> Self {
        Self::new(Propagation::Never)
    }

    /// `Mandatory` propagation: join the active transaction, failing if none
    /// is active.
    #[must_use]
    pub const fn mandatory() -> Self {
        Self::new(Propagation::Mandatory)
    }

    /// Set the isolation level.
    #[must_use]
    pub const fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Set the read-only flag.
    #[must_use]
    pub const fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// The propagation mode.
    #[must_use]
    pub const fn propagation(&self) -> Propagation {
        self.propagation
    }

    /// The isolation level.
    #[must_use]
    pub const fn isolation(&self) -> Isolation {
        self.isolation
    }

    /// Whether the boundary declares its work read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }
}
