//! Per-boundary transaction status.

use txflow_core::ResourceAdapter;

use super::physical::SharedTransaction;

/// What [`begin`](super::TransactionManager::begin) decided for one
/// transactional boundary.
///
/// A status is created at boundary entry and consumed by
/// [`complete`](super::TransactionManager::complete) at boundary exit; it is
/// never shared beyond the call that owns it. Only a status with
/// [`is_new_transaction`](Self::is_new_transaction)` == true` drives the
/// physical commit or rollback - boundaries that joined an existing
/// transaction participate by vote only.
pub struct TransactionStatus<R: ResourceAdapter> {
    /// The physical transaction this boundary participates in, if any.
    pub(crate) transaction: Option<SharedTransaction<R>>,

    /// `true` only for the boundary that created the physical transaction.
    pub(crate) is_new: bool,

    /// A previously-active transaction parked for the duration of this
    /// boundary, to be resumed at completion.
    pub(crate) suspended: Option<SharedTransaction<R>>,

    /// Context depth at which this boundary was opened; used to fail fast on
    /// mismatched nesting.
    pub(crate) depth: u64,
}

impl<R: ResourceAdapter> core::fmt::Debug for TransactionStatus<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransactionStatus")
            .field("has_transaction", &self.transaction.is_some())
            .field("is_new", &self.is_new)
            .field("has_suspended", &self.suspended.is_some())
            .field("depth", &self.depth)
            .finish()
    }
}

impl<R: ResourceAdapter> TransactionStatus<R> {
    pub(crate) fn new(
        transaction: Option<SharedTransaction<R>>,
        is_new: bool,
        suspended: Option<SharedTransaction<R>>,
        depth: u64,
    ) -> Self {
        Self { transaction, is_new, suspended, depth }
    }

    /// `true` if this boundary started the physical transaction it runs in.
    #[must_use]
    pub const fn is_new_transaction(&self) -> bool {
        self.is_new
    }

    /// `true` if this boundary runs inside a physical transaction at all.
    #[must_use]
    pub const fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// `true` if this boundary suspended a previously-active transaction.
    #[must_use]
    pub const fn has_suspended_transaction(&self) -> bool {
        self.suspended.is_some()
    }

    /// `true` if the transaction this boundary participates in carries a
    /// rollback demand.
    #[must_use]
    pub fn is_rollback_only(&self) -> bool {
        self.transaction.as_ref().is_some_and(|tx| tx.is_rollback_only())
    }
}
