//! The per-call-chain transaction context.
//!
//! A [`TransactionContext`] is the registry slot binding the currently
//! active physical transaction to one logical call chain. It is created per
//! chain (one per thread of work, one per task) and threaded explicitly
//! through the chain rather than read from ambient global state, so two
//! concurrent chains can never observe each other's binding.
//!
//! The engine sets the binding when a physical transaction starts, clears it
//! on completion, and save/restores it around suspending boundaries
//! (`RequiresNew`, `NotSupported`). The context also tracks how many
//! boundaries are currently open so that mismatched begin/complete nesting
//! fails fast.

use std::sync::Arc;

use txflow_core::ResourceAdapter;

use crate::transaction::SharedTransaction;

/// Registry slot holding at most one active physical transaction for one
/// logical call chain.
///
/// Obtain one from
/// [`TransactionManager::context`](crate::transaction::TransactionManager::context)
/// (or [`TransactionContext::new`]) at the start of a chain, and pass it by
/// `&mut` into every transactional boundary of that chain.
pub struct TransactionContext<R: ResourceAdapter> {
    /// The currently bound physical transaction, if any.
    current: Option<SharedTransaction<R>>,

    /// Number of boundaries currently open on this chain.
    depth: u64,
}

impl<R: ResourceAdapter> TransactionContext<R> {
    /// Create an empty context for a new call chain.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None, depth: 0 }
    }

    /// `true` if a physical transaction is bound to this chain.
    #[must_use]
    pub fn is_transaction_active(&self) -> bool {
        self.current.is_some()
    }

    /// The id of the bound physical transaction, if any.
    #[must_use]
    pub fn current_transaction_id(&self) -> Option<u64> {
        self.current.as_ref().map(|tx| tx.id())
    }

    /// Number of boundaries currently open on this chain.
    #[must_use]
    pub const fn open_boundaries(&self) -> u64 {
        self.depth
    }

    /// Bind a physical transaction as the chain's active transaction.
    ///
    /// At most one physical transaction may be bound at a time; panics if
    /// the slot is already occupied rather than silently overwriting it.
    pub(crate) fn bind(&mut self, tx: SharedTransaction<R>) {
        assert!(self.current.is_none(), "context already has a bound transaction");
        self.current = Some(tx);
    }

    /// Clear and return the active binding, if any.
    pub(crate) fn unbind(&mut self) -> Option<SharedTransaction<R>> {
        self.current.take()
    }

    /// A clone of the active binding, if any.
    pub(crate) fn current_cloned(&self) -> Option<SharedTransaction<R>> {
        self.current.as_ref().map(Arc::clone)
    }

    /// A reference to the active binding, if any.
    pub(crate) fn current(&self) -> Option<&SharedTransaction<R>> {
        self.current.as_ref()
    }

    /// Record a boundary entry; returns the new depth.
    pub(crate) fn enter(&mut self) -> u64 {
        self.depth += 1;
        self.depth
    }

    /// Record a boundary exit.
    pub(crate) fn exit(&mut self) {
        debug_assert!(self.depth > 0, "boundary exit without matching entry");
        self.depth = self.depth.saturating_sub(1);
    }
}

impl<R: ResourceAdapter> Default for TransactionContext<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryResource;
    use crate::transaction::{PhysicalTransaction, TransactionManager};
    use txflow_core::{ResourceAdapter, TransactionDefinition};

    #[test]
    fn test_new_context_is_empty() {
        let ctx: TransactionContext<MemoryResource> = TransactionContext::new();
        assert!(!ctx.is_transaction_active());
        assert_eq!(ctx.current_transaction_id(), None);
        assert_eq!(ctx.open_boundaries(), 0);
    }

    #[test]
    fn test_bind_and_unbind_round_trip() {
        let manager: TransactionManager<MemoryResource, String> =
            TransactionManager::new(MemoryResource::new());
        let mut ctx = manager.context();

        let status = manager
            .begin(&mut ctx, &TransactionDefinition::required())
            .expect("failed to begin");
        assert!(ctx.is_transaction_active());
        assert_eq!(ctx.open_boundaries(), 1);

        manager.complete(&mut ctx, status, Ok(())).expect("failed to complete");
        assert!(!ctx.is_transaction_active());
        assert_eq!(ctx.open_boundaries(), 0);
    }

    #[test]
    #[should_panic(expected = "context already has a bound transaction")]
    fn test_binding_over_an_existing_transaction_panics() {
        let resource = Arc::new(MemoryResource::new());
        let mut ctx: TransactionContext<MemoryResource> = TransactionContext::new();

        for id in 1..=2 {
            let handle = resource
                .begin(&TransactionDefinition::required())
                .expect("failed to begin");
            ctx.bind(Arc::new(PhysicalTransaction::new(id, Arc::clone(&resource), handle)));
        }
    }
}
