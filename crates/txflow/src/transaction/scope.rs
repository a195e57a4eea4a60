//! The scope handed to operations running inside a boundary.

use tracing::debug;

use txflow_core::{ResourceAdapter, TransactionDefinition, TransactionError, TransactionResult};

use super::manager::TransactionManager;
use crate::context::TransactionContext;

/// Capabilities available to an operation while its boundary is open.
///
/// A scope borrows the chain's context for the duration of the operation, so
/// everything the operation does - resource access, nested boundaries,
/// rollback votes - flows through the same chain.
pub struct TransactionScope<'a, R: ResourceAdapter, E> {
    manager: &'a TransactionManager<R, E>,
    ctx: &'a mut TransactionContext<R>,
}

impl<'a, R: ResourceAdapter, E> TransactionScope<'a, R, E> {
    pub(crate) fn new(
        manager: &'a TransactionManager<R, E>,
        ctx: &'a mut TransactionContext<R>,
    ) -> Self {
        Self { manager, ctx }
    }

    /// Run an opaque operation against the backing resource.
    ///
    /// Inside a transaction the operation receives the transaction's handle;
    /// outside one (`Supports` with nothing active, `NotSupported`, `Never`)
    /// it receives an ephemeral auto-commit session that is released when
    /// the operation returns.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::System`] if an auto-commit session cannot be
    ///   opened
    /// - [`TransactionError::Application`] wrapping the operation's own
    ///   error
    pub fn run<T>(
        &mut self,
        op: impl FnOnce(&mut R::Handle) -> Result<T, E>,
    ) -> TransactionResult<T, E> {
        match self.ctx.current_cloned() {
            Some(tx) => tx.execute(op),
            None => {
                debug!("running operation outside a transaction");
                let mut handle = self.manager.adapter().open().map_err(TransactionError::System)?;
                op(&mut handle).map_err(TransactionError::Application)
            }
        }
    }

    /// Open a nested transactional boundary on the same chain.
    ///
    /// Equivalent to calling
    /// [`TransactionManager::with_transaction`] with this scope's context.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::with_transaction`].
    pub fn transaction<T, F>(
        &mut self,
        definition: &TransactionDefinition,
        op: F,
    ) -> TransactionResult<T, E>
    where
        F: FnOnce(&mut TransactionScope<'_, R, E>) -> TransactionResult<T, E>,
    {
        self.manager.with_transaction(self.ctx, definition, op)
    }

    /// Demand that the current transaction eventually rolls back, without
    /// raising an error.
    ///
    /// If this boundary joined an outer transaction, the vote forces the
    /// owner to roll back - and to surface
    /// [`UnexpectedRollback`](TransactionError::UnexpectedRollback) if its
    /// own outcome looked committable.
    ///
    /// # Errors
    ///
    /// [`TransactionError::IllegalState`] if no transaction is bound to the
    /// chain.
    pub fn set_rollback_only(&mut self) -> TransactionResult<(), E> {
        match self.ctx.current() {
            Some(tx) => {
                tx.mark_rollback_only();
                Ok(())
            }
            None => Err(TransactionError::illegal_state(
                "cannot mark rollback-only: no transaction bound to the current context",
            )),
        }
    }

    /// `true` if this chain currently runs inside a physical transaction.
    #[must_use]
    pub fn has_transaction(&self) -> bool {
        self.ctx.is_transaction_active()
    }

    /// `true` if the current transaction carries a rollback demand.
    #[must_use]
    pub fn is_rollback_only(&self) -> bool {
        self.ctx.current().is_some_and(|tx| tx.is_rollback_only())
    }

    /// The id of the current physical transaction, if any.
    #[must_use]
    pub fn current_transaction_id(&self) -> Option<u64> {
        self.ctx.current_transaction_id()
    }
}
