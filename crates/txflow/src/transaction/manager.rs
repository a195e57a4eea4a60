//! Transaction manager: propagation decisions and completion coordination.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use txflow_core::{
    Propagation, ResourceAdapter, TransactionDefinition, TransactionError, TransactionResult,
};

use super::physical::{PhysicalTransaction, SharedTransaction};
use super::scope::TransactionScope;
use super::status::TransactionStatus;
use crate::context::TransactionContext;

/// Classifies application errors as rollback-triggering or commit-eligible.
///
/// The default policy treats every application error as rollback-triggering;
/// callers designate an explicit non-rollback set with
/// [`RollbackPolicy::commit_on`]. Engine errors
/// ([`System`](TransactionError::System),
/// [`UnexpectedRollback`](TransactionError::UnexpectedRollback),
/// [`IllegalState`](TransactionError::IllegalState)) always trigger rollback
/// and never reach the policy.
pub struct RollbackPolicy<E> {
    commit_on: Option<Arc<dyn Fn(&E) -> bool + Send + Sync>>,
}

impl<E> RollbackPolicy<E> {
    /// Every application error triggers rollback. This is the default.
    #[must_use]
    pub const fn rollback_always() -> Self {
        Self { commit_on: None }
    }

    /// Application errors matching the predicate are commit-eligible: the
    /// boundary completes as if the operation had returned normally, and the
    /// error propagates to the caller unchanged.
    #[must_use]
    pub fn commit_on(predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self { commit_on: Some(Arc::new(predicate)) }
    }

    /// `true` if the error demands rollback under this policy.
    #[must_use]
    pub fn triggers_rollback(&self, error: &E) -> bool {
        match &self.commit_on {
            Some(predicate) => !predicate(error),
            None => true,
        }
    }
}

impl<E> Clone for RollbackPolicy<E> {
    fn clone(&self) -> Self {
        Self { commit_on: self.commit_on.clone() }
    }
}

impl<E> Default for RollbackPolicy<E> {
    fn default() -> Self {
        Self::rollback_always()
    }
}

impl<E> fmt::Debug for RollbackPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollbackPolicy")
            .field("has_commit_on", &self.commit_on.is_some())
            .finish()
    }
}

/// Configuration for the transaction manager.
pub struct TransactionManagerConfig<E> {
    /// How application errors are classified at completion.
    pub rollback_policy: RollbackPolicy<E>,
}

// Manual impls: the derives would demand the same bounds of `E`, which the
// config does not actually need.
impl<E> Clone for TransactionManagerConfig<E> {
    fn clone(&self) -> Self {
        Self { rollback_policy: self.rollback_policy.clone() }
    }
}

impl<E> Default for TransactionManagerConfig<E> {
    fn default() -> Self {
        Self { rollback_policy: RollbackPolicy::default() }
    }
}

impl<E> fmt::Debug for TransactionManagerConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManagerConfig")
            .field("rollback_policy", &self.rollback_policy)
            .finish()
    }
}

/// Coordinates transactional boundaries over one resource adapter.
///
/// The manager is the propagation engine and completion coordinator in one:
/// [`begin`](Self::begin) decides how a boundary relates to the chain's
/// active transaction, [`complete`](Self::complete) decides commit versus
/// rollback and escalates participant votes, and
/// [`with_transaction`](Self::with_transaction) wraps both around an
/// operation as a scoped acquisition.
///
/// # Thread Safety
///
/// The manager is `Send + Sync` and is shared across call chains via
/// `Arc<TransactionManager>`. All per-chain state lives in the
/// [`TransactionContext`] each chain owns; the manager itself takes no locks
/// beyond each physical transaction's own handle mutex.
///
/// # Type Parameters
///
/// - `R`: the resource adapter (storage backend capability).
/// - `E`: the application error type produced by wrapped operations.
pub struct TransactionManager<R: ResourceAdapter, E> {
    /// The backing resource.
    adapter: Arc<R>,

    config: TransactionManagerConfig<E>,

    /// Counter for generating unique physical transaction ids.
    next_tx_id: AtomicU64,
}

impl<R: ResourceAdapter, E> TransactionManager<R, E> {
    /// Create a manager with the default configuration (every application
    /// error triggers rollback).
    pub fn new(adapter: R) -> Self {
        Self::with_config(adapter, TransactionManagerConfig::default())
    }

    /// Create a manager with custom configuration.
    pub fn with_config(adapter: R, config: TransactionManagerConfig<E>) -> Self {
        Self { adapter: Arc::new(adapter), config, next_tx_id: AtomicU64::new(1) }
    }

    /// A fresh, empty context for a new logical call chain.
    #[must_use]
    pub fn context(&self) -> TransactionContext<R> {
        TransactionContext::new()
    }

    /// The rollback classification policy in effect.
    #[must_use]
    pub fn rollback_policy(&self) -> &RollbackPolicy<E> {
        &self.config.rollback_policy
    }

    /// A reference to the underlying resource adapter.
    #[must_use]
    pub fn adapter(&self) -> &R {
        &self.adapter
    }

    /// An `Arc` to the underlying resource adapter.
    #[must_use]
    pub fn adapter_arc(&self) -> Arc<R> {
        Arc::clone(&self.adapter)
    }

    /// Run `op` inside a transactional boundary described by `definition`.
    ///
    /// This is the scoped acquisition-with-guaranteed-release form of
    /// [`begin`](Self::begin)/[`complete`](Self::complete): completion runs
    /// on every exit path of `op`, and a physical transaction abandoned by a
    /// panic still rolls itself back when its last reference drops.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::IllegalState`] if a propagation rule is violated
    /// - [`TransactionError::System`] if the backend fails to begin, commit,
    ///   or roll back
    /// - [`TransactionError::UnexpectedRollback`] if `op` succeeded but a
    ///   participant's vote forced a rollback
    /// - [`TransactionError::Application`] re-raising `op`'s own error
    pub fn with_transaction<T, F>(
        &self,
        ctx: &mut TransactionContext<R>,
        definition: &TransactionDefinition,
        op: F,
    ) -> TransactionResult<T, E>
    where
        F: FnOnce(&mut TransactionScope<'_, R, E>) -> TransactionResult<T, E>,
    {
        let status = self.begin(ctx, definition)?;
        let outcome = {
            let mut scope = TransactionScope::new(self, ctx);
            op(&mut scope)
        };
        self.complete(ctx, status, outcome)
    }

    /// Enter a transactional boundary.
    ///
    /// Consults the propagation mode against the chain's active transaction
    /// and returns a [`TransactionStatus`] that must be handed back to
    /// [`complete`](Self::complete). Prefer
    /// [`with_transaction`](Self::with_transaction), which guarantees the
    /// pairing.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::IllegalState`] for `Never` with an active
    ///   transaction or `Mandatory` without one
    /// - [`TransactionError::System`] if the backend cannot start a physical
    ///   transaction (a transaction suspended for `RequiresNew` is restored
    ///   before the error is reported)
    pub fn begin(
        &self,
        ctx: &mut TransactionContext<R>,
        definition: &TransactionDefinition,
    ) -> TransactionResult<TransactionStatus<R>, E> {
        let (transaction, is_new, suspended) = match definition.propagation() {
            Propagation::Required => match ctx.current_cloned() {
                Some(tx) => {
                    debug!(tx_id = tx.id(), "joining existing transaction");
                    (Some(tx), false, None)
                }
                None => (Some(self.start(ctx, definition)?), true, None),
            },
            Propagation::RequiresNew => {
                let suspended = ctx.unbind();
                if let Some(outer) = suspended.as_ref() {
                    debug!(tx_id = outer.id(), "suspending transaction");
                }
                match self.start(ctx, definition) {
                    Ok(tx) => (Some(tx), true, suspended),
                    Err(err) => {
                        // The outer transaction must survive a failed begin.
                        if let Some(outer) = suspended {
                            debug!(tx_id = outer.id(), "resuming suspended transaction");
                            ctx.bind(outer);
                        }
                        return Err(err);
                    }
                }
            }
            Propagation::Supports => match ctx.current_cloned() {
                Some(tx) => {
                    debug!(tx_id = tx.id(), "joining existing transaction");
                    (Some(tx), false, None)
                }
                None => (None, false, None),
            },
            Propagation::NotSupported => {
                let suspended = ctx.unbind();
                if let Some(outer) = suspended.as_ref() {
                    debug!(tx_id = outer.id(), "suspending transaction");
                }
                (None, false, suspended)
            }
            Propagation::Never => {
                if ctx.is_transaction_active() {
                    return Err(TransactionError::illegal_state(
                        "existing transaction found for propagation Never",
                    ));
                }
                (None, false, None)
            }
            Propagation::Mandatory => match ctx.current_cloned() {
                Some(tx) => {
                    debug!(tx_id = tx.id(), "joining existing transaction");
                    (Some(tx), false, None)
                }
                None => {
                    return Err(TransactionError::illegal_state(
                        "no existing transaction found for propagation Mandatory",
                    ))
                }
            },
        };

        let depth = ctx.enter();
        Ok(TransactionStatus::new(transaction, is_new, suspended, depth))
    }

    /// Exit a transactional boundary with the operation's outcome.
    ///
    /// Executes the completion decision table: classify the outcome, let
    /// participants vote and re-raise, let the owner perform the single
    /// physical commit or rollback, surface
    /// [`UnexpectedRollback`](TransactionError::UnexpectedRollback) when a
    /// committable outcome was undone by a participant's vote, and resume
    /// any suspended transaction.
    ///
    /// # Errors
    ///
    /// See [`with_transaction`](Self::with_transaction). Additionally fails
    /// with [`TransactionError::IllegalState`] if this boundary is completed
    /// while a nested boundary is still open.
    pub fn complete<T>(
        &self,
        ctx: &mut TransactionContext<R>,
        mut status: TransactionStatus<R>,
        outcome: TransactionResult<T, E>,
    ) -> TransactionResult<T, E> {
        if ctx.open_boundaries() != status.depth {
            return Err(TransactionError::IllegalState(format!(
                "mismatched transaction nesting: completing a boundary opened at depth {} \
                 while {} boundaries are open",
                status.depth,
                ctx.open_boundaries()
            )));
        }
        ctx.exit();

        let rollback_triggering = match &outcome {
            Ok(_) => false,
            Err(TransactionError::Application(err)) => {
                self.config.rollback_policy.triggers_rollback(err)
            }
            Err(_) => true,
        };

        let result = match status.transaction.take() {
            None => outcome,
            Some(tx) if status.is_new => self.finish_owner(ctx, &tx, outcome, rollback_triggering),
            Some(tx) => Self::finish_participant(&tx, outcome, rollback_triggering),
        };

        if let Some(outer) = status.suspended.take() {
            debug!(tx_id = outer.id(), "resuming suspended transaction");
            ctx.bind(outer);
        }

        result
    }

    /// Start a new physical transaction and bind it to the context.
    fn start(
        &self,
        ctx: &mut TransactionContext<R>,
        definition: &TransactionDefinition,
    ) -> TransactionResult<SharedTransaction<R>, E> {
        let handle = self.adapter.begin(definition).map_err(TransactionError::System)?;
        let id = self.next_tx_id.fetch_add(1, Ordering::Relaxed);
        let tx = Arc::new(PhysicalTransaction::new(id, Arc::clone(&self.adapter), handle));
        debug!(
            tx_id = id,
            propagation = ?definition.propagation(),
            read_only = definition.is_read_only(),
            "started new physical transaction"
        );
        ctx.bind(Arc::clone(&tx));
        Ok(tx)
    }

    /// Owner completion: unbind, then the single physical commit or rollback.
    fn finish_owner<T>(
        &self,
        ctx: &mut TransactionContext<R>,
        tx: &SharedTransaction<R>,
        outcome: TransactionResult<T, E>,
        rollback_triggering: bool,
    ) -> TransactionResult<T, E> {
        match ctx.unbind() {
            Some(bound) if Arc::ptr_eq(&bound, tx) => {}
            Some(other) => {
                ctx.bind(other);
                return Err(TransactionError::illegal_state(
                    "context binding does not match the owning transaction",
                ));
            }
            None => {
                return Err(TransactionError::illegal_state(
                    "owning transaction is no longer bound to the context",
                ))
            }
        }

        let participant_vote = tx.is_rollback_only();
        if rollback_triggering || participant_vote {
            debug!(tx_id = tx.id(), vote = participant_vote, "rolling back transaction");
            tx.rollback()?;
            match outcome {
                Err(err) if rollback_triggering => Err(err),
                // The local outcome looked committable; the rollback came
                // from a participant's vote and must not stay silent.
                _ => {
                    warn!(tx_id = tx.id(), "committable outcome undone by participant rollback vote");
                    Err(TransactionError::UnexpectedRollback)
                }
            }
        } else {
            debug!(tx_id = tx.id(), "committing transaction");
            tx.commit()?;
            outcome
        }
    }

    /// Participant completion: vote on failure, never touch the resource.
    fn finish_participant<T>(
        tx: &SharedTransaction<R>,
        outcome: TransactionResult<T, E>,
        rollback_triggering: bool,
    ) -> TransactionResult<T, E> {
        if rollback_triggering {
            debug!(tx_id = tx.id(), "participant failed; marking shared transaction rollback-only");
            tx.mark_rollback_only();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryResource;

    fn manager() -> TransactionManager<MemoryResource, String> {
        TransactionManager::new(MemoryResource::new())
    }

    #[test]
    fn test_default_policy_rolls_back_on_any_error() {
        let policy: RollbackPolicy<String> = RollbackPolicy::default();
        assert!(policy.triggers_rollback(&"anything".to_string()));
    }

    #[test]
    fn test_commit_on_policy_exempts_matching_errors() {
        let policy = RollbackPolicy::commit_on(|err: &String| err == "recoverable");
        assert!(!policy.triggers_rollback(&"recoverable".to_string()));
        assert!(policy.triggers_rollback(&"fatal".to_string()));
    }

    #[test]
    fn test_begin_required_starts_and_binds() {
        let manager = manager();
        let mut ctx = manager.context();

        let status = manager
            .begin(&mut ctx, &TransactionDefinition::required())
            .expect("failed to begin");
        assert!(status.is_new_transaction());
        assert!(ctx.is_transaction_active());

        manager.complete(&mut ctx, status, Ok(())).expect("failed to complete");
        assert!(!ctx.is_transaction_active());
    }

    #[test]
    fn test_begin_never_with_active_transaction_fails() {
        let manager = manager();
        let mut ctx = manager.context();

        let outer = manager
            .begin(&mut ctx, &TransactionDefinition::required())
            .expect("failed to begin outer");

        let err = manager
            .begin(&mut ctx, &TransactionDefinition::never())
            .expect_err("Never must refuse an active transaction");
        assert!(matches!(err, TransactionError::IllegalState(_)));

        manager.complete(&mut ctx, outer, Ok(())).expect("failed to complete outer");
    }

    #[test]
    fn test_begin_mandatory_without_transaction_fails() {
        let manager = manager();
        let mut ctx = manager.context();

        let err = manager
            .begin(&mut ctx, &TransactionDefinition::mandatory())
            .expect_err("Mandatory must require an active transaction");
        assert!(matches!(err, TransactionError::IllegalState(_)));
    }

    #[test]
    fn test_mismatched_nesting_fails_fast() {
        let manager = manager();
        let mut ctx = manager.context();

        let outer = manager
            .begin(&mut ctx, &TransactionDefinition::required())
            .expect("failed to begin outer");
        let inner = manager
            .begin(&mut ctx, &TransactionDefinition::required())
            .expect("failed to begin inner");

        let err = manager
            .complete(&mut ctx, outer, Ok(()))
            .expect_err("completing the outer boundary first must fail");
        assert!(matches!(err, TransactionError::IllegalState(_)));

        // The inner boundary can still complete normally.
        manager.complete(&mut ctx, inner, Ok(())).expect("failed to complete inner");
    }
}
