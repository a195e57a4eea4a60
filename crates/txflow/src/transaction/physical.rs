//! Physical transaction state.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use txflow_core::{ResourceAdapter, TransactionError, TransactionResult};

/// A physical transaction shared between its owner and any joined
/// participants.
pub type SharedTransaction<R> = Arc<PhysicalTransaction<R>>;

/// State guarded by the transaction's mutex.
struct State<R: ResourceAdapter> {
    /// The backend handle; taken by the single commit or rollback.
    handle: Option<R::Handle>,

    /// Monotonic: once set, never cleared.
    rollback_only: bool,
}

/// One physical transaction against the backing resource.
///
/// A physical transaction is created by the boundary that starts it (the
/// owner) and shared, via [`SharedTransaction`], with every nested boundary
/// that joins it. Participants may only vote by marking it rollback-only;
/// the owner performs the single physical commit or rollback, which consumes
/// the backend handle.
///
/// If a physical transaction is dropped without having been completed - a
/// panic or cancellation unwound through the boundary - it rolls itself back
/// so the backend is never left with a dangling transaction.
pub struct PhysicalTransaction<R: ResourceAdapter> {
    /// Unique id, for logging and suspend/resume assertions.
    id: u64,

    /// The adapter that created the handle; used to complete it.
    adapter: Arc<R>,

    state: Mutex<State<R>>,
}

impl<R: ResourceAdapter> PhysicalTransaction<R> {
    pub(crate) fn new(id: u64, adapter: Arc<R>, handle: R::Handle) -> Self {
        Self { id, adapter, state: Mutex::new(State { handle: Some(handle), rollback_only: false }) }
    }

    /// The transaction id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// `true` if a participant (or the owner) has demanded rollback.
    #[must_use]
    pub fn is_rollback_only(&self) -> bool {
        self.state.lock().rollback_only
    }

    /// `true` until the single commit or rollback has consumed the handle.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    /// Demand that this transaction eventually rolls back.
    ///
    /// The flag is monotonic: no later action can clear it.
    pub fn mark_rollback_only(&self) {
        let mut state = self.state.lock();
        if !state.rollback_only {
            state.rollback_only = true;
            debug!(tx_id = self.id, "transaction marked rollback-only");
        }
    }

    /// Run an operation against the live backend handle.
    pub(crate) fn execute<T, E>(
        &self,
        op: impl FnOnce(&mut R::Handle) -> Result<T, E>,
    ) -> TransactionResult<T, E> {
        let mut state = self.state.lock();
        let handle = state
            .handle
            .as_mut()
            .ok_or_else(|| TransactionError::illegal_state("physical transaction already completed"))?;
        op(handle).map_err(TransactionError::Application)
    }

    /// Physically commit, consuming the handle.
    pub(crate) fn commit<E>(&self) -> TransactionResult<(), E> {
        let handle = self.take_handle()?;
        self.adapter.commit(handle).map_err(TransactionError::System)
    }

    /// Physically roll back, consuming the handle.
    pub(crate) fn rollback<E>(&self) -> TransactionResult<(), E> {
        let handle = self.take_handle()?;
        self.adapter.rollback(handle).map_err(TransactionError::System)
    }

    fn take_handle<E>(&self) -> TransactionResult<R::Handle, E> {
        self.state
            .lock()
            .handle
            .take()
            .ok_or_else(|| TransactionError::illegal_state("physical transaction already completed"))
    }
}

impl<R: ResourceAdapter> Drop for PhysicalTransaction<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().handle.take() {
            warn!(tx_id = self.id, "rolling back abandoned physical transaction");
            if let Err(err) = self.adapter.rollback(handle) {
                warn!(tx_id = self.id, error = %err, "rollback of abandoned transaction failed");
            }
        }
    }
}
