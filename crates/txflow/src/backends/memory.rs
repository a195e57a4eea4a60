//! In-memory resource backend.
//!
//! Tables of ordered key-value pairs behind a shared lock. Transactional
//! sessions stage their writes locally and apply them on commit, so
//! uncommitted work is never visible outside the session; non-transactional
//! (auto-commit) sessions apply each write immediately.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use txflow_core::{ResourceAdapter, ResourceError, TransactionDefinition};

type Tables = HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>;

/// A buffered write awaiting commit.
enum StagedWrite {
    Put { table: String, key: Vec<u8>, value: Vec<u8> },
    Delete { table: String, key: Vec<u8> },
}

/// An in-memory tabled key-value resource.
///
/// Thread-safe; shared with its sessions via `Arc`. Carries monitoring
/// counters so callers (and tests) can observe how many physical
/// transactions were begun, committed, and rolled back.
///
/// # Example
///
/// ```
/// use txflow::backends::MemoryResource;
/// use txflow::{ResourceAdapter, TransactionDefinition};
///
/// let resource = MemoryResource::new();
/// let mut session = resource.begin(&TransactionDefinition::required()).unwrap();
/// session.put("users", b"user:1", b"Alice").unwrap();
/// assert_eq!(resource.read("users", b"user:1"), None); // not yet committed
///
/// resource.commit(session).unwrap();
/// assert_eq!(resource.read("users", b"user:1"), Some(b"Alice".to_vec()));
/// ```
pub struct MemoryResource {
    tables: Arc<RwLock<Tables>>,

    /// Total physical transactions begun (for monitoring and tests).
    transactions_begun: AtomicU64,
    /// Total commits.
    commits: AtomicU64,
    /// Total rollbacks.
    rollbacks: AtomicU64,
}

impl MemoryResource {
    /// Create an empty resource.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            transactions_begun: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
        }
    }

    /// Read committed state directly, bypassing any session.
    #[must_use]
    pub fn read(&self, table: &str, key: &[u8]) -> Option<Vec<u8>> {
        self.tables.read().get(table).and_then(|t| t.get(key).cloned())
    }

    /// Number of committed entries in a table.
    #[must_use]
    pub fn table_len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, BTreeMap::len)
    }

    /// Total physical transactions begun.
    #[must_use]
    pub fn transactions_begun(&self) -> u64 {
        self.transactions_begun.load(Ordering::Relaxed)
    }

    /// Total physical commits.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Total physical rollbacks.
    #[must_use]
    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }
}

impl Default for MemoryResource {
    fn default() -> Self {
        Self::new()
    }
}

/// A session against a [`MemoryResource`].
///
/// Transactional sessions buffer writes until commit and read their own
/// staged writes; auto-commit sessions apply writes immediately.
pub struct MemorySession {
    tables: Arc<RwLock<Tables>>,

    /// `Some` while a transaction is open on this session.
    staged: Option<Vec<StagedWrite>>,

    read_only: bool,
}

impl MemorySession {
    /// Get a value, seeing this session's own staged writes first.
    #[must_use]
    pub fn get(&self, table: &str, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(staged) = &self.staged {
            // Later writes shadow earlier ones.
            for write in staged.iter().rev() {
                match write {
                    StagedWrite::Put { table: t, key: k, value } if t == table && k == key => {
                        return Some(value.clone());
                    }
                    StagedWrite::Delete { table: t, key: k } if t == table && k == key => {
                        return None;
                    }
                    _ => {}
                }
            }
        }
        self.tables.read().get(table).and_then(|t| t.get(key).cloned())
    }

    /// Put a key-value pair.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::ReadOnly`] on a read-only session.
    pub fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), ResourceError> {
        if self.read_only {
            return Err(ResourceError::ReadOnly);
        }
        match &mut self.staged {
            Some(staged) => staged.push(StagedWrite::Put {
                table: table.to_string(),
                key: key.to_vec(),
                value: value.to_vec(),
            }),
            None => {
                let mut tables = self.tables.write();
                tables.entry(table.to_string()).or_default().insert(key.to_vec(), value.to_vec());
            }
        }
        Ok(())
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::ReadOnly`] on a read-only session.
    pub fn delete(&mut self, table: &str, key: &[u8]) -> Result<(), ResourceError> {
        if self.read_only {
            return Err(ResourceError::ReadOnly);
        }
        match &mut self.staged {
            Some(staged) => {
                staged.push(StagedWrite::Delete { table: table.to_string(), key: key.to_vec() });
            }
            None => {
                let mut tables = self.tables.write();
                if let Some(t) = tables.get_mut(table) {
                    t.remove(key);
                }
            }
        }
        Ok(())
    }
}

impl ResourceAdapter for MemoryResource {
    type Handle = MemorySession;

    fn open(&self) -> Result<Self::Handle, ResourceError> {
        Ok(MemorySession { tables: Arc::clone(&self.tables), staged: None, read_only: false })
    }

    fn begin(&self, definition: &TransactionDefinition) -> Result<Self::Handle, ResourceError> {
        // Isolation is accepted opaquely: the staging model already keeps
        // uncommitted writes invisible to every other session.
        self.transactions_begun.fetch_add(1, Ordering::Relaxed);
        Ok(MemorySession {
            tables: Arc::clone(&self.tables),
            staged: Some(Vec::new()),
            read_only: definition.is_read_only(),
        })
    }

    fn commit(&self, handle: Self::Handle) -> Result<(), ResourceError> {
        let staged = handle
            .staged
            .ok_or_else(|| ResourceError::Commit("session has no open transaction".to_string()))?;
        let mut tables = self.tables.write();
        for write in staged {
            match write {
                StagedWrite::Put { table, key, value } => {
                    tables.entry(table).or_default().insert(key, value);
                }
                StagedWrite::Delete { table, key } => {
                    if let Some(t) = tables.get_mut(&table) {
                        t.remove(&key);
                    }
                }
            }
        }
        self.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn rollback(&self, handle: Self::Handle) -> Result<(), ResourceError> {
        if handle.staged.is_none() {
            return Err(ResourceError::Rollback("session has no open transaction".to_string()));
        }
        // Staged writes are simply discarded with the session.
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
