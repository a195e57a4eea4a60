//! End-to-end unit-of-work scenarios: a member registration service that
//! writes a member record and an audit log under different propagation
//! combinations, with the log write optionally failing.

use txflow::backends::MemoryResource;
use txflow::transaction::TransactionManager;
use txflow::{ResourceError, TransactionDefinition, TransactionError, TransactionScope};

const MEMBERS: &str = "members";
const LOGS: &str = "logs";

#[derive(Debug, PartialEq, Eq)]
enum ServiceError {
    LogWriteFailed,
    Resource(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LogWriteFailed => write!(f, "log write failed"),
            Self::Resource(msg) => write!(f, "resource: {msg}"),
        }
    }
}

impl From<ResourceError> for ServiceError {
    fn from(err: ResourceError) -> Self {
        Self::Resource(err.to_string())
    }
}

type Manager = TransactionManager<MemoryResource, ServiceError>;
type Scope<'a> = TransactionScope<'a, MemoryResource, ServiceError>;
type ServiceResult = Result<(), TransactionError<ServiceError>>;

fn create_manager() -> Manager {
    TransactionManager::new(MemoryResource::new())
}

// ============================================================================
// Repositories
// ============================================================================

/// Persist the member record inside a `Required` boundary.
fn save_member(scope: &mut Scope<'_>, username: &str) -> ServiceResult {
    scope.transaction(&TransactionDefinition::required(), |scope| {
        scope.run(|session| {
            session.put(MEMBERS, username.as_bytes(), b"joined").map_err(ServiceError::from)
        })
    })
}

/// Write the audit log inside the given boundary. Usernames containing
/// `"fail"` make the write blow up after it has been staged.
fn write_log(scope: &mut Scope<'_>, username: &str, def: &TransactionDefinition) -> ServiceResult {
    scope.transaction(def, |scope| {
        scope.run(|session| {
            session.put(LOGS, username.as_bytes(), b"member joined").map_err(ServiceError::from)
        })?;
        if username.contains("fail") {
            return Err(TransactionError::Application(ServiceError::LogWriteFailed));
        }
        Ok(())
    })
}

// ============================================================================
// Services
// ============================================================================

/// Register a member and log the registration; log failures propagate.
fn join(scope: &mut Scope<'_>, username: &str, log_def: &TransactionDefinition) -> ServiceResult {
    save_member(scope, username)?;
    write_log(scope, username, log_def)
}

/// Register a member and log the registration; a failed log write is
/// swallowed because registration must not depend on logging.
fn join_with_recovery(
    scope: &mut Scope<'_>,
    username: &str,
    log_def: &TransactionDefinition,
) -> ServiceResult {
    save_member(scope, username)?;
    match write_log(scope, username, log_def) {
        Err(TransactionError::Application(ServiceError::LogWriteFailed)) => Ok(()),
        other => other,
    }
}

fn member_exists(manager: &Manager, username: &str) -> bool {
    manager.adapter().read(MEMBERS, username.as_bytes()).is_some()
}

fn log_exists(manager: &Manager, username: &str) -> bool {
    manager.adapter().read(LOGS, username.as_bytes()).is_some()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_unwrapped_service_commits_both_writes() {
    let manager = create_manager();
    let mut ctx = manager.context();

    // The service itself runs outside any transaction; each repository
    // owns its own physical transaction.
    manager
        .with_transaction(&mut ctx, &TransactionDefinition::supports(), |scope| {
            join(scope, "alice", &TransactionDefinition::required())
        })
        .expect("registration failed");

    assert!(member_exists(&manager, "alice"));
    assert!(log_exists(&manager, "alice"));
    assert_eq!(manager.adapter().transactions_begun(), 2);
    assert_eq!(manager.adapter().commits(), 2);
}

#[test]
fn test_unwrapped_service_keeps_member_when_log_fails() {
    let manager = create_manager();
    let mut ctx = manager.context();

    let err = manager
        .with_transaction(&mut ctx, &TransactionDefinition::supports(), |scope| {
            join(scope, "alice-fail", &TransactionDefinition::required())
        })
        .expect_err("log failure must propagate");

    assert_eq!(err.into_application(), Some(ServiceError::LogWriteFailed));
    // Only the log write was rolled back; there was no outer transaction
    // for the failure to cascade into.
    assert!(member_exists(&manager, "alice-fail"));
    assert!(!log_exists(&manager, "alice-fail"));
}

#[test]
fn test_single_transaction_spans_both_repositories() {
    let manager = create_manager();
    let mut ctx = manager.context();

    // One transaction at the service; the writes run directly against it.
    manager
        .with_transaction(&mut ctx, &TransactionDefinition::required(), |scope| {
            scope.run(|s| s.put(MEMBERS, b"alice", b"joined").map_err(ServiceError::from))?;
            scope.run(|s| s.put(LOGS, b"alice", b"member joined").map_err(ServiceError::from))?;
            Ok(())
        })
        .expect("registration failed");

    assert!(member_exists(&manager, "alice"));
    assert!(log_exists(&manager, "alice"));
    assert_eq!(manager.adapter().transactions_begun(), 1);
}

#[test]
fn test_outer_transaction_absorbs_joined_repositories() {
    let manager = create_manager();
    let mut ctx = manager.context();

    manager
        .with_transaction(&mut ctx, &TransactionDefinition::required(), |scope| {
            join(scope, "alice", &TransactionDefinition::required())
        })
        .expect("registration failed");

    assert!(member_exists(&manager, "alice"));
    assert!(log_exists(&manager, "alice"));
    // Both repositories joined the service's physical transaction.
    assert_eq!(manager.adapter().transactions_begun(), 1);
    assert_eq!(manager.adapter().commits(), 1);
}

#[test]
fn test_outer_transaction_rolls_back_everything_when_log_fails() {
    let manager = create_manager();
    let mut ctx = manager.context();

    let err = manager
        .with_transaction(&mut ctx, &TransactionDefinition::required(), |scope| {
            join(scope, "alice-fail", &TransactionDefinition::required())
        })
        .expect_err("log failure must propagate");

    assert_eq!(err.into_application(), Some(ServiceError::LogWriteFailed));
    assert!(!member_exists(&manager, "alice-fail"));
    assert!(!log_exists(&manager, "alice-fail"));
    assert_eq!(manager.adapter().rollbacks(), 1);
}

#[test]
fn test_recovery_inside_joined_transaction_still_rolls_back() {
    let manager = create_manager();
    let mut ctx = manager.context();

    // The service swallows the log failure, but the log repository already
    // voted rollback-only on the shared transaction.
    let err = manager
        .with_transaction(&mut ctx, &TransactionDefinition::required(), |scope| {
            join_with_recovery(scope, "alice-fail", &TransactionDefinition::required())
        })
        .expect_err("the swallowed failure must surface as UnexpectedRollback");

    assert!(matches!(err, TransactionError::UnexpectedRollback));
    assert!(!member_exists(&manager, "alice-fail"));
    assert!(!log_exists(&manager, "alice-fail"));
}

#[test]
fn test_recovery_with_independent_log_transaction_succeeds() {
    let manager = create_manager();
    let mut ctx = manager.context();

    // The log runs in its own physical transaction; its failure rolls back
    // only the log write, and the swallowed error stays swallowed.
    manager
        .with_transaction(&mut ctx, &TransactionDefinition::required(), |scope| {
            join_with_recovery(scope, "alice-fail", &TransactionDefinition::requires_new())
        })
        .expect("registration must survive the log failure");

    assert!(member_exists(&manager, "alice-fail"));
    assert!(!log_exists(&manager, "alice-fail"));
    assert_eq!(manager.adapter().transactions_begun(), 2);
    assert_eq!(manager.adapter().commits(), 1);
    assert_eq!(manager.adapter().rollbacks(), 1);
}
