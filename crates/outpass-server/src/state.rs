// crates/outpass-server/src/state.rs
// ============================================================================
// Module: Outpass Server State
// Description: Shared application state wiring stores, verifier, and audit.
// Purpose: Give every handler one cloneable handle over the decision engine.
// Dependencies: outpass-config, outpass-core, outpass-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! The server state owns the gate verifier (and through it the lifecycle
//! manager) over trait-object store handles, so the same handler code runs
//! against the in-memory backend and the durable `SQLite` backend. Core
//! never reads the wall clock; [`wall_clock`] is the single place the
//! server turns system time into a [`Timestamp`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use outpass_config::ServerConfig;
use outpass_core::GateLogStore;
use outpass_core::GateVerifier;
use outpass_core::LifecycleConfig;
use outpass_core::LifecycleManager;
use outpass_core::MemoryGateLogStore;
use outpass_core::MemoryPolicyStore;
use outpass_core::MemoryRequestStore;
use outpass_core::MemoryStudentDirectory;
use outpass_core::MemoryTrustLedger;
use outpass_core::PolicyStore;
use outpass_core::RequestStore;
use outpass_core::StoreError;
use outpass_core::StudentDirectory;
use outpass_core::StudentProfile;
use outpass_core::Timestamp;
use outpass_core::TrustLedger;
use outpass_core::WeekdayCalendar;
use outpass_store_sqlite::SqliteStore;

use crate::audit::AuditSink;

// ============================================================================
// SECTION: Shared Handles
// ============================================================================

/// Shared request store handle.
pub type SharedRequests = Arc<dyn RequestStore + Send + Sync>;

/// Shared policy store handle.
pub type SharedPolicies = Arc<dyn PolicyStore + Send + Sync>;

/// Shared trust ledger handle.
pub type SharedTrust = Arc<dyn TrustLedger + Send + Sync>;

/// Shared student directory handle.
pub type SharedDirectory = Arc<dyn StudentDirectory + Send + Sync>;

/// Shared gate log store handle.
pub type SharedLogs = Arc<dyn GateLogStore + Send + Sync>;

/// Lifecycle manager over shared store handles.
pub type ServerManager =
    LifecycleManager<SharedRequests, SharedPolicies, SharedTrust, SharedDirectory, WeekdayCalendar>;

/// Gate verifier over shared store handles.
pub type ServerVerifier = GateVerifier<
    SharedRequests,
    SharedPolicies,
    SharedTrust,
    SharedDirectory,
    WeekdayCalendar,
    SharedLogs,
>;

// ============================================================================
// SECTION: Enrollment
// ============================================================================

/// Write access to the student directory.
///
/// Reads flow through [`StudentDirectory`]; enrollment is backend-specific
/// and only the admin surface needs it.
pub trait StudentEnroller: Send + Sync {
    /// Inserts or replaces a student profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn register(&self, profile: &StudentProfile) -> Result<(), StoreError>;
}

impl StudentEnroller for MemoryStudentDirectory {
    fn register(&self, profile: &StudentProfile) -> Result<(), StoreError> {
        self.enroll(profile.clone())
    }
}

impl StudentEnroller for SqliteStore {
    fn register(&self, profile: &StudentProfile) -> Result<(), StoreError> {
        self.enroll_student(profile)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Request Limits
// ============================================================================

/// Per-request HTTP limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Per-request handling timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl RequestLimits {
    /// Returns the handling timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl From<&ServerConfig> for RequestLimits {
    fn from(server: &ServerConfig) -> Self {
        Self {
            max_body_bytes: server.max_body_bytes,
            request_timeout_ms: server.request_timeout_ms,
        }
    }
}

// ============================================================================
// SECTION: Application State
// ============================================================================

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Gate verifier wrapping the lifecycle manager.
    verifier: Arc<ServerVerifier>,
    /// Policy store handle for the admin surface.
    policies: SharedPolicies,
    /// Directory write access for the admin surface.
    enroller: Arc<dyn StudentEnroller>,
    /// Audit sink for lifecycle, gate, and sweep events.
    audit: Arc<dyn AuditSink>,
    /// Per-request HTTP limits.
    limits: RequestLimits,
}

impl AppState {
    /// Creates state over pre-wired handles.
    #[must_use]
    pub fn new(
        verifier: ServerVerifier,
        policies: SharedPolicies,
        enroller: Arc<dyn StudentEnroller>,
        audit: Arc<dyn AuditSink>,
        limits: RequestLimits,
    ) -> Self {
        Self {
            verifier: Arc::new(verifier),
            policies,
            enroller,
            audit,
            limits,
        }
    }

    /// Creates state over fresh in-memory stores.
    #[must_use]
    pub fn in_memory(
        config: LifecycleConfig,
        calendar: WeekdayCalendar,
        audit: Arc<dyn AuditSink>,
        limits: RequestLimits,
    ) -> Self {
        let directory = Arc::new(MemoryStudentDirectory::new());
        let policies: SharedPolicies = Arc::new(MemoryPolicyStore::new());
        let requests: SharedRequests = Arc::new(MemoryRequestStore::new());
        let trust: SharedTrust = Arc::new(MemoryTrustLedger::new());
        let logs: SharedLogs = Arc::new(MemoryGateLogStore::new());
        let manager = LifecycleManager::new(
            requests,
            Arc::clone(&policies),
            trust,
            Arc::clone(&directory) as SharedDirectory,
            calendar,
            config,
        );
        Self::new(GateVerifier::new(manager, logs), policies, directory, audit, limits)
    }

    /// Creates state over one shared `SQLite` store.
    #[must_use]
    pub fn with_sqlite(
        store: Arc<SqliteStore>,
        config: LifecycleConfig,
        calendar: WeekdayCalendar,
        audit: Arc<dyn AuditSink>,
        limits: RequestLimits,
    ) -> Self {
        let policies: SharedPolicies = Arc::clone(&store) as SharedPolicies;
        let manager = LifecycleManager::new(
            Arc::clone(&store) as SharedRequests,
            Arc::clone(&policies),
            Arc::clone(&store) as SharedTrust,
            Arc::clone(&store) as SharedDirectory,
            calendar,
            config,
        );
        let logs = Arc::clone(&store) as SharedLogs;
        Self::new(GateVerifier::new(manager, logs), policies, store, audit, limits)
    }

    /// Returns the gate verifier.
    #[must_use]
    pub fn verifier(&self) -> &ServerVerifier {
        &self.verifier
    }

    /// Returns the lifecycle manager.
    #[must_use]
    pub fn manager(&self) -> &ServerManager {
        self.verifier.manager()
    }

    /// Returns the policy store handle.
    #[must_use]
    pub fn policies(&self) -> &SharedPolicies {
        &self.policies
    }

    /// Returns the directory write handle.
    #[must_use]
    pub fn enroller(&self) -> &dyn StudentEnroller {
        self.enroller.as_ref()
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    /// Returns the per-request limits.
    #[must_use]
    pub const fn limits(&self) -> RequestLimits {
        self.limits
    }
}

// ============================================================================
// SECTION: Clock and Blocking
// ============================================================================

/// Reads the wall clock as a core timestamp.
#[must_use]
pub fn wall_clock() -> Timestamp {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}

/// Runs a store-touching closure, shifting to a blocking context when the
/// runtime supports it.
pub fn run_blocking<T>(func: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(func)
        }
        _ => func(),
    }
}
