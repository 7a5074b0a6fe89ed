// crates/outpass-terminal/src/terminal.rs
// ============================================================================
// Module: Gate Terminal
// Description: Online-first scan handling with offline fallback.
// Purpose: Keep the gate usable through server outages without ever
//          fabricating an approval.
// Dependencies: outpass-config, outpass-core
// ============================================================================

//! ## Overview
//! [`GateTerminal`] composes the server client, the snapshot cache, and the
//! offline queue. Every operation tries the server first. When the server
//! is unreachable, `verify` answers from the cached snapshot with `stale`
//! set, and `log` captures the action into the durable queue for a later
//! drain. Cached answers are conservative: only states the server already
//! granted (a warden-approved pass, an active exit) unlock a gate action.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use thiserror::Error;

use outpass_config::BackoffConfig;
use outpass_config::TerminalConfig;
use outpass_core::ActorId;
use outpass_core::CacheSnapshot;
use outpass_core::GateAction;
use outpass_core::GateStatus;
use outpass_core::LogActionRequest;
use outpass_core::LogOutcome;
use outpass_core::LogSource;
use outpass_core::PassStatus;
use outpass_core::PassSummary;
use outpass_core::RegNo;
use outpass_core::RequestId;
use outpass_core::Timestamp;
use outpass_core::VerifyOutcome;

use crate::cache::SnapshotCache;
use crate::client::ClientError;
use crate::client::ServerClient;
use crate::queue::OfflineQueue;
use crate::queue::QueuedAction;
use crate::storage::PersistError;
use crate::sync;
use crate::sync::ActionPoster;
use crate::sync::DrainReport;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Terminal operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TerminalError {
    /// Server client failure that could not be absorbed locally.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Cache or queue file failure.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

// ============================================================================
// SECTION: Gate API
// ============================================================================

/// Server operations the terminal depends on.
pub trait GateApi {
    /// Verifies a scanned registration number.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] per the client's failure classification.
    fn verify(&self, reg_no: &RegNo) -> Result<VerifyOutcome, ClientError>;

    /// Submits a gate action.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] per the client's failure classification.
    fn log_action(&self, request: &LogActionRequest) -> Result<LogOutcome, ClientError>;

    /// Pulls the full verification snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] per the client's failure classification.
    fn fetch_snapshot(&self) -> Result<CacheSnapshot, ClientError>;
}

impl GateApi for ServerClient {
    fn verify(&self, reg_no: &RegNo) -> Result<VerifyOutcome, ClientError> {
        Self::verify(self, reg_no)
    }

    fn log_action(&self, request: &LogActionRequest) -> Result<LogOutcome, ClientError> {
        Self::log_action(self, request)
    }

    fn fetch_snapshot(&self) -> Result<CacheSnapshot, ClientError> {
        Self::fetch_snapshot(self)
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of logging a scan from the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalLogOutcome {
    /// The server accepted the action live.
    Synced(LogOutcome),
    /// The server was unreachable; the action is queued for replay.
    Queued {
        /// False when an identical action was already queued.
        newly_queued: bool,
    },
}

// ============================================================================
// SECTION: Terminal
// ============================================================================

/// Gate terminal over a server API, a snapshot cache, and an offline queue.
pub struct GateTerminal<A> {
    /// Server API, live or test double.
    api: A,
    /// Durable snapshot cache.
    cache: SnapshotCache,
    /// Durable offline action queue.
    queue: OfflineQueue,
    /// Gatekeeper identity attached to every logged action.
    gatekeeper: ActorId,
    /// Retry schedule for queue drains.
    backoff: BackoffConfig,
}

impl GateTerminal<ServerClient> {
    /// Builds a terminal with a live server client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError`] when the client cannot be built or a
    /// terminal file cannot be loaded.
    pub fn from_config(config: &TerminalConfig, gatekeeper: ActorId) -> Result<Self, TerminalError> {
        let api = ServerClient::from_config(config)?;
        Self::with_api(api, config, gatekeeper)
    }
}

impl<A: GateApi> GateTerminal<A> {
    /// Builds a terminal over an explicit gate API.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::Persist`] when the cache or queue file
    /// exists but cannot be loaded.
    pub fn with_api(
        api: A,
        config: &TerminalConfig,
        gatekeeper: ActorId,
    ) -> Result<Self, TerminalError> {
        Ok(Self {
            api,
            cache: SnapshotCache::open(&config.cache_path)?,
            queue: OfflineQueue::open(&config.queue_path)?,
            gatekeeper,
            backoff: config.backoff,
        })
    }

    /// Pulls a fresh snapshot, fully replacing the cached one.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError`] when the pull or the persist fails; the
    /// previous snapshot stays in effect.
    pub fn refresh(&mut self) -> Result<(), TerminalError> {
        let snapshot = self.api.fetch_snapshot()?;
        self.cache.replace(snapshot)?;
        Ok(())
    }

    /// Verifies a scan, answering from the cached snapshot when offline.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::Client`] on a non-retryable client failure,
    /// or on a retryable one when no snapshot has ever been cached.
    pub fn verify(&self, reg_no: &RegNo, now: Timestamp) -> Result<VerifyOutcome, TerminalError> {
        match self.api.verify(reg_no) {
            Ok(outcome) => Ok(outcome),
            Err(error) if error.is_retryable() => self.verify_from_cache(reg_no, now, error),
            Err(error) => Err(TerminalError::Client(error)),
        }
    }

    /// Logs a scan, queuing it for replay when the server is unreachable.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::Client`] on a definitive server rejection
    /// and [`TerminalError::Persist`] when the queue cannot be updated.
    pub fn log(
        &mut self,
        request_id: RequestId,
        action: GateAction,
        comments: Option<String>,
        now: Timestamp,
    ) -> Result<TerminalLogOutcome, TerminalError> {
        let request = LogActionRequest {
            request_id,
            action,
            gatekeeper_id: self.gatekeeper.clone(),
            comments: comments.clone(),
            source: LogSource::Online,
        };
        match self.api.log_action(&request) {
            Ok(outcome) => Ok(TerminalLogOutcome::Synced(outcome)),
            Err(error) if error.is_retryable() => {
                let newly_queued = self.queue.push(QueuedAction {
                    request_id,
                    action,
                    comments,
                    captured_at: now,
                })?;
                Ok(TerminalLogOutcome::Queued {
                    newly_queued,
                })
            }
            Err(error) => Err(TerminalError::Client(error)),
        }
    }

    /// Replays queued actions FIFO, sleeping between retryable failures.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::Persist`] when the queue file cannot be
    /// updated mid-drain.
    pub fn drain(&mut self) -> Result<DrainReport, TerminalError> {
        let poster = QueuePoster {
            api: &self.api,
            gatekeeper: &self.gatekeeper,
        };
        let report = sync::drain(&mut self.queue, &poster, self.backoff, std::thread::sleep)?;
        Ok(report)
    }

    /// Returns the offline queue.
    #[must_use]
    pub const fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Returns the snapshot cache.
    #[must_use]
    pub const fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Builds a conservative outcome from the cached snapshot.
    fn verify_from_cache(
        &self,
        reg_no: &RegNo,
        now: Timestamp,
        error: ClientError,
    ) -> Result<VerifyOutcome, TerminalError> {
        let Some(snapshot) = self.cache.snapshot() else {
            return Err(TerminalError::Client(error));
        };
        let Some(record) = snapshot.find(reg_no) else {
            return Ok(stale_outcome(GateStatus::Invalid, Vec::new(), None));
        };
        let pass = record.pass.clone();
        let (status, allowed) = classify_cached(&pass, now);
        Ok(stale_outcome(status, allowed, Some(pass)))
    }
}

/// Replays queued actions through the gate API with offline provenance.
struct QueuePoster<'a, A> {
    /// API used for the replay.
    api: &'a A,
    /// Gatekeeper identity attached to replayed actions.
    gatekeeper: &'a ActorId,
}

impl<A: GateApi> ActionPoster for QueuePoster<'_, A> {
    fn post(&self, action: &QueuedAction) -> Result<LogOutcome, ClientError> {
        self.api.log_action(&LogActionRequest {
            request_id: action.request_id,
            action: action.action,
            gatekeeper_id: self.gatekeeper.clone(),
            comments: action.comments.clone(),
            source: LogSource::OfflineSynced,
        })
    }
}

// ============================================================================
// SECTION: Offline Classification
// ============================================================================

/// Builds a stale outcome carrying no student profile.
fn stale_outcome(
    status: GateStatus,
    allowed_actions: Vec<GateAction>,
    pass: Option<PassSummary>,
) -> VerifyOutcome {
    VerifyOutcome {
        status,
        allowed_actions,
        student: None,
        pass,
        stale: true,
    }
}

/// Classifies a cached pass without policy data.
///
/// The snapshot carries no grace window, so the raw departure and return
/// bounds apply. Approval tiers below warden stay invalid offline; the
/// chain that governs them is server-side state.
fn classify_cached(pass: &PassSummary, now: Timestamp) -> (GateStatus, Vec<GateAction>) {
    match pass.status {
        PassStatus::Active => {
            let overdue = pass.return_at.is_some_and(|return_at| now > return_at);
            if overdue {
                (GateStatus::Overdue, vec![GateAction::Entry])
            } else {
                (GateStatus::Out, vec![GateAction::Entry])
            }
        }
        PassStatus::ApprovedWarden => {
            if pass.return_at.is_some_and(|return_at| now > return_at) {
                (GateStatus::Expired, Vec::new())
            } else if now < pass.departure_at {
                (GateStatus::Early, Vec::new())
            } else {
                (GateStatus::Valid, vec![GateAction::Exit])
            }
        }
        _ => (GateStatus::Invalid, Vec::new()),
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Current wall-clock time as a timestamp.
#[must_use]
pub fn wall_clock() -> Timestamp {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}
