// crates/outpass-server/src/api.rs
// ============================================================================
// Module: Outpass HTTP API
// Description: Route handlers, request/response payloads, and error mapping.
// Purpose: Expose the decision engine over HTTP with a stable status
//          contract.
// Dependencies: outpass-core, axum, serde, tokio
// ============================================================================

//! ## Overview
//! Every handler is a thin shell: parse identity headers and payloads, call
//! the lifecycle manager or gate verifier with the wall clock, map the
//! error to the status contract, and audit the outcome. Error bodies carry
//! `{error, reason}` where `reason` is the machine-readable code clients
//! branch on; the human text is advisory only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;

use outpass_core::ActorId;
use outpass_core::ApprovalEvent;
use outpass_core::ApprovalTier;
use outpass_core::CacheSnapshot;
use outpass_core::EditRequest;
use outpass_core::GateAction;
use outpass_core::GatePolicy;
use outpass_core::LifecycleError;
use outpass_core::LogActionRequest;
use outpass_core::LogOutcome;
use outpass_core::LogSource;
use outpass_core::PassKind;
use outpass_core::PassRequest;
use outpass_core::PolicyId;
use outpass_core::RegNo;
use outpass_core::RequestId;
use outpass_core::StoreError;
use outpass_core::StudentCategory;
use outpass_core::StudentProfile;
use outpass_core::SubmitRequest;
use outpass_core::Timestamp;
use outpass_core::VerifyOutcome;

use crate::audit::GateAuditEvent;
use crate::audit::RequestAuditEvent;
use crate::state::AppState;
use crate::state::run_blocking;
use crate::state::wall_clock;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the acting student's registration number.
const REG_NO_HEADER: &str = "x-reg-no";

/// Header carrying the acting approver or gatekeeper identity.
const ACTOR_HEADER: &str = "x-actor-id";

/// Upper bound on one listing page.
const MAX_PAGE_LIMIT: usize = 100;

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// API error carrying the status contract and machine-readable reason.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status for the response.
    status: StatusCode,
    /// Machine-readable reason code.
    reason: &'static str,
    /// Human-readable advisory message.
    message: String,
}

/// Error body shape shared by every failing response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Human-readable advisory message.
    error: String,
    /// Machine-readable reason code.
    reason: &'static str,
}

impl ApiError {
    /// Creates an error with an explicit status and reason.
    const fn new(status: StatusCode, reason: &'static str, message: String) -> Self {
        Self {
            status,
            reason,
            message,
        }
    }

    /// Creates a 400 validation error.
    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message.into())
    }

    /// Creates a 403 ownership error.
    fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message.into())
    }

    /// Returns the machine-readable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        self.reason
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            reason: self.reason,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<LifecycleError> for ApiError {
    fn from(error: LifecycleError) -> Self {
        let (status, reason) = classify(&error);
        Self::new(status, reason, error.to_string())
    }
}

/// Maps a lifecycle error onto the HTTP status contract.
const fn classify(error: &LifecycleError) -> (StatusCode, &'static str) {
    match error {
        LifecycleError::DuplicateActivePass => (StatusCode::CONFLICT, "duplicate_active_pass"),
        LifecycleError::PolicyDenied(_) => (StatusCode::FORBIDDEN, "policy_denied"),
        LifecycleError::TrustScoreBlocked => (StatusCode::FORBIDDEN, "trust_score_blocked"),
        LifecycleError::CooldownActive {
            ..
        } => (StatusCode::TOO_MANY_REQUESTS, "cooldown_active"),
        LifecycleError::InvalidTransition {
            ..
        } => (StatusCode::CONFLICT, "invalid_transition"),
        LifecycleError::ScanNotPermitted {
            ..
        } => (StatusCode::BAD_REQUEST, "scan_not_permitted"),
        LifecycleError::EarlyExit => (StatusCode::BAD_REQUEST, "early_exit"),
        LifecycleError::UnknownRequest(_) => (StatusCode::NOT_FOUND, "unknown_request"),
        LifecycleError::UnknownStudent(_) => (StatusCode::NOT_FOUND, "unknown_student"),
        LifecycleError::UnknownPolicy => (StatusCode::NOT_FOUND, "unknown_policy"),
        LifecycleError::Validation(_) | LifecycleError::Time(_) => {
            (StatusCode::BAD_REQUEST, "validation_error")
        }
        LifecycleError::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, "conflict"),
        LifecycleError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
    }
}

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Submission payload.
#[derive(Debug, Deserialize)]
struct SubmitBody {
    /// Requested pass kind.
    pass_kind: String,
    /// Free-text reason.
    reason: String,
    /// Planned departure time.
    departure_at: Timestamp,
    /// Planned return time; absent for one-way pass kinds.
    #[serde(default)]
    return_at: Option<Timestamp>,
}

/// Edit payload for a still-pending request.
#[derive(Debug, Deserialize)]
struct EditBody {
    /// Replacement reason.
    reason: String,
    /// Replacement departure time.
    departure_at: Timestamp,
    /// Replacement return time.
    #[serde(default)]
    return_at: Option<Timestamp>,
}

/// Approval payload naming the acting tier.
#[derive(Debug, Deserialize)]
struct ApproveBody {
    /// Tier the actor approves at.
    tier: ApprovalTier,
}

/// Rejection payload.
#[derive(Debug, Default, Deserialize)]
struct RejectBody {
    /// Optional grounds recorded on the timeline.
    #[serde(default)]
    comments: Option<String>,
}

/// Gate verification payload.
#[derive(Debug, Deserialize)]
struct VerifyBody {
    /// Scanned registration number.
    reg_no: String,
}

/// Gate action payload.
#[derive(Debug, Deserialize)]
struct LogActionBody {
    /// Request the scan applies to.
    request_id: i64,
    /// Action performed.
    action: GateAction,
    /// Gatekeeper who performed the scan.
    gatekeeper_id: String,
    /// Optional gatekeeper comments.
    #[serde(default)]
    comments: Option<String>,
    /// Provenance; defaults to a live scan.
    #[serde(default)]
    source: Option<LogSource>,
}

/// Enrollment payload for the admin surface.
#[derive(Debug, Deserialize)]
struct EnrollBody {
    /// Registration number.
    reg_no: String,
    /// Display name.
    name: String,
    /// Residency category, `day_scholar` or `hostel`.
    category: String,
}

/// Listing page selector.
#[derive(Debug, Deserialize)]
struct PageQuery {
    /// Entries to skip.
    #[serde(default)]
    offset: usize,
    /// Page size, clamped server-side.
    #[serde(default = "default_page_limit")]
    limit: usize,
}

/// Default listing page size.
const fn default_page_limit() -> usize {
    20
}

/// Active cooldown projection.
#[derive(Debug, Serialize)]
struct CooldownBody {
    /// Cancellations observed inside the rolling window.
    cancellations: u32,
    /// Instant the cooldown lifts.
    until: Timestamp,
}

/// Student-facing listing response.
#[derive(Debug, Serialize)]
struct MineResponse {
    /// The student's requests, newest first.
    requests: Vec<PassRequest>,
    /// Active cooldown, when one is in force.
    cooldown: Option<CooldownBody>,
}

/// Request detail with its approval timeline.
#[derive(Debug, Serialize)]
struct RequestDetail {
    /// The request.
    request: PassRequest,
    /// Approval events in append order.
    events: Vec<ApprovalEvent>,
}

/// Readiness probe body.
#[derive(Debug, Serialize)]
struct HealthBody {
    /// Fixed readiness marker.
    status: &'static str,
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the HTTP router over shared state.
#[must_use]
pub fn router(state: AppState) -> Router {
    let limits = state.limits();
    Router::new()
        .route("/healthz", get(healthz))
        .route("/students", post(enroll_student))
        .route("/requests", post(submit_request))
        .route("/requests/mine", get(list_my_requests))
        .route(
            "/requests/{id}",
            get(get_request).put(edit_request).delete(cancel_request),
        )
        .route("/requests/{id}/approve", post(approve_request))
        .route("/requests/{id}/reject", post(reject_request))
        .route("/gate/verify-pass", post(verify_pass))
        .route("/gate/log-action", post(log_action))
        .route("/gate/sync-cache", get(sync_cache))
        .route("/policies", get(list_policies).put(put_policy))
        .route("/policies/{category}/{pass_kind}", delete(delete_policy))
        .layer(middleware::from_fn_with_state(state.clone(), enforce_timeout))
        .layer(DefaultBodyLimit::max(limits.max_body_bytes))
        .with_state(state)
}

/// Aborts handlers that exceed the configured handling timeout.
async fn enforce_timeout(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match tokio::time::timeout(state.limits().timeout(), next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError::new(
            StatusCode::REQUEST_TIMEOUT,
            "timeout",
            "request handling timed out".to_string(),
        )
        .into_response(),
    }
}

// ============================================================================
// SECTION: Header Helpers
// ============================================================================

/// Reads the acting student's registration number.
fn reg_no_header(headers: &HeaderMap) -> Result<RegNo, ApiError> {
    header_value(headers, REG_NO_HEADER).map(RegNo::new)
}

/// Reads the acting approver or gatekeeper identity.
fn actor_header(headers: &HeaderMap) -> Result<ActorId, ApiError> {
    header_value(headers, ACTOR_HEADER).map(ActorId::new)
}

/// Reads a required non-empty header as UTF-8 text.
fn header_value(headers: &HeaderMap, name: &'static str) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request(format!("{name} header required")))
}

// ============================================================================
// SECTION: Lifecycle Handlers
// ============================================================================

/// `POST /requests`: submits a new pass request.
async fn submit_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<PassRequest>), ApiError> {
    let reg_no = reg_no_header(&headers)?;
    let submit = SubmitRequest {
        reg_no,
        pass_kind: PassKind::new(body.pass_kind),
        reason: body.reason,
        departure_at: body.departure_at,
        return_at: body.return_at,
    };
    let request = run_blocking(|| state.manager().submit(&submit, wall_clock()))?;
    state
        .audit()
        .record_request(&RequestAuditEvent::new("request_submitted", &request, None));
    Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /requests/mine`: lists the acting student's requests with cooldown.
async fn list_my_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Result<Json<MineResponse>, ApiError> {
    let reg_no = reg_no_header(&headers)?;
    let limit = page.limit.min(MAX_PAGE_LIMIT);
    let (requests, cooldown) = run_blocking(|| {
        let requests = state.manager().list_by_student(&reg_no, page.offset, limit)?;
        let cooldown = state.manager().cooldown_for(&reg_no, wall_clock())?;
        Ok::<_, LifecycleError>((requests, cooldown))
    })?;
    Ok(Json(MineResponse {
        requests,
        cooldown: cooldown.map(|cooldown| CooldownBody {
            cancellations: cooldown.cancellations,
            until: cooldown.until,
        }),
    }))
}

/// `GET /requests/{id}`: returns a request with its approval timeline.
async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RequestDetail>, ApiError> {
    let id = RequestId::new(id);
    let (request, events) = run_blocking(|| {
        let request = state.manager().request_required(id)?;
        let events = state.manager().events_for(id)?;
        Ok::<_, LifecycleError>((request, events))
    })?;
    Ok(Json(RequestDetail {
        request,
        events,
    }))
}

/// `PUT /requests/{id}`: edits a still-pending request.
async fn edit_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<EditBody>,
) -> Result<Json<PassRequest>, ApiError> {
    let reg_no = reg_no_header(&headers)?;
    let id = RequestId::new(id);
    let edit = EditRequest {
        reason: body.reason,
        departure_at: body.departure_at,
        return_at: body.return_at,
    };
    let request = run_blocking(|| {
        require_owner(&state, id, &reg_no)?;
        Ok::<_, ApiError>(state.manager().edit(id, &edit, wall_clock())?)
    })?;
    state
        .audit()
        .record_request(&RequestAuditEvent::new("request_edited", &request, None));
    Ok(Json(request))
}

/// `DELETE /requests/{id}`: cancels the acting student's request.
async fn cancel_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<PassRequest>, ApiError> {
    let reg_no = reg_no_header(&headers)?;
    let id = RequestId::new(id);
    let actor = ActorId::new(reg_no.as_str());
    let request = run_blocking(|| {
        require_owner(&state, id, &reg_no)?;
        Ok::<_, ApiError>(state.manager().cancel(id, &actor, wall_clock())?)
    })?;
    state.audit().record_request(&RequestAuditEvent::new(
        "request_cancelled",
        &request,
        Some(actor.as_str().to_string()),
    ));
    Ok(Json(request))
}

/// `POST /requests/{id}/approve`: advances the request by one tier.
async fn approve_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<ApproveBody>,
) -> Result<Json<PassRequest>, ApiError> {
    let actor = actor_header(&headers)?;
    let id = RequestId::new(id);
    let request =
        run_blocking(|| state.manager().approve(id, body.tier, &actor, wall_clock()))?;
    state.audit().record_request(&RequestAuditEvent::new(
        "request_approved",
        &request,
        Some(actor.as_str().to_string()),
    ));
    Ok(Json(request))
}

/// `POST /requests/{id}/reject`: terminates the request.
async fn reject_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<RejectBody>,
) -> Result<Json<PassRequest>, ApiError> {
    let actor = actor_header(&headers)?;
    let id = RequestId::new(id);
    let request =
        run_blocking(|| state.manager().reject(id, &actor, body.comments, wall_clock()))?;
    state.audit().record_request(&RequestAuditEvent::new(
        "request_rejected",
        &request,
        Some(actor.as_str().to_string()),
    ));
    Ok(Json(request))
}

/// Refuses requests acting on a pass the caller does not own.
fn require_owner(state: &AppState, id: RequestId, reg_no: &RegNo) -> Result<(), ApiError> {
    let request = state.manager().request_required(id)?;
    if request.student_id == *reg_no {
        Ok(())
    } else {
        Err(ApiError::forbidden("request belongs to another student"))
    }
}

// ============================================================================
// SECTION: Gate Handlers
// ============================================================================

/// `POST /gate/verify-pass`: answers what the scanned student may do now.
async fn verify_pass(
    State(state): State<AppState>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<VerifyOutcome>, ApiError> {
    let reg_no = RegNo::new(body.reg_no);
    let outcome = run_blocking(|| state.verifier().verify(&reg_no, wall_clock()))?;
    Ok(Json(outcome))
}

/// `POST /gate/log-action`: records a gate scan, idempotently on replay.
async fn log_action(
    State(state): State<AppState>,
    Json(body): Json<LogActionBody>,
) -> Result<Json<LogOutcome>, ApiError> {
    let log = LogActionRequest {
        request_id: RequestId::new(body.request_id),
        action: body.action,
        gatekeeper_id: ActorId::new(body.gatekeeper_id),
        comments: body.comments,
        source: body.source.unwrap_or(LogSource::Online),
    };
    let outcome = run_blocking(|| state.verifier().log_action(&log, wall_clock()))?;
    let label = match outcome {
        LogOutcome::Applied {
            ..
        } => "applied",
        LogOutcome::AlreadyApplied => "already_applied",
    };
    state.audit().record_gate(&GateAuditEvent::new(
        log.request_id.value(),
        log.action,
        label,
        log.gatekeeper_id.as_str().to_string(),
    ));
    Ok(Json(outcome))
}

/// `GET /gate/sync-cache`: exports the terminal cache snapshot.
async fn sync_cache(State(state): State<AppState>) -> Result<Json<CacheSnapshot>, ApiError> {
    let snapshot = run_blocking(|| state.verifier().snapshot(wall_clock()))?;
    Ok(Json(snapshot))
}

// ============================================================================
// SECTION: Admin Handlers
// ============================================================================

/// `POST /students`: enrolls or updates a student.
async fn enroll_student(
    State(state): State<AppState>,
    Json(body): Json<EnrollBody>,
) -> Result<(StatusCode, Json<StudentProfile>), ApiError> {
    let category = StudentCategory::parse(&body.category)
        .ok_or_else(|| ApiError::bad_request("category must be day_scholar or hostel"))?;
    let profile = StudentProfile {
        reg_no: RegNo::new(body.reg_no),
        name: body.name,
        category,
    };
    run_blocking(|| state.enroller().register(&profile))
        .map_err(|err| ApiError::from(LifecycleError::Store(err)))?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `GET /policies`: lists every configured policy.
async fn list_policies(
    State(state): State<AppState>,
) -> Result<Json<Vec<GatePolicy>>, ApiError> {
    let policies = run_blocking(|| state.policies().list())
        .map_err(|err| ApiError::from(LifecycleError::Store(err)))?;
    Ok(Json(policies))
}

/// `PUT /policies`: inserts or replaces a policy.
async fn put_policy(
    State(state): State<AppState>,
    Json(policy): Json<GatePolicy>,
) -> Result<Json<GatePolicy>, ApiError> {
    policy.validate().map_err(|err| ApiError::bad_request(err.to_string()))?;
    run_blocking(|| state.policies().put(&policy))
        .map_err(|err| ApiError::from(LifecycleError::Store(err)))?;
    Ok(Json(policy))
}

/// `DELETE /policies/{category}/{pass_kind}`: removes a policy.
async fn delete_policy(
    State(state): State<AppState>,
    Path((category, pass_kind)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let category = StudentCategory::parse(&category)
        .ok_or_else(|| ApiError::bad_request("category must be day_scholar or hostel"))?;
    let id = PolicyId::new(category, PassKind::new(pass_kind));
    let removed = run_blocking(|| state.policies().remove(&id))
        .map_err(|err| ApiError::from(LifecycleError::Store(err)))?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "unknown_policy",
            "no policy for category/pass kind".to_string(),
        ))
    }
}

/// `GET /healthz`: readiness probe.
async fn healthz() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
