use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::domain::{Answer, Criterion, IdentityState, Rating, Submitter};
use super::notify::Notification;
use super::pipeline::{AuthPolicy, SubmissionError, SubmissionReceipt};
use super::session::{FeedbackServices, FeedbackSession, SessionId, SessionView};

/// Trusted header carrying the authenticated submitter id.
pub const SUBMITTER_ID_HEADER: &str = "x-submitter-id";
/// Trusted header carrying the submitter display name.
pub const SUBMITTER_NAME_HEADER: &str = "x-submitter-name";

struct SessionEntry {
    session: Arc<FeedbackSession>,
    last_seen: Instant,
}

/// Shared state behind the feedback routes.
pub struct FeedbackState {
    services: FeedbackServices,
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    idle_ttl: Duration,
}

impl FeedbackState {
    /// Sessions untouched for this long are dropped.
    pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

    pub fn new(services: FeedbackServices) -> Self {
        Self {
            services,
            sessions: Mutex::new(HashMap::new()),
            idle_ttl: Self::DEFAULT_IDLE_TTL,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    /// Number of sessions currently held.
    pub fn open_sessions(&self) -> usize {
        self.registry().len()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        self.sessions.lock().expect("session registry poisoned")
    }

    /// Identity of the caller, or a 401 response when the policy demands one.
    fn caller(&self, headers: &HeaderMap) -> Result<IdentityState, Response> {
        let identity = identity_from_headers(headers);
        if identity == IdentityState::Unauthenticated && self.services.auth == AuthPolicy::Required {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                None,
                "sign in before using the feedback form".to_string(),
            ));
        }
        Ok(identity)
    }

    fn register(&self, session: Arc<FeedbackSession>, id: SessionId) {
        let mut sessions = self.registry();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() <= self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, "idle feedback sessions evicted");
        }
        sessions.insert(
            id,
            SessionEntry {
                session,
                last_seen: Instant::now(),
            },
        );
    }

    /// Live session admitted for `identity`. Expired sessions are removed;
    /// sessions owned by someone else look the same as missing ones.
    fn session(&self, id: &str, identity: &IdentityState) -> Option<Arc<FeedbackSession>> {
        let key = SessionId(id.to_string());
        let mut sessions = self.registry();

        if sessions.get(&key)?.last_seen.elapsed() > self.idle_ttl {
            sessions.remove(&key);
            debug!(session = id, "idle feedback session expired");
            return None;
        }

        let entry = sessions.get_mut(&key)?;
        if !entry.session.admits(identity) {
            return None;
        }
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Caller identity plus the session they asked for, or the error response.
    fn resolve(
        &self,
        session_id: &str,
        headers: &HeaderMap,
    ) -> Result<(Arc<FeedbackSession>, IdentityState), Response> {
        let identity = self.caller(headers)?;
        match self.session(session_id, &identity) {
            Some(session) => Ok((session, identity)),
            None => Err(session_not_found(session_id)),
        }
    }
}

fn new_session_id() -> SessionId {
    SessionId(Uuid::new_v4().simple().to_string())
}

/// Router builder exposing the evaluation form over HTTP.
pub fn feedback_router(state: Arc<FeedbackState>) -> Router {
    Router::new()
        .route("/api/v1/feedback/sessions", post(open_session_handler))
        .route(
            "/api/v1/feedback/sessions/:session_id",
            get(session_handler).delete(close_session_handler),
        )
        .route(
            "/api/v1/feedback/sessions/:session_id/unit",
            put(select_unit_handler),
        )
        .route(
            "/api/v1/feedback/sessions/:session_id/staff",
            put(select_staff_handler),
        )
        .route(
            "/api/v1/feedback/sessions/:session_id/answers/:criterion",
            put(answer_handler),
        )
        .route(
            "/api/v1/feedback/sessions/:session_id/remarks",
            put(remarks_handler),
        )
        .route(
            "/api/v1/feedback/sessions/:session_id/submit",
            post(submit_handler),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnitSelection {
    pub(crate) unit: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StaffSelection {
    pub(crate) registration_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerUpdate {
    #[serde(default)]
    pub(crate) rating: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemarksUpdate {
    #[serde(default)]
    pub(crate) remarks: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    session: SessionView,
    notifications: Vec<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<SubmissionReceipt>,
}

fn session_response(session: &FeedbackSession, receipt: Option<SubmissionReceipt>) -> Json<SessionResponse> {
    Json(SessionResponse {
        session: session.view(),
        notifications: session.drain_notifications(),
        receipt,
    })
}

fn error_response(status: StatusCode, session: Option<&FeedbackSession>, message: String) -> Response {
    let notifications = session
        .map(FeedbackSession::drain_notifications)
        .unwrap_or_default();
    let payload = json!({
        "error": message,
        "notifications": notifications,
    });
    (status, Json(payload)).into_response()
}

fn session_not_found(session_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        None,
        format!("session {session_id} not found"),
    )
}

/// Identity asserted by the upstream authentication proxy.
pub(crate) fn identity_from_headers(headers: &HeaderMap) -> IdentityState {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    match header(SUBMITTER_ID_HEADER) {
        Some(id) => {
            let display_name = header(SUBMITTER_NAME_HEADER).unwrap_or_else(|| id.clone());
            IdentityState::Authenticated(Submitter { id, display_name })
        }
        None => IdentityState::Unauthenticated,
    }
}

pub(crate) async fn open_session_handler(
    State(state): State<Arc<FeedbackState>>,
    headers: HeaderMap,
) -> Response {
    let identity = match state.caller(&headers) {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let id = new_session_id();
    let session = Arc::new(FeedbackSession::open(id.clone(), &identity, &state.services).await);
    state.register(session.clone(), id);

    (StatusCode::CREATED, session_response(&session, None)).into_response()
}

pub(crate) async fn session_handler(
    State(state): State<Arc<FeedbackState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    match state.resolve(&session_id, &headers) {
        Ok((session, _)) => session_response(&session, None).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn close_session_handler(
    State(state): State<Arc<FeedbackState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.resolve(&session_id, &headers) {
        return response;
    }

    state.registry().remove(&SessionId(session_id));
    StatusCode::NO_CONTENT.into_response()
}

pub(crate) async fn select_unit_handler(
    State(state): State<Arc<FeedbackState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(selection): Json<UnitSelection>,
) -> Response {
    let (session, _) = match state.resolve(&session_id, &headers) {
        Ok(found) => found,
        Err(response) => return response,
    };

    match session.select_unit(&selection.unit).await {
        Ok(_) => session_response(&session, None).into_response(),
        Err(err) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(session.as_ref()),
            err.to_string(),
        ),
    }
}

pub(crate) async fn select_staff_handler(
    State(state): State<Arc<FeedbackState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(selection): Json<StaffSelection>,
) -> Response {
    let (session, _) = match state.resolve(&session_id, &headers) {
        Ok(found) => found,
        Err(response) => return response,
    };

    session.select_staff(&selection.registration_id);
    session_response(&session, None).into_response()
}

pub(crate) async fn answer_handler(
    State(state): State<Arc<FeedbackState>>,
    Path((session_id, criterion)): Path<(String, String)>,
    headers: HeaderMap,
    Json(update): Json<AnswerUpdate>,
) -> Response {
    let (session, _) = match state.resolve(&session_id, &headers) {
        Ok(found) => found,
        Err(response) => return response,
    };

    let Some(criterion) = Criterion::from_key(&criterion) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(session.as_ref()),
            format!("unknown criterion '{criterion}'"),
        );
    };

    let answer = match update.rating {
        None => Answer::Unanswered,
        Some(value) => match Rating::new(value) {
            Some(rating) => Answer::Rated(rating),
            None => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Some(session.as_ref()),
                    format!(
                        "rating must be between {} and {}",
                        Rating::MIN,
                        Rating::MAX
                    ),
                )
            }
        },
    };

    session.set_answer(criterion, answer);
    session_response(&session, None).into_response()
}

pub(crate) async fn remarks_handler(
    State(state): State<Arc<FeedbackState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<RemarksUpdate>,
) -> Response {
    let (session, _) = match state.resolve(&session_id, &headers) {
        Ok(found) => found,
        Err(response) => return response,
    };

    session.set_remarks(&update.remarks);
    session_response(&session, None).into_response()
}

pub(crate) async fn submit_handler(
    State(state): State<Arc<FeedbackState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (session, identity) = match state.resolve(&session_id, &headers) {
        Ok(found) => found,
        Err(response) => return response,
    };

    match session.submit(&identity).await {
        Ok(receipt) => session_response(&session, Some(receipt)).into_response(),
        Err(err) => {
            let status = match err {
                SubmissionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SubmissionError::InProgress => StatusCode::CONFLICT,
                SubmissionError::Unauthenticated => StatusCode::UNAUTHORIZED,
                SubmissionError::Store(_) => StatusCode::BAD_GATEWAY,
            };
            error_response(status, Some(session.as_ref()), err.to_string())
        }
    }
}
