use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::service::{RegistrationError, RegistrationService};
use crate::fest::domain::{
    EventCategory, NewRegistration, RegistrationId, RegistrationStatus, StudentId, UserId,
};
use crate::fest::roles::{Actor, FestRole};
use crate::fest::settings::SettingsSource;
use crate::fest::store::{FestStore, IdentityProvider};

const USER_HEADER: &str = "x-fest-user-id";
const ROLE_HEADER: &str = "x-fest-active-role";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

const DEFAULT_TOP_EVENTS: usize = 5;
const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// Shared state for the registry routes: the engine plus the identity
/// platform used to resolve callers.
pub struct RegistryState<S, C, I> {
    service: Arc<RegistrationService<S, C>>,
    identity: Arc<I>,
}

impl<S, C, I> Clone for RegistryState<S, C, I> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            identity: Arc::clone(&self.identity),
        }
    }
}

/// Router builder exposing the registration engine over HTTP. Callers are
/// identified by the `x-fest-user-id` header and may pick a granted role
/// with `x-fest-active-role`.
pub fn registry_router<S, C, I>(
    service: Arc<RegistrationService<S, C>>,
    identity: Arc<I>,
) -> Router
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let state = RegistryState { service, identity };
    Router::new()
        .route(
            "/api/v1/registrations",
            post(create_handler::<S, C, I>).get(list_handler::<S, C, I>),
        )
        .route(
            "/api/v1/registrations/eligibility",
            get(eligibility_handler::<S, C, I>),
        )
        .route(
            "/api/v1/registrations/:registration_id/status",
            patch(status_handler::<S, C, I>),
        )
        .route(
            "/api/v1/registrations/:registration_id",
            delete(delete_handler::<S, C, I>),
        )
        .route("/api/v1/students", get(students_handler::<S, C, I>))
        .route("/api/v1/events", get(events_handler::<S, C, I>))
        .route(
            "/api/v1/analytics/events",
            get(analytics_handler::<S, C, I>),
        )
        .route("/api/v1/standings", get(standings_handler::<S, C, I>))
        .route("/api/v1/activity", get(activity_handler::<S, C, I>))
        .with_state(state)
}

#[derive(Deserialize)]
struct EligibilityQuery {
    student_id: String,
    category: String,
}

#[derive(Deserialize)]
struct AnalyticsQuery {
    top: Option<usize>,
}

#[derive(Deserialize)]
struct ActivityQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct StatusUpdate {
    status: RegistrationStatus,
}

pub(crate) async fn create_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<NewRegistration>,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state.service.create(&actor, request) {
        Ok(registration) => (StatusCode::CREATED, axum::Json(registration)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state.service.registrations(&actor) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn eligibility_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
    Query(query): Query<EligibilityQuery>,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let student_id = StudentId(query.student_id);
    if actor.role() == FestRole::Student && actor.student_id.as_ref() != Some(&student_id) {
        return error_response(RegistrationError::Unauthorized {
            role: FestRole::Student,
            action: "probe other students' eligibility",
        });
    }
    let Some(category) = EventCategory::parse_tag(&query.category) else {
        return denied(
            StatusCode::BAD_REQUEST,
            "INVALID_CATEGORY",
            &format!("unknown event category '{}'", query.category),
        );
    };
    match state.service.can_register(&student_id, category) {
        Ok(check) => (StatusCode::OK, axum::Json(check)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
    Path(registration_id): Path<String>,
    axum::Json(update): axum::Json<StatusUpdate>,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = RegistrationId(registration_id);
    match state.service.set_status(&actor, &id, update.status) {
        Ok(registration) => (StatusCode::OK, axum::Json(registration)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
    Path(registration_id): Path<String>,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = RegistrationId(registration_id);
    match state.service.delete(&actor, &id) {
        Ok(removed) => (StatusCode::OK, axum::Json(removed)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn students_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state.service.students(&actor) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn events_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    if let Err(response) = resolve_actor(&state, &headers) {
        return response;
    }
    match state.service.events() {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn analytics_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
    Query(query): Query<AnalyticsQuery>,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let top_n = query.top.unwrap_or(DEFAULT_TOP_EVENTS);
    match state.service.event_analytics(&actor, top_n) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn standings_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state.service.standings(&actor) {
        Ok(standings) => (StatusCode::OK, axum::Json(standings)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn activity_handler<S, C, I>(
    State(state): State<RegistryState<S, C, I>>,
    headers: HeaderMap,
    Query(query): Query<ActivityQuery>,
) -> Response
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let actor = match resolve_actor(&state, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    match state.service.activity(&actor, limit) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Resolves the caller from identity headers. Missing or unknown users get
/// 401, a user with no granted roles gets 403, and an unreadable identity
/// platform surfaces as 500.
fn resolve_actor<S, C, I>(
    state: &RegistryState<S, C, I>,
    headers: &HeaderMap,
) -> Result<Actor, Response>
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
    I: IdentityProvider + 'static,
{
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let Some(user_id) = user_id else {
        return Err(denied(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "missing x-fest-user-id header",
        ));
    };
    let user_id = UserId(user_id.to_string());

    let profile = match state.identity.profile(&user_id) {
        Ok(profile) => profile,
        Err(store_error) => {
            error!(error = %store_error, "identity lookup failed");
            return Err(denied(
                StatusCode::INTERNAL_SERVER_ERROR,
                "IDENTITY_UNAVAILABLE",
                "identity platform unavailable",
            ));
        }
    };
    let Some(profile) = profile else {
        return Err(denied(
            StatusCode::UNAUTHORIZED,
            "UNKNOWN_USER",
            &format!("no profile for user '{user_id}'"),
        ));
    };

    let requested = match headers.get(ROLE_HEADER).and_then(|value| value.to_str().ok()) {
        Some(raw) => match FestRole::parse_tag(raw.trim()) {
            Some(role) => Some(role),
            None => {
                return Err(denied(
                    StatusCode::BAD_REQUEST,
                    "INVALID_ROLE",
                    &format!("unknown role '{}'", raw.trim()),
                ));
            }
        },
        None => None,
    };

    let Some(actor) = Actor::resolve(&profile, requested) else {
        return Err(denied(
            StatusCode::FORBIDDEN,
            "NO_ROLES",
            &format!("user '{user_id}' holds no festival roles"),
        ));
    };

    let actor = match headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(origin) => actor.with_origin(origin),
        None => actor,
    };

    Ok(actor)
}

fn denied(status: StatusCode, kind: &str, message: &str) -> Response {
    let payload = json!({
        "kind": kind,
        "message": message,
    });
    (status, axum::Json(payload)).into_response()
}

/// Maps engine denials onto wire responses. Every body carries the machine
/// kind and display message; variants with extra context expose it as
/// top-level fields.
fn error_response(error: RegistrationError) -> Response {
    let status = match &error {
        RegistrationError::Unauthorized { .. } | RegistrationError::ScopeUnresolved { .. } => {
            StatusCode::FORBIDDEN
        }
        RegistrationError::UnknownStudent(_)
        | RegistrationError::UnknownEvent(_)
        | RegistrationError::UnknownRegistration(_) => StatusCode::NOT_FOUND,
        RegistrationError::AlreadyRegistered { .. }
        | RegistrationError::InvalidTransition { .. } => StatusCode::CONFLICT,
        RegistrationError::QuotaExceeded { .. }
        | RegistrationError::WindowClosed { .. }
        | RegistrationError::GloballyClosed => StatusCode::UNPROCESSABLE_ENTITY,
        RegistrationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %error, "registration store failure");
    }

    let mut payload = json!({
        "kind": error.kind(),
        "message": error.to_string(),
    });
    match &error {
        RegistrationError::QuotaExceeded {
            category,
            current_count,
            limit,
        } => {
            payload["category"] = json!(category.tag());
            payload["current_count"] = json!(current_count);
            payload["limit"] = json!(limit);
        }
        RegistrationError::WindowClosed { deadline } => {
            payload["deadline"] = json!(deadline.to_rfc3339());
        }
        RegistrationError::InvalidTransition { from, to } => {
            payload["from"] = json!(from.label());
            payload["to"] = json!(to.label());
        }
        _ => {}
    }
    (status, axum::Json(payload)).into_response()
}
