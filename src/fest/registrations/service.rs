use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use super::eligibility::{quota_check, QuotaCheck, QuotaUsage};
use crate::fest::audit::{ActivityLogEntry, AuditAction};
use crate::fest::domain::{
    AcademicYear, EventCategory, EventId, FestEvent, NewRegistration, Registration,
    RegistrationId, RegistrationStatus, Student, StudentId,
};
use crate::fest::report::{
    compute_event_analytics, compute_standings, FestAnalytics, Standings,
};
use crate::fest::roles::{Actor, FestRole};
use crate::fest::scope::{registration_scope, RegistrationScope};
use crate::fest::settings::{FestSettings, SettingsSource};
use crate::fest::store::{FestStore, StoreError};

/// Service composing the data store, the live settings source, the quota
/// limiter, and the visibility scoper behind one registration surface.
pub struct RegistrationService<S, C> {
    store: Arc<S>,
    settings: Arc<C>,
}

static REGISTRATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_registration_id() -> RegistrationId {
    let id = REGISTRATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RegistrationId(format!("reg-{id:06}"))
}

impl<S, C> RegistrationService<S, C>
where
    S: FestStore + 'static,
    C: SettingsSource + 'static,
{
    pub fn new(store: Arc<S>, settings: Arc<C>) -> Self {
        Self { store, settings }
    }

    /// Quota probe for one student and category. A limit of zero, or an
    /// unreadable settings source, denies.
    pub fn can_register(
        &self,
        student_id: &StudentId,
        category: EventCategory,
    ) -> Result<QuotaCheck, RegistrationError> {
        if self.store.student(student_id)?.is_none() {
            return Err(RegistrationError::UnknownStudent(student_id.clone()));
        }
        let settings = self.effective_settings();
        let usage = self.quota_usage(student_id)?;
        Ok(quota_check(usage, category, &settings))
    }

    /// Creates a registration after the full eligibility gauntlet: actor
    /// authority, the global kill switch, event existence, the event
    /// deadline, duplicate detection, and finally the category quota.
    pub fn create(
        &self,
        actor: &Actor,
        request: NewRegistration,
    ) -> Result<Registration, RegistrationError> {
        authorize_creation(actor, &request.student_id)?;

        let settings = self.effective_settings();
        if !settings.registration_open {
            return Err(RegistrationError::GloballyClosed);
        }

        if self.store.student(&request.student_id)?.is_none() {
            return Err(RegistrationError::UnknownStudent(request.student_id.clone()));
        }
        let event = self
            .store
            .event(&request.event_id)?
            .filter(|event| event.is_active)
            .ok_or_else(|| RegistrationError::UnknownEvent(request.event_id.clone()))?;

        if let Some(deadline) = event.registration_deadline {
            if Utc::now() >= deadline {
                return Err(RegistrationError::WindowClosed { deadline });
            }
        }

        let existing = self.store.registrations_for_student(&request.student_id)?;
        if existing
            .iter()
            .any(|row| row.event_id == request.event_id && row.status.is_active())
        {
            return Err(RegistrationError::AlreadyRegistered {
                student_id: request.student_id,
                event_id: request.event_id,
            });
        }

        let usage = QuotaUsage::tally(&existing, &self.event_categories()?);
        let check = quota_check(usage, event.category, &settings);
        if !check.allowed {
            return Err(RegistrationError::QuotaExceeded {
                category: check.category,
                current_count: check.current_count,
                limit: check.limit,
            });
        }

        let status = if settings.auto_approve_registrations {
            RegistrationStatus::Approved
        } else {
            RegistrationStatus::Pending
        };
        let registered_by = if actor.student_id.as_ref() == Some(&request.student_id) {
            None
        } else {
            Some(actor.user_id.clone())
        };

        let registration = Registration {
            id: next_registration_id(),
            student_id: request.student_id,
            event_id: request.event_id,
            status,
            registered_at: Utc::now(),
            registered_by,
        };
        let stored = self.store.insert_registration(registration)?;

        self.store.append_activity(ActivityLogEntry::record(
            actor,
            AuditAction::RegistrationCreated,
            json!({
                "registration_id": stored.id.0,
                "student_id": stored.student_id.0,
                "event_id": stored.event_id.0,
                "status": stored.status.label(),
                "assisted": stored.registered_by.is_some(),
            }),
        ))?;
        info!(
            registration = %stored.id,
            student = %stored.student_id,
            event = %stored.event_id,
            status = stored.status.label(),
            "registration created"
        );
        Ok(stored)
    }

    /// Moves a pending registration to approved or rejected. Any other
    /// transition is refused outright.
    pub fn set_status(
        &self,
        actor: &Actor,
        id: &RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration, RegistrationError> {
        let registration = self
            .store
            .registration(id)?
            .ok_or_else(|| RegistrationError::UnknownRegistration(id.clone()))?;

        let student_year = self
            .store
            .student(&registration.student_id)?
            .map(|student| student.year);
        let action = match status {
            RegistrationStatus::Approved => "approve registrations",
            RegistrationStatus::Rejected => "reject registrations",
            RegistrationStatus::Pending => "reopen registrations",
        };
        authorize_review(actor, student_year, action)?;

        if !matches!(
            (registration.status, status),
            (
                RegistrationStatus::Pending,
                RegistrationStatus::Approved | RegistrationStatus::Rejected,
            )
        ) {
            return Err(RegistrationError::InvalidTransition {
                from: registration.status,
                to: status,
            });
        }

        let updated = self.store.update_registration_status(id, status)?;

        self.store.append_activity(ActivityLogEntry::record(
            actor,
            AuditAction::RegistrationStatusUpdated,
            json!({
                "registration_id": updated.id.0,
                "student_id": updated.student_id.0,
                "event_id": updated.event_id.0,
                "from": registration.status.label(),
                "to": updated.status.label(),
            }),
        ))?;
        info!(
            registration = %updated.id,
            from = registration.status.label(),
            to = updated.status.label(),
            "registration status updated"
        );
        Ok(updated)
    }

    /// Deletes a registration from any status, freeing its quota seat, and
    /// returns the removed row.
    pub fn delete(
        &self,
        actor: &Actor,
        id: &RegistrationId,
    ) -> Result<Registration, RegistrationError> {
        let registration = self
            .store
            .registration(id)?
            .ok_or_else(|| RegistrationError::UnknownRegistration(id.clone()))?;

        let student_year = self
            .store
            .student(&registration.student_id)?
            .map(|student| student.year);
        authorize_review(actor, student_year, "delete registrations")?;

        let removed = self.store.delete_registration(id)?;

        self.store.append_activity(ActivityLogEntry::record(
            actor,
            AuditAction::RegistrationDeleted,
            json!({
                "registration_id": removed.id.0,
                "student_id": removed.student_id.0,
                "event_id": removed.event_id.0,
                "last_status": removed.status.label(),
            }),
        ))?;
        info!(
            registration = %removed.id,
            last_status = removed.status.label(),
            "registration deleted"
        );
        Ok(removed)
    }

    /// Registrations visible to the actor under the visibility scope.
    pub fn registrations(&self, actor: &Actor) -> Result<Vec<Registration>, RegistrationError> {
        let scope = registration_scope(actor);
        if scope == RegistrationScope::Nothing {
            return Ok(Vec::new());
        }
        let roster = self.roster()?;
        let rows = self.store.registrations()?;
        Ok(rows
            .into_iter()
            .filter(|row| scope.permits(row, roster.get(&row.student_id)))
            .collect())
    }

    /// Roster slice visible to the actor.
    pub fn students(&self, actor: &Actor) -> Result<Vec<Student>, RegistrationError> {
        let scope = registration_scope(actor);
        if scope == RegistrationScope::Nothing {
            return Ok(Vec::new());
        }
        let rows = self.store.students()?;
        Ok(rows
            .into_iter()
            .filter(|student| scope.permits_student(student))
            .collect())
    }

    /// Events currently open to the festival; inactive ones stay hidden.
    pub fn events(&self) -> Result<Vec<FestEvent>, RegistrationError> {
        let rows = self.store.events()?;
        Ok(rows.into_iter().filter(|event| event.is_active).collect())
    }

    /// Occupancy, capacity, and engagement analytics over the actor's
    /// visible slice of the festival.
    pub fn event_analytics(
        &self,
        actor: &Actor,
        top_n: usize,
    ) -> Result<FestAnalytics, RegistrationError> {
        let settings = self.effective_settings();
        let registrations = self.registrations(actor)?;
        let students = self.students(actor)?;
        let events = self.events()?;
        Ok(compute_event_analytics(
            &registrations,
            &events,
            &students,
            &settings,
            top_n,
        ))
    }

    /// Year-level standings folded from recorded results. Hidden
    /// scoreboards are readable only by admins and event managers.
    pub fn standings(&self, actor: &Actor) -> Result<Standings, RegistrationError> {
        let settings = self.effective_settings();
        if !settings.scoreboard_visible
            && !matches!(actor.role(), FestRole::Admin | FestRole::EventManager)
        {
            return Err(RegistrationError::Unauthorized {
                role: actor.role(),
                action: "view the scoreboard while it is hidden",
            });
        }
        let results = self.store.results()?;
        let registrations = self.store.registrations()?;
        let students = self.store.students()?;
        Ok(compute_standings(&results, &registrations, &students))
    }

    /// Recent audit trail. Admins and event managers see the full window;
    /// everyone else sees only their own entries within it.
    pub fn activity(
        &self,
        actor: &Actor,
        limit: usize,
    ) -> Result<Vec<ActivityLogEntry>, RegistrationError> {
        let entries = self.store.recent_activity(limit)?;
        match actor.role() {
            FestRole::Admin | FestRole::EventManager => Ok(entries),
            _ => Ok(entries
                .into_iter()
                .filter(|entry| entry.actor.as_ref() == Some(&actor.user_id))
                .collect()),
        }
    }

    fn effective_settings(&self) -> FestSettings {
        match self.settings.load() {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "settings source unavailable, failing closed");
                FestSettings::fail_closed()
            }
        }
    }

    fn quota_usage(&self, student_id: &StudentId) -> Result<QuotaUsage, RegistrationError> {
        let rows = self.store.registrations_for_student(student_id)?;
        Ok(QuotaUsage::tally(&rows, &self.event_categories()?))
    }

    fn event_categories(&self) -> Result<HashMap<EventId, EventCategory>, RegistrationError> {
        let events = self.store.events()?;
        Ok(events
            .into_iter()
            .map(|event| (event.id, event.category))
            .collect())
    }

    fn roster(&self) -> Result<HashMap<StudentId, Student>, RegistrationError> {
        let students = self.store.students()?;
        Ok(students
            .into_iter()
            .map(|student| (student.id.clone(), student))
            .collect())
    }
}

fn authorize_creation(actor: &Actor, student_id: &StudentId) -> Result<(), RegistrationError> {
    match actor.role() {
        FestRole::Student if actor.student_id.as_ref() == Some(student_id) => Ok(()),
        FestRole::Student => Err(RegistrationError::Unauthorized {
            role: FestRole::Student,
            action: "create registrations for other students",
        }),
        _ => Ok(()),
    }
}

/// Review authority for approve/reject/delete. Coordinators act only on
/// students of their own year; a coordinator role without a year mapping,
/// or a student record whose year cannot be established, fails closed.
fn authorize_review(
    actor: &Actor,
    student_year: Option<AcademicYear>,
    action: &'static str,
) -> Result<(), RegistrationError> {
    let role = actor.role();
    match role {
        FestRole::Admin | FestRole::EventManager => Ok(()),
        FestRole::Student => Err(RegistrationError::Unauthorized { role, action }),
        _ => match role.coordinator_year() {
            Some(year) if student_year == Some(year) => Ok(()),
            Some(_) => Err(RegistrationError::Unauthorized { role, action }),
            None => Err(RegistrationError::ScopeUnresolved { role }),
        },
    }
}

/// Error raised by the registration service. Every denial names the check
/// that refused and carries the context needed to explain it.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("{role} may not {action}")]
    Unauthorized { role: FestRole, action: &'static str },
    #[error("no coordinator year resolves for {role}")]
    ScopeUnresolved { role: FestRole },
    #[error("student {0} is not on the roster")]
    UnknownStudent(StudentId),
    #[error("event {0} is not open for registration")]
    UnknownEvent(EventId),
    #[error("registration {0} does not exist")]
    UnknownRegistration(RegistrationId),
    #[error("student {student_id} already holds an active registration for event {event_id}")]
    AlreadyRegistered {
        student_id: StudentId,
        event_id: EventId,
    },
    #[error("{category} quota reached: {current_count} of {limit} used")]
    QuotaExceeded {
        category: EventCategory,
        current_count: u32,
        limit: u32,
    },
    #[error("registration window closed on {deadline}")]
    WindowClosed { deadline: DateTime<Utc> },
    #[error("registrations are currently closed")]
    GloballyClosed,
    #[error("cannot move a {from} registration to {to}")]
    InvalidTransition {
        from: RegistrationStatus,
        to: RegistrationStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistrationError {
    /// Stable machine tag for wire responses and log scraping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::ScopeUnresolved { .. } => "SCOPE_UNRESOLVED",
            Self::UnknownStudent(_) => "UNKNOWN_STUDENT",
            Self::UnknownEvent(_) => "UNKNOWN_EVENT",
            Self::UnknownRegistration(_) => "UNKNOWN_REGISTRATION",
            Self::AlreadyRegistered { .. } => "ALREADY_REGISTERED",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::WindowClosed { .. } => "WINDOW_CLOSED",
            Self::GloballyClosed => "REGISTRATIONS_CLOSED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Store(_) => "STORE_UNAVAILABLE",
        }
    }
}
