use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::fest::audit::ActivityLogEntry;
use crate::fest::domain::{
    AcademicYear, EventCategory, EventId, EventMode, EventResult, FestEvent, NewRegistration,
    Registration, RegistrationId, RegistrationStatus, Student, StudentId, UserId,
};
use crate::fest::memory::{InMemoryFestStore, InMemoryIdentity};
use crate::fest::registrations::{registry_router, RegistrationService};
use crate::fest::roles::{Actor, FestRole, UserProfile};
use crate::fest::settings::{FestSettings, InMemorySettings, SettingsError, SettingsSource};
use crate::fest::store::{FestStore, IdentityProvider, StoreError};

pub(super) fn open_settings() -> FestSettings {
    FestSettings {
        max_on_stage_registrations: 2,
        max_off_stage_registrations: 2,
        registration_open: true,
        scoreboard_visible: true,
        auto_approve_registrations: false,
    }
}

pub(super) fn roster_student(id: &str, name: &str, roll: &str, year: AcademicYear) -> Student {
    Student {
        id: StudentId(id.to_string()),
        name: name.to_string(),
        roll_number: roll.to_string(),
        department: "CSE".to_string(),
        year,
        contact: format!("{id}@campus.edu"),
        user_id: Some(UserId(format!("user-{id}"))),
    }
}

pub(super) fn open_event(id: &str, name: &str, category: EventCategory) -> FestEvent {
    FestEvent {
        id: EventId(id.to_string()),
        name: name.to_string(),
        category,
        mode: EventMode::Solo,
        max_entries_per_year: None,
        participant_cap: None,
        registration_deadline: None,
        is_active: true,
    }
}

/// One student per year plus two events per category, all wide open.
pub(super) fn seeded_store() -> InMemoryFestStore {
    let store = InMemoryFestStore::new();
    store.add_student(roster_student("stu-1", "Asha Verma", "24CS001", AcademicYear::First));
    store.add_student(roster_student("stu-2", "Bilal Khan", "23EC002", AcademicYear::Second));
    store.add_student(roster_student("stu-3", "Chitra Rao", "22ME003", AcademicYear::Third));
    store.add_student(roster_student("stu-4", "Dev Patel", "21CE004", AcademicYear::Fourth));
    store.add_event(open_event("evt-dance", "Classical Dance", EventCategory::OnStage));
    store.add_event(open_event("evt-drama", "Mono Acting", EventCategory::OnStage));
    store.add_event(open_event("evt-quiz", "General Quiz", EventCategory::OffStage));
    store.add_event(open_event("evt-chess", "Blitz Chess", EventCategory::OffStage));
    store
}

pub(super) fn build_service() -> (
    RegistrationService<InMemoryFestStore, InMemorySettings>,
    Arc<InMemoryFestStore>,
    Arc<InMemorySettings>,
) {
    let store = Arc::new(seeded_store());
    let settings = Arc::new(InMemorySettings::new(open_settings()));
    let service = RegistrationService::new(store.clone(), settings.clone());
    (service, store, settings)
}

pub(super) fn entry(student: &str, event: &str) -> NewRegistration {
    NewRegistration {
        student_id: StudentId(student.to_string()),
        event_id: EventId(event.to_string()),
    }
}

pub(super) fn actor_with_role(user: &str, role: FestRole, student: Option<&str>) -> Actor {
    let profile = UserProfile {
        user_id: UserId(user.to_string()),
        display_name: user.to_string(),
        email: format!("{user}@campus.edu"),
        roles: [role].into_iter().collect(),
        linked_student_id: student.map(|id| StudentId(id.to_string())),
    };
    Actor::resolve(&profile, None).expect("profile grants a role")
}

pub(super) fn admin() -> Actor {
    actor_with_role("user-admin", FestRole::Admin, None)
}

pub(super) fn manager() -> Actor {
    actor_with_role("user-manager", FestRole::EventManager, None)
}

pub(super) fn coordinator(year: AcademicYear) -> Actor {
    let role = match year {
        AcademicYear::First => FestRole::FirstYearCoordinator,
        AcademicYear::Second => FestRole::SecondYearCoordinator,
        AcademicYear::Third => FestRole::ThirdYearCoordinator,
        AcademicYear::Fourth => FestRole::FourthYearCoordinator,
    };
    actor_with_role("user-coordinator", role, None)
}

pub(super) fn student_actor(student: &str) -> Actor {
    actor_with_role(&format!("user-{student}"), FestRole::Student, Some(student))
}

pub(super) fn profile(user: &str, roles: &[FestRole], student: Option<&str>) -> UserProfile {
    UserProfile {
        user_id: UserId(user.to_string()),
        display_name: user.to_string(),
        email: format!("{user}@campus.edu"),
        roles: roles.iter().copied().collect(),
        linked_student_id: student.map(|id| StudentId(id.to_string())),
    }
}

/// Directory matching the seeded roster: staff accounts, one linked student,
/// and one account holding both staff and student roles.
pub(super) fn seeded_identity() -> Arc<InMemoryIdentity> {
    let identity = Arc::new(InMemoryIdentity::new());
    identity.add_profile(profile("user-admin", &[FestRole::Admin], None));
    identity.add_profile(profile("user-manager", &[FestRole::EventManager], None));
    identity.add_profile(profile(
        "user-coordinator",
        &[FestRole::SecondYearCoordinator],
        None,
    ));
    identity.add_profile(profile("user-stu-1", &[FestRole::Student], Some("stu-1")));
    identity.add_profile(profile(
        "user-multi",
        &[FestRole::Student, FestRole::EventManager],
        Some("stu-2"),
    ));
    identity
}

pub(super) fn registry_router_with(
    service: RegistrationService<InMemoryFestStore, InMemorySettings>,
    identity: Arc<InMemoryIdentity>,
) -> axum::Router {
    registry_router(Arc::new(service), identity)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("database offline".to_string()))
}

pub(super) struct UnavailableStore;

impl FestStore for UnavailableStore {
    fn insert_registration(&self, _registration: Registration) -> Result<Registration, StoreError> {
        offline()
    }

    fn update_registration_status(
        &self,
        _id: &RegistrationId,
        _status: RegistrationStatus,
    ) -> Result<Registration, StoreError> {
        offline()
    }

    fn delete_registration(&self, _id: &RegistrationId) -> Result<Registration, StoreError> {
        offline()
    }

    fn registration(&self, _id: &RegistrationId) -> Result<Option<Registration>, StoreError> {
        offline()
    }

    fn registrations(&self) -> Result<Vec<Registration>, StoreError> {
        offline()
    }

    fn registrations_for_student(
        &self,
        _student_id: &StudentId,
    ) -> Result<Vec<Registration>, StoreError> {
        offline()
    }

    fn student(&self, _id: &StudentId) -> Result<Option<Student>, StoreError> {
        offline()
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        offline()
    }

    fn event(&self, _id: &EventId) -> Result<Option<FestEvent>, StoreError> {
        offline()
    }

    fn events(&self) -> Result<Vec<FestEvent>, StoreError> {
        offline()
    }

    fn record_result(&self, _result: EventResult) -> Result<(), StoreError> {
        offline()
    }

    fn results(&self) -> Result<Vec<EventResult>, StoreError> {
        offline()
    }

    fn append_activity(&self, _entry: ActivityLogEntry) -> Result<(), StoreError> {
        offline()
    }

    fn recent_activity(&self, _limit: usize) -> Result<Vec<ActivityLogEntry>, StoreError> {
        offline()
    }
}

pub(super) struct OfflineSettings;

impl SettingsSource for OfflineSettings {
    fn load(&self) -> Result<FestSettings, SettingsError> {
        Err(SettingsError::Unavailable(
            "settings service offline".to_string(),
        ))
    }
}

pub(super) struct OfflineIdentity;

impl IdentityProvider for OfflineIdentity {
    fn profile(&self, _user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        offline()
    }
}
