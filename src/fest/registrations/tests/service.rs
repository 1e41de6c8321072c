use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use super::common::*;
use crate::fest::audit::AuditAction;
use crate::fest::domain::{
    AcademicYear, EventCategory, EventId, Registration, RegistrationId, RegistrationStatus,
    StudentId, UserId,
};
use crate::fest::registrations::{RegistrationError, RegistrationService};
use crate::fest::roles::FestRole;
use crate::fest::settings::{FestSettings, InMemorySettings};
use crate::fest::store::{FestStore, StoreError};

#[test]
fn self_registration_starts_pending_and_unassisted() {
    let (service, store, _settings) = build_service();

    let registration = service
        .create(&student_actor("stu-1"), entry("stu-1", "evt-dance"))
        .expect("entry accepted");

    assert_eq!(registration.status, RegistrationStatus::Pending);
    assert!(registration.registered_by.is_none());

    let stored = store
        .registration(&registration.id)
        .expect("fetch succeeds")
        .expect("row present");
    assert_eq!(stored.student_id, StudentId("stu-1".to_string()));

    let trail = store.activity();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, AuditAction::RegistrationCreated);
    assert_eq!(trail[0].actor, Some(UserId("user-stu-1".to_string())));
    assert_eq!(trail[0].details["assisted"], json!(false));
}

#[test]
fn auto_approval_skips_the_review_queue() {
    let (service, _store, settings) = build_service();
    settings.replace(FestSettings {
        auto_approve_registrations: true,
        ..open_settings()
    });

    let registration = service
        .create(&student_actor("stu-1"), entry("stu-1", "evt-quiz"))
        .expect("entry accepted");

    assert_eq!(registration.status, RegistrationStatus::Approved);
}

#[test]
fn the_kill_switch_closes_registration_for_everyone() {
    let (service, store, settings) = build_service();
    settings.replace(FestSettings {
        registration_open: false,
        ..open_settings()
    });

    match service.create(&admin(), entry("stu-1", "evt-dance")) {
        Err(RegistrationError::GloballyClosed) => {}
        other => panic!("expected closed registrations, got {other:?}"),
    }
    assert!(store.activity().is_empty());
}

#[test]
fn event_deadlines_gate_late_entries() {
    let (service, store, _settings) = build_service();
    let mut closed = open_event("evt-late", "Late Night Jam", EventCategory::OnStage);
    closed.registration_deadline = Some(Utc::now() - Duration::hours(1));
    store.add_event(closed);
    let mut open = open_event("evt-open", "Morning Raga", EventCategory::OnStage);
    open.registration_deadline = Some(Utc::now() + Duration::hours(1));
    store.add_event(open);

    match service.create(&student_actor("stu-1"), entry("stu-1", "evt-late")) {
        Err(RegistrationError::WindowClosed { .. }) => {}
        other => panic!("expected a closed window, got {other:?}"),
    }
    service
        .create(&student_actor("stu-1"), entry("stu-1", "evt-open"))
        .expect("entry before the deadline is accepted");
}

#[test]
fn duplicate_entries_are_refused_until_the_first_is_rejected() {
    let (service, _store, _settings) = build_service();
    let student = student_actor("stu-1");

    let first = service
        .create(&student, entry("stu-1", "evt-dance"))
        .expect("first entry accepted");
    match service.create(&student, entry("stu-1", "evt-dance")) {
        Err(RegistrationError::AlreadyRegistered { .. }) => {}
        other => panic!("expected a duplicate refusal, got {other:?}"),
    }

    service
        .set_status(&admin(), &first.id, RegistrationStatus::Rejected)
        .expect("rejection succeeds");
    service
        .create(&student, entry("stu-1", "evt-dance"))
        .expect("a rejected entry no longer blocks re-registration");
}

#[test]
fn category_quotas_are_enforced_independently() {
    let (service, store, _settings) = build_service();
    store.add_event(open_event("evt-mime", "Mime", EventCategory::OnStage));
    let student = student_actor("stu-1");

    service
        .create(&student, entry("stu-1", "evt-dance"))
        .expect("first on-stage entry");
    service
        .create(&student, entry("stu-1", "evt-drama"))
        .expect("second on-stage entry");

    match service.create(&student, entry("stu-1", "evt-mime")) {
        Err(RegistrationError::QuotaExceeded {
            category: EventCategory::OnStage,
            current_count: 2,
            limit: 2,
        }) => {}
        other => panic!("expected the on-stage quota, got {other:?}"),
    }

    service
        .create(&student, entry("stu-1", "evt-quiz"))
        .expect("the off-stage quota is untouched");
}

#[test]
fn unknown_students_and_inactive_events_are_refused() {
    let (service, store, _settings) = build_service();
    let mut archived = open_event("evt-archived", "Retired Event", EventCategory::OnStage);
    archived.is_active = false;
    store.add_event(archived);

    match service.create(&admin(), entry("stu-404", "evt-dance")) {
        Err(RegistrationError::UnknownStudent(id)) => {
            assert_eq!(id, StudentId("stu-404".to_string()));
        }
        other => panic!("expected an unknown student, got {other:?}"),
    }
    match service.create(&admin(), entry("stu-1", "evt-404")) {
        Err(RegistrationError::UnknownEvent(_)) => {}
        other => panic!("expected an unknown event, got {other:?}"),
    }
    match service.create(&admin(), entry("stu-1", "evt-archived")) {
        Err(RegistrationError::UnknownEvent(_)) => {}
        other => panic!("expected archived events to be refused, got {other:?}"),
    }
}

#[test]
fn students_cannot_enter_classmates_but_staff_can() {
    let (service, store, _settings) = build_service();

    match service.create(&student_actor("stu-1"), entry("stu-2", "evt-dance")) {
        Err(RegistrationError::Unauthorized {
            role: FestRole::Student,
            ..
        }) => {}
        other => panic!("expected a refusal, got {other:?}"),
    }

    let assisted = service
        .create(&manager(), entry("stu-2", "evt-dance"))
        .expect("staff can assist");
    assert_eq!(
        assisted.registered_by,
        Some(UserId("user-manager".to_string()))
    );
    let trail = store.activity();
    assert_eq!(
        trail.last().expect("audit entry").details["assisted"],
        json!(true)
    );
}

#[test]
fn only_pending_entries_can_be_decided() {
    let (service, _store, _settings) = build_service();
    let registration = service
        .create(&student_actor("stu-1"), entry("stu-1", "evt-dance"))
        .expect("entry accepted");

    service
        .set_status(&admin(), &registration.id, RegistrationStatus::Approved)
        .expect("pending entries can be approved");

    match service.set_status(&admin(), &registration.id, RegistrationStatus::Rejected) {
        Err(RegistrationError::InvalidTransition {
            from: RegistrationStatus::Approved,
            to: RegistrationStatus::Rejected,
        }) => {}
        other => panic!("expected a refused transition, got {other:?}"),
    }
    match service.set_status(&admin(), &registration.id, RegistrationStatus::Pending) {
        Err(RegistrationError::InvalidTransition { .. }) => {}
        other => panic!("expected a refused transition, got {other:?}"),
    }
}

#[test]
fn deciding_a_missing_registration_is_not_found() {
    let (service, _store, _settings) = build_service();
    match service.set_status(
        &admin(),
        &RegistrationId("reg-404".to_string()),
        RegistrationStatus::Approved,
    ) {
        Err(RegistrationError::UnknownRegistration(_)) => {}
        other => panic!("expected an unknown registration, got {other:?}"),
    }
}

#[test]
fn coordinators_decide_only_their_own_year() {
    let (service, _store, _settings) = build_service();
    let registration = service
        .create(&student_actor("stu-1"), entry("stu-1", "evt-dance"))
        .expect("entry accepted");

    match service.set_status(
        &coordinator(AcademicYear::Second),
        &registration.id,
        RegistrationStatus::Approved,
    ) {
        Err(RegistrationError::Unauthorized { .. }) => {}
        other => panic!("expected a cross-year refusal, got {other:?}"),
    }
    match service.set_status(
        &student_actor("stu-1"),
        &registration.id,
        RegistrationStatus::Approved,
    ) {
        Err(RegistrationError::Unauthorized { .. }) => {}
        other => panic!("expected students to be refused, got {other:?}"),
    }

    let approved = service
        .set_status(
            &coordinator(AcademicYear::First),
            &registration.id,
            RegistrationStatus::Approved,
        )
        .expect("the matching coordinator approves");
    assert_eq!(approved.status, RegistrationStatus::Approved);
}

#[test]
fn entries_without_a_roster_row_stay_out_of_coordinator_reach() {
    let (service, store, _settings) = build_service();
    store
        .insert_registration(Registration {
            id: RegistrationId("reg-ghost".to_string()),
            student_id: StudentId("stu-gone".to_string()),
            event_id: EventId("evt-dance".to_string()),
            status: RegistrationStatus::Pending,
            registered_at: Utc::now(),
            registered_by: None,
        })
        .expect("insert succeeds");

    match service.set_status(
        &coordinator(AcademicYear::First),
        &RegistrationId("reg-ghost".to_string()),
        RegistrationStatus::Approved,
    ) {
        Err(RegistrationError::Unauthorized { .. }) => {}
        other => panic!("expected coordinators to fail closed, got {other:?}"),
    }

    service
        .delete(&admin(), &RegistrationId("reg-ghost".to_string()))
        .expect("admins can clean up orphaned entries");
}

#[test]
fn deleting_an_entry_frees_its_quota_seat() {
    let (service, store, _settings) = build_service();
    store.add_event(open_event("evt-mime", "Mime", EventCategory::OnStage));
    let student = student_actor("stu-1");

    let first = service
        .create(&student, entry("stu-1", "evt-dance"))
        .expect("first entry");
    service
        .create(&student, entry("stu-1", "evt-drama"))
        .expect("second entry");
    assert!(matches!(
        service.create(&student, entry("stu-1", "evt-mime")),
        Err(RegistrationError::QuotaExceeded { .. })
    ));

    service.delete(&admin(), &first.id).expect("delete succeeds");
    service
        .create(&student, entry("stu-1", "evt-mime"))
        .expect("the freed seat is usable again");

    let trail = store.activity();
    assert!(trail
        .iter()
        .any(|line| line.action == AuditAction::RegistrationDeleted));
}

#[test]
fn store_outages_surface_as_store_errors() {
    let service = RegistrationService::new(
        Arc::new(UnavailableStore),
        Arc::new(InMemorySettings::new(open_settings())),
    );

    match service.create(&admin(), entry("stu-1", "evt-dance")) {
        Err(RegistrationError::Store(StoreError::Unavailable(_))) => {}
        other => panic!("expected a store failure, got {other:?}"),
    }
}

#[test]
fn an_unreadable_settings_source_fails_closed() {
    let store = Arc::new(seeded_store());
    let service = RegistrationService::new(store, Arc::new(OfflineSettings));

    match service.create(&student_actor("stu-1"), entry("stu-1", "evt-dance")) {
        Err(RegistrationError::GloballyClosed) => {}
        other => panic!("expected fail-closed registrations, got {other:?}"),
    }

    let check = service
        .can_register(&StudentId("stu-1".to_string()), EventCategory::OnStage)
        .expect("probe still answers");
    assert!(!check.allowed);
    assert_eq!(check.limit, 0);
}

#[test]
fn eligibility_probe_reports_usage_against_the_limit() {
    let (service, _store, _settings) = build_service();
    let student = student_actor("stu-1");
    service
        .create(&student, entry("stu-1", "evt-dance"))
        .expect("entry accepted");

    let check = service
        .can_register(&StudentId("stu-1".to_string()), EventCategory::OnStage)
        .expect("probe answers");
    assert!(check.allowed);
    assert_eq!(check.current_count, 1);
    assert_eq!(check.limit, 2);

    match service.can_register(&StudentId("stu-404".to_string()), EventCategory::OnStage) {
        Err(RegistrationError::UnknownStudent(_)) => {}
        other => panic!("expected an unknown student, got {other:?}"),
    }
}

#[test]
fn the_audit_trail_records_each_mutation_in_order() {
    let (service, store, _settings) = build_service();
    let student = student_actor("stu-1");

    let registration = service
        .create(&student, entry("stu-1", "evt-dance"))
        .expect("entry accepted");
    service
        .set_status(&admin(), &registration.id, RegistrationStatus::Approved)
        .expect("approval succeeds");
    service
        .delete(&admin(), &registration.id)
        .expect("delete succeeds");

    let trail = store.activity();
    let actions: Vec<AuditAction> = trail.iter().map(|line| line.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::RegistrationCreated,
            AuditAction::RegistrationStatusUpdated,
            AuditAction::RegistrationDeleted,
        ]
    );
    assert_eq!(trail[1].details["from"], json!("pending"));
    assert_eq!(trail[1].details["to"], json!("approved"));
    assert_eq!(trail[2].details["last_status"], json!("approved"));
}
