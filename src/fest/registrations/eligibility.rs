use std::collections::HashMap;

use serde::Serialize;

use crate::fest::domain::{EventCategory, EventId, Registration};
use crate::fest::settings::FestSettings;

/// Outcome of a quota probe for one student and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub current_count: u32,
    pub limit: u32,
    pub category: EventCategory,
}

/// Per-category counts of the registrations holding a seat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaUsage {
    pub on_stage: u32,
    pub off_stage: u32,
}

impl QuotaUsage {
    /// Counts pending and approved registrations per category. Rejected
    /// registrations never consume quota, and a registration whose event
    /// cannot be resolved is not counted against either category.
    pub fn tally(
        registrations: &[Registration],
        categories: &HashMap<EventId, EventCategory>,
    ) -> Self {
        let mut usage = Self::default();
        for registration in registrations {
            if !registration.status.is_active() {
                continue;
            }
            match categories.get(&registration.event_id) {
                Some(EventCategory::OnStage) => usage.on_stage += 1,
                Some(EventCategory::OffStage) => usage.off_stage += 1,
                None => {}
            }
        }
        usage
    }

    pub const fn count(&self, category: EventCategory) -> u32 {
        match category {
            EventCategory::OnStage => self.on_stage,
            EventCategory::OffStage => self.off_stage,
        }
    }

    /// Whether this usage meets or exceeds a configured limit with real
    /// engagement behind it. Zero-limit settings never flag idle students.
    pub const fn at_limit(&self, category: EventCategory, settings: &FestSettings) -> bool {
        let count = self.count(category);
        count >= settings.limit_for(category) && count > 0
    }
}

/// Applies a category limit to the current usage. A limit of zero denies
/// the category outright.
pub fn quota_check(usage: QuotaUsage, category: EventCategory, settings: &FestSettings) -> QuotaCheck {
    let current_count = usage.count(category);
    let limit = settings.limit_for(category);
    QuotaCheck {
        allowed: current_count < limit,
        current_count,
        limit,
        category,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::fest::domain::{RegistrationId, RegistrationStatus, StudentId};

    fn registration(event: &str, status: RegistrationStatus) -> Registration {
        Registration {
            id: RegistrationId(format!("reg-{event}-{}", status.label())),
            student_id: StudentId("s-1".to_string()),
            event_id: EventId(event.to_string()),
            status,
            registered_at: Utc::now(),
            registered_by: None,
        }
    }

    fn categories() -> HashMap<EventId, EventCategory> {
        HashMap::from([
            (EventId("ev-dance".to_string()), EventCategory::OnStage),
            (EventId("ev-quiz".to_string()), EventCategory::OffStage),
        ])
    }

    fn open_settings(on_stage: u32, off_stage: u32) -> FestSettings {
        FestSettings {
            max_on_stage_registrations: on_stage,
            max_off_stage_registrations: off_stage,
            registration_open: true,
            scoreboard_visible: true,
            auto_approve_registrations: false,
        }
    }

    #[test]
    fn pending_and_approved_count_toward_quota() {
        let rows = vec![
            registration("ev-dance", RegistrationStatus::Pending),
            registration("ev-dance", RegistrationStatus::Approved),
            registration("ev-quiz", RegistrationStatus::Pending),
        ];
        let usage = QuotaUsage::tally(&rows, &categories());
        assert_eq!(usage.on_stage, 2);
        assert_eq!(usage.off_stage, 1);
    }

    #[test]
    fn rejected_registrations_free_quota() {
        let rows = vec![
            registration("ev-dance", RegistrationStatus::Rejected),
            registration("ev-dance", RegistrationStatus::Rejected),
        ];
        let usage = QuotaUsage::tally(&rows, &categories());
        let check = quota_check(usage, EventCategory::OnStage, &open_settings(1, 1));
        assert!(check.allowed);
        assert_eq!(check.current_count, 0);
    }

    #[test]
    fn at_limit_usage_is_denied() {
        let rows = vec![
            registration("ev-dance", RegistrationStatus::Approved),
            registration("ev-dance", RegistrationStatus::Pending),
        ];
        let usage = QuotaUsage::tally(&rows, &categories());
        let check = quota_check(usage, EventCategory::OnStage, &open_settings(2, 2));
        assert!(!check.allowed);
        assert_eq!(check.current_count, 2);
        assert_eq!(check.limit, 2);
    }

    #[test]
    fn zero_limit_denies_outright() {
        let check = quota_check(
            QuotaUsage::default(),
            EventCategory::OffStage,
            &open_settings(2, 0),
        );
        assert!(!check.allowed);
        assert_eq!(check.limit, 0);
    }

    #[test]
    fn categories_are_tracked_independently() {
        let rows = vec![
            registration("ev-dance", RegistrationStatus::Approved),
            registration("ev-dance", RegistrationStatus::Approved),
        ];
        let usage = QuotaUsage::tally(&rows, &categories());
        let settings = open_settings(2, 2);
        assert!(!quota_check(usage, EventCategory::OnStage, &settings).allowed);
        assert!(quota_check(usage, EventCategory::OffStage, &settings).allowed);
    }

    #[test]
    fn unresolvable_events_do_not_consume_quota() {
        let rows = vec![registration("ev-unlisted", RegistrationStatus::Approved)];
        let usage = QuotaUsage::tally(&rows, &categories());
        assert_eq!(usage, QuotaUsage::default());
    }

    #[test]
    fn at_limit_flag_requires_real_usage() {
        let settings = open_settings(0, 0);
        assert!(!QuotaUsage::default().at_limit(EventCategory::OnStage, &settings));
        let usage = QuotaUsage {
            on_stage: 1,
            off_stage: 0,
        };
        assert!(usage.at_limit(EventCategory::OnStage, &settings));
    }
}
