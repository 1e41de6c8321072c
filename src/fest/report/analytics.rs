use std::collections::HashMap;

use super::views::{
    AtLimitStudent, CapacityState, EventOccupancy, EventTally, FestAnalytics, YearOccupancy,
};
use crate::fest::domain::{
    AcademicYear, EventCategory, EventId, FestEvent, Registration, Student, StudentId,
};
use crate::fest::registrations::eligibility::QuotaUsage;
use crate::fest::settings::FestSettings;

/// Events drawing fewer active registrations than this are flagged for
/// attention.
const LOW_TURNOUT_FLOOR: u32 = 3;

/// Pure fold producing the festival analytics report. Inactive events are
/// ignored even if the caller passes them in, and every derived figure is
/// computed from the inputs alone.
pub fn compute_event_analytics(
    registrations: &[Registration],
    events: &[FestEvent],
    students: &[Student],
    settings: &FestSettings,
    top_n: usize,
) -> FestAnalytics {
    let year_of: HashMap<&StudentId, AcademicYear> =
        students.iter().map(|s| (&s.id, s.year)).collect();

    let mut by_event: HashMap<&EventId, Vec<&Registration>> = HashMap::new();
    for registration in registrations {
        by_event
            .entry(&registration.event_id)
            .or_default()
            .push(registration);
    }

    let mut event_views = Vec::new();
    let mut total_active = 0u32;
    let mut total_rejected = 0u32;

    for event in events.iter().filter(|event| event.is_active) {
        let rows = by_event.get(&event.id).map(Vec::as_slice).unwrap_or(&[]);

        let mut active_by_year: HashMap<AcademicYear, u32> = HashMap::new();
        let mut active = 0u32;
        let mut rejected = 0u32;
        for row in rows {
            if !row.status.is_active() {
                rejected += 1;
                continue;
            }
            active += 1;
            if let Some(year) = year_of.get(&row.student_id) {
                *active_by_year.entry(*year).or_default() += 1;
            }
        }

        let years: Vec<YearOccupancy> = AcademicYear::ordered()
            .into_iter()
            .map(|year| {
                let count = active_by_year.get(&year).copied().unwrap_or(0);
                let occupancy_pct = event
                    .max_entries_per_year
                    .map(|cap| occupancy_rate(count, cap));
                YearOccupancy {
                    year,
                    year_label: year.label(),
                    active: count,
                    occupancy_pct,
                    capacity: occupancy_pct
                        .map(CapacityState::from_rate)
                        .unwrap_or(CapacityState::Open),
                }
            })
            .collect();

        let missing_years: Vec<AcademicYear> = years
            .iter()
            .filter(|year| year.active == 0)
            .map(|year| year.year)
            .collect();

        let capacity_pct = event.participant_cap.map(|cap| occupancy_rate(active, cap));

        total_active += active;
        total_rejected += rejected;
        event_views.push(EventOccupancy {
            event_id: event.id.clone(),
            name: event.name.clone(),
            category: event.category,
            total_active: active,
            rejected,
            capacity_pct,
            capacity: capacity_pct
                .map(CapacityState::from_rate)
                .unwrap_or(CapacityState::Open),
            years,
            missing_years,
        });
    }

    let mut top_events: Vec<EventTally> = event_views.iter().map(tally).collect();
    top_events.sort_by(|a, b| b.active.cmp(&a.active));
    top_events.truncate(top_n);

    let mut low_turnout: Vec<EventTally> = event_views
        .iter()
        .filter(|view| view.total_active < LOW_TURNOUT_FLOOR)
        .map(tally)
        .collect();
    low_turnout.sort_by(|a, b| a.active.cmp(&b.active));

    let at_limit_students = collect_at_limit(registrations, events, students, settings);

    let graded = total_active + total_rejected;
    let rejection_pct = if graded == 0 {
        0.0
    } else {
        total_rejected as f32 * 100.0 / graded as f32
    };

    FestAnalytics {
        events: event_views,
        top_events,
        low_turnout,
        at_limit_students,
        total_active,
        total_rejected,
        rejection_pct,
    }
}

fn occupancy_rate(count: u32, cap: u32) -> f32 {
    if cap == 0 {
        100.0
    } else {
        count as f32 * 100.0 / cap as f32
    }
}

fn tally(view: &EventOccupancy) -> EventTally {
    EventTally {
        event_id: view.event_id.clone(),
        name: view.name.clone(),
        active: view.total_active,
    }
}

fn collect_at_limit(
    registrations: &[Registration],
    events: &[FestEvent],
    students: &[Student],
    settings: &FestSettings,
) -> Vec<AtLimitStudent> {
    let categories: HashMap<EventId, EventCategory> = events
        .iter()
        .map(|event| (event.id.clone(), event.category))
        .collect();

    let mut per_student: HashMap<&StudentId, Vec<Registration>> = HashMap::new();
    for registration in registrations {
        per_student
            .entry(&registration.student_id)
            .or_default()
            .push(registration.clone());
    }

    students
        .iter()
        .filter_map(|student| {
            let rows = per_student.get(&student.id).map(Vec::as_slice).unwrap_or(&[]);
            let usage = QuotaUsage::tally(rows, &categories);
            let flagged = usage.at_limit(EventCategory::OnStage, settings)
                || usage.at_limit(EventCategory::OffStage, settings);
            flagged.then(|| AtLimitStudent {
                student_id: student.id.clone(),
                name: student.name.clone(),
                year: student.year,
                on_stage: usage.on_stage,
                off_stage: usage.off_stage,
            })
        })
        .collect()
}
