use std::collections::{BTreeMap, HashMap};

use super::views::{Standings, StandingsRow};
use crate::fest::domain::{
    AcademicYear, EventResult, Placement, Registration, RegistrationId, Student, StudentId,
};

/// Pure fold from recorded results to the year standings table. Results
/// whose registration or student cannot be resolved are skipped and
/// surfaced through `unlinked_results`.
pub fn compute_standings(
    results: &[EventResult],
    registrations: &[Registration],
    students: &[Student],
) -> Standings {
    let student_of: HashMap<&RegistrationId, &StudentId> = registrations
        .iter()
        .map(|registration| (&registration.id, &registration.student_id))
        .collect();
    let year_of: HashMap<&StudentId, AcademicYear> =
        students.iter().map(|student| (&student.id, student.year)).collect();

    let mut rows: BTreeMap<AcademicYear, StandingsRow> = AcademicYear::ordered()
        .into_iter()
        .map(|year| (year, empty_row(year)))
        .collect();
    let mut unlinked_results = 0u32;

    for result in results {
        let year = student_of
            .get(&result.registration_id)
            .and_then(|student_id| year_of.get(*student_id))
            .copied();
        let Some(year) = year else {
            unlinked_results += 1;
            continue;
        };
        let row = rows.entry(year).or_insert_with(|| empty_row(year));
        row.played += 1;
        match result.position {
            Placement::First => row.first_places += 1,
            Placement::Second => row.second_places += 1,
            Placement::Third => row.third_places += 1,
            Placement::Unplaced => {}
        }
        if result.points < 0 {
            row.penalties += 1;
        }
        row.total_points += i64::from(result.points);
    }

    // BTreeMap yields year order; the stable sort keeps it on point ties.
    let mut table: Vec<StandingsRow> = rows.into_values().collect();
    table.sort_by(|a, b| b.total_points.cmp(&a.total_points));

    Standings {
        table,
        unlinked_results,
    }
}

const fn empty_row(year: AcademicYear) -> StandingsRow {
    StandingsRow {
        year,
        year_label: year.label(),
        played: 0,
        first_places: 0,
        second_places: 0,
        third_places: 0,
        penalties: 0,
        total_points: 0,
    }
}
