use serde::Serialize;

use crate::fest::domain::{AcademicYear, EventCategory, EventId, StudentId};

const NEAR_CAPACITY_PCT: f32 = 80.0;
const FULL_PCT: f32 = 100.0;

/// How much of a configured cap is already spoken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityState {
    Open,
    NearCapacity,
    Full,
}

impl CapacityState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::NearCapacity => "near capacity",
            Self::Full => "full",
        }
    }

    pub fn from_rate(rate: f32) -> Self {
        if rate >= FULL_PCT {
            Self::Full
        } else if rate >= NEAR_CAPACITY_PCT {
            Self::NearCapacity
        } else {
            Self::Open
        }
    }
}

/// Occupancy of one academic year within one event.
#[derive(Debug, Clone, Serialize)]
pub struct YearOccupancy {
    pub year: AcademicYear,
    pub year_label: &'static str,
    pub active: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_pct: Option<f32>,
    pub capacity: CapacityState,
}

/// Per-event slice of the analytics report.
#[derive(Debug, Clone, Serialize)]
pub struct EventOccupancy {
    pub event_id: EventId,
    pub name: String,
    pub category: EventCategory,
    pub total_active: u32,
    pub rejected: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_pct: Option<f32>,
    pub capacity: CapacityState,
    pub years: Vec<YearOccupancy>,
    /// Years with no active registration at all; the participation gaps.
    pub missing_years: Vec<AcademicYear>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTally {
    pub event_id: EventId,
    pub name: String,
    pub active: u32,
}

/// A student whose category usage has reached the configured quota.
#[derive(Debug, Clone, Serialize)]
pub struct AtLimitStudent {
    pub student_id: StudentId,
    pub name: String,
    pub year: AcademicYear,
    pub on_stage: u32,
    pub off_stage: u32,
}

/// Full analytics report over the caller's visible slice of the festival.
#[derive(Debug, Clone, Serialize)]
pub struct FestAnalytics {
    pub events: Vec<EventOccupancy>,
    pub top_events: Vec<EventTally>,
    pub low_turnout: Vec<EventTally>,
    pub at_limit_students: Vec<AtLimitStudent>,
    pub total_active: u32,
    pub total_rejected: u32,
    pub rejection_pct: f32,
}

/// One year's line in the standings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingsRow {
    pub year: AcademicYear,
    pub year_label: &'static str,
    pub played: u32,
    pub first_places: u32,
    pub second_places: u32,
    pub third_places: u32,
    pub penalties: u32,
    pub total_points: i64,
}

/// Standings table plus the count of results that could not be attributed
/// to a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standings {
    pub table: Vec<StandingsRow>,
    pub unlinked_results: u32,
}
