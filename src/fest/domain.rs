use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for platform user accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for roster students.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for festival events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

/// Identifier wrapper for event registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Academic years participating in the festival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicYear {
    First,
    Second,
    Third,
    Fourth,
}

impl AcademicYear {
    pub const fn ordered() -> [Self; 4] {
        [Self::First, Self::Second, Self::Third, Self::Fourth]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "First Year",
            Self::Second => "Second Year",
            Self::Third => "Third Year",
            Self::Fourth => "Fourth Year",
        }
    }

    pub const fn ordinal(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Fourth => 4,
        }
    }
}

/// The two event categories, each governed by its own per-student quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    OnStage,
    OffStage,
}

impl EventCategory {
    pub const fn ordered() -> [Self; 2] {
        [Self::OnStage, Self::OffStage]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::OnStage => "On-Stage",
            Self::OffStage => "Off-Stage",
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::OnStage => "on_stage",
            Self::OffStage => "off_stage",
        }
    }

    pub fn parse_tag(value: &str) -> Option<Self> {
        match value {
            "on_stage" => Some(Self::OnStage),
            "off_stage" => Some(Self::OffStage),
            _ => None,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventMode {
    Solo,
    Group,
    Team,
}

impl EventMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Solo => "Solo",
            Self::Group => "Group",
            Self::Team => "Team",
        }
    }
}

/// Lifecycle status of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Pending and approved registrations hold a seat; rejected ones do not.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Finishing position recorded with an event result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    First,
    Second,
    Third,
    #[serde(rename = "none")]
    Unplaced,
}

impl Placement {
    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Third => "third",
            Self::Unplaced => "none",
        }
    }
}

/// Roster entry for a participating student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub year: AcademicYear,
    pub contact: String,
    pub user_id: Option<UserId>,
}

/// A festival event open for registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FestEvent {
    pub id: EventId,
    pub name: String,
    pub category: EventCategory,
    pub mode: EventMode,
    pub max_entries_per_year: Option<u32>,
    pub participant_cap: Option<u32>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// A student's entry into one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub student_id: StudentId,
    pub event_id: EventId,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    /// The acting staff user for assisted registrations, absent when the
    /// student registered themselves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_by: Option<UserId>,
}

/// Request payload for creating a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRegistration {
    pub student_id: StudentId,
    pub event_id: EventId,
}

/// Outcome recorded for a registration once an event concludes.
/// Negative points are penalties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResult {
    pub registration_id: RegistrationId,
    pub points: i32,
    pub position: Placement,
    pub recorded_at: DateTime<Utc>,
}
