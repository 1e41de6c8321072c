use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{AcademicYear, StudentId, UserId};

/// Roles a festival user account can hold. Declaration order doubles as the
/// fallback precedence order when resolving an active role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FestRole {
    Admin,
    EventManager,
    FirstYearCoordinator,
    SecondYearCoordinator,
    ThirdYearCoordinator,
    FourthYearCoordinator,
    Student,
}

impl FestRole {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Admin,
            Self::EventManager,
            Self::FirstYearCoordinator,
            Self::SecondYearCoordinator,
            Self::ThirdYearCoordinator,
            Self::FourthYearCoordinator,
            Self::Student,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::EventManager => "Event Manager",
            Self::FirstYearCoordinator => "First Year Coordinator",
            Self::SecondYearCoordinator => "Second Year Coordinator",
            Self::ThirdYearCoordinator => "Third Year Coordinator",
            Self::FourthYearCoordinator => "Fourth Year Coordinator",
            Self::Student => "Student",
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::EventManager => "event_manager",
            Self::FirstYearCoordinator => "first_year_coordinator",
            Self::SecondYearCoordinator => "second_year_coordinator",
            Self::ThirdYearCoordinator => "third_year_coordinator",
            Self::FourthYearCoordinator => "fourth_year_coordinator",
            Self::Student => "student",
        }
    }

    pub fn parse_tag(value: &str) -> Option<Self> {
        Self::ordered().into_iter().find(|role| role.tag() == value)
    }

    /// The academic year a coordinator role governs, if any.
    pub const fn coordinator_year(self) -> Option<AcademicYear> {
        match self {
            Self::FirstYearCoordinator => Some(AcademicYear::First),
            Self::SecondYearCoordinator => Some(AcademicYear::Second),
            Self::ThirdYearCoordinator => Some(AcademicYear::Third),
            Self::FourthYearCoordinator => Some(AcademicYear::Fourth),
            _ => None,
        }
    }

    pub const fn is_staff(self) -> bool {
        !matches!(self, Self::Student)
    }
}

impl fmt::Display for FestRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The set of roles granted to one user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<FestRole>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: FestRole) {
        self.0.insert(role);
    }

    pub fn contains(&self, role: FestRole) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FestRole> + '_ {
        self.0.iter().copied()
    }

    /// Highest-precedence role in the set, independent of insertion order.
    pub fn strongest(&self) -> Option<FestRole> {
        self.0.iter().next().copied()
    }
}

impl FromIterator<FestRole> for RoleSet {
    fn from_iter<I: IntoIterator<Item = FestRole>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The single effective role for a session. Only the resolver produces one,
/// so holding an `ActiveRole` means the role was actually granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveRole(FestRole);

impl ActiveRole {
    /// Resolves the effective role for a session. A requested role is
    /// honored only when the user holds it; otherwise the strongest granted
    /// role wins. An empty role set yields no session role at all.
    pub fn select(roles: &RoleSet, requested: Option<FestRole>) -> Option<Self> {
        if let Some(role) = requested {
            if roles.contains(role) {
                return Some(Self(role));
            }
        }
        roles.strongest().map(Self)
    }

    pub const fn role(self) -> FestRole {
        self.0
    }
}

impl fmt::Display for ActiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.label())
    }
}

/// Directory record for a platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub email: String,
    pub roles: RoleSet,
    pub linked_student_id: Option<StudentId>,
}

/// A resolved caller: the authenticated user plus their effective role for
/// this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub active_role: ActiveRole,
    pub student_id: Option<StudentId>,
    pub origin: Option<String>,
}

impl Actor {
    pub fn resolve(profile: &UserProfile, requested: Option<FestRole>) -> Option<Self> {
        let active_role = ActiveRole::select(&profile.roles, requested)?;
        Some(Self {
            user_id: profile.user_id.clone(),
            active_role,
            student_id: profile.linked_student_id.clone(),
            origin: None,
        })
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub const fn role(&self) -> FestRole {
        self.active_role.role()
    }
}
