use super::domain::{AcademicYear, Registration, Student, StudentId};
use super::roles::{Actor, FestRole};

/// What slice of the registration data an actor may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationScope {
    All,
    Year(AcademicYear),
    OwnStudent(StudentId),
    /// Fail-closed scope: matches nothing.
    Nothing,
}

/// Derives the visibility scope for a resolved actor. Coordinators whose
/// role cannot resolve to a year, and students without a linked roster
/// record, see nothing.
pub fn registration_scope(actor: &Actor) -> RegistrationScope {
    match actor.role() {
        FestRole::Admin | FestRole::EventManager => RegistrationScope::All,
        FestRole::Student => match &actor.student_id {
            Some(student_id) => RegistrationScope::OwnStudent(student_id.clone()),
            None => RegistrationScope::Nothing,
        },
        role => match role.coordinator_year() {
            Some(year) => RegistrationScope::Year(year),
            None => RegistrationScope::Nothing,
        },
    }
}

impl RegistrationScope {
    /// Pure predicate over one registration. `student` is the roster row
    /// for the registration's student when it resolves; a registration
    /// whose student is missing from the roster is visible only under
    /// `All`.
    pub fn permits(&self, registration: &Registration, student: Option<&Student>) -> bool {
        match self {
            Self::All => true,
            Self::Year(year) => student.map(|s| s.year == *year).unwrap_or(false),
            Self::OwnStudent(own) => student.is_some() && &registration.student_id == own,
            Self::Nothing => false,
        }
    }

    pub fn permits_student(&self, student: &Student) -> bool {
        match self {
            Self::All => true,
            Self::Year(year) => student.year == *year,
            Self::OwnStudent(own) => &student.id == own,
            Self::Nothing => false,
        }
    }
}
