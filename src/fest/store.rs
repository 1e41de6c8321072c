use super::audit::ActivityLogEntry;
use super::domain::{
    EventId, EventResult, FestEvent, Registration, RegistrationId, RegistrationStatus, Student,
    StudentId, UserId,
};
use super::roles::UserProfile;

/// Error enumeration for data store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction over the festival data set so the engine can be
/// exercised against in-memory fixtures or a real backend.
pub trait FestStore: Send + Sync {
    fn insert_registration(&self, registration: Registration) -> Result<Registration, StoreError>;
    fn update_registration_status(
        &self,
        id: &RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration, StoreError>;
    /// Removes the registration and returns the removed row.
    fn delete_registration(&self, id: &RegistrationId) -> Result<Registration, StoreError>;
    fn registration(&self, id: &RegistrationId) -> Result<Option<Registration>, StoreError>;
    fn registrations(&self) -> Result<Vec<Registration>, StoreError>;
    fn registrations_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<Registration>, StoreError>;

    fn student(&self, id: &StudentId) -> Result<Option<Student>, StoreError>;
    fn students(&self) -> Result<Vec<Student>, StoreError>;
    fn event(&self, id: &EventId) -> Result<Option<FestEvent>, StoreError>;
    fn events(&self) -> Result<Vec<FestEvent>, StoreError>;

    fn record_result(&self, result: EventResult) -> Result<(), StoreError>;
    fn results(&self) -> Result<Vec<EventResult>, StoreError>;

    fn append_activity(&self, entry: ActivityLogEntry) -> Result<(), StoreError>;
    /// Most recent entries first, at most `limit` of them.
    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StoreError>;
}

/// Lookup into the external identity platform.
pub trait IdentityProvider: Send + Sync {
    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError>;
}
