use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::audit::ActivityLogEntry;
use super::domain::{
    EventId, EventResult, FestEvent, Registration, RegistrationId, RegistrationStatus, Student,
    StudentId, UserId,
};
use super::roles::UserProfile;
use super::store::{FestStore, IdentityProvider, StoreError};

/// Mutex-guarded store backing the default server wiring, the demo command,
/// and the test suites.
#[derive(Default, Clone)]
pub struct InMemoryFestStore {
    registrations: Arc<Mutex<HashMap<RegistrationId, Registration>>>,
    students: Arc<Mutex<HashMap<StudentId, Student>>>,
    events: Arc<Mutex<HashMap<EventId, FestEvent>>>,
    results: Arc<Mutex<Vec<EventResult>>>,
    activity: Arc<Mutex<Vec<ActivityLogEntry>>>,
}

impl InMemoryFestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&self, student: Student) {
        let mut guard = self.students.lock().expect("student mutex poisoned");
        guard.insert(student.id.clone(), student);
    }

    pub fn add_event(&self, event: FestEvent) {
        let mut guard = self.events.lock().expect("event mutex poisoned");
        guard.insert(event.id.clone(), event);
    }

    /// Full trail oldest-first, for assertions and demo rendering.
    pub fn activity(&self) -> Vec<ActivityLogEntry> {
        self.activity.lock().expect("activity mutex poisoned").clone()
    }
}

impl FestStore for InMemoryFestStore {
    fn insert_registration(&self, registration: Registration) -> Result<Registration, StoreError> {
        let mut guard = self
            .registrations
            .lock()
            .expect("registration mutex poisoned");
        if guard.contains_key(&registration.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(registration.id.clone(), registration.clone());
        Ok(registration)
    }

    fn update_registration_status(
        &self,
        id: &RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration, StoreError> {
        let mut guard = self
            .registrations
            .lock()
            .expect("registration mutex poisoned");
        match guard.get_mut(id) {
            Some(registration) => {
                registration.status = status;
                Ok(registration.clone())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn delete_registration(&self, id: &RegistrationId) -> Result<Registration, StoreError> {
        let mut guard = self
            .registrations
            .lock()
            .expect("registration mutex poisoned");
        guard.remove(id).ok_or(StoreError::NotFound)
    }

    fn registration(&self, id: &RegistrationId) -> Result<Option<Registration>, StoreError> {
        let guard = self
            .registrations
            .lock()
            .expect("registration mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn registrations(&self) -> Result<Vec<Registration>, StoreError> {
        let guard = self
            .registrations
            .lock()
            .expect("registration mutex poisoned");
        let mut rows: Vec<Registration> = guard.values().cloned().collect();
        rows.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(rows)
    }

    fn registrations_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<Registration>, StoreError> {
        let rows = self.registrations()?;
        Ok(rows
            .into_iter()
            .filter(|registration| &registration.student_id == student_id)
            .collect())
    }

    fn student(&self, id: &StudentId) -> Result<Option<Student>, StoreError> {
        let guard = self.students.lock().expect("student mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        let guard = self.students.lock().expect("student mutex poisoned");
        let mut rows: Vec<Student> = guard.values().cloned().collect();
        rows.sort_by(|a, b| a.roll_number.cmp(&b.roll_number));
        Ok(rows)
    }

    fn event(&self, id: &EventId) -> Result<Option<FestEvent>, StoreError> {
        let guard = self.events.lock().expect("event mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn events(&self) -> Result<Vec<FestEvent>, StoreError> {
        let guard = self.events.lock().expect("event mutex poisoned");
        let mut rows: Vec<FestEvent> = guard.values().cloned().collect();
        rows.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(rows)
    }

    fn record_result(&self, result: EventResult) -> Result<(), StoreError> {
        let mut guard = self.results.lock().expect("result mutex poisoned");
        guard.push(result);
        Ok(())
    }

    fn results(&self) -> Result<Vec<EventResult>, StoreError> {
        let guard = self.results.lock().expect("result mutex poisoned");
        Ok(guard.clone())
    }

    fn append_activity(&self, entry: ActivityLogEntry) -> Result<(), StoreError> {
        let mut guard = self.activity.lock().expect("activity mutex poisoned");
        guard.push(entry);
        Ok(())
    }

    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StoreError> {
        let guard = self.activity.lock().expect("activity mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Profile directory stand-in for the external identity platform.
#[derive(Default, Clone)]
pub struct InMemoryIdentity {
    profiles: Arc<Mutex<HashMap<UserId, UserProfile>>>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, profile: UserProfile) {
        let mut guard = self.profiles.lock().expect("profile mutex poisoned");
        guard.insert(profile.user_id.clone(), profile);
    }
}

impl IdentityProvider for InMemoryIdentity {
    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let guard = self.profiles.lock().expect("profile mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }
}
