use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::domain::EventCategory;

/// Festival-wide runtime switches. Read through a [`SettingsSource`] on
/// every decision so an operator flip takes effect without a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FestSettings {
    pub max_on_stage_registrations: u32,
    pub max_off_stage_registrations: u32,
    pub registration_open: bool,
    pub scoreboard_visible: bool,
    pub auto_approve_registrations: bool,
}

impl FestSettings {
    /// The stance taken when settings cannot be read: zero quotas,
    /// registrations closed, scoreboard hidden.
    pub const fn fail_closed() -> Self {
        Self {
            max_on_stage_registrations: 0,
            max_off_stage_registrations: 0,
            registration_open: false,
            scoreboard_visible: false,
            auto_approve_registrations: false,
        }
    }

    pub const fn limit_for(&self, category: EventCategory) -> u32 {
        match category {
            EventCategory::OnStage => self.max_on_stage_registrations,
            EventCategory::OffStage => self.max_off_stage_registrations,
        }
    }
}

impl Default for FestSettings {
    fn default() -> Self {
        Self::fail_closed()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings source unavailable: {0}")]
    Unavailable(String),
}

/// Live settings lookup. Implementations must tolerate being polled on
/// every engine decision.
pub trait SettingsSource: Send + Sync {
    fn load(&self) -> Result<FestSettings, SettingsError>;
}

/// Mutex-guarded settings holder for servers, demos, and tests.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    inner: Mutex<FestSettings>,
}

impl InMemorySettings {
    pub fn new(settings: FestSettings) -> Self {
        Self {
            inner: Mutex::new(settings),
        }
    }

    pub fn replace(&self, settings: FestSettings) {
        *self.inner.lock().expect("settings mutex poisoned") = settings;
    }
}

impl SettingsSource for InMemorySettings {
    fn load(&self) -> Result<FestSettings, SettingsError> {
        Ok(*self.inner.lock().expect("settings mutex poisoned"))
    }
}
