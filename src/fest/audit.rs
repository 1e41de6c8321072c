use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::UserId;
use super::roles::Actor;

/// Machine tags for auditable registration mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RegistrationCreated,
    RegistrationStatusUpdated,
    RegistrationDeleted,
}

impl AuditAction {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::RegistrationCreated => "registration_created",
            Self::RegistrationStatusUpdated => "registration_status_updated",
            Self::RegistrationDeleted => "registration_deleted",
        }
    }
}

/// One line of the append-only activity trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub actor: Option<UserId>,
    pub action: AuditAction,
    pub details: Value,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl ActivityLogEntry {
    pub fn record(actor: &Actor, action: AuditAction, details: Value) -> Self {
        Self {
            actor: Some(actor.user_id.clone()),
            action,
            details,
            recorded_at: Utc::now(),
            origin: actor.origin.clone(),
        }
    }
}
