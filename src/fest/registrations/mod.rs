//! Registration intake, lifecycle, and the HTTP surface exposing them.

pub mod eligibility;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use eligibility::{quota_check, QuotaCheck, QuotaUsage};
pub use router::registry_router;
pub use service::{RegistrationError, RegistrationService};
