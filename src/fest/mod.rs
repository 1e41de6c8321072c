//! The festival registration engine: roles, eligibility, lifecycle,
//! visibility, analytics, and standings.

pub mod audit;
pub mod domain;
pub mod memory;
pub mod registrations;
pub mod report;
pub mod roles;
pub mod scope;
pub mod settings;
pub mod store;
