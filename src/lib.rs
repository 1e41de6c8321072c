//! Registration and eligibility engine for multi-event festival operations.

pub mod config;
pub mod error;
pub mod fest;
pub mod telemetry;
