//! Shared types, errors, and audit plumbing for the debate bot.

pub mod audit;
pub mod error;
pub mod types;

pub use audit::{AuditEntry, AuditSink, STAGE_CROSS_EXAMINATION, STAGE_RECOMMENDATION};
pub use error::Error;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
