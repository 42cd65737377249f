//! Observability: logging initialization and the audit log.

pub mod audit;
pub mod logging;

pub use audit::{AuditEvent, AuditLog};
pub use logging::{LogFormat, init_logging, verbosity_to_directive};
