//! Conveyor Core - Shared failure vocabulary
//!
//! Producers describe why a stream stopped with a [`Fault`]. Domain-level
//! failures that a consumer may want to inspect are expressed as an
//! [`Anomaly`], which carries machine-readable [`AnomalyData`] next to its
//! message.

pub mod anomaly;
pub mod error;

pub use anomaly::{Anomaly, AnomalyData, Primitive};
pub use error::Fault;
