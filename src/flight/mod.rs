//! # Flight Module
//!
//! Turns validated telemetry samples into flight events: phase transitions,
//! policy penalties with per-message cooldown, distance and maxima, and the
//! end-of-flight report.

pub mod geo;
pub mod monitor;
pub mod phase;
pub mod report;
pub mod session;

pub use monitor::FlightMonitor;
pub use phase::FlightPhase;
pub use report::FlightReport;
pub use session::{FlightSession, Grade};
