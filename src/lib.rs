//! # Flight Scorer Library
//!
//! Score simulator flights from a live telemetry stream.
//!
//! The engine keeps a session open with the simulation host, decodes the
//! once-per-second telemetry record, tracks takeoff and touchdown, applies
//! penalties for procedure violations, and reports a graded summary when the
//! aircraft is parked after a flight.

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod flight;
pub mod host;
pub mod link;
pub mod notify;
pub mod telemetry;
