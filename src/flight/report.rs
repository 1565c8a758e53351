//! Session report builder.
//!
//! Decides when a flight is finished (parked after a confirmed liftoff) and
//! when a new one begins (flying speed off the ground after a report), and
//! assembles the completion report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::session::{FlightSession, Grade, PenaltyEvent, INITIAL_SCORE};
use crate::config::ScoringConfig;
use crate::telemetry::TelemetrySample;

/// Placeholder logged when a flight finishes without any penalties
pub const PERFECT_FLIGHT_MESSAGE: &str = "Perfect Flight";

/// Peak values seen in flight
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightStats {
    pub max_bank: f64,
    pub max_g: f64,
}

/// Final summary of one flight
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightReport {
    pub timestamp: DateTime<Utc>,
    pub fuel_remaining: f64,
    pub score: u32,
    pub grade: Grade,
    pub events: Vec<PenaltyEvent>,
    #[serde(rename = "distanceFlownNM")]
    pub distance_flown_nm: f64,
    pub stats: FlightStats,
}

/// Completion and reset rules over the session.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    parked_ground_speed_kt: f64,
    airborne_ground_speed_kt: f64,
}

impl ReportBuilder {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            parked_ground_speed_kt: config.parked_ground_speed_kt,
            airborne_ground_speed_kt: config.airborne_ground_speed_kt,
        }
    }

    /// Stopped on the ground with the engine off or the parking brake set
    pub fn is_parked(&self, sample: &TelemetrySample) -> bool {
        sample.on_ground
            && sample.ground_speed < self.parked_ground_speed_kt
            && (!sample.engine_running || sample.parking_brake)
    }

    /// Parked, after a confirmed liftoff, with no report emitted yet
    pub fn should_complete(
        &self,
        sample: &TelemetrySample,
        session: &FlightSession,
        ever_airborne: bool,
    ) -> bool {
        ever_airborne && !session.completion_notified() && self.is_parked(sample)
    }

    /// Flying speed off the ground after a report was emitted
    pub fn should_reset(&self, sample: &TelemetrySample, session: &FlightSession) -> bool {
        session.completion_notified()
            && !sample.on_ground
            && sample.ground_speed > self.airborne_ground_speed_kt
    }

    /// Close out the session and build its report.
    pub fn complete(
        &self,
        session: &mut FlightSession,
        sample: &TelemetrySample,
        now: DateTime<Utc>,
    ) -> FlightReport {
        if session.events().is_empty() && session.score() == INITIAL_SCORE {
            session.log_note(PERFECT_FLIGHT_MESSAGE, now);
        }

        let report = FlightReport {
            timestamp: now,
            fuel_remaining: sample.fuel_quantity,
            score: session.score(),
            grade: Grade::from_score(session.score()),
            events: session.events().to_vec(),
            distance_flown_nm: session.total_distance_nm().round(),
            stats: FlightStats { max_bank: session.max_bank(), max_g: session.max_g() },
        };

        session.mark_completed();
        report
    }
}
