//! Per-flight accumulators: score, penalty log, distance and maxima.
//!
//! A [`FlightSession`] is a plain value. Starting a new flight replaces it
//! with [`FlightSession::new`] rather than clearing fields one by one.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::geo::haversine_nm;

/// Score every flight starts with
pub const INITIAL_SCORE: u32 = 100;

/// One entry in the flight's event log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub points: u32,
}

/// Letter grade derived from the final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        match score {
            95.. => Grade::APlus,
            90..=94 => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(s)
    }
}

/// Where the session is in its report cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Collecting; a report will be produced on the next completed flight
    #[default]
    Armed,
    /// Report already emitted; waiting for the next takeoff
    Completed,
}

/// Mutable accumulator for one logical flight.
#[derive(Debug, Clone)]
pub struct FlightSession {
    total_distance_nm: f64,
    last_fix: Option<(f64, f64)>,
    max_bank: f64,
    max_g: f64,
    event_log: Vec<PenaltyEvent>,
    score: u32,
    state: SessionState,
    last_fired: HashMap<String, DateTime<Utc>>,
}

impl Default for FlightSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightSession {
    pub fn new() -> Self {
        Self {
            total_distance_nm: 0.0,
            last_fix: None,
            max_bank: 0.0,
            max_g: 0.0,
            event_log: Vec::new(),
            score: INITIAL_SCORE,
            state: SessionState::Armed,
            last_fired: HashMap::new(),
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn events(&self) -> &[PenaltyEvent] {
        &self.event_log
    }

    pub fn total_distance_nm(&self) -> f64 {
        self.total_distance_nm
    }

    pub fn last_fix(&self) -> Option<(f64, f64)> {
        self.last_fix
    }

    pub fn max_bank(&self) -> f64 {
        self.max_bank
    }

    pub fn max_g(&self) -> f64 {
        self.max_g
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn completion_notified(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Advance the stored fix, adding the leg to the total when it is
    /// shorter than `glitch_threshold_nm`.
    ///
    /// Returns the leg that was added, if any. The stored fix moves to the
    /// new position even when the leg is rejected.
    pub fn record_fix(&mut self, lat: f64, lon: f64, glitch_threshold_nm: f64) -> Option<f64> {
        let added = self.last_fix.and_then(|(prev_lat, prev_lon)| {
            let leg = haversine_nm(prev_lat, prev_lon, lat, lon);
            (leg < glitch_threshold_nm).then_some(leg)
        });

        if let Some(leg) = added {
            self.total_distance_nm += leg;
        }
        self.last_fix = Some((lat, lon));
        added
    }

    pub fn track_maxima(&mut self, bank_angle: f64, g_load: f64) {
        self.max_bank = self.max_bank.max(bank_angle.abs());
        self.max_g = self.max_g.max(g_load.abs());
    }

    /// Log a penalty unless the same message fired within `cooldown`.
    ///
    /// Returns the logged event, or `None` when suppressed.
    pub fn log_penalty(
        &mut self,
        message: &str,
        points: u32,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Option<&PenaltyEvent> {
        if let Some(&last) = self.last_fired.get(message) {
            if now - last < cooldown {
                return None;
            }
        }

        self.last_fired.insert(message.to_string(), now);
        self.score = self.score.saturating_sub(points);
        self.event_log.push(PenaltyEvent { timestamp: now, message: message.to_string(), points });
        self.event_log.last()
    }

    /// Append a zero-point entry, bypassing the cooldown map.
    pub fn log_note(&mut self, message: &str, now: DateTime<Utc>) {
        self.event_log.push(PenaltyEvent { timestamp: now, message: message.to_string(), points: 0 });
    }

    pub fn mark_completed(&mut self) {
        self.state = SessionState::Completed;
    }
}
