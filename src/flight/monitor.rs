//! Flight monitor and penalty engine.
//!
//! [`FlightMonitor::process`] is the per-sample pipeline:
//!
//! 1. phase detection (takeoff / touchdown, liftoff confirmation)
//! 2. new-flight reset, when a report was already emitted
//! 3. airborne monitoring: distance, maxima, policy penalties
//! 4. completion report, when parked after a confirmed liftoff
//!
//! A sample is validated before step 1, so a rejected sample leaves every
//! accumulator exactly as it was.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::phase::{FlightPhase, PhaseDetector, PhaseEvent};
use super::report::ReportBuilder;
use super::session::FlightSession;
use crate::config::{ScoringConfig, MAX_COOLDOWN_S};
use crate::error::Result;
use crate::notify::{Notification, PenaltyApplied, TouchdownReport};
use crate::telemetry::TelemetrySample;

/// One scoring rule's message and cost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Penalty {
    pub message: String,
    pub points: u32,
}

/// The configured policy checks
#[derive(Debug, Clone)]
pub struct PenaltyPolicy {
    config: ScoringConfig,
    landing_lights: Penalty,
    gear_up: Penalty,
    excessive_bank: Penalty,
}

impl PenaltyPolicy {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            landing_lights: Penalty {
                message: format!(
                    "Landing Lights OFF below {}ft",
                    group_thousands(config.lights_ceiling_ft)
                ),
                points: config.lights_penalty,
            },
            gear_up: Penalty {
                message: format!(
                    "Landing Gear UP below {}ft (Approach)",
                    group_thousands(config.gear_check_altitude_ft)
                ),
                points: config.gear_penalty,
            },
            excessive_bank: Penalty {
                message: format!("Excessive Bank Angle (> {}°)", config.max_bank_deg),
                points: config.bank_penalty,
            },
            config: config.clone(),
        }
    }

    /// Every rule the sample currently violates, in check order
    pub fn violations(&self, sample: &TelemetrySample) -> Vec<&Penalty> {
        let c = &self.config;
        let mut hits = Vec::new();

        if !sample.landing_lights
            && sample.altitude > f64::from(c.lights_floor_ft)
            && sample.altitude < f64::from(c.lights_ceiling_ft)
        {
            hits.push(&self.landing_lights);
        }

        if !sample.gear_down
            && sample.altitude < f64::from(c.gear_check_altitude_ft)
            && sample.vertical_speed < c.gear_check_vs_fpm
        {
            hits.push(&self.gear_up);
        }

        if sample.bank_angle.abs() > f64::from(c.max_bank_deg) {
            hits.push(&self.excessive_bank);
        }

        hits
    }
}

/// 10000 -> "10,000"
fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Owns the flight session and runs the per-sample pipeline.
#[derive(Debug, Clone)]
pub struct FlightMonitor {
    detector: PhaseDetector,
    session: FlightSession,
    policy: PenaltyPolicy,
    reports: ReportBuilder,
    cooldown: Duration,
    glitch_threshold_nm: f64,
}

impl FlightMonitor {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            detector: PhaseDetector::new(config.airborne_ground_speed_kt),
            session: FlightSession::new(),
            policy: PenaltyPolicy::new(config),
            reports: ReportBuilder::new(config),
            cooldown: Duration::seconds(config.cooldown_s.min(MAX_COOLDOWN_S) as i64),
            glitch_threshold_nm: config.glitch_threshold_nm,
        }
    }

    pub fn session(&self) -> &FlightSession {
        &self.session
    }

    pub fn phase(&self) -> FlightPhase {
        self.detector.phase()
    }

    pub fn ever_airborne(&self) -> bool {
        self.detector.ever_airborne()
    }

    /// Forget the last ground state; the next airborne sample reads as a takeoff.
    pub fn reseed_ground(&mut self) {
        self.detector.reseed_ground();
    }

    /// Run one sample through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSample` without touching any state when the sample
    /// fails validation.
    pub fn process(
        &mut self,
        sample: &TelemetrySample,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>> {
        sample.validate()?;
        let mut out = Vec::new();

        match self.detector.update(sample) {
            Some(PhaseEvent::Takeoff) => {
                info!("Takeoff at {:.4}, {:.4}", sample.latitude, sample.longitude);
            }
            Some(PhaseEvent::Touchdown { rate_fpm }) => {
                info!("Touchdown at {:.0} fpm", rate_fpm);
                out.push(Notification::TouchdownReport(TouchdownReport {
                    rate_fpm,
                    location_text: format!("{:.4}, {:.4}", sample.latitude, sample.longitude),
                    timestamp: now,
                }));
            }
            None => {}
        }

        if self.reports.should_reset(sample, &self.session) {
            self.session = FlightSession::new();
            self.detector.reset_flight();
            info!("New flight started, session reset");
            out.push(Notification::FlightStarted);
        }

        if self.detector.phase() == FlightPhase::Airborne {
            self.monitor_airborne(sample, now, &mut out);
        }

        if self.reports.should_complete(sample, &self.session, self.detector.ever_airborne()) {
            let report = self.reports.complete(&mut self.session, sample, now);
            info!(
                "Flight completed: score {} ({}), {} NM, {} events",
                report.score,
                report.grade,
                report.distance_flown_nm,
                report.events.len()
            );
            out.push(Notification::FlightCompleted(report));
        }

        Ok(out)
    }

    fn monitor_airborne(
        &mut self,
        sample: &TelemetrySample,
        now: DateTime<Utc>,
        out: &mut Vec<Notification>,
    ) {
        let had_fix = self.session.last_fix().is_some();
        if self.session.record_fix(sample.latitude, sample.longitude, self.glitch_threshold_nm).is_none()
            && had_fix
        {
            debug!("Position jump ignored for distance at {:.4}, {:.4}", sample.latitude, sample.longitude);
        }

        self.session.track_maxima(sample.bank_angle, sample.g_load);

        for penalty in self.policy.violations(sample) {
            let logged = self
                .session
                .log_penalty(&penalty.message, penalty.points, now, self.cooldown)
                .is_some();
            if logged {
                info!("Penalty: {} (-{})", penalty.message, penalty.points);
                out.push(Notification::PenaltyApplied(PenaltyApplied {
                    message: penalty.message.clone(),
                    points: penalty.points,
                    total_score: self.session.score(),
                }));
            }
        }
    }
}
