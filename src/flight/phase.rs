//! Flight phase detection.
//!
//! Two independent signals come out of the sample stream:
//!
//! ```text
//! raw ground/air:   Grounded --(!on_ground)--> Airborne --(on_ground)--> Grounded
//!                              Takeoff                     Touchdown
//!
//! ever airborne:    set on the first sample with !on_ground AND GS > 50 kt
//! ```
//!
//! The raw transition feeds touchdown reports and gates the in-flight
//! monitor. The stricter "ever airborne" flag gates session completion, so a
//! taxi hop that never reaches flying speed is not scored as a flight.

use std::collections::VecDeque;
use std::fmt;

use crate::telemetry::TelemetrySample;

/// Number of vertical-speed readings kept for touchdown rate selection
pub const VS_BUFFER_LEN: usize = 5;

/// Raw ground/air state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightPhase {
    #[default]
    Grounded,
    Airborne,
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightPhase::Grounded => write!(f, "grounded"),
            FlightPhase::Airborne => write!(f, "airborne"),
        }
    }
}

/// A raw ground/air transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseEvent {
    Takeoff,
    /// `rate_fpm` is the landing rate, negative when descending
    Touchdown { rate_fpm: f64 },
}

/// Ground/air state machine over the sample stream.
#[derive(Debug, Clone)]
pub struct PhaseDetector {
    was_on_ground: bool,
    ever_airborne: bool,
    vs_buffer: VecDeque<f64>,
    airborne_ground_speed_kt: f64,
}

impl PhaseDetector {
    pub fn new(airborne_ground_speed_kt: f64) -> Self {
        Self {
            was_on_ground: true,
            ever_airborne: false,
            vs_buffer: VecDeque::with_capacity(VS_BUFFER_LEN),
            airborne_ground_speed_kt,
        }
    }

    /// Current raw phase
    pub fn phase(&self) -> FlightPhase {
        if self.was_on_ground {
            FlightPhase::Grounded
        } else {
            FlightPhase::Airborne
        }
    }

    /// Whether this session has seen a confirmed liftoff
    pub fn ever_airborne(&self) -> bool {
        self.ever_airborne
    }

    /// Buffered vertical speeds, oldest first
    pub fn vertical_speeds(&self) -> impl Iterator<Item = f64> + '_ {
        self.vs_buffer.iter().copied()
    }

    /// Feed one sample, returning the raw transition it caused, if any.
    pub fn update(&mut self, sample: &TelemetrySample) -> Option<PhaseEvent> {
        let event = match (self.was_on_ground, sample.on_ground) {
            (true, false) => Some(PhaseEvent::Takeoff),
            (false, true) => {
                let rate_fpm = self.landing_rate(sample);
                self.vs_buffer.clear();
                Some(PhaseEvent::Touchdown { rate_fpm })
            }
            _ => None,
        };

        if !sample.on_ground {
            if self.vs_buffer.len() == VS_BUFFER_LEN {
                self.vs_buffer.pop_front();
            }
            self.vs_buffer.push_back(sample.vertical_speed);

            if sample.ground_speed > self.airborne_ground_speed_kt {
                self.ever_airborne = true;
            }
        }

        self.was_on_ground = sample.on_ground;
        event
    }

    /// Most recent airborne reading. The touchdown sample's own VS is often
    /// already flattened by ground contact, so it is only the fallback.
    fn landing_rate(&self, touchdown: &TelemetrySample) -> f64 {
        match self.vs_buffer.back() {
            Some(&vs) => vs,
            None if touchdown.vertical_speed.is_finite() => touchdown.vertical_speed,
            None => 0.0,
        }
    }

    /// Assume the aircraft is on the ground again (used after a disconnect).
    pub fn reseed_ground(&mut self) {
        self.was_on_ground = true;
    }

    /// Clear the liftoff latch ahead of a new flight.
    ///
    /// The VS buffer is left alone: it is emptied at every touchdown, so
    /// anything in it already belongs to the new flight.
    pub fn reset_flight(&mut self) {
        self.ever_airborne = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(on_ground: bool, ground_speed: f64, vertical_speed: f64) -> TelemetrySample {
        TelemetrySample { on_ground, ground_speed, vertical_speed, ..Default::default() }
    }

    #[test]
    fn test_initial_state() {
        let detector = PhaseDetector::new(50.0);
        assert_eq!(detector.phase(), FlightPhase::Grounded);
        assert!(!detector.ever_airborne());
    }

    #[test]
    fn test_takeoff_and_touchdown() {
        let mut detector = PhaseDetector::new(50.0);

        assert_eq!(detector.update(&sample(true, 20.0, 0.0)), None);
        assert_eq!(detector.update(&sample(false, 120.0, 800.0)), Some(PhaseEvent::Takeoff));
        assert_eq!(detector.phase(), FlightPhase::Airborne);
        assert_eq!(detector.update(&sample(false, 130.0, 900.0)), None);

        let event = detector.update(&sample(true, 110.0, -20.0));
        assert_eq!(event, Some(PhaseEvent::Touchdown { rate_fpm: 900.0 }));
        assert_eq!(detector.phase(), FlightPhase::Grounded);
    }

    #[test]
    fn test_touchdown_uses_last_buffered_rate() {
        let mut detector = PhaseDetector::new(50.0);
        for vs in [-200.0, -150.0, -300.0] {
            detector.update(&sample(false, 130.0, vs));
        }

        let event = detector.update(&sample(true, 120.0, -50.0));
        assert_eq!(event, Some(PhaseEvent::Touchdown { rate_fpm: -300.0 }));
        assert_eq!(detector.vertical_speeds().count(), 0);
    }

    #[test]
    fn test_touchdown_with_empty_buffer_falls_back_to_sample() {
        let mut detector = PhaseDetector::new(50.0);
        detector.update(&sample(false, 130.0, -400.0));
        detector.vs_buffer.clear();

        let event = detector.update(&sample(true, 120.0, -75.0));
        assert_eq!(event, Some(PhaseEvent::Touchdown { rate_fpm: -75.0 }));
    }

    #[test]
    fn test_buffer_keeps_last_five() {
        let mut detector = PhaseDetector::new(50.0);
        for vs in 1..=8 {
            detector.update(&sample(false, 130.0, vs as f64));
        }
        let buffered: Vec<f64> = detector.vertical_speeds().collect();
        assert_eq!(buffered, vec![4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_ground_samples_do_not_fill_buffer() {
        let mut detector = PhaseDetector::new(50.0);
        detector.update(&sample(true, 10.0, 5.0));
        assert_eq!(detector.vertical_speeds().count(), 0);
    }

    #[test]
    fn test_ever_airborne_needs_flying_speed() {
        let mut detector = PhaseDetector::new(50.0);

        // Airborne by the raw flag, but too slow
        detector.update(&sample(false, 40.0, 0.0));
        assert_eq!(detector.phase(), FlightPhase::Airborne);
        assert!(!detector.ever_airborne());

        // Exactly at the threshold does not count
        detector.update(&sample(false, 50.0, 0.0));
        assert!(!detector.ever_airborne());

        detector.update(&sample(false, 51.0, 0.0));
        assert!(detector.ever_airborne());
    }

    #[test]
    fn test_fast_taxi_does_not_confirm_liftoff() {
        let mut detector = PhaseDetector::new(50.0);
        detector.update(&sample(true, 55.0, 0.0));
        assert!(!detector.ever_airborne());
    }

    #[test]
    fn test_reseed_after_disconnect() {
        let mut detector = PhaseDetector::new(50.0);
        detector.update(&sample(false, 200.0, 0.0));
        detector.reseed_ground();

        assert_eq!(detector.phase(), FlightPhase::Grounded);
        // Still airborne after reconnecting, so the first sample reads as a takeoff
        assert_eq!(detector.update(&sample(false, 200.0, 0.0)), Some(PhaseEvent::Takeoff));
        assert!(detector.ever_airborne());
    }

    #[test]
    fn test_reset_flight() {
        let mut detector = PhaseDetector::new(50.0);
        detector.update(&sample(false, 200.0, -100.0));
        detector.reset_flight();

        assert!(!detector.ever_airborne());
        assert_eq!(detector.phase(), FlightPhase::Airborne);
        let buffered: Vec<f64> = detector.vertical_speeds().collect();
        assert_eq!(buffered, vec![-100.0]);

        let event = detector.update(&sample(true, 90.0, -10.0));
        assert_eq!(event, Some(PhaseEvent::Touchdown { rate_fpm: -100.0 }));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(FlightPhase::Grounded.to_string(), "grounded");
        assert_eq!(FlightPhase::Airborne.to_string(), "airborne");
    }
}
