//! # Telemetry Module
//!
//! The subscribed data definition and the decoder that turns one raw
//! sim-object record into a [`TelemetrySample`].
//!
//! The record layout is fixed by [`TELEMETRY_FIELDS`]: the same list, in the
//! same order, is registered with the host at connect time and walked here
//! when decoding. 8-byte fields are little-endian `f64`; 4-byte fields are
//! little-endian `i32` flags where any non-zero value means `true`.

use bytes::Buf;
use serde::Serialize;

use crate::error::{Result, ScorerError};
use crate::link::protocol::{DataField, DataType};

/// Definition id used when registering [`TELEMETRY_FIELDS`]
pub const TELEMETRY_DEFINITION_ID: u32 = 1;

/// Request id of the once-per-second user aircraft subscription
pub const TELEMETRY_REQUEST_ID: u32 = 1;

const fn float(name: &'static str, unit: &'static str) -> DataField {
    DataField { name, unit, data_type: DataType::Float64 }
}

const fn flag(name: &'static str) -> DataField {
    DataField { name, unit: "bool", data_type: DataType::Int32 }
}

/// Ordered data definition for the telemetry subscription
pub const TELEMETRY_FIELDS: [DataField; 15] = [
    float("PLANE LATITUDE", "degrees"),
    float("PLANE LONGITUDE", "degrees"),
    float("PLANE ALTITUDE", "feet"),
    float("PLANE HEADING DEGREES TRUE", "degrees"),
    float("AIRSPEED INDICATED", "knots"),
    float("GROUND VELOCITY", "knots"),
    float("VERTICAL SPEED", "feet per minute"),
    flag("SIM ON GROUND"),
    flag("GENERAL ENG COMBUSTION:1"),
    flag("BRAKE PARKING POSITION"),
    float("FUEL TOTAL QUANTITY", "gallons"),
    float("PLANE BANK DEGREES", "degrees"),
    float("G FORCE", "GForce"),
    flag("LIGHT LANDING"),
    flag("GEAR HANDLE POSITION"),
];

/// Encoded size of one telemetry record
pub const TELEMETRY_RECORD_SIZE: usize = record_size();

const fn record_size() -> usize {
    let mut size = 0;
    let mut i = 0;
    while i < TELEMETRY_FIELDS.len() {
        size += TELEMETRY_FIELDS[i].data_type.size();
        i += 1;
    }
    size
}

/// One decoded observation of the user aircraft
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    /// Degrees, north positive
    pub latitude: f64,
    /// Degrees, east positive
    pub longitude: f64,
    /// Feet MSL
    pub altitude: f64,
    /// True heading in degrees
    pub heading: f64,
    /// Knots
    pub indicated_airspeed: f64,
    /// Knots
    pub ground_speed: f64,
    /// Feet per minute, climb positive
    pub vertical_speed: f64,
    pub on_ground: bool,
    pub engine_running: bool,
    pub parking_brake: bool,
    /// Gallons
    pub fuel_quantity: f64,
    /// Degrees, signed
    pub bank_angle: f64,
    /// Normal load factor in G
    pub g_load: f64,
    pub landing_lights: bool,
    pub gear_down: bool,
}

impl TelemetrySample {
    /// Check that every value is usable by the flight monitor
    ///
    /// # Errors
    ///
    /// Returns `InvalidSample` for non-finite numbers or coordinates outside
    /// the globe.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("latitude", self.latitude),
            ("longitude", self.longitude),
            ("altitude", self.altitude),
            ("heading", self.heading),
            ("indicated_airspeed", self.indicated_airspeed),
            ("ground_speed", self.ground_speed),
            ("vertical_speed", self.vertical_speed),
            ("fuel_quantity", self.fuel_quantity),
            ("bank_angle", self.bank_angle),
            ("g_load", self.g_load),
        ] {
            if !value.is_finite() {
                return Err(ScorerError::InvalidSample(format!("{} is not finite", name)));
            }
        }

        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ScorerError::InvalidSample(format!(
                "position out of range: {}, {}",
                self.latitude, self.longitude
            )));
        }

        Ok(())
    }

    /// Encode in [`TELEMETRY_FIELDS`] order, as the host sends it
    #[cfg(test)]
    pub(crate) fn encode_record(&self) -> bytes::Bytes {
        use bytes::BufMut;

        let mut out = bytes::BytesMut::with_capacity(TELEMETRY_RECORD_SIZE);
        out.put_f64_le(self.latitude);
        out.put_f64_le(self.longitude);
        out.put_f64_le(self.altitude);
        out.put_f64_le(self.heading);
        out.put_f64_le(self.indicated_airspeed);
        out.put_f64_le(self.ground_speed);
        out.put_f64_le(self.vertical_speed);
        out.put_i32_le(self.on_ground as i32);
        out.put_i32_le(self.engine_running as i32);
        out.put_i32_le(self.parking_brake as i32);
        out.put_f64_le(self.fuel_quantity);
        out.put_f64_le(self.bank_angle);
        out.put_f64_le(self.g_load);
        out.put_i32_le(self.landing_lights as i32);
        out.put_i32_le(self.gear_down as i32);
        out.freeze()
    }
}

/// Decode one sim-object record
///
/// # Arguments
///
/// * `record` - Raw record bytes laid out per [`TELEMETRY_FIELDS`]
///
/// # Errors
///
/// Returns `Decode` if the record is shorter than [`TELEMETRY_RECORD_SIZE`]
/// or carries values that fail [`TelemetrySample::validate`]. Trailing bytes
/// beyond the definition are ignored.
pub fn decode_sample(mut record: &[u8]) -> Result<TelemetrySample> {
    if record.len() < TELEMETRY_RECORD_SIZE {
        return Err(ScorerError::Decode(format!(
            "record too short: expected {} bytes, got {}",
            TELEMETRY_RECORD_SIZE,
            record.len()
        )));
    }

    let sample = TelemetrySample {
        latitude: record.get_f64_le(),
        longitude: record.get_f64_le(),
        altitude: record.get_f64_le(),
        heading: record.get_f64_le(),
        indicated_airspeed: record.get_f64_le(),
        ground_speed: record.get_f64_le(),
        vertical_speed: record.get_f64_le(),
        on_ground: record.get_i32_le() != 0,
        engine_running: record.get_i32_le() != 0,
        parking_brake: record.get_i32_le() != 0,
        fuel_quantity: record.get_f64_le(),
        bank_angle: record.get_f64_le(),
        g_load: record.get_f64_le(),
        landing_lights: record.get_i32_le() != 0,
        gear_down: record.get_i32_le() != 0,
    };

    sample.validate().map_err(|e| ScorerError::Decode(e.to_string()))?;
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cruise_sample() -> TelemetrySample {
        TelemetrySample {
            latitude: 47.4502,
            longitude: -122.3088,
            altitude: 15000.0,
            heading: 270.0,
            indicated_airspeed: 250.0,
            ground_speed: 310.0,
            vertical_speed: -500.0,
            on_ground: false,
            engine_running: true,
            parking_brake: false,
            fuel_quantity: 812.5,
            bank_angle: -12.5,
            g_load: 1.05,
            landing_lights: true,
            gear_down: false,
        }
    }

    #[test]
    fn test_record_size() {
        // 10 floats + 5 flags
        assert_eq!(TELEMETRY_RECORD_SIZE, 10 * 8 + 5 * 4);
    }

    #[test]
    fn test_field_order() {
        let names: Vec<_> = TELEMETRY_FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(names[0], "PLANE LATITUDE");
        assert_eq!(names[6], "VERTICAL SPEED");
        assert_eq!(names[7], "SIM ON GROUND");
        assert_eq!(names[14], "GEAR HANDLE POSITION");
        assert_eq!(TELEMETRY_FIELDS[7].data_type, DataType::Int32);
        assert_eq!(TELEMETRY_FIELDS[10].data_type, DataType::Float64);
    }

    #[test]
    fn test_decode_sample() {
        let sample = cruise_sample();
        let decoded = decode_sample(&sample.encode_record()).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn test_decode_flag_nonzero_is_true() {
        let mut record = TelemetrySample::default().encode_record().to_vec();
        // SIM ON GROUND sits right after the seven leading floats
        record[56..60].copy_from_slice(&(-1i32).to_le_bytes());

        let decoded = decode_sample(&record).unwrap();
        assert!(decoded.on_ground);
        assert!(!decoded.engine_running);
    }

    #[test]
    fn test_decode_short_record() {
        let record = cruise_sample().encode_record();
        let result = decode_sample(&record[..TELEMETRY_RECORD_SIZE - 1]);
        assert!(matches!(result, Err(ScorerError::Decode(_))));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut record = cruise_sample().encode_record().to_vec();
        record.extend_from_slice(&[0u8; 4]);
        assert!(decode_sample(&record).is_ok());
    }

    #[test]
    fn test_decode_rejects_nan() {
        let mut sample = cruise_sample();
        sample.altitude = f64::NAN;
        let result = decode_sample(&sample.encode_record());
        assert!(matches!(result, Err(ScorerError::Decode(_))));
    }

    #[test]
    fn test_validate_position_range() {
        let mut sample = cruise_sample();
        sample.latitude = 91.0;
        assert!(sample.validate().is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(cruise_sample()).unwrap();
        assert_eq!(json["groundSpeed"], 310.0);
        assert_eq!(json["onGround"], false);
        assert_eq!(json["gLoad"], 1.05);
    }
}
