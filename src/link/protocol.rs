//! # Host Link Protocol Constants and Types
//!
//! Core definitions for the framed link between the scorer and the simulator
//! bridge.
//!
//! ```text
//! +------+------------+------+-----------+-----+
//! | sync | length u16 | type | payload   | crc |
//! | 0xA5 |  LE        |      | N bytes   |     |
//! +------+------------+------+-----------+-----+
//! ```
//!
//! `length` counts type + payload + crc. The CRC covers the two length bytes,
//! the type and the payload. All multi-byte integers and floats are
//! little-endian.

use bytes::Bytes;

use crate::error::{Result, ScorerError};

/// Frame sync byte
pub const LINK_SYNC_BYTE: u8 = 0xA5;

/// sync(1) + length(2)
pub const LINK_HEADER_SIZE: usize = 3;

/// Smallest legal frame: header + type + crc
pub const LINK_MIN_FRAME_SIZE: usize = LINK_HEADER_SIZE + 2;

/// Maximum payload carried by a single frame
pub const LINK_MAX_PAYLOAD_SIZE: usize = 1024;

// Client -> host
pub const FRAME_OPEN: u8 = 0x01;
pub const FRAME_ADD_TO_DATA_DEFINITION: u8 = 0x02;
pub const FRAME_REQUEST_DATA: u8 = 0x03;

// Host -> client
pub const FRAME_OPEN_ACK: u8 = 0x81;
pub const FRAME_EXCEPTION: u8 = 0x82;
pub const FRAME_QUIT: u8 = 0x83;
pub const FRAME_SIM_OBJECT_DATA: u8 = 0x84;

/// Wire type of one field in a data definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 8-byte IEEE-754 float
    Float64,
    /// 4-byte signed integer, used for booleans
    Int32,
}

impl DataType {
    pub fn code(self) -> u8 {
        match self {
            DataType::Float64 => 4,
            DataType::Int32 => 1,
        }
    }

    /// Encoded size of one value of this type
    pub const fn size(self) -> usize {
        match self {
            DataType::Float64 => 8,
            DataType::Int32 => 4,
        }
    }
}

/// One named simulator variable in a data definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataField {
    pub name: &'static str,
    pub unit: &'static str,
    pub data_type: DataType,
}

/// Which simulation object a data request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimObject {
    /// The user-controlled aircraft
    User,
}

impl SimObject {
    pub fn id(self) -> u32 {
        match self {
            SimObject::User => 0,
        }
    }
}

/// How often the host pushes a subscribed data definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Once,
    VisualFrame,
    SimFrame,
    Second,
}

impl Period {
    pub fn code(self) -> u8 {
        match self {
            Period::Once => 1,
            Period::VisualFrame => 2,
            Period::SimFrame => 3,
            Period::Second => 4,
        }
    }
}

/// One raw link frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    pub frame_type: u8,
    pub payload: Bytes,
}

impl LinkFrame {
    /// Create a new frame
    ///
    /// # Errors
    ///
    /// Returns error if the payload exceeds [`LINK_MAX_PAYLOAD_SIZE`]
    pub fn new(frame_type: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > LINK_MAX_PAYLOAD_SIZE {
            return Err(ScorerError::LinkProtocol(format!(
                "Payload size {} exceeds maximum {}",
                payload.len(),
                LINK_MAX_PAYLOAD_SIZE
            )));
        }

        Ok(Self { frame_type, payload })
    }

    /// Value of the length field (type + payload + crc)
    pub fn length(&self) -> u16 {
        (1 + self.payload.len() + 1) as u16
    }
}

/// A decoded host -> client message
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    OpenAck { host_name: String },
    Exception { code: u32 },
    Quit,
    SimObjectData { request_id: u32, define_id: u32, data: Bytes },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_length() {
        let frame = LinkFrame::new(FRAME_QUIT, Bytes::new()).unwrap();
        assert_eq!(frame.length(), 2);

        let frame = LinkFrame::new(FRAME_SIM_OBJECT_DATA, vec![0u8; 108]).unwrap();
        assert_eq!(frame.length(), 110);
    }

    #[test]
    fn test_frame_payload_limit() {
        assert!(LinkFrame::new(FRAME_OPEN, vec![0u8; LINK_MAX_PAYLOAD_SIZE]).is_ok());
        assert!(LinkFrame::new(FRAME_OPEN, vec![0u8; LINK_MAX_PAYLOAD_SIZE + 1]).is_err());
    }

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::Float64.size(), 8);
        assert_eq!(DataType::Int32.size(), 4);
        assert_ne!(DataType::Float64.code(), DataType::Int32.code());
    }

    #[test]
    fn test_request_targets() {
        assert_eq!(SimObject::User.id(), 0);
        assert_eq!(Period::Second.code(), 4);
    }
}
