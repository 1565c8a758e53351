//! # Host Link Module
//!
//! Framing for the TCP link between the scorer and the simulator bridge.
//!
//! This module handles:
//! - Frame layout and message type constants
//! - Encoding session-open and subscription requests
//! - Splitting the inbound stream into CRC-checked frames
//! - Decoding host messages (open ack, exceptions, quit, sim object data)

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
