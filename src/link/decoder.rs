//! # Host Link Decoder
//!
//! Splits the inbound byte stream into CRC-checked frames and decodes the
//! host -> client messages carried in them.

use bytes::{Buf, BytesMut};
use tracing::debug;

use super::crc::frame_crc;
use super::protocol::*;
use crate::error::{Result, ScorerError};

/// Decode one complete frame
///
/// # Arguments
///
/// * `frame` - Complete frame bytes (sync, length, type, payload, crc)
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short
/// - Sync byte is incorrect
/// - Length field is out of range
/// - CRC check fails
pub fn decode_frame(frame: &[u8]) -> Result<LinkFrame> {
    if frame.len() < LINK_MIN_FRAME_SIZE {
        return Err(ScorerError::LinkProtocol("Frame too short".to_string()));
    }

    if frame[0] != LINK_SYNC_BYTE {
        return Err(ScorerError::LinkProtocol(format!("Invalid sync byte: 0x{:02X}", frame[0])));
    }

    let length = u16::from_le_bytes([frame[1], frame[2]]) as usize;
    if length < 2 || length - 2 > LINK_MAX_PAYLOAD_SIZE {
        return Err(ScorerError::LinkProtocol(format!("Invalid length field: {}", length)));
    }

    let total = LINK_HEADER_SIZE + length;
    if frame.len() < total {
        return Err(ScorerError::LinkProtocol(format!(
            "Frame too short: expected {} bytes, got {}",
            total,
            frame.len()
        )));
    }

    let received_crc = frame[total - 1];
    let calculated_crc = frame_crc(&frame[1..total - 1]);
    if calculated_crc != received_crc {
        return Err(ScorerError::LinkProtocol(format!(
            "CRC mismatch: expected 0x{:02X}, got 0x{:02X}",
            calculated_crc, received_crc
        )));
    }

    LinkFrame::new(frame[3], frame[4..total - 1].to_vec())
}

/// Pull the next valid frame off the front of a receive buffer
///
/// Garbage before a sync byte and frames that fail their CRC are discarded,
/// resynchronising on the following sync byte. Returns `None` when the buffer
/// does not yet hold a complete frame; the partial bytes stay in `buf`.
pub fn next_frame(buf: &mut BytesMut) -> Option<LinkFrame> {
    loop {
        match buf.iter().position(|&b| b == LINK_SYNC_BYTE) {
            Some(0) => {}
            Some(skip) => {
                debug!("Discarding {} bytes before sync", skip);
                buf.advance(skip);
            }
            None => {
                buf.clear();
                return None;
            }
        }

        if buf.len() < LINK_HEADER_SIZE {
            return None;
        }

        let length = u16::from_le_bytes([buf[1], buf[2]]) as usize;
        if length < 2 || length - 2 > LINK_MAX_PAYLOAD_SIZE {
            buf.advance(1);
            continue;
        }

        let total = LINK_HEADER_SIZE + length;
        if buf.len() < total {
            return None;
        }

        match decode_frame(&buf[..total]) {
            Ok(frame) => {
                buf.advance(total);
                return Some(frame);
            }
            Err(e) => {
                debug!("Dropping corrupt frame: {}", e);
                buf.advance(1);
            }
        }
    }
}

/// Decode a host -> client message from a frame
///
/// # Errors
///
/// Returns error for unknown frame types or truncated payloads
pub fn decode_host_message(frame: &LinkFrame) -> Result<HostMessage> {
    let mut payload = frame.payload.clone();

    match frame.frame_type {
        FRAME_OPEN_ACK => Ok(HostMessage::OpenAck { host_name: get_str8(&mut payload)? }),
        FRAME_EXCEPTION => {
            ensure_remaining(&payload, 4, "exception")?;
            Ok(HostMessage::Exception { code: payload.get_u32_le() })
        }
        FRAME_QUIT => Ok(HostMessage::Quit),
        FRAME_SIM_OBJECT_DATA => {
            ensure_remaining(&payload, 8, "sim object data")?;
            let request_id = payload.get_u32_le();
            let define_id = payload.get_u32_le();
            Ok(HostMessage::SimObjectData { request_id, define_id, data: payload })
        }
        other => Err(ScorerError::LinkProtocol(format!("Unknown frame type: 0x{:02X}", other))),
    }
}

fn ensure_remaining(buf: &impl Buf, needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(ScorerError::LinkProtocol(format!(
            "{} payload too short: {} bytes",
            what,
            buf.remaining()
        )));
    }
    Ok(())
}

fn get_str8(buf: &mut impl Buf) -> Result<String> {
    ensure_remaining(&*buf, 1, "string")?;
    let len = buf.get_u8() as usize;
    ensure_remaining(&*buf, len, "string")?;
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ScorerError::LinkProtocol(format!("Invalid UTF-8 in string field: {}", e)))
}
