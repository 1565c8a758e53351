//! # Host Link Encoder
//!
//! Builds the client -> host frames used while opening a session and
//! subscribing to telemetry.

use bytes::{BufMut, Bytes, BytesMut};

use super::crc::frame_crc;
use super::protocol::*;
use crate::error::{Result, ScorerError};

/// Serialize a frame to wire bytes
///
/// # Examples
///
/// ```
/// use flight_scorer::link::encoder::encode_frame;
/// use flight_scorer::link::protocol::{LinkFrame, FRAME_QUIT, LINK_SYNC_BYTE};
///
/// let frame = LinkFrame::new(FRAME_QUIT, Vec::new()).unwrap();
/// let bytes = encode_frame(&frame);
/// assert_eq!(bytes[0], LINK_SYNC_BYTE);
/// assert_eq!(bytes.len(), 5);
/// ```
pub fn encode_frame(frame: &LinkFrame) -> Bytes {
    let mut out = BytesMut::with_capacity(LINK_MIN_FRAME_SIZE + frame.payload.len());
    out.put_u8(LINK_SYNC_BYTE);
    out.put_u16_le(frame.length());
    out.put_u8(frame.frame_type);
    out.extend_from_slice(&frame.payload);

    let crc = frame_crc(&out[1..]);
    out.put_u8(crc);

    out.freeze()
}

/// `OPEN`: protocol version + application name
pub fn encode_open(app_name: &str, protocol_version: u32) -> Result<Bytes> {
    let mut payload = BytesMut::new();
    payload.put_u32_le(protocol_version);
    put_str8(&mut payload, app_name)?;
    Ok(encode_frame(&LinkFrame::new(FRAME_OPEN, payload.freeze())?))
}

/// `ADD_TO_DATA_DEFINITION`: definition id, wire type, variable name, unit
pub fn encode_add_to_data_definition(define_id: u32, field: &DataField) -> Result<Bytes> {
    let mut payload = BytesMut::new();
    payload.put_u32_le(define_id);
    payload.put_u8(field.data_type.code());
    put_str8(&mut payload, field.name)?;
    put_str8(&mut payload, field.unit)?;
    Ok(encode_frame(&LinkFrame::new(FRAME_ADD_TO_DATA_DEFINITION, payload.freeze())?))
}

/// `REQUEST_DATA`: request id, definition id, target object, period
pub fn encode_request_data(
    request_id: u32,
    define_id: u32,
    object: SimObject,
    period: Period,
) -> Result<Bytes> {
    let mut payload = BytesMut::with_capacity(13);
    payload.put_u32_le(request_id);
    payload.put_u32_le(define_id);
    payload.put_u32_le(object.id());
    payload.put_u8(period.code());
    Ok(encode_frame(&LinkFrame::new(FRAME_REQUEST_DATA, payload.freeze())?))
}

/// Length-prefixed (u8) UTF-8 string
pub(crate) fn put_str8(buf: &mut BytesMut, value: &str) -> Result<()> {
    let len = u8::try_from(value.len()).map_err(|_| {
        ScorerError::LinkProtocol(format!("String too long for link field: {} bytes", value.len()))
    })?;
    buf.put_u8(len);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let frame = LinkFrame::new(FRAME_EXCEPTION, vec![0x07, 0x00, 0x00, 0x00]).unwrap();
        let bytes = encode_frame(&frame);

        assert_eq!(bytes.len(), LINK_MIN_FRAME_SIZE + 4);
        assert_eq!(bytes[0], LINK_SYNC_BYTE);
        assert_eq!(u16::from_le_bytes([bytes[1], bytes[2]]), 6);
        assert_eq!(bytes[3], FRAME_EXCEPTION);
        assert_eq!(&bytes[4..8], &[0x07, 0x00, 0x00, 0x00]);
        assert_eq!(bytes[8], frame_crc(&bytes[1..8]));
    }

    #[test]
    fn test_encode_open() {
        let bytes = encode_open("Scorer", 4).unwrap();

        assert_eq!(bytes[3], FRAME_OPEN);
        assert_eq!(&bytes[4..8], &4u32.to_le_bytes());
        assert_eq!(bytes[8], 6);
        assert_eq!(&bytes[9..15], b"Scorer");
    }

    #[test]
    fn test_encode_add_to_data_definition() {
        let field = DataField { name: "GEAR HANDLE POSITION", unit: "bool", data_type: DataType::Int32 };
        let bytes = encode_add_to_data_definition(1, &field).unwrap();

        assert_eq!(bytes[3], FRAME_ADD_TO_DATA_DEFINITION);
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(bytes[8], DataType::Int32.code());
        assert_eq!(bytes[9] as usize, field.name.len());
        let unit_at = 10 + field.name.len();
        assert_eq!(bytes[unit_at], 4);
        assert_eq!(&bytes[unit_at + 1..unit_at + 5], b"bool");
    }

    #[test]
    fn test_encode_request_data() {
        let bytes = encode_request_data(7, 1, SimObject::User, Period::Second).unwrap();

        assert_eq!(bytes.len(), LINK_MIN_FRAME_SIZE + 13);
        assert_eq!(&bytes[4..8], &7u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &0u32.to_le_bytes());
        assert_eq!(bytes[16], Period::Second.code());
    }

    #[test]
    fn test_oversized_name_rejected() {
        let name = "X".repeat(300);
        assert!(encode_open(&name, 4).is_err());
    }
}
