use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::frame_type::FrameType;

/// Total wire size of one frame (spec §6.2).
pub const FRAME_SIZE: usize = 256;
/// Size of the `data` field.
pub const DATA_SIZE: usize = 244;

const TYPE_OFFSET: usize = 0;
const LEN_OFFSET: usize = 1;
const DATA_OFFSET: usize = 3;
const CHECKSUM_OFFSET: usize = 247;
const TIMESTAMP_OFFSET: usize = 249;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown frame type byte {0:#04x}")]
    UnknownType(u8),
    #[error("data_length {0} exceeds the {DATA_SIZE}-byte data field")]
    DataTooLong(u16),
    #[error("checksum mismatch: wire={wire:#06x} computed={computed:#06x}")]
    ChecksumMismatch { wire: u16, computed: u16 },
}

/// One 256-byte fixed-size frame (spec §3, §6.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub data_length: u16,
    pub data: [u8; DATA_SIZE],
    pub checksum: u16,
    pub timestamp: u32,
}

impl Frame {
    /// Build a frame carrying `payload`, truncated to `DATA_SIZE` if
    /// necessary, zero-padded otherwise. Checksum and timestamp are
    /// computed here, at construction, matching the source's "computed on
    /// send after all other fields are populated" rule (spec §4.1).
    pub fn new(frame_type: FrameType, payload: &[u8]) -> Self {
        let mut data = [0u8; DATA_SIZE];
        let len = payload.len().min(DATA_SIZE);
        data[..len].copy_from_slice(&payload[..len]);
        let timestamp = now_epoch_secs();
        let checksum = compute_checksum(frame_type.as_u8(), len as u16, &data, timestamp);
        Self { frame_type, data_length: len as u16, data, checksum, timestamp }
    }

    /// Build an empty frame of the given type (used for `ACK`, `ERR`,
    /// `ASSIGN_PRIMARY`, and OK replies whose payload is empty).
    pub fn empty(frame_type: FrameType) -> Self {
        Self::new(frame_type, &[])
    }

    /// Meaningful payload bytes: `data[..data_length]`.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.data_length as usize]
    }

    /// Serialise to the 256-byte wire representation.
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        buf[TYPE_OFFSET] = self.frame_type.as_u8();
        buf[LEN_OFFSET..LEN_OFFSET + 2].copy_from_slice(&self.data_length.to_be_bytes());
        buf[DATA_OFFSET..DATA_OFFSET + DATA_SIZE].copy_from_slice(&self.data);
        buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&self.checksum.to_be_bytes());
        buf[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4].copy_from_slice(&self.timestamp.to_be_bytes());
        buf
    }

    /// Deserialise and validate a 256-byte wire buffer.
    pub fn decode(buf: &[u8; FRAME_SIZE]) -> Result<Self, CodecError> {
        let frame_type =
            FrameType::try_from(buf[TYPE_OFFSET]).map_err(CodecError::UnknownType)?;
        let data_length =
            u16::from_be_bytes([buf[LEN_OFFSET], buf[LEN_OFFSET + 1]]);
        if data_length as usize > DATA_SIZE {
            return Err(CodecError::DataTooLong(data_length));
        }
        let mut data = [0u8; DATA_SIZE];
        data.copy_from_slice(&buf[DATA_OFFSET..DATA_OFFSET + DATA_SIZE]);
        let checksum = u16::from_be_bytes([buf[CHECKSUM_OFFSET], buf[CHECKSUM_OFFSET + 1]]);
        let timestamp = u32::from_be_bytes([
            buf[TIMESTAMP_OFFSET],
            buf[TIMESTAMP_OFFSET + 1],
            buf[TIMESTAMP_OFFSET + 2],
            buf[TIMESTAMP_OFFSET + 3],
        ]);

        let computed = compute_checksum(frame_type.as_u8(), data_length, &data, timestamp);
        if computed != checksum {
            return Err(CodecError::ChecksumMismatch { wire: checksum, computed });
        }

        Ok(Self { frame_type, data_length, data, checksum, timestamp })
    }
}

/// `sum(type, data_length, each data byte, low16(ts), high16(ts)) mod 2^16`
/// (spec §3). Sums over the full zero-padded `data` array, not just the
/// meaningful `data_length` prefix — matching the reference implementation.
fn compute_checksum(frame_type: u8, data_length: u16, data: &[u8; DATA_SIZE], timestamp: u32) -> u16 {
    let mut sum: u32 = 0;
    sum += u32::from(frame_type);
    sum += u32::from(data_length);
    for &b in data {
        sum += u32::from(b);
    }
    sum += timestamp & 0xFFFF;
    sum += (timestamp >> 16) & 0xFFFF;
    (sum % 65536) as u16
}

fn now_epoch_secs() -> u32 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_encode_decode() {
        let frame = Frame::new(FrameType::Data, b"hello world");
        let wire = frame.encode();
        let decoded = Frame::decode(&wire).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn every_encoded_frame_is_256_bytes() {
        let frame = Frame::new(FrameType::ConnClient, b"alice&127.0.0.1&9000");
        assert_eq!(frame.encode().len(), FRAME_SIZE);
    }

    #[test]
    fn truncates_oversized_payload_to_data_size() {
        let payload = vec![7u8; DATA_SIZE + 50];
        let frame = Frame::new(FrameType::Data, &payload);
        assert_eq!(frame.data_length as usize, DATA_SIZE);
    }

    #[test]
    fn detects_checksum_corruption() {
        let frame = Frame::new(FrameType::Ack, &[]);
        let mut wire = frame.encode();
        wire[10] ^= 0xFF;
        let err = Frame::decode(&wire).unwrap_err();
        assert!(matches!(err, CodecError::ChecksumMismatch { .. }));
    }

    #[test]
    fn rejects_unknown_type_byte() {
        let frame = Frame::new(FrameType::Ack, &[]);
        let mut wire = frame.encode();
        wire[0] = 0xFE;
        assert_eq!(Frame::decode(&wire), Err(CodecError::UnknownType(0xFE)));
    }

    #[test]
    fn checksum_property_random_frames() {
        use rand::Rng;
        let mut rng = rand::rng();
        for _ in 0..200 {
            let len = rng.random_range(0..=DATA_SIZE);
            let payload: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            let frame = Frame::new(FrameType::Data, &payload);
            let wire = frame.encode();
            let decoded = Frame::decode(&wire).expect("valid frame must decode");
            assert_eq!(decoded.checksum, frame.checksum);
        }
    }
}
