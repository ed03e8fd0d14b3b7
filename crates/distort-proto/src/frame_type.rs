/// One-byte frame type tag (spec §6.1). Hex values are part of the
/// compatibility contract and must not be renumbered.
///
/// Two distinct wire types are both named `REQ_DISTORT` in the spec's
/// prose: the Client->Worker metadata handshake (0x03) and the
/// Client->Registry primary lookup (0x10). They're given different Rust
/// names here (`Metadata` / `ReqDistort`) since conflating them would make
/// every match on `FrameType` ambiguous about which dialogue it's in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    ConnClient = 0x01,
    ConnWorker = 0x02,
    Metadata = 0x03,
    MetaOut = 0x04,
    Data = 0x05,
    Md5Check = 0x06,
    Disconnect = 0x07,
    AssignPrimary = 0x08,
    Err = 0x09,
    ReqDistort = 0x10,
    ReqReconnect = 0x11,
    Ack = 0x12,
}

impl FrameType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x01 => FrameType::ConnClient,
            0x02 => FrameType::ConnWorker,
            0x03 => FrameType::Metadata,
            0x04 => FrameType::MetaOut,
            0x05 => FrameType::Data,
            0x06 => FrameType::Md5Check,
            0x07 => FrameType::Disconnect,
            0x08 => FrameType::AssignPrimary,
            0x09 => FrameType::Err,
            0x10 => FrameType::ReqDistort,
            0x11 => FrameType::ReqReconnect,
            0x12 => FrameType::Ack,
            other => return Err(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_type() {
        let all = [
            FrameType::ConnClient,
            FrameType::ConnWorker,
            FrameType::Metadata,
            FrameType::MetaOut,
            FrameType::Data,
            FrameType::Md5Check,
            FrameType::Disconnect,
            FrameType::AssignPrimary,
            FrameType::Err,
            FrameType::ReqDistort,
            FrameType::ReqReconnect,
            FrameType::Ack,
        ];
        for t in all {
            assert_eq!(FrameType::try_from(t.as_u8()), Ok(t));
        }
    }

    #[test]
    fn rejects_unknown_byte() {
        assert_eq!(FrameType::try_from(0xFF), Err(0xFF));
    }
}
