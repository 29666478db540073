//! Frame type tags.

use crate::ProtocolError;

/// Type tag carried in byte 2 of every frame header.
///
/// Only [`FrameType::Telemetry`] has defined behavior in this protocol
/// version. The other tags are reserved so future message kinds can be added
/// to a server's dispatch table without renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Signed and encrypted telemetry report from a device
    Telemetry = 0x01,
    /// Reserved for device key exchange
    KeyExchange = 0x02,
    /// Reserved for connectivity tests
    Test = 0x03,
}

impl FrameType {
    /// All frame types known to this protocol version.
    pub const ALL: [Self; 3] = [Self::Telemetry, Self::KeyExchange, Self::Test];

    /// Wire value of this tag.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag, returning `None` for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Telemetry),
            0x02 => Some(Self::KeyExchange),
            0x03 => Some(Self::Test),
            _ => None,
        }
    }
}

impl TryFrom<u8> for FrameType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(ProtocolError::UnknownFrameType(value))
    }
}

impl From<FrameType> for u8 {
    fn from(frame_type: FrameType) -> Self {
        frame_type.to_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_wire_values() {
        assert_eq!(FrameType::Telemetry.to_u8(), 0x01);
        assert_eq!(FrameType::KeyExchange.to_u8(), 0x02);
        assert_eq!(FrameType::Test.to_u8(), 0x03);

        for frame_type in FrameType::ALL {
            assert_eq!(FrameType::from_u8(frame_type.to_u8()), Some(frame_type));
        }
    }

    #[test]
    fn unknown_tags_rejected() {
        for tag in [0x00, 0x04, 0x7f, 0xff] {
            assert!(matches!(FrameType::try_from(tag), Err(ProtocolError::UnknownFrameType(t)) if t == tag));
        }
    }
}
