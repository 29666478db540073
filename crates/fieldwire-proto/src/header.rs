//! Fixed 5-byte frame header.

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, byteorder::little_endian::U16,
};

use crate::{FrameType, ProtocolError, Result};

/// Frame header as it appears on the wire.
///
/// The layout is verified at compile time, so conversion to and from bytes is
/// a plain copy with no hand-written offset arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FrameHeader {
    marker: [u8; 2],
    frame_type: u8,
    body_len: U16,
}

impl FrameHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 5;

    /// Marker that opens every frame.
    pub const MARKER: [u8; 2] = [0xAA, 0x55];

    /// Largest body the 16-bit length field can describe.
    pub const MAX_BODY_LEN: usize = u16::MAX as usize;

    /// Build a header for a body of `body_len` bytes.
    pub fn new(frame_type: FrameType, body_len: usize) -> Result<Self> {
        Self::with_raw_type(frame_type.to_u8(), body_len)
    }

    /// Build a header with an arbitrary type tag.
    ///
    /// Used by tests and fuzzing to produce frames the dispatcher does not
    /// recognize.
    pub fn with_raw_type(frame_type: u8, body_len: usize) -> Result<Self> {
        let len = u16::try_from(body_len).map_err(|_| ProtocolError::BodyTooLarge {
            size: body_len,
            max: Self::MAX_BODY_LEN,
        })?;

        Ok(Self { marker: Self::MARKER, frame_type, body_len: U16::new(len) })
    }

    /// Parse a header, rejecting anything that does not start with the marker.
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Result<Self> {
        check_marker([bytes[0], bytes[1]])?;

        Self::read_from_bytes(bytes.as_slice())
            .map_err(|_| ProtocolError::Truncated { needed: Self::SIZE, available: bytes.len() })
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Raw type tag.
    pub fn raw_type(&self) -> u8 {
        self.frame_type
    }

    /// Type tag, if it names a known frame type.
    pub fn frame_type(&self) -> Option<FrameType> {
        FrameType::from_u8(self.frame_type)
    }

    /// Declared body length.
    pub fn body_len(&self) -> usize {
        usize::from(self.body_len.get())
    }
}

/// Compare the first two stream bytes against [`FrameHeader::MARKER`].
///
/// Callers read the marker on its own first so a bad stream is rejected
/// before any further bytes are consumed.
pub fn check_marker(found: [u8; 2]) -> Result<()> {
    if found == FrameHeader::MARKER {
        Ok(())
    } else {
        Err(ProtocolError::InvalidMarker { expected: FrameHeader::MARKER, found })
    }
}
