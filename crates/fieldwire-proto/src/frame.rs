//! Complete protocol frame (header + body).

use bytes::Bytes;

use crate::{FrameHeader, FrameType, ProtocolError, Result, header::check_marker};

/// One protocol message: a header and the body it describes.
///
/// The header's length field is always derived from the body, so a `Frame`
/// can never be constructed with a mismatched length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header
    pub header: FrameHeader,
    /// Frame body
    pub body: Bytes,
}

impl Frame {
    /// Create a frame of a known type.
    ///
    /// Fails with [`ProtocolError::BodyTooLarge`] if the body exceeds 65535
    /// bytes.
    pub fn new(frame_type: FrameType, body: impl Into<Bytes>) -> Result<Self> {
        let body = body.into();
        let header = FrameHeader::new(frame_type, body.len())?;
        Ok(Self { header, body })
    }

    /// Create a frame with an arbitrary type tag.
    pub fn with_raw_type(frame_type: u8, body: impl Into<Bytes>) -> Result<Self> {
        let body = body.into();
        let header = FrameHeader::with_raw_type(frame_type, body.len())?;
        Ok(Self { header, body })
    }

    /// Total encoded size.
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.body.len()
    }

    /// Append the wire encoding of this frame to `dst`.
    pub fn encode(&self, dst: &mut Vec<u8>) {
        dst.reserve(self.encoded_len());
        dst.extend_from_slice(&self.header.to_bytes());
        dst.extend_from_slice(&self.body);
    }

    /// Wire encoding of this frame as a fresh buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }

    /// Decode one frame from the front of `buf`.
    ///
    /// Returns the frame and the number of bytes consumed. The marker is
    /// checked before anything else, so garbage input fails fast even if it
    /// is shorter than a header.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 2 {
            return Err(ProtocolError::Truncated { needed: 2, available: buf.len() });
        }
        check_marker([buf[0], buf[1]])?;

        let Some(header_bytes) = buf.first_chunk::<{ FrameHeader::SIZE }>() else {
            return Err(ProtocolError::Truncated { needed: FrameHeader::SIZE, available: buf.len() });
        };
        let header = FrameHeader::from_bytes(header_bytes)?;

        let total = FrameHeader::SIZE + header.body_len();
        if buf.len() < total {
            return Err(ProtocolError::Truncated { needed: total, available: buf.len() });
        }

        let body = Bytes::copy_from_slice(&buf[FrameHeader::SIZE..total]);
        Ok((Self { header, body }, total))
    }

    /// Type tag, if known.
    pub fn frame_type(&self) -> Option<FrameType> {
        self.header.frame_type()
    }
}
