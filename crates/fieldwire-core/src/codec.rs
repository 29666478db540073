//! Async frame codec.
//!
//! Reads are built from `read_exact`, so a stream that delivers a frame in
//! arbitrarily small pieces decodes the same as one that delivers it whole.

use bytes::BytesMut;
use fieldwire_proto::{Frame, FrameHeader, ProtocolError, header::check_marker};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read exactly one frame.
///
/// The two marker bytes are read and checked on their own, so a stream that
/// does not start with the marker is rejected before anything else is
/// consumed. A stream that closes mid-frame yields [`ProtocolError::Io`]
/// with kind `UnexpectedEof`.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header_bytes = [0u8; FrameHeader::SIZE];

    reader.read_exact(&mut header_bytes[..2]).await?;
    check_marker([header_bytes[0], header_bytes[1]])?;

    reader.read_exact(&mut header_bytes[2..]).await?;
    let header = FrameHeader::from_bytes(&header_bytes)?;

    let mut body = BytesMut::zeroed(header.body_len());
    reader.read_exact(&mut body).await?;

    Ok(Frame { header, body: body.freeze() })
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.to_vec()).await?;
    writer.flush().await?;
    Ok(())
}
