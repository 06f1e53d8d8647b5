// ABOUTME: Multiplexed frame wire format and the frame decoder.
// ABOUTME: 8-byte header (stream id, 3 reserved, u32 BE length) plus payload.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Default upper bound for a single frame payload (64 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Channel a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    Stdin,
    Stdout,
    Stderr,
    /// Any id other than 0, 1 or 2. Tagged through rather than rejected.
    Unknown(u8),
}

impl StreamId {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => StreamId::Stdin,
            1 => StreamId::Stdout,
            2 => StreamId::Stderr,
            other => StreamId::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            StreamId::Stdin => 0,
            StreamId::Stdout => 1,
            StreamId::Stderr => 2,
            StreamId::Unknown(other) => other,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, StreamId::Unknown(_))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamId::Stdin => write!(f, "stdin"),
            StreamId::Stdout => write!(f, "stdout"),
            StreamId::Stderr => write!(f, "stderr"),
            StreamId::Unknown(id) => write!(f, "unknown({})", id),
        }
    }
}

/// Errors while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("stream ended inside a frame header ({read} of 8 bytes)")]
    TruncatedHeader { read: usize },

    #[error("stream ended inside a frame payload ({read} of {expected} bytes)")]
    TruncatedPayload { expected: u32, read: usize },

    #[error("frame payload of {length} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge { length: u64, max: u32 },

    #[error("I/O error reading frame: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub stream: StreamId,
    pub length: u32,
}

impl FrameHeader {
    /// Parse a header. Reserved bytes are ignored.
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            stream: StreamId::from_byte(bytes[0]),
            length: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Encode a header with zeroed reserved bytes.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let len = self.length.to_be_bytes();
        [
            self.stream.as_byte(),
            0,
            0,
            0,
            len[0],
            len[1],
            len[2],
            len[3],
        ]
    }
}

/// One length-prefixed unit of multiplexed stream data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    stream: StreamId,
    payload: Bytes,
}

impl Frame {
    pub fn new(stream: StreamId, payload: impl Into<Bytes>) -> Self {
        Self {
            stream,
            payload: payload.into(),
        }
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Payload length as carried in the header.
    pub fn length(&self) -> usize {
        self.payload.len()
    }

    /// Append the encoded frame (header and payload) to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<(), FrameError> {
        let length =
            u32::try_from(self.payload.len()).map_err(|_| FrameError::PayloadTooLarge {
                length: self.payload.len() as u64,
                max: u32::MAX,
            })?;
        let header = FrameHeader {
            stream: self.stream,
            length,
        };
        dst.reserve(HEADER_SIZE + self.payload.len());
        dst.put_slice(&header.encode());
        dst.put_slice(&self.payload);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Bytes, FrameError> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Reads frames one at a time from a byte source.
///
/// Holds no buffered state between calls: every call consumes exactly one
/// header and one payload, so the source is always left at a frame boundary
/// after a successful read.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    max_frame_size: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the source is exhausted exactly at a frame
    /// boundary.
    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<Option<Frame>, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        let mut header_bytes = [0u8; HEADER_SIZE];
        let read = read_up_to(reader, &mut header_bytes).await?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(FrameError::TruncatedHeader { read });
        }

        let header = FrameHeader::parse(&header_bytes);
        if let StreamId::Unknown(id) = header.stream {
            tracing::warn!(stream_id = id, "unknown stream id in frame header");
        }
        if header.length > self.max_frame_size {
            return Err(FrameError::PayloadTooLarge {
                length: u64::from(header.length),
                max: self.max_frame_size,
            });
        }

        let mut payload = BytesMut::zeroed(header.length as usize);
        let read = read_up_to(reader, &mut payload).await?;
        if read < payload.len() {
            return Err(FrameError::TruncatedPayload {
                expected: header.length,
                read,
            });
        }

        tracing::trace!(stream = %header.stream, length = header.length, "decoded frame");
        Ok(Some(Frame::new(header.stream, payload.freeze())))
    }
}

/// Fill `buf` from `reader`, stopping early only at end-of-stream.
async fn read_up_to<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
