// ABOUTME: Response body decoding: multiplexed frames and chunked JSON.
// ABOUTME: Pull-based sessions over tokio byte sources and hyper bodies.

mod body;
mod content_type;
mod demux;
mod error;
mod format;
mod frame;
mod json;
mod options;

pub use body::BodyReader;
pub use content_type::{ContentType, JSON, RAW_STREAM};
pub use demux::{ChunkBody, DecodedChunk, DemuxError, StreamDemuxer};
pub use error::{DecodeError, DecodeErrorKind};
pub use format::{BodyItem, ResponseBody, ResponseFormat};
pub use frame::{
    DEFAULT_MAX_FRAME_SIZE, Frame, FrameDecoder, FrameError, FrameHeader, HEADER_SIZE, StreamId,
};
pub use json::{ChunkedJsonDecoder, JsonStreamError};
pub use options::{DEFAULT_READ_SIZE, DecodeOptions};
