// ABOUTME: Tunables shared by the demuxer and the chunked JSON decoder.
// ABOUTME: Built from config::Config or defaulted.

use super::content_type::RAW_STREAM;
use super::frame::DEFAULT_MAX_FRAME_SIZE;

/// Default size of each opportunistic read from a JSON body (8 KiB).
pub const DEFAULT_READ_SIZE: usize = 8 * 1024;

/// Decoding options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Content type treated as the raw multiplexed stream marker.
    pub raw_stream_content_type: String,
    /// Largest frame payload accepted by the demuxer.
    pub max_frame_size: u32,
    /// Bytes requested per read by the chunked JSON decoder.
    pub read_size: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            raw_stream_content_type: RAW_STREAM.to_string(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_size: DEFAULT_READ_SIZE,
        }
    }
}
