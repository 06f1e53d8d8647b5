// ABOUTME: Unified decode error with SNAFU pattern.
// ABOUTME: Wraps demux and JSON stream errors for programmatic handling.

use snafu::Snafu;

use super::demux::DemuxError;
use super::frame::FrameError;
use super::json::JsonStreamError;

/// Unified error for response body decoding.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DecodeError {
    #[snafu(display("multiplexed stream decode failed: {source}"))]
    Demux { source: DemuxError },

    #[snafu(display("JSON stream decode failed: {source}"))]
    JsonStream { source: JsonStreamError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Source ended inside a frame header.
    TruncatedHeader,
    /// Source ended inside a frame payload.
    TruncatedPayload,
    /// Frame length above the configured limit.
    PayloadTooLarge,
    /// A JSON value failed to parse.
    JsonSyntax,
    /// Source ended inside a JSON value.
    TruncatedStream,
    /// The byte source failed.
    Io,
}

impl DecodeError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            DecodeError::Demux { source } => match source {
                DemuxError::Frame(FrameError::TruncatedHeader { .. }) => {
                    DecodeErrorKind::TruncatedHeader
                }
                DemuxError::Frame(FrameError::TruncatedPayload { .. }) => {
                    DecodeErrorKind::TruncatedPayload
                }
                DemuxError::Frame(FrameError::PayloadTooLarge { .. }) => {
                    DecodeErrorKind::PayloadTooLarge
                }
                DemuxError::Frame(FrameError::Io(_)) => DecodeErrorKind::Io,
                DemuxError::Json { .. } => DecodeErrorKind::JsonSyntax,
            },
            DecodeError::JsonStream { source } => match source {
                JsonStreamError::Io(_) => DecodeErrorKind::Io,
                JsonStreamError::Syntax(_) => DecodeErrorKind::JsonSyntax,
                JsonStreamError::TruncatedStream { .. } => DecodeErrorKind::TruncatedStream,
            },
        }
    }

    /// Whether the session that produced this error has ended.
    pub fn is_fatal(&self) -> bool {
        match self {
            DecodeError::Demux { source } => source.is_fatal(),
            DecodeError::JsonStream { .. } => true,
        }
    }
}

impl From<DemuxError> for DecodeError {
    fn from(source: DemuxError) -> Self {
        DecodeError::Demux { source }
    }
}

impl From<JsonStreamError> for DecodeError {
    fn from(source: JsonStreamError) -> Self {
        DecodeError::JsonStream { source }
    }
}
