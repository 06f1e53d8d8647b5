// ABOUTME: Pull-based demultiplexer for raw multiplexed engine streams.
// ABOUTME: Turns frames into text, JSON or byte chunks tagged by stream.

use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use tokio::io::AsyncRead;

use super::content_type::ContentType;
use super::frame::{Frame, FrameDecoder, FrameError, StreamId};
use super::options::DecodeOptions;

/// A frame payload interpreted per the response content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkBody {
    Text(String),
    Json(Value),
    Bytes(Bytes),
}

/// One demultiplexed chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChunk {
    pub stream: StreamId,
    pub body: ChunkBody,
}

impl DecodedChunk {
    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            ChunkBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match &self.body {
            ChunkBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.body {
            ChunkBody::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Errors from the demuxer.
#[derive(Debug, thiserror::Error)]
pub enum DemuxError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("{stream} frame is not valid JSON: {source}")]
    Json {
        stream: StreamId,
        #[source]
        source: serde_json::Error,
    },
}

impl DemuxError {
    /// Framing errors end the session; per-chunk JSON errors do not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DemuxError::Frame(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Exhausted,
    Failed,
}

/// Single-pass demultiplexing session over one response body.
///
/// Each pull reads exactly one frame; nothing is read ahead. After the source
/// is exhausted or a framing error is reported, every further pull returns
/// `None`.
pub struct StreamDemuxer<R> {
    reader: R,
    decoder: FrameDecoder,
    content_type: ContentType,
    state: State,
    frames: u64,
}

impl<R> StreamDemuxer<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, content_type: ContentType) -> Self {
        Self::with_options(reader, content_type, &DecodeOptions::default())
    }

    pub fn with_options(reader: R, content_type: ContentType, opts: &DecodeOptions) -> Self {
        Self {
            reader,
            decoder: FrameDecoder::with_max_frame_size(opts.max_frame_size),
            content_type,
            state: State::Open,
            frames: 0,
        }
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Whether the session has ended (cleanly or not).
    pub fn is_finished(&self) -> bool {
        self.state != State::Open
    }

    /// Number of frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames
    }

    /// Pull the next chunk.
    pub async fn next_chunk(&mut self) -> Option<Result<DecodedChunk, DemuxError>> {
        if self.state != State::Open {
            return None;
        }

        match self.decoder.read_frame(&mut self.reader).await {
            Ok(Some(frame)) => {
                self.frames += 1;
                Some(self.interpret(frame))
            }
            Ok(None) => {
                self.state = State::Exhausted;
                tracing::debug!(frames = self.frames, "multiplexed stream ended");
                None
            }
            Err(e) => {
                self.state = State::Failed;
                tracing::debug!(frames = self.frames, error = %e, "multiplexed stream aborted");
                Some(Err(e.into()))
            }
        }
    }

    fn interpret(&self, frame: Frame) -> Result<DecodedChunk, DemuxError> {
        let stream = frame.stream();
        let payload = frame.into_payload();
        let body = match &self.content_type {
            ContentType::RawStream => {
                ChunkBody::Text(String::from_utf8_lossy(&payload).into_owned())
            }
            ContentType::Json => match serde_json::from_slice(&payload) {
                Ok(value) => ChunkBody::Json(value),
                Err(source) => {
                    tracing::warn!(%stream, error = %source, "frame payload is not valid JSON");
                    return Err(DemuxError::Json { stream, source });
                }
            },
            ContentType::Other(_) => ChunkBody::Bytes(payload),
        };
        Ok(DecodedChunk { stream, body })
    }

    /// Collect every remaining chunk, stopping at the first error.
    pub async fn collect_chunks(mut self) -> Result<Vec<DecodedChunk>, DemuxError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            chunks.push(chunk?);
        }
        Ok(chunks)
    }

    /// Give back the byte source.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Adapt the session into a `Stream`.
    pub fn into_stream(self) -> impl Stream<Item = Result<DecodedChunk, DemuxError>> {
        futures::stream::unfold(self, |mut demuxer| async move {
            demuxer
                .next_chunk()
                .await
                .map(|item| (item, demuxer))
        })
    }
}
