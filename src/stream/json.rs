// ABOUTME: Incremental decoder for concatenated JSON values in a body.
// ABOUTME: Buffers partial values across chunk boundaries until they parse.

use bytes::{Buf, BufMut, BytesMut};
use futures::Stream;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::options::DecodeOptions;

/// Errors from the JSON stream decoder.
#[derive(Debug, thiserror::Error)]
pub enum JsonStreamError {
    #[error("I/O error reading JSON stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON body: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("stream ended with {buffered} bytes of incomplete JSON")]
    TruncatedStream { buffered: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    /// Object or array; complete when brackets balance.
    Container,
    /// Top-level string; complete at the closing quote.
    String,
    /// Number or literal; may be complete after any byte.
    Scalar,
    /// A balanced value failed to parse; no suffix can repair it.
    Rejected,
}

/// Finds the byte offsets at which the buffer might hold one whole value.
#[derive(Debug, Default)]
struct BoundaryScanner {
    kind: Option<ValueKind>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl BoundaryScanner {
    /// Feed one byte. Returns true when a parse attempt is worthwhile.
    fn push(&mut self, byte: u8) -> bool {
        let Some(kind) = self.kind else {
            return match byte {
                b' ' | b'\t' | b'\n' | b'\r' => false,
                b'{' | b'[' => {
                    self.kind = Some(ValueKind::Container);
                    self.depth = 1;
                    false
                }
                b'"' => {
                    self.kind = Some(ValueKind::String);
                    self.in_string = true;
                    false
                }
                _ => {
                    self.kind = Some(ValueKind::Scalar);
                    true
                }
            };
        };

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
                return kind == ValueKind::String;
            }
            return false;
        }

        match kind {
            ValueKind::Container => match byte {
                b'"' => {
                    self.in_string = true;
                    false
                }
                b'{' | b'[' => {
                    self.depth += 1;
                    false
                }
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    self.depth == 0
                }
                _ => false,
            },
            ValueKind::Scalar => true,
            ValueKind::String | ValueKind::Rejected => false,
        }
    }

    /// A parse attempt at the last boundary failed.
    fn reject(&mut self) {
        if matches!(self.kind, Some(ValueKind::Container | ValueKind::String)) {
            self.kind = Some(ValueKind::Rejected);
        }
    }

    /// True until the first non-whitespace byte.
    fn is_blank(&self) -> bool {
        self.kind.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Finished,
}

/// Single-pass decoding session producing JSON values from one body.
///
/// In chunked mode the body is read opportunistically and scanned byte by
/// byte; whenever the scanner reports a possible value end the accumulated
/// buffer is parsed. The yielded values do not depend on how the body was
/// split into chunks.
pub struct ChunkedJsonDecoder<R> {
    reader: R,
    chunked: bool,
    read_size: usize,
    /// Bytes read from the source but not yet scanned.
    pending: BytesMut,
    /// Bytes scanned but not yet forming a complete value.
    buffer: BytesMut,
    scanner: BoundaryScanner,
    last_error: Option<serde_json::Error>,
    state: State,
    values: u64,
}

impl<R> ChunkedJsonDecoder<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, chunked: bool) -> Self {
        Self::with_options(reader, chunked, &DecodeOptions::default())
    }

    pub fn with_options(reader: R, chunked: bool, opts: &DecodeOptions) -> Self {
        Self {
            reader,
            chunked,
            read_size: opts.read_size.max(1),
            pending: BytesMut::new(),
            buffer: BytesMut::new(),
            scanner: BoundaryScanner::default(),
            last_error: None,
            state: State::Open,
            values: 0,
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Pull the next value.
    pub async fn next_value(&mut self) -> Option<Result<Value, JsonStreamError>> {
        if self.state == State::Finished {
            return None;
        }
        if !self.chunked {
            self.state = State::Finished;
            return Some(self.read_whole().await);
        }

        loop {
            if let Some(value) = self.scan_pending() {
                self.values += 1;
                return Some(Ok(value));
            }

            self.pending.reserve(self.read_size);
            match self.reader.read_buf(&mut self.pending).await {
                Ok(0) => {
                    self.state = State::Finished;
                    return self.finish();
                }
                Ok(n) => tracing::trace!(bytes = n, "read JSON stream chunk"),
                Err(e) => {
                    self.state = State::Finished;
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// Move pending bytes into the parse buffer until a value completes.
    fn scan_pending(&mut self) -> Option<Value> {
        while self.pending.has_remaining() {
            let byte = self.pending.get_u8();
            self.buffer.put_u8(byte);
            if !self.scanner.push(byte) {
                continue;
            }
            match serde_json::from_slice::<Value>(&self.buffer) {
                Ok(value) => {
                    tracing::trace!(bytes = self.buffer.len(), "decoded JSON value");
                    self.buffer.clear();
                    self.scanner = BoundaryScanner::default();
                    self.last_error = None;
                    return Some(value);
                }
                Err(e) => {
                    self.scanner.reject();
                    self.last_error = Some(e);
                }
            }
        }
        None
    }

    fn finish(&mut self) -> Option<Result<Value, JsonStreamError>> {
        if self.scanner.is_blank() {
            tracing::debug!(values = self.values, "JSON stream ended");
            return None;
        }
        let buffered = self.buffer.len();
        if let Some(e) = self.last_error.take() {
            tracing::warn!(buffered, error = %e, "JSON stream ended inside a value");
        }
        self.buffer.clear();
        Some(Err(JsonStreamError::TruncatedStream { buffered }))
    }

    async fn read_whole(&mut self) -> Result<Value, JsonStreamError> {
        let mut body = Vec::new();
        self.reader.read_to_end(&mut body).await?;
        serde_json::from_slice(&body).map_err(JsonStreamError::Syntax)
    }

    /// Collect every remaining value, stopping at the first error.
    pub async fn collect_values(mut self) -> Result<Vec<Value>, JsonStreamError> {
        let mut values = Vec::new();
        while let Some(value) = self.next_value().await {
            values.push(value?);
        }
        Ok(values)
    }

    /// Adapt the session into a `Stream`.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value, JsonStreamError>> {
        futures::stream::unfold(self, |mut decoder| async move {
            decoder.next_value().await.map(|item| (item, decoder))
        })
    }
}
