// ABOUTME: Picks the body decoder from response headers.
// ABOUTME: Raw-stream bodies are demultiplexed, everything else is JSON.

use hyper::HeaderMap;
use hyper::header::{CONTENT_TYPE, TRANSFER_ENCODING};
use serde_json::Value;
use tokio::io::AsyncRead;

use super::content_type::ContentType;
use super::demux::{DecodedChunk, StreamDemuxer};
use super::error::DecodeError;
use super::json::ChunkedJsonDecoder;
use super::options::DecodeOptions;

/// What the headers say about a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFormat {
    pub content_type: ContentType,
    pub chunked: bool,
}

impl ResponseFormat {
    pub fn from_headers(headers: &HeaderMap, opts: &DecodeOptions) -> Self {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| ContentType::classify(v, &opts.raw_stream_content_type))
            .unwrap_or_else(|| ContentType::Other(String::new()));

        let chunked = headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"));

        Self {
            content_type,
            chunked,
        }
    }

    /// Raw-stream responses carry multiplexed frames.
    pub fn is_multiplexed(&self) -> bool {
        self.content_type == ContentType::RawStream
    }
}

/// One item from a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyItem {
    Chunk(DecodedChunk),
    Value(Value),
}

/// A decoding session chosen from the response format.
pub enum ResponseBody<R> {
    Multiplexed(StreamDemuxer<R>),
    Json(ChunkedJsonDecoder<R>),
}

impl<R> ResponseBody<R>
where
    R: AsyncRead + Unpin,
{
    pub fn open(reader: R, format: &ResponseFormat, opts: &DecodeOptions) -> Self {
        if format.is_multiplexed() {
            ResponseBody::Multiplexed(StreamDemuxer::with_options(
                reader,
                format.content_type.clone(),
                opts,
            ))
        } else {
            ResponseBody::Json(ChunkedJsonDecoder::with_options(
                reader,
                format.chunked,
                opts,
            ))
        }
    }

    pub async fn next_item(&mut self) -> Option<Result<BodyItem, DecodeError>> {
        match self {
            ResponseBody::Multiplexed(demuxer) => demuxer
                .next_chunk()
                .await
                .map(|r| r.map(BodyItem::Chunk).map_err(DecodeError::from)),
            ResponseBody::Json(decoder) => decoder
                .next_value()
                .await
                .map(|r| r.map(BodyItem::Value).map_err(DecodeError::from)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn detects_chunked_among_codings() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip, chunked"));
        let format = ResponseFormat::from_headers(&headers, &DecodeOptions::default());
        assert_eq!(format.content_type, ContentType::Json);
        assert!(format.chunked);
        assert!(!format.is_multiplexed());
    }

    #[test]
    fn missing_headers() {
        let format = ResponseFormat::from_headers(&HeaderMap::new(), &DecodeOptions::default());
        assert_eq!(format.content_type, ContentType::Other(String::new()));
        assert!(!format.chunked);
    }
}
