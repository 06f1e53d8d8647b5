// ABOUTME: Response content-type classification for multiplexed streams.
// ABOUTME: Distinguishes the raw-stream marker, JSON, and opaque payloads.

/// Content type the engine uses for raw multiplexed streams.
pub const RAW_STREAM: &str = "application/vnd.docker.raw-stream";

/// Content type for JSON payloads.
pub const JSON: &str = "application/json";

/// How each frame payload should be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// Raw multiplexed text.
    RawStream,
    /// One JSON value per frame.
    Json,
    /// Anything else, kept as opaque bytes.
    Other(String),
}

impl ContentType {
    /// Classify a `Content-Type` header value using the default raw-stream marker.
    pub fn parse(value: &str) -> Self {
        Self::classify(value, RAW_STREAM)
    }

    /// Classify a `Content-Type` header value against a custom raw-stream marker.
    ///
    /// Parameters after `;` are ignored and matching is case-insensitive.
    pub fn classify(value: &str, raw_stream_marker: &str) -> Self {
        let essence = value.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case(raw_stream_marker) {
            ContentType::RawStream
        } else if essence.eq_ignore_ascii_case(JSON) {
            ContentType::Json
        } else {
            ContentType::Other(essence.to_ascii_lowercase())
        }
    }
}
