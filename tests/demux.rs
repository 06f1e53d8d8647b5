// ABOUTME: Integration tests for the pull-based stream demultiplexer.
// ABOUTME: Covers content-type handling, end-of-stream and body adapters.

use bytes::{Bytes, BytesMut};
use enginewire::stream::*;
use futures::StreamExt;
use http_body_util::StreamBody;
use hyper::body::Frame as BodyFrame;
use std::convert::Infallible;

fn encode(frames: &[(StreamId, &[u8])]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    for (stream, payload) in frames {
        Frame::new(*stream, payload.to_vec())
            .encode_into(&mut buf)
            .unwrap();
    }
    buf.to_vec()
}

type Piece = Result<BodyFrame<Bytes>, Infallible>;

/// A hyper body delivering `bytes` in pieces of at most `size` bytes.
fn split_body(
    bytes: &[u8],
    size: usize,
) -> BodyReader<StreamBody<impl futures::Stream<Item = Piece> + Unpin>> {
    let pieces: Vec<Piece> = bytes
        .chunks(size)
        .map(|c| Ok(BodyFrame::data(Bytes::copy_from_slice(c))))
        .collect();
    BodyReader::new(StreamBody::new(futures::stream::iter(pieces)))
}

mod raw_stream {
    use super::*;

    #[tokio::test]
    async fn single_stdout_frame() {
        let bytes = [1u8, 0, 0, 0, 0, 0, 0, 6, b'h', b'e', b'l', b'l', b'o', b'\n'];
        let mut demuxer = StreamDemuxer::new(&bytes[..], ContentType::RawStream);

        let chunk = demuxer.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.stream, StreamId::Stdout);
        assert_eq!(chunk.as_text(), Some("hello\n"));

        assert!(demuxer.next_chunk().await.is_none());
        assert!(demuxer.is_finished());
    }

    #[tokio::test]
    async fn exhausted_session_stays_empty() {
        let bytes = encode(&[(StreamId::Stdout, &b"a"[..])]);
        let mut demuxer = StreamDemuxer::new(&bytes[..], ContentType::RawStream);

        assert!(demuxer.next_chunk().await.is_some());
        assert!(demuxer.next_chunk().await.is_none());
        assert!(demuxer.next_chunk().await.is_none());
        assert_eq!(demuxer.frames_read(), 1);
    }

    #[tokio::test]
    async fn interleaved_streams_keep_their_order() {
        let bytes = encode(&[
            (StreamId::Stdout, &b"one\n"[..]),
            (StreamId::Stderr, &b"oops\n"[..]),
            (StreamId::Stdout, &b"two\n"[..]),
        ]);
        let chunks = StreamDemuxer::new(&bytes[..], ContentType::RawStream)
            .collect_chunks()
            .await
            .unwrap();

        let seen: Vec<(StreamId, &str)> = chunks
            .iter()
            .map(|c| (c.stream, c.as_text().unwrap()))
            .collect();
        assert_eq!(
            seen,
            vec![
                (StreamId::Stdout, "one\n"),
                (StreamId::Stderr, "oops\n"),
                (StreamId::Stdout, "two\n"),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let bytes = encode(&[(StreamId::Stdout, &[b'a', 0xff, b'b'][..])]);
        let mut demuxer = StreamDemuxer::new(&bytes[..], ContentType::RawStream);
        let chunk = demuxer.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.as_text(), Some("a\u{fffd}b"));
    }

    #[tokio::test]
    async fn unknown_stream_id_is_tagged() {
        let bytes = encode(&[(StreamId::Unknown(5), &b"x"[..])]);
        let mut demuxer = StreamDemuxer::new(&bytes[..], ContentType::RawStream);
        let chunk = demuxer.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.stream, StreamId::Unknown(5));
    }

    #[tokio::test]
    async fn does_not_read_past_delivered_frame() {
        let bytes = encode(&[
            (StreamId::Stdout, &b"first"[..]),
            (StreamId::Stdout, &b"second"[..]),
        ]);
        let mut demuxer = StreamDemuxer::new(&bytes[..], ContentType::RawStream);
        demuxer.next_chunk().await.unwrap().unwrap();

        let rest = demuxer.into_inner();
        assert_eq!(rest.len(), HEADER_SIZE + "second".len());
    }
}

mod errors {
    use super::*;

    #[tokio::test]
    async fn truncated_header_ends_session() {
        let mut bytes = encode(&[(StreamId::Stdout, &b"ok"[..])]);
        bytes.extend_from_slice(&[1, 0, 0]);
        let mut demuxer = StreamDemuxer::new(&bytes[..], ContentType::RawStream);

        assert!(demuxer.next_chunk().await.unwrap().is_ok());
        let err = demuxer.next_chunk().await.unwrap().unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            DemuxError::Frame(FrameError::TruncatedHeader { read: 3 })
        ));
        assert!(demuxer.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn truncated_payload_ends_session() {
        let bytes = [2u8, 0, 0, 0, 0, 0, 0, 9, b'p', b'a', b'r', b't'];
        let mut demuxer = StreamDemuxer::new(&bytes[..], ContentType::RawStream);

        let err = DecodeError::from(demuxer.next_chunk().await.unwrap().unwrap_err());
        assert_eq!(err.kind(), DecodeErrorKind::TruncatedPayload);
        assert!(demuxer.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn max_frame_size_from_options() {
        let bytes = encode(&[(StreamId::Stdout, &b"too long for the limit"[..])]);
        let opts = DecodeOptions {
            max_frame_size: 4,
            ..DecodeOptions::default()
        };
        let mut demuxer = StreamDemuxer::with_options(&bytes[..], ContentType::RawStream, &opts);

        let err = DecodeError::from(demuxer.next_chunk().await.unwrap().unwrap_err());
        assert_eq!(err.kind(), DecodeErrorKind::PayloadTooLarge);
    }
}

mod payload_types {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn json_frames_parse_per_chunk() {
        let bytes = encode(&[
            (StreamId::Stdout, &br#"{"status":"ok"}"#[..]),
            (StreamId::Stdout, &b"not json"[..]),
            (StreamId::Stdout, &b"[1,2]"[..]),
        ]);
        let mut demuxer = StreamDemuxer::new(&bytes[..], ContentType::Json);

        let first = demuxer.next_chunk().await.unwrap().unwrap();
        assert_eq!(first.as_json(), Some(&json!({"status": "ok"})));

        let err = demuxer.next_chunk().await.unwrap().unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(
            err,
            DemuxError::Json {
                stream: StreamId::Stdout,
                ..
            }
        ));

        let third = demuxer.next_chunk().await.unwrap().unwrap();
        assert_eq!(third.as_json(), Some(&json!([1, 2])));
        assert!(demuxer.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn other_content_types_stay_opaque() {
        let bytes = encode(&[(StreamId::Stdout, &[0, 159, 146, 150][..])]);
        let content_type = ContentType::parse("application/octet-stream");
        let mut demuxer = StreamDemuxer::new(&bytes[..], content_type);

        let chunk = demuxer.next_chunk().await.unwrap().unwrap();
        assert_eq!(
            chunk.as_bytes().map(|b| b.as_ref()),
            Some(&[0u8, 159, 146, 150][..])
        );
        assert!(chunk.as_text().is_none());
    }

    #[tokio::test]
    async fn custom_raw_stream_marker() {
        let opts = DecodeOptions {
            raw_stream_content_type: "application/x-multiplexed".to_string(),
            ..DecodeOptions::default()
        };
        let content_type =
            ContentType::classify("application/x-multiplexed", &opts.raw_stream_content_type);
        assert_eq!(content_type, ContentType::RawStream);
    }
}

mod adapters {
    use super::*;

    #[tokio::test]
    async fn stream_adapter_yields_same_chunks() {
        let bytes = encode(&[(StreamId::Stdout, &b"a"[..]), (StreamId::Stderr, &b"b"[..])]);
        let chunks: Vec<_> = StreamDemuxer::new(&bytes[..], ContentType::RawStream)
            .into_stream()
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].as_ref().unwrap().stream, StreamId::Stderr);
    }

    #[tokio::test]
    async fn frames_split_across_body_chunks() {
        let bytes = encode(&[
            (StreamId::Stdout, &b"hello world\n"[..]),
            (StreamId::Stderr, &b"warning\n"[..]),
        ]);

        for size in [1, 3, 8, 13, bytes.len()] {
            let reader = split_body(&bytes, size);
            let chunks = StreamDemuxer::new(reader, ContentType::RawStream)
                .collect_chunks()
                .await
                .unwrap();
            assert_eq!(chunks.len(), 2, "split size {size}");
            assert_eq!(chunks[0].as_text(), Some("hello world\n"));
            assert_eq!(chunks[1].stream, StreamId::Stderr);
        }
    }

    #[tokio::test]
    async fn response_body_selects_demuxer_for_raw_stream() {
        let bytes = encode(&[(StreamId::Stdout, &b"hi"[..])]);
        let opts = DecodeOptions::default();
        let format = ResponseFormat {
            content_type: ContentType::parse(RAW_STREAM),
            chunked: true,
        };

        let mut body = ResponseBody::open(&bytes[..], &format, &opts);
        match body.next_item().await.unwrap().unwrap() {
            BodyItem::Chunk(chunk) => assert_eq!(chunk.as_text(), Some("hi")),
            other => panic!("expected a chunk, got {other:?}"),
        }
        assert!(body.next_item().await.is_none());
    }
}
