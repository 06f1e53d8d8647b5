// ABOUTME: AsyncRead adapter over hyper response bodies.
// ABOUTME: Lets the decoders consume a body without collecting it first.

use bytes::Bytes;
use hyper::body::Body;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::{AsyncRead, ReadBuf};

/// Reads the data frames of a body as a byte stream. Trailers are skipped.
pub struct BodyReader<B> {
    body: B,
    current: Bytes,
    done: bool,
}

impl<B> BodyReader<B> {
    pub fn new(body: B) -> Self {
        Self {
            body,
            current: Bytes::new(),
            done: false,
        }
    }

    pub fn into_inner(self) -> B {
        self.body
    }
}

impl<B> AsyncRead for BodyReader<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.current.is_empty() {
                let n = buf.remaining().min(this.current.len());
                buf.put_slice(&this.current.split_to(n));
                return Poll::Ready(Ok(()));
            }
            if this.done || buf.remaining() == 0 {
                return Poll::Ready(Ok(()));
            }

            match ready!(Pin::new(&mut this.body).poll_frame(cx)) {
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data() {
                        this.current = data;
                    }
                }
                Some(Err(e)) => return Poll::Ready(Err(io::Error::other(e))),
                None => this.done = true,
            }
        }
    }
}
