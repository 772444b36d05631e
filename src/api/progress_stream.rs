use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use bytes::Bytes;
use futures_util::Stream;
use pin_project_lite::pin_project;
use crate::core::{ProgressCallback, TransferSignal};

pin_project! {
    /// Counts payload bytes as the transport pulls them
    pub struct ByteCountingStream<S> {
        #[pin]
        inner: S,
        sent: u64,
        total: u64,
        callback: ProgressCallback,
    }
}

impl<S> ByteCountingStream<S> {
    pub fn new(inner: S, total: u64, callback: ProgressCallback) -> Self {
        Self {
            inner,
            sent: 0,
            total,
            callback,
        }
    }
}

impl<S> Stream for ByteCountingStream<S>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    *this.sent += chunk.len() as u64;
                    (this.callback)(TransferSignal::BytesSent {
                        sent: *this.sent,
                        total: *this.total,
                    });
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}
