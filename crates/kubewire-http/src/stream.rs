use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::stream::{BoxStream, FusedStream, Stream, StreamExt, TryStreamExt};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, trace, warn};

use kubewire_types::RawWatchEvent;

use crate::ClientError;
use crate::lines::LineBuffer;

type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// A live watch subscription.
///
/// Yields one [`RawWatchEvent`] per newline-terminated line of the response
/// body, in server order. The body is only read when no complete line is
/// buffered, so the stream never runs ahead of its consumer.
///
/// The subscription owns its connection. Dropping the stream, calling
/// [`close`](Self::close) or cancelling its [`CancellationToken`] releases the
/// connection immediately; nothing buffered is yielded afterwards. A closed
/// stream cannot be restarted, subscribe again instead.
pub struct WatchStream {
    body: Option<ByteStream>,
    lines: LineBuffer,
    status: u16,
    cancel: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl WatchStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.bytes_stream().map_err(ClientError::from).boxed();
        Self::from_body(body, status)
    }

    pub(crate) fn from_body(body: ByteStream, status: u16) -> Self {
        let cancel = CancellationToken::new();
        let cancelled = Box::pin(cancel.clone().cancelled_owned());
        Self {
            body: Some(body),
            lines: LineBuffer::default(),
            status,
            cancel,
            cancelled,
        }
    }

    /// Token that closes this stream when cancelled, usable from other tasks
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Release the connection and discard anything buffered
    pub fn close(&mut self) {
        if self.body.take().is_some() {
            debug!(
                discarded = self.lines.pending(),
                "closing watch stream"
            );
        }
        self.lines.clear();
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_none()
    }

    fn decode_line(&self, line: &[u8]) -> Result<RawWatchEvent, ClientError> {
        trace!("watch line: {}", String::from_utf8_lossy(line));
        serde_json::from_slice(line).map_err(|err| {
            warn!("malformed watch line: {}", err);
            ClientError::MalformedResponse {
                status: self.status,
                reason: err.to_string(),
            }
        })
    }
}

impl Stream for WatchStream {
    type Item = Result<RawWatchEvent, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.body.is_none() {
                return Poll::Ready(None);
            }

            if this.cancelled.as_mut().poll(cx).is_ready() {
                this.close();
                return Poll::Ready(None);
            }

            if let Some(line) = this.lines.next_line() {
                return Poll::Ready(Some(this.decode_line(&line)));
            }

            let Some(body) = this.body.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(body.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    trace!(bytes = chunk.len(), "watch chunk");
                    this.lines.extend(&chunk);
                }
                Some(Err(err)) => {
                    // a dropped connection ends the watch, it is not an error
                    debug!("watch connection lost: {}", err);
                    this.close();
                    return Poll::Ready(None);
                }
                None => {
                    debug!("watch closed by server");
                    this.close();
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl FusedStream for WatchStream {
    fn is_terminated(&self) -> bool {
        self.body.is_none()
    }
}

impl std::fmt::Debug for WatchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchStream")
            .field("closed", &self.is_closed())
            .field("pending", &self.lines.pending())
            .finish()
    }
}
