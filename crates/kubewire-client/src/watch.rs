use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use kubewire_http::{ClientError, WatchStream};
use kubewire_types::{FromObject, WatchEvent};

/// A watch subscription whose events are mapped to resource kind `K`.
///
/// Releases its connection on drop, exactly like the [`WatchStream`] it wraps.
pub struct WatchEvents<K> {
    inner: WatchStream,
    _kind: PhantomData<fn() -> K>,
}

impl<K> WatchEvents<K> {
    pub(crate) fn new(inner: WatchStream) -> Self {
        Self {
            inner,
            _kind: PhantomData,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancellation_token()
    }

    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// The untyped stream, for callers that want raw events
    pub fn into_inner(self) -> WatchStream {
        self.inner
    }
}

impl<K: FromObject> Stream for WatchEvents<K> {
    type Item = Result<WatchEvent<K>, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx).map(|item| {
            item.map(|result| result.and_then(|raw| Ok(WatchEvent::<K>::try_from(raw)?)))
        })
    }
}

impl<K: FromObject> FusedStream for WatchEvents<K> {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

impl<K> std::fmt::Debug for WatchEvents<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WatchEvents").field(&self.inner).finish()
    }
}
