use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

/// Stream wrapper that fires a callback exactly once, and only when the
/// inner stream finishes cleanly.
///
/// Download counters hang off this: a client that disconnects mid-transfer
/// drops the stream before the clean end, so the callback never runs and the
/// partial transfer is not counted. An I/O error mid-stream likewise
/// suppresses the callback.
pub struct TransferStream<S, F: FnOnce()> {
    inner: S,
    on_complete: Option<F>,
    failed: bool,
}

impl<S, F: FnOnce()> TransferStream<S, F> {
    pub fn new(inner: S, on_complete: F) -> Self {
        Self {
            inner,
            on_complete: Some(on_complete),
            failed: false,
        }
    }
}

impl<S, T, E, F> Stream for TransferStream<S, F>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    F: FnOnce() + Unpin,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Err(e))) => {
                this.failed = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                if !this.failed {
                    if let Some(on_complete) = this.on_complete.take() {
                        on_complete();
                    }
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce()) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook = {
            let count = Arc::clone(&count);
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        };
        (count, hook)
    }

    #[tokio::test]
    async fn test_complete_stream_fires_once() {
        let (count, hook) = counter();
        let inner = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(vec![1u8, 2]),
            Ok(vec![3u8]),
        ]);

        let mut stream = TransferStream::new(inner, hook);
        while stream.next().await.is_some() {}
        // Poll past the end; the hook must not fire again.
        assert!(stream.next().await.is_none());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errored_stream_does_not_fire() {
        let (count, hook) = counter();
        let inner = futures::stream::iter(vec![
            Ok(vec![1u8]),
            Err(std::io::Error::other("disk fault")),
        ]);

        let mut stream = TransferStream::new(inner, hook);
        while stream.next().await.is_some() {}

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_stream_does_not_fire() {
        let (count, hook) = counter();
        let inner = futures::stream::iter(vec![Ok::<_, std::io::Error>(vec![1u8]), Ok(vec![2u8])]);

        let mut stream = TransferStream::new(inner, hook);
        // Client disconnects after the first chunk.
        let _ = stream.next().await;
        drop(stream);

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
