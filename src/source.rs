use bytes::Bytes;
use futures::{future, Stream, TryStreamExt};
use std::{
    fmt, io,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Default chunk size when reading a source from an `AsyncRead`.
pub const DEFAULT_READ_CAPACITY: usize = 8 * 1024;

type BoxStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A handle to bytes that are produced on demand, such as an opened file.
///
/// Cloning a `Source` clones the handle, not the data: all clones read from the
/// same underlying stream, which can be read only once. When the stream ends,
/// fails or is cancelled it is dropped and every handle reports end of data.
#[derive(Clone)]
pub struct Source {
    inner: Arc<Mutex<Option<BoxStream>>>,
}

impl Source {
    pub fn new<S, B>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<B>> + Send + 'static,
        B: Into<Bytes> + 'static,
    {
        let stream: BoxStream = Box::pin(stream.map_ok(Into::<Bytes>::into));

        Source {
            inner: Arc::new(Mutex::new(Some(stream))),
        }
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::from_reader_with_capacity(reader, DEFAULT_READ_CAPACITY)
    }

    pub fn from_reader_with_capacity<R>(reader: R, capacity: usize) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Source::new(ReaderStream::with_capacity(reader, capacity))
    }

    /// Drop the underlying stream without reading any further.
    pub fn cancel(&self) {
        if self.lock().take().is_some() {
            log::debug!("Source cancelled");
        }
    }

    /// True once the underlying stream has ended, failed or was cancelled.
    pub fn is_released(&self) -> bool {
        self.lock().is_none()
    }

    /// True if both handles refer to the same stream.
    pub fn ptr_eq(&self, other: &Source) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn poll_chunk(&self, cx: &mut Context<'_>) -> Poll<Option<io::Result<Bytes>>> {
        let mut guard = self.lock();

        let stream = match guard.as_mut() {
            Some(stream) => stream,
            None => return Poll::Ready(None),
        };

        match stream.as_mut().poll_next(cx) {
            Poll::Ready(None) => {
                log::debug!("Source exhausted");
                *guard = None;
                Poll::Ready(None)
            }

            Poll::Ready(Some(Err(e))) => {
                log::warn!("Source failed: {}", e);
                *guard = None;
                Poll::Ready(Some(Err(e)))
            }

            other => other,
        }
    }

    pub(crate) async fn next_chunk(&self) -> Option<io::Result<Bytes>> {
        future::poll_fn(|cx| self.poll_chunk(cx)).await
    }

    fn lock(&self) -> MutexGuard<'_, Option<BoxStream>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Source")
            .field("released", &self.is_released())
            .finish()
    }
}
