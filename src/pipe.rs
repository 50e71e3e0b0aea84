use bytes::{Bytes, BytesMut};
use futures::{future, Sink, SinkExt, StreamExt};
use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{Error, MultipartStream};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipeOptions {
    /// Close the destination once the form has been written.
    pub end: bool,
}

impl Default for PipeOptions {
    fn default() -> Self {
        PipeOptions { end: true }
    }
}

impl MultipartStream {
    /// Write the whole form into `destination`.
    ///
    /// The destination is asked for capacity before every chunk is produced,
    /// so a destination that is not ready pauses the form and any source it is
    /// reading. When the form is written the destination is flushed and, if
    /// `options.end` is set, closed. The destination is handed back for
    /// chaining.
    pub async fn pipe<S>(mut self, mut destination: S, options: PipeOptions) -> Result<S, Error>
    where
        S: Sink<Bytes> + Unpin,
        S::Error: fmt::Display,
    {
        let mut written = 0;

        loop {
            future::poll_fn(|cx| destination.poll_ready_unpin(cx))
                .await
                .map_err(sink_error)?;

            let chunk = match self.next().await {
                Some(chunk) => chunk?,
                None => break,
            };

            written += chunk.len();
            destination.start_send_unpin(chunk).map_err(sink_error)?;
        }

        destination.flush().await.map_err(sink_error)?;

        if options.end {
            destination.close().await.map_err(sink_error)?;
        }

        log::debug!("Piped {} bytes, end: {}", written, options.end);
        Ok(destination)
    }

    /// Drain the whole form into a [`BufferSink`].
    pub async fn flowing(self, end: bool) -> Result<BufferSink, Error> {
        self.pipe(BufferSink::new(), PipeOptions { end }).await
    }
}

fn sink_error<E: fmt::Display>(e: E) -> Error {
    log::warn!("Destination failed: {}", e);
    Error::sink(e)
}

/// An in-memory destination that accepts everything it is given.
#[derive(Debug, Default)]
pub struct BufferSink {
    buffer: BytesMut,
    closed: bool,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the writer signalled that nothing more will follow.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }
}

impl Sink<Bytes> for BufferSink {
    type Error = Error;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        if self.closed {
            Poll::Ready(Err(Error::Closed))
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn start_send(mut self: Pin<&mut Self>, item: Bytes) -> Result<(), Error> {
        if self.closed {
            return Err(Error::Closed);
        }

        self.buffer.extend_from_slice(&item);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        self.closed = true;
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{Multipart, Source};
    use futures::{channel::mpsc, executor::block_on, stream};
    use std::{
        io,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    fn form() -> Multipart {
        let mut f = Multipart::with_boundary("simple-boundary").expect("valid boundary");
        f.append("a", "1", None).append("f", "{}", Some("x.json"));
        f
    }

    #[test]
    fn flowing_matches_get_buffer() {
        let f = form();

        let sink = block_on(f.flowing(true)).expect("flowing");

        assert!(sink.is_closed());
        assert_eq!(f.get_buffer().expect("buffer"), sink.into_bytes());
    }

    #[test]
    fn flowing_without_end_leaves_sink_open() {
        let sink = block_on(form().flowing(false)).expect("flowing");

        assert!(!sink.is_closed());
        assert!(sink.as_bytes().ends_with(b"--simple-boundary--\r\n"));
    }

    #[test]
    fn pipe_hands_back_the_destination() {
        let f = form();

        let mut sink = BufferSink::new();
        block_on(f.pipe(&mut sink, PipeOptions { end: false })).expect("first pipe");
        let first = sink.len();

        let sink = block_on(f.pipe(sink, PipeOptions::default())).expect("second pipe");

        assert_eq!(2 * first, sink.len());
        assert!(sink.is_closed());
    }

    #[test]
    fn closed_destinations_fail_the_pipe() {
        let mut sink = BufferSink::new();
        block_on(sink.close()).expect("close");

        match block_on(form().pipe(sink, PipeOptions::default())) {
            Err(Error::Sink(_)) => {}
            other => panic!("expected sink error, got {:?}", other.map(|_| ())),
        }
    }

    /// Accepts `limit` chunks, then reports itself broken.
    struct FailAfter {
        accepted: usize,
        limit: usize,
    }

    impl Sink<Bytes> for FailAfter {
        type Error = io::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            if self.accepted >= self.limit {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away")))
            } else {
                Poll::Ready(Ok(()))
            }
        }

        fn start_send(mut self: Pin<&mut Self>, _item: Bytes) -> io::Result<()> {
            self.accepted += 1;
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn failing_destination_releases_the_source() {
        let source = Source::new(stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from("first")),
            Ok(Bytes::from("second")),
        ]));

        let mut f = Multipart::with_boundary("simple-boundary").expect("valid boundary");
        f.append("file", source.clone(), Some("data.bin"));

        // The header and the first chunk get through, then the destination fails.
        let sink = FailAfter {
            accepted: 0,
            limit: 2,
        };

        match block_on(f.pipe(sink, PipeOptions::default())) {
            Err(Error::Sink(msg)) => assert!(msg.contains("peer went away")),
            other => panic!("expected sink error, got {:?}", other.map(|_| ())),
        }

        assert!(source.is_released());
    }

    #[tokio::test]
    async fn pipe_does_not_read_ahead_of_the_destination() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();

        let chunks: Vec<io::Result<Bytes>> = (0..16).map(|i| Ok(Bytes::from(vec![i; 64]))).collect();
        let source = Source::new(stream::iter(chunks).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let mut f = Multipart::with_boundary("simple-boundary").expect("valid boundary");
        f.append("file", source, Some("blob.bin"));

        // A zero sized channel holds one message per sender.
        let (tx, mut rx) = mpsc::channel::<Bytes>(0);
        let writer = tokio::spawn(f.into_stream().pipe(tx, PipeOptions::default()));

        // header
        rx.next().await.expect("header");

        let mut received = 0;
        while let Some(chunk) = rx.next().await {
            if chunk.len() == 64 {
                received += 1;
                // At most one chunk is queued in the channel and one is
                // waiting to be sent.
                assert!(pulled.load(Ordering::SeqCst) <= received + 2);
            }
        }

        assert_eq!(16, received);
        writer.await.expect("join").expect("pipe");
    }
}
