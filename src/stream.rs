use bytes::Bytes;
use futures::{stream::FusedStream, Stream};
use std::{
    mem,
    pin::Pin,
    task::{Context, Poll},
    vec,
};

use crate::{format, Boundary, Error, Part, Source, Value};

enum State {
    /// Take the next part from the queue, or close the form if there is none.
    Next,
    Body(Bytes),
    Relay(Source),
    Footer,
    Done,
}

/// The serialized form as a stream of chunks.
///
/// Nothing is read ahead: every call to `poll_next` produces a single chunk,
/// which is either a part header, a whole in-memory body, one chunk read from
/// a [`Source`], a part footer or the closing boundary. A consumer that stops
/// polling therefore stops all reads from nested sources too.
///
/// A failing source is reported once as [`Error::Source`], after which the
/// stream ends. If the stream is dropped while a source is half read, that
/// source is cancelled.
pub struct MultipartStream {
    boundary: Boundary,
    parts: vec::IntoIter<Part>,
    state: State,
}

impl MultipartStream {
    pub(crate) fn new(boundary: Boundary, parts: Vec<Part>) -> Self {
        log::debug!(
            "Creating stream of {} parts with boundary: {:?}",
            parts.len(),
            boundary.as_str()
        );

        MultipartStream {
            boundary,
            parts: parts.into_iter(),
            state: State::Next,
        }
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    fn abort(&mut self, source: Source) {
        source.cancel();
        self.parts = Vec::new().into_iter();
        self.state = State::Done;
    }
}

impl Stream for MultipartStream {
    type Item = Result<Bytes, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            match mem::replace(&mut this.state, State::Done) {
                State::Next => match this.parts.next() {
                    Some(part) => {
                        let header = format::header(&this.boundary, &part);

                        this.state = match part.into_value() {
                            Value::Bytes(body) => State::Body(body),
                            Value::Source(source) => State::Relay(source),
                        };

                        log::trace!("Emitting header of {} bytes", header.len());
                        return Poll::Ready(Some(Ok(header)));
                    }

                    None => {
                        log::debug!("All parts emitted, closing form");
                        return Poll::Ready(Some(Ok(format::closing(&this.boundary))));
                    }
                },

                State::Body(body) => {
                    this.state = State::Footer;

                    if !body.is_empty() {
                        log::trace!("Emitting body of {} bytes", body.len());
                        return Poll::Ready(Some(Ok(body)));
                    }
                }

                State::Relay(source) => match source.poll_chunk(cx) {
                    Poll::Pending => {
                        this.state = State::Relay(source);
                        return Poll::Pending;
                    }

                    Poll::Ready(Some(Ok(chunk))) => {
                        this.state = State::Relay(source);

                        if !chunk.is_empty() {
                            log::trace!("Relaying {} bytes", chunk.len());
                            return Poll::Ready(Some(Ok(chunk)));
                        }
                    }

                    Poll::Ready(Some(Err(e))) => {
                        this.abort(source);
                        return Poll::Ready(Some(Err(Error::Source(e))));
                    }

                    Poll::Ready(None) => {
                        this.state = State::Footer;
                    }
                },

                State::Footer => {
                    this.state = State::Next;
                    return Poll::Ready(Some(Ok(format::footer())));
                }

                State::Done => return Poll::Ready(None),
            }
        }
    }
}

impl FusedStream for MultipartStream {
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Done)
    }
}

impl Drop for MultipartStream {
    fn drop(&mut self) {
        if let State::Relay(ref source) = self.state {
            log::debug!("Stream dropped while relaying a source");
            source.cancel();
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::Multipart;
    use futures::{
        channel::mpsc,
        executor::block_on,
        stream::{self, StreamExt},
        task::noop_waker,
    };
    use std::{
        io,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    fn form() -> Multipart {
        Multipart::with_boundary("simple-boundary").expect("valid boundary")
    }

    fn collect(s: MultipartStream) -> Vec<Bytes> {
        block_on(s.map(|chunk| chunk.expect("chunk")).collect::<Vec<_>>())
    }

    /// A source over `chunks` that counts how many chunks were pulled from it.
    fn counting(chunks: &[&'static str]) -> (Source, Arc<AtomicUsize>) {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();

        let items: Vec<io::Result<Bytes>> =
            chunks.iter().copied().map(|c| Ok(Bytes::from(c))).collect();

        let source = Source::new(stream::iter(items).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        (source, pulled)
    }

    #[test]
    fn empty_form_is_only_the_closing_boundary() {
        let chunks = collect(form().stream());

        assert_eq!(vec![Bytes::from("--simple-boundary--\r\n")], chunks);
    }

    #[test]
    fn chunks_follow_part_order() {
        let mut f = form();
        f.append("a", "1", None).append("b", "", None);

        let chunks = collect(f.stream());

        let exp: Vec<Bytes> = vec![
            "--simple-boundary\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n".into(),
            "1".into(),
            "\r\n".into(),
            "--simple-boundary\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n".into(),
            "\r\n".into(),
            "--simple-boundary--\r\n".into(),
        ];

        assert_eq!(exp, chunks);
    }

    #[test]
    fn sources_are_pulled_on_demand() {
        let (source, pulled) = counting(&["ab", "", "cd"]);

        let mut f = form();
        f.append("file", source.clone(), Some("x.bin"));

        let mut s = f.stream();

        let header = block_on(s.next()).expect("header").expect("ok");
        assert!(header.ends_with(b"Content-Type: application/octet-stream\r\n\r\n"));
        assert_eq!(0, pulled.load(Ordering::SeqCst));

        assert_eq!(Bytes::from("ab"), block_on(s.next()).unwrap().unwrap());
        assert_eq!(1, pulled.load(Ordering::SeqCst));

        // The empty chunk is skipped over within the same poll.
        assert_eq!(Bytes::from("cd"), block_on(s.next()).unwrap().unwrap());
        assert_eq!(3, pulled.load(Ordering::SeqCst));

        assert_eq!(Bytes::from("\r\n"), block_on(s.next()).unwrap().unwrap());
        assert!(source.is_released());

        assert_eq!(
            Bytes::from("--simple-boundary--\r\n"),
            block_on(s.next()).unwrap().unwrap()
        );
        assert!(s.is_terminated());
        assert!(block_on(s.next()).is_none());
    }

    #[test]
    fn pending_sources_suspend_the_stream() {
        let (tx, rx) = mpsc::unbounded::<io::Result<Bytes>>();

        let mut f = form();
        f.append("live", Source::new(rx), None);

        let mut s = f.stream();

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        assert!(matches!(s.poll_next_unpin(&mut cx), Poll::Ready(Some(Ok(_)))));
        assert!(s.poll_next_unpin(&mut cx).is_pending());
        assert!(s.poll_next_unpin(&mut cx).is_pending());

        tx.unbounded_send(Ok(Bytes::from("late"))).expect("send");
        match s.poll_next_unpin(&mut cx) {
            Poll::Ready(Some(Ok(chunk))) => assert_eq!(Bytes::from("late"), chunk),
            other => panic!("expected relayed chunk, got {:?}", other.map(|_| ())),
        }

        drop(tx);
        match s.poll_next_unpin(&mut cx) {
            Poll::Ready(Some(Ok(chunk))) => assert_eq!(Bytes::from("\r\n"), chunk),
            other => panic!("expected footer, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn source_errors_end_the_stream() {
        let failing = Source::new(stream::iter(vec![
            Ok(Bytes::from("partial")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
        ]));
        let (later, pulled) = counting(&["never"]);

        let mut f = form();
        f.append("a", failing.clone(), None)
            .append("b", later.clone(), None);

        let items = block_on(f.stream().collect::<Vec<_>>());

        assert_eq!(3, items.len());
        assert!(matches!(items[2], Err(Error::Source(_))));
        assert!(failing.is_released());
        assert_eq!(0, pulled.load(Ordering::SeqCst));
        assert!(!later.is_released());
    }

    #[test]
    fn dropping_mid_relay_cancels_the_source() {
        let (source, _) = counting(&["one", "two"]);

        let mut f = form();
        f.append("file", source.clone(), None);

        let mut s = f.stream();
        block_on(s.next()).expect("header").expect("ok");
        block_on(s.next()).expect("first chunk").expect("ok");
        assert!(!source.is_released());

        drop(s);
        assert!(source.is_released());
    }

    #[test]
    fn streams_snapshot_the_store() {
        let mut f = form();
        f.append("a", "1", None);

        let s = f.stream();
        f.delete("a").append("b", "2", None);

        let body: Vec<u8> = collect(s).concat();
        let body = String::from_utf8(body).expect("utf8");

        assert!(body.contains("name=\"a\""));
        assert!(!body.contains("name=\"b\""));
    }
}
