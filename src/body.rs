use crate::{Multipart, MultipartStream};

impl From<MultipartStream> for hyper::Body {
    fn from(stream: MultipartStream) -> Self {
        hyper::Body::wrap_stream(stream)
    }
}

impl Multipart {
    /// A request body that streams the form. Send it together with
    /// [`get_headers`](Multipart::get_headers), taken before this call.
    pub fn into_body(self) -> hyper::Body {
        self.into_stream().into()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::Source;

    #[tokio::test]
    async fn body_carries_the_whole_form() {
        let mut form = Multipart::with_boundary("simple-boundary").expect("valid boundary");
        form.append("a", "1", None)
            .append("f", Source::from_reader(&b"file contents"[..]), Some("notes.txt"));

        let exp: &[u8] = b"--simple-boundary\r
Content-Disposition: form-data; name=\"a\"\r
\r
1\r
--simple-boundary\r
Content-Disposition: form-data; name=\"f\"; filename=\"notes.txt\"\r
Content-Type: text/plain\r
\r
file contents\r
--simple-boundary--\r
";

        let body = hyper::body::to_bytes(form.into_body())
            .await
            .expect("read body");

        assert_eq!(exp, &body[..]);
    }
}
