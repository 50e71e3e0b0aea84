use hyper::{header::CONTENT_TYPE, Body, Client, Method, Request};
use hyper_formdata::{Multipart, Source};
use log::{debug, error};
use std::path::Path;

#[tokio::main]
async fn main() {
    dotenv::dotenv().expect("Failed to initialize dotenv");
    pretty_env_logger::init();

    let upload_url = std::env::var("UPLOAD_URL").expect("UPLOAD_URL must be set");
    let upload_file = std::env::var("UPLOAD_FILE").expect("UPLOAD_FILE must be set");

    let file = tokio::fs::File::open(&upload_file)
        .await
        .expect("Failed to open UPLOAD_FILE");

    let filename = Path::new(&upload_file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin")
        .to_string();

    let mut form = Multipart::new();
    form.append("meta", r#"{"source":"demo"}"#, Some("meta.json"))
        .append("file", Source::from_reader(file), Some(filename.as_str()));

    let request = Request::builder()
        .method(Method::POST)
        .uri(upload_url)
        .header(CONTENT_TYPE, form.content_type())
        .body(Body::from(form.into_stream()))
        .expect("Invalid request");

    match Client::new().request(request).await {
        Ok(response) => {
            debug!("Upload finished with status {}", response.status());
            let body = hyper::body::to_bytes(response.into_body())
                .await
                .expect("Reading response body");
            println!("{}", String::from_utf8_lossy(&body));
        }

        Err(e) => error!("Upload failed: {}", e),
    }
}
