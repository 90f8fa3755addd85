//! Loopback stand-ins for the display controller and image hosts.

use axum::{
    extract::{Form, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One multipart part received on `/upload`
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub field: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone)]
struct StubState {
    upload_status: StatusCode,
    uploads: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    last_upload: Arc<Mutex<Option<ReceivedUpload>>>,
}

/// Handle to a running stub controller
pub struct StubDevice {
    pub base_url: String,
    pub uploads: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
    pub last_upload: Arc<Mutex<Option<ReceivedUpload>>>,
}

/// Start a stub controller whose `/upload` answers with `upload_status`
pub async fn spawn_stub_device(upload_status: StatusCode) -> StubDevice {
    let state = StubState {
        upload_status,
        uploads: Arc::new(AtomicUsize::new(0)),
        in_flight: Arc::new(AtomicUsize::new(0)),
        max_in_flight: Arc::new(AtomicUsize::new(0)),
        last_upload: Arc::new(Mutex::new(None)),
    };

    let handle = StubDevice {
        base_url: String::new(),
        uploads: Arc::clone(&state.uploads),
        max_in_flight: Arc::clone(&state.max_in_flight),
        last_upload: Arc::clone(&state.last_upload),
    };

    let app = Router::new()
        .route("/upload", post(stub_upload))
        .route("/clear", get(|| async { "cleared" }))
        .route("/cross", get(|| async { "cross drawn" }))
        .route("/displayText", post(stub_display_text))
        .with_state(state);

    StubDevice {
        base_url: serve(app).await,
        ..handle
    }
}

async fn stub_upload(State(state): State<StubState>, mut multipart: Multipart) -> (StatusCode, String) {
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        *state.last_upload.lock().unwrap() = Some(ReceivedUpload {
            field: name,
            file_name,
            data,
        });
    }

    // Hold the request open briefly so overlapping uploads would be visible
    tokio::time::sleep(Duration::from_millis(30)).await;

    state.uploads.fetch_add(1, Ordering::SeqCst);
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    let body = if state.upload_status.is_success() {
        "File uploaded".to_string()
    } else {
        "Upload rejected by firmware".to_string()
    };
    (state.upload_status, body)
}

async fn stub_display_text(Form(form): Form<HashMap<String, String>>) -> String {
    format!("text: {}", form.get("plain").map(String::as_str).unwrap_or(""))
}

/// Start an image host serving `/image.png`, `/missing` (404) and `/slow`
/// (answers after two seconds)
pub async fn spawn_image_host(png: Vec<u8>) -> String {
    let app = Router::new()
        .route(
            "/image.png",
            get(move || {
                let png = png.clone();
                async move { png }
            }),
        )
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "nope") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "too late"
            }),
        );

    serve(app).await
}

/// Controller that answers 200 but closes before sending the promised body
pub async fn spawn_truncating_device() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // Drain the request until the client goes quiet
        let mut buf = [0u8; 8192];
        while let Ok(Ok(n)) =
            tokio::time::timeout(Duration::from_millis(200), socket.read(&mut buf)).await
        {
            if n == 0 {
                break;
            }
        }
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 64\r\n\r\nshort")
            .await;
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

/// URL of a loopback port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Serve `app` on an ephemeral loopback port and return its base URL
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Encode a solid-color image as PNG
pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    encode_png(DynamicImage::ImageRgb8(img))
}

/// Encode any image as PNG
pub fn encode_png(img: DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}
