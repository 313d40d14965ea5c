// Shared helpers for integration tests
#![allow(dead_code)]

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};
use scaled_bitmap::{AppContext, BitmapConfig, ScaledBitmap};
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
    });

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode png");
    cursor.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 255) as u8, (y % 255) as u8, 128])
    });

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Jpeg)
        .expect("failed to encode jpeg");
    cursor.into_inner()
}

/// Helper rooted in a fresh temp dir, proxies disabled for loopback requests.
pub fn helper() -> (tempfile::TempDir, ScaledBitmap) {
    let root = tempfile::tempdir().expect("create temp dir failed");
    let ctx = AppContext::new(root.path().join("cache"), root.path().join("sdcard"));
    let config = BitmapConfig {
        use_system_proxy: false,
        request_timeout_secs: Some(10),
        ..BitmapConfig::default()
    };
    let helper = ScaledBitmap::with_config(ctx, config).expect("helper init failed");
    (root, helper)
}

/// One-shot HTTP server; returns `http://127.0.0.1:<port>` and the server thread.
pub fn serve_once(status: &'static str, body: Vec<u8>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
    let addr = listener.local_addr().expect("read local addr failed");

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept failed");

        let mut req_buf = [0u8; 1024];
        let _ = stream.read(&mut req_buf);

        let headers = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        let _ = stream.write_all(headers.as_bytes());
        let _ = stream.write_all(&body);
        let _ = stream.flush();
    });

    (format!("http://127.0.0.1:{}", addr.port()), server)
}
