//! Minimal HTTP/1.1 mock backend on 127.0.0.1:0.

#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A captured request: request line + headers (lower-cased names kept as sent), and body.
pub struct Captured {
    pub head: String,
    pub body: String,
}

impl Captured {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

pub async fn mock_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, format!("http://127.0.0.1:{port}"))
}

async fn read_request(socket: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| v.trim().parse::<usize>().unwrap())
        })
        .unwrap_or(0);
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Captured {
        head,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

/// Serve one canned response per entry, in order, capturing each request.
pub fn serve(listener: TcpListener, responses: Vec<(u16, String)>) -> JoinHandle<Vec<Captured>> {
    tokio::spawn(async move {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            captured.push(read_request(&mut socket).await);
            let reason = if status < 400 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            // The client may hang up early on oversized bodies.
            socket.write_all(response.as_bytes()).await.ok();
            socket.shutdown().await.ok();
        }
        captured
    })
}

/// Serve one response with no Content-Length; the body ends when the
/// connection closes.
pub fn serve_unsized(listener: TcpListener, status: u16, body: Vec<u8>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        let head = format!(
            "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n"
        );
        socket.write_all(head.as_bytes()).await.ok();
        socket.write_all(&body).await.ok();
        socket.shutdown().await.ok();
    })
}

/// Local backend completion body wrapping `text`.
pub fn completion(text: &str) -> String {
    serde_json::json!({ "model": "m", "response": text, "done": true }).to_string()
}

/// Hosted backend chat body wrapping `text`.
pub fn chat_completion(text: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }]
    })
    .to_string()
}
