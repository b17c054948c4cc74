//! Bare TCP server that hangs up on early connections
//!
//! Lets tests drive the connection-failure path, which the axum mock cannot
//! produce once it is listening.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Handle to a running flaky server
pub struct FlakyServer {
    base_url: String,
    connections: Arc<AtomicUsize>,
}

impl FlakyServer {
    /// Close the first `drop_first` connections unanswered, then serve `body`
    /// as a JSON 200 on every later one
    pub fn spawn(drop_first: usize, body: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&connections);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if seen <= drop_first {
                    drop(stream);
                    continue;
                }
                respond(stream, &body);
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            connections,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Connections accepted so far
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

fn respond(mut stream: TcpStream, body: &str) {
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
