//! Common test helpers for the chat server integration tests.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use netchatd::config::ServerConfig;
use netchatd::registry::Registry;
use netchatd::server::ChatServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for any expected server output
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to listen when asserting that nothing arrives
pub const SILENCE_WINDOW: Duration = Duration::from_millis(200);

/// Interval between registry state checks
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Test Server
// ============================================================================

/// A server bound to an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<Registry>,
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Spawns a server with the default ceiling of 3.
    pub async fn spawn() -> Self {
        Self::spawn_with(ServerConfig::new("127.0.0.1:0")).await
    }

    /// Spawns a server with a custom configuration.
    pub async fn spawn_with(config: ServerConfig) -> Self {
        let cancel_token = CancellationToken::new();
        let server = ChatServer::bind(config, cancel_token.clone())
            .await
            .expect("bind test server");

        let addr = server.local_addr().expect("local addr");
        let registry = server.registry();

        let task = tokio::spawn(async move {
            let _ = server.run().await;
        });

        TestServer {
            addr,
            registry,
            cancel_token,
            task,
        }
    }

    pub async fn connect(&self) -> TestClient {
        TestClient::connect(self.addr).await
    }

    /// Connects and completes the handshake as `name`.
    pub async fn join(&self, name: &str) -> TestClient {
        let mut client = self.connect().await;
        client.read_until("[ENTER YOUR NAME]: ").await;
        client.send(&format!("{name}\n")).await;
        client.read_until(&format!("Welcome, {name}!\n")).await;
        client
    }

    /// Waits until the registry reports `expected` occupancy.
    pub async fn wait_for_occupancy(&self, expected: usize) {
        let start = Instant::now();
        while self.registry.occupancy() != expected {
            assert!(
                start.elapsed() < READ_TIMEOUT,
                "occupancy stayed at {} (expected {expected})",
                self.registry.occupancy()
            );
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Cancels the server and waits for the accept loop to finish.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        timeout(READ_TIMEOUT, self.task)
            .await
            .expect("server should stop after cancellation")
            .expect("server task should not panic");
    }
}

// ============================================================================
// Test Client
// ============================================================================

/// Raw TCP client that accumulates server output as text.
pub struct TestClient {
    stream: TcpStream,
    buffer: String,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to server");
        Self {
            stream,
            buffer: String::new(),
        }
    }

    pub async fn send(&mut self, text: &str) {
        self.send_bytes(text.as_bytes()).await;
    }

    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Reads until `needle` has been received.
    ///
    /// Returns everything up to and including `needle`; later bytes stay
    /// buffered for the next call.
    pub async fn read_until(&mut self, needle: &str) -> String {
        let mut searched = 0;
        loop {
            let haystack = self.buffer.as_bytes().get(searched..).unwrap_or_default();
            if let Some(pos) = haystack
                .windows(needle.len())
                .position(|w| w == needle.as_bytes())
            {
                let rest = self.buffer.split_off(searched + pos + needle.len());
                return std::mem::replace(&mut self.buffer, rest);
            }
            searched = self.buffer.len().saturating_sub(needle.len());

            let mut chunk = [0u8; 1024];
            let n = timeout(READ_TIMEOUT, self.stream.read(&mut chunk))
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}, got {:?}", self.buffer))
                .unwrap();
            assert!(
                n > 0,
                "connection closed while waiting for {needle:?}, got {:?}",
                self.buffer
            );
            self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
        }
    }

    /// Reads one newline-terminated line.
    pub async fn read_line(&mut self) -> String {
        self.read_until("\n").await
    }

    /// Reads until the server closes the connection.
    pub async fn read_to_end(&mut self) -> String {
        let mut rest = Vec::new();
        timeout(READ_TIMEOUT, self.stream.read_to_end(&mut rest))
            .await
            .expect("server should close the connection")
            .unwrap();
        let mut out = std::mem::take(&mut self.buffer);
        out.push_str(&String::from_utf8_lossy(&rest));
        out
    }

    /// Returns true if nothing arrives within the silence window.
    pub async fn is_silent(&mut self) -> bool {
        if !self.buffer.is_empty() {
            return false;
        }
        let mut chunk = [0u8; 1024];
        match timeout(SILENCE_WINDOW, self.stream.read(&mut chunk)).await {
            Err(_) => true,
            Ok(Ok(n)) => {
                self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
                false
            }
            Ok(Err(_)) => false,
        }
    }
}

/// Checks that `line` is `[YYYY-MM-DD HH:MM:SS][name]:text\n`.
pub fn assert_chat_line(line: &str, name: &str, text: &str) {
    let stamp = &line[1..20];
    assert!(line.starts_with('['), "bad line {line:?}");
    assert!(
        chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").is_ok(),
        "bad timestamp in {line:?}"
    );
    assert_eq!(&line[20..], format!("][{name}]:{text}\n"));
}
