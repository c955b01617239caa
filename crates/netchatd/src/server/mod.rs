//! TCP server for the chat relay.
//!
//! The server:
//! - Listens on one TCP address
//! - Refuses connections once the registry is at its ceiling
//! - Spawns a ConnectionHandler for each admitted client
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept() + try_reserve()
//!         ├──────────────▶ "Chatroom is full" + close
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionHandler│────▶│    Registry     │
//! │   (per client)  │     │                 │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and allow continued operation

mod connection;

pub use connection::{CloseReason, ConnectionError, ConnectionHandler, ConnectionState};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use netchat_core::ConnectionId;
use netchat_protocol::ServerMessage;

use crate::config::ServerConfig;
use crate::registry::{Registry, RegistryError};

/// TCP chat server.
pub struct ChatServer {
    listener: TcpListener,
    config: ServerConfig,
    registry: Arc<Registry>,
    cancel_token: CancellationToken,
    connection_counter: AtomicU64,
}

impl ChatServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if the configuration is invalid
    /// - `ServerError::Bind` if the address cannot be bound
    pub async fn bind(
        config: ServerConfig,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let listener = TcpListener::bind(&config.address)
            .await
            .map_err(|e| ServerError::Bind {
                address: config.address.clone(),
                error: e.to_string(),
            })?;

        Ok(Self {
            listener,
            registry: Registry::new(config.max_connections),
            config,
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Bind {
                address: self.config.address.clone(),
                error: e.to_string(),
            })
    }

    /// Returns the shared registry.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Runs the accept loop.
    ///
    /// Returns after the cancellation token fires and every connection has
    /// gone through its cleanup.
    pub async fn run(self) -> Result<(), ServerError> {
        match self.listener.local_addr() {
            Ok(addr) => info!(
                address = %addr,
                max_connections = self.config.max_connections,
                "Chat server listening"
            ),
            Err(e) => warn!(error = %e, "Chat server listening on unknown address"),
        }

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.admit(stream, peer, &mut connections).await,
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Continue accepting other connections
                        }
                    }
                }

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Connection task failed");
                    }
                }
            }
        }

        // Handlers observe the same token; wait for their cleanup.
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Connection task failed during shutdown");
            }
        }

        info!("Server stopped");
        Ok(())
    }

    /// Admits or refuses a freshly accepted connection.
    async fn admit(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        connections: &mut JoinSet<CloseReason>,
    ) {
        let id = ConnectionId::new(self.connection_counter.fetch_add(1, Ordering::Relaxed));

        match self.registry.try_reserve(id) {
            Ok(slot) => {
                debug!(connection = %id, peer = %peer, "Connection admitted");
                let handler = ConnectionHandler::new(
                    stream,
                    peer,
                    slot,
                    self.config.outbound_queue_capacity,
                    self.cancel_token.clone(),
                );
                connections.spawn(handler.run());
            }
            Err(RegistryError::RoomFull { max }) => {
                info!(connection = %id, peer = %peer, max, "Chatroom full, refusing connection");
                refuse(stream).await;
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "Unexpected admission error");
                refuse(stream).await;
            }
        }
    }
}

/// Tells a client the room is full and closes the socket.
async fn refuse(mut stream: TcpStream) {
    let result = async {
        stream
            .write_all(ServerMessage::RoomFull.to_wire().as_bytes())
            .await?;
        stream.shutdown().await
    }
    .await;

    if let Err(e) = result {
        debug!(error = %e, "Failed to send room-full notice");
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {address}: {error}")]
    Bind { address: String, error: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}
