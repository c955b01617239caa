//! Chat client connection.
//!
//! The client is a thin relay between the terminal and the server:
//! - every chunk from the server is copied to the output as-is
//! - every input line is sent to the server, newline-terminated
//!
//! The server drives the conversation (banner, name prompt, chat lines), so
//! the client needs no protocol knowledge of its own.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ClientError, Result};

/// Size of the buffer used for reads from the server.
const READ_BUFFER_SIZE: usize = 1024;

/// Why the client stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The server closed the connection
    ServerClosed,
    /// The input stream ended
    InputClosed,
    /// Cancelled locally (e.g. Ctrl+C)
    Cancelled,
}

/// A connected chat client.
pub struct ChatClient<S = TcpStream> {
    stream: S,
}

impl ChatClient<TcpStream> {
    /// Connects to the server at `address`.
    ///
    /// # Errors
    ///
    /// - `ClientError::Connect` if the TCP connection cannot be established
    pub async fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| ClientError::Connect {
                address: address.to_string(),
                error: e.to_string(),
            })?;

        info!(address = %address, "Connected to chat server");
        Ok(Self::from_stream(stream))
    }
}

impl<S> ChatClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already connected stream.
    pub fn from_stream(stream: S) -> Self {
        Self { stream }
    }

    /// Relays between `input`/`output` and the server until one side ends.
    pub async fn run<I, O>(self, input: I, output: O, cancel: CancellationToken) -> Result<ExitReason>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let (reader, writer) = tokio::io::split(self.stream);

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Client cancelled");
                Ok(ExitReason::Cancelled)
            }
            result = receive(reader, output) => result.map(|()| ExitReason::ServerClosed),
            result = transmit(input, writer) => result.map(|()| ExitReason::InputClosed),
        }
    }
}

/// Copies server output until the connection closes.
async fn receive<R, O>(mut reader: R, mut output: O) -> Result<()>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            debug!("Server closed the connection");
            return Ok(());
        }
        output.write_all(buf.get(..n).unwrap_or_default()).await?;
        output.flush().await?;
    }
}

/// Sends input lines until the input ends.
async fn transmit<I, W>(input: I, mut writer: W) -> Result<()>
where
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    debug!("Input closed");
    Ok(())
}
