//! TCP transport and response framing
//!
//! One [`Connection`] per session. Requests go out as a single write with no
//! framing of their own. Responses are framed by the terminator byte: the
//! connection accumulates socket reads until the first `\n` arrives, then
//! hands back the entire buffer, terminator and any trailing bytes included.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;
use thiserror::Error;

use crate::protocol::RESPONSE_TERMINATOR;

/// Upper bound on one accumulated response (10MB to prevent memory
/// exhaustion by a runaway peer).
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Bytes requested from the socket per read.
const READ_CHUNK_SIZE: usize = 1024;

/// Errors raised by the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP connection could not be established
    #[error("failed to connect to {addr}: {source}")]
    ConnectionFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Peer closed the stream before a complete response arrived
    #[error("peer closed the connection before completing a response")]
    PeerClosed,

    /// Response kept growing past the size bound without a terminator
    #[error("response exceeded {max} bytes without a terminator", max = MAX_RESPONSE_SIZE)]
    ResponseTooLarge,

    /// Read timed out waiting for the peer
    #[error("timed out waiting for the peer to respond")]
    TimedOut,

    /// Other socket I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One TCP connection to a peer.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: String,
}

impl Connection {
    /// Connect to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectionFailed` when the TCP connection
    /// cannot be established.
    pub fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", host, port);
        let stream =
            TcpStream::connect(addr.as_str()).map_err(|e| TransportError::ConnectionFailed {
                addr: addr.clone(),
                source: e,
            })?;
        Ok(Self { stream, peer: addr })
    }

    /// Address of the peer this connection talks to.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Apply a socket read timeout. `None` blocks indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send one encoded request.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read one response frame.
    ///
    /// Accumulates socket reads, scanning each newly arrived chunk for the
    /// terminator; on a hit the whole buffer is returned. A clean close
    /// before the terminator is `PeerClosed`.
    pub fn read_response(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = match self.stream.read(&mut chunk) {
                Ok(0) => return Err(TransportError::PeerClosed),
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TransportError::TimedOut);
                }
                Err(e) => return Err(e.into()),
            };

            let complete = chunk[..n].contains(&RESPONSE_TERMINATOR);
            buffer.extend_from_slice(&chunk[..n]);
            if complete {
                return Ok(buffer);
            }
            if buffer.len() > MAX_RESPONSE_SIZE {
                return Err(TransportError::ResponseTooLarge);
            }
        }
    }

    /// Shut the connection down after a terminating command.
    pub fn shutdown(self) -> Result<(), TransportError> {
        self.stream.shutdown(Shutdown::Both)?;
        Ok(())
    }
}
