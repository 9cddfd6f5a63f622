//! Client session
//!
//! A [`Session`] owns the connection and the dispatcher and exposes one
//! operation: handle a line of operator input. Each non-empty line is one
//! strict round trip, send then read then dispatch, except a terminating
//! command, which is sent and followed by connection shutdown with no read.

use std::io::Write;
use thiserror::Error;

use crate::command::Command;
use crate::dispatch::{DispatchError, Dispatched, Dispatcher, ResponseMode};
use crate::protocol::{self, CommandMessage, ProtocolError};
use crate::transport::{Connection, TransportError};

/// Errors raised while handling a line
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport failure during send, read, or shutdown
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Wire codec failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Dispatch failure
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A line arrived after the session was terminated
    #[error("session already closed")]
    SessionClosed,
}

impl SessionError {
    /// Whether the session must end. Only a failed download write leaves it
    /// usable.
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::Dispatch(e) => e.is_fatal(),
            _ => true,
        }
    }
}

/// What handling one line did.
#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank line; nothing was sent.
    Empty,
    /// Round trip completed and the response dispatched.
    Completed(Dispatched),
    /// Terminating command sent and the connection shut down.
    Terminated,
}

/// One client session over one connection.
pub struct Session<W: Write> {
    connection: Option<Connection>,
    dispatcher: Dispatcher<W>,
}

impl<W: Write> Session<W> {
    pub fn new(connection: Connection, dispatcher: Dispatcher<W>) -> Self {
        Self {
            connection: Some(connection),
            dispatcher,
        }
    }

    /// Whether the session can still take lines.
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Handle one line of operator input.
    pub fn handle_line(&mut self, line: &str) -> Result<LineOutcome, SessionError> {
        match Command::parse(line) {
            Some(command) => self.run(&command),
            None => Ok(LineOutcome::Empty),
        }
    }

    /// Send one command through its round trip.
    ///
    /// # Errors
    ///
    /// `SessionError::is_fatal` separates errors that end the session from
    /// the one kind that does not (a failed download write).
    pub fn run(&mut self, command: &Command) -> Result<LineOutcome, SessionError> {
        let message = CommandMessage::from(command);
        let bytes = protocol::encode_command(&message)?;

        if command.terminate {
            let mut connection = self.connection.take().ok_or(SessionError::SessionClosed)?;
            connection.send(&bytes)?;
            connection.shutdown()?;
            return Ok(LineOutcome::Terminated);
        }

        let connection = self.connection.as_mut().ok_or(SessionError::SessionClosed)?;
        connection.send(&bytes)?;
        let buffer = connection.read_response()?;
        let response = protocol::decode_response(&buffer)?;
        let mode = ResponseMode::for_command(command);
        let outcome = self.dispatcher.dispatch(mode, &response)?;
        Ok(LineOutcome::Completed(outcome))
    }
}
