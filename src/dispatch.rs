//! Response dispatch
//!
//! Every peer response lands in exactly one of three outcomes: text printed
//! to the operator stream, a file saved under the download directory, or a
//! peer-reported failure printed to the operator stream. Which of the first
//! two applies is fixed by the command that was sent, never by inspecting
//! the response.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

use crate::command::Command;
use crate::protocol::{decode_payload, ProtocolError, ResponseMessage};

/// How a successful response is rendered. Selected once from the command,
/// before its response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Payload is UTF-8 text for the operator stream.
    Display,
    /// Payload is file content to save locally.
    Download,
}

impl ResponseMode {
    pub fn for_command(command: &Command) -> Self {
        if command.is_download() {
            ResponseMode::Download
        } else {
            ResponseMode::Display
        }
    }
}

/// The one observable effect a dispatch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Text payload written to the operator stream.
    Text,
    /// Download saved locally.
    Saved { path: PathBuf, bytes: usize },
    /// Peer reported failure; its description was written to the operator
    /// stream.
    PeerError,
}

/// Errors raised while dispatching a response
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Response violated the protocol contract
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Download could not be written locally
    #[error("failed to write {}: {}", .path.display(), .source)]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Operator output stream failed
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl DispatchError {
    /// A failed download write leaves the session usable; everything else
    /// ends it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DispatchError::FileWrite { .. })
    }
}

/// Renders peer responses into operator-visible effects.
pub struct Dispatcher<W: Write> {
    output: W,
    download_dir: PathBuf,
}

impl<W: Write> Dispatcher<W> {
    /// Dispatcher printing to `output`, saving downloads into the process
    /// working directory.
    pub fn new(output: W) -> Self {
        Self {
            output,
            download_dir: PathBuf::from("."),
        }
    }

    /// Override where downloads are saved.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Apply one response under the given mode.
    ///
    /// # Errors
    ///
    /// Contract violations (missing fields, bad base64, non-UTF-8 display
    /// text) are fatal protocol errors; a failed download write is the one
    /// recoverable case.
    pub fn dispatch(
        &mut self,
        mode: ResponseMode,
        response: &ResponseMessage,
    ) -> Result<Dispatched, DispatchError> {
        if !response.success {
            return self.report_failure(response);
        }
        match mode {
            ResponseMode::Display => self.display(response),
            ResponseMode::Download => self.save(response),
        }
    }

    fn display(&mut self, response: &ResponseMessage) -> Result<Dispatched, DispatchError> {
        let payload = decode_payload(response)?;
        let text = String::from_utf8(payload).map_err(ProtocolError::from)?;
        writeln!(self.output, "{}", text)?;
        Ok(Dispatched::Text)
    }

    fn save(&mut self, response: &ResponseMessage) -> Result<Dispatched, DispatchError> {
        let payload = decode_payload(response)?;
        let name = response
            .file_name
            .as_deref()
            .ok_or(ProtocolError::MissingField("fileName"))?;
        let path = self.download_dir.join(sanitize_file_name(name));
        fs::write(&path, &payload).map_err(|e| DispatchError::FileWrite {
            path: path.clone(),
            source: e,
        })?;
        Ok(Dispatched::Saved {
            path,
            bytes: payload.len(),
        })
    }

    fn report_failure(&mut self, response: &ResponseMessage) -> Result<Dispatched, DispatchError> {
        let description = response
            .error_description
            .as_deref()
            .ok_or(ProtocolError::MissingField("errorDescription"))?;
        writeln!(self.output, "{}", description)?;
        Ok(Dispatched::PeerError)
    }
}

/// Flatten a peer-supplied file path into a single local name: every path
/// separator becomes `_`, so `/reports/jan.csv` lands as `_reports_jan.csv`.
/// Distinct peer paths can collide after flattening; the later download wins.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if std::path::is_separator(c) { '_' } else { c })
        .collect()
}
