//! Destinations for serialized frames.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::{Mutex, PoisonError};

use log::info;
use thiserror::Error;

use crate::serializer::SerializationError;

/// Error types that can occur during data transport (sending).
#[derive(Error, Debug)]
pub enum TransportError {
    /// An I/O error occurred (e.g., writing to a file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// An error occurred during serialization before sending.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
    /// A WebSocket-specific error occurred (e.g., connection failure).
    #[error("WebSocket error: {0}")]
    WebSocket(String),
    /// An error occurred due to invalid transport configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Sends serialized data to a destination.
pub trait Sender: Send + Sync {
    fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Flushes any internal buffers. May be a no-op.
    fn flush(&self) -> Result<(), TransportError>;

    /// Number of connected consumers, where the sender has such a notion.
    fn client_count(&self) -> Option<usize> {
        None
    }
}

/// Writes one frame per line to standard output.
pub struct StdioSender {
    stdout: io::Stdout,
}

impl StdioSender {
    pub fn new() -> Self {
        StdioSender { stdout: io::stdout() }
    }
}

impl Default for StdioSender {
    fn default() -> Self {
        Self::new()
    }
}

impl Sender for StdioSender {
    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut out = self.stdout.lock();
        out.write_all(data)?;
        out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        self.stdout.lock().flush()?;
        Ok(())
    }
}

/// Appends one frame per line to a file.
pub struct FileSender {
    file: Mutex<BufWriter<File>>,
}

impl FileSender {
    /// Creates the file, truncating any previous content.
    pub fn new(file_path: &str) -> Result<Self, TransportError> {
        let file = File::create(file_path)?;
        info!("Initialized FileSender for path: {}", file_path);
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl Sender for FileSender {
    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(data)?;
        file.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.flush()?;
        Ok(())
    }
}

impl Drop for FileSender {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// A sender that discards everything. Useful for disabling output.
pub struct NullSender;

impl Sender for NullSender {
    fn send(&self, _data: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
