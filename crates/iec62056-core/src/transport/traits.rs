//! Transport layer abstraction.
//!
//! Defines the `Transport` trait for raw byte exchange with a meter,
//! allowing different implementations (serial, TCP, mock).

use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{0} is closed")]
    NotOpen(&'static str),

    #[error("Failed to connect: {0}")]
    ConnectFailed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Read in {transport} timed out after {timeout_ms}ms")]
    Timeout { transport: String, timeout_ms: u64 },

    #[error("Block rejected {retries} times, giving up")]
    RetriesExhausted { retries: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True for the application-level deadline expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

/// Point-to-point byte transport to a meter.
///
/// Implementations own exactly one underlying resource, or none while
/// closed. Every operation on a closed transport fails with
/// [`TransportError::NotOpen`], except `switch_baudrate` where the
/// transport has no notion of baud rate.
///
/// The `Display` output identifies the transport in logs.
pub trait Transport: fmt::Display {
    /// Open the underlying resource, replacing any open one.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Close and release the underlying resource.
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Write all of `data`, blocking until it is flushed.
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read up to `max_len` bytes.
    ///
    /// Returns an empty buffer when the resource-level timeout expires or the
    /// peer closed the stream; callers enforce their own deadline.
    fn recv(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Reopen the link at a new baud rate.
    fn switch_baudrate(&mut self, baud: u32) -> Result<(), TransportError>;

    /// Whether a resource is currently open.
    fn is_connected(&self) -> bool;

    /// Application-level timeout used by reads without an override.
    fn timeout(&self) -> Duration;

    /// Whether the higher layer must put a device address in its requests.
    fn requires_address(&self) -> bool {
        true
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        (**self).disconnect()
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).send(data)
    }

    fn recv(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        (**self).recv(max_len)
    }

    fn switch_baudrate(&mut self, baud: u32) -> Result<(), TransportError> {
        (**self).switch_baudrate(baud)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }

    fn requires_address(&self) -> bool {
        (**self).requires_address()
    }
}

/// Map resource-level read timeouts to "no data" instead of an error.
pub(crate) fn is_idle_read(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
    )
}
