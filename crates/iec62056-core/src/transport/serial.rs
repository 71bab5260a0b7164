//! Serial port transport for optical probes and RS-232 converters.

use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info, instrument};

use super::traits::{Transport, TransportError, is_idle_read};
use crate::protocol::constants::{DEFAULT_BAUD_RATE, DEFAULT_SERIAL_TIMEOUT};

/// Serial transport opened with the fixed 7E1 framing of the protocol.
pub struct SerialTransport {
    port_name: String,
    timeout: Duration,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Create a closed transport for `port_name` with the default timeout.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self::with_timeout(port_name, DEFAULT_SERIAL_TIMEOUT)
    }

    pub fn with_timeout(port_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            port_name: port_name.into(),
            timeout,
            baud_rate: DEFAULT_BAUD_RATE,
            port: None,
        }
    }

    /// Set the baud rate used by the next `connect`.
    pub fn initial_baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Baud rate of the open port, or the one the next `connect` will use.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Open the port at `baud`.
    #[instrument(level = "info", skip(self), fields(port = %self.port_name))]
    pub fn connect_at(&mut self, baud: u32) -> Result<(), TransportError> {
        let port = self.open_port(baud)?;
        self.port = Some(port);
        self.baud_rate = baud;
        info!(baud, "Serial port opened");
        Ok(())
    }

    fn open_port(&self, baud: u32) -> Result<Box<dyn SerialPort>, TransportError> {
        serialport::new(&self.port_name, baud)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .data_bits(DataBits::Seven)
            .flow_control(FlowControl::None)
            .timeout(self.timeout / 2)
            .open()
            .map_err(|e| TransportError::ConnectFailed(format!("{}: {}", self.port_name, e)))
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port
            .as_mut()
            .ok_or(TransportError::NotOpen("Serial port"))
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.connect_at(self.baud_rate)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if self.port.take().is_none() {
            return Err(TransportError::NotOpen("Serial port"));
        }
        info!(port = %self.port_name, "Serial port closed");
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port_mut()?;
        port.write_all(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        port.flush()
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn recv(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let port = self.port_mut()?;
        let mut buf = vec![0u8; max_len];
        let n = match port.read(&mut buf) {
            Ok(n) => n,
            Err(e) if is_idle_read(&e) => 0,
            Err(e) => return Err(TransportError::ReadFailed(e.to_string())),
        };
        buf.truncate(n);
        Ok(buf)
    }

    /// Drop the current port and open a fresh one at `baud`.
    fn switch_baudrate(&mut self, baud: u32) -> Result<(), TransportError> {
        if self.port.is_none() {
            return Err(TransportError::NotOpen("Serial port"));
        }
        info!(from = self.baud_rate, to = baud, "Switching baudrate");
        // The device node can only be held once, release before reopening.
        self.port = None;
        let port = self.open_port(baud)?;
        self.port = Some(port);
        self.baud_rate = baud;
        debug!(port = %self.port_name, baud, "Serial port reopened");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn requires_address(&self) -> bool {
        false
    }
}

impl fmt::Display for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerialTransport(port={:?}, timeout={:?})",
            self.port_name, self.timeout
        )
    }
}

impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port_name", &self.port_name)
            .field("timeout", &self.timeout)
            .field("baud_rate", &self.baud_rate)
            .field("open", &self.port.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING_PORT: &str = "/dev/iec62056-no-such-port";

    #[test]
    fn test_closed_port_operations_fail() {
        let mut t = SerialTransport::new(MISSING_PORT);
        assert!(!t.is_connected());
        assert!(matches!(t.send(b"/?!\r\n"), Err(TransportError::NotOpen(_))));
        assert!(matches!(t.recv(1), Err(TransportError::NotOpen(_))));
        assert!(matches!(t.disconnect(), Err(TransportError::NotOpen(_))));
        assert!(matches!(
            t.switch_baudrate(9600),
            Err(TransportError::NotOpen(_))
        ));
    }

    #[test]
    fn test_connect_missing_port_fails() {
        let mut t = SerialTransport::new(MISSING_PORT);
        assert!(matches!(t.connect(), Err(TransportError::ConnectFailed(_))));
        assert!(!t.is_connected());
    }

    #[test]
    fn test_defaults() {
        let t = SerialTransport::new("/dev/ttyUSB0");
        assert_eq!(t.baud_rate(), 300);
        assert_eq!(t.timeout(), Duration::from_secs(10));
        assert!(!t.requires_address());

        let t = SerialTransport::new("/dev/ttyUSB0").initial_baud_rate(9600);
        assert_eq!(t.baud_rate(), 9600);
    }

    #[test]
    fn test_display() {
        let t = SerialTransport::with_timeout("/dev/ttyUSB0", Duration::from_secs(5));
        assert_eq!(
            t.to_string(),
            "SerialTransport(port=\"/dev/ttyUSB0\", timeout=5s)"
        );
    }
}
