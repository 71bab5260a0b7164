//! Mock transport for testing.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::{Transport, TransportError};

/// Scripted in-memory transport for unit testing the framing logic.
///
/// Clones share state, so a test can keep one handle while a `Link` owns
/// another.
#[derive(Clone)]
pub struct MockTransport {
    /// Bytes the "meter" will deliver, in order.
    rx_queue: Arc<Mutex<VecDeque<u8>>>,
    /// Captured writes.
    write_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Baud rates requested through `switch_baudrate`.
    baud_log: Arc<Mutex<Vec<u32>>>,
    /// Whether the transport is "open".
    connected: Arc<Mutex<bool>>,
    timeout: Duration,
    requires_address: bool,
}

impl MockTransport {
    /// New open transport with a 1 second timeout.
    pub fn new() -> Self {
        Self {
            rx_queue: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            baud_log: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
            timeout: Duration::from_secs(1),
            requires_address: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_requires_address(mut self, requires_address: bool) -> Self {
        self.requires_address = requires_address;
        self
    }

    /// Queue bytes to be returned by subsequent reads.
    pub fn queue_rx(&self, data: &[u8]) {
        self.rx_queue.lock().unwrap().extend(data.iter().copied());
    }

    /// Bytes not yet consumed by reads.
    pub fn remaining_rx(&self) -> Vec<u8> {
        self.rx_queue.lock().unwrap().iter().copied().collect()
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.write_log.lock().unwrap().clone()
    }

    /// Clear captured writes.
    pub fn clear_writes(&self) {
        self.write_log.lock().unwrap().clear();
    }

    /// Baud rates requested so far.
    pub fn get_baud_switches(&self) -> Vec<u32> {
        self.baud_log.lock().unwrap().clone()
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if *self.connected.lock().unwrap() {
            Ok(())
        } else {
            Err(TransportError::NotOpen("Mock transport"))
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        *self.connected.lock().unwrap() = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.ensure_open()?;
        *self.connected.lock().unwrap() = false;
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.write_log.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    /// Pops up to `max_len` queued bytes; an empty queue reads as idle.
    fn recv(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        self.ensure_open()?;
        let mut queue = self.rx_queue.lock().unwrap();
        let n = max_len.min(queue.len());
        Ok(queue.drain(..n).collect())
    }

    fn switch_baudrate(&mut self, baud: u32) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.baud_log.lock().unwrap().push(baud);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn requires_address(&self) -> bool {
        self.requires_address
    }
}

impl fmt::Display for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockTransport(timeout={:?})", self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_rx_queue() {
        let mut mock = MockTransport::new();
        mock.queue_rx(b"ab");
        mock.queue_rx(b"c");

        assert_eq!(mock.recv(1).unwrap(), b"a");
        assert_eq!(mock.recv(5).unwrap(), b"bc");

        // Queue is empty now, reads as idle
        assert!(mock.recv(1).unwrap().is_empty());
    }

    #[test]
    fn test_mock_write_capture() {
        let mut mock = MockTransport::new();
        let handle = mock.clone();
        mock.send(b"Hello").unwrap();
        mock.send(b"World").unwrap();

        let writes = handle.get_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], b"Hello");
        assert_eq!(writes[1], b"World");

        handle.clear_writes();
        assert!(mock.get_writes().is_empty());
    }

    #[test]
    fn test_mock_disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.disconnect().unwrap();
        assert!(!mock.is_connected());
        assert!(mock.send(b"test").is_err());
        assert!(mock.recv(1).is_err());
        assert!(mock.disconnect().is_err());

        mock.connect().unwrap();
        assert!(mock.send(b"test").is_ok());
    }
}
