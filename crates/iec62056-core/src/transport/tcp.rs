//! TCP/IP transport for meters behind terminal servers or IP modems.

use std::fmt;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info, instrument};

use super::traits::{Transport, TransportError, is_idle_read};
use crate::protocol::constants::DEFAULT_TCP_TIMEOUT;

/// Blocking TCP transport.
#[derive(Debug)]
pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create a closed transport for `host:port` with the default timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_timeout(host, port, DEFAULT_TCP_TIMEOUT)
    }

    pub fn with_timeout(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            stream: None,
        }
    }

    /// Parse a `host:port` string.
    pub fn from_address(address: &str, timeout: Duration) -> Result<Self, TransportError> {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| TransportError::InvalidAddress(address.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| TransportError::InvalidAddress(address.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(TransportError::InvalidAddress(address.to_string()));
        }
        Ok(Self::with_timeout(host, port, timeout))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, TransportError> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::ConnectFailed(format!("{}: {}", self.address(), e)))?
            .collect();
        if addrs.is_empty() {
            return Err(TransportError::InvalidAddress(self.address()));
        }
        Ok(addrs)
    }

    fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::NotOpen("Socket"))
    }
}

impl Transport for TcpTransport {
    #[instrument(level = "info", skip(self), fields(address = %self.address()))]
    fn connect(&mut self) -> Result<(), TransportError> {
        let mut last_err = None;
        for addr in self.resolve()? {
            debug!(%addr, "Connecting");
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    stream.set_nodelay(true)?;
                    self.stream = Some(stream);
                    info!(%addr, "Socket connected");
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(TransportError::ConnectFailed(match last_err {
            Some(e) => format!("{}: {}", self.address(), e),
            None => self.address(),
        }))
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        let stream = self.stream.take().ok_or(TransportError::NotOpen("Socket"))?;
        // The peer may already have gone away; the socket is dropped either way.
        let _ = stream.shutdown(Shutdown::Both);
        info!(address = %self.address(), "Socket closed");
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream_mut()?
            .write_all(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    fn recv(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream_mut()?;
        let mut buf = vec![0u8; max_len];
        let n = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) if is_idle_read(&e) => 0,
            Err(e) => return Err(TransportError::ReadFailed(e.to_string())),
        };
        buf.truncate(n);
        Ok(buf)
    }

    /// Baud rate has no meaning on a byte stream.
    fn switch_baudrate(&mut self, baud: u32) -> Result<(), TransportError> {
        debug!(baud, "Ignoring baudrate switch on TCP transport");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Display for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TcpTransport(address={:?}, timeout={:?})",
            self.address(),
            self.timeout
        )
    }
}
