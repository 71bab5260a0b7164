//! Link - blocking read/write over one transport.
//!
//! [`Link::read`] drives the block framing state machine: it pulls single
//! bytes from the transport, validates each block's BCC, answers with
//! ACK/NACK and returns one reassembled message.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use crate::events::{LinkEvent, LinkObserver, PacketDirection, TracingObserver};
use crate::framing::{BlockAssembler, DelimiterMatcher, Disposition, MessageAssembler, RawBlock};
use crate::protocol::constants::{ACK, IDLE_POLL_INTERVAL, NACK};
use crate::transport::{Transport, TransportError};

/// A transport plus the framing logic and an observer.
///
/// Not `Sync`: callers serialize access to one meter session.
pub struct Link<T: Transport, O: LinkObserver = TracingObserver> {
    transport: T,
    observer: Arc<O>,
    max_nack_retries: Option<u32>,
}

impl<T: Transport> Link<T, TracingObserver> {
    /// Create a link with the default tracing observer.
    pub fn new(transport: T) -> Self {
        Self::with_observer(transport, Arc::new(TracingObserver))
    }
}

impl<T: Transport, O: LinkObserver + 'static> Link<T, O> {
    /// Create a link with a custom observer.
    pub fn with_observer(transport: T, observer: Arc<O>) -> Self {
        Self {
            transport,
            observer,
            max_nack_retries: None,
        }
    }

    /// Limit consecutive NACKs for one block. `None` retries forever.
    pub fn with_max_nack_retries(mut self, max: Option<u32>) -> Self {
        self.max_nack_retries = max;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    pub fn requires_address(&self) -> bool {
        self.transport.requires_address()
    }

    fn emit(&self, event: LinkEvent) {
        self.observer.on_event(&event);
    }

    fn packet(&self, direction: PacketDirection, data: &[u8]) {
        self.emit(LinkEvent::Packet {
            direction,
            transport: self.transport.to_string(),
            data: data.to_vec(),
        });
    }

    pub fn connect(&mut self) -> Result<(), TransportError> {
        self.transport.connect()?;
        self.emit(LinkEvent::Connected {
            transport: self.transport.to_string(),
        });
        Ok(())
    }

    pub fn disconnect(&mut self) -> Result<(), TransportError> {
        self.transport.disconnect()?;
        self.emit(LinkEvent::Disconnected {
            transport: self.transport.to_string(),
        });
        Ok(())
    }

    /// Send raw bytes.
    pub fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.transport.send(data)?;
        self.packet(PacketDirection::Tx, data);
        Ok(())
    }

    /// Reopen the link at `baud`. A no-op on transports without a baud rate.
    pub fn switch_baudrate(&mut self, baud: u32) -> Result<(), TransportError> {
        self.transport.switch_baudrate(baud)?;
        self.emit(LinkEvent::BaudrateSwitched {
            transport: self.transport.to_string(),
            baud,
        });
        Ok(())
    }

    /// Read one logical message.
    ///
    /// A message opened by SOH is returned as received. Otherwise blocks are
    /// BCC-checked, NACKed until valid, ACKed while EOT-terminated, and
    /// joined; a multi-block result carries a BCC computed over the whole
    /// message. Each block must complete within `timeout` (or the
    /// transport's timeout); on expiry nothing is returned.
    #[instrument(level = "debug", skip(self))]
    pub fn read(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, TransportError> {
        let timeout = timeout.unwrap_or_else(|| self.transport.timeout());
        let mut message = MessageAssembler::new();
        let mut rejected = 0u32;

        loop {
            let block = self.read_block(timeout)?;
            self.packet(PacketDirection::Rx, block.as_bytes());

            match message.accept(block) {
                Disposition::Complete(data) => {
                    self.emit(LinkEvent::BlockAccepted {
                        block: message.blocks(),
                        len: data.len(),
                        last: true,
                    });
                    debug!(blocks = message.blocks(), len = data.len(), "Message complete");
                    return Ok(data);
                }
                Disposition::NextBlock => {
                    rejected = 0;
                    self.emit(LinkEvent::BlockAccepted {
                        block: message.blocks(),
                        len: message.message().len(),
                        last: false,
                    });
                    self.send(&[ACK])?;
                }
                Disposition::Retransmit => {
                    rejected += 1;
                    if let Some(max) = self.max_nack_retries
                        && rejected > max
                    {
                        return Err(TransportError::RetriesExhausted { retries: max });
                    }
                    self.emit(LinkEvent::ChecksumMismatch {
                        block: message.blocks() + 1,
                        attempt: rejected,
                    });
                    self.send(&[NACK])?;
                }
            }
        }
    }

    /// Read from the first `start` byte through the next `end` byte.
    ///
    /// No BCC and no block handling. Bytes before `start` are discarded and
    /// nothing after `end` is consumed.
    #[instrument(level = "debug", skip(self))]
    pub fn simple_read(
        &mut self,
        start: u8,
        end: u8,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, TransportError> {
        let timeout = timeout.unwrap_or_else(|| self.transport.timeout());
        let mut matcher = DelimiterMatcher::new(start, end);
        let data = self.poll_bytes(timeout, |b| matcher.push(b))?;
        self.packet(PacketDirection::Rx, &data);
        Ok(data)
    }

    fn read_block(&mut self, timeout: Duration) -> Result<RawBlock, TransportError> {
        let mut assembler = BlockAssembler::new();
        self.poll_bytes(timeout, |b| assembler.push(b))
    }

    /// Feed single bytes from the transport into `step` until it yields,
    /// failing once `timeout` has elapsed. Empty reads count as no progress.
    fn poll_bytes<R>(
        &mut self,
        timeout: Duration,
        mut step: impl FnMut(u8) -> Option<R>,
    ) -> Result<R, TransportError> {
        let started = Instant::now();
        loop {
            let elapsed = started.elapsed();
            if elapsed > timeout {
                let transport = self.transport.to_string();
                self.emit(LinkEvent::Timeout {
                    transport: transport.clone(),
                });
                return Err(TransportError::Timeout {
                    transport,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            let bytes = self.transport.recv(1)?;
            if bytes.is_empty() {
                thread::sleep(IDLE_POLL_INTERVAL.min(timeout - elapsed));
                continue;
            }
            for b in bytes {
                if let Some(out) = step(b) {
                    return Ok(out);
                }
            }
        }
    }
}
