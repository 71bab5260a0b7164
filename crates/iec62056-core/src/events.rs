//! Event system for link observability.
//!
//! Raw frame logging is a side effect only: swapping the observer never
//! changes what goes over the wire.

use std::fmt;

/// Frame direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Tx, // Host -> Meter
    Rx, // Meter -> Host
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketDirection::Tx => write!(f, "TX"),
            PacketDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Events emitted by a [`Link`](crate::link::Link).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Transport opened.
    Connected { transport: String },
    /// Transport closed.
    Disconnected { transport: String },
    /// Raw bytes sent, or a raw frame received.
    Packet {
        direction: PacketDirection,
        transport: String,
        data: Vec<u8>,
    },
    /// A block failed its BCC and was NACKed.
    ChecksumMismatch { block: usize, attempt: u32 },
    /// A block passed its BCC and was appended to the message.
    BlockAccepted { block: usize, len: usize, last: bool },
    /// Serial link reopened at a new baud rate.
    BaudrateSwitched { transport: String, baud: u32 },
    /// Application-level deadline expired.
    Timeout { transport: String },
}

/// Observer trait for receiving link events.
pub trait LinkObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &LinkEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl LinkObserver for NullObserver {
    fn on_event(&self, _event: &LinkEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl LinkObserver for TracingObserver {
    fn on_event(&self, event: &LinkEvent) {
        match event {
            LinkEvent::Connected { transport } => {
                tracing::info!(transport = %transport, "Connected");
            }
            LinkEvent::Disconnected { transport } => {
                tracing::info!(transport = %transport, "Disconnected");
            }
            LinkEvent::Packet {
                direction,
                transport,
                data,
            } => {
                tracing::debug!(
                    dir = %direction,
                    transport = %transport,
                    len = data.len(),
                    data = %data.escape_ascii(),
                    "Frame"
                );
            }
            LinkEvent::ChecksumMismatch { block, attempt } => {
                tracing::warn!(block, attempt, "BCC mismatch, sent NACK");
            }
            LinkEvent::BlockAccepted { block, len, last } => {
                tracing::trace!(block, len, last, "Block accepted");
            }
            LinkEvent::BaudrateSwitched { transport, baud } => {
                tracing::info!(transport = %transport, baud, "Baudrate switched");
            }
            LinkEvent::Timeout { transport } => {
                tracing::warn!(transport = %transport, "Read timed out");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Observer that records every event for assertions.
    #[derive(Default)]
    pub struct RecordingObserver {
        pub events: Mutex<Vec<LinkEvent>>,
    }

    impl RecordingObserver {
        pub fn take(&self) -> Vec<LinkEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl LinkObserver for RecordingObserver {
        fn on_event(&self, event: &LinkEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_display() {
        assert_eq!(PacketDirection::Tx.to_string(), "TX");
        assert_eq!(PacketDirection::Rx.to_string(), "RX");
    }

    #[test]
    fn test_observers_accept_all_events() {
        let events = [
            LinkEvent::Connected { transport: "t".into() },
            LinkEvent::Packet {
                direction: PacketDirection::Rx,
                transport: "t".into(),
                data: vec![0x02, b'A', 0x03, 0x42],
            },
            LinkEvent::ChecksumMismatch { block: 1, attempt: 1 },
            LinkEvent::Timeout { transport: "t".into() },
        ];
        for e in &events {
            NullObserver.on_event(e);
            TracingObserver.on_event(e);
        }
    }
}
