//! IEC62056-Core: IEC 62056-21 transport and link framing in Rust.
//!
//! This crate moves raw bytes between a client and a utility meter over a
//! serial port or a TCP stream, and reassembles the protocol's framed,
//! BCC-checked blocks into complete messages.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Control characters, link defaults, BCC
//! - **Transport**: Byte transport abstraction (serial, TCP, mock)
//! - **Framing**: Block state machine and message reassembly
//! - **Events**: Observer pattern for frame logging
//! - **Link**: Blocking read/write facade over one transport
//! - **Config**: TOML link configuration
//!
//! # Example
//!
//! ```no_run
//! use iec62056_core::{Link, SerialTransport};
//!
//! let mut link = Link::new(SerialTransport::new("/dev/ttyUSB0"));
//! link.connect()?;
//! link.send(b"/?!\r\n")?;
//! let ident = link.simple_read(b'/', b'\n', None)?;
//! // ... option select and baud switch belong to the caller ...
//! link.switch_baudrate(9600)?;
//! let readout = link.read(None)?;
//! # Ok::<(), iec62056_core::TransportError>(())
//! ```

pub mod config;
pub mod events;
pub mod framing;
pub mod link;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use config::{LinkConfig, TransportConfig};
pub use events::{LinkEvent, LinkObserver, NullObserver, PacketDirection, TracingObserver};
pub use framing::{BlockAssembler, BlockState, Disposition, MessageAssembler, RawBlock};
pub use link::Link;
pub use transport::{MockTransport, SerialTransport, TcpTransport, Transport, TransportError};
