//! Transport layer module.

pub mod mock;
pub mod serial;
pub mod tcp;
pub mod traits;

pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use tcp::TcpTransport;
pub use traits::{Transport, TransportError};
