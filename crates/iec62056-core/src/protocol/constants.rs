//! Protocol constants from IEC 62056-21.
//!
//! Control characters, block delimiters and link defaults.

use std::time::Duration;

// ============================================================================
// Control Characters
// ============================================================================

/// Start of header. Opens a command message (e.g. password challenge).
pub const SOH: u8 = 0x01;

/// Start of text. Opens a data block.
pub const STX: u8 = 0x02;

/// End of text. Closes the final (or only) block of a message.
pub const ETX: u8 = 0x03;

/// End of transmission. Closes a partial block; more blocks follow.
pub const EOT: u8 = 0x04;

/// Acknowledge. Requests the next partial block.
pub const ACK: u8 = 0x06;

/// Negative acknowledge. Requests retransmission of the current block.
pub const NACK: u8 = 0x15;

/// Bytes that open a framed block.
pub const START_CHARS: &[u8] = &[SOH, STX];

/// Bytes that close a framed block.
pub const END_CHARS: &[u8] = &[ETX, EOT];

/// Line terminator inserted where a partial block's EOT and BCC are removed.
pub const LINE_END: &[u8] = b"\r\n";

/// Mask applied to every byte of the BCC (the link is 7E1).
pub const BCC_MASK: u8 = 0x7F;

// ============================================================================
// Link Defaults
// ============================================================================

/// Initial baud rate mandated for the opening message exchange.
pub const DEFAULT_BAUD_RATE: u32 = 300;

/// Default application-level timeout for serial links.
pub const DEFAULT_SERIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default application-level timeout for TCP links.
pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between polls when the transport returned no bytes.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);
