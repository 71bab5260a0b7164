//! Byte-level block detection.
//!
//! [`BlockAssembler`] is fed one byte at a time and yields a [`RawBlock`]
//! once a start byte, an end byte and the trailing BCC have been seen.
//! [`DelimiterMatcher`] does the same for a single caller-chosen start/end
//! pair with no BCC.

use std::fmt;

use crate::protocol::bcc;
use crate::protocol::constants::{END_CHARS, EOT, SOH, START_CHARS};

/// Position within one framed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockState {
    /// Discarding bytes until SOH or STX.
    #[default]
    AwaitingStart,
    /// Collecting bytes until ETX or EOT.
    AwaitingEnd,
    /// Next byte is the BCC.
    ChecksumPending,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockState::AwaitingStart => write!(f, "AWAITING_START"),
            BlockState::AwaitingEnd => write!(f, "AWAITING_END"),
            BlockState::ChecksumPending => write!(f, "CHECKSUM_PENDING"),
        }
    }
}

/// One complete block: start byte through BCC, inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    bytes: Vec<u8>,
}

impl RawBlock {
    /// Wrap a frame already known to start with a start byte and end with
    /// end byte + BCC.
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() >= 3);
        Self { bytes }
    }

    /// The start byte that opened the block.
    pub fn start_char(&self) -> u8 {
        self.bytes[0]
    }

    /// The end byte that closed the block.
    pub fn end_char(&self) -> u8 {
        self.bytes[self.bytes.len() - 2]
    }

    /// Opened with SOH: a command message, passed through untouched.
    pub fn is_command(&self) -> bool {
        self.start_char() == SOH
    }

    /// Closed with EOT: more blocks follow.
    pub fn is_partial(&self) -> bool {
        self.end_char() == EOT
    }

    /// Whether the trailing BCC matches the block contents.
    pub fn bcc_valid(&self) -> bool {
        bcc::verify(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Incremental block detector.
#[derive(Debug, Default)]
pub struct BlockAssembler {
    state: BlockState,
    buf: Vec<u8>,
}

impl BlockAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Bytes collected for the block in progress.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Discard any partial block and wait for a new start byte.
    pub fn reset(&mut self) {
        self.state = BlockState::AwaitingStart;
        self.buf.clear();
    }

    /// Feed one byte. Returns the block once its BCC byte has arrived.
    pub fn push(&mut self, byte: u8) -> Option<RawBlock> {
        match self.state {
            BlockState::AwaitingStart => {
                if START_CHARS.contains(&byte) {
                    self.buf.push(byte);
                    self.state = BlockState::AwaitingEnd;
                }
                None
            }
            BlockState::AwaitingEnd => {
                self.buf.push(byte);
                if END_CHARS.contains(&byte) {
                    self.state = BlockState::ChecksumPending;
                }
                None
            }
            BlockState::ChecksumPending => {
                self.buf.push(byte);
                self.state = BlockState::AwaitingStart;
                Some(RawBlock::new(std::mem::take(&mut self.buf)))
            }
        }
    }
}

/// Incremental matcher for a single start/end delimiter pair.
#[derive(Debug)]
pub struct DelimiterMatcher {
    start: u8,
    end: u8,
    started: bool,
    buf: Vec<u8>,
}

impl DelimiterMatcher {
    pub fn new(start: u8, end: u8) -> Self {
        Self {
            start,
            end,
            started: false,
            buf: Vec::new(),
        }
    }

    /// Feed one byte. Returns everything from `start` through `end`
    /// inclusive once `end` is seen.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        if !self.started {
            if byte == self.start {
                self.started = true;
                self.buf.push(byte);
            }
            return None;
        }
        self.buf.push(byte);
        if byte == self.end {
            self.started = false;
            return Some(std::mem::take(&mut self.buf));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{ETX, STX};

    fn feed(asm: &mut BlockAssembler, data: &[u8]) -> Vec<RawBlock> {
        data.iter().filter_map(|&b| asm.push(b)).collect()
    }

    #[test]
    fn test_discards_noise_before_start() {
        let mut asm = BlockAssembler::new();
        let blocks = feed(&mut asm, b"\x7f\x00junk\x02AB\x03\x42");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].as_bytes(), b"\x02AB\x03\x42");
        assert_eq!(blocks[0].start_char(), STX);
        assert_eq!(blocks[0].end_char(), ETX);
        assert!(!blocks[0].is_partial());
        assert!(!blocks[0].is_command());
    }

    #[test]
    fn test_state_transitions() {
        let mut asm = BlockAssembler::new();
        assert_eq!(asm.state(), BlockState::AwaitingStart);
        asm.push(b'x');
        assert_eq!(asm.state(), BlockState::AwaitingStart);
        asm.push(STX);
        assert_eq!(asm.state(), BlockState::AwaitingEnd);
        asm.push(b'A');
        assert_eq!(asm.pending(), b"\x02A");
        asm.push(EOT);
        assert_eq!(asm.state(), BlockState::ChecksumPending);
        let block = asm.push(0x03).unwrap();
        assert!(block.is_partial());
        assert_eq!(asm.state(), BlockState::AwaitingStart);
        assert!(asm.pending().is_empty());
    }

    #[test]
    fn test_bcc_may_equal_control_byte() {
        // A BCC of 0x02 must not be mistaken for the next block's STX.
        let mut asm = BlockAssembler::new();
        let blocks = feed(&mut asm, b"\x02\x01\x03\x02\x02B\x03\x41");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].as_bytes(), b"\x02\x01\x03\x02");
        assert_eq!(blocks[1].as_bytes(), b"\x02B\x03\x41");
    }

    #[test]
    fn test_stx_inside_command_is_data() {
        let mut asm = BlockAssembler::new();
        let blocks = feed(&mut asm, b"\x01P0\x02(1234)\x03\x60");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_command());
        assert_eq!(blocks[0].as_bytes(), b"\x01P0\x02(1234)\x03\x60");
    }

    #[test]
    fn test_reset_drops_partial_block() {
        let mut asm = BlockAssembler::new();
        feed(&mut asm, b"\x02AB");
        asm.reset();
        let blocks = feed(&mut asm, b"CD\x02E\x03\x46");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].as_bytes(), b"\x02E\x03\x46");
    }

    #[test]
    fn test_bcc_valid() {
        let mut frame = b"\x02C.1.0(12345678)\x03".to_vec();
        bcc::append(&mut frame);
        let mut asm = BlockAssembler::new();
        let block = feed(&mut asm, &frame).pop().unwrap();
        assert!(block.bcc_valid());
    }

    #[test]
    fn test_delimiter_matcher() {
        let mut m = DelimiterMatcher::new(b'/', b'!');
        let out: Vec<Vec<u8>> = b"junk/hello!more".iter().filter_map(|&b| m.push(b)).collect();
        assert_eq!(out, vec![b"/hello!".to_vec()]);
    }

    #[test]
    fn test_delimiter_matcher_same_start_and_end() {
        let mut m = DelimiterMatcher::new(b'\n', b'\n');
        let out: Vec<Vec<u8>> = b"a\nbc\nd".iter().filter_map(|&b| m.push(b)).collect();
        assert_eq!(out, vec![b"\nbc\n".to_vec()]);
    }
}
