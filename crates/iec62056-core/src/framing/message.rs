//! Logical message reassembly from validated blocks.

use super::block::RawBlock;
use crate::protocol::bcc;
use crate::protocol::constants::LINE_END;

/// What the link must do after a block has been offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// BCC failed: send NACK and receive the same block again.
    Retransmit,
    /// Partial block accepted: send ACK and receive the next block.
    NextBlock,
    /// Message complete. No reply is sent.
    Complete(Vec<u8>),
}

/// Accumulates the blocks of one logical message.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    message: Vec<u8>,
    blocks: usize,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks accepted so far. Rejected blocks are not counted.
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Bytes accumulated so far.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Offer a received block.
    pub fn accept(&mut self, block: RawBlock) -> Disposition {
        if block.is_command() {
            self.blocks += 1;
            self.message.extend_from_slice(block.as_bytes());
            return Disposition::Complete(std::mem::take(&mut self.message));
        }

        if !block.bcc_valid() {
            return Disposition::Retransmit;
        }

        self.blocks += 1;
        let first = self.blocks == 1;
        let partial = block.is_partial();
        let bytes = block.into_bytes();
        // Only the first block keeps its STX.
        let body = if first { &bytes[..] } else { &bytes[1..] };

        if partial {
            // Drop EOT and BCC, join with a line end.
            self.message.extend_from_slice(&body[..body.len() - 2]);
            self.message.extend_from_slice(LINE_END);
            return Disposition::NextBlock;
        }

        self.message.extend_from_slice(body);
        if self.blocks > 1 {
            // The final BCC only covered the final block.
            bcc::recompute(&mut self.message);
        }
        Disposition::Complete(std::mem::take(&mut self.message))
    }
}
