//! Framing module - block detection and message reassembly.

pub mod block;
pub mod message;

pub use block::{BlockAssembler, BlockState, DelimiterMatcher, RawBlock};
pub use message::{Disposition, MessageAssembler};
