//! Protocol module - IEC 62056-21 link definitions.

pub mod bcc;
pub mod constants;

pub use constants::*;
