//! Block check character (BCC) computation and validation.
//!
//! The BCC is the XOR of every byte after the opening SOH/STX up to and
//! including the closing ETX/EOT, restricted to 7 bits.

use super::constants::BCC_MASK;

/// Compute the BCC over `data`.
pub fn compute(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ (b & BCC_MASK)) & BCC_MASK
}

/// Check a complete frame: start byte, body, end byte, trailing BCC.
///
/// The start byte is not covered by the checksum.
pub fn verify(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&bcc, rest)) if !rest.is_empty() => compute(&rest[1..]) == bcc,
        _ => false,
    }
}

/// Append a BCC computed over everything but the leading start byte.
pub fn append(frame: &mut Vec<u8>) {
    let bcc = compute(frame.get(1..).unwrap_or_default());
    frame.push(bcc);
}

/// Replace the trailing BCC of `frame` with one computed over the whole frame.
pub fn recompute(frame: &mut Vec<u8>) {
    frame.pop();
    append(frame);
}

/// Return a copy of `frame` with its trailing BCC regenerated.
pub fn with_recomputed(frame: &[u8]) -> Vec<u8> {
    let mut out = frame.to_vec();
    recompute(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{ETX, STX};

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut f = vec![STX];
        f.extend_from_slice(body);
        f.push(ETX);
        append(&mut f);
        f
    }

    #[test]
    fn test_compute_is_xor() {
        assert_eq!(compute(&[]), 0);
        assert_eq!(compute(&[0x31]), 0x31);
        assert_eq!(compute(&[0x31, 0x32]), 0x03);
        assert_eq!(compute(&[0x31, 0x31]), 0x00);
    }

    #[test]
    fn test_compute_masks_high_bit() {
        assert_eq!(compute(&[0xB1]), 0x31);
    }

    #[test]
    fn test_known_frame() {
        // STX "1.8.0(001234.5*kWh)" ETX <bcc>
        let body = b"1.8.0(001234.5*kWh)";
        let f = frame(body);
        let mut expected = 0u8;
        for b in body.iter().chain(std::iter::once(&ETX)) {
            expected ^= b;
        }
        assert_eq!(*f.last().unwrap(), expected & 0x7F);
        assert!(verify(&f));
    }

    #[test]
    fn test_start_byte_excluded() {
        let f = frame(b"ABC");
        let mut other = f.clone();
        other[0] = 0x01;
        assert!(verify(&other));
    }

    #[test]
    fn test_verify_detects_corruption() {
        let mut f = frame(b"0.0.0(12345678)");
        f[3] ^= 0x01;
        assert!(!verify(&f));
    }

    #[test]
    fn test_verify_rejects_short_input() {
        assert!(!verify(&[]));
        assert!(!verify(&[0x02]));
    }

    #[test]
    fn test_recompute_replaces_last_byte() {
        let mut f = frame(b"XYZ");
        f.insert(2, b'!');
        assert!(!verify(&f));
        recompute(&mut f);
        assert!(verify(&f));
        assert_eq!(with_recomputed(&f), f);
    }
}
