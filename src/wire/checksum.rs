//! CRC32 checksums for wire frames
//!
//! The checksum covers the length field, the type byte and the payload.
//! Any mismatch is corruption.

use crc32fast::Hasher;

/// Computes a CRC32 (IEEE) checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Returns true if `data` hashes to `expected`
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"[1,\"x\"]";
        assert_eq!(compute_checksum(data), compute_checksum(data));
    }

    #[test]
    fn test_checksum_detects_single_bit_flip() {
        let mut data = vec![0x00, 0x01, 0x02, 0x03, 0x04];
        let original = compute_checksum(&data);
        data[2] ^= 0x01;
        assert!(!verify_checksum(&data, original));
    }
}
