//! Content-based transaction fingerprints for duplicate detection

use sha2::{Digest, Sha256};

/// Length of a fingerprint digest in hex characters
pub const FINGERPRINT_LEN: usize = 16;

/// Compute the identity digest for a transaction.
///
/// Pure and deterministic over (source id, date, description, amount);
/// changing any one input changes the digest. The date must already be in
/// canonical `YYYY-MM-DD` form so differently formatted exports of the same
/// day agree. Returns 16 lowercase hex characters (the first 8 bytes of a
/// SHA-256 digest).
pub fn fingerprint(source_id: i64, date: &str, description: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.to_be_bytes());
    hasher.update([0x1f]);
    hasher.update(date.as_bytes());
    hasher.update([0x1f]);
    hasher.update(description.as_bytes());
    hasher.update([0x1f]);
    hasher.update(amount.to_be_bytes());
    hex::encode(&hasher.finalize()[..FINGERPRINT_LEN / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = fingerprint(1, "2024-01-15", "NETFLIX.COM", -15.99);
        let b = fingerprint(1, "2024-01-15", "NETFLIX.COM", -15.99);
        assert_eq!(a, b);
    }

    #[test]
    fn test_format() {
        let fp = fingerprint(1, "2024-01-15", "STARBUCKS", -5.50);
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_each_field_changes_digest() {
        let base = fingerprint(1, "2024-01-15", "STARBUCKS", -5.50);
        assert_ne!(base, fingerprint(2, "2024-01-15", "STARBUCKS", -5.50));
        assert_ne!(base, fingerprint(1, "2024-01-16", "STARBUCKS", -5.50));
        assert_ne!(base, fingerprint(1, "2024-01-15", "STARBUCKS #2", -5.50));
        assert_ne!(base, fingerprint(1, "2024-01-15", "STARBUCKS", -5.51));
    }

    #[test]
    fn test_field_boundaries_are_separated() {
        // Without separators these would hash the same byte stream
        let a = fingerprint(1, "2024-01-15", "AB", -1.0);
        let b = fingerprint(1, "2024-01-15A", "B", -1.0);
        assert_ne!(a, b);
    }
}
