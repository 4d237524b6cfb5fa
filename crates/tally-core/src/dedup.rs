//! Duplicate gate for incoming transactions

use crate::error::Result;

/// Outcome of the duplicate check for one incoming record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Skip,
}

/// Decide whether an incoming record should be persisted.
///
/// An explicit override is a hard bypass: it proceeds without ever invoking
/// the lookup. A record with no fingerprint also proceeds, since duplicate
/// detection is inapplicable without an identity. Otherwise the record is
/// skipped exactly when a prior transaction with the same fingerprint
/// exists.
pub fn decide<F>(fingerprint: Option<&str>, override_requested: bool, lookup: F) -> Result<Decision>
where
    F: FnOnce(&str) -> Result<Option<i64>>,
{
    if override_requested {
        return Ok(Decision::Proceed);
    }
    let fingerprint = match fingerprint {
        Some(fp) if !fp.is_empty() => fp,
        _ => return Ok(Decision::Proceed),
    };
    match lookup(fingerprint)? {
        Some(_) => Ok(Decision::Skip),
        None => Ok(Decision::Proceed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_never_invokes_lookup() {
        let mut called = false;
        let decision = decide(Some("abcd"), true, |_| {
            called = true;
            Ok(Some(1))
        })
        .unwrap();
        assert_eq!(decision, Decision::Proceed);
        assert!(!called);
    }

    #[test]
    fn test_missing_fingerprint_proceeds() {
        let decision = decide(None, false, |_| Ok(Some(1))).unwrap();
        assert_eq!(decision, Decision::Proceed);
    }

    #[test]
    fn test_skip_iff_existing() {
        assert_eq!(
            decide(Some("abcd"), false, |_| Ok(Some(42))).unwrap(),
            Decision::Skip
        );
        assert_eq!(
            decide(Some("abcd"), false, |_| Ok(None)).unwrap(),
            Decision::Proceed
        );
    }

    #[test]
    fn test_lookup_error_propagates() {
        let result = decide(Some("abcd"), false, |_| {
            Err(crate::error::Error::Import("storage down".into()))
        });
        assert!(result.is_err());
    }
}
