//! Content fingerprints for cache artifacts
//!
//! A fingerprint is the SHA-512 digest of an artifact file, rendered as
//! 128 lowercase hex characters. Same bytes = same fingerprint.

use crate::error::{CacheError, CacheResult};
use sha2::{Digest, Sha512};
use std::path::Path;

/// Compute the fingerprint of a byte stream
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Check bytes against an expected fingerprint.
///
/// Never fails: empty input, an empty expectation and any mismatch all
/// return `false`.
pub fn verify(bytes: &[u8], expected: &str) -> bool {
    !bytes.is_empty() && matches(&digest(bytes), expected)
}

/// Compare an already computed digest with an expected fingerprint
pub fn matches(actual: &str, expected: &str) -> bool {
    let expected = expected.trim();
    !expected.is_empty() && actual.eq_ignore_ascii_case(expected)
}

/// Fingerprint a file on disk
pub async fn digest_file(path: &Path) -> CacheResult<String> {
    let contents = tokio::fs::read(path)
        .await
        .map_err(|e| CacheError::io(format!("reading {}", path.display()), e))?;
    Ok(digest(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn digest_deterministic() {
        let a = digest(b"MNXM1\tH+");
        let b = digest(b"MNXM1\tH+");
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_different_content() {
        assert_ne!(digest(b"content 1"), digest(b"content 2"));
    }

    #[test]
    fn verify_matches() {
        let bytes = b"{\"MNXM1\": \"H+\"}";
        assert!(verify(bytes, &digest(bytes)));
    }

    #[test]
    fn verify_is_case_and_whitespace_tolerant() {
        let bytes = b"abc";
        let expected = format!("  {}\n", digest(bytes).to_uppercase());
        assert!(verify(bytes, &expected));
    }

    #[test]
    fn verify_rejects_mismatch() {
        assert!(!verify(b"abc", &digest(b"abd")));
    }

    #[test]
    fn matches_ignores_blank_expectation() {
        let actual = digest(b"abc");
        assert!(matches(&actual, &actual.to_uppercase()));
        assert!(!matches(&actual, "   "));
    }

    #[test]
    fn verify_rejects_empty() {
        assert!(!verify(b"", &digest(b"")));
        assert!(!verify(b"abc", ""));
    }

    #[tokio::test]
    async fn digest_file_matches_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cid_name.json.gz");
        std::fs::write(&path, b"payload").unwrap();

        assert_eq!(digest_file(&path).await.unwrap(), digest(b"payload"));
    }

    #[tokio::test]
    async fn digest_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let result = digest_file(&dir.path().join("nope")).await;
        assert!(result.is_err());
    }
}
