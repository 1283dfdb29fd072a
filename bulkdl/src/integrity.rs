//! File integrity checking.
//!
//! Servers advertise a base64-encoded MD5 digest in the `Content-MD5` header.
//! After a transfer completes (and during reconciliation of files already on
//! disk) the local file is hashed and compared against that fingerprint.
//!
//! Verification fails open: a file that cannot be read is treated as intact
//! rather than corrupt, so a transient read error never triggers a re-download
//! of a file that may well be fine. The one exception is a record with
//! neither a fingerprint nor a path, which carries no evidence of a completed
//! transfer and is reported broken.

use std::io;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use md5::{Digest, Md5};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::warn;

/// Read buffer size for hashing.
const HASH_BUF_SIZE: usize = 64 * 1024;

/// Compute the base64-encoded MD5 digest of a file.
///
/// Reads the file in chunks so large downloads never get pulled into memory
/// at once.
pub async fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(STANDARD.encode(hasher.finalize()))
}

/// Decide whether a local file is broken with respect to an expected
/// fingerprint.
///
/// # Returns
///
/// - `true` when both fingerprint and path are absent (nothing to show for
///   a supposedly finished transfer)
/// - `true` when the computed digest differs from `expected`
/// - `false` when either side is missing, or the file cannot be read
pub async fn is_broken(expected: Option<&str>, path: Option<&Path>) -> bool {
    match (expected, path) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(expected), Some(path)) => match fingerprint_file(path).await {
            Ok(actual) => actual != expected,
            Err(error) => {
                warn!(path = %path.display(), %error, "integrity check skipped, file unreadable");
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    async fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_fingerprint_known_vectors() {
        let dir = TempDir::new().unwrap();

        let empty = write_file(&dir, "empty", b"").await;
        assert_eq!(
            fingerprint_file(&empty).await.unwrap(),
            "1B2M2Y8AsgTpgAmY7PhCfg=="
        );

        let hello = write_file(&dir, "hello", b"hello world").await;
        assert_eq!(
            fingerprint_file(&hello).await.unwrap(),
            "XrY7u+Ae7tCTyyK7j1rNww=="
        );

        let fox = write_file(
            &dir,
            "fox",
            b"The quick brown fox jumps over the lazy dog",
        )
        .await;
        assert_eq!(
            fingerprint_file(&fox).await.unwrap(),
            "nhB9nTcrtoJr2B01QqQZ1g=="
        );
    }

    #[tokio::test]
    async fn test_fingerprint_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(fingerprint_file(&missing).await.is_err());
    }

    #[tokio::test]
    async fn test_is_broken_both_absent() {
        assert!(is_broken(None, None).await);
    }

    #[tokio::test]
    async fn test_is_broken_without_fingerprint_assumes_intact() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "f", b"anything").await;
        assert!(!is_broken(None, Some(&path)).await);
    }

    #[tokio::test]
    async fn test_is_broken_matching_digest() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "f", b"hello world").await;
        assert!(!is_broken(Some("XrY7u+Ae7tCTyyK7j1rNww=="), Some(&path)).await);
    }

    #[tokio::test]
    async fn test_is_broken_mismatched_digest() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "f", b"hello world!").await;
        assert!(is_broken(Some("XrY7u+Ae7tCTyyK7j1rNww=="), Some(&path)).await);
    }

    #[tokio::test]
    async fn test_is_broken_unreadable_file_fails_open() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(!is_broken(Some("XrY7u+Ae7tCTyyK7j1rNww=="), Some(&missing)).await);
    }
}
