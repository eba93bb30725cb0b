//! Local file verification (C3): confirms a downloaded file matches the
//! size and MD5 checksum recorded for it, without buffering the whole file
//! in memory.

use std::path::Path;

use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;

use crate::error::{Result, VerifyError};

const CHUNK_SIZE: usize = 1024 * 1024;

/// Verify `path` against an expected size and, when given, an expected MD5
/// checksum. Reads in 1 MiB blocks. Returns `Ok(())` on match, or a
/// [`VerifyError`] describing the mismatch.
pub async fn verify(path: &Path, expected_size: Option<u64>, expected_md5: Option<&str>) -> Result<()> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VerifyError::Missing { path: path.to_path_buf() }.into());
        }
        Err(e) => return Err(VerifyError::Io(e).into()),
    };

    if let Some(expected) = expected_size {
        let actual = metadata.len();
        if actual != expected {
            return Err(VerifyError::SizeMismatch { path: path.to_path_buf(), expected, actual }.into());
        }
    }

    if let Some(expected) = expected_md5 {
        let actual = md5_hex(path).await.map_err(VerifyError::Io)?;
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(VerifyError::Md5Mismatch { path: path.to_path_buf() }.into());
        }
    }

    Ok(())
}

/// Compute the hex-encoded MD5 digest of a file, reading in 1 MiB blocks.
pub async fn md5_hex(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_missing_file() {
        let err = verify(Path::new("/nonexistent/file"), None, None).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Verify(VerifyError::Missing { .. })));
    }

    #[tokio::test]
    async fn detects_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, b"hello").await.unwrap();
        let err = verify(&path, Some(100), None).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Verify(VerifyError::SizeMismatch { .. })));
    }

    #[tokio::test]
    async fn matches_known_md5() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, b"hello world").await.unwrap();
        // md5("hello world")
        verify(&path, Some(11), Some("5eb63bbbe01eeed093cb22bb8f5acdc3")).await.unwrap();
    }

    #[tokio::test]
    async fn detects_md5_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, b"hello world").await.unwrap();
        let err = verify(&path, None, Some("0".repeat(32).as_str())).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Verify(VerifyError::Md5Mismatch { .. })));
    }
}
