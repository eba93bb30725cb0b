//! Media download for a single Drive file: streams `alt=media` to a
//! per-file temp path and atomically renames it into place. The temp file
//! is named with the Drive file id, not just `.part`, because multiple
//! Drive entries can resolve to the same destination path and would
//! otherwise race on a shared temp file.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use log::info;
use tokio::io::AsyncWriteExt;

use super::DriveClient;
use crate::error::Result;
use crate::verify;

/// Download `file_id` to `dest_path`. When `skip_verify` is false and either
/// `expected_md5` or `expected_size` is known, the freshly-renamed file is
/// checked with [`crate::verify::verify`]; on mismatch the destination is
/// deleted and the mismatch is propagated as an error.
pub async fn fetch(
    client: &DriveClient,
    file_id: &str,
    name: &str,
    dest_path: &Path,
    expected_md5: Option<&str>,
    expected_size: Option<u64>,
    skip_verify: bool,
) -> Result<()> {
    info!("Downloading Drive file {file_id} ({name}) -> {}", dest_path.display());

    if let Some(parent) = dest_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = part_path(dest_path, file_id);
    let result = fetch_to_tmp(client, file_id, &tmp_path).await;

    match result {
        Ok(()) => {
            tokio::fs::rename(&tmp_path, dest_path).await?;

            if !skip_verify && (expected_md5.is_some() || expected_size.is_some()) {
                if let Err(e) = verify::verify(dest_path, expected_size, expected_md5).await {
                    tokio::fs::remove_file(dest_path).await.ok();
                    return Err(e);
                }
            }

            info!("Saved {}", dest_path.display());
            Ok(())
        }
        Err(e) => {
            if tokio::fs::metadata(&tmp_path).await.is_ok() {
                tokio::fs::remove_file(&tmp_path).await.ok();
            }
            if tokio::fs::metadata(dest_path).await.is_ok() {
                tokio::fs::remove_file(dest_path).await.ok();
            }
            Err(e)
        }
    }
}

async fn fetch_to_tmp(client: &DriveClient, file_id: &str, tmp_path: &Path) -> Result<()> {
    let resp = client.media_request(file_id).await?;
    let mut stream = resp.bytes_stream();

    let mut file = tokio::fs::File::create(tmp_path).await?;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

fn part_path(dest_path: &Path, file_id: &str) -> PathBuf {
    let ext = dest_path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let stem = dest_path.file_stem().and_then(|s| s.to_str()).unwrap_or("download");
    let suffix = if ext.is_empty() {
        format!("{stem}.part.{file_id}")
    } else {
        format!("{stem}.{ext}.part.{file_id}")
    };
    dest_path.with_file_name(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_includes_file_id() {
        let p = part_path(Path::new("/a/report.csv"), "file123");
        assert_eq!(p, PathBuf::from("/a/report.csv.part.file123"));
    }

    #[test]
    fn part_path_handles_no_extension() {
        let p = part_path(Path::new("/a/README"), "file123");
        assert_eq!(p, PathBuf::from("/a/README.part.file123"));
    }
}
