//! Plain HTTP file fetcher (C5): streams a GET response to a `.part` temp
//! file in 8 KiB blocks, then atomically renames it into place. No
//! checksum verification here; that is layered on by [`crate::verify`].

use std::path::{Path, PathBuf};

use futures::StreamExt;
use log::{debug, info};
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::progress::ProgressReporter;

/// Fetch `url` into `dest_path`, skipping the request entirely when the
/// destination already exists and `overwrite` is false.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    dest_path: &Path,
    overwrite: bool,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    if dest_path.exists() && !overwrite {
        debug!("Skipping existing file: {}", dest_path.display());
        return Ok(());
    }

    info!("Downloading {url} -> {}", dest_path.display());

    if let Some(parent) = dest_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = part_path(dest_path);
    let result = fetch_to_tmp(client, url, &tmp_path).await;

    match result {
        Ok(downloaded) => {
            tokio::fs::rename(&tmp_path, dest_path).await?;
            let size_str = if downloaded > 0 {
                format!("{:.2} MB", downloaded as f64 / 1_048_576.0)
            } else {
                "unknown size".to_string()
            };
            info!("Saved {} ({size_str})", dest_path.display());
            reporter.message(&format!("saved {}", dest_path.display()));
            Ok(())
        }
        Err(e) => {
            if tokio::fs::metadata(&tmp_path).await.is_ok() {
                tokio::fs::remove_file(&tmp_path).await.ok();
            }
            Err(e)
        }
    }
}

async fn fetch_to_tmp(client: &reqwest::Client, url: &str, tmp_path: &Path) -> Result<u64> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let mut stream = resp.bytes_stream();

    let mut file = tokio::fs::File::create(tmp_path).await?;
    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(downloaded)
}

fn part_path(dest_path: &Path) -> PathBuf {
    let mut name = dest_path.file_name().and_then(|n| n.to_str()).unwrap_or("download").to_string();
    name.push_str(".part");
    dest_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        let p = part_path(Path::new("/a/b/file.txt"));
        assert_eq!(p, PathBuf::from("/a/b/file.txt.part"));
    }

    #[tokio::test]
    async fn skips_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("existing.txt");
        tokio::fs::write(&dest, b"already here").await.unwrap();

        let client = reqwest::Client::new();
        let reporter = crate::progress::LogReporter::new();
        fetch(&client, "http://example.invalid/x", &dest, false, &reporter).await.unwrap();

        let contents = tokio::fs::read(&dest).await.unwrap();
        assert_eq!(contents, b"already here");
    }

    #[tokio::test]
    async fn downloads_and_renames_into_place() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dataset.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"a,b,c\n1,2,3\n".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dataset.csv");

        let client = reqwest::Client::new();
        let reporter = crate::progress::LogReporter::new();
        let url = format!("{}/dataset.csv", server.uri());
        fetch(&client, &url, &dest, false, &reporter).await.unwrap();

        let contents = tokio::fs::read(&dest).await.unwrap();
        assert_eq!(contents, b"a,b,c\n1,2,3\n");
        assert!(!part_path(&dest).exists());
    }
}
