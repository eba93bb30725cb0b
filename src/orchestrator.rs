//! Acquisition Orchestrator (C7): the single entry point that turns a
//! [`SourceConfig`] into files on disk, coordinating the HTTP and
//! Drive-folder pipelines, dedupe/conflict bookkeeping, manifest
//! persistence, and verification.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{error, info, warn};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::{Item, SourceConfig};
use crate::credentials::CredentialProvider;
use crate::drive::{walker, DriveClient};
use crate::error::Result;
use crate::manifest::{self, DedupeOutcome, DedupeTracker, ManifestEntry};
use crate::progress::ProgressReporter;
use crate::{http_fetch, verify};

pub struct RunOptions {
    pub overwrite: bool,
    pub manifest_only: bool,
    pub verify_only: bool,
    pub skip_verify: bool,
    pub max_http_workers: usize,
    pub max_drive_workers: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            overwrite: false,
            manifest_only: false,
            verify_only: false,
            skip_verify: false,
            max_http_workers: 8,
            max_drive_workers: 4,
        }
    }
}

/// Outcome of a single `download_all` run: every failure is recorded by
/// description rather than aborting the run, matching the source's
/// per-config failure tallying.
#[derive(Debug, Default)]
pub struct RunReport {
    pub failures: Vec<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Orchestrator {
    http: reqwest::Client,
    drive: Option<Arc<DriveClient>>,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        http: reqwest::Client,
        credentials: Option<CredentialProvider>,
        reporter: Arc<dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> Self {
        let drive = credentials.map(|creds| Arc::new(DriveClient::new(http.clone(), creds)));
        Orchestrator { http, drive, reporter, cancel }
    }

    pub async fn download_all(&self, config: &SourceConfig, options: &RunOptions) -> Result<RunReport> {
        let target_root = config.target_root();
        tokio::fs::create_dir_all(&target_root).await?;

        let mut http_items = Vec::new();
        let mut drive_items = Vec::new();
        for item in &config.items {
            match item {
                Item::HttpFile { .. } => http_items.push(item),
                Item::GdriveFolder { .. } => drive_items.push(item),
            }
        }

        let mut report = RunReport::default();

        if !http_items.is_empty() {
            if options.manifest_only || options.verify_only {
                info!("Manifest-only/verify-only mode: skipping {} HTTP file(s)", http_items.len());
            } else {
                let failures = self.download_http_items(&http_items, &target_root, options).await?;
                report.failures.extend(failures);
            }
        }

        for item in drive_items {
            let Item::GdriveFolder { folder_id, recursive } = item else { unreachable!() };
            let failures = self.download_drive_folder(folder_id, *recursive, &target_root, options).await?;
            report.failures.extend(failures);
        }

        Ok(report)
    }

    async fn download_http_items(
        &self,
        items: &[&Item],
        target_root: &std::path::Path,
        options: &RunOptions,
    ) -> Result<Vec<String>> {
        info!("Downloading {} HTTP file(s) with up to {} worker(s)", items.len(), options.max_http_workers);

        let results: Vec<std::result::Result<(), String>> = futures::stream::iter(items.iter().copied())
            .map(|item| {
                let client = self.http.clone();
                let target_root = target_root.to_path_buf();
                let reporter = self.reporter.clone();
                let overwrite = options.overwrite;
                async move {
                    let filename = item.http_filename().map_err(|e| e.to_string())?;
                    let Item::HttpFile { url, .. } = item else { unreachable!() };
                    let dest_path = target_root.join(&filename);
                    http_fetch::fetch(&client, url, &dest_path, overwrite, reporter.as_ref())
                        .await
                        .map_err(|e| format!("{url}: {e}"))
                }
            })
            .buffer_unordered(options.max_http_workers.max(1))
            .collect()
            .await;

        Ok(results.into_iter().filter_map(std::result::Result::err).collect())
    }

    async fn download_drive_folder(
        &self,
        folder_id: &str,
        recursive: bool,
        target_root: &std::path::Path,
        options: &RunOptions,
    ) -> Result<Vec<String>> {
        let client = self
            .drive
            .clone()
            .ok_or_else(|| crate::error::AuthError::MissingCredentials)?;

        info!("Downloading Google Drive folder {folder_id} (recursive={recursive})");

        let mut rx = walker::walk(client.clone(), folder_id.to_string(), target_root.to_path_buf(), recursive);

        let mut manifest_entries: Vec<ManifestEntry> = Vec::new();
        let mut dedupe = DedupeTracker::new();
        let semaphore = Arc::new(Semaphore::new(options.max_drive_workers.max(1)));
        let mut in_flight: FuturesUnordered<tokio::task::JoinHandle<std::result::Result<(), String>>> =
            FuturesUnordered::new();
        let mut abort_handles: Vec<tokio::task::AbortHandle> = Vec::new();
        let mut scheduled = 0usize;
        let mut listing_error: Option<crate::error::Error> = None;

        while let Some(next) = rx.recv().await {
            let entry = match next {
                Ok(entry) => entry,
                Err(e) => {
                    listing_error = Some(e);
                    break;
                }
            };

            self.reporter.listing_tick(manifest_entries.len() + 1);

            let relative = walker::relative_path(&entry.local_path, target_root);
            let relative_str = relative.to_string_lossy().into_owned();
            manifest_entries.push(ManifestEntry {
                id: entry.meta.id.clone(),
                path: relative_str.clone(),
                md5: entry.meta.md5_checksum.clone(),
                size: entry.meta.size,
            });

            if options.manifest_only || options.verify_only {
                continue;
            }

            if matches!(dedupe.observe(&relative_str, entry.meta.md5_checksum.as_deref()), DedupeOutcome::Duplicate) {
                continue;
            }

            if entry.local_path.exists() && !options.overwrite {
                if !options.skip_verify {
                    let ok = verify::verify(&entry.local_path, entry.meta.size, entry.meta.md5_checksum.as_deref())
                        .await
                        .is_ok();
                    if ok {
                        continue;
                    }
                } else {
                    continue;
                }
            }

            if self.cancel.is_cancelled() {
                continue;
            }

            scheduled += 1;
            self.reporter.downloads_total(scheduled);

            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let drive_client = client.clone();
            let file_id = entry.meta.id.clone();
            let name = entry.meta.name.clone();
            let dest_path = entry.local_path.clone();
            let expected_md5 = entry.meta.md5_checksum.clone();
            let expected_size = entry.meta.size;
            let skip_verify = options.skip_verify;
            let reporter = self.reporter.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = crate::drive::fetcher::fetch(
                    &drive_client,
                    &file_id,
                    &name,
                    &dest_path,
                    expected_md5.as_deref(),
                    expected_size,
                    skip_verify,
                )
                .await
                .map_err(|e| format!("{name}: {e}"));
                reporter.download_advanced();
                result
            });
            abort_handles.push(handle.abort_handle());
            in_flight.push(handle);
        }

        dedupe.log_summary();
        manifest::write(target_root, &manifest_entries).await?;

        if let Some(e) = listing_error {
            for handle in &abort_handles {
                handle.abort();
            }
            return Err(e);
        }

        if options.manifest_only {
            return Ok(Vec::new());
        }
        if options.verify_only {
            let failed = manifest::verify_entries(target_root, &manifest_entries).await;
            if !failed.is_empty() {
                error!("Verification failed for {} file(s)", failed.len());
            }
            return Ok(failed.into_iter().map(|p| format!("{p}: verification failed")).collect());
        }

        let mut failures = Vec::new();
        while let Some(joined) = in_flight.next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(msg)) => {
                    warn!("Drive download failed: {msg}");
                    failures.push(msg);
                }
                Err(join_err) => failures.push(join_err.to_string()),
            }
        }

        Ok(failures)
    }
}
