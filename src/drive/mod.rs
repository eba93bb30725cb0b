//! Google Drive API v3 client: metadata listing and media download, built
//! directly on `reqwest` (no `google-drive3` dependency, since this crate
//! only ever needs `files.list` and `files.get?alt=media`).

pub mod fetcher;
pub mod walker;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;

use crate::credentials::CredentialProvider;
use crate::error::{AuthError, Result};

const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const LIST_PAGE_SIZE: usize = 1000;

/// A single Drive file or folder as returned by `files.list`/`files.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveFileMeta {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "md5Checksum")]
    pub md5_checksum: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
}

impl DriveFileMeta {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    files: Vec<DriveFileMeta>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

pub struct DriveClient {
    http: reqwest::Client,
    credentials: CredentialProvider,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, credentials: CredentialProvider) -> Self {
        DriveClient { http, credentials }
    }

    async fn auth_header(&self) -> Result<HeaderMap> {
        let token = self.credentials.access_token().await?;
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {token}");
        let value = HeaderValue::from_str(&bearer).map_err(|e| AuthError::InvalidKey {
            message: format!("invalid bearer header: {e}"),
        })?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// List the direct children of `folder_id`, paginating through all
    /// pages. Matches the source's query and field selection exactly.
    pub async fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFileMeta>> {
        let headers = self.auth_header().await?;
        let query_string = gd_query(folder_id);

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("q", query_string.clone()),
                ("spaces", "drive".to_string()),
                ("fields", "nextPageToken, files(id,name,mimeType,md5Checksum,size)".to_string()),
                ("pageSize", LIST_PAGE_SIZE.to_string()),
                ("supportsAllDrives", "true".to_string()),
                ("includeItemsFromAllDrives", "true".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let resp: ListResponse = self
                .http
                .get(format!("{DRIVE_API_URL}/files"))
                .headers(headers.clone())
                .query(&query)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            files.extend(resp.files);
            page_token = resp.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(files)
    }

    pub(crate) async fn media_request(&self, file_id: &str) -> Result<reqwest::Response> {
        let headers = self.auth_header().await?;
        let resp = self
            .http
            .get(format!("{DRIVE_UPLOAD_API_URL}/files/{file_id}"))
            .headers(headers)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp)
    }
}

/// Build a Drive query restricting to direct, non-trashed children of
/// `parent_id`.
fn gd_query(parent_id: &str) -> String {
    format!("'{}' in parents and trashed = false", escape_gd_query(parent_id))
}

fn escape_gd_query(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_gd_query(r"a'b\c"), r"a\'b\\c");
    }

    #[test]
    fn builds_parent_query() {
        assert_eq!(gd_query("abc123"), "'abc123' in parents and trashed = false");
    }

    #[test]
    fn folder_mime_type_detected() {
        let meta = DriveFileMeta {
            id: "1".to_string(),
            name: "d".to_string(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            md5_checksum: None,
            size: None,
        };
        assert!(meta.is_folder());
    }
}
