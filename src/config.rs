use std::path::{Path, PathBuf};

use log::debug;
use percent_encoding_shim::percent_decode_str;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// A single item to acquire, as declared in a source config.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    HttpFile {
        url: String,
        filename: Option<String>,
    },
    GdriveFolder {
        folder_id: String,
        #[serde(default)]
        recursive: bool,
    },
}

impl Item {
    /// The filesystem name an `HttpFile` item resolves to, deriving it from
    /// the URL's last path segment when `filename` is absent.
    pub fn http_filename(&self) -> Result<String> {
        match self {
            Item::HttpFile { url, filename } => {
                if let Some(name) = filename {
                    return Ok(name.clone());
                }
                let parsed = url::Url::parse(url).map_err(|e| ConfigError::Parse {
                    path: PathBuf::new(),
                    message: format!("invalid URL '{url}': {e}"),
                })?;
                let last_segment = parsed
                    .path_segments()
                    .and_then(|mut segs| segs.next_back())
                    .unwrap_or("");
                let decoded = percent_decode_str(last_segment).to_string();
                if decoded.is_empty() {
                    return Err(ConfigError::Parse {
                        path: PathBuf::new(),
                        message: format!("cannot infer filename from URL: {url}"),
                    }
                    .into());
                }
                Ok(decoded)
            }
            Item::GdriveFolder { .. } => unreachable!("http_filename called on a GdriveFolder item"),
        }
    }
}

/// Raw, serde-facing shape of a source config file. Kept separate from
/// [`SourceConfig`] so defaulting/validation stays in one place.
#[derive(Debug, Deserialize)]
struct RawConfig {
    source: Option<String>,
    description: Option<String>,
    output_dir: Option<String>,
    subdir: Option<String>,
    #[serde(default)]
    items: Vec<serde_yaml::Value>,
}

/// Parsed, validated configuration for a single source. Immutable after load.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub source: String,
    pub description: Option<String>,
    pub output_dir: PathBuf,
    pub subdir: String,
    pub items: Vec<Item>,
}

impl SourceConfig {
    /// The resolved root a source materializes under: `output_dir / subdir`.
    pub fn target_root(&self) -> PathBuf {
        self.output_dir.join(&self.subdir)
    }
}

/// Load and validate a source config from `path`.
///
/// `base_output_dir`, when given, overrides whatever `output_dir` the config
/// itself declares (the orchestrator's base-output-dir constructor argument
/// in spec terms).
pub async fn load(path: &Path, base_output_dir: Option<&Path>) -> Result<SourceConfig> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.to_path_buf() }.into());
    }

    let text = tokio::fs::read_to_string(path).await?;
    let raw: RawConfig = serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let source = raw.source.ok_or_else(|| ConfigError::MissingField {
        path: path.to_path_buf(),
        field: "source".to_string(),
    })?;
    if source.trim().is_empty() {
        return Err(ConfigError::MissingField {
            path: path.to_path_buf(),
            field: "source".to_string(),
        }
        .into());
    }

    if raw.items.is_empty() {
        return Err(ConfigError::EmptyItems { path: path.to_path_buf() }.into());
    }

    let output_dir = match base_output_dir {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from(raw.output_dir.unwrap_or_else(|| "downloads/datasets".to_string())),
    };
    let subdir = raw.subdir.unwrap_or_else(|| source.clone());

    let mut items = Vec::with_capacity(raw.items.len());
    for raw_item in raw.items {
        items.push(parse_item(path, raw_item)?);
    }

    debug!("Loaded config '{source}' with {} item(s) from {}", items.len(), path.display());

    Ok(SourceConfig {
        source,
        description: raw.description,
        output_dir,
        subdir,
        items,
    })
}

fn parse_item(config_path: &Path, value: serde_yaml::Value) -> Result<Item> {
    serde_yaml::from_value(value)
        .map_err(|e| {
            ConfigError::Parse {
                path: config_path.to_path_buf(),
                message: e.to_string(),
            }
            .into()
        })
}

/// Minimal percent-decoding, self-contained so the config loader doesn't need
/// a dedicated dependency beyond the `url` crate already in the stack.
mod percent_encoding_shim {
    pub fn percent_decode_str(input: &str) -> std::borrow::Cow<'_, str> {
        if !input.as_bytes().contains(&b'%') {
            return std::borrow::Cow::Borrowed(input);
        }
        let bytes = input.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' && i + 2 < bytes.len() {
                if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                    if let Ok(byte) = u8::from_str_radix(hex, 16) {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                }
            }
            out.push(bytes[i]);
            i += 1;
        }
        std::borrow::Cow::Owned(String::from_utf8_lossy(&out).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn loads_minimal_http_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "s.yaml",
            "source: demo\nitems:\n  - kind: http_file\n    url: https://host/x.txt\n",
        )
        .await;

        let cfg = load(&path, None).await.unwrap();
        assert_eq!(cfg.source, "demo");
        assert_eq!(cfg.subdir, "demo");
        assert_eq!(cfg.items.len(), 1);
    }

    #[tokio::test]
    async fn base_output_dir_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "s.yaml",
            "source: demo\noutput_dir: from-config\nitems:\n  - kind: http_file\n    url: https://host/x.txt\n",
        )
        .await;

        let cfg = load(&path, Some(Path::new("/overridden"))).await.unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("/overridden"));
    }

    #[tokio::test]
    async fn rejects_empty_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "s.yaml", "source: demo\nitems: []\n").await;
        assert!(load(&path, None).await.is_err());
    }

    #[tokio::test]
    async fn rejects_unknown_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "s.yaml",
            "source: demo\nitems:\n  - kind: ftp_file\n    url: ftp://host/x\n",
        )
        .await;
        assert!(load(&path, None).await.is_err());
    }

    #[tokio::test]
    async fn rejects_missing_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "s.yaml", "source: demo\nitems:\n  - kind: http_file\n").await;
        assert!(load(&path, None).await.is_err());
    }

    #[test]
    fn derives_filename_from_url_with_percent_encoding() {
        let item = Item::HttpFile {
            url: "https://host/a%20b.txt".to_string(),
            filename: None,
        };
        assert_eq!(item.http_filename().unwrap(), "a b.txt");
    }

    #[test]
    fn explicit_filename_wins_over_derived() {
        let item = Item::HttpFile {
            url: "https://host/a.txt".to_string(),
            filename: Some("b.txt".to_string()),
        };
        assert_eq!(item.http_filename().unwrap(), "b.txt");
    }
}
