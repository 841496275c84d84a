use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

pub const DEFAULT_DOWNLOAD_DIR: &str = "./data/";
pub const RECEIPT_FILE: &str = "download.json";

/// Local download area; one directory per dataset name.
#[derive(Debug, Clone)]
pub struct Staging {
    root: Utf8PathBuf,
}

impl Staging {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn dataset_dir(&self, name: &str) -> Utf8PathBuf {
        self.root.join(sanitize_dir_name(name))
    }

    /// Creates the directory for `name` under the root if it is missing.
    pub fn ensure_dataset_dir(&self, name: &str) -> Result<Utf8PathBuf, FetchError> {
        create_dir(&self.root, &sanitize_dir_name(name))
    }

    pub fn write_receipt(dir: &Utf8Path, receipt: &DownloadReceipt) -> Result<(), FetchError> {
        let path = dir.join(RECEIPT_FILE);
        let content = serde_json::to_vec_pretty(receipt)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&path, &content)
    }

    pub fn read_receipt(dir: &Utf8Path) -> Result<Option<DownloadReceipt>, FetchError> {
        let path = dir.join(RECEIPT_FILE);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        let receipt = serde_json::from_str(&content)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(Some(receipt))
    }
}

/// Record of one staged dataset, written next to its files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadReceipt {
    pub id: String,
    pub name: String,
    pub files: Vec<String>,
    pub downloaded_at: String,
    pub tool: String,
}

/// Creates `base/name` (and missing parents) if absent and returns its path.
/// An existing directory is not an error.
pub fn create_dir(base: &Utf8Path, name: &str) -> Result<Utf8PathBuf, FetchError> {
    let path = base.join(name);
    if !path.as_std_path().is_dir() {
        fs::create_dir_all(path.as_std_path())
            .map_err(|err| FetchError::Filesystem(format!("create {path}: {err}")))?;
    }
    Ok(path)
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), FetchError> {
    let parent = path
        .parent()
        .ok_or_else(|| FetchError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("metaspace-fetch")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Dataset names are free text; keep them usable as a single path component.
fn sanitize_dir_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
