//! Named input byte streams handed to a processor.
//!
//! Every upload arrives as a set of named streams (`file_csv`, `file_shp`,
//! `file_shx`, ...). Processors only check for presence here; no content is
//! parsed until the reader runs.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

/// One uploaded byte stream and the file name it arrived with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Original file name, if known
    pub file_name: Option<String>,
    /// Raw content
    pub bytes: Vec<u8>,
}

impl InputFile {
    /// Wraps raw bytes without a file name.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: None,
            bytes: bytes.into(),
        }
    }

    /// Sets the original file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Reads a file from disk, keeping its file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(Self { file_name, bytes })
    }

    /// File name without its extension.
    #[must_use]
    pub fn stem(&self) -> Option<&str> {
        let name = self.file_name.as_deref()?;
        let stem = match name.rfind('.') {
            Some(0) | None => name,
            Some(dot) => &name[..dot],
        };
        (!stem.is_empty()).then_some(stem)
    }
}

/// Input streams keyed by their identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputFiles {
    files: BTreeMap<String, InputFile>,
}

impl InputFiles {
    /// Creates an empty input set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the stream stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, file: InputFile) {
        self.files.insert(key.into(), file);
    }

    /// Builder-style [`InputFiles::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, file: InputFile) -> Self {
        self.insert(key, file);
        self
    }

    /// Returns the stream stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&InputFile> {
        self.files.get(key)
    }

    /// Returns `true` when a stream is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    /// Stream identifiers in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Returns the keys from `required` that are not present.
    #[must_use]
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|key| !self.contains(key))
            .collect()
    }

    /// Returns the stream stored under `key`, or an error naming the key.
    ///
    /// # Errors
    ///
    /// Returns an error if no stream is stored under `key`.
    pub fn require(&self, key: &str) -> Result<&InputFile> {
        self.get(key)
            .ok_or_else(|| anyhow!("Missing required input '{key}'"))
    }
}
