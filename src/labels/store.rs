//! Append-only store for per-region label key files

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cache::store::validate_key;
use crate::observe::SharedObserver;

/// Errors that can occur while reading or updating label files
#[derive(Debug, Error)]
pub enum LabelError {
    /// The label cannot be used as a file name
    #[error("Invalid label: '{0}'")]
    InvalidLabel(String),

    /// Directory creation, read, write or append failed
    #[error("Label file I/O failed for '{label}': {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

/// What `create_or_merge` did to the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The file did not exist and was written with all given keys
    Created(usize),
    /// The file existed; this many new keys were appended
    Appended(usize),
    /// The file already held every given key
    UpToDate,
}

/// Reads and merges `<label>.txt` files under a single directory
#[derive(Clone)]
pub struct LabelFileStore {
    labels_dir: PathBuf,
    observer: SharedObserver,
}

impl std::fmt::Debug for LabelFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFileStore")
            .field("labels_dir", &self.labels_dir)
            .finish()
    }
}

/// Keys from `incoming` not present in `existing`, in incoming order
///
/// Empty keys are never written, since blank lines are not read back.
/// Repeats inside `incoming` are kept as they are.
pub fn missing_keys<'a>(existing: &[String], incoming: &'a [String]) -> Vec<&'a str> {
    incoming
        .iter()
        .filter(|key| !key.is_empty() && !existing.contains(key))
        .map(String::as_str)
        .collect()
}

/// Splits label file content into keys, skipping blank lines
fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn render_lines<'a>(keys: impl IntoIterator<Item = &'a str>) -> String {
    keys.into_iter().fold(String::new(), |mut out, key| {
        out.push_str(key);
        out.push('\n');
        out
    })
}

impl LabelFileStore {
    /// Creates a store rooted at `labels_dir`
    pub fn new(labels_dir: impl Into<PathBuf>, observer: SharedObserver) -> Self {
        Self {
            labels_dir: labels_dir.into(),
            observer,
        }
    }

    /// Directory holding the label files
    pub fn dir(&self) -> &Path {
        &self.labels_dir
    }

    /// Returns the path of the label file for `label`
    pub fn label_path(&self, label: &str) -> PathBuf {
        self.labels_dir.join(format!("{}.txt", label))
    }

    /// Ensures `<label>.txt` holds every key in `keys`
    ///
    /// A missing file is created with all keys, one per line. An existing file
    /// gets only the keys it lacks appended, preserving its current content.
    pub fn create_or_merge(&self, label: &str, keys: &[String]) -> Result<MergeOutcome, LabelError> {
        let result = self.try_create_or_merge(label, keys);
        match &result {
            Ok(MergeOutcome::Created(count)) => self
                .observer
                .info(&format!("{}.txt file created with {} labelKeys", label, count)),
            Ok(MergeOutcome::Appended(count)) => self
                .observer
                .info(&format!("Updated {}.txt with {} new labelKeys", label, count)),
            Ok(MergeOutcome::UpToDate) => self
                .observer
                .info(&format!("{}.txt is already up to date", label)),
            Err(e) => self
                .observer
                .error(&format!("Error updating {}.txt file: {}", label, e)),
        }
        result
    }

    fn try_create_or_merge(&self, label: &str, keys: &[String]) -> Result<MergeOutcome, LabelError> {
        let io_err = |source| LabelError::Io {
            label: label.to_string(),
            source,
        };

        if !validate_key(label) {
            return Err(LabelError::InvalidLabel(label.to_string()));
        }

        fs::create_dir_all(&self.labels_dir).map_err(io_err)?;

        let path = self.label_path(label);
        let content = match self.read_content(&path).map_err(io_err)? {
            Some(content) => content,
            None => {
                let new_keys = missing_keys(&[], keys);
                let count = new_keys.len();
                fs::write(&path, render_lines(new_keys)).map_err(io_err)?;
                return Ok(MergeOutcome::Created(count));
            }
        };

        let new_keys = missing_keys(&parse_lines(&content), keys);
        if new_keys.is_empty() {
            return Ok(MergeOutcome::UpToDate);
        }

        let mut file = OpenOptions::new().append(true).open(&path).map_err(io_err)?;

        // A hand-edited file may lack its final newline
        if !content.is_empty() && !content.ends_with('\n') {
            file.write_all(b"\n").map_err(io_err)?;
        }

        let count = new_keys.len();
        file.write_all(render_lines(new_keys).as_bytes())
            .map_err(io_err)?;
        Ok(MergeOutcome::Appended(count))
    }

    /// Returns the keys stored in `<label>.txt`
    ///
    /// # Returns
    /// * `Ok(Some(keys))` in file order, blank lines skipped
    /// * `Ok(None)` if the file does not exist
    /// * `Err(LabelError)` if the file cannot be read
    pub fn read(&self, label: &str) -> Result<Option<Vec<String>>, LabelError> {
        let path = self.label_path(label);
        self.observer
            .info(&format!("Checking labelkey file: {}", path.display()));

        let result = if validate_key(label) {
            self.read_content(&path)
                .map(|content| content.as_deref().map(parse_lines))
                .map_err(|source| LabelError::Io {
                    label: label.to_string(),
                    source,
                })
        } else {
            Err(LabelError::InvalidLabel(label.to_string()))
        };

        match &result {
            Ok(Some(keys)) => self
                .observer
                .info(&format!("{}.txt file loaded with {} labelKeys", label, keys.len())),
            Ok(None) => self
                .observer
                .info(&format!("No labelkey file found for {}", label)),
            Err(e) => self
                .observer
                .error(&format!("Error reading {}.txt file: {}", label, e)),
        }
        result
    }

    fn read_content(&self, path: &Path) -> std::io::Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
