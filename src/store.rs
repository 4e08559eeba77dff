use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::TaxLookupError;
use crate::fs_util::remove_file_if_exists;
use crate::taxonomy::{NAMES_FILE, NODES_FILE};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const ARCHIVE_FILE: &str = "taxdump.tar.gz";

/// Local cache directory holding the extracted taxonomy dump.
#[derive(Debug, Clone)]
pub struct Store {
    data_dir: Utf8PathBuf,
}

impl Store {
    pub fn new(data_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    pub fn names_path(&self) -> Utf8PathBuf {
        self.data_dir.join(NAMES_FILE)
    }

    pub fn nodes_path(&self) -> Utf8PathBuf {
        self.data_dir.join(NODES_FILE)
    }

    pub fn archive_path(&self) -> Utf8PathBuf {
        self.data_dir.join(ARCHIVE_FILE)
    }

    pub fn ensure_data_dir(&self) -> Result<(), TaxLookupError> {
        fs::create_dir_all(self.data_dir.as_std_path())
            .map_err(|err| TaxLookupError::Filesystem(err.to_string()))
    }

    /// True when both dump files are cached.
    pub fn has_taxdump(&self) -> bool {
        self.names_path().as_std_path().is_file() && self.nodes_path().as_std_path().is_file()
    }

    /// Deletes the cached dumps and the archive. Returns the paths that were
    /// actually present.
    pub fn remove_stale(&self) -> Result<Vec<Utf8PathBuf>, TaxLookupError> {
        let mut removed = Vec::new();
        for path in [self.nodes_path(), self.names_path(), self.archive_path()] {
            if remove_file_if_exists(path.as_std_path())? {
                removed.push(path);
            }
        }
        Ok(removed)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
