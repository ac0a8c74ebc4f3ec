//! Persistent aggregate populated by the import pipeline: photos with
//! their version histories, import rolls and the shared tag hierarchy.

pub mod photo;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub use photo::{Photo, Version, VersionError, ORIGINAL_VERSION_ID};

/// A version's resolved storage location, kept as a (directory, filename)
/// pair rather than a single absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub base_dir: PathBuf,
    pub filename: String,
}

impl Location {
    pub fn new(base_dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            filename: filename.into(),
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let base_dir = path.parent()?.to_path_buf();
        let filename = path.file_name()?.to_string_lossy().to_string();
        Some(Self { base_dir, filename })
    }

    pub fn path(&self) -> PathBuf {
        self.base_dir.join(&self.filename)
    }

    /// Location of the sidecar metadata file belonging to this file,
    /// regardless of whether it exists on disk.
    pub fn sidecar(&self) -> Location {
        let stem = match self.filename.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => self.filename.as_str(),
        };
        Location::new(self.base_dir.clone(), format!("{stem}.xmp"))
    }

    pub fn extension(&self) -> Option<&str> {
        self.filename.rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// One import batch. Photos reference their roll by id; removing a roll
/// never removes its photos.
#[derive(Debug, Clone)]
pub struct Roll {
    pub id: i64,
    pub time: DateTime<Utc>,
}

/// Node in the tag hierarchy, either a category or a leaf.
#[derive(Debug, Clone)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub is_category: bool,
    pub sort_priority: i32,
    pub icon: Option<String>,
}
