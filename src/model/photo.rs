//! The photo aggregate and its version arena.
//!
//! A photo owns a map of versions keyed by a monotonically increasing id
//! that is never reused, even after deletion. Version 1 is the original
//! and exists for the lifetime of the photo unless explicitly force
//! removed. Deleting the default version reassigns the default to the
//! highest surviving id; only a photo stripped of every version by force
//! removal is left without a default.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::Location;
use crate::fs::FileSystem;
use crate::thumbs::ThumbnailService;

pub const ORIGINAL_VERSION_ID: u32 = 1;

/// Highest rating a photo can carry.
pub const MAX_RATING: u32 = 5;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("a version named \"{0}\" already exists")]
    NameExists(String),
    #[error("cannot delete the original version")]
    CannotDeleteOriginal,
    #[error("cannot rename the original version")]
    CannotRenameOriginal,
    #[error("no version with id {0}")]
    NoSuchVersion(u32),
    #[error("a file already exists at {0}")]
    TargetExists(PathBuf),
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// One renderable state of a photo's pixel content.
#[derive(Debug, Clone)]
pub struct Version {
    pub id: u32,
    pub name: String,
    pub location: Location,
    pub content_hash: Option<String>,
    /// Protected versions are never silently overwritten.
    pub protected: bool,
}

#[derive(Debug, Clone)]
pub struct Photo {
    pub id: i64,
    pub time: DateTime<Utc>,
    pub roll_id: i64,
    pub description: String,
    rating: u32,
    tags: Vec<i64>,
    versions: BTreeMap<u32, Version>,
    highest_version_id: u32,
    default_version_id: u32,
}

impl Photo {
    pub fn new(id: i64, time: DateTime<Utc>, roll_id: i64) -> Self {
        Self {
            id,
            time,
            roll_id,
            description: String::new(),
            rating: 0,
            tags: Vec::new(),
            versions: BTreeMap::new(),
            highest_version_id: 0,
            default_version_id: ORIGINAL_VERSION_ID,
        }
    }

    /// Filename of the original version.
    pub fn name(&self) -> Option<&str> {
        self.versions
            .get(&ORIGINAL_VERSION_ID)
            .map(|v| v.location.filename.as_str())
    }

    pub fn rating(&self) -> u32 {
        self.rating
    }

    /// Set the rating. Values above [`MAX_RATING`] are ignored. Returns
    /// whether the rating changed.
    pub fn set_rating(&mut self, rating: u32) -> bool {
        if rating > MAX_RATING || rating == self.rating {
            return false;
        }
        self.rating = rating;
        true
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub fn tags(&self) -> &[i64] {
        &self.tags
    }

    pub fn has_tag(&self, tag_id: i64) -> bool {
        self.tags.contains(&tag_id)
    }

    /// Attach a tag. Returns true if it was not already attached.
    pub fn add_tag(&mut self, tag_id: i64) -> bool {
        if self.has_tag(tag_id) {
            return false;
        }
        self.tags.push(tag_id);
        true
    }

    pub fn remove_tag(&mut self, tag_id: i64) {
        self.tags.retain(|t| *t != tag_id);
    }

    /// Copy time, description, rating and tags from another photo.
    pub fn copy_attributes_from(&mut self, other: &Photo) {
        self.time = other.time;
        self.description = other.description.clone();
        self.rating = other.rating;
        for tag in other.tags() {
            self.add_tag(*tag);
        }
    }

    // ========================================================================
    // Version arena
    // ========================================================================

    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.versions.values()
    }

    pub fn version_ids(&self) -> Vec<u32> {
        self.versions.keys().copied().collect()
    }

    pub fn version(&self, id: u32) -> Option<&Version> {
        self.versions.get(&id)
    }

    pub fn version_name_exists(&self, name: &str) -> bool {
        self.versions.values().any(|v| v.name == name)
    }

    pub fn default_version_id(&self) -> u32 {
        self.default_version_id
    }

    /// The version currently presented as "the photo". `None` only for
    /// a photo whose every version has been force removed.
    pub fn default_version(&self) -> Option<&Version> {
        self.versions.get(&self.default_version_id)
    }

    pub fn set_default_version(&mut self, id: u32) -> Result<(), VersionError> {
        if !self.versions.contains_key(&id) {
            return Err(VersionError::NoSuchVersion(id));
        }
        self.default_version_id = id;
        Ok(())
    }

    /// Validated creation path: allocates the next version id and registers
    /// the version under it.
    pub fn add_version(
        &mut self,
        location: Location,
        name: impl Into<String>,
        protected: bool,
    ) -> Result<u32, VersionError> {
        let name = name.into();
        if self.version_name_exists(&name) {
            return Err(VersionError::NameExists(name));
        }
        let id = self.highest_version_id + 1;
        self.highest_version_id = id;
        self.versions.insert(
            id,
            Version {
                id,
                name,
                location,
                content_hash: None,
                protected,
            },
        );
        Ok(id)
    }

    /// Bulk-hydration path used only when reconstructing a photo from
    /// already-persisted state. Performs no name validation.
    pub fn hydrate_version(&mut self, version: Version) {
        self.highest_version_id = self.highest_version_id.max(version.id);
        self.versions.insert(version.id, version);
    }

    /// Derived filename for a version name: "stem (name).ext" with path
    /// separators stripped out of the name.
    fn filename_for_version_name(&self, version_name: &str, extension: &str) -> String {
        let original = self
            .name()
            .unwrap_or("photo.jpg");
        let stem = match original.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => original,
        };
        let sanitized: String = version_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        format!("{stem} ({sanitized}).{extension}")
    }

    /// Create a derived version next to the default version's file,
    /// optionally duplicating the base version's file on disk.
    pub fn create_version(
        &mut self,
        fs: &dyn FileSystem,
        name: &str,
        base_version_id: u32,
        copy_file: bool,
        protected: bool,
    ) -> Result<u32, VersionError> {
        if self.version_name_exists(name) {
            return Err(VersionError::NameExists(name.to_string()));
        }
        let base = self
            .versions
            .get(&base_version_id)
            .ok_or(VersionError::NoSuchVersion(base_version_id))?;
        let extension = base.location.extension().unwrap_or("jpg").to_string();
        let source = base.location.path();

        let base_dir = self
            .default_version()
            .ok_or(VersionError::NoSuchVersion(self.default_version_id))?
            .location
            .base_dir
            .clone();
        let filename = self.filename_for_version_name(name, &extension);
        let location = Location::new(base_dir, filename);

        if copy_file {
            let dest = location.path();
            if fs.exists(&dest) {
                return Err(VersionError::TargetExists(dest));
            }
            fs.copy(&source, &dest, false)?;
        }

        self.add_version(location, name, protected)
    }

    /// Auto-numbered "Modified" / "Modified (n)" version, probing until
    /// both the name and the candidate file path are free.
    pub fn create_default_modified_version(
        &mut self,
        fs: &dyn FileSystem,
        base_version_id: u32,
        copy_file: bool,
    ) -> Result<u32, VersionError> {
        let base = self
            .versions
            .get(&base_version_id)
            .ok_or(VersionError::NoSuchVersion(base_version_id))?;
        let extension = base.location.extension().unwrap_or("jpg").to_string();
        let base_dir = self
            .default_version()
            .ok_or(VersionError::NoSuchVersion(self.default_version_id))?
            .location
            .base_dir
            .clone();

        let mut num = 1;
        loop {
            let name = if num == 1 {
                "Modified".to_string()
            } else {
                format!("Modified ({num})")
            };
            let filename = self.filename_for_version_name(&name, &extension);
            let candidate = base_dir.join(&filename);
            if !self.version_name_exists(&name) && !fs.exists(&candidate) {
                return self.create_version(fs, &name, base_version_id, copy_file, false);
            }
            num += 1;
        }
    }

    /// Auto-numbered "Modified in {label}" / "Modified in {label} (n)"
    /// version for edits performed by an external application.
    pub fn create_named_version(
        &mut self,
        fs: &dyn FileSystem,
        label: &str,
        base_version_id: u32,
        copy_file: bool,
    ) -> Result<u32, VersionError> {
        let base = self
            .versions
            .get(&base_version_id)
            .ok_or(VersionError::NoSuchVersion(base_version_id))?;
        let extension = base.location.extension().unwrap_or("jpg").to_string();
        let base_dir = self
            .default_version()
            .ok_or(VersionError::NoSuchVersion(self.default_version_id))?
            .location
            .base_dir
            .clone();

        let mut num = 1;
        loop {
            let name = if num == 1 {
                format!("Modified in {label}")
            } else {
                format!("Modified in {label} ({num})")
            };
            let filename = self.filename_for_version_name(&name, &extension);
            let candidate = base_dir.join(&filename);
            if !self.version_name_exists(&name) && !fs.exists(&candidate) {
                return self.create_version(fs, &name, base_version_id, copy_file, false);
            }
            num += 1;
        }
    }

    /// Delete a version. The original can only be removed with
    /// `remove_original` set. Unless `keep_file` is set, the backing file
    /// and its thumbnails are deleted and now-empty parent directories
    /// strictly inside `library_root` are cleaned up. If the removed
    /// version was the default, the default falls back to the highest
    /// surviving id.
    pub fn delete_version(
        &mut self,
        fs: &dyn FileSystem,
        thumbs: &dyn ThumbnailService,
        library_root: &Path,
        id: u32,
        remove_original: bool,
        keep_file: bool,
    ) -> Result<(), VersionError> {
        if id == ORIGINAL_VERSION_ID && !remove_original {
            return Err(VersionError::CannotDeleteOriginal);
        }
        let version = self
            .versions
            .get(&id)
            .ok_or(VersionError::NoSuchVersion(id))?;
        let path = version.location.path();

        if !keep_file {
            if fs.exists(&path) {
                fs.delete_file(&path)?;
            }
            thumbs.delete_thumbnails(&path);
            if let Some(parent) = path.parent() {
                delete_empty_directories(fs, library_root, parent);
            }
        }

        self.versions.remove(&id);

        if self.default_version_id == id {
            for candidate in (ORIGINAL_VERSION_ID..=self.highest_version_id).rev() {
                if self.versions.contains_key(&candidate) {
                    self.default_version_id = candidate;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Persist freshly rendered content for the default version.
    ///
    /// A new version is branched off when `force_new` is set or when the
    /// default version's format cannot be re-encoded (RAW originals).
    /// The default version pointer only moves after a successful write; a
    /// version allocated for a failed write is removed again.
    pub fn save_version(
        &mut self,
        fs: &dyn FileSystem,
        content: &[u8],
        force_new: bool,
    ) -> Result<u32, VersionError> {
        let reencodable = self
            .default_version()
            .ok_or(VersionError::NoSuchVersion(self.default_version_id))?
            .location
            .extension()
            .map(is_reencodable_extension)
            .unwrap_or(false);
        let branch = force_new || !reencodable;

        let target = if branch {
            self.create_default_modified_version(fs, self.default_version_id, false)?
        } else {
            self.default_version_id
        };

        let path = self
            .versions
            .get(&target)
            .ok_or(VersionError::NoSuchVersion(target))?
            .location
            .path();

        if let Err(e) = fs.write(&path, content) {
            if branch {
                // No partial state: the version allocated for this write
                // goes away again. The write failed, so there is no file.
                self.versions.remove(&target);
            }
            return Err(VersionError::Io(e));
        }

        let hash = format!("{:x}", Sha256::digest(content));
        if let Some(version) = self.versions.get_mut(&target) {
            version.content_hash = Some(hash);
        }
        self.default_version_id = target;
        Ok(target)
    }

    pub fn rename_version(&mut self, id: u32, new_name: &str) -> Result<(), VersionError> {
        if id == ORIGINAL_VERSION_ID {
            return Err(VersionError::CannotRenameOriginal);
        }
        if self.version_name_exists(new_name) {
            return Err(VersionError::NameExists(new_name.to_string()));
        }
        let version = self
            .versions
            .get_mut(&id)
            .ok_or(VersionError::NoSuchVersion(id))?;
        version.name = new_name.to_string();
        Ok(())
    }
}

/// Walk upward from `directory`, removing empty directories, stopping at
/// the library root or the first directory outside it. Best effort only.
fn delete_empty_directories(fs: &dyn FileSystem, library_root: &Path, directory: &Path) {
    let mut current = directory.to_path_buf();
    loop {
        if current == library_root || !current.starts_with(library_root) {
            return;
        }
        if !fs.exists(&current) {
            return;
        }
        match fs.dir_is_empty(&current) {
            Ok(true) => {
                debug!("Removing empty directory: {}", current.display());
                if let Err(e) = fs.delete_dir(&current) {
                    warn!("Failed to remove directory '{}': {e}", current.display());
                    return;
                }
            }
            _ => return,
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return,
        }
    }
}

fn is_reencodable_extension(ext: &str) -> bool {
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "jpg" | "jpeg" | "png" | "tif" | "tiff"
    )
}
