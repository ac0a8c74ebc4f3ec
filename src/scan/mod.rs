//! Source enumeration: walks an import root and yields candidate items.
//!
//! Enumeration is lazy and best effort; unreadable entries are logged and
//! skipped. Non-image files are filtered out by the extension capability
//! check before any merging logic runs. With RAW+JPEG merging enabled, two
//! consecutively yielded files with the same base name collapse into one
//! candidate whose primary is the RAW file and whose extra version is the
//! JPEG.

pub mod hashing;
pub mod metadata;

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{ImportPreferences, ScannerConfig};
use crate::model::Location;

pub const ORIGINAL_VERSION_NAME: &str = "Original";
pub const ORIGINAL_RAW_VERSION_NAME: &str = "Original RAW";
pub const ORIGINAL_JPEG_VERSION_NAME: &str = "Original JPEG";

/// One version location carried by an import candidate.
#[derive(Debug, Clone)]
pub struct ItemVersion {
    pub label: String,
    pub location: Location,
    /// SHA-256 of this file's content, used for duplicate detection.
    /// Absent when the file could not be read.
    pub content_hash: Option<String>,
}

/// An import candidate: one primary location plus zero or more extra
/// version locations (the JPEG half of a merged RAW+JPEG pair).
#[derive(Debug, Clone)]
pub struct ImportItem {
    pub time: DateTime<Utc>,
    pub primary: ItemVersion,
    pub extra_versions: Vec<ItemVersion>,
    /// Set when the source could not be read at all; such items are
    /// reported as failed without aborting the batch.
    pub invalid: bool,
}

impl ImportItem {
    pub fn versions(&self) -> impl Iterator<Item = &ItemVersion> {
        std::iter::once(&self.primary).chain(self.extra_versions.iter())
    }

    pub fn versions_mut(&mut self) -> impl Iterator<Item = &mut ItemVersion> {
        std::iter::once(&mut self.primary).chain(self.extra_versions.iter_mut())
    }
}

pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Lazily enumerate import candidates below `root` in directory-walk
    /// order. Calling `scan` again restarts the walk from scratch.
    pub fn scan(&self, root: &Path, prefs: &ImportPreferences) -> ScanIter {
        let mut walk = WalkDir::new(root).follow_links(!prefs.ignore_symlinks);
        if !prefs.recurse_subdirectories {
            walk = walk.max_depth(1);
        }
        ScanIter {
            walk: walk.into_iter(),
            image_extensions: to_lower_set(&self.config.image_extensions),
            raw_extensions: to_lower_set(&self.config.raw_extensions),
            merge: prefs.merge_raw_and_jpeg,
            pending: None,
        }
    }
}

fn to_lower_set(extensions: &[String]) -> HashSet<String> {
    extensions.iter().map(|e| e.to_lowercase()).collect()
}

pub struct ScanIter {
    walk: walkdir::IntoIter,
    image_extensions: HashSet<String>,
    raw_extensions: HashSet<String>,
    merge: bool,
    pending: Option<ImportItem>,
}

impl ScanIter {
    fn next_file_item(&mut self) -> Option<ImportItem> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    // Best-effort enumeration: skip what we cannot read.
                    debug!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(ext) = extension_of(path) else {
                continue;
            };
            // Capability check: only files a loader can handle.
            if !self.image_extensions.contains(&ext) {
                continue;
            }
            return Some(scan_item(path));
        }
    }

    fn is_raw(&self, item: &ImportItem) -> bool {
        item.primary
            .location
            .extension()
            .map(|e| self.raw_extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    fn is_jpeg(&self, item: &ImportItem) -> bool {
        item.primary
            .location
            .extension()
            .map(|e| matches!(e.to_lowercase().as_str(), "jpg" | "jpeg"))
            .unwrap_or(false)
    }

    /// Merge two adjacent candidates when they form a RAW+JPEG pair with
    /// the same base name, in either yield order.
    fn try_merge(&self, first: &ImportItem, second: &ImportItem) -> Option<ImportItem> {
        let (raw, jpeg) = if self.is_raw(first) && self.is_jpeg(second) {
            (first, second)
        } else if self.is_jpeg(first) && self.is_raw(second) {
            (second, first)
        } else {
            return None;
        };

        let raw_loc = &raw.primary.location;
        let jpeg_loc = &jpeg.primary.location;
        if raw_loc.base_dir != jpeg_loc.base_dir || stem_of(raw_loc) != stem_of(jpeg_loc) {
            return None;
        }

        Some(ImportItem {
            time: raw.time,
            primary: ItemVersion {
                label: ORIGINAL_RAW_VERSION_NAME.to_string(),
                location: raw_loc.clone(),
                content_hash: raw.primary.content_hash.clone(),
            },
            extra_versions: vec![ItemVersion {
                label: ORIGINAL_JPEG_VERSION_NAME.to_string(),
                location: jpeg_loc.clone(),
                content_hash: jpeg.primary.content_hash.clone(),
            }],
            invalid: raw.invalid && jpeg.invalid,
        })
    }
}

impl Iterator for ScanIter {
    type Item = ImportItem;

    fn next(&mut self) -> Option<ImportItem> {
        loop {
            let Some(next) = self.next_file_item() else {
                return self.pending.take();
            };
            if !self.merge {
                return Some(next);
            }
            match self.pending.take() {
                None => {
                    self.pending = Some(next);
                }
                Some(previous) => {
                    if let Some(merged) = self.try_merge(&previous, &next) {
                        return Some(merged);
                    }
                    self.pending = Some(next);
                    return Some(previous);
                }
            }
        }
    }
}

/// Build one candidate from a file on disk. The timestamp comes from EXIF
/// when available, falling back to the file's modification time.
fn scan_item(path: &Path) -> ImportItem {
    let location = Location::from_path(path)
        .unwrap_or_else(|| Location::new(".", path.to_string_lossy().to_string()));

    let time = metadata::read_time(path)
        .or_else(|| file_mtime(path))
        .unwrap_or_else(Utc::now);

    let (content_hash, invalid) = match hashing::content_hash(path) {
        Ok(hash) => (Some(hash), false),
        Err(e) => {
            debug!("Failed to hash {}: {e}", path.display());
            (None, true)
        }
    };

    ImportItem {
        time,
        primary: ItemVersion {
            label: ORIGINAL_VERSION_NAME.to_string(),
            location,
            content_hash,
        },
        extra_versions: Vec::new(),
        invalid,
    }
}

fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

fn stem_of(location: &Location) -> &str {
    match location.filename.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => location.filename.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn scanner() -> Scanner {
        Scanner::new(ScannerConfig::default())
    }

    fn prefs(merge: bool, recurse: bool) -> ImportPreferences {
        ImportPreferences {
            merge_raw_and_jpeg: merge,
            recurse_subdirectories: recurse,
            ..ImportPreferences::default()
        }
    }

    fn touch(path: &Path, content: &[u8]) {
        let mut f = File::create(path).unwrap();
        f.write_all(content).unwrap();
    }

    #[test]
    fn test_scan_filters_non_images() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("photo.jpg"), b"a");
        touch(&dir.path().join("notes.txt"), b"b");

        let items: Vec<_> = scanner().scan(dir.path(), &prefs(false, true)).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].primary.location.filename, "photo.jpg");
    }

    #[test]
    fn test_scan_recursion_flag() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("top.jpg"), b"a");
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub/nested.jpg"), b"b");

        let flat: Vec<_> = scanner().scan(dir.path(), &prefs(false, false)).collect();
        assert_eq!(flat.len(), 1);

        let deep: Vec<_> = scanner().scan(dir.path(), &prefs(false, true)).collect();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_merge_raw_and_jpeg_pair() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("img001.cr2"), b"raw");
        touch(&dir.path().join("img001.jpg"), b"jpeg");

        let items: Vec<_> = scanner().scan(dir.path(), &prefs(true, true)).collect();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.primary.label, ORIGINAL_RAW_VERSION_NAME);
        assert_eq!(item.primary.location.filename, "img001.cr2");
        assert_eq!(item.extra_versions.len(), 1);
        assert_eq!(item.extra_versions[0].label, ORIGINAL_JPEG_VERSION_NAME);
        assert_eq!(item.extra_versions[0].location.filename, "img001.jpg");
        // Both halves keep their own content hash.
        assert!(item.primary.content_hash.is_some());
        assert!(item.extra_versions[0].content_hash.is_some());
        assert_ne!(
            item.primary.content_hash,
            item.extra_versions[0].content_hash
        );
    }

    #[test]
    fn test_no_merge_for_different_stems() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("img001.cr2"), b"raw");
        touch(&dir.path().join("img002.jpg"), b"jpeg");

        let items: Vec<_> = scanner().scan(dir.path(), &prefs(true, true)).collect();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.extra_versions.is_empty()));
    }

    #[test]
    fn test_merge_disabled_yields_two_candidates() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("img001.cr2"), b"raw");
        touch(&dir.path().join("img001.jpg"), b"jpeg");

        let items: Vec<_> = scanner().scan(dir.path(), &prefs(false, true)).collect();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_scan_is_restartable() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.jpg"), b"a");

        let s = scanner();
        let p = prefs(false, true);
        assert_eq!(s.scan(dir.path(), &p).count(), 1);
        assert_eq!(s.scan(dir.path(), &p).count(), 1);
    }

    #[test]
    fn test_scanned_item_has_hash() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.jpg"), b"content");

        let items: Vec<_> = scanner().scan(dir.path(), &prefs(false, true)).collect();
        assert!(!items[0].invalid);
        assert!(items[0].primary.content_hash.is_some());
    }
}
