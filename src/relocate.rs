//! File relocation into the managed library tree.
//!
//! Pure relocation: file bytes are copied unchanged, destination names are
//! made collision free with a numeric suffix, and every (original, copied)
//! pair is recorded so the orchestrator can roll the batch back or remove
//! the originals afterwards. The candidate item is updated in place to
//! point at the new locations.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::fs::FileSystem;
use crate::model::Location;
use crate::scan::ImportItem;

pub struct FileTracker<'a> {
    fs: &'a dyn FileSystem,
    original_files: Vec<PathBuf>,
    copied_files: Vec<PathBuf>,
}

impl<'a> FileTracker<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self {
            fs,
            original_files: Vec::new(),
            copied_files: Vec::new(),
        }
    }

    /// Every source file this tracker has relocated, in copy order.
    pub fn original_files(&self) -> &[PathBuf] {
        &self.original_files
    }

    /// Every destination file this tracker has created, in copy order.
    pub fn copied_files(&self) -> &[PathBuf] {
        &self.copied_files
    }

    /// Copy each of the item's version files into `dest_dir` unless it is
    /// already there, plus the `.xmp` sidecar of the primary file if one
    /// exists. The sidecar is renamed along with the primary so the pair
    /// keeps a common stem.
    pub fn copy_if_needed(&mut self, item: &mut ImportItem, dest_dir: &Path) -> Result<()> {
        let source_sidecar = item.primary.location.sidecar();

        for version in item.versions_mut() {
            let source = version.location.path();
            let dest = unique_name(self.fs, dest_dir, &version.location.filename);
            if source == dest {
                continue;
            }

            debug!("Copying {} to {}", source.display(), dest.display());
            self.fs.copy(&source, &dest, false)?;
            self.original_files.push(source);
            self.copied_files.push(dest.clone());

            version.location =
                Location::from_path(&dest).expect("destination has a parent and a file name");
        }

        // The sidecar may legitimately collide with an earlier import of
        // the same photo, so overwriting is allowed for it.
        let sidecar_source = source_sidecar.path();
        if self.fs.exists(&sidecar_source) {
            let sidecar_dest = item.primary.location.sidecar().path();
            if sidecar_source != sidecar_dest {
                debug!(
                    "Copying sidecar {} to {}",
                    sidecar_source.display(),
                    sidecar_dest.display()
                );
                self.fs.copy(&sidecar_source, &sidecar_dest, true)?;
                self.original_files.push(sidecar_source);
                self.copied_files.push(sidecar_dest);
            }
        }

        Ok(())
    }
}

/// First collision-free destination path for `filename` in `dir`, probing
/// "stem-1.ext", "stem-2.ext", ... while the candidate exists.
pub fn unique_name(fs: &dyn FileSystem, dir: &Path, filename: &str) -> PathBuf {
    let mut dest = dir.join(filename);
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), Some(ext.to_string())),
        None => (filename.to_string(), None),
    };

    let mut i = 1;
    while fs.exists(&dest) {
        let numbered = match &ext {
            Some(ext) => format!("{stem}-{i}.{ext}"),
            None => format!("{stem}-{i}"),
        };
        dest = dir.join(numbered);
        i += 1;
    }
    dest
}
