//! Filesystem abstraction.
//!
//! The import pipeline mutates both the database and the on-disk library
//! tree. Everything that touches the tree goes through this trait so the
//! relocation, rollback and version-management paths can be exercised in
//! tests without a real filesystem.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Copy `from` to `to` byte-for-byte. Fails if `to` exists and
    /// `overwrite` is false.
    fn copy(&self, from: &Path, to: &Path, overwrite: bool) -> Result<()>;

    fn delete_file(&self, path: &Path) -> Result<()>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a directory. Fails if it is not empty.
    fn delete_dir(&self, path: &Path) -> Result<()>;

    fn dir_is_empty(&self, path: &Path) -> Result<bool>;

    fn write(&self, path: &Path, content: &[u8]) -> Result<()>;
}

/// Production implementation backed by `std::fs`.
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn copy(&self, from: &Path, to: &Path, overwrite: bool) -> Result<()> {
        if !overwrite && to.exists() {
            anyhow::bail!("destination already exists: {}", to.display());
        }
        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .with_context(|| format!("Failed to delete {}", path.display()))?;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
        Ok(())
    }

    fn delete_dir(&self, path: &Path) -> Result<()> {
        fs::remove_dir(path)
            .with_context(|| format!("Failed to remove directory {}", path.display()))?;
        Ok(())
    }

    fn dir_is_empty(&self, path: &Path) -> Result<bool> {
        Ok(fs::read_dir(path)?.next().is_none())
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
