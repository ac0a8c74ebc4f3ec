//! Shoebox: the import and version-management core of a photo library.
//!
//! This crate ingests photos from a source location into a managed library
//! tree, performing duplicate detection, file relocation, metadata and tag
//! import, and thumbnail scheduling as a single logical transaction that can
//! be rolled back completely on cancellation or fatal failure. Imported
//! photos carry a multi-version edit history (original plus derived edits)
//! with safe deletion, renaming and default-version selection.
//!
//! GUI layers, cloud exporters and pixel-level image processing are external
//! collaborators and live outside this crate.

pub mod config;
pub mod db;
pub mod fs;
pub mod import;
pub mod logging;
pub mod model;
pub mod relocate;
pub mod scan;
pub mod thumbs;

pub use config::{Config, ImportPreferences, ScannerConfig};
pub use db::LibraryDb;
pub use import::{spawn_import, ImportController, ImportReport, ImportTask, ImportUpdate, ItemOutcome};
pub use model::{Location, Photo, Roll, Tag, Version, VersionError, ORIGINAL_VERSION_ID};
pub use scan::{ImportItem, Scanner};
