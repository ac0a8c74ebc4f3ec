//! The import pipeline: enumerated candidates go in, library photos come
//! out.
//!
//! An import is transactional at the batch level and isolated at the item
//! level. One unreadable or otherwise failing item is reported and skipped
//! without disturbing the rest of the batch; cancellation rolls the whole
//! batch back, removing created photos, copied files, created directories
//! and created tags, and finally the roll itself. Cancellation is
//! cooperative and checked once per item, so the item in flight always
//! completes or fails on its own terms.

pub mod tags;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::{debug, info, warn};

use crate::config::ImportPreferences;
use crate::db::LibraryDb;
use crate::fs::FileSystem;
use crate::relocate::FileTracker;
use crate::scan::ImportItem;
use crate::thumbs::{ThumbnailService, ThumbnailSize, PRIORITY_BACKGROUND};

use tags::MetadataImporter;

/// What became of a single candidate.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Imported { photo_id: i64 },
    /// Already in the library. Not an error and not an import.
    SkippedDuplicate,
    /// The source could not be read at all.
    SkippedInvalid,
    Failed { reason: String },
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub roll_id: i64,
    /// Ids of photos created by this batch. Empty after a rollback.
    pub imported: Vec<i64>,
    pub duplicates: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub rolled_back: bool,
}

pub struct ImportController {
    fs: Arc<dyn FileSystem>,
    thumbs: Arc<dyn ThumbnailService>,
    library_root: PathBuf,
    prefs: ImportPreferences,
}

impl ImportController {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        thumbs: Arc<dyn ThumbnailService>,
        library_root: impl Into<PathBuf>,
        prefs: ImportPreferences,
    ) -> Self {
        Self {
            fs,
            thumbs,
            library_root: library_root.into(),
            prefs,
        }
    }

    /// Destination directory for a photo taken at `time`: a
    /// year/month/day tree below the library root.
    pub fn find_import_destination(&self, time: DateTime<Utc>) -> PathBuf {
        self.library_root
            .join(time.format("%Y").to_string())
            .join(time.format("%m").to_string())
            .join(time.format("%d").to_string())
    }

    /// Run a batch to completion, rollback or cancellation.
    ///
    /// `attach_tags` are attached to every photo of the batch on top of
    /// whatever the sidecar metadata contributes. `on_progress` is called
    /// once per item, before the item is processed, with the 1-based
    /// index, the total and the filename. Errors returned here are
    /// batch-fatal setup failures only; item failures end up in the
    /// report instead.
    pub fn do_import(
        &self,
        db: &LibraryDb,
        items: Vec<ImportItem>,
        attach_tags: &[i64],
        cancel: &AtomicBool,
        mut on_progress: impl FnMut(usize, usize, &str),
    ) -> Result<ImportReport> {
        if self.prefs.copy_files {
            self.fs.create_dir_all(&self.library_root)?;
        }
        db.set_deferred_flush(true)?;
        let roll = match db.create_roll() {
            Ok(roll) => roll,
            Err(e) => {
                if let Err(restore) = db.set_deferred_flush(false) {
                    warn!("Failed to restore flushing: {restore}");
                }
                return Err(e);
            }
        };
        info!("Starting import of {} items into roll {}", items.len(), roll.id);

        let mut report = ImportReport {
            roll_id: roll.id,
            ..ImportReport::default()
        };
        let mut tags = MetadataImporter::new(db);
        let mut created_directories: Vec<PathBuf> = Vec::new();
        let mut original_files: Vec<PathBuf> = Vec::new();
        let mut copied_files: Vec<PathBuf> = Vec::new();

        let total = items.len();
        let mut cancelled = false;

        for (index, mut item) in items.into_iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }
            on_progress(index + 1, total, &item.primary.location.filename);

            let source = item.primary.location.path();
            let outcome = self.import_one(
                db,
                &mut item,
                roll.id,
                attach_tags,
                &mut tags,
                &mut created_directories,
                &mut original_files,
                &mut copied_files,
            );
            match outcome {
                ItemOutcome::Imported { photo_id } => report.imported.push(photo_id),
                ItemOutcome::SkippedDuplicate => {
                    debug!("Skipping duplicate {}", source.display());
                    report.duplicates.push(source);
                }
                ItemOutcome::SkippedInvalid => {
                    warn!("Skipping unreadable source {}", source.display());
                    report
                        .failed
                        .push((source, "source file could not be read".to_string()));
                }
                ItemOutcome::Failed { reason } => {
                    warn!("Failed to import {}: {reason}", source.display());
                    report.failed.push((source, reason));
                }
            }
        }

        if cancelled {
            self.rollback_import(
                db,
                roll.id,
                &report.imported,
                &copied_files,
                &created_directories,
                &mut tags,
            );
            report.imported.clear();
            report.rolled_back = true;
        } else {
            self.finish_import(&original_files, &mut tags);
        }

        // Cleanup runs whatever the outcome.
        if let Err(e) = db.set_deferred_flush(false) {
            warn!("Failed to restore flushing: {e}");
        }
        match db.photo_count_in_roll(roll.id) {
            Ok(0) => {
                if let Err(e) = db.remove_roll(roll.id) {
                    warn!("Failed to remove empty roll {}: {e}", roll.id);
                }
            }
            Ok(count) => info!("Imported {count} photos into roll {}", roll.id),
            Err(e) => warn!("Failed to count photos in roll {}: {e}", roll.id),
        }

        Ok(report)
    }

    fn import_one(
        &self,
        db: &LibraryDb,
        item: &mut ImportItem,
        roll_id: i64,
        attach_tags: &[i64],
        tags: &mut MetadataImporter,
        created_directories: &mut Vec<PathBuf>,
        original_files: &mut Vec<PathBuf>,
        copied_files: &mut Vec<PathBuf>,
    ) -> ItemOutcome {
        if item.invalid {
            return ItemOutcome::SkippedInvalid;
        }
        if self.prefs.duplicate_detect {
            match db.has_duplicate(item) {
                Ok(true) => return ItemOutcome::SkippedDuplicate,
                Ok(false) => {}
                Err(e) => {
                    return ItemOutcome::Failed {
                        reason: format!("duplicate check failed: {e}"),
                    }
                }
            }
        }

        let mut tracker = FileTracker::new(self.fs.as_ref());
        match self.place_and_record(
            db,
            item,
            roll_id,
            attach_tags,
            tags,
            created_directories,
            &mut tracker,
        ) {
            Ok(photo_id) => {
                original_files.extend_from_slice(tracker.original_files());
                copied_files.extend_from_slice(tracker.copied_files());
                ItemOutcome::Imported { photo_id }
            }
            Err(e) => {
                // A failed item leaves no stray files behind.
                for copied in tracker.copied_files() {
                    if self.fs.exists(copied) {
                        if let Err(del) = self.fs.delete_file(copied) {
                            warn!(
                                "Failed to remove {} after failed import: {del}",
                                copied.display()
                            );
                        }
                    }
                }
                ItemOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn place_and_record(
        &self,
        db: &LibraryDb,
        item: &mut ImportItem,
        roll_id: i64,
        attach_tags: &[i64],
        tags: &mut MetadataImporter,
        created_directories: &mut Vec<PathBuf>,
        tracker: &mut FileTracker,
    ) -> Result<i64> {
        if self.prefs.copy_files {
            let destination = self.find_import_destination(item.time);
            self.ensure_directory(&destination, created_directories)?;
            tracker.copy_if_needed(item, &destination)?;
        }

        let mut photo = db.create_photo_from(item, roll_id)?;

        let mut changed = false;
        for tag_id in attach_tags {
            changed |= photo.add_tag(*tag_id);
        }

        // Sidecar metadata is best effort and never fails the item.
        match tags.import(&mut photo, item) {
            Ok(true) => changed = true,
            Ok(false) => {}
            Err(e) => warn!(
                "Failed to apply sidecar metadata for {}: {e}",
                item.primary.location.filename
            ),
        }
        if changed {
            db.commit_photo(&photo)?;
        }

        if let Some(version) = photo.default_version() {
            self.thumbs.request(
                &version.location.path(),
                ThumbnailSize::Large,
                PRIORITY_BACKGROUND,
            );
        }
        Ok(photo.id)
    }

    /// Create `destination` and record every path component that did not
    /// exist beforehand, shallowest first, so rollback can remove them
    /// deepest first.
    fn ensure_directory(
        &self,
        destination: &Path,
        created_directories: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let mut missing = Vec::new();
        let mut current = destination.to_path_buf();
        while !self.fs.exists(&current) {
            missing.push(current.clone());
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        self.fs.create_dir_all(destination)?;
        created_directories.extend(missing.into_iter().rev());
        Ok(())
    }

    /// Undo everything the batch did so far: photos, copied files,
    /// created directories (deepest first), created tags, the roll.
    /// Each step is best effort so one stubborn file cannot block the
    /// rest of the rollback.
    fn rollback_import(
        &self,
        db: &LibraryDb,
        roll_id: i64,
        photo_ids: &[i64],
        copied_files: &[PathBuf],
        created_directories: &[PathBuf],
        tags: &mut MetadataImporter,
    ) {
        info!(
            "Rolling back import: {} photos, {} copied files",
            photo_ids.len(),
            copied_files.len()
        );
        for photo_id in photo_ids {
            if let Err(e) = db.remove_photo(*photo_id) {
                warn!("Failed to remove photo {photo_id} during rollback: {e}");
            }
        }
        for file in copied_files {
            if self.fs.exists(file) {
                if let Err(e) = self.fs.delete_file(file) {
                    warn!("Failed to remove {} during rollback: {e}", file.display());
                }
            }
        }
        for directory in created_directories.iter().rev() {
            if !self.fs.exists(directory) {
                continue;
            }
            match self.fs.dir_is_empty(directory) {
                Ok(true) => {
                    if let Err(e) = self.fs.delete_dir(directory) {
                        warn!(
                            "Failed to remove directory {} during rollback: {e}",
                            directory.display()
                        );
                    }
                }
                _ => debug!(
                    "Leaving non-empty directory {} in place",
                    directory.display()
                ),
            }
        }
        tags.cancel();
        if let Err(e) = db.remove_roll(roll_id) {
            warn!("Failed to remove roll {roll_id} during rollback: {e}");
        }
    }

    /// The batch committed. Created tags are kept and, when requested,
    /// the source files are removed.
    fn finish_import(&self, original_files: &[PathBuf], tags: &mut MetadataImporter) {
        if self.prefs.copy_files && self.prefs.remove_originals {
            for original in original_files {
                debug!("Removing imported original {}", original.display());
                if let Err(e) = self.fs.delete_file(original) {
                    warn!("Failed to remove original {}: {e}", original.display());
                }
            }
        }
        tags.finish();
    }
}

/// Update messages sent from a background import via its channel.
#[derive(Debug)]
pub enum ImportUpdate {
    Started { total: usize },
    Progress { current: usize, total: usize, filename: String },
    Completed(ImportReport),
    Failed { error: String },
}

/// A running background import. Set `cancel_flag` to request rollback;
/// joining the handle returns the database once the worker is done.
pub struct ImportTask {
    pub cancel_flag: Arc<AtomicBool>,
    pub updates: mpsc::Receiver<ImportUpdate>,
    pub handle: thread::JoinHandle<LibraryDb>,
}

impl ImportTask {
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }
}

/// Run the batch on a worker thread, streaming [`ImportUpdate`]s back.
pub fn spawn_import(
    controller: ImportController,
    db: LibraryDb,
    items: Vec<ImportItem>,
    attach_tags: Vec<i64>,
) -> ImportTask {
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel = Arc::clone(&cancel_flag);
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let _ = tx.send(ImportUpdate::Started { total: items.len() });
        let result = controller.do_import(&db, items, &attach_tags, &cancel, |current, total, filename| {
            let _ = tx.send(ImportUpdate::Progress {
                current,
                total,
                filename: filename.to_string(),
            });
        });
        match result {
            Ok(report) => {
                let _ = tx.send(ImportUpdate::Completed(report));
            }
            Err(e) => {
                let _ = tx.send(ImportUpdate::Failed {
                    error: e.to_string(),
                });
            }
        }
        db
    });

    ImportTask {
        cancel_flag,
        updates: rx,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mem::MemFileSystem;
    use crate::fs::StdFileSystem;
    use crate::model::Location;
    use crate::scan::{ItemVersion, ORIGINAL_VERSION_NAME};
    use crate::thumbs::{ChannelThumbnailer, NullThumbnailer};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn item(path: &str, hash: &str) -> ImportItem {
        ImportItem {
            time: Utc.with_ymd_and_hms(2016, 2, 6, 12, 0, 0).unwrap(),
            primary: ItemVersion {
                label: ORIGINAL_VERSION_NAME.to_string(),
                location: Location::from_path(Path::new(path)).unwrap(),
                content_hash: Some(hash.to_string()),
            },
            extra_versions: Vec::new(),
            invalid: false,
        }
    }

    fn controller(fs: Arc<dyn FileSystem>, prefs: ImportPreferences) -> ImportController {
        ImportController::new(fs, Arc::new(NullThumbnailer), "/lib", prefs)
    }

    fn no_progress(_: usize, _: usize, _: &str) {}

    #[test]
    fn test_import_copies_into_dated_tree() {
        let fs = Arc::new(MemFileSystem::with_files(&["/source/photo.jpg"]));
        fs.create_dir_all(Path::new("/lib")).unwrap();
        let db = LibraryDb::open_in_memory().unwrap();
        let controller = controller(fs.clone(), ImportPreferences::default());

        let cancel = AtomicBool::new(false);
        let report = controller
            .do_import(&db, vec![item("/source/photo.jpg", "h1")], &[], &cancel, no_progress)
            .unwrap();

        assert_eq!(report.imported.len(), 1);
        assert!(!report.rolled_back);
        assert!(fs.exists(Path::new("/lib/2016/02/06/photo.jpg")));
        // Source is kept unless removal was requested.
        assert!(fs.exists(Path::new("/source/photo.jpg")));

        let photo = db.get_photo(report.imported[0]).unwrap().unwrap();
        assert_eq!(
            photo.default_version().unwrap().location.path(),
            PathBuf::from("/lib/2016/02/06/photo.jpg")
        );
        assert!(db.roll_exists(report.roll_id).unwrap());
    }

    #[test]
    fn test_copy_disabled_keeps_location() {
        let fs = Arc::new(MemFileSystem::with_files(&["/elsewhere/photo.jpg"]));
        let db = LibraryDb::open_in_memory().unwrap();
        let prefs = ImportPreferences {
            copy_files: false,
            ..ImportPreferences::default()
        };
        let controller = controller(fs.clone(), prefs);

        let cancel = AtomicBool::new(false);
        let report = controller
            .do_import(
                &db,
                vec![item("/elsewhere/photo.jpg", "h1")],
                &[],
                &cancel,
                no_progress,
            )
            .unwrap();

        let photo = db.get_photo(report.imported[0]).unwrap().unwrap();
        assert_eq!(
            photo.default_version().unwrap().location.path(),
            PathBuf::from("/elsewhere/photo.jpg")
        );
        assert!(fs.copies().is_empty());
    }

    #[test]
    fn test_duplicate_is_skipped() {
        let fs = Arc::new(MemFileSystem::with_files(&["/source/photo.jpg"]));
        fs.create_dir_all(Path::new("/lib")).unwrap();
        let db = LibraryDb::open_in_memory().unwrap();
        let controller = controller(fs.clone(), ImportPreferences::default());

        let cancel = AtomicBool::new(false);
        controller
            .do_import(&db, vec![item("/source/photo.jpg", "same")], &[], &cancel, no_progress)
            .unwrap();
        let copies_after_first = fs.copies().len();
        let report = controller
            .do_import(&db, vec![item("/source/photo.jpg", "same")], &[], &cancel, no_progress)
            .unwrap();

        assert!(report.imported.is_empty());
        assert_eq!(report.duplicates, [PathBuf::from("/source/photo.jpg")]);
        assert_eq!(db.photo_count().unwrap(), 1);
        // The skipped duplicate produced no new files.
        assert_eq!(fs.copies().len(), copies_after_first);
        // The empty second roll is removed again.
        assert!(!db.roll_exists(report.roll_id).unwrap());
    }

    #[test]
    fn test_invalid_item_does_not_abort_batch() {
        let fs = Arc::new(MemFileSystem::with_files(&[
            "/source/a.jpg",
            "/source/c.jpg",
        ]));
        fs.create_dir_all(Path::new("/lib")).unwrap();
        let db = LibraryDb::open_in_memory().unwrap();
        let controller = controller(fs.clone(), ImportPreferences::default());

        let mut broken = item("/source/b.jpg", "h2");
        broken.invalid = true;
        broken.primary.content_hash = None;

        let cancel = AtomicBool::new(false);
        let report = controller
            .do_import(
                &db,
                vec![
                    item("/source/a.jpg", "h1"),
                    broken,
                    item("/source/c.jpg", "h3"),
                ],
                &[],
                &cancel,
                no_progress,
            )
            .unwrap();

        assert_eq!(report.imported.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, PathBuf::from("/source/b.jpg"));
        assert!(!report.rolled_back);
        assert_eq!(db.photo_count().unwrap(), 2);
    }

    #[test]
    fn test_cancellation_rolls_everything_back() {
        let fs = Arc::new(MemFileSystem::with_files(&[
            "/source/a.jpg",
            "/source/b.jpg",
        ]));
        fs.create_dir_all(Path::new("/lib")).unwrap();
        let db = LibraryDb::open_in_memory().unwrap();
        let controller = controller(fs.clone(), ImportPreferences::default());

        let cancel = AtomicBool::new(false);
        let report = controller
            .do_import(
                &db,
                vec![item("/source/a.jpg", "h1"), item("/source/b.jpg", "h2")],
                &[],
                &cancel,
                |current, _, _| {
                    // Request cancellation after the first item is in.
                    if current == 1 {
                        cancel.store(true, Ordering::SeqCst);
                    }
                },
            )
            .unwrap();

        assert!(report.rolled_back);
        assert!(report.imported.is_empty());
        assert_eq!(db.photo_count().unwrap(), 0);
        assert!(!db.roll_exists(report.roll_id).unwrap());
        // Copied file and the dated directories are gone, the root stays.
        assert!(!fs.exists(Path::new("/lib/2016/02/06/a.jpg")));
        assert!(!fs.has_dir(Path::new("/lib/2016/02/06")));
        assert!(!fs.has_dir(Path::new("/lib/2016")));
        assert!(fs.has_dir(Path::new("/lib")));
        // Sources are untouched by a rollback.
        assert!(fs.exists(Path::new("/source/a.jpg")));
    }

    #[test]
    fn test_remove_originals_after_commit() {
        let fs = Arc::new(MemFileSystem::with_files(&["/source/photo.jpg"]));
        fs.create_dir_all(Path::new("/lib")).unwrap();
        let db = LibraryDb::open_in_memory().unwrap();
        let prefs = ImportPreferences {
            remove_originals: true,
            ..ImportPreferences::default()
        };
        let controller = controller(fs.clone(), prefs);

        let cancel = AtomicBool::new(false);
        let report = controller
            .do_import(&db, vec![item("/source/photo.jpg", "h1")], &[], &cancel, no_progress)
            .unwrap();

        assert_eq!(report.imported.len(), 1);
        assert!(!fs.exists(Path::new("/source/photo.jpg")));
        assert!(fs.exists(Path::new("/lib/2016/02/06/photo.jpg")));
    }

    #[test]
    fn test_batch_tags_are_attached_to_every_photo() {
        let fs = Arc::new(MemFileSystem::with_files(&[
            "/source/a.jpg",
            "/source/b.jpg",
        ]));
        let db = LibraryDb::open_in_memory().unwrap();
        let trip = db.create_tag("Trip 2016", None, false, None).unwrap();
        let controller = controller(fs, ImportPreferences::default());

        let cancel = AtomicBool::new(false);
        let report = controller
            .do_import(
                &db,
                vec![item("/source/a.jpg", "h1"), item("/source/b.jpg", "h2")],
                &[trip.id],
                &cancel,
                no_progress,
            )
            .unwrap();

        assert_eq!(report.imported.len(), 2);
        for photo_id in &report.imported {
            let photo = db.get_photo(*photo_id).unwrap().unwrap();
            assert!(photo.has_tag(trip.id));
        }
    }

    #[test]
    fn test_imported_photo_gets_thumbnail_request() {
        let fs = Arc::new(MemFileSystem::with_files(&["/source/photo.jpg"]));
        fs.create_dir_all(Path::new("/lib")).unwrap();
        let db = LibraryDb::open_in_memory().unwrap();
        let (thumbs, thumb_rx) = ChannelThumbnailer::new();
        let controller = ImportController::new(
            fs,
            Arc::new(thumbs),
            "/lib",
            ImportPreferences::default(),
        );

        let cancel = AtomicBool::new(false);
        controller
            .do_import(&db, vec![item("/source/photo.jpg", "h1")], &[], &cancel, no_progress)
            .unwrap();

        let request = thumb_rx.try_recv().unwrap();
        assert_eq!(request.path, PathBuf::from("/lib/2016/02/06/photo.jpg"));
        assert_eq!(request.priority, PRIORITY_BACKGROUND);
    }

    #[test]
    fn test_empty_batch_leaves_no_roll() {
        let fs = Arc::new(MemFileSystem::new());
        let db = LibraryDb::open_in_memory().unwrap();
        let controller = controller(fs, ImportPreferences::default());

        let cancel = AtomicBool::new(false);
        let report = controller
            .do_import(&db, Vec::new(), &[], &cancel, no_progress)
            .unwrap();
        assert!(!db.roll_exists(report.roll_id).unwrap());
    }

    #[test]
    fn test_sidecar_metadata_is_applied_on_real_files() {
        let source = tempdir().unwrap();
        let library = tempdir().unwrap();
        let image = source.path().join("photo.jpg");
        std::fs::write(&image, b"pixels").unwrap();
        std::fs::write(
            source.path().join("photo.xmp"),
            r#"<rdf:Description xmp:Rating="4">
               <dc:subject><rdf:Bag><rdf:li>holiday</rdf:li></rdf:Bag></dc:subject>
               </rdf:Description>"#,
        )
        .unwrap();

        let db = LibraryDb::open_in_memory().unwrap();
        let controller = ImportController::new(
            Arc::new(StdFileSystem),
            Arc::new(NullThumbnailer),
            library.path(),
            ImportPreferences::default(),
        );

        let candidate = item(&image.to_string_lossy(), "h1");
        let cancel = AtomicBool::new(false);
        let report = controller
            .do_import(&db, vec![candidate], &[], &cancel, no_progress)
            .unwrap();

        assert_eq!(report.imported.len(), 1);
        let photo = db.get_photo(report.imported[0]).unwrap().unwrap();
        assert_eq!(photo.rating(), 4);
        let holiday = db.find_tag_by_name("holiday").unwrap().unwrap();
        assert!(photo.has_tag(holiday.id));

        // The sidecar traveled with the photo into the library.
        let dest = photo.default_version().unwrap().location.sidecar().path();
        assert!(dest.exists());
    }

    #[test]
    fn test_spawn_import_streams_updates() {
        let fs = Arc::new(MemFileSystem::with_files(&["/source/photo.jpg"]));
        fs.create_dir_all(Path::new("/lib")).unwrap();
        let db = LibraryDb::open_in_memory().unwrap();
        let controller = controller(fs, ImportPreferences::default());

        let task = spawn_import(
            controller,
            db,
            vec![item("/source/photo.jpg", "h1")],
            Vec::new(),
        );

        let mut saw_started = false;
        let mut saw_progress = false;
        let mut report = None;
        for update in task.updates.iter() {
            match update {
                ImportUpdate::Started { total } => {
                    assert_eq!(total, 1);
                    saw_started = true;
                }
                ImportUpdate::Progress { filename, .. } => {
                    assert_eq!(filename, "photo.jpg");
                    saw_progress = true;
                }
                ImportUpdate::Completed(r) => {
                    report = Some(r);
                    break;
                }
                ImportUpdate::Failed { error } => panic!("import failed: {error}"),
            }
        }
        assert!(saw_started);
        assert!(saw_progress);
        assert_eq!(report.unwrap().imported.len(), 1);

        let db = task.handle.join().unwrap();
        assert_eq!(db.photo_count().unwrap(), 1);
    }
}
