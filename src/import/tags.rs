//! Applies sidecar metadata to freshly imported photos.
//!
//! Ratings never lower an existing rating. Keywords become tags under a
//! dedicated "Imported Tags" category; hierarchical keywords use `|` as
//! the path separator and materialize one category per intermediate
//! segment. Every tag created here is remembered so a cancelled import
//! can remove them again.

use anyhow::Result;
use tracing::{debug, warn};

use crate::db::LibraryDb;
use crate::model::{Photo, Tag};
use crate::scan::{metadata, ImportItem};

/// Root category all sidecar keywords land under.
pub const IMPORTED_TAGS_CATEGORY: &str = "Imported Tags";

const IMPORTED_TAGS_ICON: &str = "tag-new";

pub struct MetadataImporter<'a> {
    db: &'a LibraryDb,
    tags_created: Vec<Tag>,
}

impl<'a> MetadataImporter<'a> {
    pub fn new(db: &'a LibraryDb) -> Self {
        Self {
            db,
            tags_created: Vec::new(),
        }
    }

    /// Tags created by this importer so far, in creation order.
    pub fn tags_created(&self) -> &[Tag] {
        &self.tags_created
    }

    /// Apply the sidecar next to the item's primary file to `photo`.
    /// Returns whether the photo changed and needs to be committed.
    pub fn import(&mut self, photo: &mut Photo, item: &ImportItem) -> Result<bool> {
        let Some(meta) = metadata::read_sidecar(&item.primary.location.path()) else {
            return Ok(false);
        };

        let mut changed = false;
        if let Some(rating) = meta.rating {
            if rating > photo.rating() {
                changed |= photo.set_rating(rating);
            }
        }

        for keyword in &meta.keywords {
            let segments: Vec<&str> = keyword
                .split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if segments.is_empty() {
                continue;
            }
            let tag = self.ensure_tag_path(&segments)?;
            changed |= photo.add_tag(tag.id);
        }

        Ok(changed)
    }

    /// Remove every tag this importer created, most recent first. Best
    /// effort: a failed removal is logged and skipped.
    pub fn cancel(&mut self) {
        while let Some(tag) = self.tags_created.pop() {
            debug!("Removing tag created during cancelled import: {}", tag.name);
            if let Err(e) = self.db.remove_tag(tag.id) {
                warn!("Failed to remove tag '{}': {e}", tag.name);
            }
        }
    }

    /// The import committed; created tags are kept.
    pub fn finish(&mut self) {
        self.tags_created.clear();
    }

    fn ensure_root(&mut self) -> Result<Tag> {
        if let Some(tag) = self.db.find_tag_by_name(IMPORTED_TAGS_CATEGORY)? {
            return Ok(tag);
        }
        let tag = self
            .db
            .create_tag(IMPORTED_TAGS_CATEGORY, None, true, Some(IMPORTED_TAGS_ICON))?;
        self.tags_created.push(tag.clone());
        Ok(tag)
    }

    fn ensure_tag_path(&mut self, segments: &[&str]) -> Result<Tag> {
        let mut parent = self.ensure_root()?;
        for (i, segment) in segments.iter().enumerate() {
            let is_category = i + 1 < segments.len();
            parent = self.ensure_child(segment, parent.id, is_category)?;
        }
        Ok(parent)
    }

    fn ensure_child(&mut self, name: &str, parent_id: i64, is_category: bool) -> Result<Tag> {
        if let Some(tag) = self.db.find_tag_by_name(name)? {
            return Ok(tag);
        }
        let tag = self.db.create_tag(name, Some(parent_id), is_category, None)?;
        self.tags_created.push(tag.clone());
        Ok(tag)
    }
}
