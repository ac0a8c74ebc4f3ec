//! SQLite-backed persistent store for rolls, photos, versions and tags.
//!
//! The store is deliberately dumb: the import orchestrator and the photo
//! aggregate own all interesting behavior, this module only maps them to
//! rows. Bulk imports disable eager flushing via [`LibraryDb::set_deferred_flush`];
//! callers must restore it on every exit path.

mod schema;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::model::{Location, Photo, Roll, Tag, Version};
use crate::scan::ImportItem;

pub use schema::SCHEMA;

pub struct LibraryDb {
    conn: Connection,
}

impl LibraryDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Toggle deferred flushing for bulk writes. While deferred, SQLite
    /// skips per-statement fsyncs; the caller is responsible for turning
    /// it back on when the batch ends, whatever the outcome.
    pub fn set_deferred_flush(&self, deferred: bool) -> Result<()> {
        let mode = if deferred { "OFF" } else { "FULL" };
        self.conn.pragma_update(None, "synchronous", mode)?;
        Ok(())
    }

    // ========================================================================
    // Rolls
    // ========================================================================

    pub fn create_roll(&self) -> Result<Roll> {
        let time = Utc::now();
        self.conn.execute(
            "INSERT INTO rolls (time) VALUES (?)",
            params![time.timestamp()],
        )?;
        Ok(Roll {
            id: self.conn.last_insert_rowid(),
            time,
        })
    }

    pub fn remove_roll(&self, roll_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM rolls WHERE id = ?", params![roll_id])?;
        Ok(())
    }

    pub fn roll_exists(&self, roll_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM rolls WHERE id = ?",
            params![roll_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Rolls that ended up with at least one photo, oldest first.
    pub fn rolls_with_content(&self) -> Result<Vec<Roll>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT r.id, r.time FROM rolls r \
             JOIN photos p ON p.roll_id = r.id ORDER BY r.time, r.id",
        )?;
        let rolls = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rolls
            .into_iter()
            .map(|(id, time)| Roll {
                id,
                time: DateTime::<Utc>::from_timestamp(time, 0).unwrap_or_else(Utc::now),
            })
            .collect())
    }

    pub fn photo_count_in_roll(&self, roll_id: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM photos WHERE roll_id = ?",
            params![roll_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ========================================================================
    // Photos
    // ========================================================================

    /// Create a photo row and one protected version per location carried
    /// by the candidate. The default version is the last one added, so a
    /// merged RAW+JPEG pair defaults to its JPEG half.
    pub fn create_photo_from(&self, item: &ImportItem, roll_id: i64) -> Result<Photo> {
        self.conn.execute(
            "INSERT INTO photos (time, roll_id, description, default_version_id, rating) \
             VALUES (?, ?, '', 1, 0)",
            params![item.time.timestamp(), roll_id],
        )?;
        let id = self.conn.last_insert_rowid();

        let mut photo = Photo::new(id, item.time, roll_id);
        let mut version_id = 0u32;
        for item_version in item.versions() {
            version_id += 1;
            let version = Version {
                id: version_id,
                name: item_version.label.clone(),
                location: item_version.location.clone(),
                content_hash: item_version.content_hash.clone(),
                protected: true,
            };
            self.insert_version(id, &version)?;
            photo.hydrate_version(version);
        }
        photo.set_default_version(version_id)?;
        self.conn.execute(
            "UPDATE photos SET default_version_id = ? WHERE id = ?",
            params![version_id, id],
        )?;

        Ok(photo)
    }

    fn insert_version(&self, photo_id: i64, version: &Version) -> Result<()> {
        self.conn.execute(
            "INSERT INTO photo_versions (photo_id, version_id, name, base_dir, filename, protected, content_hash) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                photo_id,
                version.id,
                version.name,
                version.location.base_dir.to_string_lossy(),
                version.location.filename,
                version.protected,
                version.content_hash,
            ],
        )?;
        Ok(())
    }

    /// Persist the photo's current state, replacing its version and tag
    /// rows wholesale.
    pub fn commit_photo(&self, photo: &Photo) -> Result<()> {
        self.conn.execute(
            "UPDATE photos SET time = ?, roll_id = ?, description = ?, default_version_id = ?, rating = ? \
             WHERE id = ?",
            params![
                photo.time.timestamp(),
                photo.roll_id,
                photo.description,
                photo.default_version_id(),
                photo.rating(),
                photo.id,
            ],
        )?;

        self.conn.execute(
            "DELETE FROM photo_versions WHERE photo_id = ?",
            params![photo.id],
        )?;
        for version in photo.versions() {
            self.insert_version(photo.id, version)?;
        }

        self.conn.execute(
            "DELETE FROM photo_tags WHERE photo_id = ?",
            params![photo.id],
        )?;
        for tag_id in photo.tags() {
            self.conn.execute(
                "INSERT OR IGNORE INTO photo_tags (photo_id, tag_id) VALUES (?, ?)",
                params![photo.id, tag_id],
            )?;
        }
        Ok(())
    }

    pub fn remove_photo(&self, photo_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM photo_tags WHERE photo_id = ?",
            params![photo_id],
        )?;
        self.conn.execute(
            "DELETE FROM photo_versions WHERE photo_id = ?",
            params![photo_id],
        )?;
        self.conn
            .execute("DELETE FROM photos WHERE id = ?", params![photo_id])?;
        Ok(())
    }

    pub fn get_photo(&self, photo_id: i64) -> Result<Option<Photo>> {
        let row = self
            .conn
            .query_row(
                "SELECT time, roll_id, description, default_version_id, rating \
                 FROM photos WHERE id = ?",
                params![photo_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, u32>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((time, roll_id, description, default_version_id, rating)) = row else {
            return Ok(None);
        };

        let time = DateTime::<Utc>::from_timestamp(time, 0).unwrap_or_else(Utc::now);
        let mut photo = Photo::new(photo_id, time, roll_id);
        photo.description = description;
        photo.set_rating(rating);

        let mut stmt = self.conn.prepare(
            "SELECT version_id, name, base_dir, filename, protected, content_hash \
             FROM photo_versions WHERE photo_id = ? ORDER BY version_id",
        )?;
        let versions = stmt.query_map(params![photo_id], |row| {
            Ok(Version {
                id: row.get(0)?,
                name: row.get(1)?,
                location: Location::new(
                    PathBuf::from(row.get::<_, String>(2)?),
                    row.get::<_, String>(3)?,
                ),
                protected: row.get(4)?,
                content_hash: row.get(5)?,
            })
        })?;
        for version in versions {
            photo.hydrate_version(version?);
        }
        // A dangling default means versions were force-removed; leave the
        // pointer where the fallback logic put it.
        let _ = photo.set_default_version(default_version_id);

        let mut stmt = self
            .conn
            .prepare("SELECT tag_id FROM photo_tags WHERE photo_id = ?")?;
        let tags = stmt.query_map(params![photo_id], |row| row.get::<_, i64>(0))?;
        for tag in tags {
            photo.add_tag(tag?);
        }

        Ok(Some(photo))
    }

    pub fn photo_count(&self) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Duplicate predicate: a candidate is already in the library when
    /// any of its version files sits at the exact same (base_dir,
    /// filename) location of a stored version row, or shares a content
    /// hash with one. Checking every version keeps the JPEG half of a
    /// merged RAW+JPEG pair from slipping back in on its own.
    pub fn has_duplicate(&self, item: &ImportItem) -> Result<bool> {
        for item_version in item.versions() {
            let location = &item_version.location;
            let count: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM photo_versions WHERE base_dir = ? AND filename = ?",
                params![location.base_dir.to_string_lossy(), location.filename],
                |row| row.get(0),
            )?;
            if count > 0 {
                return Ok(true);
            }

            if let Some(hash) = &item_version.content_hash {
                let count: i64 = self.conn.query_row(
                    "SELECT COUNT(*) FROM photo_versions WHERE content_hash = ?",
                    params![hash],
                    |row| row.get(0),
                )?;
                if count > 0 {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                "SELECT id, name, category_id, is_category, sort_priority, icon \
                 FROM tags WHERE name = ?",
                params![name],
                Self::tag_from_row,
            )
            .optional()?;
        Ok(tag)
    }

    pub fn create_tag(
        &self,
        name: &str,
        category_id: Option<i64>,
        is_category: bool,
        icon: Option<&str>,
    ) -> Result<Tag> {
        self.conn.execute(
            "INSERT INTO tags (name, category_id, is_category, sort_priority, icon) \
             VALUES (?, ?, ?, 0, ?)",
            params![name, category_id, is_category, icon],
        )?;
        Ok(Tag {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            category_id,
            is_category,
            sort_priority: 0,
            icon: icon.map(|s| s.to_string()),
        })
    }

    pub fn remove_tag(&self, tag_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM photo_tags WHERE tag_id = ?", params![tag_id])?;
        self.conn
            .execute("DELETE FROM tags WHERE id = ?", params![tag_id])?;
        Ok(())
    }

    fn tag_from_row(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
            category_id: row.get(2)?,
            is_category: row.get(3)?,
            sort_priority: row.get(4)?,
            icon: row.get(5)?,
        })
    }
}
