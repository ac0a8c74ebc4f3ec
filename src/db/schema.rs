pub const SCHEMA: &str = r#"
-- Import batches. Photos reference their roll; removing a roll never
-- removes its photos.
CREATE TABLE IF NOT EXISTS rolls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    time INTEGER NOT NULL
);

-- Photo aggregate roots
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    time INTEGER NOT NULL,
    roll_id INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    default_version_id INTEGER NOT NULL DEFAULT 1,
    rating INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_photos_roll ON photos(roll_id);

-- Version history. Locations are stored as a (base_dir, filename) pair.
CREATE TABLE IF NOT EXISTS photo_versions (
    photo_id INTEGER NOT NULL,
    version_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    base_dir TEXT NOT NULL,
    filename TEXT NOT NULL,
    protected INTEGER NOT NULL DEFAULT 0,
    content_hash TEXT,
    PRIMARY KEY (photo_id, version_id)
);

-- Both halves of the duplicate predicate: exact location and content hash
CREATE INDEX IF NOT EXISTS idx_versions_location ON photo_versions(base_dir, filename);
CREATE INDEX IF NOT EXISTS idx_versions_hash ON photo_versions(content_hash);

-- Tag hierarchy: categories and leaves in one table
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    category_id INTEGER,
    is_category INTEGER NOT NULL DEFAULT 0,
    sort_priority INTEGER NOT NULL DEFAULT 0,
    icon TEXT,
    FOREIGN KEY (category_id) REFERENCES tags(id)
);

CREATE TABLE IF NOT EXISTS photo_tags (
    photo_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (photo_id, tag_id)
);
"#;
