//! Thumbnail service seam.
//!
//! The import pipeline schedules thumbnail generation for freshly imported
//! photos but never waits for it; requests are fire-and-forget and do not
//! participate in the import transaction's outcome. Rendering itself is an
//! external collaborator.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Mutex;
use tracing::debug;

/// Priority used for requests issued during import, below interactive
/// browsing requests.
pub const PRIORITY_BACKGROUND: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailSize {
    Normal,
    Large,
}

pub trait ThumbnailService: Send + Sync {
    /// Schedule thumbnail generation for the file at `path`. Must not
    /// block and must not fail the caller.
    fn request(&self, path: &Path, size: ThumbnailSize, priority: u8);

    /// Drop any cached thumbnails for the file at `path`. Best effort.
    fn delete_thumbnails(&self, _path: &Path) {}
}

/// Service that ignores all requests.
pub struct NullThumbnailer;

impl ThumbnailService for NullThumbnailer {
    fn request(&self, path: &Path, _size: ThumbnailSize, _priority: u8) {
        debug!("Dropping thumbnail request for {}", path.display());
    }
}

#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub path: PathBuf,
    pub size: ThumbnailSize,
    pub priority: u8,
}

/// Forwards requests into an mpsc queue drained by a rendering worker
/// owned by the embedding application.
pub struct ChannelThumbnailer {
    tx: Mutex<mpsc::Sender<ThumbnailRequest>>,
}

impl ChannelThumbnailer {
    pub fn new() -> (Self, mpsc::Receiver<ThumbnailRequest>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }
}

impl ThumbnailService for ChannelThumbnailer {
    fn request(&self, path: &Path, size: ThumbnailSize, priority: u8) {
        let request = ThumbnailRequest {
            path: path.to_path_buf(),
            size,
            priority,
        };
        // A disconnected worker just means nobody renders thumbnails.
        if self.tx.lock().unwrap().send(request).is_err() {
            debug!("Thumbnail worker gone, dropping request");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_thumbnailer_forwards_requests() {
        let (thumbs, rx) = ChannelThumbnailer::new();
        thumbs.request(Path::new("/lib/a.jpg"), ThumbnailSize::Large, PRIORITY_BACKGROUND);

        let req = rx.try_recv().unwrap();
        assert_eq!(req.path, PathBuf::from("/lib/a.jpg"));
        assert_eq!(req.size, ThumbnailSize::Large);
        assert_eq!(req.priority, PRIORITY_BACKGROUND);
    }

    #[test]
    fn test_request_survives_dropped_receiver() {
        let (thumbs, rx) = ChannelThumbnailer::new();
        drop(rx);
        thumbs.request(Path::new("/lib/a.jpg"), ThumbnailSize::Normal, 0);
    }
}
