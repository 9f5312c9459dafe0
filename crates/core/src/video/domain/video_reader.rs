use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Frames in decode order. An `Err` item is one frame that failed to decode;
/// the iterator may still yield further frames after it.
pub type FrameIter<'a> = Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + 'a>;

/// Sequential frame source for a video (or single image) file.
///
/// Codec and container handling stay behind this trait; callers only see
/// RGB [`Frame`]s indexed from 0 and the stream's [`VideoMetadata`].
pub trait VideoReader: Send {
    /// Opens the file and returns its metadata. Fails if the path does not
    /// exist or no decoder can read it.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Decodes frames lazily, one per `next()`.
    fn frames(&mut self) -> FrameIter<'_>;

    /// Releases decoder resources. Safe to call more than once.
    fn close(&mut self);
}
