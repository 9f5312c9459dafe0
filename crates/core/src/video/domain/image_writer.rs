use std::path::Path;

use crate::shared::frame::Frame;

/// Persists one frame as an image file.
///
/// Three-channel frames are written as RGB, single-channel frames (masks)
/// as grayscale. The format follows the path's extension.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
