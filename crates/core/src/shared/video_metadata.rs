use std::path::PathBuf;

/// Stream-level facts about an opened video or image source.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container-reported frame count; 0 when the container does not say.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Images are represented as single-frame sources with `fps == 0`.
    pub fn is_still_image(&self) -> bool {
        self.fps <= 0.0 && self.total_frames <= 1
    }
}
