use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameIter, VideoReader};

use super::ffmpeg_util::RgbDecoder;

/// Adapts a single image file to the [`VideoReader`] interface.
///
/// The image is a one-frame video with `fps=0` and `total_frames=1`.
/// Decoding goes through ffmpeg, which is much faster than the `image`
/// crate on large JPEGs.
pub struct ImageFileReader {
    frame: Option<Frame>,
}

// Safety: ImageFileReader holds no ffmpeg state between calls.
unsafe impl Send for ImageFileReader {}

impl ImageFileReader {
    pub fn new() -> Self {
        Self { frame: None }
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let frame = decode_image(path)?;
        let metadata = VideoMetadata {
            width: frame.width(),
            height: frame.height(),
            fps: 0.0,
            total_frames: 1,
            codec: String::new(),
            source_path: Some(path.to_path_buf()),
        };
        self.frame = Some(frame);
        Ok(metadata)
    }

    fn frames(&mut self) -> FrameIter<'_> {
        match self.frame.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err("ImageFileReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}

/// Decodes each path into an RGB frame, indexed by position in `paths`.
///
/// Fails on the first unreadable file, naming it.
pub fn load_images<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Frame>, Box<dyn std::error::Error>> {
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let path = path.as_ref();
            decode_image(path)
                .map(|frame| frame.with_index(i))
                .map_err(|e| format!("cannot read image {}: {e}", path.display()).into())
        })
        .collect()
}

fn decode_image(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    ffmpeg_next::init()?;
    let mut ictx = ffmpeg_next::format::input(path)?;
    let mut decoder = RgbDecoder::for_input(&ictx)?;

    for (stream, packet) in ictx.packets() {
        if stream.index() != decoder.stream_index {
            continue;
        }
        decoder.decoder.send_packet(&packet)?;
        if let Some(frame) = decoder.receive(0) {
            return frame;
        }
    }

    // Some formats only release the single frame on flush.
    let _ = decoder.decoder.send_eof();
    decoder
        .receive(0)
        .unwrap_or_else(|| Err("Failed to decode image".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([50, 100, 200]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_open_returns_image_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "test.png", 100, 80);
        let mut reader = ImageFileReader::new();
        let meta = reader.open(&path).unwrap();
        assert_eq!(meta.width, 100);
        assert_eq!(meta.height, 80);
        assert!(meta.is_still_image());
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let mut reader = ImageFileReader::new();
        assert!(reader.open(Path::new("/nonexistent/test.png")).is_err());
    }

    #[test]
    fn test_frames_yields_single_rgb_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "test.png", 100, 80);
        let mut reader = ImageFileReader::new();
        reader.open(&path).unwrap();

        let frames: Vec<_> = reader.frames().collect();
        assert_eq!(frames.len(), 1);
        let frame = frames.into_iter().next().unwrap().unwrap();
        assert_eq!(frame.index(), 0);
        assert_eq!(&frame.data()[..3], &[50, 100, 200]);
    }

    #[test]
    fn test_frames_without_open_returns_error() {
        let mut reader = ImageFileReader::new();
        assert!(reader.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_load_images_indexes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_test_image(dir.path(), "a.png", 20, 10);
        let b = write_test_image(dir.path(), "b.png", 30, 40);
        let frames = load_images(&[a, b]).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].index(), 0);
        assert_eq!((frames[1].width(), frames[1].height()), (30, 40));
        assert_eq!(frames[1].index(), 1);
    }

    #[test]
    fn test_load_images_names_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let err = load_images(&[&missing]).unwrap_err();
        assert!(err.to_string().contains("missing.png"));
    }
}
