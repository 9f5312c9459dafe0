use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        // Ensure parent directory exists (infrastructure concern)
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let (width, height, data) = (frame.width(), frame.height(), frame.data().to_vec());
        match frame.channels() {
            1 => image::GrayImage::from_raw(width, height, data)
                .ok_or("Failed to create mask image from frame data")?
                .save(path)?,
            3 => image::RgbImage::from_raw(width, height, data)
                .ok_or("Failed to create image from frame data")?
                .save(path)?,
            n => return Err(format!("cannot write {n}-channel frame to {}", path.display()).into()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, r: u8, g: u8, b: u8) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.push(r);
            data.push(g);
            data.push(b);
        }
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/faces/out.png");
        let writer = ImageFileWriter::new();
        writer.write(&path, &make_frame(20, 10, 1, 2, 3)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let frame = make_frame(50, 50, 50, 100, 200);
        ImageFileWriter::new().write(&path, &frame).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (50, 50));
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_single_channel_written_as_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let mut mask = Frame::zeros(8, 4, 1);
        mask.data_mut()[0] = 255;
        ImageFileWriter::new().write(&path, &mask).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.color(), image::ColorType::L8);
        let gray = img.to_luma8();
        assert_eq!(gray.get_pixel(0, 0).0, [255]);
        assert_eq!(gray.get_pixel(1, 0).0, [0]);
    }

    #[test]
    fn test_unsupported_channel_count_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame::zeros(4, 4, 4);
        assert!(ImageFileWriter::new()
            .write(&dir.path().join("out.png"), &frame)
            .is_err());
    }
}
