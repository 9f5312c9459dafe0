use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Persists extracted faces and masks as numbered PNG pairs:
/// `<output>/<subfolder>/faces/{prefix}_{idx:06}.png` and
/// `<output>/<subfolder>/masks/{prefix}_mask_{idx:06}.png`.
pub struct SaveFacesUseCase {
    image_writer: Box<dyn ImageWriter>,
}

impl SaveFacesUseCase {
    pub fn new(image_writer: Box<dyn ImageWriter>) -> Self {
        Self { image_writer }
    }

    /// Writes each face with the mask at the same position and returns a
    /// one-line report.
    ///
    /// If the counts differ only the first `min(faces, masks)` pairs are
    /// written.
    pub fn execute(
        &self,
        faces: &[Frame],
        masks: &[Frame],
        output_dir: &Path,
        subfolder: &str,
        prefix: &str,
    ) -> Result<String, Box<dyn std::error::Error>> {
        if faces.len() != masks.len() {
            log::warn!(
                "{} faces but {} masks, saving {} pairs",
                faces.len(),
                masks.len(),
                faces.len().min(masks.len())
            );
        }

        let target = output_dir.join(subfolder);
        let mut saved = 0;
        for (idx, (face, mask)) in faces.iter().zip(masks).enumerate() {
            let (face_path, mask_path) = pair_paths(&target, prefix, idx);
            self.image_writer.write(&face_path, face)?;
            self.image_writer.write(&mask_path, mask)?;
            saved += 1;
        }

        let report = format!("Saved {saved} faces to {}", target.display());
        log::info!("{report}");
        Ok(report)
    }
}

fn pair_paths(target: &Path, prefix: &str, idx: usize) -> (PathBuf, PathBuf) {
    (
        target.join("faces").join(format!("{prefix}_{idx:06}.png")),
        target.join("masks").join(format!("{prefix}_mask_{idx:06}.png")),
    )
}
