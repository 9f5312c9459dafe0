use crate::shared::frame::Frame;

/// Why a run ended before its input was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStop {
    /// The progress callback returned `false`.
    Cancelled,
    /// Too many frames in a row failed to decode.
    DecodeFailure,
}

impl std::fmt::Display for EarlyStop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EarlyStop::Cancelled => write!(f, "cancelled"),
            EarlyStop::DecodeFailure => write!(f, "too many consecutive decode errors"),
        }
    }
}

/// Counters accumulated over one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub frames_processed: usize,
    pub faces_found: usize,
    pub reference_count: usize,
    /// Batch size, or the frame count the container reports for a video.
    pub frames_total: usize,
    /// Set for video runs only.
    pub fps: Option<f64>,
    /// Frames that could not be decoded or analyzed.
    pub frames_failed: usize,
    pub early_stop: Option<EarlyStop>,
}

impl RunStatistics {
    pub fn for_images(reference_count: usize, frames_total: usize) -> Self {
        Self {
            frames_processed: 0,
            faces_found: 0,
            reference_count,
            frames_total,
            fps: None,
            frames_failed: 0,
            early_stop: None,
        }
    }

    pub fn for_video(reference_count: usize, frames_total: usize, fps: f64) -> Self {
        Self {
            fps: Some(fps),
            ..Self::for_images(reference_count, frames_total)
        }
    }

    pub fn record_frame(&mut self, faces: usize) {
        self.frames_processed += 1;
        self.faces_found += faces;
    }

    pub fn record_failure(&mut self) {
        self.frames_failed += 1;
    }

    /// One-line run report for the host.
    pub fn summary(&self) -> String {
        let mut summary = match self.fps {
            None => format!(
                "Images: Processed {}/{} images, found {} faces (using {} reference(s))",
                self.frames_processed, self.frames_total, self.faces_found, self.reference_count
            ),
            Some(fps) => format!(
                "Video: Processed {}/{} frames ({fps:.1}fps), found {} faces (using {} reference(s))",
                self.frames_processed, self.frames_total, self.faces_found, self.reference_count
            ),
        };
        if self.frames_failed > 0 {
            summary.push_str(&format!("; {} frame(s) failed", self.frames_failed));
        }
        if let Some(reason) = self.early_stop {
            summary.push_str(&format!("; stopped early: {reason}"));
        }
        summary
    }
}

/// Appends face count and mean crop area to `info`.
pub fn describe_faces(info: &str, faces: &[Frame]) -> String {
    match faces.first() {
        Some(first) if first.height() > 0 => {
            let total: u64 = faces.iter().map(Frame::area).sum();
            let average = total / faces.len() as u64;
            format!(
                "{info}\nTotal faces: {}\nAverage size: {average} pixels²",
                faces.len()
            )
        }
        _ => "No faces extracted".to_string(),
    }
}
