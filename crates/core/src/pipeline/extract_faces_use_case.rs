use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::face_analyzer::{analyze_rgb, FaceAnalyzer};
use crate::matching::domain::face_cropper::{filter_and_crop, MatchParams};
use crate::matching::domain::reference_set::ReferenceSet;
use crate::matching::domain::similarity::SimilarityError;
use crate::shared::constants::{MAX_CONSECUTIVE_DECODE_ERRORS, PLACEHOLDER_SIZE};
use crate::shared::frame::Frame;
use crate::video::domain::video_reader::VideoReader;

use super::extraction_config::ExtractionConfig;
use super::run_statistics::{EarlyStop, RunStatistics};

/// Progress callback: `(frames_seen, frames_total)`. Returning `false`
/// stops the run.
pub type ProgressFn = Box<dyn Fn(usize, usize) -> bool + Send>;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No input images provided for 'images' mode")]
    MissingInput,
    #[error("Video file not found: {}", .0.display())]
    VideoNotFound(PathBuf),
    #[error("Could not open video: {} ({reason})", path.display())]
    VideoOpen { path: PathBuf, reason: String },
    #[error(transparent)]
    Similarity(#[from] SimilarityError),
}

/// Frames to scan.
pub enum FootageSource {
    /// In-memory batch, already RGB.
    Images(Vec<Frame>),
    /// Video decoded through `reader`, which must not be open yet.
    Video {
        reader: Box<dyn VideoReader>,
        path: PathBuf,
    },
}

/// Everything one run hands back to the host.
///
/// `faces[i]` and `masks[i]` always belong together and neither is ever
/// empty: a run that matched nothing carries one all-zero placeholder pair.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub faces: Vec<Frame>,
    pub masks: Vec<Frame>,
    pub summary: String,
    pub stats: RunStatistics,
}

impl ExtractionOutput {
    fn failed(error: &ExtractionError, stats: RunStatistics) -> Self {
        let (face, mask) = placeholder();
        Self {
            faces: vec![face],
            masks: vec![mask],
            summary: format!("Error: {error}"),
            stats,
        }
    }
}

/// Zero-filled RGB face and matching single-channel mask.
pub fn placeholder() -> (Frame, Frame) {
    (
        Frame::zeros(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, 3),
        Frame::zeros(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, 1),
    )
}

/// Scans footage for faces matching the reference set and collects a padded
/// crop and mask for each one.
///
/// Only every `sample_every_n_frames`-th frame reaches the analyzer, and the
/// scan stops once `max_frames` frames have been processed (0 = no limit).
/// A frame the analyzer chokes on is skipped; the run keeps going.
pub struct ExtractFacesUseCase {
    analyzer: Box<dyn FaceAnalyzer>,
    references: ReferenceSet,
    config: ExtractionConfig,
    on_progress: Option<ProgressFn>,
}

impl ExtractFacesUseCase {
    pub fn new(
        analyzer: Box<dyn FaceAnalyzer>,
        references: ReferenceSet,
        config: ExtractionConfig,
        on_progress: Option<ProgressFn>,
    ) -> Self {
        Self {
            analyzer,
            references,
            config,
            on_progress,
        }
    }

    /// Runs one scan over `source`.
    ///
    /// Missing or unopenable input is reported through the output summary
    /// (`Error: ...`) with a placeholder pair. Only a reference/embedding
    /// mismatch is returned as `Err`.
    pub fn execute(&mut self, source: FootageSource) -> Result<ExtractionOutput, ExtractionError> {
        log::info!(
            "Extracting faces (threshold {:.2}, min size {}, padding {:.2}, every {} frame(s), max {}) against {} reference(s)",
            self.config.similarity_threshold,
            self.config.min_face_size,
            self.config.padding,
            self.config.sample_every_n_frames,
            self.config.max_frames,
            self.references.len()
        );

        let is_video = matches!(source, FootageSource::Video { .. });
        let result = match source {
            FootageSource::Images(images) => self.run_images(images),
            FootageSource::Video { mut reader, path } => self.run_video(reader.as_mut(), &path),
        };

        match result {
            Ok(output) => {
                log::info!("{}", output.summary);
                Ok(output)
            }
            Err(e @ ExtractionError::Similarity(_)) => Err(e),
            Err(e) => {
                log::warn!("Extraction aborted: {e}");
                let stats = if is_video {
                    RunStatistics::for_video(self.references.len(), 0, 0.0)
                } else {
                    RunStatistics::for_images(self.references.len(), 0)
                };
                Ok(ExtractionOutput::failed(&e, stats))
            }
        }
    }

    fn run_images(&mut self, images: Vec<Frame>) -> Result<ExtractionOutput, ExtractionError> {
        if images.is_empty() {
            return Err(ExtractionError::MissingInput);
        }
        let stats = RunStatistics::for_images(self.references.len(), images.len());
        let mut sampler = self.sampler(stats);
        sampler.scan(images.into_iter().map(Ok))?;
        Ok(sampler.finish())
    }

    fn run_video(
        &mut self,
        reader: &mut dyn VideoReader,
        path: &Path,
    ) -> Result<ExtractionOutput, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::VideoNotFound(path.to_path_buf()));
        }
        let metadata = reader.open(path).map_err(|e| ExtractionError::VideoOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        log::info!(
            "Opened {}: {}x{}, {} frames at {:.1}fps ({})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.total_frames,
            metadata.fps,
            metadata.codec
        );

        let stats =
            RunStatistics::for_video(self.references.len(), metadata.total_frames, metadata.fps);
        let mut sampler = self.sampler(stats);
        let scanned = sampler.scan(reader.frames());
        reader.close();
        scanned?;
        Ok(sampler.finish())
    }

    fn sampler(&mut self, stats: RunStatistics) -> Sampler<'_> {
        Sampler {
            analyzer: self.analyzer.as_mut(),
            references: &self.references,
            params: self.config.match_params(),
            stride: self.config.sample_every_n_frames.max(1),
            max_frames: self.config.max_frames,
            on_progress: self.on_progress.as_deref(),
            faces: Vec::new(),
            masks: Vec::new(),
            stats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Per-run state of the scan loop. Owns the aggregate and the statistics
/// until [`Sampler::finish`] turns them into the output.
struct Sampler<'a> {
    analyzer: &'a mut dyn FaceAnalyzer,
    references: &'a ReferenceSet,
    params: MatchParams,
    stride: usize,
    max_frames: usize,
    on_progress: Option<&'a (dyn Fn(usize, usize) -> bool + Send)>,
    faces: Vec<Frame>,
    masks: Vec<Frame>,
    stats: RunStatistics,
}

impl Sampler<'_> {
    fn scan<I>(&mut self, frames: I) -> Result<(), SimilarityError>
    where
        I: Iterator<Item = Result<Frame, Box<dyn std::error::Error>>>,
    {
        let mut consecutive_errors = 0;

        for (position, item) in frames.enumerate() {
            match item {
                Ok(frame) => {
                    consecutive_errors = 0;
                    if position % self.stride == 0 {
                        self.process(position, &frame)?;
                        if self.max_frames > 0 && self.stats.frames_processed >= self.max_frames {
                            log::debug!("Frame budget of {} reached", self.max_frames);
                            break;
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Frame {position}: decode failed ({e}), skipping");
                    self.stats.record_failure();
                    consecutive_errors += 1;
                    if consecutive_errors > MAX_CONSECUTIVE_DECODE_ERRORS {
                        log::warn!("{consecutive_errors} decode errors in a row, giving up");
                        self.stats.early_stop = Some(EarlyStop::DecodeFailure);
                        break;
                    }
                }
            }

            if self.report_progress(position + 1) == Flow::Stop {
                log::info!("Extraction cancelled after {} frame(s)", position + 1);
                self.stats.early_stop = Some(EarlyStop::Cancelled);
                break;
            }
        }
        Ok(())
    }

    fn process(&mut self, position: usize, frame: &Frame) -> Result<(), SimilarityError> {
        let detected = match analyze_rgb(&mut *self.analyzer, frame) {
            Ok(detected) => detected,
            Err(e) => {
                log::warn!("Frame {position}: face analysis failed ({e}), skipping");
                self.stats.record_frame(0);
                self.stats.record_failure();
                return Ok(());
            }
        };

        let matched = filter_and_crop(frame, &detected, self.references, &self.params)?;
        log::debug!(
            "Frame {position}: {} detected, {} matched",
            detected.len(),
            matched.len()
        );
        self.stats.record_frame(matched.len());
        for face in matched {
            self.faces.push(face.crop);
            self.masks.push(face.mask);
        }
        Ok(())
    }

    fn report_progress(&self, current: usize) -> Flow {
        match self.on_progress {
            Some(callback) if !callback(current, self.stats.frames_total) => Flow::Stop,
            _ => Flow::Continue,
        }
    }

    fn finish(self) -> ExtractionOutput {
        let summary = self.stats.summary();
        if self.faces.is_empty() {
            let (face, mask) = placeholder();
            return ExtractionOutput {
                faces: vec![face],
                masks: vec![mask],
                summary: format!("No faces found. {summary}"),
                stats: self.stats,
            };
        }
        ExtractionOutput {
            faces: self.faces,
            masks: self.masks,
            summary,
            stats: self.stats,
        }
    }
}
