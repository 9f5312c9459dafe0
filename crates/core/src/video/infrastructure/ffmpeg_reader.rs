use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameIter, VideoReader};

use super::ffmpeg_util::{decode_failure, RgbDecoder};

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Every decoded frame is converted to RGB24 and indexed in decode order
/// starting at 0.
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { input_ctx: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Err(format!("file not found: {}", path.display()).into());
        }
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;
        let decoder = RgbDecoder::for_input(&ictx)?;
        let stream = ictx
            .stream(decoder.stream_index)
            .ok_or("Video stream disappeared")?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let metadata = VideoMetadata {
            width: decoder.width,
            height: decoder.height,
            fps,
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        self.input_ctx = Some(ictx);
        Ok(metadata)
    }

    fn frames(&mut self) -> FrameIter<'_> {
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };
        let decoder = match RgbDecoder::for_input(ictx) {
            Ok(d) => d,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };

        Box::new(FfmpegFrameIter {
            ictx,
            decoder,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn close(&mut self) {
        self.input_ctx = None;
    }
}

/// Lazy iterator that decodes one frame per `next()`, so a long video is
/// never held in memory.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: RgbDecoder,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let result = self.decoder.receive(self.frame_index)?;
        self.frame_index += 1;
        Some(result)
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            // A failing drained decoder would fail forever.
            if self.flushing && result.is_err() {
                self.done = true;
            }
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.decoder.stream_index {
                continue;
            }

            if let Err(e) = self.decoder.decoder.send_packet(&packet) {
                if let Some(err) = decode_failure(e) {
                    // The lost packet still takes a slot in the frame sequence.
                    self.frame_index += 1;
                    return Some(Err(err));
                }
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}
