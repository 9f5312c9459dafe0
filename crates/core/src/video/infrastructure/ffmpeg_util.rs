//! Decoder plumbing shared by the ffmpeg-backed readers.

use crate::shared::frame::Frame;

/// Decoder for the best video stream of `ictx`, with a scaler converting
/// its output to packed RGB24.
pub(crate) struct RgbDecoder {
    pub decoder: ffmpeg_next::decoder::Video,
    pub scaler: ffmpeg_next::software::scaling::Context,
    pub stream_index: usize,
    pub width: u32,
    pub height: u32,
}

impl RgbDecoder {
    pub fn for_input(
        ictx: &ffmpeg_next::format::context::Input,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            decoder,
            scaler,
            stream_index,
            width,
            height,
        })
    }

    /// Pulls one decoded frame out of the decoder.
    ///
    /// `None` means no frame is ready (the decoder wants more input or is
    /// drained); any other decoder failure comes back as `Some(Err)`.
    pub fn receive(&mut self, index: usize) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.decoder.receive_frame(&mut decoded) {
            return decode_failure(e).map(Err);
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(Box::new(e)));
        }
        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        Some(Ok(Frame::new(pixels, self.width, self.height, 3, index)))
    }
}

/// Classifies a `receive_frame` error: `None` for "try again" and
/// end-of-stream, the error otherwise.
pub(crate) fn decode_failure(e: ffmpeg_next::Error) -> Option<Box<dyn std::error::Error>> {
    match e {
        ffmpeg_next::Error::Eof => None,
        ffmpeg_next::Error::Other { errno } if errno == ffmpeg_next::util::error::EAGAIN => None,
        e => Some(format!("decode failed: {e}").into()),
    }
}

/// Copies pixel data from an ffmpeg frame into a tightly packed RGB buffer,
/// dropping per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    pixels
}
