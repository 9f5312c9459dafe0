use ndarray::{s, ArrayView3};

use crate::shared::bbox::PixelBox;

/// A single image buffer: contiguous bytes in row-major, channel-interleaved
/// order.
///
/// Three-channel frames carry video frames, reference images and face crops;
/// single-channel frames carry masks. Format conversion happens at I/O
/// boundaries only.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// All-zero frame of the given geometry.
    pub fn zeros(width: u32, height: u32, channels: u8) -> Self {
        let len = (width as usize) * (height as usize) * (channels as usize);
        Self::new(vec![0; len], width, height, channels, 0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `region` into a new frame.
    ///
    /// The region is clamped to the frame first, so the result is never
    /// larger than the source. The crop keeps the source index.
    pub fn crop(&self, region: &PixelBox) -> Frame {
        let region = region.clamp_to(self.width, self.height);
        let view = self.as_ndarray();
        let sub = view.slice(s![
            region.y1 as usize..region.y2 as usize,
            region.x1 as usize..region.x2 as usize,
            ..
        ]);
        let data: Vec<u8> = sub.iter().copied().collect();
        Frame::new(
            data,
            region.width(),
            region.height(),
            self.channels,
            self.index,
        )
    }

    /// Returns a copy with the first and third channels swapped.
    ///
    /// Converts RGB to BGR and back; frames with fewer than three channels
    /// are returned unchanged.
    pub fn to_bgr(&self) -> Frame {
        let mut swapped = self.clone();
        if self.channels >= 3 {
            for px in swapped.data.chunks_exact_mut(self.channels as usize) {
                px.swap(0, 2);
            }
        }
        swapped
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
