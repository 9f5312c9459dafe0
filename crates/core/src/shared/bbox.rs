/// Face bounding box in source-image pixel coordinates, as reported by a
/// detector: `(x1, y1)` top-left, `(x2, y2)` bottom-right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Integer pixel box for this bbox inside a `frame_width` × `frame_height`
    /// image.
    ///
    /// Coordinates are truncated toward zero, then clamped to the image.
    pub fn to_pixel_box(&self, frame_width: u32, frame_height: u32) -> PixelBox {
        let clamp = |v: f64, max: u32| (v.trunc().max(0.0) as u64).min(max as u64) as u32;
        PixelBox {
            x1: clamp(self.x1, frame_width),
            y1: clamp(self.y1, frame_height),
            x2: clamp(self.x2, frame_width),
            y2: clamp(self.y2, frame_height),
        }
        .normalized()
    }
}

/// Half-open integer pixel rectangle `[x1, x2) × [y1, y2)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }.normalized()
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, other: &PixelBox) -> bool {
        self.x1 <= other.x1 && self.y1 <= other.y1 && self.x2 >= other.x2 && self.y2 >= other.y2
    }

    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> PixelBox {
        PixelBox {
            x1: self.x1.min(frame_width),
            y1: self.y1.min(frame_height),
            x2: self.x2.min(frame_width),
            y2: self.y2.min(frame_height),
        }
        .normalized()
    }

    /// Grows the box by `pad_x` left and right and `pad_y` above and below,
    /// clamped to the image.
    pub fn expand(&self, pad_x: u32, pad_y: u32, frame_width: u32, frame_height: u32) -> PixelBox {
        PixelBox {
            x1: self.x1.saturating_sub(pad_x),
            y1: self.y1.saturating_sub(pad_y),
            x2: self.x2.saturating_add(pad_x),
            y2: self.y2.saturating_add(pad_y),
        }
        .clamp_to(frame_width, frame_height)
    }

    /// This box expressed relative to the top-left corner of `outer`.
    pub fn relative_to(&self, outer: &PixelBox) -> PixelBox {
        PixelBox {
            x1: self.x1.saturating_sub(outer.x1),
            y1: self.y1.saturating_sub(outer.y1),
            x2: self.x2.saturating_sub(outer.x1),
            y2: self.y2.saturating_sub(outer.y1),
        }
        .normalized()
    }

    fn normalized(self) -> PixelBox {
        PixelBox {
            x2: self.x2.max(self.x1),
            y2: self.y2.max(self.y1),
            ..self
        }
    }
}
