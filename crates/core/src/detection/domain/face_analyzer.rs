use crate::shared::frame::Frame;

use super::detected_face::DetectedFace;

/// Channel order an analyzer expects its input pixels in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// Domain interface for the face detection and embedding backend.
///
/// Implementations must accept frames of any size. They may hold inference
/// sessions that need exclusive access, hence `&mut self`.
pub trait FaceAnalyzer: Send {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>>;

    /// Channel order `analyze` expects. Callers convert RGB frames before
    /// calling when this is [`ChannelOrder::Bgr`].
    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgb
    }
}

/// Runs `analyzer` on an RGB frame, converting channel order first if the
/// analyzer asks for it.
///
/// Bounding boxes do not depend on channel order, so the result applies to
/// the caller's RGB frame as-is.
pub fn analyze_rgb(
    analyzer: &mut dyn FaceAnalyzer,
    rgb: &Frame,
) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
    match analyzer.channel_order() {
        ChannelOrder::Rgb => analyzer.analyze(rgb),
        ChannelOrder::Bgr => analyzer.analyze(&rgb.to_bgr()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingAnalyzer {
        order: ChannelOrder,
        seen: Vec<Vec<u8>>,
    }

    impl FaceAnalyzer for RecordingAnalyzer {
        fn analyze(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
            self.seen.push(frame.data().to_vec());
            Ok(Vec::new())
        }

        fn channel_order(&self) -> ChannelOrder {
            self.order
        }
    }

    fn red_pixel() -> Frame {
        Frame::new(vec![255, 0, 10], 1, 1, 3, 0)
    }

    #[test]
    fn test_rgb_analyzer_sees_original_pixels() {
        let mut analyzer = RecordingAnalyzer {
            order: ChannelOrder::Rgb,
            seen: Vec::new(),
        };
        analyze_rgb(&mut analyzer, &red_pixel()).unwrap();
        assert_eq!(analyzer.seen, vec![vec![255, 0, 10]]);
    }

    #[test]
    fn test_bgr_analyzer_sees_swapped_pixels() {
        let mut analyzer = RecordingAnalyzer {
            order: ChannelOrder::Bgr,
            seen: Vec::new(),
        };
        analyze_rgb(&mut analyzer, &red_pixel()).unwrap();
        assert_eq!(analyzer.seen, vec![vec![10, 0, 255]]);
    }
}
