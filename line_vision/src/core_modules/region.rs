/// An axis-aligned search window inside a frame, in frame pixel coordinates.
///
/// Two regions are searched every cycle: the region of interest (a bottom-center
/// strip just ahead of the vehicle) and the full frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn full_frame(frame_width: u32, frame_height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width: frame_width,
            height: frame_height,
        }
    }

    /// The bottom-center strip of `roi_width` x `roi_height`, shrunk to fit when the
    /// frame is smaller than the requested strip.
    pub fn bottom_center(
        frame_width: u32,
        frame_height: u32,
        roi_width: u32,
        roi_height: u32,
    ) -> Self {
        let width = roi_width.min(frame_width);
        let height = roi_height.min(frame_height);
        Self {
            left: (frame_width / 2).saturating_sub(width / 2),
            top: frame_height - height,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Track centerline in region-local coordinates.
    pub fn center_x(&self) -> i32 {
        (self.width / 2) as i32
    }

    /// Converts a region-local point to frame coordinates.
    pub fn to_frame(&self, x: i32, y: i32) -> (i32, i32) {
        (x + self.left as i32, y + self.top as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_is_bottom_center_strip() {
        let roi = Region::bottom_center(640, 480, 200, 150);
        assert_eq!(
            roi,
            Region {
                left: 220,
                top: 330,
                width: 200,
                height: 150
            }
        );
        assert_eq!(roi.center_x(), 100);
        assert_eq!(roi.to_frame(roi.center_x(), 0), (320, 330));
    }

    #[test]
    fn roi_shrinks_to_small_frames() {
        let roi = Region::bottom_center(120, 100, 200, 150);
        assert_eq!(
            roi,
            Region {
                left: 0,
                top: 0,
                width: 120,
                height: 100
            }
        );
    }

    #[test]
    fn full_frame_centerline_matches_roi_centerline() {
        let roi = Region::bottom_center(640, 480, 200, 150);
        let full = Region::full_frame(640, 480);
        assert_eq!(full.center_x(), roi.to_frame(roi.center_x(), 0).0);
    }

    #[test]
    fn zero_sized_frame_gives_empty_regions() {
        assert!(Region::full_frame(0, 0).is_empty());
        assert!(Region::bottom_center(0, 0, 200, 150).is_empty());
    }
}
