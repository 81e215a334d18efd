// THEORY:
// The `segmenter` turns one region of a colour frame into a binary mask of "line"
// pixels. It is the first stage of the pipeline and the only one that touches raw
// pixel data.
//
// Steps, in order:
// 1.  **Crop**: cut the region out of the frame. Each region is blurred on its own,
//     so the ROI never borrows blur from pixels outside it.
// 2.  **Blur**: a Gaussian blur suppresses sensor noise and floating particles
//     before thresholding.
// 3.  **Threshold**: every pixel is converted to HSV and kept if it falls inside the
//     configured band. Kept pixels are 255, the rest 0.
// 4.  **Close**: a morphological closing (dilate then erode) with a square element
//     bridges small gaps left by glare and turbidity.
//
// The segmenter is stateless: the same (frame, region, config) always yields the
// same mask.

use crate::config::SegmentationConfig;
use crate::core_modules::pixel::pixel::HsvPixel;
use crate::core_modules::region::Region;
use image::{GrayImage, Luma, RgbImage, imageops};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

/// Builds the line mask for `region` of `frame`. The mask has the region's size.
pub fn segment(frame: &RgbImage, region: Region, config: &SegmentationConfig) -> GrayImage {
    if region.is_empty() {
        return GrayImage::new(region.width, region.height);
    }

    let cropped =
        imageops::crop_imm(frame, region.left, region.top, region.width, region.height)
            .to_image();
    let blurred = gaussian_blur_f32(&cropped, config.blur_sigma());
    let mask = threshold_hsv(&blurred, &config.hsv_lower, &config.hsv_upper);

    if config.close_radius == 0 {
        mask
    } else {
        close(&mask, Norm::LInf, config.close_radius)
    }
}

/// Marks every pixel whose HSV triple lies inside `[lower, upper]`.
pub fn threshold_hsv(image: &RgbImage, lower: &[u8; 3], upper: &[u8; 3]) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [red, green, blue] = image.get_pixel(x, y).0;
        if HsvPixel::from_rgb(red, green, blue).within(lower, upper) {
            Luma([MASK_ON])
        } else {
            Luma([MASK_OFF])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const FLOOR: Rgb<u8> = Rgb([60, 150, 230]);
    const LINE: Rgb<u8> = Rgb([15, 15, 20]);

    fn frame_with_bar(width: u32, height: u32, bar_left: u32, bar_width: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            if x >= bar_left && x < bar_left + bar_width {
                LINE
            } else {
                FLOOR
            }
        })
    }

    fn count_on(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] == MASK_ON).count()
    }

    #[test]
    fn mask_has_region_extent() {
        let frame = frame_with_bar(320, 240, 150, 20);
        let region = Region::bottom_center(320, 240, 200, 150);
        let mask = segment(&frame, region, &SegmentationConfig::default());
        assert_eq!(mask.dimensions(), (200, 150));
    }

    #[test]
    fn dark_bar_is_segmented_and_floor_is_not() {
        let frame = frame_with_bar(100, 60, 40, 20);
        let mask = segment(&frame, Region::full_frame(100, 60), &SegmentationConfig::default());
        assert_eq!(mask.get_pixel(50, 30).0[0], MASK_ON);
        assert_eq!(mask.get_pixel(5, 30).0[0], MASK_OFF);
        assert_eq!(mask.get_pixel(95, 30).0[0], MASK_OFF);
    }

    #[test]
    fn bright_frame_yields_empty_mask() {
        let frame = RgbImage::from_pixel(80, 80, FLOOR);
        let mask = segment(&frame, Region::full_frame(80, 80), &SegmentationConfig::default());
        assert_eq!(count_on(&mask), 0);
    }

    #[test]
    fn closing_bridges_a_one_pixel_gap() {
        let mut mask = GrayImage::new(40, 20);
        for y in 5..15 {
            for x in 5..35 {
                if x != 20 {
                    mask.put_pixel(x, y, Luma([MASK_ON]));
                }
            }
        }
        let closed = close(&mask, Norm::LInf, 2);
        assert_eq!(closed.get_pixel(20, 10).0[0], MASK_ON);
    }

    #[test]
    fn threshold_respects_value_bound() {
        let mut image = RgbImage::from_pixel(2, 1, Rgb([50, 50, 50]));
        image.put_pixel(1, 0, Rgb([100, 100, 100]));
        let mask = threshold_hsv(&image, &[0, 0, 0], &[180, 255, 90]);
        assert_eq!(mask.get_pixel(0, 0).0[0], MASK_ON);
        assert_eq!(mask.get_pixel(1, 0).0[0], MASK_OFF);
    }

    #[test]
    fn empty_region_gives_empty_mask() {
        let frame = RgbImage::new(0, 0);
        let mask = segment(&frame, Region::full_frame(0, 0), &SegmentationConfig::default());
        assert_eq!(mask.dimensions(), (0, 0));
    }
}
