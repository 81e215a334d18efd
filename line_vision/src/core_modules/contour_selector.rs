// THEORY:
// The `contour_selector` is the engine of the candidate stage. It turns a binary
// mask into at most one contour that the rest of the pipeline will trust.
//
// Algorithm steps:
// 1.  **Border following**: every boundary in the mask is traced, outer borders and
//     hole borders alike, with its parent in the nesting tree. The mask is framed
//     with one background pixel first, so regions cut by the region edge (a line
//     crossing the whole ROI) still get a closed outer border. Points are then
//     shifted back and simplified to the corners of the chain.
// 2.  **Noise rejection**: contours enclosing no more than the minimum area are
//     dropped. Underwater, these are mostly specks from turbidity and caustics.
// 3.  **Selection**: the survivor with the largest area wins. On equal areas the
//     first contour in extraction order is kept.
// 4.  **Guard**: the winner must have a non-zero zeroth moment. Otherwise the region
//     is reported as a miss, even though a contour object exists.
//
// Like the segmenter, this is a stateless utility with no memory of earlier frames.

use crate::core_modules::contour::{ContourPoint, LineContour, SelectedContour, simplify_chain};
use image::{GrayImage, imageops};
use imageproc::contours::{BorderType, find_contours};

pub mod contour_selector {
    use super::*;

    /// Traces every border of `mask`, in extraction order.
    pub fn extract_contours(mask: &GrayImage) -> Vec<LineContour> {
        if mask.width() == 0 || mask.height() == 0 {
            return Vec::new();
        }

        let mut framed = GrayImage::new(mask.width() + 2, mask.height() + 2);
        imageops::replace(&mut framed, mask, 1, 1);

        find_contours::<i32>(&framed)
            .into_iter()
            .map(|traced| {
                let points: Vec<ContourPoint> = traced
                    .points
                    .iter()
                    .map(|p| ContourPoint::new(p.x - 1, p.y - 1))
                    .collect();
                LineContour::new(
                    simplify_chain(&points),
                    traced.border_type == BorderType::Hole,
                    traced.parent,
                )
            })
            .collect()
    }

    /// Index of the largest contour strictly above `min_area`. Ties keep the earliest.
    pub fn largest_index(contours: &[LineContour], min_area: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, contour) in contours.iter().enumerate() {
            if contour.area <= min_area {
                continue;
            }
            match best {
                Some((_, best_area)) if contour.area <= best_area => {}
                _ => best = Some((index, contour.area)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Picks the line candidate from a list of contours, or `None` on a miss.
    pub fn select(mut contours: Vec<LineContour>, min_area: f64) -> Option<SelectedContour> {
        let index = largest_index(&contours, min_area)?;
        let winner = contours.swap_remove(index);
        SelectedContour::new(winner)
    }

    /// Extraction and selection in one call.
    pub fn find_line(mask: &GrayImage, min_area: f64) -> Option<SelectedContour> {
        select(extract_contours(mask), min_area)
    }
}
