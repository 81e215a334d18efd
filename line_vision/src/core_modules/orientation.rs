// THEORY:
// The orientation estimator answers one question: which way does the line run?
// It treats the contour's boundary points as a 2D point cloud and finds the
// direction of greatest spread (the first principal component). For a line
// segment, that is the direction of the segment itself.
//
// For two dimensions the eigen-decomposition has a closed form, so no linear
// algebra crate is needed:
//
//     cov = [[sxx, sxy], [sxy, syy]]
//     lambda_max = (sxx + syy) / 2 + sqrt(((sxx - syy) / 2)^2 + sxy^2)
//
// An eigenvector has no intrinsic sign, so it is normalised to point right
// (positive x), or down when exactly vertical. Angles therefore fall in
// (-90, 90]: a vertical line reads 90 and a horizontal one reads 0. Image y grows
// downward, so a positive angle means the line descends to the right.

use crate::core_modules::contour::{ContourPoint, SelectedContour};

/// Angle of a perfectly vertical principal axis.
pub const VERTICAL_DEG: f64 = 90.0;

/// Unit direction of the first principal component, or `None` for an empty set.
pub fn principal_axis(points: &[ContourPoint]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }

    let count = points.len() as f64;
    let mean_x = points.iter().map(|p| p.x as f64).sum::<f64>() / count;
    let mean_y = points.iter().map(|p| p.y as f64).sum::<f64>() / count;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for point in points {
        let dx = point.x as f64 - mean_x;
        let dy = point.y as f64 - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let half_trace = (sxx + syy) * 0.5;
    let spread = (((sxx - syy) * 0.5).powi(2) + sxy * sxy).sqrt();
    let lambda = half_trace + spread;

    // Either row of (cov - lambda * I) gives the eigenvector; take the better conditioned one.
    let from_first_row = (sxy, lambda - sxx);
    let from_second_row = (lambda - syy, sxy);
    let norm_first = from_first_row.0.hypot(from_first_row.1);
    let norm_second = from_second_row.0.hypot(from_second_row.1);

    let (mut vx, mut vy, norm) = if norm_first >= norm_second {
        (from_first_row.0, from_first_row.1, norm_first)
    } else {
        (from_second_row.0, from_second_row.1, norm_second)
    };

    if norm <= f64::EPSILON {
        // Isotropic cloud: every direction is principal.
        return Some((1.0, 0.0));
    }
    vx /= norm;
    vy /= norm;

    if vx < 0.0 || (vx == 0.0 && vy < 0.0) {
        vx = -vx;
        vy = -vy;
    }
    Some((vx, vy))
}

/// Principal-axis angle of `points` in degrees, within (-90, 90].
pub fn principal_angle_degrees(points: &[ContourPoint]) -> Option<f64> {
    principal_axis(points).map(|(vx, vy)| vy.atan2(vx).to_degrees())
}

/// Orientation of a selected contour. Selected contours always enclose area, so
/// their point sets are never empty.
pub fn estimate(selected: &SelectedContour) -> f64 {
    debug_assert!(selected.area() > 0.0);
    principal_angle_degrees(&selected.contour().points).unwrap_or(VERTICAL_DEG)
}
