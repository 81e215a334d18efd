// THEORY:
// The `contour` module is the data layer between the mask and the decision logic.
// A `LineContour` is a "dumb" container: the ordered boundary points of one
// connected mask region together with the two quantities every later stage needs,
// its enclosed area and its spatial moments.
//
// Key principles:
// 1.  **Polygon moments**: area and centroid are computed from the boundary polygon
//     with Green's theorem, not by counting pixels. A contour that encloses nothing
//     (a single pixel, a one-pixel-wide spur traced there and back) has a zero
//     moment and therefore no centroid.
// 2.  **Simplified chains**: boundary tracing yields one point per border pixel.
//     Runs of points moving in the same horizontal, vertical or diagonal direction
//     are collapsed to their end points, which leaves the polygon unchanged.
// 3.  **Guarded selection**: `SelectedContour` can only be built from a contour with
//     a non-zero moment. Downstream stages that need a centroid or an orientation
//     take a `SelectedContour`, so a degenerate contour can never reach them.

/// A boundary point in region-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContourPoint {
    pub x: i32,
    pub y: i32,
}

impl ContourPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Zeroth and first-order spatial moments of a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// Moments of the polygon through `points`, closed back to the first point.
    /// The sign is normalised so `m00` is never negative whatever the winding.
    pub fn of_polygon(points: &[ContourPoint]) -> Self {
        if points.len() < 3 {
            return Self::default();
        }

        let mut a00 = 0.0;
        let mut a10 = 0.0;
        let mut a01 = 0.0;
        let mut previous = points[points.len() - 1];
        for &current in points {
            let (xp, yp) = (previous.x as f64, previous.y as f64);
            let (xc, yc) = (current.x as f64, current.y as f64);
            let cross = xp * yc - xc * yp;
            a00 += cross;
            a10 += cross * (xp + xc);
            a01 += cross * (yp + yc);
            previous = current;
        }

        let sign = if a00 < 0.0 { -1.0 } else { 1.0 };
        Self {
            m00: sign * a00 / 2.0,
            m10: sign * a10 / 6.0,
            m01: sign * a01 / 6.0,
        }
    }

    /// Area-weighted center, or `None` when the zeroth moment vanishes.
    pub fn centroid(&self) -> Option<Centroid> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(Centroid {
            x: self.m10 / self.m00,
            y: self.m01 / self.m00,
        })
    }
}

/// Area-weighted center of a contour, in the same coordinates as its points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl Centroid {
    /// The centroid truncated to whole pixels.
    pub fn pixel(&self) -> (i32, i32) {
        (self.x.trunc() as i32, self.y.trunc() as i32)
    }
}

/// One closed boundary extracted from a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct LineContour {
    /// Simplified boundary points, in tracing order.
    pub points: Vec<ContourPoint>,
    /// True for the inner boundary of a hole.
    pub is_hole: bool,
    /// Index of the enclosing contour in the extraction order, if any.
    pub parent: Option<usize>,
    /// Enclosed area in square pixels.
    pub area: f64,
    pub moments: Moments,
}

impl LineContour {
    pub fn new(points: Vec<ContourPoint>, is_hole: bool, parent: Option<usize>) -> Self {
        let moments = Moments::of_polygon(&points);
        Self {
            area: moments.m00,
            points,
            is_hole,
            parent,
            moments,
        }
    }
}

/// Collapses runs of points that continue in the same unit direction, keeping
/// only the corners. Closed chains wrap around.
pub fn simplify_chain(points: &[ContourPoint]) -> Vec<ContourPoint> {
    let count = points.len();
    if count < 3 {
        return points.to_vec();
    }

    let step = |from: ContourPoint, to: ContourPoint| {
        ((to.x - from.x).signum(), (to.y - from.y).signum())
    };

    let corners: Vec<ContourPoint> = (0..count)
        .filter(|&i| {
            let previous = points[(i + count - 1) % count];
            let next = points[(i + 1) % count];
            step(previous, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if corners.is_empty() {
        points.to_vec()
    } else {
        corners
    }
}

/// A contour that passed area filtering and has a usable centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedContour {
    contour: LineContour,
    centroid: Centroid,
}

impl SelectedContour {
    /// Wraps `contour` if its zeroth moment is non-zero.
    pub fn new(contour: LineContour) -> Option<Self> {
        let centroid = contour.moments.centroid()?;
        Some(Self { contour, centroid })
    }

    pub fn contour(&self) -> &LineContour {
        &self.contour
    }

    pub fn centroid(&self) -> Centroid {
        self.centroid
    }

    pub fn area(&self) -> f64 {
        self.contour.area
    }
}
