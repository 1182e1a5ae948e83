//! Connected foreground regions and their geometric descriptors.

use log::trace;
use nalgebra::Point2;
use ndarray::Array2;

use crate::tracker::frame::ForegroundMask;
use crate::tracker::rect::Rect;

/// A foreground region that passed the area filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// First-moment centre of the region, in pixel coordinates
    pub centroid: Point2<f32>,
    /// Pixel count enclosed by the region's outer boundary
    pub area: f64,
    /// Bounding box of the region
    pub bounds: Rect,
}

impl Candidate {
    pub fn new(centroid: Point2<f32>, area: f64, bounds: Rect) -> Self {
        Self {
            centroid,
            area,
            bounds,
        }
    }
}

/// Raw image moments up to first order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    #[inline]
    fn accumulate(&mut self, x: usize, y: usize) {
        self.m00 += 1.0;
        self.m10 += x as f64;
        self.m01 += y as f64;
    }

    /// `(M10 / M00, M01 / M00)`, or `None` for a degenerate region.
    pub fn centroid(&self) -> Option<Point2<f32>> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(Point2::new(
            (self.m10 / self.m00) as f32,
            (self.m01 / self.m00) as f32,
        ))
    }
}

/// One external region of a binary mask, holes included.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub moments: Moments,
    pub bounds: Rect,
}

/// Finds regions in a refined mask and keeps those of at least `min_area` pixels.
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    min_area: f64,
}

impl CandidateExtractor {
    pub fn new(min_area: f64) -> Self {
        Self { min_area }
    }

    pub fn min_area(&self) -> f64 {
        self.min_area
    }

    /// Candidates in raster order of each region's first pixel.
    pub fn extract(&self, mask: &ForegroundMask) -> Vec<Candidate> {
        self.filter(external_regions(mask))
    }

    /// Keep regions of at least `min_area` pixels, preserving their order.
    pub fn filter(&self, regions: Vec<Region>) -> Vec<Candidate> {
        regions
            .into_iter()
            .filter_map(|region| {
                let area = region.moments.m00;
                if area < self.min_area {
                    trace!("dropping region of area {area} below {}", self.min_area);
                    return None;
                }
                let centroid = region.moments.centroid()?;
                Some(Candidate::new(centroid, area, region.bounds))
            })
            .collect()
    }
}

/// Label the outer regions of `mask`.
///
/// Foreground is 8-connected and background 4-connected. Background pockets
/// not reachable from the mask border are holes and belong to the enclosing
/// region, so anything nested inside a hole merges into its parent.
pub fn external_regions(mask: &ForegroundMask) -> Vec<Region> {
    let filled = fill_holes(mask);
    let (height, width) = filled.dim();
    let mut visited = Array2::from_elem((height, width), false);
    let mut stack = Vec::new();
    let mut regions = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if !filled[[y, x]] || visited[[y, x]] {
                continue;
            }

            let mut moments = Moments::default();
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
            visited[[y, x]] = true;
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                moments.accumulate(cx, cy);
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);

                for (nx, ny) in neighbours(cx, cy, width, height, true) {
                    if filled[[ny, nx]] && !visited[[ny, nx]] {
                        visited[[ny, nx]] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            regions.push(Region {
                moments,
                bounds: Rect::from_pixel_span(min_x, min_y, max_x, max_y),
            });
        }
    }
    regions
}

/// Foreground plus every background pixel cut off from the border.
fn fill_holes(mask: &ForegroundMask) -> Array2<bool> {
    let (height, width) = mask.dim();
    let mut outside = Array2::from_elem((height, width), false);
    if height == 0 || width == 0 {
        return outside;
    }
    let mut stack: Vec<(usize, usize)> = Vec::new();

    let seed = |x: usize, y: usize, outside: &mut Array2<bool>, stack: &mut Vec<(usize, usize)>| {
        if mask[[y, x]] == 0 && !outside[[y, x]] {
            outside[[y, x]] = true;
            stack.push((x, y));
        }
    };
    for x in 0..width {
        seed(x, 0, &mut outside, &mut stack);
        seed(x, height - 1, &mut outside, &mut stack);
    }
    for y in 0..height {
        seed(0, y, &mut outside, &mut stack);
        seed(width - 1, y, &mut outside, &mut stack);
    }

    while let Some((x, y)) = stack.pop() {
        for (nx, ny) in neighbours(x, y, width, height, false) {
            if mask[[ny, nx]] == 0 && !outside[[ny, nx]] {
                outside[[ny, nx]] = true;
                stack.push((nx, ny));
            }
        }
    }

    outside.mapv(|reached| !reached)
}

fn neighbours(
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    diagonal: bool,
) -> impl Iterator<Item = (usize, usize)> {
    const STEPS: [(isize, isize); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];
    let steps = if diagonal { &STEPS[..] } else { &STEPS[..4] };
    steps.iter().filter_map(move |&(dx, dy)| {
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        (nx >= 0 && ny >= 0 && nx < width as isize && ny < height as isize)
            .then_some((nx as usize, ny as usize))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::background::FOREGROUND;

    fn paint(mask: &mut ForegroundMask, x0: usize, y0: usize, w: usize, h: usize) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask[[y, x]] = FOREGROUND;
            }
        }
    }

    #[test]
    fn test_single_region_centroid_and_bounds() {
        let mut mask = Array2::zeros((50, 50));
        paint(&mut mask, 10, 20, 5, 3);

        let regions = external_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].moments.m00, 15.0);
        assert_eq!(regions[0].moments.centroid(), Some(Point2::new(12.0, 21.0)));
        assert_eq!(regions[0].bounds.to_tlwh(), [10.0, 20.0, 5.0, 3.0]);
    }

    #[test]
    fn test_diagonal_pixels_are_connected() {
        let mut mask = Array2::zeros((10, 10));
        mask[[2, 2]] = FOREGROUND;
        mask[[3, 3]] = FOREGROUND;
        assert_eq!(external_regions(&mask).len(), 1);
    }

    #[test]
    fn test_holes_and_nested_regions_are_absorbed() {
        let mut mask = Array2::zeros((30, 30));
        paint(&mut mask, 5, 5, 11, 11);
        // Hollow out the ring and put an island inside the hole.
        for y in 7..14 {
            for x in 7..14 {
                mask[[y, x]] = 0;
            }
        }
        mask[[10, 10]] = FOREGROUND;

        let regions = external_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].moments.m00, 121.0);
        assert_eq!(regions[0].moments.centroid(), Some(Point2::new(10.0, 10.0)));
    }

    #[test]
    fn test_regions_in_raster_order() {
        let mut mask = Array2::zeros((40, 40));
        paint(&mut mask, 30, 2, 3, 3);
        paint(&mut mask, 2, 20, 4, 4);

        let candidates = CandidateExtractor::new(0.0).extract(&mask);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].centroid, Point2::new(31.0, 3.0));
        assert_eq!(candidates[1].area, 16.0);
    }

    #[test]
    fn test_area_filter_boundary() {
        let mut mask = Array2::zeros((60, 60));
        paint(&mut mask, 5, 5, 10, 10);

        assert_eq!(CandidateExtractor::new(100.0).extract(&mask).len(), 1);
        assert!(CandidateExtractor::new(101.0).extract(&mask).is_empty());
    }

    #[test]
    fn test_degenerate_moments_have_no_centroid() {
        assert_eq!(Moments::default().centroid(), None);
    }

    #[test]
    fn test_empty_mask_has_no_regions() {
        let mask = Array2::zeros((8, 8));
        assert!(external_regions(&mask).is_empty());
    }
}
