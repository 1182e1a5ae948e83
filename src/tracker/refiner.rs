//! Binary thresholding and morphological clean-up of foreground masks.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::tracker::background::FOREGROUND;
use crate::tracker::error::TrackerError;
use crate::tracker::frame::ForegroundMask;

/// Parameters of the mask refinement pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    /// Scores strictly above this become foreground. Sits above the shadow
    /// value so shadows are discarded here.
    pub binary_threshold: u8,
    /// Side of the elliptical structuring element, odd.
    pub kernel_size: usize,
    /// Erosions, then as many dilations, of the opening step.
    pub open_iterations: u32,
    /// Extra dilations after the opening.
    pub dilate_iterations: u32,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            binary_threshold: 244,
            kernel_size: 3,
            open_iterations: 2,
            dilate_iterations: 2,
        }
    }
}

impl RefinerConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(TrackerError::invalid(
                "refiner.kernel_size",
                format!("must be a positive odd number, got {}", self.kernel_size),
            ));
        }
        Ok(())
    }
}

/// Offsets of the set cells of a structuring element, relative to its centre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    offsets: Vec<(isize, isize)>,
}

impl StructuringElement {
    /// Elliptical element inscribed in a `size x size` square.
    ///
    /// For `size == 3` this is the 4-connected cross.
    pub fn ellipse(size: usize) -> Self {
        let r = (size / 2) as isize;
        let c = r as f64;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut offsets = Vec::new();
        for dy in -r..=r {
            let dx = (c * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as isize;
            for x in -dx..=dx {
                offsets.push((x, dy));
            }
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[(isize, isize)] {
        &self.offsets
    }
}

/// Turns raw background-model scores into a clean binary mask.
#[derive(Debug, Clone)]
pub struct MaskRefiner {
    config: RefinerConfig,
    kernel: StructuringElement,
}

impl MaskRefiner {
    pub fn new(config: RefinerConfig) -> Self {
        let kernel = StructuringElement::ellipse(config.kernel_size);
        Self { config, kernel }
    }

    /// Threshold, open, then dilate.
    pub fn refine(&self, scores: &ForegroundMask) -> ForegroundMask {
        let cleaned = self.suppress_noise(scores);
        dilate(&cleaned, &self.kernel, self.config.dilate_iterations)
    }

    /// Threshold and opening only. Idempotent on binary masks.
    pub fn suppress_noise(&self, scores: &ForegroundMask) -> ForegroundMask {
        let binary = threshold(scores, self.config.binary_threshold);
        let eroded = erode(&binary, &self.kernel, self.config.open_iterations);
        dilate(&eroded, &self.kernel, self.config.open_iterations)
    }

    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }
}

/// Values strictly above `cutoff` become 255, everything else 0.
pub fn threshold(mask: &ForegroundMask, cutoff: u8) -> ForegroundMask {
    mask.mapv(|v| if v > cutoff { FOREGROUND } else { 0 })
}

/// Binary erosion. Neighbours outside the mask never erode a pixel.
pub fn erode(mask: &ForegroundMask, kernel: &StructuringElement, iterations: u32) -> ForegroundMask {
    morph(mask, kernel, iterations, |all_set, _| all_set)
}

/// Binary dilation. Neighbours outside the mask never dilate into it.
pub fn dilate(mask: &ForegroundMask, kernel: &StructuringElement, iterations: u32) -> ForegroundMask {
    morph(mask, kernel, iterations, |_, any_set| any_set)
}

fn morph(
    mask: &ForegroundMask,
    kernel: &StructuringElement,
    iterations: u32,
    decide: impl Fn(bool, bool) -> bool,
) -> ForegroundMask {
    let (height, width) = mask.dim();
    let mut current = mask.clone();
    for _ in 0..iterations {
        let src = &current;
        let next = Array2::from_shape_fn((height, width), |(y, x)| {
            let mut all_set = true;
            let mut any_set = false;
            for &(dx, dy) in kernel.offsets() {
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                if src[[ny as usize, nx as usize]] != 0 {
                    any_set = true;
                } else {
                    all_set = false;
                }
            }
            if decide(all_set, any_set) { FOREGROUND } else { 0 }
        });
        current = next;
    }
    current
}
