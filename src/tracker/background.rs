//! Adaptive Gaussian-mixture background model.
//!
//! Every pixel keeps a small, weight-sorted set of Gaussian modes over RGB
//! space with an isotropic variance. The heaviest modes whose cumulative
//! weight stays below a fixed ratio describe the static scene; a pixel close
//! to one of them is background. Unmatched pixels spawn a new mode, so an
//! object that stops moving is absorbed once its mode has gathered about a
//! tenth of the pixel's weight (on the order of `history_length / 10` frames).

use log::{debug, trace};
use ndarray::{Array2, Axis, Zip};

use crate::tracker::frame::{ForegroundMask, Frame};

/// Mask value for pixels matching the background.
pub const BACKGROUND: u8 = 0;
/// Mask value for pixels classified as a darker copy of the background.
pub const SHADOW: u8 = 127;
/// Mask value for pixels classified as moving foreground.
pub const FOREGROUND: u8 = 255;

const MAX_MODES: usize = 5;
const BACKGROUND_RATIO: f32 = 0.9;
const VARIANCE_THRESHOLD_GEN: f32 = 9.0;
const VARIANCE_INIT: f32 = 15.0;
const VARIANCE_MIN: f32 = 4.0;
const VARIANCE_MAX: f32 = 75.0;
const COMPLEXITY_REDUCTION: f32 = 0.05;
const SHADOW_TAU: f32 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GaussianMode {
    weight: f32,
    mean: [f32; 3],
    variance: f32,
}

impl GaussianMode {
    fn seeded(pixel: [f32; 3], weight: f32) -> Self {
        Self {
            weight,
            mean: pixel,
            variance: VARIANCE_INIT,
        }
    }
}

/// Running statistical model of the static scene.
///
/// Frames must be fed in chronological order without gaps; skipping or
/// reordering frames silently degrades the model.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    history_length: u32,
    variance_threshold: f32,
    detect_shadows: bool,
    /// Per-pixel modes, sorted by descending weight
    modes: Array2<[GaussianMode; MAX_MODES]>,
    mode_counts: Array2<u8>,
    frames_seen: u64,
}

impl BackgroundModel {
    /// Create an empty model. The first frame passed to
    /// [`update_and_segment`](Self::update_and_segment) seeds it.
    pub fn new(history_length: u32, variance_threshold: f32, detect_shadows: bool) -> Self {
        Self {
            history_length,
            variance_threshold,
            detect_shadows,
            modes: Array2::default((0, 0)),
            mode_counts: Array2::zeros((0, 0)),
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Current learning rate: `1 / min(2 * frames_seen, history_length)`.
    ///
    /// Adapts quickly right after construction and settles at
    /// `1 / history_length`.
    pub fn learning_rate(&self) -> f32 {
        let span = (2 * self.frames_seen).clamp(1, self.history_length.max(1) as u64);
        1.0 / span as f32
    }

    /// Update the per-pixel statistics with `frame` and classify each pixel.
    ///
    /// Returns [`BACKGROUND`], [`SHADOW`] or [`FOREGROUND`] per pixel. The
    /// seeding frame, and any frame whose dimensions differ from the model,
    /// re-initialises the model and is reported as all background.
    pub fn update_and_segment(&mut self, frame: &Frame) -> ForegroundMask {
        let (width, height) = frame.dimensions();
        let (model_height, model_width) = self.mode_counts.dim();

        if self.frames_seen == 0 || (model_width, model_height) != (width, height) {
            self.seed(frame);
            return Array2::from_elem((height, width), BACKGROUND);
        }

        self.frames_seen += 1;
        let alpha = self.learning_rate();
        let variance_threshold = self.variance_threshold;
        let detect_shadows = self.detect_shadows;
        trace!("background update #{} alpha={alpha:.5}", self.frames_seen);

        let mut mask = Array2::from_elem((height, width), BACKGROUND);
        Zip::from(&mut mask)
            .and(&mut self.modes)
            .and(&mut self.mode_counts)
            .and(frame.pixels().lanes(Axis(2)))
            .for_each(|out, modes, count, rgb| {
                let pixel = [rgb[0] as f32, rgb[1] as f32, rgb[2] as f32];
                *out = classify_and_update(
                    modes,
                    count,
                    pixel,
                    alpha,
                    variance_threshold,
                    detect_shadows,
                );
            });
        mask
    }

    fn seed(&mut self, frame: &Frame) {
        let (width, height) = frame.dimensions();
        if self.frames_seen > 0 {
            debug!("frame size changed to {width}x{height}, re-seeding background model");
        }
        self.modes = frame.pixels().map_axis(Axis(2), |rgb| {
            let mut modes = [GaussianMode::default(); MAX_MODES];
            modes[0] = GaussianMode::seeded([rgb[0] as f32, rgb[1] as f32, rgb[2] as f32], 1.0);
            modes
        });
        self.mode_counts = Array2::from_elem((height, width), 1);
        self.frames_seen = 1;
    }
}

/// Update one pixel's mixture with `pixel` and return its mask value.
fn classify_and_update(
    modes: &mut [GaussianMode],
    count: &mut u8,
    pixel: [f32; 3],
    alpha: f32,
    variance_threshold: f32,
    detect_shadows: bool,
) -> u8 {
    let decay = 1.0 - alpha;
    let prune = alpha * COMPLEXITY_REDUCTION;
    let mut n = *count as usize;

    let mut is_background = false;
    let mut matched = false;
    let mut cumulative = 0.0;

    for mode in modes[..n].iter_mut() {
        let mut weight = decay * mode.weight - prune;

        if !matched {
            let diff = [
                mode.mean[0] - pixel[0],
                mode.mean[1] - pixel[1],
                mode.mean[2] - pixel[2],
            ];
            let dist2 = diff.iter().map(|d| d * d).sum::<f32>();

            if cumulative < BACKGROUND_RATIO && dist2 < variance_threshold * mode.variance {
                is_background = true;
            }

            if dist2 < VARIANCE_THRESHOLD_GEN * mode.variance {
                matched = true;
                weight += alpha;
                let k = alpha / weight;
                for (mean, d) in mode.mean.iter_mut().zip(diff) {
                    *mean -= k * d;
                }
                mode.variance = (mode.variance + k * (dist2 - mode.variance))
                    .clamp(VARIANCE_MIN, VARIANCE_MAX);
            }
        }

        mode.weight = weight;
        cumulative += weight.max(0.0);
    }

    // Drop modes whose weight decayed below the pruning floor.
    let mut kept = 0;
    for i in 0..n {
        if modes[i].weight >= prune {
            modes[kept] = modes[i];
            kept += 1;
        }
    }
    n = kept;

    if !matched {
        let weight = if n == 0 { 1.0 } else { alpha };
        if n == modes.len() {
            n -= 1;
        }
        modes[n] = GaussianMode::seeded(pixel, weight);
        n += 1;
    }

    let total: f32 = modes[..n].iter().map(|m| m.weight).sum();
    if total > 0.0 {
        for mode in modes[..n].iter_mut() {
            mode.weight /= total;
        }
    }
    modes[..n].sort_by(|a, b| b.weight.total_cmp(&a.weight));
    *count = n as u8;

    if is_background {
        BACKGROUND
    } else if detect_shadows && is_shadow(&modes[..n], pixel, variance_threshold) {
        SHADOW
    } else {
        FOREGROUND
    }
}

/// A pixel is a shadow when it is a uniformly darkened copy of one of the
/// background modes: brightness ratio in `[SHADOW_TAU, 1]` and a colour
/// distortion within the variance threshold.
fn is_shadow(modes: &[GaussianMode], pixel: [f32; 3], variance_threshold: f32) -> bool {
    let mut cumulative = 0.0;
    for mode in modes {
        let numerator: f32 = mode.mean.iter().zip(pixel).map(|(m, p)| m * p).sum();
        let denominator: f32 = mode.mean.iter().map(|m| m * m).sum();
        if denominator == 0.0 {
            return false;
        }

        if numerator <= denominator && numerator >= SHADOW_TAU * denominator {
            let a = numerator / denominator;
            let dist2: f32 = mode
                .mean
                .iter()
                .zip(pixel)
                .map(|(m, p)| (a * m - p).powi(2))
                .sum();
            if dist2 < variance_threshold * mode.variance * a * a {
                return true;
            }
        }

        cumulative += mode.weight;
        if cumulative > BACKGROUND_RATIO {
            return false;
        }
    }
    false
}
