//! Contrast-limited adaptive histogram equalisation on the CIE L*a*b*
//! lightness channel.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::integration::preprocess::reflect_101;

const BINS: usize = 256;

// sRGB to XYZ (D65), rows already normalised by the white point for X and Z.
const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;
const LAB_EPSILON: f32 = 0.008856;

/// CLAHE parameters. The clip limit is relative to a flat histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clahe {
    pub clip_limit: f64,
    /// Tiles per side
    pub tile_grid: usize,
}

impl Default for Clahe {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: 8,
        }
    }
}

impl Clahe {
    /// Equalise a single 8-bit channel.
    ///
    /// The image is split into `tile_grid x tile_grid` tiles (a reflect-101
    /// padded copy when the size does not divide evenly). Each tile gets a
    /// clipped-histogram lookup table and every pixel is bilinearly
    /// interpolated between the tables of the four nearest tile centres.
    pub fn apply(&self, channel: &Array2<u8>) -> Array2<u8> {
        let (height, width) = channel.dim();
        if height == 0 || width == 0 {
            return channel.clone();
        }
        let tiles = self.tile_grid.max(1);
        let tile_w = width.div_ceil(tiles);
        let tile_h = height.div_ceil(tiles);
        let tile_area = tile_w * tile_h;
        let clip = (self.clip_limit > 0.0)
            .then(|| ((self.clip_limit * tile_area as f64 / BINS as f64) as usize).max(1));

        let mut luts = Vec::with_capacity(tiles * tiles);
        for ty in 0..tiles {
            for tx in 0..tiles {
                let mut hist = [0usize; BINS];
                for y in ty * tile_h..(ty + 1) * tile_h {
                    let sy = reflect_101(y as isize, height);
                    for x in tx * tile_w..(tx + 1) * tile_w {
                        hist[channel[[sy, reflect_101(x as isize, width)]] as usize] += 1;
                    }
                }
                if let Some(clip) = clip {
                    clip_histogram(&mut hist, clip);
                }
                luts.push(cumulative_lut(&hist, tile_area));
            }
        }

        let inv_tw = 1.0 / tile_w as f32;
        let inv_th = 1.0 / tile_h as f32;
        Array2::from_shape_fn((height, width), |(y, x)| {
            let (ty1, ty2, ya) = neighbours(y as f32 * inv_th - 0.5, tiles);
            let (tx1, tx2, xa) = neighbours(x as f32 * inv_tw - 0.5, tiles);
            let v = channel[[y, x]] as usize;
            let at = |ty: usize, tx: usize| luts[ty * tiles + tx][v] as f32;
            let top = at(ty1, tx1) * (1.0 - xa) + at(ty1, tx2) * xa;
            let bottom = at(ty2, tx1) * (1.0 - xa) + at(ty2, tx2) * xa;
            (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8
        })
    }
}

/// Cap every bin at `clip` and spread the excess over all bins.
fn clip_histogram(hist: &mut [usize; BINS], clip: usize) {
    let mut excess = 0;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let batch = excess / BINS;
    let mut residual = excess - batch * BINS;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

fn cumulative_lut(hist: &[usize; BINS], total: usize) -> [u8; BINS] {
    let scale = 255.0 / total as f32;
    let mut lut = [0u8; BINS];
    let mut sum = 0;
    for (entry, &count) in lut.iter_mut().zip(hist) {
        sum += count;
        *entry = (sum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Lower and upper tile index around a fractional tile coordinate, plus the
/// weight of the upper one.
fn neighbours(position: f32, tiles: usize) -> (usize, usize, f32) {
    let lower = position.floor();
    let weight = position - lower;
    let upper = (lower as isize + 1).min(tiles as isize - 1).max(0) as usize;
    (lower.max(0.0) as usize, upper, weight)
}

/// Equalise the lightness of an RGB image and keep its chroma.
pub(crate) fn equalize_lightness(pixels: &Array3<u8>, clahe: &Clahe) -> Array3<u8> {
    let (height, width, _) = pixels.dim();
    let mut lightness = Array2::<u8>::zeros((height, width));
    let mut chroma = Array3::<f32>::zeros((height, width, 2));
    for y in 0..height {
        for x in 0..width {
            let rgb = [pixels[[y, x, 0]], pixels[[y, x, 1]], pixels[[y, x, 2]]];
            let (l, a, b) = rgb_to_lab(rgb);
            lightness[[y, x]] = l;
            chroma[[y, x, 0]] = a;
            chroma[[y, x, 1]] = b;
        }
    }

    let equalized = clahe.apply(&lightness);

    let mut out = Array3::<u8>::zeros((height, width, 3));
    for y in 0..height {
        for x in 0..width {
            let rgb = lab_to_rgb(equalized[[y, x]], chroma[[y, x, 0]], chroma[[y, x, 1]]);
            for (c, value) in rgb.into_iter().enumerate() {
                out[[y, x, c]] = value;
            }
        }
    }
    out
}

fn srgb_to_linear(v: u8) -> f32 {
    let c = v as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f32) -> f32 {
    let cube = f * f * f;
    if cube > LAB_EPSILON {
        cube
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

/// 8-bit lightness (`L * 255 / 100`) and signed a*, b*.
fn rgb_to_lab([r, g, b]: [u8; 3]) -> (u8, f32, f32) {
    let (r, g, b) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));
    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / XN;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / ZN;

    let l = if y > LAB_EPSILON {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    };
    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l8 = (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8;
    (l8, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

fn lab_to_rgb(l8: u8, a: f32, b: f32) -> [u8; 3] {
    let l = l8 as f32 * 100.0 / 255.0;
    let (y, fy) = if l > 8.0 {
        let fy = (l + 16.0) / 116.0;
        (fy * fy * fy, fy)
    } else {
        let y = l / 903.3;
        (y, 7.787 * y + 16.0 / 116.0)
    };
    let x = lab_f_inv(fy + a / 500.0) * XN;
    let z = lab_f_inv(fy - b / 200.0) * ZN;

    [
        linear_to_srgb(3.240479 * x - 1.537150 * y - 0.498535 * z),
        linear_to_srgb(-0.969256 * x + 1.875991 * y + 0.041556 * z),
        linear_to_srgb(0.055648 * x - 0.204043 * y + 1.057311 * z),
    ]
}
