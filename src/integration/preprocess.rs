//! Region-of-interest cropping and frame enhancement applied before tracking.

use std::str::FromStr;

use ndarray::{Array3, s};
use serde::{Deserialize, Serialize};

use crate::integration::SourceError;
use crate::integration::equalize::{Clahe, equalize_lightness};
use crate::tracker::Frame;

/// Rectangular region of interest, usually the arena floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Cut the region out of `frame`. The region must lie fully inside it.
    pub fn crop(&self, frame: &Frame) -> Result<Frame, SourceError> {
        let (width, height) = frame.dimensions();
        let fits = self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|right| right <= width)
            && self.y.checked_add(self.height).is_some_and(|bottom| bottom <= height);
        if !fits {
            return Err(SourceError::RoiOutOfBounds {
                roi: *self,
                width,
                height,
            });
        }
        let view = frame.pixels().slice(s![
            self.y..self.y + self.height,
            self.x..self.x + self.width,
            ..
        ]);
        Ok(Frame::new(view.to_owned()))
    }
}

impl FromStr for Roi {
    type Err = String;

    /// Parse `"x,y,width,height"`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parts = text
            .split(',')
            .map(|p| p.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid ROI {text:?}: {e}"))?;
        match parts.as_slice() {
            &[x, y, width, height] => Ok(Self::new(x, y, width, height)),
            _ => Err(format!("ROI must be x,y,width,height, got {text:?}")),
        }
    }
}

/// Enhancement chain applied to the cropped arena, in order: contrast and
/// brightness, gamma, local contrast equalisation, 5x5 Gaussian blur.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enhancement {
    /// Contrast gain
    pub alpha: f32,
    /// Brightness offset, negative darkens
    pub beta: f32,
    /// Gamma; values above 1 darken mid-tones
    pub gamma: f32,
    /// CLAHE on the lightness channel, skipped when `None`
    pub clahe: Option<Clahe>,
    /// Apply a 5x5 Gaussian blur last
    pub blur: bool,
}

impl Default for Enhancement {
    fn default() -> Self {
        Self {
            alpha: 1.2,
            beta: -25.0,
            gamma: 1.2,
            clahe: Some(Clahe::default()),
            blur: true,
        }
    }
}

impl Enhancement {
    pub fn apply(&self, frame: &Frame) -> Frame {
        let contrast = self.contrast_table();
        let gamma = self.gamma_table();
        let mut pixels = frame.pixels().mapv(|v| gamma[contrast[v as usize] as usize]);
        if let Some(clahe) = &self.clahe {
            pixels = equalize_lightness(&pixels, clahe);
        }
        if self.blur {
            pixels = gaussian_blur_5x5(&pixels);
        }
        Frame::new(pixels)
    }

    /// `|alpha * v + beta|`, rounded and saturated.
    pub(crate) fn contrast_table(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = (i as f32 * self.alpha + self.beta).abs().round().min(255.0) as u8;
        }
        lut
    }

    pub(crate) fn gamma_table(&self) -> [u8; 256] {
        let inv_gamma = 1.0 / self.gamma;
        let mut lut = [0u8; 256];
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = ((i as f32 / 255.0).powf(inv_gamma) * 255.0).round() as u8;
        }
        lut
    }
}

/// Separable binomial blur `[1 4 6 4 1] / 16` with reflect-101 borders.
fn gaussian_blur_5x5(pixels: &Array3<u8>) -> Array3<u8> {
    const TAPS: [f32; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];
    let (height, width, channels) = pixels.dim();

    let horizontal = Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        (-2..=2)
            .zip(TAPS)
            .map(|(d, w)| w * pixels[[y, reflect_101(x as isize + d, width), c]] as f32)
            .sum::<f32>()
            / 16.0
    });
    Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        let v = (-2..=2)
            .zip(TAPS)
            .map(|(d, w)| w * horizontal[[reflect_101(y as isize + d, height), x, c]])
            .sum::<f32>()
            / 16.0;
        v.round().clamp(0.0, 255.0) as u8
    })
}

pub(crate) fn reflect_101(i: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * (len - 1) - i;
        } else {
            return i as usize;
        }
    }
}

/// Per-frame transform a frame source runs on every decoded frame.
pub trait Preprocessor {
    fn apply(&self, frame: Frame) -> Result<Frame, SourceError>;
}

/// Optional crop then optional enhancement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preprocess {
    pub roi: Option<Roi>,
    pub enhancement: Option<Enhancement>,
}

impl Preprocessor for Preprocess {
    fn apply(&self, frame: Frame) -> Result<Frame, SourceError> {
        let frame = match &self.roi {
            Some(roi) => roi.crop(&frame)?,
            None => frame,
        };
        Ok(match &self.enhancement {
            Some(enhancement) => enhancement.apply(&frame),
            None => frame,
        })
    }
}
