//! Frame and mask containers shared by every tracking stage.

use ndarray::{Array2, Array3};

use crate::tracker::rect::Rect;

/// Per-pixel foreground classification, shape `(height, width)`.
///
/// Raw masks from the background model hold `0`, [`SHADOW`](crate::tracker::SHADOW)
/// or [`FOREGROUND`](crate::tracker::FOREGROUND); refined masks hold only `0` and `255`.
pub type ForegroundMask = Array2<u8>;

/// RGB colour triple.
pub type Rgb = [u8; 3];

pub const RED: Rgb = [255, 0, 0];
pub const GREEN: Rgb = [0, 255, 0];
pub const BLUE: Rgb = [0, 0, 255];

/// An 8-bit, 3-channel colour image stored as `(height, width, channel)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: Array3<u8>,
}

impl Frame {
    /// Wrap an existing `(height, width, 3)` array.
    ///
    /// Arrays with a channel count other than three are accepted here and
    /// rejected when handed to the tracker, see [`Frame::is_empty`].
    pub fn new(pixels: Array3<u8>) -> Self {
        Self { pixels }
    }

    /// A frame of uniform colour.
    pub fn filled(width: usize, height: usize, color: Rgb) -> Self {
        let pixels = Array3::from_shape_fn((height, width, 3), |(_, _, c)| color[c]);
        Self { pixels }
    }

    /// Build a frame from interleaved RGB bytes in row-major order.
    pub fn from_rgb_bytes(width: usize, height: usize, bytes: Vec<u8>) -> Option<Self> {
        Array3::from_shape_vec((height, width, 3), bytes)
            .ok()
            .map(Self::new)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.pixels.dim().2
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// True when the frame carries no usable pixels: a zero extent or a
    /// channel count other than three.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0 || self.channels() != 3
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        [
            self.pixels[[y, x, 0]],
            self.pixels[[y, x, 1]],
            self.pixels[[y, x, 2]],
        ]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgb) {
        for (c, value) in color.into_iter().enumerate() {
            self.pixels[[y, x, c]] = value;
        }
    }

    pub fn pixels(&self) -> &Array3<u8> {
        &self.pixels
    }


    /// Paint the axis-aligned block `[x0, x1] x [y0, y1]` (inclusive, clipped).
    pub fn fill_block(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, color: Rgb) {
        let x1 = x1.min(self.width().saturating_sub(1));
        let y1 = y1.min(self.height().saturating_sub(1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Draw a filled disc, clipped to the frame.
    pub fn fill_circle(&mut self, cx: i64, cy: i64, radius: i64, color: Rgb) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    self.put_clipped(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Draw the outline of `rect` with the given stroke width, clipped to the frame.
    ///
    /// The stroke is centred on the rectangle edge.
    pub fn draw_rect(&mut self, rect: &Rect, color: Rgb, thickness: i64) {
        let [x0, y0, x1, y1] = rect.to_tlbr().map(|v| v.round() as i64);
        let half = thickness / 2;
        let lo = -half;
        let hi = thickness - half - 1;
        for x in x0 + lo..=x1 + hi {
            for t in lo..=hi {
                self.put_clipped(x, y0 + t, color);
                self.put_clipped(x, y1 + t, color);
            }
        }
        for y in y0 + lo..=y1 + hi {
            for t in lo..=hi {
                self.put_clipped(x0 + t, y, color);
                self.put_clipped(x1 + t, y, color);
            }
        }
    }

    fn put_clipped(&mut self, x: i64, y: i64, color: Rgb) {
        if x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height() {
            self.set_pixel(x as usize, y as usize, color);
        }
    }
}
