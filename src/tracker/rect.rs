/// Axis-aligned rectangle in pixel coordinates.
///
/// Used both for candidate bounding boxes and for the central zone of the
/// arena. Two formats are understood:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the rectangle
    pub width: f32,
    /// Height of the rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Bounding box of the inclusive pixel span `[min_x, max_x] x [min_y, max_y]`.
    ///
    /// A single pixel has width and height 1, matching a contour bounding rect.
    #[inline]
    pub fn from_pixel_span(min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> Self {
        Self::new(
            min_x as f32,
            min_y as f32,
            (max_x - min_x + 1) as f32,
            (max_y - min_y + 1) as f32,
        )
    }

    /// The box covering `percent` of each side of a `width x height` area,
    /// centred in it.
    pub fn centered_fraction(width: f32, height: f32, percent: f32) -> Self {
        let box_w = width * percent / 100.0;
        let box_h = height * percent / 100.0;
        Self::new((width - box_w) / 2.0, (height - box_h) / 2.0, box_w, box_h)
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Get the center point of the rectangle.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get the area of the rectangle.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether `(px, py)` lies inside the rectangle, edges included.
    #[inline]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        let [x1, y1, x2, y2] = self.to_tlbr();
        x1 <= px && px <= x2 && y1 <= py && py <= y2
    }
}
