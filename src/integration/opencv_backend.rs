//! OpenCV image-processing backend.
//!
//! [`OpenCvBackend`] runs the same stages as the native backend on OpenCV:
//! MOG2 background subtraction, threshold, elliptical opening and dilation,
//! and external contours. [`OpenCvPreprocess`] does the enhancement chain
//! with `convertScaleAbs`, a gamma `LUT`, CLAHE and `GaussianBlur`.
//!
//! Frames stay RGB on both sides; Lab conversions use the RGB codes.
//!
//! # Example
//!
//! ```ignore
//! use mousetrack_rs::integration::{OpenCvBackend, TrackingSession};
//! use mousetrack_rs::{MotionTracker, TrackerConfig};
//!
//! let config = TrackerConfig::default();
//! let backend = OpenCvBackend::new(&config)?;
//! let tracker = MotionTracker::with_backend(config, backend)?;
//! let mut session = TrackingSession::with_tracker(source, tracker);
//! ```

use log::debug;
use ndarray::Array2;
use opencv::core::{self, Mat, Point, Ptr, Scalar, Size, Vector};
use opencv::imgproc::{self, CLAHETrait};
use opencv::prelude::*;
use opencv::video::{self, BackgroundSubtractorTrait};

use crate::integration::SourceError;
use crate::integration::preprocess::{Enhancement, Preprocess, Preprocessor};
use crate::tracker::{
    BLUE, ForegroundMask, Frame, GREEN, Moments, MotionBackend, Observation, RED, Rect, Region,
    RefinerConfig, Rgb, SelectionPolicy, TrackerConfig, TrackerError,
};

const MARKER_RADIUS: i32 = 5;
const BOX_THICKNESS: i32 = 2;

impl From<opencv::Error> for TrackerError {
    fn from(err: opencv::Error) -> Self {
        TrackerError::Backend(Box::new(err))
    }
}

/// [`MotionBackend`] on OpenCV's MOG2 subtractor and contour functions.
pub struct OpenCvBackend {
    subtractor: Ptr<video::BackgroundSubtractorMOG2>,
    kernel: Mat,
    refiner: RefinerConfig,
    frames_seen: u64,
}

impl OpenCvBackend {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        let history = i32::try_from(config.history_length)
            .map_err(|_| TrackerError::invalid("history_length", "exceeds the OpenCV range"))?;
        let subtractor = video::create_background_subtractor_mog2(
            history,
            config.variance_threshold as f64,
            config.detect_shadows,
        )?;
        let size = config.refiner.kernel_size as i32;
        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_ELLIPSE,
            Size::new(size, size),
            Point::new(-1, -1),
        )?;
        debug!("opencv backend: MOG2 history {history}, {size}x{size} elliptical kernel");
        Ok(Self {
            subtractor,
            kernel,
            refiner: config.refiner.clone(),
            frames_seen: 0,
        })
    }
}

impl MotionBackend for OpenCvBackend {
    fn segment(&mut self, frame: &Frame) -> Result<ForegroundMask, TrackerError> {
        let image = frame_to_mat(frame)?;
        let mut scores = Mat::default();
        BackgroundSubtractorTrait::apply(&mut self.subtractor, &image, &mut scores, -1.0)?;
        self.frames_seen += 1;
        // MOG2 flags everything on the frame that seeds it.
        if self.frames_seen == 1 {
            return Ok(ForegroundMask::zeros((frame.height(), frame.width())));
        }

        let mut binary = Mat::default();
        imgproc::threshold(
            &scores,
            &mut binary,
            self.refiner.binary_threshold as f64,
            255.0,
            imgproc::THRESH_BINARY,
        )?;

        let anchor = Point::new(-1, -1);
        let border = imgproc::morphology_default_border_value()?;
        let mut opened = Mat::default();
        imgproc::morphology_ex(
            &binary,
            &mut opened,
            imgproc::MORPH_OPEN,
            &self.kernel,
            anchor,
            self.refiner.open_iterations as i32,
            core::BORDER_CONSTANT,
            border,
        )?;
        let mut dilated = Mat::default();
        imgproc::dilate(
            &opened,
            &mut dilated,
            &self.kernel,
            anchor,
            self.refiner.dilate_iterations as i32,
            core::BORDER_CONSTANT,
            border,
        )?;
        mat_to_mask(&dilated)
    }

    /// Area and centroid come from the filled contour, so they count pixels
    /// like the native labelling does.
    fn regions(&self, mask: &ForegroundMask) -> Result<Vec<Region>, TrackerError> {
        let (height, width) = mask.dim();
        if height == 0 || width == 0 {
            return Ok(Vec::new());
        }
        let image = mask_to_mat(mask)?;
        let mut contours: Vector<Vector<Point>> = Vector::new();
        imgproc::find_contours(
            &image,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )?;

        let mut keyed = Vec::with_capacity(contours.len());
        for contour in contours.iter() {
            let first = contour
                .iter()
                .map(|p| (p.y, p.x))
                .min()
                .unwrap_or((0, 0));

            let mut filled = Mat::zeros(height as i32, width as i32, core::CV_8UC1)?.to_mat()?;
            let mut single: Vector<Vector<Point>> = Vector::new();
            single.push(contour.clone());
            imgproc::fill_poly(
                &mut filled,
                &single,
                Scalar::all(255.0),
                imgproc::LINE_8,
                0,
                Point::new(0, 0),
            )?;
            let m = imgproc::moments(&filled, true)?;
            let r = imgproc::bounding_rect(&contour)?;
            keyed.push((
                first,
                Region {
                    moments: Moments {
                        m00: m.m00,
                        m10: m.m10,
                        m01: m.m01,
                    },
                    bounds: Rect::new(r.x as f32, r.y as f32, r.width as f32, r.height as f32),
                },
            ));
        }
        // find_contours reports outer contours bottom-up
        keyed.sort_by_key(|(first, _)| *first);
        Ok(keyed.into_iter().map(|(_, region)| region).collect())
    }

    fn annotate(
        &self,
        frame: &mut Frame,
        observation: &Observation,
        policy: SelectionPolicy,
    ) -> Result<(), TrackerError> {
        let (point, color, bounds) = match observation {
            Observation::Detected(candidate) => (
                candidate.centroid,
                RED,
                (policy == SelectionPolicy::LargestArea).then_some(candidate.bounds),
            ),
            Observation::Carried(point) => (*point, BLUE, None),
            Observation::Lost | Observation::Gap => return Ok(()),
        };

        let mut image = frame_to_mat(frame)?;
        imgproc::circle(
            &mut image,
            Point::new(point.x as i32, point.y as i32),
            MARKER_RADIUS,
            scalar(color),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
        if let Some(b) = bounds {
            imgproc::rectangle(
                &mut image,
                core::Rect::new(b.x as i32, b.y as i32, b.width as i32, b.height as i32),
                scalar(GREEN),
                BOX_THICKNESS,
                imgproc::LINE_8,
                0,
            )?;
        }
        *frame = mat_to_frame(&image)?;
        Ok(())
    }
}

/// [`Preprocess`] settings with the enhancement chain run on OpenCV.
#[derive(Debug, Clone, Default)]
pub struct OpenCvPreprocess {
    settings: Preprocess,
}

impl OpenCvPreprocess {
    pub fn new(settings: Preprocess) -> Self {
        Self { settings }
    }
}

impl Preprocessor for OpenCvPreprocess {
    fn apply(&self, frame: Frame) -> Result<Frame, SourceError> {
        let frame = match &self.settings.roi {
            Some(roi) => roi.crop(&frame)?,
            None => frame,
        };
        match &self.settings.enhancement {
            Some(enhancement) => enhance(&frame, enhancement).map_err(SourceError::Preprocess),
            None => Ok(frame),
        }
    }
}

fn enhance(frame: &Frame, enhancement: &Enhancement) -> Result<Frame, TrackerError> {
    let image = frame_to_mat(frame)?;
    let mut scaled = Mat::default();
    core::convert_scale_abs(
        &image,
        &mut scaled,
        enhancement.alpha as f64,
        enhancement.beta as f64,
    )?;
    let gamma = enhancement.gamma_table();
    let table = Mat::from_slice(gamma.as_slice())?.try_clone()?;
    let mut image = Mat::default();
    core::lut(&scaled, &table, &mut image)?;

    if let Some(clahe) = &enhancement.clahe {
        let mut lab = Mat::default();
        imgproc::cvt_color(&image, &mut lab, imgproc::COLOR_RGB2Lab, 0)?;
        let mut channels: Vector<Mat> = Vector::new();
        core::split(&lab, &mut channels)?;

        let tiles = clahe.tile_grid.max(1) as i32;
        let mut equalizer = imgproc::create_clahe(clahe.clip_limit, Size::new(tiles, tiles))?;
        let mut lightness = Mat::default();
        equalizer.apply(&channels.get(0)?, &mut lightness)?;
        channels.set(0, lightness)?;

        let mut merged = Mat::default();
        core::merge(&channels, &mut merged)?;
        let mut restored = Mat::default();
        imgproc::cvt_color(&merged, &mut restored, imgproc::COLOR_Lab2RGB, 0)?;
        image = restored;
    }

    if enhancement.blur {
        let mut blurred = Mat::default();
        imgproc::gaussian_blur(
            &image,
            &mut blurred,
            Size::new(5, 5),
            0.0,
            0.0,
            core::BORDER_DEFAULT,
        )?;
        image = blurred;
    }
    mat_to_frame(&image)
}

fn scalar([r, g, b]: Rgb) -> Scalar {
    Scalar::new(r as f64, g as f64, b as f64, 0.0)
}

fn frame_to_mat(frame: &Frame) -> Result<Mat, TrackerError> {
    let bytes: Vec<u8> = frame.pixels().iter().copied().collect();
    let flat = Mat::from_slice(&bytes)?;
    Ok(flat.reshape(3, frame.height() as i32)?.try_clone()?)
}

fn mat_to_frame(mat: &Mat) -> Result<Frame, TrackerError> {
    let (width, height) = (mat.cols() as usize, mat.rows() as usize);
    Frame::from_rgb_bytes(width, height, mat.data_bytes()?.to_vec())
        .ok_or_else(|| TrackerError::Backend(format!("expected a {width}x{height} RGB mat").into()))
}

fn mask_to_mat(mask: &ForegroundMask) -> Result<Mat, TrackerError> {
    let bytes: Vec<u8> = mask.iter().copied().collect();
    let flat = Mat::from_slice(&bytes)?;
    Ok(flat.reshape(1, mask.nrows() as i32)?.try_clone()?)
}

fn mat_to_mask(mat: &Mat) -> Result<ForegroundMask, TrackerError> {
    let shape = (mat.rows() as usize, mat.cols() as usize);
    Array2::from_shape_vec(shape, mat.data_bytes()?.to_vec())
        .map_err(|err| TrackerError::Backend(Box::new(err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{FOREGROUND, MotionTracker, external_regions};
    use nalgebra::Point2;
    use ndarray::{Array3, s};

    const FLOOR: [u8; 3] = [200, 200, 200];
    const MOUSE: [u8; 3] = [30, 30, 30];

    fn frame_with_blob(cx: usize, cy: usize, half: usize) -> Frame {
        let mut frame = Frame::filled(100, 80, FLOOR);
        frame.fill_block(cx - half, cy - half, cx + half, cy + half, MOUSE);
        frame
    }

    #[test]
    fn test_first_frame_is_background() {
        let mut backend = OpenCvBackend::new(&TrackerConfig::default()).unwrap();
        let mask = backend.segment(&frame_with_blob(40, 30, 7)).unwrap();
        assert_eq!(mask.dim(), (80, 100));
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_tracks_blob_after_warm_up() {
        let config = TrackerConfig::default();
        let backend = OpenCvBackend::new(&config).unwrap();
        let mut tracker = MotionTracker::with_backend(config, backend).unwrap();
        let empty = Frame::filled(100, 80, FLOOR);
        for _ in 0..20 {
            assert_eq!(tracker.process(&empty).unwrap().coordinate, None);
        }

        let output = tracker.process(&frame_with_blob(40, 30, 7)).unwrap();
        assert_eq!(output.coordinate, Some(Point2::new(40.0, 30.0)));
        assert_eq!(output.annotated.pixel(40, 30), RED);

        let carried = tracker.process(&empty).unwrap();
        assert_eq!(carried.observation, Observation::Carried(Point2::new(40.0, 30.0)));
        assert_eq!(carried.annotated.pixel(40, 30), BLUE);
    }

    #[test]
    fn test_regions_match_native_labelling() {
        let mut mask = ForegroundMask::zeros((40, 50));
        // A ring with a hole, then a plain square lower down.
        mask.slice_mut(s![5..15, 30..40]).fill(FOREGROUND);
        mask.slice_mut(s![8..12, 33..37]).fill(0);
        mask.slice_mut(s![25..32, 4..11]).fill(FOREGROUND);

        let backend = OpenCvBackend::new(&TrackerConfig::default()).unwrap();
        let ours = backend.regions(&mask).unwrap();
        let native = external_regions(&mask);
        assert_eq!(ours.len(), 2);
        assert_eq!(ours, native);
        assert_eq!(ours[0].moments.m00, 100.0);
    }

    #[test]
    fn test_enhancement_matches_native() {
        let pixels = Array3::from_shape_fn((24, 32, 3), |(y, x, c)| (x * 7 + y * 3 + c * 20) as u8);
        let frame = Frame::new(pixels);
        let enhancement = Enhancement {
            clahe: None,
            ..Default::default()
        };
        let preprocess = OpenCvPreprocess::new(Preprocess {
            roi: None,
            enhancement: Some(enhancement),
        });

        let ours = preprocess.apply(frame.clone()).unwrap();
        let native = enhancement.apply(&frame);
        for (a, b) in ours.pixels().iter().zip(native.pixels()) {
            assert!(a.abs_diff(*b) <= 1, "{a} vs {b}");
        }
    }

    #[test]
    fn test_clahe_stretches_low_contrast_arena() {
        let pixels = Array3::from_shape_fn((128, 128, 3), |(y, x, _)| 100 + ((x + y) % 16) as u8);
        let preprocess = OpenCvPreprocess::new(Preprocess {
            roi: None,
            enhancement: Some(Enhancement {
                alpha: 1.0,
                beta: 0.0,
                gamma: 1.0,
                clahe: Some(Default::default()),
                blur: false,
            }),
        });
        let enhanced = preprocess.apply(Frame::new(pixels)).unwrap();
        let red: Vec<u8> = enhanced.pixels().iter().step_by(3).copied().collect();
        let spread = red.iter().max().unwrap() - red.iter().min().unwrap();
        assert!(spread >= 30, "spread {spread}");
    }
}
