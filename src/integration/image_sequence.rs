//! Folder of still images treated as a video.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use image::error::{ImageError, ParameterError, ParameterErrorKind};
use log::{debug, info};

use crate::integration::preprocess::{Preprocess, Preprocessor};
use crate::integration::source::FrameSource;
use crate::integration::{SinkError, SourceError};
use crate::tracker::Frame;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Frames stored as `.png`/`.jpg`/`.jpeg` files, ordered by file name.
///
/// Image folders carry no timing, so the frame rate is supplied by the
/// caller. Every loaded frame goes through the configured [`Preprocessor`],
/// a no-op [`Preprocess`] unless replaced.
#[derive(Debug, Clone)]
pub struct ImageSequence<P = Preprocess> {
    paths: Vec<PathBuf>,
    fps: f64,
    preprocess: P,
}

impl ImageSequence {
    pub fn open(folder: impl AsRef<Path>, fps: f64) -> Result<Self, SourceError> {
        let folder = folder.as_ref().to_path_buf();
        if !fps.is_finite() || fps <= 0.0 {
            return Err(SourceError::InvalidFps(fps));
        }

        let list_err = |source| SourceError::ListFolder {
            path: folder.clone(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(&folder).map_err(list_err)? {
            let path = entry.map_err(list_err)?.path();
            if path.is_file() && has_frame_extension(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(SourceError::NoFrames(folder));
        }
        paths.sort();

        info!("found {} frames in {:?}", paths.len(), folder);
        Ok(Self {
            paths,
            fps,
            preprocess: Preprocess::default(),
        })
    }
}

impl<P: Preprocessor> ImageSequence<P> {
    pub fn with_preprocess<Q: Preprocessor>(self, preprocess: Q) -> ImageSequence<Q> {
        ImageSequence {
            paths: self.paths,
            fps: self.fps,
            preprocess,
        }
    }
}

impl<P: Preprocessor> FrameSource for ImageSequence<P> {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn len(&self) -> usize {
        self.paths.len()
    }

    fn frame(&mut self, index: usize) -> Result<Frame, SourceError> {
        let path = self.paths.get(index).ok_or(SourceError::IndexOutOfRange {
            index,
            len: self.paths.len(),
        })?;
        debug!("loading frame {index} from {path:?}");

        let decode_err = |source| SourceError::Decode {
            path: path.clone(),
            source,
        };
        let rgb = image::open(path).map_err(decode_err)?.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        let frame = Frame::from_rgb_bytes(width, height, rgb.into_raw())
            .ok_or_else(|| decode_err(dimension_mismatch()))?;
        self.preprocess.apply(frame)
    }
}

/// Write `frame` to `path`; the format follows the file extension.
pub fn save_frame(frame: &Frame, path: impl AsRef<Path>) -> Result<(), SinkError> {
    let path = path.as_ref();
    let encode_err = |source| SinkError::Encode {
        path: path.to_path_buf(),
        source,
    };
    let image = RgbImage::from_raw(
        frame.width() as u32,
        frame.height() as u32,
        frame.pixels().iter().copied().collect(),
    )
    .ok_or_else(|| encode_err(dimension_mismatch()))?;
    image.save(path).map_err(encode_err)
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn dimension_mismatch() -> ImageError {
    ImageError::Parameter(ParameterError::from_kind(
        ParameterErrorKind::DimensionMismatch,
    ))
}
