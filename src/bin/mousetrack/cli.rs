use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use mousetrack_rs::SelectionPolicy;
use mousetrack_rs::integration::Roi;

const OUTPUT_CSV: &str = "tracking_results.csv";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Folder of .png/.jpg/.jpeg frames, ordered by file name
    pub frames_dir: PathBuf,

    /// Frame rate of the recording the frames were extracted from
    #[arg(long)]
    pub fps: f64,

    /// Start of the analysed window, in seconds
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    /// Length of the analysed window in seconds; runs to the end if omitted
    #[arg(long)]
    pub duration: Option<f64>,

    /// Side of the central zone as a percentage of the arena
    #[arg(long = "center-percent", default_value_t = 50.0)]
    pub center_percent: f32,

    /// Tracker configuration as JSON; missing fields take defaults
    #[arg(long = "config")]
    pub config_path: Option<PathBuf>,

    /// Override the candidate selection policy of the configuration
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Where to write the per-frame coordinate log
    #[arg(long, default_value = OUTPUT_CSV)]
    pub output: PathBuf,

    /// Crop every frame to x,y,width,height before tracking
    #[arg(long)]
    pub roi: Option<Roi>,

    /// Apply contrast, gamma, CLAHE and blur enhancement before tracking
    #[arg(long, default_value_t = false)]
    pub enhance: bool,

    /// Run background subtraction, morphology, contours and enhancement on OpenCV
    #[cfg(feature = "opencv-backend")]
    #[arg(long, default_value_t = false)]
    pub opencv: bool,

    /// Save annotated frames as PNG into this folder
    #[arg(long = "annotated-dir")]
    pub annotated_dir: Option<PathBuf>,

    #[arg(long = "loglevel", default_value_t = String::from("info"))]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    LargestArea,
    ProximityFirst,
}

impl From<PolicyArg> for SelectionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::LargestArea => SelectionPolicy::LargestArea,
            PolicyArg::ProximityFirst => SelectionPolicy::ProximityFirst,
        }
    }
}
