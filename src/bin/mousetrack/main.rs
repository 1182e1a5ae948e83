mod cli;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use mousetrack_rs::integration::{
    CsvSink, Enhancement, ImageSequence, Preprocess, SessionReport, SessionStats, TrackingSession,
    save_frame,
};
use mousetrack_rs::tracker::MotionBackend;
use mousetrack_rs::{FrameSource, TrackerConfig};
#[cfg(feature = "opencv-backend")]
use mousetrack_rs::{
    MotionTracker,
    integration::{OpenCvBackend, OpenCvPreprocess},
};

use crate::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    debug!("Started; args: {:?}", cli);

    let mut config = match &cli.config_path {
        Some(path) => TrackerConfig::from_json_file(path)
            .with_context(|| format!("failed to load tracker config from {path:?}"))?,
        None => TrackerConfig::default(),
    };
    if let Some(policy) = cli.policy {
        config.selection_policy = policy.into();
    }

    let preprocess = Preprocess {
        roi: cli.roi,
        enhancement: cli.enhance.then(Enhancement::default),
    };
    let source = ImageSequence::open(&cli.frames_dir, cli.fps)
        .with_context(|| format!("failed to open frames in {:?}", cli.frames_dir))?;

    if let Some(dir) = &cli.annotated_dir {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {dir:?}"))?;
    }

    #[cfg(feature = "opencv-backend")]
    if cli.opencv {
        info!("using the OpenCV backend");
        let source = source.with_preprocess(OpenCvPreprocess::new(preprocess));
        let backend = OpenCvBackend::new(&config)?;
        let tracker = MotionTracker::with_backend(config, backend)?;
        let report = track(TrackingSession::with_tracker(source, tracker), &cli)?;
        print_summary(&report.stats);
        return Ok(());
    }

    let source = source.with_preprocess(preprocess);
    let report = track(TrackingSession::new(source, config)?, &cli)?;
    print_summary(&report.stats);
    Ok(())
}

fn track<S, B>(mut session: TrackingSession<S, B>, cli: &Cli) -> Result<SessionReport>
where
    S: FrameSource,
    B: MotionBackend,
{
    let range = session
        .source()
        .frame_range(cli.start, cli.duration.unwrap_or(f64::INFINITY))
        .context("invalid time window")?;

    let mut sink = CsvSink::create(&cli.output)
        .with_context(|| format!("failed to create {:?}", cli.output))?;
    let report = session.run(range, cli.center_percent, |record, output| {
        sink.write(record)?;
        if let Some(dir) = &cli.annotated_dir {
            save_frame(
                &output.annotated,
                dir.join(format!("frame_{:06}.png", record.frame)),
            )?;
        }
        Ok(())
    })?;
    sink.flush()?;

    info!(
        "Wrote {} rows to {:?}",
        report.records.len(),
        cli.output
    );
    Ok(report)
}

fn print_summary(stats: &SessionStats) {
    println!("Total frames analysed: {}", stats.total_frames);
    println!("Frames with a position: {}", stats.tracked_frames);
    println!(
        "Frames in center: {} ({:.2}%)",
        stats.frames_in_center,
        stats.percent_in_center()
    );
    println!(
        "Frames out of center: {} ({:.2}%)",
        stats.frames_out_of_center,
        stats.percent_out_of_center()
    );
    println!("Time in center: {:.2} seconds", stats.seconds_in_center);
    println!("Time outside center: {:.2} seconds", stats.seconds_out_of_center);
    if let Some(distance) = stats.mean_distance_from_center {
        println!("Mean distance from center: {distance:.1} px");
    }
}
