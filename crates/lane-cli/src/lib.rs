//! Lane Finder
//!
//! Batch driver for the lane pipeline: loads layered settings, installs the
//! tracing subscriber and replays an image sequence through the pipeline,
//! writing annotated frames and a per-frame analysis log.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use camera_capture::{FrameSource, ImageSequence};
use camera_model::CameraCalibration;
use config::{Config, ConfigError, Environment};
use lane_pipeline::{LanePipeline, PipelineConfig, PipelineStats};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Settings file read when none is given on the command line
pub const DEFAULT_SETTINGS_FILE: &str = "lane-finder.toml";

/// Environment variable prefix, e.g. `LANE__PIPELINE__ROI__Y=460`
pub const ENV_PREFIX: &str = "LANE";

/// Name of the per-frame analysis log inside the output directory
pub const ANALYSIS_LOG: &str = "analysis.jsonl";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Tuning preset the pipeline defaults start from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    #[default]
    Standard,
    HarderChallenge,
}

impl Preset {
    pub fn pipeline(&self) -> PipelineConfig {
        match self {
            Preset::Standard => PipelineConfig::default(),
            Preset::HarderChallenge => PipelineConfig::harder_challenge(),
        }
    }
}

/// Runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub preset: Preset,
    /// Image file or directory of frames
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Camera calibration JSON; an ideal pinhole camera is assumed without it
    pub calibration_path: Option<PathBuf>,
    /// Frame rate used to timestamp the sequence
    pub fps: u32,
    pub log_format: LogFormat,
    pub log_level: String,
    pub pipeline: PipelineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_preset(Preset::default())
    }
}

impl Settings {
    pub fn with_preset(preset: Preset) -> Self {
        Self {
            preset,
            input: PathBuf::from("test_images"),
            output_dir: PathBuf::from("output_images"),
            calibration_path: None,
            fps: 25,
            log_format: LogFormat::Plain,
            log_level: "info".to_string(),
            pipeline: preset.pipeline(),
        }
    }

    /// Layer preset defaults, the settings file and `LANE__*` variables.
    ///
    /// An explicit `path` must exist; otherwise [`DEFAULT_SETTINGS_FILE`] is
    /// read when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };
        let overrides = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let preset = overrides.get::<Preset>("preset").unwrap_or_default();
        Config::builder()
            .add_source(Config::try_from(&Self::with_preset(preset))?)
            .add_source(overrides)
            .build()?
            .try_deserialize()
    }
}

/// Install the global tracing subscriber
pub fn init_logging(format: LogFormat, level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .with_context(|| format!("invalid log level {:?}", level))?;
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    match format {
        LogFormat::Plain => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .context("failed to set tracing subscriber")
}

/// Process every frame of `settings.input` and return the final counters
pub fn run(settings: &Settings) -> Result<PipelineStats> {
    let mut source = ImageSequence::open(&settings.input, settings.fps)
        .with_context(|| format!("opening {}", settings.input.display()))?;
    std::fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("creating {}", settings.output_dir.display()))?;

    let Some(first) = source.next_frame()? else {
        bail!("{} contains no frames", settings.input.display());
    };

    let calibration = match &settings.calibration_path {
        Some(path) => CameraCalibration::load(path)
            .with_context(|| format!("loading calibration {}", path.display()))?,
        None => {
            warn!("No calibration file configured, frames are not undistorted");
            CameraCalibration::identity(first.width, first.height)
        }
    };
    let mut pipeline = LanePipeline::new(settings.pipeline.clone(), &calibration, first.width, first.height)?;

    let log_path = settings.output_dir.join(ANALYSIS_LOG);
    let mut log = BufWriter::new(
        File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?,
    );

    info!(
        input = %settings.input.display(),
        frames = source.len(),
        preset = ?settings.preset,
        roi = ?pipeline.config().roi,
        "Processing sequence"
    );

    let mut next = Some(first);
    while let Some(frame) = next {
        let started = Instant::now();
        let (analysis, annotated) = pipeline
            .process(&frame)
            .with_context(|| format!("processing frame {}", frame.sequence))?;

        let out_path = output_path(&settings.output_dir, source.current_path(), frame.sequence);
        annotated
            .to_rgb_image()?
            .save(&out_path)
            .with_context(|| format!("writing {}", out_path.display()))?;

        serde_json::to_writer(&mut log, &analysis)?;
        writeln!(log)?;

        debug!(
            sequence = frame.sequence,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            caption = %analysis.caption(),
            "Frame written"
        );

        next = source.next_frame()?;
    }
    log.flush()?;

    let stats = *pipeline.stats();
    info!(
        frames = stats.frames,
        threshold_failures = stats.threshold_failures,
        sanity_rejections = stats.sanity_rejections,
        detection_rate = stats.detection_rate(),
        "Sequence complete"
    );
    Ok(stats)
}

/// `<output_dir>/<stem>_out.png`, falling back to the sequence number
fn output_path(output_dir: &Path, source: Option<&Path>, sequence: u32) -> PathBuf {
    let stem = source
        .and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("frame_{:06}", sequence));
    output_dir.join(format!("{}_out.png", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lane-cli-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::default();
        assert_eq!(settings.preset, Preset::Standard);
        assert_eq!(settings.pipeline.lane.tracking_window, 25);
        assert_eq!(settings.log_format, LogFormat::Plain);
        assert!(settings.calibration_path.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = temp_dir("settings");
        let path = dir.join("lane.toml");
        std::fs::write(
            &path,
            "input = \"clips/project\"\nlog_format = \"json\"\n\n[pipeline.roi]\ny = 460\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.input, PathBuf::from("clips/project"));
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.pipeline.roi.y, 460);
        // Untouched keys keep their defaults
        assert_eq!(settings.pipeline.roi.x, 175);
        assert_eq!(settings.pipeline.warp.warped_width, 640);
    }

    #[test]
    fn test_preset_selects_pipeline_defaults() {
        let dir = temp_dir("preset");
        let path = dir.join("lane.toml");
        std::fs::write(&path, "preset = \"harder_challenge\"\n\n[pipeline.lane]\nmin_roc = 100.0\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.preset, Preset::HarderChallenge);
        assert_eq!(settings.pipeline.lane.tracking_window, 5);
        assert_eq!(settings.pipeline.lane.min_roc, 100.0);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = temp_dir("env");
        let path = dir.join("lane.toml");
        std::fs::write(&path, "output_dir = \"from_file\"\n").unwrap();

        std::env::set_var("LANE__OUTPUT_DIR", "from_env");
        let settings = Settings::load(Some(&path));
        std::env::remove_var("LANE__OUTPUT_DIR");

        assert_eq!(settings.unwrap().output_dir, PathBuf::from("from_env"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/lane-finder.toml"))).is_err());
    }

    #[test]
    fn test_output_path_uses_source_stem() {
        let out = output_path(Path::new("out"), Some(Path::new("frames/test1.jpg")), 3);
        assert_eq!(out, PathBuf::from("out/test1_out.png"));
        assert_eq!(output_path(Path::new("out"), None, 3), PathBuf::from("out/frame_000003_out.png"));
    }

    #[test]
    fn test_run_writes_frames_and_log() {
        let dir = temp_dir("run");
        let input = dir.join("frames");
        std::fs::create_dir_all(&input).unwrap();
        for name in ["a.png", "b.png"] {
            RgbImage::from_pixel(1280, 720, Rgb([60, 60, 60]))
                .save(input.join(name))
                .unwrap();
        }

        let settings = Settings {
            input,
            output_dir: dir.join("out"),
            ..Default::default()
        };
        let stats = run(&settings).unwrap();

        assert_eq!(stats.frames, 2);
        assert!(dir.join("out/a_out.png").exists());
        assert!(dir.join("out/b_out.png").exists());
        let log = std::fs::read_to_string(dir.join("out").join(ANALYSIS_LOG)).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.lines().all(|l| l.contains("\"sequence\"")));
    }
}
