//! Still-image adjustment sequence.
//!
//! The standard run is watermark → grayscale → brightness → exposure
//! correction → salt-and-pepper noise → three denoised variants. Each
//! operation is a [`PipelineStep`](crate::pipeline::PipelineStep) so the
//! sequence can also be rearranged with [`Pipeline`].

pub mod denoise;
pub mod histogram;
pub mod intensity;
pub mod noise;
pub mod steps;
pub mod watermark;

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{CorrectionKind, FrameStats, TextOrigin};
use crate::pipeline::{Pipeline, PipelineData, StageImage};
use crate::text::TextRenderer;
use steps::{
    BrightnessStep, Coefficient, DenoiseStep, ExposureCorrectionStep, GrayscaleStep, SaltPepperStep,
    WatermarkStep,
};

/// Stage names, also used as output file stems
pub mod stage {
    pub const WATERMARKED: &str = "watermarked_image";
    pub const GRAYSCALE: &str = "grayscale_image";
    pub const BRIGHTNESS: &str = "brightness_modified";
    pub const CORRECTED: &str = "corrected_image";
    pub const NOISY: &str = "noisy_image";
    pub const MEAN_FILTERED: &str = "noisy_mean_image";
    pub const BILATERAL_FILTERED: &str = "bilateral_filtered";
    pub const MEDIAN_FILTERED: &str = "noisy_median_image";
    pub const NORMALIZED: &str = "normalized_image";
    pub const EQUALIZED: &str = "equalized_image";
    pub const AUTO_GAMMA: &str = "gamma_corrected";
    pub const CLAHE: &str = "clahe_image";
}

/// Stages that get a histogram chart
const HISTOGRAM_STAGES: [(&str, &str); 3] = [
    (stage::GRAYSCALE, "histogram_grayscale"),
    (stage::BRIGHTNESS, "histogram_brightness_modified"),
    (stage::CORRECTED, "histogram_corrected"),
];

const HISTOGRAM_WIDTH: u32 = 512;
const HISTOGRAM_HEIGHT: u32 = 300;

/// Load the source image; the only fatal error of the still pipeline
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("failed to read image {}", path.display()))
}

/// Everything a still run produced
#[derive(Debug, Clone)]
pub struct StillRun {
    /// Stage outputs in execution order, one per artifact name
    pub stages: Vec<StageImage>,
    /// Optional normalized / equalized / auto-gamma variants
    pub extras: Vec<StageImage>,
    pub stats: FrameStats,
    pub coefficient: f32,
    pub correction: CorrectionKind,
    /// Watermark origin, `None` when no font was available
    pub watermark: Option<TextOrigin>,
}

impl StillRun {
    pub fn stage(&self, name: &str) -> Option<&DynamicImage> {
        self.stages
            .iter()
            .chain(&self.extras)
            .find(|s| s.name == name)
            .map(|s| &s.image)
    }
}

/// The standard still-image sequence, assembled from configuration
pub struct StillImagePipeline {
    pipeline: Pipeline,
    extras: bool,
}

impl StillImagePipeline {
    /// Build the standard sequence.
    ///
    /// Each random step gets its own generator derived from `seed`, so a
    /// fixed seed reproduces the whole run.
    pub fn from_config(config: &Config, seed: u64, renderer: Option<TextRenderer>) -> Result<Self> {
        let coefficient = match config.brightness.coefficient {
            Some(c) => Coefficient::Fixed(c),
            None => Coefficient::random(config.brightness.min, config.brightness.max, seed.wrapping_add(1))?,
        };

        let pipeline = Pipeline::new()
            .add_step_boxed(Box::new(WatermarkStep::new(
                config.watermark.text.clone(),
                config.watermark.scale,
                renderer,
                seed,
            )))
            .add_step_boxed(Box::new(GrayscaleStep))
            .add_step_boxed(Box::new(BrightnessStep { coefficient }))
            .add_step_boxed(Box::new(ExposureCorrectionStep {
                dark_threshold: config.brightness.dark_threshold,
                gamma: config.brightness.gamma,
            }))
            .add_step_boxed(Box::new(SaltPepperStep::new(config.noise.amount, seed.wrapping_add(2))))
            .add_step_boxed(Box::new(DenoiseStep {
                mean_radius: config.denoise.mean_radius,
                median_radius: config.denoise.median_radius,
                bilateral_diameter: config.denoise.bilateral_diameter,
                sigma_color: config.denoise.sigma_color,
                sigma_space: config.denoise.sigma_space,
            }));

        Ok(Self {
            pipeline,
            extras: config.still.extra_outputs,
        })
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.pipeline = self.pipeline.with_verbose(verbose);
        self
    }

    /// Also write per-step debug images under `dir`
    pub fn with_debug(mut self, dir: PathBuf) -> Result<Self> {
        self.pipeline = self.pipeline.with_debug(dir)?;
        Ok(self)
    }

    pub fn with_extras(mut self, extras: bool) -> Self {
        self.extras = extras;
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.pipeline.step_names()
    }

    pub fn run(&self, input: DynamicImage) -> Result<StillRun> {
        let items = self.pipeline.run(input)?;
        let first = items
            .first()
            .ok_or_else(|| anyhow::anyhow!("still pipeline produced no output"))?;

        let stats = FrameStats::of_gray(&required_gray(first, stage::GRAYSCALE)?);
        let coefficient = first
            .get_float("coefficient")
            .ok_or_else(|| anyhow::anyhow!("brightness coefficient missing from pipeline output"))?;
        let correction = steps::recorded_correction(first)
            .ok_or_else(|| anyhow::anyhow!("exposure correction missing from pipeline output"))?;
        let watermark = match (first.get_int("watermark_x"), first.get_int("watermark_y")) {
            (Some(x), Some(y)) => Some(TextOrigin { x, y }),
            _ => None,
        };

        // Denoising split the run into branches sharing their earlier stages
        let mut stages: Vec<StageImage> = Vec::new();
        for item in &items {
            for s in &item.stages {
                if !stages.iter().any(|known| known.name == s.name) {
                    stages.push(s.clone());
                }
            }
        }

        let extras = if self.extras {
            extra_adjustments(&required_gray(first, stage::BRIGHTNESS)?)
        } else {
            Vec::new()
        };

        info!(
            coefficient,
            correction = correction.as_str(),
            stages = stages.len(),
            extras = extras.len(),
            "still pipeline finished"
        );

        Ok(StillRun {
            stages,
            extras,
            stats,
            coefficient,
            correction,
            watermark,
        })
    }
}

fn required_gray(item: &PipelineData, name: &str) -> Result<GrayImage> {
    item.stage(name)
        .map(|img| img.to_luma8())
        .ok_or_else(|| anyhow::anyhow!("stage {} missing from pipeline output", name))
}

/// Normalization, global equalization and automatic gamma of the
/// brightness-modified image
pub fn extra_adjustments(brightened: &GrayImage) -> Vec<StageImage> {
    let normalized = intensity::stretch_contrast(brightened);
    let equalized = histogram::equalize(brightened);
    let gamma = intensity::auto_gamma(&equalized);
    debug!(gamma, "automatic gamma");
    let gamma_corrected = intensity::gamma_correct(brightened, 1.0, gamma);

    [
        (stage::NORMALIZED, normalized),
        (stage::EQUALIZED, equalized),
        (stage::AUTO_GAMMA, gamma_corrected),
    ]
    .into_iter()
    .map(|(name, img)| StageImage {
        name: name.to_string(),
        image: DynamicImage::ImageLuma8(img),
    })
    .collect()
}

/// Write every stage as `<name>.jpg` (plus histogram charts as PNG) into
/// `dir`, creating it if needed. Returns the written paths in order.
pub fn save_outputs(run: &StillRun, dir: &Path, histograms: bool) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut written = Vec::new();
    for s in run.stages.iter().chain(&run.extras) {
        let path = dir.join(format!("{}.jpg", s.name));
        s.image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "wrote stage");
        written.push(path);
    }

    if histograms {
        for (stage_name, file_stem) in HISTOGRAM_STAGES {
            let Some(img) = run.stage(stage_name) else {
                continue;
            };
            let hist = histogram::histogram(&img.to_luma8());
            let chart = histogram::render_histogram(&hist, HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT);
            let path = dir.join(format!("{}.png", file_stem));
            chart
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            written.push(path);
        }
    }

    info!(count = written.len(), dir = %dir.display(), "outputs written");
    Ok(written)
}
