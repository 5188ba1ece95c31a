use crate::pipeline::{PipelineData, PipelineStep, PipelineContext, MetadataValue};
use crate::adjust::{denoise, histogram, intensity, noise, stage, watermark};
use crate::models::{CorrectionKind, FrameStats};
use crate::text::TextRenderer;
use anyhow::Result;
use image::{DynamicImage, GrayImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

fn lock_rng(rng: &Mutex<StdRng>) -> Result<MutexGuard<'_, StdRng>> {
    rng.lock().map_err(|_| anyhow::anyhow!("random number generator lock poisoned"))
}

/// Draw text at a random in-bounds position
pub struct WatermarkStep {
    pub text: String,
    pub scale: f32,
    renderer: Option<TextRenderer>,
    rng: Mutex<StdRng>,
}

impl WatermarkStep {
    pub fn new(text: impl Into<String>, scale: f32, renderer: Option<TextRenderer>, seed: u64) -> Self {
        Self {
            text: text.into(),
            scale,
            renderer,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl PipelineStep for WatermarkStep {
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let Some(renderer) = &self.renderer else {
            warn!("no font available; watermark skipped");
            return Ok(data
                .into_iter()
                .map(|item| {
                    let rgb = DynamicImage::ImageRgb8(item.image.to_rgb8());
                    item.with_stage(stage::WATERMARKED, rgb)
                })
                .collect());
        };

        let mut rng = lock_rng(&self.rng)?;
        let mut result = Vec::new();
        for item in data {
            let (marked, origin) = watermark::apply_watermark(&item.image, renderer, &self.text, self.scale, &mut *rng);
            if context.verbose {
                println!("  Watermark placed at ({}, {})", origin.x, origin.y);
            }
            result.push(
                item.with_stage(stage::WATERMARKED, DynamicImage::ImageRgb8(marked))
                    .with_metadata("watermark_x", MetadataValue::Int(origin.x))
                    .with_metadata("watermark_y", MetadataValue::Int(origin.y)),
            );
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Watermark"
    }
}

/// Convert image to grayscale and record its statistics
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let gray = intensity::to_grayscale(&item.image);
            let stats = FrameStats::of_gray(&gray);
            info!(
                width = stats.width,
                height = stats.height,
                channels = stats.channels,
                mean = stats.mean,
                min = stats.min,
                max = stats.max,
                "grayscale statistics"
            );
            result.push(
                item.with_stage(stage::GRAYSCALE, DynamicImage::ImageLuma8(gray))
                    .with_metadata("gray_width", MetadataValue::Int(stats.width as i32))
                    .with_metadata("gray_height", MetadataValue::Int(stats.height as i32))
                    .with_metadata("gray_channels", MetadataValue::Int(stats.channels as i32))
                    .with_metadata("gray_mean", MetadataValue::Float(stats.mean))
                    .with_metadata("gray_min", MetadataValue::Int(stats.min as i32))
                    .with_metadata("gray_max", MetadataValue::Int(stats.max as i32)),
            );
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Where the brightness coefficient comes from
pub enum Coefficient {
    Fixed(f32),
    Random { min: f32, max: f32, rng: Mutex<StdRng> },
}

impl Coefficient {
    /// Uniform draws from `[min, max]`; the range must be finite and non-empty
    pub fn random(min: f32, max: f32, seed: u64) -> Result<Self> {
        anyhow::ensure!(
            min.is_finite() && max.is_finite() && min <= max,
            "invalid brightness coefficient range [{}, {}]",
            min,
            max
        );
        Ok(Coefficient::Random {
            min,
            max,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    fn resolve(&self) -> Result<f32> {
        match self {
            Coefficient::Fixed(c) => Ok(*c),
            Coefficient::Random { min, max, rng } => {
                let mut rng = lock_rng(rng)?;
                Ok(intensity::draw_coefficient(&mut *rng, *min, *max))
            }
        }
    }
}

/// Multiply every sample by a coefficient, clipped to [0, 255]
pub struct BrightnessStep {
    pub coefficient: Coefficient,
}

impl PipelineStep for BrightnessStep {
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let c = self.coefficient.resolve()?;
            if context.verbose {
                println!("  Brightness coefficient (c): {:.2}", c);
            }
            info!(coefficient = c, "brightness modification");
            let gray = item.image.to_luma8();
            let bright = intensity::scale_brightness(&gray, c);
            result.push(
                item.with_stage(stage::BRIGHTNESS, DynamicImage::ImageLuma8(bright))
                    .with_metadata("coefficient", MetadataValue::Float(c)),
            );
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Brightness Modification"
    }
}

/// Gamma correction for bright images, contrast stretch for dark ones
pub struct ExposureCorrectionStep {
    pub dark_threshold: f32,
    pub gamma: f32,
}

impl PipelineStep for ExposureCorrectionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let brightened = item.image.to_luma8();
            // Without an earlier grayscale stage the current image stands in for it
            let gray = item
                .stage(stage::GRAYSCALE)
                .map(|g| g.to_luma8())
                .unwrap_or_else(|| brightened.clone());
            let c = item.get_float("coefficient").unwrap_or(1.0);

            let (corrected, kind) =
                intensity::correct_exposure(&gray, &brightened, c, self.dark_threshold, self.gamma);
            info!(correction = kind.as_str(), "exposure correction");

            result.push(
                item.with_stage(stage::CORRECTED, DynamicImage::ImageLuma8(corrected))
                    .with_metadata("correction", MetadataValue::String(kind.as_str().into())),
            );
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Exposure Correction"
    }
}

/// Replace a fraction of pixels with pure white or pure black
pub struct SaltPepperStep {
    pub amount: f64,
    rng: Mutex<StdRng>,
}

impl SaltPepperStep {
    pub fn new(amount: f64, seed: u64) -> Self {
        Self {
            amount,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl PipelineStep for SaltPepperStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut rng = lock_rng(&self.rng)?;
        let mut result = Vec::new();
        for item in data {
            let gray = item.image.to_luma8();
            let noisy = noise::salt_and_pepper(&gray, self.amount, &mut *rng);
            result.push(item.with_stage(stage::NOISY, DynamicImage::ImageLuma8(noisy)));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Salt And Pepper Noise"
    }
}

/// Mean, bilateral (on the mean result) and median denoising.
///
/// Splits every item into three, one per filter.
pub struct DenoiseStep {
    pub mean_radius: u32,
    pub median_radius: u32,
    pub bilateral_diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
}

impl PipelineStep for DenoiseStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let noisy = item.image.to_luma8();

            let mean = denoise::mean_filter(&noisy, self.mean_radius);
            let bilateral = denoise::bilateral_filter(&mean, self.bilateral_diameter, self.sigma_color, self.sigma_space);
            let median = denoise::median_gray(&noisy, self.median_radius);

            let outputs: [(&str, &str, GrayImage); 3] = [
                (stage::MEAN_FILTERED, "mean", mean),
                (stage::BILATERAL_FILTERED, "bilateral", bilateral),
                (stage::MEDIAN_FILTERED, "median", median),
            ];
            for (stage_name, filter, img) in outputs {
                result.push(
                    item.clone()
                        .with_stage(stage_name, DynamicImage::ImageLuma8(img))
                        .with_metadata("denoise", MetadataValue::String(filter.into())),
                );
            }
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Denoise"
    }
}

/// Global histogram equalization
pub struct EqualizeStep;

impl PipelineStep for EqualizeStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let eq = histogram::equalize(&item.image.to_luma8());
                item.with_stage(stage::EQUALIZED, DynamicImage::ImageLuma8(eq))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Histogram Equalization"
    }
}

/// Contrast limited adaptive histogram equalization
pub struct ClaheStep {
    pub clip_limit: f32,
    pub grid: u32,
}

impl PipelineStep for ClaheStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let eq = histogram::clahe(&item.image.to_luma8(), self.clip_limit, self.grid);
                item.with_stage(stage::CLAHE, DynamicImage::ImageLuma8(eq))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "CLAHE"
    }
}

/// Parse the correction recorded by [`ExposureCorrectionStep`]
pub fn recorded_correction(item: &PipelineData) -> Option<CorrectionKind> {
    match item.get_string("correction")? {
        "gamma" => Some(CorrectionKind::Gamma),
        "stretch" => Some(CorrectionKind::Stretch),
        _ => None,
    }
}
