use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Result;
use tracing::debug;

/// A named intermediate result kept alongside the data flowing through the pipeline
#[derive(Debug, Clone)]
pub struct StageImage {
    /// Artifact name, used as the output file stem (e.g. "grayscale_image")
    pub name: String,
    pub image: DynamicImage,
}

/// Data that flows through the pipeline
#[derive(Clone)]
pub struct PipelineData {
    /// The current image (grayscale or color)
    pub image: DynamicImage,

    /// Reference to the original input (shared efficiently via Arc)
    pub original: Arc<DynamicImage>,

    /// Named outputs recorded by the steps that ran so far, oldest first
    pub stages: Vec<StageImage>,

    /// Metadata for tracking properties (e.g., "gray_mean", "coefficient")
    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Float(f32),
    String(String),
    Int(i32),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            stages: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Replace the current image and record it as a named stage
    pub fn with_stage(mut self, name: impl Into<String>, image: DynamicImage) -> Self {
        self.stages.push(StageImage {
            name: name.into(),
            image: image.clone(),
        });
        self.image = image;
        self
    }

    /// Look up the most recent stage with the given name
    pub fn stage(&self, name: &str) -> Option<&DynamicImage> {
        self.stages
            .iter()
            .rev()
            .find(|s| s.name == name)
            .map(|s| &s.image)
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get metadata as float
    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Get metadata as int
    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Get metadata as string
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.metadata.get(key) {
            Some(MetadataValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub verbose: bool,
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in verbose output)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.context.verbose = verbose;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });

        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    /// Names of the configured steps, in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step sequentially on an input image
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        self.run_partial(input, self.steps.len())
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, input: DynamicImage, num_steps: usize) -> Result<Vec<PipelineData>> {
        if let Some(debug_config) = self.context.debug.as_ref() {
            let input_dir = debug_config.output_dir.join("00_input");
            std::fs::create_dir_all(&input_dir)?;
            input.save(input_dir.join("01.png"))
                .map_err(|e| anyhow::anyhow!("Failed to save debug input: {}", e))?;
            if self.context.verbose {
                println!("  Debug: saved 00_input/01.png");
            }
        }

        let mut data = vec![PipelineData::from_image(input)];

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            if self.context.verbose {
                println!("Running step {}: {} (processing {} items)", step_idx + 1, step.name(), data.len());
            }
            debug!(step = step.name(), items = data.len(), "running pipeline step");

            data = step.process(data, &self.context)?;

            if let Some(debug_config) = self.context.debug.as_ref() {
                save_debug_outputs(&debug_config.output_dir, step_idx, step.name(), &data)?;
                if self.context.verbose {
                    println!("  Debug: saved {} images for {}", data.len(), step.name());
                }
            }

            if self.context.verbose {
                println!("  → {} items", data.len());
            }
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory name for a step's debug outputs, e.g. "02_grayscale_conversion"
pub fn debug_dir_name(step_idx: usize, step_name: &str) -> String {
    format!("{:02}_{}", step_idx + 1, step_name.to_lowercase().replace(' ', "_"))
}

fn save_debug_outputs(root: &Path, step_idx: usize, step_name: &str, data: &[PipelineData]) -> Result<()> {
    let step_dir = root.join(debug_dir_name(step_idx, step_name));
    std::fs::create_dir_all(&step_dir)?;

    for (idx, item) in data.iter().enumerate() {
        let output_path = step_dir.join(format!("{:02}.png", idx + 1));
        item.image.save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    struct InvertStep;

    impl PipelineStep for InvertStep {
        fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
            Ok(data
                .into_iter()
                .map(|item| {
                    let mut gray = item.image.to_luma8();
                    image::imageops::invert(&mut gray);
                    item.with_stage("inverted", DynamicImage::ImageLuma8(gray))
                })
                .collect())
        }

        fn name(&self) -> &str {
            "Invert"
        }
    }

    struct DuplicateStep;

    impl PipelineStep for DuplicateStep {
        fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
            Ok(data.into_iter().flat_map(|item| [item.clone(), item]).collect())
        }

        fn name(&self) -> &str {
            "Duplicate Items"
        }
    }

    fn gray(value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([value])))
    }

    #[test]
    fn stages_are_recorded_in_order() {
        let pipeline = Pipeline::new()
            .add_step_boxed(Box::new(InvertStep))
            .add_step_boxed(Box::new(InvertStep));
        let out = pipeline.run(gray(10)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].stages.len(), 2);
        assert_eq!(out[0].image.to_luma8().get_pixel(0, 0)[0], 10);
        assert_eq!(out[0].stages[0].image.to_luma8().get_pixel(0, 0)[0], 245);
        assert_eq!(out[0].original.to_luma8().get_pixel(0, 0)[0], 10);
    }

    #[test]
    fn run_partial_stops_early() {
        let pipeline = Pipeline::new()
            .add_step_boxed(Box::new(DuplicateStep))
            .add_step_boxed(Box::new(DuplicateStep));
        assert_eq!(pipeline.run(gray(0)).unwrap().len(), 4);
        assert_eq!(pipeline.run_partial(gray(0), 1).unwrap().len(), 2);
    }

    #[test]
    fn debug_mode_writes_step_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let debug_root = dir.path().join("debug");
        let pipeline = Pipeline::new()
            .with_debug(debug_root.clone())
            .unwrap()
            .add_step_boxed(Box::new(InvertStep))
            .add_step_boxed(Box::new(DuplicateStep));
        pipeline.run(gray(3)).unwrap();

        assert!(debug_root.join("00_input/01.png").exists());
        assert!(debug_root.join("01_invert/01.png").exists());
        assert!(debug_root.join("02_duplicate_items/02.png").exists());
    }

    #[test]
    fn debug_dir_must_be_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("leftover.txt"), b"x").unwrap();
        assert!(Pipeline::new().with_debug(dir.path().to_path_buf()).is_err());
    }

    #[test]
    fn metadata_accessors_check_types() {
        let data = PipelineData::from_image(gray(1))
            .with_metadata("mean", MetadataValue::Float(1.5))
            .with_metadata("branch", MetadataValue::String("gamma".into()));
        assert_eq!(data.get_float("mean"), Some(1.5));
        assert_eq!(data.get_string("branch"), Some("gamma"));
        assert_eq!(data.get_int("mean"), None);
        assert_eq!(data.get_string("missing"), None);
        assert_eq!(data.get_int("branch"), None);
    }
}
