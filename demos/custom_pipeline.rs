use framelab::Pipeline;
use framelab::adjust::stage;
use framelab::adjust::steps::*;
use framelab::models::FrameStats;
use std::env;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image_path>", args[0]);
        std::process::exit(1);
    }

    let img = framelab::adjust::load_image(args[1].as_ref())?;
    println!("Loaded image: {}x{}", img.width(), img.height());

    // Example 1: Brightness and exposure only, fixed coefficient
    println!("\n=== Exposure Pipeline ===");
    let exposure = Pipeline::new()
        .with_verbose(true)
        .add_step_boxed(Box::new(GrayscaleStep))
        .add_step_boxed(Box::new(BrightnessStep { coefficient: Coefficient::Fixed(1.4) }))
        .add_step_boxed(Box::new(ExposureCorrectionStep {
            dark_threshold: 120.0,
            gamma: 1.5,
        }));

    let results = exposure.run(img.clone())?;
    for item in &results {
        let correction = item.get_string("correction").unwrap_or("N/A");
        println!("  correction: {}  result: {}", correction, FrameStats::of_image(&item.image));
    }

    // Example 2: Heavier noise, then compare the three denoisers
    println!("\n\n=== Denoise Comparison (10% noise) ===");
    let denoise = Pipeline::new()
        .add_step_boxed(Box::new(GrayscaleStep))
        .add_step_boxed(Box::new(SaltPepperStep::new(0.1, 42)))
        .add_step_boxed(Box::new(DenoiseStep {
            mean_radius: 1,
            median_radius: 2,  // 5x5 median
            bilateral_diameter: 9,
            sigma_color: 75.0,
            sigma_space: 75.0,
        }));

    for item in denoise.run(img.clone())? {
        let filter = item.get_string("denoise").unwrap_or("N/A");
        println!("  {:>9}: {}", filter, FrameStats::of_image(&item.image));
    }

    // Example 3: Partial pipeline, stops before global equalization
    println!("\n\n=== Partial Pipeline With CLAHE ===");
    let partial = Pipeline::new()
        .add_step_boxed(Box::new(GrayscaleStep))
        .add_step_boxed(Box::new(ClaheStep { clip_limit: 2.0, grid: 8 }))
        .add_step_boxed(Box::new(EqualizeStep));

    let results = partial.run_partial(img, 2)?;
    if let Some(clahe) = results.first().and_then(|item| item.stage(stage::CLAHE)) {
        println!("  CLAHE: {}", FrameStats::of_image(clahe));
    }

    Ok(())
}
