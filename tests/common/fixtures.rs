use framelab::config::Config;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
use std::path::Path;
use tempfile::NamedTempFile;

/// Creates a uniform 100x100 image of the given gray level and returns the
/// temp file. The file will be automatically cleaned up when dropped.
pub fn create_gray_image(value: u8) -> NamedTempFile {
    let img = ImageBuffer::from_fn(100, 100, |_, _| Rgb([value, value, value]));
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// A 64x48 colour gradient with some texture
pub fn gradient_frame() -> RgbImage {
    RgbImage::from_fn(64, 48, |x, y| {
        Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
    })
}

/// Writes `count` numbered PNG frames into `dir`, each slightly brighter
pub fn write_frame_sequence(dir: &Path, count: u32) {
    for i in 0..count {
        let frame = RgbImage::from_fn(32, 24, |x, y| {
            Rgb([(x * 8) as u8, (y * 10) as u8, (i * 20).min(255) as u8])
        });
        DynamicImage::ImageRgb8(frame)
            .save(dir.join(format!("frame_{:03}.png", i)))
            .expect("Failed to save frame");
    }
}

/// Default configuration with a fixed brightness coefficient and seed
pub fn fixed_config(coefficient: f32, seed: u64) -> Config {
    let mut config = Config::default();
    config.brightness.coefficient = Some(coefficient);
    config.still.seed = Some(seed);
    config
}
