use image::{DynamicImage, GrayImage, Luma, RgbImage};
use rand::Rng;

use crate::models::{CorrectionKind, FrameStats};

/// Per-intensity lookup table for point operations
pub type Lut = [u8; 256];

/// Convert image to grayscale with BT.601 weights
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => rgb_to_gray(&other.to_rgb8()),
    }
}

/// `0.299 R + 0.587 G + 0.114 B`, rounded
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
        Luma([((weighted + 500) / 1000) as u8])
    })
}

/// Apply a lookup table to every sample
pub fn apply_lut(img: &GrayImage, lut: &Lut) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
    }
    out
}

fn build_lut(f: impl Fn(f32) -> f32) -> Lut {
    let mut lut = [0u8; 256];
    for (v, entry) in lut.iter_mut().enumerate() {
        *entry = f(v as f32).clamp(0.0, 255.0).round() as u8;
    }
    lut
}

/// Draw a brightness coefficient from `[min, max]`, rounded to two decimals
pub fn draw_coefficient<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    let c: f32 = rng.gen_range(min..=max);
    ((c * 100.0).round() / 100.0).clamp(min, max)
}

/// Multiply every sample by `c`, clipped to [0, 255]
pub fn scale_brightness(img: &GrayImage, c: f32) -> GrayImage {
    apply_lut(img, &build_lut(|v| v * c))
}

/// Linear min-max contrast stretch to the full [0, 255] range.
///
/// A constant image has no range to stretch and is returned unchanged.
pub fn stretch_contrast(img: &GrayImage) -> GrayImage {
    let stats = FrameStats::of_gray(img);
    if stats.max <= stats.min {
        return img.clone();
    }
    let lo = stats.min as f32;
    let factor = 255.0 / (stats.max - stats.min) as f32;
    apply_lut(img, &build_lut(|v| (v - lo) * factor))
}

/// Power-law correction scaled by `c`: `c * (v / 255)^gamma * 255`
pub fn gamma_correct(img: &GrayImage, c: f32, gamma: f32) -> GrayImage {
    apply_lut(img, &build_lut(|v| c * (v / 255.0).powf(gamma) * 255.0))
}

/// Pick the exposure correction from the grayscale mean.
///
/// Bright images (mean above `dark_threshold`) get gamma correction of the
/// grayscale image combined with the brightness coefficient; everything else
/// gets a contrast stretch of the brightness-modified image.
pub fn correct_exposure(
    gray: &GrayImage,
    brightened: &GrayImage,
    c: f32,
    dark_threshold: f32,
    gamma: f32,
) -> (GrayImage, CorrectionKind) {
    let mean = FrameStats::of_gray(gray).mean;
    if mean > dark_threshold {
        (gamma_correct(gray, c, gamma), CorrectionKind::Gamma)
    } else {
        (stretch_contrast(brightened), CorrectionKind::Stretch)
    }
}

/// Gamma that maps the mean of `reference` onto mid-gray.
///
/// Degenerate means (pure black or pure white) yield 1.0.
pub fn auto_gamma(reference: &GrayImage) -> f32 {
    let mean = FrameStats::of_gray(reference).mean;
    if mean <= 0.0 || mean >= 255.0 {
        return 1.0;
    }
    0.5f32.log10() / (mean / 255.0).log10()
}

/// Reduce to `levels` evenly spaced intensities: `(v / step) * step` with `step = 256 / levels`
pub fn quantize(img: &GrayImage, levels: u32) -> GrayImage {
    let step = 256 / levels.clamp(1, 256);
    let mut lut = [0u8; 256];
    for (v, entry) in lut.iter_mut().enumerate() {
        *entry = ((v as u32 / step) * step).min(255) as u8;
    }
    apply_lut(img, &lut)
}
