use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::median_filter;

use crate::adjust::{denoise, histogram, intensity};

const EDGE_BLUR_KERNEL: u32 = 5;
const CANNY_LOW: f32 = 30.0;
const CANNY_HIGH: f32 = 100.0;

const GLOW_KERNEL: u32 = 15;
const GLOW_ORIGINAL_WEIGHT: f32 = 0.3;
const GLOW_BLUR_WEIGHT: f32 = 0.7;

const CARTOON_MEDIAN_RADIUS: u32 = 2;
const CARTOON_BLOCK_SIZE: u32 = 9;
const CARTOON_THRESHOLD_C: i32 = 9;
const CARTOON_BILATERAL_DIAMETER: u32 = 9;
const CARTOON_BILATERAL_SIGMA: f32 = 300.0;

pub const CLAHE_CLIP_LIMIT: f32 = 2.0;
pub const CLAHE_GRID: u32 = 8;

fn gray_of(frame: &RgbImage) -> GrayImage {
    intensity::rgb_to_gray(frame)
}

fn gray_to_rgb(gray: GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(gray).to_rgb8()
}

/// Canny edges of the blurred grayscale frame, as white on black
pub fn edge_detection(frame: &RgbImage) -> RgbImage {
    let blurred = denoise::gaussian_gray(&gray_of(frame), EDGE_BLUR_KERNEL);
    gray_to_rgb(canny(&blurred, CANNY_LOW, CANNY_HIGH))
}

/// Posterize the grayscale frame to `levels` intensities
pub fn grayscale_quantization(frame: &RgbImage, levels: u32) -> RgbImage {
    gray_to_rgb(intensity::quantize(&gray_of(frame), levels))
}

/// Global histogram equalization of the grayscale frame
pub fn histogram_equalization(frame: &RgbImage) -> RgbImage {
    gray_to_rgb(histogram::equalize(&gray_of(frame)))
}

/// CLAHE of the grayscale frame (clip limit 2.0, 8x8 tiles)
pub fn clahe_equalization(frame: &RgbImage) -> RgbImage {
    gray_to_rgb(histogram::clahe(&gray_of(frame), CLAHE_CLIP_LIMIT, CLAHE_GRID))
}

/// Blend the frame with a heavy Gaussian blur of itself
pub fn soft_blur(frame: &RgbImage) -> RgbImage {
    let blurred = denoise::gaussian_rgb(frame, GLOW_KERNEL);
    let mut out = RgbImage::new(frame.width(), frame.height());
    for ((dst, src), blur) in out.pixels_mut().zip(frame.pixels()).zip(blurred.pixels()) {
        for c in 0..3 {
            let v = GLOW_ORIGINAL_WEIGHT * src[c] as f32 + GLOW_BLUR_WEIGHT * blur[c] as f32;
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Flat colour regions with dark outlines.
///
/// Outlines come from an adaptive threshold of the median-smoothed grayscale
/// frame; colours from a strong bilateral filter. The two are combined with a
/// per-channel AND.
pub fn cartoon(frame: &RgbImage) -> RgbImage {
    let smoothed_gray = median_filter(&gray_of(frame), CARTOON_MEDIAN_RADIUS, CARTOON_MEDIAN_RADIUS);
    let mask = denoise::adaptive_threshold_mean(&smoothed_gray, CARTOON_BLOCK_SIZE, CARTOON_THRESHOLD_C);
    let color = denoise::bilateral_filter(
        frame,
        CARTOON_BILATERAL_DIAMETER,
        CARTOON_BILATERAL_SIGMA,
        CARTOON_BILATERAL_SIGMA,
    );

    RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        let m = mask.get_pixel(x, y)[0];
        let c = color.get_pixel(x, y);
        Rgb([c[0] & m, c[1] & m, c[2] & m])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn split_frame() -> RgbImage {
        RgbImage::from_fn(40, 40, |x, _| if x < 20 { Rgb([20, 20, 20]) } else { Rgb([230, 230, 230]) })
    }

    fn is_gray(frame: &RgbImage) -> bool {
        frame.pixels().all(|p| p[0] == p[1] && p[1] == p[2])
    }

    #[test]
    fn edges_found_on_step_only() {
        let edges = edge_detection(&split_frame());
        assert!(is_gray(&edges));
        assert!((17..23).any(|x| edges.get_pixel(x, 20)[0] == 255));
        assert_eq!(edges.get_pixel(5, 20)[0], 0);
        assert_eq!(edges.get_pixel(35, 20)[0], 0);
    }

    #[test]
    fn quantization_of_color_ramp() {
        let frame = RgbImage::from_fn(256, 1, |x, _| Rgb([x as u8, x as u8, x as u8]));
        let out = grayscale_quantization(&frame, 8);
        let distinct: BTreeSet<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(distinct.len(), 8);
        assert!(distinct.iter().all(|v| v % 32 == 0));
    }

    #[test]
    fn equalizers_return_gray_frames() {
        let frame = RgbImage::from_fn(32, 32, |x, y| Rgb([100 + (x % 10) as u8, 100 + (y % 10) as u8, 110]));
        assert!(is_gray(&histogram_equalization(&frame)));
        assert!(is_gray(&clahe_equalization(&frame)));
    }

    #[test]
    fn soft_blur_keeps_flat_frame() {
        let frame = RgbImage::from_pixel(30, 30, Rgb([90, 150, 210]));
        let out = soft_blur(&frame);
        for p in out.pixels() {
            for (c, expected) in [90i32, 150, 210].into_iter().enumerate() {
                assert!((p[c] as i32 - expected).abs() <= 1);
            }
        }
    }

    #[test]
    fn cartoon_only_darkens() {
        let frame = split_frame();
        let out = cartoon(&frame);
        assert_eq!(out.dimensions(), frame.dimensions());
        // flat regions keep their colour
        assert_eq!(*out.get_pixel(5, 5), Rgb([20, 20, 20]));
        assert_eq!(*out.get_pixel(35, 5), Rgb([230, 230, 230]));
        // the dark side of the step becomes an outline
        assert!((15..20).any(|x| *out.get_pixel(x, 20) == Rgb([0, 0, 0])));
    }
}
