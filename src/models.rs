use image::{DynamicImage, GrayImage};
use std::fmt;

/// Shape and intensity summary of a frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub mean: f32,
    pub min: u8,
    pub max: u8,
}

impl FrameStats {
    /// Statistics of a single-channel image
    pub fn of_gray(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self::from_samples(width, height, 1, img.as_raw())
    }

    /// Statistics over every 8-bit sample of any image
    pub fn of_image(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(gray) => Self::of_gray(gray),
            DynamicImage::ImageRgb8(rgb) => Self::from_samples(rgb.width(), rgb.height(), 3, rgb.as_raw()),
            other => {
                let rgba = other.to_rgba8();
                Self::from_samples(rgba.width(), rgba.height(), 4, rgba.as_raw())
            }
        }
    }

    fn from_samples(width: u32, height: u32, channels: u8, samples: &[u8]) -> Self {
        if samples.is_empty() {
            return Self { width, height, channels, mean: 0.0, min: 0, max: 0 };
        }

        let (min, max, sum) = samples.iter().fold((u8::MAX, u8::MIN, 0u64), |(lo, hi, sum), &v| {
            (lo.min(v), hi.max(v), sum + v as u64)
        });

        Self {
            width,
            height,
            channels,
            mean: (sum as f64 / samples.len() as f64) as f32,
            min,
            max,
        }
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} ({} channel{}), mean={:.2} min={} max={}",
            self.width,
            self.height,
            self.channels,
            if self.channels == 1 { "" } else { "s" },
            self.mean,
            self.min,
            self.max
        )
    }
}

/// Which exposure correction ran on the brightness-modified image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionKind {
    /// Power-law correction, used for bright images
    Gamma,
    /// Linear min-max contrast stretch, used for dark images
    Stretch,
}

impl CorrectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionKind::Gamma => "gamma",
            CorrectionKind::Stretch => "stretch",
        }
    }
}

/// Top-left corner where the watermark text is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOrigin {
    pub x: i32,
    pub y: i32,
}
