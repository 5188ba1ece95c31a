use image::RgbImage;
use std::fmt;

use crate::config::{Equalizer, LiveConfig};
use crate::live::filters;

/// Per-session filter parameters
#[derive(Debug, Clone, Copy)]
pub struct FilterOptions {
    pub quantization_levels: u32,
    pub equalizer: Equalizer,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            quantization_levels: 8,
            equalizer: Equalizer::Global,
        }
    }
}

impl From<&LiveConfig> for FilterOptions {
    fn from(config: &LiveConfig) -> Self {
        Self {
            quantization_levels: config.quantization_levels,
            equalizer: config.equalizer,
        }
    }
}

/// The live session's current transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    Original,
    EdgeDetection,
    Quantization,
    HistogramEqualization,
    SoftBlur,
    Cartoon,
}

impl FilterMode {
    pub const ALL: [FilterMode; 6] = [
        FilterMode::Original,
        FilterMode::EdgeDetection,
        FilterMode::Quantization,
        FilterMode::HistogramEqualization,
        FilterMode::SoftBlur,
        FilterMode::Cartoon,
    ];

    /// Mode for an integer index; anything outside 1-5 is `Original`
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => FilterMode::EdgeDetection,
            2 => FilterMode::Quantization,
            3 => FilterMode::HistogramEqualization,
            4 => FilterMode::SoftBlur,
            5 => FilterMode::Cartoon,
            _ => FilterMode::Original,
        }
    }

    /// Mode selected by a digit key, `None` for any other key
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            '0'..='5' => key.to_digit(10).map(|d| Self::from_index(d as i64)),
            _ => None,
        }
    }

    pub fn index(&self) -> u8 {
        match self {
            FilterMode::Original => 0,
            FilterMode::EdgeDetection => 1,
            FilterMode::Quantization => 2,
            FilterMode::HistogramEqualization => 3,
            FilterMode::SoftBlur => 4,
            FilterMode::Cartoon => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterMode::Original => "Original",
            FilterMode::EdgeDetection => "Edge Detection",
            FilterMode::Quantization => "Grayscale Quantization",
            FilterMode::HistogramEqualization => "Histogram Equalization",
            FilterMode::SoftBlur => "Soft Blur",
            FilterMode::Cartoon => "Cartoon Filter",
        }
    }

    pub fn apply(&self, frame: &RgbImage, options: &FilterOptions) -> RgbImage {
        match self {
            FilterMode::Original => frame.clone(),
            FilterMode::EdgeDetection => filters::edge_detection(frame),
            FilterMode::Quantization => filters::grayscale_quantization(frame, options.quantization_levels),
            FilterMode::HistogramEqualization => match options.equalizer {
                Equalizer::Global => filters::histogram_equalization(frame),
                Equalizer::Clahe => filters::clahe_equalization(frame),
            },
            FilterMode::SoftBlur => filters::soft_blur(frame),
            FilterMode::Cartoon => filters::cartoon(frame),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample_frame() -> RgbImage {
        RgbImage::from_fn(24, 24, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 128]))
    }

    #[test]
    fn index_round_trips_for_known_modes() {
        for mode in FilterMode::ALL {
            assert_eq!(FilterMode::from_index(mode.index() as i64), mode);
        }
    }

    #[test]
    fn unknown_indices_fall_back_to_original() {
        for index in [-1, 6, 42, i64::MAX] {
            let mode = FilterMode::from_index(index);
            assert_eq!(mode, FilterMode::Original);
            assert_eq!(mode.apply(&sample_frame(), &FilterOptions::default()), sample_frame());
        }
    }

    #[test]
    fn modes_route_to_their_transform() {
        let frame = sample_frame();
        let options = FilterOptions::default();
        assert_eq!(FilterMode::EdgeDetection.apply(&frame, &options), filters::edge_detection(&frame));
        assert_eq!(FilterMode::Quantization.apply(&frame, &options), filters::grayscale_quantization(&frame, 8));
        assert_eq!(
            FilterMode::HistogramEqualization.apply(&frame, &options),
            filters::histogram_equalization(&frame)
        );
        assert_eq!(FilterMode::SoftBlur.apply(&frame, &options), filters::soft_blur(&frame));
        assert_eq!(FilterMode::Cartoon.apply(&frame, &options), filters::cartoon(&frame));
    }

    #[test]
    fn clahe_replaces_global_equalizer_when_configured() {
        let frame = sample_frame();
        let options = FilterOptions { equalizer: Equalizer::Clahe, ..FilterOptions::default() };
        assert_eq!(
            FilterMode::HistogramEqualization.apply(&frame, &options),
            filters::clahe_equalization(&frame)
        );
    }

    #[test]
    fn digit_keys_select_modes() {
        assert_eq!(FilterMode::from_key('3'), Some(FilterMode::HistogramEqualization));
        assert_eq!(FilterMode::from_key('0'), Some(FilterMode::Original));
        assert_eq!(FilterMode::from_key('7'), None);
        assert_eq!(FilterMode::from_key('x'), None);
    }
}
