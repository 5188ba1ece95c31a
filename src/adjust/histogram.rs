//! Histograms, global equalization and CLAHE.
//!
//! CLAHE splits the image into a grid of tiles, builds a clipped histogram
//! per tile, and bilinearly interpolates between the four nearest tile
//! mappings so tile borders do not show.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::equalize_histogram;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use super::intensity::Lut;

/// 256-bin intensity histogram
pub fn histogram(img: &GrayImage) -> [u32; 256] {
    let mut bins = [0u32; 256];
    for pixel in img.pixels() {
        bins[pixel[0] as usize] += 1;
    }
    bins
}

/// Global histogram equalization
pub fn equalize(img: &GrayImage) -> GrayImage {
    equalize_histogram(img)
}

/// Contrast Limited Adaptive Histogram Equalization.
///
/// `grid` is the number of tiles along each axis and `clip_limit` is a
/// multiple of the uniform bin height (total / 256).
pub fn clahe(img: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || grid == 0 {
        return img.clone();
    }

    // Every tile must cover at least one pixel
    let tile_w = w.div_ceil(grid.min(w));
    let tile_h = h.div_ceil(grid.min(h));
    let cols = w.div_ceil(tile_w);
    let rows = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((cols * rows) as usize);
    for ty in 0..rows {
        for tx in 0..cols {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let count = (x1.saturating_sub(x0)) * (y1.saturating_sub(y0));
            if clip_limit > 0.0 {
                clip_histogram(&mut hist, count, clip_limit);
            }
            luts.push(cdf_lut(&hist, count));
        }
    }

    let tile = |tx: u32, ty: u32| (ty * cols + tx) as usize;

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        // Position relative to tile centers
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let ty0 = (fy.floor().max(0.0) as u32).min(rows - 1);
        let ty1 = (ty0 + 1).min(rows - 1);
        let ay = (fy - ty0 as f32).clamp(0.0, 1.0);

        for x in 0..w {
            let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let tx0 = (fx.floor().max(0.0) as u32).min(cols - 1);
            let tx1 = (tx0 + 1).min(cols - 1);
            let ax = (fx - tx0 as f32).clamp(0.0, 1.0);

            let v = img.get_pixel(x, y)[0] as usize;
            let top = luts[tile(tx0, ty0)][v] as f32 * (1.0 - ax) + luts[tile(tx1, ty0)][v] as f32 * ax;
            let bottom = luts[tile(tx0, ty1)][v] as f32 * (1.0 - ax) + luts[tile(tx1, ty1)][v] as f32 * ax;
            let value = top * (1.0 - ay) + bottom * ay;

            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Clip bins above `clip_multiplier * total / 256` and spread the excess evenly
fn clip_histogram(hist: &mut [u32; 256], total: u32, clip_multiplier: f32) {
    let clip = ((total as f32 / 256.0) * clip_multiplier).ceil().max(1.0) as u32;

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let per_bin = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += per_bin;
        if i < remainder {
            *bin += 1;
        }
    }
}

/// Equalization mapping from a histogram's cumulative distribution
fn cdf_lut(hist: &[u32; 256], total: u32) -> Lut {
    let mut lut = [0u8; 256];
    if total == 0 {
        return lut;
    }
    let mut cumulative = 0u64;
    for (v, entry) in lut.iter_mut().enumerate() {
        cumulative += hist[v] as u64;
        *entry = ((cumulative as f32 / total as f32) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Render a histogram as a bar chart, bars scaled to the tallest bin
pub fn render_histogram(hist: &[u32; 256], width: u32, height: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let peak = hist.iter().copied().max().unwrap_or(0);
    if peak == 0 || width == 0 || height == 0 {
        return canvas;
    }

    let bar_color = Rgb([31, 119, 180]);
    for (bin, &count) in hist.iter().enumerate() {
        let x0 = bin as u32 * width / 256;
        let x1 = ((bin as u32 + 1) * width / 256).max(x0 + 1).min(width);
        let bar_h = ((count as u64 * height as u64) / peak as u64) as u32;
        if bar_h == 0 || x1 <= x0 {
            continue;
        }
        let rect = Rect::at(x0 as i32, (height - bar_h) as i32).of_size(x1 - x0, bar_h);
        draw_filled_rect_mut(&mut canvas, rect, bar_color);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(img: &GrayImage) -> u8 {
        let lo = img.pixels().map(|p| p[0]).min().unwrap_or(0);
        let hi = img.pixels().map(|p| p[0]).max().unwrap_or(0);
        hi - lo
    }

    #[test]
    fn histogram_counts_every_pixel() {
        let img = GrayImage::from_fn(16, 16, |x, y| Luma([((x + y * 16) % 256) as u8]));
        let hist = histogram(&img);
        assert_eq!(hist.iter().sum::<u32>(), 256);
        assert!(hist.iter().all(|&c| c == 1));
    }

    #[test]
    fn equalize_spreads_low_contrast() {
        let img = GrayImage::from_fn(110, 1, |x, _| Luma([100 + (x % 11) as u8]));
        assert!(range(&equalize(&img)) > 100);
    }

    #[test]
    fn equalize_is_monotonic() {
        let img = GrayImage::from_raw(5, 1, vec![10, 50, 100, 150, 200]).unwrap();
        let out = equalize(&img);
        for x in 1..5 {
            assert!(out.get_pixel(x, 0)[0] >= out.get_pixel(x - 1, 0)[0]);
        }
    }

    #[test]
    fn clahe_keeps_dimensions_on_odd_sizes() {
        let img = GrayImage::from_pixel(100, 75, Luma([128]));
        let out = clahe(&img, 2.0, 8);
        assert_eq!(out.dimensions(), (100, 75));
    }

    #[test]
    fn clahe_expands_bimodal_image() {
        let img = GrayImage::from_fn(64, 32, |x, y| {
            let base = if x < 32 { 30 } else { 200 };
            Luma([base + ((x + y * 7) % 20) as u8])
        });
        assert!(range(&clahe(&img, 2.0, 8)) > 50);
    }

    #[test]
    fn clahe_handles_tiny_images() {
        let img = GrayImage::from_pixel(3, 2, Luma([7]));
        assert_eq!(clahe(&img, 2.0, 8).dimensions(), (3, 2));
    }

    #[test]
    fn clip_preserves_total() {
        let mut hist = [0u32; 256];
        hist[10] = 1000;
        hist[20] = 24;
        clip_histogram(&mut hist, 1024, 2.0);
        assert_eq!(hist.iter().sum::<u32>(), 1024);
        assert!(hist[10] < 1000);
    }

    #[test]
    fn rendered_histogram_has_tallest_bar_full_height() {
        let mut hist = [0u32; 256];
        hist[0] = 10;
        hist[255] = 5;
        let chart = render_histogram(&hist, 256, 100);
        assert_eq!(chart.dimensions(), (256, 100));
        assert_ne!(*chart.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*chart.get_pixel(255, 0), Rgb([255, 255, 255]));
        assert_ne!(*chart.get_pixel(255, 99), Rgb([255, 255, 255]));
        assert_eq!(*chart.get_pixel(128, 99), Rgb([255, 255, 255]));
    }
}
