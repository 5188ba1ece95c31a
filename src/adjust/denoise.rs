use image::{GrayImage, ImageBuffer, Luma, Pixel, RgbImage};
use imageproc::filter::{box_filter, gaussian_blur_f32, median_filter};

/// Box-mean filter over a `(2r + 1) x (2r + 1)` window
pub fn mean_filter(img: &GrayImage, radius: u32) -> GrayImage {
    box_filter(img, radius, radius)
}

/// Median filter over a `(2r + 1) x (2r + 1)` window
pub fn median_gray(img: &GrayImage, radius: u32) -> GrayImage {
    median_filter(img, radius, radius)
}

/// Gaussian sigma matching a square kernel of side `ksize`
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian blur of a grayscale image with a `ksize x ksize` kernel
pub fn gaussian_gray(img: &GrayImage, ksize: u32) -> GrayImage {
    gaussian_blur_f32(img, sigma_for_kernel(ksize))
}

/// Gaussian blur of a colour image with a `ksize x ksize` kernel
pub fn gaussian_rgb(img: &RgbImage, ksize: u32) -> RgbImage {
    image::imageops::blur(img, sigma_for_kernel(ksize))
}

/// Edge-preserving bilateral filter.
///
/// Neighbours within a disc of the given `diameter` are weighted by spatial
/// distance and by colour distance (sum of absolute channel differences).
/// Works for any 8-bit pixel type, so the same code smooths grayscale and
/// colour frames.
pub fn bilateral_filter<P>(
    img: &ImageBuffer<P, Vec<u8>>,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = img.dimensions();
    let mut out = ImageBuffer::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }

    let radius = (diameter / 2).max(1) as i32;
    let color_coeff = -0.5 / (sigma_color * sigma_color).max(f32::EPSILON);
    let space_coeff = -0.5 / (sigma_space * sigma_space).max(f32::EPSILON);
    let channels = P::CHANNEL_COUNT as usize;

    // Precompute spatial weights for offsets inside the disc
    let mut offsets = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f32;
            if r2 > (radius * radius) as f32 {
                continue;
            }
            offsets.push((dx, dy, (r2 * space_coeff).exp()));
        }
    }

    // Colour weight per integer distance, up to 255 per channel
    let color_weights: Vec<f32> = (0..=255 * channels)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();

    let mut sums = vec![0f32; channels];
    for y in 0..h {
        for x in 0..w {
            let center = img.get_pixel(x, y).channels();
            sums.iter_mut().for_each(|s| *s = 0.0);
            let mut weight_sum = 0f32;

            for &(dx, dy, spatial) in &offsets {
                // Replicate borders
                let nx = (x as i32 + dx).clamp(0, w as i32 - 1) as u32;
                let ny = (y as i32 + dy).clamp(0, h as i32 - 1) as u32;
                let neighbor = img.get_pixel(nx, ny).channels();

                let dist: usize = center
                    .iter()
                    .zip(neighbor)
                    .map(|(&a, &b)| a.abs_diff(b) as usize)
                    .sum();
                let weight = spatial * color_weights[dist];

                for (sum, &v) in sums.iter_mut().zip(neighbor) {
                    *sum += v as f32 * weight;
                }
                weight_sum += weight;
            }

            let mut filtered = *img.get_pixel(x, y);
            if weight_sum > 0.0 {
                for (dst, sum) in filtered.channels_mut().iter_mut().zip(&sums) {
                    *dst = (sum / weight_sum).round().clamp(0.0, 255.0) as u8;
                }
            }
            out.put_pixel(x, y, filtered);
        }
    }
    out
}

/// Adaptive mean threshold: white where a pixel exceeds its local
/// `block_size` mean minus `c`, black elsewhere
pub fn adaptive_threshold_mean(img: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let radius = block_size / 2;
    let means = box_filter(img, radius, radius);
    let mut out = GrayImage::new(img.width(), img.height());
    for ((dst, src), mean) in out.pixels_mut().zip(img.pixels()).zip(means.pixels()) {
        *dst = if src[0] as i32 > mean[0] as i32 - c {
            Luma([255])
        } else {
            Luma([0])
        };
    }
    out
}
