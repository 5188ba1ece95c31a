use image::GrayImage;
use rand::Rng;

/// Salt-and-pepper noise.
///
/// One uniform draw `r` per pixel: `r < amount / 2` turns the pixel white,
/// `amount / 2 <= r < amount` turns it black, anything else keeps it.
/// `amount` is clamped to [0, 1].
pub fn salt_and_pepper<R: Rng>(img: &GrayImage, amount: f64, rng: &mut R) -> GrayImage {
    let mut noisy = img.clone();
    let amount = amount.clamp(0.0, 1.0);
    if amount == 0.0 {
        return noisy;
    }

    let salt = amount / 2.0;
    for pixel in noisy.pixels_mut() {
        let r: f64 = rng.r#gen();
        if r < salt {
            pixel[0] = u8::MAX;
        } else if r < amount {
            pixel[0] = u8::MIN;
        }
    }
    noisy
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn mid_gray() -> GrayImage {
        GrayImage::from_pixel(64, 64, Luma([128]))
    }

    #[test]
    fn zero_amount_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let img = GrayImage::from_fn(32, 32, |x, y| Luma([(x * 8 + y) as u8]));
        assert_eq!(salt_and_pepper(&img, 0.0, &mut rng), img);
    }

    #[test]
    fn full_amount_saturates_every_pixel() {
        let mut rng = StdRng::seed_from_u64(2);
        let out = salt_and_pepper(&mid_gray(), 1.0, &mut rng);
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        // both kinds appear
        assert!(out.pixels().any(|p| p[0] == 0));
        assert!(out.pixels().any(|p| p[0] == 255));
    }

    #[test]
    fn small_amount_touches_roughly_that_fraction() {
        let mut rng = StdRng::seed_from_u64(3);
        let img = GrayImage::from_pixel(200, 200, Luma([128]));
        let out = salt_and_pepper(&img, 0.02, &mut rng);
        let changed = out.pixels().filter(|p| p[0] != 128).count() as f64;
        let fraction = changed / 40_000.0;
        assert!((0.01..0.03).contains(&fraction), "fraction {fraction}");
    }

    #[test]
    fn same_seed_same_noise() {
        let a = salt_and_pepper(&mid_gray(), 0.3, &mut StdRng::seed_from_u64(9));
        let b = salt_and_pepper(&mid_gray(), 0.3, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
