use image::{DynamicImage, Rgb, RgbImage};
use rand::Rng;
use tracing::warn;

use crate::models::TextOrigin;
use crate::text::TextRenderer;

/// Watermark color (black, suited to bright images)
pub const WATERMARK_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Pick a random top-left origin that keeps a `text_w x text_h` box inside
/// a `width x height` image.
///
/// Both coordinates are uniform over their valid range. An axis on which
/// the text does not fit is pinned to 0.
pub fn choose_origin<R: Rng>(width: u32, height: u32, text_w: u32, text_h: u32, rng: &mut R) -> TextOrigin {
    let pick = |rng: &mut R, extent: u32, size: u32, axis: &str| -> i32 {
        match extent.checked_sub(size) {
            Some(max) => rng.gen_range(0..=max) as i32,
            None => {
                warn!(axis, extent, size, "watermark text larger than image; pinning to edge");
                0
            }
        }
    };

    let x = pick(rng, width, text_w, "x");
    let y = pick(rng, height, text_h, "y");
    TextOrigin { x, y }
}

/// Draw `text` at a random position that keeps all of its ink inside the image.
///
/// The returned origin is the top-left corner of the inked box.
pub fn apply_watermark<R: Rng>(
    img: &DynamicImage,
    renderer: &TextRenderer,
    text: &str,
    scale: f32,
    rng: &mut R,
) -> (RgbImage, TextOrigin) {
    let mut canvas = img.to_rgb8();
    let bounds = renderer.measure(scale, text);
    let origin = choose_origin(canvas.width(), canvas.height(), bounds.width(), bounds.height(), rng);
    renderer.draw(
        &mut canvas,
        WATERMARK_COLOR,
        origin.x - bounds.left,
        origin.y - bounds.top,
        scale,
        text,
    );
    (canvas, origin)
}
