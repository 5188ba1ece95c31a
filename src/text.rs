use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// System font paths tried in order
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// DejaVu Sans, shipped with the crate (license in assets/fonts/LICENSE)
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to read font {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("{0} is not a usable TrueType/OpenType font")]
    Invalid(PathBuf),
    #[error("bundled font is corrupt")]
    Bundled,
}

/// Pixels a line of text covers, relative to the point passed to
/// [`TextRenderer::draw`]. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl TextBounds {
    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }
}

/// Draws single-line text with a TrueType font
pub struct TextRenderer {
    font: FontArc,
}

impl TextRenderer {
    pub fn load(path: &Path) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|e| FontError::Read(path.to_path_buf(), e))?;
        let font = FontArc::try_from_vec(bytes).map_err(|_| FontError::Invalid(path.to_path_buf()))?;
        Ok(Self { font })
    }

    /// The font compiled into the binary
    pub fn bundled() -> Result<Self, FontError> {
        let font = FontArc::try_from_slice(BUNDLED_FONT).map_err(|_| FontError::Bundled)?;
        Ok(Self { font })
    }

    /// Load the configured font, else the first system font that parses,
    /// else the bundled one.
    pub fn discover(configured: Option<&Path>) -> Result<Self, FontError> {
        if let Some(path) = configured {
            match Self::load(path) {
                Ok(renderer) => return Ok(renderer),
                Err(e) => warn!(error = %e, "configured font unusable; falling back"),
            }
        }

        for candidate in SYSTEM_FONTS {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            match Self::load(path) {
                Ok(renderer) => {
                    debug!(font = candidate, "using system font");
                    return Ok(renderer);
                }
                Err(e) => debug!(error = %e, "skipping system font"),
            }
        }

        debug!("using bundled font");
        Self::bundled()
    }

    /// Exact ink bounds of `text`, laid out the way [`draw_text_mut`] lays it out
    pub fn measure(&self, scale: f32, text: &str) -> TextBounds {
        let scaled = self.font.as_scaled(PxScale::from(scale));
        let mut bounds: Option<TextBounds> = None;
        let mut caret = 0f32;
        let mut last: Option<GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
            caret += scaled.h_advance(id);
            let Some(outlined) = scaled.outline_glyph(glyph) else {
                continue;
            };
            if let Some(prev) = last {
                caret += scaled.kern(id, prev);
            }
            last = Some(id);

            let bb = outlined.px_bounds();
            let left = bb.min.x.round() as i32;
            let top = bb.min.y.round() as i32;
            let glyph_box = TextBounds {
                left,
                top,
                right: left + bb.width() as i32,
                bottom: top + bb.height() as i32,
            };
            bounds = Some(match bounds {
                None => glyph_box,
                Some(b) => TextBounds {
                    left: b.left.min(glyph_box.left),
                    top: b.top.min(glyph_box.top),
                    right: b.right.max(glyph_box.right),
                    bottom: b.bottom.max(glyph_box.bottom),
                },
            });
        }
        bounds.unwrap_or_default()
    }

    /// Draw `text` with its layout origin at (x, y)
    pub fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str) {
        draw_text_mut(canvas, color, x, y, PxScale::from(scale), &self.font, text);
    }
}
