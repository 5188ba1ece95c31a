//! Live filter session: frames in, one of six transforms, labelled frames out.

pub mod capture;
pub mod display;
pub mod filters;
pub mod modes;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use tracing::{error, info, warn};

use crate::text::TextRenderer;
use capture::{CaptureError, FrameSource};
use display::Display;
use modes::{FilterMode, FilterOptions};

pub const INSTRUCTIONS: &str = "Press 0-5 to change mode, 'q' to quit";

const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_SCALE: f32 = 22.0;
const INSTRUCTIONS_SCALE: f32 = 16.0;

/// What a keypress asks the session to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select(FilterMode),
    Quit,
}

/// `'0'`-`'5'` select a mode, `'q'` quits, anything else is ignored
pub fn parse_key(key: char) -> Option<Command> {
    if key == 'q' {
        return Some(Command::Quit);
    }
    FilterMode::from_key(key).map(Command::Select)
}

pub fn print_menu() {
    println!("\n===== Video Filter Modes =====");
    for mode in FilterMode::ALL {
        println!("{}. {}", mode.index(), mode.name());
    }
    println!("\nPress the corresponding number key to switch modes");
    println!("Press 'q' to quit");
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError> {
        (**self).read_frame()
    }
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).show(frame)
    }

    fn poll_key(&mut self) -> Option<char> {
        (**self).poll_key()
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub final_mode: FilterMode,
}

pub struct LiveSession<S: FrameSource, D: Display> {
    source: S,
    display: D,
    options: FilterOptions,
    renderer: Option<TextRenderer>,
    mode: FilterMode,
    max_frames: Option<u64>,
    warned_no_font: bool,
}

impl<S: FrameSource, D: Display> LiveSession<S, D> {
    pub fn new(source: S, display: D, options: FilterOptions) -> Self {
        Self {
            source,
            display,
            options,
            renderer: None,
            mode: FilterMode::Original,
            max_frames: None,
            warned_no_font: false,
        }
    }

    /// Font for the mode label; without one the overlay is skipped
    pub fn with_renderer(mut self, renderer: Option<TextRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Stop cleanly after this many frames
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run until `q`, the frame limit, or a capture failure (returned as an error)
    pub fn run(&mut self) -> Result<SessionSummary> {
        print_menu();
        let mut frames = 0u64;

        loop {
            if self.max_frames.is_some_and(|max| frames >= max) {
                info!(frames, "frame limit reached");
                break;
            }

            let frame = match self.source.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    error!(error = %e, frames, "failed to capture frame");
                    return Err(e).context("failed to capture frame");
                }
            };

            let mut processed = self.mode.apply(&frame, &self.options);
            self.draw_overlay(&mut processed);
            self.display.show(&processed)?;
            frames += 1;

            match self.display.poll_key().and_then(parse_key) {
                Some(Command::Quit) => {
                    info!(frames, "quit requested");
                    break;
                }
                Some(Command::Select(mode)) => {
                    self.mode = mode;
                    println!("Switched to mode: {}", mode.index());
                    info!(mode = mode.name(), "switched mode");
                }
                None => {}
            }
        }

        Ok(SessionSummary {
            frames,
            final_mode: self.mode,
        })
    }

    fn draw_overlay(&mut self, frame: &mut RgbImage) {
        let Some(renderer) = &self.renderer else {
            if !self.warned_no_font {
                warn!("no font available; mode overlay disabled");
                self.warned_no_font = true;
            }
            return;
        };
        let label = format!("Mode: {}", self.mode.name());
        renderer.draw(frame, OVERLAY_COLOR, 10, 12, LABEL_SCALE, &label);
        renderer.draw(frame, OVERLAY_COLOR, 10, 42, INSTRUCTIONS_SCALE, INSTRUCTIONS);
    }
}
