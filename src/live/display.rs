use anyhow::{Context, Result};
use image::RgbImage;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Where processed frames go and where keypresses come from
pub trait Display {
    fn show(&mut self, frame: &RgbImage) -> Result<()>;

    /// At most one key per call, `None` when nothing was pressed
    fn poll_key(&mut self) -> Option<char>;
}

#[derive(Debug, thiserror::Error)]
pub enum KeyScriptError {
    #[error("invalid key script entry {0:?}, expected <frame>:<key>")]
    Entry(String),
}

/// Scripted keypresses as `frame_index:key` pairs, e.g. `"0:1,30:5,60:q"`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyScript {
    keys: Vec<(u64, char)>,
}

impl KeyScript {
    /// Key pressed right after frame `index` was shown
    pub fn key_at(&self, index: u64) -> Option<char> {
        self.keys.iter().find(|(at, _)| *at == index).map(|(_, key)| *key)
    }
}

impl FromStr for KeyScript {
    type Err = KeyScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut keys = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = || KeyScriptError::Entry(entry.to_string());
            let (index, key) = entry.split_once(':').ok_or_else(invalid)?;
            let index: u64 = index.trim().parse().map_err(|_| invalid())?;
            let mut chars = key.trim().chars();
            let (Some(key), None) = (chars.next(), chars.next()) else {
                return Err(invalid());
            };
            keys.push((index, key));
        }
        Ok(Self { keys })
    }
}

/// Display without a screen: optionally dumps frames to disk and replays a
/// key script
pub struct HeadlessDisplay {
    dump_dir: Option<PathBuf>,
    dump_every: u32,
    keys: KeyScript,
    shown: u64,
}

impl HeadlessDisplay {
    pub fn new(keys: KeyScript) -> Self {
        Self {
            dump_dir: None,
            dump_every: 1,
            keys,
            shown: 0,
        }
    }

    /// Write every `every`th shown frame to `dir` as `frame_NNNNNN.png`
    pub fn with_dump_dir(mut self, dir: PathBuf, every: u32) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create dump directory {}", dir.display()))?;
        self.dump_dir = Some(dir);
        self.dump_every = every.max(1);
        Ok(self)
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        let index = self.shown;
        self.shown += 1;

        if let Some(dir) = &self.dump_dir {
            if index % self.dump_every as u64 == 0 {
                let path = dir.join(format!("frame_{:06}.png", index));
                frame
                    .save(&path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                debug!(path = %path.display(), "dumped frame");
            }
        }
        Ok(())
    }

    fn poll_key(&mut self) -> Option<char> {
        self.shown.checked_sub(1).and_then(|index| self.keys.key_at(index))
    }
}

#[cfg(feature = "window")]
pub use window::WindowDisplay;

#[cfg(feature = "window")]
mod window {
    use super::Display;
    use anyhow::Result;
    use image::RgbImage;
    use minifb::{Key, KeyRepeat, Window, WindowOptions};

    pub const WINDOW_TITLE: &str = "Video Filters";

    /// Interactive preview window, created on the first frame
    #[derive(Default)]
    pub struct WindowDisplay {
        window: Option<Window>,
        buffer: Vec<u32>,
    }

    impl WindowDisplay {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Display for WindowDisplay {
        fn show(&mut self, frame: &RgbImage) -> Result<()> {
            let (w, h) = (frame.width() as usize, frame.height() as usize);
            if self.window.is_none() {
                self.window = Some(Window::new(WINDOW_TITLE, w, h, WindowOptions::default())?);
            }
            let Some(window) = self.window.as_mut() else {
                return Ok(());
            };

            self.buffer.clear();
            self.buffer.extend(
                frame
                    .pixels()
                    .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32),
            );
            window.update_with_buffer(&self.buffer, w, h)?;
            Ok(())
        }

        fn poll_key(&mut self) -> Option<char> {
            let window = self.window.as_ref()?;
            if !window.is_open() {
                return Some('q');
            }
            window
                .get_keys_pressed(KeyRepeat::No)
                .into_iter()
                .find_map(|key| match key {
                    Key::Key0 | Key::NumPad0 => Some('0'),
                    Key::Key1 | Key::NumPad1 => Some('1'),
                    Key::Key2 | Key::NumPad2 => Some('2'),
                    Key::Key3 | Key::NumPad3 => Some('3'),
                    Key::Key4 | Key::NumPad4 => Some('4'),
                    Key::Key5 | Key::NumPad5 => Some('5'),
                    Key::Q | Key::Escape => Some('q'),
                    _ => None,
                })
        }
    }
}
