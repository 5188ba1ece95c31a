use bytes::BytesMut;
use image::RgbImage;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const BOUNDARY: &[u8] = b"--frame\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 16 * 1024;

/// Image files replayed by [`SequenceSource`]
const SEQUENCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to open frame source {0}: {1}")]
    Open(String, String),
    #[error("failed to read frame: {0}")]
    Read(String),
    #[error("failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
}

/// Anything that yields frames one at a time
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError>;
}

/// Open an MJPEG stream for `http(s)://` sources, a frame directory otherwise
pub fn open_source(source: &str) -> Result<Box<dyn FrameSource>, CaptureError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        Ok(Box::new(MjpegSource::connect(source)?))
    } else {
        Ok(Box::new(SequenceSource::open(Path::new(source))?))
    }
}

/// Parse state for the MJPEG multipart stream.
enum ParseState {
    /// Looking for the boundary marker `--frame\r\n`.
    SeekingBoundary,
    /// Found boundary, now looking for end of headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next boundary.
    CollectingJpeg,
}

/// Frames from a `multipart/x-mixed-replace` MJPEG stream
pub struct MjpegSource<R: Read> {
    reader: R,
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
    frames: u64,
}

impl MjpegSource<reqwest::blocking::Response> {
    /// Connect to an HTTP MJPEG endpoint
    pub fn connect(url: &str) -> Result<Self, CaptureError> {
        info!(url, "connecting to MJPEG stream");
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| CaptureError::Open(url.to_string(), e.to_string()))?;
        let response = client
            .get(url)
            .send()
            .map_err(|e| CaptureError::Open(url.to_string(), e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaptureError::Open(url.to_string(), format!("HTTP status {}", response.status())));
        }
        info!(status = %response.status(), "connected to MJPEG stream");
        Ok(Self::new(response))
    }
}

impl<R: Read> MjpegSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
            frames: 0,
        }
    }

    /// Next complete JPEG payload, reading from the stream as needed
    pub fn next_jpeg(&mut self) -> Result<Vec<u8>, CaptureError> {
        loop {
            if let Some(jpeg) = self.parse_buffered() {
                if jpeg.is_empty() {
                    continue;
                }
                self.frames += 1;
                debug!(seq = self.frames, bytes = jpeg.len(), "received MJPEG frame");
                return Ok(jpeg);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self
                .reader
                .read(&mut chunk)
                .map_err(|e| CaptureError::Read(e.to_string()))?;
            if n == 0 {
                return Err(CaptureError::Read("stream ended".to_string()));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Advance the parser over buffered bytes; `Some` once a frame is complete
    fn parse_buffered(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, BOUNDARY) {
                        let _ = self.buffer.split_to(pos + BOUNDARY.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep last few bytes in case boundary spans chunks
                        if self.buffer.len() > BOUNDARY.len() {
                            let _ = self.buffer.split_to(self.buffer.len() - BOUNDARY.len());
                        }
                        return None;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    let pos = find_subsequence(&self.buffer, HEADER_END)?;
                    let _ = self.buffer.split_to(pos + HEADER_END.len());
                    self.jpeg_start = 0;
                    self.state = ParseState::CollectingJpeg;
                }
                ParseState::CollectingJpeg => {
                    let Some(pos) = find_subsequence(&self.buffer[self.jpeg_start..], BOUNDARY) else {
                        // Avoid re-scanning old data
                        self.jpeg_start = self.buffer.len().saturating_sub(BOUNDARY.len());
                        return None;
                    };
                    let jpeg_end = self.jpeg_start + pos;
                    // Strip trailing \r\n before boundary
                    let end = if self.buffer[..jpeg_end].ends_with(b"\r\n") {
                        jpeg_end - 2
                    } else {
                        jpeg_end
                    };
                    let jpeg = self.buffer[..end].to_vec();
                    let _ = self.buffer.split_to(jpeg_end + BOUNDARY.len());
                    self.state = ParseState::SeekingHeaderEnd;
                    return Some(jpeg);
                }
            }
        }
    }
}

impl<R: Read> FrameSource for MjpegSource<R> {
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let jpeg = self.next_jpeg()?;
        Ok(image::load_from_memory(&jpeg)?.to_rgb8())
    }
}

/// Frames replayed from the image files of a directory, in name order
pub struct SequenceSource {
    frames: Vec<PathBuf>,
    next: usize,
}

impl SequenceSource {
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CaptureError::Open(dir.display().to_string(), e.to_string()))?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| SEQUENCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(CaptureError::Open(dir.display().to_string(), "no image files found".to_string()));
        }
        info!(dir = %dir.display(), frames = frames.len(), "opened frame sequence");
        Ok(Self { frames, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for SequenceSource {
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let path = self
            .frames
            .get(self.next)
            .ok_or_else(|| CaptureError::Read(format!("sequence exhausted after {} frames", self.frames.len())))?;
        self.next += 1;
        Ok(image::open(path)?.to_rgb8())
    }
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb};
    use std::io::Cursor;

    fn jpeg_bytes(color: [u8; 3]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb(color)));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    fn multipart(parts: &[Vec<u8>]) -> Vec<u8> {
        let mut body = b"HTTP preamble junk".to_vec();
        for part in parts {
            body.extend_from_slice(BOUNDARY);
            body.extend_from_slice(b"Content-Type: image/jpeg\r\nContent-Length: 0\r\n\r\n");
            body.extend_from_slice(part);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(BOUNDARY);
        body
    }

    /// Reader that hands out at most `step` bytes per call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn parses_consecutive_parts() {
        let parts = vec![b"first".to_vec(), b"second part".to_vec()];
        let mut source = MjpegSource::new(Cursor::new(multipart(&parts)));
        assert_eq!(source.next_jpeg().unwrap(), b"first");
        assert_eq!(source.next_jpeg().unwrap(), b"second part");
        assert!(matches!(source.next_jpeg(), Err(CaptureError::Read(_))));
    }

    #[test]
    fn boundary_split_across_reads() {
        let parts = vec![b"abcdefgh".to_vec(), b"ijkl".to_vec()];
        let reader = Trickle { data: multipart(&parts), pos: 0, step: 3 };
        let mut source = MjpegSource::new(reader);
        assert_eq!(source.next_jpeg().unwrap(), b"abcdefgh");
        assert_eq!(source.next_jpeg().unwrap(), b"ijkl");
    }

    #[test]
    fn decodes_jpeg_frames() {
        let parts = vec![jpeg_bytes([200, 10, 10]), jpeg_bytes([10, 10, 200])];
        let mut source = MjpegSource::new(Cursor::new(multipart(&parts)));
        let frame = source.read_frame().unwrap();
        assert_eq!(frame.dimensions(), (8, 8));
        assert!(frame.get_pixel(4, 4)[0] > 150);
        let frame = source.read_frame().unwrap();
        assert!(frame.get_pixel(4, 4)[2] > 150);
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let mut source = MjpegSource::new(Cursor::new(multipart(&[b"not a jpeg".to_vec()])));
        assert!(matches!(source.read_frame(), Err(CaptureError::Decode(_))));
    }

    #[test]
    fn sequence_replays_in_name_order_then_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])).save(dir.path().join("b.png")).unwrap();
        RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])).save(dir.path().join("a.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

        let mut source = SequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.read_frame().unwrap().get_pixel(0, 0)[0], 255);
        assert_eq!(source.read_frame().unwrap().get_pixel(0, 0)[0], 0);
        assert!(matches!(source.read_frame(), Err(CaptureError::Read(_))));
    }

    #[test]
    fn empty_or_missing_directory_fails_to_open() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(SequenceSource::open(dir.path()), Err(CaptureError::Open(..))));
        assert!(matches!(
            SequenceSource::open(&dir.path().join("missing")),
            Err(CaptureError::Open(..))
        ));
    }
}
