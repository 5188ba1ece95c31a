mod common;

use common::*;
use framelab::live::capture::MjpegSource;
use framelab::live::LiveSession;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

#[test]
fn test_sequence_with_scripted_keys() -> anyhow::Result<()> {
    let frames = tempfile::TempDir::new()?;
    let dump = tempfile::TempDir::new()?;
    write_frame_sequence(frames.path(), 6);

    let source = SequenceSource::open(frames.path())?;
    let keys: KeyScript = "0:1,2:5,4:q".parse()?;
    let display = HeadlessDisplay::new(keys).with_dump_dir(dump.path().to_path_buf(), 1)?;

    let mut session = LiveSession::new(source, display, FilterOptions::default());
    let summary = session.run()?;

    assert_eq!(summary.frames, 5);
    assert_eq!(summary.final_mode, FilterMode::Cartoon);
    assert_eq!(std::fs::read_dir(dump.path())?.count(), 5);

    // frame 1 was shown after switching to edge detection
    let edges = image::open(dump.path().join("frame_000001.png"))?.to_rgb8();
    assert!(edges.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    Ok(())
}

#[test]
fn test_exhausted_sequence_is_an_error() -> anyhow::Result<()> {
    let frames = tempfile::TempDir::new()?;
    write_frame_sequence(frames.path(), 3);

    let source = SequenceSource::open(frames.path())?;
    let mut session = LiveSession::new(source, HeadlessDisplay::new(KeyScript::default()), FilterOptions::default());

    let err = session.run().unwrap_err();
    assert!(err.chain().any(|cause| cause.to_string().contains("sequence exhausted")));
    assert_eq!(session.display().frames_shown(), 3);
    Ok(())
}

#[test]
fn test_frame_limit_stops_cleanly() -> anyhow::Result<()> {
    let frames = tempfile::TempDir::new()?;
    write_frame_sequence(frames.path(), 10);

    let source = SequenceSource::open(frames.path())?;
    let mut session = LiveSession::new(source, HeadlessDisplay::new(KeyScript::default()), FilterOptions::default())
        .with_max_frames(Some(4));
    let summary = session.run()?;
    assert_eq!(summary.frames, 4);
    assert_eq!(summary.final_mode, FilterMode::Original);
    Ok(())
}

#[test]
fn test_mjpeg_stream_through_session() -> anyhow::Result<()> {
    let mut body = Vec::new();
    for color in [[250u8, 0, 0], [0, 250, 0], [0, 0, 250]] {
        let mut jpeg = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb(color))).write_to(&mut jpeg, ImageFormat::Jpeg)?;
        body.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(&jpeg.into_inner());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"--frame\r\n");

    let source = MjpegSource::new(Cursor::new(body));
    let keys: KeyScript = "1:2".parse()?;
    let mut session = LiveSession::new(source, HeadlessDisplay::new(keys), FilterOptions::default());

    // three frames decode, then the stream ends
    assert!(session.run().is_err());
    assert_eq!(session.display().frames_shown(), 3);
    assert_eq!(session.mode(), FilterMode::Quantization);
    Ok(())
}

#[test]
fn test_modes_cover_every_index() {
    let frame = gradient_frame();
    let options = FilterOptions::default();
    for index in 0..=5 {
        let out = FilterMode::from_index(index).apply(&frame, &options);
        assert_eq!(out.dimensions(), frame.dimensions());
    }
    assert_eq!(FilterMode::from_index(6).apply(&frame, &options), frame);
}
