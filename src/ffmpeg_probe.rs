//! FFmpeg-backed [`VideoProbe`].
//!
//! Every call opens a fresh demuxer on a Tokio blocking thread, so up to the
//! pass's concurrency limit of files are decoded in parallel without tying up
//! the async runtime. Nothing is cached between calls.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use ffmpeg_next::{
    Rational,
    codec::{context::Context as CodecContext, decoder::Video as VideoDecoder},
    format::Pixel,
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::capture::FrameSurface;
use crate::error::VidcoverError;
use crate::ffmpeg::ensure_initialized;
use crate::metadata::VideoMetadata;
use crate::probe::VideoProbe;
use crate::record::MediaLocator;

/// Decodes local files and URLs with FFmpeg.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> Result<(), vidcover::VidcoverError> {
/// use std::time::Duration;
///
/// use vidcover::{FfmpegProbe, MediaLocator, VideoProbe};
///
/// let probe = FfmpegProbe::new()?;
/// let locator = MediaLocator::new("input.mp4");
/// let metadata = probe.load_metadata(&locator).await?;
/// let frame = probe.seek_and_capture(&locator, Duration::from_secs(1)).await?;
/// println!("{:?}: {}x{}", metadata.duration, frame.width(), frame.height());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FfmpegProbe {
    _initialized: (),
}

impl FfmpegProbe {
    /// # Errors
    ///
    /// Returns [`VidcoverError::FfmpegError`] if FFmpeg fails to initialise.
    pub fn new() -> Result<Self, VidcoverError> {
        ensure_initialized()?;
        Ok(Self { _initialized: () })
    }
}

impl VideoProbe for FfmpegProbe {
    fn load_metadata(
        &self,
        locator: &MediaLocator,
    ) -> impl Future<Output = Result<VideoMetadata, VidcoverError>> + Send {
        let locator = locator.clone();
        async move {
            let name = locator.to_string();
            tokio::task::spawn_blocking(move || read_metadata(&locator))
                .await
                .map_err(|error| VidcoverError::MetadataLoad {
                    locator: name,
                    reason: error.to_string(),
                })?
        }
    }

    fn seek_and_capture(
        &self,
        locator: &MediaLocator,
        at: Duration,
    ) -> impl Future<Output = Result<FrameSurface, VidcoverError>> + Send {
        let locator = locator.clone();
        async move {
            let name = locator.to_string();
            tokio::task::spawn_blocking(move || decode_frame_at(&locator, at))
                .await
                .map_err(|error| VidcoverError::Load {
                    locator: name,
                    reason: error.to_string(),
                })?
        }
    }
}

fn read_metadata(locator: &MediaLocator) -> Result<VideoMetadata, VidcoverError> {
    let metadata_error = |reason: String| VidcoverError::MetadataLoad {
        locator: locator.to_string(),
        reason,
    };

    let path = Path::new(locator.as_str());
    let input = ffmpeg_next::format::input(&path).map_err(|error| metadata_error(error.to_string()))?;
    let stream = input
        .streams()
        .best(Type::Video)
        .ok_or_else(|| VidcoverError::NoVideoStream(locator.to_string()))?;

    // Container duration first, the stream's own duration as a fallback.
    let container_micros = input.duration();
    let duration = if container_micros > 0 {
        Duration::from_micros(container_micros as u64)
    } else {
        let seconds = rational_seconds(stream.duration(), stream.time_base());
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
    };

    let decoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().video())
        .map_err(|error| metadata_error(error.to_string()))?;

    let frame_rate = stream.avg_frame_rate();
    let frames_per_second = if frame_rate.denominator() != 0 {
        f64::from(frame_rate)
    } else {
        0.0
    };

    let metadata = VideoMetadata {
        duration,
        width: decoder.width(),
        height: decoder.height(),
        frames_per_second,
        codec: decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        format: input.format().name().to_string(),
    };
    log::debug!(
        "{locator}: {:?}, {}x{} [{}]",
        metadata.duration,
        metadata.width,
        metadata.height,
        metadata.codec
    );
    Ok(metadata)
}

fn decode_frame_at(locator: &MediaLocator, at: Duration) -> Result<FrameSurface, VidcoverError> {
    let load_error = |reason: String| VidcoverError::Load {
        locator: locator.to_string(),
        reason,
    };

    let path = Path::new(locator.as_str());
    let mut input = ffmpeg_next::format::input(&path).map_err(|error| load_error(error.to_string()))?;

    let (stream_index, time_base, decoder) = {
        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| VidcoverError::NoVideoStream(locator.to_string()))?;
        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| load_error(error.to_string()))?;
        (stream.index(), stream.time_base(), decoder)
    };

    let (width, height) = (decoder.width(), decoder.height());
    if width == 0 || height == 0 {
        return Err(VidcoverError::FrameCapture(format!(
            "{locator} reports zero intrinsic dimensions"
        )));
    }

    let scaler = ScalingContext::get(
        decoder.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;

    // Container-level seek works in microseconds and lands on the keyframe
    // at or before the target. Unseekable inputs decode from the start.
    let target = at.as_micros() as i64;
    if let Err(error) = input.seek(target, ..target) {
        log::debug!("Seek to {at:?} failed for {locator}, decoding from start: {error}");
    }

    let mut grabber = FrameGrabber {
        decoder,
        scaler,
        decoded: VideoFrame::empty(),
        rgb: VideoFrame::empty(),
        time_base,
        target: at.as_secs_f64(),
        last: None,
    };

    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if let Err(error) = grabber.decoder.send_packet(&packet) {
            log::debug!("Skipping undecodable packet in {locator}: {error}");
            continue;
        }
        if let Some(timestamp) = grabber.drain()? {
            return grabber.surface(timestamp, width, height);
        }
    }

    grabber.decoder.send_eof()?;
    if let Some(timestamp) = grabber.drain()? {
        return grabber.surface(timestamp, width, height);
    }

    // Videos shorter than the target show their last frame.
    match grabber.last {
        Some(timestamp) => grabber.surface(timestamp, width, height),
        None => Err(load_error("no decodable video frame".to_string())),
    }
}

/// Decodes forward until a frame at or past `target` seconds appears.
///
/// The most recent frame is always kept scaled in `rgb`.
struct FrameGrabber {
    decoder: VideoDecoder,
    scaler: ScalingContext,
    decoded: VideoFrame,
    rgb: VideoFrame,
    time_base: Rational,
    target: f64,
    last: Option<Duration>,
}

impl FrameGrabber {
    fn drain(&mut self) -> Result<Option<Duration>, VidcoverError> {
        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            let pts = self
                .decoded
                .timestamp()
                .or_else(|| self.decoded.pts())
                .unwrap_or(0);
            let seconds = rational_seconds(pts, self.time_base).max(0.0);
            self.scaler.run(&self.decoded, &mut self.rgb)?;

            let timestamp = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX);
            self.last = Some(timestamp);
            if seconds >= self.target {
                return Ok(Some(timestamp));
            }
        }
        Ok(None)
    }

    fn surface(
        &self,
        timestamp: Duration,
        width: u32,
        height: u32,
    ) -> Result<FrameSurface, VidcoverError> {
        let buffer = packed_rgb(&self.rgb, width, height);
        let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            VidcoverError::FrameCapture("decoded frame does not match its dimensions".to_string())
        })?;
        Ok(FrameSurface::new(DynamicImage::ImageRgb8(image), timestamp))
    }
}

fn rational_seconds(value: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    value as f64 * f64::from(time_base.numerator()) / f64::from(time_base.denominator())
}

/// Copy an RGB24 plane into a buffer without FFmpeg's row padding.
fn packed_rgb(frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = frame.data(0);

    if stride == row_bytes {
        return data[..row_bytes * height as usize].to_vec();
    }
    data.chunks(stride)
        .take(height as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}
