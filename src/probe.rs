//! Media probing.
//!
//! [`VideoProbe`] is the capability boundary for everything that touches a
//! real decoder: opening a resource for its metadata and seeking to a frame.
//! The crate ships an FFmpeg implementation
//! ([`FfmpegProbe`](crate::FfmpegProbe), feature `ffmpeg`); tests and other
//! targets substitute their own.
//!
//! [`MediaProber`] builds the per-record probe on top of it: duration and a
//! default cover captured slightly past the start of the video.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), vidcover::VidcoverError> {
//! use vidcover::{FfmpegProbe, MediaLocator, MediaProber, ProcessingOptions};
//!
//! let prober = MediaProber::new(FfmpegProbe::new()?, &ProcessingOptions::new());
//! let report = prober.probe(&MediaLocator::new("input.mp4")).await;
//! println!("duration: {:?}", report.duration);
//! # Ok(())
//! # }
//! ```

use std::{future::Future, time::Duration};

use crate::capture::{EncodedImage, FrameSurface, ImageEncoding, capture_frame};
use crate::config::ProcessingOptions;
use crate::error::VidcoverError;
use crate::metadata::VideoMetadata;
use crate::record::MediaLocator;

/// Decoder capability used by the prober, the manual cover picker and the
/// filmstrip worker.
///
/// Implementations must be [`Send`] and [`Sync`]: a processing pass drives
/// up to the concurrency limit of calls at once.
pub trait VideoProbe: Send + Sync {
    /// Open `locator` and read its metadata.
    ///
    /// Fails with [`VidcoverError::MetadataLoad`] if the resource errors
    /// before metadata is available.
    fn load_metadata(
        &self,
        locator: &MediaLocator,
    ) -> impl Future<Output = Result<VideoMetadata, VidcoverError>> + Send;

    /// Seek `locator` to `at` and return the frame shown there.
    ///
    /// Fails with [`VidcoverError::Load`] if the resource cannot be loaded.
    fn seek_and_capture(
        &self,
        locator: &MediaLocator,
        at: Duration,
    ) -> impl Future<Output = Result<FrameSurface, VidcoverError>> + Send;
}

/// Outcome of probing one locator.
///
/// The two steps are independent, so one can succeed while the other fails.
#[derive(Debug)]
pub struct ProbeReport {
    /// Duration in seconds, or why it could not be read.
    pub duration: Result<f64, VidcoverError>,
    /// Default cover, or why it could not be captured.
    pub cover: Result<EncodedImage, VidcoverError>,
}

impl ProbeReport {
    /// `true` when both steps succeeded.
    pub fn is_complete(&self) -> bool {
        self.duration.is_ok() && self.cover.is_ok()
    }
}

/// Derives duration and a default cover for a locator.
#[derive(Debug)]
pub struct MediaProber<P> {
    backend: P,
    cover_offset: Duration,
    encoding: ImageEncoding,
}

impl<P: VideoProbe> MediaProber<P> {
    pub fn new(backend: P, options: &ProcessingOptions) -> Self {
        Self {
            backend,
            cover_offset: options.cover_offset,
            encoding: options.encoding,
        }
    }

    /// The decoder this prober drives.
    pub fn backend(&self) -> &P {
        &self.backend
    }

    /// Probe duration and capture the default cover concurrently.
    ///
    /// Both steps always settle before this returns.
    pub async fn probe(&self, locator: &MediaLocator) -> ProbeReport {
        log::debug!("Probing {locator} (cover at {:?})", self.cover_offset);
        let (metadata, cover) = tokio::join!(
            self.backend.load_metadata(locator),
            self.capture_at(locator, self.cover_offset),
        );

        ProbeReport {
            duration: metadata.map(|metadata| metadata.duration_seconds()),
            cover,
        }
    }

    /// Seek to `at` and encode the frame found there.
    ///
    /// # Errors
    ///
    /// Returns [`VidcoverError::Load`] or [`VidcoverError::FrameCapture`].
    pub async fn capture_at(
        &self,
        locator: &MediaLocator,
        at: Duration,
    ) -> Result<EncodedImage, VidcoverError> {
        let surface = self.backend.seek_and_capture(locator, at).await?;
        capture_frame(&surface, self.encoding)
    }
}
