//! Filmstrip extraction.
//!
//! A filmstrip is a row of small frames taken at even steps across a video,
//! used to scrub for a manual cover. [`extract_strip`] does the work
//! directly; [`StripWorker`] runs it on a background task fed through a
//! bounded channel so callers only exchange messages with it. Nothing else in
//! the crate depends on the worker being present.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), vidcover::VidcoverError> {
//! use std::sync::Arc;
//!
//! use vidcover::{FfmpegProbe, MediaLocator, StripOptions, StripWorker};
//!
//! let worker = StripWorker::spawn(Arc::new(FfmpegProbe::new()?));
//! let frames = worker
//!     .request(MediaLocator::new("input.mp4"), StripOptions::new(10))
//!     .await?;
//! for (index, frame) in frames.iter().enumerate() {
//!     frame.save(format!("strip_{index:02}.png"))?;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, imageops::FilterType};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::VidcoverError;
use crate::probe::VideoProbe;
use crate::record::MediaLocator;

/// Pending requests the worker buffers before senders wait.
const REQUEST_CHANNEL_CAPACITY: usize = 8;

/// Shape of a filmstrip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct StripOptions {
    pub frame_count: u32,
    /// Width of each frame in pixels.
    pub width: u32,
    /// Height of each frame in pixels.
    pub height: u32,
}

impl StripOptions {
    /// `frame_count` frames at 160×90.
    pub fn new(frame_count: u32) -> Self {
        Self {
            frame_count,
            width: 160,
            height: 90,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }
}

/// Timestamps a strip of `frame_count` frames seeks to.
///
/// The first frame is at zero; each following frame is one
/// `duration / frame_count` step further.
pub fn strip_timestamps(duration: Duration, frame_count: u32) -> Vec<Duration> {
    if frame_count == 0 {
        return Vec::new();
    }
    let step = duration / frame_count;
    (0..frame_count).map(|index| step * index).collect()
}

/// Extract a filmstrip from `locator`.
///
/// # Errors
///
/// Returns [`VidcoverError::InvalidFrameCount`] for zero frames, or the
/// first metadata or seek error encountered.
pub async fn extract_strip<P: VideoProbe>(
    probe: &P,
    locator: &MediaLocator,
    options: StripOptions,
) -> Result<Vec<DynamicImage>, VidcoverError> {
    if options.frame_count == 0 {
        return Err(VidcoverError::InvalidFrameCount);
    }

    let metadata = probe.load_metadata(locator).await?;
    let timestamps = strip_timestamps(metadata.duration, options.frame_count);
    log::debug!(
        "Extracting {} strip frames from {locator} over {:?}",
        timestamps.len(),
        metadata.duration
    );

    let mut frames = Vec::with_capacity(timestamps.len());
    for timestamp in timestamps {
        let surface = probe.seek_and_capture(locator, timestamp).await?;
        frames.push(
            surface
                .image
                .resize_exact(options.width, options.height, FilterType::Triangle),
        );
    }
    Ok(frames)
}

struct StripJob {
    locator: MediaLocator,
    options: StripOptions,
    reply: oneshot::Sender<Result<Vec<DynamicImage>, VidcoverError>>,
}

/// Handle to a background filmstrip task.
///
/// Requests are served one at a time in arrival order. Dropping every
/// handle closes the channel and the task exits after its current job.
#[derive(Clone)]
pub struct StripWorker {
    sender: mpsc::Sender<StripJob>,
    handle: Arc<JoinHandle<()>>,
}

impl StripWorker {
    /// Start the worker on the current Tokio runtime.
    pub fn spawn<P>(probe: Arc<P>) -> Self
    where
        P: VideoProbe + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<StripJob>(REQUEST_CHANNEL_CAPACITY);

        let handle = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let result = extract_strip(probe.as_ref(), &job.locator, job.options).await;
                // The requester may have given up waiting.
                let _ = job.reply.send(result);
            }
            log::debug!("Filmstrip worker stopped");
        });

        Self {
            sender,
            handle: Arc::new(handle),
        }
    }

    /// Whether the background task has exited, e.g. after a backend panic.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the worker for a filmstrip and wait for the answer.
    ///
    /// # Errors
    ///
    /// Returns [`VidcoverError::WorkerUnavailable`] if the worker has
    /// stopped, or the extraction error.
    pub async fn request(
        &self,
        locator: MediaLocator,
        options: StripOptions,
    ) -> Result<Vec<DynamicImage>, VidcoverError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(StripJob {
                locator,
                options,
                reply,
            })
            .await
            .map_err(|_| VidcoverError::WorkerUnavailable)?;
        response.await.map_err(|_| VidcoverError::WorkerUnavailable)?
    }
}
