//! Error types for the `vidcover` crate.
//!
//! This module defines [`VidcoverError`], the unified error type returned by
//! all fallible operations in the crate. Probe failures carry the locator
//! they were raised for so a log line is enough to find the offending file.

use std::io::Error as IoError;

use image::ImageError;
use thiserror::Error;

use crate::record::RecordId;

/// The unified error type for all `vidcover` operations.
///
/// Per-record probe failures (`MetadataLoad`, `Load`, `FrameCapture`) are
/// swallowed by [`VideoStore::reconcile`](crate::VideoStore::reconcile) and
/// only surface through the log. Everything else is returned to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VidcoverError {
    /// The ingested file is not a video. Nothing was added to the store.
    #[error("Unsupported media type {media_type:?} for {name}: only video files are accepted")]
    UnsupportedMediaType {
        /// File name as reported by the caller.
        name: String,
        /// The rejected media type.
        media_type: String,
    },

    /// The resource failed before its metadata became available.
    #[error("Failed to load video metadata from {locator}: {reason}")]
    MetadataLoad {
        /// Locator that was being probed.
        locator: String,
        /// Underlying reason.
        reason: String,
    },

    /// The resource failed to load while seeking for a frame.
    #[error("Failed to load video from {locator}: {reason}")]
    Load {
        /// Locator that was being loaded.
        locator: String,
        /// Underlying reason.
        reason: String,
    },

    /// A frame could not be drawn or encoded.
    #[error("Failed to capture frame: {0}")]
    FrameCapture(String),

    /// The resource does not contain a video stream.
    #[error("No video stream found in {0}")]
    NoVideoStream(String),

    /// A concurrency limit of zero was requested.
    #[error("Concurrency limit must be greater than zero (got {0})")]
    InvalidConcurrency(usize),

    /// A filmstrip with zero frames was requested.
    #[error("Frame count must be greater than zero")]
    InvalidFrameCount,

    /// No record with this id exists in the store.
    #[error("No video record with id {0}")]
    UnknownRecord(RecordId),

    /// A submit was requested on an empty collection.
    #[error("There are no videos to submit")]
    NothingToSubmit,

    /// The background filmstrip worker has shut down.
    #[error("Filmstrip worker is no longer running")]
    WorkerUnavailable,

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding or resizing a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for VidcoverError {
    fn from(error: ffmpeg_next::Error) -> Self {
        VidcoverError::FfmpegError(error.to_string())
    }
}
