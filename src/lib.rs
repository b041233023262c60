//! # vidcover
//!
//! Derive durations and cover thumbnails for batches of video files.
//!
//! `vidcover` keeps an ordered collection of video records, probes each one
//! for its duration and a default cover (a frame taken slightly past the
//! start to skip the black first frame), and lets callers replace a cover
//! with any frame they pick. Probing runs in fixed-width waves so no more
//! than a configured number of files are decoded at once. Decoding is done by
//! FFmpeg via [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) behind the
//! [`VideoProbe`] trait, which other backends can implement.
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), vidcover::VidcoverError> {
//! use std::time::Duration;
//!
//! use vidcover::{FfmpegProbe, ProcessingOptions, SourceFile, VideoStore, format_duration};
//!
//! let store = VideoStore::new(FfmpegProbe::new()?, ProcessingOptions::new())?;
//! let id = store.ingest(SourceFile::from_path("holiday.mp4")?)?;
//! store.reconcile().await;
//!
//! // Not happy with the default cover? Pick the frame at 12 seconds.
//! store.capture_cover(id, Duration::from_secs(12)).await?;
//!
//! println!("total: {}", format_duration(store.total_duration_seconds()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Bounded batches**: [`BatchRunner`] runs waves of at most `limit`
//!   actions and never aborts on a failing item
//! - **Best-effort probing**: a file that fails to probe is still marked
//!   processed and keeps its defaults
//! - **Manual covers**: [`VideoStore::capture_cover`] and
//!   [`VideoStore::override_cover`]
//! - **Filmstrips**: [`StripWorker`] extracts evenly spaced preview frames
//!   on a background task
//! - **Upload tracking**: the [`Uploader`] trait and
//!   [`VideoStore::submit`] drive per-record upload progress
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | [`FfmpegProbe`] and the `vidcover` binary (enabled by default) |

pub mod batch;
pub mod capture;
pub mod config;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_probe;
pub mod metadata;
pub mod probe;
pub mod progress;
pub mod record;
pub mod store;
pub mod strip;
pub mod timecode;
pub mod upload;

pub use batch::{BatchOutcome, BatchRunner};
pub use capture::{EncodedImage, FrameSurface, ImageEncoding, capture_frame};
pub use config::{DEFAULT_CONCURRENCY, DEFAULT_COVER_OFFSET, ProcessingOptions};
pub use error::VidcoverError;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg_probe::FfmpegProbe;
pub use metadata::VideoMetadata;
pub use probe::{MediaProber, ProbeReport, VideoProbe};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use record::{MediaLocator, RecordId, SourceFile, UploadStatus, VideoRecord, media_type_for_path};
pub use store::{PassProgress, PassSummary, VideoStore};
pub use strip::{StripOptions, StripWorker, extract_strip, strip_timestamps};
pub use timecode::{format_duration, parse_timecode};
pub use upload::{SubmitSummary, UploadEvent, UploadMetadata, UploadRequest, Uploader};
