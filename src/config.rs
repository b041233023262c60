//! Processing configuration.
//!
//! [`ProcessingOptions`] is a builder that threads the concurrency limit,
//! cover settings and progress callback into a
//! [`VideoStore`](crate::VideoStore) without widening every signature.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use vidcover::{ImageEncoding, ProcessingOptions};
//!
//! let options = ProcessingOptions::new()
//!     .with_concurrency(4)
//!     .with_cover_offset(Duration::from_millis(500))
//!     .with_encoding(ImageEncoding::Jpeg);
//! assert_eq!(options.concurrency(), 4);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::ImageEncoding;
use crate::progress::{NoOpProgress, ProgressCallback};

/// Videos probed at once in a pass unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Where the default cover is taken. Skips the black first frame most
/// encoders emit.
pub const DEFAULT_COVER_OFFSET: Duration = Duration::from_millis(100);

/// Settings for processing passes and submits.
#[derive(Clone)]
pub struct ProcessingOptions {
    /// Maximum items in flight per wave.
    pub(crate) concurrency: usize,
    /// Seek target for the default cover.
    pub(crate) cover_offset: Duration,
    /// Raster encoding for covers.
    pub(crate) encoding: ImageEncoding,
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for ProcessingOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ProcessingOptions")
            .field("concurrency", &self.concurrency)
            .field("cover_offset", &self.cover_offset)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingOptions {
    /// Defaults: concurrency 10, cover at 0.1 s, PNG, no progress callback.
    pub fn new() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            cover_offset: DEFAULT_COVER_OFFSET,
            encoding: ImageEncoding::Png,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the wave width. Zero is rejected when the store is created.
    #[must_use]
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit;
        self
    }

    #[must_use]
    pub fn with_cover_offset(mut self, offset: Duration) -> Self {
        self.cover_offset = offset;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Attach a progress callback, invoked once per settled item.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn cover_offset(&self) -> Duration {
        self.cover_offset
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }
}
