//! Video metadata returned by [`VideoProbe::load_metadata`](crate::VideoProbe::load_metadata).

use std::time::Duration;

/// What a probe learns about a video before any frame is decoded.
///
/// Only `duration` is required by the processing pass; the remaining
/// fields are informational and may be zero or empty when the backend
/// cannot determine them.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Total playable duration.
    pub duration: Duration,
    /// Intrinsic frame width in pixels.
    pub width: u32,
    /// Intrinsic frame height in pixels.
    pub height: u32,
    /// Average frame rate, `0.0` when unknown.
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

impl VideoMetadata {
    /// Metadata carrying only a duration.
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            width: 0,
            height: 0,
            frames_per_second: 0.0,
            codec: String::new(),
            format: String::new(),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
