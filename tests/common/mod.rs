//! Shared test doubles.
//!
//! [`MockProbe`] stands in for a decoder: videos are registered by locator
//! with a duration and frame size, and any step can be made to fail.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::DynamicImage;
use vidcover::{
    FrameSurface, MediaLocator, ProgressCallback, ProgressInfo, SourceFile, VidcoverError,
    VideoMetadata, VideoProbe,
};

#[derive(Debug, Clone)]
pub struct MockVideo {
    pub duration: Duration,
    pub width: u32,
    pub height: u32,
    pub fail_metadata: bool,
    pub fail_seek: bool,
}

impl MockVideo {
    pub fn new(seconds: f64) -> Self {
        Self {
            duration: Duration::from_secs_f64(seconds),
            width: 32,
            height: 18,
            fail_metadata: false,
            fail_seek: false,
        }
    }

    pub fn lasting(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn failing_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    pub fn failing_seek(mut self) -> Self {
        self.fail_seek = true;
        self
    }

    /// Frames decode with zero intrinsic dimensions.
    pub fn without_dimensions(mut self) -> Self {
        self.width = 0;
        self.height = 0;
        self
    }
}

#[derive(Debug, Default)]
pub struct MockProbe {
    videos: Mutex<HashMap<String, MockVideo>>,
    seeks: Mutex<Vec<(String, Duration)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    metadata_calls: AtomicUsize,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(self, path: &str, video: MockVideo) -> Self {
        self.insert(path, video);
        self
    }

    pub fn insert(&self, path: &str, video: MockVideo) {
        self.videos
            .lock()
            .unwrap()
            .insert(path.to_string(), video);
    }

    /// Every `(locator, target)` passed to `seek_and_capture`, in call order.
    pub fn seeks(&self) -> Vec<(String, Duration)> {
        self.seeks.lock().unwrap().clone()
    }

    /// Highest number of `load_metadata` calls running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    fn video(&self, locator: &MediaLocator) -> Option<MockVideo> {
        self.videos.lock().unwrap().get(locator.as_str()).cloned()
    }
}

impl VideoProbe for MockProbe {
    async fn load_metadata(&self, locator: &MediaLocator) -> Result<VideoMetadata, VidcoverError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        // Let the rest of the wave start before this call settles.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.video(locator) {
            Some(video) if !video.fail_metadata => Ok(VideoMetadata {
                duration: video.duration,
                width: video.width,
                height: video.height,
                frames_per_second: 25.0,
                codec: "mock".to_string(),
                format: "mock".to_string(),
            }),
            _ => Err(VidcoverError::MetadataLoad {
                locator: locator.to_string(),
                reason: "unreadable".to_string(),
            }),
        }
    }

    async fn seek_and_capture(
        &self,
        locator: &MediaLocator,
        at: Duration,
    ) -> Result<FrameSurface, VidcoverError> {
        self.seeks
            .lock()
            .unwrap()
            .push((locator.to_string(), at));
        tokio::task::yield_now().await;

        match self.video(locator) {
            Some(video) if !video.fail_seek => Ok(FrameSurface::new(
                DynamicImage::new_rgb8(video.width, video.height),
                at,
            )),
            _ => Err(VidcoverError::Load {
                locator: locator.to_string(),
                reason: "seek failed".to_string(),
            }),
        }
    }
}

pub fn video_file(path: &str) -> SourceFile {
    SourceFile::new(path, "video/mp4", path)
}

/// Records every `(current, total)` pair it is notified with.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub updates: Mutex<Vec<(u64, u64)>>,
}

impl RecordingProgress {
    pub fn updates(&self) -> Vec<(u64, u64)> {
        self.updates.lock().unwrap().clone()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.updates
            .lock()
            .unwrap()
            .push((info.current, info.total));
    }
}
