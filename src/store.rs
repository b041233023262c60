//! The video collection store.
//!
//! [`VideoStore`] owns the ordered list of [`VideoRecord`]s and coordinates
//! processing. The list lives behind a single mutex as a versioned
//! `Arc<Vec<_>>`; every mutation goes through [`VideoStore::patch`], which
//! copies on write and replaces exactly one record by id. Concurrent probes
//! each patch only their own record, so their updates commute.
//!
//! Processing is triggered explicitly: call [`VideoStore::reconcile`] after
//! ingesting. A pass covers the records that were unprocessed when it
//! started; when it completes, the store looks again and starts another
//! pass if more records arrived in the meantime.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), vidcover::VidcoverError> {
//! use vidcover::{FfmpegProbe, ProcessingOptions, SourceFile, VideoStore, format_duration};
//!
//! let store = VideoStore::new(FfmpegProbe::new()?, ProcessingOptions::new())?;
//! store.ingest(SourceFile::from_path("a.mp4")?)?;
//! store.ingest(SourceFile::from_path("b.mkv")?)?;
//! store.reconcile().await;
//!
//! println!("total: {}", format_duration(store.total_duration_seconds()));
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_stream::StreamExt;

use crate::batch::BatchRunner;
use crate::capture::EncodedImage;
use crate::config::ProcessingOptions;
use crate::error::VidcoverError;
use crate::probe::{MediaProber, ProbeReport, VideoProbe};
use crate::progress::{OperationType, ProgressTracker};
use crate::record::{MediaLocator, RecordId, SourceFile, UploadStatus, VideoRecord};
use crate::upload::{SubmitSummary, UploadEvent, UploadRequest, Uploader};

/// Progress of the current (or most recent) processing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassProgress {
    /// Whether a pass is running right now.
    pub active: bool,
    /// Records settled in the current pass.
    pub processed: usize,
    /// Records the current pass set out to process.
    pub total: usize,
}

/// Summary of one completed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    /// Records probed in this pass.
    pub total: usize,
    /// Records where both duration and cover were derived.
    pub complete: usize,
    /// Sizes of the waves the pass ran in.
    pub wave_sizes: Vec<usize>,
}

#[derive(Default)]
struct StoreState {
    records: Arc<Vec<VideoRecord>>,
    version: u64,
    pass: PassProgress,
}

/// Ordered, concurrently patchable collection of video records.
pub struct VideoStore<P> {
    prober: MediaProber<P>,
    runner: BatchRunner,
    options: ProcessingOptions,
    state: Mutex<StoreState>,
}

impl<P> std::fmt::Debug for VideoStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("VideoStore")
            .field("records", &state.records.len())
            .field("version", &state.version)
            .field("pass", &state.pass)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Clears the active flag when a pass ends, even if its future is dropped.
struct PassGuard<'a> {
    state: &'a Mutex<StoreState>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pass
            .active = false;
    }
}

impl<P: VideoProbe> VideoStore<P> {
    /// Create an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`VidcoverError::InvalidConcurrency`] if the configured
    /// concurrency is zero.
    pub fn new(backend: P, options: ProcessingOptions) -> Result<Self, VidcoverError> {
        let runner = BatchRunner::new(options.concurrency)?;
        Ok(Self {
            prober: MediaProber::new(backend, &options),
            runner,
            options,
            state: Mutex::new(StoreState::default()),
        })
    }

    /// The decoder backing this store.
    pub fn backend(&self) -> &P {
        self.prober.backend()
    }

    /// Accept a file and append an unprocessed record for it.
    ///
    /// # Errors
    ///
    /// Returns [`VidcoverError::UnsupportedMediaType`] if the media type
    /// does not start with `video/`; nothing is inserted in that case.
    pub fn ingest(&self, file: SourceFile) -> Result<RecordId, VidcoverError> {
        if !file.is_video() {
            log::warn!("Rejecting {} ({}): not a video", file.name, file.media_type);
            return Err(VidcoverError::UnsupportedMediaType {
                name: file.name,
                media_type: file.media_type,
            });
        }

        let record = VideoRecord::new(file);
        let id = record.id();
        log::debug!("Ingested {} as {id}", record.source().name);

        let mut state = self.lock();
        Arc::make_mut(&mut state.records).push(record);
        state.version += 1;
        Ok(id)
    }

    /// Ingest several files. Rejected files do not stop the others.
    pub fn ingest_all<I>(&self, files: I) -> Vec<Result<RecordId, VidcoverError>>
    where
        I: IntoIterator<Item = SourceFile>,
    {
        files.into_iter().map(|file| self.ingest(file)).collect()
    }

    /// Process every unprocessed record.
    ///
    /// Runs passes until no unprocessed record remains. Returns immediately
    /// with an empty list if another pass is already active; that pass picks
    /// up the new records when it completes.
    pub async fn reconcile(&self) -> Vec<PassSummary> {
        let mut summaries = Vec::new();

        loop {
            let pending = {
                let mut state = self.lock();
                if state.pass.active {
                    break;
                }
                let pending: Vec<(RecordId, MediaLocator)> = state
                    .records
                    .iter()
                    .filter(|record| !record.is_processed())
                    .map(|record| (record.id(), record.locator().clone()))
                    .collect();
                if pending.is_empty() {
                    break;
                }
                state.pass = PassProgress {
                    active: true,
                    processed: 0,
                    total: pending.len(),
                };
                pending
            };

            let _guard = PassGuard { state: &self.state };
            summaries.push(self.run_pass(pending).await);
        }

        summaries
    }

    async fn run_pass(&self, pending: Vec<(RecordId, MediaLocator)>) -> PassSummary {
        let total = pending.len();
        log::debug!("Starting processing pass over {total} records");

        let tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::Probing,
            total as u64,
        );
        tracker.start();

        let this = self;
        let tracker = &tracker;
        let outcome = self
            .runner
            .run(pending, move |(id, locator)| async move {
                let report = this.prober.probe(&locator).await;
                let complete = report.is_complete();
                this.apply_probe(id, &locator, report);
                this.lock().pass.processed += 1;
                tracker.advance();
                complete
            })
            .await;

        let complete = outcome.outputs.iter().filter(|complete| **complete).count();
        log::debug!("Processing pass finished: {complete}/{total} complete");

        PassSummary {
            total,
            complete,
            wave_sizes: outcome.wave_sizes,
        }
    }

    fn apply_probe(&self, id: RecordId, locator: &MediaLocator, report: ProbeReport) {
        let ProbeReport { duration, cover } = report;
        if let Err(error) = &duration {
            log::warn!("Keeping default duration for {locator}: {error}");
        }
        if let Err(error) = &cover {
            log::warn!("Keeping default cover for {locator}: {error}");
        }

        let patched = self.patch(id, |record| {
            if let Ok(seconds) = duration {
                record.set_duration(seconds);
            }
            if let Ok(cover) = cover {
                record.cover = Some(cover);
            }
            record.mark_processed();
        });
        if let Err(error) = patched {
            log::warn!("Dropping probe result: {error}");
        }
    }

    /// Replace the cover of one record.
    ///
    /// # Errors
    ///
    /// Returns [`VidcoverError::UnknownRecord`] if no record has this id.
    pub fn override_cover(&self, id: RecordId, image: EncodedImage) -> Result<(), VidcoverError> {
        self.patch(id, |record| record.cover = Some(image))
    }

    /// Capture the frame at `at` and make it the record's cover.
    ///
    /// `at` is clamped to the record's known duration. On any failure the
    /// error is returned and the store is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`VidcoverError::UnknownRecord`], [`VidcoverError::Load`] or
    /// [`VidcoverError::FrameCapture`].
    pub async fn capture_cover(
        &self,
        id: RecordId,
        at: Duration,
    ) -> Result<EncodedImage, VidcoverError> {
        let (locator, duration_seconds) = {
            let state = self.lock();
            let record = find(&state.records, id)?;
            (record.locator().clone(), record.duration_seconds())
        };

        let at = if duration_seconds > 0.0 {
            Duration::try_from_secs_f64(duration_seconds).map_or(at, |duration| at.min(duration))
        } else {
            at
        };

        let image = self.prober.capture_at(&locator, at).await?;
        self.override_cover(id, image.clone())?;
        log::debug!("Cover for {id} replaced with frame at {at:?}");
        Ok(image)
    }

    /// Mark every record as uploading with zero progress.
    ///
    /// # Errors
    ///
    /// Returns [`VidcoverError::NothingToSubmit`] if the store is empty.
    pub fn begin_submit(&self) -> Result<Vec<UploadRequest>, VidcoverError> {
        let mut state = self.lock();
        if state.records.is_empty() {
            return Err(VidcoverError::NothingToSubmit);
        }

        let records = Arc::make_mut(&mut state.records);
        for record in records.iter_mut() {
            record.uploading = true;
            record.upload_status = UploadStatus::Uploading;
            record.upload_progress = 0;
        }
        let requests = records.iter().map(UploadRequest::for_record).collect();
        state.version += 1;
        Ok(requests)
    }

    /// Upload every record through `uploader`.
    ///
    /// Streams are driven in waves of the configured concurrency. A stream
    /// that ends without [`UploadEvent::Completed`] counts as failed.
    ///
    /// # Errors
    ///
    /// Returns [`VidcoverError::NothingToSubmit`] if the store is empty.
    pub async fn submit<U: Uploader>(&self, uploader: &U) -> Result<SubmitSummary, VidcoverError> {
        let requests = self.begin_submit()?;
        let tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::Uploading,
            requests.len() as u64,
        );
        tracker.start();

        let this = self;
        let tracker = &tracker;
        let outcome = self
            .runner
            .run(requests, move |request| async move {
                let id = request.id;
                let mut events = std::pin::pin!(uploader.upload(request));
                let mut status = UploadStatus::Error;

                while let Some(event) = events.next().await {
                    status = this.apply_upload_event(id, event);
                    if status != UploadStatus::Uploading {
                        break;
                    }
                }

                let finished = this.patch(id, |record| {
                    record.uploading = false;
                    if record.upload_status == UploadStatus::Uploading {
                        record.upload_status = UploadStatus::Error;
                    }
                });
                if let Err(error) = finished {
                    log::warn!("Dropping upload result: {error}");
                }
                tracker.advance();
                status == UploadStatus::Success
            })
            .await;

        let succeeded = outcome.outputs.iter().filter(|ok| **ok).count();
        Ok(SubmitSummary {
            succeeded,
            failed: outcome.outputs.len() - succeeded,
        })
    }

    fn apply_upload_event(&self, id: RecordId, event: UploadEvent) -> UploadStatus {
        let mut status = UploadStatus::Error;
        let patched = self.patch(id, |record| {
            match event {
                UploadEvent::Progress(percent) => record.upload_progress = percent.min(100),
                UploadEvent::Completed => {
                    record.upload_progress = 100;
                    record.upload_status = UploadStatus::Success;
                }
                UploadEvent::Failed(reason) => {
                    log::warn!("Upload of {} failed: {reason}", record.source().name);
                    record.upload_status = UploadStatus::Error;
                }
            }
            status = record.upload_status;
        });
        if let Err(error) = patched {
            log::warn!("Dropping upload event: {error}");
        }
        status
    }

    /// Copy-on-write replace of one record by id. The single mutation path
    /// for existing records.
    fn patch<F>(&self, id: RecordId, update: F) -> Result<(), VidcoverError>
    where
        F: FnOnce(&mut VideoRecord),
    {
        let mut state = self.lock();
        let index = state
            .records
            .iter()
            .position(|record| record.id() == id)
            .ok_or(VidcoverError::UnknownRecord(id))?;

        update(&mut Arc::make_mut(&mut state.records)[index]);
        state.version += 1;
        Ok(())
    }
}

impl<P> VideoStore<P> {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of all records in insertion order.
    pub fn records(&self) -> Arc<Vec<VideoRecord>> {
        Arc::clone(&self.lock().records)
    }

    /// Snapshot of one record.
    pub fn get(&self, id: RecordId) -> Option<VideoRecord> {
        find(&self.lock().records, id).ok().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Number of mutations applied so far.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn progress(&self) -> PassProgress {
        self.lock().pass
    }

    /// Records still waiting for a pass.
    pub fn unprocessed_count(&self) -> usize {
        self.lock()
            .records
            .iter()
            .filter(|record| !record.is_processed())
            .count()
    }

    /// Sum of every record's duration, recomputed on each call.
    pub fn total_duration_seconds(&self) -> f64 {
        self.lock()
            .records
            .iter()
            .map(VideoRecord::duration_seconds)
            .sum()
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }
}

fn find(records: &[VideoRecord], id: RecordId) -> Result<&VideoRecord, VidcoverError> {
    records
        .iter()
        .find(|record| record.id() == id)
        .ok_or(VidcoverError::UnknownRecord(id))
}
