//! Video store integration tests, driven by a mock decoder.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockProbe, MockVideo, RecordingProgress, video_file};
use vidcover::{
    DEFAULT_COVER_OFFSET, EncodedImage, ImageEncoding, PassProgress, ProcessingOptions, RecordId,
    SourceFile, UploadStatus, VidcoverError, VideoStore,
};

fn store_with(probe: MockProbe) -> VideoStore<MockProbe> {
    VideoStore::new(probe, ProcessingOptions::new()).unwrap()
}

// ── Ingest ─────────────────────────────────────────────────────────

#[test]
fn ingest_rejects_non_video_files() {
    let store = store_with(MockProbe::new());
    let result = store.ingest(SourceFile::new("notes.txt", "text/plain", "notes.txt"));

    assert!(matches!(
        result,
        Err(VidcoverError::UnsupportedMediaType { ref media_type, .. }) if media_type == "text/plain"
    ));
    assert!(store.is_empty());
    assert_eq!(store.version(), 0);
}

#[test]
fn ingest_appends_an_unprocessed_record_with_defaults() {
    let store = store_with(MockProbe::new());
    let id = store.ingest(video_file("a.mp4")).unwrap();

    let record = store.get(id).unwrap();
    assert_eq!(record.source().name, "a.mp4");
    assert_eq!(record.locator().as_str(), "a.mp4");
    assert!(record.cover().is_none());
    assert_eq!(record.duration_seconds(), 0.0);
    assert!(!record.is_processed());
    assert_eq!(record.upload_progress(), 0);
    assert!(!record.is_uploading());
    assert_eq!(record.upload_status(), UploadStatus::Pending);
    assert_eq!(store.unprocessed_count(), 1);
}

#[test]
fn ingest_all_keeps_order_and_skips_rejections() {
    let store = store_with(MockProbe::new());
    let results = store.ingest_all([
        video_file("a.mp4"),
        SourceFile::new("song.mp3", "audio/mpeg", "song.mp3"),
        video_file("b.mp4"),
    ]);

    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());

    let names: Vec<_> = store
        .records()
        .iter()
        .map(|record| record.source().name.clone())
        .collect();
    assert_eq!(names, vec!["a.mp4", "b.mp4"]);
}

#[test]
fn zero_concurrency_is_rejected() {
    let result = VideoStore::new(
        MockProbe::new(),
        ProcessingOptions::new().with_concurrency(0),
    );
    assert!(matches!(result, Err(VidcoverError::InvalidConcurrency(0))));
}

// ── Reconcile ──────────────────────────────────────────────────────

#[tokio::test]
async fn reconcile_derives_duration_and_default_cover() {
    let probe = MockProbe::new()
        .with_video("a.mp4", MockVideo::new(12.5))
        .with_video("b.mp4", MockVideo::new(30.0));
    let store = store_with(probe);
    store.ingest(video_file("a.mp4")).unwrap();
    store.ingest(video_file("b.mp4")).unwrap();

    let summaries = store.reconcile().await;

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total, 2);
    assert_eq!(summaries[0].complete, 2);
    for record in store.records().iter() {
        assert!(record.is_processed());
        let cover = record.cover().expect("cover should be captured");
        assert_eq!(cover.encoding(), ImageEncoding::Png);
        assert!(!cover.is_empty());
    }
    assert_eq!(store.total_duration_seconds(), 42.5);
    assert_eq!(store.unprocessed_count(), 0);
    assert!(!store.progress().active);

    // Default covers are taken slightly past the start.
    assert!(
        store
            .backend()
            .seeks()
            .iter()
            .all(|(_, at)| *at == DEFAULT_COVER_OFFSET)
    );
}

#[tokio::test]
async fn reconcile_with_nothing_pending_does_no_work() {
    let store = store_with(MockProbe::new().with_video("a.mp4", MockVideo::new(1.0)));
    assert!(store.reconcile().await.is_empty());

    store.ingest(video_file("a.mp4")).unwrap();
    store.reconcile().await;
    let calls = store.backend().metadata_calls();

    assert!(store.reconcile().await.is_empty());
    assert_eq!(store.backend().metadata_calls(), calls);
}

#[tokio::test]
async fn partial_failures_are_patched_best_effort() {
    let probe = MockProbe::new()
        .with_video("no-meta.mp4", MockVideo::new(5.0).failing_metadata())
        .with_video("no-seek.mp4", MockVideo::new(7.0).failing_seek())
        .with_video("ok.mp4", MockVideo::new(3.0));
    let store = store_with(probe);
    let no_meta = store.ingest(video_file("no-meta.mp4")).unwrap();
    let no_seek = store.ingest(video_file("no-seek.mp4")).unwrap();
    let missing = store.ingest(video_file("missing.mp4")).unwrap();
    let ok = store.ingest(video_file("ok.mp4")).unwrap();

    let summaries = store.reconcile().await;
    assert_eq!(summaries[0].total, 4);
    assert_eq!(summaries[0].complete, 1);

    let record = store.get(no_meta).unwrap();
    assert!(record.is_processed());
    assert_eq!(record.duration_seconds(), 0.0);
    assert!(record.cover().is_some());

    let record = store.get(no_seek).unwrap();
    assert!(record.is_processed());
    assert_eq!(record.duration_seconds(), 7.0);
    assert!(record.cover().is_none());

    let record = store.get(missing).unwrap();
    assert!(record.is_processed());
    assert_eq!(record.duration_seconds(), 0.0);
    assert!(record.cover().is_none());

    assert!(store.get(ok).unwrap().cover().is_some());
    assert_eq!(store.total_duration_seconds(), 10.0);
}

#[tokio::test]
async fn zero_sized_frames_leave_the_cover_unset() {
    let probe = MockProbe::new().with_video("flat.mp4", MockVideo::new(2.0).without_dimensions());
    let store = store_with(probe);
    let id = store.ingest(video_file("flat.mp4")).unwrap();

    store.reconcile().await;

    let record = store.get(id).unwrap();
    assert!(record.is_processed());
    assert!(record.cover().is_none());
    assert_eq!(record.duration_seconds(), 2.0);
}

#[tokio::test]
async fn pass_respects_the_concurrency_limit() {
    let probe = (0..7).fold(MockProbe::new(), |probe, index| {
        probe.with_video(&format!("{index}.mp4"), MockVideo::new(1.0))
    });
    let store = VideoStore::new(probe, ProcessingOptions::new().with_concurrency(3)).unwrap();
    for index in 0..7 {
        store.ingest(video_file(&format!("{index}.mp4"))).unwrap();
    }

    let summaries = store.reconcile().await;

    assert_eq!(summaries[0].wave_sizes, vec![3, 3, 1]);
    assert_eq!(store.backend().max_in_flight(), 3);
}

#[tokio::test]
async fn reconcile_during_an_active_pass_returns_immediately() {
    let probe = MockProbe::new()
        .with_video("a.mp4", MockVideo::new(1.0))
        .with_video("late.mp4", MockVideo::new(2.0));
    let store = store_with(probe);
    store.ingest(video_file("a.mp4")).unwrap();

    let (first, (second, seen)) = tokio::join!(store.reconcile(), async {
        // The first pass is suspended inside the mock probe by now.
        let seen = store.progress();
        store.ingest(video_file("late.mp4")).unwrap();
        (store.reconcile().await, seen)
    });

    assert_eq!(
        seen,
        PassProgress {
            active: true,
            processed: 0,
            total: 1,
        }
    );
    assert!(second.is_empty());
    // The running reconcile picked up the late record in a second pass.
    assert_eq!(first.len(), 2);
    assert_eq!(first[1].total, 1);
    assert_eq!(store.unprocessed_count(), 0);
    assert_eq!(store.total_duration_seconds(), 3.0);

    let progress = store.progress();
    assert!(!progress.active);
    assert_eq!(progress.processed, progress.total);
}

#[tokio::test]
async fn progress_callback_counts_every_record() {
    let progress = Arc::new(RecordingProgress::default());
    let probe = MockProbe::new()
        .with_video("a.mp4", MockVideo::new(1.0))
        .with_video("b.mp4", MockVideo::new(1.0).failing_metadata());
    let store = VideoStore::new(
        probe,
        ProcessingOptions::new().with_progress(progress.clone()),
    )
    .unwrap();
    store.ingest(video_file("a.mp4")).unwrap();
    store.ingest(video_file("b.mp4")).unwrap();

    store.reconcile().await;

    assert_eq!(progress.updates(), vec![(0, 2), (1, 2), (2, 2)]);
}

// ── Covers ─────────────────────────────────────────────────────────

#[tokio::test]
async fn override_cover_changes_only_its_record() {
    let probe = MockProbe::new()
        .with_video("a.mp4", MockVideo::new(1.0))
        .with_video("b.mp4", MockVideo::new(1.0));
    let store = store_with(probe);
    let a = store.ingest(video_file("a.mp4")).unwrap();
    let b = store.ingest(video_file("b.mp4")).unwrap();
    store.reconcile().await;

    let before_b = store.get(b).unwrap();
    let version = store.version();
    let replacement = EncodedImage::from_bytes(ImageEncoding::Jpeg, vec![0xFF, 0xD8, 0xFF]);

    store.override_cover(a, replacement.clone()).unwrap();

    assert_eq!(store.get(a).unwrap().cover(), Some(&replacement));
    assert_eq!(store.get(b).unwrap(), before_b);
    assert_eq!(store.version(), version + 1);
}

#[tokio::test]
async fn override_cover_for_unknown_record_fails() {
    let store = store_with(MockProbe::new());
    let other = VideoStore::new(MockProbe::new(), ProcessingOptions::new()).unwrap();
    let foreign: RecordId = other.ingest(video_file("x.mp4")).unwrap();

    let result = store.override_cover(foreign, EncodedImage::from_bytes(ImageEncoding::Png, vec![1]));
    assert!(matches!(result, Err(VidcoverError::UnknownRecord(id)) if id == foreign));
}

#[tokio::test]
async fn capture_cover_is_clamped_to_the_duration() {
    let store = store_with(MockProbe::new().with_video("a.mp4", MockVideo::new(8.0)));
    let id = store.ingest(video_file("a.mp4")).unwrap();
    store.reconcile().await;

    let image = store.capture_cover(id, Duration::from_secs(60)).await.unwrap();

    assert_eq!(store.get(id).unwrap().cover(), Some(&image));
    let (_, last_seek) = store.backend().seeks().pop().unwrap();
    assert_eq!(last_seek, Duration::from_secs(8));
}

#[tokio::test]
async fn capture_cover_accepts_durations_beyond_duration_range() {
    let probe = MockProbe::new().with_video("huge.mp4", MockVideo::new(1.0).lasting(Duration::MAX));
    let store = store_with(probe);
    let id = store.ingest(video_file("huge.mp4")).unwrap();
    store.reconcile().await;
    assert!(store.get(id).unwrap().duration_seconds() >= u64::MAX as f64);

    let image = store.capture_cover(id, Duration::from_secs(5)).await.unwrap();

    assert_eq!(store.get(id).unwrap().cover(), Some(&image));
    let (_, last_seek) = store.backend().seeks().pop().unwrap();
    assert_eq!(last_seek, Duration::from_secs(5));
}

#[tokio::test]
async fn capture_cover_failure_leaves_the_store_unchanged() {
    let store = store_with(MockProbe::new().with_video("a.mp4", MockVideo::new(8.0)));
    let id = store.ingest(video_file("a.mp4")).unwrap();
    store.reconcile().await;

    store
        .backend()
        .insert("a.mp4", MockVideo::new(8.0).failing_seek());
    let before = store.get(id).unwrap();
    let version = store.version();

    let result = store.capture_cover(id, Duration::from_secs(2)).await;

    assert!(matches!(result, Err(VidcoverError::Load { .. })));
    assert_eq!(store.get(id).unwrap(), before);
    assert_eq!(store.version(), version);
}

#[tokio::test]
async fn jpeg_covers_follow_the_configured_encoding() {
    let store = VideoStore::new(
        MockProbe::new().with_video("a.mp4", MockVideo::new(1.0)),
        ProcessingOptions::new().with_encoding(ImageEncoding::Jpeg),
    )
    .unwrap();
    let id = store.ingest(video_file("a.mp4")).unwrap();
    store.reconcile().await;

    let cover = store.get(id).unwrap().cover().cloned().unwrap();
    assert_eq!(cover.encoding(), ImageEncoding::Jpeg);
    assert!(cover.to_data_url().starts_with("data:image/jpeg;base64,"));
}

// ── Snapshots ──────────────────────────────────────────────────────

#[tokio::test]
async fn snapshots_are_not_affected_by_later_patches() {
    let store = store_with(MockProbe::new().with_video("a.mp4", MockVideo::new(4.0)));
    store.ingest(video_file("a.mp4")).unwrap();

    let before = store.records();
    store.reconcile().await;

    assert!(!before[0].is_processed());
    assert!(store.records()[0].is_processed());
}
