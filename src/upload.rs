//! The submit boundary.
//!
//! No transport ships with this crate. An [`Uploader`] receives one
//! [`UploadRequest`] per record and answers with a stream of
//! [`UploadEvent`]s; [`VideoStore::submit`](crate::VideoStore::submit)
//! applies those events to the records.
//!
//! # Example
//!
//! ```
//! use tokio_stream::Iter;
//! use vidcover::{UploadEvent, UploadRequest, Uploader};
//!
//! struct InstantUploader;
//!
//! impl Uploader for InstantUploader {
//!     type Events = Iter<std::vec::IntoIter<UploadEvent>>;
//!
//!     fn upload(&self, _request: UploadRequest) -> Self::Events {
//!         tokio_stream::iter(vec![UploadEvent::Progress(50), UploadEvent::Completed])
//!     }
//! }
//! ```

use tokio_stream::Stream;

use crate::capture::EncodedImage;
use crate::record::{RecordId, SourceFile, VideoRecord};

/// Descriptive fields sent along with the file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    pub name: String,
    pub media_type: String,
    pub duration_seconds: f64,
}

/// Everything an uploader needs for one record.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub id: RecordId,
    pub file: SourceFile,
    /// The cover at the time of submit, if any.
    pub cover: Option<EncodedImage>,
    pub metadata: UploadMetadata,
}

impl UploadRequest {
    pub(crate) fn for_record(record: &VideoRecord) -> Self {
        let source = record.source();
        Self {
            id: record.id(),
            file: source.clone(),
            cover: record.cover().cloned(),
            metadata: UploadMetadata {
                name: source.name.clone(),
                media_type: source.media_type.clone(),
                duration_seconds: record.duration_seconds(),
            },
        }
    }
}

/// One step of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Percent transferred. Values above 100 are clamped.
    Progress(u8),
    /// The remote side accepted the file.
    Completed,
    /// The upload failed.
    Failed(String),
}

/// Transmits a record's file and cover somewhere.
pub trait Uploader: Send + Sync {
    type Events: Stream<Item = UploadEvent> + Send;

    fn upload(&self, request: UploadRequest) -> Self::Events;
}

/// Tally of a finished submit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitSummary {
    pub succeeded: usize,
    pub failed: usize,
}
