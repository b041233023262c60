//! Per-video records and the handles they own.
//!
//! A [`VideoRecord`] is created for every accepted file. Its identity,
//! source file and locator never change; the probe results, the cover and
//! the upload fields are patched by the [`VideoStore`](crate::VideoStore).

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::capture::EncodedImage;
use crate::error::VidcoverError;

/// Opaque, unique identifier assigned to a record at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl RecordId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

/// A raw input file as handed over by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Display name (usually the file name).
    pub name: String,
    /// MIME-like media type, e.g. `"video/mp4"`.
    pub media_type: String,
    /// Where the bytes live.
    pub path: PathBuf,
    /// Size in bytes, `0` when unknown.
    pub size: u64,
}

impl SourceFile {
    /// Describe a file with an explicit media type.
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            path: path.into(),
            size: 0,
        }
    }

    /// Describe a file on disk, deriving its media type from the extension.
    ///
    /// # Errors
    ///
    /// Returns [`VidcoverError::IoError`] if the file's metadata cannot be
    /// read.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, VidcoverError> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            media_type: media_type_for_path(path).to_string(),
            path: path.to_path_buf(),
            size,
        })
    }

    /// Whether the media type denotes a video.
    pub fn is_video(&self) -> bool {
        self.media_type.starts_with("video/")
    }
}

/// Guess a media type from a file extension.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "ogv" => "video/ogg",
        "mpeg" | "mpg" => "video/mpeg",
        "flv" => "video/x-flv",
        "ts" => "video/mp2t",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// A dereferenceable handle a [`VideoProbe`](crate::VideoProbe) can open.
///
/// Holds a filesystem path or a URL string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaLocator(String);

impl MediaLocator {
    /// Wrap an arbitrary path or URL.
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Derive the locator for a source file.
    pub fn for_file(file: &SourceFile) -> Self {
        Self(file.path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MediaLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Status of the submit phase for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Pending,
    Uploading,
    Success,
    Error,
}

/// One ingested video and everything derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    id: RecordId,
    source: SourceFile,
    locator: MediaLocator,
    pub(crate) cover: Option<EncodedImage>,
    pub(crate) duration_seconds: f64,
    processed: bool,
    pub(crate) upload_progress: u8,
    pub(crate) uploading: bool,
    pub(crate) upload_status: UploadStatus,
}

impl VideoRecord {
    pub(crate) fn new(source: SourceFile) -> Self {
        let locator = MediaLocator::for_file(&source);
        Self {
            id: RecordId::new(),
            source,
            locator,
            cover: None,
            duration_seconds: 0.0,
            processed: false,
            upload_progress: 0,
            uploading: false,
            upload_status: UploadStatus::Pending,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn locator(&self) -> &MediaLocator {
        &self.locator
    }

    /// Current cover, `None` until probing or a manual override provides one.
    pub fn cover(&self) -> Option<&EncodedImage> {
        self.cover.as_ref()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Whether probing has settled for this record.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Upload progress in percent.
    pub fn upload_progress(&self) -> u8 {
        self.upload_progress
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn upload_status(&self) -> UploadStatus {
        self.upload_status
    }

    /// Flip `processed` to `true`. Returns `false` if it already was.
    pub(crate) fn mark_processed(&mut self) -> bool {
        !std::mem::replace(&mut self.processed, true)
    }

    /// Store a probed duration, clamping garbage to zero.
    pub(crate) fn set_duration(&mut self, seconds: f64) {
        self.duration_seconds = if seconds.is_finite() && seconds > 0.0 {
            seconds
        } else {
            0.0
        };
    }
}
