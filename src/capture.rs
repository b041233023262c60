//! Frame capture.
//!
//! Turns a decoded [`FrameSurface`] into an [`EncodedImage`] at the frame's
//! native resolution. This is the only place covers are encoded; both the
//! automatic probe and the manual override go through [`capture_frame`].

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::Cursor,
    time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};

use crate::error::VidcoverError;

/// A decoded video frame, ready to be drawn.
#[derive(Debug, Clone)]
pub struct FrameSurface {
    /// Pixels at the video's intrinsic resolution.
    pub image: DynamicImage,
    /// Presentation time of the frame.
    pub timestamp: Duration,
}

impl FrameSurface {
    pub fn new(image: DynamicImage, timestamp: Duration) -> Self {
        Self { image, timestamp }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Raster encoding used for covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncoding {
    /// Lossless PNG. This is the default.
    #[default]
    Png,
    /// Baseline JPEG.
    Jpeg,
}

impl ImageEncoding {
    /// MIME type of the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageEncoding::Png => "image/png",
            ImageEncoding::Jpeg => "image/jpeg",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::Png => "png",
            ImageEncoding::Jpeg => "jpg",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ImageEncoding::Png => ImageFormat::Png,
            ImageEncoding::Jpeg => ImageFormat::Jpeg,
        }
    }
}

impl Display for ImageEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

/// An encoded still image.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    encoding: ImageEncoding,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("EncodedImage")
            .field("encoding", &self.encoding)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl EncodedImage {
    /// Wrap bytes that are already encoded, e.g. a cover chosen elsewhere.
    pub fn from_bytes(encoding: ImageEncoding, bytes: Vec<u8>) -> Self {
        Self { encoding, bytes }
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render as a `data:` URL with standard base64.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.encoding.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Encode the frame currently held by `surface`.
///
/// # Errors
///
/// Returns [`VidcoverError::FrameCapture`] if the surface has zero width or
/// height, or if encoding fails.
pub fn capture_frame(
    surface: &FrameSurface,
    encoding: ImageEncoding,
) -> Result<EncodedImage, VidcoverError> {
    let (width, height) = (surface.width(), surface.height());
    if width == 0 || height == 0 {
        return Err(VidcoverError::FrameCapture(format!(
            "frame at {:?} has no pixels ({width}x{height})",
            surface.timestamp
        )));
    }

    let mut bytes = Cursor::new(Vec::new());
    let written = match encoding {
        // JPEG has no alpha channel.
        ImageEncoding::Jpeg => DynamicImage::ImageRgb8(surface.image.to_rgb8())
            .write_to(&mut bytes, encoding.image_format()),
        ImageEncoding::Png => surface.image.write_to(&mut bytes, encoding.image_format()),
    };
    written.map_err(|error| VidcoverError::FrameCapture(error.to_string()))?;

    log::debug!(
        "Captured {width}x{height} frame at {:?} as {encoding} ({} bytes)",
        surface.timestamp,
        bytes.get_ref().len()
    );

    Ok(EncodedImage {
        encoding,
        bytes: bytes.into_inner(),
    })
}
