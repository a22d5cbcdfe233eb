//! Thumbnail derivation for stored images.
//!
//! Thumbnails are a best-effort side product of an upload. A failure here is
//! reported to the caller but never undoes the save it follows; a record
//! without `thumb_path` is served from its original.

use std::io::Cursor;

use image::codecs::gif::GifEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Frame, GenericImageView, ImageFormat};
use thiserror::Error;

use crate::store::{ImageStore, ObjectRecord};
use crate::PicvaultError;

/// Default longest edge of a thumbnail, in pixels.
pub const DEFAULT_MAX_EDGE: u32 = 300;

/// Error raised while deriving a thumbnail.
#[derive(Error, Debug)]
pub enum ThumbnailError {
    /// The original could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The resized image could not be encoded.
    #[error("failed to encode thumbnail: {0}")]
    Encode(String),

    /// The thumbnail could not be stored or attached.
    #[error("failed to store thumbnail: {0}")]
    Storage(#[from] PicvaultError),
}

/// A rendered thumbnail, not yet stored.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Encoding used for `bytes`.
    pub format: ImageFormat,
}

/// Produces bounded-size copies of uploaded images.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailGenerator {
    max_edge: u32,
}

impl Default for ThumbnailGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EDGE)
    }
}

impl ThumbnailGenerator {
    /// Create a generator whose thumbnails fit in a `max_edge` square.
    pub fn new(max_edge: u32) -> Self {
        Self {
            max_edge: max_edge.max(1),
        }
    }

    /// Longest edge of generated thumbnails.
    pub fn max_edge(&self) -> u32 {
        self.max_edge
    }

    /// Decode, resize and re-encode `original`.
    ///
    /// Aspect ratio is preserved with Lanczos3 resampling. Images already
    /// within bounds keep their size. JPEG, PNG and GIF sources keep their
    /// codec; anything else is encoded as JPEG.
    pub fn render(&self, original: &[u8]) -> Result<Thumbnail, ThumbnailError> {
        let source_format =
            image::guess_format(original).map_err(|e| ThumbnailError::Decode(e.to_string()))?;
        let img = image::load_from_memory_with_format(original, source_format)
            .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

        let (width, height) = img.dimensions();
        let resized = if width <= self.max_edge && height <= self.max_edge {
            img
        } else {
            img.resize(self.max_edge, self.max_edge, FilterType::Lanczos3)
        };

        let format = output_format(source_format);
        let bytes = encode(&resized, format)?;
        let (width, height) = resized.dimensions();

        Ok(Thumbnail {
            bytes,
            width,
            height,
            format,
        })
    }

    /// Render a thumbnail for `record` and attach it in `store`.
    ///
    /// Returns the updated record.
    pub fn derive<S>(
        &self,
        store: &S,
        record: &ObjectRecord,
        original: &[u8],
    ) -> Result<ObjectRecord, ThumbnailError>
    where
        S: ImageStore + ?Sized,
    {
        let thumbnail = self.render(original)?;
        Ok(store.attach_thumbnail(&record.id, &thumbnail.bytes)?)
    }
}

fn output_format(source: ImageFormat) -> ImageFormat {
    match source {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif => source,
        _ => ImageFormat::Jpeg,
    }
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ThumbnailError> {
    let mut bytes = Vec::new();
    let encode_err = |e: image::ImageError| ThumbnailError::Encode(e.to_string());

    match format {
        ImageFormat::Gif => {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder
                .encode_frame(Frame::new(img.to_rgba8()))
                .map_err(encode_err)?;
        }
        // JPEG has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .map_err(encode_err)?,
        _ => img
            .write_to(&mut Cursor::new(&mut bytes), format)
            .map_err(encode_err)?,
    }

    Ok(bytes)
}
