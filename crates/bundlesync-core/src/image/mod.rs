//! Raster images and the codec seam used for texture artifacts.
//!
//! Container backends hand out decoded RGBA pixels; the engines only ever
//! convert those to and from PNG artifact bytes through an [`ImageCodec`].

pub mod png;

pub use png::PngCodec;

use serde::Deserialize;
use serde::Serialize;

use crate::Result;
use crate::SyncError;

/// A decoded 8-bit RGBA image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RasterImage {
    /// Creates an image from tightly packed RGBA rows.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ImageCodec` if `rgba` does not hold exactly
    /// `width * height * 4` bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use bundlesync_core::image::RasterImage;
    ///
    /// let img = RasterImage::new(1, 1, vec![255, 0, 0, 255]).unwrap();
    /// assert_eq!(img.pixel(0, 0), Some([255, 0, 0, 255]));
    /// assert!(RasterImage::new(2, 2, vec![0; 3]).is_err());
    /// ```
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let image = Self {
            width,
            height,
            rgba,
        };
        image.validate()?;
        Ok(image)
    }

    /// Checks that the pixel buffer matches the declared dimensions.
    ///
    /// Images deserialized from external sources bypass [`RasterImage::new`],
    /// so callers re-validate them here.
    pub fn validate(&self) -> Result<()> {
        let expected = Self::buffer_len(self.width, self.height)?;
        if self.rgba.len() != expected {
            return Err(SyncError::ImageCodec(format!(
                "{}x{} image needs {expected} bytes, got {}",
                self.width,
                self.height,
                self.rgba.len()
            )));
        }
        Ok(())
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Returns the pixel at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    fn buffer_len(width: u32, height: u32) -> Result<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| SyncError::ImageCodec(format!("{width}x{height} image is too large")))
    }
}

/// Converts between raster images and artifact bytes.
pub trait ImageCodec {
    /// Encodes an image as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be encoded.
    fn encode_png(&self, image: &RasterImage) -> Result<Vec<u8>>;

    /// Decodes artifact bytes into an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a supported image.
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage>;
}
