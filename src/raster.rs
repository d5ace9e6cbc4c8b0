//! The seam between the filter core and the raster-owning host.
//!
//! The core never acquires a bitmap itself. A host (windowing toolkit,
//! managed runtime binding, test harness) implements [`Raster`] and is
//! responsible for pointer validity and exclusive access between
//! `lock_pixels` and `unlock_pixels`.

use crate::error::FilterResult;

/// Pixel layout reported by the host for its raster.
///
/// Filters only process [`Rgba8888`](Self::Rgba8888); every other format
/// is rejected before any pixel is touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte each for Red, Green, Blue, Alpha, in that order.
    Rgba8888,
    Rgb565,
    RgbaF16,
    Alpha8,
}

impl PixelFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rgba8888 => "rgba8888",
            Self::Rgb565 => "rgb565",
            Self::RgbaF16 => "rgbaf16",
            Self::Alpha8 => "alpha8",
        }
    }
}

/// Geometry and format of a host raster, fetched once per invocation.
#[derive(Clone, Copy, Debug)]
pub struct RasterDescriptor {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, including any trailing alignment padding.
    pub stride: u32,
    pub format: PixelFormat,
}

/// A host-owned raster that can hand out a locked pixel pointer.
pub trait Raster {
    /// Describe the raster. A host that cannot (e.g. the backing bitmap
    /// was recycled) reports [`FilterError::BufferUnavailable`] or wraps
    /// its own failure in [`FilterError::Host`].
    ///
    /// [`FilterError::BufferUnavailable`]: crate::error::FilterError::BufferUnavailable
    /// [`FilterError::Host`]: crate::error::FilterError::Host
    fn descriptor(&self) -> FilterResult<RasterDescriptor>;

    /// Lock the raster and return a pointer to its first pixel.
    ///
    /// The pointer must stay valid, and the raster exclusively held, until
    /// the matching [`unlock_pixels`](Self::unlock_pixels). The core calls
    /// lock/unlock strictly in pairs and never holds the pointer across
    /// calls.
    fn lock_pixels(&mut self) -> FilterResult<*mut u8>;

    fn unlock_pixels(&mut self);
}
