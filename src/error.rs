use std::fmt;

use crate::raster::PixelFormat;

#[derive(Debug)]
pub enum FilterError {
    /// Raster geometry violates the pixel-buffer invariant
    /// (`width > 0`, `height > 0`, `stride >= width * 4`).
    InvalidGeometry { width: u32, height: u32, stride: u32 },

    /// The raster is not 8-bit RGBA. Filters only operate on
    /// [`PixelFormat::Rgba8888`].
    UnsupportedFormat(PixelFormat),

    /// The host could not supply a locked pixel pointer.
    BufferUnavailable(String),

    Host(anyhow::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterErrorClass {
    InvalidInput,
    Unsupported,
    Transient,
    Fatal,
}

impl FilterError {
    pub fn class(&self) -> FilterErrorClass {
        match self {
            Self::InvalidGeometry { .. } => FilterErrorClass::InvalidInput,
            Self::UnsupportedFormat(_) => FilterErrorClass::Unsupported,
            Self::BufferUnavailable(_) => FilterErrorClass::Transient,
            Self::Host(_) => FilterErrorClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), FilterErrorClass::Transient)
    }

    /// Negative sentinel code for the raw-integer measurement API.
    ///
    /// `-1` — raster description/geometry invalid.
    /// `-2` — pixel format is not RGBA8888.
    /// `-3` — pixel lock failed.
    /// `-4` — other host failure.
    ///
    /// Sentinels never collide with durations: a filter that ran reports
    /// `>= 0` nanoseconds.
    pub fn sentinel(&self) -> i64 {
        match self {
            Self::InvalidGeometry { .. } => -1,
            Self::UnsupportedFormat(_) => -2,
            Self::BufferUnavailable(_) => -3,
            Self::Host(_) => -4,
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGeometry {
                width,
                height,
                stride,
            } => write!(
                f,
                "invalid raster geometry: width={width}, height={height}, stride={stride} \
                 (requires width > 0, height > 0, stride >= width * 4)"
            ),
            Self::UnsupportedFormat(format) => {
                write!(f, "unsupported pixel format: {format:?} (expected Rgba8888)")
            }
            Self::BufferUnavailable(message) => {
                write!(f, "pixel buffer unavailable: {message}")
            }
            Self::Host(inner) => write!(f, "{inner}"),
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Host(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

pub type FilterResult<T> = Result<T, FilterError>;
