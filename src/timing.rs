//! Latency measurement around filter runs.
//!
//! The harness is one generic decorator — [`timed`] — plus entry points
//! that walk the host seam: describe, validate, lock, run, unlock. The
//! timestamps bracket only the filter delegation; lock and unlock are
//! never included in the reported duration.

use std::time::{Duration, Instant};

use crate::buffer::{self, PixelBuffer};
use crate::error::{FilterError, FilterResult};
use crate::filter::Filter;
use crate::kernels;
use crate::raster::{PixelFormat, Raster};

/// Run `op` and report its wall-clock duration alongside its result.
#[inline]
pub fn timed<T>(op: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = op();
    (value, start.elapsed())
}

/// Apply `filter` to an already-validated buffer and report how long the
/// filter itself took.
pub fn measure(buffer: &mut PixelBuffer<'_>, filter: Filter) -> Duration {
    let ((), elapsed) = timed(|| kernels::apply(buffer, filter));
    elapsed
}

/// Apply `filter` to a host raster: describe, validate, lock, run, unlock.
///
/// Fails without touching any pixel when the descriptor, geometry,
/// format, or lock step rejects the raster.
pub fn apply_raster(raster: &mut dyn Raster, filter: Filter) -> FilterResult<()> {
    run_locked(raster, filter).map(|_elapsed| ())
}

/// Like [`apply_raster`], additionally reporting the filter's duration.
pub fn measure_raster(raster: &mut dyn Raster, filter: Filter) -> FilterResult<Duration> {
    run_locked(raster, filter)
}

/// Raw-integer variant of [`measure_raster`]: nanoseconds on success, a
/// negative sentinel per failure class otherwise (see
/// [`FilterError::sentinel`]).
pub fn measure_raster_ns(raster: &mut dyn Raster, filter: Filter) -> i64 {
    match measure_raster(raster, filter) {
        Ok(elapsed) => i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX),
        Err(err) => err.sentinel(),
    }
}

fn run_locked(raster: &mut dyn Raster, filter: Filter) -> FilterResult<Duration> {
    let descriptor = raster.descriptor()?;
    buffer::validate_geometry(descriptor.width, descriptor.height, descriptor.stride)?;
    if descriptor.format != PixelFormat::Rgba8888 {
        return Err(FilterError::UnsupportedFormat(descriptor.format));
    }

    let pixels = raster.lock_pixels()?;
    // The trait contract guarantees the pointer backs the described
    // geometry and stays exclusively ours until unlock.
    let view = unsafe {
        PixelBuffer::from_raw_parts(
            pixels,
            descriptor.width,
            descriptor.height,
            descriptor.stride,
        )
    };
    let elapsed = match view {
        Ok(mut locked) => measure(&mut locked, filter),
        Err(err) => {
            raster.unlock_pixels();
            return Err(err);
        }
    };
    raster.unlock_pixels();

    Ok(elapsed)
}
