pub mod buffer;
pub(crate) mod env_config;
pub mod error;
pub mod filter;
pub mod kernels;
pub mod raster;
pub mod timing;

pub use buffer::{BYTES_PER_PIXEL, PixelBuffer};
pub use error::{FilterError, FilterErrorClass, FilterResult};
pub use filter::{BrightnessParams, ContrastParams, Filter, FilterKind, GrayscaleParams};
pub use kernels::apply;
pub use raster::{PixelFormat, Raster, RasterDescriptor};
pub use timing::{apply_raster, measure, measure_raster, measure_raster_ns, timed};

/// One-shot convenience: validate geometry over caller-owned bytes and
/// apply a filter in place.
pub fn apply_once(
    data: &mut [u8],
    width: u32,
    height: u32,
    stride: u32,
    filter: Filter,
) -> FilterResult<()> {
    let mut buffer = PixelBuffer::from_slice(data, width, height, stride)?;
    kernels::apply(&mut buffer, filter);
    Ok(())
}
