//! Filter execution: kernel selection, row iteration, parallel sharding.
//!
//! Every filter walks rows outer, pixels inner, honoring the buffer
//! stride — padded rasters are the norm on platform bitmaps and a packed
//! layout is never assumed. Large rasters shard rows across a dedicated
//! rayon pool; each row is written by exactly one chunk, so serial and
//! parallel paths produce byte-identical output.

mod parallel;
pub(crate) mod scalar;
#[cfg(target_arch = "x86_64")]
mod simd_x86;

use std::sync::OnceLock;

use crate::buffer::PixelBuffer;
use crate::env_config;
use crate::filter::Filter;
use parallel::{chunk_rows, install_filter_pool, should_parallelize};

const FILTER_PARALLEL_MIN_PIXELS: usize = 262_144;
const FILTER_PARALLEL_MIN_CHUNK_PIXELS: usize = 65_536;
const FILTER_PARALLEL_MAX_WORKERS: usize = 8;

type InvertKernel = unsafe fn(*mut u8, usize);
type BrightnessKernel = unsafe fn(*mut u8, usize, i32);

env_config::define_env_flag!(enabled_when(force_scalar_kernels, "RGBA_FILTERS_FORCE_SCALAR"));
env_config::define_env_flag!(enabled_when(parallel_disabled, "RGBA_FILTERS_DISABLE_PARALLEL"));

/// Apply `filter` to every pixel of `buffer`, in place.
///
/// Alpha bytes and stride padding are never written. The call blocks
/// until the whole raster is processed; it cannot fail once the buffer
/// view exists.
pub fn apply(buffer: &mut PixelBuffer<'_>, filter: Filter) {
    let layout = RowLayout::of(buffer);
    match filter {
        Filter::Grayscale(params) => run_rows(layout, move |row, width| unsafe {
            scalar::grayscale_row_scalar_unchecked(row, width, params);
        }),
        Filter::Invert => {
            let kernel = invert_kernel();
            run_rows(layout, move |row, width| unsafe {
                kernel(row, width);
            });
        }
        Filter::Brightness(params) => {
            let kernel = brightness_kernel();
            run_rows(layout, move |row, width| unsafe {
                kernel(row, width, params.brightness);
            });
        }
        Filter::Contrast(params) => run_rows(layout, move |row, width| unsafe {
            scalar::contrast_row_scalar_unchecked(row, width, params.contrast);
        }),
        Filter::Sepia => run_rows(layout, move |row, width| unsafe {
            scalar::sepia_row_scalar_unchecked(row, width);
        }),
    }
}

#[derive(Clone, Copy)]
struct RowLayout {
    base: *mut u8,
    stride: usize,
    width: usize,
    height: usize,
}

impl RowLayout {
    fn of(buffer: &mut PixelBuffer<'_>) -> Self {
        Self {
            base: buffer.as_mut_ptr(),
            stride: buffer.stride(),
            width: buffer.width(),
            height: buffer.height(),
        }
    }
}

fn run_rows<F>(layout: RowLayout, row_fn: F)
where
    F: Fn(*mut u8, usize) + Send + Sync,
{
    let total_pixels = layout.width * layout.height;
    if !parallel_disabled()
        && should_parallelize(
            total_pixels,
            FILTER_PARALLEL_MIN_PIXELS,
            FILTER_PARALLEL_MIN_CHUNK_PIXELS,
            FILTER_PARALLEL_MAX_WORKERS,
        )
        && let Some(rows_per_chunk) = chunk_rows(
            layout.width,
            layout.height,
            FILTER_PARALLEL_MIN_CHUNK_PIXELS,
            FILTER_PARALLEL_MAX_WORKERS,
        )
    {
        run_rows_parallel(layout, rows_per_chunk, FILTER_PARALLEL_MAX_WORKERS, row_fn);
        return;
    }

    run_rows_serial(layout, row_fn);
}

fn run_rows_serial<F>(layout: RowLayout, row_fn: F)
where
    F: Fn(*mut u8, usize),
{
    for row in 0..layout.height {
        row_fn(unsafe { layout.base.add(row * layout.stride) }, layout.width);
    }
}

fn run_rows_parallel<F>(layout: RowLayout, rows_per_chunk: usize, max_workers: usize, row_fn: F)
where
    F: Fn(*mut u8, usize) + Send + Sync,
{
    // Raw pointers aren't Send; chunks address rows through the base
    // address instead. Disjoint row ranges make the writes race-free.
    let base_addr = layout.base as usize;
    let stride = layout.stride;
    let width = layout.width;
    let height = layout.height;
    let chunk_count = height.div_ceil(rows_per_chunk);

    use rayon::prelude::*;
    install_filter_pool(max_workers, || {
        (0..chunk_count).into_par_iter().for_each(|chunk_idx| {
            let start_row = chunk_idx * rows_per_chunk;
            let rows = (height - start_row).min(rows_per_chunk);
            for row_offset in 0..rows {
                let row = start_row + row_offset;
                row_fn((base_addr + row * stride) as *mut u8, width);
            }
        });
    });
}

#[inline(always)]
fn invert_kernel() -> InvertKernel {
    static KERNEL: OnceLock<InvertKernel> = OnceLock::new();
    *KERNEL.get_or_init(select_invert_kernel)
}

#[inline(always)]
fn brightness_kernel() -> BrightnessKernel {
    static KERNEL: OnceLock<BrightnessKernel> = OnceLock::new();
    *KERNEL.get_or_init(select_brightness_kernel)
}

fn select_invert_kernel() -> InvertKernel {
    if force_scalar_kernels() {
        return scalar::invert_row_scalar_unchecked;
    }
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            return simd_x86::invert_row_avx2_unchecked;
        }
        if std::arch::is_x86_feature_detected!("sse2") {
            return simd_x86::invert_row_sse2_unchecked;
        }
    }
    scalar::invert_row_scalar_unchecked
}

fn select_brightness_kernel() -> BrightnessKernel {
    if force_scalar_kernels() {
        return scalar::brightness_row_scalar_unchecked;
    }
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            return simd_x86::brightness_row_avx2_unchecked;
        }
        if std::arch::is_x86_feature_detected!("sse2") {
            return simd_x86::brightness_row_sse2_unchecked;
        }
    }
    scalar::brightness_row_scalar_unchecked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{BrightnessParams, ContrastParams, FilterKind, GrayscaleParams};

    fn make_raster(
        width: usize,
        height: usize,
        stride: usize,
        padding: u8,
        fill: impl Fn(usize, usize) -> [u8; 4],
    ) -> Vec<u8> {
        let mut data = vec![padding; stride * (height - 1) + width * 4];
        for y in 0..height {
            for x in 0..width {
                let offset = y * stride + x * 4;
                data[offset..offset + 4].copy_from_slice(&fill(x, y));
            }
        }
        data
    }

    fn apply_to(data: &mut [u8], width: u32, height: u32, stride: u32, filter: Filter) {
        let mut buffer = PixelBuffer::from_slice(data, width, height, stride).unwrap();
        apply(&mut buffer, filter);
    }

    fn pixel(data: &[u8], stride: usize, x: usize, y: usize) -> [u8; 4] {
        let offset = y * stride + x * 4;
        [
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]
    }

    #[test]
    fn invert_end_to_end_example() {
        let mut data = vec![10, 20, 30, 255, 200, 210, 220, 255];
        apply_to(&mut data, 2, 1, 8, Filter::Invert);
        assert_eq!(data, vec![245, 235, 225, 255, 55, 45, 35, 255]);
    }

    #[test]
    fn brightness_end_to_end_example() {
        let mut data = vec![10, 20, 30, 255, 200, 210, 220, 255];
        apply_to(
            &mut data,
            2,
            1,
            8,
            Filter::Brightness(BrightnessParams { brightness: 50 }),
        );
        assert_eq!(data, vec![60, 70, 80, 255, 250, 255, 255, 255]);
    }

    #[test]
    fn invert_is_an_involution() {
        let fill = |x: usize, y: usize| {
            [
                (x * 31 + y * 7) as u8,
                (x * 13 + y * 29) as u8,
                (x * 3 + y * 61) as u8,
                (x + y * 5) as u8,
            ]
        };
        let original = make_raster(7, 5, 36, 0x00, fill);
        let mut data = original.clone();
        apply_to(&mut data, 7, 5, 36, Filter::Invert);
        assert_ne!(data, original);
        apply_to(&mut data, 7, 5, 36, Filter::Invert);
        assert_eq!(data, original);
    }

    #[test]
    fn brightness_zero_is_identity() {
        let fill = |x: usize, y: usize| [(x * 17) as u8, (y * 23) as u8, 128, 200];
        let original = make_raster(6, 4, 24, 0x00, fill);
        let mut data = original.clone();
        apply_to(
            &mut data,
            6,
            4,
            24,
            Filter::Brightness(BrightnessParams { brightness: 0 }),
        );
        assert_eq!(data, original);
    }

    #[test]
    fn brightness_saturates_without_wrapping() {
        let fill = |x: usize, y: usize| [(x * 40) as u8, (y * 60) as u8, 255, 7];
        let mut bright = make_raster(5, 4, 20, 0x00, &fill);
        apply_to(
            &mut bright,
            5,
            4,
            20,
            Filter::Brightness(BrightnessParams { brightness: 300 }),
        );
        let mut dark = make_raster(5, 4, 20, 0x00, &fill);
        apply_to(
            &mut dark,
            5,
            4,
            20,
            Filter::Brightness(BrightnessParams { brightness: -300 }),
        );
        for y in 0..4 {
            for x in 0..5 {
                let [r, g, b, a] = pixel(&bright, 20, x, y);
                assert_eq!((r, g, b, a), (255, 255, 255, 7));
                let [r, g, b, a] = pixel(&dark, 20, x, y);
                assert_eq!((r, g, b, a), (0, 0, 0, 7));
            }
        }
    }

    #[test]
    fn contrast_identity_factor_changes_nothing() {
        // Every channel value appears somewhere in this raster.
        let fill = |x: usize, y: usize| {
            let v = (y * 64 + x) as u8;
            [v, 255 - v, v ^ 0x55, v]
        };
        let original = make_raster(64, 4, 256, 0x00, fill);
        let mut data = original.clone();
        apply_to(
            &mut data,
            64,
            4,
            256,
            Filter::Contrast(ContrastParams { contrast: 1.0 }),
        );
        assert_eq!(data, original);
    }

    #[test]
    fn contrast_zero_collapses_to_pivot() {
        let fill = |x: usize, y: usize| [(x * 50) as u8, (y * 80) as u8, 3, 99];
        let mut data = make_raster(5, 3, 20, 0x00, fill);
        apply_to(
            &mut data,
            5,
            3,
            20,
            Filter::Contrast(ContrastParams { contrast: 0.0 }),
        );
        for y in 0..3 {
            for x in 0..5 {
                let [r, g, b, a] = pixel(&data, 20, x, y);
                assert_eq!((r, g, b), (128, 128, 128));
                assert_eq!(a, 99);
            }
        }
    }

    #[test]
    fn contrast_large_factor_saturates_around_pivot() {
        let mut data = vec![
            10, 127, 128, 255, //
            129, 200, 255, 0,
        ];
        apply_to(
            &mut data,
            2,
            1,
            8,
            Filter::Contrast(ContrastParams { contrast: 1000.0 }),
        );
        assert_eq!(data, vec![0, 0, 128, 255, 255, 255, 255, 0]);
    }

    #[test]
    fn contrast_rounds_half_away_from_zero() {
        // At factor 0.5 the values 129 and 127 land exactly on 128.5 and
        // 127.5; half-away-from-zero keeps them apart.
        let mut data = vec![129, 127, 128, 80];
        apply_to(
            &mut data,
            1,
            1,
            4,
            Filter::Contrast(ContrastParams { contrast: 0.5 }),
        );
        assert_eq!(data, vec![129, 128, 128, 80]);
    }

    #[test]
    fn grayscale_output_is_monochrome() {
        let fill = |x: usize, y: usize| [(x * 37) as u8, (y * 53) as u8, (x * y) as u8, 255];
        let mut data = make_raster(9, 6, 40, 0x00, fill);
        apply_to(
            &mut data,
            9,
            6,
            40,
            Filter::Grayscale(GrayscaleParams::default()),
        );
        for y in 0..6 {
            for x in 0..9 {
                let [r, g, b, _] = pixel(&data, 40, x, y);
                assert_eq!(r, g);
                assert_eq!(g, b);
            }
        }
    }

    #[test]
    fn grayscale_default_weights_example() {
        // 0.299*10 + 0.587*20 + 0.114*30 = 18.15 -> 18
        let mut data = vec![10, 20, 30, 255];
        apply_to(
            &mut data,
            1,
            1,
            4,
            Filter::Grayscale(GrayscaleParams::default()),
        );
        assert_eq!(data, vec![18, 18, 18, 255]);
    }

    #[test]
    fn grayscale_rounds_half_away_from_zero() {
        let params = GrayscaleParams {
            red_coefficient: 0.5,
            green_coefficient: 0.0,
            blue_coefficient: 0.0,
        };
        // 5 * 0.5 = 2.5 -> 3
        let mut data = vec![5, 0, 0, 1];
        apply_to(&mut data, 1, 1, 4, Filter::Grayscale(params));
        assert_eq!(data, vec![3, 3, 3, 1]);
    }

    #[test]
    fn grayscale_clamps_degenerate_weights() {
        let negative = GrayscaleParams {
            red_coefficient: -1.0,
            green_coefficient: 0.0,
            blue_coefficient: 0.0,
        };
        let mut data = vec![200, 10, 10, 255];
        apply_to(&mut data, 1, 1, 4, Filter::Grayscale(negative));
        assert_eq!(data, vec![0, 0, 0, 255]);

        let oversized = GrayscaleParams {
            red_coefficient: 2.0,
            green_coefficient: 2.0,
            blue_coefficient: 2.0,
        };
        let mut data = vec![200, 200, 200, 255];
        apply_to(&mut data, 1, 1, 4, Filter::Grayscale(oversized));
        assert_eq!(data, vec![255, 255, 255, 255]);
    }

    #[test]
    fn sepia_matrix_example() {
        // (10, 20, 30): R' = 24.98 -> 25, G' = 22.25 -> 22, B' = 17.33 -> 17
        let mut data = vec![10, 20, 30, 255, 255, 255, 255, 128];
        apply_to(&mut data, 2, 1, 8, Filter::Sepia);
        assert_eq!(pixel(&data, 8, 0, 0), [25, 22, 17, 255]);
        // White saturates R and G; B' = 238.935 -> 239.
        assert_eq!(pixel(&data, 8, 1, 0), [255, 255, 239, 128]);
    }

    #[test]
    fn sepia_depends_only_on_the_input_triple() {
        let fill = |x: usize, _y: usize| {
            if x % 2 == 0 {
                [90, 140, 60, 10]
            } else {
                [201, 33, 97, 200]
            }
        };
        let mut data = make_raster(8, 3, 32, 0x00, fill);
        apply_to(&mut data, 8, 3, 32, Filter::Sepia);
        let even = pixel(&data, 32, 0, 0);
        let odd = pixel(&data, 32, 1, 0);
        for y in 0..3 {
            for x in 0..8 {
                let expected = if x % 2 == 0 { even } else { odd };
                assert_eq!(pixel(&data, 32, x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn all_filters_preserve_alpha_and_stride_padding() {
        let width = 6usize;
        let height = 5usize;
        let stride = width * 4 + 12;
        let fill = |x: usize, y: usize| {
            [
                (x * 43 + y) as u8,
                (y * 91 + x) as u8,
                (x * x + y * y) as u8,
                (x * 7 + y * 11) as u8,
            ]
        };

        for kind in FilterKind::ALL {
            let original = make_raster(width, height, stride, 0xAB, fill);
            let mut data = original.clone();
            apply_to(
                &mut data,
                width as u32,
                height as u32,
                stride as u32,
                kind.default_filter(),
            );

            for y in 0..height {
                // Alpha byte of every pixel is untouched.
                for x in 0..width {
                    assert_eq!(
                        data[y * stride + x * 4 + 3],
                        original[y * stride + x * 4 + 3],
                        "{} altered alpha at ({x}, {y})",
                        kind.as_str()
                    );
                }
                // Padding bytes between rows are bit-identical.
                if y + 1 < height {
                    let pad = y * stride + width * 4..(y + 1) * stride;
                    assert_eq!(
                        &data[pad.clone()],
                        &original[pad],
                        "{} touched row padding",
                        kind.as_str()
                    );
                }
            }
        }
    }

    #[test]
    fn parallel_rows_match_serial_rows() {
        let width = 64usize;
        let height = 48usize;
        let stride = width * 4 + 16;
        let mut state = 0x9e37_79b9_7f4a_7c15_u64;
        let mut fill_state = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 32) as u8
        };
        let mut original = vec![0u8; stride * (height - 1) + width * 4];
        for byte in &mut original {
            *byte = fill_state();
        }

        let cases: [(&str, Box<dyn Fn(*mut u8, usize) + Send + Sync>); 3] = [
            ("sepia", Box::new(|row, w| unsafe {
                scalar::sepia_row_scalar_unchecked(row, w);
            })),
            ("contrast", Box::new(|row, w| unsafe {
                scalar::contrast_row_scalar_unchecked(row, w, 1.7);
            })),
            ("brightness", Box::new(|row, w| unsafe {
                scalar::brightness_row_scalar_unchecked(row, w, -42);
            })),
        ];

        for (name, row_fn) in cases {
            let mut serial = original.clone();
            let mut parallel = original.clone();

            let serial_layout = RowLayout {
                base: serial.as_mut_ptr(),
                stride,
                width,
                height,
            };
            run_rows_serial(serial_layout, &row_fn);

            let parallel_layout = RowLayout {
                base: parallel.as_mut_ptr(),
                stride,
                width,
                height,
            };
            run_rows_parallel(parallel_layout, 5, 4, &row_fn);

            assert_eq!(serial, parallel, "{name} diverged between row paths");
            assert_ne!(serial, original, "{name} did not modify the raster");
        }
    }
}
