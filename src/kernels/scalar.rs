use crate::filter::GrayscaleParams;

/// R, G, B byte lanes of a little-endian RGBA quad; Alpha sits in the
/// high byte and must pass through untouched.
pub(crate) const RGB_LANES: u32 = 0x00FF_FFFF;

#[inline(always)]
pub(crate) fn invert_rgb(pixel: u32) -> u32 {
    pixel ^ RGB_LANES
}

pub(crate) unsafe fn invert_row_scalar_unchecked(row: *mut u8, pixel_count: usize) {
    let mut px = row as *mut u32;
    let mut remaining = pixel_count;

    while remaining >= 4 {
        unsafe {
            let p0 = std::ptr::read_unaligned(px);
            let p1 = std::ptr::read_unaligned(px.add(1));
            let p2 = std::ptr::read_unaligned(px.add(2));
            let p3 = std::ptr::read_unaligned(px.add(3));

            std::ptr::write_unaligned(px, invert_rgb(p0));
            std::ptr::write_unaligned(px.add(1), invert_rgb(p1));
            std::ptr::write_unaligned(px.add(2), invert_rgb(p2));
            std::ptr::write_unaligned(px.add(3), invert_rgb(p3));
        }

        px = unsafe { px.add(4) };
        remaining -= 4;
    }

    while remaining != 0 {
        unsafe {
            let pixel = std::ptr::read_unaligned(px);
            std::ptr::write_unaligned(px, invert_rgb(pixel));
        }

        px = unsafe { px.add(1) };
        remaining -= 1;
    }
}

pub(crate) unsafe fn brightness_row_scalar_unchecked(
    row: *mut u8,
    pixel_count: usize,
    delta: i32,
) {
    for i in 0..pixel_count {
        let quad = unsafe { row.add(i * 4) };
        for channel in 0..3 {
            let byte = unsafe { quad.add(channel) };
            let value = (unsafe { *byte } as i32).saturating_add(delta);
            unsafe {
                *byte = value.clamp(0, 255) as u8;
            }
        }
    }
}

/// Weighted channel reduction. The weighted sum is rounded
/// half-away-from-zero, then clamped; weights are taken as-is.
pub(crate) unsafe fn grayscale_row_scalar_unchecked(
    row: *mut u8,
    pixel_count: usize,
    params: GrayscaleParams,
) {
    for i in 0..pixel_count {
        let quad = unsafe { row.add(i * 4) };
        let (red, green, blue) = unsafe { (*quad as f32, *quad.add(1) as f32, *quad.add(2) as f32) };

        let gray = (red * params.red_coefficient
            + green * params.green_coefficient
            + blue * params.blue_coefficient)
            .round()
            .clamp(0.0, 255.0) as u8;

        unsafe {
            *quad = gray;
            *quad.add(1) = gray;
            *quad.add(2) = gray;
        }
    }
}

/// Linear contrast around the fixed pivot 128, rounded half-away-from-zero.
pub(crate) unsafe fn contrast_row_scalar_unchecked(row: *mut u8, pixel_count: usize, factor: f32) {
    for i in 0..pixel_count {
        let quad = unsafe { row.add(i * 4) };
        for channel in 0..3 {
            let byte = unsafe { quad.add(channel) };
            let value = ((unsafe { *byte } as f32 - 128.0) * factor + 128.0)
                .round()
                .clamp(0.0, 255.0);
            unsafe {
                *byte = value as u8;
            }
        }
    }
}

pub(crate) unsafe fn sepia_row_scalar_unchecked(row: *mut u8, pixel_count: usize) {
    for i in 0..pixel_count {
        let quad = unsafe { row.add(i * 4) };
        // All three outputs are computed from the same pre-transform
        // triple, never chained through already-written channels.
        let (red, green, blue) = unsafe { (*quad as f64, *quad.add(1) as f64, *quad.add(2) as f64) };

        let sepia_red = (red * 0.393 + green * 0.769 + blue * 0.189)
            .round()
            .clamp(0.0, 255.0) as u8;
        let sepia_green = (red * 0.349 + green * 0.686 + blue * 0.168)
            .round()
            .clamp(0.0, 255.0) as u8;
        let sepia_blue = (red * 0.272 + green * 0.534 + blue * 0.131)
            .round()
            .clamp(0.0, 255.0) as u8;

        unsafe {
            *quad = sepia_red;
            *quad.add(1) = sepia_green;
            *quad.add(2) = sepia_blue;
        }
    }
}
