use std::path::Path;

use anyhow::{Context, Result};
use rgba_filters::{FilterKind, PixelBuffer, measure};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn gradient_raster(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let red = (x * 255 / width.max(1)) as u8;
            let green = (y * 255 / height.max(1)) as u8;
            let blue = ((x + y) * 255 / (width + height)) as u8;
            out.extend_from_slice(&[red, green, blue, 255]);
        }
    }
    out
}

fn save_png(data: &[u8], width: u32, height: u32, path: &Path) -> Result<()> {
    image::save_buffer(path, data, width, height, image::ColorType::Rgba8)
        .map_err(|e| anyhow::anyhow!("failed to write PNG to {}: {e}", path.display()))
}

fn main() -> Result<()> {
    let stride = WIDTH * 4;
    let pristine = gradient_raster(WIDTH, HEIGHT);

    save_png(&pristine, WIDTH, HEIGHT, Path::new("./filtered-original.png"))?;

    for kind in FilterKind::ALL {
        let mut data = pristine.clone();
        let mut buffer = PixelBuffer::from_slice(&mut data, WIDTH, HEIGHT, stride)
            .context("demo raster geometry should be valid")?;

        let elapsed = measure(&mut buffer, kind.default_filter());
        println!(
            "Applied {:<10} {}x{} in {:.3} ms",
            kind.as_str(),
            WIDTH,
            HEIGHT,
            elapsed.as_secs_f64() * 1000.0
        );

        let output = format!("./filtered-{}.png", kind.as_str());
        save_png(&data, WIDTH, HEIGHT, Path::new(&output))?;
        println!("Saved {output}");
    }

    Ok(())
}
