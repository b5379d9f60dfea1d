//! PNG interchange for canvases.
//!
//! Any format `image` can open is accepted on the way in; output is always
//! PNG so colors survive the trip unchanged.

use std::path::Path;

use image::{ImageFormat, RgbImage};
use log::debug;

use crate::canvas::Canvas;
use crate::error::{Error, Result};
use crate::palette::Rgb;

pub fn canvas_to_pixels(canvas: &Canvas) -> Result<RgbImage> {
    let (width, height) = canvas.dimensions();
    let too_large = || Error::RasterTooLarge { width, height };
    let image_width = u32::try_from(width).map_err(|_| too_large())?;
    let image_height = u32::try_from(height).map_err(|_| too_large())?;

    RgbImage::from_raw(image_width, image_height, canvas.as_bytes().to_vec()).ok_or_else(|| Error::PixelCount {
        width,
        height,
        expected: width.saturating_mul(height),
        actual: canvas.as_bytes().len() / 3,
    })
}

pub fn pixels_to_canvas(image: &RgbImage) -> Result<Canvas> {
    let pixels: &[Rgb] = bytemuck::cast_slice(image.as_raw());
    Canvas::from_pixels(image.width() as usize, image.height() as usize, pixels.to_vec())
}

/// Opens an image file and flattens it to 8-bit RGB. Alpha is dropped.
pub fn read_raster(path: impl AsRef<Path>) -> Result<Canvas> {
    let path = path.as_ref();
    let image = image::open(path)?.to_rgb8();
    debug!("read {}x{} raster from {}", image.width(), image.height(), path.display());
    pixels_to_canvas(&image)
}

pub fn write_raster(canvas: &Canvas, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    canvas_to_pixels(canvas)?.save_with_format(path, ImageFormat::Png)?;
    debug!("wrote {}x{} raster to {}", canvas.width(), canvas.height(), path.display());
    Ok(())
}
