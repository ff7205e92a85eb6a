//! Geometric transforms on `[height, width, 3]` arrays, done through `image` buffers.

use crate::{common::*, config::ImageSize};

/// Converts a `[height, width, 3]` array into an RGB image with f32 components.
pub fn to_rgb_image(array: &Array3<f32>) -> Result<Rgb32FImage> {
    let (height, width, channels) = array.dim();
    ensure!(channels == 3, "channel size must be 3, but get {}", channels);
    let raw: Vec<f32> = array.iter().copied().collect();
    Rgb32FImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| format_err!("unable to build a {}x{} image buffer", width, height))
}

/// Converts an RGB image with f32 components back into a `[height, width, 3]` array.
pub fn from_rgb_image(image: Rgb32FImage) -> Result<Array3<f32>> {
    let (width, height) = image.dimensions();
    let array = Array3::from_shape_vec((height as usize, width as usize, 3), image.into_raw())?;
    Ok(array)
}

pub fn flip_horizontal(array: &Array3<f32>) -> Result<Array3<f32>> {
    let image = to_rgb_image(array)?;
    from_rgb_image(imageops::flip_horizontal(&image))
}

/// Crops the centered box covering `scale` of each side and resizes it to `size`.
///
/// The box is rounded down to whole pixels and keeps at least one pixel.
pub fn center_zoom(array: &Array3<f32>, scale: f32, size: ImageSize) -> Result<Array3<f32>> {
    ensure!(
        scale > 0.0 && scale <= 1.0,
        "zoom scale must be in range (0, 1], but get {}",
        scale
    );

    let image = to_rgb_image(array)?;
    let (width, height) = image.dimensions();
    let crop_w = ((width as f32 * scale) as u32).max(1);
    let crop_h = ((height as f32 * scale) as u32).max(1);
    let left = (width - crop_w) / 2;
    let top = (height - crop_h) / 2;

    let cropped = imageops::crop_imm(&image, left, top, crop_w, crop_h).to_image();
    let zoomed = imageops::resize(
        &cropped,
        size.width as u32,
        size.height as u32,
        FilterType::Triangle,
    );
    from_rgb_image(zoomed)
}
