//! Image decoding into normalized arrays.

use crate::{common::*, config::ImageSize, error::PipelineError};

/// Decodes compressed images into `[height, width, 3]` arrays in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    resize: Option<ImageSize>,
}

impl ImageDecoder {
    /// Build a decoder.
    ///
    /// * `resize` - If set, every decoded image is resized to this size.
    pub fn new(resize: Option<ImageSize>) -> Self {
        Self { resize }
    }

    /// Decodes `bytes`. The `path` is only used in error messages.
    pub fn decode(&self, path: &Path, bytes: &[u8]) -> Result<Array3<f32>> {
        let decode_error = |reason: String| PipelineError::Decode {
            path: path.to_owned(),
            reason,
        };

        let image = image::load_from_memory(bytes).map_err(|err| decode_error(err.to_string()))?;
        let image = match self.resize {
            Some(size) => {
                image.resize_exact(size.width as u32, size.height as u32, FilterType::Triangle)
            }
            None => image,
        };

        let rgb = image.into_rgb8();
        let (width, height) = rgb.dimensions();
        let array = Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw())
            .map_err(|err| decode_error(err.to_string()))?
            .mapv(|component| component as f32 / 255.0);

        Ok(array)
    }
}
