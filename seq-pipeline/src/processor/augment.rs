//! Seeded augmentation shared across the images of one record.
//!
//! The augmentation seed selects one of four regimes. Every seed gets a
//! random horizontal flip. Seeds below 500 get color jitter, and seeds in
//! `250..750` get a centered zoom, so a quarter of the seeds receive both.

use super::{
    color_jitter::{ColorJitter, ColorJitterInit},
    transform,
};
use crate::{common::*, config::ImageSize};

/// Seeds are drawn uniformly from `0..SEED_RANGE`.
pub const SEED_RANGE: u32 = 1000;

/// Seeds below this value get color jitter.
pub const COLOR_SEED_END: u32 = 500;

/// Seeds in this range get zoomed.
pub const ZOOM_SEEDS: std::ops::Range<u32> = 250..750;

/// Crop scales of the zoom augmentation, indexed by `seed % 5`.
pub const ZOOM_SCALES: [f32; 5] = [0.90, 0.92, 0.94, 0.96, 0.98];

/// The augmentation branches selected by a seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AugmentPlan {
    pub color: bool,
    pub zoom: Option<f32>,
}

impl AugmentPlan {
    pub fn from_seed(seed: u32) -> Self {
        let color = seed < COLOR_SEED_END;
        let zoom = ZOOM_SEEDS
            .contains(&seed)
            .then(|| ZOOM_SCALES[seed as usize % ZOOM_SCALES.len()]);
        Self { color, zoom }
    }
}

/// Draws an augmentation seed.
pub fn draw_seed<R>(rng: &mut R) -> u32
where
    R: Rng,
{
    rng.gen_range(0..SEED_RANGE)
}

#[derive(Debug, Clone)]
pub struct Augmenter {
    image_size: ImageSize,
    color_jitter: ColorJitter,
}

impl Augmenter {
    /// Builds an augmenter that zooms back into `image_size`.
    pub fn new(image_size: ImageSize) -> Result<Self> {
        Self::with_color_jitter(image_size, ColorJitterInit::default())
    }

    pub fn with_color_jitter(image_size: ImageSize, color_jitter: ColorJitterInit) -> Result<Self> {
        image_size.validate()?;
        Ok(Self {
            image_size,
            color_jitter: color_jitter.build()?,
        })
    }

    /// Augments one image.
    ///
    /// Images are returned untouched if `is_training` is false. Otherwise the
    /// output only depends on the image and the seed, and the result is
    /// clamped to `[0, 1]`.
    pub fn augment(&self, image: Array3<f32>, seed: u32, is_training: bool) -> Result<Array3<f32>> {
        if !is_training {
            return Ok(image);
        }
        ensure!(
            seed < SEED_RANGE,
            "augmentation seed must be less than {}, but get {}",
            SEED_RANGE,
            seed
        );

        let AugmentPlan { color, zoom } = AugmentPlan::from_seed(seed);
        let mut rng = StdRng::seed_from_u64(seed as u64);

        let image = if rng.gen::<bool>() {
            transform::flip_horizontal(&image)?
        } else {
            image
        };

        let image = if color {
            self.color_jitter.forward(&image, &mut rng)?
        } else {
            image
        };

        let image = match zoom {
            Some(scale) => transform::center_zoom(&image, scale, self.image_size)?,
            None => image,
        };

        Ok(image.mapv_into(|component| component.clamp(0.0, 1.0)))
    }
}
