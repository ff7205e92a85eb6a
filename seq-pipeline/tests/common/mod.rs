#![allow(dead_code)]

use anyhow::Result;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use seq_pipeline::{
    dataset::{FsImageSource, ImageSource},
    ImageSize, Mode, PipelineConfig,
};
use std::{
    fmt::Write as _,
    io::Cursor,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};
use tempfile::TempDir;

pub const IMAGE_WIDTH: u32 = 10;
pub const IMAGE_HEIGHT: u32 = 8;

/// The red component written for an image, in 0..=255.
pub fn shade(row: usize, slot: usize) -> u8 {
    (row * 20 + slot * 3) as u8
}

/// Recovers `shade()` from a decoded image value.
pub fn decoded_shade(value: f32) -> u8 {
    (value * 255.0).round() as u8
}

pub fn encode_png(image: RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(vec![]);
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageOutputFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// A dataset directory with a manifest of `num_rows` sequences of
/// `num_images` solid color images. The label of each row is its index.
pub struct Fixture {
    pub dir: TempDir,
    pub num_rows: usize,
    pub num_images: usize,
}

impl Fixture {
    pub fn new(num_rows: usize, num_images: usize) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let images_dir = dir.path().join("images");
        std::fs::create_dir_all(&images_dir)?;

        let mut text = String::new();
        let header = (1..=num_images)
            .map(|slot| format!("image{}", slot))
            .chain(["has_animal".to_string(), "location".to_string()])
            .collect::<Vec<_>>()
            .join(",");
        writeln!(text, "{}", header)?;

        for row in 0..num_rows {
            let mut fields = vec![];
            for slot in 1..=num_images {
                let file = format!("seq{}/img{}.png", row, slot);
                let path = images_dir.join(&file);
                std::fs::create_dir_all(path.parent().unwrap())?;
                let image = RgbImage::from_pixel(
                    IMAGE_WIDTH,
                    IMAGE_HEIGHT,
                    Rgb([shade(row, slot), 128, 64]),
                );
                std::fs::write(&path, encode_png(image))?;
                fields.push(file);
            }
            fields.push(row.to_string());
            fields.push("site".to_string());
            writeln!(text, "{}", fields.join(","))?;
        }
        std::fs::write(dir.path().join("manifest.csv"), text)?;

        Ok(Self {
            dir,
            num_rows,
            num_images,
        })
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dir.path().join("images")
    }

    pub fn manifest(&self) -> PathBuf {
        self.dir.path().join("manifest.csv")
    }

    pub fn image_path(&self, row: usize, slot: usize) -> PathBuf {
        self.images_dir().join(format!("seq{}/img{}.png", row, slot))
    }

    /// An evaluation config with a fixed seed.
    pub fn config(&self, mode: Mode) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.manifest(), self.images_dir());
        config.sequence_image_count = self.num_images;
        config.mode = mode;
        config.image_size = ImageSize::new(IMAGE_WIDTH as usize, IMAGE_HEIGHT as usize).unwrap();
        config.is_training = false;
        config.shuffle_buffer_size = 4;
        config.runtime.rng_seed = Some(7);
        config
    }
}

/// Counts the reads of the wrapped file system source.
#[derive(Debug, Default)]
pub struct CountingSource {
    inner: FsImageSource,
    reads: AtomicUsize,
}

impl CountingSource {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ImageSource for CountingSource {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_bytes(path)
    }
}
