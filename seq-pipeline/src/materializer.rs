//! Per-mode record materialization.

use crate::{
    common::*,
    config::PipelineConfig,
    dataset::{image_column_name, ImageSource, RawRecord, Sample, SampleData},
    error::PipelineError,
    mode::Mode,
    processor::{Augmenter, ImageDecoder},
};

/// Reads, decodes and augments the images referenced by raw records.
#[derive(Debug, Clone)]
pub struct RecordLoader {
    images_dir: PathBuf,
    source: Arc<dyn ImageSource>,
    decoder: ImageDecoder,
    augmenter: Augmenter,
    is_training: bool,
}

impl RecordLoader {
    pub fn new(
        images_dir: impl Into<PathBuf>,
        source: Arc<dyn ImageSource>,
        decoder: ImageDecoder,
        augmenter: Augmenter,
        is_training: bool,
    ) -> Self {
        Self {
            images_dir: images_dir.into(),
            source,
            decoder,
            augmenter,
            is_training,
        }
    }

    pub fn from_config(config: &PipelineConfig, source: Arc<dyn ImageSource>) -> Result<Self> {
        let decoder = ImageDecoder::new(config.resize);
        let augmenter = Augmenter::new(config.effective_image_size())?;
        Ok(Self::new(
            &config.images_dir,
            source,
            decoder,
            augmenter,
            config.is_training,
        ))
    }

    /// The full path of the image at the 1-based `slot`.
    pub fn resolve(&self, record: &RawRecord, slot: usize) -> Result<PathBuf> {
        let relative = record
            .path(slot)
            .ok_or_else(|| format_err!("the record has no image slot {}", slot))?;
        Ok(self.images_dir.join(relative))
    }

    /// Loads the image at the 1-based `slot` and augments it with `seed`.
    pub fn load_slot(&self, record: &RawRecord, slot: usize, seed: u32) -> Result<Array3<f32>> {
        let path = self.resolve(record, slot)?;
        let bytes = self.source.read_bytes(&path)?;
        let image = self.decoder.decode(&path, &bytes)?;
        self.augmenter
            .augment(image, seed, self.is_training)
            .with_context(|| format!("failed to augment image '{}'", path.display()))
    }

    fn load_all(&self, record: &RawRecord, count: usize, seed: u32) -> Result<Vec<Array3<f32>>> {
        (1..=count)
            .map(|slot| self.load_slot(record, slot, seed))
            .try_collect()
    }
}

/// Turns one raw record into stream elements.
///
/// Implementations share one augmentation seed among all images of a record.
/// A failing record produces an error and no elements.
pub trait RecordMaterializer
where
    Self: Debug + Send + Sync,
{
    fn mode(&self) -> Mode;

    /// Returns true if one record yields more than one element.
    fn expands(&self) -> bool {
        false
    }

    fn materialize(
        &self,
        loader: &RecordLoader,
        record: &RawRecord,
        seed: u32,
    ) -> Result<Vec<Sample>>;
}

/// Produces a map from column name to image.
#[derive(Debug, Clone)]
pub struct AllMaterializer {
    sequence_image_count: usize,
}

impl AllMaterializer {
    pub fn new(sequence_image_count: usize) -> Self {
        Self {
            sequence_image_count,
        }
    }
}

impl RecordMaterializer for AllMaterializer {
    fn mode(&self) -> Mode {
        Mode::All
    }

    fn materialize(
        &self,
        loader: &RecordLoader,
        record: &RawRecord,
        seed: u32,
    ) -> Result<Vec<Sample>> {
        let images: IndexMap<_, _> = (1..=self.sequence_image_count)
            .map(|slot| -> Result<_> {
                let image = loader.load_slot(record, slot, seed)?;
                Ok((image_column_name(slot), image))
            })
            .try_collect()?;

        Ok(vec![Sample {
            data: SampleData::Named(images),
            label: record.label,
        }])
    }
}

/// Produces every image of a record as a separate element.
#[derive(Debug, Clone)]
pub struct FlatAllMaterializer {
    sequence_image_count: usize,
}

impl FlatAllMaterializer {
    pub fn new(sequence_image_count: usize) -> Self {
        Self {
            sequence_image_count,
        }
    }
}

impl RecordMaterializer for FlatAllMaterializer {
    fn mode(&self) -> Mode {
        Mode::FlatAll
    }

    fn expands(&self) -> bool {
        true
    }

    fn materialize(
        &self,
        loader: &RecordLoader,
        record: &RawRecord,
        seed: u32,
    ) -> Result<Vec<Sample>> {
        let samples = loader
            .load_all(record, self.sequence_image_count, seed)?
            .into_iter()
            .map(|image| Sample {
                data: SampleData::Image(image),
                label: record.label,
            })
            .collect();
        Ok(samples)
    }
}

/// Produces the image at one slot. Other slots are never read.
#[derive(Debug, Clone)]
pub struct SingleMaterializer {
    image_idx: usize,
}

impl SingleMaterializer {
    /// `image_idx` is the 1-based slot to pick.
    pub fn new(image_idx: usize) -> Self {
        Self { image_idx }
    }
}

impl RecordMaterializer for SingleMaterializer {
    fn mode(&self) -> Mode {
        Mode::Single
    }

    fn materialize(
        &self,
        loader: &RecordLoader,
        record: &RawRecord,
        seed: u32,
    ) -> Result<Vec<Sample>> {
        let image = loader.load_slot(record, self.image_idx, seed)?;
        Ok(vec![Sample {
            data: SampleData::Image(image),
            label: record.label,
        }])
    }
}

/// Produces the images of a record stacked along a new leading axis.
#[derive(Debug, Clone)]
pub struct SequenceMaterializer {
    sequence_image_count: usize,
}

impl SequenceMaterializer {
    pub fn new(sequence_image_count: usize) -> Self {
        Self {
            sequence_image_count,
        }
    }
}

impl RecordMaterializer for SequenceMaterializer {
    fn mode(&self) -> Mode {
        Mode::Sequence
    }

    fn materialize(
        &self,
        loader: &RecordLoader,
        record: &RawRecord,
        seed: u32,
    ) -> Result<Vec<Sample>> {
        let images = loader.load_all(record, self.sequence_image_count, seed)?;

        let expect = images[0].dim();
        if let Some((index, image)) = images
            .iter()
            .enumerate()
            .find(|(_, image)| image.dim() != expect)
        {
            return Err(PipelineError::Decode {
                path: loader.resolve(record, index + 1)?,
                reason: format!(
                    "image shape {:?} differs from the first image of the sequence {:?}",
                    image.dim(),
                    expect
                ),
            }
            .into());
        }

        let views: Vec<_> = images.iter().map(|image| image.view()).collect();
        let stacked = ndarray::stack(Axis(0), &views)?;

        Ok(vec![Sample {
            data: SampleData::Sequence(stacked),
            label: record.label,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageSize;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::{
        collections::HashMap,
        io::Cursor,
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug, Default)]
    struct MemorySource {
        files: HashMap<PathBuf, Vec<u8>>,
        reads: AtomicUsize,
    }

    impl MemorySource {
        fn insert(&mut self, path: &str, width: u32, height: u32, shade: u8) {
            let image = RgbImage::from_pixel(width, height, Rgb([shade, shade / 2, 255 - shade]));
            self.insert_image(path, &image);
        }

        fn insert_image(&mut self, path: &str, image: &RgbImage) {
            let mut bytes = Cursor::new(vec![]);
            DynamicImage::ImageRgb8(image.clone())
                .write_to(&mut bytes, ImageOutputFormat::Png)
                .unwrap();
            self.files
                .insert(Path::new("/data").join(path), bytes.into_inner());
        }
    }

    impl ImageSource for MemorySource {
        fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.files.get(path).cloned().ok_or_else(|| {
                PipelineError::MissingFile {
                    path: path.to_owned(),
                    source: std::io::ErrorKind::NotFound.into(),
                }
                .into()
            })
        }
    }

    fn record() -> RawRecord {
        RawRecord {
            paths: vec!["s/1.png".into(), "s/2.png".into(), "s/3.png".into()],
            label: 1.0,
        }
    }

    fn loader(source: Arc<MemorySource>, is_training: bool) -> RecordLoader {
        let size = ImageSize::new(8, 6).unwrap();
        RecordLoader::new(
            "/data",
            source,
            ImageDecoder::new(Some(size)),
            Augmenter::new(size).unwrap(),
            is_training,
        )
    }

    fn source() -> MemorySource {
        let mut source = MemorySource::default();
        source.insert("s/1.png", 8, 6, 10);
        source.insert("s/2.png", 16, 12, 100);
        source.insert("s/3.png", 4, 3, 200);
        source
    }

    #[test]
    fn all_mode() -> Result<()> {
        let source = Arc::new(source());
        let samples = AllMaterializer::new(3).materialize(&loader(source, true), &record(), 123)?;
        assert_eq!(samples.len(), 1);

        let images = samples[0].data.as_named().unwrap();
        assert_eq!(
            images.keys().cloned().collect_vec(),
            vec!["image1", "image2", "image3"]
        );
        images.values().for_each(|image| {
            assert_eq!(image.dim(), (6, 8, 3));
            assert!(image.iter().all(|&v| (0.0..=1.0).contains(&v)));
        });
        assert_eq!(samples[0].label, 1.0);
        Ok(())
    }

    #[test]
    fn flat_all_mode() -> Result<()> {
        let source = Arc::new(source());
        let samples =
            FlatAllMaterializer::new(3).materialize(&loader(source, false), &record(), 0)?;
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|sample| sample.label == 1.0));

        // slot order is kept, the red channel follows the shade of each file
        let reds = samples
            .iter()
            .map(|sample| sample.data.as_image().unwrap()[[0, 0, 0]])
            .collect_vec();
        assert!(reds[0] < reds[1] && reds[1] < reds[2]);
        Ok(())
    }

    #[test]
    fn single_mode_reads_one_file() -> Result<()> {
        let source = Arc::new(source());
        let loader = loader(source.clone(), true);
        let samples = SingleMaterializer::new(2).materialize(&loader, &record(), 800)?;
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].data.as_image().unwrap().dim(), (6, 8, 3));
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn sequence_mode() -> Result<()> {
        let source = Arc::new(source());
        let samples =
            SequenceMaterializer::new(3).materialize(&loader(source, false), &record(), 0)?;
        let images = samples[0].data.as_sequence().unwrap();
        assert_eq!(images.dim(), (3, 6, 8, 3));
        assert!(images[[0, 0, 0, 0]] < images[[2, 0, 0, 0]]);
        Ok(())
    }

    #[test]
    fn sequence_shape_mismatch() {
        let source = Arc::new(source());
        let loader = RecordLoader::new(
            "/data",
            source,
            ImageDecoder::new(None),
            Augmenter::new(ImageSize::new(8, 6).unwrap()).unwrap(),
            false,
        );
        let err = SequenceMaterializer::new(3)
            .materialize(&loader, &record(), 0)
            .unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::Decode { path, .. }) => {
                assert_eq!(path, Path::new("/data/s/2.png"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn shared_seed_correlates_images() -> Result<()> {
        // asymmetric in both axes, so flips and zooms are visible
        let gradient = RgbImage::from_fn(8, 6, |x, y| {
            Rgb([(x * 30) as u8, (y * 40) as u8, ((x + 2 * y) * 12) as u8])
        });
        let mut source = MemorySource::default();
        for path in ["s/1.png", "s/2.png", "s/3.png"] {
            source.insert_image(path, &gradient);
        }
        let source = Arc::new(source);
        let original = SingleMaterializer::new(1)
            .materialize(&loader(source.clone(), false), &record(), 0)?
            .remove(0);
        let original = original.data.as_image().unwrap().clone();
        let loader = loader(source, true);

        // color, color with zoom, zoom, flip only
        let seeds = [0, 120, 249, 250, 377, 499, 500, 613, 749, 750, 868, 999];
        let mut num_changed = 0;

        for seed in seeds {
            let samples = FlatAllMaterializer::new(3).materialize(&loader, &record(), seed)?;
            let first = samples[0].data.as_image().unwrap();
            samples[1..].iter().for_each(|sample| {
                assert_eq!(sample.data.as_image().unwrap(), first, "seed {}", seed)
            });
            if *first != original {
                num_changed += 1;
            }

            let samples = SequenceMaterializer::new(3).materialize(&loader, &record(), seed)?;
            let images = samples[0].data.as_sequence().unwrap();
            images
                .outer_iter()
                .for_each(|image| assert_eq!(image, first.view(), "seed {}", seed));
        }

        // only flip-only seeds may leave the image as is
        assert!(num_changed >= seeds.len() - 3);
        Ok(())
    }

    #[test]
    fn missing_file_aborts_record() {
        let mut source = source();
        source.files.remove(Path::new("/data/s/3.png"));
        let loader = loader(Arc::new(source), false);

        for materializer in [
            Arc::new(AllMaterializer::new(3)) as Arc<dyn RecordMaterializer>,
            Arc::new(FlatAllMaterializer::new(3)),
            Arc::new(SequenceMaterializer::new(3)),
            Arc::new(SingleMaterializer::new(3)),
        ] {
            let err = materializer.materialize(&loader, &record(), 0).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<PipelineError>(),
                Some(PipelineError::MissingFile { .. })
            ));
        }

        // the other slots are still readable in single mode
        let samples = SingleMaterializer::new(1).materialize(&loader, &record(), 0);
        assert!(samples.is_ok());
    }
}
