//! Stream assembly from a manifest.

use crate::{
    common::*,
    config::{ImageSize, PipelineConfig},
    dataset::{
        repeat_passes, reservoir_shuffle, FsImageSource, ImageSource, Manifest, RawRecord, Sample,
    },
    materializer::{RecordLoader, RecordMaterializer},
    mode::Mode,
    processor::draw_seed,
};

/// Builds sample streams according to a [PipelineConfig].
///
/// The configuration is validated and the record materializer is selected
/// once in [PipelineGenerator::new]. The manifest is loaded on each call to
/// [PipelineGenerator::assemble].
///
/// Manifest loading and image decoding run on `tokio::task::spawn_blocking`,
/// so assembling and polling the stream must happen within a tokio runtime.
/// Polling from another executor, such as `futures::executor::block_on`,
/// panics.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PipelineGenerator {
    config: Arc<PipelineConfig>,
    materializer: Arc<dyn RecordMaterializer>,
    loader: Arc<RecordLoader>,
    size: OnceCell<usize>,
}

/// An assembled stream together with its number of elements per pass.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct AssembledPipeline {
    /// The number of elements in one pass.
    pub size: usize,
    #[derivative(Debug = "ignore")]
    stream: BoxStream<'static, Result<Sample>>,
}

impl AssembledPipeline {
    /// The number of elements in one pass.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<Sample>> {
        self.stream
    }
}

impl PipelineGenerator {
    /// Creates a generator reading images from the file system.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_source(config, Arc::new(FsImageSource))
    }

    /// Creates a generator reading images from `source`.
    pub fn with_source(config: PipelineConfig, source: Arc<dyn ImageSource>) -> Result<Self> {
        config.validate()?;
        let materializer = config
            .mode
            .bind(config.sequence_image_count, config.image_idx)?;
        let loader = RecordLoader::from_config(&config, source)?;

        debug!(
            "pipeline uses {} with {} images per sequence",
            materializer.mode(),
            config.sequence_image_count
        );

        Ok(Self {
            config: Arc::new(config),
            materializer,
            loader: Arc::new(loader),
            size: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.materializer.mode()
    }

    /// The size of the produced images.
    pub fn image_size(&self) -> ImageSize {
        self.config.effective_image_size()
    }

    /// The number of elements per pass.
    ///
    /// It is known only after the pipeline is assembled. Before that, a
    /// warning is logged and `None` is returned.
    pub fn size(&self) -> Option<usize> {
        let size = self.size.get().copied();
        if size.is_none() {
            warn!("the size cannot be determined before the pipeline is assembled");
        }
        size
    }

    /// Assembles the stream with a random generator seeded from the
    /// configuration, or from entropy if no seed is configured.
    pub async fn assemble(&self) -> Result<AssembledPipeline> {
        let rng = match self.config.runtime.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.assemble_with_rng(rng).await
    }

    /// Assembles the stream.
    ///
    /// The returned stream must be polled within a tokio runtime.
    /// `rng` draws the augmentation seed of every record and drives the
    /// shuffle in training mode.
    pub async fn assemble_with_rng<R>(&self, mut rng: R) -> Result<AssembledPipeline>
    where
        R: 'static + Rng + Send,
    {
        let config = &*self.config;

        // load manifest
        let manifest = {
            let path = config.dataset_file.clone();
            tokio::task::spawn_blocking(move || Manifest::load(path)).await??
        };
        let records = manifest.records(config.sequence_image_count, &config.label_name)?;
        let num_records = records.len();

        let size = num_records * self.mode().elements_per_record(config.sequence_image_count);
        if self.size.set(size).is_err() && self.size.get() != Some(&size) {
            warn!(
                "the manifest size changed since the last assembly, size() keeps reporting {:?}",
                self.size.get()
            );
        }

        let pass = PassBuilder {
            records: Arc::new(records),
            materializer: self.materializer.clone(),
            loader: self.loader.clone(),
            num_workers: config.num_workers(),
        };

        let stream = if !config.is_training {
            let seeds = draw_seeds(&mut rng, num_records);
            pass.build(seeds)
        } else if num_records == 0 {
            warn!(
                "the manifest '{}' has no records, the training stream is empty",
                config.dataset_file.display()
            );
            stream::empty().boxed()
        } else {
            let buffer_size = config.shuffle_buffer_size;
            info!("the dataset is prepared for training, it is shuffled and repeated indefinitely");

            repeat_passes(move |epoch| {
                debug!("start pass {}", epoch);
                let seeds = draw_seeds(&mut rng, num_records);
                let shuffle_rng = StdRng::seed_from_u64(rng.gen());
                reservoir_shuffle(pass.build(seeds), buffer_size, shuffle_rng)
            })
            .boxed()
        };

        Ok(AssembledPipeline { size, stream })
    }
}

fn draw_seeds<R>(rng: &mut R, count: usize) -> Vec<u32>
where
    R: Rng,
{
    (0..count).map(|_| draw_seed(rng)).collect()
}

/// Builds one pass over the records.
#[derive(Debug, Clone)]
struct PassBuilder {
    records: Arc<Vec<RawRecord>>,
    materializer: Arc<dyn RecordMaterializer>,
    loader: Arc<RecordLoader>,
    num_workers: usize,
}

impl PassBuilder {
    /// Records are materialized on blocking threads. Expanding materializers
    /// run one record at a time, others run up to `num_workers` records
    /// concurrently. Elements are emitted in record order either way.
    fn build(&self, seeds: Vec<u32>) -> BoxStream<'static, Result<Sample>> {
        let Self {
            records,
            materializer,
            loader,
            num_workers,
        } = self.clone();
        let expands = materializer.expands();

        let jobs = stream::iter(seeds.into_iter().enumerate()).map(move |(index, seed)| {
            let records = records.clone();
            let materializer = materializer.clone();
            let loader = loader.clone();

            async move {
                let samples = tokio::task::spawn_blocking(move || {
                    materializer.materialize(&loader, &records[index], seed)
                })
                .await??;
                Fallible::Ok(samples)
            }
        });

        let samples = if expands {
            jobs.then(|job| job).boxed()
        } else {
            jobs.buffered(num_workers.max(1)).boxed()
        };

        samples
            .map_ok(|samples| stream::iter(samples.into_iter().map(Fallible::Ok)))
            .try_flatten()
            .boxed()
    }
}
