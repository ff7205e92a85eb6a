//! Pipeline configuration format.

use crate::{common::*, error::PipelineError, mode::Mode};

/// The pipeline configuration.
///
/// It is captured once by [PipelineGenerator](crate::pipeline::PipelineGenerator)
/// and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// The CSV manifest listing image sequences and labels.
    pub dataset_file: PathBuf,
    /// The directory that manifest image paths are relative to.
    pub images_dir: PathBuf,
    /// The number of images per sequence, columns `image1` to `imageN`.
    #[serde(default = "default_sequence_image_count")]
    pub sequence_image_count: usize,
    /// The name of the label column.
    #[serde(default = "default_label_name")]
    pub label_name: String,
    #[serde(default)]
    pub mode: Mode,
    /// The output image size. It is overridden by `resize` if set.
    #[serde(default)]
    pub image_size: ImageSize,
    /// The 1-based image slot picked in single mode.
    #[serde(default = "default_image_idx")]
    pub image_idx: usize,
    /// If set, decoded images are resized to this size.
    #[serde(default)]
    pub resize: Option<ImageSize>,
    /// Enables augmentation, shuffling and infinite repeat.
    #[serde(default = "default_is_training")]
    pub is_training: bool,
    /// The reservoir size of the shuffle buffer.
    #[serde(default = "default_shuffle_buffer_size")]
    pub shuffle_buffer_size: usize,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl PipelineConfig {
    /// Creates a configuration with default options.
    pub fn new(dataset_file: impl Into<PathBuf>, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_file: dataset_file.into(),
            images_dir: images_dir.into(),
            sequence_image_count: default_sequence_image_count(),
            label_name: default_label_name(),
            mode: Mode::default(),
            image_size: ImageSize::default(),
            image_idx: default_image_idx(),
            resize: None,
            is_training: default_is_training(),
            shuffle_buffer_size: default_shuffle_buffer_size(),
            runtime: RuntimeConfig::default(),
        }
    }

    /// Loads a json5 configuration file.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Self = json5::from_str(&text)
            .map_err(|err| PipelineError::config(err))
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }

    /// The size of produced images, taking `resize` into account.
    pub fn effective_image_size(&self) -> ImageSize {
        self.resize.unwrap_or(self.image_size)
    }

    /// The number of blocking workers used to materialize records.
    pub fn num_workers(&self) -> usize {
        self.runtime
            .num_workers
            .map(NonZeroUsize::get)
            .unwrap_or_else(num_cpus::get)
    }

    /// Checks the invariants that do not depend on the mode.
    pub fn validate(&self) -> Result<()> {
        if self.sequence_image_count == 0 {
            return Err(PipelineError::config("sequence_image_count must be positive").into());
        }
        if self.label_name.is_empty() {
            return Err(PipelineError::config("label_name must not be empty").into());
        }
        self.image_size
            .validate()
            .context("invalid image_size option")?;
        if let Some(resize) = &self.resize {
            resize.validate().context("invalid resize option")?;
        }
        if self.is_training && self.shuffle_buffer_size == 0 {
            return Err(
                PipelineError::config("shuffle_buffer_size must be positive in training mode")
                    .into(),
            );
        }
        Ok(())
    }
}

/// Options passed through to the stream runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// The maximum number of records decoded concurrently. Defaults to the number of CPUs.
    #[serde(default)]
    pub num_workers: Option<NonZeroUsize>,
    /// Seeds the pipeline random generator. Entropy is used if not set.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let size = Self { width, height };
        size.validate()?;
        Ok(size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::config(format!(
                "image size must be positive, but get {}x{}",
                self.width, self.height
            ))
            .into());
        }
        Ok(())
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
        }
    }
}

impl Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn default_sequence_image_count() -> usize {
    3
}

fn default_label_name() -> String {
    "has_animal".into()
}

fn default_image_idx() -> usize {
    1
}

fn default_is_training() -> bool {
    true
}

fn default_shuffle_buffer_size() -> usize {
    10000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json5_config_defaults() -> Result<()> {
        let text = r#"{
            dataset_file: "train.csv",
            images_dir: "images",
        }"#;
        let config: PipelineConfig = json5::from_str(text)?;
        assert_eq!(config, PipelineConfig::new("train.csv", "images"));
        assert_eq!(config.sequence_image_count, 3);
        assert_eq!(config.label_name, "has_animal");
        assert_eq!(config.mode, Mode::All);
        assert_eq!(config.image_size, ImageSize::new(224, 224)?);
        assert!(config.is_training);
        assert_eq!(config.shuffle_buffer_size, 10000);
        Ok(())
    }

    #[test]
    fn json5_config_overrides() -> Result<()> {
        let text = r#"{
            dataset_file: "val.csv",
            images_dir: "images",
            sequence_image_count: 5,
            label_name: "label",
            mode: "mode_single",
            image_idx: 4,
            resize: { width: 64, height: 32 },
            is_training: false,
            runtime: { num_workers: 2, rng_seed: 7 },
        }"#;
        let config: PipelineConfig = json5::from_str(text)?;
        assert_eq!(config.mode, Mode::Single);
        assert_eq!(config.image_idx, 4);
        assert_eq!(config.effective_image_size(), ImageSize::new(64, 32)?);
        assert_eq!(config.num_workers(), 2);
        assert_eq!(config.runtime.rng_seed, Some(7));
        Ok(())
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let text = r#"{ dataset_file: "a.csv", images_dir: ".", mode: "mode_mask_mog2" }"#;
        assert!(json5::from_str::<PipelineConfig>(text).is_err());
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let mut config = PipelineConfig::new("a.csv", ".");
        config.resize = Some(ImageSize {
            width: 0,
            height: 10,
        });
        let err = config.validate().unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().unwrap().is_config());

        let mut config = PipelineConfig::new("a.csv", ".");
        config.sequence_image_count = 0;
        assert!(config.validate().is_err());
    }
}
