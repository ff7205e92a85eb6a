//! Output modes and the materializer binding.

use crate::{
    common::*,
    error::PipelineError,
    materializer::{
        AllMaterializer, FlatAllMaterializer, RecordMaterializer, SequenceMaterializer,
        SingleMaterializer,
    },
};

/// The shape of the elements produced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// All images of a sequence in a map keyed by the column name.
    #[serde(rename = "mode_all")]
    All,
    /// Each image of a sequence as a separate element.
    #[serde(rename = "mode_flat_all")]
    FlatAll,
    /// Only the image at the selected slot.
    #[serde(rename = "mode_single")]
    Single,
    /// All images of a sequence stacked into one array.
    #[serde(rename = "mode_sequence")]
    Sequence,
}

impl Mode {
    pub const VARIANTS: [Mode; 4] = [Mode::All, Mode::FlatAll, Mode::Single, Mode::Sequence];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::All => "mode_all",
            Mode::FlatAll => "mode_flat_all",
            Mode::Single => "mode_single",
            Mode::Sequence => "mode_sequence",
        }
    }

    /// The number of stream elements produced per manifest row.
    pub fn elements_per_record(&self, sequence_image_count: usize) -> usize {
        match self {
            Mode::FlatAll => sequence_image_count,
            _ => 1,
        }
    }

    /// Validates mode specific options and builds the materializer for this mode.
    ///
    /// `image_idx` is 1-based and only checked in single mode.
    pub fn bind(
        &self,
        sequence_image_count: usize,
        image_idx: usize,
    ) -> Result<Arc<dyn RecordMaterializer>> {
        if sequence_image_count == 0 {
            return Err(PipelineError::config("sequence_image_count must be positive").into());
        }

        let materializer: Arc<dyn RecordMaterializer> = match self {
            Mode::All => Arc::new(AllMaterializer::new(sequence_image_count)),
            Mode::FlatAll => Arc::new(FlatAllMaterializer::new(sequence_image_count)),
            Mode::Sequence => Arc::new(SequenceMaterializer::new(sequence_image_count)),
            Mode::Single => {
                if image_idx == 0 || image_idx > sequence_image_count {
                    return Err(PipelineError::ImageIndex {
                        index: image_idx,
                        count: sequence_image_count,
                    }
                    .into());
                }
                Arc::new(SingleMaterializer::new(image_idx))
            }
        };

        Ok(materializer)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::All
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Mode::VARIANTS
            .iter()
            .find(|mode| mode.as_str() == text)
            .copied()
            .ok_or_else(|| {
                let names = Mode::VARIANTS.iter().map(Mode::as_str).join(", ");
                PipelineError::config(format!(
                    "invalid mode '{}', please select one from [{}]",
                    text, names
                ))
                .into()
            })
    }
}
