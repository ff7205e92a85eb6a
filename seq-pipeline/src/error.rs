//! Error kinds surfaced by the pipeline.
//!
//! Every fallible function returns [anyhow::Result]. Failures that a caller
//! may want to branch on are raised as a [PipelineError] and can be recovered
//! with `error.downcast_ref::<PipelineError>()`.

use crate::common::*;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid configuration detected at construction time.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The selected image slot is outside of `1..=count`.
    #[error("image index {index} is out of bounds, expect a value in 1..={count}")]
    ImageIndex { index: usize, count: usize },
    /// The image file cannot be read.
    #[error("unable to read image file '{}'", .path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The bytes cannot be decoded into an image of the expected shape.
    #[error("unable to decode image '{}': {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    /// The manifest file is malformed.
    #[error("malformed manifest '{}': {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn config(reason: impl Display) -> Self {
        Self::Config(reason.to_string())
    }

    /// Returns true for errors raised while validating the configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::ImageIndex { .. })
    }
}
