//! Data input pipeline for image sequence datasets.
//!
//! A CSV manifest lists sequences of images with a label. The pipeline
//! decodes, augments and arranges the images of each row according to a
//! [Mode](mode::Mode) and yields the results as an asynchronous stream.

mod common;
pub mod config;
pub mod dataset;
pub mod error;
pub mod materializer;
pub mod mode;
pub mod pipeline;
pub mod processor;

pub use config::{ImageSize, PipelineConfig, RuntimeConfig};
pub use dataset::{RawRecord, Sample, SampleData};
pub use error::PipelineError;
pub use mode::Mode;
pub use pipeline::{AssembledPipeline, PipelineGenerator};
