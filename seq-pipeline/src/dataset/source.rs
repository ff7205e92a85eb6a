use crate::{common::*, error::PipelineError};

/// Reads raw image bytes by path.
pub trait ImageSource
where
    Self: Debug + Send + Sync,
{
    /// Reads the whole file. Fails with [PipelineError::MissingFile] if the
    /// path is not readable.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads images from the local file system.
#[derive(Debug, Clone, Default)]
pub struct FsImageSource;

impl ImageSource for FsImageSource {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|source| {
            PipelineError::MissingFile {
                path: path.to_owned(),
                source,
            }
            .into()
        })
    }
}
