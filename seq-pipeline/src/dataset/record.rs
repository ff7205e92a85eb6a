use crate::common::*;

/// One manifest row reduced to its image paths and label.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Image paths relative to the image directory, in slot order.
    pub paths: Vec<PathBuf>,
    pub label: f32,
}

impl RawRecord {
    /// Gets the path at the 1-based `slot`.
    pub fn path(&self, slot: usize) -> Option<&Path> {
        let index = slot.checked_sub(1)?;
        self.paths.get(index).map(PathBuf::as_path)
    }
}

/// The element produced by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub data: SampleData,
    pub label: f32,
}

/// The image data of a [Sample]. The variant depends on the pipeline mode.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    /// Images keyed by column name `image1` to `imageN`, in slot order.
    Named(IndexMap<String, Array3<f32>>),
    /// One image in `[height, width, 3]` shape.
    Image(Array3<f32>),
    /// Stacked images in `[N, height, width, 3]` shape.
    Sequence(Array4<f32>),
}

impl SampleData {
    pub fn as_named(&self) -> Option<&IndexMap<String, Array3<f32>>> {
        match self {
            Self::Named(images) => Some(images),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Array3<f32>> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Array4<f32>> {
        match self {
            Self::Sequence(images) => Some(images),
            _ => None,
        }
    }

    /// Short human readable description of the shapes.
    pub fn describe(&self) -> String {
        match self {
            Self::Named(images) => images
                .iter()
                .map(|(name, image)| format!("{}: {:?}", name, image.shape()))
                .join(", "),
            Self::Image(image) => format!("{:?}", image.shape()),
            Self::Sequence(images) => format!("{:?}", images.shape()),
        }
    }
}

/// The column name of the 1-based image `slot`.
pub fn image_column_name(slot: usize) -> String {
    format!("image{}", slot)
}
