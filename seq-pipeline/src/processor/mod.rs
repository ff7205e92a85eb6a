//! Data preprocessing building blocks.

pub mod augment;
pub mod color_jitter;
pub mod decode;
pub mod transform;

pub use augment::*;
pub use color_jitter::*;
pub use decode::*;
pub use transform::{center_zoom, flip_horizontal};
