//! Manifest loading and stream building blocks.

mod manifest;
mod record;
mod source;
mod streaming;

pub use manifest::*;
pub use record::*;
pub use source::*;
pub use streaming::*;
