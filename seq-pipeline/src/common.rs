pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use derivative::Derivative;
pub use futures::{
    future,
    stream::{self, BoxStream, Stream, StreamExt as _, TryStreamExt as _},
};
pub use image::{imageops, imageops::FilterType, DynamicImage, Rgb32FImage};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use log::{debug, info, warn};
pub use ndarray::{Array3, Array4, Axis};
pub use noisy_float::prelude::*;
pub use once_cell::sync::OnceCell;
pub use rand::prelude::*;
pub use serde::{Deserialize, Deserializer, Serialize, Serializer};
pub use std::{
    fmt::{self, Debug, Display},
    iter,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::Pin,
    str::FromStr,
    sync::Arc,
};

pub type Fallible<T> = Result<T, Error>;
