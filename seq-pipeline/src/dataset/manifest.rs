use super::{image_column_name, RawRecord};
use crate::{common::*, error::PipelineError};

/// The CSV manifest listing image sequences and labels.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub headers: Vec<String>,
    /// Rows in file order, each mapping column name to value.
    pub rows: Vec<IndexMap<String, String>>,
}

impl Manifest {
    /// Parses the manifest file. Lines starting with `#` are ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let malformed = |err: csv::Error| PipelineError::Manifest {
            path: path.to_owned(),
            reason: err.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(malformed)?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(ToOwned::to_owned)
            .collect();
        let rows: Vec<_> = reader
            .records()
            .map(|record| -> Result<_> {
                let record = record.map_err(malformed)?;
                let row: IndexMap<_, _> = headers
                    .iter()
                    .cloned()
                    .zip(record.iter().map(ToOwned::to_owned))
                    .collect();
                Ok(row)
            })
            .try_collect()?;

        debug!("loaded {} rows from manifest '{}'", rows.len(), path.display());

        Ok(Self {
            path: path.to_owned(),
            headers,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Builds raw records from columns `image1` to `imageN` and the label column.
    pub fn records(&self, sequence_image_count: usize, label_name: &str) -> Result<Vec<RawRecord>> {
        let image_columns: Vec<String> = (1..=sequence_image_count)
            .map(image_column_name)
            .collect();

        image_columns
            .iter()
            .map(String::as_str)
            .chain(iter::once(label_name))
            .try_for_each(|column| -> Result<()> {
                if !self.headers.iter().any(|header| header == column) {
                    return Err(PipelineError::config(format!(
                        "column '{}' is not found in manifest '{}'",
                        column,
                        self.path.display()
                    ))
                    .into());
                }
                Ok(())
            })?;

        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| -> Result<_> {
                let paths = image_columns
                    .iter()
                    .map(|column| PathBuf::from(&row[column.as_str()]))
                    .collect();
                let label = parse_label(&row[label_name]).ok_or_else(|| {
                    PipelineError::Manifest {
                        path: self.path.clone(),
                        reason: format!(
                            "row {} has non-numeric label '{}'",
                            index + 1,
                            row[label_name]
                        ),
                    }
                })?;
                Ok(RawRecord { paths, label })
            })
            .try_collect()
    }
}

fn parse_label(text: &str) -> Option<f32> {
    match text.to_ascii_lowercase().as_str() {
        "true" => Some(1.0),
        "false" => Some(0.0),
        text => text.parse::<f32>().ok().filter(|value| value.is_finite()),
    }
}
