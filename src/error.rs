use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dataset contains no rows")]
    EmptyDataset,

    #[error("field {field} is not a decimal number: {value:?}")]
    MalformedNumericField { field: String, value: String },

    #[error("dataset is missing required column {0:?}")]
    MissingColumn(String),

    #[error("unsupported dataset format: {}", .0.display())]
    UnsupportedDataset(PathBuf),

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("cannot load template {}: {reason}", path.display())]
    TemplateLoad { path: PathBuf, reason: String },

    #[error("run sequence out of sync with paragraph text: {0}")]
    ContainerConsistency(String),

    #[error("conversion of {} failed: {reason}", path.display())]
    Conversion { path: PathBuf, reason: String },

    #[error("filling template {} failed: {source}", template.display())]
    Fill {
        template: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn template_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::TemplateLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
