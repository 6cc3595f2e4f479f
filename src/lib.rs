mod batch;
mod convert;
mod dataset;
mod docx;
mod engine;
mod error;
mod model;
mod replacements;

pub use batch::{
    BatchConfig, BatchSummary, DEFAULT_COPIES, DEFAULT_MARKER, discover_templates, fill_template,
    output_base_name, output_file_name, run,
};
pub use convert::{ConversionSummary, Converter, convert_folder, pdf_path_for};
pub use dataset::{Dataset, Field, Record, select_record};
pub use docx::{FillReport, Package, StyleDefinition, StyleKind, StyleSnapshot, TemplateDocument};
pub use engine::{RichTextContainer, SubstitutionReport, substitute};
pub use error::Error;
pub use model::{Run, RunFonts, RunProperties};
pub use replacements::{ReplacementMap, format_amount};

use std::path::Path;

/// Fill a template from an in-memory record and write the result. Unlike
/// [`fill_template`] no random draw is involved.
pub fn fill_with_record(
    template: &Path,
    record: &Record,
    output: &Path,
) -> Result<FillReport, Error> {
    let mut document = TemplateDocument::open(template)?;
    let replacements = ReplacementMap::from_record(record)?;
    let report = document.fill(&replacements)?;
    document.save(output)?;
    log::info!(
        "Filled {} -> {} ({} replacements)",
        template.display(),
        output.display(),
        report.replaced
    );
    Ok(report)
}
