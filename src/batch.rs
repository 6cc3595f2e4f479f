use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::convert::Converter;
use crate::dataset::{Dataset, select_record};
use crate::docx::{FillReport, TemplateDocument};
use crate::error::Error;
use crate::replacements::ReplacementMap;

pub const DEFAULT_MARKER: &str = "模板";
pub const DEFAULT_COPIES: u32 = 3;

#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub data: PathBuf,
    pub templates: PathBuf,
    pub output: PathBuf,
    /// Filled documents produced per template.
    pub copies: u32,
    /// Template file names are cut at this marker to get the output name.
    pub marker: String,
    /// Export each produced document to PDF when set.
    pub converter: Option<Converter>,
    /// Seed for reproducible shuffles and draws.
    pub seed: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            data: PathBuf::from("values.xlsx"),
            templates: PathBuf::from("input"),
            output: PathBuf::from("output"),
            copies: DEFAULT_COPIES,
            marker: DEFAULT_MARKER.to_string(),
            converter: None,
            seed: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub produced: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub converted: Vec<PathBuf>,
    pub conversion_failures: usize,
}

pub(crate) fn is_docx(path: &Path) -> bool {
    let is_lock_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"));
    path.is_file()
        && !is_lock_file
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"))
}

/// Every `.docx` directly inside `folder`, sorted by path. Word lock files
/// (`~$…`) are skipped.
pub fn discover_templates(folder: &Path) -> Result<Vec<PathBuf>, Error> {
    let entries = std::fs::read_dir(folder).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", e, folder.display()),
        ))
    })?;
    let mut templates = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if is_docx(&path) {
            templates.push(path);
        }
    }
    templates.sort();
    Ok(templates)
}

/// Output base name: the template file name up to `marker`, or the whole
/// stem when the marker does not occur.
pub fn output_base_name(template: &Path, marker: &str) -> String {
    let file_name = template
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    match file_name.split_once(marker) {
        Some((base, _)) if !marker.is_empty() => base.to_string(),
        _ => template
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string(),
    }
}

/// `<base>01.docx`, `<base>02.docx`, …
pub fn output_file_name(base: &str, index: u32) -> String {
    format!("{base}{index:02}.docx")
}

/// Fill one template with one freshly drawn record and save it to `output`.
/// The record is shared by every paragraph of the document.
pub fn fill_template<R: Rng + ?Sized>(
    template: &Path,
    dataset: &Dataset,
    rng: &mut R,
    output: &Path,
) -> Result<FillReport, Error> {
    let t0 = Instant::now();

    let mut document = TemplateDocument::open(template)?;
    let record = select_record(dataset, rng)?;
    let replacements = ReplacementMap::from_record(record)?;
    let t_load = t0.elapsed();

    let report = document.fill(&replacements)?;
    let t_fill = t0.elapsed();

    document.save(output)?;
    let t_total = t0.elapsed();

    log::info!("Saved filled document: {}", output.display());
    log::debug!(
        "Timing: load={:.1}ms, fill={:.1}ms, save={:.1}ms, total={:.1}ms ({} replacements in {} paragraphs)",
        t_load.as_secs_f64() * 1000.0,
        (t_fill - t_load).as_secs_f64() * 1000.0,
        (t_total - t_fill).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        report.replaced,
        report.paragraphs,
    );
    Ok(report)
}

/// Run the whole batch. Dataset and template-folder problems abort before
/// anything is written; a failure while filling one output is logged and the
/// batch moves on.
pub fn run(config: &BatchConfig) -> Result<BatchSummary, Error> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut dataset = Dataset::load(&config.data)?;
    dataset.shuffle(&mut rng);
    let templates = discover_templates(&config.templates)?;
    log::info!(
        "Found {} template(s) in {}",
        templates.len(),
        config.templates.display()
    );
    std::fs::create_dir_all(&config.output)?;

    let mut summary = BatchSummary::default();
    for template in &templates {
        let base = output_base_name(template, &config.marker);
        for i in 1..=config.copies {
            let output = config.output.join(output_file_name(&base, i));
            match fill_template(template, &dataset, &mut rng, &output) {
                Ok(_) => summary.produced.push(output.clone()),
                Err(e) => {
                    let e = Error::Fill {
                        template: template.clone(),
                        source: Box::new(e),
                    };
                    log::error!("{e}");
                    summary.failed.push((template.clone(), e.to_string()));
                    continue;
                }
            }
            if let Some(converter) = &config.converter {
                match converter.to_pdf(&output) {
                    Ok(pdf) => summary.converted.push(pdf),
                    Err(e) => {
                        log::error!("{e}");
                        summary.conversion_failures += 1;
                    }
                }
            }
        }
    }

    log::info!(
        "Batch finished: {} produced, {} failed",
        summary.produced.len(),
        summary.failed.len()
    );
    Ok(summary)
}
