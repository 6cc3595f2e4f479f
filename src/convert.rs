//! Fixed-layout (PDF) export of filled documents through an office suite
//! running headless.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use crate::error::Error;

#[derive(Clone, Debug)]
pub struct Converter {
    program: PathBuf,
}

impl Default for Converter {
    fn default() -> Self {
        Converter {
            program: PathBuf::from("soffice"),
        }
    }
}

impl Converter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Converter {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Convert `input` to a PDF next to it with the same base name.
    pub fn to_pdf(&self, input: &Path) -> Result<PathBuf, Error> {
        let t0 = Instant::now();
        let out_dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let target = pdf_path_for(input);

        // A PDF left by an earlier run must not pass for this conversion.
        match std::fs::remove_file(&target) {
            Ok(()) => log::debug!("Removed stale {}", target.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Conversion {
                    path: input.to_path_buf(),
                    reason: format!("cannot replace {}: {e}", target.display()),
                });
            }
        }

        let output = Command::new(&self.program)
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(out_dir)
            .arg(input)
            .output()
            .map_err(|e| Error::Conversion {
                path: input.to_path_buf(),
                reason: format!("cannot run {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            return Err(Error::Conversion {
                path: input.to_path_buf(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        if !target.exists() {
            return Err(Error::Conversion {
                path: input.to_path_buf(),
                reason: format!("{} was not produced", target.display()),
            });
        }

        log::info!(
            "Converted {} -> {} in {:.1}ms",
            input.display(),
            target.display(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(target)
    }
}

pub fn pdf_path_for(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}

#[derive(Debug, Default)]
pub struct ConversionSummary {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Convert every `.docx` directly inside `folder`. A failing file is logged
/// and skipped.
pub fn convert_folder(folder: &Path, converter: &Converter) -> Result<ConversionSummary, Error> {
    let mut inputs: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| crate::batch::is_docx(p))
        .collect();
    inputs.sort();

    let mut summary = ConversionSummary::default();
    for input in inputs {
        match converter.to_pdf(&input) {
            Ok(pdf) => summary.converted.push(pdf),
            Err(e) => {
                log::error!("{e}");
                summary.failed.push((input, e.to_string()));
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_shares_the_base_name() {
        assert_eq!(
            pdf_path_for(Path::new("output/报告01.docx")),
            PathBuf::from("output/报告01.pdf")
        );
    }

    #[test]
    fn missing_converter_is_a_conversion_error() {
        let converter = Converter::new("/nonexistent/docx-fill-converter");
        let err = converter.to_pdf(Path::new("whatever.docx")).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn converter_that_writes_nothing_fails_despite_old_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("x01.docx");
        std::fs::write(&input, b"docx").unwrap();
        let stale = pdf_path_for(&input);
        std::fs::write(&stale, b"%PDF old").unwrap();

        let err = Converter::new("true").to_pdf(&input).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));
        assert!(!stale.exists());
    }
}
