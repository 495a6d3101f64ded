use crate::commands::Out;
use crate::extract::{
    extract_general, ledger, GeneralSummary, LedgerExtraction, PdfExtraction, TokenDump,
};
use crate::{utils, Config, Result};
use anyhow::{bail, Context};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The extraction result of one payroll summary.
#[derive(Debug, Clone, Serialize)]
pub struct PdfFileExtraction {
    pub file: PathBuf,
    #[serde(flatten)]
    pub extraction: PdfExtraction,
    /// The consolidated figures, when the file is a general summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralSummary>,
}

/// Extracts the payroll events of each token dump in `files`. Uses the extractor settings of
/// `config`, never the mapping.
///
/// # Errors
/// - Returns an error if a file cannot be read or is not a token dump.
pub async fn extract_pdf(
    config: &Config,
    files: &[PathBuf],
) -> Result<Out<Vec<PdfFileExtraction>>> {
    let extractor = config.extractor();
    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let json = utils::read(file).await?;
        let dump = TokenDump::parse(&json)
            .with_context(|| format!("{} is not a valid token dump", file.display()))?;
        let extraction = extractor.extract(&dump);
        if extraction.tables_found == 0 {
            warn!("No payroll table found in {}", file.display());
        }
        for warning in &extraction.warnings {
            debug!("{}: {warning}", file.display());
        }
        let general = Some(extract_general(&dump, extractor.y_tolerance()))
            .filter(|summary| !summary.is_empty());
        results.push(PdfFileExtraction {
            file: file.clone(),
            extraction,
            general,
        });
    }
    let events: usize = results.iter().map(|r| r.extraction.events.len()).sum();
    Ok(Out::new(
        format!("Extracted {events} payroll events from {} file(s)", files.len()),
        results,
    ))
}

/// Extracts the postings of a ledger export, detecting the delimiter unless one is given.
///
/// # Errors
/// - Returns an error if the file cannot be read or `delimiter` is not a single-byte character.
pub async fn extract_ledger(file: &Path, delimiter: Option<char>) -> Result<Out<LedgerExtraction>> {
    let bytes = utils::read_bytes(file).await?;
    let text = ledger::decode(bytes);
    let extraction = match delimiter {
        Some(c) if c.is_ascii() => ledger::extract_with_delimiter(&text, c as u8),
        Some(c) => bail!("The delimiter must be an ASCII character, got '{c}'"),
        None => ledger::extract(&text),
    };
    Ok(Out::new(
        format!(
            "Extracted {} ledger rows from {} ({} skipped)",
            extraction.rows.len(),
            file.display(),
            extraction.skipped
        ),
        extraction,
    ))
}
