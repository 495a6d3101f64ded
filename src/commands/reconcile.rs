use crate::args::ReconcileArgs;
use crate::commands::Out;
use crate::extract::ledger;
use crate::model::MappingStore;
use crate::recon::{run, PdfDocument, RunReport};
use crate::{utils, Config, Result};
use anyhow::Context;
use tracing::{debug, info};

/// Reconciles the payroll summaries of `args` against its ledger export.
///
/// The mapping is resolved once and a single snapshot of it is used for the whole run. A payroll
/// summary that cannot be read is reported in the output rather than failing the command. With
/// `--output` the report is written to that file and not returned.
///
/// # Errors
/// - No mapping document found, or an invalid one.
/// - The ledger export cannot be read.
/// - None of the payroll summaries contains a recognizable table.
pub async fn reconcile(config: &Config, args: &ReconcileArgs) -> Result<Out<RunReport>> {
    let mapping_path = config.find_mapping(args.mapping())?;
    let store = MappingStore::open(&mapping_path)?;
    let table = store.snapshot();
    info!(
        "Using mapping {} ({} entries)",
        mapping_path.display(),
        table.len()
    );

    let bytes = utils::read_bytes(args.ledger()).await?;
    let ledger = ledger::extract(&ledger::decode(bytes));

    let mut documents = Vec::with_capacity(args.pdfs().len());
    for pdf in args.pdfs() {
        let name = pdf.display().to_string();
        let document = match utils::read(pdf).await {
            Ok(json) => PdfDocument::parse(name, &json),
            Err(e) => PdfDocument::failed(name, format!("{e:#}")),
        };
        debug!("Loaded payroll summary {}", document.name());
        documents.push(document);
    }

    let options = config.run_options(args.tolerance());
    let report = run(&documents, &ledger, &table, &options)?;
    let verdict = if report.is_clean() {
        "no divergences"
    } else {
        "divergences found"
    };

    match args.output() {
        Some(output) => {
            let json =
                serde_json::to_string_pretty(&report).context("Unable to serialize the report")?;
            utils::write(output, json).await?;
            Ok(Out::new_message(format!(
                "Reconciliation finished with {verdict}, report written to {}",
                output.display()
            )))
        }
        None => Ok(Out::new(
            format!("Reconciliation finished with {verdict}"),
            report,
        )),
    }
}
