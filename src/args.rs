//! These structs provide the CLI interface for the payroll-recon CLI.

use crate::recon::Tolerance;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// payroll-recon: compares payroll summaries against an accounting ledger export.
///
/// Payroll events are extracted from the token layout of each payroll summary PDF, ledger postings
/// from a delimited text export, and the two sides are connected by a mapping document
/// (mapeamento_dp.json) that links each payroll event to the ledger codes it is posted under. The
/// result is a discrepancy report by category, by event and by ledger code.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the recon home directory with a default settings.json.
    ///
    /// When --mapping is given the mapping document is validated and copied into the home, where
    /// later runs find it when no other mapping is available.
    Init(InitArgs),
    /// Extract the payroll events of one or more payroll summaries and print them as JSON.
    ExtractPdf(ExtractPdfArgs),
    /// Extract the postings of a ledger export and print them as JSON.
    ExtractLedger(ExtractLedgerArgs),
    /// Reconcile payroll summaries against a ledger export.
    Reconcile(ReconcileArgs),
    /// Validate a mapping document and print it in its normalized form.
    Mapping(MappingArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory holding settings.json and the default mapping. Defaults to ~/payroll-recon
    #[arg(long, env = "RECON_HOME", default_value_t = default_recon_home())]
    recon_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, recon_home: PathBuf) -> Self {
        Self {
            log_level,
            recon_home: recon_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn recon_home(&self) -> &DisplayPath {
        &self.recon_home
    }
}

/// (Not shown): Args for the `payroll-recon init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// A mapping document to install into the recon home.
    #[arg(long)]
    mapping: Option<PathBuf>,
}

impl InitArgs {
    pub fn new(mapping: Option<PathBuf>) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> Option<&Path> {
        self.mapping.as_deref()
    }
}

/// (Not shown): Args for the `payroll-recon extract-pdf` command.
#[derive(Debug, Parser, Clone)]
pub struct ExtractPdfArgs {
    /// Token dumps of the payroll summaries.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl ExtractPdfArgs {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// (Not shown): Args for the `payroll-recon extract-ledger` command.
#[derive(Debug, Parser, Clone)]
pub struct ExtractLedgerArgs {
    /// The ledger export.
    file: PathBuf,

    /// The field delimiter. Detected from the first lines when omitted.
    #[arg(long)]
    delimiter: Option<char>,
}

impl ExtractLedgerArgs {
    pub fn new(file: impl Into<PathBuf>, delimiter: Option<char>) -> Self {
        Self {
            file: file.into(),
            delimiter,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn delimiter(&self) -> Option<char> {
        self.delimiter
    }
}

/// (Not shown): Args for the `payroll-recon reconcile` command.
#[derive(Debug, Parser, Clone)]
pub struct ReconcileArgs {
    /// The ledger export.
    #[arg(long)]
    ledger: PathBuf,

    /// Token dumps of the payroll summaries of the period.
    #[arg(required = true)]
    pdfs: Vec<PathBuf>,

    /// The mapping document. Searched for as mapeamento_dp.json in the working directory, its
    /// parent and the recon home when omitted.
    #[arg(long, env = "RECON_MAPPING")]
    mapping: Option<PathBuf>,

    /// Write the report to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Largest difference that still counts as a match, e.g. 0.01
    #[arg(long)]
    tolerance: Option<Tolerance>,
}

impl ReconcileArgs {
    pub fn new(
        ledger: impl Into<PathBuf>,
        pdfs: Vec<PathBuf>,
        mapping: Option<PathBuf>,
        output: Option<PathBuf>,
        tolerance: Option<Tolerance>,
    ) -> Self {
        Self {
            ledger: ledger.into(),
            pdfs,
            mapping,
            output,
            tolerance,
        }
    }

    pub fn ledger(&self) -> &Path {
        &self.ledger
    }

    pub fn pdfs(&self) -> &[PathBuf] {
        &self.pdfs
    }

    pub fn mapping(&self) -> Option<&Path> {
        self.mapping.as_deref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn tolerance(&self) -> Option<Tolerance> {
        self.tolerance
    }
}

/// (Not shown): Args for the `payroll-recon mapping` command.
#[derive(Debug, Parser, Clone)]
pub struct MappingArgs {
    /// The mapping document. Found the same way as for `reconcile` when omitted.
    #[arg(long, env = "RECON_MAPPING")]
    mapping: Option<PathBuf>,
}

impl MappingArgs {
    pub fn new(mapping: Option<PathBuf>) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> Option<&Path> {
        self.mapping.as_deref()
    }
}

fn default_recon_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("payroll-recon"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --recon-home or RECON_HOME instead of relying on the default \
                recon home directory.",
            );
            PathBuf::from("payroll-recon")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reconcile() {
        let args = Args::try_parse_from([
            "payroll-recon",
            "--recon-home",
            "/tmp/recon",
            "reconcile",
            "--ledger",
            "lote.txt",
            "--tolerance",
            "0.05",
            "a.json",
            "b.json",
        ])
        .unwrap();
        assert_eq!(args.common().recon_home().path(), Path::new("/tmp/recon"));
        let Command::Reconcile(reconcile) = args.command() else {
            panic!("expected reconcile");
        };
        assert_eq!(reconcile.pdfs().len(), 2);
        assert_eq!(reconcile.ledger(), Path::new("lote.txt"));
        assert_eq!(reconcile.tolerance().unwrap().to_string(), "0.05");
    }

    #[test]
    fn test_reconcile_requires_pdfs() {
        let result = Args::try_parse_from(["payroll-recon", "reconcile", "--ledger", "lote.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_extract_ledger() {
        let args = Args::try_parse_from([
            "payroll-recon",
            "--log-level",
            "debug",
            "extract-ledger",
            "lote.txt",
            "--delimiter",
            ",",
        ])
        .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        let Command::ExtractLedger(extract) = args.command() else {
            panic!("expected extract-ledger");
        };
        assert_eq!(extract.delimiter(), Some(','));
    }
}
