use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_taxlookup::app::{App, LookupOptions};
use kira_taxlookup::config::{ConfigLoader, ConfigOverrides};
use kira_taxlookup::error::TaxLookupError;
use kira_taxlookup::ncbi::TaxdumpHttpClient;
use kira_taxlookup::output::{JsonOutput, StderrProgress};
use kira_taxlookup::store::Store;

#[derive(Parser)]
#[command(name = "kira-tax")]
#[command(about = "Look up NCBI taxon IDs in a tab-separated file and append their lineage")]
#[command(version, author)]
struct Cli {
    /// Input file with the taxon IDs
    file: PathBuf,

    /// Column with the taxon IDs, counted from 1 [default: 1]
    #[arg(short, long)]
    column: Option<usize>,

    /// Ranks to output: all, linnean, named (every rank except 'no rank') or a
    /// quoted list such as "superkingdom order genus" [default: linnean]
    #[arg(short, long)]
    ranks: Option<String>,

    /// Force a re-download of the taxonomy database, overwriting the cached copy
    #[arg(short, long)]
    download: bool,

    /// Directory holding the cached taxonomy dump [default: data]
    #[arg(long)]
    data_dir: Option<String>,

    /// JSON config file [default: kira-tax.json if present]
    #[arg(long)]
    config: Option<String>,

    /// Print a JSON run summary to stderr
    #[arg(long)]
    summary: bool,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<TaxLookupError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TaxLookupError) -> u8 {
    match error {
        TaxLookupError::InputNotFound(_)
        | TaxLookupError::InputRead { .. }
        | TaxLookupError::MissingColumn { .. }
        | TaxLookupError::InvalidColumn(_)
        | TaxLookupError::InvalidRanks(_)
        | TaxLookupError::ConfigRead(_)
        | TaxLookupError::ConfigParse(_) => 2,
        TaxLookupError::TaxdumpHttp(_)
        | TaxLookupError::TaxdumpStatus { .. }
        | TaxLookupError::UrlMismatch { .. }
        | TaxLookupError::MissingArchiveMember(_) => 3,
        TaxLookupError::MalformedDump { .. }
        | TaxLookupError::OrphanNode { .. }
        | TaxLookupError::CyclicLineage { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "error" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let resolved = ConfigLoader::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            data_dir: cli.data_dir,
            column: cli.column,
            ranks: cli.ranks,
        },
    )?;

    let options = LookupOptions {
        column: resolved.column,
        ranks: resolved.ranks,
        force_download: cli.download,
    };
    let client = TaxdumpHttpClient::new()?;
    let app = App::new(Store::new(resolved.data_dir), client, resolved.taxdump_url);

    let stdout = io::stdout().lock();
    let summary = app.process_file(&cli.file, BufWriter::new(stdout), &options, &StderrProgress)?;

    if cli.summary {
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    }
    Ok(())
}
