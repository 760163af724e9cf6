use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gumruk_tools::flatten::ShapePolicy;
use gumruk_tools::io::excel_read;
use gumruk_tools::layout::DocumentKind;
use gumruk_tools::sync::{self, ConvertOptions};
use gumruk_tools::workspace::Workspace;
use gumruk_tools::{Result, ToolError, index, logging};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = logging::init(cli.verbose) {
        eprintln!("warning: {error}");
    }
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert(args) => execute_convert(args),
        Command::Index(args) => execute_index(args),
        Command::Inspect(args) => execute_inspect(args),
    }
}

fn execute_convert(args: ConvertArgs) -> Result<()> {
    let workspace = Workspace::new(args.output_dir);
    let options = ConvertOptions {
        kind: args.kind.map(DocumentKind::from),
        shape: args.shape.into(),
    };

    let report = sync::convert_batch(&args.inputs, &workspace, &options)?;
    for outcome in report.succeeded() {
        println!(
            "ok     {} -> {} ({}, {} sheets)",
            outcome.input.display(),
            outcome.output.display(),
            outcome.kind,
            outcome.sheet_count
        );
    }
    for (input, error) in report.failed() {
        println!("failed {}: {error}", input.display());
    }

    let failures = report.failed().count();
    if failures > 0 {
        eprintln!(
            "{failures} of {} documents failed to convert",
            report.outcomes.len()
        );
        std::process::exit(1);
    }
    Ok(())
}

fn execute_index(args: IndexArgs) -> Result<()> {
    let entries = index::index_documents(&args.inputs)?;
    let json = index::to_json(&entries)?;
    match args.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn execute_inspect(args: InspectArgs) -> Result<()> {
    if !args.workbook.exists() {
        return Err(ToolError::MissingInput(args.workbook));
    }

    let workbook = excel_read::read_workbook(&args.workbook)?;
    for table in &workbook.tables {
        println!(
            "{}: {} columns, {} rows",
            table.sheet_name,
            table.columns.len(),
            table.rows.len()
        );
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Convert customs declaration XML documents into Excel workbooks."
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert Gelen and Sonuç XML documents into workbooks.
    Convert(ConvertArgs),
    /// List the declaration number of each Sonuç document as JSON.
    Index(IndexArgs),
    /// Summarise the sheets of a written workbook.
    Inspect(InspectArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// XML files or directories containing XML files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory receiving the per-kind output folders.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Treat every input as this kind instead of detecting it.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// How rows that differ from the first row of a section are handled.
    #[arg(long, value_enum, default_value_t = ShapeArg::Strict)]
    shape: ShapeArg,
}

#[derive(clap::Args)]
struct IndexArgs {
    /// Sonuç XML files or directories containing them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write the JSON index here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct InspectArgs {
    /// Workbook to summarise.
    workbook: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum KindArg {
    Gelen,
    Sonuc,
}

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Gelen => DocumentKind::Gelen,
            KindArg::Sonuc => DocumentKind::Sonuc,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShapeArg {
    Strict,
    Align,
}

impl From<ShapeArg> for ShapePolicy {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Strict => ShapePolicy::Strict,
            ShapeArg::Align => ShapePolicy::Align,
        }
    }
}
