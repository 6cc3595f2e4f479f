use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use docx_fill::{BatchConfig, Converter, DEFAULT_COPIES, DEFAULT_MARKER};

#[derive(Parser)]
#[command(
    name = "docx-fill",
    version,
    about = "Fill DOCX templates with random dataset rows, keeping run formatting",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Options of `fill` when no subcommand is given
    #[command(flatten)]
    fill: FillArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Fill every template in the template folder (default)
    Fill(FillArgs),
    /// Convert every .docx in a folder to PDF
    Convert(ConvertArgs),
}

#[derive(Args)]
struct FillArgs {
    /// Dataset file (.xlsx or .csv) with one row per record
    #[arg(long, default_value = "values.xlsx")]
    data: PathBuf,

    /// Folder holding the .docx templates
    #[arg(long, default_value = "input")]
    templates: PathBuf,

    /// Folder receiving the filled documents
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Documents produced per template
    #[arg(long, default_value_t = DEFAULT_COPIES)]
    copies: u32,

    /// Template names are cut at this marker to form output names
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker: String,

    /// Also export each filled document to PDF
    #[arg(long)]
    pdf: bool,

    /// Office converter binary used for PDF export
    #[arg(long, default_value = "soffice")]
    converter: PathBuf,

    /// Seed for reproducible record selection
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Folder holding the .docx files to convert
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Office converter binary
    #[arg(long, default_value = "soffice")]
    converter: PathBuf,
}

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_module("docx_fill", LevelFilter::Info);
    }
    let _ = builder.format_timestamp_millis().try_init();
}

fn fill(args: FillArgs) -> anyhow::Result<()> {
    let config = BatchConfig {
        data: args.data,
        templates: args.templates,
        output: args.output,
        copies: args.copies,
        marker: args.marker,
        converter: args.pdf.then(|| Converter::new(args.converter)),
        seed: args.seed,
    };
    let summary = docx_fill::run(&config).with_context(|| {
        format!(
            "cannot run batch with dataset {} and templates in {}",
            config.data.display(),
            config.templates.display()
        )
    })?;
    if !summary.failed.is_empty() {
        log::warn!("{} document(s) could not be filled", summary.failed.len());
    }
    Ok(())
}

fn convert(args: ConvertArgs) -> anyhow::Result<()> {
    let converter = Converter::new(args.converter);
    let summary = docx_fill::convert_folder(&args.output, &converter)
        .with_context(|| format!("cannot read {}", args.output.display()))?;
    if summary.converted.is_empty() && !summary.failed.is_empty() {
        bail!("no document could be converted");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Fill(cli.fill)) {
        Command::Fill(args) => fill(args),
        Command::Convert(args) => convert(args),
    }
}
