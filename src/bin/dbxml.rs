//! dbxml command-line driver.
//!
//! Re-canonicalizes an existing interchange file: import, wrap in a
//! static engine, export again with the requested options.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use dbxml::core::AddressWidth;
use dbxml::logging::{init_with, LogFormat};
use dbxml::{export_database, import_database, ExportOptions, Section, StaticEngine};

#[derive(Parser)]
#[command(
    name = "dbxml",
    version,
    about = "Re-export an analysis database interchange file in canonical form"
)]
struct Cli {
    /// Interchange file to read
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the canonical export
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Address width (defaults to the config file, then the input's width)
    #[arg(long, value_enum)]
    address_width: Option<WidthArg>,

    /// Leave a section out of the output (repeatable)
    #[arg(long = "skip", value_enum, value_name = "SECTION")]
    skip: Vec<SectionArg>,

    /// Fill missing demangled symbol names
    #[arg(long)]
    demangle: bool,

    /// JSON file with export options
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print the export summary as JSON on stdout
    #[arg(long)]
    summary: bool,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum WidthArg {
    #[value(name = "32")]
    Bits32,
    #[value(name = "64")]
    Bits64,
}

impl From<WidthArg> for AddressWidth {
    fn from(arg: WidthArg) -> Self {
        match arg {
            WidthArg::Bits32 => AddressWidth::Bits32,
            WidthArg::Bits64 => AddressWidth::Bits64,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SectionArg {
    Segments,
    EntryPoints,
    Types,
    Functions,
    Data,
    Symbols,
    CrossReferences,
}

impl From<SectionArg> for Section {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Segments => Section::Segments,
            SectionArg::EntryPoints => Section::EntryPoints,
            SectionArg::Types => Section::Types,
            SectionArg::Functions => Section::Functions,
            SectionArg::Data => Section::Data,
            SectionArg::Symbols => Section::Symbols,
            SectionArg::CrossReferences => Section::CrossReferences,
        }
    }
}

fn load_options(cli: &Cli, input_width: AddressWidth) -> Result<ExportOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            ExportOptions::from_json_str_or_width(&text, input_width)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => ExportOptions::default().with_address_width(input_width),
    };
    if let Some(width) = cli.address_width {
        options.address_width = width.into();
    }
    for section in &cli.skip {
        options = options.without_section((*section).into());
    }
    if cli.demangle {
        options.demangle_symbols = true;
    }
    Ok(options)
}

fn read_input(path: &Path) -> Result<dbxml::ImportedDatabase> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    import_database(BufReader::new(file)).with_context(|| format!("import {}", path.display()))
}

async fn run(cli: &Cli) -> Result<()> {
    let imported = read_input(&cli.input)?;
    let options = load_options(cli, imported.header.address_width)?;
    info!(
        input = %cli.input.display(),
        output = %cli.output.display(),
        width = %options.address_width,
        "Re-exporting interchange file"
    );

    let engine = StaticEngine::new(imported.model);
    let summary = export_database(&engine, &cli.output, options)
        .await
        .with_context(|| format!("export {}", cli.output.display()))?;

    if cli.summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serialize summary")?
        );
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_with(format, if cli.verbose { "debug" } else { "info" });

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
