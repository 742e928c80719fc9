//! zdxf：DXF 表段检查与版本转换工具

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use zcad_dxf::prelude::*;
use zcad_dxf::table::{find_section, read_header_version, read_tables, write_header, write_tables};

/// 没有 HEADER 或 `$ACADVER` 时假定的版本
const FALLBACK_VERSION: DxfVersion = DxfVersion::R12;

/// ZCAD DXF tag-stream tool
#[derive(Parser, Debug)]
#[command(name = "zdxf")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the records of every known table as JSON
    Inspect {
        /// Input DXF file
        file: PathBuf,
    },

    /// Rewrite the known tables at another version
    Tables {
        /// Input DXF file
        input: PathBuf,

        /// Output DXF file
        #[arg(short, long)]
        output: PathBuf,

        /// Target version, e.g. R2000 or AC1015
        #[arg(long, default_value = "R2018")]
        target: DxfVersion,
    },
}

fn open(path: &Path) -> Result<TagScanner<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(TagScanner::new(BufReader::new(file)))
}

/// 读取 `$ACADVER`，缺失时退回默认版本
fn detect_version(path: &Path) -> Result<DxfVersion> {
    let mut scanner = open(path)?;
    let version = if find_section(&mut scanner, "HEADER")? {
        read_header_version(&mut scanner)?
    } else {
        None
    };
    Ok(version.unwrap_or_else(|| {
        warn!("No $ACADVER in {}, assuming {}", path.display(), FALLBACK_VERSION);
        FALLBACK_VERSION
    }))
}

/// 读取文件中全部已知的表
fn load_tables(path: &Path, config: &DxfConfig) -> Result<(DxfVersion, Vec<Table>)> {
    let version = detect_version(path)?;
    info!("Reading {} as {}", path.display(), version);

    let mut scanner = open(path)?;
    if !find_section(&mut scanner, "TABLES")? {
        bail!("{} has no TABLES section", path.display());
    }

    let catalogue = SchemaCatalogue::builtin()?;
    let mut reader = RecordReader::new(config, version);
    let tables = read_tables(&mut scanner, &catalogue, &mut reader)?;

    let diagnostics = reader.take_diagnostics();
    if !diagnostics.is_empty() {
        warn!("{} diagnostics while reading {}", diagnostics.len(), path.display());
        for diagnostic in &diagnostics {
            tracing::debug!("{:?}", diagnostic);
        }
    }
    Ok((version, tables))
}

fn inspect(path: &Path, config: &DxfConfig) -> Result<()> {
    let (version, tables) = load_tables(path, config)?;
    let tables: Vec<_> = tables
        .iter()
        .map(|table| {
            json!({
                "name": table.name(),
                "header": &table.header,
                "records": table.records.iter().collect::<Vec<_>>(),
            })
        })
        .collect();
    let doc = json!({ "version": version, "tables": tables });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn convert(input: &Path, output: &Path, target: DxfVersion, config: &DxfConfig) -> Result<()> {
    let (source, tables) = load_tables(input, config)?;

    let file =
        File::create(output).with_context(|| format!("cannot create {}", output.display()))?;
    let mut out = TagWriter::new(BufWriter::new(file));
    let writer = RecordWriter::new(config, target);

    write_header(&mut out, target)?;
    let report = write_tables(&mut out, &writer, &tables)?;
    out.write_eof()?;
    out.into_inner().flush()?;

    info!(
        "Wrote {} records from {} to {} ({} skipped)",
        report.written, source, target, report.skipped
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => DxfConfig::load(path)?,
        None => DxfConfig::default(),
    };

    match cli.command {
        Command::Inspect { file } => inspect(&file, &config),
        Command::Tables {
            input,
            output,
            target,
        } => convert(&input, &output, target, &config),
    }
}
