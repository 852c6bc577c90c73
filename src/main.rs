//! Sulani CLI - Command-line tool for Sims 4 package inspection.
//!
//! This is the main entry point for the Sulani command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use sulani::prelude::*;

/// Sulani - Sims 4 package tool
#[derive(Parser)]
#[command(name = "sulani")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Accept packages with an unexpected header version or index layout
    #[arg(long, global = true)]
    ignore_header_errors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the entries of a package
    List {
        /// Path to the package
        #[arg(env = "SULANI_PACKAGE")]
        package: PathBuf,

        /// Filter pattern (regex over key and resource type)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,
    },

    /// Extract entries to a directory
    Extract {
        /// Path to the package
        #[arg(env = "SULANI_PACKAGE")]
        package: PathBuf,

        /// Output directory
        #[arg(short, long, env = "SULANI_OUTPUT")]
        output: PathBuf,

        /// Filter pattern (regex over key and resource type)
        #[arg(short, long)]
        filter: Option<String>,

        /// Write stored records as-is instead of decompressed resources
        #[arg(long)]
        raw: bool,
    },

    /// Dump SimData resources from a SimData file or a package
    Simdata {
        /// SimData file or package
        input: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = DumpFormat::Json)]
        format: DumpFormat,
    },

    /// Read and rewrite a package
    Repack {
        /// Path to the package
        #[arg(env = "SULANI_PACKAGE")]
        package: PathBuf,

        /// Output package
        #[arg(short, long, env = "SULANI_OUTPUT")]
        output: PathBuf,

        /// Re-encode every resource instead of reusing the stored records
        #[arg(long)]
        reencode: bool,
    },

    /// Check a package and every resource in it
    Validate {
        /// Path to the package
        #[arg(env = "SULANI_PACKAGE")]
        package: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DumpFormat {
    Json,
    Xml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = ReadOptions::new().with_ignore_header_errors(cli.ignore_header_errors);

    match cli.command {
        Commands::List { package, filter, detailed } => {
            cmd_list(&package, &options, filter.as_deref(), detailed)?;
        }
        Commands::Extract { package, output, filter, raw } => {
            cmd_extract(&package, &options, &output, filter.as_deref(), raw)?;
        }
        Commands::Simdata { input, format } => {
            cmd_simdata(&input, &options, format)?;
        }
        Commands::Repack { package, output, reencode } => {
            cmd_repack(&package, &options, &output, reencode)?;
        }
        Commands::Validate { package } => {
            cmd_validate(&package, &options)?;
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_package(path: &Path, options: &ReadOptions) -> Result<Container> {
    let start = Instant::now();
    let package = Container::open(path, options)
        .with_context(|| format!("Failed to open package {}", path.display()))?;
    debug!(entries = package.len(), elapsed = ?start.elapsed(), "package loaded");
    Ok(package)
}

fn compile_filter(filter: Option<&str>) -> Result<Option<Regex>> {
    filter
        .map(|pattern| Regex::new(pattern).with_context(|| format!("Invalid filter {pattern:?}")))
        .transpose()
}

/// A filter matches the displayed key, the file stem or the resource type.
fn matches(filter: Option<&Regex>, entry: &ContainerEntry) -> bool {
    let Some(regex) = filter else {
        return true;
    };
    let key = entry.key();
    regex.is_match(&key.to_string())
        || regex.is_match(&key.file_stem())
        || regex.is_match(entry.resource().variant_name())
}

fn cmd_list(
    path: &Path,
    options: &ReadOptions,
    filter: Option<&str>,
    detailed: bool,
) -> Result<()> {
    let package = open_package(path, options)?;
    let filter = compile_filter(filter)?;

    let mut count = 0;
    for entry in package.iter().filter(|e| matches(filter.as_ref(), e)) {
        if detailed {
            let stored = entry.buffer().context("Failed to serialize entry")?.len();
            let size = entry.decompressed_size().context("Failed to size entry")?;
            println!(
                "{} {:<12} {:>10} {:>10} {:<6} {}",
                entry.key(),
                entry.resource().variant_name(),
                stored,
                size,
                entry.compression().label(),
                entry.committed()
            );
        } else {
            println!("{} {}", entry.key(), entry.resource().variant_name());
        }
        count += 1;
    }

    println!("\nTotal: {} entries", count);

    Ok(())
}

fn cmd_extract(
    path: &Path,
    options: &ReadOptions,
    output: &Path,
    filter: Option<&str>,
    raw: bool,
) -> Result<()> {
    println!("Opening package: {}", path.display());

    let start = Instant::now();
    let package = open_package(path, options)?;
    println!("Loaded {} entries in {:?}", package.len(), start.elapsed());

    let filter = compile_filter(filter)?;
    let selected: Vec<&ContainerEntry> =
        package.iter().filter(|e| matches(filter.as_ref(), e)).collect();

    println!("Extracting {} entries...", selected.len());

    let pb = ProgressBar::new(selected.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let start = Instant::now();
    let mut written = 0;
    let mut skipped = 0;

    for entry in selected {
        let stem = entry.key().file_stem();
        let (data, extension) = if raw {
            (entry.buffer()?, "record")
        } else {
            match entry.resource().uncompressed_bytes()? {
                Some(data) => (data, entry.resource().extension()),
                None => {
                    pb.suspend(|| warn!(key = %entry.key(), "skipping entry with unsupported compression"));
                    skipped += 1;
                    pb.inc(1);
                    continue;
                }
            }
        };

        let output_path = output.join(format!("{stem}.{extension}"));
        fs::write(&output_path, &*data)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        written += 1;

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!(
        "Extracted {} entries in {:?} ({} skipped)",
        written,
        start.elapsed(),
        skipped
    );

    Ok(())
}

fn cmd_simdata(input: &Path, options: &ReadOptions, format: DumpFormat) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;

    if data.starts_with(sulani::simdata::MAGIC) {
        let resource = SimDataResource::from_bytes(&data).context("Failed to parse SimData")?;
        println!("{}", dump(&resource, format)?);
        return Ok(());
    }

    let package = Container::from_bytes(&data, options)
        .with_context(|| format!("{} is neither SimData nor a package", input.display()))?;

    let mut count = 0;
    for entry in &package {
        if let Some(resource) = entry.resource().as_simdata() {
            println!("# {}", entry.key());
            println!("{}", dump(resource, format)?);
            count += 1;
        }
    }

    if count == 0 {
        warn!("no SimData resources in {}", input.display());
    }

    Ok(())
}

fn dump(resource: &SimDataResource, format: DumpFormat) -> Result<String> {
    let text = match format {
        DumpFormat::Json => resource.to_json_string().context("Failed to export JSON")?,
        DumpFormat::Xml => resource.to_xml_string().context("Failed to export XML")?,
    };
    Ok(text)
}

fn cmd_repack(path: &Path, options: &ReadOptions, output: &Path, reencode: bool) -> Result<()> {
    println!("Repacking: {} -> {}", path.display(), output.display());

    let original = fs::read(path).context("Failed to read input file")?;
    let start = Instant::now();
    let package = Container::from_bytes(&original, options).context("Failed to parse package")?;

    if reencode {
        // Invalidating a resource clears its entry and the package as well.
        for entry in &package {
            entry.resource().invalidate();
        }
    }

    package.write_to_file(output).context("Failed to write output file")?;
    let written = fs::read(output).context("Failed to read back output file")?;

    println!("Repacked {} entries in {:?}", package.len(), start.elapsed());
    if written == original {
        println!("Output is byte-identical to the input");
    } else {
        println!(
            "Output differs from the input ({} -> {} bytes)",
            original.len(),
            written.len()
        );
    }

    Ok(())
}

fn cmd_validate(path: &Path, options: &ReadOptions) -> Result<()> {
    let package = open_package(path, options)?;

    let mut errors = 0;
    for entry in &package {
        if let Err(e) = entry.resource().validate() {
            eprintln!("{} ({}): {}", entry.key(), entry.resource().variant_name(), e);
            errors += 1;
        }
    }

    if let Err(e) = package.buffer() {
        eprintln!("Package does not serialize: {}", e);
        errors += 1;
    }

    if errors > 0 {
        anyhow::bail!("{} problem(s) found in {}", errors, path.display());
    }

    println!("{}: {} entries, no problems found", path.display(), package.len());

    Ok(())
}
