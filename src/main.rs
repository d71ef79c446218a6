use anyhow::{Context, Result};
use aplanar::cli::{output_path, Cli};
use aplanar::config::ConverterConfig;
use aplanar::csv_output::CsvOutput;
use aplanar::input::load_records;
use aplanar::pipeline::{Conversion, Converter};
use clap::Parser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises the level to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the configuration file (if any) and apply command-line overrides
fn build_config(args: &Cli) -> Result<ConverterConfig> {
    let mut config = match &args.config {
        Some(path) => ConverterConfig::from_toml(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ConverterConfig::default(),
    };
    args.apply_overrides(&mut config);
    Ok(config)
}

/// Decode and convert one input; failures here skip the file
fn convert_input(converter: &Converter, input: &Path) -> Result<Conversion> {
    let mut batch = load_records(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    batch.retain_complete(&converter.config().required_fields());
    for rejection in &batch.rejected {
        eprintln!("warning: {}: skipped {}", input.display(), rejection);
    }

    if batch.records.is_empty() {
        anyhow::bail!("no usable records in {}", input.display());
    }

    converter
        .convert(&batch.records)
        .with_context(|| format!("Failed to convert {}", input.display()))
}

/// Per-file outcome counts for one run
#[derive(Debug, Default)]
struct RunSummary {
    converted: usize,
    write_failures: usize,
}

fn run(args: &Cli, converter: &Converter, inputs: &[PathBuf]) -> RunSummary {
    let output = CsvOutput::new(true, !args.lf);
    let mut written: HashSet<PathBuf> = HashSet::new();
    let mut summary = RunSummary::default();

    for input in inputs {
        let destination = output_path(input, args.output_dir.as_deref());
        if written.contains(&destination) {
            eprintln!(
                "error: {}: {} was already written by an earlier input, skipping",
                input.display(),
                destination.display()
            );
            summary.write_failures += 1;
            continue;
        }

        let conversion = match convert_input(converter, input) {
            Ok(conversion) => conversion,
            Err(e) => {
                eprintln!("error: {:#}", e);
                continue;
            }
        };

        if let Err(e) = output.write_file(&conversion.table, &destination) {
            eprintln!("error: Failed to write {}: {}", destination.display(), e);
            summary.write_failures += 1;
            continue;
        }
        written.insert(destination.clone());

        tracing::info!("{} -> {}: {}", input.display(), destination.display(), conversion.stats);
        println!(
            "{} -> {} ({})",
            input.display(),
            destination.display(),
            conversion.stats
        );
        summary.converted += 1;
    }

    summary
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = build_config(&args)?;
    let converter = Converter::new(config)?;

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let inputs = args.resolve_inputs()?;
    if inputs.is_empty() {
        anyhow::bail!("No input files found. Usage: aplanar [INPUT...] (default: *.json)");
    }

    let summary = run(&args, &converter, &inputs);
    if summary.write_failures > 0 {
        anyhow::bail!(
            "{} output file(s) could not be written ({} converted)",
            summary.write_failures,
            summary.converted
        );
    }
    if summary.converted == 0 {
        anyhow::bail!("None of {} input file(s) could be converted", inputs.len());
    }

    Ok(())
}
