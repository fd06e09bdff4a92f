use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use c3sdb_build::config::{ConfigLoader, ResolvedConfig};
use c3sdb_build::descriptors::{DescriptorCalculator, SmilesCounts};
use c3sdb_build::error::BuildError;
use c3sdb_build::output::{ConsoleOutput, JsonOutput, OutputMode, QuietOutput};
use c3sdb_build::pipeline::{BuildPaths, Pipeline};
use c3sdb_build::smiles::{OfflineResolver, PubChemHttpClient, StructureResolver};

#[derive(Parser)]
#[command(name = "c3sdb-build")]
#[command(about = "Build the CCSbase database (C3S.db, smiles_search_cache.json, C3S_clean.db)")]
#[command(version, author)]
struct Cli {
    /// Build configuration (defaults to ./c3sdb.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Directory receiving the database files and the SMILES cache
    #[arg(long, default_value = ".")]
    output_dir: Utf8PathBuf,

    /// Resolve structures from the SMILES cache only
    #[arg(long)]
    offline: bool,

    /// Print a JSON summary instead of progress lines
    #[arg(long, conflicts_with = "quiet")]
    json: bool,

    /// Print nothing on success
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<BuildError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BuildError) -> u8 {
    match error {
        BuildError::ResourceNotFound { .. }
        | BuildError::MalformedDataset { .. }
        | BuildError::InvalidSourceTag(_)
        | BuildError::ConfigRead(_)
        | BuildError::ConfigParse(_) => 2,
        BuildError::StructureHttp(_) | BuildError::StructureStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Console
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let paths = BuildPaths::in_dir(&cli.output_dir);

    if cli.offline {
        run_build(config, OfflineResolver, SmilesCounts, &paths, output_mode)
    } else {
        let pubchem = PubChemHttpClient::new()?;
        run_build(config, pubchem, SmilesCounts, &paths, output_mode)
    }
}

fn run_build<S: StructureResolver, D: DescriptorCalculator>(
    config: ResolvedConfig,
    structures: S,
    descriptors: D,
    paths: &BuildPaths,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let pipeline = Pipeline::new(config, structures, descriptors);
    match output_mode {
        OutputMode::Json => {
            let summary = pipeline.run(paths, &JsonOutput)?;
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
        OutputMode::Console => {
            pipeline.run(paths, &ConsoleOutput)?;
        }
        OutputMode::Quiet => {
            pipeline.run(paths, &QuietOutput)?;
        }
    }
    Ok(())
}
