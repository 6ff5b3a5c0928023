//! PE feature extractor CLI - dictionary-based import/string features.
//!
//! Usage:
//!   pefeat extract sample.exe
//!   pefeat dataset --directory samples/ransomware --csv dataset.csv --fileclass 1
//!   pefeat header > dataset.csv
//!   pefeat classify sample.exe --model malware_model.onnx --scaler malware_scaler.json --format json
//!   cat upload.bin | pefeat classify - --name upload.exe --config pefeat.json

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pefeat_core::classify::{classify_file, classify_upload, read_upload};
use pefeat_core::config::{load_config, ExtractorConfig};
use pefeat_core::dataset::{build_dataset, BuildProgress, DatasetWriter};
use pefeat_core::dictionary::FeatureDictionary;
use pefeat_core::features::encode_single;
use pefeat_core::inference::InferenceContext;
use pefeat_core::report::{print_prediction, print_summary, print_vector, OutputFormat};

#[derive(Parser)]
#[command(name = "pefeat")]
#[command(about = "Static PE feature extractor for ransomware classification")]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Malicious function-name dictionary (one per line)
    #[arg(long, global = true)]
    functions: Option<PathBuf>,

    /// Malicious string-fragment dictionary (one per line)
    #[arg(long, global = true)]
    strings: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Worker threads for dataset builds (defaults to one per core)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the feature vector of a single file
    Extract {
        file: PathBuf,
    },

    /// Append labeled rows for every file in a directory
    Dataset {
        /// Directory of samples (not descended into)
        #[arg(short, long)]
        directory: PathBuf,

        /// Output dataset file, appended to
        #[arg(long)]
        csv: PathBuf,

        /// Class of the files in the directory (0=benign, 1=malware)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
        fileclass: u8,
    },

    /// Print the dataset header line
    Header,

    /// Extract features and run the trained classifier
    Classify {
        /// File to classify, or `-` to read an upload from stdin
        file: PathBuf,

        /// Name reported for stdin uploads
        #[arg(long, default_value = "upload")]
        name: String,

        /// ONNX classifier
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Fitted scaler (JSON mean/scale)
        #[arg(short, long)]
        scaler: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ExtractorConfig::default(),
    };
    if let Some(path) = cli.functions {
        config.functions_path = path;
    }
    if let Some(path) = cli.strings {
        config.strings_path = path;
    }
    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Cannot configure worker pool")?;
    }

    let dict = FeatureDictionary::load(&config.functions_path, &config.strings_path)?;
    let limits = config.limits();

    match cli.command {
        Command::Extract { file } => {
            let vector = encode_single(&file, &dict, &limits)?;
            print_vector(&vector, cli.format);
        }
        Command::Dataset {
            directory,
            csv,
            fileclass,
        } => {
            if !directory.is_dir() {
                bail!("{} is not a directory", directory.display());
            }
            let writer = DatasetWriter::open(&csv, &dict)
                .with_context(|| format!("Cannot open dataset {}", csv.display()))?;
            let progress = BuildProgress::new();

            let summary = build_dataset(&directory, fileclass, &dict, &limits, &writer, &progress);
            info!(
                dataset = %writer.path().display(),
                total = progress.total_files.load(Ordering::Relaxed),
                "dataset updated"
            );
            print_summary(&summary, cli.format);
        }
        Command::Header => println!("{}", dict.header()),
        Command::Classify {
            file,
            name,
            model,
            scaler,
        } => {
            let model = model.or(config.model_path);
            let scaler = scaler.or(config.scaler_path);
            let ctx = match (model, scaler) {
                (Some(model), Some(scaler)) => match InferenceContext::load(&model, &scaler) {
                    Ok(ctx) => Some(ctx),
                    Err(e) => {
                        warn!(reason = %e, "classifier unavailable");
                        None
                    }
                },
                _ => {
                    warn!("no model/scaler configured");
                    None
                }
            };

            let prediction = if file.as_os_str() == "-" {
                let bytes = read_upload(std::io::stdin().lock(), &name, &limits)?;
                classify_upload(
                    ctx.as_ref(),
                    &dict,
                    &limits,
                    config.upload_dir.as_deref(),
                    &name,
                    &bytes,
                )?
            } else {
                classify_file(ctx.as_ref(), &file, &dict, &limits)?
            };
            print_prediction(&prediction, cli.format);
        }
    }

    Ok(())
}
