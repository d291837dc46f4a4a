//! protox command-line front-end
//!
//! # Usage
//!
//! ```bash
//! # Fit and save vectorizer.json + toxicity_model.json
//! protox train --toxic toxin.fasta --non-toxic non_toxin.fasta --out-dir models
//!
//! # Classify one sequence (argument or stdin)
//! protox predict MKTAYIAKQRQISFVKSHFSRQ
//! echo MKTAYIAKQR | protox predict --json
//!
//! # Classify every record of a FASTA file ("-" for stdin)
//! protox batch proteins.fasta.gz --threshold 0.6
//!
//! # Verbose logging
//! RUST_LOG=protox=debug protox predict MKT
//! ```
//!
//! Logs go to stderr; stdout carries only results.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use protox::io::DataSource;
use protox::report::{self, OutputFormat};
use protox::{
    train, FastaStream, KmerSize, ProtoxConfig, ProtoxError, ToxicityPredictor, TrainingSet,
    DEFAULT_THRESHOLD,
};

#[derive(Parser)]
#[command(name = "protox", version, about = "Protein toxicity prediction from k-mer features")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit the vectorizer and random forest on labelled FASTA files
    Train(TrainArgs),

    /// Classify a single protein sequence
    ///
    /// Reads the sequence from stdin when no argument is given.
    Predict(PredictArgs),

    /// Classify every record of a FASTA file
    ///
    /// Records that fail are reported inline; the rest of the batch continues.
    Batch(BatchArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// FASTA file of toxic proteins (plain or gzip)
    #[arg(long)]
    toxic: PathBuf,

    /// FASTA file of non-toxic proteins (plain or gzip)
    #[arg(long = "non-toxic")]
    non_toxic: PathBuf,

    /// Directory receiving vectorizer.json and toxicity_model.json
    #[arg(long, default_value = "models")]
    out_dir: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// K-mer length (overrides the configuration)
    #[arg(long)]
    kmer_size: Option<usize>,

    /// Number of trees (overrides the configuration)
    #[arg(long)]
    trees: Option<usize>,

    /// Random seed (overrides the configuration)
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads for tree fitting (overrides the configuration)
    #[arg(long)]
    threads: Option<usize>,

    /// Print the training summary as JSON
    #[arg(long)]
    json: bool,
}

impl TrainArgs {
    /// Configuration file (or defaults) with command-line overrides applied
    fn config(&self) -> Result<ProtoxConfig> {
        let mut config = match &self.config {
            Some(path) => ProtoxConfig::from_path(path)?,
            None => ProtoxConfig::default(),
        };
        if let Some(k) = self.kmer_size {
            config.features.kmer_size = KmerSize::new(k)?;
        }
        if let Some(trees) = self.trees {
            config.forest.n_estimators = trees;
        }
        if let Some(seed) = self.seed {
            config.forest.seed = seed;
        }
        if let Some(threads) = self.threads {
            config.forest.threads = threads;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
struct ModelArgs {
    /// Directory holding vectorizer.json and toxicity_model.json
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,

    /// Decision threshold on the toxic probability
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

impl ModelArgs {
    fn load(&self) -> Result<ToxicityPredictor> {
        ToxicityPredictor::from_dir(&self.model_dir, self.threshold)
            .with_context(|| format!("cannot start predictor from {}", self.model_dir.display()))
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::from_json_flag(self.json)
    }
}

#[derive(Args)]
struct PredictArgs {
    /// Protein sequence (one-letter codes)
    sequence: Option<String>,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args)]
struct BatchArgs {
    /// FASTA file to classify, or "-" for stdin
    input: PathBuf,

    #[command(flatten)]
    model: ModelArgs,
}

fn main() -> ExitCode {
    // stdout is reserved for results
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("protox=info"));
    fmt().with_writer(io::stderr).with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut out = io::stdout().lock();
    match run(cli, io::stdin().lock(), &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", failure_message(&err));
            ExitCode::FAILURE
        }
    }
}

fn run<R: Read, W: Write>(cli: Cli, stdin: R, out: &mut W) -> Result<()> {
    match cli.command {
        Command::Train(args) => run_train(args, out),
        Command::Predict(args) => run_predict(args, stdin, out),
        Command::Batch(args) => run_batch(args, out),
    }
}

/// Empty input is a warning; everything else is an error with its context chain
fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ProtoxError>() {
        Some(e) if e.is_warning() => format!("Warning: {}.", e),
        _ => format!("Error: {:#}", err),
    }
}

fn run_train<W: Write>(args: TrainArgs, out: &mut W) -> Result<()> {
    let config = args.config()?;
    let set = TrainingSet::from_fasta(&args.toxic, &args.non_toxic)
        .context("cannot read training data")?;
    let model = train(&set, &config)?;
    let paths = model
        .save(&args.out_dir)
        .with_context(|| format!("cannot write artifacts to {}", args.out_dir.display()))?;

    report::write_training(
        out,
        &model.summary,
        &paths,
        OutputFormat::from_json_flag(args.json),
    )?;
    Ok(())
}

fn run_predict<R: Read, W: Write>(args: PredictArgs, stdin: R, out: &mut W) -> Result<()> {
    let predictor = args.model.load()?;
    let sequence = read_sequence(args.sequence, stdin)?;
    let prediction = predictor.predict(&sequence)?;
    report::write_prediction(out, &prediction, args.model.format())?;
    Ok(())
}

/// The argument when given, otherwise everything on `stdin`
fn read_sequence<R: Read>(sequence: Option<String>, mut stdin: R) -> Result<String> {
    match sequence {
        Some(sequence) => Ok(sequence),
        None => {
            let mut buffer = String::new();
            stdin
                .read_to_string(&mut buffer)
                .context("cannot read sequence from stdin")?;
            Ok(buffer)
        }
    }
}

fn run_batch<W: Write>(args: BatchArgs, out: &mut W) -> Result<()> {
    let predictor = args.model.load()?;
    let stream = FastaStream::new(DataSource::from_arg(&args.input))
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    report::write_batch(&predictor, stream, out, args.model.format())?;
    Ok(())
}
