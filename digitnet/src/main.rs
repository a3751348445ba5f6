//! Command line workbench for the digit recognizer: validate layer
//! architectures, classify drawings and keep the score leaderboard.

use digitnet::ranking::RankingData;
use digitnet::script::run_script;
use digitnet::{format_confidence_bars, preprocess_drawing};
use editor::{default_architecture, ModelBuilder};
use env_logger::Builder;
use image::io::Reader as ImageReader;
use ml::models::SequentialModel;
use ml::weight_loader::NpzWeightLoader;
use quicli::prelude::*;
use std::fs;
use std::path::PathBuf;
use structopt::StructOpt;

/// Classifies a drawing of a digit
#[derive(Debug, StructOpt)]
struct PredictOpts {
    /// Path to the drawing (png or jpg)
    #[structopt(parse(from_os_str))]
    image: PathBuf,
    /// Architecture script to build the network from; uses the built-in
    /// default network if omitted
    #[structopt(short = "a", long = "arch", parse(from_os_str))]
    arch: Option<PathBuf>,
    /// npz archive with trained weights; random initialization if omitted
    #[structopt(short = "w", long = "weights", parse(from_os_str))]
    weights: Option<PathBuf>,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Validates an architecture script
#[derive(Debug, StructOpt)]
struct CheckOpts {
    /// Architecture script to validate
    #[structopt(parse(from_os_str))]
    script: PathBuf,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Shows or updates the score leaderboard
#[derive(Debug, StructOpt)]
struct RankingOpts {
    /// Where the leaderboard is stored
    #[structopt(
        short = "f",
        long = "file",
        parse(from_os_str),
        default_value = "ranking.json"
    )]
    file: PathBuf,
    /// Register this name with --score before printing
    #[structopt(long = "register")]
    register: Option<String>,
    /// The score to register
    #[structopt(long = "score")]
    score: Option<f64>,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Build, test and rank small digit-classification networks.
#[derive(Debug, StructOpt)]
#[structopt(name = "digitnet")]
enum Digitnet {
    #[structopt(name = "predict", about = "Classifies a drawing of a digit.")]
    Predict(PredictOpts),
    #[structopt(
        name = "check",
        about = "Validates an architecture script and prints the resulting layer list."
    )]
    Check(CheckOpts),
    #[structopt(name = "ranking", about = "Shows or updates the score leaderboard.")]
    Ranking(RankingOpts),
}

/// Trait for the subcommands that digitnet uses
trait DigitnetOpts {
    /// Performs the subcommand
    fn run(&self) -> CliResult;
    /// Returns the verbosity command
    fn get_verbosity(&self) -> &Verbosity;
    /// Sets up logging
    fn setup_env_logger(&self) -> CliResult {
        let mut builder = Builder::from_default_env();

        builder
            .filter(None, self.get_verbosity().log_level().to_level_filter())
            .init();

        Ok(())
    }
}

/// Builds the network the user asked for: from a script if one was given,
/// the built-in default architecture otherwise.
fn build_network(arch: &Option<PathBuf>) -> Result<ModelBuilder, Error> {
    match arch {
        Some(path) => {
            let source = fs::read_to_string(path)?;
            let mut builder = ModelBuilder::new();
            run_script(&mut builder, &source)?;
            Ok(builder)
        }
        None => Ok(default_architecture()),
    }
}

fn instantiate(builder: &ModelBuilder, weights: &Option<PathBuf>) -> Result<SequentialModel, Error> {
    match weights {
        Some(path) => {
            let mut loader = NpzWeightLoader::from_path(path)?;
            Ok(builder.get_model_with_weights(&mut loader)?)
        }
        None => Ok(builder.get_model()?),
    }
}

impl DigitnetOpts for PredictOpts {
    fn run(&self) -> CliResult {
        let builder = build_network(&self.arch)?;
        let model = instantiate(&builder, &self.weights)?;

        let img = ImageReader::open(&self.image)?.decode()?;
        let input = preprocess_drawing(&img);
        let confidences = model.predict(&input);

        print!("{}", format_confidence_bars(&confidences));
        let best = confidences
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).expect("confidences are not NaN"))
            .map(|(digit, _)| digit)
            .unwrap_or(0);
        println!("=> {}", best);
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl DigitnetOpts for CheckOpts {
    fn run(&self) -> CliResult {
        let source = fs::read_to_string(&self.script)?;
        let mut builder = ModelBuilder::new();
        let result = run_script(&mut builder, &source);

        for line in builder.summary() {
            println!("{}", line);
        }
        match result {
            Ok(()) if builder.is_compiled() => println!("=> compiled"),
            Ok(()) => println!("=> valid so far, but not compiled yet"),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl DigitnetOpts for RankingOpts {
    fn run(&self) -> CliResult {
        let mut ranking = RankingData::load(&self.file);
        if let Some(name) = &self.register {
            let score = self
                .score
                .ok_or_else(|| format_err!("--register needs --score"))?;
            ranking.insert(name, score);
            ranking.save(&self.file)?;
        }
        for (place, entry) in ranking.entries().iter().enumerate() {
            println!("{:>3}. {:<20} {:.4}", place + 1, entry.name, entry.score);
        }
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl DigitnetOpts for Digitnet {
    fn run(&self) -> CliResult {
        match self {
            Digitnet::Predict(c) => c.run(),
            Digitnet::Check(c) => c.run(),
            Digitnet::Ranking(c) => c.run(),
        }
    }

    fn get_verbosity(&self) -> &Verbosity {
        match self {
            Digitnet::Predict(c) => c.get_verbosity(),
            Digitnet::Check(c) => c.get_verbosity(),
            Digitnet::Ranking(c) => c.get_verbosity(),
        }
    }
}

fn main() -> CliResult {
    let args = Digitnet::from_args();
    args.setup_env_logger()?;
    args.run()
}
