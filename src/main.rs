mod scenarios;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use optimization::LineSearchKind;

use crate::scenarios::{AlgorithmKind, ProblemKind, Settings};

#[derive(Parser)]
#[command(name = "trainer")]
#[command(about = "Minimizes a test objective with one of the training algorithms")]
#[command(version)]
struct Cli {
    /// Objective to minimize
    #[arg(short, long, value_enum, default_value = "rosenbrock")]
    problem: ProblemKind,

    /// Number of parameters (inputs of the perceptron)
    #[arg(short, long, default_value = "2")]
    dimension: usize,

    /// Training algorithm, ignored when a configuration file is given
    #[arg(short, long, value_enum, default_value = "quasi-newton")]
    algorithm: AlgorithmKind,

    /// Line search, overrides the configuration file
    #[arg(short, long, value_enum)]
    line_search: Option<LineSearchArg>,

    /// Maximum number of epochs, overrides the configuration file
    #[arg(short, long)]
    max_epochs: Option<usize>,

    /// Gradient norm goal when no configuration file is given
    #[arg(long, default_value = "1e-6")]
    gradient_norm_goal: f64,

    /// Seed for the synthetic data and the evolutionary algorithm
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Training algorithm document to start from
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Writes the training algorithm document used for the run
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Records every history field and writes it to this file
    #[arg(long)]
    history: Option<PathBuf>,

    /// No progress output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum LineSearchArg {
    Fixed,
    GoldenSection,
    Brent,
}

impl From<LineSearchArg> for LineSearchKind {
    fn from(arg: LineSearchArg) -> Self {
        match arg {
            LineSearchArg::Fixed => LineSearchKind::Fixed,
            LineSearchArg::GoldenSection => LineSearchKind::GoldenSection,
            LineSearchArg::Brent => LineSearchKind::BrentMethod,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let settings = Settings {
        problem: cli.problem,
        dimension: cli.dimension,
        algorithm: cli.algorithm,
        line_search: cli.line_search.map(LineSearchKind::from),
        max_epochs: cli.max_epochs,
        gradient_norm_goal: cli.gradient_norm_goal,
        seed: cli.seed,
        config: cli.config,
        save_config: cli.save_config,
        history: cli.history,
        quiet: cli.quiet,
    };

    match scenarios::execute(&settings) {
        Ok(results) => println!("{}", results),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
