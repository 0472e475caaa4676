//! A/B Analysis Core - Bayesian two-variant decision engine
//!
//! The main entry point for ab-core, handling:
//! - Posterior analysis of conversion, revenue and compound metrics
//! - Monte Carlo validation of the analytic approximations
//! - Example experiment generation

use ab_config::{load_experiment, ExperimentConfig};
use ab_core::analysis::{analyze, AnalysisOptions};
use ab_core::error::CoreError;
use ab_core::exit_codes::ExitCode;
use ab_core::inference::CompoundPrior;
use ab_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use ab_core::validation::{
    compound_check, validate_analysis, CompoundCheckSettings, HarnessSettings,
    DEFAULT_ABS_TOLERANCE, DEFAULT_DRAWS, DEFAULT_REL_TOLERANCE, DEFAULT_SAMPLE_SIZE,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// A/B Analysis Core - Bayesian decision metrics for two-variant experiments
#[derive(Parser)]
#[command(name = "ab-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Experiment file (falls back to AB_EXPERIMENT_CONFIG, then the config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Quadrature nodes for the risk estimator
    #[arg(long, global = true)]
    nodes: Option<usize>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the experiment and print the report (default)
    Analyze(AnalyzeArgs),

    /// Cross-check the analysis against seeded Monte Carlo draws
    Validate(ValidateArgs),

    /// Check the compound Normal fit on a synthetic experiment
    CompoundCheck(CompoundCheckArgs),

    /// Print the reference experiment configuration
    ExampleConfig,
}

#[derive(Args, Debug, Default)]
struct AnalyzeArgs {
    /// Override the credible level of reported intervals
    #[arg(long)]
    credible_level: Option<f64>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Draws per posterior
    #[arg(long, default_value_t = DEFAULT_DRAWS)]
    draws: usize,

    /// Relative tolerance before a check is divergent
    #[arg(long, default_value_t = DEFAULT_REL_TOLERANCE)]
    tolerance: f64,

    /// Absolute tolerance before a check is divergent
    #[arg(long, default_value_t = DEFAULT_ABS_TOLERANCE)]
    abs_tolerance: f64,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct CompoundCheckArgs {
    /// Synthetic users in the simulated experiment
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,

    /// Draws per posterior
    #[arg(long, default_value_t = DEFAULT_DRAWS)]
    draws: usize,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version come through here too
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let level = (cli.global.verbose > 0 || cli.global.quiet)
        .then(|| LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet));
    init_logging(&LogConfig::from_env(level, cli.global.log_format));

    let exit_code = match cli.command {
        None => run_analyze(&cli.global, &AnalyzeArgs::default()),
        Some(Commands::Analyze(args)) => run_analyze(&cli.global, &args),
        Some(Commands::Validate(args)) => run_validate(&cli.global, &args),
        Some(Commands::CompoundCheck(args)) => run_compound_check(&cli.global, &args),
        Some(Commands::ExampleConfig) => run_example_config(),
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn load(global: &GlobalOpts) -> Result<ExperimentConfig, CoreError> {
    let (config, source) = load_experiment(global.config.as_deref())?;
    info!(source = %source, experiment = ?config.name, "experiment loaded");
    Ok(config)
}

fn run_analyze(global: &GlobalOpts, args: &AnalyzeArgs) -> ExitCode {
    let result = load(global).and_then(|config| {
        analyze(
            &config,
            &AnalysisOptions {
                nodes: global.nodes,
                credible_level: args.credible_level,
            },
        )
    });
    match result {
        Ok(report) => emit(&report, args.pretty),
        Err(err) => fail(&err),
    }
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    validation: &'a ab_core::validation::ValidationReport,
    tolerance: f64,
    abs_tolerance: f64,
    divergent: Vec<&'a str>,
}

fn run_validate(global: &GlobalOpts, args: &ValidateArgs) -> ExitCode {
    let options = AnalysisOptions {
        nodes: global.nodes,
        credible_level: None,
    };
    let settings = HarnessSettings {
        draws: args.draws,
        ..HarnessSettings::default()
    };
    let validation = match load(global)
        .and_then(|config| analyze(&config, &options))
        .and_then(|report| validate_analysis(&report, &settings))
    {
        Ok(v) => v,
        Err(err) => return fail(&err),
    };

    let divergent: Vec<&str> = validation
        .diverging(args.tolerance, args.abs_tolerance)
        .into_iter()
        .map(|c| c.check.as_str())
        .collect();
    for name in &divergent {
        warn!(check = %name, "analytic value diverges from simulation");
    }
    let output = ValidateOutput {
        validation: &validation,
        tolerance: args.tolerance,
        abs_tolerance: args.abs_tolerance,
        divergent: divergent.clone(),
    };
    match emit(&output, args.pretty) {
        code if code.is_success() && !divergent.is_empty() => ExitCode::Divergent,
        code => code,
    }
}

fn run_compound_check(global: &GlobalOpts, args: &CompoundCheckArgs) -> ExitCode {
    let settings = CompoundCheckSettings {
        sample_size: args.sample_size,
        draws: args.draws,
        ..CompoundCheckSettings::default()
    };
    let result = load(global)
        .and_then(|config| match config.compound {
            Some(ref section) => CompoundPrior::from_config(section),
            None => CompoundPrior::reference(),
        })
        .and_then(|prior| compound_check(&prior, &settings));
    match result {
        Ok(check) => emit(&check, args.pretty),
        Err(err) => fail(&err),
    }
}

fn run_example_config() -> ExitCode {
    emit(&ExperimentConfig::default(), true)
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> ExitCode {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Clean
        }
        Err(err) => {
            error!(error = %err, "failed to serialize output");
            eprintln!("ab-core: failed to serialize output: {}", err);
            ExitCode::InternalError
        }
    }
}

fn fail(err: &CoreError) -> ExitCode {
    let code = ExitCode::from(err);
    if code.is_internal_error() {
        error!(error = %err, code = err.code(), "command failed");
    } else if code.is_user_error() {
        warn!(error = %err, code = err.code(), "rejected input");
    }
    eprintln!("ab-core: {} [{}]", err, code);
    code
}
