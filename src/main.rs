use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use psmatch::algorithm::matching::ColumnSpec;
use psmatch::utils::logging::{print_balance, print_match_summary};
use psmatch::{Algorithm, Matcher, MatchingConfig, MatchingConfigBuilder, read_records, write_records};

#[derive(Parser)]
#[command(name = "psmatch")]
#[command(about = "Build propensity-score matched cohorts", long_about = None)]
struct Cli {
    /// Subject file: patient_id, group_indicator and ps (or ps_1..ps_k) columns
    input: PathBuf,

    /// Output file for matched rows (.parquet, .csv or tab delimited)
    output: PathBuf,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Matching algorithm
    #[arg(long)]
    algorithm: Option<Algorithm>,

    /// Maximum allowed distance (bin width for block matching)
    #[arg(long)]
    caliper: Option<f64>,

    /// Referents per treatment unit
    #[arg(long)]
    ratio: Option<usize>,

    /// Number of exposure groups in the input
    #[arg(long)]
    groups: Option<usize>,

    /// Group indicator of the treatment group
    #[arg(long)]
    treatment: Option<String>,

    /// Keep only sets with exactly `ratio` referents
    #[arg(long)]
    fixed: bool,

    /// One pass per ratio level instead of a single pass
    #[arg(long)]
    sequential: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads for N-way matching
    #[arg(long)]
    workers: Option<usize>,

    /// Write the score balance table to this CSV file
    #[arg(long)]
    balance_report: Option<PathBuf>,

    /// Show progress bars
    #[arg(long)]
    progress: bool,
}

fn build_config(cli: &Cli) -> anyhow::Result<MatchingConfig> {
    let base = match &cli.config {
        Some(path) => MatchingConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => MatchingConfig::default(),
    };

    let mut builder = MatchingConfigBuilder::from_config(base);
    if let Some(algorithm) = cli.algorithm {
        builder = builder.algorithm(algorithm);
    }
    if let Some(caliper) = cli.caliper {
        builder = builder.caliper(caliper);
    }
    if let Some(ratio) = cli.ratio {
        builder = builder.match_ratio(ratio);
    }
    if let Some(groups) = cli.groups {
        builder = builder.num_groups(groups);
    }
    if let Some(treatment) = &cli.treatment {
        builder = builder.treatment_group(treatment.clone());
    }
    if cli.fixed {
        builder = builder.fixed_ratio(true);
    }
    if cli.sequential {
        builder = builder.use_parallel(false);
    }
    if let Some(seed) = cli.seed {
        builder = builder.random_seed(seed);
    }
    if let Some(workers) = cli.workers {
        builder = builder.workers(workers);
    }
    if cli.progress {
        builder = builder.show_progress(true);
    }

    let config = builder.build();
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let dimensions = config.score_dimensions();
    info!("Running with configuration: {}", config.to_string_representation());

    let records = read_records(&cli.input, &ColumnSpec::for_dimensions(dimensions))
        .with_context(|| format!("Failed to read subjects from {}", cli.input.display()))?;

    let matcher = Matcher::new(config);
    let result = matcher.perform_matching(records)?;

    write_records(
        &cli.output,
        &result.records,
        dimensions,
        matcher.config().algorithm.emits_match_info(),
    )
    .with_context(|| format!("Failed to write matches to {}", cli.output.display()))?;

    print_match_summary(matcher.config(), &result);
    print_balance(&result);

    if let Some(path) = &cli.balance_report {
        result.balance.write_to_csv(path)?;
        info!("Balance report written to {}", path.display());
    }

    Ok(())
}
