//! ESG Project Evaluator
//!
//! Command-line shell over the evaluation engine: loads projects from CSV or
//! generates a sample batch, then scores, optimizes or risk-checks them.

use clap::{Args, Parser, Subcommand};
use esg_evaluator::{
    config::Config,
    data::{self, SampleGenerator},
    evaluator::Evaluator,
    types::Dataset,
};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "esg-evaluator")]
#[command(about = "Score, allocate and risk-check ESG investment projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Args)]
struct Input {
    /// Project CSV file
    #[arg(short, long, conflicts_with = "sample")]
    input: Option<String>,

    /// Generate this many sample projects instead of reading a file
    #[arg(short, long)]
    sample: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensemble ESG scores per project
    Score {
        #[command(flatten)]
        input: Input,
    },
    /// Capital allocation under a risk budget
    Optimize {
        #[command(flatten)]
        input: Input,
        /// Portfolio risk tolerance in (0, 1]
        #[arg(short, long)]
        risk_tolerance: Option<f64>,
    },
    /// Anomaly and heuristic risks per project
    Risk {
        #[command(flatten)]
        input: Input,
    },
    /// Full evaluation report
    Report {
        #[command(flatten)]
        input: Input,
        #[arg(short, long)]
        risk_tolerance: Option<f64>,
        /// Write JSON to this path
        #[arg(long)]
        json: Option<String>,
        /// Write CSV to stdout instead of a table
        #[arg(long)]
        csv: bool,
    },
    /// Write a sample dataset as CSV to stdout
    Sample {
        #[arg(short = 'n', long)]
        projects: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Score { input } => show_scores(&config, &input),
        Commands::Optimize { input, risk_tolerance } => {
            let t = risk_tolerance.unwrap_or(config.optimizer.risk_tolerance);
            show_allocation(&config, &input, t)
        }
        Commands::Risk { input } => show_risks(&config, &input),
        Commands::Report {
            input,
            risk_tolerance,
            json,
            csv,
        } => {
            let t = risk_tolerance.unwrap_or(config.optimizer.risk_tolerance);
            show_report(&config, &input, t, json.as_deref(), csv)
        }
        Commands::Sample { projects, seed } => {
            let n = projects.unwrap_or(config.data.sample_projects);
            let generator = SampleGenerator::new(seed.or(config.data.sample_seed));
            data::write_dataset_csv(&generator.generate(n), io::stdout())?;
            Ok(())
        }
    }
}

fn load_input(config: &Config, input: &Input) -> anyhow::Result<Dataset> {
    let dataset = match (&input.input, input.sample) {
        (Some(path), _) => data::load_csv(path)?,
        (None, Some(n)) => SampleGenerator::new(config.data.sample_seed).generate(n),
        (None, None) => {
            tracing::info!(
                projects = config.data.sample_projects,
                "no input file given, using sample data"
            );
            SampleGenerator::new(config.data.sample_seed).generate(config.data.sample_projects)
        }
    };
    Ok(dataset)
}

fn session(config: &Config, input: &Input) -> anyhow::Result<Evaluator> {
    let mut evaluator = Evaluator::new(config);
    evaluator.ingest(load_input(config, input)?)?;
    Ok(evaluator)
}

fn show_scores(config: &Config, input: &Input) -> anyhow::Result<()> {
    let evaluator = session(config, input)?;
    let result = evaluator.score()?;

    println!("\n🌱 ESG Scores ({} labels)\n", result.label_source);
    println!("{:<30} {:>10}", "Project", "Score");
    println!("{}", "-".repeat(41));
    for (project, score) in result.ranked() {
        println!("{:<30} {:>10.4}", truncate(&project, 30), score);
    }
    Ok(())
}

fn show_allocation(config: &Config, input: &Input, risk_tolerance: f64) -> anyhow::Result<()> {
    let evaluator = session(config, input)?;
    let result = evaluator.optimize(risk_tolerance)?;
    let allocations = result.allocate_capital(config.optimizer.capital_budget);

    println!("\n💼 Portfolio Allocation (risk tolerance {:.2})\n", risk_tolerance);
    if !result.converged {
        println!(
            "⚠️  Optimizer did not converge ({:?} after {} iterations); showing best iterate",
            result.status, result.iterations
        );
    }
    println!("{:<30} {:>8} {:>12}", "Project", "Weight", "Capital (M)");
    println!("{}", "-".repeat(52));
    for allocation in &allocations {
        println!(
            "{:<30} {:>7.1}% {:>12}",
            truncate(&allocation.project, 30),
            allocation.weight * 100.0,
            allocation.amount
        );
    }
    println!(
        "\nExpected return proxy: {:.4}   Portfolio risk: {:.4}   Effective N: {:.1}",
        result.expected_return,
        result.portfolio_risk,
        result.effective_n()
    );
    Ok(())
}

fn show_risks(config: &Config, input: &Input) -> anyhow::Result<()> {
    let evaluator = session(config, input)?;
    let report = evaluator.analyze_risk()?;

    println!("\n🔍 Project Risk Analysis\n");
    println!(
        "{:<30} {:>10} {:>14} {:>10}",
        "Project", "Composite", "Environmental", "Financial"
    );
    println!("{}", "-".repeat(67));
    for i in 0..report.len() {
        println!(
            "{:<30} {:>10.2} {:>14.4} {:>10.4}",
            truncate(&report.projects[i], 30),
            report.composite[i],
            report.environmental[i],
            report.financial[i]
        );
    }

    let flagged = report.flagged(config.risk.flag_threshold);
    if !flagged.is_empty() {
        println!("\n🚩 Flagged: {}", flagged.join(", "));
    }
    Ok(())
}

fn show_report(
    config: &Config,
    input: &Input,
    risk_tolerance: f64,
    json: Option<&str>,
    csv: bool,
) -> anyhow::Result<()> {
    let evaluator = session(config, input)?;
    let report = evaluator.evaluate_all(risk_tolerance)?;

    if let Some(path) = json {
        data::save_report_json(&report, path)?;
    }
    if csv {
        data::write_report_csv(&report, io::stdout())?;
        return Ok(());
    }

    let summary = &report.summary;
    println!("\n📋 Evaluation Report {}\n", report.id);
    println!("Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "Projects: {}   Total investment: {}M   Jobs: {}",
        summary.project_count, summary.total_investment_m, summary.total_jobs
    );
    println!(
        "Mean CO2 reduction: {:.1}   Mean energy savings: {:.1}",
        summary.mean_co2_reduction, summary.mean_energy_savings
    );
    if !report.converged {
        println!("⚠️  Allocation is a best-effort iterate ({:?})", report.status);
    }
    println!();
    println!(
        "{:<24} {:>8} {:>9} {:>8} {:>11} {:>10}",
        "Project", "Score", "Weighted", "Weight", "Capital (M)", "Risk"
    );
    println!("{}", "-".repeat(75));
    for row in &report.rows {
        println!(
            "{:<24} {:>8.4} {:>9.3} {:>7.1}% {:>11} {:>10.2}",
            truncate(&row.project, 24),
            row.score,
            row.weighted_score,
            row.weight * 100.0,
            row.allocation,
            row.composite_risk
        );
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let head: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
