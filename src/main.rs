use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use lumi_suite::orchestrator::{Orchestrator, SuiteRequest};
use lumi_suite::runner::{artifacts::list_artifacts, ConsoleEventListener};
use lumi_suite::utils::config::{Config, ExecutorKind};
use lumi_suite::report;

#[derive(Parser)]
#[command(name = "lumi-suite")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(about = "Generated test suites for web applications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, rank and execute a test suite against a target
    Run {
        /// Target URL
        #[arg(short, long)]
        target: String,

        /// Number of candidate test cases to generate
        #[arg(short, long)]
        candidates: Option<usize>,

        /// Number of top-ranked test cases to execute
        #[arg(short, long)]
        execute: Option<usize>,

        /// Maximum concurrent test runs
        #[arg(long)]
        concurrency: Option<usize>,

        /// Path to a YAML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use the simulated executor
        #[arg(long, conflicts_with = "browser")]
        simulate: bool,

        /// Use a real browser
        #[arg(long)]
        browser: bool,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },

    /// Re-export a saved report
    Report {
        /// Path to report.json
        report: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List artifacts recorded for a suite run
    Artifacts {
        /// Suite task id
        task_id: String,

        /// Artifacts directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Path to a YAML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            target,
            candidates,
            execute,
            concurrency,
            config,
            simulate,
            browser,
            output,
        } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(k) = concurrency {
                config.max_concurrency = k;
            }
            if simulate {
                config.executor = ExecutorKind::Simulated;
            } else if browser {
                config.executor = ExecutorKind::Browser;
            }
            config.validate()?;

            let request = SuiteRequest::new(&target).with_counts(
                candidates.unwrap_or(config.default_candidate_count),
                execute.unwrap_or(config.default_execute_count),
            );

            println!("{} Target: {}", "▶".green().bold(), target.cyan());
            println!(
                "  Candidates: {}, executing top {}",
                request.candidate_count, request.execute_count
            );
            println!(
                "  Executor: {:?}, concurrency: {}",
                config.executor, config.max_concurrency
            );

            let orchestrator = Orchestrator::from_config(&config)?;
            let listener = tokio::spawn(ConsoleEventListener::listen(orchestrator.subscribe()));

            let handle = orchestrator.start(request)?;
            let task_id = handle.task_id().to_string();

            let cancel = handle.cancel_token();
            ctrlc::set_handler(move || {
                println!("\n{} Cancelling pending test runs...", "⏹".yellow());
                cancel.cancel();
            })?;
            let outcome = handle.wait().await;

            // Closing the last sender ends the listener
            drop(orchestrator);
            let _ = listener.await;

            let report = outcome?;
            report::write_all(&report, &output)?;

            let summary = report.summary();
            println!("\n{} Suite {} finished", "■".blue().bold(), task_id.cyan());
            println!(
                "  {} passed, {} failed, {} errored",
                summary.passed.to_string().green(),
                summary.failed.to_string().red(),
                summary.errored.to_string().yellow()
            );
            println!("  Success rate: {:.1}%", report.success_rate * 100.0);
            println!("  Artifacts: {}", summary.artifact_count);
            if let Some(err) = summary.most_common_error {
                println!("  Most common error: {}", err.dimmed());
            }
        }

        Commands::Report {
            report: path,
            format,
            output,
        } => {
            report::generate_report(&path, &format, output.as_deref()).await?;
        }

        Commands::Artifacts {
            task_id,
            dir,
            config,
        } => {
            let dir = match dir {
                Some(dir) => dir,
                None => Config::load(config.as_deref())?.artifacts_dir,
            };
            let found = list_artifacts(&dir, &task_id, &[]);
            if found.is_empty() {
                println!("{} No artifacts for {}", "ℹ".blue(), task_id);
            }
            for path in found {
                println!("{}", path);
            }
        }
    }

    Ok(())
}
