//! Performance baseline CLI
//!
//! Entry point for measuring components, auditing pages and running whole
//! suites from a `perf.toml`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perf_baseline::browser::BrowserSession;
use perf_baseline::runner::PageSource;
use perf_baseline::{Config, OutputFormat, PerfPipeline, Reporter, SuiteRunner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "perf-baseline")]
#[command(
    version,
    about = "Compare component and page performance against stored baselines"
)]
struct Cli {
    /// Suite configuration file
    #[arg(short, long, global = true, default_value = "perf.toml")]
    config: PathBuf,

    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    headful: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Measure render time, layout shift and memory of one component
    Measure {
        #[arg(long)]
        plugin: String,
        #[arg(long)]
        test_id: String,
        /// Page to load, absolute or relative to the suite base URL
        #[arg(long)]
        url: String,
    },
    /// Audit a page and write lighthouse_report_<page>.json
    Lighthouse {
        #[arg(long)]
        page: String,
        #[arg(long)]
        url: String,
    },
    /// Compare a page's audit report with its baseline
    Compare {
        #[arg(long)]
        page: String,
    },
    /// Audit a page, then compare it
    Audit {
        #[arg(long)]
        page: String,
        #[arg(long)]
        url: String,
    },
    /// Run every component and page in the configuration
    Run {
        /// console, json or json-pretty
        #[arg(long, default_value = "console")]
        format: String,
        /// Write the summary to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Reports go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Suite: {}", config.suite.name);

    match cli.command {
        Command::Measure {
            plugin,
            test_id,
            url,
        } => {
            let url = config.url_for(&url);
            let session = BrowserSession::launch(&config, cli.headful).await?;
            let pipeline = PerfPipeline::from_config(config);

            let probe = session.open_page(&url).await?;
            let measured = pipeline
                .measure_component_performance(&probe, &plugin, &test_id)
                .await;
            session.close().await?;

            let report = measured.with_context(|| format!("Failed to measure {}", test_id))?;
            if !report.baseline_found {
                println!("{}: no baseline, nothing measured", report.key);
            }
            for result in &report.results {
                println!("{} {}_{}: {}", result.outcome.icon(), report.key, result.kind, result.message);
            }
        }
        Command::Lighthouse { page, url } => {
            let url = config.url_for(&url);
            let pipeline = PerfPipeline::from_config(config);
            let outcome = pipeline.run_lighthouse(&page, &url).await?;
            println!("{}", outcome.report_path.display());
        }
        Command::Compare { page } => {
            let pipeline = PerfPipeline::from_config(config);
            print_summary(&page, pipeline.compare_lighthouse_report(&page)?);
        }
        Command::Audit { page, url } => {
            let url = config.url_for(&url);
            let pipeline = PerfPipeline::from_config(config);
            let (_, summary) = pipeline.audit_page(&page, &url).await?;
            print_summary(&page, summary);
        }
        Command::Run { format, output } => {
            let format: OutputFormat = format.parse()?;
            let session = if config.components.is_empty() {
                None
            } else {
                Some(Arc::new(BrowserSession::launch(&config, cli.headful).await?))
            };

            let mut runner = SuiteRunner::new(PerfPipeline::from_config(config));
            if let Some(session) = &session {
                runner = runner.with_page_source(Arc::clone(session) as Arc<dyn PageSource>);
            }
            let report = runner.run().await;

            drop(runner);
            if let Some(session) = session.and_then(|s| Arc::try_unwrap(s).ok()) {
                session.close().await?;
            }

            let report = report?;
            let reporter = Reporter::new(format);
            match output {
                Some(path) => {
                    reporter.write_to_file(&report, &path)?;
                    tracing::info!("Report written to {}", path.display());
                }
                None => reporter.report(&report)?,
            }
        }
    }

    Ok(())
}

fn print_summary(page: &str, summary: Option<perf_baseline::PageAuditSummary>) {
    match summary {
        Some(summary) => {
            for (key, value) in summary.entries() {
                println!("{}: {}", key, value);
            }
        }
        None => println!("{}: no baseline, nothing recorded", page),
    }
}
