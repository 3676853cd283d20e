use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foodreport::config::ConfigSource;
use foodreport::pipeline::CountryOrder;
use foodreport::{Config, OutputFormat, PipelineOptions, ReportPipeline, SparqlClient};

/// Recipe nutrition and ethical-sourcing report generator.
#[derive(Parser, Debug)]
#[command(name = "foodreport", version)]
struct Args {
    /// Config file (default: $FOODREPORT_CONFIG, then ./config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SPARQL query endpoint of the knowledge store.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Recipe local name in the data namespace.
    #[arg(long, global = true)]
    recipe: Option<String>,

    /// Consuming country trade routes must ship to.
    #[arg(long, global = true)]
    destination: Option<String>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Maximum sourcing queries in flight.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Abort the whole run after this many seconds.
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,

    #[arg(long, value_enum)]
    country_order: Option<CountryOrder>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Generate the report (default)
    #[default]
    Report,
    /// Count the recipe's ingredients and steps to check the store is reachable
    Verify,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(ref endpoint) = self.endpoint {
            config.store.endpoint = endpoint.clone();
        }
        if let Some(ref recipe) = self.recipe {
            config.report.recipe = recipe.clone();
        }
        if let Some(ref destination) = self.destination {
            config.report.destination = destination.clone();
        }
        if let Some(format) = self.format {
            config.foodreport.format = format;
        }
        if let Some(concurrency) = self.concurrency {
            config.report.concurrency = concurrency;
        }
        if let Some(secs) = self.deadline_secs {
            config.report.deadline_secs = Some(secs);
        }
        if let Some(order) = self.country_order {
            config.report.country_order = order;
        }
    }
}

/// Command-line overrides apply before validation, so they can correct file values.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    let (mut config, source) = Config::load_unvalidated(args.config.as_deref())?;
    args.apply(&mut config);
    config
        .validate()
        .with_context(|| format!("Invalid configuration from {}", source))?;
    Ok((config, source))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = load_config(&args)?;

    // Logs go to stderr, the report to stdout
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.foodreport.log_level),
    )
    .init();
    log::debug!("Configuration loaded from {}", source);

    let client = SparqlClient::from_config(&config)?;
    log::info!("Using knowledge store at {}", client.endpoint());
    let pipeline = ReportPipeline::new(Arc::new(client), PipelineOptions::from_config(&config));

    match args.command.unwrap_or_default() {
        Command::Report => run_report(&pipeline, config.foodreport.format).await,
        Command::Verify => run_verify(&pipeline, &config).await,
    }
}

async fn run_report(pipeline: &ReportPipeline, format: OutputFormat) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    pipeline
        .run_and_render(format, &mut stdout)
        .await
        .context("Report generation failed")?;
    stdout.flush()?;
    Ok(())
}

async fn run_verify(pipeline: &ReportPipeline, config: &Config) -> Result<()> {
    let summary = pipeline
        .verify()
        .await
        .with_context(|| format!("Could not verify recipe {}", config.report.recipe))?;

    println!("Endpoint:    {}", config.store.endpoint);
    println!("Recipe:      {}", config.report.recipe);
    println!("Ingredients: {}", summary.ingredient_count);
    println!("Steps:       {}", summary.step_count);
    if summary.ingredient_count == 0 {
        log::warn!(
            "Recipe {} has no ingredients; check the name and the data namespace",
            config.report.recipe
        );
    }
    Ok(())
}
