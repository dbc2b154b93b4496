//! TripPlanner - AI itinerary generation
//!
//! CLI entry point for generating itineraries and inspecting prompts and replies.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result, eyre};
use tracing::{debug, info, warn};

use tripplanner::cli::{Cli, Command, OutputFormat, PlanArgs, get_log_path};
use tripplanner::config::Config;
use tripplanner::domain::{TripPlan, check_day_sequence};
use tripplanner::llm::create_client;
use tripplanner::pipeline::{GenerationOutcome, ItineraryGenerator, PipelineError, PipelineOptions, Strictness, parse_response};
use tripplanner::prompts::{PromptLoader, build_itinerary_prompt};
use tripplanner::render;
use tripplanner::store::TripStore;

fn setup_logging(verbose: bool) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "TripPlanner loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Generate { plan, format, output } => {
            debug!(?format, ?output, "main: matched Generate command");
            cmd_generate(&config, &plan, format, output.as_deref()).await
        }
        Command::Prompt { plan } => {
            debug!("main: matched Prompt command");
            cmd_prompt(&config, &plan)
        }
        Command::Parse {
            file,
            lenient,
            expect_days,
            format,
        } => {
            debug!(?file, lenient, ?expect_days, "main: matched Parse command");
            cmd_parse(&config, &file, lenient, expect_days, format)
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

/// Run one generation for the trip described by `plan_args`
async fn cmd_generate(config: &Config, plan_args: &PlanArgs, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    debug!(?format, "cmd_generate: called");
    config.validate()?;

    let store = TripStore::spawn();
    store
        .patch(plan_args.to_patch()?)
        .await
        .context("Invalid trip plan")?;

    let client = create_client(&config.llm)?;
    let prompts = Arc::new(PromptLoader::new(config.prompts.root_path()));
    let generator = ItineraryGenerator::new(store.clone(), client, prompts, PipelineOptions::from_config(config));

    eprintln!("Generating itinerary with {}...", config.llm.model);
    let outcome = tokio::select! {
        outcome = generator.generate() => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("cmd_generate: interrupted");
            return Err(eyre!("Generation cancelled"));
        }
    };

    match outcome {
        GenerationOutcome::Completed(generated) => {
            info!(days = generated.itinerary.len(), "cmd_generate: generation completed");
        }
        GenerationOutcome::Failed(err) => {
            debug!(error = ?err, "cmd_generate: generation failed");
            return Err(failure(&err));
        }
        GenerationOutcome::AlreadyRunning | GenerationOutcome::Discarded => {
            return Err(eyre!("Generation did not complete"));
        }
    }

    let plan = store
        .read()
        .await?
        .ok_or_else(|| eyre!("Trip plan disappeared after generation"))?;

    print_plan(&plan, format)?;
    if let Some(path) = output {
        write_plan(&plan, path)?;
        eprintln!("Saved trip plan to {}", path.display());
    }
    store.shutdown().await?;
    Ok(())
}

/// Print the rendered generation prompt
fn cmd_prompt(config: &Config, plan_args: &PlanArgs) -> Result<()> {
    debug!("cmd_prompt: called");
    let mut plan = TripPlan::empty();
    plan.apply(plan_args.to_patch()?)
        .map_err(|e| eyre!("Invalid trip plan: {}", e))?;

    let loader = PromptLoader::new(config.prompts.root_path());
    let prompt = build_itinerary_prompt(&loader, &plan, &config.pipeline.default_currency)
        .map_err(|e| failure(&PipelineError::from(e)))?;
    println!("{}", prompt);
    Ok(())
}

/// Parse a saved model reply
fn cmd_parse(
    config: &Config,
    file: &Path,
    lenient: bool,
    expect_days: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    debug!(?file, lenient, ?expect_days, "cmd_parse: called");
    let text = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    let strictness = if lenient {
        Strictness::Lenient
    } else {
        config.pipeline.strictness
    };

    let mut generated = parse_response(&text, strictness).map_err(|e| {
        let kind = PipelineError::from(e.clone()).kind();
        warn!(%kind, error = %e, "cmd_parse: reply rejected");
        eyre!("{} error: {}", kind, e)
    })?;
    generated.itinerary.sort_by_key(|d| d.day);
    if let Some(days) = expect_days {
        check_day_sequence(&generated.itinerary, days).map_err(|e| eyre!("validation error: {}", e))?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&generated)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&generated)?),
        OutputFormat::Text => {
            println!("Parsed {} days", generated.itinerary.len());
            for day in &generated.itinerary {
                println!();
                print!("{}", render::render_day(day));
            }
        }
    }
    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn print_plan(plan: &TripPlan, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render::render_plan(plan)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(plan)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(plan)?),
    }
    Ok(())
}

fn write_plan(plan: &TripPlan, path: &Path) -> Result<()> {
    debug!(?path, "write_plan: called");
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let content = if is_json {
        serde_json::to_string_pretty(plan)?
    } else {
        serde_yaml::to_string(plan)?
    };
    fs::write(path, content).context(format!("Failed to write {}", path.display()))
}

/// Log the full error and turn it into the message shown to the user
fn failure(err: &PipelineError) -> eyre::Report {
    warn!(kind = %err.kind(), error = %err, "command failed");
    eyre!("{} ({} error)", err.user_message(), err.kind())
}
