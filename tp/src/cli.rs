//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::{Budget, TripPlanPatch};

/// TripPlanner - AI itinerary generation
#[derive(Parser)]
#[command(
    name = "tp",
    about = "Generate day-by-day travel itineraries with a generative model",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log at DEBUG level
    #[arg(short, long, global = true, help = "Log at DEBUG level")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate an itinerary for a trip
    Generate {
        #[command(flatten)]
        plan: PlanArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Write the finished trip plan to this file (YAML, or JSON for *.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the generation prompt without calling the model
    Prompt {
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Parse saved model output
    Parse {
        /// File holding the raw model reply
        file: PathBuf,

        /// Tolerate missing descriptions and malformed optional fields
        #[arg(long)]
        lenient: bool,

        /// Also check the days are numbered 1..=N
        #[arg(long, value_name = "N")]
        expect_days: Option<u32>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

/// Trip inputs shared by `generate` and `prompt`
///
/// Flags override the values read from `--plan`.
#[derive(Debug, Clone, Default, Args)]
pub struct PlanArgs {
    /// Trip plan file (YAML or JSON, camelCase fields)
    #[arg(short, long)]
    pub plan: Option<PathBuf>,

    /// Destination city or region
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Country of the destination
    #[arg(long)]
    pub country: Option<String>,

    /// Number of days
    #[arg(short = 'n', long)]
    pub days: Option<u32>,

    /// Interest (repeatable)
    #[arg(short, long = "interest", value_name = "INTEREST")]
    pub interests: Vec<String>,

    /// Total budget for the trip
    #[arg(long)]
    pub budget_total: Option<f64>,

    /// Budget per day
    #[arg(long)]
    pub budget_per_day: Option<f64>,

    /// Budget currency code
    #[arg(long)]
    pub currency: Option<String>,
}

impl PlanArgs {
    /// Combine the plan file and flags into one patch
    ///
    /// When only one budget figure is given the other is derived from the day count.
    pub fn to_patch(&self) -> Result<TripPlanPatch> {
        debug!(?self, "PlanArgs::to_patch: called");
        let base = match &self.plan {
            Some(path) => load_plan_file(path)?,
            None => TripPlanPatch::default(),
        };

        let days = self.days.or(base.number_of_days).unwrap_or(0);
        let currency = self
            .currency
            .clone()
            .or_else(|| base.budget.as_ref().map(|b| b.currency.clone()))
            .unwrap_or_default();

        let budget = match (self.budget_total, self.budget_per_day) {
            (Some(total), Some(per_day)) => Some(Budget::new(per_day, total, currency)),
            (Some(total), None) => Some(Budget::from_total(total, days, currency)),
            (None, Some(per_day)) => Some(Budget::from_per_day(per_day, days, currency)),
            (None, None) => base.budget.clone().map(|mut budget| {
                budget.currency = currency;
                budget
            }),
        };

        let flags = TripPlanPatch {
            destination: self.destination.clone(),
            country: self.country.clone(),
            number_of_days: self.days,
            interests: (!self.interests.is_empty()).then(|| self.interests.clone()),
            budget,
            ..Default::default()
        };

        Ok(base.merge(flags))
    }
}

/// Read a TripPlanPatch from YAML or JSON
pub fn load_plan_file(path: &Path) -> Result<TripPlanPatch> {
    debug!(?path, "load_plan_file: called");
    let content = std::fs::read_to_string(path).context(format!("Failed to read plan file {}", path.display()))?;

    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).context(format!("Failed to parse plan file {}", path.display()))
    } else {
        serde_yaml::from_str(&content).context(format!("Failed to parse plan file {}", path.display()))
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tripplanner")
        .join("logs")
        .join("tripplanner.log")
}

/// Output format for itinerary and parse results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(format!("Unknown format: {}. Use: text, json, or yaml", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}
