//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{GroupBy, Variant};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Sleeptrack - log sleep or feeds and chart the last few days
///
/// Examples:
///   sleeptrack log --measure 7.5 --subject Lloyd
///   sleeptrack log --measure 0.5 --category Nap --subject Georgia --date 2024-01-10
///   sleeptrack chart --days 14 --subject Both
///   sleeptrack --variant feeding log --measure 120 --category Bottle
///   sleeptrack averages
///   sleeptrack since
///   sleeptrack init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .sleeptrack.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE", env = "SLEEPTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tracker variant (overrides the config file)
    #[arg(long, global = true, value_name = "VARIANT")]
    pub variant: Option<Variant>,

    /// Use this data file (selects the file backend)
    #[arg(long, global = true, value_name = "FILE", env = "SLEEPTRACK_DATA")]
    pub data: Option<PathBuf>,

    /// Bearer token for the remote backends
    #[arg(long, global = true, env = "SLEEPTRACK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log one event
    Log(LogArgs),
    /// Chart daily totals over a recent window
    Chart(ChartArgs),
    /// Average daily totals over the last 5 days
    Averages(AveragesArgs),
    /// Time since the most recent event
    Since,
    /// Generate a default .sleeptrack.toml configuration file
    InitConfig,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LogArgs {
    /// Hours slept or millilitres fed
    #[arg(short, long, value_name = "AMOUNT")]
    pub measure: f64,

    /// Date of the event (YYYY-MM-DD, default today)
    #[arg(short, long, value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// Category (default: the first configured category)
    #[arg(short = 't', long, value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Who the event belongs to
    #[arg(short, long, value_name = "NAME")]
    pub subject: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChartArgs {
    /// Show data for how many days
    #[arg(short, long, value_name = "DAYS")]
    pub days: Option<u32>,

    /// Only this subject (or the all-subjects label, e.g. "Both")
    #[arg(short, long, value_name = "NAME")]
    pub subject: Option<String>,

    /// Secondary axis of the chart
    #[arg(short, long, value_name = "DIMENSION")]
    pub group_by: Option<GroupBy>,

    /// Output format (text, markdown, json)
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the chart to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AveragesArgs {
    /// Only this subject (or the all-subjects label)
    #[arg(short, long, value_name = "NAME")]
    pub subject: Option<String>,

    /// Dimension to average over
    #[arg(short, long, value_name = "DIMENSION")]
    pub group_by: Option<GroupBy>,

    /// Output format (text, markdown, json)
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,
}

/// Output format for charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Terminal bar chart (default)
    #[default]
    Text,
    /// Markdown table
    Markdown,
    /// JSON for external renderers
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// Checks that depend on the tracker profile happen once it is resolved.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match self.command {
            Command::Log(ref log) => {
                if !log.measure.is_finite() || log.measure < 0.0 {
                    return Err("Measure must be a non-negative number".to_string());
                }
            }
            Command::Chart(ref chart) => {
                if chart.days == Some(0) {
                    return Err("Days must be at least 1".to_string());
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
