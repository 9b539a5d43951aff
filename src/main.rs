//! Sleeptrack - log timed events and chart recent daily totals
//!
//! A CLI for a household sleep tracker (hours per person) or a baby
//! feeding tracker (millilitres per feed type). Events go to a local
//! file, a spreadsheet or a REST table; charts are recomputed from the
//! full event log on every run.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (bad input, config, or the store rejected a write)

mod analysis;
mod cli;
mod config;
mod models;
mod profile;
mod report;
mod store;

use analysis::{aggregate, rolling_average, since_last, AggregationParams};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use cli::{Args, AveragesArgs, ChartArgs, Command, LogArgs, OutputFormat};
use config::{ChartConfig, Config, CONFIG_FILE};
use models::{Event, GroupBy, SubjectFilter};
use profile::Profile;
use report::ChartSpec;
use std::path::Path;
use store::RecordStore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Sleeptrack v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .sleeptrack.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to pick the tracker variant, storage backend and chart defaults.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one command. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let profile = config.profile()?;
    info!("Tracker: {}", profile.variant);

    let store = store::open_store(&config.store, !args.quiet)?;
    let today = Local::now().date_naive();

    match args.command {
        Command::Log(ref log) => handle_log(store.as_ref(), &profile, log, today, Utc::now()).await,
        Command::Chart(ref chart) => {
            let events = load_events(store.as_ref()).await;
            let (output, days) = chart_output(&events, &profile, &config.chart, chart, today)?;
            emit(&output, chart.output.as_deref())?;
            info!("Charted {} events over {} days", events.len(), days);
            Ok(0)
        }
        Command::Averages(ref averages) => {
            let events = load_events(store.as_ref()).await;
            let output = averages_output(&events, &profile, &config.chart, averages, today)?;
            emit(&output, None)?;
            Ok(0)
        }
        Command::Since => {
            let events = load_events(store.as_ref()).await;
            println!("{}", since_output(&events, &profile, Utc::now()));
            Ok(0)
        }
        Command::InitConfig => Ok(0),
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Load the event stream, degrading to an empty stream if the store fails.
async fn load_events(store: &dyn RecordStore) -> Vec<Event> {
    match store.load_all().await {
        Ok(events) => {
            debug!("Loaded {} events from {}", events.len(), store.describe());
            events
        }
        Err(e) => {
            warn!("Failed to load events from {}: {}", store.describe(), e);
            eprintln!(
                "⚠️  Could not load data from {} ({}). Showing no data.",
                store.describe(),
                e
            );
            Vec::new()
        }
    }
}

/// Print to stdout or write to a file.
fn emit(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write chart to {}", path.display()))?;
            println!("✅ Chart saved to: {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}

/// Build the event for `log` after checking it against the profile.
fn build_event(
    profile: &Profile,
    args: &LogArgs,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Event> {
    profile
        .bounds
        .validate(args.measure)
        .map_err(anyhow::Error::msg)?;

    let category = match args.category {
        Some(ref name) => profile.resolve_category(name).with_context(|| {
            format!(
                "Unknown category '{}'. Choose one of: {}",
                name,
                profile.categories.join(", ")
            )
        })?,
        None => profile
            .categories
            .first()
            .map(String::as_str)
            .context("No categories configured")?,
    };

    let subject = match (&args.subject, profile.has_subjects()) {
        (Some(name), true) => Some(
            profile
                .resolve_subject(name)
                .with_context(|| {
                    format!(
                        "Unknown subject '{}'. Choose one of: {}",
                        name,
                        profile.subjects.join(", ")
                    )
                })?
                .to_string(),
        ),
        (None, true) => bail!(
            "--subject is required. Choose one of: {}",
            profile.subjects.join(", ")
        ),
        (Some(_), false) => bail!("This tracker does not record subjects"),
        (None, false) => None,
    };

    let date = args.date.unwrap_or(today);
    if date > today {
        bail!("Date {} is in the future", date);
    }

    Ok(Event::new(date, args.measure, category, subject).with_logged_at(now))
}

/// Handle `log`: validate, append, report. A rejected write is not retried.
async fn handle_log(
    store: &dyn RecordStore,
    profile: &Profile,
    args: &LogArgs,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<i32> {
    let event = build_event(profile, args, today, now)?;
    debug!("Appending {:?}", event);

    match store.append(&event).await {
        Ok(()) => {
            info!("Saved event to {}", store.describe());
            println!("✅ Saved!");
            Ok(0)
        }
        Err(e) => {
            error!("Failed to save event: {}", e);
            eprintln!("❌ Could not save: {}", e);
            Ok(1)
        }
    }
}

/// Resolve the subject filter from the CLI, the config, or "everyone".
fn resolve_filter(
    profile: &Profile,
    cli_subject: Option<&str>,
    chart_config: &ChartConfig,
) -> Result<SubjectFilter> {
    let text = cli_subject
        .or(chart_config.subject.as_deref())
        .unwrap_or(profile.all_label.as_str());

    match SubjectFilter::parse(text, &profile.all_label) {
        SubjectFilter::All => Ok(SubjectFilter::All),
        SubjectFilter::Only(name) => {
            if !profile.has_subjects() {
                bail!("This tracker does not record subjects");
            }
            match profile.resolve_subject(&name) {
                Some(known) => Ok(SubjectFilter::Only(known.to_string())),
                None => {
                    warn!("Subject '{}' is not configured", name);
                    Ok(SubjectFilter::Only(name))
                }
            }
        }
    }
}

fn resolve_group_by(profile: &Profile, cli_group_by: Option<GroupBy>) -> Result<GroupBy> {
    let group_by = cli_group_by.unwrap_or(profile.group_by);
    if group_by == GroupBy::Subject && !profile.has_subjects() {
        bail!("Cannot group by subject: this tracker does not record subjects");
    }
    Ok(group_by)
}

/// Render the chart for `chart`. Returns the output and the window used.
fn chart_output(
    events: &[Event],
    profile: &Profile,
    chart_config: &ChartConfig,
    args: &ChartArgs,
    today: NaiveDate,
) -> Result<(String, u32)> {
    let days = args.days.unwrap_or(profile.window.default);
    if !profile.window.contains(days) {
        bail!(
            "Days must be between {} and {}",
            profile.window.min,
            profile.window.max
        );
    }

    let params = AggregationParams {
        window_days: days,
        subject_filter: resolve_filter(profile, args.subject.as_deref(), chart_config)?,
        group_by: resolve_group_by(profile, args.group_by)?,
    };
    debug!(
        "Aggregating {} days for {} by {}",
        days, params.subject_filter, params.group_by
    );

    let result = aggregate(events, &params, today);
    let spec = ChartSpec::from_profile(profile, days);

    let output = match args.format {
        OutputFormat::Text => report::generate_text_chart(&result, &spec),
        OutputFormat::Markdown => report::generate_markdown_chart(&result, &spec),
        OutputFormat::Json => report::generate_json_chart(&result, &spec)?,
    };

    Ok((output, days))
}

/// Render the rolling averages for `averages`.
fn averages_output(
    events: &[Event],
    profile: &Profile,
    chart_config: &ChartConfig,
    args: &AveragesArgs,
    today: NaiveDate,
) -> Result<String> {
    let filter = resolve_filter(profile, args.subject.as_deref(), chart_config)?;
    let group_by = resolve_group_by(profile, args.group_by)?;

    let averages = rolling_average(events, &filter, group_by, today);
    let averages = averages.as_deref();

    Ok(match args.format {
        OutputFormat::Text => report::generate_text_averages(averages, &profile.unit),
        OutputFormat::Markdown => report::generate_markdown_averages(averages, &profile.unit),
        OutputFormat::Json => report::generate_json_averages(averages, &profile.unit)?,
    })
}

/// Describe the most recent event.
fn since_output(events: &[Event], profile: &Profile, now: DateTime<Utc>) -> String {
    let last = match since_last(events, now) {
        Some(last) => last,
        None => return "No events logged yet.".to_string(),
    };

    let measure = last.event.measure.unwrap_or(0.0);
    let mut line = format!(
        "Last event: {} {} {}",
        report::format_measure(measure),
        profile.unit,
        last.event.category
    );
    if let Some(ref subject) = last.event.subject {
        line.push_str(&format!(" for {}", subject));
    }
    line.push_str(&format!(
        " at {} ({})",
        last.at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        last.describe()
    ));
    line
}
