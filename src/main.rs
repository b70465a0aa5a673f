//! Radon Monitor CLI
//!
//! Sub-slab vacuum and indoor air monitor.

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use radon_monitor::{
    config::Config,
    monitor::Monitor,
    scheduler::Scheduler,
    sensors::{AbpPart, AbpSensor, DeviceFileBus, EnvSource, SampleSource, SimulatedEnv, SimulatedPressure},
    sinks::{ConsoleNotifier, CsvLog, NotificationSink},
    stats::create_shared_stats_with_persistence,
    VERSION,
};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "webhook")]
use radon_monitor::{BlockingWebhookNotifier, WebhookConfig};

#[derive(Parser)]
#[command(name = "radon-monitor")]
#[command(version = VERSION)]
#[command(about = "Radon mitigation vacuum and indoor air monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start monitoring
    Start {
        /// Use simulated sensors instead of hardware
        #[arg(long)]
        simulate: bool,

        /// Log filter (e.g. info, debug, radon_monitor=trace); overrides RUST_LOG
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Show configuration
    Config,

    /// Check the configuration file and exit
    Validate,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            simulate,
            log_level,
        } => cmd_start(simulate, log_level),
        Commands::Config => cmd_config(),
        Commands::Validate => cmd_validate(),
        Commands::Init { force } => cmd_init(force),
    }
}

fn init_tracing(log_level: Option<String>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_start(simulate: bool, log_level: Option<String>) -> Result<()> {
    init_tracing(log_level);

    println!("Radon Monitor v{VERSION}");
    println!();

    let config = Config::load().context("Could not load configuration")?;
    config.validate().context("Invalid configuration")?;
    if let Err(e) = config.ensure_directories() {
        tracing::warn!("Could not create data directory: {e}");
    }

    let source: Box<dyn SampleSource> = if simulate {
        Box::new(SimulatedPressure::default())
    } else {
        let part = AbpPart::parse(&config.sensor.part_code)?;
        println!("  Sensor: {}", part.describe());
        Box::new(AbpSensor::new(
            part,
            DeviceFileBus::new(&config.sensor.device_path),
        ))
    };

    let env_source: Option<Box<dyn EnvSource>> = match (config.environment.enabled, simulate) {
        (false, _) => None,
        (true, true) => Some(Box::new(SimulatedEnv::new())),
        (true, false) => {
            tracing::warn!("No environmental device transport available; environmental channel disabled");
            None
        }
    };
    let env_label = match (config.environment.enabled, env_source.is_some()) {
        (false, _) => "disabled",
        (true, true) => "simulated",
        (true, false) => "unavailable",
    };

    let notifier = build_notifier(&config);
    let log = CsvLog::new(config.data_path.clone(), config.missing_sentinel);
    let stats = create_shared_stats_with_persistence(config.data_path.join("stats.json"));

    let mut monitor = Monitor::new(&config, source, env_source, log, notifier)?
        .with_stats(stats.clone());

    println!(
        "  Sampling: every {}s, {} samples per average",
        config.sampling.interval_secs, config.sampling.window_samples
    );
    println!(
        "  Calibration: {} averages",
        config.sampling.calibration_count
    );
    println!("  Environmental channel: {env_label}");
    println!("  Data directory: {:?}", config.data_path);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let scheduler = Scheduler::new(config.sampling.interval_secs);
    let handle = scheduler.stop_handle();
    ctrlc::set_handler(move || handle.stop()).context("Error setting Ctrl+C handler")?;

    monitor.announce_start(Local::now());
    println!("First averaged measurement will display in a few minutes...");

    scheduler.run(|now| {
        monitor.tick(now);
    });

    if let Err(e) = stats.save() {
        tracing::warn!("Could not save run stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
    Ok(())
}

#[cfg(feature = "webhook")]
fn build_notifier(config: &Config) -> Box<dyn NotificationSink> {
    if let Some(ref url) = config.notify.webhook_url {
        match BlockingWebhookNotifier::new(WebhookConfig::new(
            url.clone(),
            config.notify.webhook_token.clone(),
        )) {
            Ok(notifier) => {
                println!("  Notifications: webhook {url}");
                return Box::new(notifier);
            }
            Err(e) => {
                tracing::warn!("Webhook initialization failed: {e}; falling back to console");
            }
        }
    }
    println!("  Notifications: console");
    Box::new(ConsoleNotifier::new())
}

#[cfg(not(feature = "webhook"))]
fn build_notifier(config: &Config) -> Box<dyn NotificationSink> {
    if config.notify.webhook_url.is_some() {
        tracing::warn!("webhook_url ignored (webhook feature not enabled at compile time)");
    }
    println!("  Notifications: console");
    Box::new(ConsoleNotifier::new())
}

fn cmd_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_validate() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    println!("Configuration OK: {:?}", Config::config_path());
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let path = Config::config_path();
    if path.exists() && !force {
        bail!("{path:?} already exists (use --force to overwrite)");
    }

    let config = Config::default();
    config.save()?;
    config.ensure_directories()?;
    println!("Wrote default configuration to {path:?}");
    Ok(())
}
