use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use examwatch::config::Config;
use examwatch::monitor::Monitor;
use examwatch::notify::{NoopMailer, SmtpMailer};
use examwatch::session::WebDriverFactory;

#[derive(Parser)]
#[command(
    name = "examwatch",
    version,
    about = "Watches the Certiport exam portal for free slots and mails a summary",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read configuration from a TOML file instead of the environment
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor on its configured cadence until terminated
    Watch,

    /// Run exactly one monitoring cycle and exit
    Check,

    /// Authenticate, fetch and print the availability report without
    /// sending any mail
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    setup_tracing(&cli.log_format, cli.verbose || !config.is_prod())?;

    match cli.command {
        Commands::Watch => {
            config.validate_for_notification()?;
            tracing::info!(
                minutes = config.schedule.run_minutes,
                resend_days = config.schedule.resend_days,
                months = config.schedule.months_ahead,
                recipients = config.email.recipients.len(),
                "starting watch loop"
            );

            let monitor = build_monitor(config)?;
            tokio::select! {
                () = monitor.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                }
            }
        }

        Commands::Check => {
            config.validate_for_notification()?;
            tracing::info!("running a single cycle");

            let monitor = build_monitor(config)?;
            let outcome = monitor.run_cycle().await?;
            println!("cycle outcome: {outcome}");
        }

        Commands::Report => {
            config.validate()?;
            tracing::info!("fetching availability report");

            // No mail needed for a read-only report
            let factory = WebDriverFactory::new(&config.portal.webdriver_url);
            let monitor = Monitor::new(config, factory, NoopMailer)?;
            let analysis = monitor.collect().await?;
            println!("{}", analysis.report.with_free_slots());
        }
    }

    Ok(())
}

fn build_monitor(config: Config) -> Result<Monitor<WebDriverFactory, SmtpMailer>> {
    let factory = WebDriverFactory::new(&config.portal.webdriver_url);
    let mailer = SmtpMailer::new(
        &config.email.smtp_server,
        config.email.smtp_port,
        &config.email.service_address,
        &config.email.app_password,
    )?;
    Ok(Monitor::new(config, factory, mailer)?)
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("examwatch=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("examwatch=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
