//! # StillOnTime — shooting-schedule automation backend
//!
//! Usage:
//!   stillontime                                  # Start the gateway (default)
//!   stillontime serve --port 8080                # Custom port
//!   stillontime calc 2026-03-14 08:00 45         # One-shot time calculation

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stillontime_core::StillOnTimeConfig;
use stillontime_core::types::TimeBuffers;
use stillontime_schedule::time_calc::calculate_time_schedule;

#[derive(Parser)]
#[command(
    name = "stillontime",
    version,
    about = "🎬 StillOnTime — never be late to set"
)]
struct Cli {
    /// Config file path (default: ~/.stillontime/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP gateway and background loops (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// One-shot wake-up calculation, printed to stdout
    Calc {
        /// Shooting date (YYYY-MM-DD)
        date: NaiveDate,
        /// Call time (HH:MM)
        call_time: String,
        /// One-way travel time in minutes
        travel_minutes: u32,
        /// Traffic buffer in minutes
        #[arg(long)]
        traffic: Option<u32>,
        /// Morning routine in minutes
        #[arg(long)]
        morning_routine: Option<u32>,
    },
}

fn load_config(cli: &Cli) -> Result<StillOnTimeConfig> {
    let config = match &cli.config {
        Some(path) => StillOnTimeConfig::load_from(std::path::Path::new(path))?,
        None => StillOnTimeConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "stillontime=debug,tower_http=debug"
    } else {
        "stillontime=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        None | Some(Command::Serve { port: None }) => {
            let config = load_config(&cli)?;
            serve(config).await
        }
        Some(Command::Serve { port: Some(port) }) => {
            let mut config = load_config(&cli)?;
            config.gateway.port = port;
            serve(config).await
        }
        Some(Command::Calc {
            date,
            call_time,
            travel_minutes,
            traffic,
            morning_routine,
        }) => {
            let mut buffers = TimeBuffers::default();
            if let Some(t) = traffic {
                buffers.traffic = t;
            }
            if let Some(m) = morning_routine {
                buffers.morning_routine = m;
            }
            calc(date, &call_time, travel_minutes, &buffers)
        }
    }
}

async fn serve(config: StillOnTimeConfig) -> Result<()> {
    println!("🎬 StillOnTime v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "   🌐 Gateway:  http://{}:{}",
        config.gateway.host, config.gateway.port
    );
    println!("   🗄️  Database: {}", config.database.resolved_path().display());
    println!(
        "   📧 IMAP:     {}",
        if config.imap.enabled { &config.imap.host } else { "disabled" }
    );
    println!(
        "   🌤️  Weather:  {}",
        if config.weather.enabled { "enabled" } else { "disabled" }
    );
    println!();

    stillontime_gateway::start(config).await
}

fn calc(date: NaiveDate, call_time: &str, travel_minutes: u32, buffers: &TimeBuffers) -> Result<()> {
    let schedule = calculate_time_schedule(date, call_time, travel_minutes, buffers)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("🎬 Shooting day {date}, call at {call_time}");
    println!();
    println!("   ⏰ Wake up:    {}", schedule.wake_up_time.format("%Y-%m-%d %H:%M"));
    println!("   🚗 Departure:  {}", schedule.departure_time.format("%H:%M"));
    println!("   📍 Arrival:    {}", schedule.arrival_time.format("%H:%M"));
    println!("   🕐 Total:      {} min (travel {} + buffers {})",
        schedule.total_travel_minutes, travel_minutes, buffers.sum());

    if !schedule.warnings.is_empty() {
        println!();
        for w in &schedule.warnings {
            println!("   ⚠ {w}");
        }
    }
    if !schedule.recommendations.is_empty() {
        println!();
        for r in &schedule.recommendations {
            println!("   💡 {r}");
        }
    }
    Ok(())
}
