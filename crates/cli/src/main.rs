//! ConectIA CLI
//!
//! A command-line tool for requesting flight delay estimates and exploring
//! route rules against the ConectIA estimation service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client::{EstimateRequest, WeatherOverride};
use commands::{estimate, routes};

/// ConectIA CLI
#[derive(Parser)]
#[command(name = "conectia")]
#[command(author, version, about = "CLI for ConectIA flight delay estimates", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CONECTIA_API_URL env var)
    #[arg(long, env = "CONECTIA_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate delay risk for a flight
    Estimate(EstimateArgs),

    /// Show the latest estimate of this session
    Last,

    /// Discard the latest estimate
    Clear,

    /// Show route category and permitted airlines
    Routes {
        /// Origin airport code, e.g. MEX
        origin: String,

        /// Destination airport code, e.g. JFK
        destination: String,
    },

    /// Look up a flight number to pre-fill origin and airline
    Flight {
        /// IATA flight number, e.g. AM58
        iata: String,
    },
}

#[derive(Args)]
pub struct EstimateArgs {
    /// Origin airport code, e.g. MEX
    origin: String,

    /// Destination airport code, e.g. JFK
    destination: String,

    /// Airline name (defaults to `default_airline` from the config file)
    #[arg(long, short)]
    airline: Option<String>,

    /// Departure date, YYYY-MM-DD (defaults to today)
    #[arg(long, short)]
    date: Option<String>,

    /// Departure hour, 0-23
    #[arg(long)]
    hour: u32,

    /// Simulated temperature in °C
    #[arg(long)]
    temperature: Option<f64>,

    /// Simulated precipitation in mm
    #[arg(long)]
    precipitation: Option<f64>,

    /// Simulated wind speed in km/h
    #[arg(long)]
    wind_speed: Option<f64>,

    /// Simulated visibility in km
    #[arg(long)]
    visibility: Option<f64>,
}

impl EstimateArgs {
    fn into_request(self, default_airline: Option<String>) -> Result<EstimateRequest> {
        let airline = self
            .airline
            .or(default_airline)
            .context("No airline given; pass --airline or set default_airline in the config")?;
        let date = self
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive().format("%Y-%m-%d").to_string());

        let weather = WeatherOverride {
            temperature: self.temperature,
            precipitation: self.precipitation,
            wind_speed: self.wind_speed,
            visibility: self.visibility,
        };

        Ok(EstimateRequest {
            origin: self.origin,
            destination: self.destination,
            airline,
            date,
            hour: self.hour,
            weather: (!weather.is_empty()).then_some(weather),
        })
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.api_url(cli.api_url.as_deref());
    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(output::OutputFormat::from_name)
        })
        .unwrap_or_default();

    if cli.verbose {
        output::print_info(&format!("Using API at {}", api_url));
    }

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Estimate(args) => {
            let request = args.into_request(config.default_airline.clone())?;
            estimate::estimate(&client, &request, format).await?;
        }
        Commands::Last => estimate::show_last(&client, format).await?,
        Commands::Clear => estimate::clear(&client).await?,
        Commands::Routes {
            origin,
            destination,
        } => routes::show_route(&client, &origin, &destination, format).await?,
        Commands::Flight { iata } => routes::show_flight(&client, &iata, format).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
