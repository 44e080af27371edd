//! Route and flight lookup commands

use anyhow::{bail, Result};
use colored::Colorize;

use crate::client::{ApiClient, FlightPrefill, RouteInfo};
use crate::output::{print_json, print_warning, OutputFormat};

/// Show route category and the airlines allowed on it
pub async fn show_route(
    client: &ApiClient,
    origin: &str,
    destination: &str,
    format: OutputFormat,
) -> Result<()> {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("origin", origin)
        .append_pair("destination", destination)
        .finish();
    let path = format!("v1/routes?{}", query);

    let route: RouteInfo = client.get(&path).await?;

    match format {
        OutputFormat::Json => print_json(&route)?,
        OutputFormat::Table => {
            println!(
                "{} → {}  {}",
                route.origin.cyan(),
                route.destination.cyan(),
                route.label.bold()
            );
            println!("{}", "-".repeat(50));
            for airline in &route.airlines {
                println!("  • {}", airline);
            }
        }
    }

    Ok(())
}

/// Path of the flight lookup; IATA flight numbers are letters and digits only
fn flight_path(flight: &str) -> Result<String> {
    let flight = flight.trim().to_uppercase();
    if flight.is_empty() || !flight.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("Invalid flight number '{}', expected letters and digits like AM58", flight);
    }
    Ok(format!("v1/flights/{}", flight))
}

/// Look up a flight number to pre-fill origin and airline
pub async fn show_flight(client: &ApiClient, flight: &str, format: OutputFormat) -> Result<()> {
    let path = flight_path(flight)?;
    let prefill: Option<FlightPrefill> = client.get_optional(&path).await?;

    let Some(prefill) = prefill else {
        print_warning(&format!("No details found for flight {}", flight));
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(&prefill)?,
        OutputFormat::Table => {
            println!("{}", format!("Flight {}", flight.to_uppercase()).bold());
            println!(
                "Origin:   {}",
                prefill.origin.as_deref().unwrap_or("not served").cyan()
            );
            println!(
                "Airline:  {}",
                prefill.airline.as_deref().unwrap_or("not listed").cyan()
            );
        }
    }

    Ok(())
}
