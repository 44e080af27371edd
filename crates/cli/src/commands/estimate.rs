//! Estimate-related CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, Estimate, EstimateRequest};
use crate::output::{
    color_risk, color_status, format_minutes, format_probability, format_timestamp, print_info,
    print_json, print_success, print_warning, OutputFormat,
};

/// Row for the weather table
#[derive(Tabled)]
struct WeatherRow {
    #[tabled(rename = "Temp (°C)")]
    temperature: String,
    #[tabled(rename = "Precip (mm)")]
    precipitation: String,
    #[tabled(rename = "Wind (km/h)")]
    wind_speed: String,
    #[tabled(rename = "Visibility (km)")]
    visibility: String,
    #[tabled(rename = "Source")]
    status: String,
}

/// Request a new estimate
pub async fn estimate(
    client: &ApiClient,
    request: &EstimateRequest,
    format: OutputFormat,
) -> Result<()> {
    let result: Estimate = client.post("v1/estimate", request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if request.weather.is_some() {
                print_info("Simulated weather applied");
            }
            print_estimate(&result);
        }
    }

    Ok(())
}

/// Show the session's latest estimate
pub async fn show_last(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let last: Option<Estimate> = client.get_optional("v1/estimate/last").await?;

    match (last, format) {
        (None, OutputFormat::Json) => println!("null"),
        (None, OutputFormat::Table) => print_warning("No estimate computed in this session yet"),
        (Some(result), OutputFormat::Json) => print_json(&result)?,
        (Some(result), OutputFormat::Table) => print_estimate(&result),
    }

    Ok(())
}

/// Discard the session's latest estimate
pub async fn clear(client: &ApiClient) -> Result<()> {
    client.delete("v1/estimate/last").await?;
    print_success("Session estimate cleared");
    Ok(())
}

fn print_estimate(result: &Estimate) {
    println!("{}", "Delay Estimate".bold());
    println!("{}", "=".repeat(50));
    println!("Route:        {}", result.route.cyan());
    println!("Airline:      {}", result.airline.cyan());
    println!("Generated:    {}", format_timestamp(result.generated_at));
    println!();

    match result.delay_probability {
        Some(p) => {
            let risk = result
                .risk_level
                .as_deref()
                .map(color_risk)
                .unwrap_or_default();
            println!("Probability:  {} {}", format_probability(p).bold(), risk);
        }
        None => println!("Probability:  {}", "unavailable".dimmed()),
    }
    match result.delay_minutes {
        Some(m) => println!("Expected:     {}", format_minutes(m).bold()),
        None => println!("Expected:     {}", "unavailable".dimmed()),
    }
    println!();

    let weather = &result.weather;
    let rows = vec![WeatherRow {
        temperature: format!("{:.1}", weather.temperature),
        precipitation: format!("{:.1}", weather.precipitation),
        wind_speed: format!("{:.1}", weather.wind_speed),
        visibility: format!("{:.1}", weather.visibility),
        status: color_status(&weather.status),
    }];
    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);

    if weather.status == "degraded" {
        print_warning("Weather lookup failed; default conditions were used");
    }

    println!();
    println!("{} {}", "Advice:".bold(), result.advice);
}
