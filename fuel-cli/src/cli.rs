use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fuel_core::{CheckIn, Config, FuelQuery, PriceFinder};
use inquire::{CustomType, Text, validator::Validation};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "fueltracker", version, about = "Look up UK fuel prices near a postcode")]
pub struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a config file interactively.
    Configure,

    /// Show fuel prices around a postcode.
    Lookup {
        /// Full UK postcode, e.g. "SW1A 1AA".
        #[arg(short, long)]
        postcode: String,

        /// Fuel type code such as E10, E5, B7 or SDV; omit for every fuel.
        #[arg(short, long, default_value = "")]
        fuel: String,

        /// Search radius in km; defaults to the configured radius.
        #[arg(short, long, allow_negative_numbers = true)]
        radius: Option<f64>,

        /// Only show one station, by site ID, brand or postcode.
        #[arg(short, long)]
        station: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        tracing::debug!(path = %config_path.display(), "using config file");

        match self.command {
            Command::Configure => configure(&config_path),
            Command::Lookup { postcode, fuel, radius, station, json } => {
                let config = Config::load_from(&config_path)?;
                let query = FuelQuery {
                    postcode,
                    radius_km: radius.unwrap_or(config.default_radius_km),
                    // Retailers publish upper-case codes.
                    fuel_type: fuel.to_uppercase(),
                    station,
                };
                lookup(&config, &query, json).await
            }
        }
    }
}

async fn lookup(config: &Config, query: &FuelQuery, json: bool) -> anyhow::Result<()> {
    let finder = PriceFinder::from_config(config)?;
    let records = finder
        .find(query)
        .await
        .with_context(|| format!("Could not look up fuel prices for '{}'", query.postcode))?;

    if json {
        println!("{}", output::render_json(&records)?);
    } else if records.is_empty() {
        println!("{}", output::no_results(query));
    } else {
        print!("{}", output::render_table(&records));
    }

    CheckIn::new(config.checkin_url.clone()).ping().await;
    Ok(())
}

fn configure(path: &std::path::Path) -> anyhow::Result<()> {
    let mut config = Config::load_from(path)?;

    println!("Configuring fueltracker ({})", path.display());

    config.default_radius_km = CustomType::<f64>::new("Default search radius (km):")
        .with_default(config.default_radius_km)
        .with_error_message("Please type a number")
        .with_validator(|v: &f64| {
            if v.is_finite() && *v >= 0.0 {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid("Radius must be zero or more".into()))
            }
        })
        .prompt()?;

    let user_agent = Text::new("Contact string sent to the geocoder (User-Agent):")
        .with_default(&config.geocoder.user_agent)
        .prompt()?;
    config.geocoder.user_agent = user_agent;

    let checkin = Text::new("Check-in URL pinged after each lookup (blank to disable):")
        .with_default(config.checkin_url.as_deref().unwrap_or(""))
        .prompt()?;
    config.checkin_url = Some(checkin.trim().to_string()).filter(|u| !u.is_empty());

    config.save_to(path)?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}
