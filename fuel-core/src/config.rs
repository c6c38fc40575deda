use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{aggregate::FeedSource, feed::DEFAULT_FETCH_TIMEOUT};

/// Retailer feeds published under the CMA open fuel price data scheme.
const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("applegreen", "https://applegreenstores.com/fuel-prices/data.json"),
    ("ascona", "https://fuelprices.asconagroup.co.uk/newfuel.json"),
    ("asda", "https://storelocator.asda.com/fuel_prices_data.json"),
    ("bp", "https://www.bp.com/en_gb/united-kingdom/home/fuelprices/fuel_prices_data.json"),
    ("esso", "https://fuelprices.esso.co.uk/latestdata.json"),
    ("jet", "https://jetlocal.co.uk/fuel_prices_data.json"),
    ("morrisons", "https://www.morrisons.com/fuel-prices/fuel.json"),
    ("moto", "https://moto-way.com/fuel-price/fuel_prices.json"),
    ("mfg", "https://fuel.motorfuelgroup.com/fuel_prices_data.json"),
    ("rontec", "https://www.rontec-servicestations.co.uk/fuel-prices/data/fuel_prices_data.json"),
    ("sainsburys", "https://api.sainsburys.co.uk/v1/exports/latest/fuel_prices_data.json"),
    ("sgn", "https://www.sgnretail.uk/files/data/SGN_daily_fuel_prices.json"),
    ("shell", "https://www.shell.co.uk/fuel-prices-data.html"),
];

/// Postcode lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: concat!("fueltracker/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// default_radius_km = 3.0
/// checkin_url = "https://hc-ping.com/<uuid>"
///
/// [[feeds]]
/// name = "esso"
/// url = "https://fuelprices.esso.co.uk/latestdata.json"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_radius_km: f64,
    pub fetch_timeout_secs: u64,
    /// Overrides the platform cache directory for feed bodies.
    pub cache_dir: Option<PathBuf>,
    /// Monitoring URL pinged after each successful lookup.
    pub checkin_url: Option<String>,
    pub geocoder: GeocoderConfig,
    /// Feeds in the order their stations are merged.
    pub feeds: Vec<FeedSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_radius_km: 5.0,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            cache_dir: None,
            checkin_url: None,
            geocoder: GeocoderConfig::default(),
            feeds: DEFAULT_FEEDS.iter().map(|(name, url)| FeedSource::new(*name, *url)).collect(),
        }
    }
}

impl Config {
    /// Load config from the default location, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Where feed bodies are cached.
    pub fn resolve_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.cache_dir().join("feeds")),
        }
    }

    pub fn feed_sources(&self) -> &[FeedSource] {
        &self.feeds
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "fueltracker", "fueltracker")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
