use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point on the Earth's surface, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// One retailer site, normalized from whichever vendor feed published it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Station {
    /// Vendor-assigned identifier; empty when the vendor omits it.
    pub site_id: String,
    pub brand: String,
    pub address: String,
    pub postcode: String,
    pub location: Location,
    /// Fuel-type code (e.g. "E10", "B7") to price, as published.
    pub prices: HashMap<String, f64>,
    /// Feed-level "last updated" instant, when the vendor supplied a readable one.
    pub updated_at: Option<DateTime<Utc>>,
}

/// One fuel-type price at one station; the unit the pipeline hands to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedRecord {
    pub site_id: String,
    pub brand: String,
    pub postcode: String,
    pub fuel_type_code: String,
    pub price: f64,
    /// Vendor timestamp when available, otherwise the time of projection.
    pub recorded_at: DateTime<Utc>,
    /// `MM/YYYY` of `recorded_at`.
    pub month_year: String,
}

/// A "which stations near here sell what" request.
#[derive(Debug, Clone)]
pub struct FuelQuery {
    pub postcode: String,
    pub radius_km: f64,
    /// Empty means every fuel type.
    pub fuel_type: String,
    /// Optional site ID, brand or postcode fragment to narrow the result.
    pub station: Option<String>,
}
