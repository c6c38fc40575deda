//! Tolerant decoding of retailer fuel price feeds.
//!
//! Retailers publish the same open-data layout but disagree on wire types:
//! some send coordinates and prices as JSON numbers, others as strings, and a
//! few send `null` or leave fields out entirely. The raw shapes below accept
//! all of those, and `resolve` turns them into canonical [`Station`]s holding
//! plain `f64`s. A value that is present but unreadable fails the whole feed.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    error::DecodeError,
    model::{Location, Station},
};

/// Layouts seen in the wild for the feed-level `last_updated` field.
const LAST_UPDATED_FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Deserialize)]
struct RawFeed {
    last_updated: Option<Value>,
    stations: Option<Vec<Option<RawStation>>>,
}

#[derive(Debug, Deserialize)]
struct RawStation {
    site_id: Option<Value>,
    #[serde(rename = "siteId")]
    site_id_camel: Option<Value>,
    #[serde(rename = "site_ID")]
    site_id_upper: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    brand: String,
    #[serde(default, deserialize_with = "null_as_default")]
    address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    postcode: String,
    location: Option<RawLocation>,
    prices: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    latitude: Option<Value>,
    longitude: Option<Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode one feed body into canonical stations, preserving feed order.
/// `null` entries in the station list are skipped.
pub fn decode_feed(body: &[u8]) -> Result<Vec<Station>, DecodeError> {
    let raw: RawFeed = serde_json::from_slice(body)?;

    let updated_at = raw
        .last_updated
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_last_updated);

    raw.stations
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(|station| resolve(station, updated_at))
        .collect()
}

fn resolve(raw: RawStation, updated_at: Option<DateTime<Utc>>) -> Result<Station, DecodeError> {
    let site_id = match raw.site_id.or(raw.site_id_camel).or(raw.site_id_upper) {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    let location = match raw.location {
        Some(loc) => Location {
            latitude: coordinate(loc.latitude.as_ref(), "latitude", &site_id)?,
            longitude: coordinate(loc.longitude.as_ref(), "longitude", &site_id)?,
        },
        None => Location::default(),
    };

    let mut prices = HashMap::new();
    for (code, value) in raw.prices.unwrap_or_default() {
        let price = number_or_string(&value)
            .ok_or_else(|| invalid_field("prices", &site_id, &value))?;
        prices.insert(code, price);
    }

    Ok(Station {
        site_id,
        brand: raw.brand,
        address: raw.address,
        postcode: raw.postcode,
        location,
        prices,
        updated_at,
    })
}

fn coordinate(
    value: Option<&Value>,
    field: &'static str,
    site_id: &str,
) -> Result<f64, DecodeError> {
    match value {
        None => Ok(0.0),
        Some(v) => number_or_string(v)
            .filter(|n| n.is_finite())
            .ok_or_else(|| invalid_field(field, site_id, v)),
    }
}

/// Numeric value first, then a string holding a number. `null` and blank
/// strings read as zero.
fn number_or_string(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn invalid_field(field: &'static str, site_id: &str, value: &Value) -> DecodeError {
    DecodeError::InvalidField {
        field,
        site_id: site_id.to_string(),
        value: value.to_string(),
    }
}

fn parse_last_updated(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // TODO: feeds publish UK local time; convert from Europe/London instead of assuming UTC.
    LAST_UPDATED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ndt| ndt.and_utc())
}
