//! Core library for the `fueltracker` CLI.
//!
//! This crate defines:
//! - Canonical station and price record models
//! - Tolerant decoding of retailer fuel price feeds
//! - A one-hour on-disk feed cache
//! - Feed fetching and aggregation across retailers
//! - Postcode geocoding, radius filtering and per-fuel projection
//!
//! It is used by `fuel-cli`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod cache;
pub mod clock;
pub mod config;
pub mod decode;
pub mod error;
pub mod feed;
pub mod geo;
pub mod geocode;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod project;

pub use aggregate::{Aggregator, FeedSource};
pub use cache::{CacheEntry, CacheKey, FeedCache, FileCache, MemoryCache};
pub use config::{Config, GeocoderConfig};
pub use error::{DecodeError, FeedError, FetchError, GeocodeError, QueryError};
pub use feed::{FeedFetcher, FeedTransport, HttpTransport};
pub use geocode::{Geocoder, NominatimGeocoder};
pub use model::{FuelQuery, Location, PricedRecord, Station};
pub use notify::CheckIn;
pub use pipeline::PriceFinder;
