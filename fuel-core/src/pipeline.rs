//! One end-to-end price lookup.

use std::sync::Arc;

use anyhow::Context;
use tracing::{Instrument, info, info_span};

use crate::{
    aggregate::Aggregator,
    cache::FileCache,
    clock::{Clock, SystemClock},
    config::Config,
    error::QueryError,
    feed::{FeedFetcher, HttpTransport},
    geo::{check_radius, within_radius},
    geocode::{Geocoder, NominatimGeocoder},
    model::{FuelQuery, PricedRecord},
    project::{filter_by_station, project_at},
};

const MAX_FUEL_CODE_LEN: usize = 8;

/// Answers "which stations near this postcode sell this fuel, at what price".
///
/// Invalid arguments and geocoding failures abort the query. Feed failures
/// do not: they only shrink the result. An empty result means no matching
/// station was found.
#[derive(Debug, Clone)]
pub struct PriceFinder {
    geocoder: Arc<dyn Geocoder>,
    aggregator: Aggregator,
    clock: Arc<dyn Clock>,
}

impl PriceFinder {
    pub fn new(geocoder: Arc<dyn Geocoder>, aggregator: Aggregator) -> Self {
        Self { geocoder, aggregator, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Wire up the HTTP transport, on-disk cache and Nominatim from config.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport =
            HttpTransport::new(config.fetch_timeout()).context("Failed to build HTTP client")?;
        let cache = FileCache::new(config.resolve_cache_dir()?);
        let geocoder =
            NominatimGeocoder::new(&config.geocoder).context("Failed to build geocoder client")?;

        let fetcher = FeedFetcher::new(Arc::new(transport), Arc::new(cache));
        let aggregator = Aggregator::new(fetcher, config.feed_sources().to_vec());

        Ok(Self::new(Arc::new(geocoder), aggregator))
    }

    pub async fn find(&self, query: &FuelQuery) -> Result<Vec<PricedRecord>, QueryError> {
        let query = normalize(query)?;
        let span = info_span!("lookup", postcode = %query.postcode, radius_km = query.radius_km);

        async move {
            let center = self.geocoder.locate(&query.postcode).await?;
            let stations = self.aggregator.aggregate_all().await;
            let nearby = within_radius(stations, center, query.radius_km)?;

            let mut records = project_at(&nearby, &query.fuel_type, self.clock.now());
            if let Some(needle) = &query.station {
                records = filter_by_station(records, needle);
            }

            info!(nearby = nearby.len(), records = records.len(), "lookup complete");
            Ok::<_, QueryError>(records)
        }
        .instrument(span)
        .await
    }
}

/// Validate a query and canonicalise its postcode.
pub fn normalize(query: &FuelQuery) -> Result<FuelQuery, QueryError> {
    check_radius(query.radius_km)?;
    if query.radius_km.is_infinite() {
        return Err(QueryError::InvalidArgument("radius must be finite".to_string()));
    }

    let postcode = normalize_postcode(&query.postcode)?;

    let fuel_type = query.fuel_type.trim();
    if fuel_type.len() > MAX_FUEL_CODE_LEN || !fuel_type.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(QueryError::InvalidArgument(format!(
            "fuel type code '{fuel_type}' must be up to {MAX_FUEL_CODE_LEN} letters or digits"
        )));
    }

    Ok(FuelQuery {
        postcode,
        radius_km: query.radius_km,
        fuel_type: fuel_type.to_string(),
        station: query.station.clone(),
    })
}

/// Upper-case, single-spaced UK postcode ("sw1a1aa" -> "SW1A 1AA").
fn normalize_postcode(raw: &str) -> Result<String, QueryError> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let bytes = compact.as_bytes();
    let shaped = (5..=7).contains(&bytes.len())
        && bytes.iter().all(u8::is_ascii_alphanumeric)
        && bytes[0].is_ascii_alphabetic()
        && bytes[bytes.len() - 3].is_ascii_digit()
        && bytes[bytes.len() - 2..].iter().all(u8::is_ascii_alphabetic);

    if !shaped {
        return Err(QueryError::InvalidArgument(format!(
            "'{}' does not look like a full UK postcode",
            raw.trim()
        )));
    }

    let (outward, inward) = compact.split_at(compact.len() - 3);
    Ok(format!("{outward} {inward}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::FeedSource,
        cache::MemoryCache,
        clock::ManualClock,
        error::{FetchError, GeocodeError},
        feed::FeedTransport,
        model::Location,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct FixedGeocoder(Option<Location>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn locate(&self, postcode: &str) -> Result<Location, GeocodeError> {
            self.0.ok_or_else(|| GeocodeError::NotFound { postcode: postcode.to_string() })
        }
    }

    #[derive(Debug, Default)]
    struct Feeds {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedTransport for Feeds {
        async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = match url {
                "https://esso.test" => {
                    r#"{"stations":[
                        {"site_id":"esso-1","brand":"ESSO","postcode":"WC2N 5DU",
                         "location":{"latitude":51.5080,"longitude":-0.1275},
                         "prices":{"E10":139.9,"B7":149.9}},
                        {"site_id":"esso-2","brand":"ESSO","postcode":"N14 6AA",
                         "location":{"latitude":51.6000,"longitude":-0.1278},
                         "prices":{"E10":135.9}}]}"#
                }
                "https://morrisons.test" => {
                    r#"{"stations":[
                        {"site_id":"m-1","brand":"MORRISONS","postcode":"SE1 7PB",
                         "location":{"latitude":"51.5070","longitude":"-0.1280"},
                         "prices":{"E10":"137.9"}}]}"#
                }
                _ => return Err(FetchError::Timeout { url: url.to_string() }),
            };
            Ok(body.as_bytes().to_vec())
        }
    }

    const LONDON: Location = Location { latitude: 51.5074, longitude: -0.1278 };

    fn finder(center: Option<Location>) -> (PriceFinder, Arc<Feeds>) {
        let feeds = Arc::new(Feeds::default());
        let fetcher = FeedFetcher::new(feeds.clone(), Arc::new(MemoryCache::default()));
        let aggregator = Aggregator::new(
            fetcher,
            vec![
                FeedSource::new("esso", "https://esso.test"),
                FeedSource::new("down", "https://down.test"),
                FeedSource::new("morrisons", "https://morrisons.test"),
            ],
        );
        let clock =
            Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap()));
        let finder =
            PriceFinder::new(Arc::new(FixedGeocoder(center)), aggregator).with_clock(clock);
        (finder, feeds)
    }

    fn query(radius_km: f64, fuel_type: &str) -> FuelQuery {
        FuelQuery {
            postcode: "wc2n5du".to_string(),
            radius_km,
            fuel_type: fuel_type.to_string(),
            station: None,
        }
    }

    #[tokio::test]
    async fn finds_nearby_prices_despite_a_dead_feed() {
        let (finder, _) = finder(Some(LONDON));

        let records = finder.find(&query(1.0, "E10")).await.unwrap();

        let got: Vec<_> = records.iter().map(|r| (r.site_id.as_str(), r.price)).collect();
        assert_eq!(got, [("esso-1", 139.9), ("m-1", 137.9)]);
        assert!(records.iter().all(|r| r.month_year == "10/2026"));
    }

    #[tokio::test]
    async fn all_fuels_and_station_narrowing() {
        let (finder, _) = finder(Some(LONDON));
        let mut q = query(1.0, "");
        q.station = Some("esso".into());

        let records = finder.find(&q).await.unwrap();

        let codes: Vec<_> = records.iter().map(|r| r.fuel_type_code.as_str()).collect();
        assert_eq!(codes, ["B7", "E10"]);
    }

    #[tokio::test]
    async fn nothing_in_range_is_an_empty_result() {
        let (finder, _) = finder(Some(Location::new(57.1497, -2.0943)));
        assert!(finder.find(&query(5.0, "E10")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn geocode_failure_aborts_before_fetching() {
        let (finder, feeds) = finder(None);

        let err = finder.find(&query(5.0, "E10")).await.unwrap_err();

        assert!(matches!(err, QueryError::Geocode(GeocodeError::NotFound { .. })));
        assert_eq!(feeds.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_arguments_are_rejected_up_front() {
        let (finder, feeds) = finder(Some(LONDON));

        for bad in [query(-0.5, "E10"), query(f64::INFINITY, "E10"), query(1.0, "E-10")] {
            let err = finder.find(&bad).await.unwrap_err();
            assert!(matches!(err, QueryError::InvalidArgument(_)), "{bad:?}");
        }
        assert_eq!(feeds.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn postcodes_are_canonicalised() {
        assert_eq!(normalize_postcode("sw1a1aa").unwrap(), "SW1A 1AA");
        assert_eq!(normalize_postcode("  M1   1AE ").unwrap(), "M1 1AE");
        assert_eq!(normalize_postcode("EC1A 1BB").unwrap(), "EC1A 1BB");
    }

    #[test]
    fn malformed_postcodes_are_invalid() {
        for bad in ["", "SW1A", "12345", "SW1A 1A1", "SW1A-1AA", "ABCDEFGHI"] {
            assert!(normalize_postcode(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn fuel_code_is_trimmed_not_recased() {
        let q = normalize(&FuelQuery {
            postcode: "N1 9GU".into(),
            radius_km: 0.0,
            fuel_type: " e10 ".into(),
            station: None,
        })
        .unwrap();
        assert_eq!(q.fuel_type, "e10");
        assert_eq!(q.radius_km, 0.0);
    }
}
