//! Postcode to coordinate lookup.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{config::GeocoderConfig, error::GeocodeError, model::Location};

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn locate(&self, postcode: &str) -> Result<Location, GeocodeError>;
}

/// OpenStreetMap Nominatim forward search, restricted to the UK.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, base_url: config.base_url.clone() })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn locate(&self, postcode: &str) -> Result<Location, GeocodeError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("format", "json"),
                ("postalcode", postcode),
                ("country", "United Kingdom"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = res.bytes().await?;
        let location = parse_search_response(postcode, &body)?;
        debug!(postcode, lat = location.latitude, lon = location.longitude, "geocoded postcode");
        Ok(location)
    }
}

/// Nominatim answers with an array of places whose coordinates are strings.
fn parse_search_response(postcode: &str, body: &[u8]) -> Result<Location, GeocodeError> {
    let places: Vec<NominatimPlace> = serde_json::from_slice(body)?;
    let place = places
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NotFound { postcode: postcode.to_string() })?;

    Ok(Location {
        latitude: parse_coordinate(&place.lat)?,
        longitude: parse_coordinate(&place.lon)?,
    })
}

fn parse_coordinate(raw: &str) -> Result<f64, GeocodeError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeocodeError::InvalidCoordinate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, query_param},
    };

    fn config(base_url: String) -> GeocoderConfig {
        GeocoderConfig { base_url, ..GeocoderConfig::default() }
    }

    #[test]
    fn parses_first_place() {
        let body = br#"[{"place_id":1,"lat":"51.5010","lon":"-0.1416","display_name":"SW1A 1AA"},
                        {"place_id":2,"lat":"0","lon":"0"}]"#;
        let loc = parse_search_response("SW1A 1AA", body).unwrap();
        assert_eq!(loc, Location::new(51.5010, -0.1416));
    }

    #[test]
    fn empty_result_is_not_found() {
        let err = parse_search_response("ZZ9 9ZZ", b"[]").unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound { ref postcode } if postcode == "ZZ9 9ZZ"));
    }

    #[test]
    fn unreadable_coordinate_is_rejected() {
        let err = parse_search_response("X", br#"[{"lat":"north","lon":"1"}]"#).unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidCoordinate(_)));
    }

    #[tokio::test]
    async fn locate_queries_uk_postcode() {
        let body = r#"[{"lat":"51.5308","lon":"-0.1238"}]"#;
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("postalcode", "N1 9GU"))
            .and(query_param("country", "United Kingdom"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let geocoder = NominatimGeocoder::new(&config(format!("{}/search", server.uri()))).unwrap();
        let loc = geocoder.locate("N1 9GU").await.unwrap();

        assert_eq!(loc, Location::new(51.5308, -0.1238));
    }

    #[tokio::test]
    async fn locate_surfaces_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let geocoder = NominatimGeocoder::new(&config(server.uri())).unwrap();
        let err = geocoder.locate("N1 9GU").await.unwrap_err();

        assert!(matches!(err, GeocodeError::Status(429)));
    }
}
