//! Error taxonomy for the fuel price pipeline.
//!
//! `FetchError`, `DecodeError` and `FeedError` are scoped to a single feed and
//! are absorbed by the aggregator. `QueryError` is what a whole query can fail
//! with.

/// Network-level failure while retrieving one feed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("HTTP error calling {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Http { url: url.to_string(), source: err }
        }
    }
}

/// A feed body that could not be turned into canonical stations.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed feed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {field} for site '{site_id}': {value}")]
    InvalidField {
        field: &'static str,
        site_id: String,
        value: String,
    },
}

impl DecodeError {
    /// Name of the offending field, if the failure is field-specific.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DecodeError::InvalidField { field, .. } => Some(field),
            DecodeError::Json(_) => None,
        }
    }
}

/// Failure of one feed source, either fetching or decoding.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Local cache storage failure. Never propagated past the fetcher.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Postcode lookup failure.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder responded with status {0}")]
    Status(u16),

    #[error("could not parse geocoder response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no location found for postcode '{postcode}'")]
    NotFound { postcode: String },

    #[error("geocoder returned an unreadable coordinate: {0}")]
    InvalidCoordinate(String),
}

/// Errors that abort a whole query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}
