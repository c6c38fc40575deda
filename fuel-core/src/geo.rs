//! Great-circle distance and radius selection.

use crate::{
    error::QueryError,
    model::{Location, Station},
};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
pub fn distance_km(a: Location, b: Location) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push near-antipodal pairs just past 1.
    let h = h.min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Stations no further than `radius_km` from `center`, boundary inclusive,
/// in input order.
pub fn within_radius(
    stations: Vec<Station>,
    center: Location,
    radius_km: f64,
) -> Result<Vec<Station>, QueryError> {
    check_radius(radius_km)?;

    Ok(stations
        .into_iter()
        .filter(|s| distance_km(center, s.location) <= radius_km)
        .collect())
}

pub(crate) fn check_radius(radius_km: f64) -> Result<(), QueryError> {
    if radius_km.is_nan() || radius_km < 0.0 {
        return Err(QueryError::InvalidArgument(format!(
            "radius must be a non-negative number of kilometres, got {radius_km}"
        )));
    }
    Ok(())
}
