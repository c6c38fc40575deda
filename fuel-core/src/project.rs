//! Expansion of stations into per-fuel priced records.

use chrono::{DateTime, Utc};

use crate::model::{PricedRecord, Station};

/// Priced records for `fuel_type` (or every fuel when empty), stamped now.
pub fn project(stations: &[Station], fuel_type: &str) -> Vec<PricedRecord> {
    project_at(stations, fuel_type, Utc::now())
}

/// Like [`project`], with an explicit query time.
///
/// `recorded_at` is the feed's own `last_updated` when one was readable and
/// `now` otherwise. Station order is preserved; within a station, records
/// follow fuel code order.
pub fn project_at(stations: &[Station], fuel_type: &str, now: DateTime<Utc>) -> Vec<PricedRecord> {
    let mut records = Vec::new();

    for station in stations {
        let recorded_at = station.updated_at.unwrap_or(now);

        if fuel_type.is_empty() {
            let mut codes: Vec<&String> = station.prices.keys().collect();
            codes.sort();
            for code in codes {
                records.push(record(station, code, station.prices[code], recorded_at));
            }
        } else if let Some(&price) = station.prices.get(fuel_type) {
            records.push(record(station, fuel_type, price, recorded_at));
        }
    }

    records
}

fn record(station: &Station, code: &str, price: f64, recorded_at: DateTime<Utc>) -> PricedRecord {
    PricedRecord {
        site_id: station.site_id.clone(),
        brand: station.brand.clone(),
        postcode: station.postcode.clone(),
        fuel_type_code: code.to_string(),
        price,
        recorded_at,
        month_year: recorded_at.format("%m/%Y").to_string(),
    }
}

/// Narrow records to one station: exact site ID, or a case-insensitive brand
/// or postcode fragment (postcode spacing ignored). Empty needle keeps all.
pub fn filter_by_station(records: Vec<PricedRecord>, needle: &str) -> Vec<PricedRecord> {
    let needle = needle.trim();
    if needle.is_empty() {
        return records;
    }

    let lowered = needle.to_lowercase();
    let compact = compact_postcode(needle);

    records
        .into_iter()
        .filter(|r| {
            r.site_id == needle
                || r.brand.to_lowercase().contains(&lowered)
                || (!compact.is_empty() && compact_postcode(&r.postcode).contains(&compact))
        })
        .collect()
}

fn compact_postcode(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).unwrap()
    }

    fn station(id: &str, brand: &str, postcode: &str, prices: &[(&str, f64)]) -> Station {
        Station {
            site_id: id.to_string(),
            brand: brand.to_string(),
            postcode: postcode.to_string(),
            prices: prices.iter().map(|(k, v)| (k.to_string(), *v)).collect::<HashMap<_, _>>(),
            ..Default::default()
        }
    }

    fn sample() -> Vec<Station> {
        vec![
            station("1", "ESSO", "SW1A 1AA", &[("E10", 139.9), ("B7", 149.9)]),
            station("2", "JET", "N1 9GU", &[("B7", 151.9)]),
            station("3", "Sainsbury's", "E14 5AB", &[("E10", 137.9), ("E5", 152.9), ("B7", 148.9)]),
        ]
    }

    #[test]
    fn empty_code_emits_every_price() {
        let records = project_at(&sample(), "", now());

        assert_eq!(records.len(), 6);
        let pairs: Vec<_> = records
            .iter()
            .map(|r| (r.site_id.as_str(), r.fuel_type_code.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [("1", "B7"), ("1", "E10"), ("2", "B7"), ("3", "B7"), ("3", "E10"), ("3", "E5")]
        );
    }

    #[test]
    fn specific_code_keeps_only_stations_selling_it() {
        let records = project_at(&sample(), "E10", now());

        let ids: Vec<_> = records.iter().map(|r| r.site_id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
        assert_eq!(records[0].price, 139.9);
        assert_eq!(records[1].price, 137.9);
        assert!(records.iter().all(|r| r.fuel_type_code == "E10"));
    }

    #[test]
    fn code_match_is_exact() {
        assert!(project_at(&sample(), "e10", now()).is_empty());
    }

    #[test]
    fn no_match_is_empty_not_error() {
        assert!(project_at(&sample(), "LPG", now()).is_empty());
        assert!(project_at(&[], "", now()).is_empty());
    }

    #[test]
    fn falls_back_to_query_time() {
        let records = project_at(&sample(), "B7", now());
        assert!(records.iter().all(|r| r.recorded_at == now()));
        assert_eq!(records[0].month_year, "10/2026");
        assert_eq!(records[0].brand, "ESSO");
        assert_eq!(records[0].postcode, "SW1A 1AA");
    }

    #[test]
    fn vendor_timestamp_is_carried_through() {
        let mut stations = sample();
        let published = Utc.with_ymd_and_hms(2026, 9, 30, 23, 0, 0).unwrap();
        stations[1].updated_at = Some(published);

        let records = project_at(&stations, "B7", now());

        assert_eq!(records[0].recorded_at, now());
        assert_eq!(records[1].recorded_at, published);
        assert_eq!(records[1].month_year, "09/2026");
    }

    #[test]
    fn station_filter_matches_id_brand_or_postcode() {
        let records = project_at(&sample(), "B7", now());

        let by_id = filter_by_station(records.clone(), "2");
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].brand, "JET");

        let by_brand = filter_by_station(records.clone(), "sainsbury");
        assert_eq!(by_brand.len(), 1);
        assert_eq!(by_brand[0].site_id, "3");

        let by_postcode = filter_by_station(records.clone(), "sw1a1aa");
        assert_eq!(by_postcode.len(), 1);
        assert_eq!(by_postcode[0].site_id, "1");

        assert_eq!(filter_by_station(records.clone(), "  ").len(), 3);
        assert!(filter_by_station(records, "Texaco").is_empty());
    }
}
