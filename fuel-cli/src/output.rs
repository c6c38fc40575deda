//! Rendering of priced records for the terminal.

use fuel_core::{FuelQuery, PricedRecord};

const HEADERS: [&str; 6] = ["Site ID", "Brand", "Postcode", "Fuel Type", "Price", "Recorded At"];

/// Left-aligned table with a header rule, one row per record.
pub fn render_table(records: &[PricedRecord]) -> String {
    let rows: Vec<[String; 6]> = records
        .iter()
        .map(|r| {
            [
                r.site_id.clone(),
                r.brand.clone(),
                r.postcode.clone(),
                r.fuel_type_code.clone(),
                format!("{:.1}", r.price),
                r.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS[..], &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, rule.as_slice(), &widths);
    for row in &rows {
        push_row(&mut out, &row[..], &widths);
    }
    out
}

fn push_row<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize; 6]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{:<w$}", cell.as_ref(), w = *w))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

pub fn render_json(records: &[PricedRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

pub fn no_results(query: &FuelQuery) -> String {
    let fuel = if query.fuel_type.is_empty() { "fuel" } else { query.fuel_type.as_str() };
    format!("No stations selling {fuel} within {} km of {}.", query.radius_km, query.postcode)
}
