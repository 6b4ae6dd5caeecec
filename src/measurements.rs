// Measurement post-processing: the service reports lengths in centimeters
// and weight in kilograms; every numeric entry is rewritten as a two-unit
// record before it is saved next to the subject's descriptor.

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

/// Output file written into the subject directory.
pub const MEASUREMENTS_FILE: &str = "measurements.json";

const KG_TO_LBS: f64 = 2.20462;
const CM_PER_INCH: f64 = 2.54;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a raw measurement map into its two-unit form. An entry named
/// "weight" (case-insensitive) becomes `{kg, lbs}`, every other numeric
/// entry becomes `{cm, in}`; non-numeric values pass through unchanged.
/// All numbers are rounded to two decimals.
pub fn convert_measurements(raw: &Map<String, Value>) -> Map<String, Value> {
    let mut converted = Map::new();
    for (name, value) in raw {
        let entry = match value.as_f64() {
            Some(v) if name.eq_ignore_ascii_case("weight") => json!({
                "kg": round2(v),
                "lbs": round2(v * KG_TO_LBS),
            }),
            Some(v) => json!({
                "cm": round2(v),
                "in": round2(v / CM_PER_INCH),
            }),
            None => value.clone(),
        };
        converted.insert(name.clone(), entry);
    }
    converted
}

/// Write a converted measurement map as pretty-printed JSON.
pub fn write_measurements(path: &Path, measurements: &Map<String, Value>) -> Result<()> {
    let json = serde_json::to_string_pretty(measurements).context("Serializing measurements")?;
    fs::write(path, json).with_context(|| format!("Writing {}", path.display()))?;
    Ok(())
}
