//! Module for record validation logic.

use crate::data_models::EnergyRecord;
use log::debug;

/// Clamps a parsed magnitude into the non-negative range a reading may take.
pub fn sanitize_magnitude(field: &str, value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        debug!("Clamping {} value {} to 0", field, value);
        0.0
    }
}

/// Checks the invariants every normalized record must hold.
///
/// Returns Ok(()) if valid, otherwise Err(String) with the violated rule.
pub fn validate_record(record: &EnergyRecord) -> Result<(), String> {
    let fields = [
        ("hvac", record.hvac),
        ("lighting", record.lighting),
        ("appliances", record.appliances),
        ("electronics", record.electronics),
        ("total", record.total),
    ];
    for (name, value) in fields {
        if !value.is_finite() {
            return Err(format!("Validation Error: {} is not finite ({})", name, value));
        }
        if value < 0.0 {
            return Err(format!("Validation Error: {} is negative ({})", name, value));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_sanitize_magnitude() {
        assert_eq!(sanitize_magnitude("hvac", 3.5), 3.5);
        assert_eq!(sanitize_magnitude("hvac", 0.0), 0.0);
        assert_eq!(sanitize_magnitude("hvac", -1.0), 0.0);
        assert_eq!(sanitize_magnitude("hvac", f64::INFINITY), 0.0);
    }

    #[test]
    fn test_validate_record_rejects_negative_total() {
        let mut record = EnergyRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            hvac: 0.0,
            lighting: 0.0,
            appliances: 0.0,
            electronics: 0.0,
            total: 0.0,
        };
        assert!(validate_record(&record).is_ok());
        record.total = -2.0;
        let err = validate_record(&record).unwrap_err();
        assert!(err.contains("total"));
    }
}
