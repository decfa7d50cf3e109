use crate::data_models::DatasetSummary;
use chrono::NaiveDate;
use std::fmt::Write;

const DATE_FORMAT: &str = "%m/%d/%Y";

/// Share of the potential savings attributed to load shifting.
pub const LOAD_SHIFT_SHARE: f64 = 0.4;

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "-".repeat(title.len()));
}

/// Renders a plain-text audit report for a summary.
pub fn render_report(summary: &DatasetSummary, title: &str, generated_on: NaiveDate) -> String {
    let mut out = String::new();

    heading(&mut out, "ENERGY AUDIT REPORT");
    let _ = writeln!(out, "Report Title: {}", title);
    let _ = writeln!(out, "Generated On: {}", generated_on.format(DATE_FORMAT));
    let _ = writeln!(out, "Data Source: {}", summary.mode);
    out.push('\n');

    heading(&mut out, "EXECUTIVE SUMMARY");
    let _ = writeln!(
        out,
        "Facility consumption has been analyzed for the period {} to {}.",
        summary.start_date.format(DATE_FORMAT),
        summary.end_date.format(DATE_FORMAT)
    );
    let _ = writeln!(out, "Overall efficiency score: {}/100.", summary.efficiency_score);
    out.push('\n');

    heading(&mut out, "METRICS OVERVIEW");
    let _ = writeln!(out, "- Total Consumption: {:.2} kWh", summary.total_consumption);
    let _ = writeln!(out, "- Average Daily Load: {:.2} kWh", summary.avg_daily_consumption);
    let _ = writeln!(out, "- Estimated Operational Cost: {:.2}", summary.estimated_cost);
    let _ = writeln!(out, "- Potential Savings Opportunity: {:.2}", summary.potential_savings);
    let _ = writeln!(out, "- Peak Load Intensity: {}", summary.peak_load_intensity);
    out.push('\n');

    heading(&mut out, "CATEGORY LOADS");
    let totals = &summary.category_totals;
    let _ = writeln!(out, "- HVAC Load: {:.2} kWh", totals.hvac);
    let _ = writeln!(out, "- Lighting Load: {:.2} kWh", totals.lighting);
    let _ = writeln!(out, "- Appliances Load: {:.2} kWh", totals.appliances);
    let _ = writeln!(out, "- Electronics Load: {:.2} kWh", totals.electronics);
    out.push('\n');

    heading(&mut out, "FINDINGS & RECOMMENDATIONS");
    let _ = writeln!(
        out,
        "1. Peak consumption of {:.2} kWh recorded on {}.",
        summary.peak_consumption.value,
        summary.peak_consumption.date.format(DATE_FORMAT)
    );
    let _ = writeln!(
        out,
        "2. Anomalies identified: {} significant deviations.",
        summary.anomalies.len()
    );
    for anomaly in &summary.anomalies {
        let _ = writeln!(out, "   - {}: {}", anomaly.date, anomaly.description);
    }
    let _ = write!(
        out,
        "3. Recommendation: shift high-draw loads out of peak hours to cut costs by about {:.0}.",
        (summary.potential_savings * LOAD_SHIFT_SHARE).round()
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::{DataSourceMode, EnergyRecord};
    use crate::summary::summarize;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_report_sections_and_figures() {
        let records = vec![
            EnergyRecord {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(),
                hvac: 40.0,
                lighting: 20.0,
                appliances: 25.0,
                electronics: 15.0,
                total: 100.0,
            },
            EnergyRecord {
                timestamp: Utc.with_ymd_and_hms(2024, 2, 15, 8, 0, 0).unwrap(),
                hvac: 120.0,
                lighting: 60.0,
                appliances: 75.0,
                electronics: 45.0,
                total: 300.0,
            },
        ];
        let summary = summarize(&records, DataSourceMode::Static).unwrap();
        let report = render_report(&summary, "Quarterly", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        for section in ["EXECUTIVE SUMMARY", "METRICS OVERVIEW", "CATEGORY LOADS", "FINDINGS & RECOMMENDATIONS"] {
            assert!(report.contains(section), "missing {}", section);
        }
        assert!(report.contains("Generated On: 03/01/2024"));
        assert!(report.contains("period 01/15/2024 to 02/15/2024"));
        assert!(report.contains("- Total Consumption: 400.00 kWh"));
        assert!(report.contains("- HVAC Load: 160.00 kWh"));
        assert!(report.contains("Peak consumption of 300.00 kWh recorded on 02/15/2024"));
        assert!(report.contains("Anomalies identified: 0"));

        let expected = format!("by about {:.0}.", (summary.potential_savings * 0.4).round());
        assert!(report.ends_with(&expected));
    }
}
