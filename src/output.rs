use crate::types::{RiskReport, YearlyAnomaly};
use crate::util::format_number;
use serde::Serialize;
use std::error::Error;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Interpretation paragraph shown under the metric block, mirroring the
/// figures already rendered above it.
pub fn narrative(report: &RiskReport) -> String {
    format!(
        "The country {} has warmed {}°C since the baseline (1850–1900). \
The warming rate is approximately {}°C per decade. \
If current trends continue, the projected anomaly in 2050 could reach {}°C. \
This corresponds to a {} risk level, indicating potential stress on \
infrastructure, agriculture, and population wellbeing.",
        report.country,
        format_number(report.current_anomaly, 2),
        format_number(report.warming_rate_decade, 2),
        format_number(report.predicted_2050, 2),
        report.risk_level.as_str()
    )
}

/// Last `max_rows` series points, oldest first, for the console preview.
pub fn series_tail(series: &[YearlyAnomaly], max_rows: usize) -> &[YearlyAnomaly] {
    &series[series.len().saturating_sub(max_rows)..]
}
