use crate::loader::ClimateDataset;
use crate::types::{RiskLevel, RiskReport, TempReading, TrendFit, YearlyAnomaly};
use crate::util::{average, linear_regression};
use std::collections::BTreeMap;
use thiserror::Error;

// Baseline window for the pre-industrial reference temperature.
pub const BASELINE_START_YEAR: i32 = 1850;
pub const BASELINE_END_YEAR: i32 = 1900;

// The modern trend is fitted from this year onward, with the regression
// x-axis shifted so that x = year - TREND_START_YEAR.
pub const TREND_START_YEAR: i32 = 1950;
pub const PROJECTION_YEAR: i32 = 2050;

/// A year only qualifies for the series with at least this many monthly
/// records, so partially covered years cannot skew the yearly mean.
pub const MIN_RECORDS_PER_YEAR: usize = 10;

// Hazard sub-score saturation points: the anomaly term maxes out at 2.0 °C
// above baseline, the trend term at 0.3 °C per decade.
const ANOMALY_SATURATION: f64 = 2.0;
const SLOPE_SATURATION_PER_DECADE: f64 = 0.3;

const HAZARD_WEIGHT: f64 = 0.5;
const EXPOSURE_WEIGHT: f64 = 0.3;
const VULNERABILITY_WEIGHT: f64 = 0.2;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no data available for country '{country}'")]
    NotFound { country: String },
    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },
}

/// Run the full risk pipeline for one country against the shared dataset.
///
/// The pipeline is a linear chain of pure transforms: clean readings are
/// aggregated per year, turned into an anomaly series against the 1850-1900
/// baseline, fitted for the modern trend, and combined with the economic
/// indicators into the classified report. Each call is independent and
/// touches the dataset read-only.
pub fn analyze_country(
    dataset: &ClimateDataset,
    country: &str,
) -> Result<RiskReport, AnalysisError> {
    let readings: Vec<&TempReading> = dataset
        .temperatures
        .iter()
        .filter(|r| r.country == country)
        .collect();
    if readings.is_empty() {
        return Err(AnalysisError::NotFound {
            country: country.to_string(),
        });
    }

    let yearly = aggregate_years(&readings);

    let baseline_values: Vec<f64> = yearly
        .iter()
        .filter(|(year, _)| (BASELINE_START_YEAR..=BASELINE_END_YEAR).contains(year))
        .map(|(_, temp)| *temp)
        .collect();
    if baseline_values.is_empty() {
        return Err(AnalysisError::InsufficientData {
            reason: format!(
                "no qualifying years in the {BASELINE_START_YEAR}-{BASELINE_END_YEAR} baseline window"
            ),
        });
    }
    let baseline = average(&baseline_values);

    let series: Vec<YearlyAnomaly> = yearly
        .iter()
        .map(|(year, temp)| YearlyAnomaly {
            year: *year,
            yearly_avg_temperature: *temp,
            temperature_anomaly: temp - baseline,
        })
        .collect();

    let trend = fit_modern_trend(&series)?;
    let warming_rate_decade = trend.slope_per_year * 10.0;
    let predicted_2050 =
        trend.intercept + trend.slope_per_year * (PROJECTION_YEAR - TREND_START_YEAR) as f64;
    let current_anomaly = match series.last() {
        Some(point) => point.temperature_anomaly,
        None => {
            return Err(AnalysisError::InsufficientData {
                reason: "empty yearly series".to_string(),
            })
        }
    };

    // Hazard terms are capped from above only; a cooling trend is allowed to
    // contribute negatively.
    let anomaly_score = (current_anomaly / ANOMALY_SATURATION).min(1.0) * 40.0;
    let slope_score = (warming_rate_decade / SLOPE_SATURATION_PER_DECADE).min(1.0) * 40.0;
    let confidence_score = trend.r_squared * 20.0;
    let hazard_score = anomaly_score + slope_score + confidence_score;

    let population = dataset
        .population
        .get(country)
        .ok_or_else(|| AnalysisError::NotFound {
            country: country.to_string(),
        })?;
    let gdp = dataset.gdp.get(country).ok_or_else(|| AnalysisError::NotFound {
        country: country.to_string(),
    })?;

    let exposure_score = (population / dataset.population.max) * 100.0;
    let gdp_range = dataset.gdp.max - dataset.gdp.min;
    let gdp_normalized = if gdp_range.abs() < f64::EPSILON {
        0.0
    } else {
        (gdp - dataset.gdp.min) / gdp_range
    };
    let vulnerability_score = (1.0 - gdp_normalized) * 100.0;

    let final_risk = hazard_score * HAZARD_WEIGHT
        + exposure_score * EXPOSURE_WEIGHT
        + vulnerability_score * VULNERABILITY_WEIGHT;
    let risk_level = RiskLevel::from_score(final_risk);

    Ok(RiskReport {
        country: country.to_string(),
        yearly: series,
        current_anomaly,
        warming_rate_decade,
        predicted_2050,
        r_squared: trend.r_squared,
        hazard_score,
        exposure_score,
        vulnerability_score,
        final_risk,
        risk_level,
    })
}

/// Group readings by year and keep the arithmetic mean of every year with
/// enough monthly coverage, ascending by year.
fn aggregate_years(readings: &[&TempReading]) -> Vec<(i32, f64)> {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for r in readings {
        by_year.entry(r.year).or_default().push(r.temperature);
    }
    by_year
        .into_iter()
        .filter(|(_, temps)| temps.len() >= MIN_RECORDS_PER_YEAR)
        .map(|(year, temps)| (year, average(&temps)))
        .collect()
}

fn fit_modern_trend(series: &[YearlyAnomaly]) -> Result<TrendFit, AnalysisError> {
    let modern: Vec<&YearlyAnomaly> = series
        .iter()
        .filter(|p| p.year >= TREND_START_YEAR)
        .collect();
    if modern.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            reason: format!(
                "fewer than 2 qualifying years from {TREND_START_YEAR} onward for the trend fit"
            ),
        });
    }
    let x: Vec<f64> = modern
        .iter()
        .map(|p| (p.year - TREND_START_YEAR) as f64)
        .collect();
    let y: Vec<f64> = modern.iter().map(|p| p.temperature_anomaly).collect();
    let fit = linear_regression(&x, &y).ok_or_else(|| AnalysisError::InsufficientData {
        reason: "degenerate regression input".to_string(),
    })?;
    Ok(TrendFit {
        slope_per_year: fit.slope,
        intercept: fit.intercept,
        r_squared: fit.r_value * fit.r_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::IndicatorTable;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    /// Twelve monthly readings for one year at the given temperature.
    fn full_year(country: &str, year: i32, temperature: f64) -> Vec<TempReading> {
        (0..12)
            .map(|_| TempReading {
                country: country.to_string(),
                year,
                temperature,
            })
            .collect()
    }

    fn indicator(pairs: &[(&str, f64)]) -> IndicatorTable {
        IndicatorTable::from_pairs(pairs.iter().map(|(c, v)| (c.to_string(), *v)))
    }

    /// Baseline years 1850-1900 at 10.0 °C, then 1950-2000 warming linearly
    /// from 10.0 to 11.0 °C (0.02 °C/year).
    fn synthetic_warming_dataset() -> ClimateDataset {
        let mut temps = Vec::new();
        for year in 1850..=1900 {
            temps.extend(full_year("Testland", year, 10.0));
        }
        for year in 1950..=2000 {
            temps.extend(full_year("Testland", year, 10.0 + 0.02 * (year - 1950) as f64));
        }
        ClimateDataset {
            temperatures: temps,
            population: indicator(&[("Testland", 500_000_000.0), ("Otherland", 100_000_000.0)]),
            gdp: indicator(&[("Testland", 1_000.0), ("Otherland", 60_000.0)]),
        }
    }

    #[test]
    fn yearly_mean_matches_arithmetic_mean() {
        let mut temps = Vec::new();
        for year in 1850..=1900 {
            temps.extend(full_year("Testland", year, 10.0));
        }
        // One modern year with a varied monthly profile.
        for t in [
            11.0, 11.5, 12.0, 12.5, 13.0, 13.5, 14.0, 14.5, 15.0, 15.5, 16.0, 16.5,
        ] {
            temps.push(TempReading {
                country: "Testland".to_string(),
                year: 1960,
                temperature: t,
            });
        }
        temps.extend(full_year("Testland", 1961, 12.0));
        let dataset = ClimateDataset {
            temperatures: temps,
            population: indicator(&[("Testland", 1.0)]),
            gdp: indicator(&[("Testland", 1.0)]),
        };
        let report = analyze_country(&dataset, "Testland").unwrap();
        let year_1960 = report.yearly.iter().find(|p| p.year == 1960).unwrap();
        assert!(close(year_1960.yearly_avg_temperature, 13.75, 1e-9));
    }

    #[test]
    fn baseline_ignores_years_outside_window() {
        let build = |temp_1920: f64| {
            let mut temps = Vec::new();
            for year in 1850..=1900 {
                temps.extend(full_year("Testland", year, 10.0));
            }
            temps.extend(full_year("Testland", 1920, temp_1920));
            for year in 1950..=1960 {
                temps.extend(full_year("Testland", year, 11.0));
            }
            ClimateDataset {
                temperatures: temps,
                population: indicator(&[("Testland", 1.0)]),
                gdp: indicator(&[("Testland", 1.0)]),
            }
        };
        let a = analyze_country(&build(12.0), "Testland").unwrap();
        let b = analyze_country(&build(25.0), "Testland").unwrap();
        // The 1850 anomaly is pinned to the baseline, which must not move.
        let anomaly_1850_a = a.yearly.iter().find(|p| p.year == 1850).unwrap();
        let anomaly_1850_b = b.yearly.iter().find(|p| p.year == 1850).unwrap();
        assert!(close(
            anomaly_1850_a.temperature_anomaly,
            anomaly_1850_b.temperature_anomaly,
            1e-12
        ));
        assert!(close(a.current_anomaly, b.current_anomaly, 1e-12));
    }

    #[test]
    fn series_length_counts_only_covered_years() {
        let mut temps = Vec::new();
        for year in 1850..=1900 {
            temps.extend(full_year("Testland", year, 10.0));
        }
        for year in 1950..=1959 {
            temps.extend(full_year("Testland", year, 11.0 + 0.1 * (year - 1950) as f64));
        }
        // Nine monthly records only: the year must be dropped.
        for _ in 0..9 {
            temps.push(TempReading {
                country: "Testland".to_string(),
                year: 1960,
                temperature: 30.0,
            });
        }
        let dataset = ClimateDataset {
            temperatures: temps,
            population: indicator(&[("Testland", 1.0)]),
            gdp: indicator(&[("Testland", 1.0)]),
        };
        let report = analyze_country(&dataset, "Testland").unwrap();
        assert_eq!(report.yearly.len(), 51 + 10);
        assert!(report.yearly.iter().all(|p| p.year != 1960));
    }

    #[test]
    fn flat_series_has_zero_slope_and_zero_confidence() {
        let mut temps = Vec::new();
        for year in 1850..=1900 {
            temps.extend(full_year("Testland", year, 10.0));
        }
        for year in 1950..=1970 {
            temps.extend(full_year("Testland", year, 8.0));
        }
        let dataset = ClimateDataset {
            temperatures: temps,
            population: indicator(&[("Testland", 1.0), ("Otherland", 100.0)]),
            gdp: indicator(&[("Testland", 50_000.0), ("Otherland", 500.0)]),
        };
        let report = analyze_country(&dataset, "Testland").unwrap();
        assert!(close(report.warming_rate_decade, 0.0, 1e-12));
        assert!(close(report.r_squared, 0.0, 1e-12));
        // Current anomaly is -2.0, so the anomaly term passes through the
        // upper cap untouched: hazard = -40.
        assert!(close(report.current_anomaly, -2.0, 1e-9));
        assert!(close(report.hazard_score, -40.0, 1e-9));
    }

    #[test]
    fn linear_series_has_unit_r_squared() {
        let report = analyze_country(&synthetic_warming_dataset(), "Testland").unwrap();
        assert!(close(report.r_squared, 1.0, 1e-9));
    }

    #[test]
    fn synthetic_country_end_to_end() {
        let report = analyze_country(&synthetic_warming_dataset(), "Testland").unwrap();
        assert!(close(report.current_anomaly, 1.0, 1e-9));
        assert!(close(report.warming_rate_decade, 0.2, 1e-9));
        assert!(close(report.predicted_2050, 2.0, 1e-9));
        // anomaly 20 + slope 26.67 + confidence 20
        assert!(close(report.hazard_score, 66.666_666_666_7, 1e-6));
        assert!(close(report.exposure_score, 100.0, 1e-9));
        assert!(close(report.vulnerability_score, 100.0, 1e-9));
        assert!(close(report.final_risk, 83.333_333_333_3, 1e-6));
        assert_eq!(report.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn scores_stay_within_their_bounds() {
        let report = analyze_country(&synthetic_warming_dataset(), "Testland").unwrap();
        assert!(report.exposure_score >= 0.0 && report.exposure_score <= 100.0);
        assert!(report.vulnerability_score >= 0.0 && report.vulnerability_score <= 100.0);
        // The three hazard terms are individually capped at 40/40/20.
        assert!(report.hazard_score <= 100.0);
    }

    #[test]
    fn unknown_country_is_not_found() {
        let err = analyze_country(&synthetic_warming_dataset(), "Nowhere").unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { .. }));
    }

    #[test]
    fn missing_economic_data_is_not_found() {
        let mut dataset = synthetic_warming_dataset();
        dataset.gdp = indicator(&[("Otherland", 60_000.0)]);
        let err = analyze_country(&dataset, "Testland").unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { .. }));
    }

    #[test]
    fn missing_baseline_window_is_insufficient_data() {
        let mut temps = Vec::new();
        for year in 1950..=1970 {
            temps.extend(full_year("Testland", year, 11.0));
        }
        let dataset = ClimateDataset {
            temperatures: temps,
            population: indicator(&[("Testland", 1.0)]),
            gdp: indicator(&[("Testland", 1.0)]),
        };
        let err = analyze_country(&dataset, "Testland").unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { .. }));
    }

    #[test]
    fn short_modern_series_is_insufficient_data() {
        let mut temps = Vec::new();
        for year in 1850..=1900 {
            temps.extend(full_year("Testland", year, 10.0));
        }
        temps.extend(full_year("Testland", 1955, 11.0));
        let dataset = ClimateDataset {
            temperatures: temps,
            population: indicator(&[("Testland", 1.0)]),
            gdp: indicator(&[("Testland", 1.0)]),
        };
        let err = analyze_country(&dataset, "Testland").unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { .. }));
    }
}
