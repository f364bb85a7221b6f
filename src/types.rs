use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Deserialize)]
pub struct RawTemperatureRow {
    #[serde(rename = "Country")]
    pub country: Option<String>,
    #[serde(rename = "dt")]
    pub dt: Option<String>,
    #[serde(rename = "AverageTemperature")]
    pub average_temperature: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TempReading {
    pub country: String,
    pub year: i32,
    pub temperature: f64,
}

/// One retained year of the per-country series, after month-coverage
/// filtering and baseline subtraction.
#[derive(Debug, Clone, Serialize)]
pub struct YearlyAnomaly {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "YearlyAvgTemperature")]
    pub yearly_avg_temperature: f64,
    #[serde(rename = "TemperatureAnomaly")]
    pub temperature_anomaly: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct TrendFit {
    pub slope_per_year: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Critical,
    High,
    Moderate,
    Low,
}

impl RiskLevel {
    /// Thresholds are inclusive lower bounds, checked in descending order.
    pub fn from_score(final_risk: f64) -> RiskLevel {
        if final_risk >= 80.0 {
            RiskLevel::Critical
        } else if final_risk >= 60.0 {
            RiskLevel::High
        } else if final_risk >= 30.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub country: String,
    #[serde(rename = "yearly_data")]
    pub yearly: Vec<YearlyAnomaly>,
    pub current_anomaly: f64,
    pub warming_rate_decade: f64,
    pub predicted_2050: f64,
    pub r_squared: f64,
    pub hazard_score: f64,
    pub exposure_score: f64,
    pub vulnerability_score: f64,
    pub final_risk: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Tabled)]
pub struct AnomalyPreviewRow {
    #[tabled(rename = "Year")]
    pub year: i32,
    #[tabled(rename = "YearlyAvgTemperature")]
    pub yearly_avg_temperature: String,
    #[tabled(rename = "TemperatureAnomaly")]
    pub temperature_anomaly: String,
}
