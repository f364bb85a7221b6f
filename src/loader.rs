use crate::types::{RawTemperatureRow, TempReading};
use crate::util::{parse_date_safe, parse_f64_safe};
use chrono::Datelike;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead};
use thiserror::Error;

/// Earliest year retained from the temperature table; earlier records are
/// too sparse to aggregate and predate the baseline window.
pub const MIN_YEAR: i32 = 1850;

/// World Bank indicator exports carry four metadata lines before the header.
const INDICATOR_PREAMBLE_LINES: usize = 4;

const COUNTRY_NAME_COLUMN: &str = "Country Name";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub parse_errors: usize,
    pub pre_1850_rows: usize,
}

/// Load and clean the long-format temperature table.
///
/// Rows with an unparsable date or a missing temperature are dropped and
/// counted as parse errors; rows before [`MIN_YEAR`] are dropped and counted
/// separately.
pub fn load_temperatures(path: &str) -> Result<(Vec<TempReading>, LoadReport), LoadError> {
    let file = File::open(path)?;
    read_temperatures(file)
}

pub fn read_temperatures<R: io::Read>(reader: R) -> Result<(Vec<TempReading>, LoadReport), LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut pre_1850_rows = 0usize;
    let mut readings: Vec<TempReading> = Vec::new();

    for result in rdr.deserialize::<RawTemperatureRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };

        let country = match row.country.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => {
                parse_errors += 1;
                continue;
            }
        };
        let date = match parse_date_safe(row.dt.as_deref()) {
            Some(d) => d,
            None => {
                parse_errors += 1;
                continue;
            }
        };
        let temperature = match parse_f64_safe(row.average_temperature.as_deref()) {
            Some(t) => t,
            None => {
                parse_errors += 1;
                continue;
            }
        };

        let year = date.year();
        if year < MIN_YEAR {
            pre_1850_rows += 1;
            continue;
        }

        readings.push(TempReading {
            country,
            year,
            temperature,
        });
    }

    let report = LoadReport {
        total_rows,
        kept_rows: readings.len(),
        parse_errors,
        pre_1850_rows,
    };
    Ok((readings, report))
}

/// Country-keyed values of one indicator for the reference year, with the
/// extremes needed for score normalization.
#[derive(Debug, Clone)]
pub struct IndicatorTable {
    pub values: HashMap<String, f64>,
    pub min: f64,
    pub max: f64,
}

impl IndicatorTable {
    pub fn from_pairs<I>(pairs: I) -> IndicatorTable
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let values: HashMap<String, f64> = pairs.into_iter().collect();
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for v in values.values() {
            min = min.min(*v);
            max = max.max(*v);
        }
        if values.is_empty() {
            min = 0.0;
            max = 0.0;
        }
        IndicatorTable { values, min, max }
    }

    pub fn get(&self, country: &str) -> Option<f64> {
        self.values.get(country).copied()
    }
}

/// Load a wide-format World Bank indicator table, keeping only the
/// reference-year column. Non-numeric cells are dropped as normal filtering.
pub fn load_indicator(path: &str, year: &str) -> Result<IndicatorTable, LoadError> {
    let file = File::open(path)?;
    read_indicator(file, year, path)
}

pub fn read_indicator<R: io::Read>(
    reader: R,
    year: &str,
    table: &str,
) -> Result<IndicatorTable, LoadError> {
    let mut buf = io::BufReader::new(reader);
    let mut line = String::new();
    for _ in 0..INDICATOR_PREAMBLE_LINES {
        line.clear();
        if buf.read_line(&mut line)? == 0 {
            break;
        }
    }

    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(buf);
    let headers = rdr.headers()?.clone();
    let name_idx = headers
        .iter()
        .position(|h| h == COUNTRY_NAME_COLUMN)
        .ok_or_else(|| LoadError::MissingColumn {
            table: table.to_string(),
            column: COUNTRY_NAME_COLUMN.to_string(),
        })?;
    let year_idx = headers
        .iter()
        .position(|h| h == year)
        .ok_or_else(|| LoadError::MissingColumn {
            table: table.to_string(),
            column: year.to_string(),
        })?;

    let mut pairs: Vec<(String, f64)> = Vec::new();
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(_) => continue,
        };
        let country = match record.get(name_idx).map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => continue,
        };
        let value = match parse_f64_safe(record.get(year_idx)) {
            Some(v) => v,
            None => continue,
        };
        pairs.push((country, value));
    }

    Ok(IndicatorTable::from_pairs(pairs))
}

/// Read-only context holding all three validated tables. Loaded once by the
/// presentation layer and passed by reference into every analysis call.
#[derive(Debug, Clone)]
pub struct ClimateDataset {
    pub temperatures: Vec<TempReading>,
    pub population: IndicatorTable,
    pub gdp: IndicatorTable,
}

impl ClimateDataset {
    pub fn load(
        temp_path: &str,
        pop_path: &str,
        gdp_path: &str,
        reference_year: &str,
    ) -> Result<(ClimateDataset, LoadReport), LoadError> {
        let (temperatures, report) = load_temperatures(temp_path)?;
        let population = load_indicator(pop_path, reference_year)?;
        let gdp = load_indicator(gdp_path, reference_year)?;
        Ok((
            ClimateDataset {
                temperatures,
                population,
                gdp,
            },
            report,
        ))
    }

    /// Sorted, deduplicated country names present in the temperature table.
    pub fn country_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .temperatures
            .iter()
            .map(|r| r.country.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
