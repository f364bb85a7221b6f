// Entry point and high-level CLI flow.
//
// - Option [1] loads and validates the three CSV sources, printing
//   diagnostics.
// - Option [2] lists the country names available in the temperature table.
// - Option [3] runs the risk analysis for one country and renders the
//   anomaly series, the scalar metrics, and the interpretation text, then
//   exports the series as CSV and the full report as JSON.
// - After an analysis, the user can choose to go back to the selection menu
//   or exit.
mod analysis;
mod loader;
mod output;
mod types;
mod util;

use loader::ClimateDataset;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use types::{AnomalyPreviewRow, RiskReport};

const TEMPERATURE_CSV: &str = "GlobalLandTemperaturesByCountry.csv";
const POPULATION_CSV: &str = "API_SP.POP.TOTL_DS2_en_csv_v2_40826.csv";
const GDP_CSV: &str = "API_NY.GDP.PCAP.CD_DS2_en_csv_v2_31.csv";

// Reference-year column shared by both indicator tables.
const REFERENCE_YEAR: &str = "2022";

const SERIES_EXPORT: &str = "report_anomaly_series.csv";
const SUMMARY_EXPORT: &str = "risk_summary.json";
const PREVIEW_ROWS: usize = 10;

// Simple in-memory app state so we only load/validate the CSVs once but can
// analyze any number of countries in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<ClimateDataset>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_country_name() -> String {
    print!("Enter country name: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the selection menu after an analysis.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load and validate the three CSV sources.
///
/// On success, we store the `ClimateDataset` in `APP_STATE` and print a
/// short textual summary of what happened.
fn handle_load() {
    match ClimateDataset::load(TEMPERATURE_CSV, POPULATION_CSV, GDP_CSV, REFERENCE_YEAR) {
        Ok((data, load_report)) => {
            println!(
                "Processing temperature dataset... ({} rows loaded, {} kept from 1850 onward)",
                util::format_int(load_report.total_rows as i64),
                util::format_int(load_report.kept_rows as i64)
            );
            println!(
                "Note: {} rows skipped due to parse/validation errors, {} rows predate 1850.",
                util::format_int(load_report.parse_errors as i64),
                util::format_int(load_report.pre_1850_rows as i64)
            );
            println!(
                "Indicator tables ({}): {} population rows, {} GDP rows.",
                REFERENCE_YEAR,
                util::format_int(data.population.values.len() as i64),
                util::format_int(data.gdp.values.len() as i64)
            );
            println!("");
            let mut state = APP_STATE.lock().unwrap();
            state.data = Some(data);
        }
        Err(e) => {
            eprintln!("Failed to load data: {}\n", e);
        }
    }
}

/// Handle option [2]: list the countries available for analysis.
fn handle_list_countries() {
    let state = APP_STATE.lock().unwrap();
    let Some(data) = state.data.as_ref() else {
        println!("Error: No data loaded. Please load the datasets first (option 1).\n");
        return;
    };
    let names = data.country_names();
    println!(
        "{} countries available:",
        util::format_int(names.len() as i64)
    );
    for chunk in names.chunks(4) {
        println!("  {}", chunk.join(", "));
    }
    println!("");
}

/// Handle option [3]: run the analysis for one country and render the report.
fn handle_analyze() {
    let country = read_country_name();
    if country.is_empty() {
        println!("No country name given.\n");
        return;
    }

    let state = APP_STATE.lock().unwrap();
    let Some(data) = state.data.as_ref() else {
        println!("Error: No data loaded. Please load the datasets first (option 1).\n");
        return;
    };

    match analysis::analyze_country(data, &country) {
        Ok(report) => render_report(&report),
        Err(analysis::AnalysisError::NotFound { .. }) => {
            println!("No data available for this country.\n");
        }
        Err(e) => {
            println!("Cannot analyze {}: {}\n", country, e);
        }
    }
}

fn render_report(report: &RiskReport) {
    println!("\nHistorical Temperature Anomaly");
    println!("(Last {} qualifying years shown)\n", PREVIEW_ROWS);
    let preview: Vec<AnomalyPreviewRow> = output::series_tail(&report.yearly, PREVIEW_ROWS)
        .iter()
        .map(|p| AnomalyPreviewRow {
            year: p.year,
            yearly_avg_temperature: util::format_number(p.yearly_avg_temperature, 2),
            temperature_anomaly: util::format_number(p.temperature_anomaly, 2),
        })
        .collect();
    output::preview_table_rows(&preview, PREVIEW_ROWS);

    println!("Projection to 2050");
    println!(
        "Predicted 2050 Anomaly: {} °C",
        util::format_number(report.predicted_2050, 2)
    );
    println!(
        "Warming Rate per Decade: {} °C/decade",
        util::format_number(report.warming_rate_decade, 2)
    );
    println!("R² of Trend: {}\n", util::format_number(report.r_squared, 2));

    println!("Climate Risk Assessment");
    println!("Hazard Score: {}", util::format_number(report.hazard_score, 2));
    println!(
        "Exposure Score: {}",
        util::format_number(report.exposure_score, 2)
    );
    println!(
        "Vulnerability Score: {}",
        util::format_number(report.vulnerability_score, 2)
    );
    println!(
        "Final Risk Score: {}",
        util::format_number(report.final_risk, 2)
    );
    println!("Risk Level: {}\n", report.risk_level.as_str());

    println!("{}\n", output::narrative(report));

    if let Err(e) = output::write_csv(SERIES_EXPORT, &report.yearly) {
        eprintln!("Write error: {}", e);
    }
    if let Err(e) = output::write_json(SUMMARY_EXPORT, report) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "(Full series exported to {}, report exported to {})\n",
        SERIES_EXPORT, SUMMARY_EXPORT
    );
}

fn main() {
    loop {
        println!("Climate Trend & Risk Report");
        println!("[1] Load the datasets");
        println!("[2] List available countries");
        println!("[3] Analyze a country\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                handle_list_countries();
            }
            "3" => {
                handle_analyze();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2, or 3.\n");
            }
        }
    }
}
