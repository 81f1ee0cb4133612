use crate::domain::model::{RemainingWorkResponse, ReportingInfoResponse};
use crate::utils::error::{Result, WorkerlyError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ReportFormat {
    type Err = WorkerlyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(WorkerlyError::InvalidConfigValueError {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "Supported formats: json, csv".to_string(),
            }),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Csv => write!(f, "csv"),
        }
    }
}

const REMAINING_WORK_COLUMNS: &[&str] = &[
    "team",
    "functionality",
    "requirements",
    "release_finalization",
    "technical",
    "other",
    "total",
];
const REPORTING_INFO_COLUMNS: &[&str] = &["team", "total"];

#[derive(Serialize)]
struct RemainingWorkRow<'a> {
    team: &'a str,
    functionality: f64,
    requirements: f64,
    release_finalization: f64,
    technical: f64,
    other: f64,
    total: f64,
}

#[derive(Serialize)]
struct ReportingInfoRow<'a> {
    team: &'a str,
    total: f64,
}

/// The header row is always written, so an empty report still names its columns.
fn write_csv<T: Serialize>(columns: &[&str], rows: impl IntoIterator<Item = T>) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }

    let data = writer.into_inner().map_err(|e| WorkerlyError::ProcessingError {
        message: format!("Failed to flush CSV output: {}", e),
    })?;
    String::from_utf8(data).map_err(|e| WorkerlyError::ProcessingError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

pub fn render_remaining_work(report: &RemainingWorkResponse, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Csv => write_csv(REMAINING_WORK_COLUMNS, report.report.iter().map(|item| {
            let work = &item.remaining_work;
            RemainingWorkRow {
                team: &item.team,
                functionality: work.functionality,
                requirements: work.requirements,
                release_finalization: work.release_finalization,
                technical: work.technical,
                other: work.other,
                total: work.total(),
            }
        })),
    }
}

pub fn render_reporting_info(report: &ReportingInfoResponse, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Csv => write_csv(REPORTING_INFO_COLUMNS, report.items.iter().map(|item| ReportingInfoRow {
            team: &item.team,
            total: item.total,
        })),
    }
}
