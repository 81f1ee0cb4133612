//! Time reporting stored as an HTML table inside a rich-text work item field.
//!
//! Each row is `date | reporter | amount | comment`. Amounts are summed per
//! reporter and rolled up into teams.

use crate::core::teams::team_label;
use crate::domain::model::{ReportingInfoResponse, ReportingInfoResponseItem, TeamsDefinition};
use crate::domain::ports::WorkItemSource;
use crate::domain::work_item::field_names;
use crate::utils::error::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("valid row regex"));
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("valid cell regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));

const DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportingEntry {
    pub date: NaiveDate,
    pub reporter: String,
    pub amount: f64,
    pub comment: String,
}

fn cell_text(raw: &str) -> String {
    let text = TAG_RE.replace_all(raw, "");
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .replace('\u{00A0}', " ")
        .trim()
        .to_string()
}

/// Extracts reporting rows. Rows that are not four cells wide, are entirely
/// blank, or fail to parse are skipped.
pub fn parse_reporting_table(html: &str) -> Vec<ReportingEntry> {
    let sanitized = html.replace("&nbsp;", " ");
    let mut entries = Vec::new();

    for row in ROW_RE.captures_iter(&sanitized) {
        let cells: Vec<String> = CELL_RE
            .captures_iter(&row[1])
            .map(|cell| cell_text(&cell[1]))
            .collect();

        if cells.len() != 4 || cells.iter().all(|c| c.is_empty()) {
            continue;
        }

        let date = match NaiveDate::parse_from_str(&cells[0], DATE_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!("Skipping reporting row with invalid date '{}': {}", cells[0], e);
                continue;
            }
        };
        let amount = match cells[2].replace(',', ".").parse::<f64>() {
            Ok(amount) => amount,
            Err(e) => {
                tracing::warn!("Skipping reporting row with invalid amount '{}': {}", cells[2], e);
                continue;
            }
        };

        entries.push(ReportingEntry {
            date,
            reporter: cells[1].clone(),
            amount,
            comment: cells[3].clone(),
        });
    }

    entries
}

pub fn aggregate_by_team(entries: &[ReportingEntry], teams: &TeamsDefinition) -> ReportingInfoResponse {
    let mut by_reporter: HashMap<&str, f64> = HashMap::new();
    for entry in entries {
        *by_reporter.entry(entry.reporter.as_str()).or_default() += entry.amount;
    }

    let mut by_team: HashMap<String, f64> = HashMap::new();
    for (reporter, total) in by_reporter {
        *by_team
            .entry(team_label(teams.team_for(reporter), reporter))
            .or_default() += total;
    }

    let mut items: Vec<ReportingInfoResponseItem> = by_team
        .into_iter()
        .map(|(team, total)| ReportingInfoResponseItem { team, total })
        .collect();
    items.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.team.cmp(&b.team)));

    ReportingInfoResponse { items }
}

pub struct ReportingInfoEngine<W: WorkItemSource> {
    source: W,
    field_name: String,
}

impl<W: WorkItemSource> ReportingInfoEngine<W> {
    pub fn new(source: W) -> Self {
        Self {
            source,
            field_name: field_names::DEFAULT_REPORTING_INFO.to_string(),
        }
    }

    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    pub async fn compute(
        &self,
        work_item_id: i64,
        teams: &TeamsDefinition,
    ) -> Result<Option<ReportingInfoResponse>> {
        let Some(work_item) = self
            .source
            .get_work_item(work_item_id, &[self.field_name.as_str()])
            .await?
        else {
            tracing::warn!("Work item not found. WorkItemId: {}", work_item_id);
            return Ok(None);
        };

        let html = work_item.field_str(&self.field_name);
        if html.trim().is_empty() {
            tracing::info!("{} field is empty for WorkItemId: {}", self.field_name, work_item_id);
            return Ok(Some(ReportingInfoResponse::default()));
        }

        tracing::info!("Processing reporting info for WorkItemId: {}", work_item_id);
        let entries = parse_reporting_table(html);
        let response = aggregate_by_team(&entries, teams);
        tracing::info!(
            "Reporting info processing completed for WorkItemId: {} ({} rows)",
            work_item_id,
            entries.len()
        );

        Ok(Some(response))
    }
}
