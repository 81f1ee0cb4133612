//! Work items as the Azure DevOps work item tracking REST API returns them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod field_names {
    pub const TITLE: &str = "System.Title";
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    pub const STATE: &str = "System.State";
    pub const TAGS: &str = "System.Tags";
    pub const ASSIGNED_TO: &str = "System.AssignedTo";
    pub const REMAINING_WORK: &str = "Microsoft.VSTS.Scheduling.RemainingWork";
    pub const DEFAULT_REPORTING_INFO: &str = "Custom.ReportingInfo";
}

pub mod relationship_names {
    pub const PARENT_TO_CHILD: &str = "System.LinkTypes.Hierarchy-Forward";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRelation {
    pub rel: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub relations: Option<Vec<WorkItemRelation>>,
}

impl WorkItem {
    pub fn field_str(&self, name: &str) -> &str {
        self.fields.get(name).and_then(Value::as_str).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.field_str(field_names::TITLE)
    }

    pub fn work_item_type(&self) -> &str {
        self.field_str(field_names::WORK_ITEM_TYPE)
    }

    pub fn state(&self) -> &str {
        self.field_str(field_names::STATE)
    }

    pub fn is_task_or_bug(&self) -> bool {
        matches!(self.work_item_type(), "Task" | "Bug")
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state(), "Closed" | "Removed")
    }

    /// `System.Tags` is a single `;`-separated string.
    pub fn tags(&self) -> Vec<&str> {
        self.field_str(field_names::TAGS)
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Account name of the assignee (the part of `uniqueName` before `@`),
    /// empty when unassigned.
    pub fn assignee(&self) -> &str {
        self.fields
            .get(field_names::ASSIGNED_TO)
            .and_then(|v| v.get("uniqueName"))
            .and_then(Value::as_str)
            .and_then(|unique| unique.split('@').next())
            .unwrap_or("")
    }

    pub fn remaining_work(&self) -> f64 {
        match self.fields.get(field_names::REMAINING_WORK) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn child_ids(&self) -> Vec<i64> {
        self.relations
            .iter()
            .flatten()
            .filter(|r| r.rel == relationship_names::PARENT_TO_CHILD)
            .filter_map(|r| {
                let segment = r.url.trim_end_matches('/').rsplit('/').next().unwrap_or("");
                match segment.parse::<i64>() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        tracing::warn!(
                            "Skipping child relation of work item {} with unparsable url '{}'",
                            self.id,
                            r.url
                        );
                        None
                    }
                }
            })
            .collect()
    }
}
