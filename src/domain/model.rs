use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use uuid::Uuid;

const FUNCTIONALITY_TAGS: &[&str] = &["Functionality"];
const REQUIREMENTS_TAGS: &[&str] = &["Requirements"];
const RELEASE_FINALIZATION_TAGS: &[&str] = &[];
const TECHNICAL_TAGS: &[&str] = &["Technical", "Non-functional requirements", "Refactoring"];

/// Category a task's remaining work is booked under, derived from its tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemainingWorkType {
    Functionality,
    Requirements,
    ReleaseFinalization,
    Technical,
    Other,
}

impl RemainingWorkType {
    /// First matching category wins, in declaration order. Matching ignores case.
    pub fn from_tags<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .collect();
        let matches = |known: &[&str]| known.iter().any(|k| tags.contains(&k.to_lowercase()));

        if matches(FUNCTIONALITY_TAGS) {
            RemainingWorkType::Functionality
        } else if matches(REQUIREMENTS_TAGS) {
            RemainingWorkType::Requirements
        } else if matches(RELEASE_FINALIZATION_TAGS) {
            RemainingWorkType::ReleaseFinalization
        } else if matches(TECHNICAL_TAGS) {
            RemainingWorkType::Technical
        } else {
            RemainingWorkType::Other
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingWorkModel {
    pub functionality: f64,
    pub requirements: f64,
    pub release_finalization: f64,
    pub technical: f64,
    pub other: f64,
}

impl RemainingWorkModel {
    pub fn new(
        functionality: f64,
        requirements: f64,
        release_finalization: f64,
        technical: f64,
        other: f64,
    ) -> Self {
        Self {
            functionality,
            requirements,
            release_finalization,
            technical,
            other,
        }
    }

    /// A model holding `amount` in the bucket for `kind` and zero elsewhere.
    pub fn of(kind: RemainingWorkType, amount: f64) -> Self {
        let mut model = Self::default();
        match kind {
            RemainingWorkType::Functionality => model.functionality = amount,
            RemainingWorkType::Requirements => model.requirements = amount,
            RemainingWorkType::ReleaseFinalization => model.release_finalization = amount,
            RemainingWorkType::Technical => model.technical = amount,
            RemainingWorkType::Other => model.other = amount,
        }
        model
    }

    pub fn total(&self) -> f64 {
        self.functionality + self.requirements + self.release_finalization + self.technical + self.other
    }

    /// Orders by total only.
    pub fn cmp_total(&self, other: &Self) -> Ordering {
        self.total().total_cmp(&other.total())
    }
}

impl Add for RemainingWorkModel {
    type Output = RemainingWorkModel;

    fn add(self, rhs: Self) -> Self::Output {
        RemainingWorkModel {
            functionality: self.functionality + rhs.functionality,
            requirements: self.requirements + rhs.requirements,
            release_finalization: self.release_finalization + rhs.release_finalization,
            technical: self.technical + rhs.technical,
            other: self.other + rhs.other,
        }
    }
}

impl AddAssign for RemainingWorkModel {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for RemainingWorkModel {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(RemainingWorkModel::default(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a RemainingWorkModel> for RemainingWorkModel {
    fn sum<I: Iterator<Item = &'a RemainingWorkModel>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingWorkResponseItem {
    pub team: String,
    pub remaining_work: RemainingWorkModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingWorkResponse {
    pub id: i64,
    pub title: String,
    pub report: Vec<RemainingWorkResponseItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRoot {
    pub workspace_id: Uuid,
    pub work_item_id: i64,
    pub work_item_title: String,
    pub execution_date_utc: DateTime<Utc>,
}

/// A point-in-time remaining work report for one root work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingWorkSnapshot {
    pub root: SnapshotRoot,
    pub report: Vec<RemainingWorkResponseItem>,
}

impl RemainingWorkSnapshot {
    pub fn from_response(
        workspace_id: Uuid,
        response: RemainingWorkResponse,
        execution_date_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            root: SnapshotRoot {
                workspace_id,
                work_item_id: response.id,
                work_item_title: response.title,
                execution_date_utc,
            },
            report: response.report,
        }
    }

    pub fn id(&self) -> String {
        format!(
            "{}|{}|{}",
            self.root.workspace_id,
            self.root.work_item_id,
            self.root.execution_date_utc.timestamp_millis()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingInfoResponseItem {
    pub team: String,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingInfoResponse {
    pub items: Vec<ReportingInfoResponseItem>,
}

/// Team name to the assignee identifiers belonging to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsDefinition {
    #[serde(default)]
    pub teams: BTreeMap<String, BTreeSet<String>>,
}

/// Editable view of one team: its name and comma-separated members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRow {
    pub team: String,
    #[serde(default)]
    pub members_csv: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWorkspace {
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_selected: bool,
}

impl UserWorkspace {
    pub fn id(&self) -> String {
        format!("{}:{}", self.user_id, self.workspace_id)
    }
}

/// Per-workspace Azure DevOps connection plus its team mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConnection {
    pub workspace_id: Uuid,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub personal_access_token: String,
    #[serde(default)]
    pub teams_definition: TeamsDefinition,
}

impl WorkspaceConnection {
    pub fn empty(workspace_id: Uuid) -> Self {
        Self {
            workspace_id,
            organization: String::new(),
            personal_access_token: String::new(),
            teams_definition: TeamsDefinition::default(),
        }
    }

    pub fn id(&self) -> String {
        self.workspace_id.to_string()
    }

    pub fn is_configured(&self) -> bool {
        !self.organization.trim().is_empty() && !self.personal_access_token.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceListItem {
    pub id: Uuid,
    pub name: String,
    pub is_selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveConnectionResult {
    Success,
    Forbidden,
    Invalid,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveTeamsResult {
    Success,
    Forbidden,
    Invalid,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InviteUserResult {
    Success,
    UserNotFound,
    AlreadyMember,
    Forbidden,
    Error,
}
