use crate::domain::model::{TeamRow, TeamsDefinition};
use crate::utils::error::{Result, WorkerlyError};
use std::collections::{BTreeSet, HashMap};

pub const UNKNOWN_ASSIGNEE: &str = "UNKNOWN ASSIGNEE";
pub const UNASSIGNED: &str = "UNASSIGNED";
pub const MAX_TEAM_NAME_LENGTH: usize = 80;

/// Report label for a contributor: the upper-cased team name, or
/// `UNKNOWN TEAM ON {WHO}` when no team claims them. Unassigned work on no
/// team collapses into `UNASSIGNED`.
pub fn team_label(team: Option<&str>, who: &str) -> String {
    let raw = match team {
        Some(team) => team.to_string(),
        None => format!("UNKNOWN TEAM on {}", who),
    };
    raw.to_uppercase()
        .replace(&format!("UNKNOWN TEAM ON {}", UNKNOWN_ASSIGNEE), UNASSIGNED)
}

impl TeamsDefinition {
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Team whose member set contains `identifier`, ignoring case.
    pub fn team_for(&self, identifier: &str) -> Option<&str> {
        let needle = identifier.trim().to_lowercase();
        let mut matching = self
            .teams
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m.trim().to_lowercase() == needle))
            .map(|(team, _)| team.as_str());

        let first = matching.next()?;
        let others: Vec<&str> = matching.collect();
        if !others.is_empty() {
            tracing::warn!(
                "'{}' belongs to several teams ({}, {}); using '{}'",
                identifier,
                first,
                others.join(", "),
                first
            );
        }
        Some(first)
    }

    /// Builds a definition from edited rows. Blank team names are skipped;
    /// members are split on commas and de-duplicated ignoring case.
    pub fn from_rows(rows: &[TeamRow]) -> Self {
        let mut definition = TeamsDefinition::default();

        for row in rows {
            let key = row.team.trim();
            if key.is_empty() {
                continue;
            }

            let mut members = BTreeSet::new();
            let mut seen = BTreeSet::new();
            for token in row.members_csv.as_deref().unwrap_or("").split(',') {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                if seen.insert(token.to_lowercase()) {
                    members.insert(token.to_string());
                }
            }

            definition.teams.insert(key.to_string(), members);
        }

        definition
    }

    pub fn to_rows(&self) -> Vec<TeamRow> {
        let mut teams: Vec<(&String, &BTreeSet<String>)> = self.teams.iter().collect();
        teams.sort_by_key(|(name, _)| name.to_lowercase());

        teams
            .into_iter()
            .map(|(name, members)| {
                let mut members: Vec<&String> = members.iter().collect();
                members.sort_by_key(|m| m.to_lowercase());
                TeamRow {
                    team: name.to_uppercase(),
                    members_csv: Some(
                        members
                            .into_iter()
                            .map(String::as_str)
                            .collect::<Vec<_>>()
                            .join(", "),
                    ),
                }
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let mut owners: HashMap<String, &str> = HashMap::new();

        for (team, members) in &self.teams {
            if team.trim().is_empty() {
                return Err(WorkerlyError::ValidationError {
                    message: "Team name cannot be empty".to_string(),
                });
            }
            if team.chars().count() > MAX_TEAM_NAME_LENGTH {
                return Err(WorkerlyError::ValidationError {
                    message: format!(
                        "Team name '{}' exceeds {} characters",
                        team, MAX_TEAM_NAME_LENGTH
                    ),
                });
            }
            for member in members {
                if let Some(previous) = owners.insert(member.trim().to_lowercase(), team.as_str()) {
                    if previous != team.as_str() {
                        return Err(WorkerlyError::ValidationError {
                            message: format!(
                                "'{}' cannot belong to both '{}' and '{}'",
                                member, previous, team
                            ),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
