//! Remaining work aggregation over a work item hierarchy.
//!
//! The hierarchy below a root item is walked level by level. Open tasks and
//! bugs are collected, everything else is expanded into its children. The
//! collected items are then summed per assignee and per team.

use crate::core::teams::{team_label, UNKNOWN_ASSIGNEE};
use crate::domain::model::{
    RemainingWorkModel, RemainingWorkResponse, RemainingWorkResponseItem, RemainingWorkType,
    TeamsDefinition,
};
use crate::domain::ports::WorkItemSource;
use crate::domain::work_item::{field_names, WorkItem};
use crate::utils::error::Result;
use futures::future::try_join_all;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Largest id list the batch endpoint accepts.
pub const DEFAULT_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct AssigneeRemainingWork {
    pub assignee: String,
    pub remaining_work: RemainingWorkModel,
}

pub struct RemainingWorkEngine<W: WorkItemSource> {
    source: W,
    batch_size: usize,
}

impl<W: WorkItemSource> RemainingWorkEngine<W> {
    pub fn new(source: W) -> Self {
        Self {
            source,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, DEFAULT_BATCH_SIZE);
        self
    }

    pub fn source(&self) -> &W {
        &self.source
    }

    /// Computes the per-team remaining work below `root_id`. `None` when the
    /// root work item does not exist.
    pub async fn compute(
        &self,
        root_id: i64,
        teams: &TeamsDefinition,
    ) -> Result<Option<RemainingWorkResponse>> {
        let Some(root) = self
            .source
            .get_work_item(root_id, &[field_names::TITLE])
            .await?
        else {
            tracing::warn!("Root work item not found. WorkItemId: {}", root_id);
            return Ok(None);
        };

        tracing::info!("Starting traversal for remaining work. Root WorkItemId: {}", root.id);
        let open_items = self.collect_open_tasks(root.id).await?;
        tracing::info!(
            "Completed traversal for remaining work. WorkItemId: {} ({} open tasks/bugs)",
            root.id,
            open_items.len()
        );

        let by_assignee = aggregate_by_assignee(&open_items);
        let report = aggregate_by_team(&by_assignee, teams);

        tracing::info!("Remaining work processing completed for WorkItemId: {}", root.id);

        Ok(Some(RemainingWorkResponse {
            id: root.id,
            title: root.title().to_string(),
            report,
        }))
    }

    /// Open tasks and bugs anywhere below (and including) `root_id`.
    pub async fn collect_open_tasks(&self, root_id: i64) -> Result<Vec<WorkItem>> {
        let mut to_traverse: BTreeSet<i64> = BTreeSet::from([root_id]);
        let mut visited: HashSet<i64> = HashSet::new();
        let mut collected = Vec::new();

        while !to_traverse.is_empty() {
            visited.extend(to_traverse.iter().copied());
            let ids: Vec<i64> = std::mem::take(&mut to_traverse).into_iter().collect();

            tracing::info!("Processing batch of work items. Items to traverse: {}", ids.len());

            let batches = try_join_all(
                ids.chunks(self.batch_size)
                    .map(|chunk| self.source.get_work_items(chunk)),
            )
            .await?;

            let mut seen = HashSet::new();
            let (tasks_or_bugs, others): (Vec<WorkItem>, Vec<WorkItem>) = batches
                .into_iter()
                .flatten()
                .filter(|wi| seen.insert(wi.id))
                .partition(WorkItem::is_task_or_bug);

            tracing::info!(
                "Collected {} tasks/bugs and {} other work items.",
                tasks_or_bugs.len(),
                others.len()
            );

            collected.extend(tasks_or_bugs.into_iter().filter(WorkItem::is_open));

            to_traverse = others
                .iter()
                .flat_map(WorkItem::child_ids)
                .filter(|id| !visited.contains(id))
                .collect();
        }

        Ok(collected)
    }
}

/// Sums remaining work per assignee and category, largest total first.
pub fn aggregate_by_assignee(items: &[WorkItem]) -> Vec<AssigneeRemainingWork> {
    let mut totals: HashMap<String, RemainingWorkModel> = HashMap::new();

    for item in items {
        let assignee = item.assignee().trim();
        let assignee = if assignee.is_empty() {
            UNKNOWN_ASSIGNEE.to_string()
        } else {
            assignee.to_uppercase()
        };
        let kind = RemainingWorkType::from_tags(item.tags());

        *totals.entry(assignee).or_default() += RemainingWorkModel::of(kind, item.remaining_work());
    }

    let mut result: Vec<AssigneeRemainingWork> = totals
        .into_iter()
        .map(|(assignee, remaining_work)| AssigneeRemainingWork {
            assignee,
            remaining_work,
        })
        .collect();
    result.sort_by(|a, b| {
        b.remaining_work
            .cmp_total(&a.remaining_work)
            .then_with(|| a.assignee.cmp(&b.assignee))
    });
    result
}

/// Rolls assignee totals up into teams, largest total first.
pub fn aggregate_by_team(
    assignees: &[AssigneeRemainingWork],
    teams: &TeamsDefinition,
) -> Vec<RemainingWorkResponseItem> {
    let mut totals: HashMap<String, RemainingWorkModel> = HashMap::new();

    for entry in assignees {
        let label = team_label(teams.team_for(&entry.assignee), &entry.assignee);
        *totals.entry(label).or_default() += entry.remaining_work;
    }

    let mut report: Vec<RemainingWorkResponseItem> = totals
        .into_iter()
        .map(|(team, remaining_work)| RemainingWorkResponseItem {
            team,
            remaining_work,
        })
        .collect();
    report.sort_by(|a, b| {
        b.remaining_work
            .cmp_total(&a.remaining_work)
            .then_with(|| a.team.cmp(&b.team))
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TeamRow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        items: HashMap<i64, WorkItem>,
        batch_calls: Mutex<Vec<Vec<i64>>>,
    }

    impl FakeSource {
        fn with(mut self, item: WorkItem) -> Self {
            self.items.insert(item.id, item);
            self
        }

        fn calls(&self) -> Vec<Vec<i64>> {
            self.batch_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WorkItemSource for FakeSource {
        async fn get_work_item(&self, id: i64, _fields: &[&str]) -> Result<Option<WorkItem>> {
            Ok(self.items.get(&id).cloned())
        }

        async fn get_work_items(&self, ids: &[i64]) -> Result<Vec<WorkItem>> {
            self.batch_calls.lock().unwrap().push(ids.to_vec());
            Ok(ids.iter().filter_map(|id| self.items.get(id).cloned()).collect())
        }
    }

    fn container(id: i64, kind: &str, title: &str, children: &[i64]) -> WorkItem {
        let relations: Vec<serde_json::Value> = children
            .iter()
            .map(|c| {
                json!({
                    "rel": "System.LinkTypes.Hierarchy-Forward",
                    "url": format!("https://dev.azure.com/contoso/_apis/wit/workItems/{}", c)
                })
            })
            .collect();
        serde_json::from_value(json!({
            "id": id,
            "fields": {"System.WorkItemType": kind, "System.State": "Active", "System.Title": title},
            "relations": relations
        }))
        .unwrap()
    }

    fn task(id: i64, kind: &str, state: &str, assignee: Option<&str>, hours: f64, tags: &str) -> WorkItem {
        let mut fields = json!({
            "System.WorkItemType": kind,
            "System.State": state,
            "System.Tags": tags,
            "Microsoft.VSTS.Scheduling.RemainingWork": hours
        });
        if let Some(assignee) = assignee {
            fields["System.AssignedTo"] = json!({
                "displayName": assignee,
                "uniqueName": format!("{}@contoso.com", assignee)
            });
        }
        serde_json::from_value(json!({"id": id, "fields": fields})).unwrap()
    }

    fn platform_team() -> TeamsDefinition {
        TeamsDefinition::from_rows(&[TeamRow {
            team: "Platform".to_string(),
            members_csv: Some("alice, bob".to_string()),
        }])
    }

    fn sample_hierarchy() -> FakeSource {
        FakeSource::default()
            .with(container(1, "Epic", "Release 1", &[2, 3]))
            .with(container(2, "Feature", "Login", &[10, 11, 12]))
            .with(container(3, "Feature", "Billing", &[13, 14, 4]))
            .with(container(4, "Product Backlog Item", "Invoices", &[15]))
            .with(task(10, "Task", "Active", Some("alice"), 3.0, "Functionality"))
            .with(task(11, "Bug", "New", Some("bob"), 2.0, "Technical; UI"))
            .with(task(12, "Task", "Closed", Some("alice"), 40.0, ""))
            .with(task(13, "Task", "Active", None, 5.0, ""))
            .with(task(14, "Task", "Active", Some("carol"), 1.0, "requirements"))
            .with(task(15, "Task", "Active", Some("Alice"), 2.0, ""))
    }

    #[tokio::test]
    async fn test_compute_groups_by_team() {
        let engine = RemainingWorkEngine::new(sample_hierarchy());

        let response = engine.compute(1, &platform_team()).await.unwrap().unwrap();

        assert_eq!(response.id, 1);
        assert_eq!(response.title, "Release 1");
        let teams: Vec<&str> = response.report.iter().map(|r| r.team.as_str()).collect();
        assert_eq!(teams, vec!["PLATFORM", "UNASSIGNED", "UNKNOWN TEAM ON CAROL"]);

        let platform = &response.report[0].remaining_work;
        assert_eq!(platform.functionality, 3.0);
        assert_eq!(platform.technical, 2.0);
        assert_eq!(platform.other, 2.0);
        assert_eq!(platform.total(), 7.0);

        assert_eq!(response.report[1].remaining_work.other, 5.0);
        assert_eq!(response.report[2].remaining_work.requirements, 1.0);
    }

    #[tokio::test]
    async fn test_compute_missing_root() {
        let engine = RemainingWorkEngine::new(FakeSource::default());
        assert!(engine.compute(99, &TeamsDefinition::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_traversal_chunks_each_level() {
        let source = FakeSource::default()
            .with(container(1, "Feature", "Wide", &[10, 11, 12, 13, 14]))
            .with(task(10, "Task", "Active", Some("a"), 1.0, ""))
            .with(task(11, "Task", "Active", Some("b"), 1.0, ""))
            .with(task(12, "Task", "Active", Some("c"), 1.0, ""))
            .with(task(13, "Task", "Active", Some("d"), 1.0, ""))
            .with(task(14, "Task", "Active", Some("e"), 1.0, ""));
        let engine = RemainingWorkEngine::new(source).with_batch_size(2);

        let collected = engine.collect_open_tasks(1).await.unwrap();

        assert_eq!(collected.len(), 5);
        assert_eq!(
            engine.source().calls(),
            vec![vec![1], vec![10, 11], vec![12, 13], vec![14]]
        );
    }

    #[tokio::test]
    async fn test_traversal_terminates_on_cycles() {
        let source = FakeSource::default()
            .with(container(1, "Feature", "A", &[2]))
            .with(container(2, "Feature", "B", &[1, 3]))
            .with(task(3, "Task", "Active", Some("a"), 1.0, ""));
        let engine = RemainingWorkEngine::new(source);

        let collected = engine.collect_open_tasks(1).await.unwrap();

        assert_eq!(collected.len(), 1);
        assert_eq!(engine.source().calls(), vec![vec![1], vec![2], vec![3]]);
    }

    #[tokio::test]
    async fn test_root_task_is_counted_and_not_expanded() {
        let mut root = task(5, "Task", "Active", Some("dave"), 8.0, "");
        root.relations = container(5, "Task", "", &[6]).relations;
        let source = FakeSource::default()
            .with(root)
            .with(task(6, "Task", "Active", Some("erin"), 1.0, ""));
        let engine = RemainingWorkEngine::new(source);

        let response = engine.compute(5, &TeamsDefinition::default()).await.unwrap().unwrap();

        assert_eq!(response.report.len(), 1);
        assert_eq!(response.report[0].team, "UNKNOWN TEAM ON DAVE");
        assert_eq!(response.report[0].remaining_work.total(), 8.0);
    }

    #[test]
    fn test_aggregate_by_assignee_merges_case_and_orders_ties_by_name() {
        let items = vec![
            task(1, "Task", "Active", Some("zoe"), 2.0, ""),
            task(2, "Task", "Active", Some("bea"), 2.0, ""),
            task(3, "Task", "Active", Some("mia"), 5.0, ""),
            task(4, "Task", "Active", Some("ZOE"), 0.5, "Technical"),
            task(5, "Task", "Active", Some("adam"), 2.0, ""),
        ];

        let result = aggregate_by_assignee(&items);
        let names: Vec<&str> = result.iter().map(|r| r.assignee.as_str()).collect();

        assert_eq!(names, vec!["MIA", "ZOE", "ADAM", "BEA"]);
        assert_eq!(result[1].remaining_work.technical, 0.5);
        assert_eq!(result[1].remaining_work.other, 2.0);
    }
}
