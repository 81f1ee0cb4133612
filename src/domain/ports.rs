use crate::domain::work_item::WorkItem;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    /// Paths (relative to the storage root) of every file below `dir`.
    fn list_files(
        &self,
        dir: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

/// Read access to a work item tracking service.
#[async_trait]
pub trait WorkItemSource: Send + Sync {
    /// Fetches one work item restricted to `fields`; `None` when it does not exist.
    async fn get_work_item(&self, id: i64, fields: &[&str]) -> Result<Option<WorkItem>>;

    /// Fetches many work items with their relations expanded. Ids that do
    /// not exist are omitted from the result.
    async fn get_work_items(&self, ids: &[i64]) -> Result<Vec<WorkItem>>;
}
