// Adapters layer: concrete implementations for external systems (Azure DevOps, storage).

pub mod azure_devops;
pub mod document_store;
pub mod storage;

pub use azure_devops::AzureDevOpsClient;
pub use document_store::{ContainerNames, DocumentStore};
pub use storage::{LocalStorage, MemoryStorage};
