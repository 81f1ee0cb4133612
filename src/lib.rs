pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "server")]
pub mod api;

pub use adapters::{AzureDevOpsClient, DocumentStore, LocalStorage, MemoryStorage};
pub use config::WorkerlyConfig;
pub use core::{RemainingWorkEngine, ReportingInfoEngine};
pub use utils::error::{Result, WorkerlyError};
