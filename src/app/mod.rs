// Application layer: use cases over the document store and the engines.

pub mod report_export;
pub mod snapshots;
pub mod tracker;
pub mod users;
pub mod workspace_config;
pub mod workspaces;

pub use report_export::ReportFormat;
pub use snapshots::SnapshotService;
pub use tracker::{BurndownTracker, TrackerSummary};
pub use users::UserService;
pub use workspace_config::WorkspaceConfigService;
pub use workspaces::WorkspaceService;
