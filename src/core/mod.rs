pub mod remaining_work;
pub mod reporting_info;
pub mod teams;

pub use crate::domain::model::{RemainingWorkResponse, ReportingInfoResponse, TeamsDefinition};
pub use crate::domain::ports::{Storage, WorkItemSource};
pub use crate::utils::error::Result;
pub use remaining_work::RemainingWorkEngine;
pub use reporting_info::ReportingInfoEngine;
