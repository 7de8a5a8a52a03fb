pub mod lifecycle;
pub mod models;
pub mod report;
pub mod repository;
pub mod workflow;


pub use lifecycle::{Action, Lifecycle, StagingStatus, TransitionError};
pub use models::{RecordError, StagingKey, StagingRecord, StagingSnapshot};
pub use report::{
    BatchReport, CalculationReport, PushReport, RefreshReport, SkipCause, SkippedSku, SkuFailure, StagingStats,
};
pub use repository::{InMemoryStagingRepository, StagingFilter, StagingRepository};
pub use workflow::{ApprovedRecalculation, PricingWorkflow, WorkflowError, WorkflowSettings};
