//! Capacity accounting, allocation, and quality scaling.

pub mod audit;
pub mod error;
pub mod mapper;
pub mod quality;
pub mod spec;
mod sweeper;
pub mod worker;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, ErrorKind, MapperError};
pub use mapper::{
    Allocation, AllocationConstraints, AllocationStrategy, Reservation, ResourceMapper,
    ResourceStatus, WorkerStatus,
};
pub use quality::{QualityInfo, QualityResourceScaler, QualityTier, MIN_SCALED_QUANTITY};
pub use spec::{ResourceSpec, QUANTITY_EPSILON};
pub use worker::{Utilization, WorkerResources};
