//! API surface consumed by the HTTP layer.

pub mod api;

pub use api::{
    health, place_task, release_task, resource_report, ApiError, GpuManager, Health,
    ResourcePrediction, ResourceMonitor, ResourceReport, TaskPlacement, TaskPlacementRequest,
};
