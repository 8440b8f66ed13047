//! # Prometheus Resource Mapper
//!
//! Capacity accounting and quality-tier scaling for generation workloads on the
//! Prometheus AI Platform.
//!
//! The mapper tracks what every worker has (CPU, memory, GPUs, disk), what is
//! granted to running tasks, and what is held by short-lived reservations. Task
//! submitters ask it for a worker, commit an allocation, and release it when the
//! task finishes. The quality scaler turns a task's standard-quality requirement
//! into the requirement, run time and priority of the tier a user asked for.
//!
//! ## Core Problem Solved
//!
//! - **No oversubscription**: `allocated + reserved` never exceeds a worker's
//!   capacity, even under concurrent submitters
//! - **Holds without commitment**: reservations keep capacity aside for a
//!   bounded time and are swept automatically when they lapse
//! - **Quality-aware sizing**: draft previews and ultra renders of the same task
//!   ask for very different resources
//!
//! ## Key Features
//!
//! - **Allocation strategies**: first-fit in registration order, or best-fit by
//!   smallest leftover headroom
//! - **Placement constraints**: preferred/excluded workers, GPU model, minimum
//!   compute capability
//! - **Typed scaling tables**: fixed tier list, validated multipliers with
//!   task-type and per-request overrides
//! - **Lifecycle**: explicit `start()`/`stop()` for the expiry sweeper
//!
//! ## Placing a task
//!
//! ```rust,ignore
//! use prometheus_resource_mapper::core::{QualityResourceScaler, QualityTier, ResourceMapper, ResourceSpec};
//! use prometheus_resource_mapper::config::MapperConfig;
//!
//! let mapper = ResourceMapper::new(MapperConfig::default());
//! let scaler = QualityResourceScaler::default();
//! mapper.register_worker("gpu-node-1", ResourceSpec::new(16.0, 64.0).with_gpus(2, 48.0))?;
//! mapper.start()?;
//!
//! let base = ResourceSpec::new(2.0, 8.0).with_gpus(1, 12.0);
//! let scaled = scaler.scale_requirements(&base, QualityTier::High, Some("image_generation"), None);
//! if let Some(worker) = mapper.find_worker(&scaled, None, None) {
//!     let allocation = mapper.allocate(&worker, &scaled, "task-42", None, None)?;
//!     // ... run the task ...
//!     mapper.release(allocation.id)?;
//! }
//! mapper.stop().await;
//! ```
//!
//! For complete flows, see:
//! - `tests/mapper_test.rs` - allocation, reservation and lifecycle scenarios
//! - `tests/api_flow_test.rs` - placement with GPU manager and usage monitor

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Capacity accounting, allocation, and quality scaling.
pub mod core;
/// Configuration models for the mapper, scaling tables, and startup workers.
pub mod config;
/// Builders to construct the engine from configuration.
pub mod builders;
/// API surface and collaborator contracts for the HTTP layer.
pub mod runtime;
/// Shared utilities.
pub mod util;
