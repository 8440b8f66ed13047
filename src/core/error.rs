//! Error types for allocation and reservation operations.

use thiserror::Error;

use crate::core::ResourceSpec;
use crate::util::serde::{AllocationId, ReservationId, WorkerId};

/// Errors produced by the resource mapper and its configuration layer.
#[derive(Debug, Error)]
pub enum MapperError {
    /// The worker cannot cover the request right now.
    #[error("insufficient resources on worker {worker_id}: short by {shortfall}")]
    InsufficientResources {
        /// Worker that was asked.
        worker_id: WorkerId,
        /// Per-field amount the request exceeds availability by.
        shortfall: ResourceSpec,
    },
    /// The operation would break the worker/allocation lifecycle.
    #[error("resource conflict: {0}")]
    ResourceConflict(String),
    /// No worker is registered under this id.
    #[error("worker not found: {0}")]
    WorkerNotFound(WorkerId),
    /// No live allocation has this id.
    #[error("allocation not found: {0}")]
    AllocationNotFound(AllocationId),
    /// No live reservation has this id.
    #[error("reservation not found: {0}")]
    ReservationNotFound(ReservationId),
    /// The reservation exists but cannot back this allocation.
    #[error("reservation {reservation_id} cannot be consumed: {reason}")]
    ReservationMismatch {
        /// Reservation named by the caller.
        reservation_id: ReservationId,
        /// What did not match.
        reason: String,
    },
    /// A resource bundle carried negative or non-finite quantities.
    #[error("invalid resource spec: {0}")]
    InvalidSpec(String),
    /// A mutation would have pushed `allocated + reserved` past `total`.
    #[error("ledger invariant violated on worker {worker_id}: {detail}")]
    InvariantViolation {
        /// Worker whose ledger was affected.
        worker_id: WorkerId,
        /// Offending field and values.
        detail: String,
    },
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No async runtime was available for background work.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Coarse classification callers branch on instead of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Expected and recoverable: try later or elsewhere.
    CapacityShortfall,
    /// Lifecycle conflict, typically surfaced as HTTP 409.
    Conflict,
    /// Unknown worker, allocation or reservation.
    NotFound,
    /// Rejected input or configuration.
    InvalidInput,
    /// Programming defect or environment failure.
    Internal,
}

impl MapperError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientResources { .. } => ErrorKind::CapacityShortfall,
            Self::ResourceConflict(_) | Self::ReservationMismatch { .. } => ErrorKind::Conflict,
            Self::WorkerNotFound(_) | Self::AllocationNotFound(_) | Self::ReservationNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::InvalidSpec(_) | Self::InvalidConfig(_) => ErrorKind::InvalidInput,
            Self::InvariantViolation { .. } | Self::Runtime(_) => ErrorKind::Internal,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
