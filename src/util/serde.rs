//! Shared identifier types used across the engine and its API surface.

use uuid::Uuid;

/// Identifier of a registered worker, chosen by the caller at registration.
pub type WorkerId = String;

/// Identifier of the task an allocation is granted to.
pub type TaskId = String;

/// Opaque identifier of an allocation.
pub type AllocationId = Uuid;

/// Opaque identifier of a reservation.
pub type ReservationId = Uuid;

/// Generate a fresh opaque record identifier.
pub fn new_record_id() -> Uuid {
    Uuid::new_v4()
}
