//! Worker registry and allocation engine.
//!
//! [`ResourceMapper`] owns every worker ledger, allocation and reservation.
//! All mutations run under one `parking_lot::Mutex` so that the
//! check-capacity-then-commit sequence is atomic: two concurrent allocations
//! against the same worker can never both see headroom that only one of them
//! fits into. Worker selection ([`ResourceMapper::find_worker`]) works on a
//! snapshot, and [`ResourceMapper::allocate`] re-validates under the lock.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::MapperConfig;
use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::sweeper::Sweeper;
use crate::core::{MapperError, ResourceSpec, Utilization, WorkerResources};
use crate::util::clock::{deadline_after, now_ms};
use crate::util::serde::{new_record_id, AllocationId, ReservationId, TaskId, WorkerId};

/// Policy for choosing among workers that can take a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// First eligible worker in registration order.
    #[default]
    FirstFit,
    /// Eligible worker left with the least headroom.
    BestFit,
}

impl FromStr for AllocationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_fit" => Ok(Self::FirstFit),
            "best_fit" => Ok(Self::BestFit),
            other => Err(format!(
                "unknown allocation strategy `{other}`; expected first_fit or best_fit"
            )),
        }
    }
}

/// Placement filters for [`ResourceMapper::find_worker`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConstraints {
    /// Worker to use if it is eligible.
    pub preferred_worker: Option<WorkerId>,
    /// Workers never to pick.
    pub exclude_workers: Vec<WorkerId>,
    /// Required GPU model, compared case-insensitively.
    pub require_gpu_type: Option<String>,
    /// Minimum GPU compute capability.
    pub require_compute_capability: Option<String>,
}

impl AllocationConstraints {
    /// Whether `worker` passes every filter (capacity is checked separately).
    pub fn admits(&self, worker: &WorkerResources) -> bool {
        if self.exclude_workers.iter().any(|w| *w == worker.worker_id) {
            return false;
        }
        if let Some(required) = self.require_gpu_type.as_deref() {
            let matches = worker
                .gpu_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(required));
            if !matches {
                return false;
            }
        }
        self.require_compute_capability
            .as_deref()
            .is_none_or(|required| worker.supports_compute_capability(required))
    }
}

/// Resources granted to a task on one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Opaque allocation id.
    pub id: AllocationId,
    /// Worker the resources come from.
    pub worker_id: WorkerId,
    /// Task holding the grant.
    pub task_id: TaskId,
    /// Quantities granted.
    pub requirements: ResourceSpec,
    /// GPU device indices recorded by the caller after device assignment.
    pub gpu_devices: Vec<u32>,
    /// Reservation this allocation was converted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<ReservationId>,
    /// Creation timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
    /// Expected completion, derived from the caller's duration estimate.
    /// Advisory only; allocations are never evicted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<u128>,
}

impl Allocation {
    /// Whether the task has outlived its duration estimate.
    pub fn is_overdue(&self, now_ms: u128) -> bool {
        self.expires_at_ms.is_some_and(|deadline| deadline < now_ms)
    }
}

/// Time-bounded hold on a worker's resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Opaque reservation id.
    pub id: ReservationId,
    /// Worker holding the resources.
    pub worker_id: WorkerId,
    /// Quantities held.
    pub requirements: ResourceSpec,
    /// Creation timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
    /// The sweeper frees the hold after this instant.
    pub expires_at_ms: u128,
}

impl Reservation {
    /// Whether the reservation lapsed before `now_ms`.
    pub const fn is_expired(&self, now_ms: u128) -> bool {
        self.expires_at_ms < now_ms
    }
}

/// Ledger view of one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    /// Worker id.
    pub worker_id: WorkerId,
    /// GPU model, if tagged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_type: Option<String>,
    /// Full capacity.
    pub total: ResourceSpec,
    /// Granted to tasks.
    pub allocated: ResourceSpec,
    /// Held by reservations.
    pub reserved: ResourceSpec,
    /// Free for new work.
    pub available: ResourceSpec,
    /// Allocated percentages.
    pub utilization: Utilization,
    /// Live allocations on this worker.
    pub allocation_count: usize,
}

/// Aggregate view across all workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    /// Registered workers.
    pub worker_count: usize,
    /// Summed capacity.
    pub total: ResourceSpec,
    /// Summed allocations.
    pub allocated: ResourceSpec,
    /// Summed reservations.
    pub reserved: ResourceSpec,
    /// Summed availability.
    pub available: ResourceSpec,
    /// Cluster-wide allocated percentages.
    pub utilization: Utilization,
    /// Per-worker breakdown in registration order.
    pub workers: Vec<WorkerStatus>,
    /// Live allocations.
    pub active_allocations: usize,
    /// Live reservations.
    pub active_reservations: usize,
}

/// Mutable engine state, guarded as a unit.
#[derive(Default)]
struct MapperState {
    workers: HashMap<WorkerId, WorkerResources>,
    /// Registration order; `FirstFit` depends on it.
    order: Vec<WorkerId>,
    allocations: HashMap<AllocationId, Allocation>,
    reservations: HashMap<ReservationId, Reservation>,
}

impl MapperState {
    fn ordered_workers(&self) -> impl Iterator<Item = &WorkerResources> {
        self.order.iter().filter_map(|id| self.workers.get(id))
    }
}

/// State shared between the mapper and its background sweeper.
pub(crate) struct MapperShared {
    state: Mutex<MapperState>,
    audit: Mutex<Option<Box<dyn AuditSink>>>,
}

impl MapperShared {
    fn record(
        &self,
        action: AuditAction,
        worker_id: &str,
        record_id: Option<String>,
        task_id: Option<String>,
        payload: Option<String>,
    ) {
        if let Some(sink) = self.audit.lock().as_mut() {
            sink.record(build_audit_event(action, worker_id, record_id, task_id, payload));
        }
    }

    /// Free every reservation that lapsed before `now_ms`.
    pub(crate) fn cleanup_expired_at(&self, now_ms: u128) -> usize {
        let expired = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let lapsed: Vec<ReservationId> = state
                .reservations
                .values()
                .filter(|r| r.is_expired(now_ms))
                .map(|r| r.id)
                .collect();

            let mut expired = Vec::with_capacity(lapsed.len());
            for id in lapsed {
                let Some(reservation) = state.reservations.remove(&id) else {
                    continue;
                };
                if let Some(worker) = state.workers.get_mut(&reservation.worker_id) {
                    let allocated = worker.allocated.clone();
                    let reserved = worker.reserved.subtract(&reservation.requirements);
                    if let Err(e) = worker.commit(allocated, reserved) {
                        error!(reservation_id = %id, error = %e, "failed to return expired reservation");
                    }
                }
                expired.push(reservation);
            }
            expired
        }; // Lock released before audit

        if !expired.is_empty() {
            warn!(count = expired.len(), "expired reservations freed");
        }
        for reservation in &expired {
            self.record(
                AuditAction::Expire,
                &reservation.worker_id,
                Some(reservation.id.to_string()),
                None,
                Some(reservation.requirements.to_string()),
            );
        }
        expired.len()
    }
}

/// Capacity registry and allocation engine.
///
/// Construct one per process and share it by reference (or `Arc`). Call
/// [`start`](Self::start) inside a tokio runtime to run the reservation
/// expiry sweeper, and [`stop`](Self::stop) before shutdown.
pub struct ResourceMapper {
    shared: Arc<MapperShared>,
    config: MapperConfig,
    sweeper: Mutex<Option<Sweeper>>,
}

impl Default for ResourceMapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

impl ResourceMapper {
    /// Create an empty mapper. The sweeper is not started.
    pub fn new(config: MapperConfig) -> Self {
        Self {
            shared: Arc::new(MapperShared {
                state: Mutex::new(MapperState::default()),
                audit: Mutex::new(None),
            }),
            config,
            sweeper: Mutex::new(None),
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        *self.shared.audit.lock() = Some(audit);
        self
    }

    /// Configuration in use.
    pub const fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Register a worker with the given capacity.
    pub fn register_worker(
        &self,
        worker_id: impl Into<WorkerId>,
        total: ResourceSpec,
    ) -> Result<(), MapperError> {
        self.register(WorkerResources::new(worker_id, total))
    }

    /// Register a worker and tag it with its GPU model.
    pub fn register_worker_with_gpu_type(
        &self,
        worker_id: impl Into<WorkerId>,
        total: ResourceSpec,
        gpu_type: impl Into<String>,
    ) -> Result<(), MapperError> {
        self.register(WorkerResources::new(worker_id, total).with_gpu_type(gpu_type))
    }

    fn register(&self, worker: WorkerResources) -> Result<(), MapperError> {
        worker.total.validate()?;
        let worker_id = worker.worker_id.clone();
        let total = worker.total.clone();
        {
            let mut state = self.shared.state.lock();
            if state.workers.contains_key(&worker_id) {
                return Err(MapperError::ResourceConflict(format!(
                    "worker {worker_id} is already registered"
                )));
            }
            state.order.push(worker_id.clone());
            state.workers.insert(worker_id.clone(), worker);
        }
        info!(worker_id = %worker_id, total = %total, "worker registered");
        self.shared
            .record(AuditAction::Register, &worker_id, None, None, Some(total.to_string()));
        Ok(())
    }

    /// Remove a worker. Fails while any allocation still references it;
    /// outstanding reservations on the worker are dropped.
    pub fn unregister_worker(&self, worker_id: &str) -> Result<WorkerResources, MapperError> {
        let (worker, dropped) = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            if !state.workers.contains_key(worker_id) {
                return Err(MapperError::WorkerNotFound(worker_id.to_string()));
            }
            let live = state
                .allocations
                .values()
                .filter(|a| a.worker_id == worker_id)
                .count();
            if live > 0 {
                return Err(MapperError::ResourceConflict(format!(
                    "worker {worker_id} still has {live} active allocation(s)"
                )));
            }
            let before = state.reservations.len();
            state.reservations.retain(|_, r| r.worker_id != worker_id);
            let dropped = before - state.reservations.len();
            state.order.retain(|id| id != worker_id);
            let worker = state
                .workers
                .remove(worker_id)
                .ok_or_else(|| MapperError::WorkerNotFound(worker_id.to_string()))?;
            (worker, dropped)
        };
        if dropped > 0 {
            warn!(worker_id, dropped, "dropped reservations of unregistered worker");
        }
        info!(worker_id, "worker unregistered");
        self.shared
            .record(AuditAction::Unregister, worker_id, None, None, None);
        Ok(worker)
    }

    /// Pick a worker that can take `requirements` right now.
    ///
    /// Evaluated on a snapshot; the answer is advisory until
    /// [`allocate`](Self::allocate) commits it. Returns `None` when no
    /// registered worker is eligible.
    pub fn find_worker(
        &self,
        requirements: &ResourceSpec,
        constraints: Option<&AllocationConstraints>,
        strategy: Option<AllocationStrategy>,
    ) -> Option<WorkerId> {
        if let Err(e) = validate_request(requirements) {
            warn!(error = %e, "rejecting placement query");
            return None;
        }
        let snapshot: Vec<WorkerResources> = {
            let state = self.shared.state.lock();
            state.ordered_workers().cloned().collect()
        };
        let default_constraints = AllocationConstraints::default();
        let constraints = constraints.unwrap_or(&default_constraints);
        let strategy = strategy.unwrap_or(self.config.default_strategy);

        let chosen = select_worker(&snapshot, requirements, constraints, strategy)
            .map(|w| w.worker_id.clone());
        debug!(?strategy, requirements = %requirements, chosen = ?chosen, "worker selection");
        chosen
    }

    /// Grant `requirements` on `worker_id` to `task_id`.
    ///
    /// With `reservation_id`, the reservation must belong to the worker and
    /// hold the same quantities; its weight moves from reserved to allocated
    /// and the reservation is consumed. Without one, the worker must have the
    /// capacity available now.
    pub fn allocate(
        &self,
        worker_id: &str,
        requirements: &ResourceSpec,
        task_id: impl Into<TaskId>,
        duration_estimate: Option<Duration>,
        reservation_id: Option<ReservationId>,
    ) -> Result<Allocation, MapperError> {
        validate_request(requirements)?;
        let task_id = task_id.into();
        let now = now_ms();

        let allocation = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            let worker = state
                .workers
                .get_mut(worker_id)
                .ok_or_else(|| MapperError::WorkerNotFound(worker_id.to_string()))?;

            let booked = if let Some(rid) = reservation_id {
                let reservation = state
                    .reservations
                    .get(&rid)
                    .ok_or(MapperError::ReservationNotFound(rid))?;
                if reservation.worker_id != worker_id {
                    return Err(MapperError::ReservationMismatch {
                        reservation_id: rid,
                        reason: format!(
                            "held on worker {}, not {worker_id}",
                            reservation.worker_id
                        ),
                    });
                }
                if !reservation.requirements.same_quantities(requirements) {
                    return Err(MapperError::ReservationMismatch {
                        reservation_id: rid,
                        reason: format!(
                            "holds {}, request is {requirements}",
                            reservation.requirements
                        ),
                    });
                }
                let headroom = &worker.available() + &reservation.requirements;
                let booked = requirements.booked_within(&headroom);
                let allocated = &worker.allocated + &booked;
                let reserved = worker.reserved.subtract(&reservation.requirements);
                worker.commit(allocated, reserved)?;
                state.reservations.remove(&rid);
                booked
            } else {
                if !worker.can_allocate(requirements) {
                    let shortfall = requirements.shortfall(&worker.available());
                    debug!(worker_id, shortfall = %shortfall, "allocation refused");
                    return Err(MapperError::InsufficientResources {
                        worker_id: worker_id.to_string(),
                        shortfall,
                    });
                }
                let booked = requirements.booked_within(&worker.available());
                let allocated = &worker.allocated + &booked;
                let reserved = worker.reserved.clone();
                worker.commit(allocated, reserved)?;
                booked
            };

            let allocation = Allocation {
                id: new_record_id(),
                worker_id: worker_id.to_string(),
                task_id,
                requirements: booked,
                gpu_devices: Vec::new(),
                reservation_id,
                created_at_ms: now,
                expires_at_ms: duration_estimate.map(|d| deadline_after(now, d)),
            };
            state.allocations.insert(allocation.id, allocation.clone());
            allocation
        };

        info!(
            allocation_id = %allocation.id,
            worker_id,
            task_id = %allocation.task_id,
            requirements = %allocation.requirements,
            "resources allocated"
        );
        self.shared.record(
            AuditAction::Allocate,
            worker_id,
            Some(allocation.id.to_string()),
            Some(allocation.task_id.clone()),
            Some(allocation.requirements.to_string()),
        );
        Ok(allocation)
    }

    /// Return an allocation's resources to its worker.
    pub fn release(&self, allocation_id: AllocationId) -> Result<Allocation, MapperError> {
        let allocation = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            let allocation = state
                .allocations
                .remove(&allocation_id)
                .ok_or(MapperError::AllocationNotFound(allocation_id))?;
            match state.workers.get_mut(&allocation.worker_id) {
                Some(worker) => {
                    let allocated = worker.allocated.subtract(&allocation.requirements);
                    let reserved = worker.reserved.clone();
                    worker.commit(allocated, reserved)?;
                }
                None => error!(
                    allocation_id = %allocation_id,
                    worker_id = %allocation.worker_id,
                    "released allocation referenced an unknown worker"
                ),
            }
            allocation
        };

        info!(
            allocation_id = %allocation.id,
            worker_id = %allocation.worker_id,
            task_id = %allocation.task_id,
            "resources released"
        );
        self.shared.record(
            AuditAction::Release,
            &allocation.worker_id,
            Some(allocation.id.to_string()),
            Some(allocation.task_id.clone()),
            Some(allocation.requirements.to_string()),
        );
        Ok(allocation)
    }

    /// Hold `requirements` on `worker_id` for `duration` (default from config).
    pub fn reserve_resources(
        &self,
        worker_id: &str,
        requirements: &ResourceSpec,
        duration: Option<Duration>,
    ) -> Result<Reservation, MapperError> {
        validate_request(requirements)?;
        let now = now_ms();
        let ttl = duration.unwrap_or_else(|| self.config.default_reservation_ttl());

        let reservation = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            let worker = state
                .workers
                .get_mut(worker_id)
                .ok_or_else(|| MapperError::WorkerNotFound(worker_id.to_string()))?;
            if !worker.can_allocate(requirements) {
                let shortfall = requirements.shortfall(&worker.available());
                debug!(worker_id, shortfall = %shortfall, "reservation refused");
                return Err(MapperError::InsufficientResources {
                    worker_id: worker_id.to_string(),
                    shortfall,
                });
            }
            let booked = requirements.booked_within(&worker.available());
            let allocated = worker.allocated.clone();
            let reserved = &worker.reserved + &booked;
            worker.commit(allocated, reserved)?;

            let reservation = Reservation {
                id: new_record_id(),
                worker_id: worker_id.to_string(),
                requirements: booked,
                created_at_ms: now,
                expires_at_ms: deadline_after(now, ttl),
            };
            state.reservations.insert(reservation.id, reservation.clone());
            reservation
        };

        info!(
            reservation_id = %reservation.id,
            worker_id,
            ttl_ms = ttl.as_millis(),
            requirements = %reservation.requirements,
            "resources reserved"
        );
        self.shared.record(
            AuditAction::Reserve,
            worker_id,
            Some(reservation.id.to_string()),
            None,
            Some(reservation.requirements.to_string()),
        );
        Ok(reservation)
    }

    /// Drop a reservation before it expires, returning its hold to the worker.
    pub fn cancel_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Reservation, MapperError> {
        let reservation = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            let reservation = state
                .reservations
                .remove(&reservation_id)
                .ok_or(MapperError::ReservationNotFound(reservation_id))?;
            if let Some(worker) = state.workers.get_mut(&reservation.worker_id) {
                let allocated = worker.allocated.clone();
                let reserved = worker.reserved.subtract(&reservation.requirements);
                worker.commit(allocated, reserved)?;
            }
            reservation
        };
        info!(
            reservation_id = %reservation.id,
            worker_id = %reservation.worker_id,
            "reservation cancelled"
        );
        self.shared.record(
            AuditAction::Cancel,
            &reservation.worker_id,
            Some(reservation.id.to_string()),
            None,
            Some(reservation.requirements.to_string()),
        );
        Ok(reservation)
    }

    /// Record the GPU devices the caller obtained for an allocation.
    pub fn attach_gpu_devices(
        &self,
        allocation_id: AllocationId,
        devices: Vec<u32>,
    ) -> Result<Allocation, MapperError> {
        let mut state = self.shared.state.lock();
        let allocation = state
            .allocations
            .get_mut(&allocation_id)
            .ok_or(MapperError::AllocationNotFound(allocation_id))?;
        allocation.gpu_devices = devices;
        Ok(allocation.clone())
    }

    /// Free every reservation whose deadline has passed. Returns how many.
    pub fn cleanup_expired(&self) -> usize {
        self.shared.cleanup_expired_at(now_ms())
    }

    /// [`cleanup_expired`](Self::cleanup_expired) against an explicit clock.
    pub fn cleanup_expired_at(&self, now_ms: u128) -> usize {
        self.shared.cleanup_expired_at(now_ms)
    }

    /// Aggregate and per-worker ledger summary.
    pub fn get_resource_status(&self) -> ResourceStatus {
        let state = self.shared.state.lock();
        let mut allocation_counts: HashMap<&str, usize> = HashMap::new();
        for allocation in state.allocations.values() {
            *allocation_counts.entry(allocation.worker_id.as_str()).or_default() += 1;
        }

        let mut total = ResourceSpec::zero();
        let mut allocated = ResourceSpec::zero();
        let mut reserved = ResourceSpec::zero();
        let mut available = ResourceSpec::zero();
        let mut workers = Vec::with_capacity(state.order.len());
        for worker in state.ordered_workers() {
            let worker_available = worker.available();
            total = &total + &worker.total;
            allocated = &allocated + &worker.allocated;
            reserved = &reserved + &worker.reserved;
            available = &available + &worker_available;
            workers.push(WorkerStatus {
                worker_id: worker.worker_id.clone(),
                gpu_type: worker.gpu_type.clone(),
                total: worker.total.clone(),
                allocated: worker.allocated.clone(),
                reserved: worker.reserved.clone(),
                available: worker_available,
                utilization: worker.utilization(),
                allocation_count: allocation_counts
                    .get(worker.worker_id.as_str())
                    .copied()
                    .unwrap_or(0),
            });
        }

        ResourceStatus {
            worker_count: workers.len(),
            utilization: Utilization::from_ledger(&total, &allocated),
            total,
            allocated,
            reserved,
            available,
            workers,
            active_allocations: state.allocations.len(),
            active_reservations: state.reservations.len(),
        }
    }

    /// Snapshot of one worker's ledger.
    pub fn get_worker(&self, worker_id: &str) -> Option<WorkerResources> {
        self.shared.state.lock().workers.get(worker_id).cloned()
    }

    /// Registered worker ids in registration order.
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.shared.state.lock().order.clone()
    }

    /// Snapshot of one allocation.
    pub fn get_allocation(&self, allocation_id: AllocationId) -> Option<Allocation> {
        self.shared.state.lock().allocations.get(&allocation_id).cloned()
    }

    /// Snapshot of one reservation.
    pub fn get_reservation(&self, reservation_id: ReservationId) -> Option<Reservation> {
        self.shared.state.lock().reservations.get(&reservation_id).cloned()
    }

    /// Live allocations, optionally limited to one worker, oldest first.
    pub fn list_allocations(&self, worker_id: Option<&str>) -> Vec<Allocation> {
        let mut allocations: Vec<Allocation> = {
            let state = self.shared.state.lock();
            state
                .allocations
                .values()
                .filter(|a| worker_id.is_none_or(|w| a.worker_id == w))
                .cloned()
                .collect()
        };
        allocations.sort_by_key(|a| a.created_at_ms);
        allocations
    }

    /// Start the background reservation sweeper. Must be called from within a
    /// tokio runtime; calling it again while running is a no-op.
    pub fn start(&self) -> Result<(), MapperError> {
        self.config.validate().map_err(MapperError::InvalidConfig)?;
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            debug!("expiry sweeper already running");
            return Ok(());
        }
        *sweeper = Some(Sweeper::spawn(
            Arc::clone(&self.shared),
            self.config.sweep_interval(),
        )?);
        Ok(())
    }

    /// Stop the sweeper and wait for its task to finish.
    pub async fn stop(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
        }
    }

    /// Whether the sweeper is running.
    pub fn is_running(&self) -> bool {
        self.sweeper.lock().is_some()
    }
}

/// Boundary checks for a resource request.
fn validate_request(requirements: &ResourceSpec) -> Result<(), MapperError> {
    requirements.validate()
}

fn is_eligible(
    worker: &WorkerResources,
    requirements: &ResourceSpec,
    constraints: &AllocationConstraints,
) -> bool {
    constraints.admits(worker) && worker.can_allocate(requirements)
}

fn select_worker<'a>(
    candidates: &'a [WorkerResources],
    requirements: &ResourceSpec,
    constraints: &AllocationConstraints,
    strategy: AllocationStrategy,
) -> Option<&'a WorkerResources> {
    if let Some(preferred) = constraints.preferred_worker.as_deref() {
        let hit = candidates
            .iter()
            .find(|w| w.worker_id == preferred)
            .filter(|w| is_eligible(w, requirements, constraints));
        if hit.is_some() {
            return hit;
        }
    }

    let mut eligible = candidates
        .iter()
        .filter(|w| is_eligible(w, requirements, constraints));
    match strategy {
        AllocationStrategy::FirstFit => eligible.next(),
        // min_by keeps the earliest-registered worker on ties.
        AllocationStrategy::BestFit => eligible.min_by(|a, b| {
            compare_headroom(
                &a.available().subtract(requirements),
                &b.available().subtract(requirements),
            )
        }),
    }
}

/// Order leftover headroom by cpu, then memory, then GPU memory, then disk.
fn compare_headroom(a: &ResourceSpec, b: &ResourceSpec) -> Ordering {
    a.cpu_cores
        .total_cmp(&b.cpu_cores)
        .then_with(|| a.memory_gb.total_cmp(&b.memory_gb))
        .then_with(|| a.gpu_memory_gb.total_cmp(&b.gpu_memory_gb))
        .then_with(|| a.disk_gb.total_cmp(&b.disk_gb))
}
