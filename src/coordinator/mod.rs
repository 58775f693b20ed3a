//! Cross-engine orchestration.
//!
//! Neither coordinator has a distributed transaction to lean on. Writes run
//! as a saga ([`saga`]) so every durable step can be undone, and deletes are
//! idempotent so they can be best-effort. What remains unrecoverable
//! (a compensating delete that fails, or a batch that committed on one engine
//! only) is returned to the caller rather than swallowed.

pub mod delete;
pub mod saga;
pub mod sql;
pub mod write;

pub use delete::{
    plan_delete, DeleteCoordinator, DeleteFailure, DeleteOutcome, DeletePlan, DeleteStrategy,
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_DELETE_SPAN, NOTHING_TO_DELETE,
};
pub use saga::{compensation_plan, Compensation, CompensationFailure, Saga, SagaState, Side};
pub use write::{
    SkipReason, SkippedFlight, WriteCoordinator, WriteOutcome, WriteStrategy, DEFAULT_BATCH_SIZE,
};
