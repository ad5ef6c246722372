// ==========================================
// College ERP - Engine layer
// ==========================================
// Business rules only. Engines never build SQL; callers gather facts
// from repositories and persist the outcome.
// ==========================================

pub mod aggregation;
pub mod lifecycle;
pub mod lockout;
pub mod rollover;

pub use lifecycle::{
    LifecycleFacts, SubjectLifecycle, Transition, TransitionChecks, TransitionValidation,
    TRANSITIONS,
};
pub use lockout::{FailureOutcome, LockoutPolicy};
pub use rollover::{RolloverEngine, RolloverRejection, RolloverStep};
