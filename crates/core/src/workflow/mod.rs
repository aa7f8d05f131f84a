pub mod engine;
pub mod lanes;
pub mod queue;

pub use engine::{
    check_precondition, transition, DecisionAction, DecisionError, TransitionOutcome,
    WorkflowEngine,
};
pub use lanes::{resolve_lane, Lane, OrgDirectory, PositionRole};
pub use queue::{AwaitedState, PendingFilter};
