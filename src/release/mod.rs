//! End-to-end release orchestration

pub mod machine;
pub mod options;
pub mod state;

pub use machine::{
    run_release, Collaborators, ReleaseMachine, ReleaseOutcome, ReleaseReport, ReleaseRun,
};
pub use options::ReleaseOptions;
pub use state::{Action, ReleaseState, TransitionTable};
