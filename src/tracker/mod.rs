mod machine;
pub mod scheduler;
mod session;

pub use machine::{PollPolicy, Request, Tracker};
pub use scheduler::{TimerTick, TokioScheduler};
pub use session::{Failure, FailureKind, Session, TrackerState};
