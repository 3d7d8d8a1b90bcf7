//! Client-side session control shared by every front end.
//!
//! [`SessionCoordinator`] is a pure state machine: front ends feed it
//! [`SessionEvent`]s and carry out the [`Effect`]s it returns. Timers are
//! effects too, executed either by [`VirtualClock`] (headless runs and tests)
//! or by [`TimerScheduler`] (tokio).

mod clock;
mod coordinator;
mod events;
mod headless;
mod scheduler;
mod score;
mod types;

pub use clock::VirtualClock;
pub use coordinator::SessionCoordinator;
pub use events::{BoardView, Effect, SessionEvent, StatusMessage};
pub use headless::HeadlessSession;
pub use scheduler::TimerScheduler;
pub use score::{Participant, ScoreTally};
pub use types::{Mode, OnlineRoom, Phase, RoomRole, SessionTimings, TimerKind};
