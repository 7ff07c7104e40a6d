//! Session management: registry, state tracking, idle reaping.

pub mod reaper;
pub mod registry;

pub use reaper::Reaper;
pub use registry::{SessionRegistry, SessionSummary, StartedSession, StatusReport};
