//! bridge-core: Shared vocabulary for chatbridge.
//!
//! Provides the supported platforms and their page profiles, the session
//! status state machine, the automation driver traits, and the error
//! taxonomy shared by the server and CLI.

pub mod driver;
pub mod error;
pub mod model;
pub mod platform;
pub mod status;

// Re-export commonly used items at crate root.
pub use driver::{AutomationDriver, DriverFactory};
pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use model::{CredentialArtifact, Item, ItemFilter, ProfileInfo, DEFAULT_ITEM_LIMIT};
pub use platform::{Platform, PlatformProfile, ProfileOverride};
pub use status::{InvalidTransition, SessionStatus};
