//! Browser automation collaborator traits.
//!
//! The registry never talks to a browser directly. It holds one
//! [`AutomationDriver`] per session, created by a [`DriverFactory`].
//! Implementations are not expected to be safe for concurrent use; the
//! registry serializes every call on a given driver.

use crate::error::BridgeResult;
use crate::platform::Platform;
use async_trait::async_trait;
use std::time::Duration;

/// One automated browser page.
#[async_trait]
pub trait AutomationDriver: Send {
    /// Navigate to `url`, returning once the page has loaded.
    async fn open_target_site(&mut self, url: &str) -> BridgeResult<()>;

    /// Wait until an element matching `selector` is present.
    ///
    /// Fails with [`BridgeError::CollaboratorTimeout`](crate::BridgeError::CollaboratorTimeout)
    /// when `timeout` elapses first.
    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> BridgeResult<()>;

    /// Render the first element matching `selector` as PNG bytes.
    async fn capture_element(&mut self, selector: &str) -> BridgeResult<Vec<u8>>;

    /// Visible text of the first element matching `selector`.
    async fn read_text(&mut self, selector: &str) -> BridgeResult<String>;

    /// Visible text of up to `limit` elements matching `selector`, in page order.
    async fn read_texts(&mut self, selector: &str, limit: usize) -> BridgeResult<Vec<String>>;

    /// Release every underlying resource. Calling it twice is a no-op.
    async fn dispose(&mut self) -> BridgeResult<()>;
}

/// Creates drivers for new sessions.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self, platform: Platform) -> BridgeResult<Box<dyn AutomationDriver>>;
}
