//! Core server: owns the session registry, the reaper, and the HTTP listener.
//!
//! Coordinates the process lifecycle: sessions are reaped while the server
//! runs, and every remaining browser session is released on shutdown.

use crate::api;
use crate::config::ServerConfig;
use crate::driver::WebDriverFactory;
use crate::session::{Reaper, SessionRegistry};
use bridge_core::{BridgeError, BridgeResult, DriverFactory};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// The chatbridge server instance.
pub struct BridgeServer {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
}

impl BridgeServer {
    /// Create a server backed by the configured WebDriver endpoint.
    pub fn new(config: ServerConfig) -> BridgeResult<Self> {
        let factory = Arc::new(WebDriverFactory::new(
            &config.driver,
            config.registry.collaborator_timeout,
        )?);
        info!(webdriver = %config.driver.webdriver_url, headless = config.driver.headless, "using webdriver");
        Ok(Self::with_factory(config, factory))
    }

    /// Create a server with an explicit driver factory.
    pub fn with_factory(config: ServerConfig, factory: Arc<dyn DriverFactory>) -> Self {
        let registry = Arc::new(SessionRegistry::new(factory, config.registry.clone()));
        Self { config, registry }
    }

    #[cfg(test)]
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Serve until `shutdown` resolves, then stop reaping and close every session.
    pub async fn run<F>(self, shutdown: F) -> BridgeResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| BridgeError::Other(format!("bind {} failed: {e}", self.config.listen_addr)))?;
        let local_addr = listener.local_addr()?;

        let reaper = Reaper::spawn(self.registry.clone(), self.config.reap_interval);

        info!(
            addr = %local_addr,
            max_sessions = self.config.registry.max_sessions,
            idle_timeout_secs = self.config.registry.idle_timeout.as_secs(),
            "bridge-server ready"
        );

        let served = axum::serve(listener, api::router(self.registry.clone()))
            .with_graceful_shutdown(shutdown)
            .await;

        reaper.stop().await;
        let closed = self.registry.close_all().await;
        info!(closed, "all sessions released");

        served.map_err(|e| BridgeError::Other(format!("http server error: {e}")))
    }
}
