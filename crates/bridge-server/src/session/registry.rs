//! Session lifecycle management.
//!
//! Tracks every automation session, drives each one through the login
//! state machine, and tears sessions down on close or idle eviction.
//!
//! Two kinds of locks are involved. The session map sits behind a short-lived
//! `RwLock` that is never held across a driver call. Each session owns its
//! driver behind a `tokio::sync::Mutex`, so calls against one browser are
//! serialized while other sessions stay responsive.

use crate::config::RegistryConfig;
use bridge_core::{
    AutomationDriver, BridgeError, BridgeResult, CredentialArtifact, DriverFactory, Item,
    ItemFilter, Platform, PlatformProfile, ProfileInfo, SessionStatus,
};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

type DriverSlot = Option<Box<dyn AutomationDriver>>;

/// Mutable bookkeeping that never requires the driver lock.
struct SessionMeta {
    status: SessionStatus,
    last_activity: Instant,
    profile: Option<ProfileInfo>,
    last_error: Option<String>,
}

/// One automation session.
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Platform being linked.
    pub platform: Platform,
    /// Wall-clock creation time.
    pub created_at: SystemTime,
    page: PlatformProfile,
    meta: StdMutex<SessionMeta>,
    /// `None` once the session has been torn down.
    driver: Arc<Mutex<DriverSlot>>,
}

impl Session {
    fn new(id: String, platform: Platform, page: PlatformProfile, driver: Box<dyn AutomationDriver>) -> Self {
        Self {
            id,
            platform,
            created_at: SystemTime::now(),
            page,
            meta: StdMutex::new(SessionMeta {
                status: SessionStatus::Launching,
                last_activity: Instant::now(),
                profile: None,
                last_error: None,
            }),
            driver: Arc::new(Mutex::new(Some(driver))),
        }
    }

    fn meta(&self) -> StdMutexGuard<'_, SessionMeta> {
        self.meta.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> SessionStatus {
        self.meta().status
    }

    /// Refresh the activity timestamp.
    pub fn touch(&self) {
        let now = Instant::now();
        let mut meta = self.meta();
        if now > meta.last_activity {
            meta.last_activity = now;
        }
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.meta().last_activity)
    }

    /// Apply a status change, ignoring it if the state machine forbids it.
    fn advance(&self, next: SessionStatus) -> bool {
        let mut meta = self.meta();
        match meta.status.advance(next) {
            Ok(_) => {
                debug!(session_id = %self.id, status = %next, "status advanced");
                true
            }
            Err(e) => {
                debug!(session_id = %self.id, error = %e, "status change ignored");
                false
            }
        }
    }

    fn connect(&self, profile: ProfileInfo) -> bool {
        let mut meta = self.meta();
        if meta.status.advance(SessionStatus::Connected).is_ok() {
            meta.profile = Some(profile);
            true
        } else {
            false
        }
    }

    fn fail(&self, err: &BridgeError) {
        let mut meta = self.meta();
        if meta.status.advance(SessionStatus::Error).is_ok() {
            meta.last_error = Some(err.to_string());
        }
    }

    fn report(&self) -> StatusReport {
        let meta = self.meta();
        StatusReport {
            session_id: self.id.clone(),
            platform: self.platform,
            status: meta.status,
            connected: meta.status.is_connected(),
            profile_info: meta.profile.clone(),
            error: meta.last_error.clone(),
        }
    }

    fn summary(&self, now: Instant, idle_timeout: Duration) -> SessionSummary {
        let meta = self.meta();
        let idle = now.saturating_duration_since(meta.last_activity);
        SessionSummary {
            id: self.id.clone(),
            platform: self.platform,
            status: meta.status,
            created_at: self
                .created_at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            idle_secs: idle.as_secs(),
            active: idle <= idle_timeout,
            profile_info: meta.profile.clone(),
        }
    }
}

/// Result of a successful `start`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedSession {
    pub session_id: String,
    pub platform: Platform,
    pub status: SessionStatus,
    pub instructions: Vec<String>,
}

/// Current state of one session, as returned by `poll_status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub session_id: String,
    pub platform: Platform,
    pub status: SessionStatus,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_info: Option<ProfileInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Information returned when listing sessions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub platform: Platform,
    pub status: SessionStatus,
    /// Unix seconds.
    pub created_at: u64,
    pub idle_secs: u64,
    /// Last activity within the idle window.
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_info: Option<ProfileInfo>,
}

/// Owns every live session.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    factory: Arc<dyn DriverFactory>,
    config: RegistryConfig,
    next_seq: AtomicU64,
}

impl SessionRegistry {
    pub fn new(factory: Arc<dyn DriverFactory>, config: RegistryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
            config,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Launch a driver for `platform` and begin navigating in the background.
    ///
    /// Returns as soon as the driver exists; login progress is observed
    /// through [`poll_status`](Self::poll_status).
    pub async fn start(&self, platform: Platform) -> BridgeResult<StartedSession> {
        if self.count().await >= self.config.max_sessions {
            return Err(BridgeError::LaunchFailure(format!(
                "max sessions ({}) reached",
                self.config.max_sessions
            )));
        }

        let launch_timeout = self.config.collaborator_timeout;
        let factory = self.factory.clone();
        let mut launch = tokio::spawn(async move { factory.launch(platform).await });
        let launched = tokio::time::timeout(launch_timeout, &mut launch).await;
        let mut driver = match launched {
            Ok(Ok(Ok(driver))) => driver,
            Ok(Ok(Err(e))) => {
                warn!(platform = %platform, error = %e, "driver launch failed");
                return Err(BridgeError::LaunchFailure(e.to_string()));
            }
            Ok(Err(e)) => {
                warn!(platform = %platform, error = %e, "driver launch task failed");
                return Err(BridgeError::LaunchFailure(e.to_string()));
            }
            Err(_) => {
                warn!(platform = %platform, "driver launch timed out");
                // A browser that finishes starting after the deadline is released.
                tokio::spawn(async move {
                    if let Ok(Ok(mut driver)) = launch.await {
                        release(&mut driver, "-", platform, launch_timeout).await;
                    }
                });
                return Err(BridgeError::LaunchFailure(format!(
                    "launch driver exceeded {}ms",
                    launch_timeout.as_millis()
                )));
            }
        };

        let session_id = generate_session_id(platform, self.next_seq.fetch_add(1, Ordering::Relaxed));
        let page = self.config.profile(platform);
        let instructions = page.instructions.clone();

        {
            let mut sessions = self.sessions.write().await;
            if sessions.len() >= self.config.max_sessions {
                drop(sessions);
                release(&mut driver, &session_id, platform, launch_timeout).await;
                return Err(BridgeError::LaunchFailure(format!(
                    "max sessions ({}) reached",
                    self.config.max_sessions
                )));
            }
            let session = Arc::new(Session::new(session_id.clone(), platform, page, driver));
            // Taken before the session is visible so navigation runs first.
            let guard = session.driver.clone().lock_owned().await;
            sessions.insert(session_id.clone(), session.clone());
            tokio::spawn(navigate(session, guard, launch_timeout));
        }

        info!(session_id = %session_id, platform = %platform, "session created");

        Ok(StartedSession {
            session_id,
            platform,
            status: SessionStatus::Launching,
            instructions,
        })
    }

    /// Render the current login prompt, along with the status it was captured in.
    pub async fn credential_artifact(
        &self,
        id: &str,
    ) -> BridgeResult<(CredentialArtifact, SessionStatus)> {
        let session = self.get(id).await?;
        session.touch();

        let status = session.status();
        if !status.expects_credential() {
            return Err(BridgeError::NotReady(format!(
                "session {id} is {status}, no credential to show"
            )));
        }

        let Ok(mut guard) = tokio::time::timeout(self.config.probe_timeout, session.driver.lock()).await else {
            return Err(BridgeError::NotReady(format!("session {id} is busy, retry shortly")));
        };
        let driver = guard
            .as_mut()
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;

        match bounded(
            self.config.collaborator_timeout,
            "capture credential",
            driver.capture_element(&session.page.credential),
        )
        .await
        {
            Ok(data) => Ok((CredentialArtifact::png(data), session.status())),
            Err(e) => {
                debug!(session_id = %id, platform = %session.platform, error = %e, "credential not capturable");
                Err(BridgeError::NotReady(format!("credential for {id} not rendered yet")))
            }
        }
    }

    /// Re-check the authenticated marker and report the session's status.
    pub async fn poll_status(&self, id: &str) -> BridgeResult<StatusReport> {
        let session = self.get(id).await?;
        session.touch();

        if session.status() == SessionStatus::AwaitingCredential {
            // A long navigation step may hold the driver; report the cached status then.
            if let Ok(mut guard) =
                tokio::time::timeout(self.config.probe_timeout, session.driver.lock()).await
            {
                let driver = guard
                    .as_mut()
                    .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;
                if session.status() == SessionStatus::AwaitingCredential {
                    self.probe_login(&session, &mut **driver).await;
                }
            }
        }

        let report = session.report();
        if report.status == SessionStatus::Closed {
            return Err(BridgeError::NotFound(id.to_string()));
        }
        Ok(report)
    }

    async fn probe_login(&self, session: &Session, driver: &mut dyn AutomationDriver) {
        let probe = self.config.probe_timeout;
        let marker = bounded(
            probe,
            "authenticated marker",
            driver.wait_for_element(&session.page.authenticated, probe),
        )
        .await;

        match marker {
            Ok(()) => {
                let display_name = match bounded(probe, "profile name", driver.read_text(&session.page.profile_name)).await {
                    Ok(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
                    Ok(_) => None,
                    Err(e) => {
                        debug!(session_id = %session.id, error = %e, "profile name unavailable");
                        None
                    }
                };
                if session.connect(ProfileInfo { display_name }) {
                    info!(session_id = %session.id, platform = %session.platform, "session connected");
                }
            }
            Err(e) if e.is_timeout() => {}
            Err(e) => {
                warn!(session_id = %session.id, platform = %session.platform, error = %e, "login probe failed");
                session.fail(&e);
            }
        }
    }

    /// Recent conversations from a connected session.
    pub async fn fetch_recent(&self, id: &str, filter: &ItemFilter) -> BridgeResult<Vec<Item>> {
        let session = self.get(id).await?;
        session.touch();
        ensure_connected(&session)?;

        let timeout = self.config.collaborator_timeout;
        let Ok(mut guard) = tokio::time::timeout(timeout, session.driver.lock()).await else {
            return Err(BridgeError::CollaboratorTimeout(format!("session {id} stayed busy")));
        };
        let driver = guard
            .as_mut()
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;
        ensure_connected(&session)?;

        let ceiling = self.config.fetch_limit;
        let wanted = if filter.query.is_some() {
            ceiling
        } else {
            filter.effective_limit(ceiling)
        };

        match bounded(timeout, "read recent items", driver.read_texts(&session.page.item, wanted)).await {
            Ok(texts) => Ok(filter.apply(&texts, ceiling)),
            Err(e) if e.is_timeout() => {
                warn!(session_id = %id, platform = %session.platform, error = %e, "reading items timed out");
                Err(e)
            }
            Err(e) => {
                warn!(session_id = %id, platform = %session.platform, error = %e, "reading items failed");
                session.fail(&e);
                Err(BridgeError::NotConnected(format!("session {id} failed: {e}")))
            }
        }
    }

    /// Tear down a session and forget it.
    pub async fn close(&self, id: &str) -> BridgeResult<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;
        info!(session_id = %id, platform = %session.platform, "session closed");
        teardown(&session, self.config.collaborator_timeout).await;
        Ok(())
    }

    /// Evict sessions idle for longer than the configured timeout.
    ///
    /// Returns the IDs of sessions that were removed.
    pub async fn reap(&self) -> Vec<String> {
        let idle_timeout = self.config.idle_timeout;
        let expired: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write().await;
            let now = Instant::now();
            let ids: Vec<String> = sessions
                .values()
                .filter(|s| s.idle_for(now) > idle_timeout)
                .map(|s| s.id.clone())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        let mut removed = Vec::with_capacity(expired.len());
        for session in expired {
            warn!(
                session_id = %session.id,
                platform = %session.platform,
                idle_secs = session.idle_for(Instant::now()).as_secs(),
                "session expired (idle)"
            );
            teardown(&session, self.config.collaborator_timeout).await;
            removed.push(session.id.clone());
        }

        if !removed.is_empty() {
            debug!(count = removed.len(), "reaper removed sessions");
        }
        removed
    }

    /// Tear down every session. Used on shutdown.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<Arc<Session>> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in &drained {
            teardown(session, self.config.collaborator_timeout).await;
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "closed all sessions");
        }
        drained.len()
    }

    /// Snapshot of all sessions.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let now = Instant::now();
        let mut out: Vec<SessionSummary> = sessions
            .values()
            .map(|s| s.summary(now, self.config.idle_timeout))
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Get the number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn get(&self, id: &str) -> BridgeResult<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))
    }
}

fn ensure_connected(session: &Session) -> BridgeResult<()> {
    let status = session.status();
    if status.is_connected() {
        Ok(())
    } else {
        Err(BridgeError::NotConnected(format!(
            "session {} is {status}",
            session.id
        )))
    }
}

/// Open the target site and wait for the login prompt.
async fn navigate(session: Arc<Session>, mut guard: OwnedMutexGuard<DriverSlot>, timeout: Duration) {
    let Some(driver) = guard.as_mut() else {
        return;
    };

    let opened = bounded(timeout, "open target site", driver.open_target_site(&session.page.url)).await;
    if let Err(e) = opened {
        warn!(session_id = %session.id, platform = %session.platform, error = %e, "navigation failed");
        session.fail(&e);
        return;
    }
    session.advance(SessionStatus::Navigating);

    let prompt = bounded(
        timeout,
        "wait for login prompt",
        driver.wait_for_element(&session.page.login_prompt, timeout),
    )
    .await;
    match prompt {
        Ok(()) => {
            if session.advance(SessionStatus::AwaitingCredential) {
                info!(session_id = %session.id, platform = %session.platform, "awaiting credential");
            }
        }
        Err(e) => {
            warn!(session_id = %session.id, platform = %session.platform, error = %e, "login prompt never appeared");
            session.fail(&e);
        }
    }
}

/// Mark a removed session closed and release its driver once no call is in flight.
async fn teardown(session: &Session, timeout: Duration) {
    session.advance(SessionStatus::Closed);
    let mut guard = session.driver.lock().await;
    if let Some(mut driver) = guard.take() {
        release(&mut driver, &session.id, session.platform, timeout).await;
    }
}

async fn release(driver: &mut Box<dyn AutomationDriver>, id: &str, platform: Platform, timeout: Duration) {
    if let Err(e) = bounded(timeout, "dispose driver", driver.dispose()).await {
        warn!(session_id = %id, platform = %platform, error = %e, "failed to dispose driver");
    }
}

/// Run a collaborator call with an upper bound on its duration.
async fn bounded<T, F>(limit: Duration, what: &str, fut: F) -> BridgeResult<T>
where
    F: Future<Output = BridgeResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::CollaboratorTimeout(format!(
            "{what} exceeded {}ms",
            limit.as_millis()
        ))),
    }
}

/// Generate a session ID: platform prefix, process-unique sequence, random suffix.
fn generate_session_id(platform: Platform, seq: u64) -> String {
    use rand::Rng;
    let suffix: [u8; 4] = rand::thread_rng().gen();
    format!("{}-{seq}-{}", platform.id_prefix(), hex::encode(suffix))
}
