use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_core::{AutomationDriver, BridgeError, BridgeResult, DriverFactory, Platform};

/// Scripted page state shared between a test and every driver it launches.
#[derive(Default)]
pub struct MockPage {
    present: Mutex<HashSet<String>>,
    texts: Mutex<HashMap<String, Vec<String>>>,
    delay: Mutex<Duration>,
    launch_delay: Mutex<Duration>,
    active: AtomicUsize,
    pub calls: AtomicUsize,
    pub overlaps: AtomicUsize,
    pub launches: AtomicUsize,
    pub disposes: AtomicUsize,
    pub fail_launch: AtomicBool,
    pub fail_open: AtomicBool,
    /// `wait_for_element` fails as if the page crashed.
    pub fail_probe: AtomicBool,
    /// `read_texts` fails as if the page crashed.
    pub fail_read: AtomicBool,
}

impl MockPage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `selector` appear on the page.
    pub fn show(&self, selector: &str) {
        self.present.lock().unwrap().insert(selector.to_string());
    }

    pub fn set_texts(&self, selector: &str, texts: &[&str]) {
        self.texts.lock().unwrap().insert(
            selector.to_string(),
            texts.iter().map(|t| t.to_string()).collect(),
        );
        self.show(selector);
    }

    /// Delay applied to every driver call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Delay before a launched driver is handed back.
    pub fn set_launch_delay(&self, delay: Duration) {
        *self.launch_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn disposes(&self) -> usize {
        self.disposes.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn has(&self, selector: &str) -> bool {
        self.present.lock().unwrap().contains(selector)
    }

    async fn enter(&self) -> CallGuard<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let guard = CallGuard { page: self };
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        guard
    }
}

struct CallGuard<'a> {
    page: &'a MockPage,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.page.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockFactory {
    page: Arc<MockPage>,
}

impl MockFactory {
    pub fn new(page: Arc<MockPage>) -> Self {
        Self { page }
    }
}

#[async_trait]
impl DriverFactory for MockFactory {
    async fn launch(&self, _platform: Platform) -> BridgeResult<Box<dyn AutomationDriver>> {
        if self.page.fail_launch.load(Ordering::SeqCst) {
            return Err(BridgeError::Driver("browser binary not found".into()));
        }
        let delay = *self.page.launch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.page.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDriver {
            page: self.page.clone(),
        }))
    }
}

pub struct MockDriver {
    page: Arc<MockPage>,
}

#[async_trait]
impl AutomationDriver for MockDriver {
    async fn open_target_site(&mut self, url: &str) -> BridgeResult<()> {
        let _call = self.page.enter().await;
        if self.page.fail_open.load(Ordering::SeqCst) {
            return Err(BridgeError::Driver(format!("net::ERR_NAME_NOT_RESOLVED at {url}")));
        }
        Ok(())
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> BridgeResult<()> {
        let _call = self.page.enter().await;
        if self.page.fail_probe.load(Ordering::SeqCst) {
            return Err(BridgeError::Driver("target closed".into()));
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.has(selector) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BridgeError::CollaboratorTimeout(format!("waiting for {selector}")));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn capture_element(&mut self, selector: &str) -> BridgeResult<Vec<u8>> {
        let _call = self.page.enter().await;
        if self.page.has(selector) {
            Ok(b"\x89PNG\r\n\x1a\nmock".to_vec())
        } else {
            Err(BridgeError::Driver(format!("no such element: {selector}")))
        }
    }

    async fn read_text(&mut self, selector: &str) -> BridgeResult<String> {
        let _call = self.page.enter().await;
        self.page
            .texts
            .lock()
            .unwrap()
            .get(selector)
            .and_then(|t| t.first().cloned())
            .ok_or_else(|| BridgeError::Driver(format!("no such element: {selector}")))
    }

    async fn read_texts(&mut self, selector: &str, limit: usize) -> BridgeResult<Vec<String>> {
        let _call = self.page.enter().await;
        if self.page.fail_read.load(Ordering::SeqCst) {
            return Err(BridgeError::Driver("stale element reference".into()));
        }
        Ok(self
            .page
            .texts
            .lock()
            .unwrap()
            .get(selector)
            .map(|t| t.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn dispose(&mut self) -> BridgeResult<()> {
        let _call = self.page.enter().await;
        self.page.disposes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
