//! Browser session lifecycle: construction strategies, fallback, teardown
//!
//! Sessions come in two modes. The listing page sits behind anti-automation
//! checks, so listing sessions try the fingerprint-suppressing strategy
//! first and fall back to the plain one; detail pages are open, so detail
//! sessions try the cheaper plain strategy first. Every launch registers a
//! per-session marker in the shared [`SessionRegistry`] before the session
//! is handed out, which is what makes the spawned Chrome reclaimable by the
//! reaper even when navigation later fails.

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use dashmap::DashSet;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{base_chrome_args, create_browser_config, new_session_marker, stealth_chrome_args};
use crate::{Config, ScrapeError};

/// What a session will be used for; decides the strategy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Listing,
    Detail,
}

/// Concurrent set of per-session process markers.
///
/// Workers insert from many tasks at once; the reaper drains it once after
/// the pool barrier. A marker is the session's unique `--user-data-dir`,
/// visible on the command line of every process the session spawned.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    markers: DashSet<String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, marker: String) {
        self.markers.insert(marker);
    }

    pub fn release(&self, marker: &str) -> bool {
        self.markers.remove(marker).is_some()
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Takes a snapshot of all markers and clears the set.
    pub fn drain(&self) -> Vec<String> {
        let snapshot: Vec<String> = self.markers.iter().map(|m| m.clone()).collect();
        self.markers.clear();
        snapshot
    }
}

/// A live automation handle bound to one Chrome process.
///
/// Exclusively owned by the worker (or the listing stage) that opened it.
#[derive(Debug)]
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    marker: String,
    closed: bool,
}

impl BrowserSession {
    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub async fn open_page(&self, url: &str) -> Result<Page, ScrapeError> {
        self.browser
            .new_page(url)
            .await
            .map_err(|e| ScrapeError::PageError(e.to_string()))
    }

    /// Idempotent teardown. Never propagates: a cleanup failure must not
    /// mask an extraction result already obtained, so it is logged and
    /// left for the reaper.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed for session {}: {}", self.marker, e);
        }
        self.handler.abort();
    }
}

/// One way of constructing a browser session.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    fn name(&self) -> &'static str;

    async fn launch(&self, config: &Config) -> Result<BrowserSession, ScrapeError>;
}

/// Plain automation strategy: standard headless Chrome arguments.
pub struct PlainFactory;

/// Fingerprint-suppressing strategy for pages with automation checks.
pub struct StealthFactory;

async fn launch_with_args(config: &Config, args: Vec<String>, marker: String) -> Result<BrowserSession, ScrapeError> {
    let browser_config = create_browser_config(config, args)
        .map_err(ScrapeError::BrowserLaunchFailed)?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| ScrapeError::BrowserLaunchFailed(e.to_string()))?;

    // The handler is a Stream of CDP events and must be polled for the
    // session to make progress.
    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("CDP handler error: {}", e);
                break;
            }
        }
    });

    Ok(BrowserSession {
        browser,
        handler: handler_task,
        marker,
        closed: false,
    })
}

#[async_trait]
impl SessionFactory for PlainFactory {
    fn name(&self) -> &'static str {
        "plain"
    }

    async fn launch(&self, config: &Config) -> Result<BrowserSession, ScrapeError> {
        let marker = new_session_marker();
        let args = base_chrome_args(config, &marker);
        launch_with_args(config, args, marker).await
    }
}

#[async_trait]
impl SessionFactory for StealthFactory {
    fn name(&self) -> &'static str {
        "stealth"
    }

    async fn launch(&self, config: &Config) -> Result<BrowserSession, ScrapeError> {
        let marker = new_session_marker();
        let args = stealth_chrome_args(config, &marker);
        launch_with_args(config, args, marker).await
    }
}

/// Ordered two-strategy fallback: try the primary, on failure try the
/// secondary, propagate the secondary's failure.
pub struct FallbackFactory {
    primary: Box<dyn SessionFactory>,
    secondary: Box<dyn SessionFactory>,
}

impl FallbackFactory {
    pub fn new(primary: Box<dyn SessionFactory>, secondary: Box<dyn SessionFactory>) -> Self {
        Self { primary, secondary }
    }

    pub async fn launch(&self, config: &Config) -> Result<BrowserSession, ScrapeError> {
        match self.primary.launch(config).await {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!(
                    "{} session launch failed ({}), falling back to {}",
                    self.primary.name(),
                    e,
                    self.secondary.name()
                );
                self.secondary.launch(config).await
            }
        }
    }
}

/// Opens sessions for either mode and registers every spawned process
/// marker with the shared registry.
#[derive(Clone)]
pub struct SessionManager {
    config: Config,
    registry: Arc<SessionRegistry>,
}

impl SessionManager {
    pub fn new(config: Config, registry: Arc<SessionRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub async fn open(&self, mode: SessionMode) -> Result<BrowserSession, ScrapeError> {
        let factory = match mode {
            SessionMode::Listing => {
                FallbackFactory::new(Box::new(StealthFactory), Box::new(PlainFactory))
            }
            SessionMode::Detail => {
                FallbackFactory::new(Box::new(PlainFactory), Box::new(StealthFactory))
            }
        };

        let session = factory.launch(&self.config).await?;

        // Registered before the caller sees the session, so the process is
        // reclaimable even if everything after this point fails.
        self.registry.register(session.marker().to_string());

        Ok(session)
    }
}

/// Navigates with the configured page-load timeout; a slow page fails fast
/// instead of hanging its worker.
pub async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
    tokio::time::timeout(timeout, page.goto(url))
        .await
        .map_err(|_| ScrapeError::Timeout(timeout))?
        .map(|_| ())
        .map_err(|e| ScrapeError::PageError(e.to_string()))
}

/// Polls for a selector until it appears or the wait budget runs out.
pub async fn wait_for_element(
    page: &Page,
    selector: &str,
    wait: Duration,
) -> Result<Element, ScrapeError> {
    tokio::time::timeout(wait, async {
        loop {
            if let Ok(element) = page.find_element(selector).await {
                return element;
            }
            sleep(Duration::from_millis(250)).await;
        }
    })
    .await
    .map_err(|_| ScrapeError::Timeout(wait))
}

/// Like [`wait_for_element`] but resolves once at least one match exists.
pub async fn wait_for_elements(
    page: &Page,
    selector: &str,
    wait: Duration,
) -> Result<Vec<Element>, ScrapeError> {
    tokio::time::timeout(wait, async {
        loop {
            match page.find_elements(selector).await {
                Ok(elements) if !elements.is_empty() => return elements,
                _ => sleep(Duration::from_millis(250)).await,
            }
        }
    })
    .await
    .map_err(|_| ScrapeError::Timeout(wait))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_register_release() {
        let registry = SessionRegistry::new();
        registry.register("/tmp/s-1".into());
        registry.register("/tmp/s-2".into());
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("/tmp/s-1"));

        assert!(registry.release("/tmp/s-1"));
        assert!(!registry.release("/tmp/s-1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_drain_clears_set() {
        let registry = SessionRegistry::new();
        registry.register("/tmp/a".into());
        registry.register("/tmp/b".into());

        let mut drained = registry.drain();
        drained.sort();
        assert_eq!(drained, vec!["/tmp/a".to_string(), "/tmp/b".to_string()]);
        assert!(registry.is_empty());
        assert!(registry.drain().is_empty());
    }

    #[tokio::test]
    async fn registry_concurrent_insertion_loses_nothing() {
        let registry = Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.register(format!("/tmp/s-{i}"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.len(), 32);
    }
}
