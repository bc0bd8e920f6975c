//! Configuration management with serde serialization/deserialization
//!
//! Runtime knobs for the scraper: worker bound, browser timeouts, portal
//! base URLs, and the Chrome argument profiles used by the two session
//! construction strategies.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Main configuration structure for the scraper
///
/// # Examples
///
/// ```rust
/// use sekolah_scraper::Config;
///
/// let config = Config {
///     workers: 8,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Bound on concurrent detail workers (default: 12)
    ///
    /// Each worker owns an entire Chrome process for the duration of its
    /// task, so this bound is what keeps memory and file descriptors flat.
    pub workers: usize,

    /// Run Chrome headless (default: true)
    pub headless: bool,

    /// Page-load timeout for every browser session (default: 12 s)
    pub page_load_timeout: Duration,

    /// Element-wait timeout for rendered DOM lookups (default: 12 s)
    pub element_wait_timeout: Duration,

    /// Browser window size (default: 1600x900)
    pub window_width: u32,
    pub window_height: u32,

    /// Listing-page base URL; region code and level are appended
    pub listing_base_url: String,

    /// Profile-page base URL; the resolved profile id is appended
    pub profile_base_url: String,

    /// Connection pool size for the plain HTTP client (default: 50)
    pub http_pool_size: usize,

    /// Transport-level retries for the plain HTTP client (default: 2)
    ///
    /// HTTP error statuses are never retried; only connect/transport
    /// failures are.
    pub http_retries: usize,

    /// User-Agent for plain HTTP requests
    pub user_agent: String,

    /// Row cap for the preview API route (default: 2000)
    pub preview_limit: usize,

    /// Path to the region registry JSON file
    pub registry_path: String,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 12,
            headless: true,
            page_load_timeout: Duration::from_secs(12),
            element_wait_timeout: Duration::from_secs(12),
            window_width: 1600,
            window_height: 900,
            listing_base_url: "https://referensi.data.kemendikdasmen.go.id/pendidikan/dikdas"
                .to_string(),
            profile_base_url: "https://sekolah.data.kemendikdasmen.go.id/profil-sekolah"
                .to_string(),
            http_pool_size: 50,
            http_retries: 2,
            user_agent: "Mozilla/5.0".to_string(),
            preview_limit: 2000,
            registry_path: "data/kecamatan_kab_semarang.json".to_string(),
            chrome_path: None,
        }
    }
}

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Produces a command-line marker unique to one browser session.
///
/// The marker doubles as the session's `--user-data-dir`, which avoids
/// Chrome singleton conflicts between concurrent workers and lets the
/// process reaper identify exactly the processes this run spawned.
pub fn new_session_marker() -> String {
    let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("/tmp/sekolah-scraper-{}-{}", std::process::id(), seq)
}

/// Chrome arguments shared by both session strategies.
pub fn base_chrome_args(config: &Config, marker: &str) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--blink-settings=imagesEnabled=false".to_string(),
        "--log-level=3".to_string(),
        "--no-first-run".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        ),
        format!("--user-data-dir={marker}"),
    ];

    if config.headless {
        args.push("--headless=new".to_string());
    }

    args
}

/// Arguments for the fingerprint-suppressing (stealth) strategy.
pub fn stealth_chrome_args(config: &Config, marker: &str) -> Vec<String> {
    let mut args = base_chrome_args(config, marker);
    args.push("--disable-blink-features=AutomationControlled".to_string());
    args.push("--disable-infobars".to_string());
    args
}

pub fn create_browser_config(
    config: &Config,
    args: Vec<String>,
) -> Result<chromiumoxide::browser::BrowserConfig, String> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(config.window_width, config.window_height)
        .request_timeout(config.page_load_timeout)
        .args(args);

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build()
}
