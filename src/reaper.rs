//! Post-pass browser process reaping
//!
//! Chrome occasionally outlives its session handle (a teardown that failed,
//! a worker that timed out mid-navigation). After the pool drains, the
//! tracked-set strategy scans live processes once and terminates exactly
//! those whose command line carries a marker this run registered. The
//! orphan scan is a coarser system-wide fallback and is never run by
//! default, because it can touch processes of unrelated invocations.

use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, info};

use crate::session::SessionRegistry;

const BROWSER_NAMES: [&str; 4] = ["chrome", "chromium", "chromium-browser", "chromedriver"];

/// Tracked-set strategy: terminate every still-running process whose
/// command line contains a registered session marker, and clear the set.
///
/// Never touches a process without a registered marker. A process that is
/// already gone is a non-error. Returns the number of processes killed.
pub fn reap_tracked(registry: &SessionRegistry) -> usize {
    let markers = registry.drain();
    if markers.is_empty() {
        return 0;
    }

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let mut killed = 0;
    for process in sys.processes().values() {
        let cmd_line = process
            .cmd()
            .iter()
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        if markers.iter().any(|marker| cmd_line.contains(marker.as_str())) && process.kill() {
            killed += 1;
        }
    }

    if killed > 0 {
        info!(
            "Reaped {} leaked browser process(es) across {} tracked session(s)",
            killed,
            markers.len()
        );
    } else {
        debug!("No leaked processes among {} tracked session(s)", markers.len());
    }
    killed
}

/// Orphan-scan fallback: terminate browser-named processes whose parent is
/// gone. Global, so only for use when the tracked set is unavailable.
pub fn reap_orphans() -> usize {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let mut killed = 0;
    for process in sys.processes().values() {
        let name = process.name().to_string_lossy().to_lowercase();
        let is_browser = BROWSER_NAMES
            .iter()
            .any(|target| name == *target || name == format!("{target}.exe"));
        if !is_browser {
            continue;
        }

        let parent_alive = process
            .parent()
            .map(|ppid| sys.process(ppid).is_some())
            .unwrap_or(false);
        if parent_alive {
            continue;
        }

        if process.kill() {
            info!("Killed orphaned {} (pid {})", name, process.pid());
            killed += 1;
        }
    }
    killed
}
