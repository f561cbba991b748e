// src/launcher.rs
//
// Desktop process management for the auto-launch feature: detect whether
// Joplin is running, start it detached if not, and wait for its Web Clipper
// API to answer.
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

/// Upper bound on the process-table inspection.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Per-probe timeout for a single /ping request.
const PING_TIMEOUT: Duration = Duration::from_secs(2);
/// Interval between API readiness checks.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Max wait for Joplin to become ready (AppImage cold start can be slow).
pub const ENSURE_RUNNING_TIMEOUT: Duration = Duration::from_secs(25);

/// Flatpak application id of the Joplin desktop package.
const FLATPAK_APP_ID: &str = "net.cozic.joplin_desktop";

/// Seam between the API client and the host desktop. The production
/// implementation shells out and spawns processes; tests substitute a
/// recording fake.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    /// Whether the Joplin desktop process is currently running. Must not
    /// fail: any inspection problem reads as "not running".
    async fn is_running(&self) -> bool;

    /// Issue a launch command. True means a command was started, not that
    /// the application became ready.
    fn launch(&self) -> bool;
}

#[derive(Debug, Default, Clone)]
pub struct DesktopLauncher;

#[async_trait]
impl AppLauncher for DesktopLauncher {
    async fn is_running(&self) -> bool {
        let mut probe = tokio::process::Command::new("pgrep");
        probe
            .args(["-f", "joplin"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match tokio::time::timeout(PROBE_TIMEOUT, probe.status()).await {
            Ok(Ok(status)) => status.success(),
            // pgrep missing, permission denied, or probe timed out.
            _ => false,
        }
    }

    fn launch(&self) -> bool {
        for candidate in candidate_commands() {
            let Some(resolved) = resolve_executable(&candidate) else {
                continue;
            };
            debug!(command = %resolved.display(), "Launching Joplin");
            if spawn_detached(&resolved, &[]) {
                return true;
            }
        }

        // Fall back to the flatpak distribution.
        if let Some(flatpak) = resolve_executable(Path::new("flatpak")) {
            debug!("Launching Joplin via flatpak");
            return spawn_detached(&flatpak, &["run", FLATPAK_APP_ID]);
        }

        false
    }
}

/// Known Joplin install locations, most common first.
fn candidate_commands() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        // Default AppImage location
        candidates.push(home.join(".joplin").join("Joplin.AppImage"));
    }
    candidates.push(PathBuf::from("joplin-desktop")); // Standard Linux package
    candidates.push(PathBuf::from("joplin")); // Alternative name
    candidates.push(PathBuf::from("/usr/bin/joplin-desktop"));
    candidates.push(PathBuf::from("/usr/bin/joplin"));
    candidates.push(PathBuf::from("/snap/bin/joplin-desktop")); // Snap package
    candidates.push(PathBuf::from("/opt/Joplin/joplin")); // Manual AppImage install
    candidates
}

/// Resolve a candidate to an existing file, searching PATH for bare names.
fn resolve_executable(command: &Path) -> Option<PathBuf> {
    if command.components().count() > 1 {
        return command.is_file().then(|| command.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(command))
        .find(|candidate| candidate.is_file())
}

/// Display variables a GUI app needs when launched from a headless parent.
fn launch_env() -> Vec<(&'static str, String)> {
    let mut vars = Vec::new();
    if std::env::var_os("DISPLAY").is_none() {
        vars.push(("DISPLAY", ":0".to_string())); // Default X11 display
    }
    if std::env::var_os("WAYLAND_DISPLAY").is_none()
        && Path::new("/run/user/1000/wayland-0").exists()
    {
        vars.push(("WAYLAND_DISPLAY", "wayland-0".to_string()));
    }
    vars
}

/// Spawn in its own process group with detached stdio so the app outlives
/// this server.
fn spawn_detached(program: &Path, args: &[&str]) -> bool {
    let mut command = std::process::Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    for (key, value) in launch_env() {
        command.env(key, value);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.spawn().is_ok()
}

/// Poll the Web Clipper /ping endpoint until it answers or `timeout`
/// elapses. Errors during polling (including connection refused while the
/// app is still starting) just count as "not yet ready"; only the deadline
/// ends the loop.
pub async fn wait_api_ready(base_url: &str, token: &str, timeout: Duration) -> bool {
    let client = reqwest::Client::new();
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        let ping = client
            .get(format!("{}/ping", base_url))
            .query(&[("token", token)])
            .timeout(PING_TIMEOUT)
            .send()
            .await;
        if let Ok(response) = ping {
            if response.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }

    false
}
