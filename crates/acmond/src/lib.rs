//! Helpers shared across the `acmond` subcommands.

use std::fs;
use std::path::Path;

use acm_balance::AccountBalance;

/// Version baked into the binary: `ACMOND_VERSION` from the build
/// environment when set (release pipelines), the package version
/// otherwise.
pub const DAEMON_VERSION: &str = match option_env!("ACMOND_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

// ---------------------------------------------------------------------------
// PID file handling
// ---------------------------------------------------------------------------

/// The PID recorded at `path`; a missing or mangled file reads as none.
pub fn read_pid_file(path: &Path) -> Option<u32> {
    let raw = fs::read_to_string(path).ok()?;
    raw.trim().parse().ok()
}

/// Record the current process id at `path`.
pub fn write_pid_file(path: &Path) -> anyhow::Result<()> {
    fs::write(path, format!("{}\n", std::process::id()))?;
    Ok(())
}

/// Drop the PID file. Best-effort: a file that is already gone is fine.
pub fn remove_pid_file(path: &Path) {
    let _ = fs::remove_file(path);
}

/// Probe whether `pid` still names a live process.
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

// ---------------------------------------------------------------------------
// Status output
// ---------------------------------------------------------------------------

/// Human-readable age for status lines, e.g. "3m ago".
pub fn humanize_age(age: chrono::Duration) -> String {
    let seconds = age.num_seconds().max(0);
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}

/// Render the cached balance as status lines.
pub fn format_balance_lines(balance: &AccountBalance) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(sub) = &balance.subscription {
        lines.push(format!(
            "Plan {}: {:.3} {} remaining",
            sub.plan_name,
            sub.remaining_amount(),
            sub.unit
        ));
    }
    if let Some(paygo) = &balance.pay_as_you_go {
        lines.push(format!("PAYGO: {}", paygo.formatted()));
    }
    if balance.fetched_via == acm_balance::FetchStrategy::RenderedScrape {
        lines.push("(fetched via page scrape)".to_string());
    }
    lines
}

// ---------------------------------------------------------------------------
// Desktop notifications (optional)
// ---------------------------------------------------------------------------

#[cfg(feature = "desktop-notify")]
pub mod desktop {
    use acm_monitor::Notifier;

    /// Notifier backed by the desktop notification center.
    pub struct DesktopNotifier;

    impl Notifier for DesktopNotifier {
        fn request_permission(&self) -> bool {
            // notify-rust has no permission handshake; sending either
            // works or silently drops on unsupported desktops
            true
        }

        fn send(&self, title: &str, body: &str, category: &str) {
            let result = notify_rust::Notification::new()
                .summary(title)
                .body(body)
                .appname("acmond")
                .show();
            if let Err(e) = result {
                tracing::warn!(category, "desktop notification failed: {e}");
            }
        }

        fn clear_pending(&self) {}

        fn clear_delivered(&self) {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
