use std::path::PathBuf;

/// Adapter over the widget timeline host. Implementations only nudge
/// the host to re-read the shared store; the daemon never pushes data
/// into the widget process.
pub trait TimelineReloader: Send + Sync {
    fn reload_all_timelines(&self);
}

/// Touches a marker file the widget host watches. Best-effort: a
/// failed touch only costs the widget one refresh cycle of staleness.
pub struct MarkerFileReloader {
    marker_path: PathBuf,
}

impl MarkerFileReloader {
    pub fn new(marker_path: PathBuf) -> Self {
        Self { marker_path }
    }
}

impl TimelineReloader for MarkerFileReloader {
    fn reload_all_timelines(&self) {
        let stamp = chrono::Utc::now().to_rfc3339();
        if let Err(e) = std::fs::write(&self.marker_path, stamp) {
            tracing::warn!("failed to touch widget reload marker: {e}");
        }
    }
}
