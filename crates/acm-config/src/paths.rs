use std::path::{Path, PathBuf};

/// Resolves every file the daemon touches against one base directory:
/// `~/.acmon` in production, an isolated temp directory in tests.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    base: PathBuf,
}

impl ConfigPaths {
    /// Paths rooted under `~/.acmon`. Fails when no home directory can
    /// be resolved for the current user.
    pub fn new() -> anyhow::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("no home directory"))?;
        Ok(Self::with_base(home.join(".acmon")))
    }

    /// Root the paths somewhere else entirely.
    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    /// The shared balance store read by every display surface.
    pub fn store_path(&self) -> PathBuf {
        self.base.join("shared.db")
    }

    /// Directory holding the credential vault records.
    pub fn vault_dir(&self) -> PathBuf {
        self.base.join("vault")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.base.join("acmond.pid")
    }

    /// Marker file touched whenever widget surfaces should re-read the store.
    pub fn reload_marker_path(&self) -> PathBuf {
        self.base.join("widget.reload")
    }

    /// Create the base directory when it is missing.
    pub fn ensure_config_dir(&self) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.base)?;
        Ok(self.base.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_file_lives_under_the_base() {
        let base = PathBuf::from("/var/lib/acmon");
        let paths = ConfigPaths::with_base(base.clone());

        assert_eq!(paths.config_dir(), base.as_path());
        assert_eq!(paths.config_path(), base.join("config.toml"));
        assert_eq!(paths.store_path(), base.join("shared.db"));
        assert_eq!(paths.vault_dir(), base.join("vault"));
        assert_eq!(paths.pid_path(), base.join("acmond.pid"));
        assert_eq!(paths.reload_marker_path(), base.join("widget.reload"));
    }

    #[test]
    fn ensure_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("deep").join("base");
        let paths = ConfigPaths::with_base(base.clone());

        assert_eq!(paths.ensure_config_dir().unwrap(), base);
        assert!(base.is_dir());
        // calling again on an existing directory changes nothing
        paths.ensure_config_dir().unwrap();
    }

    #[test]
    fn default_base_is_dot_acmon_under_home() {
        let paths = ConfigPaths::new().unwrap();
        assert!(paths.config_dir().ends_with(".acmon"));
    }
}
