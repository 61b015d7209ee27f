use serde::{Deserialize, Serialize};

use crate::paths::ConfigPaths;

fn default_base_url() -> String {
    "https://www.aicodemirror.com".to_string()
}

fn default_page_load_timeout_secs() -> u64 {
    20
}

fn default_marker_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_settle_delay_ms() -> u64 {
    1000
}

/// Which fetch strategy the balance fetcher should use.
///
/// `Auto` tries the lightweight wallet API first and falls back to the
/// rendered-page scrape only when the API contract looks broken. The
/// explicit variants pin a single strategy, which is mainly useful when
/// the upstream API has been observed failing for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreference {
    Auto,
    Api,
    Scrape,
}

impl Default for StrategyPreference {
    fn default() -> Self {
        StrategyPreference::Auto
    }
}

/// Tuning knobs for the rendered-page scrape strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Hard limit on waiting for the dashboard page to finish loading.
    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,
    /// Limit on waiting for balance text markers to appear. Non-fatal:
    /// extraction is still attempted after this elapses.
    #[serde(default = "default_marker_timeout_secs")]
    pub marker_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Extra delay after markers appear, before extracting.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            page_load_timeout_secs: default_page_load_timeout_secs(),
            marker_timeout_secs: default_marker_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Base URL of the monitored account site. There is exactly one
    /// supported upstream; this is overridable for test servers only.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub strategy: StrategyPreference,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(skip)]
    paths: Option<ConfigPaths>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            strategy: StrategyPreference::default(),
            scrape: ScrapeConfig::default(),
            paths: None,
        }
    }
}

impl MonitorConfig {
    /// The `ConfigPaths` this config was loaded against, or freshly
    /// resolved defaults when none were attached.
    pub fn paths(&self) -> anyhow::Result<ConfigPaths> {
        match &self.paths {
            Some(p) => Ok(p.clone()),
            None => ConfigPaths::new(),
        }
    }

    /// Attach a different `ConfigPaths`, e.g. an isolated test base.
    pub fn set_paths(&mut self, paths: ConfigPaths) {
        self.paths = Some(paths);
    }

    /// Load from the default location (`~/.acmon/config.toml`).
    pub fn load() -> anyhow::Result<Self> {
        let paths = ConfigPaths::new()?;
        Self::load_from(&paths)
    }

    /// Load from `paths`, falling back to defaults when no config file
    /// exists yet. The result is validated before it is returned.
    pub fn load_from(paths: &ConfigPaths) -> anyhow::Result<Self> {
        let config_file = paths.config_path();
        let mut config = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            let config: MonitorConfig = toml::from_str(&content)?;
            config
        } else {
            Self::default()
        };
        config.paths = Some(paths.clone());
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the daemon could not run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("base_url must not be empty");
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("base_url must be an http(s) URL");
        }
        if self.scrape.page_load_timeout_secs == 0 {
            anyhow::bail!("scrape.page_load_timeout_secs must be greater than 0");
        }
        if self.scrape.poll_interval_ms == 0 {
            anyhow::bail!("scrape.poll_interval_ms must be greater than 0");
        }
        Ok(())
    }

    /// URL of the rendered dashboard page used by the scrape strategy.
    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn isolated_paths() -> ConfigPaths {
        let dir = tempfile::tempdir().unwrap();
        ConfigPaths::with_base(dir.keep())
    }

    #[test]
    fn defaults_target_the_production_site() {
        let config = MonitorConfig::default();
        assert_eq!(config.base_url, "https://www.aicodemirror.com");
        assert_eq!(config.strategy, StrategyPreference::Auto);
        assert_eq!(config.scrape.page_load_timeout_secs, 20);
        assert_eq!(config.scrape.marker_timeout_secs, 10);
        assert_eq!(config.scrape.poll_interval_ms, 500);
    }

    #[test]
    fn dashboard_url_joins_without_double_slash() {
        let mut config = MonitorConfig::default();
        config.base_url = "https://example.com/".to_string();
        assert_eq!(config.dashboard_url(), "https://example.com/dashboard");
    }

    #[test]
    fn missing_config_file_loads_defaults() {
        let paths = isolated_paths();
        paths.ensure_config_dir().unwrap();
        let config = MonitorConfig::load_from(&paths).unwrap();
        assert_eq!(config.base_url, "https://www.aicodemirror.com");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let paths = isolated_paths();
        paths.ensure_config_dir().unwrap();
        std::fs::write(
            paths.config_path(),
            "base_url = \"https://example.com\"\nstrategy = \"scrape\"\n",
        )
        .unwrap();
        let config = MonitorConfig::load_from(&paths).unwrap();
        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.strategy, StrategyPreference::Scrape);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let paths = isolated_paths();
        paths.ensure_config_dir().unwrap();
        std::fs::write(paths.config_path(), "strategy = \"api\"\n").unwrap();
        let config = MonitorConfig::load_from(&paths).unwrap();
        assert_eq!(config.strategy, StrategyPreference::Api);
        // base_url should be the default
        assert_eq!(config.base_url, "https://www.aicodemirror.com");
    }

    #[test]
    fn scrape_table_merges_field_by_field() {
        let paths = isolated_paths();
        paths.ensure_config_dir().unwrap();
        std::fs::write(
            paths.config_path(),
            "[scrape]\npage_load_timeout_secs = 5\n",
        )
        .unwrap();
        let config = MonitorConfig::load_from(&paths).unwrap();
        assert_eq!(config.scrape.page_load_timeout_secs, 5);
        assert_eq!(config.scrape.marker_timeout_secs, 10);
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let paths = isolated_paths();
        paths.ensure_config_dir().unwrap();
        std::fs::write(paths.config_path(), "strategy = [broken").unwrap();
        assert!(MonitorConfig::load_from(&paths).is_err());
    }

    #[test]
    fn validate_rejects_empty_base_url() {
        let mut config = MonitorConfig::default();
        config.base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let mut config = MonitorConfig::default();
        config.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_load_timeout() {
        let mut config = MonitorConfig::default();
        config.scrape.page_load_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = MonitorConfig::default();
        config.scrape.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn survives_a_toml_roundtrip() {
        let config = MonitorConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: MonitorConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.base_url, config.base_url);
        assert_eq!(deserialized.strategy, config.strategy);
        assert_eq!(
            deserialized.scrape.settle_delay_ms,
            config.scrape.settle_delay_ms
        );
    }

    #[test]
    fn attached_paths_win_over_defaults() {
        let mut config = MonitorConfig::default();
        let base = PathBuf::from("/custom/base");
        config.set_paths(ConfigPaths::with_base(base.clone()));
        let paths = config.paths().unwrap();
        assert_eq!(paths.config_dir(), base.as_path());
    }
}
