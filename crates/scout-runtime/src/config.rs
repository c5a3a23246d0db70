//! # Scout Configuration
//!
//! One TOML document, merged from several locations, then patched from the
//! environment and the command line.
//!
//! ## Search Order (later wins)
//!
//! 1. `$HOME/proxy_scout.toml`
//! 2. `./proxy_scout.toml`
//! 3. `<exe dir>/proxy_scout.toml`
//! 4. `--config <path>` (must exist)
//!
//! Missing files in steps 1-3 are skipped. Tables are merged key by key, so a
//! later file only needs the keys it changes.
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `PS_WORKERS` | `sink.workers` |
//! | `PS_PROBE_TIMEOUT_SECS` | `probe.timeout_secs` |
//! | `PS_FETCH_URL` | `probe.fetch_url` |
//! | `PS_DEDUP_PATH` | `dedup.path` |
//! | `PS_RESULTS_PATH` | `results.path` |

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ps_01_candidate_sources::{known_sources, SourceSpec, DEFAULT_MAX_RETRIES};
use ps_03_proxy_prober::{ProberConfig, ResponseMarker};
use ps_04_proxy_sink::{BulkConfig, SinkConfig};
use scout_telemetry::TelemetryConfig;

pub const CONFIG_FILE_NAME: &str = "proxy_scout.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How candidates reach the prober.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Feeds stream straight into the worker pool.
    #[default]
    Stream,
    /// Feeds land in the candidate table; a periodic cycle probes pending rows.
    Bulk,
}

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub mode: Mode,
    pub logging: LoggingSection,
    pub dedup: DedupSection,
    pub sink: SinkSection,
    pub probe: ProbeSection,
    pub bulk: BulkSection,
    pub pipeline: PipelineSection,
    pub sources: SourcesSection,
    pub results: ResultsSection,
}

/// Overrides for the environment-derived telemetry settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub json: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupSection {
    /// RocksDB directory; unset keeps marks in memory.
    pub path: Option<PathBuf>,
    pub freshness_window_secs: u64,
}

impl Default for DedupSection {
    fn default() -> Self {
        Self {
            path: None,
            freshness_window_secs: 8 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    pub workers: usize,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            workers: ps_04_proxy_sink::DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    pub timeout_secs: u64,
    pub http_get_url: String,
    pub https_ip_url: String,
    pub websocket_url: String,
    pub ip_echo_urls: Vec<String>,
    pub fetch_url: String,
    pub fetch_marker: ResponseMarker,
}

impl Default for ProbeSection {
    fn default() -> Self {
        let defaults = ProberConfig::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            http_get_url: defaults.http_get_url,
            https_ip_url: defaults.https_ip_url,
            websocket_url: defaults.websocket_url,
            ip_echo_urls: defaults.ip_echo_urls,
            fetch_url: defaults.fetch_url,
            fetch_marker: defaults.fetch_marker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkSection {
    pub page_size: usize,
    pub max_concurrency: usize,
    pub probe_timeout_secs: u64,
    /// Age after which a tested candidate is pending again.
    pub retry_interval_secs: u64,
    pub fail_interval_secs: u64,
    pub wait_interval_secs: u64,
}

impl Default for BulkSection {
    fn default() -> Self {
        Self {
            page_size: ps_04_proxy_sink::DEFAULT_PAGE_SIZE,
            max_concurrency: ps_04_proxy_sink::DEFAULT_MAX_CONCURRENCY,
            probe_timeout_secs: ps_04_proxy_sink::DEFAULT_BULK_PROBE_TIMEOUT.as_secs(),
            retry_interval_secs: ps_04_proxy_sink::DEFAULT_RETRY_INTERVAL.as_secs(),
            fail_interval_secs: 1,
            wait_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub unique_window_secs: u64,
    /// Capacity of every inter-stage channel.
    pub channel_capacity: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval_ms: 1000,
            unique_window_secs: 600,
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    /// Poll the built-in public feed set.
    pub use_known: bool,
    pub extra: Vec<SourceSpec>,
    pub fail_interval_secs: u64,
    pub wait_interval_secs: u64,
    /// `429` retries per feed request.
    pub max_rate_limit_retries: u32,
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            use_known: true,
            extra: Vec::new(),
            fail_interval_secs: 60 * 60,
            wait_interval_secs: 60 * 60,
            max_rate_limit_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl SourcesSection {
    /// Every feed to poll, known ones first.
    pub fn specs(&self) -> Vec<SourceSpec> {
        let mut specs = if self.use_known {
            known_sources()
        } else {
            Vec::new()
        };
        specs.extend(self.extra.iter().cloned());
        specs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsSection {
    pub path: PathBuf,
}

impl Default for ResultsSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/results.jsonl"),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl ScoutConfig {
    /// Merge every file on the search path plus `explicit`, then apply the
    /// process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_files(&search_paths(), explicit)?;
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Merge `candidates` (skipping missing ones) and then `explicit`.
    pub fn from_files(candidates: &[PathBuf], explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        for path in candidates.iter().filter(|p| p.is_file()) {
            merge_values(&mut merged, read_toml(path)?);
        }
        if let Some(path) = explicit {
            merge_values(&mut merged, read_toml(path)?);
        }
        merged.try_into::<ScoutConfig>().map_err(|source| ConfigError::Parse {
            origin: "merged configuration".into(),
            source,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: "inline configuration".into(),
            source,
        })
    }

    /// Apply `PS_*` overrides read through `get`.
    pub fn apply_env<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("PS_WORKERS") {
            self.sink.workers = parse_env("PS_WORKERS", &v)?;
        }
        if let Some(v) = get("PS_PROBE_TIMEOUT_SECS") {
            self.probe.timeout_secs = parse_env("PS_PROBE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("PS_FETCH_URL") {
            self.probe.fetch_url = v;
        }
        if let Some(v) = get("PS_DEDUP_PATH") {
            self.dedup.path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("PS_RESULTS_PATH") {
            self.results.path = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.probe.timeout_secs == 0 {
            return invalid("probe.timeout_secs must be positive");
        }
        if self.bulk.probe_timeout_secs == 0 {
            return invalid("bulk.probe_timeout_secs must be positive");
        }
        if self.bulk.page_size == 0 {
            return invalid("bulk.page_size must be positive");
        }
        if self.bulk.max_concurrency == 0 {
            return invalid("bulk.max_concurrency must be positive");
        }
        if self.pipeline.batch_size == 0 || self.pipeline.channel_capacity == 0 {
            return invalid("pipeline.batch_size and pipeline.channel_capacity must be positive");
        }
        if self.dedup.freshness_window_secs == 0 {
            return invalid("dedup.freshness_window_secs must be positive");
        }
        let urls = [
            ("probe.fetch_url", &self.probe.fetch_url),
            ("probe.http_get_url", &self.probe.http_get_url),
            ("probe.https_ip_url", &self.probe.https_ip_url),
            ("probe.websocket_url", &self.probe.websocket_url),
        ];
        for (field, url) in urls {
            reqwest::Url::parse(url)
                .map_err(|e| ConfigError::Invalid(format!("{field} {url:?}: {e}")))?;
        }
        Ok(())
    }

    // =========================================================================
    // COMPONENT CONFIGS
    // =========================================================================

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.dedup.freshness_window_secs)
    }

    pub fn prober_config(&self) -> ProberConfig {
        ProberConfig {
            timeout: Duration::from_secs(self.probe.timeout_secs),
            http_get_url: self.probe.http_get_url.clone(),
            https_ip_url: self.probe.https_ip_url.clone(),
            websocket_url: self.probe.websocket_url.clone(),
            ip_echo_urls: self.probe.ip_echo_urls.clone(),
            fetch_url: self.probe.fetch_url.clone(),
            fetch_marker: self.probe.fetch_marker.clone(),
            ..ProberConfig::default()
        }
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig::new(self.sink.workers, self.freshness_window())
            .with_gate_offload(self.dedup.path.is_some())
    }

    pub fn bulk_config(&self) -> BulkConfig {
        BulkConfig {
            page_size: self.bulk.page_size,
            max_concurrency: self.bulk.max_concurrency,
            probe_timeout: Duration::from_secs(self.bulk.probe_timeout_secs),
        }
    }

    /// `base` with the `[logging]` overrides applied.
    pub fn telemetry(&self, mut base: TelemetryConfig) -> TelemetryConfig {
        if let Some(level) = &self.logging.level {
            base.log_level = level.clone();
        }
        if let Some(json) = self.logging.json {
            base.json_logs = json;
        }
        base
    }
}

/// Default search locations, lowest precedence first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(".").join(CONFIG_FILE_NAME));
    if let Some(dir) = env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    paths
}

fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        origin: path.display().to_string(),
        source,
    })
}

/// Recursively overlay `overlay` onto `base`. Non-table values replace.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name}={value:?} is not a number")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ps_01_candidate_sources::SourceKind;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // =========================================================================
    // TEST GROUP 1: Defaults and parsing
    // =========================================================================

    #[test]
    fn test_defaults() {
        let config = ScoutConfig::default();
        assert_eq!(config.mode, Mode::Stream);
        assert_eq!(config.dedup.freshness_window_secs, 28_800);
        assert_eq!(config.sink.workers, 15);
        assert_eq!(config.probe.timeout_secs, 30);
        assert_eq!(config.bulk.page_size, 50);
        assert_eq!(config.bulk.max_concurrency, 50);
        assert_eq!(config.pipeline.batch_size, 100);
        assert_eq!(config.pipeline.unique_window_secs, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config = ScoutConfig::from_toml_str(
            r#"
            mode = "bulk"

            [sink]
            workers = 40

            [probe]
            fetch_url = "https://www.example.com/"
            fetch_marker = { kind = "body_contains", needle = "Example Domain" }

            [[sources.extra]]
            kind = "host_port_list"
            url = "https://lists.example.org/http.txt"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Bulk);
        assert_eq!(config.sink.workers, 40);
        assert_eq!(config.probe.timeout_secs, 30);
        assert_eq!(
            config.probe.fetch_marker,
            ResponseMarker::BodyContains {
                needle: "Example Domain".into()
            }
        );
        let specs = config.sources.specs();
        assert_eq!(specs.len(), known_sources().len() + 1);
        assert_eq!(specs.last().map(|s| s.kind), Some(SourceKind::HostPortList));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(matches!(
            ScoutConfig::from_toml_str(r#"mode = "turbo""#),
            Err(ConfigError::Parse { .. })
        ));
    }

    // =========================================================================
    // TEST GROUP 2: File merging
    // =========================================================================

    #[test]
    fn test_later_files_override_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home.toml");
        let local = dir.path().join("local.toml");
        let missing = dir.path().join("missing.toml");
        fs::write(&home, "[sink]\nworkers = 5\n[bulk]\npage_size = 7\n").unwrap();
        fs::write(&local, "[sink]\nworkers = 9\n").unwrap();

        let config = ScoutConfig::from_files(&[home, missing, local], None).unwrap();
        assert_eq!(config.sink.workers, 9);
        assert_eq!(config.bulk.page_size, 7);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScoutConfig::from_files(&[], Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_explicit_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.toml");
        let explicit = dir.path().join("explicit.toml");
        fs::write(&base, "mode = \"bulk\"\n[results]\npath = \"/tmp/a.jsonl\"\n").unwrap();
        fs::write(&explicit, "[results]\npath = \"/tmp/b.jsonl\"\n").unwrap();

        let config = ScoutConfig::from_files(&[base], Some(&explicit)).unwrap();
        assert_eq!(config.mode, Mode::Bulk);
        assert_eq!(config.results.path, PathBuf::from("/tmp/b.jsonl"));
    }

    // =========================================================================
    // TEST GROUP 3: Environment and validation
    // =========================================================================

    #[test]
    fn test_env_overrides() {
        let mut config = ScoutConfig::default();
        config
            .apply_env(env(&[
                ("PS_WORKERS", "3"),
                ("PS_PROBE_TIMEOUT_SECS", "12"),
                ("PS_FETCH_URL", "https://target.example/"),
                ("PS_DEDUP_PATH", "/var/lib/scout/dedup"),
                ("PS_RESULTS_PATH", "/var/lib/scout/results.jsonl"),
            ]))
            .unwrap();

        assert_eq!(config.sink.workers, 3);
        assert_eq!(config.prober_config().timeout, Duration::from_secs(12));
        assert_eq!(config.probe.fetch_url, "https://target.example/");
        assert_eq!(config.dedup.path, Some(PathBuf::from("/var/lib/scout/dedup")));
        assert_eq!(config.results.path, PathBuf::from("/var/lib/scout/results.jsonl"));
    }

    #[test]
    fn test_bad_env_number() {
        let mut config = ScoutConfig::default();
        let err = config.apply_env(env(&[("PS_WORKERS", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ScoutConfig::default();
        config.probe.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ScoutConfig::default();
        config.bulk.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = ScoutConfig::default();
        config.probe.fetch_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_workers_clamped_in_sink_config() {
        let mut config = ScoutConfig::default();
        config.sink.workers = 0;
        assert_eq!(config.sink_config().workers(), 1);
        config.sink.workers = 50_000;
        assert_eq!(config.sink_config().workers(), ps_04_proxy_sink::MAX_WORKERS);
    }

    #[test]
    fn test_disk_dedup_offloads_gate() {
        let mut config = ScoutConfig::default();
        assert!(!config.sink_config().offload_gate);
        config.dedup.path = Some(PathBuf::from("/var/lib/scout/dedup"));
        assert!(config.sink_config().offload_gate);
    }

    #[test]
    fn test_logging_overrides() {
        let mut config = ScoutConfig::default();
        config.logging.level = Some("debug".into());
        let telemetry = config.telemetry(TelemetryConfig::default());
        assert_eq!(telemetry.log_level, "debug");
        assert!(!telemetry.json_logs);
    }
}
