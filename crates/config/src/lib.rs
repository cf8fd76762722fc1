use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the redb database file and JSONL event logs.
    pub data_dir: String,
    /// Maximum clock skew tolerated between `sentAt` and `receivedAt` (seconds).
    pub clock_skew_secs: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: ".triage/data".to_string(),
            clock_skew_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Batch size for a single pull cycle.
    pub pull_batch_size: usize,
    /// Bound on the in-flight analyze queue, expressed as a multiple of the
    /// analyzer worker pool size.
    pub analyze_queue_multiplier: usize,
    /// Number of analyzer worker tasks. 0 means "number of cores".
    pub analyzer_workers: usize,
    /// Local-time hour (0-23) after which the day's brief may be generated.
    pub brief_cutoff_hour: u8,
    /// Initial connector rate-limit backoff, doubling up to the cap.
    pub backoff_initial_secs: u64,
    pub backoff_cap_secs: u64,
    /// Per-call LLM timeout.
    pub llm_timeout_secs: u64,
    /// Shutdown grace period before in-flight work is cancelled.
    pub shutdown_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pull_batch_size: 100,
            analyze_queue_multiplier: 4,
            analyzer_workers: 0,
            brief_cutoff_hour: 22,
            backoff_initial_secs: 30,
            backoff_cap_secs: 600,
            llm_timeout_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub priority_threshold: f32,
    pub archive_threshold: f32,
    pub escalation_threshold: f32,
    /// Categories eligible for AUTO_ARCHIVE when the score is low enough.
    pub auto_archive_categories: Vec<String>,
    pub max_labels: usize,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            priority_threshold: 0.7,
            archive_threshold: 0.4,
            escalation_threshold: 0.70,
            auto_archive_categories: vec![
                "PROMOTIONS".to_string(),
                "SOCIAL".to_string(),
                "UPDATES".to_string(),
                "FORUMS".to_string(),
            ],
            max_labels: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub sender_sample_threshold: usize,
    pub keyword_sample_threshold: usize,
    pub content_sample_threshold: usize,
    pub confidence_threshold: f32,
    pub promote_to_rule_threshold: f32,
    pub auto_enable_threshold: f32,
    pub learning_rate: f32,
    pub rule_disable_accuracy: f32,
    pub rule_disable_min_matches: usize,
    pub rule_enable_accuracy: f32,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            sender_sample_threshold: 5,
            keyword_sample_threshold: 5,
            content_sample_threshold: 3,
            confidence_threshold: 0.7,
            promote_to_rule_threshold: 0.8,
            auto_enable_threshold: 0.9,
            learning_rate: 0.2,
            rule_disable_accuracy: 0.6,
            rule_disable_min_matches: 10,
            rule_enable_accuracy: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Addresses that always receive a VIP importance bonus.
    pub vip_addresses: Vec<String>,
    /// Domain → relationship class hints used when no history exists yet.
    pub strategic_domains: Vec<(String, String)>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            vip_addresses: Vec::new(),
            strategic_domains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub name: String,
    pub supports_push: bool,
    pub supports_labels: bool,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            supports_push: false,
            supports_labels: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    /// Overridden at runtime by the `TRIAGE_LLM_API_KEY` environment variable.
    pub api_key: String,
    pub retry_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "mock-1".to_string(),
            api_key: String::new(),
            retry_backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TriageConfig {
    pub store: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub collaborator: CollaboratorConfig,
    pub learner: LearnerConfig,
    pub index: IndexConfig,
    pub connector: ConnectorConfig,
    pub llm: LlmConfig,
    pub telemetry: TelemetryConfig,
}

impl TriageConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(key) = env::var("TRIAGE_LLM_API_KEY") {
            if !key.is_empty() {
                config.llm.api_key = key;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        let config = TriageConfig::default();
        config.save_to(&path)?;

        let loaded = TriageConfig::load_from(&path)?;
        assert_eq!(loaded.collaborator.priority_threshold, config.collaborator.priority_threshold);
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let config = TriageConfig::load_from("/nonexistent/path/config.toml")?;
        assert_eq!(config.scheduler.pull_batch_size, 100);
        Ok(())
    }

    #[test]
    fn env_var_overrides_llm_api_key() -> Result<()> {
        // SAFETY: test-only mutation of process env, no concurrent access in this test.
        unsafe { env::set_var("TRIAGE_LLM_API_KEY", "secret-key") };
        let config = TriageConfig::load_from("/nonexistent/path/config.toml")?;
        assert_eq!(config.llm.api_key, "secret-key");
        unsafe { env::remove_var("TRIAGE_LLM_API_KEY") };
        Ok(())
    }
}
