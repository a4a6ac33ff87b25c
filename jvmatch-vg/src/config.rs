//! Configuration for jvmatch-vg
//!
//! **Priority:** CLI `--config` → `JVMATCH_CONFIG` → `~/.config/jvmatch/jvmatch-vg.toml` → defaults
//!
//! Every section and field is defaulted, so a partial TOML file only needs the
//! values it changes. The Layer 2 grounding thresholds are empirical and live here
//! rather than as literals in the verifier.

use crate::error::{GateError, GateResult};
use jvmatch_common::config::{load_toml_config, resolve_config_file, resolve_secret};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "JVMATCH_CONFIG";
/// Environment variable holding the Layer 3 API key
pub const API_KEY_ENV_VAR: &str = "JVMATCH_OPENROUTER_API_KEY";
/// Service name used for the per-user config file
pub const SERVICE_NAME: &str = "jvmatch-vg";

/// Complete gate configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub layer1: Layer1Config,
    pub layer2: Layer2Config,
    pub layer3: Layer3Config,
    pub gate: GateRulesConfig,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
    pub learning: LearningConfig,
}

/// Layer 1 (deterministic checks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layer1Config {
    /// Minimum characters for long free-text fields
    pub min_text_len: usize,
    /// Maximum characters before a free-text value is treated as a dump
    pub max_text_len: usize,
    pub company_min_len: usize,
    pub company_max_len: usize,
    /// Role/placeholder email local-parts flagged SUSPICIOUS
    pub suspicious_local_parts: Vec<String>,
    /// Throwaway mailbox domains flagged SUSPICIOUS
    pub disposable_domains: Vec<String>,
    /// Confidence assigned to SUSPICIOUS Layer 1 verdicts
    pub suspicious_confidence: f64,
    /// Confidence for plain `http://` URLs (soft warning)
    pub insecure_url_confidence: f64,
    /// Largest plausible audience metric
    pub max_metric: u64,
}

impl Default for Layer1Config {
    fn default() -> Self {
        Self {
            min_text_len: 20,
            max_text_len: 2000,
            company_min_len: 2,
            company_max_len: 120,
            suspicious_local_parts: [
                "test", "noreply", "no-reply", "donotreply", "admin", "info", "support",
                "contact", "hello", "sales", "office", "webmaster", "example", "user",
                "email", "name", "mail",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            disposable_domains: [
                "mailinator.com", "guerrillamail.com", "10minutemail.com", "tempmail.com",
                "yopmail.com", "trashmail.com", "sharklasers.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            suspicious_confidence: 0.7,
            insecure_url_confidence: 0.9,
            max_metric: 1_000_000_000,
        }
    }
}

/// Layer 2 (source-quote grounding) thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layer2Config {
    /// Minimum normalized Levenshtein ratio for a fuzzy quote match
    pub fuzzy_threshold: f64,
    /// Minimum fraction of salient value tokens found verbatim in the source
    pub key_phrase_min_overlap: f64,
    /// Confidence ceiling for a key-phrase match (scaled by the overlap)
    pub key_phrase_confidence: f64,
    /// Confidence of a field whose claim could not be grounded
    pub ungrounded_confidence: f64,
    /// Tokens of each source scanned by the fuzzy window match. The exact
    /// and key-phrase stages always see the whole source.
    pub max_source_tokens: usize,
}

impl Default for Layer2Config {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.8,
            key_phrase_min_overlap: 0.5,
            key_phrase_confidence: 0.7,
            ungrounded_confidence: 0.3,
            max_source_tokens: 10_000,
        }
    }
}

/// Layer 3 (AI verification). Disabled unless explicitly enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layer3Config {
    pub enabled: bool,
    /// Upper bound for one verifier call
    pub timeout_ms: u64,
    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,
    pub model: String,
    /// Prefer `JVMATCH_OPENROUTER_API_KEY`; this is the TOML fallback
    pub api_key: Option<String>,
    /// Spend cap for one run, in USD
    pub budget_usd: f64,
    /// Estimated cost of one verifier call, in USD
    pub cost_per_call_usd: f64,
    /// Consecutive failures before the circuit opens
    pub breaker_failure_threshold: u32,
    pub breaker_cooldown_secs: u64,
    pub requests_per_minute: u32,
    /// Characters of source text included in a verification prompt
    pub max_excerpt_chars: usize,
}

impl Default for Layer3Config {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: 10_000,
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "anthropic/claude-3.5-haiku".to_string(),
            api_key: None,
            budget_usd: 1.0,
            cost_per_call_usd: 0.002,
            breaker_failure_threshold: 3,
            breaker_cooldown_secs: 60,
            requests_per_minute: 60,
            max_excerpt_chars: 4000,
        }
    }
}

impl Layer3Config {
    /// Resolve the API key (environment, then TOML)
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret(API_KEY_ENV_VAR, self.api_key.as_deref())
    }
}

/// Gate decision settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateRulesConfig {
    /// Lowest per-field confidence used when computing overall confidence,
    /// so one weak field cannot zero out a profile
    pub confidence_floor: f64,
}

impl Default for GateRulesConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Longest retry plan produced for one field
    pub max_methods: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_methods: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Profiles evaluated concurrently
    pub worker_count: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { worker_count: 4 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// SQLite file for the learning log
    pub db_path: Option<PathBuf>,
}

impl GateConfig {
    /// Resolve and load configuration, then validate it
    pub fn load(cli_path: Option<&Path>) -> GateResult<Self> {
        let source = resolve_config_file(cli_path, CONFIG_ENV_VAR, SERVICE_NAME)?;
        let config: GateConfig = load_toml_config(&source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the gate cannot run with
    pub fn validate(&self) -> GateResult<()> {
        let unit_values = [
            ("layer1.suspicious_confidence", self.layer1.suspicious_confidence),
            ("layer1.insecure_url_confidence", self.layer1.insecure_url_confidence),
            ("layer2.fuzzy_threshold", self.layer2.fuzzy_threshold),
            ("layer2.key_phrase_min_overlap", self.layer2.key_phrase_min_overlap),
            ("layer2.key_phrase_confidence", self.layer2.key_phrase_confidence),
            ("layer2.ungrounded_confidence", self.layer2.ungrounded_confidence),
            ("gate.confidence_floor", self.gate.confidence_floor),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(GateError::Config(format!(
                    "{} must be within [0.0, 1.0], got {}",
                    name, value
                )));
            }
        }

        if self.layer1.min_text_len > self.layer1.max_text_len {
            return Err(GateError::Config(format!(
                "layer1.min_text_len ({}) exceeds layer1.max_text_len ({})",
                self.layer1.min_text_len, self.layer1.max_text_len
            )));
        }

        if self.layer2.max_source_tokens == 0 {
            return Err(GateError::Config("layer2.max_source_tokens must be at least 1".to_string()));
        }

        if self.batch.worker_count == 0 {
            return Err(GateError::Config("batch.worker_count must be at least 1".to_string()));
        }

        if self.layer3.enabled {
            if self.layer3.timeout_ms == 0 {
                return Err(GateError::Config(
                    "layer3.timeout_ms must be positive when Layer 3 is enabled".to_string(),
                ));
            }
            if self.layer3.budget_usd < 0.0 || self.layer3.cost_per_call_usd < 0.0 {
                return Err(GateError::Config(
                    "layer3 budget and cost must not be negative".to_string(),
                ));
            }
        }

        Ok(())
    }
}
