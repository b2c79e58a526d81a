// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration tree loaded from the policy YAML file.
//!
//! Every struct derives `Default` and carries `#[serde(default)]` so a
//! partial policy file only needs to specify what it overrides, matching
//! the builder-with-sane-defaults convention used for recorder and player
//! configuration elsewhere in the workspace.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Top-level policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub general: GeneralConfig,
    pub patterns: Vec<PatternDefinition>,
    pub discovery: DiscoveryConfig,
    pub filters: FilterConfig,
    /// Per-family settings for the seven built-in structured patterns (IP,
    /// email, UUID, SSH host, user/home directory, hostname, internal URL).
    #[serde(default = "BuiltinPatternsConfig::with_default_patterns")]
    pub builtin_patterns: BuiltinPatternsConfig,
    pub events: EventsConfig,
    /// Field names matching any of these regexes get their entire value
    /// replaced rather than scanned pattern-by-pattern — e.g. a field named
    /// `password` or `authToken` should never leak structure even when no
    /// configured pattern happens to match its contents.
    pub property_name_patterns: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            patterns: Vec::new(),
            discovery: DiscoveryConfig::default(),
            filters: FilterConfig::default(),
            builtin_patterns: BuiltinPatternsConfig::with_default_patterns(),
            events: EventsConfig::default(),
            property_name_patterns: Vec::new(),
        }
    }
}

/// Read and parse a policy file from `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<Configuration, CoreError> {
    let text = std::fs::read_to_string(path)?;
    let config: Configuration = serde_yaml::from_str(&text)?;
    Ok(config)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Literal replacement text for non-pseudonymized redactions.
    pub redaction_text: String,
    pub pseudonymization: PseudonymizationConfig,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            redaction_text: "***".to_string(),
            pseudonymization: PseudonymizationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PseudonymizationMode {
    Counter,
    Hash,
    Realistic,
}

impl Default for PseudonymizationMode {
    fn default() -> Self {
        Self::Counter
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PseudonymizationConfig {
    pub enabled: bool,
    pub mode: PseudonymizationMode,
    /// Counter-mode template, e.g. `"user{n}"`. `{n}` is replaced with the
    /// per-domain counter value. Ignored by HASH and REALISTIC modes.
    pub format: Option<String>,
    pub custom_prefix: Option<String>,
    pub custom_suffix: Option<String>,
    /// Hex digest length for HASH mode, clamped to `[6, 32]`.
    pub hash_length: usize,
    /// Informational only; SHA-256 is the only algorithm this crate
    /// implements, so any other value here is ignored.
    pub hash_algorithm: String,
    /// Exact-value overrides, checked before any generation mode.
    pub custom_replacements: HashMap<String, String>,
    /// Maps a pattern name to a generator domain (`"name"`, `"email"`,
    /// `"path"`, `"userFolder"`) consulted by `pseudonymize_with_pattern`.
    pub pattern_generators: HashMap<String, String>,
    /// Which value classes pseudonymization applies to.
    pub scope: PseudonymizationScope,
}

impl Default for PseudonymizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: PseudonymizationMode::default(),
            format: None,
            custom_prefix: None,
            custom_suffix: None,
            hash_length: 8,
            hash_algorithm: "sha256".to_string(),
            custom_replacements: HashMap::new(),
            pattern_generators: HashMap::new(),
            scope: PseudonymizationScope::default(),
        }
    }
}

impl PseudonymizationConfig {
    pub(crate) fn hash_affixes(&self) -> (String, String) {
        (
            self.custom_prefix.clone().unwrap_or_else(|| "<hash:".to_string()),
            self.custom_suffix.clone().unwrap_or_else(|| ">".to_string()),
        )
    }

    pub(crate) fn counter_affixes(&self) -> (String, String) {
        (
            self.custom_prefix.clone().unwrap_or_else(|| "<redacted:".to_string()),
            self.custom_suffix.clone().unwrap_or_else(|| ">".to_string()),
        )
    }
}

/// One named, user-configured redaction pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternDefinition {
    pub name: String,
    pub pattern: String,
    pub capture_group: usize,
    pub case_sensitive: bool,
    pub whitelist: Vec<String>,
    pub ignore_exact: Vec<String>,
    pub ignore_regex: Vec<String>,
    pub ignore_after: Vec<String>,
    pub min_occurrences: u32,
    /// One of `username`, `hostname`, `email_local_part`, or a custom
    /// bucket name used for discovery grouping.
    pub pattern_type: String,
    pub enabled: bool,
}

impl Default for PatternDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            pattern: String::new(),
            capture_group: 0,
            case_sensitive: false,
            whitelist: Vec::new(),
            ignore_exact: Vec::new(),
            ignore_regex: Vec::new(),
            ignore_after: Vec::new(),
            min_occurrences: 1,
            pattern_type: String::new(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    pub case_insensitive: bool,
    pub whitelist: Vec<String>,
    pub regex_extractors: Vec<RegexExtractorConfig>,
    pub property_extractors: Vec<PropertyExtractorConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            case_insensitive: true,
            whitelist: Vec::new(),
            regex_extractors: Vec::new(),
            property_extractors: Vec::new(),
        }
    }
}

/// Corresponds to `discovery.custom_extractions[]`: scans raw text (JFR
/// string fields or log lines) for a regex and learns the matched (or
/// captured) substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegexExtractorConfig {
    pub name: String,
    pub pattern: String,
    pub capture_group: usize,
    pub pattern_type: String,
    pub case_sensitive: bool,
    pub min_occurrences: u32,
    pub whitelist: Vec<String>,
    pub enabled: bool,
}

impl Default for RegexExtractorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            pattern: String::new(),
            capture_group: 0,
            pattern_type: String::new(),
            case_sensitive: false,
            min_occurrences: 1,
            whitelist: Vec::new(),
            enabled: true,
        }
    }
}

/// Corresponds to `discovery.property_extractions[]`. Inspects event fields
/// directly ("direct" mode: every field whose name matches `key_pattern`)
/// or as a key/value pair read from two named fields ("key-value" mode:
/// `key_property_pattern`/`value_property_pattern`, default `key`/`value`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyExtractorConfig {
    pub name: String,
    /// Regex matched against a field's *name* (direct mode) or against the
    /// string read from `key_property_pattern` (key-value mode).
    pub key_pattern: String,
    pub key_property_pattern: Option<String>,
    /// Regex the extracted value must match in key-value mode. `None`
    /// disables key-value mode entirely (direct mode only).
    pub value_pattern: Option<String>,
    pub value_property_pattern: Option<String>,
    /// Restricts this extractor to events whose type name matches.
    pub event_type_filter: Option<String>,
    pub pattern_type: String,
    pub case_sensitive: bool,
    pub min_occurrences: u32,
    pub whitelist: Vec<String>,
    pub enabled: bool,
}

impl Default for PropertyExtractorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            key_pattern: String::new(),
            key_property_pattern: None,
            value_pattern: None,
            value_property_pattern: None,
            event_type_filter: None,
            pattern_type: String::new(),
            case_sensitive: false,
            min_occurrences: 1,
            whitelist: Vec::new(),
            enabled: true,
        }
    }
}

/// Event- and thread-level inclusion rules, independent of value redaction.
/// Corresponds to `events.filtering.*` in the policy document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    pub include_events: Vec<String>,
    pub exclude_events: Vec<String>,
    pub include_threads: Vec<String>,
    pub exclude_threads: Vec<String>,
    pub include_categories: Vec<String>,
    pub exclude_categories: Vec<String>,
}

/// `events.remove_enabled` / `events.removed_types[]`: a blunter mechanism
/// than `filters` — entire event *types* dropped by name, independent of
/// the include/exclude glob lists.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EventsConfig {
    pub remove_enabled: bool,
    pub removed_types: Vec<String>,
}

/// Which value classes pseudonymization applies to. Scoping lets a policy
/// enable pseudonymization for, say, ports and network identifiers while
/// leaving free-text string fields with the fixed redaction text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PseudonymizationScope {
    pub properties: bool,
    pub strings: bool,
    pub network: bool,
    pub paths: bool,
    pub ports: bool,
}

impl Default for PseudonymizationScope {
    fn default() -> Self {
        Self {
            properties: true,
            strings: true,
            network: true,
            paths: true,
            ports: true,
        }
    }
}

/// Per-family settings for one of the seven built-in structured patterns.
/// `patterns` holds one or more regexes tried in order for that family
/// (e.g. a site may add a second, stricter hostname pattern alongside the
/// default one); an empty list after filtering disables the family even
/// when `enabled` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternFamilyConfig {
    pub enabled: bool,
    pub enable_discovery: bool,
    pub patterns: Vec<String>,
    pub discovery_capture_group: usize,
    pub discovery_case_sensitive: bool,
    pub discovery_min_occurrences: u32,
    pub discovery_whitelist: Vec<String>,
    pub ignore_exact: Vec<String>,
    pub ignore: Vec<String>,
    pub ignore_after: Vec<String>,
}

impl Default for PatternFamilyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_discovery: false,
            patterns: Vec::new(),
            discovery_capture_group: 0,
            discovery_case_sensitive: false,
            discovery_min_occurrences: 1,
            discovery_whitelist: Vec::new(),
            ignore_exact: Vec::new(),
            ignore: Vec::new(),
            ignore_after: Vec::new(),
        }
    }
}

/// The seven built-in, always-available pattern families from §6 of the
/// policy surface. Each carries its own enable flag, regex list, and
/// discovery/ignore settings; `Configuration::default()` seeds sane
/// default regexes for every family so an empty policy document still
/// redacts IPs, emails, UUIDs, etc.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BuiltinPatternsConfig {
    pub email: PatternFamilyConfig,
    pub ip: PatternFamilyConfig,
    pub uuid: PatternFamilyConfig,
    pub ssh_hosts: PatternFamilyConfig,
    pub user_home_directories: PatternFamilyConfig,
    pub hostnames: PatternFamilyConfig,
    pub internal_urls: PatternFamilyConfig,
}

impl BuiltinPatternsConfig {
    /// The shipped defaults: one regex per family, matching what earlier,
    /// pre-configuration revisions of this engine hard-coded.
    pub fn with_default_patterns() -> Self {
        Self {
            email: PatternFamilyConfig {
                patterns: vec![r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}".to_string()],
                ..Default::default()
            },
            ip: PatternFamilyConfig {
                patterns: vec![r"\b(?:\d{1,3}\.){3}\d{1,3}\b".to_string()],
                ignore_exact: vec!["127.0.0.1".to_string(), "::1".to_string()],
                // The entire 127.0.0.0/8 loopback block is safe, not just
                // 127.0.0.1; ignore_exact can't express a range.
                ignore: vec![r"^127\.".to_string()],
                ..Default::default()
            },
            uuid: PatternFamilyConfig {
                patterns: vec![
                    r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b"
                        .to_string(),
                ],
                ..Default::default()
            },
            ssh_hosts: PatternFamilyConfig {
                patterns: vec![r"\b[A-Za-z0-9_.-]+@[A-Za-z0-9_.-]+(?::\d+)?\b".to_string()],
                ..Default::default()
            },
            user_home_directories: PatternFamilyConfig {
                patterns: vec![r"(?:/Users/|/home/|C:\\Users\\)([A-Za-z0-9_.-]+)".to_string()],
                discovery_capture_group: 1,
                ..Default::default()
            },
            hostnames: PatternFamilyConfig {
                patterns: vec![
                    r"\b[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.(?:internal|corp|local)\b"
                        .to_string(),
                ],
                ignore_exact: vec!["localhost".to_string()],
                ..Default::default()
            },
            internal_urls: PatternFamilyConfig {
                patterns: vec![
                    r"https?://[A-Za-z0-9.-]*\.(?:internal|corp|local)(?:/[^\s]*)?".to_string(),
                ],
                ..Default::default()
            },
        }
    }
}
