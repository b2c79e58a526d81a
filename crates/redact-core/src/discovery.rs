// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pattern discovery engine.
//!
//! Two classes of extractor learn sensitive literal values before
//! redaction ever runs: [`RegexExtractor`] scans arbitrary text (event
//! string fields, or a whole log line) for a compiled pattern, and
//! [`PropertyExtractor`] inspects structured event fields directly, either
//! by field name ("direct" mode) or as a key/value pair read from two
//! named sibling fields ("key-value" mode, e.g. JFR's `jdk.ActiveSetting`
//! shape). Every extractor owns its own [`DiscoveredPatternStore`]; the
//! engine merges them into one [`DiscoveredPatterns`] view on demand.

use regex::Regex;

use crate::config::{
    BuiltinPatternsConfig, DiscoveryConfig, PropertyExtractorConfig, RegexExtractorConfig,
};
use crate::decision::{Decision, DecisionAction, InteractiveOracle};
use crate::discovery_store::{DiscoveredPatternStore, DiscoveredPatterns};
use crate::model::{FieldValue, RecordedEvent};
use crate::pattern::{PatternMatcher, PatternType};

/// A compiled regex-over-text extractor plus its own learned-value store.
pub struct RegexExtractor {
    pub name: String,
    matcher: PatternMatcher,
    capture_group: usize,
    pattern_type: PatternType,
    min_occurrences: u32,
    store: DiscoveredPatternStore,
}

impl RegexExtractor {
    fn from_config(cfg: &RegexExtractorConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        let matcher = PatternMatcher::compile(&cfg.pattern, cfg.case_sensitive)?;
        Some(Self {
            name: cfg.name.clone(),
            matcher,
            capture_group: cfg.capture_group,
            pattern_type: PatternType::from_config_str(&cfg.pattern_type),
            min_occurrences: cfg.min_occurrences.max(1),
            store: DiscoveredPatternStore::new(!cfg.case_sensitive, cfg.whitelist.clone()),
        })
    }

    /// Build the extractor a built-in family's `discovery_*` knobs describe,
    /// when `enable_discovery` is set for that family.
    fn from_family(name: &str, pattern: &str, pattern_type: PatternType, family: &crate::config::PatternFamilyConfig) -> Option<Self> {
        if !family.enabled || !family.enable_discovery {
            return None;
        }
        let matcher = PatternMatcher::compile(pattern, family.discovery_case_sensitive)?;
        Some(Self {
            name: name.to_string(),
            matcher,
            capture_group: family.discovery_capture_group,
            pattern_type,
            min_occurrences: family.discovery_min_occurrences.max(1),
            store: DiscoveredPatternStore::new(!family.discovery_case_sensitive, family.discovery_whitelist.clone()),
        })
    }

    fn process_text(&mut self, text: &str) {
        for (_, _, matched) in self.matcher.find_iter(text, self.capture_group) {
            self.store.add(matched, self.pattern_type.clone());
        }
    }
}

/// A structured-field extractor: direct (by field-name regex) or
/// key-value (two named sibling fields) mode, optionally scoped to a
/// subset of event types.
pub struct PropertyExtractor {
    pub name: String,
    key_regex: Regex,
    key_property_pattern: String,
    value_regex: Option<Regex>,
    value_property_pattern: String,
    event_type_filter: Option<Regex>,
    pattern_type: PatternType,
    min_occurrences: u32,
    store: DiscoveredPatternStore,
}

impl PropertyExtractor {
    fn from_config(cfg: &PropertyExtractorConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        let key_regex = compile_regex(&cfg.key_pattern, cfg.case_sensitive)?;
        let value_regex = match &cfg.value_pattern {
            Some(pattern) => Some(compile_regex(pattern, cfg.case_sensitive)?),
            None => None,
        };
        let event_type_filter = match &cfg.event_type_filter {
            Some(pattern) => Some(compile_regex(pattern, true)?),
            None => None,
        };
        Some(Self {
            name: cfg.name.clone(),
            key_regex,
            key_property_pattern: cfg.key_property_pattern.clone().unwrap_or_else(|| "key".to_string()),
            value_regex,
            value_property_pattern: cfg.value_property_pattern.clone().unwrap_or_else(|| "value".to_string()),
            event_type_filter,
            pattern_type: PatternType::from_config_str(&cfg.pattern_type),
            min_occurrences: cfg.min_occurrences.max(1),
            store: DiscoveredPatternStore::new(!cfg.case_sensitive, cfg.whitelist.clone()),
        })
    }

    fn applies_to_event(&self, event_type: &str) -> bool {
        self.event_type_filter
            .as_ref()
            .map(|re| re.is_match(event_type))
            .unwrap_or(true)
    }

    /// Inspect one flat field list (an event's top-level fields, or a
    /// nested struct's). Key-value mode wins when `value_regex` is set;
    /// otherwise every field whose name matches `key_regex` is extracted
    /// directly.
    fn process_fields(&mut self, fields: &[(String, FieldValue)]) {
        if let Some(value_regex) = &self.value_regex {
            let key_field = fields.iter().find(|(name, _)| name == &self.key_property_pattern);
            let value_field = fields.iter().find(|(name, _)| name == &self.value_property_pattern);
            if let (Some((_, FieldValue::Str(key))), Some((_, FieldValue::Str(value)))) = (key_field, value_field) {
                if self.key_regex.is_match(key) && value_regex.is_match(value) {
                    self.store.add(value, self.pattern_type.clone());
                }
            }
            return;
        }

        for (name, value) in fields {
            if self.key_regex.is_match(name) {
                if let FieldValue::Str(s) = value {
                    self.store.add(s, self.pattern_type.clone());
                }
            }
        }
    }
}

fn compile_regex(pattern: &str, case_sensitive: bool) -> Option<Regex> {
    let effective = if case_sensitive {
        pattern.to_string()
    } else {
        format!("(?i){pattern}")
    };
    match Regex::new(&effective) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(pattern, error = %err, "failed to compile discovery regex, skipping");
            None
        }
    }
}

/// Multi-pass discovery engine: every configured and built-in-family
/// extractor runs over every event (or, for text logs, every line).
pub struct PatternDiscoveryEngine {
    regex_extractors: Vec<RegexExtractor>,
    property_extractors: Vec<PropertyExtractor>,
}

impl PatternDiscoveryEngine {
    /// Build the engine from the discovery policy plus any built-in
    /// pattern family that opted into discovery via `enable_discovery`.
    pub fn from_config(discovery: &DiscoveryConfig, builtins: &BuiltinPatternsConfig) -> Self {
        let mut regex_extractors: Vec<RegexExtractor> = discovery
            .regex_extractors
            .iter()
            .filter_map(RegexExtractor::from_config)
            .collect();

        let family_specs: Vec<(&str, PatternType, &crate::config::PatternFamilyConfig)> = vec![
            ("email", PatternType::EmailLocalPart, &builtins.email),
            ("ip", PatternType::Custom("ip_address".into()), &builtins.ip),
            ("uuid", PatternType::Custom("uuid".into()), &builtins.uuid),
            ("ssh_hosts", PatternType::Custom("ssh_host".into()), &builtins.ssh_hosts),
            ("user_home_directories", PatternType::Username, &builtins.user_home_directories),
            ("hostnames", PatternType::Hostname, &builtins.hostnames),
            ("internal_urls", PatternType::Custom("internal_url".into()), &builtins.internal_urls),
        ];
        for (name, pattern_type, family) in family_specs.iter() {
            for pattern in family.patterns.iter() {
                if let Some(extractor) = RegexExtractor::from_family(name, pattern, pattern_type.clone(), family) {
                    regex_extractors.push(extractor);
                }
            }
        }

        let property_extractors = discovery
            .property_extractors
            .iter()
            .filter_map(PropertyExtractor::from_config)
            .collect();

        Self {
            regex_extractors,
            property_extractors,
        }
    }

    pub fn new() -> Self {
        Self {
            regex_extractors: Vec::new(),
            property_extractors: Vec::new(),
        }
    }

    /// Run every extractor over one event, recursing into nested
    /// structured values and arrays for both regex and property
    /// extraction.
    pub fn discover_event(&mut self, event: &RecordedEvent) {
        let applicable: Vec<usize> = self
            .property_extractors
            .iter()
            .enumerate()
            .filter(|(_, pe)| pe.applies_to_event(&event.event_type))
            .map(|(i, _)| i)
            .collect();

        walk_fields(&event.fields, &mut self.regex_extractors, &mut self.property_extractors, &applicable);
    }

    /// Run regex extractors over a single line of free text (used by the
    /// text-log redactor, which has no structured fields to offer property
    /// extractors).
    pub fn discover_line(&mut self, line: &str) {
        for extractor in &mut self.regex_extractors {
            extractor.process_text(line);
        }
    }

    /// Merge every extractor's store into one combined, longest-first
    /// view, re-inserting each surviving value `occurrences` times so
    /// counts carry through the merge.
    pub fn get_discovered_patterns(&self) -> DiscoveredPatterns {
        let mut combined = DiscoveredPatternStore::new(true, Vec::new());
        for extractor in &self.regex_extractors {
            for value in extractor.store.values(extractor.min_occurrences) {
                for _ in 0..value.occurrences {
                    combined.add(&value.value, value.pattern_type.clone());
                }
            }
        }
        for extractor in &self.property_extractors {
            for value in extractor.store.values(extractor.min_occurrences) {
                for _ in 0..value.occurrences {
                    combined.add(&value.value, value.pattern_type.clone());
                }
            }
        }
        DiscoveredPatterns::from_values(combined.values(1))
    }

    /// Filter `patterns` down to values the user actually wants redacted,
    /// consulting `oracle` per value. Tracks two pair-typed global
    /// policies (`KEEP_ALL`/`REDACT_ALL` for USERNAME, the same pair for
    /// HOSTNAME) so that once either fires, later values of that type stop
    /// prompting.
    pub fn apply_interactive_decisions(patterns: &mut DiscoveredPatterns, oracle: &mut dyn InteractiveOracle) {
        let mut username_policy: Option<DecisionAction> = None;
        let mut hostname_policy: Option<DecisionAction> = None;

        patterns.retain(|value| {
            let policy_slot = match value.pattern_type {
                PatternType::Username => Some(&mut username_policy),
                PatternType::Hostname => Some(&mut hostname_policy),
                _ => None,
            };

            if let Some(slot) = policy_slot {
                if let Some(policy) = slot {
                    return matches!(policy, DecisionAction::RedactAll);
                }
            }

            let decision: Decision = oracle.get_decision(&value.value);
            match decision.action {
                DecisionAction::KeepAll | DecisionAction::RedactAll => {
                    let keep_redacting = matches!(decision.action, DecisionAction::RedactAll);
                    match value.pattern_type {
                        PatternType::Username => username_policy = Some(decision.action),
                        PatternType::Hostname => hostname_policy = Some(decision.action),
                        _ => {}
                    }
                    keep_redacting
                }
                DecisionAction::Redact | DecisionAction::Replace => true,
                DecisionAction::Keep => false,
            }
        });
    }
}

impl Default for PatternDiscoveryEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Recurse through one flat field list: run every applicable property
/// extractor against this level, then dispatch regex extraction or
/// recursion by value shape.
fn walk_fields(
    fields: &[(String, FieldValue)],
    regex_extractors: &mut [RegexExtractor],
    property_extractors: &mut [PropertyExtractor],
    applicable_property_extractors: &[usize],
) {
    for &i in applicable_property_extractors {
        property_extractors[i].process_fields(fields);
    }

    for (_, value) in fields {
        walk_value(value, regex_extractors, property_extractors, applicable_property_extractors);
    }
}

fn walk_value(
    value: &FieldValue,
    regex_extractors: &mut [RegexExtractor],
    property_extractors: &mut [PropertyExtractor],
    applicable_property_extractors: &[usize],
) {
    match value {
        FieldValue::Str(s) => {
            for extractor in regex_extractors.iter_mut() {
                extractor.process_text(s);
            }
        }
        FieldValue::Struct(obj) => {
            walk_fields(&obj.fields, regex_extractors, property_extractors, applicable_property_extractors);
        }
        FieldValue::Array(items) => {
            for item in items {
                walk_value(item, regex_extractors, property_extractors, applicable_property_extractors);
            }
        }
        _ => {}
    }
}
