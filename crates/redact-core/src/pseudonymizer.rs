// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deterministic, stable value-to-pseudonym mapping.
//!
//! Three generation modes (HASH, COUNTER, REALISTIC) plus an independent
//! port-number mapper that always counts from 1000 regardless of the
//! configured mode. Caches are guarded with `parking_lot::Mutex` so a
//! pseudonymizer can be shared across file-processing threads for
//! cross-run stability, matching the locking style the workspace uses
//! elsewhere for hot-path shared state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::config::{PseudonymizationConfig, PseudonymizationMode};

const PORT_BASE: i64 = 1000;

const NAME_POOL: &[&str] = &[
    "alex", "jordan", "taylor", "morgan", "casey", "riley", "avery", "quinn",
    "rowan", "skyler", "drew", "reese", "sawyer", "emerson", "blair", "dana",
    "harper", "kai", "logan", "parker", "peyton", "remy", "sage", "shay",
    "tatum", "wren", "ash", "bay", "cove", "finch",
];

const DOMAIN_POOL: &[&str] = &[
    "example.com",
    "acme.example",
    "globex.example",
    "initech.example",
    "umbrella.example",
];

/// Stable value→pseudonym and port→port mapper.
pub struct Pseudonymizer {
    config: PseudonymizationConfig,
    value_cache: Mutex<HashMap<(String, String), String>>,
    counters: Mutex<HashMap<String, u64>>,
    port_cache: Mutex<HashMap<i64, i64>>,
    next_port: AtomicI64,
}

impl Pseudonymizer {
    pub fn new(config: PseudonymizationConfig) -> Self {
        Self {
            config,
            value_cache: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
            port_cache: Mutex::new(HashMap::new()),
            next_port: AtomicI64::new(PORT_BASE),
        }
    }

    pub fn config(&self) -> &PseudonymizationConfig {
        &self.config
    }

    /// Pseudonymize `value` in the generic ("name") domain. Returns
    /// `fallback` unmodified when pseudonymization is disabled.
    pub fn pseudonymize(&self, value: &str, fallback: &str) -> String {
        self.pseudonymize_with_pattern(value, "", fallback)
    }

    /// Pseudonymize `value`, preferring a pattern-specific generator domain
    /// looked up from `general.pseudonymization.pattern_generators` by
    /// `pattern_name`. Falls back to the generic "name" domain when no
    /// mapping exists for the pattern.
    pub fn pseudonymize_with_pattern(&self, value: &str, pattern_name: &str, fallback: &str) -> String {
        if !self.config.enabled {
            return fallback.to_string();
        }

        if let Some(replacement) = self.config.custom_replacements.get(value) {
            return replacement.clone();
        }

        let domain = self
            .config
            .pattern_generators
            .get(pattern_name)
            .cloned()
            .unwrap_or_else(|| "name".to_string());

        let cache_key = (domain.clone(), value.to_string());
        {
            let cache = self.value_cache.lock();
            if let Some(existing) = cache.get(&cache_key) {
                return existing.clone();
            }
        }

        let generated = match self.config.mode {
            PseudonymizationMode::Hash => self.generate_hash(value),
            PseudonymizationMode::Counter => self.generate_counter(&domain),
            PseudonymizationMode::Realistic => self.generate_realistic(&domain),
        };

        self.value_cache.lock().insert(cache_key, generated.clone());
        generated
    }

    /// Always counter-based, starting at 1000, regardless of
    /// `general.pseudonymization.mode`.
    pub fn pseudonymize_port(&self, port: i64) -> i64 {
        let mut cache = self.port_cache.lock();
        if let Some(existing) = cache.get(&port) {
            return *existing;
        }
        let assigned = self.next_port.fetch_add(1, Ordering::SeqCst);
        cache.insert(port, assigned);
        assigned
    }

    /// Wipe both caches and reset all counters.
    pub fn clear_cache(&self) {
        self.value_cache.lock().clear();
        self.counters.lock().clear();
        self.port_cache.lock().clear();
        self.next_port.store(PORT_BASE, Ordering::SeqCst);
    }

    fn generate_hash(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let digest = hasher.finalize();
        let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
        let len = self.config.hash_length.clamp(6, 32);
        let truncated = &hex[..len.min(hex.len())];

        let (prefix, suffix) = self.config.hash_affixes();
        format!("{prefix}{truncated}{suffix}")
    }

    fn generate_counter(&self, domain: &str) -> String {
        let mut counters = self.counters.lock();
        let counter = counters.entry(domain.to_string()).or_insert(0);
        *counter += 1;
        let id = *counter;
        drop(counters);

        if let Some(format) = &self.config.format {
            format.replace("{n}", &id.to_string())
        } else {
            let (prefix, suffix) = self.config.counter_affixes();
            format!("{prefix}{id}{suffix}")
        }
    }

    fn generate_realistic(&self, domain: &str) -> String {
        if domain == "email" {
            let local = self.next_pool_token("email_local");
            let host = self.next_domain_token("email_domain");
            return format!("{local}@{host}");
        }
        self.next_pool_token(domain)
    }

    fn next_pool_token(&self, domain: &str) -> String {
        let index = self.advance_counter(domain);
        pool_token(NAME_POOL, index)
    }

    fn next_domain_token(&self, domain: &str) -> String {
        let index = self.advance_counter(domain);
        DOMAIN_POOL[index % DOMAIN_POOL.len()].to_string()
    }

    fn advance_counter(&self, domain: &str) -> usize {
        let mut counters = self.counters.lock();
        let counter = counters.entry(domain.to_string()).or_insert(0);
        let index = *counter as usize;
        *counter += 1;
        index
    }
}

/// Pick a token from `pool` by index, exhausting every single entry before
/// falling back to two-entry combinations (so the pool of N names yields N
/// unique tokens before any "alex-jordan"-style combination is needed).
fn pool_token(pool: &[&str], index: usize) -> String {
    if index < pool.len() {
        return pool[index].to_string();
    }
    let excess = index - pool.len();
    let i = excess / pool.len();
    let j = excess % pool.len();
    format!("{}-{}", pool[i % pool.len()], pool[(i + j + 1) % pool.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PseudonymizationConfig;

    fn config(mode: PseudonymizationMode) -> PseudonymizationConfig {
        PseudonymizationConfig {
            enabled: true,
            mode,
            ..Default::default()
        }
    }

    #[test]
    fn disabled_returns_fallback() {
        let mut cfg = config(PseudonymizationMode::Hash);
        cfg.enabled = false;
        let p = Pseudonymizer::new(cfg);
        assert_eq!(p.pseudonymize("alice", "***"), "***");
    }

    #[test]
    fn hash_mode_is_stable_and_content_derived() {
        let p = Pseudonymizer::new(config(PseudonymizationMode::Hash));
        let a1 = p.pseudonymize("alice", "***");
        let a2 = p.pseudonymize("alice", "***");
        let b = p.pseudonymize("bob", "***");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert!(a1.starts_with("<hash:"));
    }

    #[test]
    fn hash_mode_matches_across_fresh_instances() {
        let p1 = Pseudonymizer::new(config(PseudonymizationMode::Hash));
        let p2 = Pseudonymizer::new(config(PseudonymizationMode::Hash));
        assert_eq!(p1.pseudonymize("alice", "***"), p2.pseudonymize("alice", "***"));
    }

    #[test]
    fn counter_mode_increments_per_domain() {
        let p = Pseudonymizer::new(config(PseudonymizationMode::Counter));
        let a = p.pseudonymize("alice", "***");
        let b = p.pseudonymize("bob", "***");
        let a_again = p.pseudonymize("alice", "***");
        assert_eq!(a, a_again);
        assert_ne!(a, b);
    }

    #[test]
    fn realistic_mode_exhausts_pool_before_combining() {
        let p = Pseudonymizer::new(config(PseudonymizationMode::Realistic));
        let mut seen = Vec::new();
        for i in 0..NAME_POOL.len() {
            seen.push(p.pseudonymize(&format!("user{i}"), "***"));
        }
        // All distinct, none contain a combination separator yet.
        assert!(seen.iter().all(|s| !s.contains('-')));
        let overflow = p.pseudonymize("one-more-user", "***");
        assert!(overflow.contains('-'));
    }

    #[test]
    fn realistic_email_preserves_local_at_domain_shape() {
        let p = Pseudonymizer::new(config(PseudonymizationMode::Realistic));
        let mut cfg_map = HashMap::new();
        cfg_map.insert("email".to_string(), "email".to_string());
        let out = p.pseudonymize_with_pattern("alice@internal.example", "email", "***");
        assert!(out.contains('@'));
    }

    #[test]
    fn custom_replacement_overrides_generation() {
        let mut cfg = config(PseudonymizationMode::Hash);
        cfg.custom_replacements.insert("alice".to_string(), "AGENT-42".to_string());
        let p = Pseudonymizer::new(cfg);
        assert_eq!(p.pseudonymize("alice", "***"), "AGENT-42");
    }

    #[test]
    fn ports_start_at_1000_and_are_injective() {
        let p = Pseudonymizer::new(config(PseudonymizationMode::Counter));
        let a = p.pseudonymize_port(8080);
        let b = p.pseudonymize_port(8080);
        let c = p.pseudonymize_port(443);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a >= PORT_BASE);
        assert!(c >= PORT_BASE);
    }

    #[test]
    fn ports_use_counter_mode_even_when_global_mode_is_realistic() {
        let p = Pseudonymizer::new(config(PseudonymizationMode::Realistic));
        let a = p.pseudonymize_port(22);
        assert!(a >= PORT_BASE);
    }

    #[test]
    fn clear_cache_resets_everything() {
        let p = Pseudonymizer::new(config(PseudonymizationMode::Counter));
        let first = p.pseudonymize("alice", "***");
        p.pseudonymize_port(8080);
        p.clear_cache();
        let after = p.pseudonymize("alice", "***");
        assert_eq!(first, after); // counter restarts from the same seed
        assert_eq!(p.pseudonymize_port(8080), PORT_BASE);
    }
}
