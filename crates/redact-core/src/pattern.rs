// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pattern compiler.
//!
//! Turns a policy tree's string patterns into compiled extractors: either a
//! literal substring matcher (fast path) or a compiled regex. Classification
//! is a cheap character scan, so false negatives (falling back to regex for
//! something that could have been a literal) only cost speed, never
//! correctness.

use regex::Regex;

/// The closed set of semantic categories a discovered or configured value
/// can belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternType {
    Username,
    Hostname,
    EmailLocalPart,
    /// Carries the bucket-keying name for a user-defined extractor.
    Custom(String),
}

impl PatternType {
    /// Stable key used when bucketing discovered values by type.
    pub fn bucket_key(&self) -> &str {
        match self {
            Self::Username => "username",
            Self::Hostname => "hostname",
            Self::EmailLocalPart => "email_local_part",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Parse the `pattern_type` string used in policy YAML. Anything other
    /// than the three built-in names becomes a custom bucket.
    pub fn from_config_str(value: &str) -> Self {
        match value {
            "username" => Self::Username,
            "hostname" => Self::Hostname,
            "email_local_part" => Self::EmailLocalPart,
            other => Self::Custom(other.to_string()),
        }
    }
}

const REGEX_METACHARACTERS: &[char] =
    &['.', '*', '+', '?', '[', ']', '(', ')', '{', '}', '^', '$', '|', '\\'];

/// Returns true if `pattern` contains no regex metacharacters, meaning it can
/// be matched with a plain substring search instead of a compiled regex.
pub fn is_literal_pattern(pattern: &str) -> bool {
    !pattern.chars().any(|c| REGEX_METACHARACTERS.contains(&c))
}

/// A compiled pattern: either a literal substring or a regular expression.
#[derive(Debug, Clone)]
pub enum PatternMatcher {
    StringMatcher { substring: String, case_sensitive: bool },
    RegexMatcher { regex: Regex },
}

impl PatternMatcher {
    /// Compile `pattern`, picking the literal fast path when possible.
    /// Regex compile failures are logged and return `None`; the caller skips
    /// the offending pattern rather than treating it as fatal.
    pub fn compile(pattern: &str, case_sensitive: bool) -> Option<Self> {
        if is_literal_pattern(pattern) {
            return Some(Self::compile_literal(pattern, case_sensitive));
        }

        let effective = if case_sensitive {
            pattern.to_string()
        } else {
            format!("(?i){pattern}")
        };

        match Regex::new(&effective) {
            Ok(regex) => Some(Self::RegexMatcher { regex }),
            Err(err) => {
                tracing::warn!(pattern, error = %err, "failed to compile pattern, skipping");
                None
            }
        }
    }

    /// Build a literal substring matcher unconditionally, bypassing the
    /// literal-vs-regex classifier entirely. Discovered values are learned
    /// data, not policy-authored patterns: running one through the regex
    /// path would let a metacharacter in the learned text either over-match
    /// (`.` matching any byte) or fail to compile at all, which would
    /// silently let the value through unredacted. Always infallible.
    pub fn compile_literal(value: &str, case_sensitive: bool) -> Self {
        Self::StringMatcher {
            substring: if case_sensitive {
                value.to_string()
            } else {
                value.to_lowercase()
            },
            case_sensitive,
        }
    }

    /// Whether this matcher finds anything in `text`.
    pub fn find(&self, text: &str) -> bool {
        match self {
            Self::StringMatcher { substring, case_sensitive } => {
                if *case_sensitive {
                    text.contains(substring.as_str())
                } else {
                    text.to_lowercase().contains(substring.as_str())
                }
            }
            Self::RegexMatcher { regex } => regex.is_match(text),
        }
    }

    /// Iterate over every match in `text`, returning the full-match span for
    /// literal matchers or the span of the requested capture group for regex
    /// matchers (falling back to the whole match if the group is absent).
    pub fn find_iter<'t>(&self, text: &'t str, capture_group: usize) -> Vec<(usize, usize, &'t str)> {
        match self {
            Self::StringMatcher { substring, case_sensitive } => {
                let needle = substring.as_str();
                if needle.is_empty() {
                    return Vec::new();
                }
                if *case_sensitive {
                    let mut out = Vec::new();
                    let mut start = 0;
                    while let Some(pos) = text[start..].find(needle) {
                        let abs = start + pos;
                        out.push((abs, abs + needle.len(), &text[abs..abs + needle.len()]));
                        start = abs + needle.len();
                    }
                    out
                } else {
                    find_case_insensitive(text, needle)
                }
            }
            Self::RegexMatcher { regex } => regex
                .captures_iter(text)
                .filter_map(|caps| {
                    let m = if capture_group == 0 {
                        caps.get(0)
                    } else {
                        caps.get(capture_group)
                    }?;
                    Some((m.start(), m.end(), m.as_str()))
                })
                .collect(),
        }
    }
}

/// Case-fold `text` and find every occurrence of already-lowercased
/// `needle`, returning spans against the *original* `text`'s byte offsets.
/// Lower-casing can change a character's byte length (e.g. `İ` expands
/// under Unicode case folding), so matching against a lowercased copy and
/// slicing the original at the same byte offsets can land off a char
/// boundary and panic. Tracking each original char's start alongside its
/// folded byte offset keeps the two in lockstep.
fn find_case_insensitive<'t>(text: &'t str, needle: &str) -> Vec<(usize, usize, &'t str)> {
    let mut lowered = String::with_capacity(text.len());
    let mut lowered_bounds = Vec::new();
    let mut original_bounds = Vec::new();
    for (idx, ch) in text.char_indices() {
        lowered_bounds.push(lowered.len());
        original_bounds.push(idx);
        for lc in ch.to_lowercase() {
            lowered.push(lc);
        }
    }
    lowered_bounds.push(lowered.len());
    original_bounds.push(text.len());

    let to_original = |lowered_offset: usize| -> usize {
        match lowered_bounds.binary_search(&lowered_offset) {
            Ok(i) => original_bounds[i],
            Err(i) => original_bounds[i.saturating_sub(1)],
        }
    };

    let mut out = Vec::new();
    let mut start = 0;
    while let Some(pos) = lowered[start..].find(needle) {
        let lowered_start = start + pos;
        let lowered_end = lowered_start + needle.len();
        let orig_start = to_original(lowered_start);
        let orig_end = to_original(lowered_end);
        out.push((orig_start, orig_end, &text[orig_start..orig_end]));
        start = lowered_end;
    }
    out
}

/// A fully compiled extractor: the matcher plus the policy knobs that govern
/// whether a match is reported (whitelist, ignore lists, thresholds).
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub name: String,
    pub matcher: PatternMatcher,
    pub capture_group: usize,
    pub case_sensitive: bool,
    pub whitelist: Vec<String>,
    pub ignore_exact: Vec<String>,
    pub ignore_regex: Vec<Regex>,
    pub ignore_after: Vec<String>,
    pub min_occurrences: u32,
    pub pattern_type: PatternType,
}

impl CompiledPattern {
    /// True if `value` should never be reported: empty, whitelisted, or
    /// matching one of the ignore lists.
    pub fn is_ignored(&self, value: &str, surrounding: &str) -> bool {
        if value.is_empty() {
            return true;
        }
        if self
            .whitelist
            .iter()
            .any(|w| w.eq_ignore_ascii_case(value))
        {
            return true;
        }
        if self
            .ignore_exact
            .iter()
            .any(|w| w.eq_ignore_ascii_case(value))
        {
            return true;
        }
        if self.ignore_regex.iter().any(|re| re.is_match(value)) {
            return true;
        }
        if self
            .ignore_after
            .iter()
            .any(|prefix| surrounding.contains(prefix.as_str()) && surrounding.find(prefix.as_str()).map(|p| p + prefix.len()).and_then(|after| surrounding.get(after..)).map(|rest| rest.starts_with(value)).unwrap_or(false))
        {
            return true;
        }
        false
    }
}

/// Compile the user-configured `patterns:` list into [`CompiledPattern`]s,
/// skipping disabled entries and entries whose regex fails to compile
/// (logged, never fatal — configuration errors never abort a run).
pub fn compile_custom_patterns(defs: &[crate::config::PatternDefinition]) -> Vec<CompiledPattern> {
    defs.iter()
        .filter(|def| def.enabled)
        .filter_map(|def| {
            let matcher = PatternMatcher::compile(&def.pattern, def.case_sensitive)?;
            let ignore_regex = def
                .ignore_regex
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect();
            Some(CompiledPattern {
                name: def.name.clone(),
                matcher,
                capture_group: def.capture_group,
                case_sensitive: def.case_sensitive,
                whitelist: def.whitelist.clone(),
                ignore_exact: def.ignore_exact.clone(),
                ignore_regex,
                ignore_after: def.ignore_after.clone(),
                min_occurrences: def.min_occurrences.max(1),
                pattern_type: PatternType::from_config_str(&def.pattern_type),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_custom_patterns_skips_disabled_and_invalid() {
        use crate::config::PatternDefinition;

        let defs = vec![
            PatternDefinition {
                name: "good".into(),
                pattern: "alice".into(),
                pattern_type: "username".into(),
                ..Default::default()
            },
            PatternDefinition {
                name: "disabled".into(),
                pattern: "bob".into(),
                enabled: false,
                ..Default::default()
            },
        ];
        let compiled = compile_custom_patterns(&defs);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].name, "good");
    }

    #[test]
    fn literal_classification() {
        assert!(is_literal_pattern("alice"));
        assert!(is_literal_pattern("my-host_01"));
        assert!(!is_literal_pattern("alice.*"));
        assert!(!is_literal_pattern("[a-z]+"));
    }

    #[test]
    fn literal_matcher_is_case_insensitive_by_default() {
        let m = PatternMatcher::compile("F5N", false).unwrap();
        assert!(m.find("uname: Darwin f5n 22.6.0"));
    }

    #[test]
    fn regex_matcher_capture_group() {
        let m = PatternMatcher::compile(r"/Users/(\w+)/", true).unwrap();
        let hits = m.find_iter("File: /Users/alice/project", 1);
        assert_eq!(hits, vec![(13, 18, "alice")]);
    }

    #[test]
    fn compile_literal_never_treats_metacharacters_as_regex() {
        // A discovered value containing regex metacharacters must match as
        // a plain substring: `.` should not become "any character", and a
        // value that isn't a valid regex (unbalanced `[`) must still match
        // instead of silently compiling to nothing.
        let hostname = PatternMatcher::compile_literal("web01.corp.internal", false);
        // As a regex, `.` would match any character; as a literal it must not.
        assert!(!hostname.find("reached webXcorpYinternal today"));
        assert!(!hostname.find("reached web01Xcorp.internal today"));
        assert!(hostname.find("reached web01.corp.internal today"));

        let bracket = PatternMatcher::compile_literal("foo[bar", false);
        assert!(bracket.find("token was foo[bar exactly"));
    }

    #[test]
    fn find_iter_case_insensitive_does_not_panic_on_multibyte_text() {
        // 'İ' (U+0130) lowercases to the two-character "i̇" (i + combining
        // dot above), so a lowercased copy of text containing it is longer
        // in bytes than the original. Offsets must stay anchored to the
        // original string's char boundaries instead of the folded copy's.
        let m = PatternMatcher::compile_literal("istanbul", false);
        let text = "İ prefix istanbul é suffix";
        let hits = m.find_iter(text, 0);
        assert_eq!(hits.len(), 1);
        let (start, end, matched) = hits[0];
        assert!(text.is_char_boundary(start) && text.is_char_boundary(end));
        assert_eq!(matched, "istanbul");
        assert_eq!(&text[start..end], "istanbul");
    }

    #[test]
    fn whitelist_bypasses_insertion() {
        let pattern = CompiledPattern {
            name: "hostnames".into(),
            matcher: PatternMatcher::compile("localhost", false).unwrap(),
            capture_group: 0,
            case_sensitive: false,
            whitelist: vec!["localhost".into()],
            ignore_exact: vec![],
            ignore_regex: vec![],
            ignore_after: vec![],
            min_occurrences: 1,
            pattern_type: PatternType::Hostname,
        };
        assert!(pattern.is_ignored("LOCALHOST", "Host: LOCALHOST"));
        assert!(!pattern.is_ignored("f5n", "Host: f5n"));
    }
}
