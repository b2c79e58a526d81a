// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interactive-decision persistence.
//!
//! The interactive decision manager itself (the prompt loop that asks a
//! human "redact this value?") lives outside this crate's scope — the core
//! only consumes its `get_decision(value)` oracle and replays whatever it
//! persisted. [`DecisionStore`] is the on-disk replay format: a YAML
//! document keyed by lowercased value under one of four categories.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// What the user chose for one discovered value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    /// Leave the value alone wherever it appears.
    Keep,
    /// Redact this specific value.
    Redact,
    /// Redact this specific value with an explicit replacement string.
    Replace,
    /// Keep every value of this decision's category from now on, without
    /// further prompts.
    KeepAll,
    /// Redact every value of this decision's category from now on, without
    /// further prompts.
    RedactAll,
}

/// One persisted decision: the action, an optional literal replacement
/// (meaningful only for `REPLACE`), and when it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    pub fn new(action: DecisionAction, timestamp: DateTime<Utc>) -> Self {
        Self {
            action,
            replacement: None,
            timestamp,
        }
    }

    pub fn replace(replacement: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            action: DecisionAction::Replace,
            replacement: Some(replacement.into()),
            timestamp,
        }
    }

    /// Whether, per this single decision, the value should be left as-is.
    pub fn keeps_value(&self) -> bool {
        matches!(self.action, DecisionAction::Keep | DecisionAction::KeepAll)
    }
}

/// The category a decision was recorded under. `Custom` carries the
/// extractor's bucket name, mirroring `custom_patterns[name]` in the YAML
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecisionCategory {
    Username,
    Hostname,
    Folder,
    Custom(String),
}

/// On-disk replay format for interactive decisions:
///
/// ```yaml
/// version: 1
/// usernames:
///   alice: { action: REDACT, timestamp: "2026-01-01T00:00:00Z" }
/// hostnames: {}
/// folders: {}
/// custom_patterns:
///   api_keys:
///     sk-live-abcd: { action: REPLACE, replacement: "sk-live-***", timestamp: "..." }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DecisionStore {
    pub version: u32,
    pub usernames: HashMap<String, Decision>,
    pub hostnames: HashMap<String, Decision>,
    pub folders: HashMap<String, Decision>,
    pub custom_patterns: HashMap<String, HashMap<String, Decision>>,
}

impl DecisionStore {
    pub fn new() -> Self {
        Self {
            version: 1,
            ..Default::default()
        }
    }

    /// Load decisions from `path`. A missing file is not an error: it is
    /// logged as a warning and treated as an empty decision set, per the
    /// core's error-handling design for decision-file I/O.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_yaml::from_str(&text) {
                Ok(store) => store,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "malformed decision file, starting empty");
                    Self::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::new(),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read decision file, starting empty");
                Self::new()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let text = serde_yaml::to_string(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn bucket(&self, category: &DecisionCategory) -> Option<&HashMap<String, Decision>> {
        match category {
            DecisionCategory::Username => Some(&self.usernames),
            DecisionCategory::Hostname => Some(&self.hostnames),
            DecisionCategory::Folder => Some(&self.folders),
            DecisionCategory::Custom(name) => self.custom_patterns.get(name),
        }
    }

    fn bucket_mut(&mut self, category: &DecisionCategory) -> &mut HashMap<String, Decision> {
        match category {
            DecisionCategory::Username => &mut self.usernames,
            DecisionCategory::Hostname => &mut self.hostnames,
            DecisionCategory::Folder => &mut self.folders,
            DecisionCategory::Custom(name) => self.custom_patterns.entry(name.clone()).or_default(),
        }
    }

    /// Look up a decision by lowercased value within `category`.
    pub fn get(&self, category: &DecisionCategory, value: &str) -> Option<&Decision> {
        self.bucket(category)?.get(&value.to_lowercase())
    }

    pub fn set(&mut self, category: &DecisionCategory, value: &str, decision: Decision) {
        self.bucket_mut(category).insert(value.to_lowercase(), decision);
    }
}

/// The contract the core depends on for interactive replay: a prompt
/// loop lives outside this crate, the core only calls these three methods.
/// `get_decision`/`get_folder_decision` block on human input; `save`
/// persists whatever was decided to the [`DecisionStore`] format above.
pub trait InteractiveOracle {
    fn get_decision(&mut self, value: &str) -> Decision;
    fn get_folder_decision(&mut self, path: &str) -> Decision;
    fn save(&self) -> Result<(), CoreError>;
}

/// The no-prompt oracle: every value is kept, nothing is ever persisted.
/// Used whenever a caller runs discovery without attaching a real
/// decision manager (a terminal prompt loop is an external concern; this
/// crate only ships the trait and this trivial implementation of it).
#[derive(Debug, Default)]
pub struct NullOracle;

impl InteractiveOracle for NullOracle {
    fn get_decision(&mut self, _value: &str) -> Decision {
        Decision::new(DecisionAction::Keep, Utc::now())
    }

    fn get_folder_decision(&mut self, _path: &str) -> Decision {
        Decision::new(DecisionAction::Keep, Utc::now())
    }

    fn save(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
