// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pattern discovery, pseudonymization, and redaction engine shared by the
//! JFR (`redact-jfr`) and text-log (`redact-text`) redactors.
//!
//! This crate never parses a JFR chunk or a log file itself. It only ever
//! sees values already lifted into the generic [`model::RecordedEvent`] /
//! [`model::FieldValue`] shape, so the binary-format surgeon and the
//! line-oriented companion can share one discovery and redaction
//! implementation without either depending on the other.

pub mod config;
pub mod decision;
pub mod discovery;
pub mod discovery_store;
pub mod error;
pub mod model;
pub mod pattern;
pub mod pseudonymizer;
pub mod redaction;

pub use config::{load_config, Configuration};
pub use decision::{Decision, DecisionAction, DecisionStore, InteractiveOracle, NullOracle};
pub use discovery::PatternDiscoveryEngine;
pub use discovery_store::{DiscoveredPatterns, DiscoveredValue};
pub use error::CoreError;
pub use model::{FieldValue, RecordedEvent, RecordedObject};
pub use pattern::{CompiledPattern, PatternMatcher, PatternType};
pub use pseudonymizer::Pseudonymizer;
pub use redaction::{RedactionEngine, RedactionStats};
