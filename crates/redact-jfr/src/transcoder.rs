// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Two-pass JFR redaction: [`Transcoder::discover`] runs the pattern
//! discovery engine over an unmodified recording, [`Transcoder::transcode`]
//! rewrites it field-by-field through the redaction engine seeded by the
//! first pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use redact_core::{
    FieldValue, InteractiveOracle, PatternDiscoveryEngine, RecordedEvent, RecordedObject,
    RedactionEngine,
};

use crate::chunk::{ChunkReader, ChunkWriter};
use crate::descriptor::{FieldType, SourceEvent, SourceObject, SourceValue, TypeDescriptor};
use crate::error::TranscodeError;
use crate::registry::TypeRegistry;

/// Counts collected during [`Transcoder::transcode`], surfaced to the CLI
/// binary for a final summary log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TranscodeStats {
    pub events_read: u64,
    pub events_written: u64,
    pub events_removed: u64,
}

/// Drives discovery and redaction over one `.flr` recording. Holds no
/// state across different input files — construct a fresh one per run.
pub struct Transcoder {
    discovery: PatternDiscoveryEngine,
    redaction: RedactionEngine,
    cancel: Option<Arc<AtomicBool>>,
}

impl Transcoder {
    pub fn new(config: &redact_core::Configuration, redaction: RedactionEngine) -> Self {
        Self {
            discovery: PatternDiscoveryEngine::from_config(&config.discovery, &config.builtin_patterns),
            redaction,
            cancel: None,
        }
    }

    /// Attach a cooperative-cancellation flag, checked between events in
    /// both passes. Mirrors the `running: Arc<AtomicBool>` flag the
    /// workspace's other long-running CLI binaries poll from a
    /// `ctrlc::set_handler`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map(|f| !f.load(Ordering::SeqCst)).unwrap_or(false)
    }

    /// First pass: learn discoverable values from every surviving event,
    /// then seed the redaction engine with what was found. When `oracle`
    /// is supplied, sticky per-category decisions are applied and
    /// persisted before the redaction engine is seeded.
    pub fn discover(
        &mut self,
        input: &mut ChunkReader,
        oracle: Option<&mut dyn InteractiveOracle>,
    ) -> Result<(), TranscodeError> {
        while let Some(event) = input.next_event()? {
            if self.cancelled() {
                break;
            }
            let type_descriptor = input.type_pool().get(&event.type_name);
            let (categories, thread, sampled_thread) = event_meta(type_descriptor, &event);
            if self
                .redaction
                .should_remove_event(&event.type_name, thread.as_deref(), sampled_thread.as_deref(), &categories)
            {
                continue;
            }
            let recorded = to_recorded_event(&event, categories, thread, sampled_thread);
            self.discovery.discover_event(&recorded);
        }

        let mut patterns = self.discovery.get_discovered_patterns();
        if let Some(oracle) = oracle {
            PatternDiscoveryEngine::apply_interactive_decisions(&mut patterns, oracle);
            oracle.save()?;
        }
        self.redaction.set_discovered(patterns);
        Ok(())
    }

    /// Second pass: re-register every referenced type into a fresh output
    /// dictionary, rewrite each surviving event's fields through the
    /// redaction engine, and write the output type dictionary trailer.
    /// Consumes `output` because [`ChunkWriter::finish`] does.
    pub fn transcode(
        &self,
        input: &mut ChunkReader,
        mut output: ChunkWriter,
    ) -> Result<TranscodeStats, TranscodeError> {
        let mut registry = TypeRegistry::new();
        let mut stats = TranscodeStats::default();

        while let Some(event) = input.next_event()? {
            if self.cancelled() {
                break;
            }
            stats.events_read += 1;

            let type_descriptor = input.type_pool().get(&event.type_name);
            let (categories, thread, sampled_thread) = event_meta(type_descriptor, &event);
            if self
                .redaction
                .should_remove_event(&event.type_name, thread.as_deref(), sampled_thread.as_deref(), &categories)
            {
                stats.events_removed += 1;
                continue;
            }

            let handle = registry.register_event_type(input.type_pool(), &event.type_name)?;
            let descriptor = registry.get(handle).clone();

            let redacted_fields = redact_fields(&self.redaction, &registry, &descriptor.fields, &event.fields);
            output.write_event(&event.type_name, &redacted_fields)?;
            stats.events_written += 1;
        }

        output.finish(registry.types())?;
        Ok(stats)
    }
}

/// Resolve an event's category path, executing thread name, and sampled
/// thread name (async-sample style events) from its type descriptor and
/// field values.
fn event_meta(
    descriptor: Option<&TypeDescriptor>,
    event: &SourceEvent,
) -> (Vec<String>, Option<String>, Option<String>) {
    let categories = descriptor.map(|d| d.categories()).unwrap_or_default();
    let thread = event.get("eventThread").and_then(thread_name_of);
    let sampled_thread = event.get("sampledThread").and_then(thread_name_of);
    (categories, thread, sampled_thread)
}

fn thread_name_of(value: &SourceValue) -> Option<String> {
    match value {
        SourceValue::Struct(obj) => match obj.get("javaName").or_else(|| obj.get("osName")) {
            Some(SourceValue::Str(name)) => Some(name.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn to_recorded_event(
    event: &SourceEvent,
    categories: Vec<String>,
    thread: Option<String>,
    sampled_thread: Option<String>,
) -> RecordedEvent {
    RecordedEvent {
        event_type: event.type_name.clone(),
        categories,
        thread,
        sampled_thread,
        fields: event.fields.iter().map(|(name, v)| (name.clone(), to_field_value(v))).collect(),
    }
}

fn to_field_value(value: &SourceValue) -> FieldValue {
    match value {
        SourceValue::Null => FieldValue::Null,
        SourceValue::Byte(b) => FieldValue::Int(*b as i64),
        SourceValue::Short(s) => FieldValue::Int(*s as i64),
        SourceValue::Int(i) => FieldValue::Int(*i as i64),
        SourceValue::Long(l) => FieldValue::Int(*l),
        SourceValue::Float(f) => FieldValue::Float(*f as f64),
        SourceValue::Double(d) => FieldValue::Float(*d),
        SourceValue::Boolean(b) => FieldValue::Bool(*b),
        SourceValue::Char(c) => FieldValue::Str(c.to_string()),
        SourceValue::Str(s) => FieldValue::Str(s.clone()),
        SourceValue::Struct(obj) => FieldValue::Struct(RecordedObject::new(
            obj.fields.iter().map(|(n, v)| (n.clone(), to_field_value(v))).collect(),
        )),
        SourceValue::Array(items) => FieldValue::Array(items.iter().map(to_field_value).collect()),
    }
}

/// The zero/empty value for a scalar field type, used when the source
/// object is missing a field the output descriptor declares.
fn null_for(field_type: &FieldType) -> SourceValue {
    match field_type {
        FieldType::Byte => SourceValue::Byte(0),
        FieldType::Short => SourceValue::Short(0),
        FieldType::Int => SourceValue::Int(0),
        FieldType::Long => SourceValue::Long(0),
        FieldType::Float => SourceValue::Float(0.0),
        FieldType::Double => SourceValue::Double(0.0),
        FieldType::Boolean => SourceValue::Boolean(false),
        FieldType::Char => SourceValue::Char('\0'),
        FieldType::String => SourceValue::Str(String::new()),
        FieldType::Struct(_) => SourceValue::Null,
    }
}

fn redact_fields(
    engine: &RedactionEngine,
    registry: &TypeRegistry,
    descriptor_fields: &[crate::descriptor::FieldDescriptor],
    source_fields: &[(String, SourceValue)],
) -> Vec<(String, SourceValue)> {
    descriptor_fields
        .iter()
        .map(|field| {
            let source = source_fields.iter().find(|(n, _)| n == &field.name).map(|(_, v)| v);
            let value = redact_field(engine, registry, field, source);
            (field.name.clone(), value)
        })
        .collect()
}

fn redact_field(
    engine: &RedactionEngine,
    registry: &TypeRegistry,
    field: &crate::descriptor::FieldDescriptor,
    source: Option<&SourceValue>,
) -> SourceValue {
    if field.array {
        let items = match source {
            Some(SourceValue::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        return SourceValue::Array(
            items.iter().map(|item| redact_scalar(engine, registry, &field.field_type, &field.name, Some(item))).collect(),
        );
    }
    redact_scalar(engine, registry, &field.field_type, &field.name, source)
}

fn redact_scalar(
    engine: &RedactionEngine,
    registry: &TypeRegistry,
    field_type: &FieldType,
    field_name: &str,
    source: Option<&SourceValue>,
) -> SourceValue {
    match field_type {
        FieldType::Struct(type_name) => {
            let nested_fields = match source {
                Some(SourceValue::Struct(obj)) => obj.fields.clone(),
                _ => Vec::new(),
            };
            let nested_descriptor = registry.handle_of(type_name).map(|h| registry.get(h).clone());
            let redacted = match &nested_descriptor {
                Some(d) => redact_fields(engine, registry, &d.fields, &nested_fields),
                None => nested_fields,
            };
            SourceValue::Struct(SourceObject { type_name: type_name.clone(), fields: redacted })
        }
        FieldType::String => match source {
            Some(SourceValue::Str(s)) => SourceValue::Str(engine.redact_field_string(field_name, s)),
            _ => null_for(field_type),
        },
        FieldType::Int | FieldType::Short | FieldType::Byte | FieldType::Long => match source {
            Some(SourceValue::Int(i)) => SourceValue::Int(engine.redact_int(field_name, *i as i64) as i32),
            Some(SourceValue::Short(s)) => SourceValue::Short(engine.redact_int(field_name, *s as i64) as i16),
            Some(SourceValue::Byte(b)) => SourceValue::Byte(engine.redact_int(field_name, *b as i64) as i8),
            Some(SourceValue::Long(l)) => SourceValue::Long(engine.redact_int(field_name, *l)),
            _ => null_for(field_type),
        },
        _ => source.cloned().unwrap_or_else(|| null_for(field_type)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redact_core::Configuration;

    fn engine() -> RedactionEngine {
        RedactionEngine::disabled()
    }

    #[test]
    fn null_for_string_is_empty_not_null() {
        assert_eq!(null_for(&FieldType::String), SourceValue::Str(String::new()));
    }

    #[test]
    fn redact_scalar_fills_missing_string_field_with_empty_string() {
        let registry = TypeRegistry::new();
        let result = redact_scalar(&engine(), &registry, &FieldType::String, "message", None);
        assert_eq!(result, SourceValue::Str(String::new()));
    }

    #[test]
    fn thread_name_reads_java_name_field() {
        let obj = SourceValue::Struct(SourceObject {
            type_name: "jdk.types.Thread".into(),
            fields: vec![("javaName".into(), SourceValue::Str("main".into()))],
        });
        assert_eq!(thread_name_of(&obj).as_deref(), Some("main"));
    }

    #[test]
    fn to_field_value_maps_numeric_widths_into_int() {
        assert_eq!(to_field_value(&SourceValue::Short(7)), FieldValue::Int(7));
        assert_eq!(to_field_value(&SourceValue::Long(-1)), FieldValue::Int(-1));
    }

    #[test]
    fn disabled_engine_leaves_strings_untouched_through_redact_scalar() {
        let registry = TypeRegistry::new();
        let result = redact_scalar(
            &engine(),
            &registry,
            &FieldType::String,
            "message",
            Some(&SourceValue::Str("hello".into())),
        );
        assert_eq!(result, SourceValue::Str("hello".into()));
    }

    #[test]
    fn transcoder_new_builds_from_default_config() {
        let config = Configuration::default();
        let _transcoder = Transcoder::new(&config, RedactionEngine::disabled());
    }
}
