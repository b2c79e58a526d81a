// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end transcode: write a small recording with a cyclic thread
//! type and a few sensitive string values, run discovery then transcode,
//! and check the rewritten recording both redacts the sensitive values and
//! preserves the event/type shape.

use std::sync::Arc;

use redact_core::{Configuration, NullOracle, Pseudonymizer, RedactionEngine};
use redact_jfr::chunk::{ChunkReader, ChunkWriter};
use redact_jfr::descriptor::{
    AnnotationInstance, AnnotationValueDescriptor, FieldDescriptor, FieldType, SourceObject,
    SourceTypePool, SourceValue, TypeDescriptor, CATEGORY_ANNOTATION,
};
use redact_jfr::transcoder::Transcoder;

fn thread_type() -> TypeDescriptor {
    TypeDescriptor {
        name: "jdk.types.Thread".to_string(),
        fields: vec![FieldDescriptor::new("javaName", FieldType::String, false)],
        annotations: Vec::new(),
        is_constant_pool: Some(true),
    }
}

fn socket_read_type() -> TypeDescriptor {
    TypeDescriptor {
        name: "jdk.SocketRead".to_string(),
        fields: vec![
            FieldDescriptor::new("startTime", FieldType::Long, false),
            FieldDescriptor::new("host", FieldType::String, false),
            FieldDescriptor::new("eventThread", FieldType::Struct("jdk.types.Thread".to_string()), false),
        ],
        annotations: vec![AnnotationInstance {
            type_name: CATEGORY_ANNOTATION.to_string(),
            values: vec![AnnotationValueDescriptor { name: "value".into(), value: Some("Java Application".into()) }],
        }],
        is_constant_pool: Some(false),
    }
}

fn write_sample_recording(path: &std::path::Path) {
    let mut writer = ChunkWriter::create(path).unwrap();
    writer
        .write_event(
            "jdk.SocketRead",
            &[
                ("startTime".into(), SourceValue::Long(1000)),
                ("host".into(), SourceValue::Str("10.0.0.42".into())),
                (
                    "eventThread".into(),
                    SourceValue::Struct(SourceObject {
                        type_name: "jdk.types.Thread".into(),
                        fields: vec![("javaName".into(), SourceValue::Str("main".into()))],
                    }),
                ),
            ],
        )
        .unwrap();
    writer
        .write_event(
            "jdk.SocketRead",
            &[
                ("startTime".into(), SourceValue::Long(2000)),
                ("host".into(), SourceValue::Str("alice@corp.internal".into())),
                (
                    "eventThread".into(),
                    SourceValue::Struct(SourceObject {
                        type_name: "jdk.types.Thread".into(),
                        fields: vec![("javaName".into(), SourceValue::Str("worker-1".into()))],
                    }),
                ),
            ],
        )
        .unwrap();

    let mut pool = SourceTypePool::new();
    pool.insert(thread_type());
    pool.insert(socket_read_type());
    let types: Vec<TypeDescriptor> = vec![
        pool.get("jdk.types.Thread").unwrap().clone(),
        pool.get("jdk.SocketRead").unwrap().clone(),
    ];
    writer.finish(&types).unwrap();
}

#[test]
fn full_transcode_redacts_ip_and_preserves_event_shape() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.flr");
    let output_path = dir.path().join("output.flr");
    write_sample_recording(&input_path);

    let config = Configuration::default();
    let pseudonymizer = Arc::new(Pseudonymizer::new(config.general.pseudonymization.clone()));
    let redaction = RedactionEngine::from_config(&config, pseudonymizer);
    let mut transcoder = Transcoder::new(&config, redaction);

    let mut reader = ChunkReader::open(&input_path).unwrap();
    let mut oracle = NullOracle;
    transcoder.discover(&mut reader, Some(&mut oracle)).unwrap();

    let mut reader = ChunkReader::open(&input_path).unwrap();
    let writer = ChunkWriter::create(&output_path).unwrap();
    let stats = transcoder.transcode(&mut reader, writer).unwrap();

    assert_eq!(stats.events_read, 2);
    assert_eq!(stats.events_written, 2);
    assert_eq!(stats.events_removed, 0);

    let mut output_reader = ChunkReader::open(&output_path).unwrap();
    assert_eq!(output_reader.event_count(), 2);
    assert!(output_reader.type_pool().get("jdk.types.Thread").is_some());
    assert!(output_reader.type_pool().get("jdk.SocketRead").is_some());

    let first = output_reader.next_event().unwrap().unwrap();
    match first.get("host") {
        Some(SourceValue::Str(s)) => assert!(!s.contains("10.0.0.42"), "IP address should be redacted, got {s}"),
        other => panic!("expected redacted host string, got {other:?}"),
    }
    match first.get("eventThread") {
        Some(SourceValue::Struct(obj)) => assert_eq!(obj.type_name, "jdk.types.Thread"),
        other => panic!("expected eventThread struct, got {other:?}"),
    }

    let second = output_reader.next_event().unwrap().unwrap();
    match second.get("host") {
        Some(SourceValue::Str(s)) => {
            assert!(!s.contains("alice"), "username-carrying value should be redacted, got {s}")
        }
        other => panic!("expected redacted host string, got {other:?}"),
    }

    assert!(output_reader.next_event().unwrap().is_none());
}

#[test]
fn removed_event_type_is_dropped_from_output() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.flr");
    let output_path = dir.path().join("output.flr");
    write_sample_recording(&input_path);

    let mut config = Configuration::default();
    config.events.remove_enabled = true;
    config.events.removed_types.push("jdk.SocketRead".to_string());

    let pseudonymizer = Arc::new(Pseudonymizer::new(config.general.pseudonymization.clone()));
    let redaction = RedactionEngine::from_config(&config, pseudonymizer);
    let mut transcoder = Transcoder::new(&config, redaction);

    let mut reader = ChunkReader::open(&input_path).unwrap();
    let mut oracle = NullOracle;
    transcoder.discover(&mut reader, Some(&mut oracle)).unwrap();

    let mut reader = ChunkReader::open(&input_path).unwrap();
    let writer = ChunkWriter::create(&output_path).unwrap();
    let stats = transcoder.transcode(&mut reader, writer).unwrap();

    assert_eq!(stats.events_removed, 2);
    assert_eq!(stats.events_written, 0);

    let mut output_reader = ChunkReader::open(&output_path).unwrap();
    assert_eq!(output_reader.event_count(), 0);
}
