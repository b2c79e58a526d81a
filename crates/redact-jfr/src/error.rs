// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the chunk format, type registry, and transcoder.

use thiserror::Error;

/// Failure registering one annotation instance. Never fatal to the caller:
/// the transcoder logs this at debug and skips the annotation, per §4.F.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("annotation {type_name} has unsupported field type on value {value_name}")]
    UnsupportedFieldType { type_name: String, value_name: String },

    #[error("annotation type {0} could not be registered: {1}")]
    TypeRegistration(String, Box<TranscodeError>),
}

/// Errors surfaced by the chunk reader/writer, type registry, and
/// transcoder loop.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] redact_core::CoreError),

    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    #[error("unknown type referenced: {0}")]
    UnknownType(String),

    #[error("type collision: {name} already registered with an incompatible field set")]
    TypeCollision { name: String },

    #[error("unsupported value in array field {field}")]
    UnsupportedArrayElement { field: String },

    #[error("checksum mismatch in chunk trailer")]
    ChecksumMismatch,
}
