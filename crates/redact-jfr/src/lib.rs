// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Redacts sensitive values out of Java Flight Recorder (`.flr`) recordings.
//!
//! [`chunk`] reads and writes the binary container, [`descriptor`] models
//! the type graph carried inside it, [`registry`] rebuilds an output type
//! dictionary as events are re-encoded, and [`transcoder`] drives the
//! two-pass discover-then-redact pipeline on top of `redact-core`.

pub mod chunk;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod transcoder;

pub use chunk::{ChunkReader, ChunkWriter};
pub use descriptor::{
    AnnotationInstance, AnnotationValueDescriptor, FieldDescriptor, FieldType, SourceEvent,
    SourceObject, SourceTypePool, SourceValue, TypeDescriptor,
};
pub use error::{AnnotationError, TranscodeError};
pub use registry::{TypeHandle, TypeRegistry};
pub use transcoder::{Transcoder, TranscodeStats};
