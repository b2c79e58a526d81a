// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The JFR type graph: field and annotation descriptors, and the scalar
//! value shape a [`crate::chunk::ChunkReader`] hands back per event.
//!
//! These types mirror what the real `jdk.jfr` metadata event describes —
//! a type has a name, an ordered field list, and an ordered annotation
//! list — without pulling in a real JVM-compatible parser. `TypeRegistry`
//! (see `crate::registry`) consumes this shape to re-register types in an
//! output dictionary.

use std::collections::HashMap;

/// One of the nine JFR primitive storage kinds, or a reference to another
/// named type by its type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
    String,
    Struct(String),
}

impl FieldType {
    pub fn is_primitive(&self) -> bool {
        !matches!(self, FieldType::Struct(_))
    }

    pub fn struct_name(&self) -> Option<&str> {
        match self {
            FieldType::Struct(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// One field in a type's descriptor: its name, scalar or struct type, and
/// whether it is declared as an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub array: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType, array: bool) -> Self {
        Self { name: name.into(), field_type, array }
    }
}

/// One value descriptor attached to an annotation instance: a name plus an
/// optional literal string value. Annotations whose descriptors carry no
/// value at all (marker annotations) have an empty `values` list on the
/// owning [`AnnotationInstance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationValueDescriptor {
    pub name: String,
    pub value: Option<String>,
}

/// One annotation attached to a type or field: the annotation's own type
/// name (itself a registrable type, possibly with further meta-annotations)
/// plus the values supplied at the use site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationInstance {
    pub type_name: String,
    pub values: Vec<AnnotationValueDescriptor>,
}

impl AnnotationInstance {
    pub fn marker(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), values: Vec::new() }
    }

    /// A single-valued annotation whose lone descriptor is named `value`
    /// uses JFR's short `@Name("x")` syntax rather than the builder form;
    /// this is purely an emission-side detail, not part of the stored shape.
    pub fn is_short_form(&self) -> bool {
        self.values.len() == 1 && self.values[0].name == "value"
    }
}

/// Well-known annotation type names the transcoder looks for by name
/// rather than registering special-cased Rust types for each.
pub const CATEGORY_ANNOTATION: &str = "jdk.jfr.Category";
pub const STACK_TRACE_ANNOTATION: &str = "jdk.jfr.StackTrace";

/// A fully described JFR type: its fields in declaration order, its
/// annotations, and the source reader's introspected constant-pool
/// disposition (`None` when the source format doesn't expose it, in which
/// case the registry falls back to the heuristic from §4.F: `StackFrame`
/// inline, everything else pooled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub annotations: Vec<AnnotationInstance>,
    pub is_constant_pool: Option<bool>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new(), annotations: Vec::new(), is_constant_pool: None }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<AnnotationInstance>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Whether this type declares `@StackTrace(true)`. Absent annotation
    /// means false, matching JFR's own default.
    pub fn has_stack_trace_annotation(&self) -> bool {
        self.annotations.iter().any(|a| {
            a.type_name == STACK_TRACE_ANNOTATION
                && a.values
                    .first()
                    .and_then(|v| v.value.as_deref())
                    .map(|v| v != "false")
                    .unwrap_or(true)
        })
    }

    /// `@Category("a", "b")` value list, or empty if absent.
    pub fn categories(&self) -> Vec<String> {
        self.annotations
            .iter()
            .find(|a| a.type_name == CATEGORY_ANNOTATION)
            .map(|a| a.values.iter().filter_map(|v| v.value.clone()).collect())
            .unwrap_or_default()
    }
}

/// One scalar or composite value as produced by [`crate::chunk::ChunkReader`],
/// self-describing enough that the transcoder's emit pass can recurse
/// without consulting the source descriptor (it still prefers the
/// descriptor's field list for emission, per §4.F, so missing fields become
/// nulls rather than simply being omitted).
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Char(char),
    Str(String),
    Struct(SourceObject),
    Array(Vec<SourceValue>),
}

/// A nested structured value: the name of its type plus its field values
/// in whatever order the source writer happened to emit them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceObject {
    pub type_name: String,
    pub fields: Vec<(String, SourceValue)>,
}

impl SourceObject {
    pub fn get(&self, name: &str) -> Option<&SourceValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// One event as read from a chunk: its type name plus its top-level field
/// values. Categories, thread, and sampled-thread are derived from this plus
/// the owning [`TypeDescriptor`] by `crate::transcoder::event_meta`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceEvent {
    pub type_name: String,
    pub fields: Vec<(String, SourceValue)>,
}

impl SourceEvent {
    pub fn get(&self, name: &str) -> Option<&SourceValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// The set of types referenced by one input file, keyed by name. Built by
/// the reader from the chunk's type-dictionary section before any event is
/// decoded, so every event's type is resolvable up front.
#[derive(Debug, Clone, Default)]
pub struct SourceTypePool {
    types: HashMap<String, TypeDescriptor>,
}

impl SourceTypePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
