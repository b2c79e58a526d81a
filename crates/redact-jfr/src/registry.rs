// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Output type dictionary.
//!
//! Types are registered into an arena (`Vec<TypeDescriptor>` plus a
//! `HashMap<String, usize>` name index) instead of a reflective registry,
//! so a cyclic type graph (`Thread` referencing `Thread`) resolves by
//! publishing the handle before recursing into the type's own fields —
//! a later lookup of the same name mid-registration finds the
//! already-reserved slot instead of recursing forever.

use std::collections::HashMap;

use crate::descriptor::{FieldDescriptor, FieldType, SourceTypePool, TypeDescriptor};
use crate::error::{AnnotationError, TranscodeError};

/// A registered type's address in the arena. Stable for the life of the
/// registry: types are never removed or reordered once added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHandle(pub usize);

/// A type as it will be written to the output dictionary: the same shape
/// as a source [`TypeDescriptor`], but with `is_constant_pool` always
/// resolved (never `None`) and implicit event fields already injected.
pub type RegisteredType = TypeDescriptor;

const THREAD_TYPE: &str = "jdk.types.Thread";
const STACK_TRACE_TYPE: &str = "jdk.types.StackTrace";
const STACK_FRAME_TYPE: &str = "jdk.types.StackFrame";

/// The output type dictionary under construction by one transcoder run.
/// Never shared across recordings.
pub struct TypeRegistry {
    types: Vec<RegisteredType>,
    by_name: HashMap<String, usize>,
    currently_adding: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self { types: Vec::new(), by_name: HashMap::new(), currently_adding: Vec::new() }
    }

    pub fn types(&self) -> &[RegisteredType] {
        &self.types
    }

    pub fn handle_of(&self, name: &str) -> Option<TypeHandle> {
        self.by_name.get(name).map(|&i| TypeHandle(i))
    }

    pub fn get(&self, handle: TypeHandle) -> &RegisteredType {
        &self.types[handle.0]
    }

    /// Register an event type: recursively registers its field graph and
    /// annotations, then injects `startTime`/`eventThread`/`stackTrace`
    /// if the descriptor doesn't already declare them.
    pub fn register_event_type(
        &mut self,
        pool: &SourceTypePool,
        type_name: &str,
    ) -> Result<TypeHandle, TranscodeError> {
        let handle = self.register_complex(pool, type_name)?;
        self.inject_implicit_fields(pool, handle)?;
        Ok(handle)
    }

    fn register_complex(&mut self, pool: &SourceTypePool, name: &str) -> Result<TypeHandle, TranscodeError> {
        if let Some(&idx) = self.by_name.get(name) {
            if self.currently_adding.iter().any(|n| n == name) {
                // Cycle: the slot is already published, field resolution
                // for the type currently being built can stop here.
                return Ok(TypeHandle(idx));
            }
            let source = pool
                .get(name)
                .ok_or_else(|| TranscodeError::UnknownType(name.to_string()))?;
            let existing = &self.types[idx];
            let compatible = source.fields.iter().all(|f| existing.has_field(&f.name));
            if !compatible {
                return Err(TranscodeError::TypeCollision { name: name.to_string() });
            }
            return Ok(TypeHandle(idx));
        }

        let source = pool
            .get(name)
            .ok_or_else(|| TranscodeError::UnknownType(name.to_string()))?
            .clone();

        let idx = self.types.len();
        self.types.push(TypeDescriptor::new(name));
        self.by_name.insert(name.to_string(), idx);
        self.currently_adding.push(name.to_string());

        let mut fields = Vec::with_capacity(source.fields.len());
        for field in &source.fields {
            if let Some(struct_name) = field.field_type.struct_name() {
                self.register_complex(pool, struct_name)?;
            }
            fields.push(field.clone());
        }

        let is_constant_pool = source
            .is_constant_pool
            .unwrap_or_else(|| name != STACK_FRAME_TYPE);

        let annotations = self.clone_annotations(pool, name, &source.annotations);

        self.currently_adding.pop();
        self.types[idx] = TypeDescriptor {
            name: name.to_string(),
            fields,
            annotations,
            is_constant_pool: Some(is_constant_pool),
        };
        Ok(TypeHandle(idx))
    }

    fn clone_annotations(
        &mut self,
        pool: &SourceTypePool,
        owner: &str,
        annotations: &[crate::descriptor::AnnotationInstance],
    ) -> Vec<crate::descriptor::AnnotationInstance> {
        let mut out = Vec::with_capacity(annotations.len());
        for ann in annotations {
            match self.clone_annotation(pool, ann) {
                Ok(cloned) => out.push(cloned),
                Err(err) => {
                    tracing::debug!(owner, annotation = %ann.type_name, error = %err, "skipping annotation");
                }
            }
        }
        out
    }

    fn clone_annotation(
        &mut self,
        pool: &SourceTypePool,
        ann: &crate::descriptor::AnnotationInstance,
    ) -> Result<crate::descriptor::AnnotationInstance, AnnotationError> {
        // Meta-annotations: if the annotation's own type has a pooled
        // descriptor (rare — most JFR annotations are opaque marker
        // interfaces), register it too so its own annotations are cloned.
        if pool.get(&ann.type_name).is_some() {
            self.register_complex(pool, &ann.type_name)
                .map_err(|e| AnnotationError::TypeRegistration(ann.type_name.clone(), Box::new(e)))?;
        }

        let mut values = Vec::with_capacity(ann.values.len());
        for v in &ann.values {
            if v.name.is_empty() {
                return Err(AnnotationError::UnsupportedFieldType {
                    type_name: ann.type_name.clone(),
                    value_name: v.name.clone(),
                });
            }
            if v.value.is_some() {
                values.push(v.clone());
            }
        }
        Ok(crate::descriptor::AnnotationInstance { type_name: ann.type_name.clone(), values })
    }

    /// Ensure a built-in struct type (`Thread`, `StackTrace`) exists in the
    /// registry, registering a minimal descriptor for it when the source
    /// recording never referenced it directly.
    fn ensure_builtin_type(&mut self, descriptor: TypeDescriptor) -> TypeHandle {
        if let Some(&idx) = self.by_name.get(&descriptor.name) {
            return TypeHandle(idx);
        }
        let idx = self.types.len();
        self.by_name.insert(descriptor.name.clone(), idx);
        self.types.push(descriptor);
        TypeHandle(idx)
    }

    fn inject_implicit_fields(&mut self, pool: &SourceTypePool, handle: TypeHandle) -> Result<(), TranscodeError> {
        let needs_stack_trace = self.types[handle.0].has_stack_trace_annotation();
        let mut additions = Vec::new();

        if !self.types[handle.0].has_field("startTime") {
            additions.push(FieldDescriptor::new("startTime", FieldType::Long, false));
        }

        if !self.types[handle.0].has_field("eventThread") {
            let thread_handle = match pool.get(THREAD_TYPE) {
                Some(_) => self.register_complex(pool, THREAD_TYPE)?,
                None => self.ensure_builtin_type(default_thread_type()),
            };
            let thread_name = self.types[thread_handle.0].name.clone();
            additions.push(FieldDescriptor::new("eventThread", FieldType::Struct(thread_name), false));
        }

        if needs_stack_trace && !self.types[handle.0].has_field("stackTrace") {
            let stack_handle = match pool.get(STACK_TRACE_TYPE) {
                Some(_) => self.register_complex(pool, STACK_TRACE_TYPE)?,
                None => self.ensure_builtin_type(default_stack_trace_type()),
            };
            let stack_name = self.types[stack_handle.0].name.clone();
            additions.push(FieldDescriptor::new("stackTrace", FieldType::Struct(stack_name), false));
        }

        self.types[handle.0].fields.extend(additions);
        Ok(())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn default_thread_type() -> TypeDescriptor {
    TypeDescriptor {
        name: THREAD_TYPE.to_string(),
        fields: vec![
            FieldDescriptor::new("osName", FieldType::String, false),
            FieldDescriptor::new("osThreadId", FieldType::Long, false),
            FieldDescriptor::new("javaName", FieldType::String, false),
            FieldDescriptor::new("javaThreadId", FieldType::Long, false),
        ],
        annotations: Vec::new(),
        is_constant_pool: Some(true),
    }
}

fn default_stack_trace_type() -> TypeDescriptor {
    TypeDescriptor {
        name: STACK_TRACE_TYPE.to_string(),
        fields: vec![FieldDescriptor::new("truncated", FieldType::Boolean, false)],
        annotations: Vec::new(),
        is_constant_pool: Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AnnotationInstance;

    fn pool_with_cycle() -> SourceTypePool {
        let mut pool = SourceTypePool::new();
        pool.insert(TypeDescriptor {
            name: THREAD_TYPE.to_string(),
            fields: vec![
                FieldDescriptor::new("javaName", FieldType::String, false),
                FieldDescriptor::new("group", FieldType::Struct(THREAD_TYPE.to_string()), false),
            ],
            annotations: Vec::new(),
            is_constant_pool: Some(true),
        });
        pool
    }

    #[test]
    fn cyclic_type_registers_without_recursing_forever() {
        let pool = pool_with_cycle();
        let mut registry = TypeRegistry::new();
        let handle = registry.register_complex(&pool, THREAD_TYPE).unwrap();
        let registered = registry.get(handle);
        assert_eq!(registered.fields.len(), 2);
        assert_eq!(registered.field("group").unwrap().field_type, FieldType::Struct(THREAD_TYPE.to_string()));
    }

    #[test]
    fn repeated_registration_of_same_type_is_idempotent() {
        let mut pool = SourceTypePool::new();
        pool.insert(TypeDescriptor {
            name: "jdk.ExecutionSample".to_string(),
            fields: vec![FieldDescriptor::new("startTime", FieldType::Long, false)],
            annotations: Vec::new(),
            is_constant_pool: Some(false),
        });
        let mut registry = TypeRegistry::new();
        let a = registry.register_event_type(&pool, "jdk.ExecutionSample").unwrap();
        let b = registry.register_event_type(&pool, "jdk.ExecutionSample").unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.types().len(), 2); // event type + injected Thread type
    }

    #[test]
    fn missing_type_is_an_error() {
        let pool = SourceTypePool::new();
        let mut registry = TypeRegistry::new();
        let err = registry.register_complex(&pool, "jdk.Missing").unwrap_err();
        assert!(matches!(err, TranscodeError::UnknownType(_)));
    }

    #[test]
    fn implicit_fields_are_injected_once() {
        let mut pool = SourceTypePool::new();
        pool.insert(TypeDescriptor {
            name: "jdk.ExecutionSample".to_string(),
            fields: vec![],
            annotations: vec![AnnotationInstance {
                type_name: crate::descriptor::STACK_TRACE_ANNOTATION.to_string(),
                values: vec![],
            }],
            is_constant_pool: Some(false),
        });
        let mut registry = TypeRegistry::new();
        let handle = registry.register_event_type(&pool, "jdk.ExecutionSample").unwrap();
        let registered = registry.get(handle);
        assert!(registered.has_field("startTime"));
        assert!(registered.has_field("eventThread"));
        assert!(registered.has_field("stackTrace"));
    }

    #[test]
    fn field_incompatible_redefinition_is_a_collision() {
        let mut pool = SourceTypePool::new();
        pool.insert(TypeDescriptor {
            name: "jdk.types.Thread".to_string(),
            fields: vec![FieldDescriptor::new("javaName", FieldType::String, false)],
            annotations: Vec::new(),
            is_constant_pool: Some(true),
        });
        let mut registry = TypeRegistry::new();
        registry.register_complex(&pool, "jdk.types.Thread").unwrap();

        // Simulate a second, incompatible descriptor under the same name.
        let mut other_pool = SourceTypePool::new();
        other_pool.insert(TypeDescriptor {
            name: "jdk.types.Thread".to_string(),
            fields: vec![FieldDescriptor::new("somethingElse", FieldType::Int, false)],
            annotations: Vec::new(),
            is_constant_pool: Some(true),
        });
        let err = registry.register_complex(&other_pool, "jdk.types.Thread").unwrap_err();
        assert!(matches!(err, TranscodeError::TypeCollision { .. }));
    }
}
