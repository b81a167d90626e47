//! Member lookup across a type hierarchy
//!
//! Every lookup walks [`ClassHierarchy`] from the requested type upwards
//! and stops at the first type declaring a match. Only the hierarchy order
//! matters: the order in which a single type declares its members never
//! decides a result.

use dashmap::DashMap;
use indexmap::IndexMap;

use crate::error::{ReflectError, Result};
use crate::format;
use crate::hierarchy::{ClassHierarchy, InterfaceHierarchy};
use crate::registry::TypeRegistry;
use crate::types::{FieldDef, MethodDef, TypeId};

/// Fields visible from `ty`, by name
///
/// A field declared by a more derived type shadows ancestor fields of the
/// same name. Entries are ordered by hierarchy depth.
pub fn index_fields(registry: &TypeRegistry, ty: TypeId) -> IndexMap<&str, &FieldDef> {
    let mut index = IndexMap::new();
    for def in ClassHierarchy::new(registry, ty) {
        for field in &def.fields {
            index.entry(field.name.as_str()).or_insert(field);
        }
    }
    index
}

/// First field named `name` in the hierarchy of `ty`
pub fn find_field<'r>(registry: &'r TypeRegistry, ty: TypeId, name: &str) -> Option<&'r FieldDef> {
    ClassHierarchy::new(registry, ty).find_map(|def| def.declared_field(name))
}

/// Like [`find_field`] but fails when nothing matches
pub fn get_field<'r>(registry: &'r TypeRegistry, ty: TypeId, name: &str) -> Result<&'r FieldDef> {
    find_field(registry, ty, name).ok_or_else(|| {
        ReflectError::MemberNotFound(format!(
            "Field {} on {} was not found",
            name,
            format::type_name(registry, ty)
        ))
    })
}

/// First method named `name` taking exactly `params` in the hierarchy of
/// `ty`
pub fn find_method<'r>(
    registry: &'r TypeRegistry,
    ty: TypeId,
    name: &str,
    params: &[TypeId],
) -> Option<&'r MethodDef> {
    ClassHierarchy::new(registry, ty).find_map(|def| def.declared_method(name, params))
}

/// Like [`find_method`] but fails when nothing matches
pub fn get_method<'r>(
    registry: &'r TypeRegistry,
    ty: TypeId,
    name: &str,
    params: &[TypeId],
) -> Result<&'r MethodDef> {
    find_method(registry, ty, name, params).ok_or_else(|| {
        ReflectError::MemberNotFound(format!(
            "Method {}({}) on {} was not found",
            name,
            format::parameter_list(registry, params),
            format::type_name(registry, ty)
        ))
    })
}

/// Every method declared along the hierarchy of `ty`, classes first (most
/// derived first), then their interfaces
pub fn methods_in_hierarchy(registry: &TypeRegistry, ty: TypeId) -> impl Iterator<Item = &MethodDef> {
    let classes = ClassHierarchy::new(registry, ty);
    let interfaces = InterfaceHierarchy::new(registry, ClassHierarchy::new(registry, ty));
    classes
        .chain(interfaces)
        .flat_map(|def| def.methods.iter())
}

// ============================================================================
// Field index cache
// ============================================================================

/// Concurrent cache of [`index_fields`] results
///
/// Each type is indexed at most once; concurrent readers of the same entry
/// wait for the first initialisation.
pub struct FieldIndexCache<'r> {
    registry: &'r TypeRegistry,
    entries: DashMap<TypeId, IndexMap<&'r str, &'r FieldDef>>,
}

impl<'r> FieldIndexCache<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            entries: DashMap::new(),
        }
    }

    /// Field named `name` visible from `ty`
    pub fn field(&self, ty: TypeId, name: &str) -> Option<&'r FieldDef> {
        self.entries
            .entry(ty)
            .or_insert_with(|| index_fields(self.registry, ty))
            .get(name)
            .copied()
    }

    /// Names of the fields visible from `ty`, in hierarchy order
    pub fn field_names(&self, ty: TypeId) -> Vec<&'r str> {
        self.entries
            .entry(ty)
            .or_insert_with(|| index_fields(self.registry, ty))
            .keys()
            .copied()
            .collect()
    }

    /// Number of types indexed so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
