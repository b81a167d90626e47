//! Type hierarchy walks
//!
//! [`ClassHierarchy`] follows the ancestor link from a type up to, but not
//! including, `java.lang.Object`: the root declares nothing callers look
//! for, so every member lookup in the crate stops before it.
//! [`InterfaceHierarchy`] enumerates the interfaces reachable from a
//! sequence of classes, each exactly once.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::registry::TypeRegistry;
use crate::types::{TypeDef, TypeId, TypeKind};
use crate::value::Value;

/// Lazy walk over a type and its ancestors, most-derived first
pub struct ClassHierarchy<'r> {
    registry: &'r TypeRegistry,
    next: Option<TypeId>,
}

impl<'r> ClassHierarchy<'r> {
    pub fn new(registry: &'r TypeRegistry, start: TypeId) -> Self {
        Self {
            registry,
            next: Some(start),
        }
    }
}

impl<'r> Iterator for ClassHierarchy<'r> {
    type Item = &'r TypeDef;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take().filter(|id| *id != TypeId::OBJECT)?;
        let def = self.registry.get(id)?;
        self.next = def.super_type;
        Some(def)
    }
}

/// Lazy, duplicate-free walk over every interface directly or transitively
/// implemented by a sequence of classes
pub struct InterfaceHierarchy<'r, I> {
    registry: &'r TypeRegistry,
    classes: I,
    pending: VecDeque<TypeId>,
    seen: FxHashSet<TypeId>,
}

impl<'r, I> InterfaceHierarchy<'r, I>
where
    I: Iterator<Item = &'r TypeDef>,
{
    pub fn new(registry: &'r TypeRegistry, classes: I) -> Self {
        Self {
            registry,
            classes,
            pending: VecDeque::new(),
            seen: FxHashSet::default(),
        }
    }
}

impl<'r, I> Iterator for InterfaceHierarchy<'r, I>
where
    I: Iterator<Item = &'r TypeDef>,
{
    type Item = &'r TypeDef;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.pending.pop_front() {
                if !self.seen.insert(id) {
                    continue;
                }
                let Some(def) = self.registry.get(id) else {
                    continue;
                };
                self.pending.extend(def.interfaces.iter().copied());
                return Some(def);
            }
            let class = self.classes.next()?;
            self.pending.extend(class.interfaces.iter().copied());
        }
    }
}

/// Interfaces implemented by `start` and its ancestors
pub fn interfaces_of(registry: &TypeRegistry, start: TypeId) -> InterfaceHierarchy<'_, ClassHierarchy<'_>> {
    InterfaceHierarchy::new(registry, ClassHierarchy::new(registry, start))
}

/// Whether a `from` value can be used where a `to` is expected
///
/// Primitives are only assignable to themselves and (boxed) to the root
/// type; no numeric widening is applied.
pub fn is_assignable(registry: &TypeRegistry, from: TypeId, to: TypeId) -> bool {
    if from == to {
        return true;
    }
    if to == TypeId::OBJECT {
        return from != TypeId::VOID;
    }
    let (Some(from_def), Some(to_def)) = (registry.get(from), registry.get(to)) else {
        return false;
    };
    match (from_def.kind, to_def.kind) {
        (TypeKind::Primitive, _) | (_, TypeKind::Primitive) => false,
        (TypeKind::Array, TypeKind::Array) => match (from_def.component, to_def.component) {
            (Some(f), Some(t)) => {
                let primitive = |id| registry.get(id).is_some_and(TypeDef::is_primitive);
                !primitive(f) && !primitive(t) && is_assignable(registry, f, t)
            }
            _ => false,
        },
        (_, TypeKind::Interface) => interfaces_of(registry, from).any(|i| i.id == to),
        _ => ClassHierarchy::new(registry, from).any(|c| c.id == to),
    }
}

/// Whether `value` can be passed where a `ty` is expected; absent values
/// fit any non-primitive type
pub fn is_instance(registry: &TypeRegistry, value: &Value, ty: TypeId) -> bool {
    match value.value_type() {
        None => registry.get(ty).is_some_and(|def| !def.is_primitive()),
        Some(actual) => is_assignable(registry, actual, ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeDefinition;

    fn names<'a>(defs: impl Iterator<Item = &'a TypeDef>) -> Vec<&'a str> {
        defs.map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_class_hierarchy_excludes_root() {
        let mut registry = TypeRegistry::new();
        let animal = registry.register(TypeDefinition::class("Animal")).unwrap();
        let dog = registry.register(TypeDefinition::class("Dog").extends(animal)).unwrap();
        let labrador = registry.register(TypeDefinition::class("Labrador").extends(dog)).unwrap();

        assert_eq!(
            names(ClassHierarchy::new(&registry, labrador)),
            vec!["Labrador", "Dog", "Animal"]
        );
        assert_eq!(names(ClassHierarchy::new(&registry, animal)), vec!["Animal"]);
        assert_eq!(ClassHierarchy::new(&registry, TypeId::OBJECT).count(), 0);
    }

    #[test]
    fn test_interface_hierarchy_is_duplicate_free() {
        let mut registry = TypeRegistry::new();
        let base = registry.register(TypeDefinition::interface("Base")).unwrap();
        let left = registry.register(TypeDefinition::interface("Left").implements(base)).unwrap();
        let right = registry.register(TypeDefinition::interface("Right").implements(base)).unwrap();
        let parent = registry
            .register(TypeDefinition::class("Parent").implements(left))
            .unwrap();
        let child = registry
            .register(TypeDefinition::class("Child").extends(parent).implements(right).implements(left))
            .unwrap();

        let found = names(interfaces_of(&registry, child));
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], "Right");
        assert!(found.contains(&"Left"));
        assert!(found.contains(&"Base"));
    }

    #[test]
    fn test_is_assignable() {
        let mut registry = TypeRegistry::new();
        let api = registry.register(TypeDefinition::interface("Api")).unwrap();
        let parent = registry.register(TypeDefinition::class("Parent").implements(api)).unwrap();
        let child = registry.register(TypeDefinition::class("Child").extends(parent)).unwrap();

        assert!(is_assignable(&registry, child, parent));
        assert!(is_assignable(&registry, child, api));
        assert!(!is_assignable(&registry, parent, child));
        assert!(is_assignable(&registry, TypeId::INT, TypeId::OBJECT));
        assert!(!is_assignable(&registry, TypeId::INT, TypeId::LONG));
        assert!(!is_assignable(&registry, TypeId::VOID, TypeId::OBJECT));

        let children = registry.array_of(child).unwrap();
        let parents = registry.array_of(parent).unwrap();
        let ints = registry.array_of(TypeId::INT).unwrap();
        assert!(is_assignable(&registry, children, parents));
        assert!(!is_assignable(&registry, ints, parents));
        assert!(is_assignable(&registry, ints, TypeId::OBJECT));
    }

    #[test]
    fn test_is_instance() {
        let registry = TypeRegistry::new();
        assert!(is_instance(&registry, &Value::Null, TypeId::STRING));
        assert!(!is_instance(&registry, &Value::Null, TypeId::INT));
        assert!(is_instance(&registry, &Value::Int(1), TypeId::INT));
        assert!(is_instance(&registry, &Value::string("x"), TypeId::OBJECT));
        assert!(!is_instance(&registry, &Value::string("x"), TypeId::INT));
    }
}
