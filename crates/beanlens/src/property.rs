//! Bean property accessor convention
//!
//! | Prefix | Kind          | Required shape                    |
//! |--------|---------------|-----------------------------------|
//! | `get`  | Getter        | no parameter, non-void return     |
//! | `set`  | Setter        | one parameter, void return        |
//! | `is`   | BooleanGetter | no parameter (return not checked) |
//!
//! An `is*` method wraps a `boolean` property whatever it declares to
//! return.

use crate::error::{ReflectError, Result};
use crate::format;
use crate::members::find_field;
use crate::registry::TypeRegistry;
use crate::types::{FieldDef, MethodDef, TypeId};

/// Accessor kind of a property method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Getter,
    BooleanGetter,
    Setter,
}

struct AccessorRule {
    prefix: &'static str,
    kind: AccessorKind,
    shape: fn(&MethodDef) -> bool,
}

static ACCESSOR_RULES: [AccessorRule; 3] = [
    AccessorRule {
        prefix: "get",
        kind: AccessorKind::Getter,
        shape: getter_shape,
    },
    AccessorRule {
        prefix: "set",
        kind: AccessorKind::Setter,
        shape: setter_shape,
    },
    AccessorRule {
        prefix: "is",
        kind: AccessorKind::BooleanGetter,
        shape: boolean_getter_shape,
    },
];

fn getter_shape(method: &MethodDef) -> bool {
    method.param_count() == 0 && !method.is_void()
}

fn setter_shape(method: &MethodDef) -> bool {
    method.param_count() == 1 && method.is_void()
}

fn boolean_getter_shape(method: &MethodDef) -> bool {
    method.param_count() == 0
}

/// Property exposed by an accessor method
#[derive(Debug, Clone)]
pub struct PropertyBinding<'r> {
    /// Logical property name (`setFirstName` -> `firstName`)
    pub name: String,
    pub kind: AccessorKind,
    /// Type of the property as seen through the accessor
    pub wrapped_type: TypeId,
    /// The accessor itself
    pub method: &'r MethodDef,
    /// Backing field, when one is visible from the declaring type
    pub field: Option<&'r FieldDef>,
}

/// Rule matching the method name, with the remainder of the name
fn match_rule<'m>(method: &'m MethodDef) -> Option<(&'static AccessorRule, &'m str)> {
    ACCESSOR_RULES.iter().find_map(|rule| {
        method
            .name
            .strip_prefix(rule.prefix)
            .filter(|rest| !rest.is_empty())
            .map(|rest| (rule, rest))
    })
}

fn mismatch(registry: &TypeRegistry, method: &MethodDef) -> ReflectError {
    ReflectError::EncapsulationMismatch {
        method: format::method_signature(registry, method),
    }
}

fn decapitalize(rest: &str) -> String {
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Accessor kind by name only, without checking the signature
pub fn classify_name(registry: &TypeRegistry, method: &MethodDef) -> Result<AccessorKind> {
    match_rule(method)
        .map(|(rule, _)| rule.kind)
        .ok_or_else(|| mismatch(registry, method))
}

/// Accessor kind by name and signature shape
fn checked_kind(registry: &TypeRegistry, method: &MethodDef) -> Result<(AccessorKind, String)> {
    match match_rule(method) {
        Some((rule, rest)) if (rule.shape)(method) => Ok((rule.kind, decapitalize(rest))),
        _ => Err(mismatch(registry, method)),
    }
}

/// Classify `method` as a property accessor and resolve its binding
pub fn classify<'r>(registry: &'r TypeRegistry, method: &'r MethodDef) -> Result<PropertyBinding<'r>> {
    let (kind, name) = checked_kind(registry, method)?;
    let wrapped_type = wrapped_type_of(kind, method).ok_or_else(|| mismatch(registry, method))?;
    let field = find_field(registry, method.declaring, &name);
    Ok(PropertyBinding {
        name,
        kind,
        wrapped_type,
        method,
        field,
    })
}

fn wrapped_type_of(kind: AccessorKind, method: &MethodDef) -> Option<TypeId> {
    match kind {
        AccessorKind::Getter => method.return_type,
        AccessorKind::Setter => method.params.first().copied(),
        AccessorKind::BooleanGetter => Some(TypeId::BOOLEAN),
    }
}

/// Type of the property wrapped by an accessor: the getter's return type,
/// the setter's parameter type, or `boolean` for an `is*` method
pub fn property_type(registry: &TypeRegistry, method: &MethodDef) -> Result<TypeId> {
    let (kind, _) = checked_kind(registry, method)?;
    wrapped_type_of(kind, method).ok_or_else(|| mismatch(registry, method))
}

/// Property name derived from the accessor name alone
pub fn property_name(registry: &TypeRegistry, method: &MethodDef) -> Result<String> {
    match_rule(method)
        .map(|(_, rest)| decapitalize(rest))
        .ok_or_else(|| mismatch(registry, method))
}

/// Field backing the property of an accessor
///
/// The lookup starts at the type declaring the accessor: an override that
/// doesn't redeclare the field resolves to the ancestor's field, a
/// redeclared field shadows it.
pub fn wrapped_field<'r>(registry: &'r TypeRegistry, method: &MethodDef) -> Result<Option<&'r FieldDef>> {
    let name = property_name(registry, method)?;
    Ok(find_field(registry, method.declaring, &name))
}

/// Run the callback matching the accessor kind of `method`, checking its
/// signature shape first
pub fn on_accessor<E>(
    registry: &TypeRegistry,
    method: &MethodDef,
    getter: impl FnOnce() -> E,
    setter: impl FnOnce() -> E,
    boolean_getter: impl FnOnce() -> E,
) -> Result<E> {
    let (kind, _) = checked_kind(registry, method)?;
    Ok(run(kind, getter, setter, boolean_getter))
}

/// Like [`on_accessor`] but only looks at the method name
pub fn on_accessor_name<E>(
    registry: &TypeRegistry,
    method: &MethodDef,
    getter: impl FnOnce() -> E,
    setter: impl FnOnce() -> E,
    boolean_getter: impl FnOnce() -> E,
) -> Result<E> {
    let kind = classify_name(registry, method)?;
    Ok(run(kind, getter, setter, boolean_getter))
}

fn run<E>(
    kind: AccessorKind,
    getter: impl FnOnce() -> E,
    setter: impl FnOnce() -> E,
    boolean_getter: impl FnOnce() -> E,
) -> E {
    match kind {
        AccessorKind::Getter => getter(),
        AccessorKind::Setter => setter(),
        AccessorKind::BooleanGetter => boolean_getter(),
    }
}
