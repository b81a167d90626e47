//! Constructor resolution and reflective invocation
//!
//! Constructor lookups ignore declared accessibility: a private zero
//! argument constructor is as usable as a public one. Method invocation
//! does not, private methods are rejected.
//!
//! Any failure raised while instantiating or invoking, whether a failed
//! check or an error returned by the member body, comes back wrapped in
//! [`ReflectError::Invocation`] with the original failure as its source.

use crate::error::{ConstructionFailure, ReflectError, Result};
use crate::format;
use crate::hierarchy::is_instance;
use crate::registry::TypeRegistry;
use crate::types::{ConstructorDef, MethodDef, TypeId, TypeKind, Visibility};
use crate::value::Value;

/// Message of the failure raised for an inner class constructor lookup
/// without the enclosing type as first parameter
pub const MISSING_ENCLOSING_PARAMETER: &str =
    "Non static inner classes require an enclosing class parameter as first argument";

// ============================================================================
// Constructor lookup
// ============================================================================

/// Zero-argument constructor of `ty`, or the precise reason there is none
pub fn get_default_constructor(registry: &TypeRegistry, ty: TypeId) -> Result<&ConstructorDef> {
    let def = registry.require(ty)?;
    let reason = match def.kind {
        TypeKind::Primitive => ConstructionFailure::Primitive,
        TypeKind::Array => ConstructionFailure::Array,
        TypeKind::Interface => ConstructionFailure::Interface,
        TypeKind::Class | TypeKind::Abstract if def.is_inner() => ConstructionFailure::InnerNonStatic,
        TypeKind::Class | TypeKind::Abstract => {
            match def.constructors.iter().find(|c| c.params.is_empty()) {
                Some(constructor) => return Ok(constructor),
                None => ConstructionFailure::NoDefault,
            }
        }
    };
    tracing::debug!(type_name = %def.name, ?reason, "no default constructor");
    Err(ReflectError::ConstructionUnavailable {
        type_name: format::type_name(registry, ty),
        reason,
    })
}

/// Constructor declared by `ty` taking exactly `params`
pub fn find_constructor<'r>(
    registry: &'r TypeRegistry,
    ty: TypeId,
    params: &[TypeId],
) -> Option<&'r ConstructorDef> {
    registry
        .get(ty)?
        .constructors
        .iter()
        .find(|c| c.params == params)
}

/// Like [`find_constructor`] but fails when nothing matches
///
/// Constructors of a non-static inner class take the enclosing instance
/// first; omitting it is reported as such rather than as a plain miss.
pub fn get_constructor<'r>(
    registry: &'r TypeRegistry,
    ty: TypeId,
    params: &[TypeId],
) -> Result<&'r ConstructorDef> {
    let def = registry.require(ty)?;
    if let Some(enclosing) = def.enclosing {
        if params.first() != Some(&enclosing) {
            return Err(ReflectError::MemberNotFound(MISSING_ENCLOSING_PARAMETER.to_string()));
        }
    }
    find_constructor(registry, ty, params).ok_or_else(|| {
        ReflectError::MemberNotFound(format!(
            "Constructor {} was not found",
            format::constructor_signature(registry, ty, params)
        ))
    })
}

// ============================================================================
// Instantiation
// ============================================================================

fn instantiation_failure(registry: &TypeRegistry, ty: TypeId, cause: ReflectError) -> ReflectError {
    tracing::debug!(error = %cause, "instantiation failed");
    ReflectError::invocation(
        format!("Class {} can't be instantiated", format::type_name(registry, ty)),
        cause,
    )
}

fn construct(registry: &TypeRegistry, constructor: &ConstructorDef, args: &[Value]) -> Result<Value> {
    let def = registry.require(constructor.declaring)?;
    if def.kind == TypeKind::Abstract {
        return Err(ReflectError::AbstractInstantiation {
            type_name: format::type_name(registry, def.id),
        });
    }
    check_arguments(registry, &constructor.params, args, || {
        format::constructor_signature(registry, constructor.declaring, &constructor.params)
    })?;
    (constructor.body)(constructor.declaring, args)
}

/// Create an instance of `ty` through its zero-argument constructor
pub fn new_instance(registry: &TypeRegistry, ty: TypeId) -> Result<Value> {
    get_default_constructor(registry, ty)
        .and_then(|constructor| construct(registry, constructor, &[]))
        .map_err(|cause| instantiation_failure(registry, ty, cause))
}

/// Invoke a resolved constructor with `args`
pub fn instantiate(registry: &TypeRegistry, constructor: &ConstructorDef, args: &[Value]) -> Result<Value> {
    construct(registry, constructor, args)
        .map_err(|cause| instantiation_failure(registry, constructor.declaring, cause))
}

// ============================================================================
// Method invocation
// ============================================================================

fn check_arguments(
    registry: &TypeRegistry,
    params: &[TypeId],
    args: &[Value],
    member: impl Fn() -> String,
) -> Result<()> {
    if params.len() != args.len() {
        return Err(ReflectError::ArgumentMismatch {
            member: member(),
            details: format!("expected {} arguments, got {}", params.len(), args.len()),
        });
    }
    for (index, (param, arg)) in params.iter().zip(args).enumerate() {
        if !is_instance(registry, arg, *param) {
            return Err(ReflectError::ArgumentMismatch {
                member: member(),
                details: format!(
                    "argument {} is not a {}",
                    index,
                    format::type_name(registry, *param)
                ),
            });
        }
    }
    Ok(())
}

/// Invoke `method` on `target`
///
/// Object targets receive the call through their
/// [`HostObject::invoke`](crate::value::HostObject::invoke), which is how
/// proxies intercept it.
pub fn invoke(registry: &TypeRegistry, method: &MethodDef, target: &Value, args: &[Value]) -> Result<Value> {
    let signature = || format::method_signature(registry, method);
    let outcome = (|| {
        if method.visibility == Visibility::Private {
            return Err(ReflectError::Inaccessible { member: signature() });
        }
        if !target.is_null() && !is_instance(registry, target, method.declaring) {
            return Err(ReflectError::ArgumentMismatch {
                member: signature(),
                details: format!(
                    "target is not a {}",
                    format::type_name(registry, method.declaring)
                ),
            });
        }
        check_arguments(registry, &method.params, args, signature)?;
        match target {
            Value::Object(obj) => obj.host().invoke(obj, method, args),
            _ => method.call(target, args),
        }
    })();

    outcome.map_err(|cause| {
        tracing::debug!(method = %method.name, error = %cause, "invocation failed");
        ReflectError::invocation(format!("Error while invoking {}", signature()), cause)
    })
}
