//! Display of types and members in diagnostics
//!
//! Package names are abbreviated to their initials by default
//! (`j.l.String`). The process-wide default comes from
//! [`crate::config::settings`]; [`with_package_print_mode`] overrides it for
//! the current thread while a closure runs.

use std::cell::Cell;

use crate::config;
use crate::registry::TypeRegistry;
use crate::types::{MethodDef, TypeId, TypeKind};

/// How package names are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackagePrintMode {
    /// `j.l.String`
    #[default]
    Abbreviated,
    /// `java.lang.String`
    Full,
}

impl PackagePrintMode {
    /// Parse a toggle value: `on`, `enable`, `true` abbreviate packages,
    /// `off`, `disable`, `false` print them in full
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "on" | "enable" | "true" => Some(PackagePrintMode::Abbreviated),
            "off" | "disable" | "false" => Some(PackagePrintMode::Full),
            _ => None,
        }
    }
}

thread_local! {
    static PRINT_MODE_OVERRIDE: Cell<Option<PackagePrintMode>> = const { Cell::new(None) };
}

/// Restores the previous override when dropped, unwinding included
struct OverrideGuard {
    previous: Option<PackagePrintMode>,
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        PRINT_MODE_OVERRIDE.with(|cell| cell.set(self.previous));
    }
}

/// Run `f` with `mode` as the package print mode of the current thread
pub fn with_package_print_mode<R>(mode: PackagePrintMode, f: impl FnOnce() -> R) -> R {
    let previous = PRINT_MODE_OVERRIDE.with(|cell| cell.replace(Some(mode)));
    let _guard = OverrideGuard { previous };
    f()
}

/// Package print mode in effect on the current thread
pub fn package_print_mode() -> PackagePrintMode {
    PRINT_MODE_OVERRIDE
        .with(Cell::get)
        .unwrap_or_else(|| config::settings().package_print_mode)
}

// ============================================================================
// Rendering
// ============================================================================

/// Display name of a type according to the current print mode
pub fn type_name(registry: &TypeRegistry, ty: TypeId) -> String {
    let Some(def) = registry.get(ty) else {
        return format!("#{}", ty.index());
    };
    match def.kind {
        TypeKind::Primitive => def.name.clone(),
        TypeKind::Array => match def.component {
            Some(component) => format!("{}[]", type_name(registry, component)),
            None => def.name.clone(),
        },
        _ => match package_print_mode() {
            PackagePrintMode::Full => def.name.clone(),
            PackagePrintMode::Abbreviated => {
                let package = def.package();
                if package.is_empty() {
                    return def.simple_name().to_string();
                }
                let mut out = String::with_capacity(package.len() + def.simple_name().len());
                for segment in package.split('.') {
                    out.extend(segment.chars().next());
                    out.push('.');
                }
                out.push_str(def.simple_name());
                out
            }
        },
    }
}

/// Comma separated display names
pub fn parameter_list(registry: &TypeRegistry, params: &[TypeId]) -> String {
    params
        .iter()
        .map(|p| type_name(registry, *p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `void c.a.Toto.fixB(j.l.String)`
pub fn method_signature(registry: &TypeRegistry, method: &MethodDef) -> String {
    let return_type = match method.return_type {
        Some(ty) => type_name(registry, ty),
        None => "void".to_string(),
    };
    format!(
        "{} {}.{}({})",
        return_type,
        type_name(registry, method.declaring),
        method.name,
        parameter_list(registry, &method.params)
    )
}

/// `c.a.Toto(int, j.l.String)`
pub fn constructor_signature(registry: &TypeRegistry, declaring: TypeId, params: &[TypeId]) -> String {
    format!(
        "{}({})",
        type_name(registry, declaring),
        parameter_list(registry, params)
    )
}
