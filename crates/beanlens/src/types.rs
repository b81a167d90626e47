//! Type and member descriptors
//!
//! Descriptors are owned by a [`crate::TypeRegistry`] and handed out by
//! reference; nothing in the crate copies or mutates them after
//! registration.

use std::fmt;
use std::sync::Arc;

use crate::error::{ReflectError, Result};
use crate::value::Value;

// ============================================================================
// Type handles
// ============================================================================

/// Handle to a type registered in a [`crate::TypeRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// The universal root type (`java.lang.Object`)
    pub const OBJECT: TypeId = TypeId(0);
    /// `void`
    pub const VOID: TypeId = TypeId(1);
    /// `boolean`
    pub const BOOLEAN: TypeId = TypeId(2);
    /// `char`
    pub const CHAR: TypeId = TypeId(3);
    /// `byte`
    pub const BYTE: TypeId = TypeId(4);
    /// `short`
    pub const SHORT: TypeId = TypeId(5);
    /// `int`
    pub const INT: TypeId = TypeId(6);
    /// `long`
    pub const LONG: TypeId = TypeId(7);
    /// `float`
    pub const FLOAT: TypeId = TypeId(8);
    /// `double`
    pub const DOUBLE: TypeId = TypeId(9);
    /// `java.lang.String`
    pub const STRING: TypeId = TypeId(10);

    /// Position of the type in its registry
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Concrete class
    Class,
    /// Abstract class
    Abstract,
    /// Interface
    Interface,
    /// Array type
    Array,
    /// Primitive type (including `void`)
    Primitive,
}

/// Primitive types with fixed registry slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Void,
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    /// All primitives in registry order
    pub const ALL: [PrimitiveType; 9] = [
        PrimitiveType::Void,
        PrimitiveType::Boolean,
        PrimitiveType::Char,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Source-level name
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Void => "void",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Registry slot of the primitive
    pub fn type_id(self) -> TypeId {
        match self {
            PrimitiveType::Void => TypeId::VOID,
            PrimitiveType::Boolean => TypeId::BOOLEAN,
            PrimitiveType::Char => TypeId::CHAR,
            PrimitiveType::Byte => TypeId::BYTE,
            PrimitiveType::Short => TypeId::SHORT,
            PrimitiveType::Int => TypeId::INT,
            PrimitiveType::Long => TypeId::LONG,
            PrimitiveType::Float => TypeId::FLOAT,
            PrimitiveType::Double => TypeId::DOUBLE,
        }
    }

    /// Primitive living in `id`, if any
    pub fn from_type_id(id: TypeId) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.type_id() == id)
    }
}

/// Declared accessibility of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Package,
    Private,
}

// ============================================================================
// Member bodies
// ============================================================================

/// Method implementation: `(target, args) -> result`
pub type MethodFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value> + Send + Sync>;

/// Constructor implementation: `(constructed type, args) -> instance`
pub type ConstructorFn = Arc<dyn Fn(TypeId, &[Value]) -> Result<Value> + Send + Sync>;

// ============================================================================
// Member descriptors
// ============================================================================

/// Field declared by a type
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeId,
    /// Type declaring the field
    pub declaring: TypeId,
    /// Declared accessibility
    pub visibility: Visibility,
}

impl PartialEq for FieldDef {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring && self.name == other.name
    }
}

impl Eq for FieldDef {}

/// Method declared by a type
#[derive(Clone)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Parameter types
    pub params: Vec<TypeId>,
    /// Return type, `None` for `void`
    pub return_type: Option<TypeId>,
    /// Type declaring the method
    pub declaring: TypeId,
    /// Declared accessibility
    pub visibility: Visibility,
    pub(crate) body: Option<MethodFn>,
}

impl MethodDef {
    /// Number of declared parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Whether the method returns nothing
    pub fn is_void(&self) -> bool {
        self.return_type.is_none()
    }

    /// Whether the method has no body (interface or abstract method)
    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    /// Run the method body against `target` without any checks.
    pub(crate) fn call(&self, target: &Value, args: &[Value]) -> Result<Value> {
        match &self.body {
            Some(body) => body(target, args),
            None => Err(ReflectError::AbstractMember {
                member: self.name.clone(),
            }),
        }
    }
}

impl PartialEq for MethodDef {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring && self.name == other.name && self.params == other.params
    }
}

impl Eq for MethodDef {}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("declaring", &self.declaring)
            .field("visibility", &self.visibility)
            .field("is_abstract", &self.is_abstract())
            .finish()
    }
}

/// Constructor declared by a type
#[derive(Clone)]
pub struct ConstructorDef {
    /// Parameter types (enclosing instance first for inner classes)
    pub params: Vec<TypeId>,
    /// Type declaring the constructor
    pub declaring: TypeId,
    /// Declared accessibility
    pub visibility: Visibility,
    pub(crate) body: ConstructorFn,
}

impl ConstructorDef {
    /// Number of declared parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

impl PartialEq for ConstructorDef {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring && self.params == other.params
    }
}

impl Eq for ConstructorDef {}

impl fmt::Debug for ConstructorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDef")
            .field("params", &self.params)
            .field("declaring", &self.declaring)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Type descriptor
// ============================================================================

/// Registered type with its declared members
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Registry handle
    pub id: TypeId,
    /// Binary name (`com.acme.Outer$Inner`, `int`, `int[]`)
    pub name: String,
    /// Type kind
    pub kind: TypeKind,
    /// Direct ancestor, `None` for the root, interfaces and primitives
    pub super_type: Option<TypeId>,
    /// Directly implemented (or extended, for interfaces) interfaces
    pub interfaces: Vec<TypeId>,
    /// Enclosing type of a non-static inner class
    pub enclosing: Option<TypeId>,
    /// Element type of an array
    pub component: Option<TypeId>,
    /// Declared fields
    pub fields: Vec<FieldDef>,
    /// Declared methods
    pub methods: Vec<MethodDef>,
    /// Declared constructors
    pub constructors: Vec<ConstructorDef>,
}

impl TypeDef {
    /// Whether instances need an enclosing instance to be constructed
    pub fn is_inner(&self) -> bool {
        self.enclosing.is_some()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    /// Name without package nor enclosing types
    pub fn simple_name(&self) -> &str {
        let unqualified = self.name.rsplit('.').next().unwrap_or(&self.name);
        unqualified.rsplit('$').next().unwrap_or(unqualified)
    }

    /// Package part of the name, empty for the default package
    pub fn package(&self) -> &str {
        self.name.rsplit_once('.').map(|(package, _)| package).unwrap_or("")
    }

    /// Declared method with exactly this name and parameter list
    pub fn declared_method(&self, name: &str, params: &[TypeId]) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.params == params)
    }

    /// Declared field with this name
    pub fn declared_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(name: &str) -> TypeDef {
        TypeDef {
            id: TypeId(42),
            name: name.to_string(),
            kind: TypeKind::Class,
            super_type: Some(TypeId::OBJECT),
            interfaces: Vec::new(),
            enclosing: None,
            component: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    #[test]
    fn test_primitive_slots_round_trip() {
        for primitive in PrimitiveType::ALL {
            assert_eq!(PrimitiveType::from_type_id(primitive.type_id()), Some(primitive));
        }
        assert_eq!(PrimitiveType::from_type_id(TypeId::OBJECT), None);
        assert_eq!(PrimitiveType::from_type_id(TypeId::STRING), None);
    }

    #[test]
    fn test_simple_name_and_package() {
        let nested = bare("com.acme.model.Outer$Inner");
        assert_eq!(nested.simple_name(), "Inner");
        assert_eq!(nested.package(), "com.acme.model");

        let top = bare("Standalone");
        assert_eq!(top.simple_name(), "Standalone");
        assert_eq!(top.package(), "");
    }

    #[test]
    fn test_abstract_method_call_fails() {
        let method = MethodDef {
            name: "get".to_string(),
            params: Vec::new(),
            return_type: Some(TypeId::OBJECT),
            declaring: TypeId(11),
            visibility: Visibility::Public,
            body: None,
        };
        assert!(method.is_abstract());
        assert!(matches!(
            method.call(&Value::Null, &[]),
            Err(ReflectError::AbstractMember { .. })
        ));
    }
}
