//! Type registry and definition builders
//!
//! The registry is the metadata backend every lookup runs against. Types
//! are described with the builders below and registered once; the registry
//! then hands out `&TypeDef` views that stay valid as long as it lives.
//!
//! ```text
//! let mut registry = TypeRegistry::new();
//! let toto = registry.register(
//!     TypeDefinition::class("com.acme.Toto")
//!         .field(FieldDefinition::new("a", TypeId::INT))
//!         .method(MethodDefinition::new("getA").returns(TypeId::INT)),
//! )?;
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{ReflectError, Result};
use crate::types::{
    ConstructorDef, ConstructorFn, FieldDef, MethodDef, MethodFn, PrimitiveType, TypeDef, TypeId,
    TypeKind, Visibility,
};
use crate::value::{Instance, Value, ENCLOSING_FIELD};

// ============================================================================
// Definitions
// ============================================================================

/// Definition of a field to declare on a type
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeId,
    /// Declared accessibility
    pub visibility: Visibility,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::Private,
        }
    }

    /// Override the default (private) accessibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Definition of a method to declare on a type
#[derive(Clone)]
pub struct MethodDefinition {
    pub name: String,
    pub params: Vec<TypeId>,
    pub return_type: Option<TypeId>,
    pub visibility: Visibility,
    body: Option<MethodFn>,
}

impl MethodDefinition {
    /// Public `void` method without parameters nor body
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: None,
            visibility: Visibility::Public,
            body: None,
        }
    }

    /// Append a parameter
    pub fn param(mut self, ty: TypeId) -> Self {
        self.params.push(ty);
        self
    }

    /// Set the return type (`void` clears it)
    pub fn returns(mut self, ty: TypeId) -> Self {
        self.return_type = (ty != TypeId::VOID).then_some(ty);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark as private
    pub fn private(self) -> Self {
        self.visibility(Visibility::Private)
    }

    /// Attach the implementation
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }
}

/// Definition of a constructor to declare on a type
#[derive(Clone)]
pub struct ConstructorDefinition {
    pub params: Vec<TypeId>,
    pub visibility: Visibility,
    body: Option<ConstructorFn>,
}

impl ConstructorDefinition {
    /// Public constructor building a plain [`Instance`]
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            visibility: Visibility::Public,
            body: None,
        }
    }

    pub fn param(mut self, ty: TypeId) -> Self {
        self.params.push(ty);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn private(self) -> Self {
        self.visibility(Visibility::Private)
    }

    /// Replace the default instance-building body
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(TypeId, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }
}

impl Default for ConstructorDefinition {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete definition of a type to register
#[derive(Clone)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    pub super_type: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub enclosing: Option<TypeId>,
    pub fields: Vec<FieldDefinition>,
    pub methods: Vec<MethodDefinition>,
    pub constructors: Vec<ConstructorDefinition>,
}

impl TypeDefinition {
    fn with_kind(name: impl Into<String>, kind: TypeKind, super_type: Option<TypeId>) -> Self {
        Self {
            name: name.into(),
            kind,
            super_type,
            interfaces: Vec::new(),
            enclosing: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Concrete class extending the root type
    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Class, Some(TypeId::OBJECT))
    }

    /// Abstract class extending the root type
    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Abstract, Some(TypeId::OBJECT))
    }

    /// Interface (no ancestor)
    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Interface, None)
    }

    /// Set the direct ancestor
    pub fn extends(mut self, parent: TypeId) -> Self {
        self.super_type = Some(parent);
        self
    }

    /// Add an implemented (or, for interfaces, extended) interface
    pub fn implements(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Make this a non-static inner class of `enclosing`
    pub fn inner_of(mut self, enclosing: TypeId) -> Self {
        self.enclosing = Some(enclosing);
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    pub fn constructor(mut self, constructor: ConstructorDefinition) -> Self {
        self.constructors.push(constructor);
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Owner of every type descriptor
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<TypeDef>,
    by_name: FxHashMap<String, TypeId>,
}

impl TypeRegistry {
    /// Registry holding the root type, the primitives and `java.lang.String`
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            by_name: FxHashMap::default(),
        };
        registry.bootstrap();
        registry
    }

    fn bootstrap(&mut self) {
        let object = TypeDef {
            id: TypeId::OBJECT,
            name: "java.lang.Object".to_string(),
            kind: TypeKind::Class,
            super_type: None,
            interfaces: Vec::new(),
            enclosing: None,
            component: None,
            fields: Vec::new(),
            methods: root_methods(),
            constructors: vec![ConstructorDef {
                params: Vec::new(),
                declaring: TypeId::OBJECT,
                visibility: Visibility::Public,
                body: plain_instance_body(None),
            }],
        };
        self.push(object);

        for primitive in PrimitiveType::ALL {
            self.push(TypeDef {
                id: primitive.type_id(),
                name: primitive.name().to_string(),
                kind: TypeKind::Primitive,
                super_type: None,
                interfaces: Vec::new(),
                enclosing: None,
                component: None,
                fields: Vec::new(),
                methods: Vec::new(),
                constructors: Vec::new(),
            });
        }

        let copy_string: ConstructorFn = Arc::new(|_: TypeId, args: &[Value]| match args.first() {
            Some(Value::Str(s)) => Ok(Value::Str(s.clone())),
            _ => Ok(Value::string("")),
        });
        self.push(TypeDef {
            id: TypeId::STRING,
            name: "java.lang.String".to_string(),
            kind: TypeKind::Class,
            super_type: Some(TypeId::OBJECT),
            interfaces: Vec::new(),
            enclosing: None,
            component: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: vec![
                ConstructorDef {
                    params: Vec::new(),
                    declaring: TypeId::STRING,
                    visibility: Visibility::Public,
                    body: copy_string.clone(),
                },
                ConstructorDef {
                    params: vec![TypeId::STRING],
                    declaring: TypeId::STRING,
                    visibility: Visibility::Public,
                    body: copy_string,
                },
            ],
        });
    }

    fn push(&mut self, def: TypeDef) -> TypeId {
        let id = def.id;
        self.by_name.insert(def.name.clone(), id);
        self.types.push(def);
        id
    }

    fn next_id(&self) -> TypeId {
        TypeId(self.types.len() as u32)
    }

    /// Register a type, failing if its name is already taken
    pub fn register(&mut self, definition: TypeDefinition) -> Result<TypeId> {
        if self.by_name.contains_key(&definition.name) {
            return Err(ReflectError::DuplicateType {
                name: definition.name,
            });
        }
        for referenced in definition
            .super_type
            .iter()
            .chain(&definition.interfaces)
            .chain(&definition.enclosing)
        {
            self.require(*referenced)?;
        }

        let id = self.next_id();
        let TypeDefinition {
            name,
            kind,
            super_type,
            interfaces,
            enclosing,
            fields,
            methods,
            mut constructors,
        } = definition;

        // Classes without a declared constructor get the implicit one
        if constructors.is_empty() && kind != TypeKind::Interface {
            constructors.push(ConstructorDefinition::new());
        }
        // Inner class constructors always take the enclosing instance first
        if let Some(outer) = enclosing {
            for constructor in &mut constructors {
                if constructor.params.first() != Some(&outer) {
                    constructor.params.insert(0, outer);
                }
            }
        }

        let def = TypeDef {
            id,
            name,
            kind,
            super_type,
            interfaces,
            enclosing,
            component: None,
            fields: fields
                .into_iter()
                .map(|f| FieldDef {
                    name: f.name,
                    ty: f.ty,
                    declaring: id,
                    visibility: f.visibility,
                })
                .collect(),
            methods: methods
                .into_iter()
                .map(|m| MethodDef {
                    name: m.name,
                    params: m.params,
                    return_type: m.return_type,
                    declaring: id,
                    visibility: m.visibility,
                    body: m.body,
                })
                .collect(),
            constructors: constructors
                .into_iter()
                .map(|c| ConstructorDef {
                    body: c.body.unwrap_or_else(|| plain_instance_body(enclosing)),
                    params: c.params,
                    declaring: id,
                    visibility: c.visibility,
                })
                .collect(),
        };
        tracing::trace!(name = %def.name, id = id.index(), "registered type");
        Ok(self.push(def))
    }

    /// Array type of `component`, registered on first request
    pub fn array_of(&mut self, component: TypeId) -> Result<TypeId> {
        let name = format!("{}[]", self.require(component)?.name);
        if let Some(id) = self.by_name.get(&name) {
            return Ok(*id);
        }
        let id = self.next_id();
        Ok(self.push(TypeDef {
            id,
            name,
            kind: TypeKind::Array,
            super_type: Some(TypeId::OBJECT),
            interfaces: Vec::new(),
            enclosing: None,
            component: Some(component),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }))
    }

    /// Resolve a binary name or a JVM descriptor (`I`, `[Z`,
    /// `[Ljava.lang.Object;`), registering array types on the way
    pub fn for_name(&mut self, name: &str) -> Result<TypeId> {
        if let Some(component) = name.strip_prefix('[') {
            let component = self.for_name(component)?;
            return self.array_of(component);
        }
        let primitive = match name {
            "Z" => Some(TypeId::BOOLEAN),
            "C" => Some(TypeId::CHAR),
            "B" => Some(TypeId::BYTE),
            "S" => Some(TypeId::SHORT),
            "I" => Some(TypeId::INT),
            "J" => Some(TypeId::LONG),
            "F" => Some(TypeId::FLOAT),
            "D" => Some(TypeId::DOUBLE),
            "V" => Some(TypeId::VOID),
            _ => None,
        };
        if let Some(id) = primitive {
            return Ok(id);
        }
        let binary = name
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
            .unwrap_or(name);
        self.lookup(binary)
            .ok_or_else(|| ReflectError::MemberNotFound(format!("Class {name} was not found")))
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.index())
    }

    /// Descriptor of `id`, failing for a handle from another registry
    pub fn require(&self, id: TypeId) -> Result<&TypeDef> {
        self.get(id)
            .ok_or_else(|| ReflectError::MemberNotFound(format!("Type #{} is not registered", id.index())))
    }

    /// Type registered under a binary name
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Method declared by `id` itself (ancestors are not searched)
    pub fn declared_method(&self, id: TypeId, name: &str, params: &[TypeId]) -> Option<&MethodDef> {
        self.get(id)?.declared_method(name, params)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of a constructor building an empty [`Instance`], keeping the
/// enclosing instance for inner classes
fn plain_instance_body(enclosing: Option<TypeId>) -> ConstructorFn {
    Arc::new(move |ty: TypeId, args: &[Value]| {
        let instance = Instance::new(ty);
        if enclosing.is_some() {
            instance.set(ENCLOSING_FIELD, args.first().cloned().unwrap_or_default());
        }
        Ok(Value::object(instance))
    })
}

fn root_methods() -> Vec<MethodDef> {
    let equals: MethodFn = Arc::new(|target: &Value, args: &[Value]| {
        let other = args.first().cloned().unwrap_or_default();
        Ok(Value::Bool(target.equals_with_null(&other)))
    });
    let hash_code: MethodFn = Arc::new(|target: &Value, _: &[Value]| target.hash_code().map(Value::Int));
    let to_string: MethodFn = Arc::new(|target: &Value, _: &[Value]| target.describe().map(Value::string));

    vec![
        MethodDef {
            name: "equals".to_string(),
            params: vec![TypeId::OBJECT],
            return_type: Some(TypeId::BOOLEAN),
            declaring: TypeId::OBJECT,
            visibility: Visibility::Public,
            body: Some(equals),
        },
        MethodDef {
            name: "hashCode".to_string(),
            params: Vec::new(),
            return_type: Some(TypeId::INT),
            declaring: TypeId::OBJECT,
            visibility: Visibility::Public,
            body: Some(hash_code),
        },
        MethodDef {
            name: "toString".to_string(),
            params: Vec::new(),
            return_type: Some(TypeId::STRING),
            declaring: TypeId::OBJECT,
            visibility: Visibility::Public,
            body: Some(to_string),
        },
    ]
}
