//! Shared fixture registry for integration tests
//!
//! Mirrors a small bean hierarchy:
//!
//! ```text
//! Toto { a: int, b: String }      getA, setA, setB, fixB, toto(), toto(int), toto2(int), toto2()
//!   Tata { b: String }            setA (override), setB (override)
//!     Titi                        nothing declared
//!       Tutu                      nothing declared
//! ```
//!
//! plus construction edge cases (inner classes, private and throwing
//! constructors) and a few library interfaces.

#![allow(dead_code)]

use beanlens::error::ReflectError;
use beanlens::registry::{ConstructorDefinition, FieldDefinition, MethodDefinition, TypeDefinition};
use beanlens::{TypeId, TypeRegistry, Value};

/// Failure raised by the throwing constructor fixture
#[derive(Debug, thiserror::Error)]
#[error("null pointer")]
pub struct NullPointer;

pub struct Fixture {
    pub registry: TypeRegistry,
    pub outer: TypeId,
    pub toto: TypeId,
    pub tata: TypeId,
    pub titi: TypeId,
    pub tutu: TypeId,
    pub closed: TypeId,
    pub inner: TypeId,
    pub inner_private: TypeId,
    pub inner_static: TypeId,
    pub inner_static_private: TypeId,
    pub throwing: TypeId,
    pub char_sequence: TypeId,
    pub url: TypeId,
    pub abstract_map: TypeId,
    pub supplier: TypeId,
    pub all_primitives: TypeId,
    pub iterable: TypeId,
    pub collection: TypeId,
    pub list: TypeId,
}

fn field_setter(field: &'static str) -> impl Fn(&Value, &[Value]) -> beanlens::Result<Value> + Send + Sync {
    move |target: &Value, args: &[Value]| {
        if let (Some(instance), Some(value)) = (target.as_instance(), args.first()) {
            instance.set(field, value.clone());
        }
        Ok(Value::Null)
    }
}

fn field_getter(field: &'static str) -> impl Fn(&Value, &[Value]) -> beanlens::Result<Value> + Send + Sync {
    move |target: &Value, _: &[Value]| Ok(target.as_instance().map(|i| i.get(field)).unwrap_or_default())
}

fn noop() -> impl Fn(&Value, &[Value]) -> beanlens::Result<Value> + Send + Sync {
    |_: &Value, _: &[Value]| Ok(Value::Null)
}

pub fn fixture() -> Fixture {
    let mut registry = TypeRegistry::new();
    let outer = registry.register(TypeDefinition::class("com.acme.Fixtures")).unwrap();

    let toto = registry
        .register(
            TypeDefinition::class("com.acme.Fixtures$Toto")
                .field(FieldDefinition::new("a", TypeId::INT))
                .field(FieldDefinition::new("b", TypeId::STRING))
                .method(MethodDefinition::new("toto").private().body(noop()))
                .method(MethodDefinition::new("toto").param(TypeId::INT).private().body(noop()))
                // declared in reverse order of toto()
                .method(MethodDefinition::new("toto2").param(TypeId::INT).private().body(noop()))
                .method(MethodDefinition::new("toto2").private().body(noop()))
                .method(MethodDefinition::new("getA").returns(TypeId::INT).body(field_getter("a")))
                .method(MethodDefinition::new("setA").param(TypeId::INT).body(field_setter("a")))
                .method(MethodDefinition::new("setB").param(TypeId::STRING).body(field_setter("b")))
                .method(MethodDefinition::new("fixB").param(TypeId::STRING).body(field_setter("b"))),
        )
        .unwrap();
    let tata = registry
        .register(
            TypeDefinition::class("com.acme.Fixtures$Tata")
                .extends(toto)
                .field(FieldDefinition::new("b", TypeId::STRING))
                .method(MethodDefinition::new("setA").param(TypeId::INT).body(field_setter("a")))
                .method(MethodDefinition::new("setB").param(TypeId::STRING).body(field_setter("b"))),
        )
        .unwrap();
    let titi = registry
        .register(TypeDefinition::class("com.acme.Fixtures$Titi").extends(tata))
        .unwrap();
    let tutu = registry
        .register(TypeDefinition::class("com.acme.Fixtures$Tutu").extends(titi))
        .unwrap();

    let closed = registry
        .register(TypeDefinition::class("com.acme.Fixtures$ClosedClass").constructor(ConstructorDefinition::new().private()))
        .unwrap();
    let inner = registry
        .register(TypeDefinition::class("com.acme.Fixtures$InnerClass").inner_of(outer))
        .unwrap();
    let inner_private = registry
        .register(
            TypeDefinition::class("com.acme.Fixtures$InnerClassWithPrivateConstructor")
                .inner_of(outer)
                .constructor(ConstructorDefinition::new().param(outer).private()),
        )
        .unwrap();
    let inner_static = registry
        .register(TypeDefinition::class("com.acme.Fixtures$InnerStaticClass"))
        .unwrap();
    let inner_static_private = registry
        .register(
            TypeDefinition::class("com.acme.Fixtures$InnerStaticClassWithPrivateConstructor")
                .constructor(ConstructorDefinition::new().private()),
        )
        .unwrap();
    let throwing = registry
        .register(
            TypeDefinition::class("com.acme.Fixtures$ThrowingConstructorClass").constructor(
                ConstructorDefinition::new().body(|_: TypeId, _: &[Value]| Err(ReflectError::application(NullPointer))),
            ),
        )
        .unwrap();

    let char_sequence = registry
        .register(
            TypeDefinition::interface("java.lang.CharSequence")
                .method(MethodDefinition::new("length").returns(TypeId::INT))
                .method(MethodDefinition::new("charAt").param(TypeId::INT).returns(TypeId::CHAR)),
        )
        .unwrap();
    let url = registry
        .register(TypeDefinition::class("java.net.URL").constructor(ConstructorDefinition::new().param(TypeId::STRING)))
        .unwrap();
    let abstract_map = registry
        .register(TypeDefinition::abstract_class("java.util.AbstractMap"))
        .unwrap();
    let supplier = registry
        .register(
            TypeDefinition::interface("java.util.function.Supplier")
                .method(MethodDefinition::new("get").returns(TypeId::OBJECT)),
        )
        .unwrap();
    let all_primitives = registry
        .register(
            TypeDefinition::interface("com.acme.Fixtures$AllPrimitiveTypesMethods")
                .method(MethodDefinition::new("getBoolean").returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("getChar").returns(TypeId::CHAR))
                .method(MethodDefinition::new("getByte").returns(TypeId::BYTE))
                .method(MethodDefinition::new("getShort").returns(TypeId::SHORT))
                .method(MethodDefinition::new("getInt").returns(TypeId::INT))
                .method(MethodDefinition::new("getLong").returns(TypeId::LONG))
                .method(MethodDefinition::new("getFloat").returns(TypeId::FLOAT))
                .method(MethodDefinition::new("getDouble").returns(TypeId::DOUBLE)),
        )
        .unwrap();

    let iterable = registry
        .register(
            TypeDefinition::interface("java.lang.Iterable")
                .method(MethodDefinition::new("iterator").returns(TypeId::OBJECT))
                .method(MethodDefinition::new("forEach").param(TypeId::OBJECT)),
        )
        .unwrap();
    let collection = registry
        .register(
            TypeDefinition::interface("java.util.Collection")
                .implements(iterable)
                .method(MethodDefinition::new("size").returns(TypeId::INT))
                .method(MethodDefinition::new("isEmpty").returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("contains").param(TypeId::OBJECT).returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("containsAll").param(TypeId::OBJECT).returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("toArray").returns(TypeId::OBJECT))
                .method(MethodDefinition::new("add").param(TypeId::OBJECT).returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("remove").param(TypeId::OBJECT).returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("addAll").param(TypeId::OBJECT).returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("removeAll").param(TypeId::OBJECT).returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("retainAll").param(TypeId::OBJECT).returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("removeIf").param(TypeId::OBJECT).returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("clear"))
                .method(MethodDefinition::new("equals").param(TypeId::OBJECT).returns(TypeId::BOOLEAN))
                .method(MethodDefinition::new("hashCode").returns(TypeId::INT)),
        )
        .unwrap();
    let list = registry
        .register(
            TypeDefinition::interface("java.util.List")
                .implements(collection)
                .method(MethodDefinition::new("get").param(TypeId::INT).returns(TypeId::OBJECT))
                .method(
                    MethodDefinition::new("set")
                        .param(TypeId::INT)
                        .param(TypeId::OBJECT)
                        .returns(TypeId::OBJECT),
                )
                .method(MethodDefinition::new("add").param(TypeId::INT).param(TypeId::OBJECT))
                .method(MethodDefinition::new("remove").param(TypeId::INT).returns(TypeId::OBJECT))
                .method(
                    MethodDefinition::new("addAll")
                        .param(TypeId::INT)
                        .param(TypeId::OBJECT)
                        .returns(TypeId::BOOLEAN),
                )
                .method(MethodDefinition::new("indexOf").param(TypeId::OBJECT).returns(TypeId::INT))
                .method(MethodDefinition::new("lastIndexOf").param(TypeId::OBJECT).returns(TypeId::INT))
                .method(MethodDefinition::new("listIterator").returns(TypeId::OBJECT))
                .method(MethodDefinition::new("listIterator").param(TypeId::INT).returns(TypeId::OBJECT))
                .method(
                    MethodDefinition::new("subList")
                        .param(TypeId::INT)
                        .param(TypeId::INT)
                        .returns(TypeId::OBJECT),
                )
                .method(MethodDefinition::new("replaceAll").param(TypeId::OBJECT))
                .method(MethodDefinition::new("sort").param(TypeId::OBJECT)),
        )
        .unwrap();

    Fixture {
        registry,
        outer,
        toto,
        tata,
        titi,
        tutu,
        closed,
        inner,
        inner_private,
        inner_static,
        inner_static_private,
        throwing,
        char_sequence,
        url,
        abstract_map,
        supplier,
        all_primitives,
        iterable,
        collection,
        list,
    }
}

/// Arguments filled with zero values matching `params`
pub fn default_arguments(params: &[TypeId]) -> Vec<Value> {
    params.iter().map(|p| Value::default_for(Some(*p))).collect()
}
