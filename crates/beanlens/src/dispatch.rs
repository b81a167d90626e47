//! Invocation dispatcher behind dynamic proxies
//!
//! A [`Proxy`] implements an interface by forwarding every call to an
//! [`InvocationDispatcher`]. The dispatcher answers the identity operations
//! (`equals`, `hashCode`, `toString`) itself and hands every other call to
//! its [`InvocationHandler`].
//!
//! Identity rules for a proxy `P` backed by dispatcher `D`:
//! - `P.equals(Q)` holds iff `Q` is also a proxy backed by `D`
//! - `P.hashCode()` is the identity hash of `D`
//! - `P.toString()` is the description of `D`
//! - `D` and `P` are distinct objects: `D.equals(P)` and `P.equals(D)` are
//!   false
//!
//! None of these answers goes back through a proxy. A handler standing for
//! a value of its own (a read-only list for instance) takes over all three
//! through [`InvocationHandler::identity_source`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{ReflectError, Result};
use crate::format;
use crate::readonly::Sequence;
use crate::registry::TypeRegistry;
use crate::types::{MethodDef, TypeId};
use crate::value::{identity_hash_of, HostObject, ObjRef, Value};

// ============================================================================
// Operations
// ============================================================================

/// Intercepted operation, identity operations singled out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'m> {
    Equals,
    HashCode,
    ToString,
    /// Any other method
    Call(&'m MethodDef),
}

impl<'m> Operation<'m> {
    /// Operation of a method, by name and parameter types
    pub fn of(method: &'m MethodDef) -> Self {
        match (method.name.as_str(), method.params.as_slice()) {
            ("equals", [TypeId::OBJECT]) => Operation::Equals,
            ("hashCode", []) => Operation::HashCode,
            ("toString", []) => Operation::ToString,
            _ => Operation::Call(method),
        }
    }

    pub fn is_identity(&self) -> bool {
        !matches!(self, Operation::Call(_))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Strategy receiving every non-identity call made on a proxy
pub trait InvocationHandler: Send + Sync {
    /// Handle `method` called on `target` with `args`
    fn invoke(&self, target: &Value, method: &MethodDef, args: &[Value]) -> Result<Value>;

    /// Object answering `equals`, `hashCode` and `toString` for the proxies
    /// in place of the dispatcher
    fn identity_source(&self) -> Option<&dyn HostObject> {
        None
    }
}

impl<F> InvocationHandler for F
where
    F: Fn(&Value, &MethodDef, &[Value]) -> Result<Value> + Send + Sync,
{
    fn invoke(&self, target: &Value, method: &MethodDef, args: &[Value]) -> Result<Value> {
        self(target, method, args)
    }
}

/// Answers every call with the zero value of the method return type
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueHandler;

impl InvocationHandler for DefaultValueHandler {
    fn invoke(&self, _target: &Value, method: &MethodDef, _args: &[Value]) -> Result<Value> {
        Ok(Value::default_for(method.return_type))
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Dispatcher shared by the proxies it backs
pub struct InvocationDispatcher {
    handler: Arc<dyn InvocationHandler>,
}

impl InvocationDispatcher {
    /// Dispatcher answering every call with a default value
    pub fn new() -> Arc<Self> {
        Self::with_handler(DefaultValueHandler)
    }

    /// Dispatcher forwarding calls to `handler`
    pub fn with_handler(handler: impl InvocationHandler + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Arc::new(handler),
        })
    }

    /// Dispatcher forwarding calls to a closure
    pub fn from_fn<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Value, &MethodDef, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::with_handler(handler)
    }

    /// Entry point for a call of `method` on `target`
    pub fn intercept(&self, target: &Value, method: &MethodDef, args: &[Value]) -> Result<Value> {
        self.dispatch(target, Operation::of(method), args)
    }

    pub fn dispatch(&self, target: &Value, operation: Operation<'_>, args: &[Value]) -> Result<Value> {
        match operation {
            Operation::Equals => {
                let other = args.first().unwrap_or(&Value::Null);
                Ok(Value::Bool(self.identity_equals(target, other)))
            }
            Operation::HashCode => self.identity_hash_code(target).map(Value::Int),
            Operation::ToString => self.identity_to_string(target).map(Value::Str),
            Operation::Call(method) => self.handler.invoke(target, method, args),
        }
    }

    /// Whether `value` is a proxy backed by this dispatcher
    pub fn is_own_proxy(&self, value: &Value) -> bool {
        self.own_proxy(value).is_some()
    }

    fn own_proxy<'v>(&self, value: &'v Value) -> Option<&'v ObjRef> {
        value.as_object().filter(|obj| {
            obj.downcast_ref::<Proxy>()
                .is_some_and(|proxy| std::ptr::eq(Arc::as_ptr(&proxy.dispatcher), self))
        })
    }

    /// `target.equals(other)`; absent operands compare unequal to present ones
    pub fn identity_equals(&self, target: &Value, other: &Value) -> bool {
        match self.own_proxy(target) {
            Some(this) => match self.handler.identity_source() {
                Some(source) => source.equals(this, other),
                None => self.is_own_proxy(other),
            },
            None => target.equals_with_null(other),
        }
    }

    /// `target.hashCode()`; fails on an absent target
    pub fn identity_hash_code(&self, target: &Value) -> Result<i32> {
        match self.own_proxy(target) {
            Some(this) => Ok(self.proxy_hash_code(this)),
            None => target.hash_code(),
        }
    }

    /// `target.toString()`; fails on an absent target
    pub fn identity_to_string(&self, target: &Value) -> Result<Arc<str>> {
        match self.own_proxy(target) {
            Some(this) => Ok(Arc::from(self.proxy_describe(this))),
            None => target.describe().map(Arc::from),
        }
    }

    fn proxy_hash_code(&self, this: &ObjRef) -> i32 {
        match self.handler.identity_source() {
            Some(source) => source.hash_code(this),
            None => self.identity_hash(),
        }
    }

    fn proxy_describe(&self, this: &ObjRef) -> String {
        match self.handler.identity_source() {
            Some(source) => source.describe(this),
            None => self.to_string(),
        }
    }

    /// Identity hash of the dispatcher allocation
    pub fn identity_hash(&self) -> i32 {
        identity_hash_of(self as *const Self as *const ())
    }
}

impl fmt::Display for InvocationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InvocationDispatcher@{:x}", self.identity_hash())
    }
}

impl fmt::Debug for InvocationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationDispatcher")
            .field("identity", &format_args!("{:x}", self.identity_hash()))
            .finish_non_exhaustive()
    }
}

impl HostObject for InvocationDispatcher {
    fn host_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn hash_code(&self, _this: &ObjRef) -> i32 {
        self.identity_hash()
    }

    fn describe(&self, _this: &ObjRef) -> String {
        self.to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Proxy
// ============================================================================

/// Object implementing an interface through a dispatcher
#[derive(Debug)]
pub struct Proxy {
    interface: TypeId,
    dispatcher: Arc<InvocationDispatcher>,
}

impl Proxy {
    /// Create a proxy implementing `interface`
    pub fn new_instance(
        registry: &TypeRegistry,
        interface: TypeId,
        dispatcher: Arc<InvocationDispatcher>,
    ) -> Result<Value> {
        let def = registry.require(interface)?;
        if !def.is_interface() {
            return Err(ReflectError::ArgumentMismatch {
                member: "proxy creation".to_string(),
                details: format!("{} is not an interface", format::type_name(registry, interface)),
            });
        }
        tracing::trace!(interface = %def.name, dispatcher = %dispatcher, "created proxy");
        Ok(Value::object(Proxy {
            interface,
            dispatcher,
        }))
    }

    /// Interface implemented by the proxy
    pub fn interface(&self) -> TypeId {
        self.interface
    }

    pub fn dispatcher(&self) -> &Arc<InvocationDispatcher> {
        &self.dispatcher
    }
}

impl HostObject for Proxy {
    fn host_type(&self) -> TypeId {
        self.interface
    }

    fn equals(&self, this: &ObjRef, other: &Value) -> bool {
        self.dispatcher
            .identity_equals(&Value::Object(this.clone()), other)
    }

    fn hash_code(&self, this: &ObjRef) -> i32 {
        self.dispatcher.proxy_hash_code(this)
    }

    fn describe(&self, this: &ObjRef) -> String {
        self.dispatcher.proxy_describe(this)
    }

    fn invoke(&self, this: &ObjRef, method: &MethodDef, args: &[Value]) -> Result<Value> {
        self.dispatcher
            .intercept(&Value::Object(this.clone()), method, args)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_sequence(&self) -> Option<&dyn Sequence> {
        self.dispatcher
            .handler
            .identity_source()
            .and_then(|source| source.as_sequence())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MethodDefinition, TypeDefinition};
    use crate::value::Instance;

    fn supplier(registry: &mut TypeRegistry) -> TypeId {
        registry
            .register(
                TypeDefinition::interface("com.acme.Supplier")
                    .method(MethodDefinition::new("get").returns(TypeId::OBJECT))
                    .method(MethodDefinition::new("count").returns(TypeId::INT))
                    .method(MethodDefinition::new("ready").returns(TypeId::BOOLEAN))
                    .method(MethodDefinition::new("letter").returns(TypeId::CHAR)),
            )
            .unwrap()
    }

    fn root_method<'r>(registry: &'r TypeRegistry, name: &str) -> &'r MethodDef {
        let params: &[TypeId] = if name == "equals" { &[TypeId::OBJECT] } else { &[] };
        registry.declared_method(TypeId::OBJECT, name, params).unwrap()
    }

    #[test]
    fn test_operation_of() {
        let registry = TypeRegistry::new();
        assert_eq!(Operation::of(root_method(&registry, "equals")), Operation::Equals);
        assert_eq!(Operation::of(root_method(&registry, "hashCode")), Operation::HashCode);
        assert_eq!(Operation::of(root_method(&registry, "toString")), Operation::ToString);
    }

    #[test]
    fn test_overloads_of_identity_names_are_calls() {
        let mut registry = TypeRegistry::new();
        let api = registry
            .register(
                TypeDefinition::interface("com.acme.Overloads")
                    .method(MethodDefinition::new("equals").param(TypeId::INT).returns(TypeId::BOOLEAN))
                    .method(MethodDefinition::new("toString").param(TypeId::INT).returns(TypeId::STRING)),
            )
            .unwrap();
        for method in &registry.get(api).unwrap().methods {
            assert!(!Operation::of(method).is_identity(), "{}", method.name);
        }

        let dispatcher = InvocationDispatcher::from_fn(|_, _, _| Ok(Value::string("handled")));
        let proxy = Proxy::new_instance(&registry, api, dispatcher.clone()).unwrap();
        let equals_int = &registry.get(api).unwrap().methods[0];
        let result = dispatcher.intercept(&proxy, equals_int, &[Value::Int(1)]).unwrap();
        assert_eq!(result, Value::string("handled"));
    }

    #[test]
    fn test_identity_on_plain_values() {
        let registry = TypeRegistry::new();
        let dispatcher = InvocationDispatcher::new();
        let equals = root_method(&registry, "equals");
        let hash_code = root_method(&registry, "hashCode");

        let same = dispatcher.intercept(&Value::Int(42), equals, &[Value::Int(42)]).unwrap();
        assert_eq!(same, Value::Bool(true));
        let absent_left = dispatcher.intercept(&Value::Null, equals, &[Value::Int(42)]).unwrap();
        assert_eq!(absent_left, Value::Bool(false));
        let absent_right = dispatcher.intercept(&Value::Int(42), equals, &[Value::Null]).unwrap();
        assert_eq!(absent_right, Value::Bool(false));

        assert_eq!(dispatcher.intercept(&Value::Int(42), hash_code, &[]).unwrap(), Value::Int(42));
        assert!(matches!(
            dispatcher.intercept(&Value::Null, hash_code, &[]),
            Err(ReflectError::NullDereference { .. })
        ));
    }

    #[test]
    fn test_proxy_identity() {
        let mut registry = TypeRegistry::new();
        let supplier = supplier(&mut registry);
        let dispatcher = InvocationDispatcher::new();
        let proxy = Proxy::new_instance(&registry, supplier, dispatcher.clone()).unwrap();
        let sibling = Proxy::new_instance(&registry, supplier, dispatcher.clone()).unwrap();
        let stranger = Proxy::new_instance(&registry, supplier, InvocationDispatcher::new()).unwrap();
        let plain = Value::object(Instance::new(TypeId::OBJECT));
        let dispatcher_value = Value::Object(ObjRef::from_arc(dispatcher.clone()));

        assert!(proxy.equals_with_null(&proxy));
        assert!(proxy.equals_with_null(&sibling));
        assert!(!proxy.equals_with_null(&stranger));
        assert!(!proxy.equals_with_null(&plain));
        assert!(!plain.equals_with_null(&proxy));
        assert!(!proxy.equals_with_null(&dispatcher_value));
        assert!(!dispatcher_value.equals_with_null(&proxy));
        assert!(dispatcher_value.equals_with_null(&dispatcher_value.clone()));

        assert_eq!(proxy.hash_code().unwrap(), dispatcher_value.hash_code().unwrap());
        assert_eq!(proxy.describe().unwrap(), dispatcher.to_string());
        assert!(dispatcher.to_string().contains("InvocationDispatcher"));
    }

    #[test]
    fn test_default_values() {
        let mut registry = TypeRegistry::new();
        let supplier = supplier(&mut registry);
        let proxy = Proxy::new_instance(&registry, supplier, InvocationDispatcher::new()).unwrap();
        let proxy_obj = proxy.as_object().unwrap();
        let def = registry.get(supplier).unwrap();

        let results: Vec<_> = def
            .methods
            .iter()
            .map(|m| proxy_obj.host().invoke(proxy_obj, m, &[]).unwrap())
            .collect();
        assert_eq!(
            results,
            vec![Value::Null, Value::Int(0), Value::Bool(false), Value::Char('\0')]
        );
    }

    #[test]
    fn test_handler_results_are_verbatim() {
        #[derive(Debug, thiserror::Error)]
        #[error("handler refused")]
        struct Refused;

        let mut registry = TypeRegistry::new();
        let supplier = supplier(&mut registry);
        let dispatcher = InvocationDispatcher::from_fn(|_, method, _| match method.name.as_str() {
            "get" => Ok(Value::string("supplied")),
            _ => Err(ReflectError::application(Refused)),
        });
        let proxy = Proxy::new_instance(&registry, supplier, dispatcher).unwrap();
        let proxy_obj = proxy.as_object().unwrap();
        let def = registry.get(supplier).unwrap();

        let get = proxy_obj.host().invoke(proxy_obj, &def.methods[0], &[]).unwrap();
        assert_eq!(get, Value::string("supplied"));
        let err = proxy_obj.host().invoke(proxy_obj, &def.methods[1], &[]).unwrap_err();
        assert!(matches!(err, ReflectError::Application(_)));
        assert_eq!(err.to_string(), "handler refused");
    }

    #[test]
    fn test_proxy_requires_interface() {
        let mut registry = TypeRegistry::new();
        let class = registry.register(TypeDefinition::class("com.acme.Concrete")).unwrap();
        let err = Proxy::new_instance(&registry, class, InvocationDispatcher::new()).unwrap_err();
        assert!(matches!(err, ReflectError::ArgumentMismatch { .. }));
    }
}
