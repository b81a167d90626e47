//! Runtime values
//!
//! [`Value`] is what constructors, method bodies and dispatchers exchange.
//! Reference values are [`ObjRef`]s: shared handles over a [`HostObject`]
//! whose equality is pointer identity unless the object says otherwise.

use std::any::Any;
use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use crate::error::{ReflectError, Result};
use crate::readonly::Sequence;
use crate::types::{MethodDef, TypeId};

/// A runtime value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absent reference
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// String (immutable, shared)
    Str(Arc<str>),
    /// Reference to a host object
    Object(ObjRef),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Wrap a host object
    pub fn object<T: HostObject>(obj: T) -> Self {
        Value::Object(ObjRef::new(obj))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null-safe equality: two absent values are equal, absent and present
    /// values never are, anything else is decided by the left operand.
    pub fn equals_with_null(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Object(obj), _) => obj.host().equals(obj, other),
            _ => self == other,
        }
    }

    /// Hash code of the value; fails on an absent value
    pub fn hash_code(&self) -> Result<i32> {
        Ok(match self {
            Value::Null => {
                return Err(ReflectError::NullDereference {
                    operation: "hashCode",
                })
            }
            Value::Bool(true) => 1231,
            Value::Bool(false) => 1237,
            Value::Char(c) => *c as i32,
            Value::Byte(b) => i32::from(*b),
            Value::Short(s) => i32::from(*s),
            Value::Int(i) => *i,
            Value::Long(l) => fold_long(*l),
            Value::Float(f) => f.to_bits() as i32,
            Value::Double(d) => fold_long(d.to_bits() as i64),
            Value::Str(s) => s
                .encode_utf16()
                .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit))),
            Value::Object(obj) => obj.host().hash_code(obj),
        })
    }

    /// Textual rendering of the value; fails on an absent value
    pub fn describe(&self) -> Result<String> {
        Ok(match self {
            Value::Null => {
                return Err(ReflectError::NullDereference {
                    operation: "toString",
                })
            }
            Value::Bool(b) => b.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Byte(b) => b.to_string(),
            Value::Short(s) => s.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Long(l) => l.to_string(),
            Value::Float(f) => format!("{f:?}"),
            Value::Double(d) => format!("{d:?}"),
            Value::Str(s) => s.to_string(),
            Value::Object(obj) => obj.host().describe(obj),
        })
    }

    /// Runtime type of the value, `None` when absent
    pub fn value_type(&self) -> Option<TypeId> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(TypeId::BOOLEAN),
            Value::Char(_) => Some(TypeId::CHAR),
            Value::Byte(_) => Some(TypeId::BYTE),
            Value::Short(_) => Some(TypeId::SHORT),
            Value::Int(_) => Some(TypeId::INT),
            Value::Long(_) => Some(TypeId::LONG),
            Value::Float(_) => Some(TypeId::FLOAT),
            Value::Double(_) => Some(TypeId::DOUBLE),
            Value::Str(_) => Some(TypeId::STRING),
            Value::Object(obj) => Some(obj.host().host_type()),
        }
    }

    /// Zero value of a return type: `false`, `0`, `'\0'`, or absent for
    /// references and `void` (`None`).
    pub fn default_for(ty: Option<TypeId>) -> Value {
        match ty {
            Some(TypeId::BOOLEAN) => Value::Bool(false),
            Some(TypeId::CHAR) => Value::Char('\0'),
            Some(TypeId::BYTE) => Value::Byte(0),
            Some(TypeId::SHORT) => Value::Short(0),
            Some(TypeId::INT) => Value::Int(0),
            Some(TypeId::LONG) => Value::Long(0),
            Some(TypeId::FLOAT) => Value::Float(0.0),
            Some(TypeId::DOUBLE) => Value::Double(0.0),
            _ => Value::Null,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Plain instance behind the value, if any
    pub fn as_instance(&self) -> Option<&Instance> {
        self.as_object().and_then(|obj| obj.downcast_ref::<Instance>())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

fn fold_long(l: i64) -> i32 {
    (l ^ ((l as u64) >> 32) as i64) as i32
}

// ============================================================================
// Host objects
// ============================================================================

/// Object living behind an [`ObjRef`]
///
/// The identity operations receive the handle the call was made through so
/// that implementations can compare allocations.
pub trait HostObject: Any + Send + Sync + fmt::Debug {
    /// Runtime type of the object
    fn host_type(&self) -> TypeId;

    /// Equality against `other`; identity unless overridden
    fn equals(&self, this: &ObjRef, other: &Value) -> bool {
        matches!(other, Value::Object(o) if o.ptr_eq(this))
    }

    /// Hash code; identity hash unless overridden
    fn hash_code(&self, this: &ObjRef) -> i32 {
        this.identity_hash()
    }

    /// Textual rendering
    fn describe(&self, this: &ObjRef) -> String {
        format!("#{}@{:x}", self.host_type().index(), this.identity_hash())
    }

    /// Invoke a resolved method with this object as the receiver
    fn invoke(&self, this: &ObjRef, method: &MethodDef, args: &[Value]) -> Result<Value> {
        method.call(&Value::Object(this.clone()), args)
    }

    fn as_any(&self) -> &dyn Any;

    /// Sequence view of the object, if it is one
    fn as_sequence(&self) -> Option<&dyn Sequence> {
        None
    }
}

/// Shared handle to a host object
#[derive(Clone)]
pub struct ObjRef(Arc<dyn HostObject>);

impl ObjRef {
    pub fn new<T: HostObject>(obj: T) -> Self {
        ObjRef(Arc::new(obj))
    }

    pub fn from_arc(obj: Arc<dyn HostObject>) -> Self {
        ObjRef(obj)
    }

    /// The object behind the handle
    pub fn host(&self) -> &dyn HostObject {
        &*self.0
    }

    /// Whether both handles point at the same allocation
    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// Hash of the allocation address
    pub fn identity_hash(&self) -> i32 {
        identity_hash_of(Arc::as_ptr(&self.0) as *const ())
    }

    pub fn downcast_ref<T: HostObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjRef").field(&self.0).finish()
    }
}

pub(crate) fn identity_hash_of(ptr: *const ()) -> i32 {
    let mut hasher = FxHasher::default();
    hasher.write_usize(ptr as usize);
    hasher.finish() as i32
}

// ============================================================================
// Plain instances
// ============================================================================

/// Field name holding the enclosing instance of an inner class
pub const ENCLOSING_FIELD: &str = "this$0";

/// Plain object of a registered class: a bag of named field values
#[derive(Debug)]
pub struct Instance {
    ty: TypeId,
    fields: RwLock<FxHashMap<String, Value>>,
}

impl Instance {
    pub fn new(ty: TypeId) -> Self {
        Self {
            ty,
            fields: RwLock::new(FxHashMap::default()),
        }
    }

    /// Type the instance was constructed as
    pub fn type_id(&self) -> TypeId {
        self.ty
    }

    /// Current value of a field, absent when never set
    pub fn get(&self, name: &str) -> Value {
        self.fields.read().get(name).cloned().unwrap_or_default()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.fields.write().insert(name.into(), value);
    }

    /// Enclosing instance of an inner-class object
    pub fn enclosing(&self) -> Value {
        self.get(ENCLOSING_FIELD)
    }
}

impl HostObject for Instance {
    fn host_type(&self) -> TypeId {
        self.ty
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
