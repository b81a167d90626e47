//! Read-only sequence views
//!
//! [`ReadOnlySequence`] wraps any [`Sequence`] and refuses every mutation
//! before the delegate is touched. Which operations mutate is decided by a
//! single process-wide table (see [`classify`]), shared by the direct
//! [`Sequence`] implementation, the cursors it hands out and its
//! [`InvocationHandler`] implementation used behind proxies.
//!
//! [`ArraySequence`] is the growable, shareable sequence used as a backing
//! store and for snapshots.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::dispatch::InvocationHandler;
use crate::error::{ReflectError, Result};
use crate::types::{MethodDef, TypeId};
use crate::value::{HostObject, ObjRef, Value};

// ============================================================================
// Operation classification
// ============================================================================

/// Operations of the sequence and cursor contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceOp {
    Size,
    IsEmpty,
    Get,
    Contains,
    ContainsAll,
    IndexOf,
    LastIndexOf,
    ToArray,
    Set,
    Add,
    AddAt,
    RemoveAt,
    Remove,
    AddAll,
    AddAllAt,
    RemoveAll,
    RetainAll,
    RemoveIf,
    ReplaceAll,
    Sort,
    Clear,
    Iterator,
    ListIterator,
    ListIteratorAt,
    SubList,
    Equals,
    HashCode,
    ToString,
    CursorHasNext,
    CursorNext,
    CursorHasPrevious,
    CursorPrevious,
    CursorNextIndex,
    CursorPreviousIndex,
    CursorSet,
    CursorAdd,
    CursorRemove,
}

/// How a read-only view treats an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// Rejected without touching the delegate
    Mutating,
    /// Delegate cursor requested then wrapped read-only
    IteratorFactory,
    /// Forwarded, result returned as is
    PassThrough,
    /// Answered by content (equality, hash, rendering)
    Identity,
}

const CLASSIFICATION: &[(SequenceOp, OperationClass)] = &[
    (SequenceOp::Size, OperationClass::PassThrough),
    (SequenceOp::IsEmpty, OperationClass::PassThrough),
    (SequenceOp::Get, OperationClass::PassThrough),
    (SequenceOp::Contains, OperationClass::PassThrough),
    (SequenceOp::ContainsAll, OperationClass::PassThrough),
    (SequenceOp::IndexOf, OperationClass::PassThrough),
    (SequenceOp::LastIndexOf, OperationClass::PassThrough),
    (SequenceOp::ToArray, OperationClass::PassThrough),
    (SequenceOp::SubList, OperationClass::PassThrough),
    (SequenceOp::Set, OperationClass::Mutating),
    (SequenceOp::Add, OperationClass::Mutating),
    (SequenceOp::AddAt, OperationClass::Mutating),
    (SequenceOp::RemoveAt, OperationClass::Mutating),
    (SequenceOp::Remove, OperationClass::Mutating),
    (SequenceOp::AddAll, OperationClass::Mutating),
    (SequenceOp::AddAllAt, OperationClass::Mutating),
    (SequenceOp::RemoveAll, OperationClass::Mutating),
    (SequenceOp::RetainAll, OperationClass::Mutating),
    (SequenceOp::RemoveIf, OperationClass::Mutating),
    (SequenceOp::ReplaceAll, OperationClass::Mutating),
    (SequenceOp::Sort, OperationClass::Mutating),
    (SequenceOp::Clear, OperationClass::Mutating),
    (SequenceOp::Iterator, OperationClass::IteratorFactory),
    (SequenceOp::ListIterator, OperationClass::IteratorFactory),
    (SequenceOp::ListIteratorAt, OperationClass::IteratorFactory),
    (SequenceOp::Equals, OperationClass::Identity),
    (SequenceOp::HashCode, OperationClass::Identity),
    (SequenceOp::ToString, OperationClass::Identity),
    (SequenceOp::CursorHasNext, OperationClass::PassThrough),
    (SequenceOp::CursorNext, OperationClass::PassThrough),
    (SequenceOp::CursorHasPrevious, OperationClass::PassThrough),
    (SequenceOp::CursorPrevious, OperationClass::PassThrough),
    (SequenceOp::CursorNextIndex, OperationClass::PassThrough),
    (SequenceOp::CursorPreviousIndex, OperationClass::PassThrough),
    (SequenceOp::CursorSet, OperationClass::Mutating),
    (SequenceOp::CursorAdd, OperationClass::Mutating),
    (SequenceOp::CursorRemove, OperationClass::Mutating),
];

static OPERATION_TABLE: LazyLock<FxHashMap<SequenceOp, OperationClass>> =
    LazyLock::new(|| CLASSIFICATION.iter().copied().collect());

/// Class of `op`; anything missing from the table counts as mutating
pub fn classify(op: SequenceOp) -> OperationClass {
    OPERATION_TABLE
        .get(&op)
        .copied()
        .unwrap_or(OperationClass::Mutating)
}

impl SequenceOp {
    /// Every operation, in declaration order
    pub const ALL: [SequenceOp; 37] = [
        SequenceOp::Size,
        SequenceOp::IsEmpty,
        SequenceOp::Get,
        SequenceOp::Contains,
        SequenceOp::ContainsAll,
        SequenceOp::IndexOf,
        SequenceOp::LastIndexOf,
        SequenceOp::ToArray,
        SequenceOp::Set,
        SequenceOp::Add,
        SequenceOp::AddAt,
        SequenceOp::RemoveAt,
        SequenceOp::Remove,
        SequenceOp::AddAll,
        SequenceOp::AddAllAt,
        SequenceOp::RemoveAll,
        SequenceOp::RetainAll,
        SequenceOp::RemoveIf,
        SequenceOp::ReplaceAll,
        SequenceOp::Sort,
        SequenceOp::Clear,
        SequenceOp::Iterator,
        SequenceOp::ListIterator,
        SequenceOp::ListIteratorAt,
        SequenceOp::SubList,
        SequenceOp::Equals,
        SequenceOp::HashCode,
        SequenceOp::ToString,
        SequenceOp::CursorHasNext,
        SequenceOp::CursorNext,
        SequenceOp::CursorHasPrevious,
        SequenceOp::CursorPrevious,
        SequenceOp::CursorNextIndex,
        SequenceOp::CursorPreviousIndex,
        SequenceOp::CursorSet,
        SequenceOp::CursorAdd,
        SequenceOp::CursorRemove,
    ];

    /// Name of the operation in the list contract
    pub fn name(self) -> &'static str {
        match self {
            SequenceOp::Size => "size",
            SequenceOp::IsEmpty => "isEmpty",
            SequenceOp::Get => "get",
            SequenceOp::Contains => "contains",
            SequenceOp::ContainsAll => "containsAll",
            SequenceOp::IndexOf => "indexOf",
            SequenceOp::LastIndexOf => "lastIndexOf",
            SequenceOp::ToArray => "toArray",
            SequenceOp::Set => "set",
            SequenceOp::Add | SequenceOp::AddAt => "add",
            SequenceOp::RemoveAt | SequenceOp::Remove => "remove",
            SequenceOp::AddAll | SequenceOp::AddAllAt => "addAll",
            SequenceOp::RemoveAll => "removeAll",
            SequenceOp::RetainAll => "retainAll",
            SequenceOp::RemoveIf => "removeIf",
            SequenceOp::ReplaceAll => "replaceAll",
            SequenceOp::Sort => "sort",
            SequenceOp::Clear => "clear",
            SequenceOp::Iterator => "iterator",
            SequenceOp::ListIterator | SequenceOp::ListIteratorAt => "listIterator",
            SequenceOp::SubList => "subList",
            SequenceOp::Equals => "equals",
            SequenceOp::HashCode => "hashCode",
            SequenceOp::ToString => "toString",
            SequenceOp::CursorHasNext => "ListIterator.hasNext",
            SequenceOp::CursorNext => "ListIterator.next",
            SequenceOp::CursorHasPrevious => "ListIterator.hasPrevious",
            SequenceOp::CursorPrevious => "ListIterator.previous",
            SequenceOp::CursorNextIndex => "ListIterator.nextIndex",
            SequenceOp::CursorPreviousIndex => "ListIterator.previousIndex",
            SequenceOp::CursorSet => "ListIterator.set",
            SequenceOp::CursorAdd => "ListIterator.add",
            SequenceOp::CursorRemove => "ListIterator.remove",
        }
    }

    /// List operation called through `method`, by name and parameters;
    /// `remove(int)` is positional, `remove(Object)` is not
    pub fn from_method(method: &MethodDef) -> Option<Self> {
        let op = match (method.name.as_str(), method.params.as_slice()) {
            ("size", []) => SequenceOp::Size,
            ("isEmpty", []) => SequenceOp::IsEmpty,
            ("get", [_]) => SequenceOp::Get,
            ("contains", [_]) => SequenceOp::Contains,
            ("containsAll", [_]) => SequenceOp::ContainsAll,
            ("indexOf", [_]) => SequenceOp::IndexOf,
            ("lastIndexOf", [_]) => SequenceOp::LastIndexOf,
            ("toArray", []) => SequenceOp::ToArray,
            ("set", [_, _]) => SequenceOp::Set,
            ("add", [_]) => SequenceOp::Add,
            ("add", [_, _]) => SequenceOp::AddAt,
            ("remove", [TypeId::INT]) => SequenceOp::RemoveAt,
            ("remove", [_]) => SequenceOp::Remove,
            ("addAll", [_]) => SequenceOp::AddAll,
            ("addAll", [_, _]) => SequenceOp::AddAllAt,
            ("removeAll", [_]) => SequenceOp::RemoveAll,
            ("retainAll", [_]) => SequenceOp::RetainAll,
            ("removeIf", [_]) => SequenceOp::RemoveIf,
            ("replaceAll", [_]) => SequenceOp::ReplaceAll,
            ("sort", [_]) => SequenceOp::Sort,
            ("clear", []) => SequenceOp::Clear,
            ("iterator", []) => SequenceOp::Iterator,
            ("listIterator", []) => SequenceOp::ListIterator,
            ("listIterator", [_]) => SequenceOp::ListIteratorAt,
            ("subList", [_, _]) => SequenceOp::SubList,
            ("equals", [TypeId::OBJECT]) => SequenceOp::Equals,
            ("hashCode", []) => SequenceOp::HashCode,
            ("toString", []) => SequenceOp::ToString,
            _ => return None,
        };
        Some(op)
    }
}

fn reject_mutation(op: SequenceOp) -> Result<OperationClass> {
    match classify(op) {
        OperationClass::Mutating => {
            tracing::debug!(operation = op.name(), "rejected mutation of a read-only sequence");
            Err(ReflectError::UnsupportedOperation {
                operation: op.name(),
            })
        }
        class => Ok(class),
    }
}

// ============================================================================
// Contracts
// ============================================================================

/// Ordered, indexable sequence of values with interior mutability
///
/// Mutations are fallible so that views can refuse them.
pub trait Sequence: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Value>;

    fn index_of(&self, value: &Value) -> Option<usize>;

    fn last_index_of(&self, value: &Value) -> Option<usize>;

    fn contains(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }

    fn contains_all(&self, values: &[Value]) -> bool {
        values.iter().all(|v| self.contains(v))
    }

    /// Snapshot of the current content
    fn to_vec(&self) -> Vec<Value>;

    fn for_each(&self, f: &mut dyn FnMut(&Value)) {
        for value in self.to_vec() {
            f(&value);
        }
    }

    /// Replace the element at `index`, returning the previous one
    fn set(&self, index: usize, value: Value) -> Result<Value>;

    /// Append a value
    fn push(&self, value: Value) -> Result<bool>;

    fn insert(&self, index: usize, value: Value) -> Result<()>;

    fn remove_at(&self, index: usize) -> Result<Value>;

    /// Remove the first element equal to `value`
    fn remove(&self, value: &Value) -> Result<bool>;

    fn extend(&self, values: &[Value]) -> Result<bool>;

    fn insert_all(&self, index: usize, values: &[Value]) -> Result<bool>;

    fn remove_all(&self, values: &[Value]) -> Result<bool>;

    fn retain_all(&self, values: &[Value]) -> Result<bool>;

    fn remove_if(&self, predicate: &mut dyn FnMut(&Value) -> bool) -> Result<bool>;

    fn replace_all(&self, operator: &mut dyn FnMut(&Value) -> Value) -> Result<()>;

    fn sort(&self, compare: &mut dyn FnMut(&Value, &Value) -> Ordering) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// View over `from..to`, sharing this sequence's storage
    fn sub_sequence(&self, from: usize, to: usize) -> Result<Arc<dyn Sequence>>;

    /// Cursor positioned before the element at `index`
    fn cursor_at(&self, index: usize) -> Result<Box<dyn Cursor>>;

    fn cursor(&self) -> Result<Box<dyn Cursor>> {
        self.cursor_at(0)
    }
}

/// Bidirectional cursor over a [`Sequence`]
pub trait Cursor: Send {
    fn has_next(&self) -> bool;
    fn next(&mut self) -> Result<Value>;
    fn has_previous(&self) -> bool;
    fn previous(&mut self) -> Result<Value>;
    fn next_index(&self) -> usize;
    /// `None` at the start of the sequence
    fn previous_index(&self) -> Option<usize>;
    /// Replace the element last returned by `next` or `previous`
    fn set(&mut self, value: Value) -> Result<()>;
    /// Insert before the cursor position
    fn add(&mut self, value: Value) -> Result<()>;
    /// Remove the element last returned by `next` or `previous`
    fn remove(&mut self) -> Result<()>;
}

fn out_of_bounds(index: usize, len: usize) -> ReflectError {
    ReflectError::IndexOutOfBounds { index, len }
}

fn position(values: &[Value], value: &Value) -> Option<usize> {
    values.iter().position(|v| v.equals_with_null(value))
}

fn rposition(values: &[Value], value: &Value) -> Option<usize> {
    values.iter().rposition(|v| v.equals_with_null(value))
}

// ============================================================================
// Content identity
// ============================================================================

/// Element-wise equality against any sequence-backed value
pub fn sequence_equals(this: &dyn Sequence, other: &Value) -> bool {
    let Some(other) = other.as_object().and_then(|o| o.host().as_sequence()) else {
        return false;
    };
    let (left, right) = (this.to_vec(), other.to_vec());
    left.len() == right.len() && left.iter().zip(&right).all(|(l, r)| l.equals_with_null(r))
}

/// List hash: `31 * h + hash(e)`, absent elements hashing to 0
pub fn sequence_hash(this: &dyn Sequence) -> i32 {
    this.to_vec().iter().fold(1i32, |h, value| {
        h.wrapping_mul(31)
            .wrapping_add(value.hash_code().unwrap_or(0))
    })
}

/// `[a, b, null]`
pub fn sequence_describe(this: &dyn Sequence) -> String {
    let items: Vec<String> = this
        .to_vec()
        .iter()
        .map(|v| v.describe().unwrap_or_else(|_| "null".to_string()))
        .collect();
    format!("[{}]", items.join(", "))
}

// ============================================================================
// Array-backed sequence
// ============================================================================

/// Shared storage of an [`ArraySequence`] and its sub-sequences
#[derive(Debug, Default)]
struct Store {
    values: Vec<Value>,
    /// Bumped by every edit
    version: u64,
    /// Bumped by every edit changing the length
    structure: u64,
}

/// Range of the storage seen by a sub-sequence
#[derive(Debug)]
struct Window {
    offset: usize,
    len: AtomicUsize,
    /// `Store::structure` the window was last resized for
    synced: AtomicU64,
    parent: Option<Arc<Window>>,
}

/// Growable sequence over shared storage
///
/// Clones share the same storage. A sub-sequence sees a range of its
/// parent; structural changes made through it resize every enclosing view.
/// Any other structural change leaves it stale: reads see it empty and
/// positional or mutating calls fail with [`ReflectError::IllegalState`].
#[derive(Clone)]
pub struct ArraySequence {
    store: Arc<RwLock<Store>>,
    window: Option<Arc<Window>>,
    host_type: TypeId,
}

const STALE_VIEW: ReflectError =
    ReflectError::IllegalState("sub-sequence used after a structural change of its parent");

impl ArraySequence {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(values: Vec<Value>) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store {
                values,
                ..Store::default()
            })),
            window: None,
            host_type: TypeId::OBJECT,
        }
    }

    /// Runtime type reported when used as a value
    pub fn with_host_type(mut self, ty: TypeId) -> Self {
        self.host_type = ty;
        self
    }

    fn bounds(&self, store: &Store) -> Result<(usize, usize)> {
        let Some(window) = &self.window else {
            return Ok((0, store.values.len()));
        };
        if window.synced.load(AtomicOrdering::Acquire) != store.structure {
            return Err(STALE_VIEW);
        }
        let end = window.offset + window.len.load(AtomicOrdering::Acquire);
        if end > store.values.len() {
            return Err(STALE_VIEW);
        }
        Ok((window.offset, end))
    }

    fn read<R>(&self, f: impl FnOnce(&[Value]) -> R) -> Result<R> {
        let store = self.store.read();
        let (start, end) = self.bounds(&store)?;
        Ok(f(&store.values[start..end]))
    }

    fn peek<R: Default>(&self, f: impl FnOnce(&[Value]) -> R) -> R {
        self.read(f).unwrap_or_default()
    }

    /// Run `f` on a copy of the visible range, then write it back unless
    /// the storage changed meanwhile; size changes propagate to the
    /// enclosing views
    fn edit<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> Result<R>) -> Result<R> {
        let (mut range, start, end, version) = {
            let store = self.store.read();
            let (start, end) = self.bounds(&store)?;
            (store.values[start..end].to_vec(), start, end, store.version)
        };
        let result = f(&mut range)?;

        let mut store = self.store.write();
        if store.version != version {
            return Err(ReflectError::IllegalState("sequence modified during an edit"));
        }
        let (before, after) = (end - start, range.len());
        store.values.splice(start..end, range);
        store.version += 1;
        if before != after {
            store.structure += 1;
            let mut window = self.window.as_deref();
            while let Some(w) = window {
                let len = w.len.load(AtomicOrdering::Acquire) - before + after;
                w.len.store(len, AtomicOrdering::Release);
                w.synced.store(store.structure, AtomicOrdering::Release);
                window = w.parent.as_deref();
            }
        }
        Ok(result)
    }
}

impl Sequence for ArraySequence {
    fn len(&self) -> usize {
        self.peek(<[Value]>::len)
    }

    fn get(&self, index: usize) -> Result<Value> {
        self.read(|values| values.get(index).cloned().ok_or_else(|| out_of_bounds(index, values.len())))?
    }

    fn index_of(&self, value: &Value) -> Option<usize> {
        self.peek(|values| position(values, value))
    }

    fn last_index_of(&self, value: &Value) -> Option<usize> {
        self.peek(|values| rposition(values, value))
    }

    fn to_vec(&self) -> Vec<Value> {
        self.peek(<[Value]>::to_vec)
    }

    fn set(&self, index: usize, value: Value) -> Result<Value> {
        self.edit(|values| {
            let len = values.len();
            let slot = values.get_mut(index).ok_or_else(|| out_of_bounds(index, len))?;
            Ok(std::mem::replace(slot, value))
        })
    }

    fn push(&self, value: Value) -> Result<bool> {
        self.edit(|values| {
            values.push(value);
            Ok(true)
        })
    }

    fn insert(&self, index: usize, value: Value) -> Result<()> {
        self.edit(|values| {
            if index > values.len() {
                return Err(out_of_bounds(index, values.len()));
            }
            values.insert(index, value);
            Ok(())
        })
    }

    fn remove_at(&self, index: usize) -> Result<Value> {
        self.edit(|values| {
            if index >= values.len() {
                return Err(out_of_bounds(index, values.len()));
            }
            Ok(values.remove(index))
        })
    }

    fn remove(&self, value: &Value) -> Result<bool> {
        self.edit(|values| {
            Ok(match position(values, value) {
                Some(index) => {
                    values.remove(index);
                    true
                }
                None => false,
            })
        })
    }

    fn extend(&self, extra: &[Value]) -> Result<bool> {
        self.edit(|values| {
            values.extend_from_slice(extra);
            Ok(!extra.is_empty())
        })
    }

    fn insert_all(&self, index: usize, extra: &[Value]) -> Result<bool> {
        self.edit(|values| {
            if index > values.len() {
                return Err(out_of_bounds(index, values.len()));
            }
            values.splice(index..index, extra.iter().cloned());
            Ok(!extra.is_empty())
        })
    }

    fn remove_all(&self, other: &[Value]) -> Result<bool> {
        self.edit(|values| {
            let before = values.len();
            values.retain(|v| position(other, v).is_none());
            Ok(values.len() != before)
        })
    }

    fn retain_all(&self, other: &[Value]) -> Result<bool> {
        self.edit(|values| {
            let before = values.len();
            values.retain(|v| position(other, v).is_some());
            Ok(values.len() != before)
        })
    }

    fn remove_if(&self, predicate: &mut dyn FnMut(&Value) -> bool) -> Result<bool> {
        self.edit(|values| {
            let before = values.len();
            values.retain(|v| !predicate(v));
            Ok(values.len() != before)
        })
    }

    fn replace_all(&self, operator: &mut dyn FnMut(&Value) -> Value) -> Result<()> {
        self.edit(|values| {
            for value in values.iter_mut() {
                *value = operator(value);
            }
            Ok(())
        })
    }

    fn sort(&self, compare: &mut dyn FnMut(&Value, &Value) -> Ordering) -> Result<()> {
        self.edit(|values| {
            values.sort_by(|a, b| compare(a, b));
            Ok(())
        })
    }

    fn clear(&self) -> Result<()> {
        self.edit(|values| {
            values.clear();
            Ok(())
        })
    }

    fn sub_sequence(&self, from: usize, to: usize) -> Result<Arc<dyn Sequence>> {
        let store = self.store.read();
        let (start, end) = self.bounds(&store)?;
        let len = end - start;
        if from > to || to > len {
            return Err(out_of_bounds(if from > to { from } else { to }, len));
        }
        Ok(Arc::new(ArraySequence {
            store: Arc::clone(&self.store),
            window: Some(Arc::new(Window {
                offset: start + from,
                len: AtomicUsize::new(to - from),
                synced: AtomicU64::new(store.structure),
                parent: self.window.clone(),
            })),
            host_type: self.host_type,
        }))
    }

fn cursor_at(&self, index: usize) -> Result<Box<dyn Cursor>> {
        let len = self.len();
        if index > len {
            return Err(out_of_bounds(index, len));
        }
        Ok(Box::new(ArrayCursor {
            sequence: self.clone(),
            position: index,
            last_returned: None,
        }))
    }
}

impl fmt::Debug for ArraySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

impl HostObject for ArraySequence {
    fn host_type(&self) -> TypeId {
        self.host_type
    }

    fn equals(&self, _this: &ObjRef, other: &Value) -> bool {
        sequence_equals(self, other)
    }

    fn hash_code(&self, _this: &ObjRef) -> i32 {
        sequence_hash(self)
    }

    fn describe(&self, _this: &ObjRef) -> String {
        sequence_describe(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_sequence(&self) -> Option<&dyn Sequence> {
        Some(self)
    }
}

struct ArrayCursor {
    sequence: ArraySequence,
    position: usize,
    last_returned: Option<usize>,
}

impl Cursor for ArrayCursor {
    fn has_next(&self) -> bool {
        self.position < self.sequence.len()
    }

    fn next(&mut self) -> Result<Value> {
        let value = self.sequence.get(self.position)?;
        self.last_returned = Some(self.position);
        self.position += 1;
        Ok(value)
    }

    fn has_previous(&self) -> bool {
        self.position > 0
    }

    fn previous(&mut self) -> Result<Value> {
        let index = self
            .position
            .checked_sub(1)
            .ok_or(ReflectError::IllegalState("no previous element"))?;
        let value = self.sequence.get(index)?;
        self.position = index;
        self.last_returned = Some(index);
        Ok(value)
    }

    fn next_index(&self) -> usize {
        self.position
    }

    fn previous_index(&self) -> Option<usize> {
        self.position.checked_sub(1)
    }

    fn set(&mut self, value: Value) -> Result<()> {
        let index = self
            .last_returned
            .ok_or(ReflectError::IllegalState("set without a current element"))?;
        self.sequence.set(index, value).map(|_| ())
    }

    fn add(&mut self, value: Value) -> Result<()> {
        self.sequence.insert(self.position, value)?;
        self.position += 1;
        self.last_returned = None;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        let index = self
            .last_returned
            .take()
            .ok_or(ReflectError::IllegalState("remove without a current element"))?;
        self.sequence.remove_at(index)?;
        if index < self.position {
            self.position -= 1;
        }
        Ok(())
    }
}

// ============================================================================
// Read-only view
// ============================================================================

/// Read-only view over a sequence
///
/// Reads go straight to the delegate, so the view always shows its current
/// content.
#[derive(Clone)]
pub struct ReadOnlySequence {
    delegate: Arc<dyn Sequence>,
    host_type: TypeId,
}

impl ReadOnlySequence {
    pub fn new(delegate: Arc<dyn Sequence>) -> Self {
        Self {
            delegate,
            host_type: TypeId::OBJECT,
        }
    }

    /// Runtime type reported when used as a value
    pub fn with_host_type(mut self, ty: TypeId) -> Self {
        self.host_type = ty;
        self
    }

    fn wrap_cursor(&self, op: SequenceOp, index: usize) -> Result<Box<dyn Cursor>> {
        reject_mutation(op)?;
        let cursor = self.delegate.cursor_at(index)?;
        Ok(Box::new(ReadOnlyCursor { inner: cursor }))
    }
}

impl Sequence for ReadOnlySequence {
    fn len(&self) -> usize {
        self.delegate.len()
    }

    fn get(&self, index: usize) -> Result<Value> {
        self.delegate.get(index)
    }

    fn index_of(&self, value: &Value) -> Option<usize> {
        self.delegate.index_of(value)
    }

    fn last_index_of(&self, value: &Value) -> Option<usize> {
        self.delegate.last_index_of(value)
    }

    fn to_vec(&self) -> Vec<Value> {
        self.delegate.to_vec()
    }

    fn set(&self, index: usize, value: Value) -> Result<Value> {
        reject_mutation(SequenceOp::Set)?;
        self.delegate.set(index, value)
    }

    fn push(&self, value: Value) -> Result<bool> {
        reject_mutation(SequenceOp::Add)?;
        self.delegate.push(value)
    }

    fn insert(&self, index: usize, value: Value) -> Result<()> {
        reject_mutation(SequenceOp::AddAt)?;
        self.delegate.insert(index, value)
    }

    fn remove_at(&self, index: usize) -> Result<Value> {
        reject_mutation(SequenceOp::RemoveAt)?;
        self.delegate.remove_at(index)
    }

    fn remove(&self, value: &Value) -> Result<bool> {
        reject_mutation(SequenceOp::Remove)?;
        self.delegate.remove(value)
    }

    fn extend(&self, values: &[Value]) -> Result<bool> {
        reject_mutation(SequenceOp::AddAll)?;
        self.delegate.extend(values)
    }

    fn insert_all(&self, index: usize, values: &[Value]) -> Result<bool> {
        reject_mutation(SequenceOp::AddAllAt)?;
        self.delegate.insert_all(index, values)
    }

    fn remove_all(&self, values: &[Value]) -> Result<bool> {
        reject_mutation(SequenceOp::RemoveAll)?;
        self.delegate.remove_all(values)
    }

    fn retain_all(&self, values: &[Value]) -> Result<bool> {
        reject_mutation(SequenceOp::RetainAll)?;
        self.delegate.retain_all(values)
    }

    fn remove_if(&self, predicate: &mut dyn FnMut(&Value) -> bool) -> Result<bool> {
        reject_mutation(SequenceOp::RemoveIf)?;
        self.delegate.remove_if(predicate)
    }

    fn replace_all(&self, operator: &mut dyn FnMut(&Value) -> Value) -> Result<()> {
        reject_mutation(SequenceOp::ReplaceAll)?;
        self.delegate.replace_all(operator)
    }

    fn sort(&self, compare: &mut dyn FnMut(&Value, &Value) -> Ordering) -> Result<()> {
        reject_mutation(SequenceOp::Sort)?;
        self.delegate.sort(compare)
    }

    fn clear(&self) -> Result<()> {
        reject_mutation(SequenceOp::Clear)?;
        self.delegate.clear()
    }

    fn sub_sequence(&self, from: usize, to: usize) -> Result<Arc<dyn Sequence>> {
        let view = self.delegate.sub_sequence(from, to)?;
        Ok(Arc::new(ReadOnlySequence::new(view).with_host_type(self.host_type)))
    }

    fn cursor_at(&self, index: usize) -> Result<Box<dyn Cursor>> {
        self.wrap_cursor(SequenceOp::ListIteratorAt, index)
    }

    fn cursor(&self) -> Result<Box<dyn Cursor>> {
        self.wrap_cursor(SequenceOp::Iterator, 0)
    }
}

impl fmt::Debug for ReadOnlySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnlySequence").field(&self.to_vec()).finish()
    }
}

impl HostObject for ReadOnlySequence {
    fn host_type(&self) -> TypeId {
        self.host_type
    }

    fn equals(&self, _this: &ObjRef, other: &Value) -> bool {
        sequence_equals(self, other)
    }

    fn hash_code(&self, _this: &ObjRef) -> i32 {
        sequence_hash(self)
    }

    fn describe(&self, _this: &ObjRef) -> String {
        sequence_describe(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_sequence(&self) -> Option<&dyn Sequence> {
        Some(self)
    }
}

/// Cursor refusing every modification
struct ReadOnlyCursor {
    inner: Box<dyn Cursor>,
}

impl Cursor for ReadOnlyCursor {
    fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    fn next(&mut self) -> Result<Value> {
        self.inner.next()
    }

    fn has_previous(&self) -> bool {
        self.inner.has_previous()
    }

    fn previous(&mut self) -> Result<Value> {
        self.inner.previous()
    }

    fn next_index(&self) -> usize {
        self.inner.next_index()
    }

    fn previous_index(&self) -> Option<usize> {
        self.inner.previous_index()
    }

    fn set(&mut self, value: Value) -> Result<()> {
        reject_mutation(SequenceOp::CursorSet)?;
        self.inner.set(value)
    }

    fn add(&mut self, value: Value) -> Result<()> {
        reject_mutation(SequenceOp::CursorAdd)?;
        self.inner.add(value)
    }

    fn remove(&mut self) -> Result<()> {
        reject_mutation(SequenceOp::CursorRemove)?;
        self.inner.remove()
    }
}

// ============================================================================
// Dispatch through proxies
// ============================================================================

/// Cursor exposed as a value
pub struct CursorObject {
    cursor: Mutex<Box<dyn Cursor>>,
}

impl CursorObject {
    pub fn new(cursor: Box<dyn Cursor>) -> Self {
        Self {
            cursor: Mutex::new(cursor),
        }
    }

    /// Run `f` with exclusive access to the cursor
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Cursor) -> R) -> R {
        let mut cursor = self.cursor.lock();
        f(cursor.as_mut())
    }
}

impl fmt::Debug for CursorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let position = self.cursor.lock().next_index();
        f.debug_struct("CursorObject").field("position", &position).finish()
    }
}

impl HostObject for CursorObject {
    fn host_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn index_arg(args: &[Value], position: usize, op: SequenceOp) -> Result<usize> {
    args.get(position)
        .and_then(Value::as_int)
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| ReflectError::ArgumentMismatch {
            member: op.name().to_string(),
            details: format!("argument {position} is not a valid index"),
        })
}

fn value_arg(args: &[Value], position: usize) -> Value {
    args.get(position).cloned().unwrap_or_default()
}

fn index_result(index: Option<usize>) -> Value {
    Value::Int(index.map_or(-1, |i| i32::try_from(i).unwrap_or(i32::MAX)))
}

impl InvocationHandler for ReadOnlySequence {
    fn invoke(&self, _target: &Value, method: &MethodDef, args: &[Value]) -> Result<Value> {
        let op = SequenceOp::from_method(method).ok_or_else(|| {
            ReflectError::MemberNotFound(format!("{} is not a sequence operation", method.name))
        })?;
        reject_mutation(op)?;

        Ok(match op {
            SequenceOp::Size => Value::Int(i32::try_from(self.len()).unwrap_or(i32::MAX)),
            SequenceOp::IsEmpty => Value::Bool(self.is_empty()),
            SequenceOp::Get => self.get(index_arg(args, 0, op)?)?,
            SequenceOp::Contains => Value::Bool(self.contains(&value_arg(args, 0))),
            SequenceOp::ContainsAll => {
                let other = value_arg(args, 0);
                let values = other
                    .as_object()
                    .and_then(|o| o.host().as_sequence())
                    .map(|s| s.to_vec())
                    .unwrap_or_default();
                Value::Bool(self.contains_all(&values))
            }
            SequenceOp::IndexOf => index_result(self.index_of(&value_arg(args, 0))),
            SequenceOp::LastIndexOf => index_result(self.last_index_of(&value_arg(args, 0))),
            SequenceOp::ToArray => Value::object(ArraySequence::from_vec(self.to_vec())),
            SequenceOp::Iterator => Value::object(CursorObject::new(self.cursor()?)),
            SequenceOp::ListIterator => Value::object(CursorObject::new(self.cursor_at(0)?)),
            SequenceOp::ListIteratorAt => {
                Value::object(CursorObject::new(self.cursor_at(index_arg(args, 0, op)?)?))
            }
            SequenceOp::SubList => {
                let from = index_arg(args, 0, op)?;
                let to = index_arg(args, 1, op)?;
                let view = self.delegate.sub_sequence(from, to)?;
                Value::object(ReadOnlySequence::new(view).with_host_type(self.host_type))
            }
            _ => {
                return Err(ReflectError::UnsupportedOperation {
                    operation: op.name(),
                })
            }
        })
    }

    fn identity_source(&self) -> Option<&dyn HostObject> {
        Some(self)
    }
}
