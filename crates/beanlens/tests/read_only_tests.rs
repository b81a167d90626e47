//! Read-only sequences, used directly and behind a list proxy

mod common;

use std::sync::Arc;

use beanlens::construct;
use beanlens::error::{find_cause_matching, ReflectError};
use beanlens::members;
use beanlens::readonly::{classify, CursorObject, OperationClass, SequenceOp};
use beanlens::{ArraySequence, InvocationDispatcher, Proxy, ReadOnlySequence, Sequence, TypeId, Value};

use common::{default_arguments, fixture};

fn backing() -> Arc<ArraySequence> {
    Arc::new(ArraySequence::from_vec(vec![
        Value::string("a"),
        Value::string("b"),
        Value::string("c"),
    ]))
}

fn is_unsupported(err: &ReflectError) -> bool {
    find_cause_matching(err, |e: &ReflectError| {
        matches!(e, ReflectError::UnsupportedOperation { .. })
    })
    .is_some()
}

#[test]
fn test_mutations_leave_backing_untouched() {
    let backing = backing();
    let view = ReadOnlySequence::new(backing.clone());
    let before = backing.to_vec();

    let failures = [
        view.set(0, Value::string("z")).err(),
        view.push(Value::string("d")).err(),
        view.remove_at(0).err(),
        view.extend(&[Value::string("d"), Value::string("e")]).err(),
        view.clear().err(),
        view.sort(&mut |l, r| r.as_str().cmp(&l.as_str())).err(),
    ];
    for failure in failures {
        let err = failure.expect("mutation must fail");
        assert!(matches!(err, ReflectError::UnsupportedOperation { .. }), "{err}");
    }
    assert_eq!(backing.to_vec(), before);
}

#[test]
fn test_reads_see_current_backing_values() {
    let backing = backing();
    let view = ReadOnlySequence::new(backing.clone());
    backing.push(Value::string("d")).unwrap();
    backing.set(0, Value::string("z")).unwrap();

    assert_eq!(view.len(), 4);
    assert_eq!(view.get(0).unwrap(), Value::string("z"));
    assert_eq!(view.get(3).unwrap(), Value::string("d"));

    let mut cursor = view.cursor().unwrap();
    let mut traversed = Vec::new();
    while cursor.has_next() {
        traversed.push(cursor.next().unwrap());
    }
    assert_eq!(traversed, backing.to_vec());
}

#[test]
fn test_cursor_mutations_fail() {
    let backing = backing();
    let view = ReadOnlySequence::new(backing.clone());
    let mut cursor = view.cursor().unwrap();
    cursor.next().unwrap();

    assert!(matches!(cursor.remove(), Err(ReflectError::UnsupportedOperation { .. })));
    assert!(matches!(cursor.set(Value::Null), Err(ReflectError::UnsupportedOperation { .. })));
    assert!(matches!(cursor.add(Value::Null), Err(ReflectError::UnsupportedOperation { .. })));
    assert_eq!(backing.len(), 3);
}

#[test]
fn test_proxied_list_rejects_mutating_methods() {
    let fx = fixture();
    let backing = backing();
    let dispatcher = InvocationDispatcher::with_handler(ReadOnlySequence::new(backing.clone()).with_host_type(fx.list));
    let proxy = Proxy::new_instance(&fx.registry, fx.list, dispatcher).unwrap();

    let mut mutating = 0;
    let mut forwarded = 0;
    for method in members::methods_in_hierarchy(&fx.registry, fx.list) {
        let Some(op) = SequenceOp::from_method(method) else {
            continue;
        };
        let args = default_arguments(&method.params);
        let outcome = construct::invoke(&fx.registry, method, &proxy, &args);
        match classify(op) {
            OperationClass::Mutating => {
                let err = outcome.unwrap_err();
                assert!(is_unsupported(&err), "{}: {err}", method.name);
                mutating += 1;
            }
            _ => {
                assert!(outcome.is_ok(), "{}: {:?}", method.name, outcome.err());
                forwarded += 1;
            }
        }
    }
    assert_eq!(mutating, 13);
    assert_eq!(forwarded, 14);
    assert_eq!(backing.len(), 3);
}

#[test]
fn test_proxied_list_reads() {
    let fx = fixture();
    let dispatcher = InvocationDispatcher::with_handler(ReadOnlySequence::new(backing()));
    let proxy = Proxy::new_instance(&fx.registry, fx.list, dispatcher).unwrap();
    let r = &fx.registry;
    let call = |name: &str, params: &[TypeId], args: &[Value]| {
        let method = members::methods_in_hierarchy(r, fx.list)
            .find(|m| m.name == name && m.params == params)
            .unwrap();
        construct::invoke(r, method, &proxy, args).unwrap()
    };
    let (int, object) = (TypeId::INT, TypeId::OBJECT);

    assert_eq!(call("size", &[], &[]), Value::Int(3));
    assert_eq!(call("get", &[int], &[Value::Int(1)]), Value::string("b"));
    assert_eq!(call("indexOf", &[object], &[Value::string("c")]), Value::Int(2));
    assert_eq!(call("indexOf", &[object], &[Value::string("x")]), Value::Int(-1));
    assert_eq!(call("contains", &[object], &[Value::string("a")]), Value::Bool(true));

    let sub = call("subList", &[int, int], &[Value::Int(1), Value::Int(3)]);
    let sub = sub.as_object().unwrap().downcast_ref::<ReadOnlySequence>().unwrap();
    assert_eq!(sub.to_vec(), vec![Value::string("b"), Value::string("c")]);
    assert!(sub.clear().is_err());

    let iterator = call("listIterator", &[], &[]);
    let cursor = iterator.as_object().unwrap().downcast_ref::<CursorObject>().unwrap();
    cursor.with(|c| {
        assert_eq!(c.next().unwrap(), Value::string("a"));
        assert!(c.remove().is_err());
    });
}

#[test]
fn test_content_equality_of_views() {
    let view = Value::object(ReadOnlySequence::new(backing()));
    let copy = Value::object(ArraySequence::from_vec(backing().to_vec()));
    assert!(view.equals_with_null(&copy));
    assert_eq!(view.hash_code().unwrap(), copy.hash_code().unwrap());
    assert_eq!(view.describe().unwrap(), "[a, b, c]");

    let shorter = Value::object(ArraySequence::from_vec(vec![Value::string("a")]));
    assert!(!view.equals_with_null(&shorter));
    assert!(!view.equals_with_null(&Value::string("[a, b, c]")));
}
