//! Error types for introspection and dispatch
//!
//! Lookup failures are only raised by the `get_*` family; the `find_*`
//! family returns `None` instead. Failures raised while invoking a resolved
//! constructor or method are always wrapped in [`ReflectError::Invocation`]
//! with the original failure kept as its source.

use std::error::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, ReflectError>;

/// Reason a type cannot be default-constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructionFailure {
    /// Ordinary type without a zero-argument constructor
    NoDefault,
    /// Non-static inner type: needs an enclosing instance
    InnerNonStatic,
    /// Primitive type
    Primitive,
    /// Array type
    Array,
    /// Interface type
    Interface,
}

impl ConstructionFailure {
    /// Suffix appended to the "has no default constructor" diagnostic
    pub fn explanation(self) -> &'static str {
        match self {
            ConstructionFailure::NoDefault => "",
            ConstructionFailure::InnerNonStatic => {
                " because it is an inner non static class \
                 (needs an instance of the enclosing class to be constructed)"
            }
            ConstructionFailure::Primitive => " because it is a primitive type",
            ConstructionFailure::Array => " because it is an array",
            ConstructionFailure::Interface => " because it is an interface",
        }
    }
}

/// Introspection and dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    /// Field, method, constructor or type absent after a full lookup
    #[error("{0}")]
    MemberNotFound(String),

    /// Method name or shape doesn't match any property accessor convention
    #[error("Field wrapper {method} doesn't fit encapsulation naming convention")]
    EncapsulationMismatch {
        /// Formatted method signature
        method: String,
    },

    /// Type cannot be default-constructed
    #[error("Class {type_name} has no default constructor{}", .reason.explanation())]
    ConstructionUnavailable {
        /// Formatted type name
        type_name: String,
        /// Why no default constructor is usable
        reason: ConstructionFailure,
    },

    /// Failure raised while invoking a constructor or method
    #[error("{message}")]
    Invocation {
        /// What was being invoked
        message: String,
        /// The original failure, never discarded
        #[source]
        cause: Box<ReflectError>,
    },

    /// Mutation attempted through a read-only sequence
    #[error("{operation} is not supported by a read-only sequence")]
    UnsupportedOperation {
        /// Rejected operation
        operation: &'static str,
    },

    /// Operation dereferenced an absent value
    #[error("cannot compute {operation} of an absent value")]
    NullDereference {
        /// Operation that needed a value
        operation: &'static str,
    },

    /// Member not accessible from the caller
    #[error("{member} is not accessible")]
    Inaccessible {
        /// Formatted member
        member: String,
    },

    /// Argument count or types don't match the member signature
    #[error("Illegal arguments for {member}: {details}")]
    ArgumentMismatch {
        /// Formatted member
        member: String,
        /// What didn't match
        details: String,
    },

    /// Method declared without a body (interface or abstract method)
    #[error("{member} has no implementation")]
    AbstractMember {
        /// Formatted member
        member: String,
    },

    /// Attempt to instantiate an abstract class
    #[error("Class {type_name} is abstract")]
    AbstractInstantiation {
        /// Formatted type name
        type_name: String,
    },

    /// Positional access outside a sequence
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Sequence length
        len: usize,
    },

    /// Operation invoked in a state that doesn't allow it
    #[error("{0}")]
    IllegalState(&'static str),

    /// Type name registered twice
    #[error("Type {name} is already registered")]
    DuplicateType {
        /// Binary name of the type
        name: String,
    },

    /// Failure raised by application code (constructor or method body)
    #[error("{0}")]
    Application(#[source] Box<dyn Error + Send + Sync>),
}

impl ReflectError {
    /// Wrap an application-level failure raised by a member body
    pub fn application(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        ReflectError::Application(error.into())
    }

    /// Wrap `cause` into an invocation failure
    pub fn invocation(message: impl Into<String>, cause: ReflectError) -> Self {
        ReflectError::Invocation {
            message: message.into(),
            cause: Box::new(cause),
        }
    }
}

// ============================================================================
// Cause chain search
// ============================================================================

/// Find the first error of type `E` in the cause chain of `error`, `error`
/// itself included.
pub fn find_cause<'a, E>(error: &'a (dyn Error + 'static)) -> Option<&'a E>
where
    E: Error + 'static,
{
    find_cause_matching(error, |_: &E| true)
}

/// Find the first error of type `E` accepted by `predicate` in the cause
/// chain of `error`, `error` itself included.
pub fn find_cause_matching<'a, E, P>(error: &'a (dyn Error + 'static), predicate: P) -> Option<&'a E>
where
    E: Error + 'static,
    P: Fn(&E) -> bool,
{
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(found) = err.downcast_ref::<E>() {
            if predicate(found) {
                return Some(found);
            }
        }
        current = err.source();
    }
    None
}
