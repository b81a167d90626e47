//! Beanlens - introspection and dynamic dispatch over a type registry
//!
//! - **Registry**: type metadata and member bodies (`registry`, `types`)
//! - **Lookup**: hierarchy walks and member search (`hierarchy`, `members`)
//! - **Conventions**: bean property accessors (`property`)
//! - **Construction**: constructor resolution and invocation (`construct`)
//! - **Dispatch**: proxies routed through an invocation dispatcher (`dispatch`)
//! - **Read-only views**: sequences refusing every mutation (`readonly`)
//!
//! # Example
//!
//! ```rust,ignore
//! use beanlens::{construct, members, registry::*, TypeId, TypeRegistry};
//!
//! let mut registry = TypeRegistry::new();
//! let toto = registry.register(
//!     TypeDefinition::class("com.acme.Toto")
//!         .field(FieldDefinition::new("b", TypeId::STRING))
//!         .method(MethodDefinition::new("setB").param(TypeId::STRING)),
//! )?;
//!
//! let field = members::get_field(&registry, toto, "b")?;
//! let instance = construct::new_instance(&registry, toto)?;
//! ```

#![warn(rust_2018_idioms)]

pub mod config;
pub mod construct;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod hierarchy;
pub mod members;
pub mod property;
pub mod readonly;
pub mod registry;
pub mod types;
pub mod value;

pub use dispatch::{InvocationDispatcher, InvocationHandler, Proxy};
pub use error::{ReflectError, Result};
pub use property::{AccessorKind, PropertyBinding};
pub use readonly::{ArraySequence, ReadOnlySequence, Sequence};
pub use registry::TypeRegistry;
pub use types::{TypeId, TypeKind};
pub use value::Value;
