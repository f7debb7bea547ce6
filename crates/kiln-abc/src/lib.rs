//! Kiln ABC descriptors
//!
//! The flattened output of bytecode loading as consumed by the class linker:
//! namespaces and qualified names, method descriptors, traits, and
//! class/instance descriptors. Everything here is read-only data; the linker
//! never mutates a descriptor.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class;
pub mod error;
pub mod name;
pub mod traits;

pub use class::{AbcUnit, ClassInfo, InstanceFlags, InstanceInfo, NativeMetadata};
pub use error::{AbcError, AbcResult};
pub use name::{qualified_key, Multiname, Namespace, NamespaceKind};
pub use traits::{ConstValue, MethodFlags, MethodInfo, Trait, TraitKind};
