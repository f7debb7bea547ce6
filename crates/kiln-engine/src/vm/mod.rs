//! Kiln class linker runtime
//!
//! This module provides the runtime side of class linking:
//! - Object model (objects, functions, scopes, values)
//! - Native class registry and builtin definitions
//! - Class objects, binding tables and the class builder
//! - Verification and diagnostics

pub mod bindings;
pub mod builder;
pub mod class;
pub mod coerce;
pub mod diagnostics;
pub mod domain;
pub mod function;
pub mod native_registry;
pub mod natives;
pub mod object;
pub mod options;
pub mod resolver;
pub mod scope;
pub mod synthesizer;
pub mod value;
pub mod verify;

pub use bindings::{ApplyMode, Binding, BindingEntry, BindingKind, Bindings};
pub use builder::{create_class, ClassBuilder};
pub use class::{CallableStyle, Class, ClassKind, ConstructionStrategy, InitializationFlags};
pub use coerce::Coercion;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity, TraitSet};
pub use domain::{ApplicationDomain, BindingStats, ClassRegistry};
pub use function::{native_fn, Function, FunctionBody, FunctionRef, NativeFn};
pub use native_registry::{
    initialize_native_registry, lookup_native_class, register_native_class, NativeRegistry,
};
pub use natives::{
    NativeClassDef, NativeConstructorDef, NativeHolderDef, NativeHolders, NativeMember,
    NativeParts,
};
pub use object::{ObjectRef, Property, ScriptObject};
pub use options::LinkerOptions;
pub use resolver::{escape_native_name, has_binding, resolve_binding};
pub use scope::{Scope, ScopeObject};
pub use synthesizer::{FunctionSynthesizer, InertSynthesizer};
pub use value::Value;
pub use verify::{verify_class, VerifyReport};

/// Class linking errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VmError {
    /// A descriptor names a native class that is not registered
    #[error("Missing native class: {0}")]
    MissingNativeClass(String),

    /// A native class identifier is registered twice
    #[error("Duplicate native class: {0}")]
    DuplicateNativeClass(String),

    /// An internal construction invariant was broken
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Coercion or receiver type error
    #[error("Type error: {0}")]
    TypeError(String),

    /// A native trait without a host implementation was invoked
    #[error("Unresolved native {trait_name} in class {class_name}")]
    UnresolvedNative {
        /// Trait description
        trait_name: String,
        /// Owning class
        class_name: String,
    },

    /// A host member exists but has no implementation in this runtime
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// The value cannot be used with `new`
    #[error("Not a constructor: {0}")]
    NotConstructible(String),

    /// The class descriptor itself is malformed
    #[error("Invalid class descriptor: {0}")]
    Descriptor(#[from] kiln_abc::AbcError),
}

/// Class linking result
pub type VmResult<T> = Result<T, VmError>;
