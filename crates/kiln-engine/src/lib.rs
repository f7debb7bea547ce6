//! Kiln Engine
//!
//! Links loaded class descriptors into runtime classes:
//! - **Native registry**: process-wide table of host class definitions
//! - **Class builder**: `create_class`, which wires templates, constructors
//!   and binding tables
//! - **Verifier**: reports native traits without a host implementation and
//!   broken structural invariants
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_engine::{create_class, initialize_native_registry, ApplicationDomain};
//!
//! let domain = ApplicationDomain::default();
//! initialize_native_registry(&domain);
//!
//! let object = create_class(&domain, &object_info, None, domain.global_scope())?;
//! let foo = create_class(&domain, &foo_info, Some(&object), domain.global_scope())?;
//! let instance = foo.construct(&[])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod vm;

pub use vm::{
    create_class, initialize_native_registry, lookup_native_class, register_native_class,
    verify_class, ApplicationDomain, Binding, Bindings, CallableStyle, Class, ClassBuilder,
    ClassKind, Coercion, ConstructionStrategy, Diagnostic, DiagnosticKind, Function, FunctionRef,
    LinkerOptions, NativeClassDef, ObjectRef, Scope, ScriptObject, Value, VmError, VmResult,
};
