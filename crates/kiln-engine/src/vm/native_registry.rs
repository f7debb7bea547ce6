//! Native class registry
//!
//! Process-wide table mapping native class identifiers to their definitions.
//! Builtin definitions are installed once by `initialize_native_registry`;
//! embedders add their own through `register_native_class`. Lookups consult
//! the builtin table first, then the extension table.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::vm::domain::ApplicationDomain;
use crate::vm::natives::{builtins, NativeClassDef};
use crate::vm::{VmError, VmResult};

static NATIVE_REGISTRY: Lazy<RwLock<NativeRegistry>> =
    Lazy::new(|| RwLock::new(NativeRegistry::new()));

/// Table of native class definitions
#[derive(Debug, Default)]
pub struct NativeRegistry {
    builtins: FxHashMap<String, Arc<NativeClassDef>>,
    extensions: FxHashMap<String, Arc<NativeClassDef>>,
    initialized: bool,
}

impl NativeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the builtin table.
    ///
    /// Returns `false` when the table was already installed.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        for def in builtins::builtin_classes() {
            self.builtins.insert(def.id().to_string(), Arc::new(def));
        }
        self.initialized = true;
        true
    }

    /// Whether the builtin table is installed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Find a definition, builtins first
    pub fn lookup(&self, id: &str) -> Option<Arc<NativeClassDef>> {
        self.builtins
            .get(id)
            .or_else(|| self.extensions.get(id))
            .cloned()
    }

    /// Whether `id` is registered in either table
    pub fn contains(&self, id: &str) -> bool {
        self.builtins.contains_key(id) || self.extensions.contains_key(id)
    }

    /// Add an embedder-provided definition
    pub fn register_extension(&mut self, def: NativeClassDef) -> VmResult<()> {
        if self.contains(def.id()) {
            return Err(VmError::DuplicateNativeClass(def.id().to_string()));
        }
        self.extensions.insert(def.id().to_string(), Arc::new(def));
        Ok(())
    }

    /// Identifiers of the builtin table
    pub fn builtin_ids(&self) -> Vec<&str> {
        self.builtins.keys().map(String::as_str).collect()
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.builtins.len() + self.extensions.len()
    }

    /// Check if no definitions are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every definition and return to the uninitialized state
    #[cfg(test)]
    fn teardown(&mut self) {
        self.builtins.clear();
        self.extensions.clear();
        self.initialized = false;
    }
}

/// Install the builtin native classes. Idempotent.
pub fn initialize_native_registry(domain: &ApplicationDomain) {
    if NATIVE_REGISTRY.write().initialize() {
        log::debug!(
            target: "kiln::natives",
            "installed builtin native classes (domain #{})",
            domain.id()
        );
    }
}

/// Register an embedder-provided native class
pub fn register_native_class(def: NativeClassDef) -> VmResult<()> {
    let id = def.id().to_string();
    NATIVE_REGISTRY.write().register_extension(def)?;
    log::debug!(target: "kiln::natives", "registered native class {}", id);
    Ok(())
}

/// Find a native class definition by identifier
pub fn lookup_native_class(id: &str) -> Option<Arc<NativeClassDef>> {
    NATIVE_REGISTRY.read().lookup(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::value::Value;

    #[test]
    fn test_initialize_is_idempotent() {
        let mut registry = NativeRegistry::new();
        assert!(registry.initialize());
        let count = registry.len();
        assert!(!registry.initialize());
        assert_eq!(registry.len(), count);
        assert!(registry.lookup(builtins::OBJECT_CLASS_ID).is_some());
    }

    #[test]
    fn test_builtins_shadow_extensions() {
        let mut registry = NativeRegistry::new();
        registry
            .register_extension(NativeClassDef::new("ObjectClass").default_value(Value::Int(1)))
            .unwrap();
        registry.initialize();
        let found = registry.lookup("ObjectClass").unwrap();
        assert!(found.constructor_def().is_some());
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        let mut registry = NativeRegistry::new();
        registry.initialize();
        assert_eq!(
            registry.register_extension(NativeClassDef::new("intClass")),
            Err(VmError::DuplicateNativeClass("intClass".to_string()))
        );
        registry.register_extension(NativeClassDef::new("FooClass")).unwrap();
        assert!(registry
            .register_extension(NativeClassDef::new("FooClass"))
            .is_err());
    }

    #[test]
    fn test_teardown_resets() {
        let mut registry = NativeRegistry::new();
        registry.initialize();
        registry.teardown();
        assert!(!registry.is_initialized());
        assert!(registry.is_empty());
        assert!(registry.initialize());
    }

    #[test]
    fn test_missing_lookup() {
        let registry = NativeRegistry::new();
        assert!(registry.lookup("NoSuchClass").is_none());
    }
}
