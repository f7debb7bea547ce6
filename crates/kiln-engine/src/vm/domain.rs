//! Application domains
//!
//! A domain is the linking context for a set of classes: it carries the
//! linker options, the function synthesizer, the table of linked classes,
//! the diagnostics sink and the well-known `Object` / `Class` classes.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::vm::class::{Class, ClassKind};
use crate::vm::diagnostics::DiagnosticSink;
use crate::vm::object::{ObjectRef, ScriptObject};
use crate::vm::options::LinkerOptions;
use crate::vm::scope::Scope;
use crate::vm::synthesizer::{FunctionSynthesizer, InertSynthesizer};

static NEXT_DOMAIN_ID: AtomicU64 = AtomicU64::new(1);

/// Linked classes of a domain
#[derive(Debug, Default)]
pub struct ClassRegistry {
    /// Classes in link order
    classes: Vec<Arc<Class>>,
    /// Qualified class name to index
    name_to_index: FxHashMap<String, usize>,
}

impl ClassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a linked class; a later class with the same name shadows earlier ones
    pub fn register_class(&mut self, class: Arc<Class>) -> usize {
        let index = self.classes.len();
        self.name_to_index
            .insert(class.info().name().qualified_key(), index);
        self.classes.push(class);
        index
    }

    /// Get class by link index
    pub fn get(&self, index: usize) -> Option<&Arc<Class>> {
        self.classes.get(index)
    }

    /// Get class by qualified name
    pub fn get_class_by_name(&self, key: &str) -> Option<&Arc<Class>> {
        self.name_to_index
            .get(key)
            .and_then(|index| self.classes.get(*index))
    }

    /// Number of linked classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no class is linked
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate over classes in link order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Class>> {
        self.classes.iter()
    }
}

/// Counters updated when binding tables are applied
#[derive(Debug, Default)]
pub struct BindingStats {
    tables_applied: AtomicUsize,
    members_applied: AtomicUsize,
    stubs_created: AtomicUsize,
}

impl BindingStats {
    pub(crate) fn record_table(&self, members: usize) {
        self.tables_applied.fetch_add(1, Ordering::Relaxed);
        self.members_applied.fetch_add(members, Ordering::Relaxed);
    }

    pub(crate) fn record_stub(&self) {
        self.stubs_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Binding tables applied to an object
    pub fn tables_applied(&self) -> usize {
        self.tables_applied.load(Ordering::Relaxed)
    }

    /// Members defined by applied tables
    pub fn members_applied(&self) -> usize {
        self.members_applied.load(Ordering::Relaxed)
    }

    /// Unresolved native stubs planted
    pub fn stubs_created(&self) -> usize {
        self.stubs_created.load(Ordering::Relaxed)
    }
}

/// Linking context for a set of classes
pub struct ApplicationDomain {
    id: u64,
    options: LinkerOptions,
    synthesizer: Arc<dyn FunctionSynthesizer>,
    classes: RwLock<ClassRegistry>,
    diagnostics: DiagnosticSink,
    global: ObjectRef,
    global_scope: Arc<Scope>,
    object_class: OnceCell<Arc<Class>>,
    class_class: OnceCell<Arc<Class>>,
    stats: BindingStats,
}

impl ApplicationDomain {
    /// Domain with the inert synthesizer
    pub fn new(options: LinkerOptions) -> Self {
        Self::with_synthesizer(options, Arc::new(InertSynthesizer))
    }

    /// Domain with a custom synthesizer
    pub fn with_synthesizer(
        options: LinkerOptions,
        synthesizer: Arc<dyn FunctionSynthesizer>,
    ) -> Self {
        let global = ScriptObject::new();
        Self {
            id: NEXT_DOMAIN_ID.fetch_add(1, Ordering::Relaxed),
            options,
            synthesizer,
            classes: RwLock::new(ClassRegistry::new()),
            diagnostics: DiagnosticSink::new(),
            global_scope: Scope::global(global.clone()),
            global,
            object_class: OnceCell::new(),
            class_class: OnceCell::new(),
            stats: BindingStats::default(),
        }
    }

    /// Unique domain ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Linker options
    pub fn options(&self) -> &LinkerOptions {
        &self.options
    }

    /// Function synthesizer
    pub fn synthesizer(&self) -> &Arc<dyn FunctionSynthesizer> {
        &self.synthesizer
    }

    /// Diagnostics collected while linking
    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.diagnostics
    }

    /// Binding counters
    pub fn stats(&self) -> &BindingStats {
        &self.stats
    }

    /// Global object
    pub fn global(&self) -> &ObjectRef {
        &self.global
    }

    /// Outermost scope, whose object is the global object
    pub fn global_scope(&self) -> &Arc<Scope> {
        &self.global_scope
    }

    /// Record a linked class and remember the well-known ones
    pub fn register_class(&self, class: &Arc<Class>) {
        match class.kind() {
            ClassKind::RootObject => {
                let _ = self.object_class.set(class.clone());
            }
            ClassKind::ClassOfClasses => {
                let _ = self.class_class.set(class.clone());
            }
            ClassKind::Ordinary => {}
        }
        self.classes.write().register_class(class.clone());
    }

    /// Linked class by qualified name
    pub fn class_by_name(&self, key: &str) -> Option<Arc<Class>> {
        self.classes.read().get_class_by_name(key).cloned()
    }

    /// Every linked class, in link order
    pub fn classes(&self) -> Vec<Arc<Class>> {
        self.classes.read().iter().cloned().collect()
    }

    /// Number of linked classes
    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }

    /// The root `Object` class, once linked
    pub fn object_class(&self) -> Option<&Arc<Class>> {
        self.object_class.get()
    }

    /// The class of classes, once linked
    pub fn class_class(&self) -> Option<&Arc<Class>> {
        self.class_class.get()
    }
}

impl Default for ApplicationDomain {
    fn default() -> Self {
        Self::new(LinkerOptions::default())
    }
}

impl std::fmt::Debug for ApplicationDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationDomain")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("classes", &self.class_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_abc::{AbcUnit, ClassInfo, InstanceInfo, MethodInfo, Multiname, Namespace};

    fn bytecode_class(name: Multiname) -> Arc<Class> {
        let instance = InstanceInfo::new(name, None, MethodInfo::new(0, None, 0));
        Class::bytecode(Arc::new(ClassInfo::new(
            0,
            Arc::new(AbcUnit::new("test.abc")),
            instance,
            MethodInfo::new(1, None, 0),
        )))
    }

    #[test]
    fn test_register_and_find_by_qualified_name() {
        let domain = ApplicationDomain::default();
        let point = bytecode_class(Multiname::public("Point"));
        let hidden = bytecode_class(Multiname::new(Namespace::package("geom"), "Point"));
        domain.register_class(&point);
        domain.register_class(&hidden);

        assert_eq!(domain.class_count(), 2);
        assert!(Arc::ptr_eq(&domain.class_by_name("Point").unwrap(), &point));
        let key = Multiname::new(Namespace::package("geom"), "Point").qualified_key();
        assert!(Arc::ptr_eq(&domain.class_by_name(&key).unwrap(), &hidden));
        assert!(domain.object_class().is_none());
    }

    #[test]
    fn test_domains_have_distinct_ids() {
        let a = ApplicationDomain::default();
        let b = ApplicationDomain::default();
        assert_ne!(a.id(), b.id());
        assert!(a.global_scope().parent().is_none());
    }
}
