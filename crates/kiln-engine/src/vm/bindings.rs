//! Binding tables
//!
//! A `Bindings` table maps each declared trait of one trait set to its
//! runtime member: a host function for native traits, a synthesized callable
//! for bytecode methods and accessors, or a slot with its initial value.
//! Instance tables chain to the base class's table: lookups and `apply_to`
//! see inherited members, with a class's own entries shadowing its base's.

use kiln_abc::{ConstValue, MethodInfo, Multiname, Trait, TraitKind};
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::vm::diagnostics::TraitSet;
use crate::vm::domain::ApplicationDomain;
use crate::vm::function::{Function, FunctionRef};
use crate::vm::object::ObjectRef;
use crate::vm::resolver::resolve_binding;
use crate::vm::scope::Scope;
use crate::vm::value::Value;

/// Kind of a binding, used as half of the lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Method
    Method,
    /// Getter
    Getter,
    /// Setter
    Setter,
    /// Data slot
    Slot,
}

impl From<&TraitKind> for BindingKind {
    fn from(kind: &TraitKind) -> Self {
        match kind {
            TraitKind::Method { .. } => BindingKind::Method,
            TraitKind::Getter { .. } => BindingKind::Getter,
            TraitKind::Setter { .. } => BindingKind::Setter,
            TraitKind::Slot { .. } => BindingKind::Slot,
        }
    }
}

/// Runtime member bound to a trait
#[derive(Debug, Clone)]
pub enum Binding {
    /// Method implementation
    Method(FunctionRef),
    /// Getter implementation
    Getter(FunctionRef),
    /// Setter implementation
    Setter(FunctionRef),
    /// Data slot
    Slot {
        /// Slot index
        slot_id: u32,
        /// Initial value
        default: Value,
        /// Declared `const`
        is_const: bool,
    },
}

impl Binding {
    /// Kind of this binding
    pub fn kind(&self) -> BindingKind {
        match self {
            Binding::Method(_) => BindingKind::Method,
            Binding::Getter(_) => BindingKind::Getter,
            Binding::Setter(_) => BindingKind::Setter,
            Binding::Slot { .. } => BindingKind::Slot,
        }
    }

    /// Function behind a method or accessor binding
    pub fn function(&self) -> Option<&FunctionRef> {
        match self {
            Binding::Method(f) | Binding::Getter(f) | Binding::Setter(f) => Some(f),
            Binding::Slot { .. } => None,
        }
    }
}

/// One bound trait
#[derive(Debug, Clone)]
pub struct BindingEntry {
    /// Property key the member is installed under
    pub key: String,
    /// Declared trait name
    pub name: Multiname,
    /// Runtime member
    pub binding: Binding,
    /// Declared native
    pub native: bool,
    /// A same-kind member with this key exists in the parent table
    pub overrides: bool,
}

/// How `apply_to` treats members already present on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Overwrite existing own members
    Replace,
    /// Keep existing own members
    Append,
}

/// Binding table for one trait set of one class
#[derive(Debug)]
pub struct Bindings {
    set: TraitSet,
    class_name: String,
    parent: Option<Arc<Bindings>>,
    entries: Vec<BindingEntry>,
    index: FxHashMap<(String, BindingKind), usize>,
    slot_count: u32,
}

impl Bindings {
    /// Bind `traits` of `class_name`.
    ///
    /// Native traits resolve against `holders`; a trait no holder implements
    /// is bound to a stub that fails when called. The verifier reports the
    /// missing implementation, so nothing is emitted here.
    pub fn build(
        domain: &ApplicationDomain,
        set: TraitSet,
        class_name: &str,
        traits: &[Trait],
        scope: &Arc<Scope>,
        holders: &[ObjectRef],
        parent: Option<Arc<Bindings>>,
    ) -> Self {
        let mut bindings = Self {
            set,
            class_name: class_name.to_string(),
            slot_count: parent.as_ref().map_or(0, |p| p.slot_count),
            parent,
            entries: Vec::with_capacity(traits.len()),
            index: FxHashMap::default(),
        };
        for t in traits {
            let binding = bindings.bind_trait(domain, t, scope, holders);
            bindings.push(t, binding);
        }
        bindings
    }

    fn bind_trait(
        &mut self,
        domain: &ApplicationDomain,
        t: &Trait,
        scope: &Arc<Scope>,
        holders: &[ObjectRef],
    ) -> Binding {
        let function = |method: &Arc<MethodInfo>| {
            if t.is_native() {
                resolve_binding(t, holders).unwrap_or_else(|| {
                    log::debug!(
                        target: "kiln::link",
                        "binding stub for {} {} in {}",
                        self.set,
                        t,
                        self.class_name
                    );
                    domain.stats().record_stub();
                    Function::unresolved(&t.name.to_string(), &self.class_name)
                })
            } else {
                domain.synthesizer().synthesize(method, scope, false)
            }
        };
        match &t.kind {
            TraitKind::Method { method } => Binding::Method(function(method)),
            TraitKind::Getter { method } => Binding::Getter(function(method)),
            TraitKind::Setter { method } => Binding::Setter(function(method)),
            TraitKind::Slot {
                slot_id,
                type_name,
                default,
                is_const,
            } => {
                let slot_id = if *slot_id == 0 {
                    self.slot_count + 1
                } else {
                    *slot_id
                };
                self.slot_count = self.slot_count.max(slot_id);
                Binding::Slot {
                    slot_id,
                    default: slot_default(domain, type_name.as_ref(), default.as_ref()),
                    is_const: *is_const,
                }
            }
        }
    }

    fn push(&mut self, t: &Trait, binding: Binding) {
        let key = t.name.qualified_key();
        let kind = binding.kind();
        let overrides = self
            .parent
            .as_ref()
            .map_or(false, |p| p.lookup(&key, kind).is_some());
        let entry = BindingEntry {
            key: key.clone(),
            name: t.name.clone(),
            binding,
            native: t.is_native(),
            overrides,
        };
        match self.index.get(&(key.clone(), kind)) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert((key, kind), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Find a binding here or in a parent table
    pub fn lookup(&self, key: &str, kind: BindingKind) -> Option<&Binding> {
        self.lookup_own(key, kind)
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(key, kind)))
    }

    /// Find a binding declared by this table
    pub fn lookup_own(&self, key: &str, kind: BindingKind) -> Option<&Binding> {
        self.index
            .get(&(key.to_string(), kind))
            .map(|&i| &self.entries[i].binding)
    }

    /// Entries declared by this table, in declaration order
    pub fn entries(&self) -> &[BindingEntry] {
        &self.entries
    }

    /// Entries bound to unresolved native stubs
    pub fn unresolved(&self) -> impl Iterator<Item = &BindingEntry> {
        self.entries.iter().filter(|e| {
            e.binding
                .function()
                .map_or(false, |f| f.is_unresolved())
        })
    }

    /// Parent table
    pub fn parent(&self) -> Option<&Arc<Bindings>> {
        self.parent.as_ref()
    }

    /// Static or instance
    pub fn set(&self) -> TraitSet {
        self.set
    }

    /// Highest slot index in this table and its parents
    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    /// Number of own entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table declares nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of this table and its parents, own entries shadowing inherited ones
    pub fn flattened(&self) -> Vec<&BindingEntry> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'s>(&'s self, out: &mut Vec<&'s BindingEntry>) {
        if let Some(parent) = &self.parent {
            parent.collect_into(out);
        }
        for entry in &self.entries {
            let kind = entry.binding.kind();
            match out
                .iter_mut()
                .find(|e| e.key == entry.key && e.binding.kind() == kind)
            {
                Some(slot) => *slot = entry,
                None => out.push(entry),
            }
        }
    }

    /// Install every entry, inherited ones included, on `target`
    pub fn apply_to(&self, domain: &ApplicationDomain, target: &ObjectRef, mode: ApplyMode) {
        let existing: Vec<String> = match mode {
            ApplyMode::Replace => Vec::new(),
            ApplyMode::Append => target.own_keys(),
        };
        let mut applied = 0;
        for entry in self.flattened() {
            if existing.contains(&entry.key) {
                continue;
            }
            match &entry.binding {
                Binding::Method(f) => target.define_method(&entry.key, f.clone()),
                Binding::Getter(f) => target.define_getter(&entry.key, f.clone()),
                Binding::Setter(f) => target.define_setter(&entry.key, f.clone()),
                Binding::Slot { default, .. } => target.define_value(&entry.key, default.clone()),
            }
            applied += 1;
        }
        domain.stats().record_table(applied);
    }
}

/// Initial value of a slot
fn slot_default(
    domain: &ApplicationDomain,
    type_name: Option<&Multiname>,
    default: Option<&ConstValue>,
) -> Value {
    if let Some(value) = default {
        return match value {
            ConstValue::Undefined => Value::Undefined,
            ConstValue::Null => Value::Null,
            ConstValue::Bool(b) => Value::Bool(*b),
            ConstValue::Int(i) => Value::Int(*i),
            ConstValue::UInt(u) => Value::UInt(*u),
            ConstValue::Double(d) => Value::Number(*d),
            ConstValue::String(s) => Value::string(s),
        };
    }
    match type_name {
        None => Value::Undefined,
        Some(name) => domain
            .class_by_name(&name.qualified_key())
            .map_or(Value::Null, |class| class.default_value().clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::object::ScriptObject;

    fn scope() -> Arc<Scope> {
        Scope::global(ScriptObject::new())
    }

    fn method(name: &str) -> Trait {
        Trait::method(Multiname::public(name), MethodInfo::new(0, Some(name), 0))
    }

    fn native_method(name: &str) -> Trait {
        Trait::method(Multiname::public(name), MethodInfo::native(0, Some(name), 0))
    }

    #[test]
    fn test_native_resolves_against_holders() {
        let domain = ApplicationDomain::default();
        let holder = ScriptObject::new();
        let bar = Function::native("bar", 0, |_, _| Ok(Value::Int(7)));
        holder.define_method("bar", bar.clone());

        let table = Bindings::build(
            &domain,
            TraitSet::Instance,
            "Foo",
            &[native_method("bar")],
            &scope(),
            &[holder],
            None,
        );
        match table.lookup("bar", BindingKind::Method) {
            Some(Binding::Method(f)) => assert!(Arc::ptr_eq(f, &bar)),
            other => panic!("unexpected binding {:?}", other),
        }
        assert_eq!(table.unresolved().count(), 0);
    }

    #[test]
    fn test_missing_native_gets_stub() {
        let domain = ApplicationDomain::default();
        let table = Bindings::build(
            &domain,
            TraitSet::Instance,
            "Foo",
            &[native_method("bar")],
            &scope(),
            &[],
            None,
        );
        let stub = table.lookup("bar", BindingKind::Method).unwrap().function().unwrap();
        assert!(stub.is_unresolved());
        assert_eq!(table.unresolved().count(), 1);
        assert_eq!(domain.stats().stubs_created(), 1);
        assert!(domain.diagnostics().is_empty());
    }

    #[test]
    fn test_parent_chain_and_overrides() {
        let domain = ApplicationDomain::default();
        let base = Arc::new(Bindings::build(
            &domain,
            TraitSet::Instance,
            "Base",
            &[method("a"), Trait::slot(Multiname::public("x"), 0, None)],
            &scope(),
            &[],
            None,
        ));
        let derived = Bindings::build(
            &domain,
            TraitSet::Instance,
            "Derived",
            &[method("a"), Trait::slot(Multiname::public("y"), 0, None)],
            &scope(),
            &[],
            Some(base),
        );

        assert!(derived.entries()[0].overrides);
        assert!(derived.lookup("x", BindingKind::Slot).is_some());
        assert!(derived.lookup_own("x", BindingKind::Slot).is_none());
        match derived.lookup("y", BindingKind::Slot) {
            Some(Binding::Slot { slot_id, .. }) => assert_eq!(*slot_id, 2),
            other => panic!("unexpected binding {:?}", other),
        }
        assert_eq!(derived.slot_count(), 2);

        let flat = derived.flattened();
        assert_eq!(flat.len(), 3);
        assert!(flat.iter().any(|e| e.key == "a" && e.overrides));

        let target = ScriptObject::new();
        derived.apply_to(&domain, &target, ApplyMode::Replace);
        assert!(target.has_own_property("x"));
        assert!(target.has_own_property("y"));
    }

    #[test]
    fn test_apply_modes() {
        let domain = ApplicationDomain::default();
        let table = Bindings::build(
            &domain,
            TraitSet::Static,
            "Foo",
            &[method("a"), method("b")],
            &scope(),
            &[],
            None,
        );
        let target = ScriptObject::new();
        let own_a = Function::native("a", 0, |_, _| Ok(Value::Int(1)));
        target.define_method("a", own_a.clone());

        table.apply_to(&domain, &target, ApplyMode::Append);
        assert!(Arc::ptr_eq(&target.own_method("a").unwrap(), &own_a));
        assert!(target.has_own_method("b"));

        table.apply_to(&domain, &target, ApplyMode::Replace);
        assert!(!Arc::ptr_eq(&target.own_method("a").unwrap(), &own_a));
        assert_eq!(domain.stats().tables_applied(), 2);
        assert_eq!(domain.stats().members_applied(), 3);
    }

    #[test]
    fn test_accessor_pair_appends_together() {
        let domain = ApplicationDomain::default();
        let name = Multiname::public("size");
        let table = Bindings::build(
            &domain,
            TraitSet::Instance,
            "Foo",
            &[
                Trait::getter(name.clone(), MethodInfo::new(0, None, 0)),
                Trait::setter(name, MethodInfo::new(1, None, 1)),
            ],
            &scope(),
            &[],
            None,
        );
        let target = ScriptObject::new();
        table.apply_to(&domain, &target, ApplyMode::Append);
        assert!(target.has_own_getter("size"));
        assert!(target.has_own_setter("size"));
    }

    #[test]
    fn test_slot_defaults() {
        let domain = ApplicationDomain::default();
        let table = Bindings::build(
            &domain,
            TraitSet::Instance,
            "Foo",
            &[Trait::slot(Multiname::public("n"), 4, Some(ConstValue::Int(3)))],
            &scope(),
            &[],
            None,
        );
        match table.lookup("n", BindingKind::Slot) {
            Some(Binding::Slot {
                slot_id, default, ..
            }) => {
                assert_eq!(*slot_id, 4);
                assert_eq!(*default, Value::Int(3));
            }
            other => panic!("unexpected binding {:?}", other),
        }
    }
}
