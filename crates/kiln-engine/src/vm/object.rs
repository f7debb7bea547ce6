//! Object model: property tables and delegation
//!
//! Every runtime object is a property table with an optional delegation
//! parent. Templates (the trait template and the dynamic template of a class)
//! are ordinary objects; what makes them templates is that instances delegate
//! to them.
//!
//! Two relations are kept explicit:
//! - "delegates to": `proto`, a strong reference to a template that belongs to
//!   an already-built ancestor class (points strictly upward).
//! - "owned by": `owner`, a weak back-reference to the class that owns this
//!   template (or, for a class object, the class it represents).

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::vm::class::Class;
use crate::vm::function::FunctionRef;
use crate::vm::value::Value;
use crate::vm::VmResult;

/// Global counter for generating unique object IDs
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique object ID
fn generate_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Shared object reference
pub type ObjectRef = Arc<ScriptObject>;

/// An own property
#[derive(Debug, Clone)]
pub enum Property {
    /// Data property
    Data {
        /// Stored value
        value: Value,
        /// Visible to enumeration
        enumerable: bool,
    },
    /// Accessor property; either half may be missing
    Accessor {
        /// Getter
        getter: Option<FunctionRef>,
        /// Setter
        setter: Option<FunctionRef>,
    },
}

#[derive(Default)]
struct ObjectData {
    proto: Option<ObjectRef>,
    properties: FxHashMap<String, Property>,
    /// Insertion order of `properties`
    keys: Vec<String>,
    owner: Weak<Class>,
}

/// Heap object
pub struct ScriptObject {
    id: u64,
    data: RwLock<ObjectData>,
}

impl ScriptObject {
    /// Create an object with no delegation parent
    pub fn new() -> ObjectRef {
        Self::with_proto(None)
    }

    /// Create an object delegating to `proto`
    pub fn with_proto(proto: Option<ObjectRef>) -> ObjectRef {
        Arc::new(Self {
            id: generate_object_id(),
            data: RwLock::new(ObjectData {
                proto,
                ..Default::default()
            }),
        })
    }

    /// Unique object ID
    pub fn id(&self) -> u64 {
        self.id
    }

    // ========================================================================
    // Delegation
    // ========================================================================

    /// Delegation parent
    pub fn proto(&self) -> Option<ObjectRef> {
        self.data.read().proto.clone()
    }

    /// Replace the delegation parent
    pub fn set_proto(&self, proto: Option<ObjectRef>) {
        self.data.write().proto = proto;
    }

    /// Whether `parent` is the direct delegation parent
    pub fn delegates_to(&self, parent: &ObjectRef) -> bool {
        self.data
            .read()
            .proto
            .as_ref()
            .map_or(false, |p| Arc::ptr_eq(p, parent))
    }

    /// Whether `ancestor` appears anywhere on the delegation chain (excluding self)
    pub fn inherits_from(&self, ancestor: &ObjectRef) -> bool {
        let mut current = self.proto();
        while let Some(obj) = current {
            if Arc::ptr_eq(&obj, ancestor) {
                return true;
            }
            current = obj.proto();
        }
        false
    }

    /// Walk the delegation chain and report whether it terminates.
    pub fn delegation_chain_is_acyclic(&self) -> bool {
        let mut seen = FxHashSet::default();
        seen.insert(self.id);
        let mut current = self.proto();
        while let Some(obj) = current {
            if !seen.insert(obj.id) {
                return false;
            }
            current = obj.proto();
        }
        true
    }

    // ========================================================================
    // Ownership
    // ========================================================================

    /// Class that owns this object, if still alive
    pub fn owner_class(&self) -> Option<Arc<Class>> {
        self.data.read().owner.upgrade()
    }

    /// Record the owning class
    pub fn set_owner(&self, class: &Arc<Class>) {
        self.data.write().owner = Arc::downgrade(class);
    }

    // ========================================================================
    // Own properties
    // ========================================================================

    /// Copy of an own property
    pub fn get_own(&self, key: &str) -> Option<Property> {
        self.data.read().properties.get(key).cloned()
    }

    /// Whether an own property exists under `key`
    pub fn has_own_property(&self, key: &str) -> bool {
        self.data.read().properties.contains_key(key)
    }

    /// Own data property holding a function
    pub fn own_method(&self, key: &str) -> Option<FunctionRef> {
        match self.data.read().properties.get(key) {
            Some(Property::Data {
                value: Value::Function(f),
                ..
            }) => Some(f.clone()),
            _ => None,
        }
    }

    /// Getter half of an own accessor
    pub fn own_getter(&self, key: &str) -> Option<FunctionRef> {
        match self.data.read().properties.get(key) {
            Some(Property::Accessor { getter, .. }) => getter.clone(),
            _ => None,
        }
    }

    /// Setter half of an own accessor
    pub fn own_setter(&self, key: &str) -> Option<FunctionRef> {
        match self.data.read().properties.get(key) {
            Some(Property::Accessor { setter, .. }) => setter.clone(),
            _ => None,
        }
    }

    /// Whether an own method exists under `key`
    pub fn has_own_method(&self, key: &str) -> bool {
        self.own_method(key).is_some()
    }

    /// Whether an own getter exists under `key`
    pub fn has_own_getter(&self, key: &str) -> bool {
        self.own_getter(key).is_some()
    }

    /// Whether an own setter exists under `key`
    pub fn has_own_setter(&self, key: &str) -> bool {
        self.own_setter(key).is_some()
    }

    /// Own property keys in insertion order
    pub fn own_keys(&self) -> Vec<String> {
        self.data.read().keys.clone()
    }

    /// Whether the own property under `key` is enumerable
    pub fn is_enumerable(&self, key: &str) -> bool {
        matches!(
            self.data.read().properties.get(key),
            Some(Property::Data {
                enumerable: true,
                ..
            })
        )
    }

    /// Change enumerability of an own data property.
    ///
    /// Returns `false` when there is no such data property.
    pub fn set_enumerable(&self, key: &str, enumerable: bool) -> bool {
        match self.data.write().properties.get_mut(key) {
            Some(Property::Data { enumerable: e, .. }) => {
                *e = enumerable;
                true
            }
            _ => false,
        }
    }

    fn insert(&self, key: &str, property: Property) {
        let mut data = self.data.write();
        if data.properties.insert(key.to_string(), property).is_none() {
            data.keys.push(key.to_string());
        }
    }

    /// Define an enumerable data property
    pub fn define_value(&self, key: &str, value: Value) {
        self.insert(
            key,
            Property::Data {
                value,
                enumerable: true,
            },
        );
    }

    /// Define a non-enumerable method
    pub fn define_method(&self, key: &str, method: FunctionRef) {
        self.insert(
            key,
            Property::Data {
                value: Value::Function(method),
                enumerable: false,
            },
        );
    }

    /// Install a getter, keeping an existing setter under the same key
    pub fn define_getter(&self, key: &str, getter: FunctionRef) {
        let setter = self.own_setter(key);
        self.insert(
            key,
            Property::Accessor {
                getter: Some(getter),
                setter,
            },
        );
    }

    /// Install a setter, keeping an existing getter under the same key
    pub fn define_setter(&self, key: &str, setter: FunctionRef) {
        let getter = self.own_getter(key);
        self.insert(
            key,
            Property::Accessor {
                getter,
                setter: Some(setter),
            },
        );
    }

    /// Remove an own property
    pub fn delete_own(&self, key: &str) -> bool {
        let mut data = self.data.write();
        if data.properties.remove(key).is_some() {
            data.keys.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    // ========================================================================
    // Chain lookup
    // ========================================================================

    /// Find a property on this object or along its delegation chain
    pub fn lookup(&self, key: &str) -> Option<Property> {
        if let Some(p) = self.get_own(key) {
            return Some(p);
        }
        let mut current = self.proto();
        while let Some(obj) = current {
            if let Some(p) = obj.get_own(key) {
                return Some(p);
            }
            current = obj.proto();
        }
        None
    }

    /// Whether `key` resolves anywhere on the chain
    pub fn has_property(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Read a property, invoking a getter with `this` as receiver
    pub fn get(this: &ObjectRef, key: &str) -> VmResult<Value> {
        match this.lookup(key) {
            Some(Property::Data { value, .. }) => Ok(value),
            Some(Property::Accessor {
                getter: Some(getter),
                ..
            }) => getter.call(&Value::Object(this.clone()), &[]),
            Some(Property::Accessor { getter: None, .. }) | None => Ok(Value::Undefined),
        }
    }

    /// Write a property.
    ///
    /// An accessor found on the chain routes the write through its setter;
    /// otherwise the value lands as an own data property of `this`.
    pub fn set(this: &ObjectRef, key: &str, value: Value) -> VmResult<()> {
        if let Some(Property::Accessor { setter, .. }) = this.lookup(key) {
            if let Some(setter) = setter {
                setter.call(&Value::Object(this.clone()), &[value])?;
            }
            return Ok(());
        }
        let mut data = this.data.write();
        match data.properties.get_mut(key) {
            Some(Property::Data { value: v, .. }) => *v = value,
            _ => {
                data.properties.insert(
                    key.to_string(),
                    Property::Data {
                        value,
                        enumerable: true,
                    },
                );
                data.keys.push(key.to_string());
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.read();
        f.debug_struct("ScriptObject")
            .field("id", &self.id)
            .field("proto", &data.proto.as_ref().map(|p| p.id))
            .field("keys", &data.keys)
            .finish()
    }
}
