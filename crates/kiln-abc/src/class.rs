//! Class and instance descriptors

use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{AbcError, AbcResult};
use crate::name::Multiname;
use crate::traits::{MethodInfo, Trait};

/// Instance flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceFlags {
    /// Class is sealed (no dynamic properties)
    pub sealed: bool,
    /// Class is final
    pub is_final: bool,
    /// Class is an interface
    pub interface: bool,
}

/// Owning bytecode unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbcUnit {
    /// Unit name (file or script name)
    pub name: String,
}

impl AbcUnit {
    /// Create a unit descriptor
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Native metadata attached to a class (`[native(cls="...")]`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMetadata {
    /// Native class identifier
    pub cls: String,
}

/// Per-object half of a class descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceInfo {
    /// Declared class name
    pub name: Multiname,
    /// Declared super class name (`None` for `Object`)
    pub super_name: Option<Multiname>,
    /// Instance flags
    pub flags: InstanceFlags,
    /// Implemented interfaces
    pub interfaces: Vec<Multiname>,
    /// Instance initializer (constructor body)
    pub init: Arc<MethodInfo>,
    /// Instance traits
    pub traits: Vec<Trait>,
}

impl InstanceInfo {
    /// Create an instance descriptor with no traits
    pub fn new(name: Multiname, super_name: Option<Multiname>, init: MethodInfo) -> Self {
        Self {
            name,
            super_name,
            flags: InstanceFlags::default(),
            interfaces: Vec::new(),
            init: Arc::new(init),
            traits: Vec::new(),
        }
    }
}

/// Class descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    /// Class index within its bytecode unit
    pub index: u32,
    /// Owning bytecode unit
    pub abc: Arc<AbcUnit>,
    /// Native metadata, `None` for pure bytecode classes
    pub native: Option<NativeMetadata>,
    /// Static initializer
    pub init: Arc<MethodInfo>,
    /// Static (class-level) traits
    pub traits: Vec<Trait>,
    /// Instance half
    pub instance: InstanceInfo,
}

impl ClassInfo {
    /// Create a pure bytecode class descriptor
    pub fn new(index: u32, abc: Arc<AbcUnit>, instance: InstanceInfo, init: MethodInfo) -> Self {
        Self {
            index,
            abc,
            native: None,
            init: Arc::new(init),
            traits: Vec::new(),
            instance,
        }
    }

    /// Attach native metadata
    pub fn with_native(mut self, cls: impl Into<String>) -> Self {
        self.native = Some(NativeMetadata { cls: cls.into() });
        self
    }

    /// Native class identifier, if any
    pub fn native_id(&self) -> Option<&str> {
        self.native.as_ref().map(|n| n.cls.as_str())
    }

    /// Declared class name
    pub fn name(&self) -> &Multiname {
        &self.instance.name
    }

    /// Check that trait sets and native metadata are consistent.
    ///
    /// A getter and a setter may share a name; any other repeated
    /// (name, kind) pair within one trait set is rejected.
    pub fn validate(&self) -> AbcResult<()> {
        if let Some(id) = self.native_id() {
            if id.is_empty() {
                return Err(AbcError::EmptyNativeIdentifier(self.to_string()));
            }
        }
        check_unique(&self.traits, &self.to_string())?;
        check_unique(&self.instance.traits, &self.to_string())
    }
}

fn check_unique(traits: &[Trait], owner: &str) -> AbcResult<()> {
    let mut seen = FxHashSet::default();
    for t in traits {
        if !seen.insert((t.name.qualified_key(), t.kind_label())) {
            return Err(AbcError::DuplicateTrait {
                name: t.name.to_string(),
                kind: t.kind_label(),
                owner: owner.to_string(),
            });
        }
    }
    Ok(())
}

impl fmt::Display for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instance.name)
    }
}
