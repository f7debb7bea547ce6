//! Method and trait descriptors

use std::fmt;
use std::sync::Arc;

use crate::name::Multiname;

/// Method descriptor flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodFlags(u8);

impl MethodFlags {
    /// No flags
    pub const NONE: MethodFlags = MethodFlags(0x00);
    /// Method uses the `arguments` object
    pub const NEED_ARGUMENTS: MethodFlags = MethodFlags(0x01);
    /// Method activation object is needed
    pub const NEED_ACTIVATION: MethodFlags = MethodFlags(0x02);
    /// Method takes a rest parameter
    pub const NEED_REST: MethodFlags = MethodFlags(0x04);
    /// Method has optional parameters
    pub const HAS_OPTIONAL: MethodFlags = MethodFlags(0x08);
    /// Method body is supplied by the host
    pub const NATIVE: MethodFlags = MethodFlags(0x20);

    /// Raw flag bits
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Create flags from raw bits
    pub fn from_bits(bits: u8) -> Self {
        MethodFlags(bits)
    }

    /// Whether every flag in `other` is set
    pub fn contains(self, other: MethodFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for MethodFlags {
    type Output = MethodFlags;

    fn bitor(self, rhs: MethodFlags) -> MethodFlags {
        MethodFlags(self.0 | rhs.0)
    }
}

/// Method descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    /// Method index within its bytecode unit
    pub index: u32,
    /// Debug name, if present
    pub name: Option<String>,
    /// Declared parameter count
    pub param_count: u32,
    /// Method flags
    pub flags: MethodFlags,
}

impl MethodInfo {
    /// Create a bytecode method
    pub fn new(index: u32, name: Option<&str>, param_count: u32) -> Self {
        Self {
            index,
            name: name.map(str::to_string),
            param_count,
            flags: MethodFlags::NONE,
        }
    }

    /// Create a method whose body is supplied by the host
    pub fn native(index: u32, name: Option<&str>, param_count: u32) -> Self {
        Self {
            flags: MethodFlags::NATIVE,
            ..Self::new(index, name, param_count)
        }
    }

    /// Whether the method body is supplied by the host
    pub fn is_native(&self) -> bool {
        self.flags.contains(MethodFlags::NATIVE)
    }
}

/// Constant default value of a slot trait
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean constant
    Bool(bool),
    /// Signed integer constant
    Int(i32),
    /// Unsigned integer constant
    UInt(u32),
    /// Double constant
    Double(f64),
    /// String constant
    String(String),
}

/// Trait kind with kind-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum TraitKind {
    /// Plain method
    Method {
        /// Method descriptor
        method: Arc<MethodInfo>,
    },
    /// Getter accessor
    Getter {
        /// Method descriptor
        method: Arc<MethodInfo>,
    },
    /// Setter accessor
    Setter {
        /// Method descriptor
        method: Arc<MethodInfo>,
    },
    /// Data slot (var or const)
    Slot {
        /// Slot index (0 means "assign automatically")
        slot_id: u32,
        /// Declared type name, `None` for `*`
        type_name: Option<Multiname>,
        /// Constant initial value
        default: Option<ConstValue>,
        /// Declared with `const`
        is_const: bool,
    },
}

/// A declared class or instance member
#[derive(Debug, Clone, PartialEq)]
pub struct Trait {
    /// Qualified member name
    pub name: Multiname,
    /// Kind and payload
    pub kind: TraitKind,
}

impl Trait {
    /// Create a method trait
    pub fn method(name: Multiname, method: MethodInfo) -> Self {
        Self {
            name,
            kind: TraitKind::Method {
                method: Arc::new(method),
            },
        }
    }

    /// Create a getter trait
    pub fn getter(name: Multiname, method: MethodInfo) -> Self {
        Self {
            name,
            kind: TraitKind::Getter {
                method: Arc::new(method),
            },
        }
    }

    /// Create a setter trait
    pub fn setter(name: Multiname, method: MethodInfo) -> Self {
        Self {
            name,
            kind: TraitKind::Setter {
                method: Arc::new(method),
            },
        }
    }

    /// Create an untyped `var` slot
    pub fn slot(name: Multiname, slot_id: u32, default: Option<ConstValue>) -> Self {
        Self {
            name,
            kind: TraitKind::Slot {
                slot_id,
                type_name: None,
                default,
                is_const: false,
            },
        }
    }

    /// Method descriptor backing a method or accessor trait
    pub fn method_info(&self) -> Option<&Arc<MethodInfo>> {
        match &self.kind {
            TraitKind::Method { method }
            | TraitKind::Getter { method }
            | TraitKind::Setter { method } => Some(method),
            TraitKind::Slot { .. } => None,
        }
    }

    /// Whether the host must supply this member
    pub fn is_native(&self) -> bool {
        self.method_info().map_or(false, |m| m.is_native())
    }

    /// Whether this is a method, getter or setter
    pub fn is_method_or_accessor(&self) -> bool {
        !matches!(self.kind, TraitKind::Slot { .. })
    }

    /// Lowercase kind label used in messages
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            TraitKind::Method { .. } => "method",
            TraitKind::Getter { .. } => "getter",
            TraitKind::Setter { .. } => "setter",
            TraitKind::Slot { .. } => "slot",
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let native = if self.is_native() { "native " } else { "" };
        write!(f, "{}{} {}", native, self.kind_label(), self.name)
    }
}
