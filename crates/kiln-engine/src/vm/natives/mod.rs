//! Native class definitions
//!
//! A `NativeClassDef` is an immutable description of a host-implemented
//! class: its constructor, its class-object members and the extra holders its
//! native traits may be resolved against. Definitions are never linked
//! themselves; `materialize` produces fresh objects for each class built from
//! them, so two domains never share host state.

pub mod builtins;

use std::sync::Arc;

use crate::vm::class::{CallableStyle, InitializationFlags};
use crate::vm::coerce::Coercion;
use crate::vm::function::{native_fn, Function, FunctionRef, NativeFn};
use crate::vm::object::{ObjectRef, ScriptObject};
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Extra holders declared by a native class
#[derive(Debug, Clone)]
pub enum NativeHolders<T> {
    /// The class did not declare its own list and falls back to the root's
    Inherited,
    /// The class declared these holders (possibly none)
    Own(Vec<T>),
}

impl<T> NativeHolders<T> {
    /// Holders to search after the class's own object
    pub fn extras(&self) -> &[T] {
        match self {
            NativeHolders::Inherited => &[],
            NativeHolders::Own(holders) => holders,
        }
    }

    /// Whether the list was inherited
    pub fn is_inherited(&self) -> bool {
        matches!(self, NativeHolders::Inherited)
    }

    fn map<U>(&self, f: impl Fn(&T) -> U) -> NativeHolders<U> {
        match self {
            NativeHolders::Inherited => NativeHolders::Inherited,
            NativeHolders::Own(holders) => NativeHolders::Own(holders.iter().map(f).collect()),
        }
    }
}

/// Implementation of one holder member
#[derive(Clone)]
pub enum MemberImpl {
    /// Plain method
    Method {
        /// Declared parameter count
        arity: u32,
        /// Host function
        f: NativeFn,
    },
    /// Property getter
    Getter(NativeFn),
    /// Property setter
    Setter(NativeFn),
    /// Data property
    Value(Value),
}

/// Named holder member
#[derive(Clone)]
pub struct NativeMember {
    /// Name the member is declared under
    pub name: String,
    /// Implementation
    pub imp: MemberImpl,
}

/// Blueprint for an object holding native implementations
#[derive(Clone, Default)]
pub struct NativeHolderDef {
    label: String,
    members: Vec<NativeMember>,
}

impl NativeHolderDef {
    /// Empty holder
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            members: Vec::new(),
        }
    }

    fn push(mut self, name: &str, imp: MemberImpl) -> Self {
        self.members.push(NativeMember {
            name: name.to_string(),
            imp,
        });
        self
    }

    /// Add a method
    pub fn method(
        self,
        name: &str,
        arity: u32,
        f: impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.push(name, MemberImpl::Method { arity, f: native_fn(f) })
    }

    /// Add a getter
    pub fn getter(
        self,
        name: &str,
        f: impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.push(name, MemberImpl::Getter(native_fn(f)))
    }

    /// Add a setter
    pub fn setter(
        self,
        name: &str,
        f: impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.push(name, MemberImpl::Setter(native_fn(f)))
    }

    /// Add a data property
    pub fn value(self, name: &str, value: Value) -> Self {
        self.push(name, MemberImpl::Value(value))
    }

    /// Add a method that fails with `NotImplemented`
    pub fn unimplemented(self, name: &str, arity: u32) -> Self {
        let what = format!("{}.{}", self.label, name);
        self.method(name, arity, move |_, _| Err(VmError::NotImplemented(what.clone())))
    }

    /// Holder label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Declared members
    pub fn members(&self) -> &[NativeMember] {
        &self.members
    }

    /// Define every member on `target`
    pub fn install_into(&self, target: &ObjectRef) {
        for member in &self.members {
            let qualified = format!("{}.{}", self.label, member.name);
            match &member.imp {
                MemberImpl::Method { arity, f } => target.define_method(
                    &member.name,
                    Function::from_native_fn(&qualified, *arity, f.clone()),
                ),
                MemberImpl::Getter(f) => target.define_getter(
                    &member.name,
                    Function::from_native_fn(&format!("get {}", qualified), 0, f.clone()),
                ),
                MemberImpl::Setter(f) => target.define_setter(
                    &member.name,
                    Function::from_native_fn(&format!("set {}", qualified), 1, f.clone()),
                ),
                MemberImpl::Value(v) => target.define_value(&member.name, v.clone()),
            }
        }
    }

    /// Fresh object carrying every member
    pub fn instantiate(&self) -> ObjectRef {
        let obj = ScriptObject::new();
        self.install_into(&obj);
        obj
    }
}

/// Blueprint for a host constructor
#[derive(Clone)]
pub struct NativeConstructorDef {
    name: String,
    arity: u32,
    template_fixed: bool,
    call: NativeFn,
    construct: Option<NativeFn>,
    prototype: NativeHolderDef,
}

impl NativeConstructorDef {
    /// Constructor whose body runs with the new instance as receiver
    pub fn new(
        name: &str,
        arity: u32,
        call: impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            arity,
            template_fixed: false,
            call: native_fn(call),
            construct: None,
            prototype: NativeHolderDef::new(&format!("{}.prototype", name)),
        }
    }

    /// Mark the template as host-fixed
    pub fn fixed_template(mut self) -> Self {
        self.template_fixed = true;
        self
    }

    /// Run `f` instead of the body under `new`
    pub fn construct_with(
        mut self,
        f: impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.construct = Some(native_fn(f));
        self
    }

    /// Members of the constructor's template
    pub fn prototype(mut self, holder: NativeHolderDef) -> Self {
        self.prototype = holder;
        self
    }

    /// Constructor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the template is host-fixed
    pub fn is_template_fixed(&self) -> bool {
        self.template_fixed
    }

    fn materialize(&self) -> FunctionRef {
        Function::native_constructor(
            &self.name,
            self.arity,
            self.call.clone(),
            self.construct.clone(),
            self.prototype.instantiate(),
            !self.template_fixed,
        )
    }
}

/// Immutable definition of a host-implemented class
#[derive(Clone)]
pub struct NativeClassDef {
    id: String,
    statics: NativeHolderDef,
    constructor: Option<NativeConstructorDef>,
    static_natives: NativeHolders<Arc<NativeHolderDef>>,
    instance_natives: NativeHolders<Arc<NativeHolderDef>>,
    callable_style: CallableStyle,
    coercion: Coercion,
    default_value: Value,
    initialization_flags: InitializationFlags,
}

impl NativeClassDef {
    /// Definition with no members that declares empty holder lists
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            statics: NativeHolderDef::new(id),
            constructor: None,
            static_natives: NativeHolders::Own(Vec::new()),
            instance_natives: NativeHolders::Own(Vec::new()),
            callable_style: CallableStyle::PassThrough,
            coercion: Coercion::Instance,
            default_value: Value::Null,
            initialization_flags: InitializationFlags::NONE,
        }
    }

    /// Host constructor
    pub fn constructor(mut self, ctor: NativeConstructorDef) -> Self {
        self.constructor = Some(ctor);
        self
    }

    /// Members of the class object
    pub fn statics(mut self, holder: NativeHolderDef) -> Self {
        self.statics = holder;
        self
    }

    /// Extra holders for static native traits
    pub fn static_natives(mut self, holders: Vec<Arc<NativeHolderDef>>) -> Self {
        self.static_natives = NativeHolders::Own(holders);
        self
    }

    /// Extra holders for instance native traits
    pub fn instance_natives(mut self, holders: Vec<Arc<NativeHolderDef>>) -> Self {
        self.instance_natives = NativeHolders::Own(holders);
        self
    }

    /// Keep the root class's default holder lists
    pub fn inherit_natives(mut self) -> Self {
        self.static_natives = NativeHolders::Inherited;
        self.instance_natives = NativeHolders::Inherited;
        self
    }

    /// Calling the class coerces with `coercion`
    pub fn coerce_with(mut self, coercion: Coercion) -> Self {
        self.callable_style = CallableStyle::Coerce;
        self.coercion = coercion;
        self
    }

    /// Coercion used by `coerce`, leaving the call style untouched
    pub fn coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    /// Initial value of slots typed with this class
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = value;
        self
    }

    /// Native initialization flags
    pub fn initialization_flags(mut self, flags: InitializationFlags) -> Self {
        self.initialization_flags = flags;
        self
    }

    /// Native class identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Host constructor blueprint
    pub fn constructor_def(&self) -> Option<&NativeConstructorDef> {
        self.constructor.as_ref()
    }

    /// Fresh runtime parts for one class
    pub fn materialize(&self) -> NativeParts {
        NativeParts {
            class_object: self.statics.instantiate(),
            constructor: self.constructor.as_ref().map(NativeConstructorDef::materialize),
            static_natives: self.static_natives.map(|h| h.instantiate()),
            instance_natives: self.instance_natives.map(|h| h.instantiate()),
            callable_style: self.callable_style,
            coercion: self.coercion,
            default_value: self.default_value.clone(),
            initialization_flags: self.initialization_flags,
        }
    }
}

impl std::fmt::Debug for NativeClassDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeClassDef")
            .field("id", &self.id)
            .field(
                "constructor",
                &self.constructor.as_ref().map(NativeConstructorDef::name),
            )
            .field("callable_style", &self.callable_style)
            .finish()
    }
}

/// Objects materialized from a `NativeClassDef`
pub struct NativeParts {
    /// Class object with the static members installed
    pub class_object: ObjectRef,
    /// Host constructor, with its template
    pub constructor: Option<FunctionRef>,
    /// Extra static holders
    pub static_natives: NativeHolders<ObjectRef>,
    /// Extra instance holders
    pub instance_natives: NativeHolders<ObjectRef>,
    /// Call behavior
    pub callable_style: CallableStyle,
    /// Coercion
    pub coercion: Coercion,
    /// Slot default
    pub default_value: Value,
    /// Native initialization flags
    pub initialization_flags: InitializationFlags,
}

impl NativeParts {
    /// Parts of a class with no host members
    pub fn empty() -> Self {
        Self {
            class_object: ScriptObject::new(),
            constructor: None,
            static_natives: NativeHolders::Own(Vec::new()),
            instance_natives: NativeHolders::Own(Vec::new()),
            callable_style: CallableStyle::PassThrough,
            coercion: Coercion::Instance,
            default_value: Value::Null,
            initialization_flags: InitializationFlags::NONE,
        }
    }
}
