//! Runtime class objects
//!
//! A `Class` is the linked form of a class descriptor. It owns two templates:
//!
//! - the *instance template* (traits template), which receives the instance
//!   trait bindings and is the template of every constructed instance;
//! - the *instance delegate* (dynamic template), which is what bytecode sees
//!   as `C.prototype` and where dynamically added properties live.
//!
//! Classes whose host constructor has a fixed template take that template
//! over for both roles. All other classes build a fresh delegate chained to
//! the base class's delegate, and a trait template chained to the delegate,
//! so the two delegation chains stay parallel to the class hierarchy.
//!
//! Construction is two-phase: `Class::bytecode` / `Class::native` allocate the
//! object, `create` finalizes templates and the constructor exactly once.

use kiln_abc::ClassInfo;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashSet;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::vm::bindings::Bindings;
use crate::vm::coerce::Coercion;
use crate::vm::diagnostics::{Diagnostic, DiagnosticKind};
use crate::vm::domain::ApplicationDomain;
use crate::vm::function::FunctionRef;
use crate::vm::natives::{builtins, NativeHolders, NativeParts};
use crate::vm::object::{ObjectRef, ScriptObject};
use crate::vm::scope::Scope;
use crate::vm::value::Value;
use crate::vm::verify::VerifyReport;
use crate::vm::{VmError, VmResult};

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Role of a class in the bootstrap hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// The root `Object` class; the only class without a base
    RootObject,
    /// `Class`, the class of class objects
    ClassOfClasses,
    /// Every other class
    Ordinary,
}

/// How the class obtains its templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionStrategy {
    /// Adopt the host constructor's fixed template for both roles
    TakeoverTemplate,
    /// Build fresh templates chained to the base class
    BuildTemplate,
}

/// What calling the class object as a function does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableStyle {
    /// Calling runs the instance constructor
    PassThrough,
    /// Calling coerces the first argument to the class's value domain
    Coerce,
}

/// How native initializers run for instances of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitializationFlags(u8);

impl InitializationFlags {
    /// No native initializer
    pub const NONE: InitializationFlags = InitializationFlags(0x0);
    /// The class has its own native initializer
    pub const OWN_INITIALIZE: InitializationFlags = InitializationFlags(0x1);
    /// A base class has a native initializer
    pub const SUPER_INITIALIZE: InitializationFlags = InitializationFlags(0x2);

    /// Whether every flag in `other` is set
    pub fn contains(self, other: InitializationFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for InitializationFlags {
    type Output = InitializationFlags;

    fn bitor(self, rhs: InitializationFlags) -> InitializationFlags {
        InitializationFlags(self.0 | rhs.0)
    }
}

/// Linked runtime class
pub struct Class {
    id: u64,
    info: Arc<ClassInfo>,
    name: String,
    kind: ClassKind,
    native_id: Option<String>,
    /// The class as an object: static bindings and reflection members live here
    object: ObjectRef,
    callable_style: CallableStyle,
    coercion: Coercion,
    default_value: Value,
    initialization_flags: InitializationFlags,
    static_natives: NativeHolders<ObjectRef>,
    instance_natives: NativeHolders<ObjectRef>,

    base: OnceCell<Option<Arc<Class>>>,
    strategy: OnceCell<ConstructionStrategy>,
    instance_template: OnceCell<ObjectRef>,
    instance_delegate: OnceCell<ObjectRef>,
    constructor: OnceCell<FunctionRef>,
    constructor_no_init: OnceCell<FunctionRef>,
    native_static_holders: OnceCell<Vec<ObjectRef>>,
    native_instance_holders: OnceCell<Vec<ObjectRef>>,
    static_bindings: OnceCell<Arc<Bindings>>,
    instance_bindings: OnceCell<Arc<Bindings>>,
    scope: OnceCell<Arc<Scope>>,
    verification: OnceCell<VerifyReport>,
}

impl Class {
    fn alloc(
        info: Arc<ClassInfo>,
        native_id: Option<String>,
        object: ObjectRef,
        callable_style: CallableStyle,
        coercion: Coercion,
        default_value: Value,
    ) -> Self {
        let kind = match native_id.as_deref() {
            Some(builtins::OBJECT_CLASS_ID) => ClassKind::RootObject,
            Some(builtins::CLASS_CLASS_ID) => ClassKind::ClassOfClasses,
            _ => ClassKind::Ordinary,
        };
        Self {
            id: NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed),
            name: info.instance.name.to_string(),
            info,
            kind,
            native_id,
            object,
            callable_style,
            coercion,
            default_value,
            initialization_flags: InitializationFlags::NONE,
            static_natives: NativeHolders::Own(Vec::new()),
            instance_natives: NativeHolders::Own(Vec::new()),
            base: OnceCell::new(),
            strategy: OnceCell::new(),
            instance_template: OnceCell::new(),
            instance_delegate: OnceCell::new(),
            constructor: OnceCell::new(),
            constructor_no_init: OnceCell::new(),
            native_static_holders: OnceCell::new(),
            native_instance_holders: OnceCell::new(),
            static_bindings: OnceCell::new(),
            instance_bindings: OnceCell::new(),
            scope: OnceCell::new(),
            verification: OnceCell::new(),
        }
    }

    /// Allocate a class implemented purely by bytecode.
    ///
    /// Bytecode classes coerce when called and check instances when coercing.
    pub fn bytecode(info: Arc<ClassInfo>) -> Arc<Self> {
        let class = Arc::new(Self::alloc(
            info,
            None,
            ScriptObject::new(),
            CallableStyle::Coerce,
            Coercion::Instance,
            Value::Null,
        ));
        class.object.set_owner(&class);
        class
    }

    /// Allocate a class from the materialized parts of a native definition
    pub fn native(info: Arc<ClassInfo>, native_id: &str, parts: NativeParts) -> Arc<Self> {
        let mut class = Self::alloc(
            info,
            Some(native_id.to_string()),
            parts.class_object,
            parts.callable_style,
            parts.coercion,
            parts.default_value,
        );
        class.initialization_flags = parts.initialization_flags;
        class.static_natives = parts.static_natives;
        class.instance_natives = parts.instance_natives;
        if let Some(ctor) = parts.constructor {
            // A fresh cell cannot be occupied yet.
            let _ = class.constructor.set(ctor);
        }
        let class = Arc::new(class);
        class.object.set_owner(&class);
        class
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Wire the template chains for `base`.
    ///
    /// Called by `create`; records the base class and fails if the class was
    /// already configured or the base class has not been finalized. A failed
    /// call leaves the class unconfigured.
    pub fn configure(self: &Arc<Self>, base: Option<&Arc<Class>>) -> VmResult<()> {
        if self.base.get().is_some() {
            return Err(VmError::ContractViolation(format!(
                "{} is already configured",
                self.name
            )));
        }

        let fixed_template = self
            .constructor
            .get()
            .filter(|ctor| !ctor.is_template_writable())
            .map(|ctor| {
                ctor.template().ok_or_else(|| {
                    VmError::ContractViolation(format!(
                        "host constructor of {} has a fixed but missing template",
                        self.name
                    ))
                })
            })
            .transpose()?;

        let (strategy, template, delegate) = match fixed_template {
            Some(template) => (
                ConstructionStrategy::TakeoverTemplate,
                template.clone(),
                template,
            ),
            None => {
                let parent = match base {
                    Some(b) => Some(b.instance_delegate().cloned().ok_or_else(|| {
                        VmError::ContractViolation(format!(
                            "base class {} of {} is not finalized",
                            b.name, self.name
                        ))
                    })?),
                    None => None,
                };
                let delegate = ScriptObject::with_proto(parent);
                let template = match self.constructor.get().and_then(|c| c.template()) {
                    Some(native_template) => {
                        native_template.set_proto(Some(delegate.clone()));
                        native_template
                    }
                    None => ScriptObject::with_proto(Some(delegate.clone())),
                };
                (ConstructionStrategy::BuildTemplate, template, delegate)
            }
        };

        // Nothing is recorded until every check has passed.
        let _ = self.base.set(base.cloned());
        let _ = self.strategy.set(strategy);
        let _ = self.instance_delegate.set(delegate);
        let _ = self.instance_template.set(template);
        Ok(())
    }

    /// Finalize templates and the constructor. Runs exactly once per class.
    ///
    /// A class with a host constructor keeps it; the bytecode constructor is
    /// then ignored with a diagnostic.
    pub fn create(
        self: &Arc<Self>,
        domain: &ApplicationDomain,
        base: Option<&Arc<Class>>,
        instance_constructor: FunctionRef,
    ) -> VmResult<()> {
        if self.constructor_no_init.get().is_some() {
            return Err(VmError::ContractViolation(format!(
                "{}: constructor without initializer is already set",
                self.name
            )));
        }
        if self.instance_template.get().is_some() || self.instance_delegate.get().is_some() {
            return Err(VmError::ContractViolation(format!(
                "{}: templates are already set",
                self.name
            )));
        }

        self.configure(base)?;
        self.set_constructor(domain, instance_constructor);

        let ctor = self
            .constructor
            .get()
            .cloned()
            .ok_or_else(|| VmError::ContractViolation(format!("{} has no constructor", self.name)))?;
        let template = self.instance_template().cloned().ok_or_else(|| {
            VmError::ContractViolation(format!("{} has no instance template", self.name))
        })?;

        let _ = self.constructor_no_init.set(ctor.clone());
        ctor.set_class(self);
        ctor.set_template(template.clone())?;
        template.set_owner(self);
        if let Some(delegate) = self.instance_delegate() {
            delegate.set_owner(self);
        }
        Ok(())
    }

    /// Install the instance constructor.
    ///
    /// The constructor is set once; later attempts are ignored with a
    /// diagnostic. Returns whether `ctor` was installed.
    pub fn set_constructor(&self, domain: &ApplicationDomain, ctor: FunctionRef) -> bool {
        if self.constructor.set(ctor).is_ok() {
            return true;
        }
        domain
            .diagnostics()
            .emit(Diagnostic::warning(DiagnosticKind::IgnoredConstructor {
                class_name: self.name.clone(),
            }));
        false
    }

    pub(crate) fn set_native_holders(&self, statics: Vec<ObjectRef>, instance: Vec<ObjectRef>) {
        let _ = self.native_static_holders.set(statics);
        let _ = self.native_instance_holders.set(instance);
    }

    pub(crate) fn set_scope(&self, scope: Arc<Scope>) {
        let _ = self.scope.set(scope);
    }

    pub(crate) fn set_static_bindings(&self, bindings: Arc<Bindings>) {
        let _ = self.static_bindings.set(bindings);
    }

    pub(crate) fn set_instance_bindings(&self, bindings: Arc<Bindings>) {
        let _ = self.instance_bindings.set(bindings);
    }

    pub(crate) fn set_verification(&self, report: VerifyReport) {
        let _ = self.verification.set(report);
    }

    // ========================================================================
    // Call / construct
    // ========================================================================

    /// Create a new instance
    pub fn construct(&self, args: &[Value]) -> VmResult<Value> {
        let ctor = self
            .constructor()
            .ok_or_else(|| VmError::NotConstructible(self.name.clone()))?;
        ctor.construct(args)
    }

    /// Invoke the class object as a function
    pub fn call(&self, receiver: &Value, args: &[Value]) -> VmResult<Value> {
        match self.callable_style {
            CallableStyle::PassThrough => self.pass_through(receiver, args),
            CallableStyle::Coerce => self.coerce_call(args),
        }
    }

    /// Run the instance constructor as a plain call; PassThrough classes only
    pub fn pass_through(&self, receiver: &Value, args: &[Value]) -> VmResult<Value> {
        if self.callable_style != CallableStyle::PassThrough {
            return Err(VmError::ContractViolation(format!(
                "{} coerces when called; its constructor cannot be passed through",
                self.name
            )));
        }
        let ctor = self
            .constructor()
            .ok_or_else(|| VmError::NotConstructible(self.name.clone()))?;
        ctor.call(receiver, args)
    }

    /// Coerce the first argument; Coerce classes only
    pub fn coerce_call(&self, args: &[Value]) -> VmResult<Value> {
        if self.callable_style != CallableStyle::Coerce {
            return Err(VmError::ContractViolation(format!(
                "{} passes calls through to its constructor; it does not coerce",
                self.name
            )));
        }
        self.coerce(args.first().unwrap_or(&Value::Undefined))
    }

    /// Coerce `value` to this class's value domain
    pub fn coerce(&self, value: &Value) -> VmResult<Value> {
        match self.coercion {
            Coercion::Instance => {
                if value.is_nullish() {
                    Ok(Value::Null)
                } else if self.is_instance(value) {
                    Ok(value.clone())
                } else {
                    Err(VmError::TypeError(format!(
                        "cannot coerce {} to {}",
                        value.type_name(),
                        self.name
                    )))
                }
            }
            other => other.apply(value),
        }
    }

    /// Whether `value` is an instance of this class
    pub fn is_instance(&self, value: &Value) -> bool {
        match value {
            Value::Object(obj) => self
                .instance_template()
                .map_or(false, |t| Arc::ptr_eq(obj, t) || obj.inherits_from(t)),
            Value::Function(_) => {
                self.kind == ClassKind::RootObject
                    || self.native_id.as_deref() == Some(builtins::FUNCTION_CLASS_ID)
            }
            Value::Bool(_) => self.coercion == Coercion::Boolean,
            Value::Int(_) => matches!(self.coercion, Coercion::Int | Coercion::Number),
            Value::UInt(_) => matches!(self.coercion, Coercion::UInt | Coercion::Number),
            Value::Number(n) => match self.coercion {
                Coercion::Number => true,
                Coercion::Int => {
                    n.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(n)
                }
                Coercion::UInt => n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(n),
                _ => false,
            },
            Value::String(_) => self.coercion == Coercion::String,
            Value::Undefined | Value::Null => false,
        }
    }

    /// `instanceof` check; the root class accepts every non-null value
    pub fn is_instance_of(&self, value: &Value) -> bool {
        if self.kind == ClassKind::RootObject {
            return !value.is_nullish();
        }
        self.is_instance(value)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Unique class ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class descriptor
    pub fn info(&self) -> &Arc<ClassInfo> {
        &self.info
    }

    /// Bootstrap role
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Native class identifier, `None` for bytecode classes
    pub fn native_id(&self) -> Option<&str> {
        self.native_id.as_deref()
    }

    /// Whether the class is implemented by the host
    pub fn is_native(&self) -> bool {
        self.native_id.is_some()
    }

    /// The class as an object
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// The class as a value
    pub fn as_value(&self) -> Value {
        Value::Object(self.object.clone())
    }

    /// Base class; `None` for the root or before configuration
    pub fn base_class(&self) -> Option<&Arc<Class>> {
        self.base.get().and_then(|b| b.as_ref())
    }

    /// Whether `configure` has run
    pub fn is_configured(&self) -> bool {
        self.base.get().is_some()
    }

    /// Template strategy chosen by `configure`
    pub fn construction_strategy(&self) -> Option<ConstructionStrategy> {
        self.strategy.get().copied()
    }

    /// Traits template
    pub fn instance_template(&self) -> Option<&ObjectRef> {
        self.instance_template.get()
    }

    /// Dynamic template
    pub fn instance_delegate(&self) -> Option<&ObjectRef> {
        self.instance_delegate.get()
    }

    /// Instance constructor
    pub fn constructor(&self) -> Option<&FunctionRef> {
        self.constructor.get()
    }

    /// Constructor variant that skips native initialization
    pub fn constructor_no_init(&self) -> Option<&FunctionRef> {
        self.constructor_no_init.get()
    }

    /// Call behavior
    pub fn callable_style(&self) -> CallableStyle {
        self.callable_style
    }

    /// Coercion applied by `coerce`
    pub fn coercion(&self) -> Coercion {
        self.coercion
    }

    /// Initial value of a slot typed with this class
    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    /// Native initialization flags
    pub fn initialization_flags(&self) -> InitializationFlags {
        self.initialization_flags
    }

    /// Extra static holders declared by the native definition
    pub fn static_natives(&self) -> &NativeHolders<ObjectRef> {
        &self.static_natives
    }

    /// Extra instance holders declared by the native definition
    pub fn instance_natives(&self) -> &NativeHolders<ObjectRef> {
        &self.instance_natives
    }

    /// Holders searched for static native traits
    pub fn native_static_holders(&self) -> &[ObjectRef] {
        self.native_static_holders.get().map_or(&[], Vec::as_slice)
    }

    /// Holders searched for instance native traits
    pub fn native_instance_holders(&self) -> &[ObjectRef] {
        self.native_instance_holders.get().map_or(&[], Vec::as_slice)
    }

    /// Static binding table
    pub fn static_bindings(&self) -> Option<&Arc<Bindings>> {
        self.static_bindings.get()
    }

    /// Instance binding table
    pub fn instance_bindings(&self) -> Option<&Arc<Bindings>> {
        self.instance_bindings.get()
    }

    /// Lexical scope of the class body
    pub fn scope(&self) -> Option<&Arc<Scope>> {
        self.scope.get()
    }

    /// Result of verification, once it ran
    pub fn verification(&self) -> Option<&VerifyReport> {
        self.verification.get()
    }

    /// Whether the base chain terminates without revisiting a class
    pub fn base_chain_is_acyclic(&self) -> bool {
        let mut seen = FxHashSet::default();
        seen.insert(self.id);
        let mut current = self.base_class().cloned();
        while let Some(class) = current {
            if !seen.insert(class.id) {
                return false;
            }
            current = class.base_class().cloned();
        }
        true
    }

    /// Human-readable dump of the class structure
    pub fn trace(&self) -> String {
        fn label(obj: Option<&ObjectRef>) -> String {
            obj.map_or_else(|| "null".to_string(), |o| format!("Object [#{}]", o.id()))
        }
        fn label_fn(f: Option<&FunctionRef>) -> String {
            f.map_or_else(
                || "null".to_string(),
                |f| format!("Function {} [#{}]", f.name(), f.id()),
            )
        }

        let template = self.instance_template();
        let delegate = self.instance_delegate();
        let mut out = String::new();
        let _ = writeln!(out, "Class: {} {{", self.name);
        let _ = writeln!(
            out,
            "  baseClass: {}",
            self.base_class().map_or("null", |b| b.name())
        );
        let _ = writeln!(out, "  strategy: {:?}", self.construction_strategy());
        let _ = writeln!(out, "  callableStyle: {:?}", self.callable_style);
        let _ = writeln!(out, "  instanceConstructor: {}", label_fn(self.constructor()));
        let _ = writeln!(
            out,
            "  instanceConstructorNoInitialize: {}",
            label_fn(self.constructor_no_init())
        );
        let _ = writeln!(out, "  traitsPrototype: {}", label(template));
        let _ = writeln!(
            out,
            "  traitsPrototype.__proto__: {}",
            label(template.and_then(|t| t.proto()).as_ref())
        );
        let _ = writeln!(out, "  dynamicPrototype: {}", label(delegate));
        let _ = writeln!(
            out,
            "  dynamicPrototype.__proto__: {}",
            label(delegate.and_then(|d| d.proto()).as_ref())
        );
        let _ = writeln!(
            out,
            "  instanceConstructor.prototype: {}",
            label(self.constructor().and_then(|c| c.template()).as_ref())
        );
        out.push('}');
        out
    }
}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("native_id", &self.native_id)
            .field("strategy", &self.strategy.get())
            .finish()
    }
}
