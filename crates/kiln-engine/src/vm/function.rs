//! Callable function objects
//!
//! A `Function` is either a host function, a callable synthesized from a
//! bytecode method, or a stub planted for a native trait that had no host
//! implementation. Stubs only fail when invoked.

use kiln_abc::MethodInfo;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::vm::class::Class;
use crate::vm::object::{ObjectRef, ScriptObject};
use crate::vm::scope::Scope;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

static NEXT_FUNCTION_ID: AtomicU64 = AtomicU64::new(1);

/// Host function: receives the receiver (`this`) and the argument list
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync>;

/// Shared function reference
pub type FunctionRef = Arc<Function>;

/// Wrap a closure as a `NativeFn`
pub fn native_fn(
    f: impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
) -> NativeFn {
    Arc::new(f)
}

/// What runs when the function is called
pub enum FunctionBody {
    /// Host implementation
    Native(NativeFn),
    /// Callable synthesized from a bytecode method
    Bytecode {
        /// Method descriptor
        method: Arc<MethodInfo>,
        /// Captured lexical scope
        scope: Arc<Scope>,
        /// Whether the entry checks initializer arguments
        check_init_args: bool,
        /// Entry point provided by the synthesizer
        entry: NativeFn,
    },
    /// Placeholder for a native trait with no host implementation
    Unresolved {
        /// Trait description
        trait_name: String,
        /// Owning class name
        class_name: String,
    },
}

/// Function object
pub struct Function {
    id: u64,
    name: String,
    arity: u32,
    body: FunctionBody,
    /// Runs instead of the body under `new`
    construct_hook: Option<NativeFn>,
    /// Template given to instances created by `construct`
    template: RwLock<Option<ObjectRef>>,
    template_writable: bool,
    class: RwLock<Weak<Class>>,
}

impl Function {
    fn alloc(name: &str, arity: u32, body: FunctionBody) -> Self {
        Self {
            id: NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            arity,
            body,
            construct_hook: None,
            template: RwLock::new(None),
            template_writable: true,
            class: RwLock::new(Weak::new()),
        }
    }

    /// Create a host function
    pub fn native(
        name: &str,
        arity: u32,
        f: impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> FunctionRef {
        Arc::new(Self::alloc(name, arity, FunctionBody::Native(Arc::new(f))))
    }

    /// Create a host function from an existing handler
    pub fn from_native_fn(name: &str, arity: u32, f: NativeFn) -> FunctionRef {
        Arc::new(Self::alloc(name, arity, FunctionBody::Native(f)))
    }

    /// Create a host constructor with its own template.
    ///
    /// `template_writable = false` marks a host-fixed template: it can never be
    /// replaced or reparented by a class.
    pub fn native_constructor(
        name: &str,
        arity: u32,
        call: NativeFn,
        construct: Option<NativeFn>,
        template: ObjectRef,
        template_writable: bool,
    ) -> FunctionRef {
        let mut f = Self::alloc(name, arity, FunctionBody::Native(call));
        f.construct_hook = construct;
        f.template = RwLock::new(Some(template));
        f.template_writable = template_writable;
        Arc::new(f)
    }

    /// Create a callable for a bytecode method
    pub fn bytecode(
        method: Arc<MethodInfo>,
        scope: Arc<Scope>,
        check_init_args: bool,
        entry: NativeFn,
    ) -> FunctionRef {
        let name = method.name.clone().unwrap_or_default();
        let arity = method.param_count;
        Arc::new(Self::alloc(
            &name,
            arity,
            FunctionBody::Bytecode {
                method,
                scope,
                check_init_args,
                entry,
            },
        ))
    }

    /// Create a stub for a native trait without a host implementation
    pub fn unresolved(trait_name: &str, class_name: &str) -> FunctionRef {
        Arc::new(Self::alloc(
            trait_name,
            0,
            FunctionBody::Unresolved {
                trait_name: trait_name.to_string(),
                class_name: class_name.to_string(),
            },
        ))
    }

    /// Unique function ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter count
    pub fn arity(&self) -> u32 {
        self.arity
    }

    /// Function body
    pub fn body(&self) -> &FunctionBody {
        &self.body
    }

    /// Whether this is an unresolved native stub
    pub fn is_unresolved(&self) -> bool {
        matches!(self.body, FunctionBody::Unresolved { .. })
    }

    /// Invoke the function
    pub fn call(&self, this: &Value, args: &[Value]) -> VmResult<Value> {
        match &self.body {
            FunctionBody::Native(f) => f(this, args),
            FunctionBody::Bytecode { entry, .. } => entry(this, args),
            FunctionBody::Unresolved {
                trait_name,
                class_name,
            } => Err(VmError::UnresolvedNative {
                trait_name: trait_name.clone(),
                class_name: class_name.clone(),
            }),
        }
    }

    /// Invoke the function under `new`.
    ///
    /// Allocates an object delegating to the function's template and runs the
    /// construct hook (or the body) with it as receiver. An object-typed result
    /// replaces the allocated object; a construct hook's result is always used.
    pub fn construct(&self, args: &[Value]) -> VmResult<Value> {
        let template = self
            .template()
            .ok_or_else(|| VmError::NotConstructible(self.name.clone()))?;
        let instance = Value::Object(ScriptObject::with_proto(Some(template)));
        if let Some(hook) = &self.construct_hook {
            return hook(&instance, args);
        }
        match self.call(&instance, args)? {
            result @ (Value::Object(_) | Value::Function(_)) => Ok(result),
            _ => Ok(instance),
        }
    }

    // ========================================================================
    // Template and class back-reference
    // ========================================================================

    /// Template handed to constructed instances
    pub fn template(&self) -> Option<ObjectRef> {
        self.template.read().clone()
    }

    /// Capability check: may the template be replaced or reparented?
    pub fn is_template_writable(&self) -> bool {
        self.template_writable
    }

    /// Replace the template.
    ///
    /// A host-fixed template only accepts itself.
    pub fn set_template(&self, template: ObjectRef) -> VmResult<()> {
        let mut slot = self.template.write();
        if !self.template_writable {
            match slot.as_ref() {
                Some(current) if Arc::ptr_eq(current, &template) => return Ok(()),
                _ => {
                    return Err(VmError::ContractViolation(format!(
                        "template of {} is host-fixed and cannot be replaced",
                        self.name
                    )))
                }
            }
        }
        *slot = Some(template);
        Ok(())
    }

    /// Class this function constructs, if any
    pub fn class(&self) -> Option<Arc<Class>> {
        self.class.read().upgrade()
    }

    /// Record the class this function constructs
    pub fn set_class(&self, class: &Arc<Class>) {
        *self.class.write() = Arc::downgrade(class);
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            FunctionBody::Native(_) => "native",
            FunctionBody::Bytecode { .. } => "bytecode",
            FunctionBody::Unresolved { .. } => "unresolved",
        };
        f.debug_struct("Function")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}
