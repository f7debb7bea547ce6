//! Function synthesis seam
//!
//! The class builder never interprets bytecode. It asks the domain's
//! synthesizer for a callable per method descriptor; an interpreter plugs in
//! here.

use kiln_abc::MethodInfo;
use std::sync::Arc;

use crate::vm::function::{native_fn, Function, FunctionRef};
use crate::vm::scope::Scope;
use crate::vm::value::Value;

/// Produces callables for bytecode methods
pub trait FunctionSynthesizer: Send + Sync {
    /// Build a callable for `method` closing over `scope`
    fn synthesize(
        &self,
        method: &Arc<MethodInfo>,
        scope: &Arc<Scope>,
        check_init_args: bool,
    ) -> FunctionRef;
}

/// Synthesizer whose callables do nothing and return `undefined`
#[derive(Debug, Default, Clone, Copy)]
pub struct InertSynthesizer;

impl FunctionSynthesizer for InertSynthesizer {
    fn synthesize(
        &self,
        method: &Arc<MethodInfo>,
        scope: &Arc<Scope>,
        check_init_args: bool,
    ) -> FunctionRef {
        Function::bytecode(
            method.clone(),
            scope.clone(),
            check_init_args,
            native_fn(|_, _| Ok(Value::Undefined)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::function::FunctionBody;
    use crate::vm::object::ScriptObject;

    #[test]
    fn test_inert_callable() {
        let scope = Scope::global(ScriptObject::new());
        let method = Arc::new(MethodInfo::new(3, Some("run"), 2));
        let f = InertSynthesizer.synthesize(&method, &scope, true);

        assert_eq!(f.name(), "run");
        assert_eq!(f.arity(), 2);
        assert_eq!(f.call(&Value::Undefined, &[]).unwrap(), Value::Undefined);
        match f.body() {
            FunctionBody::Bytecode {
                check_init_args, ..
            } => assert!(*check_init_args),
            _ => panic!("expected a bytecode body"),
        }
    }
}
