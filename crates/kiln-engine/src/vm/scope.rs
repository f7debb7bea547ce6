//! Lexical scope frames

use std::sync::{Arc, Weak};

use crate::vm::class::Class;
use crate::vm::object::ObjectRef;

/// Object bound by a scope frame
#[derive(Debug, Clone)]
pub enum ScopeObject {
    /// Global object of a domain
    Global(ObjectRef),
    /// Ordinary object (activation, `with` target)
    Object(ObjectRef),
    /// Class under construction; held weakly, the class outlives its scope users
    Class(Weak<Class>),
}

/// A scope frame
#[derive(Debug)]
pub struct Scope {
    parent: Option<Arc<Scope>>,
    object: ScopeObject,
}

impl Scope {
    /// Create a scope frame
    pub fn new(parent: Option<Arc<Scope>>, object: ScopeObject) -> Arc<Self> {
        Arc::new(Self { parent, object })
    }

    /// Create the outermost frame bound to a global object
    pub fn global(global: ObjectRef) -> Arc<Self> {
        Self::new(None, ScopeObject::Global(global))
    }

    /// Create a class frame
    pub fn for_class(parent: &Arc<Scope>, class: &Arc<Class>) -> Arc<Self> {
        Self::new(Some(parent.clone()), ScopeObject::Class(Arc::downgrade(class)))
    }

    /// Enclosing frame
    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    /// Bound object
    pub fn object(&self) -> &ScopeObject {
        &self.object
    }

    /// Class bound by this frame, if any
    pub fn class(&self) -> Option<Arc<Class>> {
        match &self.object {
            ScopeObject::Class(c) => c.upgrade(),
            _ => None,
        }
    }

    /// Innermost class bound by this frame or an enclosing one
    pub fn enclosing_class(&self) -> Option<Arc<Class>> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(class) = scope.class() {
                return Some(class);
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// Number of frames from this one to the outermost (inclusive)
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.parent.as_deref();
        while let Some(scope) = current {
            depth += 1;
            current = scope.parent.as_deref();
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::object::ScriptObject;

    #[test]
    fn test_depth() {
        let global = Scope::global(ScriptObject::new());
        let inner = Scope::new(Some(global.clone()), ScopeObject::Object(ScriptObject::new()));
        assert_eq!(global.depth(), 1);
        assert_eq!(inner.depth(), 2);
        assert!(inner.enclosing_class().is_none());
        assert!(Arc::ptr_eq(inner.parent().unwrap(), &global));
    }
}
