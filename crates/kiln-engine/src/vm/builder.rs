//! Class builder
//!
//! `create_class` turns a class descriptor into a linked `Class`. Bases must
//! be linked before the classes deriving from them.

use kiln_abc::ClassInfo;
use std::sync::Arc;

use crate::vm::bindings::{ApplyMode, Bindings};
use crate::vm::class::{Class, ClassKind};
use crate::vm::diagnostics::TraitSet;
use crate::vm::domain::ApplicationDomain;
use crate::vm::native_registry::lookup_native_class;
use crate::vm::object::ObjectRef;
use crate::vm::scope::Scope;
use crate::vm::verify::verify_class;
use crate::vm::{VmError, VmResult};

/// Link `info` into a runtime class of `domain`
pub fn create_class(
    domain: &ApplicationDomain,
    info: &Arc<ClassInfo>,
    base: Option<&Arc<Class>>,
    scope: &Arc<Scope>,
) -> VmResult<Arc<Class>> {
    ClassBuilder::new(domain).build(info, base, scope)
}

/// Links class descriptors within one domain
pub struct ClassBuilder<'a> {
    domain: &'a ApplicationDomain,
}

impl<'a> ClassBuilder<'a> {
    /// Builder for `domain`
    pub fn new(domain: &'a ApplicationDomain) -> Self {
        Self { domain }
    }

    /// Link one class
    pub fn build(
        &self,
        info: &Arc<ClassInfo>,
        base: Option<&Arc<Class>>,
        scope: &Arc<Scope>,
    ) -> VmResult<Arc<Class>> {
        let domain = self.domain;
        info.validate()?;

        let class = self.allocate(info)?;
        log::debug!(
            target: "kiln::link",
            "linking {} (base: {})",
            class.name(),
            base.map_or("none", |b| b.name())
        );

        let class_scope = Scope::for_class(scope, &class);
        class.set_scope(class_scope.clone());

        let instance_constructor =
            domain
                .synthesizer()
                .synthesize(&info.instance.init, &class_scope, false);

        let (static_holders, instance_holders) = native_holders(&class);
        class.set_native_holders(static_holders, instance_holders);

        class.create(domain, base, instance_constructor)?;

        if domain.options().verify {
            let report = verify_class(domain, &class)?;
            class.set_verification(report);
        }

        let static_bindings = Arc::new(Bindings::build(
            domain,
            TraitSet::Static,
            class.name(),
            &info.traits,
            &class_scope,
            class.native_static_holders(),
            None,
        ));
        static_bindings.apply_to(domain, class.object(), ApplyMode::Replace);
        class.set_static_bindings(static_bindings);

        let instance_bindings = Arc::new(Bindings::build(
            domain,
            TraitSet::Instance,
            class.name(),
            &info.instance.traits,
            &class_scope,
            class.native_instance_holders(),
            base.and_then(|b| b.instance_bindings().cloned()),
        ));
        if let Some(template) = class.instance_template() {
            instance_bindings.apply_to(domain, template, ApplyMode::Replace);
        }
        class.set_instance_bindings(instance_bindings.clone());

        match class.kind() {
            ClassKind::ClassOfClasses => {
                if let Some(object_class) = domain.object_class() {
                    instance_bindings.apply_to(domain, object_class.object(), ApplyMode::Append);
                }
            }
            _ => {
                if let Some(class_bindings) =
                    domain.class_class().and_then(|c| c.instance_bindings())
                {
                    class_bindings.apply_to(domain, class.object(), ApplyMode::Append);
                }
            }
        }

        domain.register_class(&class);
        if domain.options().trace {
            log::trace!(target: "kiln::link", "{}", class.trace());
        }
        Ok(class)
    }

    fn allocate(&self, info: &Arc<ClassInfo>) -> VmResult<Arc<Class>> {
        match info.native_id() {
            Some(id) => {
                let def =
                    lookup_native_class(id).ok_or_else(|| VmError::MissingNativeClass(id.to_string()))?;
                Ok(Class::native(info.clone(), id, def.materialize()))
            }
            None => Ok(Class::bytecode(info.clone())),
        }
    }
}

/// Holders searched for static and instance native traits
fn native_holders(class: &Class) -> (Vec<ObjectRef>, Vec<ObjectRef>) {
    if !class.is_native() {
        return (Vec::new(), Vec::new());
    }
    let statics = std::iter::once(class.object().clone())
        .chain(class.static_natives().extras().iter().cloned())
        .collect();
    let instance = class
        .constructor()
        .and_then(|c| c.template())
        .into_iter()
        .chain(class.instance_natives().extras().iter().cloned())
        .collect();
    (statics, instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::native_registry::initialize_native_registry;
    use crate::vm::value::Value;
    use kiln_abc::{AbcUnit, InstanceInfo, MethodInfo, Multiname, Trait};

    fn info(name: &str, super_name: Option<&str>, native: Option<&str>) -> ClassInfo {
        let instance = InstanceInfo::new(
            Multiname::public(name),
            super_name.map(Multiname::public),
            MethodInfo::new(0, Some(name), 0),
        );
        let info = ClassInfo::new(
            0,
            Arc::new(AbcUnit::new("builtin.abc")),
            instance,
            MethodInfo::new(1, None, 0),
        );
        match native {
            Some(id) => info.with_native(id),
            None => info,
        }
    }

    fn bootstrap(domain: &ApplicationDomain) -> (Arc<Class>, Arc<Class>) {
        initialize_native_registry(domain);
        let scope = domain.global_scope().clone();
        let object = create_class(
            domain,
            &Arc::new(info("Object", None, Some("ObjectClass"))),
            None,
            &scope,
        )
        .unwrap();

        let mut class_info = info("Class", Some("Object"), Some("Class"));
        class_info.instance.traits.push(Trait::getter(
            Multiname::public("prototype"),
            MethodInfo::native(2, Some("prototype"), 0),
        ));
        let class = create_class(domain, &Arc::new(class_info), Some(&object), &scope).unwrap();
        (object, class)
    }

    #[test]
    fn test_bootstrap_wires_well_known_classes() {
        let domain = ApplicationDomain::default();
        let (object, class) = bootstrap(&domain);

        assert!(Arc::ptr_eq(domain.object_class().unwrap(), &object));
        assert!(Arc::ptr_eq(domain.class_class().unwrap(), &class));
        assert_eq!(object.kind(), ClassKind::RootObject);
        assert!(object.base_class().is_none());
        assert!(class.verification().unwrap().is_empty());
    }

    #[test]
    fn test_class_bindings_reach_the_root_class_object() {
        let domain = ApplicationDomain::default();
        let (object, _) = bootstrap(&domain);

        // Class's `prototype` getter lands on the Object class object.
        let proto = crate::vm::object::ScriptObject::get(object.object(), "prototype").unwrap();
        assert_eq!(proto, Value::Object(object.instance_delegate().unwrap().clone()));
    }

    #[test]
    fn test_later_classes_receive_class_bindings() {
        let domain = ApplicationDomain::default();
        let (object, _) = bootstrap(&domain);
        let scope = domain.global_scope().clone();

        let point = create_class(&domain, &Arc::new(info("Point", Some("Object"), None)), Some(&object), &scope)
            .unwrap();
        assert!(point.object().has_own_getter("prototype"));
        let proto = crate::vm::object::ScriptObject::get(point.object(), "prototype").unwrap();
        assert_eq!(proto, Value::Object(point.instance_delegate().unwrap().clone()));
    }

    #[test]
    fn test_missing_native_class_is_fatal() {
        let domain = ApplicationDomain::default();
        initialize_native_registry(&domain);
        let result = create_class(
            &domain,
            &Arc::new(info("Ghost", Some("Object"), Some("GhostClass"))),
            None,
            domain.global_scope(),
        );
        assert_eq!(
            result.unwrap_err(),
            VmError::MissingNativeClass("GhostClass".to_string())
        );
    }
}
