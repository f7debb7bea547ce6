use std::sync::Arc;

use kiln_abc::{AbcUnit, ClassInfo, InstanceInfo, MethodInfo, Multiname, Trait};
use kiln_engine::vm::natives::{NativeConstructorDef, NativeHolderDef};
use kiln_engine::vm::{
    BindingKind, ConstructionStrategy, DiagnosticKind, ScriptObject, TraitSet,
};
use kiln_engine::{
    create_class, initialize_native_registry, register_native_class, ApplicationDomain, Class,
    LinkerOptions, NativeClassDef, Value, VmError,
};

// ============================================================================
// Helpers
// ============================================================================

fn descriptor(name: &str, super_name: Option<&str>) -> ClassInfo {
    ClassInfo::new(
        0,
        Arc::new(AbcUnit::new("linking.abc")),
        InstanceInfo::new(
            Multiname::public(name),
            super_name.map(Multiname::public),
            MethodInfo::new(0, Some(name), 0),
        ),
        MethodInfo::new(1, None, 0),
    )
}

fn native_method(name: &str) -> Trait {
    Trait::method(Multiname::public(name), MethodInfo::native(7, Some(name), 0))
}

/// Link `Object` and `Class` into a fresh domain
fn bootstrap(options: LinkerOptions) -> (ApplicationDomain, Arc<Class>) {
    let domain = ApplicationDomain::new(options);
    initialize_native_registry(&domain);
    let scope = domain.global_scope().clone();

    let object = create_class(
        &domain,
        &Arc::new(descriptor("Object", None).with_native("ObjectClass")),
        None,
        &scope,
    )
    .unwrap();

    let mut class_info = descriptor("Class", Some("Object")).with_native("Class");
    class_info.instance.traits.push(Trait::getter(
        Multiname::public("prototype"),
        MethodInfo::native(2, Some("prototype"), 0),
    ));
    create_class(&domain, &Arc::new(class_info), Some(&object), &scope).unwrap();
    (domain, object)
}

/// Register a `Foo`-style native class whose template optionally implements `bar`
fn register_foo(id: &str, with_bar: bool) {
    let mut prototype = NativeHolderDef::new("Foo.prototype");
    if with_bar {
        prototype = prototype.method("bar", 0, |_, _| Ok(Value::Int(42)));
    }
    let def = NativeClassDef::new(id).constructor(
        NativeConstructorDef::new("Foo", 0, |this, _| Ok(this.clone())).prototype(prototype),
    );
    register_native_class(def).unwrap();
}

fn link_foo(domain: &ApplicationDomain, object: &Arc<Class>, id: &str) -> Arc<Class> {
    let mut info = descriptor("Foo", Some("Object")).with_native(id);
    info.instance.traits.push(native_method("bar"));
    create_class(domain, &Arc::new(info), Some(object), domain.global_scope()).unwrap()
}

fn mentions_bar(domain: &ApplicationDomain) -> usize {
    domain
        .diagnostics()
        .for_class("Foo")
        .iter()
        .filter(|d| d.to_string().contains("bar"))
        .count()
}

// ============================================================================
// Native binding resolution
// ============================================================================

#[test]
fn test_native_method_resolves_without_diagnostics() {
    register_foo("LinkedFooClass", true);
    let (domain, object) = bootstrap(LinkerOptions::default());
    let foo = link_foo(&domain, &object, "LinkedFooClass");

    assert!(foo.verification().unwrap().is_empty());
    assert_eq!(mentions_bar(&domain), 0);

    let instance = foo.construct(&[]).unwrap();
    let obj = instance.as_object().unwrap();
    let bar = ScriptObject::get(obj, "bar").unwrap();
    let bar = bar.as_function().unwrap();
    assert_eq!(bar.call(&instance, &[]).unwrap(), Value::Int(42));
    assert!(foo.is_instance(&instance));
    assert!(object.is_instance_of(&instance));
}

#[test]
fn test_missing_native_method_is_reported_once() {
    register_foo("BareFooClass", false);
    let (domain, object) = bootstrap(LinkerOptions::default());
    let foo = link_foo(&domain, &object, "BareFooClass");

    assert_eq!(mentions_bar(&domain), 1);
    let missing: Vec<_> = domain
        .diagnostics()
        .all()
        .into_iter()
        .filter(|d| matches!(d.kind, DiagnosticKind::MissingNativeTrait { .. }))
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].class_name(), "Foo");

    // The only other finding is the ignored bytecode constructor.
    let for_foo = domain.diagnostics().for_class("Foo");
    assert_eq!(for_foo.len(), 2, "{:?}", for_foo);
    assert_eq!(
        for_foo
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::MissingNativeTrait { .. }))
            .count(),
        1
    );
    assert_eq!(
        for_foo
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::IgnoredConstructor { .. }))
            .count(),
        1
    );
    assert_eq!(
        foo.verification().unwrap().missing_natives,
        vec![(TraitSet::Instance, "bar".to_string())]
    );

    // Construction still completes; only calling the stub fails.
    let instance = foo.construct(&[]).unwrap();
    let bar = ScriptObject::get(instance.as_object().unwrap(), "bar").unwrap();
    match bar.as_function().unwrap().call(&instance, &[]) {
        Err(VmError::UnresolvedNative {
            trait_name,
            class_name,
        }) => {
            assert_eq!(trait_name, "bar");
            assert_eq!(class_name, "Foo");
        }
        other => panic!("expected unresolved native, got {:?}", other),
    }
}

#[test]
fn test_host_constructor_replaces_bytecode_constructor() {
    register_foo("CtorFooClass", true);
    let (domain, object) = bootstrap(LinkerOptions::default());
    let foo = link_foo(&domain, &object, "CtorFooClass");

    assert_eq!(foo.constructor().unwrap().name(), "Foo");
    assert!(domain
        .diagnostics()
        .for_class("Foo")
        .iter()
        .any(|d| matches!(d.kind, DiagnosticKind::IgnoredConstructor { .. })));
}

// ============================================================================
// Template strategies
// ============================================================================

#[test]
fn test_subclass_delegate_is_isolated_from_base() {
    register_foo("SubBaseFooClass", true);
    let (domain, object) = bootstrap(LinkerOptions::default());
    let foo = link_foo(&domain, &object, "SubBaseFooClass");
    let sub = create_class(
        &domain,
        &Arc::new(descriptor("Sub", Some("Foo"))),
        Some(&foo),
        domain.global_scope(),
    )
    .unwrap();

    assert_eq!(
        sub.construction_strategy(),
        Some(ConstructionStrategy::BuildTemplate)
    );
    let sub_delegate = sub.instance_delegate().unwrap();
    assert!(sub_delegate.delegates_to(foo.instance_delegate().unwrap()));

    ScriptObject::set(sub_delegate, "extra", Value::Int(5)).unwrap();

    let instance = sub.construct(&[]).unwrap();
    let obj = instance.as_object().unwrap();
    assert_eq!(ScriptObject::get(obj, "extra").unwrap(), Value::Int(5));
    assert!(!foo.instance_delegate().unwrap().has_property("extra"));

    // Inherited members resolve through the parent binding table.
    let bindings = sub.instance_bindings().unwrap();
    assert!(bindings.lookup_own("bar", BindingKind::Method).is_none());
    assert!(bindings.lookup("bar", BindingKind::Method).is_some());
    assert_eq!(
        ScriptObject::get(obj, "bar")
            .unwrap()
            .as_function()
            .unwrap()
            .call(&instance, &[])
            .unwrap(),
        Value::Int(42)
    );
}

#[test]
fn test_takeover_classes_share_one_template() {
    let (domain, object) = bootstrap(LinkerOptions::default());
    let number = create_class(
        &domain,
        &Arc::new(descriptor("Number", Some("Object")).with_native("NumberClass")),
        Some(&object),
        domain.global_scope(),
    )
    .unwrap();

    assert_eq!(
        number.construction_strategy(),
        Some(ConstructionStrategy::TakeoverTemplate)
    );
    let template = number.instance_template().unwrap();
    assert!(Arc::ptr_eq(template, number.instance_delegate().unwrap()));
    assert!(Arc::ptr_eq(
        template,
        &number.constructor().unwrap().template().unwrap()
    ));
    assert!(Arc::ptr_eq(number.base_class().unwrap(), &object));
}

#[test]
fn test_every_class_but_the_root_has_a_base() {
    let (domain, object) = bootstrap(LinkerOptions::default());
    let point = create_class(
        &domain,
        &Arc::new(descriptor("Point", Some("Object"))),
        Some(&object),
        domain.global_scope(),
    )
    .unwrap();

    for class in domain.classes() {
        if Arc::ptr_eq(&class, &object) {
            assert!(class.base_class().is_none());
        } else {
            let base = class.base_class().unwrap();
            assert!(!Arc::ptr_eq(base, &class));
        }
        let ctor = class.constructor().unwrap();
        assert!(Arc::ptr_eq(
            class.instance_template().unwrap(),
            &ctor.template().unwrap()
        ));
        assert!(class.base_chain_is_acyclic());
    }
    assert!(point.verification().unwrap().is_empty());
}

#[test]
fn test_create_runs_once() {
    let (domain, object) = bootstrap(LinkerOptions::default());
    let point = create_class(
        &domain,
        &Arc::new(descriptor("Point", Some("Object"))),
        Some(&object),
        domain.global_scope(),
    )
    .unwrap();
    let ctor = point.constructor().unwrap().clone();
    assert!(matches!(
        point.create(&domain, Some(&object), ctor),
        Err(VmError::ContractViolation(_))
    ));
}

// ============================================================================
// Class object members
// ============================================================================

#[test]
fn test_class_objects_expose_prototype() {
    let (domain, object) = bootstrap(LinkerOptions::default());
    let point = create_class(
        &domain,
        &Arc::new(descriptor("Point", Some("Object"))),
        Some(&object),
        domain.global_scope(),
    )
    .unwrap();

    let proto = ScriptObject::get(point.object(), "prototype").unwrap();
    assert_eq!(proto, Value::Object(point.instance_delegate().unwrap().clone()));
}

#[test]
fn test_static_bytecode_members_are_applied() {
    let (domain, object) = bootstrap(LinkerOptions::default());
    let mut info = descriptor("Util", Some("Object"));
    info.traits.push(Trait::method(
        Multiname::public("helper"),
        MethodInfo::new(4, Some("helper"), 0),
    ));
    let util = create_class(&domain, &Arc::new(info), Some(&object), domain.global_scope()).unwrap();

    let helper = util.object().own_method("helper").unwrap();
    assert_eq!(helper.call(&util.as_value(), &[]).unwrap(), Value::Undefined);
}

// ============================================================================
// Verification modes
// ============================================================================

#[test]
fn test_inherited_native_holders_are_reported() {
    let (domain, object) = bootstrap(LinkerOptions::default());
    create_class(
        &domain,
        &Arc::new(descriptor("XML", Some("Object")).with_native("XMLClass")),
        Some(&object),
        domain.global_scope(),
    )
    .unwrap();

    let inherited = domain
        .diagnostics()
        .for_class("XML")
        .into_iter()
        .filter(|d| matches!(d.kind, DiagnosticKind::InheritedNativeHolders { .. }))
        .count();
    assert_eq!(inherited, 2);
}

#[test]
fn test_strict_linking_rejects_missing_base() {
    let (domain, _) = bootstrap(LinkerOptions::strict());
    let result = create_class(
        &domain,
        &Arc::new(descriptor("Orphan", Some("Object"))),
        None,
        domain.global_scope(),
    );
    assert!(matches!(result, Err(VmError::ContractViolation(_))));
}

#[test]
fn test_unverified_linking_skips_reports() {
    let (domain, object) = bootstrap(LinkerOptions::unverified());
    let orphan = create_class(
        &domain,
        &Arc::new(descriptor("Orphan", Some("Object"))),
        None,
        domain.global_scope(),
    )
    .unwrap();
    assert!(orphan.verification().is_none());
    assert!(domain.diagnostics().for_class("Orphan").is_empty());
    assert!(object.verification().is_none());
}

#[test]
fn test_duplicate_traits_are_rejected() {
    let (domain, object) = bootstrap(LinkerOptions::default());
    let mut info = descriptor("Twice", Some("Object"));
    info.instance.traits.push(Trait::method(
        Multiname::public("go"),
        MethodInfo::new(3, Some("go"), 0),
    ));
    info.instance.traits.push(Trait::method(
        Multiname::public("go"),
        MethodInfo::new(4, Some("go"), 0),
    ));
    let result = create_class(&domain, &Arc::new(info), Some(&object), domain.global_scope());
    assert!(matches!(result, Err(VmError::Descriptor(_))));
}
