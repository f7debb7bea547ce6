//! Builtin native classes
//!
//! The fixed table of host classes every domain can link against. Value-type
//! classes coerce when called; the rest pass calls through to their host
//! constructor. Members the runtime does not implement are registered so
//! binding resolution succeeds, and fail with `NotImplemented` when invoked.

use std::sync::Arc;

use crate::vm::coerce::{
    coerce_int, coerce_uint, number_to_string, to_boolean, to_number, to_string, Coercion,
};
use crate::vm::object::ObjectRef;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

use super::{NativeClassDef, NativeConstructorDef, NativeHolderDef};

/// Native identifier of the root `Object` class
pub const OBJECT_CLASS_ID: &str = "ObjectClass";
/// Native identifier of `Class`
pub const CLASS_CLASS_ID: &str = "Class";
/// Native identifier of `Function`
pub const FUNCTION_CLASS_ID: &str = "FunctionClass";

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

fn key_arg(args: &[Value], index: usize) -> String {
    to_string(&arg(args, index))
}

fn object_receiver(this: &Value, member: &str) -> VmResult<ObjectRef> {
    this.as_object().cloned().ok_or_else(|| {
        VmError::TypeError(format!("{} called on {}", member, this.type_name()))
    })
}

fn not_constructible(name: &'static str) -> impl Fn(&Value, &[Value]) -> VmResult<Value> {
    move |_, _| Err(VmError::NotConstructible(name.to_string()))
}

fn not_implemented(what: &'static str) -> impl Fn(&Value, &[Value]) -> VmResult<Value> {
    move |_, _| Err(VmError::NotImplemented(what.to_string()))
}

/// Name of the class owning the nearest template on `obj`'s chain
fn class_name_of(obj: &ObjectRef) -> String {
    let mut current = Some(obj.clone());
    while let Some(o) = current {
        if let Some(class) = o.owner_class() {
            return class.name().to_string();
        }
        current = o.proto();
    }
    "Object".to_string()
}

fn has_own_property(o: &Value, key: &str) -> bool {
    o.as_object().map_or(false, |obj| obj.has_own_property(key))
}

fn property_is_enumerable(o: &Value, key: &str) -> bool {
    o.as_object().map_or(false, |obj| obj.is_enumerable(key))
}

fn is_prototype_of(o: &Value, v: &Value) -> bool {
    match (o.as_object(), v.as_object()) {
        (Some(proto), Some(obj)) => obj.inherits_from(proto),
        _ => false,
    }
}

// ============================================================================
// Shared holders
// ============================================================================

fn math_holder() -> Arc<NativeHolderDef> {
    fn unary(f: fn(f64) -> f64) -> impl Fn(&Value, &[Value]) -> VmResult<Value> {
        move |_, args| Ok(Value::Number(f(to_number(&arg(args, 0)))))
    }
    Arc::new(
        NativeHolderDef::new("Math")
            .method("abs", 1, unary(f64::abs))
            .method("ceil", 1, unary(f64::ceil))
            .method("floor", 1, unary(f64::floor))
            .method("sqrt", 1, unary(f64::sqrt))
            .method("round", 1, unary(|n| (n + 0.5).floor()))
            .method("pow", 2, |_, args| {
                Ok(Value::Number(
                    to_number(&arg(args, 0)).powf(to_number(&arg(args, 1))),
                ))
            })
            .method("max", 2, |_, args| {
                Ok(Value::Number(args.iter().map(to_number).fold(
                    f64::NEG_INFINITY,
                    |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) },
                )))
            })
            .method("min", 2, |_, args| {
                Ok(Value::Number(args.iter().map(to_number).fold(
                    f64::INFINITY,
                    |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) },
                )))
            }),
    )
}

fn number_prototype_holder() -> Arc<NativeHolderDef> {
    Arc::new(
        NativeHolderDef::new("Number.prototype")
            .method("toString", 1, |this, args| {
                let radix = match arg(args, 0) {
                    Value::Undefined => 10,
                    r => coerce_int(&r),
                };
                number_in_radix(to_number(this), radix).map(|s| Value::string(&s))
            })
            .method("valueOf", 0, |this, _| Ok(Value::Number(to_number(this))))
            .method("toFixed", 1, |this, args| {
                let digits = coerce_int(&arg(args, 0));
                if !(0..=20).contains(&digits) {
                    return Err(VmError::TypeError(format!(
                        "toFixed digits out of range: {}",
                        digits
                    )));
                }
                Ok(Value::string(&format!(
                    "{:.*}",
                    digits as usize,
                    to_number(this)
                )))
            }),
    )
}

fn number_in_radix(n: f64, radix: i32) -> VmResult<String> {
    if radix == 10 {
        return Ok(number_to_string(n));
    }
    if !(2..=36).contains(&radix) {
        return Err(VmError::TypeError(format!("invalid radix: {}", radix)));
    }
    if !n.is_finite() || n != n.trunc() {
        return Err(VmError::NotImplemented(
            "Number.toString with a fractional radix".to_string(),
        ));
    }
    // Integral doubles below 2^128 convert to u128 exactly.
    if n.abs() >= u128::MAX as f64 {
        return Err(VmError::NotImplemented(
            "Number.toString with a radix beyond 128-bit magnitudes".to_string(),
        ));
    }
    let negative = n < 0.0;
    let mut magnitude = n.abs() as u128;
    let mut digits = Vec::new();
    loop {
        let d = (magnitude % radix as u128) as u32;
        digits.push(std::char::from_digit(d, radix as u32).unwrap_or('0'));
        magnitude /= radix as u128;
        if magnitude == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    Ok(digits.into_iter().rev().collect())
}

fn string_prototype_holder() -> Arc<NativeHolderDef> {
    fn receiver(this: &Value) -> String {
        to_string(this)
    }
    Arc::new(
        NativeHolderDef::new("String.prototype")
            .method("charAt", 1, |this, args| {
                let index = to_number(&arg(args, 0));
                let s = receiver(this);
                let c = if index >= 0.0 {
                    s.chars().nth(index as usize)
                } else {
                    None
                };
                Ok(Value::string(&c.map(String::from).unwrap_or_default()))
            })
            .method("indexOf", 1, |this, args| {
                let s = receiver(this);
                let needle = key_arg(args, 0);
                Ok(Value::Int(
                    s.find(&needle)
                        .map_or(-1, |byte| s[..byte].chars().count() as i32),
                ))
            })
            .method("toUpperCase", 0, |this, _| {
                Ok(Value::string(&receiver(this).to_uppercase()))
            })
            .method("toLowerCase", 0, |this, _| {
                Ok(Value::string(&receiver(this).to_lowercase()))
            }),
    )
}

fn vector_holder(label: &'static str) -> Arc<NativeHolderDef> {
    Arc::new(
        NativeHolderDef::new(label)
            .unimplemented("push", 1)
            .unimplemented("pop", 0)
            .unimplemented("_reverse", 0)
            .unimplemented("_spliceHelper", 4),
    )
}

fn vector_statics(label: &str) -> NativeHolderDef {
    NativeHolderDef::new(label)
        .unimplemented("_every", 3)
        .unimplemented("_forEach", 3)
        .unimplemented("_some", 3)
        .unimplemented("_sort", 2)
}

// ============================================================================
// Class definitions
// ============================================================================

fn object_class() -> NativeClassDef {
    let prototype = NativeHolderDef::new("Object.prototype")
        .method("hasOwnProperty", 1, |this, args| {
            Ok(Value::Bool(has_own_property(this, &key_arg(args, 0))))
        })
        .method("propertyIsEnumerable", 1, |this, args| {
            Ok(Value::Bool(property_is_enumerable(this, &key_arg(args, 0))))
        })
        .method("isPrototypeOf", 1, |this, args| {
            Ok(Value::Bool(is_prototype_of(this, &arg(args, 0))))
        })
        .method("setPropertyIsEnumerable", 2, |this, args| {
            let obj = object_receiver(this, "setPropertyIsEnumerable")?;
            obj.set_enumerable(&key_arg(args, 0), to_boolean(&arg(args, 1)));
            Ok(Value::Undefined)
        })
        .method("toString", 0, |this, _| {
            Ok(Value::string(&match this {
                Value::Object(obj) => format!("[object {}]", class_name_of(obj)),
                other => to_string(other),
            }))
        })
        .method("valueOf", 0, |this, _| Ok(this.clone()));

    let statics = NativeHolderDef::new("Object")
        .method("_hasOwnProperty", 2, |_, args| {
            Ok(Value::Bool(has_own_property(&arg(args, 0), &key_arg(args, 1))))
        })
        .method("_propertyIsEnumerable", 2, |_, args| {
            Ok(Value::Bool(property_is_enumerable(&arg(args, 0), &key_arg(args, 1))))
        })
        .method("_setPropertyIsEnumerable", 3, |_, args| {
            let obj = object_receiver(&arg(args, 0), "_setPropertyIsEnumerable")?;
            obj.set_enumerable(&key_arg(args, 1), to_boolean(&arg(args, 2)));
            Ok(Value::Undefined)
        })
        .method("_isPrototypeOf", 2, |_, args| {
            Ok(Value::Bool(is_prototype_of(&arg(args, 0), &arg(args, 1))))
        })
        .method("_toString", 1, |_, args| {
            Ok(Value::string(&match arg(args, 0) {
                Value::Object(obj) => format!("[object {}]", class_name_of(&obj)),
                other => to_string(&other),
            }))
        });

    NativeClassDef::new(OBJECT_CLASS_ID)
        .constructor(
            NativeConstructorDef::new("Object", 1, |this, args| match args.first() {
                Some(v) if !v.is_nullish() => Ok(v.clone()),
                _ => Ok(this.clone()),
            })
            .fixed_template()
            .prototype(prototype),
        )
        .statics(statics)
        .coercion(Coercion::Object)
}

fn class_class() -> NativeClassDef {
    let prototype = NativeHolderDef::new("Class.prototype").getter("asPrototype", |this, _| {
        let obj = object_receiver(this, "Class.prototype")?;
        let class = obj.owner_class().ok_or_else(|| {
            VmError::TypeError("prototype requested from a non-class object".to_string())
        })?;
        Ok(class
            .instance_delegate()
            .cloned()
            .map_or(Value::Undefined, Value::Object))
    });
    NativeClassDef::new(CLASS_CLASS_ID).constructor(
        NativeConstructorDef::new("Class", 0, not_constructible("Class"))
            .construct_with(not_constructible("Class"))
            .prototype(prototype),
    )
}

fn function_class() -> NativeClassDef {
    let prototype = NativeHolderDef::new("Function.prototype")
        .getter("asPrototype", |this, _| {
            let f = this
                .as_function()
                .ok_or_else(|| VmError::TypeError("prototype of a non-function".to_string()))?;
            Ok(f.template().map_or(Value::Undefined, Value::Object))
        })
        .setter("asPrototype", |this, args| {
            let f = this
                .as_function()
                .ok_or_else(|| VmError::TypeError("prototype of a non-function".to_string()))?;
            let template = arg(args, 0)
                .as_object()
                .cloned()
                .ok_or_else(|| VmError::TypeError("prototype must be an object".to_string()))?;
            f.set_template(template)?;
            Ok(Value::Undefined)
        })
        .getter("length", |this, _| {
            Ok(this
                .as_function()
                .map_or(Value::Int(0), |f| Value::Int(f.arity() as i32)))
        })
        .unimplemented("call", 1)
        .unimplemented("apply", 2);
    NativeClassDef::new(FUNCTION_CLASS_ID)
        .constructor(
            NativeConstructorDef::new("Function", 1, not_implemented("Function constructor"))
                .fixed_template(),
        )
        .instance_natives(vec![Arc::new(prototype)])
}

fn boolean_class() -> NativeClassDef {
    let prototype = NativeHolderDef::new("Boolean.prototype")
        .method("toString", 0, |this, _| {
            Ok(Value::string(if to_boolean(this) { "true" } else { "false" }))
        })
        .method("valueOf", 0, |this, _| Ok(Value::Bool(to_boolean(this))));
    NativeClassDef::new("BooleanClass")
        .constructor(
            NativeConstructorDef::new("Boolean", 1, |_, args| {
                Ok(Value::Bool(to_boolean(&arg(args, 0))))
            })
            .construct_with(|_, args| Ok(Value::Bool(to_boolean(&arg(args, 0)))))
            .fixed_template()
            .prototype(prototype),
        )
        .coerce_with(Coercion::Boolean)
        .default_value(Value::Bool(false))
}

fn method_closure_class() -> NativeClassDef {
    NativeClassDef::new("MethodClosureClass").constructor(NativeConstructorDef::new(
        "MethodClosure",
        0,
        not_constructible("MethodClosure"),
    ))
}

fn namespace_class() -> NativeClassDef {
    NativeClassDef::new("NamespaceClass").constructor(
        NativeConstructorDef::new("Namespace", 2, |this, _| Ok(this.clone())).prototype(
            NativeHolderDef::new("Namespace.prototype")
                .getter("prefix", not_implemented("Namespace.prefix"))
                .getter("uri", not_implemented("Namespace.uri")),
        ),
    )
}

fn number_class() -> NativeClassDef {
    NativeClassDef::new("NumberClass")
        .constructor(
            NativeConstructorDef::new("Number", 1, |_, args| {
                Ok(Value::Number(match args.first() {
                    Some(v) => to_number(v),
                    None => 0.0,
                }))
            })
            .construct_with(|_, args| {
                Ok(Value::Number(args.first().map_or(0.0, to_number)))
            })
            .fixed_template(),
        )
        .statics(
            NativeHolderDef::new("Number")
                .method("_numberToString", 2, |_, args| {
                    let radix = match arg(args, 1) {
                        Value::Undefined => 10,
                        r => coerce_int(&r),
                    };
                    number_in_radix(to_number(&arg(args, 0)), radix).map(|s| Value::string(&s))
                })
                .unimplemented("_minValue", 0)
                .unimplemented("_convert", 3),
        )
        .static_natives(vec![math_holder()])
        .instance_natives(vec![number_prototype_holder()])
        .coerce_with(Coercion::Number)
        .default_value(Value::Number(0.0))
}

fn int_class() -> NativeClassDef {
    NativeClassDef::new("intClass")
        .constructor(
            NativeConstructorDef::new("int", 1, |_, args| Ok(Value::Int(coerce_int(&arg(args, 0)))))
                .construct_with(|_, args| Ok(Value::Int(coerce_int(&arg(args, 0))))),
        )
        .static_natives(vec![math_holder()])
        .instance_natives(vec![number_prototype_holder()])
        .coerce_with(Coercion::Int)
        .default_value(Value::Int(0))
}

fn uint_class() -> NativeClassDef {
    NativeClassDef::new("uintClass")
        .constructor(
            NativeConstructorDef::new("uint", 1, |_, args| {
                Ok(Value::UInt(coerce_uint(&arg(args, 0))))
            })
            .construct_with(|_, args| Ok(Value::UInt(coerce_uint(&arg(args, 0))))),
        )
        .static_natives(vec![math_holder()])
        .instance_natives(vec![number_prototype_holder()])
        .coerce_with(Coercion::UInt)
        .default_value(Value::UInt(0))
}

fn string_class() -> NativeClassDef {
    let prototype = NativeHolderDef::new("String.prototype")
        .getter("length", |this, _| {
            Ok(Value::Int(to_string(this).chars().count() as i32))
        });
    NativeClassDef::new("StringClass")
        .constructor(
            NativeConstructorDef::new("String", 1, |_, args| {
                Ok(Value::string(&args.first().map(to_string).unwrap_or_default()))
            })
            .construct_with(|_, args| {
                Ok(Value::string(&args.first().map(to_string).unwrap_or_default()))
            })
            .fixed_template()
            .prototype(prototype),
        )
        .statics(NativeHolderDef::new("String").method("fromCharCode", 1, |_, args| {
            let s: String = args
                .iter()
                .map(|v| char::from_u32(coerce_uint(v) & 0xFFFF).unwrap_or('\u{FFFD}'))
                .collect();
            Ok(Value::string(&s))
        }))
        .instance_natives(vec![string_prototype_holder()])
        .coerce_with(Coercion::String)
}

fn array_class() -> NativeClassDef {
    let prototype = NativeHolderDef::new("Array.prototype")
        .getter("length", not_implemented("Array.length"))
        .setter("length", not_implemented("Array.length"))
        .unimplemented("push", 1)
        .unimplemented("pop", 0)
        .unimplemented("unshift", 1);
    NativeClassDef::new("ArrayClass")
        .constructor(
            NativeConstructorDef::new("Array", 1, |this, _| Ok(this.clone()))
                .fixed_template()
                .prototype(prototype),
        )
        .statics(
            NativeHolderDef::new("Array")
                .unimplemented("_pop", 1)
                .unimplemented("_reverse", 1)
                .unimplemented("_concat", 2)
                .unimplemented("_shift", 1)
                .unimplemented("_slice", 3)
                .unimplemented("_splice", 2),
        )
}

fn vector_class() -> NativeClassDef {
    NativeClassDef::new("VectorClass").constructor(NativeConstructorDef::new(
        "Vector",
        0,
        not_constructible("Vector"),
    ))
}

fn typed_vector_class(id: &str, ctor: &'static str, holder: &'static str) -> NativeClassDef {
    NativeClassDef::new(id)
        .constructor(NativeConstructorDef::new(ctor, 2, |this, _| Ok(this.clone())))
        .statics(vector_statics(ctor))
        .instance_natives(vec![vector_holder(holder)])
}

fn json_class() -> NativeClassDef {
    NativeClassDef::new("JSONClass")
        .constructor(NativeConstructorDef::new("JSON", 0, not_constructible("JSON")))
        .statics(
            NativeHolderDef::new("JSON")
                .unimplemented("parseCore", 1)
                .unimplemented("stringifySpecializedToString", 4),
        )
}

fn xml_class(id: &str, ctor: &'static str) -> NativeClassDef {
    NativeClassDef::new(id)
        .constructor(NativeConstructorDef::new(ctor, 1, not_implemented(ctor)))
        .inherit_natives()
}

/// Every builtin native class definition
pub fn builtin_classes() -> Vec<NativeClassDef> {
    vec![
        object_class(),
        class_class(),
        function_class(),
        boolean_class(),
        method_closure_class(),
        namespace_class(),
        number_class(),
        int_class(),
        uint_class(),
        string_class(),
        array_class(),
        vector_class(),
        typed_vector_class("ObjectVectorClass", "ObjectVector", "GenericVector"),
        typed_vector_class("IntVectorClass", "IntVector", "Int32Vector"),
        typed_vector_class("UIntVectorClass", "UIntVector", "Uint32Vector"),
        typed_vector_class("DoubleVectorClass", "DoubleVector", "Float64Vector"),
        json_class(),
        xml_class("XMLClass", "XML"),
        xml_class("XMLListClass", "XMLList"),
        xml_class("QNameClass", "QName"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::class::CallableStyle;
    use crate::vm::object::ScriptObject;
    use rustc_hash::FxHashSet;

    fn def(id: &str) -> NativeClassDef {
        builtin_classes()
            .into_iter()
            .find(|d| d.id() == id)
            .unwrap()
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let defs = builtin_classes();
        let ids: FxHashSet<_> = defs.iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids.len(), defs.len());
        assert_eq!(defs.len(), 20);
    }

    #[test]
    fn test_fixed_templates() {
        for id in ["ObjectClass", "FunctionClass", "BooleanClass", "NumberClass", "StringClass", "ArrayClass"] {
            assert!(def(id).constructor_def().unwrap().is_template_fixed(), "{}", id);
        }
        for id in ["Class", "intClass", "uintClass", "JSONClass", "XMLClass"] {
            assert!(!def(id).constructor_def().unwrap().is_template_fixed(), "{}", id);
        }
    }

    #[test]
    fn test_value_classes_coerce() {
        let parts = def("intClass").materialize();
        assert_eq!(parts.callable_style, CallableStyle::Coerce);
        assert_eq!(parts.coercion, Coercion::Int);
        assert_eq!(parts.default_value, Value::Int(0));

        let parts = def("ObjectClass").materialize();
        assert_eq!(parts.callable_style, CallableStyle::PassThrough);
    }

    #[test]
    fn test_object_prototype_members() {
        let parts = def("ObjectClass").materialize();
        let template = parts.constructor.unwrap().template().unwrap();
        let has_own = template.own_method("hasOwnProperty").unwrap();

        let obj = ScriptObject::with_proto(Some(template.clone()));
        obj.define_value("x", Value::Int(1));
        let this = Value::Object(obj.clone());
        assert_eq!(has_own.call(&this, &[Value::string("x")]).unwrap(), Value::Bool(true));
        assert_eq!(
            has_own.call(&this, &[Value::string("hasOwnProperty")]).unwrap(),
            Value::Bool(false)
        );

        let is_proto = template.own_method("isPrototypeOf").unwrap();
        assert_eq!(
            is_proto.call(&Value::Object(template), &[this]).unwrap(),
            Value::Bool(true)
        );
    }

    fn call(
        holder: &NativeHolderDef,
        name: &str,
        this: Value,
        args: &[Value],
    ) -> VmResult<Value> {
        holder.instantiate().own_method(name).unwrap().call(&this, args)
    }

    #[test]
    fn test_number_to_string_radix() {
        assert_eq!(number_in_radix(255.0, 16).unwrap(), "ff");
        assert_eq!(number_in_radix(-5.0, 2).unwrap(), "-101");
        assert_eq!(number_in_radix(1.5, 10).unwrap(), "1.5");
        assert_eq!(number_in_radix(0.0, 36).unwrap(), "0");
        assert_eq!(number_in_radix(35.0, 36).unwrap(), "z");
        assert!(number_in_radix(3.0, 1).is_err());
        assert!(number_in_radix(3.0, 37).is_err());
    }

    #[test]
    fn test_number_to_string_radix_beyond_u64() {
        assert_eq!(number_in_radix(1e20, 16).unwrap(), "56bc75e2d63100000");
        assert_eq!(number_in_radix(-1e20, 16).unwrap(), "-56bc75e2d63100000");
        assert!(matches!(
            number_in_radix(1e40, 16),
            Err(VmError::NotImplemented(_))
        ));
        assert!(matches!(
            number_in_radix(f64::INFINITY, 2),
            Err(VmError::NotImplemented(_))
        ));
        assert!(matches!(
            number_in_radix(0.5, 2),
            Err(VmError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_number_prototype_to_fixed() {
        let proto = number_prototype_holder();
        assert_eq!(
            call(&proto, "toFixed", Value::Number(3.14159), &[Value::Int(2)]).unwrap(),
            Value::string("3.14")
        );
        assert_eq!(
            call(&proto, "toFixed", Value::Int(7), &[]).unwrap(),
            Value::string("7")
        );
        for digits in [-1, 21] {
            assert!(matches!(
                call(&proto, "toFixed", Value::Number(1.0), &[Value::Int(digits)]),
                Err(VmError::TypeError(_))
            ));
        }
        assert_eq!(
            call(&proto, "toString", Value::Int(10), &[Value::Int(2)]).unwrap(),
            Value::string("1010")
        );
    }

    #[test]
    fn test_math_members() {
        let math = math_holder();
        let n = |name: &str, args: &[Value]| call(&math, name, Value::Undefined, args).unwrap();
        assert_eq!(n("abs", &[Value::Int(-3)]), Value::Number(3.0));
        assert_eq!(n("floor", &[Value::Number(1.7)]), Value::Number(1.0));
        assert_eq!(n("ceil", &[Value::Number(1.2)]), Value::Number(2.0));
        assert_eq!(n("round", &[Value::Number(-2.5)]), Value::Number(-2.0));
        assert_eq!(n("round", &[Value::Number(2.5)]), Value::Number(3.0));
        assert_eq!(n("pow", &[Value::Int(2), Value::Int(10)]), Value::Number(1024.0));
        assert_eq!(n("max", &[Value::Int(1), Value::Int(4)]), Value::Number(4.0));
        assert_eq!(n("min", &[]), Value::Number(f64::INFINITY));
        assert_eq!(n("max", &[]), Value::Number(f64::NEG_INFINITY));
        match n("max", &[Value::Int(1), Value::Number(f64::NAN)]) {
            Value::Number(v) => assert!(v.is_nan()),
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn test_string_members_count_chars() {
        let proto = string_prototype_holder();
        let this = Value::string("h\u{e9}llo \u{1f600}!");
        assert_eq!(
            call(&proto, "charAt", this.clone(), &[Value::Int(1)]).unwrap(),
            Value::string("\u{e9}")
        );
        assert_eq!(
            call(&proto, "charAt", this.clone(), &[Value::Int(6)]).unwrap(),
            Value::string("\u{1f600}")
        );
        assert_eq!(
            call(&proto, "charAt", this.clone(), &[Value::Int(-1)]).unwrap(),
            Value::string("")
        );
        assert_eq!(
            call(&proto, "charAt", this.clone(), &[Value::Int(40)]).unwrap(),
            Value::string("")
        );
        assert_eq!(
            call(&proto, "indexOf", this.clone(), &[Value::string("llo")]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            call(&proto, "indexOf", this.clone(), &[Value::string("!")]).unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            call(&proto, "indexOf", this.clone(), &[Value::string("z")]).unwrap(),
            Value::Int(-1)
        );
        assert_eq!(
            call(&proto, "toUpperCase", Value::string("h\u{e9}llo"), &[]).unwrap(),
            Value::string("H\u{c9}LLO")
        );
        assert_eq!(
            call(&proto, "toLowerCase", Value::string("ABC"), &[]).unwrap(),
            Value::string("abc")
        );
    }

    #[test]
    fn test_from_char_code_masks_to_16_bits() {
        let parts = def("StringClass").materialize();
        let from = parts.class_object.own_method("fromCharCode").unwrap();
        let s = from
            .call(&Value::Undefined, &[Value::Int(72), Value::Int(0x1_0069)])
            .unwrap();
        assert_eq!(s, Value::string("Hi"));
    }

    #[test]
    fn test_boolean_constructor_returns_primitive() {
        let parts = def("BooleanClass").materialize();
        let ctor = parts.constructor.unwrap();
        assert_eq!(ctor.construct(&[Value::Int(1)]).unwrap(), Value::Bool(true));
        assert_eq!(ctor.call(&Value::Undefined, &[]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_class_is_not_constructible() {
        let parts = def("Class").materialize();
        let ctor = parts.constructor.unwrap();
        assert!(matches!(ctor.construct(&[]), Err(VmError::NotConstructible(_))));
    }
}
