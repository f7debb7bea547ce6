//! Native binding resolution
//!
//! Looks up the host implementation of a native trait in an ordered list of
//! holder objects. The first holder that owns a same-kind implementation
//! under the escaped name wins; later holders are never consulted.

use kiln_abc::{Trait, TraitKind};

use crate::vm::function::FunctionRef;
use crate::vm::object::ObjectRef;

/// Reserved names and the aliases native holders declare them under
const ESCAPED_NAMES: &[(&str, &str)] = &[("prototype", "asPrototype")];

/// Map a trait's local name to the name a native holder uses for it
pub fn escape_native_name(name: &str) -> &str {
    ESCAPED_NAMES
        .iter()
        .find(|&&(reserved, _)| reserved == name)
        .map_or(name, |&(_, alias)| alias)
}

/// Implementation held by `holder` for `t`, if it owns one of the right kind
fn lookup_in(holder: &ObjectRef, t: &Trait) -> Option<FunctionRef> {
    let name = escape_native_name(t.name.local_name());
    match t.kind {
        TraitKind::Method { .. } => holder.own_method(name),
        TraitKind::Getter { .. } => holder.own_getter(name),
        TraitKind::Setter { .. } => holder.own_setter(name),
        TraitKind::Slot { .. } => None,
    }
}

/// Whether `holder` owns a same-kind implementation of `t`
pub fn holder_matches(holder: &ObjectRef, t: &Trait) -> bool {
    let name = escape_native_name(t.name.local_name());
    match t.kind {
        TraitKind::Method { .. } => holder.has_own_method(name),
        TraitKind::Getter { .. } => holder.has_own_getter(name),
        TraitKind::Setter { .. } => holder.has_own_setter(name),
        TraitKind::Slot { .. } => false,
    }
}

/// Whether any holder implements `t`
pub fn has_binding(t: &Trait, holders: &[ObjectRef]) -> bool {
    holders.iter().any(|h| holder_matches(h, t))
}

/// Resolve `t` against `holders` in order
pub fn resolve_binding(t: &Trait, holders: &[ObjectRef]) -> Option<FunctionRef> {
    let found = holders.iter().find_map(|h| lookup_in(h, t));
    if found.is_none() {
        log::debug!(
            target: "kiln::natives",
            "cannot find {} in {} holder(s)",
            t,
            holders.len()
        );
    }
    found
}
