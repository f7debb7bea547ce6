//! Class verification
//!
//! Runs after templates are finalized and before bindings are applied.
//! Reports native traits that no holder implements and checks the structural
//! invariants of the class: base-class shape, template and constructor
//! agreement, and acyclic base and delegation chains.

use kiln_abc::Trait;
use std::sync::Arc;

use crate::vm::class::{Class, ClassKind};
use crate::vm::diagnostics::{Diagnostic, DiagnosticKind, TraitSet};
use crate::vm::domain::ApplicationDomain;
use crate::vm::object::ObjectRef;
use crate::vm::resolver::has_binding;
use crate::vm::{VmError, VmResult};

/// Outcome of verifying one class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Native traits without an implementation, as `(set, trait name)`
    pub missing_natives: Vec<(TraitSet, String)>,
    /// Broken structural invariants
    pub structural: Vec<String>,
    /// Trait sets whose holder list was inherited from the root class
    pub inherited_holders: Vec<TraitSet>,
}

impl VerifyReport {
    /// Total findings
    pub fn len(&self) -> usize {
        self.missing_natives.len() + self.structural.len() + self.inherited_holders.len()
    }

    /// Check if the class verified cleanly
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Verify `class`, emitting every finding to the domain's sink.
///
/// Under strict linking the first structural failure is returned as an
/// error instead.
pub fn verify_class(domain: &ApplicationDomain, class: &Arc<Class>) -> VmResult<VerifyReport> {
    let mut report = VerifyReport::default();

    for problem in structural_problems(class) {
        if domain.options().strict {
            return Err(VmError::ContractViolation(format!(
                "{}: {}",
                class.name(),
                problem
            )));
        }
        domain
            .diagnostics()
            .emit(Diagnostic::error(DiagnosticKind::Structural {
                class_name: class.name().to_string(),
                message: problem.clone(),
            }));
        report.structural.push(problem);
    }

    if class.is_native() && class.kind() != ClassKind::RootObject {
        for (set, inherited) in [
            (TraitSet::Static, class.static_natives().is_inherited()),
            (TraitSet::Instance, class.instance_natives().is_inherited()),
        ] {
            if inherited {
                domain
                    .diagnostics()
                    .emit(Diagnostic::warning(DiagnosticKind::InheritedNativeHolders {
                        class_name: class.name().to_string(),
                        set,
                    }));
                report.inherited_holders.push(set);
            }
        }
    }

    let info = class.info();
    check_natives(
        domain,
        class,
        TraitSet::Static,
        &info.traits,
        class.native_static_holders(),
        &mut report,
    );
    check_natives(
        domain,
        class,
        TraitSet::Instance,
        &info.instance.traits,
        class.native_instance_holders(),
        &mut report,
    );

    log::debug!(
        target: "kiln::verify",
        "verified {} ({} finding(s))",
        class.name(),
        report.len()
    );
    Ok(report)
}

fn check_natives(
    domain: &ApplicationDomain,
    class: &Class,
    set: TraitSet,
    traits: &[Trait],
    holders: &[ObjectRef],
    report: &mut VerifyReport,
) {
    for t in traits.iter().filter(|t| t.is_native()) {
        if has_binding(t, holders) {
            continue;
        }
        domain
            .diagnostics()
            .emit(Diagnostic::warning(DiagnosticKind::MissingNativeTrait {
                trait_name: t.name.to_string(),
                trait_kind: t.kind_label(),
                set,
                class_name: class.name().to_string(),
            }));
        report.missing_natives.push((set, t.name.to_string()));
    }
}

fn structural_problems(class: &Arc<Class>) -> Vec<String> {
    let mut problems = Vec::new();

    match (class.kind(), class.base_class()) {
        (ClassKind::RootObject, Some(base)) => problems.push(format!(
            "root object class has base class {}",
            base.name()
        )),
        (ClassKind::RootObject, None) => {}
        (_, None) => problems.push("has no base class".to_string()),
        (_, Some(base)) if Arc::ptr_eq(base, class) => {
            problems.push("is its own base class".to_string())
        }
        (_, Some(_)) => {}
    }
    if !class.base_chain_is_acyclic() {
        problems.push("base class chain is cyclic".to_string());
    }

    match (class.constructor(), class.instance_template()) {
        (None, _) => problems.push("has no instance constructor".to_string()),
        (Some(_), None) => problems.push("has no instance template".to_string()),
        (Some(ctor), Some(template)) => {
            let agrees = ctor
                .template()
                .map_or(false, |t| Arc::ptr_eq(&t, template));
            if !agrees {
                problems.push("instance template is not the constructor's template".to_string());
            }
            if !template.delegation_chain_is_acyclic() {
                problems.push("delegation chain of the instance template is cyclic".to_string());
            }
        }
    }
    problems
}
