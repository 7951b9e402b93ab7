//! Member-level rules: methods, constructors, fields and enum constants.

use std::collections::BTreeMap;

use super::{CompatChecker, Findings};
use crate::compat::DiagnosticKind;
use crate::model::ApiModel;
use crate::signature::TypeReference;
use crate::unit::{FieldUnit, MethodUnit, TypeId, TypeUnit};

/// Exception roots whose subclasses are unchecked.
const UNCHECKED_ROOTS: &[&str] = &["java.lang.RuntimeException", "java.lang.Error"];

/// Subject string of a method or constructor: `a.B.m(int)`.
pub(super) fn method_subject(owner: &TypeUnit, method: &MethodUnit) -> String {
    format!("{}.{}", owner.qualified_name(), method.signature_key())
}

/// Subject string of a field or enum constant: `a.B#NAME`.
pub(super) fn field_subject(owner: &TypeUnit, field: &FieldUnit) -> String {
    format!("{}#{}", owner.qualified_name(), field.name)
}

/// Methods by signature key. The input is already filtered to the API.
fn keyed_methods(members: &[MethodUnit]) -> BTreeMap<&str, &MethodUnit> {
    members.iter().map(|m| (m.signature_key(), m)).collect()
}

fn keyed_fields(members: &[FieldUnit]) -> BTreeMap<&str, &FieldUnit> {
    members.iter().map(|f| (f.name.as_str(), f)).collect()
}

fn included_fields(model: &ApiModel, members: &[FieldUnit]) -> Vec<FieldUnit> {
    members
        .iter()
        .filter(|f| model.field_included(f))
        .cloned()
        .collect()
}

impl CompatChecker<'_> {
    // ------------------------------------------------------------------------
    // Methods
    // ------------------------------------------------------------------------

    /// Diff self methods (own plus hoisted); returns the added ones in
    /// name order.
    pub(super) fn check_methods(
        &self,
        old_unit: &TypeUnit,
        new_unit: &TypeUnit,
        findings: &mut Findings,
    ) -> Vec<MethodUnit> {
        let old_methods = keyed_methods(self.baseline.self_methods(old_unit.id()));
        let new_methods = keyed_methods(self.candidate.self_methods(new_unit.id()));

        for (key, old) in &old_methods {
            match new_methods.get(key) {
                Some(new) => self.check_method_pair(old_unit, new_unit, old, new, findings),
                None => {
                    if self.ancestor_still_declares(new_unit.id(), old) {
                        tracing::trace!(method = %key, "removal absorbed by ancestor");
                        continue;
                    }
                    findings.report(
                        DiagnosticKind::RemovedMethod,
                        method_subject(old_unit, old),
                        format!("Removed public method {}", method_subject(old_unit, old)),
                        old.position.clone(),
                    );
                }
            }
        }

        let mut added = Vec::new();
        for (key, new) in &new_methods {
            if old_methods.contains_key(key) {
                continue;
            }
            let absorbed = self
                .baseline_ancestor_method(old_unit.id(), new)
                .is_some_and(|inherited| inherited.modifiers.is_abstract == new.modifiers.is_abstract);
            if absorbed {
                continue;
            }
            findings.report(
                DiagnosticKind::AddedMethod,
                method_subject(new_unit, new),
                format!("Added public method {}", method_subject(new_unit, new)),
                new.position.clone(),
            );
            added.push((*new).clone());
        }
        added.sort_by(|a, b| a.name.cmp(&b.name));
        added
    }

    /// Whether a real ancestor of the candidate type still exposes a
    /// matching method: a superclass, or an interface of the type or of
    /// one of its superclasses. The type itself never counts.
    fn ancestor_still_declares(&self, candidate_type: TypeId, removed: &MethodUnit) -> bool {
        let model = self.candidate;
        let chain = model.superclass_chain(candidate_type);
        let matches = |m: &MethodUnit| {
            m.signature_key() == removed.signature_key()
                && (!self.options.require_documented_ancestor || m.is_documented())
        };
        chain
            .iter()
            .skip(1)
            .any(|pair| model.self_methods(pair.unit).iter().any(&matches))
            || chain.iter().any(|pair| {
                model
                    .effective_interfaces(pair.unit)
                    .iter()
                    .any(|i| model.methods(*i).iter().any(&matches))
            })
    }

    /// Method with the same signature exposed by a superclass of the
    /// baseline type, excluding the type itself.
    fn baseline_ancestor_method(&self, baseline_type: TypeId, added: &MethodUnit) -> Option<&MethodUnit> {
        let model = self.baseline;
        model
            .superclass_chain(baseline_type)
            .iter()
            .skip(1)
            .find_map(|pair| {
                model
                    .self_methods(pair.unit)
                    .iter()
                    .find(|m| m.signature_key() == added.signature_key())
            })
    }

    fn check_method_pair(
        &self,
        old_unit: &TypeUnit,
        new_unit: &TypeUnit,
        old: &MethodUnit,
        new: &MethodUnit,
        findings: &mut Findings,
    ) {
        let subject = method_subject(new_unit, new);
        let position = new.position.clone();
        let what = if new.is_constructor() { "Constructor" } else { "Method" };
        let mut report = |kind: DiagnosticKind, message: String| {
            findings.report(kind, subject.clone(), message, position.clone());
        };

        if let (Some(old_ret), Some(new_ret)) = (&old.return_type, &new.return_type) {
            if !self.return_type_compatible(old_ret, new_ret) {
                report(
                    DiagnosticKind::ChangedType,
                    format!("{} {} has changed return type from {} to {}", what, subject, old_ret, new_ret),
                );
            }
        }

        let (o, n) = (old.modifiers, new.modifiers);
        if o.is_abstract != n.is_abstract {
            report(
                DiagnosticKind::ChangedAbstract,
                format!("{} {} has changed 'abstract' qualifier", what, subject),
            );
        }
        if o.is_native != n.is_native {
            report(
                DiagnosticKind::ChangedNative,
                format!("{} {} has changed 'native' qualifier", what, subject),
            );
        }
        if !o.is_final && n.is_final && !o.is_static && !old_unit.is_effectively_final() {
            report(
                DiagnosticKind::ChangedFinal,
                format!("{} {} has added 'final' qualifier", what, subject),
            );
        }
        if o.is_static != n.is_static {
            report(
                DiagnosticKind::ChangedStatic,
                format!("{} {} has changed 'static' qualifier", what, subject),
            );
        }
        if old.visibility != new.visibility {
            report(
                DiagnosticKind::ChangedScope,
                format!(
                    "{} {} changed visibility from {} to {}",
                    what, subject, old.visibility, new.visibility
                ),
            );
        }
        if old.deprecated != new.deprecated {
            report(
                DiagnosticKind::ChangedDeprecated,
                format!(
                    "{} {} has changed deprecation state {} --> {}",
                    what, subject, old.deprecated, new.deprecated
                ),
            );
        }
        if o.is_synchronized != n.is_synchronized {
            report(
                DiagnosticKind::ChangedSynchronized,
                format!("{} {} has changed 'synchronized' qualifier", what, subject),
            );
        }

        let finalizer = new.name == "finalize" && new.params.is_empty();
        if !finalizer {
            let old_throws = checked_exceptions(self.baseline, &old.throws);
            let new_throws = checked_exceptions(self.candidate, &new.throws);
            for exception in old_throws.iter().filter(|e| !new_throws.contains(e)) {
                report(
                    DiagnosticKind::ChangedThrows,
                    format!("{} {} no longer throws exception {}", what, subject, exception),
                );
            }
            for exception in new_throws.iter().filter(|e| !old_throws.contains(e)) {
                report(
                    DiagnosticKind::ChangedThrows,
                    format!("{} {} added thrown exception {}", what, subject, exception),
                );
            }
        }
    }

    /// Exact match, or covariant narrowing between reference types.
    fn return_type_compatible(&self, old: &TypeReference, new: &TypeReference) -> bool {
        if old.full_name() == new.full_name() {
            return true;
        }
        if old.is_primitive() || new.is_primitive() || old.dimensions != new.dimensions {
            return false;
        }
        self.candidate
            .lookup(&new.name)
            .is_some_and(|id| self.candidate.is_assignable_to(id, &old.name))
    }

    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    /// Diff declared constructors; returns the added ones in signature order.
    pub(super) fn check_constructors(
        &self,
        old_unit: &TypeUnit,
        new_unit: &TypeUnit,
        findings: &mut Findings,
    ) -> Vec<MethodUnit> {
        let old_ctors = keyed_methods(self.baseline.constructors(old_unit.id()));
        let new_ctors = keyed_methods(self.candidate.constructors(new_unit.id()));

        for (key, old) in &old_ctors {
            match new_ctors.get(key) {
                Some(new) => self.check_method_pair(old_unit, new_unit, old, new, findings),
                None => findings.report(
                    DiagnosticKind::RemovedMethod,
                    method_subject(old_unit, old),
                    format!("Removed public constructor {}", method_subject(old_unit, old)),
                    old.position.clone(),
                ),
            }
        }

        let mut added = Vec::new();
        for (key, new) in &new_ctors {
            if !old_ctors.contains_key(key) {
                findings.report(
                    DiagnosticKind::AddedMethod,
                    method_subject(new_unit, new),
                    format!("Added public constructor {}", method_subject(new_unit, new)),
                    new.position.clone(),
                );
                added.push((*new).clone());
            }
        }
        added
    }

    // ------------------------------------------------------------------------
    // Fields and enum constants
    // ------------------------------------------------------------------------

    /// Diff self fields (own plus hoisted), then declared enum constants.
    pub(super) fn check_fields(&self, old_unit: &TypeUnit, new_unit: &TypeUnit, findings: &mut Findings) {
        self.check_field_set(
            old_unit,
            new_unit,
            self.baseline.self_fields(old_unit.id()),
            self.candidate.self_fields(new_unit.id()),
            ("field", "public field"),
            findings,
        );
        self.check_field_set(
            old_unit,
            new_unit,
            &included_fields(self.baseline, &old_unit.enum_constants),
            &included_fields(self.candidate, &new_unit.enum_constants),
            ("enum constant", "enum constant"),
            findings,
        );
    }

    fn check_field_set(
        &self,
        old_unit: &TypeUnit,
        new_unit: &TypeUnit,
        old_members: &[FieldUnit],
        new_members: &[FieldUnit],
        (removed_label, added_label): (&str, &str),
        findings: &mut Findings,
    ) {
        let old_fields = keyed_fields(old_members);
        let new_fields = keyed_fields(new_members);

        for (name, old) in &old_fields {
            match new_fields.get(name) {
                Some(new) => check_field_pair(new_unit, old, new, findings),
                None => findings.report(
                    DiagnosticKind::RemovedField,
                    field_subject(old_unit, old),
                    format!("Removed {} {}", removed_label, field_subject(old_unit, old)),
                    old.position.clone(),
                ),
            }
        }
        for (name, new) in &new_fields {
            if !old_fields.contains_key(name) {
                findings.report(
                    DiagnosticKind::AddedField,
                    field_subject(new_unit, new),
                    format!("Added {} {}", added_label, field_subject(new_unit, new)),
                    new.position.clone(),
                );
            }
        }
    }
}

fn check_field_pair(new_unit: &TypeUnit, old: &FieldUnit, new: &FieldUnit, findings: &mut Findings) {
    let subject = field_subject(new_unit, new);
    let position = new.position.clone();
    let mut report = |kind: DiagnosticKind, message: String| {
        findings.report(kind, subject.clone(), message, position.clone());
    };

    if old.field_type.full_name() != new.field_type.full_name() {
        report(
            DiagnosticKind::ChangedType,
            format!(
                "Field {} has changed type from {} to {}",
                subject, old.field_type, new.field_type
            ),
        );
    }
    if old.constant_value != new.constant_value {
        report(
            DiagnosticKind::ChangedValue,
            format!(
                "Field {} has changed value from {} to {}",
                subject,
                old.constant_value.as_deref().unwrap_or("nothing"),
                new.constant_value.as_deref().unwrap_or("nothing")
            ),
        );
    }

    let (o, n) = (old.modifiers, new.modifiers);
    if o.is_static != n.is_static {
        report(
            DiagnosticKind::ChangedStatic,
            format!("Field {} has changed 'static' qualifier", subject),
        );
    }
    if !o.is_final && n.is_final {
        report(
            DiagnosticKind::AddedFinal,
            format!("Field {} has added 'final' qualifier", subject),
        );
    } else if o.is_final && !n.is_final {
        report(
            DiagnosticKind::RemovedFinal,
            format!("Field {} has removed 'final' qualifier", subject),
        );
    }
    if o.is_transient != n.is_transient {
        report(
            DiagnosticKind::ChangedTransient,
            format!("Field {} has changed 'transient' qualifier", subject),
        );
    }
    if o.is_volatile != n.is_volatile {
        report(
            DiagnosticKind::ChangedVolatile,
            format!("Field {} has changed 'volatile' qualifier", subject),
        );
    }
    if old.visibility != new.visibility {
        report(
            DiagnosticKind::ChangedScope,
            format!(
                "Field {} changed visibility from {} to {}",
                subject, old.visibility, new.visibility
            ),
        );
    }
    if old.deprecated != new.deprecated {
        report(
            DiagnosticKind::ChangedDeprecated,
            format!(
                "Field {} has changed deprecation state {} --> {}",
                subject, old.deprecated, new.deprecated
            ),
        );
    }
}

/// Names of the checked exceptions in `throws`, sorted.
///
/// An exception the model cannot place is treated as checked.
fn checked_exceptions(model: &ApiModel, throws: &[TypeReference]) -> Vec<String> {
    let mut checked: Vec<String> = throws
        .iter()
        .filter(|exception| {
            let unchecked = model.lookup(&exception.name).is_some_and(|id| {
                UNCHECKED_ROOTS
                    .iter()
                    .any(|root| model.extends_class(id, root))
            });
            !unchecked && !UNCHECKED_ROOTS.contains(&exception.name.as_str())
        })
        .map(|exception| exception.name.clone())
        .collect();
    checked.sort();
    checked.dedup();
    checked
}
