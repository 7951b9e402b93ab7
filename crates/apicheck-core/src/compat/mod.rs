//! Compatibility checking between a baseline and a candidate API model.
//!
//! The checker is a pure function over two frozen [`ApiModel`]s. It never
//! stops at the first problem: every rule that fires contributes one
//! [`Diagnostic`], and a pair is *consistent* when none of them is breaking.
//!
//! Three levels are provided:
//!
//! - [`CompatChecker::check_type`]: one baseline/candidate type pair,
//! - [`CompatChecker::check_package`]: all included types of a package pair,
//! - [`CompatChecker::check_api`]: every package of both models.
//!
//! With [`CheckOptions::produce_delta`] set, package and API checks also
//! return *delta units*: shallow clones of candidate types carrying only
//! their newly added constructors and methods.

mod diagnostic;
mod members;

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::model::ApiModel;
use crate::types::SourcePosition;
use crate::unit::{MethodUnit, PackageUnit, TypeId, TypeUnit};

pub use diagnostic::{sort_diagnostics, Diagnostic, DiagnosticKind, Severity};

// ============================================================================
// Options and Results
// ============================================================================

/// Knobs for a compatibility run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Collect delta units for changed and added types.
    pub produce_delta: bool,
    /// Check type pairs on the rayon pool.
    pub parallel: bool,
    /// A removed method is only absorbed by an ancestor declaration that
    /// carries documentation.
    pub require_documented_ancestor: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            produce_delta: false,
            parallel: false,
            require_documented_ancestor: true,
        }
    }
}

impl CheckOptions {
    pub fn with_delta(mut self) -> Self {
        self.produce_delta = true;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_require_documented_ancestor(mut self, require: bool) -> Self {
        self.require_documented_ancestor = require;
        self
    }
}

/// Result of comparing one type pair.
#[derive(Debug, Clone, Default)]
pub struct TypeCheck {
    pub consistent: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Constructors present only in the candidate, by signature.
    pub new_constructors: Vec<MethodUnit>,
    /// Methods present only in the candidate (and not absorbed), by name.
    pub new_methods: Vec<MethodUnit>,
}

/// Result of comparing one package pair.
#[derive(Debug, Clone, Default)]
pub struct PackageCheck {
    pub consistent: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Delta units, sorted by qualified name. Empty unless requested.
    pub delta: Vec<TypeUnit>,
    pub types_checked: usize,
}

/// Result of comparing two whole models.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiCheck {
    pub consistent: bool,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    pub delta: Vec<TypeUnit>,
    pub packages_checked: usize,
    pub types_checked: usize,
}

/// Diagnostic accumulator for one comparison.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    diagnostics: Vec<Diagnostic>,
}

impl Findings {
    pub(crate) fn report(
        &mut self,
        kind: DiagnosticKind,
        subject: String,
        message: String,
        position: SourcePosition,
    ) {
        tracing::trace!(kind = %kind, subject = %subject, "diagnostic");
        self.diagnostics.push(Diagnostic::new(kind, subject, message, position));
    }

    fn into_sorted(mut self) -> Vec<Diagnostic> {
        sort_diagnostics(&mut self.diagnostics);
        self.diagnostics
    }
}

fn consistent(diagnostics: &[Diagnostic]) -> bool {
    !diagnostics.iter().any(Diagnostic::is_breaking)
}

// ============================================================================
// Checker
// ============================================================================

/// Compares a baseline model against a candidate model.
#[derive(Debug, Clone, Copy)]
pub struct CompatChecker<'a> {
    baseline: &'a ApiModel,
    candidate: &'a ApiModel,
    options: CheckOptions,
}

impl<'a> CompatChecker<'a> {
    pub fn new(baseline: &'a ApiModel, candidate: &'a ApiModel) -> Self {
        CompatChecker {
            baseline,
            candidate,
            options: CheckOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> CheckOptions {
        self.options
    }

    // ------------------------------------------------------------------------
    // Type level
    // ------------------------------------------------------------------------

    /// Compare a baseline type with its candidate counterpart.
    ///
    /// A handle that does not resolve in its model is a caller error: it is
    /// logged and the result is marked inconsistent with no diagnostics.
    pub fn check_type(&self, baseline: TypeId, candidate: TypeId) -> TypeCheck {
        let (Some(old), Some(new)) = (
            self.baseline.type_unit(baseline),
            self.candidate.type_unit(candidate),
        ) else {
            tracing::warn!(?baseline, ?candidate, "check_type called with an unknown type handle");
            return TypeCheck {
                consistent: false,
                ..TypeCheck::default()
            };
        };

        let mut findings = Findings::default();
        self.check_declaration(old, new, &mut findings);
        self.check_interfaces(old, new, &mut findings);
        let new_methods = self.check_methods(old, new, &mut findings);
        let new_constructors = self.check_constructors(old, new, &mut findings);
        self.check_fields(old, new, &mut findings);
        self.check_superclass(old, new, &mut findings);

        let diagnostics = findings.into_sorted();
        TypeCheck {
            consistent: consistent(&diagnostics),
            diagnostics,
            new_constructors,
            new_methods,
        }
    }

    fn check_declaration(&self, old: &TypeUnit, new: &TypeUnit, findings: &mut Findings) {
        let subject = new.qualified_name().to_string();
        let mut report = |kind: DiagnosticKind, message: String| {
            findings.report(kind, subject.clone(), message, new.position.clone());
        };

        if old.kind != new.kind {
            report(
                DiagnosticKind::ChangedClass,
                format!(
                    "Class {} changed class/interface declaration ({} to {})",
                    subject, old.kind, new.kind
                ),
            );
        }
        if old.modifiers.is_abstract != new.modifiers.is_abstract {
            report(
                DiagnosticKind::ChangedAbstract,
                format!("Class {} changed abstract qualifier", subject),
            );
        }
        if !old.modifiers.is_final && new.modifiers.is_final {
            if !old.has_accessible_constructor() {
                report(
                    DiagnosticKind::AddedFinalUninstantiable,
                    format!(
                        "Class {} added final qualifier but was previously uninstantiable and therefore could not be subclassed",
                        subject
                    ),
                );
            } else {
                report(
                    DiagnosticKind::AddedFinal,
                    format!("Class {} added final qualifier", subject),
                );
            }
        } else if old.modifiers.is_final && !new.modifiers.is_final {
            report(
                DiagnosticKind::RemovedFinal,
                format!("Class {} removed final qualifier", subject),
            );
        }
        if old.modifiers.is_static != new.modifiers.is_static {
            report(
                DiagnosticKind::ChangedStatic,
                format!("Class {} changed static qualifier", subject),
            );
        }
        if old.visibility != new.visibility {
            report(
                DiagnosticKind::ChangedScope,
                format!(
                    "Class {} scope changed from {} to {}",
                    subject, old.visibility, new.visibility
                ),
            );
        }
        if old.deprecated != new.deprecated {
            report(
                DiagnosticKind::ChangedDeprecated,
                format!(
                    "Class {} has changed deprecation state {} --> {}",
                    subject, old.deprecated, new.deprecated
                ),
            );
        }
    }

    fn check_interfaces(&self, old: &TypeUnit, new: &TypeUnit, findings: &mut Findings) {
        let subject = new.qualified_name();
        for name in declared_interface_names(self.baseline, old) {
            if !self.candidate.implements_interface(new.id(), &name) {
                findings.report(
                    DiagnosticKind::RemovedInterface,
                    subject.to_string(),
                    format!("Class {} no longer implements {}", subject, name),
                    new.position.clone(),
                );
            }
        }
        for name in declared_interface_names(self.candidate, new) {
            if !self.baseline.implements_interface(old.id(), &name) {
                findings.report(
                    DiagnosticKind::AddedInterface,
                    subject.to_string(),
                    format!("Added interface {} to class {}", name, subject),
                    new.position.clone(),
                );
            }
        }
    }

    fn check_superclass(&self, old: &TypeUnit, new: &TypeUnit, findings: &mut Findings) {
        let Some(old_super) = old
            .superclass()
            .and_then(|link| self.baseline.type_unit(link.target))
        else {
            return;
        };
        if old_super.qualified_name() == crate::signature::OBJECT {
            return;
        }
        if !self.candidate.extends_class(new.id(), old_super.qualified_name()) {
            let new_super = new
                .superclass()
                .and_then(|link| self.candidate.type_unit(link.target))
                .map(|unit| unit.qualified_name().to_string())
                .unwrap_or_else(|| "nothing".to_string());
            findings.report(
                DiagnosticKind::ChangedSuperclass,
                new.qualified_name().to_string(),
                format!(
                    "Class {} superclass changed from {} to {}",
                    new.qualified_name(),
                    old_super.qualified_name(),
                    new_super
                ),
                new.position.clone(),
            );
        }
    }

    // ------------------------------------------------------------------------
    // Package level
    // ------------------------------------------------------------------------

    /// Compare the included types of two packages.
    ///
    /// Types named in `ignore` (qualified names) are not diffed, but still
    /// count as present.
    pub fn check_package(
        &self,
        baseline: &PackageUnit,
        candidate: &PackageUnit,
        ignore: &HashSet<String>,
    ) -> PackageCheck {
        let old_types = included_types(self.baseline, baseline);
        let new_types = included_types(self.candidate, candidate);

        let mut findings = Findings::default();
        let mut pairs = Vec::new();
        for (name, old_id) in &old_types {
            match new_types.get(name) {
                Some(new_id) => {
                    if !ignore.contains(*name) {
                        pairs.push((*old_id, *new_id));
                    }
                }
                None => {
                    let position = self
                        .baseline
                        .type_unit(*old_id)
                        .map(|u| u.position.clone())
                        .unwrap_or_default();
                    findings.report(
                        DiagnosticKind::RemovedClass,
                        name.to_string(),
                        format!("Removed public type {}", name),
                        position,
                    );
                }
            }
        }

        let mut delta = Vec::new();
        for (name, new_id) in &new_types {
            if old_types.contains_key(name) {
                continue;
            }
            let Some(unit) = self.candidate.type_unit(*new_id) else {
                continue;
            };
            findings.report(
                DiagnosticKind::AddedClass,
                name.to_string(),
                format!("Added {} {}", unit.kind, name),
                unit.position.clone(),
            );
            if self.options.produce_delta {
                delta.push(unit.clone());
            }
        }

        let results: Vec<(TypeId, TypeCheck)> = if self.options.parallel {
            pairs
                .par_iter()
                .map(|(old, new)| (*new, self.check_type(*old, *new)))
                .collect()
        } else {
            pairs
                .iter()
                .map(|(old, new)| (*new, self.check_type(*old, *new)))
                .collect()
        };

        let mut diagnostics = findings.into_sorted();
        for (new_id, check) in results {
            diagnostics.extend(check.diagnostics);
            if !self.options.produce_delta {
                continue;
            }
            if check.new_constructors.is_empty() && check.new_methods.is_empty() {
                continue;
            }
            if let Some(unit) = self.candidate.type_unit(new_id) {
                delta.push(unit.delta(check.new_constructors, check.new_methods));
            }
        }
        sort_diagnostics(&mut diagnostics);
        delta.sort_by(|a, b| a.qualified_name().cmp(b.qualified_name()));

        tracing::debug!(
            package = candidate.name(),
            types = pairs.len(),
            diagnostics = diagnostics.len(),
            "checked package"
        );
        PackageCheck {
            consistent: consistent(&diagnostics),
            diagnostics,
            delta,
            types_checked: pairs.len(),
        }
    }

    // ------------------------------------------------------------------------
    // API level
    // ------------------------------------------------------------------------

    /// Compare every package of the two models.
    ///
    /// A package counts as present when it has at least one included type.
    pub fn check_api(&self, ignore: &HashSet<String>) -> ApiCheck {
        let old_packages = visible_packages(self.baseline);
        let new_packages = visible_packages(self.candidate);

        let mut result = ApiCheck::default();
        let mut findings = Findings::default();

        for (name, old_pkg) in &old_packages {
            match new_packages.get(name) {
                Some(new_pkg) => {
                    let check = self.check_package(old_pkg, new_pkg, ignore);
                    result.diagnostics.extend(check.diagnostics);
                    result.delta.extend(check.delta);
                    result.packages_checked += 1;
                    result.types_checked += check.types_checked;
                }
                None => findings.report(
                    DiagnosticKind::RemovedPackage,
                    name.to_string(),
                    format!("Removed package {}", name),
                    SourcePosition::unknown(),
                ),
            }
        }
        for (name, new_pkg) in &new_packages {
            if old_packages.contains_key(name) {
                continue;
            }
            findings.report(
                DiagnosticKind::AddedPackage,
                name.to_string(),
                format!("Added package {}", name),
                SourcePosition::unknown(),
            );
            if self.options.produce_delta {
                for id in included_types(self.candidate, new_pkg).into_values() {
                    if let Some(unit) = self.candidate.type_unit(id) {
                        result.delta.push(unit.clone());
                    }
                }
            }
        }

        result.diagnostics.extend(findings.into_sorted());
        sort_diagnostics(&mut result.diagnostics);
        result
            .delta
            .sort_by(|a, b| a.qualified_name().cmp(b.qualified_name()));
        result.consistent = consistent(&result.diagnostics);

        tracing::info!(
            packages = result.packages_checked,
            types = result.types_checked,
            diagnostics = result.diagnostics.len(),
            consistent = result.consistent,
            "API check complete"
        );
        result
    }
}

/// Included types of a package, by qualified name.
fn included_types<'m>(model: &'m ApiModel, package: &PackageUnit) -> BTreeMap<&'m str, TypeId> {
    package
        .types()
        .filter(|id| model.included(*id))
        .filter_map(|id| model.type_unit(id).map(|u| (u.qualified_name(), id)))
        .collect()
}

/// Packages with at least one included type, by name.
fn visible_packages(model: &ApiModel) -> BTreeMap<&str, &PackageUnit> {
    model
        .packages()
        .into_iter()
        .filter(|pkg| pkg.types().any(|id| model.included(id)))
        .map(|pkg| (pkg.name(), pkg))
        .collect()
}

/// Qualified names of a type's declared interfaces.
fn declared_interface_names(model: &ApiModel, unit: &TypeUnit) -> Vec<String> {
    unit.interfaces()
        .iter()
        .filter_map(|link| model.type_unit(link.target))
        .map(|iface| iface.qualified_name().to_string())
        .collect()
}
