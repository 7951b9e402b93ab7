//! Inclusion verdicts: which units belong to the visible API.
//!
//! A unit is *included* when its declared visibility passes the policy's
//! [`ShowLevel`] and it is neither hidden nor removed.
//!
//! For types, `hidden` is decided by walking outward through enclosing
//! types, innermost first:
//!
//! - the first unit carrying a force-show marker ends the walk: not hidden,
//! - a unit whose package is hidden (explicit directive or a match in the
//!   policy's hidden-package globs) makes the type hidden,
//! - a unit with its own hidden directive makes the type hidden.
//!
//! `removed` is computed the same way against the removed directive.
//! Type verdicts are memoized per unit on the [`ApiModel`].
//!
//! Member verdicts only look at the member's own directives.

use std::fmt;
use std::str::FromStr;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::ApiModel;
use crate::unit::{Directives, FieldUnit, MethodUnit, TypeId, Visibility};

// ============================================================================
// Show Level
// ============================================================================

/// Lowest declared visibility that is part of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowLevel {
    #[default]
    Public,
    Protected,
    Package,
    Private,
}

impl ShowLevel {
    /// Whether `visibility` passes this bar.
    pub fn admits(self, visibility: Visibility) -> bool {
        let floor = match self {
            ShowLevel::Public => Visibility::Public,
            ShowLevel::Protected => Visibility::Protected,
            ShowLevel::Package => Visibility::PackagePrivate,
            ShowLevel::Private => Visibility::Private,
        };
        visibility.rank() >= floor.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShowLevel::Public => "public",
            ShowLevel::Protected => "protected",
            ShowLevel::Package => "package",
            ShowLevel::Private => "private",
        }
    }
}

impl fmt::Display for ShowLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowLevel {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(ShowLevel::Public),
            "protected" => Ok(ShowLevel::Protected),
            "package" => Ok(ShowLevel::Package),
            "private" => Ok(ShowLevel::Private),
            other => Err(ApiError::invalid_args(format!(
                "invalid show level '{}': expected public, protected, package or private",
                other
            ))),
        }
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Visibility bar plus hidden-package patterns, fixed at freeze time.
#[derive(Debug, Clone)]
pub struct VisibilityPolicy {
    show_level: ShowLevel,
    hidden_patterns: Vec<String>,
    hidden_packages: GlobSet,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        VisibilityPolicy::new(ShowLevel::default())
    }
}

impl VisibilityPolicy {
    pub fn new(show_level: ShowLevel) -> Self {
        VisibilityPolicy {
            show_level,
            hidden_patterns: Vec::new(),
            hidden_packages: GlobSet::empty(),
        }
    }

    /// Add a glob over package names (`com.example.internal*`) whose types are hidden.
    pub fn with_hidden_package(mut self, pattern: &str) -> Result<Self, ApiError> {
        self.hidden_patterns.push(pattern.to_string());
        self.hidden_packages = build_glob_set(&self.hidden_patterns)?;
        Ok(self)
    }

    pub fn show_level(&self) -> ShowLevel {
        self.show_level
    }

    pub fn hidden_patterns(&self) -> &[String] {
        &self.hidden_patterns
    }

    /// Whether a package name matches a hidden-package pattern.
    pub fn hides_package(&self, package: &str) -> bool {
        !self.hidden_patterns.is_empty() && self.hidden_packages.is_match(package)
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ApiError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ApiError::invalid_args(format!("invalid package pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ApiError::invalid_args(format!("invalid package patterns: {}", e)))
}

// ============================================================================
// Verdicts
// ============================================================================

/// Whether a unit is part of the visible API, and why not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct InclusionVerdict {
    pub hidden: bool,
    pub removed: bool,
    pub included: bool,
}

impl InclusionVerdict {
    fn new(bar_passed: bool, hidden: bool, removed: bool) -> Self {
        InclusionVerdict {
            hidden,
            removed,
            included: bar_passed && !hidden && !removed,
        }
    }

    /// Hidden or removed.
    pub fn is_suppressed(&self) -> bool {
        self.hidden || self.removed
    }
}

impl ApiModel {
    /// Verdict for a type, computed once per unit. Stubs are never included.
    pub fn verdict(&self, id: TypeId) -> InclusionVerdict {
        match self.cache(id) {
            Some(cache) => *cache.verdict.get_or_init(|| self.compute_verdict(id)),
            None => InclusionVerdict::default(),
        }
    }

    /// Whether a type is part of the visible API.
    pub fn included(&self, id: TypeId) -> bool {
        self.verdict(id).included
    }

    /// Verdict for a method or constructor, from its own directives.
    pub fn method_verdict(&self, method: &MethodUnit) -> InclusionVerdict {
        self.member_verdict(method.visibility, method.directives)
    }

    pub fn method_included(&self, method: &MethodUnit) -> bool {
        self.method_verdict(method).included
    }

    /// Verdict for a field or enum constant, from its own directives.
    pub fn field_verdict(&self, field: &FieldUnit) -> InclusionVerdict {
        self.member_verdict(field.visibility, field.directives)
    }

    pub fn field_included(&self, field: &FieldUnit) -> bool {
        self.field_verdict(field).included
    }

    fn member_verdict(&self, visibility: Visibility, directives: Directives) -> InclusionVerdict {
        InclusionVerdict::new(
            self.policy().show_level().admits(visibility),
            directives.hidden && !directives.force_show,
            directives.removed && !directives.force_show,
        )
    }

    fn compute_verdict(&self, id: TypeId) -> InclusionVerdict {
        let Some(unit) = self.type_unit(id) else {
            return InclusionVerdict::default();
        };
        if unit.is_stub() {
            return InclusionVerdict::default();
        }
        let hidden = self.suppressed_by(id, |d| d.hidden, true);
        let removed = self.suppressed_by(id, |d| d.removed, false);
        let verdict = InclusionVerdict::new(
            self.policy().show_level().admits(unit.visibility),
            hidden,
            removed,
        );
        tracing::trace!(qualified_name = %unit.qualified_name(), ?verdict, "computed verdict");
        verdict
    }

    /// Walk outward from `id` looking for a directive selected by `flag`.
    ///
    /// `use_patterns` makes packages matching the policy's hidden globs count.
    fn suppressed_by(
        &self,
        id: TypeId,
        flag: impl Fn(&Directives) -> bool,
        use_patterns: bool,
    ) -> bool {
        let mut current = self.type_unit(id);
        let mut depth = 0;
        while let Some(unit) = current {
            if unit.directives.force_show {
                return false;
            }
            if let Some(pkg) = unit.package.and_then(|p| self.package(p)) {
                if flag(&pkg.directives) || (use_patterns && self.policy().hides_package(pkg.name())) {
                    return true;
                }
            }
            if flag(&unit.directives) {
                return true;
            }
            depth += 1;
            if depth > self.type_count() {
                break;
            }
            current = unit.enclosing.and_then(|outer| self.type_unit(outer));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ApiGraph;
    use crate::signature::TypeReference;
    use crate::unit::TypeDeclaration;

    mod show_level_tests {
        use super::*;

        #[test]
        fn bar_ordering() {
            assert!(ShowLevel::Public.admits(Visibility::Public));
            assert!(!ShowLevel::Public.admits(Visibility::Protected));
            assert!(ShowLevel::Protected.admits(Visibility::Protected));
            assert!(!ShowLevel::Protected.admits(Visibility::PackagePrivate));
            assert!(ShowLevel::Package.admits(Visibility::PackagePrivate));
            assert!(ShowLevel::Private.admits(Visibility::Private));
        }

        #[test]
        fn parse_is_case_insensitive() {
            assert_eq!("Protected".parse::<ShowLevel>().unwrap(), ShowLevel::Protected);
            assert!("internal".parse::<ShowLevel>().is_err());
        }
    }

    mod policy_tests {
        use super::*;

        #[test]
        fn hidden_package_globs() {
            let policy = VisibilityPolicy::default()
                .with_hidden_package("com.example.internal*")
                .unwrap();
            assert!(policy.hides_package("com.example.internal"));
            assert!(policy.hides_package("com.example.internal.util"));
            assert!(!policy.hides_package("com.example.api"));
        }

        #[test]
        fn invalid_glob_is_rejected() {
            let err = VisibilityPolicy::default().with_hidden_package("a[").unwrap_err();
            assert!(matches!(err, ApiError::InvalidArguments { .. }));
        }
    }

    mod verdict_tests {
        use super::*;

        #[test]
        fn hidden_outer_hides_nested() {
            let mut g = ApiGraph::new();
            let pkg = g.register_package("a");
            let outer = g
                .register_type("a.Outer", TypeDeclaration::class(pkg).with_directives(Directives::hidden()))
                .unwrap();
            let inner = g
                .register_type("a.Outer.Inner", TypeDeclaration::class(pkg).nested_in(outer))
                .unwrap();
            g.resolve();
            let model = g.freeze(VisibilityPolicy::default()).unwrap();
            assert!(model.verdict(inner).hidden);
            assert!(!model.included(inner));
        }

        #[test]
        fn force_show_overrides_hidden_package() {
            let mut g = ApiGraph::new();
            let pkg = g.register_package("a");
            g.set_package_directives(pkg, Directives::hidden()).unwrap();
            let shown = g
                .register_type("a.Shown", TypeDeclaration::class(pkg).with_directives(Directives::force_show()))
                .unwrap();
            let other = g.register_type("a.Other", TypeDeclaration::class(pkg)).unwrap();
            g.resolve();
            let model = g.freeze(VisibilityPolicy::default()).unwrap();
            assert!(model.included(shown));
            assert!(!model.included(other));
        }

        #[test]
        fn removed_is_tracked_separately() {
            let mut g = ApiGraph::new();
            let pkg = g.register_package("a");
            let gone = g
                .register_type("a.Gone", TypeDeclaration::class(pkg).with_directives(Directives::removed()))
                .unwrap();
            g.resolve();
            let model = g.freeze(VisibilityPolicy::default()).unwrap();
            let verdict = model.verdict(gone);
            assert!(verdict.removed && !verdict.hidden && !verdict.included);
        }

        #[test]
        fn bar_filters_declared_visibility() {
            let mut g = ApiGraph::new();
            let pkg = g.register_package("a");
            let prot = g
                .register_type("a.P", TypeDeclaration::class(pkg).with_visibility(Visibility::Protected))
                .unwrap();
            g.resolve();
            let model = g.freeze(VisibilityPolicy::new(ShowLevel::Protected)).unwrap();
            assert!(model.included(prot));
        }

        #[test]
        fn policy_globs_hide_types() {
            let mut g = ApiGraph::new();
            let pkg = g.register_package("a.internal");
            let ty = g.register_type("a.internal.T", TypeDeclaration::class(pkg)).unwrap();
            g.resolve();
            let policy = VisibilityPolicy::default().with_hidden_package("a.internal").unwrap();
            let model = g.freeze(policy).unwrap();
            assert!(model.verdict(ty).hidden);
        }

        #[test]
        fn stubs_are_never_included() {
            let mut g = ApiGraph::new();
            let stub = g.reference_type("ext.Thing");
            g.resolve();
            let model = g
                .freeze(VisibilityPolicy::new(ShowLevel::Private))
                .unwrap();
            assert!(!model.included(stub));
        }

        #[test]
        fn member_verdicts_use_own_directives() {
            let model = ApiGraph::new().freeze(VisibilityPolicy::default()).unwrap();
            let m = MethodUnit::method("m", TypeReference::named("void"))
                .with_directives(Directives::hidden());
            assert!(!model.method_included(&m));
            let shown = m.clone().with_directives(Directives {
                hidden: true,
                force_show: true,
                ..Directives::none()
            });
            assert!(model.method_included(&shown));
            let private = FieldUnit::field("x", TypeReference::named("int"))
                .with_visibility(Visibility::Private);
            assert!(!model.field_included(&private));
        }
    }
}
