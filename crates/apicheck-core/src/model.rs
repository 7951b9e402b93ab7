//! Frozen, queryable API model.
//!
//! An [`ApiModel`] is produced by [`ApiGraph::freeze`](crate::graph::ApiGraph::freeze)
//! and never changes afterwards. Every derived view (verdicts, superclass
//! chains, flattened members) is memoized in a per-type set of
//! [`OnceLock`] cells, so the model can be shared across threads and the
//! first reader of a view computes it exactly once.

use std::collections::HashMap;
use std::sync::OnceLock;

use rayon::prelude::*;

use crate::compat::Diagnostic;
use crate::hierarchy::ClassTypePair;
use crate::signature::ErasureScope;
use crate::unit::{FieldUnit, MethodUnit, PackageId, PackageUnit, TypeId, TypeUnit};
use crate::visibility::{InclusionVerdict, VisibilityPolicy};

/// Memoized views of one type unit.
#[derive(Debug, Default)]
pub(crate) struct TypeCache {
    pub(crate) verdict: OnceLock<InclusionVerdict>,
    pub(crate) superclass_chain: OnceLock<Vec<ClassTypePair>>,
    pub(crate) interfaces_with_types: OnceLock<Vec<ClassTypePair>>,
    pub(crate) all_interfaces: OnceLock<Vec<ClassTypePair>>,
    pub(crate) effective_superclass: OnceLock<Option<TypeId>>,
    pub(crate) effective_interfaces: OnceLock<Vec<TypeId>>,
    pub(crate) self_methods: OnceLock<Vec<MethodUnit>>,
    pub(crate) self_fields: OnceLock<Vec<FieldUnit>>,
    pub(crate) methods: OnceLock<Vec<MethodUnit>>,
    pub(crate) fields: OnceLock<Vec<FieldUnit>>,
    pub(crate) constructors: OnceLock<Vec<MethodUnit>>,
}

/// Immutable API graph with lazily computed views.
#[derive(Debug)]
pub struct ApiModel {
    packages: Vec<PackageUnit>,
    packages_by_name: HashMap<String, PackageId>,
    types: Vec<TypeUnit>,
    types_by_name: HashMap<String, TypeId>,
    policy: VisibilityPolicy,
    diagnostics: Vec<Diagnostic>,
    cache: Vec<TypeCache>,
}

impl ApiModel {
    pub(crate) fn new(
        packages: Vec<PackageUnit>,
        types: Vec<TypeUnit>,
        types_by_name: HashMap<String, TypeId>,
        policy: VisibilityPolicy,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let packages_by_name = packages
            .iter()
            .map(|p| (p.name().to_string(), p.id()))
            .collect();
        let cache = types.iter().map(|_| TypeCache::default()).collect();
        ApiModel {
            packages,
            packages_by_name,
            types,
            types_by_name,
            policy,
            diagnostics,
            cache,
        }
    }

    pub(crate) fn cache(&self, id: TypeId) -> Option<&TypeCache> {
        self.cache.get(id.index())
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn type_unit(&self, id: TypeId) -> Option<&TypeUnit> {
        self.types.get(id.index())
    }

    /// Handle of the unit (declared or stub) with this qualified name.
    pub fn lookup(&self, qualified_name: &str) -> Option<TypeId> {
        self.types_by_name.get(qualified_name).copied()
    }

    /// Unit with this qualified name.
    pub fn lookup_unit(&self, qualified_name: &str) -> Option<&TypeUnit> {
        self.lookup(qualified_name).and_then(|id| self.type_unit(id))
    }

    pub fn package(&self, id: PackageId) -> Option<&PackageUnit> {
        self.packages.get(id.index())
    }

    pub fn package_named(&self, name: &str) -> Option<&PackageUnit> {
        self.packages_by_name
            .get(name)
            .and_then(|id| self.package(*id))
    }

    /// Packages ordered by name.
    pub fn packages(&self) -> Vec<&PackageUnit> {
        let mut packages: Vec<&PackageUnit> = self.packages.iter().collect();
        packages.sort_by(|a, b| a.name().cmp(b.name()));
        packages
    }

    /// Every unit, stubs included, in handle order.
    pub fn types(&self) -> &[TypeUnit] {
        &self.types
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Diagnostics raised while the graph was built.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn policy(&self) -> &VisibilityPolicy {
        &self.policy
    }

    /// Type parameters in scope inside a unit.
    pub(crate) fn erasure_scope(&self, id: TypeId) -> ErasureScope<'_> {
        crate::graph::erasure_scope(&self.types, id)
    }

    /// Compute every memoized view up front.
    pub fn warm(&self) {
        (0..self.types.len()).into_par_iter().for_each(|idx| {
            let id = TypeId::new(idx as u32);
            self.verdict(id);
            self.superclass_chain(id);
            self.all_interfaces(id);
            self.effective_superclass(id);
            self.effective_interfaces(id);
            self.methods(id);
            self.fields(id);
            self.constructors(id);
        });
        tracing::debug!(types = self.types.len(), "warmed model views");
    }
}
