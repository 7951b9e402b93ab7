//! API graph registry: registration, stubs, resolution and freezing.
//!
//! [`ApiGraph`] is the single owner of every [`TypeUnit`] and [`PackageUnit`]
//! while an API is being ingested. Units live in arenas indexed by
//! [`TypeId`] / [`PackageId`], with a qualified-name index on the side.
//!
//! # Lifecycle
//!
//! 1. **Registration**: `register_package`, `register_type`, `reference_type`,
//!    `link_superclass`/`link_interface`, `add_*` members. Supertype links
//!    are recorded by name and stay pending.
//! 2. **Resolution**: [`ApiGraph::resolve`] binds pending links in passes
//!    until a pass makes no progress. Whatever is left binds to an external
//!    stub and is reported as an `UNRESOLVED_REFERENCE` diagnostic.
//! 3. **Freeze**: [`ApiGraph::freeze`] consumes the graph and produces an
//!    immutable [`ApiModel`]. Freezing with pending links is a misuse error.

mod resolve;

use std::collections::HashMap;

use crate::compat::Diagnostic;
use crate::error::ApiError;
use crate::model::ApiModel;
use crate::signature::{ErasureScope, TypeReference};
use crate::unit::{
    Directives, FieldUnit, MethodKind, MethodUnit, PackageId, PackageUnit, TypeDeclaration,
    TypeId, TypeKind, TypeLink, TypeUnit, Visibility,
};
use crate::visibility::VisibilityPolicy;

pub use resolve::ResolveSummary;

// ============================================================================
// Declared Links
// ============================================================================

/// A supertype reference recorded at registration, bound during resolution.
#[derive(Debug, Clone)]
struct DeclaredLink {
    reference: TypeReference,
    target: Option<TypeId>,
}

impl DeclaredLink {
    fn pending(reference: TypeReference) -> Self {
        DeclaredLink {
            reference,
            target: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct DeclaredLinks {
    superclass: Option<DeclaredLink>,
    interfaces: Vec<DeclaredLink>,
}

// ============================================================================
// ApiGraph
// ============================================================================

/// Mutable registry used while an API is being ingested.
#[derive(Debug, Default)]
pub struct ApiGraph {
    packages: Vec<PackageUnit>,
    packages_by_name: HashMap<String, PackageId>,
    types: Vec<TypeUnit>,
    types_by_name: HashMap<String, TypeId>,
    /// Declared supertype links, parallel to `types`.
    links: Vec<DeclaredLinks>,
    /// Diagnostics raised by the last resolution.
    diagnostics: Vec<Diagnostic>,
}

impl ApiGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        ApiGraph::default()
    }

    // ------------------------------------------------------------------------
    // Packages
    // ------------------------------------------------------------------------

    /// Register a package, returning the existing handle if the name is known.
    pub fn register_package(&mut self, name: &str) -> PackageId {
        if let Some(&id) = self.packages_by_name.get(name) {
            return id;
        }
        let id = PackageId::new(self.packages.len() as u32);
        self.packages.push(PackageUnit::new(id, name));
        self.packages_by_name.insert(name.to_string(), id);
        tracing::trace!(package = name, %id, "registered package");
        id
    }

    /// Attach hidden/removed directives to a package.
    pub fn set_package_directives(
        &mut self,
        package: PackageId,
        directives: Directives,
    ) -> Result<(), ApiError> {
        self.package_mut(package)?.directives = directives;
        Ok(())
    }

    pub fn package(&self, id: PackageId) -> Option<&PackageUnit> {
        self.packages.get(id.index())
    }

    pub fn package_named(&self, name: &str) -> Option<PackageId> {
        self.packages_by_name.get(name).copied()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    fn package_mut(&mut self, id: PackageId) -> Result<&mut PackageUnit, ApiError> {
        self.packages.get_mut(id.index()).ok_or(ApiError::UnknownHandle {
            what: "package",
            id: id.0,
        })
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    /// Register a full declaration, upgrading a stub of the same name in place.
    ///
    /// Registering a second full declaration under one name fails with
    /// [`ApiError::DuplicateType`].
    pub fn register_type(
        &mut self,
        qualified_name: &str,
        declaration: TypeDeclaration,
    ) -> Result<TypeId, ApiError> {
        let package = match declaration.package {
            Some(pkg) => Some(self.package_mut(pkg)?.name.clone()),
            None => None,
        };
        if let Some(enclosing) = declaration.enclosing {
            self.type_ref(enclosing)?;
        }

        let simple_name = match &package {
            Some(pkg) if !pkg.is_empty() => qualified_name
                .strip_prefix(pkg.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(qualified_name)
                .to_string(),
            _ => qualified_name.to_string(),
        };

        let id = match self.types_by_name.get(qualified_name).copied() {
            Some(id) if !self.types[id.index()].is_stub() => {
                return Err(ApiError::DuplicateType {
                    qualified_name: qualified_name.to_string(),
                });
            }
            Some(id) => {
                tracing::trace!(qualified_name, %id, "upgrading stub");
                id
            }
            None => self.push_stub(qualified_name),
        };

        let package_id = declaration.package;
        let enclosing = declaration.enclosing;
        self.types[id.index()].declare(simple_name.clone(), declaration);

        if let Some(pkg) = package_id {
            self.package_mut(pkg)?.types.insert(simple_name, id);
        }
        if let Some(outer) = enclosing {
            let nested = &mut self.types[outer.index()].nested;
            if !nested.contains(&id) {
                nested.push(id);
            }
        }
        Ok(id)
    }

    /// Handle for `qualified_name`, creating a stub forward reference if unknown.
    pub fn reference_type(&mut self, qualified_name: &str) -> TypeId {
        match self.types_by_name.get(qualified_name) {
            Some(&id) => id,
            None => self.push_stub(qualified_name),
        }
    }

    fn push_stub(&mut self, qualified_name: &str) -> TypeId {
        let id = TypeId::new(self.types.len() as u32);
        self.types.push(TypeUnit::stub(id, qualified_name));
        self.links.push(DeclaredLinks::default());
        self.types_by_name.insert(qualified_name.to_string(), id);
        id
    }

    pub fn type_unit(&self, id: TypeId) -> Option<&TypeUnit> {
        self.types.get(id.index())
    }

    pub fn lookup_type(&self, qualified_name: &str) -> Option<TypeId> {
        self.types_by_name.get(qualified_name).copied()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    fn type_ref(&self, id: TypeId) -> Result<&TypeUnit, ApiError> {
        self.types.get(id.index()).ok_or(ApiError::UnknownHandle {
            what: "type",
            id: id.0,
        })
    }

    /// Mutable access to a declared (non-stub) type.
    fn declared_mut(&mut self, id: TypeId) -> Result<&mut TypeUnit, ApiError> {
        let unit = self.types.get_mut(id.index()).ok_or(ApiError::UnknownHandle {
            what: "type",
            id: id.0,
        })?;
        if unit.is_stub() {
            return Err(ApiError::NotDeclared {
                qualified_name: unit.qualified_name.clone(),
            });
        }
        Ok(unit)
    }

    // ------------------------------------------------------------------------
    // Supertype links
    // ------------------------------------------------------------------------

    /// Record the declared superclass; it is bound by the next `resolve()`.
    pub fn link_superclass(&mut self, ty: TypeId, reference: TypeReference) -> Result<(), ApiError> {
        self.declared_mut(ty)?;
        self.links[ty.index()].superclass = Some(DeclaredLink::pending(reference));
        Ok(())
    }

    /// Record a declared interface, in declaration order.
    pub fn link_interface(&mut self, ty: TypeId, reference: TypeReference) -> Result<(), ApiError> {
        self.declared_mut(ty)?;
        self.links[ty.index()]
            .interfaces
            .push(DeclaredLink::pending(reference));
        Ok(())
    }

    /// Number of supertype links still waiting for resolution.
    pub fn pending_count(&self) -> usize {
        self.pending_descriptions().len()
    }

    fn pending_descriptions(&self) -> Vec<String> {
        let mut pending = Vec::new();
        for (idx, links) in self.links.iter().enumerate() {
            let owner = &self.types[idx].qualified_name;
            let all = links.superclass.iter().chain(links.interfaces.iter());
            for link in all.filter(|l| l.target.is_none()) {
                pending.push(format!("{} -> {}", owner, link.reference.name));
            }
        }
        pending
    }

    // ------------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------------

    pub fn add_constructor(&mut self, ty: TypeId, mut ctor: MethodUnit) -> Result<(), ApiError> {
        if ctor.kind != MethodKind::Constructor {
            return Err(ApiError::invalid_args(format!(
                "'{}' is a method, not a constructor",
                ctor.name
            )));
        }
        let unit = self.declared_mut(ty)?;
        ctor.owner = ty;
        ctor.return_type = None;
        unit.constructors.push(ctor);
        Ok(())
    }

    pub fn add_method(&mut self, ty: TypeId, mut method: MethodUnit) -> Result<(), ApiError> {
        if method.kind != MethodKind::Method {
            return Err(ApiError::invalid_args(format!(
                "'{}' is a constructor, not a method",
                method.name
            )));
        }
        let unit = self.declared_mut(ty)?;
        method.owner = ty;
        unit.methods.push(method);
        Ok(())
    }

    pub fn add_field(&mut self, ty: TypeId, mut field: FieldUnit) -> Result<(), ApiError> {
        if field.is_enum_constant {
            return Err(ApiError::invalid_args(format!(
                "'{}' is an enum constant; use add_enum_constant",
                field.name
            )));
        }
        let unit = self.declared_mut(ty)?;
        field.owner = ty;
        unit.fields.push(field);
        Ok(())
    }

    /// Attach an enum constant. Its type becomes the enum itself and it is
    /// made public, static and final.
    pub fn add_enum_constant(&mut self, ty: TypeId, mut constant: FieldUnit) -> Result<(), ApiError> {
        let unit = self.declared_mut(ty)?;
        if unit.kind != TypeKind::Enum {
            return Err(ApiError::invalid_args(format!(
                "enum constant '{}' added to non-enum '{}'",
                constant.name, unit.qualified_name
            )));
        }
        constant.owner = ty;
        constant.is_enum_constant = true;
        constant.field_type = TypeReference::named(unit.qualified_name.clone());
        constant.visibility = Visibility::Public;
        constant.modifiers.is_static = true;
        constant.modifiers.is_final = true;
        unit.enum_constants.push(constant);
        Ok(())
    }

    /// Diagnostics raised by the last `resolve()`.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    // ------------------------------------------------------------------------
    // Freeze
    // ------------------------------------------------------------------------

    /// Consume the graph and produce an immutable, queryable model.
    ///
    /// Fails with [`ApiError::PendingReferences`] when links registered since
    /// the last `resolve()` are still unbound, and with
    /// [`ApiError::DuplicateMember`] when two methods (or two constructors)
    /// of one type share a hashable signature.
    pub fn freeze(mut self, policy: VisibilityPolicy) -> Result<ApiModel, ApiError> {
        let pending = self.pending_descriptions();
        if !pending.is_empty() {
            return Err(ApiError::PendingReferences { pending });
        }

        self.compute_signature_keys()?;

        let links = std::mem::take(&mut self.links);
        for (unit, declared) in self.types.iter_mut().zip(links) {
            unit.superclass = declared.superclass.and_then(|l| {
                l.target.map(|target| TypeLink {
                    target,
                    reference: l.reference,
                })
            });
            unit.interfaces = declared
                .interfaces
                .into_iter()
                .filter_map(|l| {
                    l.target.map(|target| TypeLink {
                        target,
                        reference: l.reference,
                    })
                })
                .collect();
        }

        tracing::debug!(
            packages = self.packages.len(),
            types = self.types.len(),
            diagnostics = self.diagnostics.len(),
            "froze API graph"
        );

        Ok(ApiModel::new(
            self.packages,
            self.types,
            self.types_by_name,
            policy,
            self.diagnostics,
        ))
    }

    /// Fill in every method's hashable signature and reject duplicates.
    fn compute_signature_keys(&mut self) -> Result<(), ApiError> {
        let mut keys: Vec<(Vec<String>, Vec<String>)> = Vec::with_capacity(self.types.len());
        for unit in &self.types {
            let scope = erasure_scope(&self.types, unit.id);
            let ctors = unit
                .constructors
                .iter()
                .map(|c| c.compute_signature_key(&scope))
                .collect();
            let methods = unit
                .methods
                .iter()
                .map(|m| m.compute_signature_key(&scope))
                .collect();
            keys.push((ctors, methods));
        }

        for (unit, (ctor_keys, method_keys)) in self.types.iter_mut().zip(keys) {
            for keys in [&ctor_keys, &method_keys] {
                let mut seen = std::collections::HashSet::new();
                for key in keys {
                    if !seen.insert(key.as_str()) {
                        return Err(ApiError::DuplicateMember {
                            owner: unit.qualified_name.clone(),
                            signature: key.clone(),
                        });
                    }
                }
            }
            for (ctor, key) in unit.constructors.iter_mut().zip(ctor_keys) {
                ctor.signature_key = key;
            }
            for (method, key) in unit.methods.iter_mut().zip(method_keys) {
                method.signature_key = key;
            }
        }
        Ok(())
    }
}

/// Type parameters in scope inside `id`: its own, then each enclosing type's.
pub(crate) fn erasure_scope(types: &[TypeUnit], id: TypeId) -> ErasureScope<'_> {
    let mut scope = ErasureScope::new();
    let mut current = types.get(id.index());
    let mut depth = 0;
    while let Some(unit) = current {
        scope = scope.with_frame(&unit.type_params);
        depth += 1;
        if depth > types.len() {
            break;
        }
        current = unit.enclosing.and_then(|outer| types.get(outer.index()));
    }
    scope
}
