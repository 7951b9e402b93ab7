//! Type units and package units.

use std::collections::BTreeMap;

use super::{Directives, FieldUnit, MethodUnit, PackageId, TypeId, TypeKind, Visibility};
use crate::signature::{TypeParameter, TypeReference};
use crate::types::SourcePosition;

// ============================================================================
// Declarations
// ============================================================================

/// Type qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeModifiers {
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_static: bool,
}

/// Everything the front-end knows about a type when registering it.
///
/// Members and supertype links are attached afterwards through the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub kind: TypeKind,
    pub visibility: Visibility,
    pub modifiers: TypeModifiers,
    pub package: Option<PackageId>,
    pub enclosing: Option<TypeId>,
    pub type_params: Vec<TypeParameter>,
    pub directives: Directives,
    pub deprecated: bool,
    pub documentation: Option<String>,
    pub position: SourcePosition,
    /// Import declarations of the compilation unit (`java.util.List`, `java.util.*`).
    pub imports: Vec<String>,
}

impl TypeDeclaration {
    /// A public declaration of `kind` in `package`.
    pub fn new(kind: TypeKind, package: PackageId) -> Self {
        TypeDeclaration {
            kind,
            visibility: Visibility::Public,
            modifiers: TypeModifiers::default(),
            package: Some(package),
            enclosing: None,
            type_params: Vec::new(),
            directives: Directives::none(),
            deprecated: false,
            documentation: None,
            position: SourcePosition::unknown(),
            imports: Vec::new(),
        }
    }

    pub fn class(package: PackageId) -> Self {
        TypeDeclaration::new(TypeKind::Class, package)
    }

    pub fn interface(package: PackageId) -> Self {
        let mut decl = TypeDeclaration::new(TypeKind::Interface, package);
        decl.modifiers.is_abstract = true;
        decl
    }

    pub fn enumeration(package: PackageId) -> Self {
        let mut decl = TypeDeclaration::new(TypeKind::Enum, package);
        decl.modifiers.is_final = true;
        decl
    }

    pub fn annotation(package: PackageId) -> Self {
        let mut decl = TypeDeclaration::new(TypeKind::Annotation, package);
        decl.modifiers.is_abstract = true;
        decl
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_modifiers(mut self, modifiers: TypeModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_abstract(mut self) -> Self {
        self.modifiers.is_abstract = true;
        self
    }

    pub fn with_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    pub fn with_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    /// Declare this type as nested in `enclosing`.
    pub fn nested_in(mut self, enclosing: TypeId) -> Self {
        self.enclosing = Some(enclosing);
        self
    }

    pub fn with_type_param(mut self, param: TypeParameter) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn with_directives(mut self, directives: Directives) -> Self {
        self.directives = directives;
        self
    }

    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }
}

/// A resolved supertype link: target handle plus the parameterized reference.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeLink {
    pub target: TypeId,
    pub reference: TypeReference,
}

// ============================================================================
// Type Units
// ============================================================================

/// A class, interface, enum or annotation in the registry.
///
/// A unit is either a full declaration or a stub (qualified name only).
/// Stubs keep their handle when upgraded.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeUnit {
    pub(crate) id: TypeId,
    pub(crate) qualified_name: String,
    pub(crate) simple_name: String,
    pub(crate) stub: bool,
    pub kind: TypeKind,
    pub visibility: Visibility,
    pub modifiers: TypeModifiers,
    pub package: Option<PackageId>,
    pub enclosing: Option<TypeId>,
    pub type_params: Vec<TypeParameter>,
    pub(crate) superclass: Option<TypeLink>,
    pub(crate) interfaces: Vec<TypeLink>,
    pub nested: Vec<TypeId>,
    pub constructors: Vec<MethodUnit>,
    pub methods: Vec<MethodUnit>,
    pub fields: Vec<FieldUnit>,
    pub enum_constants: Vec<FieldUnit>,
    pub directives: Directives,
    pub deprecated: bool,
    pub documentation: Option<String>,
    pub position: SourcePosition,
    pub imports: Vec<String>,
}

impl TypeUnit {
    /// A stub known only by its qualified name.
    pub(crate) fn stub(id: TypeId, qualified_name: &str) -> Self {
        TypeUnit {
            id,
            qualified_name: qualified_name.to_string(),
            simple_name: qualified_name
                .rsplit('.')
                .next()
                .unwrap_or(qualified_name)
                .to_string(),
            stub: true,
            kind: TypeKind::Class,
            // Stubs never pass a visibility bar on their own.
            visibility: Visibility::PackagePrivate,
            modifiers: TypeModifiers::default(),
            package: None,
            enclosing: None,
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            nested: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            enum_constants: Vec::new(),
            directives: Directives::none(),
            deprecated: false,
            documentation: None,
            position: SourcePosition::unknown(),
            imports: Vec::new(),
        }
    }

    /// Upgrade in place from a declaration; identity and nested list are kept.
    pub(crate) fn declare(&mut self, simple_name: String, decl: TypeDeclaration) {
        self.simple_name = simple_name;
        self.stub = false;
        self.kind = decl.kind;
        self.visibility = decl.visibility;
        self.modifiers = decl.modifiers;
        self.package = decl.package;
        self.enclosing = decl.enclosing;
        self.type_params = decl.type_params;
        self.directives = decl.directives;
        self.deprecated = decl.deprecated;
        self.documentation = decl.documentation;
        self.position = decl.position;
        self.imports = decl.imports;
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Name within the package; nested types keep the `Outer.Inner` form.
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    /// Whether this unit is only a forward reference.
    pub fn is_stub(&self) -> bool {
        self.stub
    }

    pub fn is_interface(&self) -> bool {
        self.kind.is_interface()
    }

    /// Declared superclass link.
    pub fn superclass(&self) -> Option<&TypeLink> {
        self.superclass.as_ref()
    }

    /// Declared interface links in declaration order.
    pub fn interfaces(&self) -> &[TypeLink] {
        &self.interfaces
    }

    /// The reference a unit uses for itself: its name applied to its own type variables.
    pub fn as_type_reference(&self) -> TypeReference {
        TypeReference::generic(
            self.qualified_name.clone(),
            self.type_params.iter().map(TypeParameter::as_reference).collect(),
        )
    }

    /// Whether a subclass outside the package could call some constructor:
    /// a public or protected one that is neither hidden nor removed.
    ///
    /// Independent of the show level, so a protected-only class still counts.
    pub fn has_accessible_constructor(&self) -> bool {
        self.constructors.iter().any(|c| {
            let d = c.directives;
            c.visibility.is_public_or_protected() && (d.force_show || !(d.hidden || d.removed))
        })
    }

    /// Final, or without an accessible constructor.
    pub fn is_effectively_final(&self) -> bool {
        self.modifiers.is_final || !self.has_accessible_constructor()
    }

    /// Shallow clone carrying only the given constructors and methods.
    ///
    /// Fields, enum constants and nested types are dropped.
    pub fn delta(&self, constructors: Vec<MethodUnit>, methods: Vec<MethodUnit>) -> TypeUnit {
        TypeUnit {
            constructors,
            methods,
            fields: Vec::new(),
            enum_constants: Vec::new(),
            nested: Vec::new(),
            ..self.clone()
        }
    }
}

// ============================================================================
// Package Units
// ============================================================================

/// A package and the types registered into it.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageUnit {
    pub(crate) id: PackageId,
    pub(crate) name: String,
    /// Simple name (`Outer.Inner` for nested types) to handle.
    pub(crate) types: BTreeMap<String, TypeId>,
    pub directives: Directives,
}

impl PackageUnit {
    pub(crate) fn new(id: PackageId, name: &str) -> Self {
        PackageUnit {
            id,
            name: name.to_string(),
            types: BTreeMap::new(),
            directives: Directives::none(),
        }
    }

    pub fn id(&self) -> PackageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a member type by simple name.
    pub fn type_named(&self, simple_name: &str) -> Option<TypeId> {
        self.types.get(simple_name).copied()
    }

    /// Member types ordered by simple name.
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.types.values().copied()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}
