//! Member units: methods, constructors, fields and enum constants.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Directives, TypeId, Visibility};
use crate::signature::{ErasureScope, TypeArgumentMap, TypeParameter, TypeReference};
use crate::types::SourcePosition;

/// Placeholder owner for members not yet attached to a type.
const UNATTACHED: TypeId = TypeId(u32::MAX);

// ============================================================================
// Parameters
// ============================================================================

/// A method or constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    /// Declared name (informational, not part of the signature).
    pub name: String,
    /// Declared type.
    pub param_type: TypeReference,
    /// Whether this is a trailing vararg (`T...`).
    pub varargs: bool,
}

impl Parameter {
    /// Create a plain parameter.
    pub fn new(name: impl Into<String>, param_type: TypeReference) -> Self {
        Parameter {
            name: name.into(),
            param_type,
            varargs: false,
        }
    }

    /// Create a vararg parameter.
    pub fn varargs(name: impl Into<String>, param_type: TypeReference) -> Self {
        Parameter {
            name: name.into(),
            param_type,
            varargs: true,
        }
    }

    /// Erased type as it appears in a hashable signature.
    pub fn erased(&self, scope: &ErasureScope<'_>) -> String {
        let mut erased = self.param_type.erasure(scope);
        if self.varargs {
            erased.push_str("...");
        }
        erased
    }

    /// Parameterized display form (`java.util.List<T>`, `java.lang.String...`).
    pub fn display_type(&self) -> String {
        let mut out = self.param_type.full_name();
        if self.varargs {
            out.push_str("...");
        }
        out
    }
}

// ============================================================================
// Methods
// ============================================================================

/// Whether a method unit is an ordinary method or a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Method,
    Constructor,
}

/// Method qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethodModifiers {
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_synchronized: bool,
    pub is_native: bool,
    /// Interface default method.
    pub is_default: bool,
    /// Compiler-generated bridge or accessor.
    pub is_synthetic: bool,
}

/// Key of a method in the registry: owning type plus hashable signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodLink {
    pub owner: TypeId,
    pub signature: String,
}

impl MethodLink {
    pub fn new(owner: TypeId, signature: impl Into<String>) -> Self {
        MethodLink {
            owner,
            signature: signature.into(),
        }
    }
}

/// A method or constructor declared on (or hoisted onto) a type unit.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodUnit {
    pub name: String,
    pub kind: MethodKind,
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<Parameter>,
    /// Absent for constructors.
    pub return_type: Option<TypeReference>,
    pub visibility: Visibility,
    pub modifiers: MethodModifiers,
    pub throws: Vec<TypeReference>,
    /// Direct overridden-method link, when the front-end knows it.
    pub overridden: Option<MethodLink>,
    pub directives: Directives,
    pub deprecated: bool,
    pub documentation: Option<String>,
    pub position: SourcePosition,
    pub(crate) owner: TypeId,
    pub(crate) signature_key: String,
}

impl MethodUnit {
    /// A public method with no parameters.
    pub fn method(name: impl Into<String>, return_type: TypeReference) -> Self {
        MethodUnit::new(name.into(), MethodKind::Method, Some(return_type))
    }

    /// A public constructor with no parameters. `name` is the simple type name.
    pub fn constructor(name: impl Into<String>) -> Self {
        MethodUnit::new(name.into(), MethodKind::Constructor, None)
    }

    fn new(name: String, kind: MethodKind, return_type: Option<TypeReference>) -> Self {
        MethodUnit {
            name,
            kind,
            type_params: Vec::new(),
            params: Vec::new(),
            return_type,
            visibility: Visibility::Public,
            modifiers: MethodModifiers::default(),
            throws: Vec::new(),
            overridden: None,
            directives: Directives::none(),
            deprecated: false,
            documentation: None,
            position: SourcePosition::unknown(),
            owner: UNATTACHED,
            signature_key: String::new(),
        }
    }

    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_type_param(mut self, param: TypeParameter) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_modifiers(mut self, modifiers: MethodModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    pub fn with_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    pub fn with_abstract(mut self) -> Self {
        self.modifiers.is_abstract = true;
        self
    }

    pub fn with_throws(mut self, exception: TypeReference) -> Self {
        self.throws.push(exception);
        self
    }

    pub fn with_overridden(mut self, link: MethodLink) -> Self {
        self.overridden = Some(link);
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

    /// Owning type. For hoisted clones this is the type they were hoisted onto.
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    /// Hashable signature: `name(erased param types)`.
    ///
    /// Empty until the member is attached to a frozen model.
    pub fn signature_key(&self) -> &str {
        &self.signature_key
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }

    /// Whether the member carries non-empty documentation text.
    pub fn is_documented(&self) -> bool {
        self.documentation
            .as_deref()
            .is_some_and(|doc| !doc.trim().is_empty())
    }

    /// Compute the hashable signature in `scope`.
    ///
    /// `scope` should hold the owner's (and enclosing types') parameters;
    /// the method's own type parameters are added as the innermost frame.
    pub fn compute_signature_key(&self, scope: &ErasureScope<'_>) -> String {
        let scope = ErasureScope::new()
            .with_frame(&self.type_params)
            .with_frames_of(scope);
        let params: Vec<String> = self.params.iter().map(|p| p.erased(&scope)).collect();
        format!("{}({})", self.name, params.join(","))
    }

    /// Parameterized parameter list, e.g. `(int, java.util.List<T>)`.
    pub fn display_params(&self) -> String {
        let params: Vec<String> = self.params.iter().map(Parameter::display_type).collect();
        format!("({})", params.join(", "))
    }

    /// Clone onto `new_owner`, re-expressing types through `mapping`.
    ///
    /// The signature key is left for the caller to recompute in the new
    /// owner's scope.
    pub fn reparented(&self, new_owner: TypeId, mapping: &TypeArgumentMap) -> MethodUnit {
        let mut clone = self.clone();
        clone.owner = new_owner;
        if !mapping.is_empty() {
            for param in &mut clone.params {
                param.param_type = param.param_type.substitute(mapping);
            }
            clone.return_type = clone.return_type.map(|t| t.substitute(mapping));
            clone.throws = clone.throws.iter().map(|t| t.substitute(mapping)).collect();
        }
        clone
    }
}

impl fmt::Display for MethodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.return_type {
            Some(ret) => write!(f, "{} {}{}", ret, self.name, self.display_params()),
            None => write!(f, "{}{}", self.name, self.display_params()),
        }
    }
}

// ============================================================================
// Fields
// ============================================================================

/// Field qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldModifiers {
    pub is_static: bool,
    pub is_final: bool,
    pub is_transient: bool,
    pub is_volatile: bool,
}

/// A field or enum constant.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUnit {
    pub name: String,
    pub field_type: TypeReference,
    pub visibility: Visibility,
    pub modifiers: FieldModifiers,
    /// Source text of the constant value, when known.
    pub constant_value: Option<String>,
    pub is_enum_constant: bool,
    pub directives: Directives,
    pub deprecated: bool,
    pub documentation: Option<String>,
    pub position: SourcePosition,
    pub(crate) owner: TypeId,
}

impl FieldUnit {
    /// A public instance field.
    pub fn field(name: impl Into<String>, field_type: TypeReference) -> Self {
        FieldUnit {
            name: name.into(),
            field_type,
            visibility: Visibility::Public,
            modifiers: FieldModifiers::default(),
            constant_value: None,
            is_enum_constant: false,
            directives: Directives::none(),
            deprecated: false,
            documentation: None,
            position: SourcePosition::unknown(),
            owner: UNATTACHED,
        }
    }

    /// An enum constant. Its type and qualifiers are filled in when it is
    /// attached to the enum.
    pub fn enum_constant(name: impl Into<String>) -> Self {
        let mut constant = FieldUnit::field(name, TypeReference::named(String::new()));
        constant.is_enum_constant = true;
        constant.modifiers.is_static = true;
        constant.modifiers.is_final = true;
        constant
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_modifiers(mut self, modifiers: FieldModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    pub fn with_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.constant_value = Some(value.into());
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

    pub fn owner(&self) -> TypeId {
        self.owner
    }

    /// Static, final and carrying a value.
    pub fn is_constant(&self) -> bool {
        self.modifiers.is_static && self.modifiers.is_final && self.constant_value.is_some()
    }

    pub fn is_documented(&self) -> bool {
        self.documentation
            .as_deref()
            .is_some_and(|doc| !doc.trim().is_empty())
    }

    /// Clone onto `new_owner`, re-expressing the type through `mapping`.
    pub fn reparented(&self, new_owner: TypeId, mapping: &TypeArgumentMap) -> FieldUnit {
        let mut clone = self.clone();
        clone.owner = new_owner;
        clone.field_type = clone.field_type.substitute(mapping);
        clone
    }
}

impl fmt::Display for FieldUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field_type, self.name)?;
        if let Some(value) = &self.constant_value {
            write!(f, " = {}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TypeReference {
        TypeReference::parse(s).unwrap()
    }

    mod signature_key_tests {
        use super::*;

        #[test]
        fn erases_parameters() {
            let m = MethodUnit::method("put", t("void"))
                .with_param(Parameter::new("key", t("java.util.List<java.lang.String>")))
                .with_param(Parameter::new("count", t("int")));
            assert_eq!(
                m.compute_signature_key(&ErasureScope::new()),
                "put(java.util.List,int)"
            );
        }

        #[test]
        fn method_type_params_are_erased() {
            let m = MethodUnit::method("max", t("T"))
                .with_type_param(TypeParameter::new("T").with_bound(t("java.lang.Number")))
                .with_param(Parameter::new("a", t("T")));
            assert_eq!(
                m.compute_signature_key(&ErasureScope::new()),
                "max(java.lang.Number)"
            );
        }

        #[test]
        fn owner_type_params_come_from_scope() {
            let owner_params = vec![TypeParameter::new("E")];
            let scope = ErasureScope::new().with_frame(&owner_params);
            let m = MethodUnit::method("add", t("boolean")).with_param(Parameter::new("e", t("E")));
            assert_eq!(m.compute_signature_key(&scope), "add(java.lang.Object)");
        }

        #[test]
        fn varargs_are_distinct_from_arrays() {
            let scope = ErasureScope::new();
            let varargs = MethodUnit::method("of", t("void"))
                .with_param(Parameter::varargs("xs", t("java.lang.String")));
            let array = MethodUnit::method("of", t("void"))
                .with_param(Parameter::new("xs", t("java.lang.String[]")));
            assert_eq!(varargs.compute_signature_key(&scope), "of(java.lang.String...)");
            assert_ne!(
                varargs.compute_signature_key(&scope),
                array.compute_signature_key(&scope)
            );
        }
    }

    mod reparent_tests {
        use super::*;

        #[test]
        fn substitutes_types_and_moves_owner() {
            let mut map = TypeArgumentMap::new();
            map.insert("T".to_string(), t("java.lang.String"));
            let m = MethodUnit::method("get", t("T")).with_param(Parameter::new("other", t("T[]")));
            let clone = m.reparented(TypeId::new(7), &map);
            assert_eq!(clone.owner(), TypeId::new(7));
            assert_eq!(clone.return_type, Some(t("java.lang.String")));
            assert_eq!(clone.params[0].param_type, t("java.lang.String[]"));
        }

        #[test]
        fn field_type_is_substituted() {
            let mut map = TypeArgumentMap::new();
            map.insert("T".to_string(), t("java.lang.Long"));
            let f = FieldUnit::field("value", t("T"));
            assert_eq!(f.reparented(TypeId::new(1), &map).field_type, t("java.lang.Long"));
        }
    }

    mod field_tests {
        use super::*;

        #[test]
        fn constant_needs_static_final_value() {
            let f = FieldUnit::field("MAX", t("int")).with_static().with_final();
            assert!(!f.is_constant());
            assert!(f.clone().with_value("10").is_constant());
        }

        #[test]
        fn enum_constants_are_static_final() {
            let c = FieldUnit::enum_constant("RED");
            assert!(c.is_enum_constant);
            assert!(c.modifiers.is_static && c.modifiers.is_final);
        }

        #[test]
        fn blank_documentation_is_undocumented() {
            let f = FieldUnit::field("x", t("int")).with_documentation("  ");
            assert!(!f.is_documented());
            assert!(f.with_documentation("The x.").is_documented());
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn method_display() {
            let m = MethodUnit::method("of", t("java.util.List<E>"))
                .with_param(Parameter::varargs("xs", t("E")));
            assert_eq!(m.to_string(), "java.util.List<E> of(E...)");
            assert_eq!(MethodUnit::constructor("Foo").to_string(), "Foo()");
        }
    }
}
