//! Generic type references, type parameters and type-argument substitution.
//!
//! A [`TypeReference`] is a possibly parameterized, possibly array-typed
//! reference such as `java.util.Map<K, java.util.List<V>>[]`. References are
//! plain values: they name types by string and never point into a graph, so
//! they can be substituted, compared and serialized freely.
//!
//! Type variables are ordinary references whose name matches a declared
//! [`TypeParameter`] in scope. [`TypeArgumentMap`] maps those names to
//! concrete references and is produced by [`type_argument_mapping`].

mod parse;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub use parse::{parse_parameter_type, parse_type_parameter, parse_type_reference};

/// Name every type variable erases to when it has no bound.
pub const OBJECT: &str = "java.lang.Object";

/// Primitive type names, including `void`.
pub const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// Erasure recursion limit for pathological bound chains (`T extends U`, `U extends T`).
const MAX_ERASURE_DEPTH: usize = 16;

/// Mapping from type-parameter name to the reference that replaces it.
pub type TypeArgumentMap = BTreeMap<String, TypeReference>;

// ============================================================================
// Type References
// ============================================================================

/// Bound of a wildcard argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WildcardBound {
    /// `? extends T`
    Extends(Box<TypeReference>),
    /// `? super T`
    Super(Box<TypeReference>),
}

/// A reference to a type, with type arguments and array dimensions.
///
/// Serializes as its parameterized display string (`java.util.List<T>[]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TypeReference {
    /// Qualified type name, a type-variable name, or `?` for wildcards.
    pub name: String,
    /// Type arguments in declaration order.
    pub args: Vec<TypeReference>,
    /// Number of array dimensions.
    pub dimensions: u8,
    /// Wildcard bound, only meaningful when `name` is `?`.
    pub bound: Option<WildcardBound>,
}

impl TypeReference {
    /// A raw, non-array reference.
    pub fn named(name: impl Into<String>) -> Self {
        TypeReference {
            name: name.into(),
            args: Vec::new(),
            dimensions: 0,
            bound: None,
        }
    }

    /// A parameterized reference.
    pub fn generic(name: impl Into<String>, args: Vec<TypeReference>) -> Self {
        TypeReference {
            name: name.into(),
            args,
            dimensions: 0,
            bound: None,
        }
    }

    /// A wildcard argument (`?`, `? extends T`, `? super T`).
    pub fn wildcard(bound: Option<WildcardBound>) -> Self {
        TypeReference {
            name: "?".to_string(),
            args: Vec::new(),
            dimensions: 0,
            bound,
        }
    }

    /// Set the number of array dimensions.
    pub fn with_dimensions(mut self, dimensions: u8) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Parse a type string such as `java.util.Map<K, V>[]`.
    pub fn parse(input: &str) -> Result<Self, ApiError> {
        parse_type_reference(input)
    }

    /// Whether this is a wildcard argument.
    pub fn is_wildcard(&self) -> bool {
        self.name == "?"
    }

    /// Whether this is a primitive (or `void`) without array dimensions.
    pub fn is_primitive(&self) -> bool {
        self.dimensions == 0 && self.args.is_empty() && PRIMITIVES.contains(&self.name.as_str())
    }

    /// Last segment of the name (`Map` for `java.util.Map`).
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Fully parameterized display name, used for dedup and exact comparison.
    pub fn full_name(&self) -> String {
        let mut out = String::new();
        self.write_full_name(&mut out);
        out
    }

    fn write_full_name(&self, out: &mut String) {
        out.push_str(&self.name);
        match &self.bound {
            Some(WildcardBound::Extends(t)) => {
                out.push_str(" extends ");
                t.write_full_name(out);
            }
            Some(WildcardBound::Super(t)) => {
                out.push_str(" super ");
                t.write_full_name(out);
            }
            None => {}
        }
        if !self.args.is_empty() {
            out.push('<');
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                arg.write_full_name(out);
            }
            out.push('>');
        }
        for _ in 0..self.dimensions {
            out.push_str("[]");
        }
    }

    /// Replace every mapped type variable, recursively.
    ///
    /// A mapped variable keeps its own array dimensions on top of the
    /// replacement's (`T[]` with `T -> String[]` becomes `String[][]`).
    pub fn substitute(&self, map: &TypeArgumentMap) -> TypeReference {
        if map.is_empty() {
            return self.clone();
        }
        if self.args.is_empty() && self.bound.is_none() {
            if let Some(replacement) = map.get(&self.name) {
                let mut out = replacement.clone();
                out.dimensions = out.dimensions.saturating_add(self.dimensions);
                return out;
            }
        }
        TypeReference {
            name: self.name.clone(),
            args: self.args.iter().map(|a| a.substitute(map)).collect(),
            dimensions: self.dimensions,
            bound: self.bound.as_ref().map(|b| match b {
                WildcardBound::Extends(t) => WildcardBound::Extends(Box::new(t.substitute(map))),
                WildcardBound::Super(t) => WildcardBound::Super(Box::new(t.substitute(map))),
            }),
        }
    }

    /// Erased name: type arguments dropped, type variables replaced by
    /// their first bound (or `java.lang.Object`), dimensions kept.
    pub fn erasure(&self, scope: &ErasureScope<'_>) -> String {
        self.erasure_at(scope, 0)
    }

    fn erasure_at(&self, scope: &ErasureScope<'_>, depth: usize) -> String {
        let base = if self.is_wildcard() {
            match &self.bound {
                Some(WildcardBound::Extends(t)) if depth < MAX_ERASURE_DEPTH => {
                    t.erasure_at(scope, depth + 1)
                }
                _ => OBJECT.to_string(),
            }
        } else if let Some(param) = scope.lookup(&self.name).filter(|_| self.args.is_empty()) {
            match param.bounds.first() {
                Some(bound) if depth < MAX_ERASURE_DEPTH => bound.erasure_at(scope, depth + 1),
                _ => OBJECT.to_string(),
            }
        } else {
            self.name.clone()
        };
        let mut out = base;
        for _ in 0..self.dimensions {
            out.push_str("[]");
        }
        out
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

impl From<TypeReference> for String {
    fn from(reference: TypeReference) -> Self {
        reference.full_name()
    }
}

impl TryFrom<String> for TypeReference {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_type_reference(&value)
    }
}

// ============================================================================
// Type Parameters
// ============================================================================

/// A declared type parameter (`T extends Number & Comparable<T>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TypeParameter {
    /// Parameter name.
    pub name: String,
    /// Upper bounds in declaration order; empty means `java.lang.Object`.
    pub bounds: Vec<TypeReference>,
}

impl TypeParameter {
    /// An unbounded type parameter.
    pub fn new(name: impl Into<String>) -> Self {
        TypeParameter {
            name: name.into(),
            bounds: Vec::new(),
        }
    }

    /// Add an upper bound.
    pub fn with_bound(mut self, bound: TypeReference) -> Self {
        self.bounds.push(bound);
        self
    }

    /// The reference naming this parameter as a type variable.
    pub fn as_reference(&self) -> TypeReference {
        TypeReference::named(self.name.clone())
    }
}

impl fmt::Display for TypeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, bound) in self.bounds.iter().enumerate() {
            f.write_str(if i == 0 { " extends " } else { " & " })?;
            f.write_str(&bound.full_name())?;
        }
        Ok(())
    }
}

impl From<TypeParameter> for String {
    fn from(param: TypeParameter) -> Self {
        param.to_string()
    }
}

impl TryFrom<String> for TypeParameter {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_type_parameter(&value)
    }
}

// ============================================================================
// Erasure Scope
// ============================================================================

/// Type parameters visible at a point of use, innermost frame first.
#[derive(Debug, Clone, Default)]
pub struct ErasureScope<'a> {
    frames: Vec<&'a [TypeParameter]>,
}

impl<'a> ErasureScope<'a> {
    /// Empty scope: every name is a concrete type.
    pub fn new() -> Self {
        ErasureScope { frames: Vec::new() }
    }

    /// Add an outer frame (method params first, then the owner, then enclosing types).
    pub fn with_frame(mut self, params: &'a [TypeParameter]) -> Self {
        self.frames.push(params);
        self
    }

    /// Append every frame of `outer` after the frames already present.
    pub fn with_frames_of(mut self, outer: &ErasureScope<'a>) -> Self {
        self.frames.extend(outer.frames.iter().copied());
        self
    }

    /// Find the innermost declaration of `name`.
    pub fn lookup(&self, name: &str) -> Option<&'a TypeParameter> {
        self.frames
            .iter()
            .find_map(|frame| frame.iter().find(|p| p.name == name))
    }
}

/// Map a unit's declared type parameters to the arguments of a reference to it.
///
/// Raw references (no arguments) produce an empty map; extra or missing
/// arguments are paired positionally and the remainder ignored.
pub fn type_argument_mapping(
    params: &[TypeParameter],
    reference: &TypeReference,
) -> TypeArgumentMap {
    params
        .iter()
        .zip(reference.args.iter())
        .map(|(param, arg)| (param.name.clone(), arg.clone()))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TypeReference {
        TypeReference::parse(s).unwrap()
    }

    mod full_name_tests {
        use super::*;

        #[test]
        fn parameterized_array() {
            let r = TypeReference::generic(
                "java.util.Map",
                vec![TypeReference::named("K"), t("java.util.List<V>")],
            )
            .with_dimensions(2);
            assert_eq!(r.full_name(), "java.util.Map<K, java.util.List<V>>[][]");
        }

        #[test]
        fn wildcard_bounds() {
            assert_eq!(t("java.util.List<? extends T>").full_name(), "java.util.List<? extends T>");
            assert_eq!(t("java.util.List<? super T>").full_name(), "java.util.List<? super T>");
            assert_eq!(t("java.util.List<?>").full_name(), "java.util.List<?>");
        }
    }

    mod substitution_tests {
        use super::*;

        #[test]
        fn substitutes_nested_variables() {
            let mut map = TypeArgumentMap::new();
            map.insert("K".to_string(), t("java.lang.String"));
            map.insert("V".to_string(), t("java.lang.Integer"));
            let r = t("java.util.Map<K, java.util.List<V>>");
            assert_eq!(
                r.substitute(&map).full_name(),
                "java.util.Map<java.lang.String, java.util.List<java.lang.Integer>>"
            );
        }

        #[test]
        fn keeps_dimensions_of_variable() {
            let mut map = TypeArgumentMap::new();
            map.insert("T".to_string(), t("java.lang.String[]"));
            assert_eq!(t("T[]").substitute(&map).full_name(), "java.lang.String[][]");
        }

        #[test]
        fn substitutes_inside_wildcard_bound() {
            let mut map = TypeArgumentMap::new();
            map.insert("T".to_string(), t("a.B"));
            assert_eq!(
                t("java.util.List<? super T>").substitute(&map).full_name(),
                "java.util.List<? super a.B>"
            );
        }

        #[test]
        fn unmapped_names_are_untouched() {
            let mut map = TypeArgumentMap::new();
            map.insert("T".to_string(), t("a.B"));
            assert_eq!(t("U").substitute(&map), t("U"));
        }
    }

    mod erasure_tests {
        use super::*;

        #[test]
        fn unbounded_variable_erases_to_object() {
            let params = vec![TypeParameter::new("T")];
            let scope = ErasureScope::new().with_frame(&params);
            assert_eq!(t("T").erasure(&scope), OBJECT);
            assert_eq!(t("T[]").erasure(&scope), "java.lang.Object[]");
        }

        #[test]
        fn bounded_variable_erases_to_first_bound() {
            let params = vec![TypeParameter::new("T")
                .with_bound(t("java.lang.Number"))
                .with_bound(t("java.lang.Comparable<T>"))];
            let scope = ErasureScope::new().with_frame(&params);
            assert_eq!(t("T").erasure(&scope), "java.lang.Number");
        }

        #[test]
        fn innermost_frame_wins() {
            let method = vec![TypeParameter::new("T").with_bound(t("a.Inner"))];
            let owner = vec![TypeParameter::new("T")];
            let scope = ErasureScope::new().with_frame(&method).with_frame(&owner);
            assert_eq!(t("T").erasure(&scope), "a.Inner");
        }

        #[test]
        fn concrete_types_drop_arguments() {
            let scope = ErasureScope::new();
            assert_eq!(t("java.util.List<java.lang.String>").erasure(&scope), "java.util.List");
        }

        #[test]
        fn cyclic_bounds_terminate() {
            let params = vec![
                TypeParameter::new("T").with_bound(t("U")),
                TypeParameter::new("U").with_bound(t("T")),
            ];
            let scope = ErasureScope::new().with_frame(&params);
            assert_eq!(t("T").erasure(&scope), OBJECT);
        }
    }

    mod mapping_tests {
        use super::*;

        #[test]
        fn pairs_params_with_args() {
            let params = vec![TypeParameter::new("K"), TypeParameter::new("V")];
            let map = type_argument_mapping(&params, &t("a.Map<java.lang.String, java.lang.Long>"));
            assert_eq!(map.get("K"), Some(&t("java.lang.String")));
            assert_eq!(map.get("V"), Some(&t("java.lang.Long")));
        }

        #[test]
        fn raw_reference_maps_nothing() {
            let params = vec![TypeParameter::new("T")];
            assert!(type_argument_mapping(&params, &t("a.Box")).is_empty());
        }
    }

    mod primitive_tests {
        use super::*;

        #[test]
        fn primitives_and_arrays() {
            assert!(t("int").is_primitive());
            assert!(t("void").is_primitive());
            assert!(!t("int[]").is_primitive());
            assert!(!t("java.lang.Integer").is_primitive());
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn serializes_as_display_string() {
            let json = serde_json::to_string(&t("java.util.List<T>[]")).unwrap();
            assert_eq!(json, "\"java.util.List<T>[]\"");
            let back: TypeReference = serde_json::from_str(&json).unwrap();
            assert_eq!(back, t("java.util.List<T>[]"));
        }

        #[test]
        fn type_parameter_serializes_with_bounds() {
            let p = TypeParameter::new("T").with_bound(t("java.lang.Number"));
            assert_eq!(serde_json::to_string(&p).unwrap(), "\"T extends java.lang.Number\"");
        }
    }
}
