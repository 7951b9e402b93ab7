//! API units: packages, types and their members.
//!
//! This module provides the declaration-side data model:
//! - [`PackageUnit`]: a package and the types registered into it
//! - [`TypeUnit`]: a class, interface, enum or annotation
//! - [`MethodUnit`]: a method or constructor
//! - [`FieldUnit`]: a field or enum constant
//!
//! Units are owned by the graph registry. Cross-references between units are
//! [`TypeId`] / [`PackageId`] handles or [`MethodLink`] keys, never owning
//! pointers.
//!
//! # Visibility Model
//!
//! | Java | [`Visibility`] | Rank |
//! |------|----------------|------|
//! | `public` | `Public` | 3 |
//! | `protected` | `Protected` | 2 |
//! | (none) | `PackagePrivate` | 1 |
//! | `private` | `Private` | 0 |

pub mod member;
pub mod type_unit;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use member::{FieldModifiers, FieldUnit, MethodKind, MethodLink, MethodModifiers, MethodUnit, Parameter};
pub use type_unit::{PackageUnit, TypeDeclaration, TypeLink, TypeModifiers, TypeUnit};

// ============================================================================
// ID Types
// ============================================================================

/// Handle of a type unit in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Create a new type ID.
    pub fn new(id: u32) -> Self {
        TypeId(id)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type_{}", self.0)
    }
}

/// Handle of a package unit in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct PackageId(pub u32);

impl PackageId {
    /// Create a new package ID.
    pub fn new(id: u32) -> Self {
        PackageId(id)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg_{}", self.0)
    }
}

// ============================================================================
// Visibility
// ============================================================================

/// Declared access level of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// `public`
    #[default]
    Public,
    /// `protected`
    Protected,
    /// No modifier: visible within the package.
    PackagePrivate,
    /// `private`
    Private,
}

impl Visibility {
    /// Openness rank; higher is more visible.
    pub fn rank(self) -> u8 {
        match self {
            Visibility::Public => 3,
            Visibility::Protected => 2,
            Visibility::PackagePrivate => 1,
            Visibility::Private => 0,
        }
    }

    /// Java keyword for this level, empty for package-private.
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::PackagePrivate => "",
            Visibility::Private => "private",
        }
    }

    /// Whether the level is visible to API clients outside the package.
    pub fn is_public_or_protected(self) -> bool {
        matches!(self, Visibility::Public | Visibility::Protected)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::PackagePrivate => f.write_str("package-private"),
            other => f.write_str(other.keyword()),
        }
    }
}

// ============================================================================
// Type Kind
// ============================================================================

/// Declaration kind of a type unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Ordinary class.
    #[default]
    Class,
    /// Interface.
    Interface,
    /// Enum type.
    Enum,
    /// Annotation type (`@interface`).
    Annotation,
}

impl TypeKind {
    /// Whether the kind is an interface (annotations are interfaces).
    pub fn is_interface(self) -> bool {
        matches!(self, TypeKind::Interface | TypeKind::Annotation)
    }

    /// Source keyword for this kind.
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
            TypeKind::Annotation => "@interface",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

// ============================================================================
// Directives
// ============================================================================

/// Suppression directives attached to a package, type or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Directives {
    /// Excluded from the API (`@hide`).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    /// Removed from the API but still present (`@removed`).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,
    /// Force-show marker; overrides hidden/removed on enclosing scopes.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub force_show: bool,
}

impl Directives {
    /// No directives.
    pub fn none() -> Self {
        Directives::default()
    }

    /// Only the hidden directive.
    pub fn hidden() -> Self {
        Directives {
            hidden: true,
            ..Directives::default()
        }
    }

    /// Only the removed directive.
    pub fn removed() -> Self {
        Directives {
            removed: true,
            ..Directives::default()
        }
    }

    /// Only the force-show marker.
    pub fn force_show() -> Self {
        Directives {
            force_show: true,
            ..Directives::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod visibility_tests {
        use super::*;

        #[test]
        fn rank_orders_openness() {
            assert!(Visibility::Public.rank() > Visibility::Protected.rank());
            assert!(Visibility::Protected.rank() > Visibility::PackagePrivate.rank());
            assert!(Visibility::PackagePrivate.rank() > Visibility::Private.rank());
        }

        #[test]
        fn serializes_snake_case() {
            assert_eq!(
                serde_json::to_string(&Visibility::PackagePrivate).unwrap(),
                "\"package_private\""
            );
        }

        #[test]
        fn display_names_package_private() {
            assert_eq!(Visibility::PackagePrivate.to_string(), "package-private");
            assert_eq!(Visibility::Protected.to_string(), "protected");
        }
    }

    mod kind_tests {
        use super::*;

        #[test]
        fn annotations_are_interfaces() {
            assert!(TypeKind::Annotation.is_interface());
            assert!(TypeKind::Interface.is_interface());
            assert!(!TypeKind::Enum.is_interface());
        }
    }

    mod id_tests {
        use super::*;

        #[test]
        fn display_prefixes() {
            assert_eq!(TypeId::new(4).to_string(), "type_4");
            assert_eq!(PackageId::new(1).to_string(), "pkg_1");
        }
    }
}
