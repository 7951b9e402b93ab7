//! Diagnostic records produced by graph resolution and compatibility checks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::types::SourcePosition;

// ============================================================================
// Severity
// ============================================================================

/// How a driver should treat a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Fails the run.
    Error,
    /// Reported but does not fail the run.
    Warning,
    /// Not reported.
    Hidden,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hidden => "hidden",
        })
    }
}

// ============================================================================
// Diagnostic Kinds
// ============================================================================

/// Every kind of change or model problem the core can report.
///
/// Codes are stable and appear in reports next to the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum DiagnosticKind {
    UnresolvedReference = 1,
    AddedPackage = 2,
    AddedClass = 3,
    AddedMethod = 4,
    AddedField = 5,
    AddedInterface = 6,
    RemovedPackage = 7,
    RemovedClass = 8,
    RemovedMethod = 9,
    RemovedField = 10,
    RemovedInterface = 11,
    ChangedStatic = 12,
    AddedFinal = 13,
    ChangedTransient = 14,
    ChangedVolatile = 15,
    ChangedType = 16,
    ChangedValue = 17,
    ChangedSuperclass = 18,
    ChangedScope = 19,
    ChangedAbstract = 20,
    ChangedThrows = 21,
    ChangedNative = 22,
    ChangedClass = 23,
    ChangedDeprecated = 24,
    ChangedSynchronized = 25,
    AddedFinalUninstantiable = 26,
    RemovedFinal = 27,
    ChangedFinal = 28,
    CyclicInheritance = 29,
}

impl DiagnosticKind {
    /// All kinds in code order.
    pub const ALL: [DiagnosticKind; 29] = [
        DiagnosticKind::UnresolvedReference,
        DiagnosticKind::AddedPackage,
        DiagnosticKind::AddedClass,
        DiagnosticKind::AddedMethod,
        DiagnosticKind::AddedField,
        DiagnosticKind::AddedInterface,
        DiagnosticKind::RemovedPackage,
        DiagnosticKind::RemovedClass,
        DiagnosticKind::RemovedMethod,
        DiagnosticKind::RemovedField,
        DiagnosticKind::RemovedInterface,
        DiagnosticKind::ChangedStatic,
        DiagnosticKind::AddedFinal,
        DiagnosticKind::ChangedTransient,
        DiagnosticKind::ChangedVolatile,
        DiagnosticKind::ChangedType,
        DiagnosticKind::ChangedValue,
        DiagnosticKind::ChangedSuperclass,
        DiagnosticKind::ChangedScope,
        DiagnosticKind::ChangedAbstract,
        DiagnosticKind::ChangedThrows,
        DiagnosticKind::ChangedNative,
        DiagnosticKind::ChangedClass,
        DiagnosticKind::ChangedDeprecated,
        DiagnosticKind::ChangedSynchronized,
        DiagnosticKind::AddedFinalUninstantiable,
        DiagnosticKind::RemovedFinal,
        DiagnosticKind::ChangedFinal,
        DiagnosticKind::CyclicInheritance,
    ];

    /// Stable numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// `SCREAMING_SNAKE_CASE` name.
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::UnresolvedReference => "UNRESOLVED_REFERENCE",
            DiagnosticKind::AddedPackage => "ADDED_PACKAGE",
            DiagnosticKind::AddedClass => "ADDED_CLASS",
            DiagnosticKind::AddedMethod => "ADDED_METHOD",
            DiagnosticKind::AddedField => "ADDED_FIELD",
            DiagnosticKind::AddedInterface => "ADDED_INTERFACE",
            DiagnosticKind::RemovedPackage => "REMOVED_PACKAGE",
            DiagnosticKind::RemovedClass => "REMOVED_CLASS",
            DiagnosticKind::RemovedMethod => "REMOVED_METHOD",
            DiagnosticKind::RemovedField => "REMOVED_FIELD",
            DiagnosticKind::RemovedInterface => "REMOVED_INTERFACE",
            DiagnosticKind::ChangedStatic => "CHANGED_STATIC",
            DiagnosticKind::AddedFinal => "ADDED_FINAL",
            DiagnosticKind::ChangedTransient => "CHANGED_TRANSIENT",
            DiagnosticKind::ChangedVolatile => "CHANGED_VOLATILE",
            DiagnosticKind::ChangedType => "CHANGED_TYPE",
            DiagnosticKind::ChangedValue => "CHANGED_VALUE",
            DiagnosticKind::ChangedSuperclass => "CHANGED_SUPERCLASS",
            DiagnosticKind::ChangedScope => "CHANGED_SCOPE",
            DiagnosticKind::ChangedAbstract => "CHANGED_ABSTRACT",
            DiagnosticKind::ChangedThrows => "CHANGED_THROWS",
            DiagnosticKind::ChangedNative => "CHANGED_NATIVE",
            DiagnosticKind::ChangedClass => "CHANGED_CLASS",
            DiagnosticKind::ChangedDeprecated => "CHANGED_DEPRECATED",
            DiagnosticKind::ChangedSynchronized => "CHANGED_SYNCHRONIZED",
            DiagnosticKind::AddedFinalUninstantiable => "ADDED_FINAL_UNINSTANTIABLE",
            DiagnosticKind::RemovedFinal => "REMOVED_FINAL",
            DiagnosticKind::ChangedFinal => "CHANGED_FINAL",
            DiagnosticKind::CyclicInheritance => "CYCLIC_INHERITANCE",
        }
    }

    /// Look a kind up by name (case-insensitive) or numeric code.
    pub fn lookup(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u16>() {
            return Self::ALL.iter().copied().find(|k| k.code() == code);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(s))
    }

    /// Whether a diagnostic of this kind makes a compared pair inconsistent.
    ///
    /// Every API-change kind does, additions included. Only the model-level
    /// kinds raised while building a graph do not.
    pub fn is_breaking(self) -> bool {
        !matches!(
            self,
            DiagnosticKind::UnresolvedReference | DiagnosticKind::CyclicInheritance
        )
    }

    /// Severity used when a driver does not override it.
    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::UnresolvedReference
            | DiagnosticKind::CyclicInheritance
            | DiagnosticKind::AddedPackage
            | DiagnosticKind::AddedClass
            | DiagnosticKind::AddedMethod
            | DiagnosticKind::AddedField
            | DiagnosticKind::AddedInterface
            | DiagnosticKind::ChangedDeprecated
            | DiagnosticKind::AddedFinalUninstantiable
            | DiagnosticKind::RemovedFinal => Severity::Warning,
            DiagnosticKind::ChangedNative | DiagnosticKind::ChangedSynchronized => {
                Severity::Hidden
            }
            DiagnosticKind::RemovedPackage
            | DiagnosticKind::RemovedClass
            | DiagnosticKind::RemovedMethod
            | DiagnosticKind::RemovedField
            | DiagnosticKind::RemovedInterface
            | DiagnosticKind::ChangedStatic
            | DiagnosticKind::AddedFinal
            | DiagnosticKind::ChangedTransient
            | DiagnosticKind::ChangedVolatile
            | DiagnosticKind::ChangedType
            | DiagnosticKind::ChangedValue
            | DiagnosticKind::ChangedSuperclass
            | DiagnosticKind::ChangedScope
            | DiagnosticKind::ChangedAbstract
            | DiagnosticKind::ChangedThrows
            | DiagnosticKind::ChangedClass
            | DiagnosticKind::ChangedFinal => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DiagnosticKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiagnosticKind::lookup(s)
            .ok_or_else(|| ApiError::invalid_args(format!("unknown diagnostic kind '{}'", s)))
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// One detected change or model problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Qualified identity of the offending unit (`a.B`, `a.B.m(int)`, `a.B#FIELD`).
    pub subject: String,
    pub message: String,
    pub position: SourcePosition,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
        position: SourcePosition,
    ) -> Self {
        Diagnostic {
            kind,
            subject: subject.into(),
            message: message.into(),
            position,
        }
    }

    pub fn is_breaking(&self) -> bool {
        self.kind.is_breaking()
    }

    /// Sort key giving stable report order: subject, then kind, then message.
    pub fn sort_key(&self) -> (&str, DiagnosticKind, &str) {
        (&self.subject, self.kind, &self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {}: {}",
            self.position,
            self.kind.name(),
            self.kind.code(),
            self.message
        )
    }
}

/// Sort diagnostics into stable report order.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
