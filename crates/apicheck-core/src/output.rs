//! JSON output types and serialization for driver responses.
//!
//! Every response starts with `status` and `schema_version`, arrays are in a
//! deterministic order, and an absent optional field means "not applicable".

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::compat::{ApiCheck, Diagnostic, DiagnosticKind, Severity};
use crate::error::{ApiError, OutputErrorCode};
use crate::model::ApiModel;
use crate::types::SourcePosition;
use crate::unit::{TypeId, TypeUnit};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Diagnostics
// ============================================================================

/// One diagnostic as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticInfo {
    /// Stable numeric code.
    pub code: u16,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub subject: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourcePosition>,
}

impl DiagnosticInfo {
    pub fn new(diagnostic: &Diagnostic, severity: Severity) -> Self {
        DiagnosticInfo {
            code: diagnostic.kind.code(),
            kind: diagnostic.kind,
            severity,
            subject: diagnostic.subject.clone(),
            message: diagnostic.message.clone(),
            location: diagnostic
                .position
                .is_known()
                .then(|| diagnostic.position.clone()),
        }
    }
}

/// Counts by severity plus the amount of work done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub errors: u32,
    pub warnings: u32,
    /// Diagnostics suppressed by a hidden severity.
    pub hidden: u32,
    pub packages_checked: u32,
    pub types_checked: u32,
}

/// A snapshot input and its content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputInfo {
    /// `baseline` or `candidate`.
    pub role: String,
    pub path: String,
    /// Hex SHA-256 of the input bytes.
    pub sha256: String,
}

impl InputInfo {
    pub fn new(role: impl Into<String>, path: impl Into<String>, sha256: impl Into<String>) -> Self {
        InputInfo {
            role: role.into(),
            path: path.into(),
            sha256: sha256.into(),
        }
    }
}

/// Compact rendering of a delta unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaInfo {
    pub qualified_name: String,
    pub kind: String,
    pub constructors: Vec<String>,
    pub methods: Vec<String>,
}

impl DeltaInfo {
    pub fn from_unit(unit: &TypeUnit) -> Self {
        DeltaInfo {
            qualified_name: unit.qualified_name().to_string(),
            kind: unit.kind.keyword().to_string(),
            constructors: unit.constructors.iter().map(|c| c.to_string()).collect(),
            methods: unit.methods.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Response for the `check` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    /// No breaking diagnostics were found.
    pub consistent: bool,
    /// No diagnostic was reported at error severity.
    pub passed: bool,
    pub inputs: Vec<InputInfo>,
    pub summary: CheckSummary,
    /// Reported diagnostics; hidden ones are omitted.
    pub diagnostics: Vec<DiagnosticInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<Vec<DeltaInfo>>,
}

impl CheckResponse {
    /// Build a response from a finished check, resolving each diagnostic's
    /// severity through `severity`.
    pub fn from_check(
        check: &ApiCheck,
        inputs: Vec<InputInfo>,
        severity: impl Fn(DiagnosticKind) -> Severity,
        include_delta: bool,
    ) -> Self {
        let mut summary = CheckSummary {
            packages_checked: check.packages_checked as u32,
            types_checked: check.types_checked as u32,
            ..CheckSummary::default()
        };
        let mut diagnostics = Vec::new();
        for diagnostic in &check.diagnostics {
            let level = severity(diagnostic.kind);
            match level {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Hidden => {
                    summary.hidden += 1;
                    continue;
                }
            }
            diagnostics.push(DiagnosticInfo::new(diagnostic, level));
        }

        CheckResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            consistent: check.consistent,
            passed: summary.errors == 0,
            inputs,
            summary,
            diagnostics,
            delta: include_delta.then(|| check.delta.iter().map(DeltaInfo::from_unit).collect()),
        }
    }
}

// ============================================================================
// Surface
// ============================================================================

/// The visible API of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceType {
    pub qualified_name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub constructors: Vec<String>,
    pub methods: Vec<String>,
    pub fields: Vec<String>,
}

impl SurfaceType {
    /// Describe `id` through the model's flattened views.
    pub fn from_model(model: &ApiModel, id: TypeId) -> Option<Self> {
        let unit = model.type_unit(id)?;
        let name_of = |id: TypeId| {
            model
                .type_unit(id)
                .map(|u| u.qualified_name().to_string())
        };
        Some(SurfaceType {
            qualified_name: unit.qualified_name().to_string(),
            kind: unit.kind.keyword().to_string(),
            superclass: model.effective_superclass(id).and_then(name_of),
            interfaces: model
                .effective_interfaces(id)
                .iter()
                .filter_map(|iface| name_of(*iface))
                .collect(),
            constructors: model.constructors(id).iter().map(|c| c.to_string()).collect(),
            methods: model.methods(id).iter().map(|m| m.to_string()).collect(),
            fields: model.fields(id).iter().map(|f| f.to_string()).collect(),
        })
    }
}

/// Response for the `surface` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub input: InputInfo,
    /// Included types ordered by qualified name.
    pub types: Vec<SurfaceType>,
    /// Diagnostics raised while the model was built.
    pub diagnostics: Vec<DiagnosticInfo>,
}

impl SurfaceResponse {
    pub fn from_model(model: &ApiModel, input: InputInfo) -> Self {
        let mut types: Vec<SurfaceType> = model
            .types()
            .iter()
            .filter(|unit| model.included(unit.id()))
            .filter_map(|unit| SurfaceType::from_model(model, unit.id()))
            .collect();
        types.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        let diagnostics = model
            .diagnostics()
            .iter()
            .map(|d| DiagnosticInfo::new(d, d.kind.default_severity()))
            .collect();
        SurfaceResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            input,
            types,
            diagnostics,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error details carried by an [`ErrorResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (see [`OutputErrorCode`]).
    pub code: u8,
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &ApiError) -> Self {
        let details = match err {
            ApiError::PendingReferences { pending } => {
                Some(serde_json::json!({ "pending": pending }))
            }
            ApiError::DuplicateMember { owner, signature } => {
                Some(serde_json::json!({ "owner": owner, "signature": signature }))
            }
            ApiError::Snapshot { path, .. } => Some(serde_json::json!({ "path": path })),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

/// Response for any failed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &ApiError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }

    /// Create an error response with just code and message.
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo {
                code,
                message: message.into(),
                details: None,
            },
        }
    }
}

// ============================================================================
// Emitters
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line) to a writer.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
