//! Command implementations behind the `apicheck` binary.
//!
//! - `check` loads a baseline and a candidate snapshot, compares them and
//!   reports every diagnostic at its configured severity
//! - `surface` loads one snapshot and prints its visible API
//!
//! Both commands write either a JSON response (see `apicheck_core::output`)
//! or a line-oriented text report. The caller decides the exit status from
//! the returned response.

use std::io::Write;
use std::path::PathBuf;

use clap::ValueEnum;

use apicheck_core::compat::{sort_diagnostics, CompatChecker};
use apicheck_core::error::ApiError;
use apicheck_core::output::{
    emit_response, CheckResponse, DiagnosticInfo, InputInfo, SurfaceResponse, SurfaceType,
};

use crate::config::ResolvedConfig;
use crate::snapshot::load_model;

/// Report format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per diagnostic plus a summary.
    #[default]
    Text,
    /// Pretty-printed JSON response.
    Json,
}

/// Inputs of the `check` command.
#[derive(Debug, Clone)]
pub struct CheckArgs {
    pub baseline: PathBuf,
    pub candidate: PathBuf,
    /// Include the API delta in the report.
    pub delta: bool,
    pub format: OutputFormat,
}

/// Inputs of the `surface` command.
#[derive(Debug, Clone)]
pub struct SurfaceArgs {
    pub snapshot: PathBuf,
    pub format: OutputFormat,
}

// ============================================================================
// check
// ============================================================================

/// Compare two snapshots and write the report.
///
/// Model diagnostics raised while either snapshot was built are merged into
/// the check's diagnostics so unresolved references show up in the report.
pub fn run_check(
    args: &CheckArgs,
    config: &ResolvedConfig,
    writer: &mut impl Write,
) -> Result<CheckResponse, ApiError> {
    let policy = config.visibility_policy()?;
    let baseline = load_model(&args.baseline, policy.clone())?;
    let candidate = load_model(&args.candidate, policy)?;

    let checker = CompatChecker::new(&baseline.model, &candidate.model)
        .with_options(config.check_options(args.delta));
    let mut check = checker.check_api(&config.ignore_set());
    check
        .diagnostics
        .extend(baseline.model.diagnostics().iter().cloned());
    check
        .diagnostics
        .extend(candidate.model.diagnostics().iter().cloned());
    sort_diagnostics(&mut check.diagnostics);
    check.diagnostics.dedup();

    let inputs = vec![
        InputInfo::new(
            "baseline",
            baseline.path.display().to_string(),
            &baseline.sha256,
        ),
        InputInfo::new(
            "candidate",
            candidate.path.display().to_string(),
            &candidate.sha256,
        ),
    ];
    let response = CheckResponse::from_check(&check, inputs, |kind| config.severity(kind), args.delta);

    match args.format {
        OutputFormat::Json => emit_response(&response, writer),
        OutputFormat::Text => write_check_text(&response, writer),
    }
    .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(response)
}

fn write_check_text(response: &CheckResponse, writer: &mut impl Write) -> std::io::Result<()> {
    for diagnostic in &response.diagnostics {
        writeln!(writer, "{}", diagnostic_line(diagnostic))?;
    }
    if let Some(delta) = &response.delta {
        for unit in delta {
            writeln!(writer, "delta: {} {}", unit.kind, unit.qualified_name)?;
            for member in unit.constructors.iter().chain(&unit.methods) {
                writeln!(writer, "delta:     {}", member)?;
            }
        }
    }
    let summary = &response.summary;
    writeln!(
        writer,
        "{} error(s), {} warning(s) in {} package(s) and {} type(s)",
        summary.errors, summary.warnings, summary.packages_checked, summary.types_checked
    )
}

/// `where: severity code: message [KIND]`, with the subject standing in for
/// an unknown location.
fn diagnostic_line(diagnostic: &DiagnosticInfo) -> String {
    let place = match &diagnostic.location {
        Some(position) => position.to_string(),
        None => diagnostic.subject.clone(),
    };
    format!(
        "{}: {} {}: {} [{}]",
        place, diagnostic.severity, diagnostic.code, diagnostic.message, diagnostic.kind
    )
}

// ============================================================================
// surface
// ============================================================================

/// Load one snapshot and write its visible API.
pub fn run_surface(
    args: &SurfaceArgs,
    config: &ResolvedConfig,
    writer: &mut impl Write,
) -> Result<SurfaceResponse, ApiError> {
    let loaded = load_model(&args.snapshot, config.visibility_policy()?)?;
    let input = InputInfo::new("snapshot", loaded.path.display().to_string(), &loaded.sha256);
    let response = SurfaceResponse::from_model(&loaded.model, input);

    match args.format {
        OutputFormat::Json => emit_response(&response, writer),
        OutputFormat::Text => write_surface_text(&response, writer),
    }
    .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(response)
}

fn write_surface_text(response: &SurfaceResponse, writer: &mut impl Write) -> std::io::Result<()> {
    for ty in &response.types {
        writeln!(writer, "{}", type_header(ty))?;
        for ctor in &ty.constructors {
            writeln!(writer, "    ctor {};", ctor)?;
        }
        for method in &ty.methods {
            writeln!(writer, "    method {};", method)?;
        }
        for field in &ty.fields {
            writeln!(writer, "    field {};", field)?;
        }
    }
    for diagnostic in &response.diagnostics {
        writeln!(writer, "{}", diagnostic_line(diagnostic))?;
    }
    Ok(())
}

fn type_header(ty: &SurfaceType) -> String {
    let mut header = format!("{} {}", ty.kind, ty.qualified_name);
    if let Some(superclass) = &ty.superclass {
        header.push_str(" extends ");
        header.push_str(superclass);
    }
    if !ty.interfaces.is_empty() {
        header.push_str(" implements ");
        header.push_str(&ty.interfaces.join(", "));
    }
    header
}
