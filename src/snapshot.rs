//! API snapshots: a JSON rendering of an API graph.
//!
//! A snapshot lists packages and, inside each, top-level types with their
//! nested types, supertypes and members. Types are written as type strings
//! (`java.util.Map<K, V>[]`, `T extends Number & Comparable<T>`).
//!
//! Loading goes through the [`ApiGraph`] registration calls, so a snapshot
//! is subject to exactly the same checks as any other front-end. Exporting
//! a frozen model produces a snapshot that loads back to an equivalent model.
//!
//! A snapshot path may be a single `.json` file or a directory, in which case
//! every `.json` file below it is read in path order and packages with the
//! same name are merged.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use apicheck_core::error::ApiError;
use apicheck_core::graph::ApiGraph;
use apicheck_core::model::ApiModel;
use apicheck_core::signature::{parse_parameter_type, TypeParameter, TypeReference};
use apicheck_core::types::SourcePosition;
use apicheck_core::unit::{
    Directives, FieldModifiers, FieldUnit, MethodLink, MethodModifiers, MethodUnit, PackageId,
    Parameter, TypeDeclaration, TypeId, TypeKind, TypeModifiers, TypeUnit, Visibility,
};
use apicheck_core::visibility::VisibilityPolicy;

// ============================================================================
// Document Types
// ============================================================================

/// Root of a snapshot document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    #[serde(default)]
    pub packages: Vec<PackageSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
    #[serde(default)]
    pub types: Vec<TypeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeSnapshot {
    /// Simple name of this declaration (no package, no enclosing types).
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "abstract", skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    #[serde(default, rename = "final", skip_serializing_if = "is_false")]
    pub is_final: bool,
    #[serde(default, rename = "static", skip_serializing_if = "is_false")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "is_no_directives")]
    pub directives: Directives,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "is_unknown_position")]
    pub position: SourcePosition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<TypeReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<TypeReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<MethodSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_constants: Vec<FieldSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<TypeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSnapshot>,
    /// Required for methods, absent for constructors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeReference>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "static", skip_serializing_if = "is_false")]
    pub is_static: bool,
    #[serde(default, rename = "final", skip_serializing_if = "is_false")]
    pub is_final: bool,
    #[serde(default, rename = "abstract", skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    #[serde(default, rename = "synchronized", skip_serializing_if = "is_false")]
    pub is_synchronized: bool,
    #[serde(default, rename = "native", skip_serializing_if = "is_false")]
    pub is_native: bool,
    #[serde(default, rename = "default", skip_serializing_if = "is_false")]
    pub is_default: bool,
    #[serde(default, rename = "synthetic", skip_serializing_if = "is_false")]
    pub is_synthetic: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub throws: Vec<TypeReference>,
    /// Directly overridden method as `owner.Qualified.Name#name(erased,params)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<String>,
    #[serde(default, skip_serializing_if = "is_no_directives")]
    pub directives: Directives,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "is_unknown_position")]
    pub position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSnapshot {
    pub name: String,
    /// Parameter type; a trailing `...` marks a vararg.
    #[serde(rename = "type")]
    pub param_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSnapshot {
    pub name: String,
    /// Required for fields; ignored for enum constants.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<TypeReference>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "static", skip_serializing_if = "is_false")]
    pub is_static: bool,
    #[serde(default, rename = "final", skip_serializing_if = "is_false")]
    pub is_final: bool,
    #[serde(default, rename = "transient", skip_serializing_if = "is_false")]
    pub is_transient: bool,
    #[serde(default, rename = "volatile", skip_serializing_if = "is_false")]
    pub is_volatile: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "is_no_directives")]
    pub directives: Directives,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "is_unknown_position")]
    pub position: SourcePosition,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_no_directives(d: &Directives) -> bool {
    *d == Directives::none()
}

fn is_unknown_position(p: &SourcePosition) -> bool {
    !p.is_known()
}

// ============================================================================
// Loading
// ============================================================================

/// A snapshot read from disk with the digest of its input bytes.
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub path: PathBuf,
    pub snapshot: Snapshot,
    /// Hex SHA-256 over every input file, in the order read.
    pub sha256: String,
}

/// A frozen model built from a snapshot.
#[derive(Debug)]
pub struct LoadedModel {
    pub path: PathBuf,
    pub sha256: String,
    pub model: ApiModel,
}

impl Snapshot {
    /// Parse a snapshot document.
    pub fn from_json(json: &str, origin: &str) -> Result<Snapshot, ApiError> {
        serde_json::from_str(json).map_err(|e| ApiError::snapshot(origin, e.to_string()))
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ApiError> {
        serde_json::to_string_pretty(self).map_err(|e| ApiError::internal(e.to_string()))
    }

    /// Read a snapshot file, or every `.json` file below a directory.
    pub fn load(path: &Path) -> Result<LoadedSnapshot, ApiError> {
        let display_path = path.display().to_string();
        let files = snapshot_files(path)?;
        if files.is_empty() {
            return Err(ApiError::snapshot(&display_path, "no .json files found"));
        }

        let mut hasher = Sha256::new();
        let mut merged = Snapshot::default();
        for file in &files {
            let origin = file.display().to_string();
            let bytes = fs::read(file).map_err(|e| ApiError::snapshot(&origin, e.to_string()))?;
            hasher.update(&bytes);
            let text = String::from_utf8(bytes)
                .map_err(|e| ApiError::snapshot(&origin, e.to_string()))?;
            merged.merge(Snapshot::from_json(&text, &origin)?);
        }
        tracing::debug!(path = %display_path, files = files.len(), "loaded snapshot");

        Ok(LoadedSnapshot {
            path: path.to_path_buf(),
            snapshot: merged,
            sha256: hex::encode(hasher.finalize()),
        })
    }

    /// Append another snapshot's packages, merging packages by name.
    pub fn merge(&mut self, other: Snapshot) {
        for package in other.packages {
            match self.packages.iter_mut().find(|p| p.name == package.name) {
                Some(existing) => {
                    existing.hidden |= package.hidden;
                    existing.removed |= package.removed;
                    existing.types.extend(package.types);
                }
                None => self.packages.push(package),
            }
        }
    }

    /// Register every package, type and member into a fresh graph.
    ///
    /// The graph is returned unresolved.
    pub fn to_graph(&self) -> Result<ApiGraph, ApiError> {
        let mut graph = ApiGraph::new();
        for package in &self.packages {
            let pkg = graph.register_package(&package.name);
            graph.set_package_directives(
                pkg,
                Directives {
                    hidden: package.hidden,
                    removed: package.removed,
                    force_show: false,
                },
            )?;
            for ty in &package.types {
                let qualified = qualify(&package.name, &ty.name);
                register_type(&mut graph, pkg, None, &qualified, ty)?;
            }
        }
        Ok(graph)
    }

    /// Register, resolve and freeze.
    pub fn to_model(&self, policy: VisibilityPolicy) -> Result<ApiModel, ApiError> {
        let mut graph = self.to_graph()?;
        let summary = graph.resolve();
        tracing::debug!(
            passes = summary.passes,
            resolved = summary.resolved,
            unresolved = summary.unresolved,
            "resolved snapshot references"
        );
        graph.freeze(policy)
    }
}

/// Load a snapshot path and build its frozen model.
pub fn load_model(path: &Path, policy: VisibilityPolicy) -> Result<LoadedModel, ApiError> {
    let loaded = Snapshot::load(path)?;
    let model = loaded.snapshot.to_model(policy)?;
    Ok(LoadedModel {
        path: loaded.path,
        sha256: loaded.sha256,
        model,
    })
}

fn snapshot_files(path: &Path) -> Result<Vec<PathBuf>, ApiError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(ApiError::snapshot(
            path.display().to_string(),
            "no such file or directory",
        ));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| ApiError::snapshot(path.display().to_string(), e.to_string()))?;
        let is_json = entry.path().extension().is_some_and(|ext| ext == "json");
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn register_type(
    graph: &mut ApiGraph,
    pkg: PackageId,
    enclosing: Option<TypeId>,
    qualified_name: &str,
    ty: &TypeSnapshot,
) -> Result<TypeId, ApiError> {
    let mut decl = TypeDeclaration::new(ty.kind, pkg)
        .with_visibility(ty.visibility)
        .with_modifiers(TypeModifiers {
            is_abstract: ty.is_abstract || ty.kind.is_interface(),
            is_final: ty.is_final || ty.kind == TypeKind::Enum,
            is_static: ty.is_static,
        })
        .with_directives(ty.directives)
        .with_deprecated(ty.deprecated)
        .with_position(ty.position.clone());
    if let Some(outer) = enclosing {
        decl = decl.nested_in(outer);
    }
    if let Some(doc) = &ty.documentation {
        decl = decl.with_documentation(doc.clone());
    }
    for param in &ty.type_params {
        decl = decl.with_type_param(param.clone());
    }
    for import in &ty.imports {
        decl = decl.with_import(import.clone());
    }
    let id = graph.register_type(qualified_name, decl)?;

    if let Some(superclass) = &ty.extends {
        graph.link_superclass(id, superclass.clone())?;
    }
    for iface in &ty.implements {
        graph.link_interface(id, iface.clone())?;
    }
    for ctor in &ty.constructors {
        let unit = method_unit(graph, MethodUnit::constructor(ty.name.clone()), ctor)?;
        graph.add_constructor(id, unit)?;
    }
    for method in &ty.methods {
        let returns = method.returns.clone().ok_or_else(|| {
            ApiError::snapshot(
                qualified_name,
                format!("method '{}' has no return type", method.name),
            )
        })?;
        let unit = method_unit(graph, MethodUnit::method(method.name.clone(), returns), method)?;
        graph.add_method(id, unit)?;
    }
    for field in &ty.fields {
        let field_type = field.field_type.clone().ok_or_else(|| {
            ApiError::snapshot(qualified_name, format!("field '{}' has no type", field.name))
        })?;
        graph.add_field(id, field_unit(FieldUnit::field(field.name.clone(), field_type), field))?;
    }
    for constant in &ty.enum_constants {
        graph.add_enum_constant(
            id,
            field_unit(FieldUnit::enum_constant(constant.name.clone()), constant),
        )?;
    }
    for nested in &ty.nested {
        let nested_name = qualify(qualified_name, &nested.name);
        register_type(graph, pkg, Some(id), &nested_name, nested)?;
    }
    Ok(id)
}

fn method_unit(
    graph: &mut ApiGraph,
    base: MethodUnit,
    snap: &MethodSnapshot,
) -> Result<MethodUnit, ApiError> {
    let mut unit = base
        .with_visibility(snap.visibility)
        .with_modifiers(MethodModifiers {
            is_static: snap.is_static,
            is_final: snap.is_final,
            is_abstract: snap.is_abstract,
            is_synchronized: snap.is_synchronized,
            is_native: snap.is_native,
            is_default: snap.is_default,
            is_synthetic: snap.is_synthetic,
        })
        .with_directives(snap.directives)
        .with_deprecated(snap.deprecated)
        .with_position(snap.position.clone());
    for param in &snap.type_params {
        unit = unit.with_type_param(param.clone());
    }
    for param in &snap.params {
        let (param_type, varargs) = parse_parameter_type(&param.param_type)?;
        unit = unit.with_param(if varargs {
            Parameter::varargs(param.name.clone(), param_type)
        } else {
            Parameter::new(param.name.clone(), param_type)
        });
    }
    for exception in &snap.throws {
        unit = unit.with_throws(exception.clone());
    }
    if let Some(doc) = &snap.documentation {
        unit = unit.with_documentation(doc.clone());
    }
    if let Some(link) = &snap.overrides {
        let (owner, signature) = link.split_once('#').ok_or_else(|| {
            ApiError::snapshot(
                &snap.name,
                format!("override link '{}' must be 'Owner#signature'", link),
            )
        })?;
        let owner = graph.reference_type(owner);
        unit = unit.with_overridden(MethodLink::new(owner, signature));
    }
    Ok(unit)
}

fn field_unit(base: FieldUnit, snap: &FieldSnapshot) -> FieldUnit {
    let mut unit = base
        .with_visibility(snap.visibility)
        .with_modifiers(FieldModifiers {
            is_static: snap.is_static,
            is_final: snap.is_final,
            is_transient: snap.is_transient,
            is_volatile: snap.is_volatile,
        })
        .with_directives(snap.directives)
        .with_deprecated(snap.deprecated)
        .with_position(snap.position.clone());
    if let Some(value) = &snap.value {
        unit = unit.with_value(value.clone());
    }
    if let Some(doc) = &snap.documentation {
        unit = unit.with_documentation(doc.clone());
    }
    unit
}

// ============================================================================
// Export
// ============================================================================

impl Snapshot {
    /// Render a frozen model. Stubs are not written.
    pub fn from_model(model: &ApiModel) -> Snapshot {
        let packages = model
            .packages()
            .into_iter()
            .map(|package| {
                let mut top_level: BTreeMap<&str, TypeId> = BTreeMap::new();
                for id in package.types() {
                    if let Some(unit) = model.type_unit(id) {
                        if unit.enclosing.is_none() {
                            top_level.insert(unit.simple_name(), id);
                        }
                    }
                }
                PackageSnapshot {
                    name: package.name().to_string(),
                    hidden: package.directives.hidden,
                    removed: package.directives.removed,
                    types: top_level
                        .values()
                        .filter_map(|id| type_snapshot(model, *id))
                        .collect(),
                }
            })
            .collect();
        Snapshot { packages }
    }
}

fn type_snapshot(model: &ApiModel, id: TypeId) -> Option<TypeSnapshot> {
    let unit = model.type_unit(id)?;
    let name = unit
        .simple_name()
        .rsplit('.')
        .next()
        .unwrap_or(unit.simple_name())
        .to_string();
    let mut nested: Vec<&TypeUnit> = unit
        .nested
        .iter()
        .filter_map(|n| model.type_unit(*n))
        .collect();
    nested.sort_by(|a, b| a.qualified_name().cmp(b.qualified_name()));

    Some(TypeSnapshot {
        name,
        kind: unit.kind,
        visibility: unit.visibility,
        is_abstract: unit.modifiers.is_abstract && !unit.kind.is_interface(),
        is_final: unit.modifiers.is_final,
        is_static: unit.modifiers.is_static,
        directives: unit.directives,
        deprecated: unit.deprecated,
        documentation: unit.documentation.clone(),
        position: unit.position.clone(),
        type_params: unit.type_params.clone(),
        extends: unit.superclass().map(|link| link.reference.clone()),
        implements: unit
            .interfaces()
            .iter()
            .map(|link| link.reference.clone())
            .collect(),
        imports: unit.imports.clone(),
        constructors: unit
            .constructors
            .iter()
            .map(|c| method_snapshot(model, c))
            .collect(),
        methods: unit
            .methods
            .iter()
            .map(|m| method_snapshot(model, m))
            .collect(),
        fields: unit.fields.iter().map(field_snapshot).collect(),
        enum_constants: unit.enum_constants.iter().map(field_snapshot).collect(),
        nested: nested
            .into_iter()
            .filter_map(|n| type_snapshot(model, n.id()))
            .collect(),
    })
}

fn method_snapshot(model: &ApiModel, method: &MethodUnit) -> MethodSnapshot {
    MethodSnapshot {
        name: method.name.clone(),
        type_params: method.type_params.clone(),
        params: method
            .params
            .iter()
            .map(|p| ParamSnapshot {
                name: p.name.clone(),
                param_type: p.display_type(),
            })
            .collect(),
        returns: method.return_type.clone(),
        visibility: method.visibility,
        is_static: method.modifiers.is_static,
        is_final: method.modifiers.is_final,
        is_abstract: method.modifiers.is_abstract,
        is_synchronized: method.modifiers.is_synchronized,
        is_native: method.modifiers.is_native,
        is_default: method.modifiers.is_default,
        is_synthetic: method.modifiers.is_synthetic,
        throws: method.throws.clone(),
        overrides: method.overridden.as_ref().and_then(|link| {
            model
                .type_unit(link.owner)
                .map(|owner| format!("{}#{}", owner.qualified_name(), link.signature))
        }),
        directives: method.directives,
        deprecated: method.deprecated,
        documentation: method.documentation.clone(),
        position: method.position.clone(),
    }
}

fn field_snapshot(field: &FieldUnit) -> FieldSnapshot {
    FieldSnapshot {
        name: field.name.clone(),
        field_type: (!field.is_enum_constant).then(|| field.field_type.clone()),
        visibility: field.visibility,
        is_static: field.modifiers.is_static,
        is_final: field.modifiers.is_final,
        is_transient: field.modifiers.is_transient,
        is_volatile: field.modifiers.is_volatile,
        value: field.constant_value.clone(),
        directives: field.directives,
        deprecated: field.deprecated,
        documentation: field.documentation.clone(),
        position: field.position.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use apicheck_core::compat::CompatChecker;

    const SHAPES: &str = r#"{
        "packages": [
            {
                "name": "com.example.shapes",
                "types": [
                    {
                        "name": "Shape",
                        "kind": "interface",
                        "methods": [
                            { "name": "area", "returns": "double", "abstract": true,
                              "documentation": "Area of the shape." }
                        ]
                    },
                    {
                        "name": "AbstractShape",
                        "visibility": "package_private",
                        "abstract": true,
                        "implements": ["Shape"],
                        "type_params": ["T extends java.lang.Number"],
                        "methods": [
                            { "name": "scale", "returns": "void",
                              "params": [ { "name": "factor", "type": "T" } ] }
                        ]
                    },
                    {
                        "name": "Circle",
                        "extends": "AbstractShape<java.lang.Double>",
                        "constructors": [
                            { "name": "Circle", "params": [ { "name": "r", "type": "double" } ] }
                        ],
                        "methods": [
                            { "name": "area", "returns": "double" },
                            { "name": "of", "returns": "com.example.shapes.Circle", "static": true,
                              "params": [ { "name": "radii", "type": "double..." } ] }
                        ],
                        "fields": [
                            { "name": "UNIT", "type": "double", "static": true, "final": true, "value": "1.0" }
                        ],
                        "nested": [
                            { "name": "Builder", "static": true,
                              "methods": [ { "name": "build", "returns": "Circle" } ] }
                        ]
                    },
                    {
                        "name": "Color",
                        "kind": "enum",
                        "enum_constants": [ { "name": "RED" }, { "name": "BLUE" } ]
                    }
                ]
            }
        ]
    }"#;

    fn shapes() -> ApiModel {
        Snapshot::from_json(SHAPES, "shapes.json")
            .unwrap()
            .to_model(VisibilityPolicy::default())
            .unwrap()
    }

    mod load_tests {
        use super::*;

        #[test]
        fn registers_types_and_members() {
            let model = shapes();
            let circle = model.lookup("com.example.shapes.Circle").unwrap();
            assert!(model.lookup("com.example.shapes.Circle.Builder").is_some());

            let names: Vec<&str> = model.methods(circle).iter().map(|m| m.name.as_str()).collect();
            assert_eq!(names, vec!["area", "of", "scale"]);

            let scale = model.methods(circle).iter().find(|m| m.name == "scale").unwrap();
            assert_eq!(scale.signature_key(), "scale(java.lang.Double)");

            let of = model.methods(circle).iter().find(|m| m.name == "of").unwrap();
            assert_eq!(of.signature_key(), "of(double...)");

            let color = model.lookup("com.example.shapes.Color").unwrap();
            assert_eq!(model.fields(color).len(), 2);
        }

        #[test]
        fn unknown_fields_are_rejected() {
            let err = Snapshot::from_json(r#"{"packages": [], "extra": 1}"#, "bad.json").unwrap_err();
            assert!(matches!(err, ApiError::Snapshot { .. }));
        }

        #[test]
        fn method_without_return_type_is_rejected() {
            let json = r#"{"packages": [{"name": "a", "types": [
                {"name": "T", "methods": [{"name": "m"}]}
            ]}]}"#;
            let err = Snapshot::from_json(json, "t.json").unwrap().to_graph().unwrap_err();
            assert!(err.to_string().contains("no return type"));
        }

        #[test]
        fn bad_type_string_is_rejected() {
            let json = r#"{"packages": [{"name": "a", "types": [
                {"name": "T", "extends": "Base<"}
            ]}]}"#;
            assert!(Snapshot::from_json(json, "t.json").is_err());
        }

        #[test]
        fn directory_inputs_are_merged() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(
                dir.path().join("a.json"),
                r#"{"packages": [{"name": "p", "types": [{"name": "A"}]}]}"#,
            )
            .unwrap();
            fs::create_dir(dir.path().join("more")).unwrap();
            fs::write(
                dir.path().join("more").join("b.json"),
                r#"{"packages": [{"name": "p", "types": [{"name": "B"}]}]}"#,
            )
            .unwrap();
            fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

            let loaded = Snapshot::load(dir.path()).unwrap();
            assert_eq!(loaded.snapshot.packages.len(), 1);
            assert_eq!(loaded.snapshot.packages[0].types.len(), 2);
            assert_eq!(loaded.sha256.len(), 64);

            let again = Snapshot::load(dir.path()).unwrap();
            assert_eq!(loaded.sha256, again.sha256);
        }

        #[test]
        fn missing_path_is_a_snapshot_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = Snapshot::load(&dir.path().join("absent.json")).unwrap_err();
            assert_eq!(err.error_code().code(), 4);
        }
    }

    mod export_tests {
        use super::*;

        #[test]
        fn exported_snapshot_checks_consistent_against_source_model() {
            let source = shapes();
            let json = Snapshot::from_model(&source).to_json().unwrap();
            let reloaded = Snapshot::from_json(&json, "export.json")
                .unwrap()
                .to_model(VisibilityPolicy::default())
                .unwrap();

            let check = CompatChecker::new(&source, &reloaded).check_api(&HashSet::new());
            assert!(check.consistent, "{:?}", check.diagnostics);
            assert!(check.diagnostics.is_empty());
        }

        #[test]
        fn export_skips_stubs_and_keeps_nesting() {
            let snapshot = Snapshot::from_model(&shapes());
            let package = &snapshot.packages[0];
            let names: Vec<&str> = package.types.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(names, vec!["AbstractShape", "Circle", "Color", "Shape"]);
            let circle = &package.types[1];
            assert_eq!(circle.nested.len(), 1);
            assert_eq!(circle.nested[0].name, "Builder");
            assert_eq!(circle.methods[1].params[0].param_type, "double...");
        }
    }
}
