//! Hierarchy flattening: what each type looks like once non-included
//! ancestors are erased from the API.
//!
//! Members declared on a non-included superclass (up to the first included
//! one) or on a non-included direct interface are *hoisted* onto the first
//! included descendant. Hoisted clones are reparented to the descendant and
//! their types are re-expressed through the type-argument mapping of the
//! path they were reached by:
//!
//! ```text
//! class Base<T> { T get(); }          // hidden
//! class Impl extends Base<String> {}  // included
//! Impl.self_methods() == [String get()]
//! ```
//!
//! External stubs are opaque: they are never included, but flattening stops
//! at them the same way it stops at an included ancestor, so references to
//! types outside the model survive in effective views.
//!
//! Every view is memoized per type on the [`ApiModel`].

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::model::ApiModel;
use crate::signature::{type_argument_mapping, TypeArgumentMap, TypeReference};
use crate::unit::{FieldUnit, MethodUnit, TypeId};

/// Upper bound on `all_interfaces` expansion for pathological generic graphs.
const MAX_INTERFACE_EXPANSION: usize = 4096;

// ============================================================================
// Class/Type Pairs
// ============================================================================

/// A supertype reached while walking a hierarchy, with the parameterized
/// reference it was reached through (expressed in the starting type's terms).
#[derive(Debug, Clone, PartialEq)]
pub struct ClassTypePair {
    pub unit: TypeId,
    pub reference: TypeReference,
}

impl ClassTypePair {
    pub fn new(unit: TypeId, reference: TypeReference) -> Self {
        ClassTypePair { unit, reference }
    }

    /// Mapping from the unit's type parameters to this reference's arguments.
    pub fn type_argument_mapping(&self, model: &ApiModel) -> TypeArgumentMap {
        model
            .type_unit(self.unit)
            .map(|unit| type_argument_mapping(&unit.type_params, &self.reference))
            .unwrap_or_default()
    }
}

// ============================================================================
// Flattened Views
// ============================================================================

impl ApiModel {
    /// Included, or an external stub: flattening does not look past it.
    fn exposes(&self, id: TypeId) -> bool {
        self.included(id) || self.type_unit(id).is_some_and(|u| u.is_stub())
    }

    /// The unit itself, then each real superclass, with type arguments
    /// cascaded upward.
    pub fn superclass_chain(&self, id: TypeId) -> &[ClassTypePair] {
        match self.cache(id) {
            Some(cache) => cache
                .superclass_chain
                .get_or_init(|| self.compute_superclass_chain(id)),
            None => &[],
        }
    }

    fn compute_superclass_chain(&self, id: TypeId) -> Vec<ClassTypePair> {
        let Some(unit) = self.type_unit(id) else {
            return Vec::new();
        };
        let mut chain = vec![ClassTypePair::new(id, unit.as_type_reference())];
        let mut visited = HashSet::from([id]);
        let mut link = unit.superclass();
        while let Some(current) = link {
            if !visited.insert(current.target) {
                break;
            }
            let mapping = chain
                .last()
                .map(|pair| pair.type_argument_mapping(self))
                .unwrap_or_default();
            chain.push(ClassTypePair::new(
                current.target,
                current.reference.substitute(&mapping),
            ));
            link = self.type_unit(current.target).and_then(|u| u.superclass());
        }
        chain
    }

    /// Direct interfaces of `id` re-expressed through `mapping`; a
    /// non-included interface is replaced by its own flattened interfaces.
    pub fn direct_interfaces_with_types(
        &self,
        id: TypeId,
        mapping: &TypeArgumentMap,
    ) -> Vec<ClassTypePair> {
        let mut out = Vec::new();
        let mut visiting = HashSet::new();
        self.collect_direct_interfaces(id, mapping, &mut visiting, &mut out);
        out
    }

    fn collect_direct_interfaces(
        &self,
        id: TypeId,
        mapping: &TypeArgumentMap,
        visiting: &mut HashSet<TypeId>,
        out: &mut Vec<ClassTypePair>,
    ) {
        let Some(unit) = self.type_unit(id) else {
            return;
        };
        if !visiting.insert(id) {
            return;
        }
        for link in unit.interfaces() {
            let pair = ClassTypePair::new(link.target, link.reference.substitute(mapping));
            if self.exposes(link.target) {
                out.push(pair);
            } else {
                let inner = pair.type_argument_mapping(self);
                self.collect_direct_interfaces(link.target, &inner, visiting, out);
            }
        }
        visiting.remove(&id);
    }

    /// Direct interfaces of the non-included prefix of the superclass chain,
    /// then the unit's own.
    pub fn interfaces_with_types(&self, id: TypeId) -> &[ClassTypePair] {
        match self.cache(id) {
            Some(cache) => cache.interfaces_with_types.get_or_init(|| {
                let mut out = Vec::new();
                for pair in self.superclass_chain(id).iter().skip(1) {
                    if self.exposes(pair.unit) {
                        break;
                    }
                    let mapping = pair.type_argument_mapping(self);
                    out.extend(self.direct_interfaces_with_types(pair.unit, &mapping));
                }
                out.extend(self.direct_interfaces_with_types(id, &TypeArgumentMap::new()));
                out
            }),
            None => &[],
        }
    }

    /// Every interface reachable from the unit, breadth first.
    ///
    /// Seeded with the direct interfaces of each non-included ancestor and
    /// then the unit's own; deduplicated on the parameterized name, first
    /// discovery wins.
    pub fn all_interfaces(&self, id: TypeId) -> &[ClassTypePair] {
        match self.cache(id) {
            Some(cache) => cache
                .all_interfaces
                .get_or_init(|| self.compute_all_interfaces(id)),
            None => &[],
        }
    }

    fn compute_all_interfaces(&self, id: TypeId) -> Vec<ClassTypePair> {
        let mut queue = VecDeque::new();
        for pair in self.superclass_chain(id).iter().skip(1) {
            if !self.exposes(pair.unit) {
                let mapping = pair.type_argument_mapping(self);
                queue.extend(self.direct_interfaces_with_types(pair.unit, &mapping));
            }
        }
        queue.extend(self.direct_interfaces_with_types(id, &TypeArgumentMap::new()));

        let mut visited = HashSet::new();
        let mut out = Vec::new();
        while let Some(pair) = queue.pop_front() {
            if !visited.insert(pair.reference.full_name()) {
                continue;
            }
            if out.len() >= MAX_INTERFACE_EXPANSION {
                tracing::warn!(type_id = %id, "interface expansion limit reached");
                break;
            }
            let mapping = pair.type_argument_mapping(self);
            queue.extend(self.direct_interfaces_with_types(pair.unit, &mapping));
            out.push(pair);
        }
        out
    }

    /// Nearest included ancestor for an included unit; the declared
    /// superclass otherwise.
    pub fn effective_superclass(&self, id: TypeId) -> Option<TypeId> {
        let cache = self.cache(id)?;
        *cache.effective_superclass.get_or_init(|| {
            if self.included(id) {
                self.superclass_chain(id)
                    .iter()
                    .skip(1)
                    .find(|pair| self.exposes(pair.unit))
                    .map(|pair| pair.unit)
            } else {
                self.type_unit(id)
                    .and_then(|u| u.superclass())
                    .map(|link| link.target)
            }
        })
    }

    /// Interfaces a client sees, sorted by qualified name.
    ///
    /// For an included unit, non-included interfaces (of the unit and of its
    /// non-included superclasses) are replaced by their own interfaces.
    pub fn effective_interfaces(&self, id: TypeId) -> &[TypeId] {
        match self.cache(id) {
            Some(cache) => cache
                .effective_interfaces
                .get_or_init(|| self.compute_effective_interfaces(id)),
            None => &[],
        }
    }

    fn compute_effective_interfaces(&self, id: TypeId) -> Vec<TypeId> {
        let Some(unit) = self.type_unit(id) else {
            return Vec::new();
        };
        let mut gathered: BTreeMap<String, TypeId> = BTreeMap::new();
        if self.included(id) {
            for pair in self.superclass_chain(id).iter().skip(1) {
                if self.exposes(pair.unit) {
                    break;
                }
                self.gather_hidden_interfaces(pair.unit, &mut gathered, &mut HashSet::new());
            }
            self.gather_hidden_interfaces(id, &mut gathered, &mut HashSet::new());
        } else {
            for link in unit.interfaces() {
                if let Some(target) = self.type_unit(link.target) {
                    gathered.insert(target.qualified_name().to_string(), link.target);
                }
            }
        }
        gathered.into_values().collect()
    }

    fn gather_hidden_interfaces(
        &self,
        id: TypeId,
        gathered: &mut BTreeMap<String, TypeId>,
        visiting: &mut HashSet<TypeId>,
    ) {
        let Some(unit) = self.type_unit(id) else {
            return;
        };
        if !visiting.insert(id) {
            return;
        }
        for link in unit.interfaces() {
            if self.exposes(link.target) {
                if let Some(target) = self.type_unit(link.target) {
                    gathered.insert(target.qualified_name().to_string(), link.target);
                }
            } else {
                self.gather_hidden_interfaces(link.target, gathered, visiting);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------------

    /// Hoisting sources: the non-included superclass prefix, then the
    /// non-included direct interfaces, nearest first.
    fn hoisting_sources(&self, id: TypeId) -> Vec<ClassTypePair> {
        let mut sources = Vec::new();
        for pair in self.superclass_chain(id).iter().skip(1) {
            if self.exposes(pair.unit) {
                break;
            }
            sources.push(pair.clone());
        }
        if let Some(unit) = self.type_unit(id) {
            for link in unit.interfaces() {
                if !self.exposes(link.target) {
                    sources.push(ClassTypePair::new(link.target, link.reference.clone()));
                }
            }
        }
        sources
    }

    /// Included own methods plus methods hoisted from non-included
    /// ancestors; own methods win. Sorted by name.
    pub fn self_methods(&self, id: TypeId) -> &[MethodUnit] {
        match self.cache(id) {
            Some(cache) => cache
                .self_methods
                .get_or_init(|| self.compute_self_methods(id)),
            None => &[],
        }
    }

    fn compute_self_methods(&self, id: TypeId) -> Vec<MethodUnit> {
        let Some(unit) = self.type_unit(id) else {
            return Vec::new();
        };
        let scope = self.erasure_scope(id);
        let mut by_key: BTreeMap<String, MethodUnit> = BTreeMap::new();

        for source in self.hoisting_sources(id) {
            let mapping = source.type_argument_mapping(self);
            for method in self.self_methods(source.unit) {
                let mut hoisted = method.reparented(id, &mapping);
                hoisted.signature_key = hoisted.compute_signature_key(&scope);
                by_key.entry(hoisted.signature_key.clone()).or_insert(hoisted);
            }
        }
        for method in unit.methods.iter().filter(|m| self.method_included(m)) {
            by_key.insert(method.signature_key.clone(), method.clone());
        }

        let mut methods: Vec<MethodUnit> = by_key.into_values().collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }

    /// Included own fields plus fields hoisted from non-included ancestors.
    pub fn self_fields(&self, id: TypeId) -> &[FieldUnit] {
        match self.cache(id) {
            Some(cache) => cache
                .self_fields
                .get_or_init(|| self.compute_self_fields(id)),
            None => &[],
        }
    }

    fn compute_self_fields(&self, id: TypeId) -> Vec<FieldUnit> {
        let Some(unit) = self.type_unit(id) else {
            return Vec::new();
        };
        let mut by_name: BTreeMap<String, FieldUnit> = BTreeMap::new();
        for source in self.hoisting_sources(id) {
            let mapping = source.type_argument_mapping(self);
            for field in self.self_fields(source.unit) {
                by_name
                    .entry(field.name.clone())
                    .or_insert_with(|| field.reparented(id, &mapping));
            }
        }
        for field in unit.fields.iter().filter(|f| self.field_included(f)) {
            by_name.insert(field.name.clone(), field.clone());
        }
        by_name.into_values().collect()
    }

    /// Every method a client can call: effective interfaces, then the
    /// effective superclass, then self methods, later sources winning.
    pub fn methods(&self, id: TypeId) -> &[MethodUnit] {
        match self.cache(id) {
            Some(cache) => cache.methods.get_or_init(|| {
                let mut all: BTreeMap<String, MethodUnit> = BTreeMap::new();
                for iface in self.effective_interfaces(id) {
                    for method in self.methods(*iface) {
                        all.insert(method.signature_key.clone(), method.clone());
                    }
                }
                if let Some(superclass) = self.effective_superclass(id) {
                    for method in self.methods(superclass) {
                        all.insert(method.signature_key.clone(), method.clone());
                    }
                }
                for method in self.self_methods(id) {
                    all.insert(method.signature_key.clone(), method.clone());
                }
                let mut methods: Vec<MethodUnit> = all.into_values().collect();
                methods.sort_by(|a, b| a.name.cmp(&b.name));
                methods
            }),
            None => &[],
        }
    }

    /// Every field a client can read, enum constants included, by name.
    pub fn fields(&self, id: TypeId) -> &[FieldUnit] {
        match self.cache(id) {
            Some(cache) => cache.fields.get_or_init(|| {
                let mut all: BTreeMap<String, FieldUnit> = BTreeMap::new();
                for iface in self.effective_interfaces(id) {
                    for field in self.fields(*iface) {
                        all.insert(field.name.clone(), field.clone());
                    }
                }
                if let Some(superclass) = self.effective_superclass(id) {
                    for field in self.fields(superclass) {
                        all.insert(field.name.clone(), field.clone());
                    }
                }
                for field in self.self_fields(id) {
                    all.insert(field.name.clone(), field.clone());
                }
                if let Some(unit) = self.type_unit(id) {
                    for constant in unit.enum_constants.iter().filter(|c| self.field_included(c)) {
                        all.insert(constant.name.clone(), constant.clone());
                    }
                }
                all.into_values().collect()
            }),
            None => &[],
        }
    }

    /// Included constructors sorted by signature.
    pub fn constructors(&self, id: TypeId) -> &[MethodUnit] {
        match self.cache(id) {
            Some(cache) => cache.constructors.get_or_init(|| {
                let mut ctors: Vec<MethodUnit> = self
                    .type_unit(id)
                    .map(|unit| {
                        unit.constructors
                            .iter()
                            .filter(|c| self.method_included(c))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                ctors.sort_by(|a, b| a.signature_key.cmp(&b.signature_key));
                ctors
            }),
            None => &[],
        }
    }

    // ------------------------------------------------------------------------
    // Subtyping
    // ------------------------------------------------------------------------

    /// Whether `qualified_name` is an effective ancestor of `id`, at any depth.
    pub fn is_derived_from(&self, id: TypeId, qualified_name: &str) -> bool {
        let mut visited = HashSet::new();
        self.derived_from(id, qualified_name, &mut visited)
    }

    fn derived_from(&self, id: TypeId, qualified_name: &str, visited: &mut HashSet<TypeId>) -> bool {
        if !visited.insert(id) {
            return false;
        }
        let parents = self
            .effective_superclass(id)
            .into_iter()
            .chain(self.effective_interfaces(id).iter().copied());
        for parent in parents {
            let matches = self
                .type_unit(parent)
                .is_some_and(|u| u.qualified_name() == qualified_name);
            if matches || self.derived_from(parent, qualified_name, visited) {
                return true;
            }
        }
        false
    }

    /// Whether `id` is, implements, or extends a type implementing, the
    /// interface `qualified_name`. Walks real links.
    pub fn implements_interface(&self, id: TypeId, qualified_name: &str) -> bool {
        let mut visited = HashSet::new();
        self.implements(id, qualified_name, &mut visited)
    }

    fn implements(&self, id: TypeId, qualified_name: &str, visited: &mut HashSet<TypeId>) -> bool {
        let Some(unit) = self.type_unit(id) else {
            return false;
        };
        if unit.qualified_name() == qualified_name {
            return true;
        }
        if !visited.insert(id) {
            return false;
        }
        unit.interfaces()
            .iter()
            .any(|link| self.implements(link.target, qualified_name, visited))
            || unit
                .superclass()
                .is_some_and(|link| self.implements(link.target, qualified_name, visited))
    }

    /// Whether `id` is `qualified_name` or has it in its real superclass chain.
    pub fn extends_class(&self, id: TypeId, qualified_name: &str) -> bool {
        self.superclass_chain(id).iter().any(|pair| {
            self.type_unit(pair.unit)
                .is_some_and(|u| u.qualified_name() == qualified_name)
        })
    }

    /// `implements_interface || extends_class`.
    pub fn is_assignable_to(&self, id: TypeId, qualified_name: &str) -> bool {
        self.implements_interface(id, qualified_name) || self.extends_class(id, qualified_name)
    }
}
