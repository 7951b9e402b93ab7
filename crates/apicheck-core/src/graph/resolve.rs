//! Fixed-point resolution of supertype references.
//!
//! A name written in a supertype position is looked up, in order:
//!
//! 1. as a member type of the owner or an enclosing type, including member
//!    types inherited through supertypes that are already bound,
//! 2. through single-type imports,
//! 3. in the owner's package,
//! 4. through on-demand imports, then `java.lang`,
//! 5. as a qualified name (declared type or existing stub).
//!
//! Step 1 depends on other links being bound first, so resolution runs in
//! passes until a pass binds nothing new.

use std::collections::HashSet;

use super::{ApiGraph, DeclaredLink};
use crate::compat::{sort_diagnostics, Diagnostic, DiagnosticKind};
use crate::unit::TypeId;

/// Outcome of one `resolve()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveSummary {
    /// Passes run, including the final pass that made no progress.
    pub passes: usize,
    /// Links bound to a registered unit.
    pub resolved: usize,
    /// Links bound to an external stub after the fixed point.
    pub unresolved: usize,
    /// Links dropped because they closed an inheritance cycle.
    pub cycles_broken: usize,
}

/// Which link of a type is being resolved.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Superclass,
    Interface(usize),
}

impl ApiGraph {
    /// Bind every pending supertype link, reaching a fixed point.
    ///
    /// Links still unbound at the fixed point bind to stubs and produce
    /// `UNRESOLVED_REFERENCE` diagnostics, one per never-declared type.
    /// Links that would close an inheritance cycle are dropped with a
    /// `CYCLIC_INHERITANCE` diagnostic.
    pub fn resolve(&mut self) -> ResolveSummary {
        let mut summary = ResolveSummary::default();
        self.diagnostics
            .retain(|d| d.kind != DiagnosticKind::UnresolvedReference);

        loop {
            summary.passes += 1;
            let mut progress = 0;
            for (owner, slot) in self.pending_slots() {
                let name = self.slot_link(owner, slot).reference.name.clone();
                if let Some(target) = self.lookup_reference(owner, &name) {
                    self.slot_link_mut(owner, slot).target = Some(target);
                    progress += 1;
                }
            }
            tracing::debug!(pass = summary.passes, progress, "resolution pass");
            summary.resolved += progress;
            if progress == 0 {
                break;
            }
        }

        for (owner, slot) in self.pending_slots() {
            let name = self.slot_link(owner, slot).reference.name.clone();
            let guess = self.best_guess_name(owner, &name);
            let stub = self.reference_type(&guess);
            self.slot_link_mut(owner, slot).target = Some(stub);
            summary.unresolved += 1;
        }

        for unit in &self.types {
            if unit.is_stub() {
                tracing::warn!(qualified_name = %unit.qualified_name, "type referenced but never declared");
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnresolvedReference,
                    unit.qualified_name.clone(),
                    format!("Unresolved type {}", unit.qualified_name),
                    unit.position.clone(),
                ));
            }
        }

        summary.cycles_broken = self.break_cycles();
        sort_diagnostics(&mut self.diagnostics);

        tracing::debug!(
            passes = summary.passes,
            resolved = summary.resolved,
            unresolved = summary.unresolved,
            cycles_broken = summary.cycles_broken,
            "resolution reached fixed point"
        );
        summary
    }

    fn pending_slots(&self) -> Vec<(TypeId, Slot)> {
        let mut slots = Vec::new();
        for (idx, links) in self.links.iter().enumerate() {
            let owner = TypeId::new(idx as u32);
            if links.superclass.as_ref().is_some_and(|l| l.target.is_none()) {
                slots.push((owner, Slot::Superclass));
            }
            for (i, link) in links.interfaces.iter().enumerate() {
                if link.target.is_none() {
                    slots.push((owner, Slot::Interface(i)));
                }
            }
        }
        slots
    }

    fn slot_link(&self, owner: TypeId, slot: Slot) -> &DeclaredLink {
        let links = &self.links[owner.index()];
        match slot {
            Slot::Superclass => links
                .superclass
                .as_ref()
                .unwrap_or_else(|| unreachable!("superclass slot without link")),
            Slot::Interface(i) => &links.interfaces[i],
        }
    }

    fn slot_link_mut(&mut self, owner: TypeId, slot: Slot) -> &mut DeclaredLink {
        let links = &mut self.links[owner.index()];
        match slot {
            Slot::Superclass => links
                .superclass
                .as_mut()
                .unwrap_or_else(|| unreachable!("superclass slot without link")),
            Slot::Interface(i) => &mut links.interfaces[i],
        }
    }

    // ------------------------------------------------------------------------
    // Lookup rules
    // ------------------------------------------------------------------------

    fn declared(&self, qualified_name: &str) -> Option<TypeId> {
        self.types_by_name
            .get(qualified_name)
            .copied()
            .filter(|id| !self.types[id.index()].is_stub())
    }

    fn lookup_reference(&self, owner: TypeId, name: &str) -> Option<TypeId> {
        let mut scope = Some(owner);
        let mut visited = HashSet::new();
        while let Some(current) = scope {
            if let Some(found) = self.find_member_type(current, name, &mut visited) {
                return Some(found);
            }
            scope = self.types[current.index()].enclosing;
        }

        let imports = self.imports_for(owner);
        let (first, rest) = split_first_segment(name);
        for import in imports.iter().filter(|i| !i.ends_with(".*")) {
            if import.rsplit('.').next() == Some(first) {
                if let Some(found) = self.declared(&format!("{}{}", import, rest)) {
                    return Some(found);
                }
            }
        }

        if let Some(pkg) = self.types[owner.index()].package {
            let pkg_name = &self.packages[pkg.index()].name;
            if !pkg_name.is_empty() {
                if let Some(found) = self.declared(&format!("{}.{}", pkg_name, name)) {
                    return Some(found);
                }
            }
        }

        for import in imports.iter().filter_map(|i| i.strip_suffix(".*")) {
            if let Some(found) = self.declared(&format!("{}.{}", import, name)) {
                return Some(found);
            }
        }
        if let Some(found) = self.declared(&format!("java.lang.{}", name)) {
            return Some(found);
        }

        if name.contains('.') {
            return self.types_by_name.get(name).copied();
        }
        None
    }

    /// Member type `name` of `scope`, searching bound supertypes transitively.
    fn find_member_type(
        &self,
        scope: TypeId,
        name: &str,
        visited: &mut HashSet<TypeId>,
    ) -> Option<TypeId> {
        if !visited.insert(scope) {
            return None;
        }
        let unit = &self.types[scope.index()];
        if let Some(found) = self.declared(&format!("{}.{}", unit.qualified_name, name)) {
            return Some(found);
        }
        let links = &self.links[scope.index()];
        let supertypes = links
            .superclass
            .iter()
            .chain(links.interfaces.iter())
            .filter_map(|l| l.target);
        for supertype in supertypes {
            if let Some(found) = self.find_member_type(supertype, name, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Imports of the outermost enclosing declaration, plus the owner's own.
    fn imports_for(&self, owner: TypeId) -> Vec<String> {
        let mut imports = Vec::new();
        let mut current = Some(owner);
        let mut depth = 0;
        while let Some(id) = current {
            imports.extend(self.types[id.index()].imports.iter().cloned());
            depth += 1;
            if depth > self.types.len() {
                break;
            }
            current = self.types[id.index()].enclosing;
        }
        imports
    }

    /// Name for the stub an unresolvable reference binds to.
    fn best_guess_name(&self, owner: TypeId, name: &str) -> String {
        let (first, rest) = split_first_segment(name);
        self.imports_for(owner)
            .into_iter()
            .find(|i| !i.ends_with(".*") && i.rsplit('.').next() == Some(first))
            .map(|import| format!("{}{}", import, rest))
            .unwrap_or_else(|| name.to_string())
    }

    // ------------------------------------------------------------------------
    // Cycles
    // ------------------------------------------------------------------------

    /// Drop links that close a cycle in the supertype graph.
    fn break_cycles(&mut self) -> usize {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            Active,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.types.len()];
        let mut broken = Vec::new();

        for start in 0..self.types.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            // Iterative DFS: (node, next edge index).
            let mut stack = vec![(start, 0usize)];
            marks[start] = Mark::Active;
            while let Some(frame) = stack.last_mut() {
                let (node, edge) = *frame;
                let targets = self.edge_targets(node);
                if edge >= targets.len() {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                }
                frame.1 += 1;
                let (slot, target) = targets[edge];
                match marks[target.index()] {
                    Mark::Active => broken.push((TypeId::new(node as u32), slot, target)),
                    Mark::Unvisited => {
                        marks[target.index()] = Mark::Active;
                        stack.push((target.index(), 0));
                    }
                    Mark::Done => {}
                }
            }
        }

        let count = broken.len();
        // Remove interface links from the highest index down so indices stay valid.
        broken.sort_by_key(|(owner, slot, _)| {
            (
                *owner,
                match slot {
                    Slot::Superclass => usize::MAX,
                    Slot::Interface(i) => *i,
                },
            )
        });
        for (owner, slot, target) in broken.into_iter().rev() {
            let owner_name = self.types[owner.index()].qualified_name.clone();
            let target_name = self.types[target.index()].qualified_name.clone();
            tracing::warn!(owner = %owner_name, target = %target_name, "dropping cyclic supertype link");
            let links = &mut self.links[owner.index()];
            match slot {
                Slot::Superclass => links.superclass = None,
                Slot::Interface(i) => {
                    links.interfaces.remove(i);
                }
            }
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::CyclicInheritance,
                owner_name.clone(),
                format!("Cyclic inheritance: {} extends {}", owner_name, target_name),
                self.types[owner.index()].position.clone(),
            ));
        }
        count
    }

    fn edge_targets(&self, node: usize) -> Vec<(Slot, TypeId)> {
        let links = &self.links[node];
        let mut targets = Vec::new();
        if let Some(target) = links.superclass.as_ref().and_then(|l| l.target) {
            targets.push((Slot::Superclass, target));
        }
        for (i, link) in links.interfaces.iter().enumerate() {
            if let Some(target) = link.target {
                targets.push((Slot::Interface(i), target));
            }
        }
        targets
    }
}

/// `("Outer", ".Inner")` for `"Outer.Inner"`; `("Foo", "")` for `"Foo"`.
fn split_first_segment(name: &str) -> (&str, &str) {
    match name.find('.') {
        Some(pos) => (&name[..pos], &name[pos..]),
        None => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::TypeReference;
    use crate::unit::TypeDeclaration;
    use crate::visibility::VisibilityPolicy;

    fn t(s: &str) -> TypeReference {
        TypeReference::parse(s).unwrap()
    }

    #[test]
    fn split_first_segment_cases() {
        assert_eq!(split_first_segment("Outer.Inner"), ("Outer", ".Inner"));
        assert_eq!(split_first_segment("Foo"), ("Foo", ""));
    }

    #[test]
    fn resolves_same_package_simple_name() {
        let mut g = ApiGraph::new();
        let pkg = g.register_package("a");
        let base = g.register_type("a.Base", TypeDeclaration::class(pkg)).unwrap();
        let derived = g.register_type("a.Derived", TypeDeclaration::class(pkg)).unwrap();
        g.link_superclass(derived, t("Base")).unwrap();
        let summary = g.resolve();
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.unresolved, 0);
        let model = g.freeze(VisibilityPolicy::default()).unwrap();
        assert_eq!(model.type_unit(derived).unwrap().superclass().unwrap().target, base);
    }

    #[test]
    fn resolves_through_single_type_import() {
        let mut g = ApiGraph::new();
        let util = g.register_package("lib.util");
        let list = g.register_type("lib.util.Sequence", TypeDeclaration::interface(util)).unwrap();
        let app = g.register_package("app");
        let impl_ty = g
            .register_type(
                "app.Impl",
                TypeDeclaration::class(app).with_import("lib.util.Sequence"),
            )
            .unwrap();
        g.link_interface(impl_ty, t("Sequence<java.lang.String>")).unwrap();
        g.resolve();
        let model = g.freeze(VisibilityPolicy::default()).unwrap();
        let link = &model.type_unit(impl_ty).unwrap().interfaces()[0];
        assert_eq!(link.target, list);
        assert_eq!(link.reference.full_name(), "Sequence<java.lang.String>");
    }

    #[test]
    fn resolves_through_on_demand_import() {
        let mut g = ApiGraph::new();
        let util = g.register_package("lib.util");
        let list = g.register_type("lib.util.Sequence", TypeDeclaration::interface(util)).unwrap();
        let app = g.register_package("app");
        let impl_ty = g
            .register_type("app.Impl", TypeDeclaration::class(app).with_import("lib.util.*"))
            .unwrap();
        g.link_interface(impl_ty, t("Sequence")).unwrap();
        g.resolve();
        let model = g.freeze(VisibilityPolicy::default()).unwrap();
        assert_eq!(model.type_unit(impl_ty).unwrap().interfaces()[0].target, list);
    }

    #[test]
    fn inherited_member_type_needs_a_second_pass() {
        // a.Derived extends a.Base implements Callback, where Callback is
        // a.Base.Callback: only visible once the superclass link is bound.
        let mut g = ApiGraph::new();
        let pkg = g.register_package("a");
        let derived = g.register_type("a.Derived", TypeDeclaration::class(pkg)).unwrap();
        g.link_interface(derived, t("Callback")).unwrap();
        g.link_superclass(derived, t("Base")).unwrap();
        let base = g.register_type("a.Base", TypeDeclaration::class(pkg)).unwrap();
        let callback = g
            .register_type("a.Base.Callback", TypeDeclaration::interface(pkg).nested_in(base))
            .unwrap();

        let summary = g.resolve();
        assert_eq!(summary.resolved, 2);
        assert!(summary.passes >= 2);
        let model = g.freeze(VisibilityPolicy::default()).unwrap();
        assert_eq!(model.type_unit(derived).unwrap().interfaces()[0].target, callback);
    }

    #[test]
    fn unresolved_reference_becomes_stub_and_diagnostic() {
        let mut g = ApiGraph::new();
        let pkg = g.register_package("a");
        let b = g.register_type("a.B", TypeDeclaration::class(pkg)).unwrap();
        g.link_superclass(b, t("ext.Outside")).unwrap();
        let summary = g.resolve();
        assert_eq!(summary.unresolved, 1);
        assert_eq!(g.diagnostics().len(), 1);
        assert_eq!(g.diagnostics()[0].kind, DiagnosticKind::UnresolvedReference);
        assert_eq!(g.diagnostics()[0].subject, "ext.Outside");

        let model = g.freeze(VisibilityPolicy::default()).unwrap();
        let target = model.type_unit(b).unwrap().superclass().unwrap().target;
        assert!(model.type_unit(target).unwrap().is_stub());
        assert_eq!(model.diagnostics().len(), 1);
    }

    #[test]
    fn qualified_reference_binds_to_forward_stub_then_upgrades() {
        let mut g = ApiGraph::new();
        let pkg = g.register_package("a");
        let b = g.register_type("a.B", TypeDeclaration::class(pkg)).unwrap();
        g.link_superclass(b, t("a.Later")).unwrap();
        let later = g.reference_type("a.Later");
        g.resolve();
        g.register_type("a.Later", TypeDeclaration::class(pkg)).unwrap();
        g.resolve();
        assert!(g.diagnostics().is_empty());
        let model = g.freeze(VisibilityPolicy::default()).unwrap();
        assert_eq!(model.type_unit(b).unwrap().superclass().unwrap().target, later);
    }

    #[test]
    fn cycles_are_broken_with_diagnostic() {
        let mut g = ApiGraph::new();
        let pkg = g.register_package("a");
        let x = g.register_type("a.X", TypeDeclaration::class(pkg)).unwrap();
        let y = g.register_type("a.Y", TypeDeclaration::class(pkg)).unwrap();
        g.link_superclass(x, t("a.Y")).unwrap();
        g.link_superclass(y, t("a.X")).unwrap();
        let summary = g.resolve();
        assert_eq!(summary.cycles_broken, 1);
        assert!(g
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::CyclicInheritance));
        let model = g.freeze(VisibilityPolicy::default()).unwrap();
        let x_super = model.type_unit(x).unwrap().superclass().is_some();
        let y_super = model.type_unit(y).unwrap().superclass().is_some();
        assert!(x_super != y_super);
    }
}
