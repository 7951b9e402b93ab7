//! Override resolution: which ancestor method a method overrides or implements.
//!
//! A method with a direct overridden link resolves through it. Otherwise the
//! owner's effective interfaces are searched breadth first, own interfaces
//! before their super-interfaces, and the first interface whose flattened
//! `methods()` view holds a method with the same name and hashable signature
//! wins. When two interfaces at the same depth both declare a match, the one
//! discovered first (declaration order, then qualified-name order of
//! effective interfaces) is returned.

use std::collections::{HashSet, VecDeque};

use crate::model::ApiModel;
use crate::unit::{MethodUnit, TypeId};

impl ApiModel {
    /// Method that `method` overrides or implements, if any.
    ///
    /// Constructors never override.
    pub fn find_overridden(&self, method: &MethodUnit) -> Option<&MethodUnit> {
        if method.is_constructor() {
            return None;
        }
        if let Some(link) = &method.overridden {
            return self
                .type_unit(link.owner)?
                .methods
                .iter()
                .find(|m| m.signature_key() == link.signature);
        }
        let queue = self
            .effective_interfaces(method.owner())
            .iter()
            .copied()
            .collect();
        self.search_queue(method, queue, |_| true)
    }

    /// Like [`find_overridden`](Self::find_overridden), but the non-included
    /// direct superclass is searched first and only candidates declared on a
    /// type in `not_strippable` are accepted.
    pub fn find_overridden_in(
        &self,
        method: &MethodUnit,
        not_strippable: &HashSet<TypeId>,
    ) -> Option<&MethodUnit> {
        if method.is_constructor() {
            return None;
        }
        let mut seed = VecDeque::new();
        if let Some(link) = self.type_unit(method.owner()).and_then(|u| u.superclass()) {
            if !self.included(link.target) {
                seed.push_back(link.target);
            }
        }
        seed.extend(self.effective_interfaces(method.owner()).iter().copied());
        self.search_queue(method, seed, |candidate| {
            not_strippable.contains(&candidate.owner())
        })
    }

    fn search_queue(
        &self,
        method: &MethodUnit,
        mut queue: VecDeque<TypeId>,
        accept: impl Fn(&MethodUnit) -> bool,
    ) -> Option<&MethodUnit> {
        let mut visited = HashSet::new();
        while let Some(ty) = queue.pop_front() {
            if !visited.insert(ty) {
                continue;
            }
            let found = self.methods(ty).iter().find(|candidate| {
                candidate.name == method.name
                    && candidate.signature_key() == method.signature_key()
                    && accept(*candidate)
            });
            if found.is_some() {
                return found;
            }
            queue.extend(self.effective_interfaces(ty).iter().copied());
        }
        None
    }
}
