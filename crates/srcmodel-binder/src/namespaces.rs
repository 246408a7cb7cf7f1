//! Unit namespaces.
//!
//! The root namespace of a compilation aggregates the root declarations of
//! every part; a nested namespace aggregates every `namespace N { ... }`
//! declaration with the same name under the same parent.

use crate::compilation::{Compilation, Lookup};
use crate::types::{DefContainer, TypeTable, fold_type_declaration};
use indexmap::IndexMap;
use srcmodel_common::{Atom, DeclId, LazyCache, NamespaceDefId, Resolved, TypeDefId, TypeRef};
use srcmodel_syntax::DeclKind;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Folded member lists of a namespace.
#[derive(Debug, Default)]
pub struct NamespaceMembers {
    /// Keyed by the lookup key of the name.
    pub namespaces: IndexMap<Atom, NamespaceDefId>,
    pub types: TypeTable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NamespaceMember {
    Namespace(NamespaceDefId),
    Type(TypeDefId),
}

pub struct UnitNamespace {
    pub id: NamespaceDefId,
    /// `None` for the root namespace.
    pub name: Option<Atom>,
    pub parent: Option<NamespaceDefId>,
    declarations: RwLock<Vec<DeclId>>,
    members: LazyCache<NamespaceMembers>,
    pub(crate) attributes: LazyCache<Vec<crate::attributes::CustomAttribute>>,
}

impl UnitNamespace {
    pub(crate) fn new(id: NamespaceDefId, name: Option<Atom>, parent: Option<NamespaceDefId>) -> Self {
        UnitNamespace {
            id,
            name,
            parent,
            declarations: RwLock::new(Vec::new()),
            members: LazyCache::new(),
            attributes: LazyCache::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn declarations(&self) -> Vec<DeclId> {
        self.declarations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn members_computed(&self) -> bool {
        self.members.is_computed()
    }

    /// Idempotent; runs under the build lock.
    pub(crate) fn add_declaration(&self, comp: &Compilation, decl: DeclId) {
        {
            let mut decls = self
                .declarations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if !decls.contains(&decl) {
                if self.members.is_computed() {
                    warn!(?decl, namespace = self.id.0, "declaration added after members were folded");
                }
                decls.push(decl);
            }
        }
        comp.record_namespace_decl(decl, self.id);
    }

    pub fn full_name(&self, comp: &Compilation) -> String {
        let Some(name) = self.name else {
            return String::new();
        };
        let own = comp.name(name);
        match self.parent.and_then(|p| comp.namespace(p)) {
            Some(parent) if !parent.is_root() => format!("{}.{own}", parent.full_name(comp)),
            _ => own.to_string(),
        }
    }

    /// Nested namespaces by name and types by (name, arity), folded over
    /// every declaration in order.
    pub fn members(&self, comp: &Compilation) -> Vec<NamespaceMember> {
        match self.try_members(comp) {
            Ok(members) => members
                .namespaces
                .values()
                .map(|&ns| NamespaceMember::Namespace(ns))
                .chain(members.types.values().map(|&ty| NamespaceMember::Type(ty)))
                .collect(),
            Err(_) => {
                debug!(namespace = self.id.0, "member table requested while it is being built");
                Vec::new()
            }
        }
    }

    pub(crate) fn try_members(&self, comp: &Compilation) -> Lookup<&NamespaceMembers> {
        self.members.get_or_try_init_locked(comp.build_lock(), || {
            let _span = tracing::debug_span!("namespace_members", namespace = self.id.0).entered();
            let mut out = NamespaceMembers::default();
            let container_name = self.full_name(comp);
            for decl in self.declarations() {
                for member in comp.arena().members_of(decl) {
                    let node = comp.arena().node(member);
                    match &node.kind {
                        DeclKind::Namespace(ns) => {
                            let Some(name) = ns.name else {
                                warn!(?member, "root namespace declaration nested in a namespace");
                                continue;
                            };
                            let key = comp.name_key(name);
                            let nested = match out.namespaces.get(&key).and_then(|&id| comp.namespace(id)) {
                                Some(nested) => nested,
                                None => {
                                    let nested = comp.store().register_namespace(|id| {
                                        UnitNamespace::new(id, Some(name), Some(self.id))
                                    });
                                    out.namespaces.insert(key, nested.id);
                                    nested
                                }
                            };
                            nested.add_declaration(comp, member);
                        }
                        DeclKind::Type(_) => fold_type_declaration(
                            comp,
                            &mut out.types,
                            DefContainer::Namespace(self.id),
                            &container_name,
                            member,
                        ),
                        _ => {}
                    }
                }
            }
            debug!(
                namespace = self.id.0,
                namespaces = out.namespaces.len(),
                types = out.types.len(),
                "namespace members folded"
            );
            out
        })
    }

    /// Members called `name`, nested namespaces first, types of every arity
    /// after.
    pub fn members_named(&self, comp: &Compilation, name: Atom) -> Vec<NamespaceMember> {
        let Ok(members) = self.try_members(comp) else {
            debug!(namespace = self.id.0, "members named while the table is being built");
            return Vec::new();
        };
        let key = comp.name_key(name);
        let mut out = Vec::new();
        if let Some(&ns) = members.namespaces.get(&key) {
            out.push(NamespaceMember::Namespace(ns));
        }
        out.extend(
            members
                .types
                .iter()
                .filter(|((type_name, _), _)| *type_name == key)
                .map(|(_, &ty)| NamespaceMember::Type(ty)),
        );
        out
    }

    pub fn nested_namespace(&self, comp: &Compilation, name: Atom) -> Option<NamespaceDefId> {
        let members = self.try_members(comp).ok()?;
        members.namespaces.get(&comp.name_key(name)).copied()
    }

    pub fn type_named(&self, comp: &Compilation, name: Atom, arity: usize) -> Option<TypeDefId> {
        self.try_type_named(comp, name, arity).ok().flatten()
    }

    pub(crate) fn try_type_named(
        &self,
        comp: &Compilation,
        name: Atom,
        arity: usize,
    ) -> Lookup<Option<TypeDefId>> {
        Ok(self
            .try_members(comp)?
            .types
            .get(&(comp.name_key(name), arity))
            .copied())
    }

    /// Name lookup inside this namespace: a nested namespace (arity 0) or a
    /// type with the given arity.
    pub(crate) fn try_lookup(
        &self,
        comp: &Compilation,
        name: Atom,
        arity: usize,
    ) -> Lookup<Option<Resolved>> {
        let members = self.try_members(comp)?;
        let key = comp.name_key(name);
        if arity == 0
            && let Some(&ns) = members.namespaces.get(&key)
        {
            return Ok(Some(Resolved::Namespace(ns)));
        }
        Ok(members
            .types
            .get(&(key, arity))
            .map(|&ty| Resolved::Type(TypeRef::Def(ty))))
    }

    /// Types directly in this namespace.
    pub fn types(&self, comp: &Compilation) -> Vec<TypeDefId> {
        match self.try_members(comp) {
            Ok(members) => members.types.values().copied().collect(),
            Err(_) => {
                debug!(namespace = self.id.0, "type table requested while it is being built");
                Vec::new()
            }
        }
    }

    /// Every type in this namespace, its nested namespaces and nested
    /// types, depth first in declaration order.
    pub fn all_types(&self, comp: &Compilation) -> Vec<TypeDefId> {
        let mut out = Vec::new();
        let Ok(members) = self.try_members(comp) else {
            debug!(namespace = self.id.0, "all types requested while the table is being built");
            return out;
        };
        for &ty in members.types.values() {
            collect_with_nested(comp, ty, &mut out);
        }
        for &ns in members.namespaces.values() {
            if let Some(nested) = comp.namespace(ns) {
                out.extend(nested.all_types(comp));
            }
        }
        out
    }
}

fn collect_with_nested(comp: &Compilation, ty: TypeDefId, out: &mut Vec<TypeDefId>) {
    out.push(ty);
    if let Some(def) = comp.type_def(ty) {
        for nested in def.nested_types(comp) {
            collect_with_nested(comp, nested, out);
        }
    }
}

impl std::fmt::Debug for UnitNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitNamespace")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("declarations", &self.declarations())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/namespaces_tests.rs"]
mod tests;
