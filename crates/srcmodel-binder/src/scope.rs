//! Resolution state of one namespace declaration.
//!
//! Each `namespace N { ... }` declaration (and each root) is a lexical
//! scope of its own: the aliases and imports written in it apply only to
//! code inside it. `NamespaceScope` holds the per-declaration alias and
//! import tables, the resolved alias and import targets, the memoized
//! extension method tables and the busy flag that keeps an alias or import
//! target from being resolved against the aliases of its own declaration.

use crate::compilation::{Compilation, Lookup};
use crate::members::MemberKind;
use crate::namespaces::NamespaceMember;
use crate::resolver::NameRole;
use crate::types::{NamedTypeDefinition, TypeFlags};
use rustc_hash::FxHashMap;
use srcmodel_common::diagnostics::codes;
use srcmodel_common::{
    Atom, DeclId, LazyCache, MemberDefId, NamespaceDefId, Resolved, TypeDefId, TypeRef,
};
use srcmodel_syntax::{Container, DeclKind, Expr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, debug_span};

#[derive(Default)]
struct ScopeTables {
    aliases: Vec<DeclId>,
    by_name: FxHashMap<Atom, DeclId>,
    by_folded_name: FxHashMap<Atom, DeclId>,
    imports: Vec<DeclId>,
}

type ExtensionTable = Mutex<FxHashMap<Atom, Arc<[MemberDefId]>>>;

pub struct NamespaceScope {
    pub decl: DeclId,
    /// Only touched under the build lock.
    busy: AtomicBool,
    tables: LazyCache<ScopeTables>,
    alias_targets: Mutex<FxHashMap<DeclId, Resolved>>,
    import_targets: Mutex<FxHashMap<DeclId, Option<NamespaceDefId>>>,
    enclosed_extensions: ExtensionTable,
    imported_extensions: ExtensionTable,
}

/// Clears the busy flag (restoring its previous value) when dropped.
#[must_use]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
    previous: bool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::Release);
    }
}

#[derive(Clone, Copy, Debug)]
enum Tier {
    Enclosed,
    Imported,
}

impl NamespaceScope {
    pub(crate) fn new(decl: DeclId) -> Self {
        NamespaceScope {
            decl,
            busy: AtomicBool::new(false),
            tables: LazyCache::new(),
            alias_targets: Mutex::new(FxHashMap::default()),
            import_targets: Mutex::new(FxHashMap::default()),
            enclosed_extensions: Mutex::new(FxHashMap::default()),
            imported_extensions: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn enter_busy(&self) -> BusyGuard<'_> {
        let previous = self.busy.swap(true, Ordering::AcqRel);
        BusyGuard {
            flag: &self.busy,
            previous,
        }
    }

    fn tables(&self, comp: &Compilation) -> &ScopeTables {
        self.tables.get_or_init(|| {
            let mut tables = ScopeTables::default();
            for member in comp.arena().members_of(self.decl) {
                let node = comp.arena().node(member);
                match &node.kind {
                    DeclKind::Alias(alias) => {
                        tables.aliases.push(member);
                        tables.by_name.entry(alias.name).or_insert(member);
                        tables
                            .by_folded_name
                            .entry(comp.names().folded(alias.name))
                            .or_insert(member);
                    }
                    DeclKind::Import(_) => tables.imports.push(member),
                    _ => {}
                }
            }
            tables
        })
    }

    /// Alias declarations in declaration order.
    pub fn aliases(&self, comp: &Compilation) -> Vec<DeclId> {
        self.tables(comp).aliases.clone()
    }

    /// Import declarations in declaration order.
    pub fn imports(&self, comp: &Compilation) -> Vec<DeclId> {
        self.tables(comp).imports.clone()
    }

    fn lock<T>(table: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for NamespaceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceScope")
            .field("decl", &self.decl)
            .field("busy", &self.is_busy())
            .finish()
    }
}

impl Compilation {
    // =========================================================================
    // Aliases and imports
    // =========================================================================

    /// The first alias called `name` declared directly in `ns_decl`.
    pub fn alias_named(&self, ns_decl: DeclId, name: Atom, ignore_case: bool) -> Option<DeclId> {
        let scope = self.scope(ns_decl);
        let tables = scope.tables(self);
        if ignore_case {
            tables.by_folded_name.get(&self.names().folded(name)).copied()
        } else {
            tables.by_name.get(&name).copied()
        }
    }

    /// What an alias stands for. An unresolvable target is reported once
    /// and yields `TypeRef::Error`.
    pub fn alias_target(&self, alias: DeclId) -> Resolved {
        self.try_alias_target(alias)
            .unwrap_or(Resolved::Type(TypeRef::Error))
    }

    pub(crate) fn try_alias_target(&self, alias: DeclId) -> Lookup<Resolved> {
        let node = self.arena().node(alias);
        let DeclKind::Alias(alias_decl) = &node.kind else {
            return Ok(Resolved::Nothing);
        };
        let Some(ns_decl) = self.arena().container(alias).and_then(Container::as_decl) else {
            return Ok(Resolved::Nothing);
        };
        let scope = self.scope(ns_decl);
        if let Some(&target) = NamespaceScope::lock(&scope.alias_targets).get(&alias) {
            return Ok(target);
        }
        let _guard = self.build_lock().enter();
        if let Some(&target) = NamespaceScope::lock(&scope.alias_targets).get(&alias) {
            return Ok(target);
        }
        let resolved = {
            let _busy = scope.enter_busy();
            self.try_resolve_in(&alias_decl.target, NameRole::Type)?
        };
        let target = match resolved {
            Resolved::Namespace(_) => resolved,
            Resolved::Type(ty) if !ty.is_error() => resolved,
            _ => {
                let name = self.name(alias_decl.name);
                self.report_code(node.location, codes::ALIAS_TARGET_NOT_FOUND, &[&name]);
                Resolved::Type(TypeRef::Error)
            }
        };
        NamespaceScope::lock(&scope.alias_targets).insert(alias, target);
        Ok(target)
    }

    /// The namespace an import brings in; anything else is reported once.
    pub fn import_target(&self, import: DeclId) -> Option<NamespaceDefId> {
        self.try_import_target(import).ok().flatten()
    }

    pub(crate) fn try_import_target(&self, import: DeclId) -> Lookup<Option<NamespaceDefId>> {
        let node = self.arena().node(import);
        let DeclKind::Import(import_decl) = &node.kind else {
            return Ok(None);
        };
        let Some(ns_decl) = self.arena().container(import).and_then(Container::as_decl) else {
            return Ok(None);
        };
        let scope = self.scope(ns_decl);
        if let Some(&target) = NamespaceScope::lock(&scope.import_targets).get(&import) {
            return Ok(target);
        }
        let _guard = self.build_lock().enter();
        if let Some(&target) = NamespaceScope::lock(&scope.import_targets).get(&import) {
            return Ok(target);
        }
        let resolved = {
            let _busy = scope.enter_busy();
            self.try_resolve_in(&import_decl.target, NameRole::Type)?
        };
        let target = match resolved {
            Resolved::Namespace(ns) => Some(ns),
            _ => {
                let text = self.expr_text(&import_decl.target);
                self.report_code(node.location, codes::IMPORT_TARGET_NOT_A_NAMESPACE, &[&text]);
                None
            }
        };
        NamespaceScope::lock(&scope.import_targets).insert(import, target);
        Ok(target)
    }

    // =========================================================================
    // Scope lookup
    // =========================================================================

    /// Everything called `name` visible through `ns_decl` itself: members
    /// of its namespace, then members of each imported namespace in import
    /// order. Nothing while the declaration is busy resolving its own
    /// aliases or imports; a caller on another thread waits for that to
    /// finish.
    pub fn scope_members_named(&self, ns_decl: DeclId, name: Atom) -> Vec<Resolved> {
        let _guard = self.build_lock().enter();
        let scope = self.scope(ns_decl);
        if scope.is_busy() {
            return Vec::new();
        }
        let as_resolved = |member: NamespaceMember| match member {
            NamespaceMember::Namespace(id) => Resolved::Namespace(id),
            NamespaceMember::Type(id) => Resolved::Type(TypeRef::Def(id)),
        };
        let mut out = Vec::new();
        if let Some(ns) = self.namespace_def_of(ns_decl).and_then(|id| self.namespace(id)) {
            out.extend(ns.members_named(self, name).into_iter().map(as_resolved));
        }
        for import in scope.imports(self) {
            let Some(target) = self.import_target(import).and_then(|id| self.namespace(id)) else {
                continue;
            };
            out.extend(target.members_named(self, name).into_iter().map(as_resolved));
        }
        out
    }

    /// One step of the scope chain walk: namespace members, aliases, then
    /// members of imported namespaces.
    pub(crate) fn try_scope_lookup(
        &self,
        ns_decl: DeclId,
        name: Atom,
        arity: usize,
    ) -> Lookup<Option<Resolved>> {
        let _guard = self.build_lock().enter();
        let scope = self.scope(ns_decl);
        if scope.is_busy() {
            debug!(?ns_decl, "namespace declaration busy, skipped");
            return Ok(None);
        }
        if let Some(ns) = self.try_namespace_def_of(ns_decl)?.and_then(|id| self.namespace(id))
            && let Some(found) = ns.try_lookup(self, name, arity)?
        {
            return Ok(Some(found));
        }
        if arity == 0
            && let Some(alias) = self.alias_named(ns_decl, name, self.options().ignore_case)
        {
            return Ok(Some(self.try_alias_target(alias)?));
        }
        for import in scope.imports(self) {
            if let Some(target) = self.try_import_target(import)?.and_then(|id| self.namespace(id))
                && let Some(found) = target.try_lookup(self, name, arity)?
            {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Extension methods
    // =========================================================================

    /// Extension methods called `name` applicable to `args` (receiver
    /// first), searched outward from `ns_decl`: types declared directly in
    /// the declaration, then types of its imported namespaces, then the
    /// enclosing namespace declaration. The first tier with an applicable
    /// method wins.
    pub fn applicable_extension_methods(
        &self,
        ns_decl: DeclId,
        name: Atom,
        args: &[Expr],
    ) -> Vec<MemberDefId> {
        let _span = debug_span!("applicable_extension_methods", ?ns_decl).entered();
        let _guard = self.build_lock().enter();
        let mut current = Some(ns_decl);
        let mut hops = 0u32;
        while let Some(decl) = current {
            hops += 1;
            if hops > self.options().max_resolution_depth {
                break;
            }
            let scope = self.scope(decl);
            for tier in [Tier::Enclosed, Tier::Imported] {
                let candidates = self.extension_candidates(&scope, tier, name);
                let applicable: Vec<MemberDefId> = candidates
                    .iter()
                    .copied()
                    .filter(|&method| self.overload_resolver().is_applicable(self, method, args))
                    .collect();
                if !applicable.is_empty() {
                    debug!(?decl, ?tier, count = applicable.len(), "extension methods found");
                    return applicable;
                }
            }
            current = self
                .arena()
                .container(decl)
                .and_then(Container::as_decl)
                .filter(|&parent| self.arena().node(parent).as_namespace().is_some());
        }
        Vec::new()
    }

    fn extension_candidates(&self, scope: &NamespaceScope, tier: Tier, name: Atom) -> Arc<[MemberDefId]> {
        let key = self.name_key(name);
        let table = match tier {
            Tier::Enclosed => &scope.enclosed_extensions,
            Tier::Imported => &scope.imported_extensions,
        };
        if let Some(hit) = NamespaceScope::lock(table).get(&key) {
            return Arc::clone(hit);
        }
        let computed = match tier {
            Tier::Enclosed => self.try_enclosed_extension_methods(scope.decl, name),
            Tier::Imported => self.try_imported_extension_methods(scope, name),
        };
        match computed {
            Ok(list) => {
                let list: Arc<[MemberDefId]> = list.into();
                NamespaceScope::lock(table).insert(key, Arc::clone(&list));
                list
            }
            Err(_) => {
                debug!(decl = ?scope.decl, ?tier, "extension table hit a computation in progress, not memoized");
                Arc::from([])
            }
        }
    }

    fn try_enclosed_extension_methods(&self, ns_decl: DeclId, name: Atom) -> Lookup<Vec<MemberDefId>> {
        let mut types: Vec<TypeDefId> = Vec::new();
        for member in self.arena().members_of(ns_decl) {
            if self.arena().node(member).as_type().is_none() {
                continue;
            }
            if let Some(ty) = self.try_type_def_of(member)?
                && !types.contains(&ty)
            {
                types.push(ty);
            }
        }
        self.try_extension_methods_in(&types, name)
    }

    fn try_imported_extension_methods(&self, scope: &NamespaceScope, name: Atom) -> Lookup<Vec<MemberDefId>> {
        let mut types: Vec<TypeDefId> = Vec::new();
        for import in scope.imports(self) {
            let Some(target) = self.try_import_target(import)?.and_then(|id| self.namespace(id)) else {
                continue;
            };
            for &ty in target.try_members(self)?.types.values() {
                if !types.contains(&ty) {
                    types.push(ty);
                }
            }
        }
        self.try_extension_methods_in(&types, name)
    }

    fn try_extension_methods_in(&self, types: &[TypeDefId], name: Atom) -> Lookup<Vec<MemberDefId>> {
        let mut out = Vec::new();
        for def in types.iter().filter_map(|&id| self.type_def(id)) {
            if !can_declare_extensions(&def) {
                continue;
            }
            for member in def.try_members_named(self, name)? {
                if let Some(method) = member.as_member().and_then(|id| self.member(id))
                    && method.kind == MemberKind::Method
                    && method.is_extension()
                {
                    out.push(method.id);
                }
            }
        }
        Ok(out)
    }
}

/// Extension methods live in non-generic, non-nested static classes.
fn can_declare_extensions(def: &NamedTypeDefinition) -> bool {
    !def.is_generic() && !def.is_nested() && def.flags().contains(TypeFlags::STATIC | TypeFlags::CLASS)
}

#[cfg(test)]
#[path = "../tests/scope_tests.rs"]
mod tests;
