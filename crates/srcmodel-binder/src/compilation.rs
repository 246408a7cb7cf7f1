//! One compilation unit: the aggregation root.
//!
//! A `Compilation` owns the definition store, the build lock serializing
//! cross-referential folds, the collaborators (error sink, type expression
//! resolver, overload resolver) and the maps from declarations to the
//! definitions they were aggregated into. The fold logic for each
//! definition kind lives in its own module as further `impl Compilation`
//! blocks or as methods on the definition taking `&Compilation`.
//!
//! Replacing a part of the program builds a new generation: a fresh unit
//! whose roots are the replacement roots plus copies of the untouched
//! ones. Generations never share caches.

use crate::attributes::CustomAttribute;
use crate::generics::{GenericInstance, GenericParameter};
use crate::members::MemberDefinition;
use crate::namespaces::UnitNamespace;
use crate::options::CompilationOptions;
use crate::overloads::{ArityOverloadResolver, OverloadResolver};
use crate::resolver::{ScopeChainResolver, TypeExpressionResolver};
use crate::scope::NamespaceScope;
use crate::store::DefinitionStore;
use crate::types::NamedTypeDefinition;
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use srcmodel_common::{
    Atom, BuildLock, DeclId, Diagnostic, ErrorSink, GenericParamId, InstanceId, LazyCache,
    MemberDefId, NameTable, NamespaceDefId, Reentrant, SourceLocation, TypeDefId, TypeRef, UnitId,
};
use srcmodel_syntax::{Container, DeclArena, DeclKind, Unbound};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, debug_span, warn};

/// Result of a fold that may have hit a computation already in progress
/// on this thread. `Err` values are never cached.
pub type Lookup<T> = Result<T, Reentrant>;

static NEXT_UNIT: AtomicU32 = AtomicU32::new(1);

fn allocate_unit() -> UnitId {
    UnitId(NEXT_UNIT.fetch_add(1, Ordering::SeqCst))
}

pub struct CompilationBuilder {
    arena: Arc<DeclArena>,
    sink: Arc<dyn ErrorSink>,
    resolver: Arc<dyn TypeExpressionResolver>,
    overloads: Arc<dyn OverloadResolver>,
    options: CompilationOptions,
}

impl CompilationBuilder {
    pub fn options(mut self, options: CompilationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn TypeExpressionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn overload_resolver(mut self, overloads: Arc<dyn OverloadResolver>) -> Self {
        self.overloads = overloads;
        self
    }

    pub fn build(self) -> Compilation {
        Compilation::from_parts(
            allocate_unit(),
            self.arena,
            self.sink,
            self.resolver,
            self.overloads,
            self.options,
        )
    }
}

pub struct Compilation {
    unit: UnitId,
    arena: Arc<DeclArena>,
    store: DefinitionStore,
    lock: BuildLock,
    sink: Arc<dyn ErrorSink>,
    resolver: Arc<dyn TypeExpressionResolver>,
    overloads: Arc<dyn OverloadResolver>,
    options: CompilationOptions,
    roots: RwLock<Vec<DeclId>>,
    global: Arc<UnitNamespace>,
    namespace_of_decl: DashMap<DeclId, NamespaceDefId>,
    type_of_decl: DashMap<DeclId, TypeDefId>,
    member_of_decl: DashMap<DeclId, MemberDefId>,
    generic_of_decl: DashMap<DeclId, GenericParamId>,
    scopes: DashMap<DeclId, Arc<NamespaceScope>>,
    pub(crate) assembly_attributes: LazyCache<Vec<CustomAttribute>>,
    pub(crate) module_attributes: LazyCache<Vec<CustomAttribute>>,
}

impl Compilation {
    /// A compilation with the default resolvers and options.
    pub fn new(arena: Arc<DeclArena>, sink: Arc<dyn ErrorSink>) -> Self {
        Self::builder(arena, sink).build()
    }

    pub fn builder(arena: Arc<DeclArena>, sink: Arc<dyn ErrorSink>) -> CompilationBuilder {
        CompilationBuilder {
            arena,
            sink,
            resolver: Arc::new(ScopeChainResolver),
            overloads: Arc::new(ArityOverloadResolver),
            options: CompilationOptions::default(),
        }
    }

    fn from_parts(
        unit: UnitId,
        arena: Arc<DeclArena>,
        sink: Arc<dyn ErrorSink>,
        resolver: Arc<dyn TypeExpressionResolver>,
        overloads: Arc<dyn OverloadResolver>,
        options: CompilationOptions,
    ) -> Self {
        let store = DefinitionStore::new();
        let global = store.register_namespace(|id| UnitNamespace::new(id, None, None));
        debug!(unit = unit.0, "created compilation unit");
        Compilation {
            unit,
            arena,
            store,
            lock: BuildLock::new(),
            sink,
            resolver,
            overloads,
            options,
            roots: RwLock::new(Vec::new()),
            global,
            namespace_of_decl: DashMap::new(),
            type_of_decl: DashMap::new(),
            member_of_decl: DashMap::new(),
            generic_of_decl: DashMap::new(),
            scopes: DashMap::new(),
            assembly_attributes: LazyCache::new(),
            module_attributes: LazyCache::new(),
        }
    }

    // =========================================================================
    // Parts
    // =========================================================================

    /// Bind a root namespace declaration to this unit and aggregate it into
    /// the global namespace.
    ///
    /// Parts should be added before any definition is queried; folds that
    /// already ran do not see later parts.
    pub fn add_part(&self, root: Unbound) -> DeclId {
        let _span = debug_span!("add_part", unit = self.unit.0).entered();
        let _guard = self.lock.enter();
        let root = self.arena.bind_root(root, self.unit);
        self.add_root(root);
        root
    }

    fn add_root(&self, root: DeclId) {
        if self.global.members_computed() {
            warn!(?root, "part added after the global namespace was folded");
        }
        self.roots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(root);
        self.global.add_declaration(self, root);
    }

    /// Root declarations in the order they were added.
    pub fn roots(&self) -> Vec<DeclId> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A new generation of this compilation.
    ///
    /// `updates` are replacement roots produced by
    /// `DeclArena::update_members`; each replaces the root it was built
    /// from. Every other root is carried over as a copy bound to the new
    /// unit. Root order is preserved; updates with no counterpart are
    /// appended.
    pub fn next_generation(&self, updates: Vec<Unbound>) -> Compilation {
        let next = Compilation::from_parts(
            allocate_unit(),
            Arc::clone(&self.arena),
            Arc::clone(&self.sink),
            Arc::clone(&self.resolver),
            Arc::clone(&self.overloads),
            self.options.clone(),
        );
        let _span = debug_span!("next_generation", from = self.unit.0, to = next.unit.0).entered();
        {
            let _guard = next.lock.enter();
            let mut replacements: FxHashMap<DeclId, DeclId> = FxHashMap::default();
            let mut orphans = Vec::new();
            for update in updates {
                let root = self.arena.bind_root(update, next.unit);
                match self.arena.node(root).template() {
                    Some(template) if !replacements.contains_key(&template) => {
                        replacements.insert(template, root);
                    }
                    _ => orphans.push(root),
                }
            }
            for old in self.roots() {
                let root = match replacements.remove(&old) {
                    Some(replacement) => replacement,
                    None => self.arena.make_root_copy_for(old, next.unit),
                };
                next.add_root(root);
            }
            // replacements whose template is not a root of this generation
            orphans.extend(replacements.into_values());
            orphans.sort();
            for root in orphans {
                next.add_root(root);
            }
        }
        next
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    #[inline]
    pub fn arena(&self) -> &DeclArena {
        &self.arena
    }

    #[inline]
    pub fn names(&self) -> &NameTable {
        self.arena.names()
    }

    #[inline]
    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    #[inline]
    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    #[inline]
    pub fn build_lock(&self) -> &BuildLock {
        &self.lock
    }

    pub fn resolver(&self) -> &dyn TypeExpressionResolver {
        self.resolver.as_ref()
    }

    pub fn overload_resolver(&self) -> &dyn OverloadResolver {
        self.overloads.as_ref()
    }

    pub fn global_namespace(&self) -> Arc<UnitNamespace> {
        Arc::clone(&self.global)
    }

    pub fn namespace(&self, id: NamespaceDefId) -> Option<Arc<UnitNamespace>> {
        self.store.namespace(id)
    }

    pub fn type_def(&self, id: TypeDefId) -> Option<Arc<NamedTypeDefinition>> {
        self.store.type_def(id)
    }

    pub fn member(&self, id: MemberDefId) -> Option<Arc<MemberDefinition>> {
        self.store.member(id)
    }

    pub fn generic_param(&self, id: GenericParamId) -> Option<Arc<GenericParameter>> {
        self.store.generic_param(id)
    }

    pub fn instance(&self, id: InstanceId) -> Option<Arc<GenericInstance>> {
        self.store.instance(id)
    }

    pub fn name(&self, atom: Atom) -> Arc<str> {
        self.names().resolve(atom)
    }

    /// Key used for name comparisons under the current case sensitivity.
    pub fn name_key(&self, atom: Atom) -> Atom {
        if self.options.ignore_case {
            self.names().folded(atom)
        } else {
            atom
        }
    }

    pub fn same_name(&self, a: Atom, b: Atom) -> bool {
        a == b || (self.options.ignore_case && self.name_key(a) == self.name_key(b))
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    pub fn report(&self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }

    pub(crate) fn report_code(&self, location: SourceLocation, code: u32, args: &[&str]) {
        self.sink.report(Diagnostic::from_code(location, code, args));
    }

    // =========================================================================
    // Declaration -> definition maps
    // =========================================================================

    pub(crate) fn record_namespace_decl(&self, decl: DeclId, def: NamespaceDefId) {
        self.namespace_of_decl.insert(decl, def);
    }

    pub(crate) fn record_type_decl(&self, decl: DeclId, def: TypeDefId) {
        self.type_of_decl.insert(decl, def);
    }

    pub(crate) fn record_member_decl(&self, decl: DeclId, def: MemberDefId) {
        self.member_of_decl.insert(decl, def);
    }

    pub(crate) fn record_generic_decl(&self, decl: DeclId, def: GenericParamId) {
        self.generic_of_decl.insert(decl, def);
    }

    fn belongs_here(&self, decl: DeclId) -> bool {
        self.arena.unit_of(decl) == Some(self.unit)
    }

    /// The namespace definition a namespace declaration was aggregated into.
    pub fn namespace_def_of(&self, decl: DeclId) -> Option<NamespaceDefId> {
        self.try_namespace_def_of(decl).ok().flatten()
    }

    pub(crate) fn try_namespace_def_of(&self, decl: DeclId) -> Lookup<Option<NamespaceDefId>> {
        if let Some(id) = self.namespace_of_decl.get(&decl) {
            return Ok(Some(*id));
        }
        if !self.belongs_here(decl) {
            return Ok(None);
        }
        let Some(Container::Decl(parent)) = self.arena.container(decl) else {
            return Ok(None);
        };
        let Some(parent_def) = self.try_namespace_def_of(parent)? else {
            return Ok(None);
        };
        if let Some(ns) = self.namespace(parent_def) {
            ns.try_members(self)?;
        }
        Ok(self.namespace_of_decl.get(&decl).map(|r| *r))
    }

    /// The type definition a type declaration was aggregated into.
    pub fn type_def_of(&self, decl: DeclId) -> Option<TypeDefId> {
        self.try_type_def_of(decl).ok().flatten()
    }

    pub(crate) fn try_type_def_of(&self, decl: DeclId) -> Lookup<Option<TypeDefId>> {
        if let Some(id) = self.type_of_decl.get(&decl) {
            return Ok(Some(*id));
        }
        if !self.belongs_here(decl) {
            return Ok(None);
        }
        let Some(Container::Decl(parent)) = self.arena.container(decl) else {
            return Ok(None);
        };
        match &self.arena.node(parent).kind {
            DeclKind::Namespace(_) => {
                if let Some(ns) = self.try_namespace_def_of(parent)?.and_then(|id| self.namespace(id)) {
                    ns.try_members(self)?;
                }
            }
            DeclKind::Type(_) => {
                if let Some(ty) = self.try_type_def_of(parent)?.and_then(|id| self.type_def(id)) {
                    ty.try_nested_types(self)?;
                }
            }
            _ => return Ok(None),
        }
        Ok(self.type_of_decl.get(&decl).map(|r| *r))
    }

    /// The member definition a member declaration (or synthesized accessor)
    /// was aggregated into.
    pub fn member_def_of(&self, decl: DeclId) -> Option<MemberDefId> {
        self.try_member_def_of(decl).ok().flatten()
    }

    pub(crate) fn try_member_def_of(&self, decl: DeclId) -> Lookup<Option<MemberDefId>> {
        if let Some(id) = self.member_of_decl.get(&decl) {
            return Ok(Some(*id));
        }
        if !self.belongs_here(decl) {
            return Ok(None);
        }
        let Some(owner) = self.arena.container(decl).and_then(Container::as_decl) else {
            return Ok(None);
        };
        if let Some(ty) = self.try_type_def_of(owner)?.and_then(|id| self.type_def(id)) {
            ty.try_members(self)?;
        }
        Ok(self.member_of_decl.get(&decl).map(|r| *r))
    }

    /// The unified generic parameter a generic parameter declaration
    /// belongs to.
    pub fn generic_param_of(&self, decl: DeclId) -> Option<GenericParamId> {
        self.try_generic_param_of(decl).ok().flatten()
    }

    pub(crate) fn try_generic_param_of(&self, decl: DeclId) -> Lookup<Option<GenericParamId>> {
        if let Some(id) = self.generic_of_decl.get(&decl) {
            return Ok(Some(*id));
        }
        let Some(owner) = self.arena.container(decl).and_then(Container::as_decl) else {
            return Ok(None);
        };
        match &self.arena.node(owner).kind {
            DeclKind::Type(_) => {
                self.try_type_def_of(owner)?;
            }
            DeclKind::Method(_) => {
                self.try_member_def_of(owner)?;
            }
            _ => return Ok(None),
        }
        Ok(self.generic_of_decl.get(&decl).map(|r| *r))
    }

    // =========================================================================
    // Namespace scopes
    // =========================================================================

    /// Resolution state of one namespace declaration.
    pub fn scope(&self, ns_decl: DeclId) -> Arc<NamespaceScope> {
        if let Some(scope) = self.scopes.get(&ns_decl) {
            return Arc::clone(scope.value());
        }
        Arc::clone(
            self.scopes
                .entry(ns_decl)
                .or_insert_with(|| Arc::new(NamespaceScope::new(ns_decl)))
                .value(),
        )
    }

    // =========================================================================
    // Type references
    // =========================================================================

    /// The type definition behind a type reference, looking through generic
    /// instances.
    pub fn definition_of(&self, ty: TypeRef) -> Option<Arc<NamedTypeDefinition>> {
        match ty {
            TypeRef::Def(id) => self.type_def(id),
            TypeRef::Instance(id) => self.instance(id).and_then(|i| self.type_def(i.generic)),
            _ => None,
        }
    }

    /// Readable name of a type reference, for diagnostics.
    pub fn display_type(&self, ty: TypeRef) -> String {
        match ty {
            TypeRef::Def(id) => self
                .type_def(id)
                .map(|def| def.full_name(self))
                .unwrap_or_else(|| "?".to_string()),
            TypeRef::Builtin(builtin) => builtin.full_name().to_string(),
            TypeRef::GenericParam(id) => self
                .generic_param(id)
                .map(|p| self.name(p.name).to_string())
                .unwrap_or_else(|| "?".to_string()),
            TypeRef::Instance(id) => match self.instance(id) {
                Some(instance) => {
                    let args: Vec<String> =
                        instance.args.iter().map(|a| self.display_type(*a)).collect();
                    format!(
                        "{}<{}>",
                        self.display_type(TypeRef::Def(instance.generic)),
                        args.join(", ")
                    )
                }
                None => "?".to_string(),
            },
            TypeRef::Error => "<error>".to_string(),
        }
    }
}

impl std::fmt::Debug for Compilation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compilation")
            .field("unit", &self.unit)
            .field("roots", &self.roots())
            .field("store", &self.store)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/compilation_tests.rs"]
mod tests;
