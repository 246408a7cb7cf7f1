//! Named type definitions.
//!
//! A `NamedTypeDefinition` aggregates every declaration of one type: all
//! parts of a partial class, or the single declaration of anything else.
//! Declarations are appended under the build lock while the containing
//! namespace or type folds its member list; everything derived from them
//! (base class, interfaces, members, attributes) is computed lazily and
//! cached for the lifetime of the compilation.

use crate::compilation::{Compilation, Lookup};
use crate::generics::{GenericOwner, unify_generic_params};
use crate::resolver::NameRole;
use bitflags::bitflags;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use srcmodel_common::diagnostics::codes;
use srcmodel_common::limits::MAX_BASE_CLASS_CHAIN;
use srcmodel_common::{
    Atom, BuiltinType, DeclId, GenericParamId, LazyCache, MemberDefId, NamespaceDefId, Resolved,
    SourceLocation, TypeDefId, TypeRef,
};
use srcmodel_syntax::{DeclKind, Expr, Modifiers, TypeKind, Visibility};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

bitflags! {
    /// Type attributes accumulated over all declarations.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u16 {
        const ABSTRACT = 1 << 0;
        const CLASS = 1 << 1;
        const STATIC = 1 << 2;
        const DELEGATE = 1 << 3;
        const SEALED = 1 << 4;
        const INTERFACE = 1 << 5;
        const STRUCT = 1 << 6;
        const VALUE_TYPE = 1 << 7;
        const ENUM = 1 << 8;
    }
}

impl TypeFlags {
    pub fn from_declaration(kind: TypeKind, modifiers: Modifiers) -> TypeFlags {
        let mut flags = match kind {
            TypeKind::Class => TypeFlags::CLASS,
            TypeKind::Struct => TypeFlags::STRUCT | TypeFlags::VALUE_TYPE | TypeFlags::SEALED,
            TypeKind::Interface => TypeFlags::INTERFACE | TypeFlags::ABSTRACT,
            TypeKind::Enum => TypeFlags::ENUM | TypeFlags::VALUE_TYPE | TypeFlags::SEALED,
            TypeKind::Delegate => TypeFlags::DELEGATE | TypeFlags::CLASS | TypeFlags::SEALED,
        };
        if modifiers.contains(Modifiers::ABSTRACT) {
            flags |= TypeFlags::ABSTRACT;
        }
        if modifiers.contains(Modifiers::SEALED) {
            flags |= TypeFlags::SEALED;
        }
        if modifiers.contains(Modifiers::STATIC) {
            flags |= TypeFlags::STATIC | TypeFlags::ABSTRACT | TypeFlags::SEALED;
        }
        flags
    }
}

/// Where a type definition lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefContainer {
    Namespace(NamespaceDefId),
    Type(TypeDefId),
}

/// One entry of a type's member list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeMember {
    Member(MemberDefId),
    NestedType(TypeDefId),
}

impl TypeMember {
    pub fn as_member(self) -> Option<MemberDefId> {
        match self {
            TypeMember::Member(id) => Some(id),
            TypeMember::NestedType(_) => None,
        }
    }

    pub fn as_nested_type(self) -> Option<TypeDefId> {
        match self {
            TypeMember::NestedType(id) => Some(id),
            TypeMember::Member(_) => None,
        }
    }
}

/// Nested types keyed by (name, arity).
pub type TypeTable = IndexMap<(Atom, usize), TypeDefId>;

struct TypeState {
    declarations: Vec<DeclId>,
    kind: Option<TypeKind>,
    flags: TypeFlags,
    visibility: Option<Visibility>,
    all_partial: bool,
    generic_params: Vec<GenericParamId>,
    underlying: Option<Expr>,
}

pub struct NamedTypeDefinition {
    pub id: TypeDefId,
    pub name: Atom,
    pub arity: usize,
    pub container: DefContainer,
    state: RwLock<TypeState>,
    nested_types: LazyCache<TypeTable>,
    member_names: LazyCache<FxHashSet<Atom>>,
    has_extension_method: LazyCache<bool>,
    base_class: LazyCache<Option<TypeRef>>,
    interfaces: LazyCache<Vec<TypeRef>>,
    underlying_type: LazyCache<TypeRef>,
    instance_type: LazyCache<TypeRef>,
    pub(crate) declared_members: LazyCache<Vec<TypeMember>>,
    pub(crate) members: LazyCache<Vec<TypeMember>>,
    pub(crate) members_by_name: LazyCache<FxHashMap<Atom, Vec<TypeMember>>>,
    pub(crate) attributes: LazyCache<Vec<crate::attributes::CustomAttribute>>,
    pub(crate) enum_values: LazyCache<FxHashMap<MemberDefId, i64>>,
}

impl NamedTypeDefinition {
    pub(crate) fn new(id: TypeDefId, name: Atom, arity: usize, container: DefContainer) -> Self {
        NamedTypeDefinition {
            id,
            name,
            arity,
            container,
            state: RwLock::new(TypeState {
                declarations: Vec::new(),
                kind: None,
                flags: TypeFlags::empty(),
                visibility: None,
                all_partial: true,
                generic_params: Vec::new(),
                underlying: None,
            }),
            nested_types: LazyCache::new(),
            member_names: LazyCache::new(),
            has_extension_method: LazyCache::new(),
            base_class: LazyCache::new(),
            interfaces: LazyCache::new(),
            underlying_type: LazyCache::new(),
            instance_type: LazyCache::new(),
            declared_members: LazyCache::new(),
            members: LazyCache::new(),
            members_by_name: LazyCache::new(),
            attributes: LazyCache::new(),
            enum_values: LazyCache::new(),
        }
    }

    /// Fold one more declaration into this definition.
    ///
    /// Idempotent. Runs under the build lock, from the member fold of the
    /// containing namespace or type.
    pub(crate) fn add_declaration(&self, comp: &Compilation, decl: DeclId) {
        let node = comp.arena().node(decl);
        let Some(ty) = node.as_type() else {
            warn!(?decl, "add_declaration called with a non-type declaration");
            return;
        };
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if !state.declarations.contains(&decl) {
                if self.declared_members.is_computed() || self.nested_types.is_computed() {
                    warn!(?decl, type_def = self.id.0, "declaration added after members were folded");
                }
                state.declarations.push(decl);
                state.kind.get_or_insert(ty.type_kind);
                state.flags |= TypeFlags::from_declaration(ty.type_kind, ty.modifiers);
                if state.visibility.is_none() {
                    state.visibility = ty.modifiers.visibility();
                }
                state.all_partial &= ty.is_partial();
                if state.underlying.is_none() {
                    state.underlying = ty.underlying_type.clone();
                }
                unify_generic_params(
                    comp,
                    GenericOwner::Type(self.id),
                    self.name,
                    &mut state.generic_params,
                    &ty.generic_params,
                );
                debug!(
                    type_def = self.id.0,
                    ?decl,
                    parts = state.declarations.len(),
                    "type declaration aggregated"
                );
            }
        }
        comp.record_type_decl(decl, self.id);
    }

    fn read_state<R>(&self, f: impl FnOnce(&TypeState) -> R) -> R {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    // =========================================================================
    // Aggregated declaration data
    // =========================================================================

    pub fn declarations(&self) -> Vec<DeclId> {
        self.read_state(|s| s.declarations.clone())
    }

    /// The first declaration; synthesized members are bound to it.
    pub fn primary_declaration(&self) -> Option<DeclId> {
        self.read_state(|s| s.declarations.first().copied())
    }

    pub fn kind(&self) -> Option<TypeKind> {
        self.read_state(|s| s.kind)
    }

    pub fn flags(&self) -> TypeFlags {
        self.read_state(|s| s.flags)
    }

    pub(crate) fn is_partial(&self) -> bool {
        self.read_state(|s| !s.declarations.is_empty() && s.all_partial)
    }

    /// The first visibility any declaration spells out; otherwise private
    /// for nested types and internal for top-level ones.
    pub fn visibility(&self) -> Visibility {
        self.read_state(|s| s.visibility).unwrap_or(match self.container {
            DefContainer::Type(_) => Visibility::Private,
            DefContainer::Namespace(_) => Visibility::Internal,
        })
    }

    pub fn is_nested(&self) -> bool {
        matches!(self.container, DefContainer::Type(_))
    }

    pub fn is_interface(&self) -> bool {
        self.kind() == Some(TypeKind::Interface)
    }

    pub fn is_generic(&self) -> bool {
        self.arity > 0
    }

    pub fn generic_parameters(&self) -> Vec<GenericParamId> {
        self.read_state(|s| s.generic_params.clone())
    }

    pub fn location(&self, comp: &Compilation) -> SourceLocation {
        self.primary_declaration()
            .map(|d| comp.arena().node(d).location)
            .unwrap_or(SourceLocation::SYNTHETIC)
    }

    /// Dotted name including containing namespaces and types.
    pub fn full_name(&self, comp: &Compilation) -> String {
        let own = comp.name(self.name);
        let prefix = match self.container {
            DefContainer::Namespace(ns) => comp
                .namespace(ns)
                .map(|ns| ns.full_name(comp))
                .unwrap_or_default(),
            DefContainer::Type(outer) => comp
                .type_def(outer)
                .map(|outer| outer.full_name(comp))
                .unwrap_or_default(),
        };
        if prefix.is_empty() {
            own.to_string()
        } else {
            format!("{prefix}.{own}")
        }
    }

    // =========================================================================
    // Nested types and member names (arena-only folds)
    // =========================================================================

    /// Nested types of every declaration, aggregated by (name, arity).
    pub fn nested_types(&self, comp: &Compilation) -> Vec<TypeDefId> {
        self.try_nested_types(comp)
            .map(|table| table.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn nested_type(&self, comp: &Compilation, name: Atom, arity: usize) -> Option<TypeDefId> {
        self.try_nested_type(comp, name, arity).ok().flatten()
    }

    pub(crate) fn try_nested_type(
        &self,
        comp: &Compilation,
        name: Atom,
        arity: usize,
    ) -> Lookup<Option<TypeDefId>> {
        Ok(self
            .try_nested_types(comp)?
            .get(&(comp.name_key(name), arity))
            .copied())
    }

    pub(crate) fn try_nested_types(&self, comp: &Compilation) -> Lookup<&TypeTable> {
        self.nested_types.get_or_try_init_locked(comp.build_lock(), || {
            let mut table = TypeTable::new();
            let owner_name = self.full_name(comp);
            for decl in self.declarations() {
                for member in comp.arena().members_of(decl) {
                    fold_type_declaration(
                        comp,
                        &mut table,
                        DefContainer::Type(self.id),
                        &owner_name,
                        member,
                    );
                }
            }
            table
        })
    }

    /// Whether any declaration declares a non-type member called `name`.
    ///
    /// Answered from the declarations alone, so name lookup can skip the
    /// member fold for names the type does not declare.
    pub(crate) fn declares_member_named(&self, comp: &Compilation, name: Atom) -> bool {
        let names = self.member_names.get_or_init(|| {
            let mut names = FxHashSet::default();
            for decl in self.declarations() {
                for member in comp.arena().members_of(decl) {
                    let node = comp.arena().node(member);
                    if matches!(node.kind, DeclKind::Type(_)) {
                        continue;
                    }
                    if let Some(member_name) = node.name() {
                        names.insert(comp.name_key(member_name));
                    }
                }
            }
            names
        });
        names.contains(&comp.name_key(name))
    }

    /// Whether any declaration declares an extension method.
    pub fn has_extension_method(&self, comp: &Compilation) -> bool {
        *self.has_extension_method.get_or_init(|| {
            self.declarations().into_iter().any(|decl| {
                comp.arena()
                    .members_of(decl)
                    .into_iter()
                    .any(|m| comp.arena().node(m).as_method().is_some_and(|m| m.is_extension()))
            })
        })
    }

    // =========================================================================
    // Base types
    // =========================================================================

    /// The base class: `MulticastDelegate` for delegates, `Enum` for enums,
    /// `ValueType` for structs, nothing for interfaces, otherwise the first
    /// class among the resolved base type expressions (`Object` if none).
    pub fn base_class(&self, comp: &Compilation) -> Option<TypeRef> {
        self.try_base_class(comp).unwrap_or(Some(TypeRef::Error))
    }

    pub(crate) fn try_base_class(&self, comp: &Compilation) -> Lookup<Option<TypeRef>> {
        self.base_class
            .try_get_or_init_locked(comp.build_lock(), || self.compute_base_class(comp))
            .copied()
    }

    fn compute_base_class(&self, comp: &Compilation) -> Lookup<Option<TypeRef>> {
        match self.kind() {
            Some(TypeKind::Delegate) => {
                return Ok(Some(TypeRef::Builtin(BuiltinType::MulticastDelegate)));
            }
            Some(TypeKind::Enum) => return Ok(Some(TypeRef::Builtin(BuiltinType::Enum))),
            Some(TypeKind::Struct) => return Ok(Some(TypeRef::Builtin(BuiltinType::ValueType))),
            Some(TypeKind::Interface) | None => return Ok(None),
            Some(TypeKind::Class) => {}
        }
        let own_name = self.full_name(comp);
        let mut base: Option<TypeRef> = None;
        for decl in self.declarations() {
            let node = comp.arena().node(decl);
            let Some(ty) = node.as_type() else {
                continue;
            };
            for expr in &ty.base_types {
                let candidate = match comp.try_resolve_in(expr, NameRole::Type)? {
                    Resolved::Type(TypeRef::Error) | Resolved::Nothing => {
                        let text = comp.expr_text(expr);
                        comp.report_code(
                            expr.location,
                            codes::BASE_TYPE_NOT_FOUND,
                            &[&text, &own_name],
                        );
                        TypeRef::Error
                    }
                    Resolved::Type(found) if comp.is_interface(found) => continue,
                    Resolved::Type(found) if comp.can_derive_from(found) => found,
                    _ => {
                        let text = comp.expr_text(expr);
                        comp.report_code(
                            expr.location,
                            codes::BASE_TYPE_NOT_A_CLASS,
                            &[&text, &own_name],
                        );
                        TypeRef::Error
                    }
                };
                match base {
                    None => base = Some(candidate),
                    Some(first) if first != candidate => {
                        comp.report_code(expr.location, codes::MULTIPLE_BASE_CLASSES, &[&own_name]);
                    }
                    Some(_) => {}
                }
            }
        }
        let Some(base) = base else {
            return Ok(Some(TypeRef::OBJECT));
        };
        if self.base_chain_reaches_self(comp, base) {
            comp.report_code(self.location(comp), codes::CYCLIC_BASE_TYPE, &[&own_name]);
            return Ok(Some(TypeRef::OBJECT));
        }
        Ok(Some(base))
    }

    /// Walks the base chain starting at `base`. A chain member whose base
    /// class is being computed on this thread is part of a cycle through
    /// this type.
    fn base_chain_reaches_self(&self, comp: &Compilation, base: TypeRef) -> bool {
        let mut current = comp.definition_of(base);
        for _ in 0..MAX_BASE_CLASS_CHAIN {
            let Some(def) = current else {
                return false;
            };
            if def.id == self.id {
                return true;
            }
            match def.try_base_class(comp) {
                Ok(next) => current = next.and_then(|next| comp.definition_of(next)),
                Err(_) => return true,
            }
        }
        true
    }

    /// Interface-typed base type expressions, resolved, in order, without
    /// duplicates.
    pub fn interfaces(&self, comp: &Compilation) -> Vec<TypeRef> {
        self.try_interfaces(comp).unwrap_or_default()
    }

    pub(crate) fn try_interfaces(&self, comp: &Compilation) -> Lookup<Vec<TypeRef>> {
        self.interfaces
            .try_get_or_init_locked(comp.build_lock(), || {
                let mut out = Vec::new();
                for decl in self.declarations() {
                    let node = comp.arena().node(decl);
                    let Some(ty) = node.as_type() else {
                        continue;
                    };
                    for expr in &ty.base_types {
                        if let Resolved::Type(found) = comp.try_resolve_in(expr, NameRole::Type)?
                            && comp.is_interface(found)
                            && !out.contains(&found)
                        {
                            out.push(found);
                        }
                    }
                }
                Ok(out)
            })
            .cloned()
    }

    /// Enum underlying type: the first explicit one, `Int32` by default.
    pub fn underlying_type(&self, comp: &Compilation) -> Option<TypeRef> {
        if self.kind() != Some(TypeKind::Enum) {
            return None;
        }
        let explicit = self.read_state(|s| s.underlying.clone());
        let ty = self
            .underlying_type
            .try_get_or_init_locked(comp.build_lock(), || match &explicit {
                Some(expr) => comp.try_resolve_type(expr),
                None => Ok(TypeRef::INT32),
            })
            .copied()
            .unwrap_or(TypeRef::Error);
        Some(ty)
    }

    /// The type as seen from inside itself: the definition for non-generic
    /// types, the instance over its own parameters for generic ones.
    pub fn instance_type(&self, comp: &Compilation) -> TypeRef {
        *self.instance_type.get_or_init(|| {
            if !self.is_generic() {
                return TypeRef::Def(self.id);
            }
            let args = self
                .generic_parameters()
                .into_iter()
                .map(TypeRef::GenericParam)
                .collect();
            TypeRef::Instance(comp.store().intern_instance(self.id, args))
        })
    }
}

impl std::fmt::Debug for NamedTypeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedTypeDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("kind", &self.kind())
            .field("declarations", &self.declarations())
            .finish()
    }
}

/// Aggregate the type declaration `decl` into `table`, creating its
/// definition on first sight. Non-type declarations are ignored.
pub(crate) fn fold_type_declaration(
    comp: &Compilation,
    table: &mut TypeTable,
    container: DefContainer,
    container_name: &str,
    decl: DeclId,
) {
    let node = comp.arena().node(decl);
    let Some(ty) = node.as_type() else {
        return;
    };
    let key = (comp.name_key(ty.name), ty.arity());
    let def = match table.get(&key).and_then(|&id| comp.type_def(id)) {
        Some(existing) => {
            if !(existing.is_partial() && ty.is_partial()) {
                let name = comp.name(ty.name);
                comp.report_code(
                    node.location,
                    codes::DUPLICATE_TYPE_DECLARATION,
                    &[container_name, &name],
                );
            }
            existing
        }
        None => {
            let def = comp
                .store()
                .register_type(|id| NamedTypeDefinition::new(id, ty.name, ty.arity(), container));
            table.insert(key, def.id);
            def
        }
    };
    def.add_declaration(comp, decl);
}

impl Compilation {
    pub fn is_interface(&self, ty: TypeRef) -> bool {
        match ty {
            TypeRef::Builtin(builtin) => builtin.is_interface(),
            other => self.definition_of(other).is_some_and(|def| def.is_interface()),
        }
    }

    /// Whether a class may name `ty` as its base class.
    pub(crate) fn can_derive_from(&self, ty: TypeRef) -> bool {
        match ty {
            TypeRef::Builtin(builtin) => {
                !builtin.is_value_type()
                    && !matches!(
                        builtin,
                        BuiltinType::Void | BuiltinType::String | BuiltinType::ValueType
                    )
            }
            TypeRef::GenericParam(_) | TypeRef::Error => false,
            other => self
                .definition_of(other)
                .is_some_and(|def| def.kind() == Some(TypeKind::Class)),
        }
    }

    /// `ty` followed by its base classes, nearest first.
    pub fn base_chain(&self, ty: TypeRef) -> Vec<TypeRef> {
        let mut chain = vec![ty];
        let mut current = ty;
        for _ in 0..MAX_BASE_CLASS_CHAIN {
            let next = match current {
                TypeRef::Builtin(builtin) => builtin.base_class().map(TypeRef::Builtin),
                other => match self.definition_of(other) {
                    Some(def) => def.try_base_class(self).ok().flatten(),
                    None => None,
                },
            };
            match next {
                Some(next) if !next.is_error() && !chain.contains(&next) => {
                    chain.push(next);
                    current = next;
                }
                _ => break,
            }
        }
        chain
    }
}

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod tests;
