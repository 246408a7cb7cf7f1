//! Member definitions and the member fold of a type.
//!
//! `declared_members` walks every declaration of a type once, in order.
//! Partial methods with the same signature become one definition; any
//! other repeated signature is reported and kept as a separate member.
//! Accessors of a property or event follow it directly.

use crate::compilation::{Compilation, Lookup};
use crate::generics::{GenericOwner, unify_generic_params};
use crate::resolver::type_args_of;
use crate::synthesize;
use crate::types::{NamedTypeDefinition, TypeMember, TypeTable};
use rustc_hash::{FxHashMap, FxHashSet};
use srcmodel_common::diagnostics::codes;
use srcmodel_common::limits;
use srcmodel_common::{
    Atom, DeclId, GenericParamId, LazyCache, MemberDefId, SourceLocation, TypeDefId, TypeRef,
};
use srcmodel_syntax::{
    DeclKind, Expr, ExprKind, MethodDecl, Modifiers, ParameterModifier, Visibility,
};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, debug_span, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    EnumValue,
    Method,
    Constructor,
    StaticConstructor,
    Property,
    Event,
}

impl MemberKind {
    pub fn is_method_like(self) -> bool {
        matches!(
            self,
            MemberKind::Method | MemberKind::Constructor | MemberKind::StaticConstructor
        )
    }
}

struct MemberState {
    declarations: Vec<DeclId>,
    modifiers: Modifiers,
    generic_params: Vec<GenericParamId>,
}

pub struct MemberDefinition {
    pub id: MemberDefId,
    pub kind: MemberKind,
    pub name: Atom,
    pub owner: TypeDefId,
    /// The property or event an accessor method belongs to.
    pub accessor_of: Option<MemberDefId>,
    /// Created by the engine rather than declared in source.
    pub synthesized: bool,
    state: RwLock<MemberState>,
    value_type: LazyCache<TypeRef>,
    pub(crate) attributes: LazyCache<Vec<crate::attributes::CustomAttribute>>,
}

impl MemberDefinition {
    pub(crate) fn new(
        id: MemberDefId,
        kind: MemberKind,
        name: Atom,
        owner: TypeDefId,
        accessor_of: Option<MemberDefId>,
        synthesized: bool,
    ) -> Self {
        MemberDefinition {
            id,
            kind,
            name,
            owner,
            accessor_of,
            synthesized,
            state: RwLock::new(MemberState {
                declarations: Vec::new(),
                modifiers: Modifiers::empty(),
                generic_params: Vec::new(),
            }),
            value_type: LazyCache::new(),
            attributes: LazyCache::new(),
        }
    }

    /// Attach a declaration. Idempotent; runs under the build lock.
    pub(crate) fn add_declaration(&self, comp: &Compilation, decl: DeclId) {
        let node = comp.arena().node(decl);
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if !state.declarations.contains(&decl) {
                state.declarations.push(decl);
                state.modifiers |= node.modifiers();
                if let Some(method) = node.as_method() {
                    unify_generic_params(
                        comp,
                        GenericOwner::Method(self.id),
                        self.name,
                        &mut state.generic_params,
                        &method.generic_params,
                    );
                }
            }
        }
        comp.record_member_decl(decl, self.id);
    }

    fn read_state<R>(&self, f: impl FnOnce(&MemberState) -> R) -> R {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn declarations(&self) -> Vec<DeclId> {
        self.read_state(|s| s.declarations.clone())
    }

    pub fn primary_declaration(&self) -> Option<DeclId> {
        self.read_state(|s| s.declarations.first().copied())
    }

    pub fn modifiers(&self) -> Modifiers {
        self.read_state(|s| s.modifiers)
    }

    pub fn visibility(&self) -> Visibility {
        self.modifiers().visibility().unwrap_or(Visibility::Private)
    }

    pub fn is_static(&self) -> bool {
        self.modifiers().contains(Modifiers::STATIC)
    }

    pub fn is_extension(&self) -> bool {
        self.kind == MemberKind::Method && self.modifiers().contains(Modifiers::EXTENSION)
    }

    pub fn is_partial(&self) -> bool {
        self.modifiers().contains(Modifiers::PARTIAL)
    }

    /// Marked pure, or carrying a contract declared pure.
    pub fn is_pure(&self, comp: &Compilation) -> bool {
        if self.modifiers().contains(Modifiers::PURE) {
            return true;
        }
        self.declarations().into_iter().any(|decl| {
            comp.arena()
                .node(decl)
                .as_method()
                .and_then(|m| m.contract.as_ref())
                .is_some_and(|c| c.is_pure)
        })
    }

    pub fn generic_parameters(&self) -> Vec<GenericParamId> {
        self.read_state(|s| s.generic_params.clone())
    }

    pub fn location(&self, comp: &Compilation) -> SourceLocation {
        self.primary_declaration()
            .map(|d| comp.arena().node(d).location)
            .unwrap_or(SourceLocation::SYNTHETIC)
    }

    /// Parameter declarations of the primary declaration.
    pub fn parameters(&self, comp: &Compilation) -> Vec<DeclId> {
        let Some(decl) = self.primary_declaration() else {
            return Vec::new();
        };
        let node = comp.arena().node(decl);
        match &node.kind {
            DeclKind::Method(method) => method.parameters.clone(),
            DeclKind::Property(prop) => prop.parameters.clone(),
            _ => Vec::new(),
        }
    }

    /// Field type, property/event type, or method return type.
    pub fn value_type(&self, comp: &Compilation) -> TypeRef {
        self.try_value_type(comp).unwrap_or(TypeRef::Error)
    }

    pub(crate) fn try_value_type(&self, comp: &Compilation) -> Lookup<TypeRef> {
        self.value_type
            .try_get_or_init_locked(comp.build_lock(), || {
                if matches!(
                    self.kind,
                    MemberKind::Constructor | MemberKind::StaticConstructor
                ) {
                    return Ok(TypeRef::VOID);
                }
                let Some(decl) = self.primary_declaration() else {
                    return Ok(TypeRef::Error);
                };
                let node = comp.arena().node(decl);
                let expr = match &node.kind {
                    DeclKind::Field(field) => &field.ty,
                    DeclKind::Method(method) => &method.return_type,
                    DeclKind::Property(prop) => &prop.ty,
                    DeclKind::Event(event) => &event.ty,
                    DeclKind::EnumMember(_) => return Ok(TypeRef::Def(self.owner)),
                    _ => return Ok(TypeRef::Error),
                };
                comp.try_resolve_type(expr)
            })
            .copied()
    }
}

impl std::fmt::Debug for MemberDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberDefinition")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("synthesized", &self.synthesized)
            .finish()
    }
}

// =============================================================================
// Signatures
// =============================================================================

/// A parameter type as far as overloading is concerned. Method generic
/// parameters are positional so `M<T>(T)` and `M<U>(U)` compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum SigType {
    MethodParam(u16),
    Type(TypeRef),
    Constructed(TypeRef, Vec<SigType>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum MemberKey {
    Named(Atom),
    Method {
        name: Atom,
        arity: usize,
        params: Vec<(bool, SigType)>,
    },
    Indexer(Vec<(bool, SigType)>),
}

// =============================================================================
// Member fold
// =============================================================================

struct MemberFold<'c> {
    comp: &'c Compilation,
    owner: &'c NamedTypeDefinition,
    owner_name: String,
    nested: &'c TypeTable,
    out: Vec<TypeMember>,
    keys: FxHashMap<MemberKey, MemberDefId>,
    seen_nested: FxHashSet<TypeDefId>,
}

impl<'c> MemberFold<'c> {
    fn run(mut self) -> Lookup<Vec<TypeMember>> {
        for decl in self.owner.declarations() {
            let node = self.comp.arena().node(decl);
            let Some(ty) = node.as_type() else {
                continue;
            };
            let mut members = self.comp.arena().members_of(decl);
            if let Some(contract) = &ty.contract {
                members.extend(contract.contract_fields.iter().copied());
                members.extend(contract.contract_methods.iter().copied());
            }
            for member in members {
                self.fold_member(member)?;
            }
        }
        debug!(
            type_def = self.owner.id.0,
            members = self.out.len(),
            "declared members folded"
        );
        Ok(self.out)
    }

    fn fold_member(&mut self, decl: DeclId) -> Lookup<()> {
        let comp = self.comp;
        let node = comp.arena().node(decl);
        match &node.kind {
            DeclKind::Type(ty) => {
                if let Some(&nested) = self.nested.get(&(comp.name_key(ty.name), ty.arity()))
                    && self.seen_nested.insert(nested)
                {
                    self.out.push(TypeMember::NestedType(nested));
                }
            }
            DeclKind::Field(field) => {
                let key = MemberKey::Named(comp.name_key(field.name));
                self.add_keyed(decl, key, MemberKind::Field, field.name, None);
            }
            DeclKind::EnumMember(member) => {
                let key = MemberKey::Named(comp.name_key(member.name));
                self.add_keyed(decl, key, MemberKind::EnumValue, member.name, None);
            }
            DeclKind::Method(method) => self.add_method(decl, method)?,
            DeclKind::Property(prop) => {
                let key = if prop.parameters.is_empty() {
                    MemberKey::Named(comp.name_key(prop.name))
                } else {
                    MemberKey::Indexer(self.signature(&prop.parameters, &[])?)
                };
                let id = self.add_keyed(decl, key, MemberKind::Property, prop.name, None);
                for accessor in comp.arena().property_accessors(decl).iter() {
                    self.add_accessor(accessor, id)?;
                }
            }
            DeclKind::Event(event) => {
                let key = MemberKey::Named(comp.name_key(event.name));
                let id = self.add_keyed(decl, key, MemberKind::Event, event.name, None);
                for accessor in comp.arena().event_accessors(decl).iter() {
                    self.add_accessor(accessor, id)?;
                }
            }
            DeclKind::Namespace(_)
            | DeclKind::Alias(_)
            | DeclKind::Import(_)
            | DeclKind::Parameter(_)
            | DeclKind::GenericParameter(_) => {}
        }
        Ok(())
    }

    fn add_method(&mut self, decl: DeclId, method: &MethodDecl) -> Lookup<()> {
        let comp = self.comp;
        let generic_names: Vec<Atom> = method
            .generic_params
            .iter()
            .filter_map(|&gp| comp.arena().node(gp).name())
            .collect();
        let key = MemberKey::Method {
            name: comp.name_key(method.name),
            arity: method.generic_params.len(),
            params: self.signature(&method.parameters, &generic_names)?,
        };
        if let Some(existing) = self.keys.get(&key).and_then(|&id| comp.member(id))
            && existing.is_partial()
            && method.modifiers.contains(Modifiers::PARTIAL)
            && existing.declarations().len() == 1
        {
            existing.add_declaration(comp, decl);
            debug!(member = existing.id.0, ?decl, "partial method declaration aggregated");
            return Ok(());
        }
        let kind = method_kind(comp, method.name);
        self.add_keyed(decl, key, kind, method.name, None);
        Ok(())
    }

    fn add_accessor(&mut self, decl: DeclId, owner: MemberDefId) -> Lookup<()> {
        let comp = self.comp;
        let node = comp.arena().node(decl);
        let Some(method) = node.as_method() else {
            return Ok(());
        };
        let key = MemberKey::Method {
            name: comp.name_key(method.name),
            arity: 0,
            params: self.signature(&method.parameters, &[])?,
        };
        self.add_keyed(decl, key, MemberKind::Method, method.name, Some(owner));
        Ok(())
    }

    /// Create a member for `decl`, reporting a conflict when `key` is taken.
    fn add_keyed(
        &mut self,
        decl: DeclId,
        key: MemberKey,
        kind: MemberKind,
        name: Atom,
        accessor_of: Option<MemberDefId>,
    ) -> MemberDefId {
        let comp = self.comp;
        if self.keys.contains_key(&key) {
            let member_name = comp.name(name);
            comp.report_code(
                comp.arena().node(decl).location,
                codes::CONFLICTING_MEMBER_SIGNATURE,
                &[&self.owner_name, &member_name],
            );
        }
        let def = comp.store().register_member(|id| {
            MemberDefinition::new(id, kind, name, self.owner.id, accessor_of, false)
        });
        def.add_declaration(comp, decl);
        self.keys.entry(key).or_insert(def.id);
        self.out.push(TypeMember::Member(def.id));
        def.id
    }

    fn signature(&self, params: &[DeclId], generic_names: &[Atom]) -> Lookup<Vec<(bool, SigType)>> {
        params
            .iter()
            .map(|&param| {
                let node = self.comp.arena().node(param);
                let Some(param) = node.as_parameter() else {
                    return Ok((false, SigType::Type(TypeRef::Error)));
                };
                let by_ref = matches!(param.modifier, ParameterModifier::Ref | ParameterModifier::Out);
                Ok((by_ref, self.sig_type(&param.ty, generic_names)?))
            })
            .collect()
    }

    /// Signature of one parameter type, computed without resolving method
    /// generic parameters through the member fold that is running.
    fn sig_type(&self, expr: &Expr, generic_names: &[Atom]) -> Lookup<SigType> {
        if let ExprKind::Name { name, type_args } = &expr.kind
            && type_args.is_empty()
            && let Some(index) = generic_names
                .iter()
                .position(|g| self.comp.same_name(*g, *name))
                .and_then(limits::parameter_index)
        {
            return Ok(SigType::MethodParam(index));
        }
        let args = type_args_of(expr);
        if args.is_empty() {
            return Ok(SigType::Type(self.comp.try_resolve_type(expr)?));
        }
        let head = self.comp.try_resolve_generic_head(expr)?;
        let args = args
            .iter()
            .map(|arg| self.sig_type(arg, generic_names))
            .collect::<Lookup<Vec<_>>>()?;
        Ok(SigType::Constructed(head, args))
    }
}

pub(crate) fn method_kind(comp: &Compilation, name: Atom) -> MemberKind {
    match &*comp.name(name) {
        ".ctor" => MemberKind::Constructor,
        ".cctor" => MemberKind::StaticConstructor,
        _ => MemberKind::Method,
    }
}

// =============================================================================
// Member lists of a type
// =============================================================================

impl NamedTypeDefinition {
    /// Members of every declaration in declaration order, nested types
    /// included.
    pub fn declared_members(&self, comp: &Compilation) -> Vec<TypeMember> {
        self.try_declared_members(comp)
            .map(<[TypeMember]>::to_vec)
            .unwrap_or_default()
    }

    pub(crate) fn try_declared_members(&self, comp: &Compilation) -> Lookup<&[TypeMember]> {
        self.declared_members
            .try_get_or_init_locked(comp.build_lock(), || {
                let _span = debug_span!("declared_members", type_def = self.id.0).entered();
                let nested = self.try_nested_types(comp)?;
                MemberFold {
                    comp,
                    owner: self,
                    owner_name: self.full_name(comp),
                    nested,
                    out: Vec::new(),
                    keys: FxHashMap::default(),
                    seen_nested: FxHashSet::default(),
                }
                .run()
            })
            .map(Vec::as_slice)
    }

    /// Declared members followed by synthesized ones.
    pub fn members(&self, comp: &Compilation) -> Vec<TypeMember> {
        self.try_members(comp)
            .map(<[TypeMember]>::to_vec)
            .unwrap_or_default()
    }

    pub(crate) fn try_members(&self, comp: &Compilation) -> Lookup<&[TypeMember]> {
        self.members
            .try_get_or_init_locked(comp.build_lock(), || {
                let mut members = self.try_declared_members(comp)?.to_vec();
                let synthesized = synthesize::synthesized_members(comp, self, &members)?;
                members.extend(synthesized.into_iter().map(TypeMember::Member));
                Ok(members)
            })
            .map(Vec::as_slice)
    }

    pub fn members_named(&self, comp: &Compilation, name: Atom) -> Vec<TypeMember> {
        self.try_members_named(comp, name).unwrap_or_default()
    }

    pub(crate) fn try_members_named(&self, comp: &Compilation, name: Atom) -> Lookup<Vec<TypeMember>> {
        let index = self
            .members_by_name
            .try_get_or_init_locked(comp.build_lock(), || {
                let mut index: FxHashMap<Atom, Vec<TypeMember>> = FxHashMap::default();
                for &member in self.try_members(comp)? {
                    let name = match member {
                        TypeMember::Member(id) => comp.member(id).map(|m| m.name),
                        TypeMember::NestedType(id) => comp.type_def(id).map(|t| t.name),
                    };
                    match name {
                        Some(name) => index.entry(comp.name_key(name)).or_default().push(member),
                        None => warn!(?member, "member missing from the store"),
                    }
                }
                Ok(index)
            })?;
        Ok(index.get(&comp.name_key(name)).cloned().unwrap_or_default())
    }

    /// Member definitions (nested types excluded), synthesized ones last.
    pub fn member_definitions(&self, comp: &Compilation) -> Vec<Arc<MemberDefinition>> {
        self.members(comp)
            .into_iter()
            .filter_map(TypeMember::as_member)
            .filter_map(|id| comp.member(id))
            .collect()
    }

    /// Instance constructors, declared or synthesized.
    pub fn constructors(&self, comp: &Compilation) -> Vec<Arc<MemberDefinition>> {
        self.member_definitions(comp)
            .into_iter()
            .filter(|m| m.kind == MemberKind::Constructor)
            .collect()
    }
}

#[cfg(test)]
#[path = "../tests/members_tests.rs"]
mod tests;
