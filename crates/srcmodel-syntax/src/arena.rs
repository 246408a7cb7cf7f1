//! Declaration storage, two-phase binding and the template copier.
//!
//! Nodes are appended to a shared arena and addressed by [`DeclId`]. The
//! arena is append-only: copies and incremental updates allocate new nodes
//! and never modify a bound one.
//!
//! Binding (`bind`, `bind_root`) records the container of a node once and,
//! when asked to recurse, binds its unbound children and points every owned
//! expression at it. A node that is already bound somewhere else is never
//! rebound; `make_copy_for` produces an unshared copy for the new parent
//! instead, remembering the original as its template.

use crate::attributes::SourceAttribute;
use crate::contracts::TypeContract;
use crate::decl::{
    AccessorPair, AccessorTemplate, AliasDecl, Container, DeclKind, Declaration, DelegateSignature,
    EnumMemberDecl, EventDecl, FieldDecl, GenericParamDecl, ImportDecl, MethodDecl, NamespaceDecl,
    ParameterDecl, PropertyDecl, TypeDecl, Unbound,
};
use crate::expr::{BinaryOp, Expr, ExprKind, Expression, Literal};
use crate::flags::{Modifiers, ParameterModifier};
use srcmodel_common::limits;
use srcmodel_common::{
    Atom, BuiltinType, DeclId, DocumentEdit, LazyCache, NameTable, SourceLocation, UnitId,
};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace, warn};

/// One slot of an updated member list.
#[derive(Debug)]
pub enum MemberSlot {
    /// A member of the old version, kept as is.
    Existing(DeclId),
    /// A member created for the new version.
    New(Unbound),
}

/// Modifiers an accessor inherits from its property or event.
const INHERITED_ACCESSOR_MODIFIERS: Modifiers = Modifiers::STATIC
    .union(Modifiers::VIRTUAL)
    .union(Modifiers::ABSTRACT)
    .union(Modifiers::OVERRIDE)
    .union(Modifiers::SEALED)
    .union(Modifiers::NEW)
    .union(Modifiers::EXTERN);

pub struct DeclArena {
    names: Arc<NameTable>,
    nodes: RwLock<Vec<Arc<Declaration>>>,
    /// Stands in for `DeclId::INVALID` and stale handles.
    dummy: Arc<Declaration>,
}

impl DeclArena {
    pub fn new(names: Arc<NameTable>) -> Self {
        let dummy = Arc::new(Declaration::new(
            DeclKind::Namespace(NamespaceDecl::from_ids(None, Vec::new(), Vec::new())),
            SourceLocation::SYNTHETIC,
            None,
        ));
        DeclArena {
            names,
            nodes: RwLock::new(vec![Arc::clone(&dummy)]),
            dummy,
        }
    }

    #[inline]
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn names_arc(&self) -> Arc<NameTable> {
        Arc::clone(&self.names)
    }

    /// Number of allocated nodes, excluding the invalid slot.
    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
            - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Phase (a): allocation
    // =========================================================================

    /// Allocate an unbound declaration.
    pub fn alloc(&self, kind: DeclKind, location: SourceLocation) -> Unbound {
        Unbound::new(self.push(Declaration::new(kind, location, None)))
    }

    fn alloc_copy(&self, kind: DeclKind, location: SourceLocation, template: DeclId) -> DeclId {
        self.push(Declaration::new(kind, location, Some(template)))
    }

    fn push(&self, decl: Declaration) -> DeclId {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let id = DeclId(nodes.len() as u32);
        nodes.push(Arc::new(decl));
        id
    }

    pub fn get(&self, id: DeclId) -> Option<Arc<Declaration>> {
        if !id.is_valid() {
            return None;
        }
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.index())
            .cloned()
    }

    /// Like [`get`](Self::get), with an empty namespace node standing in for
    /// invalid handles.
    pub fn node(&self, id: DeclId) -> Arc<Declaration> {
        self.get(id).unwrap_or_else(|| Arc::clone(&self.dummy))
    }

    // =========================================================================
    // Phase (b): binding
    // =========================================================================

    /// Bind `unbound` to the declaration `container`.
    ///
    /// With `recurse`, unbound children are bound to it as well and every
    /// owned expression is scoped to it.
    pub fn bind(&self, unbound: Unbound, container: DeclId, recurse: bool) -> DeclId {
        let id = unbound.into_id();
        self.set_container(id, Container::Decl(container), recurse);
        id
    }

    /// Bind a root namespace declaration to compilation unit `unit`.
    pub fn bind_root(&self, unbound: Unbound, unit: UnitId) -> DeclId {
        let id = unbound.into_id();
        self.set_container(id, Container::Unit(unit), true);
        id
    }

    pub fn container(&self, id: DeclId) -> Option<Container> {
        self.get(id).and_then(|decl| decl.container())
    }

    pub fn is_bound(&self, id: DeclId) -> bool {
        self.container(id).is_some()
    }

    fn set_container(&self, id: DeclId, container: Container, recurse: bool) {
        let decl = self.node(id);
        let previous = decl.container();
        debug_assert!(
            previous.is_none(),
            "declaration {id:?} bound twice (to {previous:?}, then {container:?})"
        );
        if decl.container_cell().set(container).is_err() {
            warn!(?id, ?previous, ?container, "declaration bound twice, ignoring");
            return;
        }
        trace!(?id, kind = decl.kind_name(), ?container, "bound declaration");
        if recurse {
            self.bind_children(id, &decl);
        }
    }

    /// Bind a child that must still be unbound.
    fn bind_child(&self, child: DeclId, parent: DeclId) {
        self.set_container(child, Container::Decl(parent), true);
    }

    /// Bind a member only if nobody else owns it yet. Members bound
    /// elsewhere are adopted lazily by `members_of`.
    fn bind_member_if_unbound(&self, member: DeclId, parent: DeclId) {
        if !self.is_bound(member) {
            self.bind_child(member, parent);
        }
    }

    fn bind_attributes(attributes: &[SourceAttribute], scope: DeclId) {
        for attribute in attributes {
            attribute.set_containing_scope(scope);
        }
    }

    fn bind_children(&self, id: DeclId, decl: &Declaration) {
        match &decl.kind {
            DeclKind::Namespace(ns) => {
                for &member in &ns.raw_members {
                    self.bind_member_if_unbound(member, id);
                }
                Self::bind_attributes(&ns.attributes, id);
            }
            DeclKind::Alias(alias) => alias.target.set_containing_scope(id),
            DeclKind::Import(import) => import.target.set_containing_scope(id),
            DeclKind::Type(ty) => {
                for &param in &ty.generic_params {
                    self.bind_child(param, id);
                }
                for base in &ty.base_types {
                    base.set_containing_scope(id);
                }
                for &member in &ty.raw_members {
                    self.bind_member_if_unbound(member, id);
                }
                Self::bind_attributes(&ty.attributes, id);
                if let Some(contract) = &ty.contract {
                    contract.set_containing_type(id);
                    for &member in contract
                        .contract_fields
                        .iter()
                        .chain(&contract.contract_methods)
                    {
                        self.bind_member_if_unbound(member, id);
                    }
                }
                if let Some(underlying) = &ty.underlying_type {
                    underlying.set_containing_scope(id);
                }
                if let Some(invoke) = &ty.invoke {
                    invoke.return_type.set_containing_scope(id);
                    for &param in &invoke.parameters {
                        self.bind_child(param, id);
                    }
                }
            }
            DeclKind::Field(field) => {
                field.ty.set_containing_scope(id);
                if let Some(init) = &field.initializer {
                    init.set_containing_scope(id);
                }
                Self::bind_attributes(&field.attributes, id);
            }
            DeclKind::EnumMember(member) => {
                if let Some(init) = &member.initializer {
                    init.set_containing_scope(id);
                }
                Self::bind_attributes(&member.attributes, id);
            }
            DeclKind::Method(method) => {
                for &param in method.generic_params.iter().chain(&method.parameters) {
                    self.bind_child(param, id);
                }
                method.return_type.set_containing_scope(id);
                if let Some(body) = &method.body {
                    body.set_containing_scope(id);
                }
                if let Some(contract) = &method.contract {
                    contract.set_containing_scope(id);
                }
                Self::bind_attributes(&method.attributes, id);
            }
            DeclKind::Property(prop) => {
                prop.ty.set_containing_scope(id);
                for &param in &prop.parameters {
                    self.bind_child(param, id);
                }
                for template in prop.getter.iter().chain(prop.setter.iter()) {
                    if let Some(body) = &template.body {
                        body.set_containing_scope(id);
                    }
                }
                Self::bind_attributes(&prop.attributes, id);
            }
            DeclKind::Event(event) => {
                event.ty.set_containing_scope(id);
                for template in event.adder.iter().chain(event.remover.iter()) {
                    if let Some(body) = &template.body {
                        body.set_containing_scope(id);
                    }
                }
                Self::bind_attributes(&event.attributes, id);
            }
            DeclKind::Parameter(param) => {
                param.ty.set_containing_scope(id);
                if let Some(default) = &param.default_value {
                    default.set_containing_scope(id);
                }
                Self::bind_attributes(&param.attributes, id);
            }
            DeclKind::GenericParameter(param) => {
                for constraint in &param.constraints {
                    constraint.set_containing_scope(id);
                }
            }
        }
    }

    // =========================================================================
    // Template copier
    // =========================================================================

    /// `id` itself when it is already bound to `container`, otherwise a new
    /// copy bound to `container` whose template is `id`.
    pub fn make_copy_for(&self, id: DeclId, container: DeclId) -> DeclId {
        if self.container(id) == Some(Container::Decl(container)) {
            return id;
        }
        let copy = self.copy_node(id);
        debug!(template = ?id, ?copy, ?container, "copied declaration for new container");
        self.set_container(copy, Container::Decl(container), true);
        copy
    }

    /// Root variant of [`make_copy_for`](Self::make_copy_for).
    pub fn make_root_copy_for(&self, id: DeclId, unit: UnitId) -> DeclId {
        if self.container(id) == Some(Container::Unit(unit)) {
            return id;
        }
        let copy = self.copy_node(id);
        self.set_container(copy, Container::Unit(unit), true);
        copy
    }

    /// An unbound structural copy of `id`, for building new declarations
    /// out of existing parts.
    pub fn copy_unbound(&self, id: DeclId) -> Unbound {
        Unbound::new(self.copy_node(id))
    }

    /// An unbound structural copy of `id`.
    ///
    /// Owned children (parameters, generic parameters, contract members) are
    /// copied eagerly. Namespace and type members are not: the copy lists
    /// the template's members and adopts them on first access.
    fn copy_node(&self, id: DeclId) -> DeclId {
        let decl = self.node(id);
        let kind = match &decl.kind {
            DeclKind::Namespace(ns) => DeclKind::Namespace(NamespaceDecl::from_ids(
                ns.name,
                self.members_of(id),
                copy_attributes(&ns.attributes),
            )),
            DeclKind::Alias(alias) => DeclKind::Alias(AliasDecl {
                name: alias.name,
                target: alias.target.deep_copy(),
            }),
            DeclKind::Import(import) => DeclKind::Import(ImportDecl {
                target: import.target.deep_copy(),
            }),
            DeclKind::Type(ty) => DeclKind::Type(self.copy_type(ty, self.members_of(id))),
            DeclKind::Field(field) => DeclKind::Field(FieldDecl {
                name: field.name,
                modifiers: field.modifiers,
                ty: field.ty.deep_copy(),
                initializer: field.initializer.as_ref().map(|i| i.deep_copy()),
                attributes: copy_attributes(&field.attributes),
            }),
            DeclKind::EnumMember(member) => DeclKind::EnumMember(EnumMemberDecl::new(
                member.name,
                member.initializer.as_ref().map(|i| i.deep_copy()),
                copy_attributes(&member.attributes),
            )),
            DeclKind::Method(method) => DeclKind::Method(MethodDecl {
                name: method.name,
                modifiers: method.modifiers,
                generic_params: self.copy_children(&method.generic_params),
                parameters: self.copy_children(&method.parameters),
                return_type: method.return_type.deep_copy(),
                body: method.body.as_ref().map(|b| b.deep_copy()),
                contract: method.contract.as_ref().map(|c| Arc::new(c.copy_unbound())),
                attributes: copy_attributes(&method.attributes),
                accessor_of: method.accessor_of,
            }),
            DeclKind::Property(prop) => DeclKind::Property(PropertyDecl {
                name: prop.name,
                modifiers: prop.modifiers,
                ty: prop.ty.deep_copy(),
                parameters: self.copy_children(&prop.parameters),
                getter: prop.getter.as_ref().map(AccessorTemplate::copy_unbound),
                setter: prop.setter.as_ref().map(AccessorTemplate::copy_unbound),
                attributes: copy_attributes(&prop.attributes),
                accessors: LazyCache::new(),
            }),
            DeclKind::Event(event) => DeclKind::Event(EventDecl {
                name: event.name,
                modifiers: event.modifiers,
                ty: event.ty.deep_copy(),
                adder: event.adder.as_ref().map(AccessorTemplate::copy_unbound),
                remover: event.remover.as_ref().map(AccessorTemplate::copy_unbound),
                attributes: copy_attributes(&event.attributes),
                accessors: LazyCache::new(),
            }),
            DeclKind::Parameter(param) => DeclKind::Parameter(ParameterDecl {
                name: param.name,
                index: param.index,
                ty: param.ty.deep_copy(),
                modifier: param.modifier,
                default_value: param.default_value.as_ref().map(|d| d.deep_copy()),
                attributes: copy_attributes(&param.attributes),
            }),
            DeclKind::GenericParameter(param) => DeclKind::GenericParameter(GenericParamDecl {
                name: param.name,
                index: param.index,
                variance: param.variance,
                special: param.special,
                constraints: param.constraints.iter().map(|c| c.deep_copy()).collect(),
            }),
        };
        self.alloc_copy(kind, decl.location, id)
    }

    fn copy_children(&self, children: &[DeclId]) -> Vec<DeclId> {
        children.iter().map(|&c| self.copy_node(c)).collect()
    }

    fn copy_type(&self, ty: &TypeDecl, raw_members: Vec<DeclId>) -> TypeDecl {
        TypeDecl {
            type_kind: ty.type_kind,
            name: ty.name,
            modifiers: ty.modifiers,
            generic_params: self.copy_children(&ty.generic_params),
            base_types: ty.base_types.iter().map(|b| b.deep_copy()).collect(),
            attributes: copy_attributes(&ty.attributes),
            contract: ty
                .contract
                .as_ref()
                .map(|c| Arc::new(self.copy_type_contract(c))),
            underlying_type: ty.underlying_type.as_ref().map(|u| u.deep_copy()),
            invoke: ty.invoke.as_ref().map(|invoke| DelegateSignature {
                return_type: invoke.return_type.deep_copy(),
                parameters: self.copy_children(&invoke.parameters),
            }),
            raw_members,
            members: LazyCache::new(),
        }
    }

    fn copy_type_contract(&self, contract: &TypeContract) -> TypeContract {
        TypeContract::from_parts(
            self.copy_children(&contract.contract_fields),
            self.copy_children(&contract.contract_methods),
            contract
                .invariants
                .iter()
                .map(|i| Arc::new(i.copy_unbound()))
                .collect(),
            contract.location,
        )
    }

    // =========================================================================
    // Member lists
    // =========================================================================

    /// The members of a namespace or type declaration, each bound to it.
    ///
    /// Computed once per declaration. Raw members bound elsewhere are
    /// replaced by copies; other declaration kinds have no members.
    pub fn members_of(&self, id: DeclId) -> Vec<DeclId> {
        let decl = self.node(id);
        let (raw, cache) = match &decl.kind {
            DeclKind::Namespace(ns) => (&ns.raw_members, &ns.members),
            DeclKind::Type(ty) => (&ty.raw_members, &ty.members),
            _ => return Vec::new(),
        };
        if !decl.is_bound() {
            return raw.clone();
        }
        cache
            .get_or_init(|| raw.iter().map(|&m| self.adopt(m, id)).collect())
            .clone()
    }

    fn adopt(&self, member: DeclId, parent: DeclId) -> DeclId {
        match self.container(member) {
            None => {
                self.bind_child(member, parent);
                member
            }
            Some(Container::Decl(owner)) if owner == parent => member,
            Some(_) => self.make_copy_for(member, parent),
        }
    }

    /// Getter and setter methods of a property, synthesized once.
    ///
    /// The accessors are bound to the type containing the property.
    pub fn property_accessors(&self, id: DeclId) -> AccessorPair {
        let decl = self.node(id);
        let DeclKind::Property(prop) = &decl.kind else {
            return AccessorPair::default();
        };
        let Some(Container::Decl(owner)) = decl.container() else {
            return AccessorPair::default();
        };
        *prop.accessors.get_or_init(|| {
            let base = prop.modifiers & INHERITED_ACCESSOR_MODIFIERS;
            let getter = prop.getter.as_ref().map(|template| {
                let spec = AccessorSpec {
                    name: self.accessor_name("get_", prop.name),
                    modifiers: accessor_modifiers(prop.modifiers, base, template),
                    parameters: self.copy_children(&prop.parameters),
                    return_type: prop.ty.deep_copy(),
                };
                self.synthesize_accessor(owner, id, template, spec)
            });
            let setter = prop.setter.as_ref().map(|template| {
                let mut parameters = self.copy_children(&prop.parameters);
                parameters.push(self.value_parameter(&prop.ty, parameters.len(), template.location));
                let spec = AccessorSpec {
                    name: self.accessor_name("set_", prop.name),
                    modifiers: accessor_modifiers(prop.modifiers, base, template),
                    parameters,
                    return_type: void_type(template.location),
                };
                self.synthesize_accessor(owner, id, template, spec)
            });
            AccessorPair {
                first: getter,
                second: setter,
            }
        })
    }

    /// Adder and remover methods of an event, synthesized once.
    ///
    /// Field-like events without explicit accessors get compiler-generated
    /// ones without a body.
    pub fn event_accessors(&self, id: DeclId) -> AccessorPair {
        let decl = self.node(id);
        let DeclKind::Event(event) = &decl.kind else {
            return AccessorPair::default();
        };
        let Some(Container::Decl(owner)) = decl.container() else {
            return AccessorPair::default();
        };
        *event.accessors.get_or_init(|| {
            let base = event.modifiers & INHERITED_ACCESSOR_MODIFIERS;
            let make = |prefix: &str, template: Option<&AccessorTemplate>| {
                let generated;
                let template = match template {
                    Some(template) => template,
                    None => {
                        generated = AccessorTemplate::new(
                            Modifiers::COMPILER_GENERATED,
                            None,
                            decl.location,
                        );
                        &generated
                    }
                };
                let spec = AccessorSpec {
                    name: self.accessor_name(prefix, event.name),
                    modifiers: accessor_modifiers(event.modifiers, base, template),
                    parameters: vec![self.value_parameter(&event.ty, 0, template.location)],
                    return_type: void_type(template.location),
                };
                self.synthesize_accessor(owner, id, template, spec)
            };
            let adder = make("add_", event.adder.as_ref());
            let remover = make("remove_", event.remover.as_ref());
            AccessorPair {
                first: Some(adder),
                second: Some(remover),
            }
        })
    }

    fn accessor_name(&self, prefix: &str, name: Atom) -> Atom {
        let name = self.names.resolve(name);
        self.names.intern(&format!("{prefix}{name}"))
    }

    fn value_parameter(
        &self,
        ty: &Expr,
        index: usize,
        location: SourceLocation,
    ) -> DeclId {
        let param = ParameterDecl {
            name: self.names.intern("value"),
            index: stored_position(index),
            ty: ty.deep_copy(),
            modifier: ParameterModifier::None,
            default_value: None,
            attributes: Vec::new(),
        };
        self.alloc(DeclKind::Parameter(param), location).into_id()
    }

    fn synthesize_accessor(
        &self,
        owner: DeclId,
        accessor_of: DeclId,
        template: &AccessorTemplate,
        spec: AccessorSpec,
    ) -> DeclId {
        let method = MethodDecl {
            name: spec.name,
            modifiers: spec.modifiers,
            generic_params: Vec::new(),
            parameters: spec.parameters,
            return_type: spec.return_type,
            body: template.body.as_ref().map(|b| b.deep_copy()),
            contract: None,
            attributes: Vec::new(),
            accessor_of: Some(accessor_of),
        };
        let unbound = self.alloc(DeclKind::Method(method), template.location);
        self.bind(unbound, owner, true)
    }

    /// The initializer of an enum member: the explicit one, or the implicit
    /// `previous + 1` (`0` for the first member).
    pub fn enum_member_initializer(&self, id: DeclId) -> Option<Expr> {
        let decl = self.node(id);
        let DeclKind::EnumMember(member) = &decl.kind else {
            return None;
        };
        if let Some(init) = &member.initializer {
            return Some(Arc::clone(init));
        }
        let owner = decl.container()?.as_decl()?;
        let init = member.implicit_initializer.get_or_init(|| {
            let location = decl.location;
            let previous = self
                .members_of(owner)
                .into_iter()
                .take_while(|&m| m != id)
                .filter_map(|m| {
                    let sibling = self.node(m);
                    match &sibling.kind {
                        DeclKind::EnumMember(prev) => Some(prev.name),
                        _ => None,
                    }
                })
                .last();
            let kind = match previous {
                None => ExprKind::Literal(Literal::Int(0)),
                Some(name) => ExprKind::Binary {
                    op: BinaryOp::Add,
                    left: Expression::new(
                        ExprKind::Name {
                            name,
                            type_args: Vec::new(),
                        },
                        location,
                    ),
                    right: Expression::new(ExprKind::Literal(Literal::Int(1)), location),
                },
            };
            let expr = Expression::new(kind, location);
            expr.set_containing_scope(id);
            expr
        });
        Some(Arc::clone(init))
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Containing declarations, innermost first.
    pub fn ancestors(&self, id: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        std::iter::successors(self.container(id).and_then(Container::as_decl), move |&d| {
            self.container(d).and_then(Container::as_decl)
        })
    }

    /// The root namespace declaration `id` belongs to (itself for roots).
    pub fn root_of(&self, id: DeclId) -> DeclId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// The compilation unit `id` is bound into, if the chain reaches a root.
    pub fn unit_of(&self, id: DeclId) -> Option<UnitId> {
        match self.container(self.root_of(id))? {
            Container::Unit(unit) => Some(unit),
            Container::Decl(_) => None,
        }
    }

    /// Nearest enclosing type declaration, `id` included.
    pub fn enclosing_type(&self, id: DeclId) -> Option<DeclId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&d| self.node(d).as_type().is_some())
    }

    /// Nearest enclosing namespace declaration, `id` included.
    pub fn enclosing_namespace(&self, id: DeclId) -> Option<DeclId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&d| self.node(d).as_namespace().is_some())
    }

    // =========================================================================
    // Incremental updates
    // =========================================================================

    /// A new version of the root of `id`'s tree in which the namespace or
    /// type declaration `id` has the member list `members`.
    ///
    /// Every declaration on the path from `id` to the root is rebuilt; all
    /// other members are shared with the old tree and get copied when the
    /// new tree adopts them. `edit` remaps the locations of rebuilt nodes.
    /// Returns `None` when `id` has no member list.
    pub fn update_members(
        &self,
        id: DeclId,
        members: Vec<MemberSlot>,
        edit: Option<&DocumentEdit>,
    ) -> Option<Unbound> {
        let decl = self.node(id);
        let raw_members: Vec<DeclId> = members
            .into_iter()
            .map(|slot| match slot {
                MemberSlot::Existing(m) => m,
                MemberSlot::New(unbound) => unbound.into_id(),
            })
            .collect();
        let kind = match &decl.kind {
            DeclKind::Namespace(ns) => DeclKind::Namespace(NamespaceDecl::from_ids(
                ns.name,
                raw_members,
                copy_attributes(&ns.attributes),
            )),
            DeclKind::Type(ty) => DeclKind::Type(self.copy_type(ty, raw_members)),
            _ => return None,
        };
        let location = edit.map_or(decl.location, |e| e.remap(decl.location));
        let replacement = Unbound::new(self.alloc_copy(kind, location, id));
        debug!(?id, "rebuilt declaration with updated members");

        match decl.container() {
            Some(Container::Decl(parent)) => {
                let mut replacement = Some(replacement);
                let mut slots = Vec::new();
                for sibling in self.members_of(parent) {
                    match replacement.take() {
                        Some(new) if sibling == id => slots.push(MemberSlot::New(new)),
                        pending => {
                            replacement = pending;
                            slots.push(MemberSlot::Existing(sibling));
                        }
                    }
                }
                // `id` was not listed by its parent; keep the new node anyway.
                if let Some(new) = replacement {
                    slots.push(MemberSlot::New(new));
                }
                self.update_members(parent, slots, edit)
            }
            Some(Container::Unit(_)) | None => Some(replacement),
        }
    }
}

impl std::fmt::Debug for DeclArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclArena")
            .field("len", &self.len())
            .finish()
    }
}

struct AccessorSpec {
    name: Atom,
    modifiers: Modifiers,
    parameters: Vec<DeclId>,
    return_type: Expr,
}

/// The accessor's own visibility if it has one, otherwise the owner's.
fn accessor_modifiers(owner: Modifiers, inherited: Modifiers, template: &AccessorTemplate) -> Modifiers {
    let own_visibility = template.modifiers & Modifiers::VISIBILITY;
    let visibility = if own_visibility.is_empty() {
        owner & Modifiers::VISIBILITY
    } else {
        own_visibility
    };
    visibility
        | inherited
        | (template.modifiers & Modifiers::COMPILER_GENERATED)
        | Modifiers::SPECIAL_NAME
}

/// Stored position of the `index`th parameter. Positions past the `u16`
/// range are clamped to the last one.
pub(crate) fn stored_position(index: usize) -> u16 {
    limits::parameter_index(index).unwrap_or_else(|| {
        warn!(index, limit = limits::MAX_PARAMETER_COUNT, "parameter position clamped");
        u16::MAX
    })
}

fn void_type(location: SourceLocation) -> Expr {
    Expression::new(ExprKind::Builtin(BuiltinType::Void), location)
}

fn copy_attributes(attributes: &[SourceAttribute]) -> Vec<SourceAttribute> {
    attributes.iter().map(SourceAttribute::copy_unbound).collect()
}

#[cfg(test)]
#[path = "../tests/arena_tests.rs"]
mod tests;
