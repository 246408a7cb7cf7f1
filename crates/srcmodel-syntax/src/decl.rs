//! Declaration node kinds.
//!
//! A declaration is one source occurrence of a program element. Nodes are
//! created unbound (phase a) through the constructors here, which take their
//! children as [`Unbound`] tokens, and are bound exactly once by the arena
//! (phase b).

use crate::attributes::SourceAttribute;
use crate::contracts::{MethodContract, TypeContract, TypeInvariant};
use crate::expr::Expr;
use crate::flags::{GenericConstraints, Modifiers, ParameterModifier, TypeKind, Variance};
use crate::stmt::Block;
use once_cell::sync::OnceCell;
use srcmodel_common::{Atom, DeclId, LazyCache, SourceLocation, UnitId};
use std::sync::Arc;

/// A declaration that has been allocated but not bound to a container.
///
/// Scope-dependent operations take a [`DeclId`], which is only handed out
/// by binding. The token is consumed by the parent constructor that owns
/// the child, or by `DeclArena::bind`.
#[must_use = "an unbound declaration must be attached to a parent or bound"]
#[derive(Debug, PartialEq, Eq)]
pub struct Unbound(DeclId);

impl Unbound {
    pub(crate) fn new(id: DeclId) -> Self {
        Unbound(id)
    }

    pub(crate) fn into_id(self) -> DeclId {
        self.0
    }
}

pub(crate) fn into_ids(children: Vec<Unbound>) -> Vec<DeclId> {
    children.into_iter().map(Unbound::into_id).collect()
}

/// Where a declaration is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Container {
    /// A root namespace declaration of a compilation unit.
    Unit(UnitId),
    Decl(DeclId),
}

impl Container {
    pub fn as_decl(self) -> Option<DeclId> {
        match self {
            Container::Decl(id) => Some(id),
            Container::Unit(_) => None,
        }
    }
}

pub struct Declaration {
    pub kind: DeclKind,
    pub location: SourceLocation,
    container: OnceCell<Container>,
    template: Option<DeclId>,
    has_errors: LazyCache<bool>,
}

impl Declaration {
    pub(crate) fn new(kind: DeclKind, location: SourceLocation, template: Option<DeclId>) -> Self {
        Declaration {
            kind,
            location,
            container: OnceCell::new(),
            template,
            has_errors: LazyCache::new(),
        }
    }

    #[inline]
    pub fn container(&self) -> Option<Container> {
        self.container.get().copied()
    }

    pub(crate) fn container_cell(&self) -> &OnceCell<Container> {
        &self.container
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.container.get().is_some()
    }

    /// The declaration this node was copied from, if it is a copy.
    #[inline]
    pub fn template(&self) -> Option<DeclId> {
        self.template
    }

    /// Error cache, filled by the binder.
    pub fn errors_cache(&self) -> &LazyCache<bool> {
        &self.has_errors
    }

    pub fn name(&self) -> Option<Atom> {
        match &self.kind {
            DeclKind::Namespace(ns) => ns.name,
            DeclKind::Alias(alias) => Some(alias.name),
            DeclKind::Import(_) => None,
            DeclKind::Type(ty) => Some(ty.name),
            DeclKind::Field(field) => Some(field.name),
            DeclKind::EnumMember(member) => Some(member.name),
            DeclKind::Method(method) => Some(method.name),
            DeclKind::Property(prop) => Some(prop.name),
            DeclKind::Event(event) => Some(event.name),
            DeclKind::Parameter(param) => Some(param.name),
            DeclKind::GenericParameter(param) => Some(param.name),
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match &self.kind {
            DeclKind::Type(ty) => ty.modifiers,
            DeclKind::Field(field) => field.modifiers,
            DeclKind::EnumMember(_) => Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::CONST,
            DeclKind::Method(method) => method.modifiers,
            DeclKind::Property(prop) => prop.modifiers,
            DeclKind::Event(event) => event.modifiers,
            _ => Modifiers::empty(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            DeclKind::Namespace(_) => "namespace",
            DeclKind::Alias(_) => "alias",
            DeclKind::Import(_) => "import",
            DeclKind::Type(_) => "type",
            DeclKind::Field(_) => "field",
            DeclKind::EnumMember(_) => "enum member",
            DeclKind::Method(_) => "method",
            DeclKind::Property(_) => "property",
            DeclKind::Event(_) => "event",
            DeclKind::Parameter(_) => "parameter",
            DeclKind::GenericParameter(_) => "generic parameter",
        }
    }

    pub fn as_namespace(&self) -> Option<&NamespaceDecl> {
        match &self.kind {
            DeclKind::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeDecl> {
        match &self.kind {
            DeclKind::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodDecl> {
        match &self.kind {
            DeclKind::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn as_parameter(&self) -> Option<&ParameterDecl> {
        match &self.kind {
            DeclKind::Parameter(param) => Some(param),
            _ => None,
        }
    }

    pub fn as_generic_parameter(&self) -> Option<&GenericParamDecl> {
        match &self.kind {
            DeclKind::GenericParameter(param) => Some(param),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Declaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Declaration")
            .field("kind", &self.kind_name())
            .field("name", &self.name())
            .field("container", &self.container.get())
            .field("template", &self.template)
            .finish()
    }
}

#[derive(Debug)]
pub enum DeclKind {
    Namespace(NamespaceDecl),
    Alias(AliasDecl),
    Import(ImportDecl),
    Type(TypeDecl),
    Field(FieldDecl),
    EnumMember(EnumMemberDecl),
    Method(MethodDecl),
    Property(PropertyDecl),
    Event(EventDecl),
    Parameter(ParameterDecl),
    GenericParameter(GenericParamDecl),
}

/// A root (`name == None`) or nested namespace declaration.
#[derive(Debug)]
pub struct NamespaceDecl {
    pub name: Option<Atom>,
    pub attributes: Vec<SourceAttribute>,
    pub(crate) raw_members: Vec<DeclId>,
    pub(crate) members: LazyCache<Vec<DeclId>>,
}

impl NamespaceDecl {
    pub fn root(members: Vec<Unbound>, attributes: Vec<SourceAttribute>) -> Self {
        Self::from_ids(None, into_ids(members), attributes)
    }

    pub fn nested(name: Atom, members: Vec<Unbound>, attributes: Vec<SourceAttribute>) -> Self {
        Self::from_ids(Some(name), into_ids(members), attributes)
    }

    pub(crate) fn from_ids(
        name: Option<Atom>,
        raw_members: Vec<DeclId>,
        attributes: Vec<SourceAttribute>,
    ) -> Self {
        NamespaceDecl {
            name,
            attributes,
            raw_members,
            members: LazyCache::new(),
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.name.is_none()
    }
}

/// `using Name = Target;`
#[derive(Debug)]
pub struct AliasDecl {
    pub name: Atom,
    pub target: Expr,
}

/// `using Target;`
#[derive(Debug)]
pub struct ImportDecl {
    pub target: Expr,
}

/// The invoke signature of a delegate declaration.
#[derive(Debug)]
pub struct DelegateSignature {
    pub return_type: Expr,
    pub parameters: Vec<DeclId>,
}

impl DelegateSignature {
    pub fn new(return_type: Expr, parameters: Vec<Unbound>) -> Self {
        DelegateSignature {
            return_type,
            parameters: into_ids(parameters),
        }
    }
}

#[derive(Debug)]
pub struct TypeDecl {
    pub type_kind: TypeKind,
    pub name: Atom,
    pub modifiers: Modifiers,
    pub generic_params: Vec<DeclId>,
    pub base_types: Vec<Expr>,
    pub attributes: Vec<SourceAttribute>,
    pub contract: Option<Arc<TypeContract>>,
    /// Explicit underlying type of an enum.
    pub underlying_type: Option<Expr>,
    pub invoke: Option<DelegateSignature>,
    pub(crate) raw_members: Vec<DeclId>,
    pub(crate) members: LazyCache<Vec<DeclId>>,
}

/// Everything a type declaration holds besides its kind and name.
#[derive(Debug, Default)]
pub struct TypeDeclParts {
    pub modifiers: Modifiers,
    pub generic_params: Vec<Unbound>,
    pub base_types: Vec<Expr>,
    pub members: Vec<Unbound>,
    pub attributes: Vec<SourceAttribute>,
    pub contract: Option<TypeContractParts>,
    pub underlying_type: Option<Expr>,
    pub invoke: Option<DelegateSignature>,
}

#[derive(Debug, Default)]
pub struct TypeContractParts {
    pub contract_fields: Vec<Unbound>,
    pub contract_methods: Vec<Unbound>,
    pub invariants: Vec<TypeInvariant>,
    pub location: SourceLocation,
}

impl TypeDecl {
    pub fn new(type_kind: TypeKind, name: Atom, parts: TypeDeclParts) -> Self {
        let contract = parts.contract.map(|c| {
            Arc::new(TypeContract::from_parts(
                into_ids(c.contract_fields),
                into_ids(c.contract_methods),
                c.invariants.into_iter().map(Arc::new).collect(),
                c.location,
            ))
        });
        TypeDecl {
            type_kind,
            name,
            modifiers: parts.modifiers,
            generic_params: into_ids(parts.generic_params),
            base_types: parts.base_types,
            attributes: parts.attributes,
            contract,
            underlying_type: parts.underlying_type,
            invoke: parts.invoke,
            raw_members: into_ids(parts.members),
            members: LazyCache::new(),
        }
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.generic_params.len()
    }

    pub fn is_partial(&self) -> bool {
        self.modifiers.contains(Modifiers::PARTIAL)
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }
}

#[derive(Debug)]
pub struct FieldDecl {
    pub name: Atom,
    pub modifiers: Modifiers,
    pub ty: Expr,
    pub initializer: Option<Expr>,
    pub attributes: Vec<SourceAttribute>,
}

impl FieldDecl {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub fn is_const(&self) -> bool {
        self.modifiers.contains(Modifiers::CONST)
    }
}

#[derive(Debug)]
pub struct EnumMemberDecl {
    pub name: Atom,
    pub initializer: Option<Expr>,
    pub attributes: Vec<SourceAttribute>,
    pub(crate) implicit_initializer: LazyCache<Expr>,
}

impl EnumMemberDecl {
    pub fn new(name: Atom, initializer: Option<Expr>, attributes: Vec<SourceAttribute>) -> Self {
        EnumMemberDecl {
            name,
            initializer,
            attributes,
            implicit_initializer: LazyCache::new(),
        }
    }
}

#[derive(Debug)]
pub struct MethodDecl {
    pub name: Atom,
    pub modifiers: Modifiers,
    pub generic_params: Vec<DeclId>,
    pub parameters: Vec<DeclId>,
    pub return_type: Expr,
    pub body: Option<Block>,
    pub contract: Option<Arc<MethodContract>>,
    pub attributes: Vec<SourceAttribute>,
    /// The property or event this accessor was synthesized for.
    pub accessor_of: Option<DeclId>,
}

#[derive(Debug)]
pub struct MethodDeclParts {
    pub modifiers: Modifiers,
    pub generic_params: Vec<Unbound>,
    pub parameters: Vec<Unbound>,
    pub return_type: Expr,
    pub body: Option<Block>,
    pub contract: Option<MethodContract>,
    pub attributes: Vec<SourceAttribute>,
}

impl MethodDecl {
    pub fn new(name: Atom, parts: MethodDeclParts) -> Self {
        MethodDecl {
            name,
            modifiers: parts.modifiers,
            generic_params: into_ids(parts.generic_params),
            parameters: into_ids(parts.parameters),
            return_type: parts.return_type,
            body: parts.body,
            contract: parts.contract.map(Arc::new),
            attributes: parts.attributes,
            accessor_of: None,
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub fn is_extension(&self) -> bool {
        self.modifiers.contains(Modifiers::EXTENSION)
    }
}

/// Accessor as written inside a property or event; the accessor method is
/// synthesized from it.
#[derive(Debug)]
pub struct AccessorTemplate {
    pub modifiers: Modifiers,
    pub body: Option<Block>,
    pub location: SourceLocation,
}

impl AccessorTemplate {
    pub fn new(modifiers: Modifiers, body: Option<Block>, location: SourceLocation) -> Self {
        AccessorTemplate {
            modifiers,
            body,
            location,
        }
    }

    pub(crate) fn copy_unbound(&self) -> Self {
        AccessorTemplate {
            modifiers: self.modifiers,
            body: self.body.as_ref().map(Block::deep_copy),
            location: self.location,
        }
    }
}

/// Getter/setter or adder/remover methods synthesized for a property or
/// event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessorPair {
    pub first: Option<DeclId>,
    pub second: Option<DeclId>,
}

impl AccessorPair {
    pub fn iter(self) -> impl Iterator<Item = DeclId> {
        self.first.into_iter().chain(self.second)
    }
}

#[derive(Debug)]
pub struct PropertyDecl {
    pub name: Atom,
    pub modifiers: Modifiers,
    pub ty: Expr,
    pub parameters: Vec<DeclId>,
    pub getter: Option<AccessorTemplate>,
    pub setter: Option<AccessorTemplate>,
    pub attributes: Vec<SourceAttribute>,
    pub(crate) accessors: LazyCache<AccessorPair>,
}

impl PropertyDecl {
    pub fn new(
        name: Atom,
        modifiers: Modifiers,
        ty: Expr,
        parameters: Vec<Unbound>,
        getter: Option<AccessorTemplate>,
        setter: Option<AccessorTemplate>,
        attributes: Vec<SourceAttribute>,
    ) -> Self {
        PropertyDecl {
            name,
            modifiers,
            ty,
            parameters: into_ids(parameters),
            getter,
            setter,
            attributes,
            accessors: LazyCache::new(),
        }
    }
}

#[derive(Debug)]
pub struct EventDecl {
    pub name: Atom,
    pub modifiers: Modifiers,
    pub ty: Expr,
    pub adder: Option<AccessorTemplate>,
    pub remover: Option<AccessorTemplate>,
    pub attributes: Vec<SourceAttribute>,
    pub(crate) accessors: LazyCache<AccessorPair>,
}

impl EventDecl {
    pub fn new(
        name: Atom,
        modifiers: Modifiers,
        ty: Expr,
        adder: Option<AccessorTemplate>,
        remover: Option<AccessorTemplate>,
        attributes: Vec<SourceAttribute>,
    ) -> Self {
        EventDecl {
            name,
            modifiers,
            ty,
            adder,
            remover,
            attributes,
            accessors: LazyCache::new(),
        }
    }
}

#[derive(Debug)]
pub struct ParameterDecl {
    pub name: Atom,
    pub index: u16,
    pub ty: Expr,
    pub modifier: ParameterModifier,
    pub default_value: Option<Expr>,
    pub attributes: Vec<SourceAttribute>,
}

#[derive(Debug)]
pub struct GenericParamDecl {
    pub name: Atom,
    pub index: u16,
    pub variance: Variance,
    pub special: GenericConstraints,
    pub constraints: Vec<Expr>,
}
