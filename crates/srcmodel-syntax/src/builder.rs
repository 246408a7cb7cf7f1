//! Fluent construction of unbound declaration trees.
//!
//! Front ends and tests build trees through [`TreeBuilder`]; every method
//! allocates in phase (a) and hands back [`Unbound`] tokens for the parent
//! constructor to consume.

use crate::arena::{DeclArena, stored_position};
use crate::attributes::SourceAttribute;
use crate::contracts::{MethodContract, TypeInvariant};
use crate::decl::{
    AccessorTemplate, AliasDecl, DeclKind, DelegateSignature, EnumMemberDecl, EventDecl, FieldDecl,
    GenericParamDecl, ImportDecl, MethodDecl, MethodDeclParts, NamespaceDecl, ParameterDecl,
    PropertyDecl, TypeContractParts, TypeDecl, TypeDeclParts, Unbound,
};
use crate::expr::{Expr, ExprKind, Expression, Literal};
use crate::flags::{
    AttributeTarget, GenericConstraints, Modifiers, ParameterModifier, TypeKind, Variance,
};
use crate::stmt::Block;
use srcmodel_common::{Atom, BuiltinType, SourceLocation};

pub struct TreeBuilder<'a> {
    arena: &'a DeclArena,
    location: SourceLocation,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(arena: &'a DeclArena) -> Self {
        TreeBuilder {
            arena,
            location: SourceLocation::SYNTHETIC,
        }
    }

    /// Location stamped on everything built afterwards.
    pub fn at(&mut self, location: SourceLocation) -> &mut Self {
        self.location = location;
        self
    }

    #[inline]
    pub fn arena(&self) -> &'a DeclArena {
        self.arena
    }

    pub fn atom(&self, name: &str) -> Atom {
        self.arena.names().intern(name)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// A simple or dotted name (`A.B.C`).
    pub fn name(&self, path: &str) -> Expr {
        self.generic_name(path, Vec::new())
    }

    /// A name whose last segment carries type arguments.
    pub fn generic_name(&self, path: &str, type_args: Vec<Expr>) -> Expr {
        let mut segments = path.split('.').peekable();
        let mut type_args = Some(type_args);
        let mut qualifier: Option<Expr> = None;
        while let Some(segment) = segments.next() {
            let name = self.atom(segment);
            let args = if segments.peek().is_none() {
                type_args.take().unwrap_or_default()
            } else {
                Vec::new()
            };
            let kind = match qualifier.take() {
                None => ExprKind::Name {
                    name,
                    type_args: args,
                },
                Some(q) => ExprKind::Qualified {
                    qualifier: q,
                    name,
                    type_args: args,
                },
            };
            qualifier = Some(Expression::new(kind, self.location));
        }
        qualifier.unwrap_or_else(|| Expression::new(ExprKind::Dummy, self.location))
    }

    /// `alias::Name`
    pub fn alias_qualified(&self, alias: &str, name: &str) -> Expr {
        self.expr(ExprKind::AliasQualified {
            alias: self.atom(alias),
            name: self.atom(name),
        })
    }

    pub fn builtin(&self, ty: BuiltinType) -> Expr {
        self.expr(ExprKind::Builtin(ty))
    }

    pub fn int(&self, value: i64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn bool(&self, value: bool) -> Expr {
        self.expr(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn expr(&self, kind: ExprKind) -> Expr {
        Expression::new(kind, self.location)
    }

    pub fn attribute(&self, target: AttributeTarget, ty: &str, args: Vec<Expr>) -> SourceAttribute {
        SourceAttribute::new(target, self.name(ty), args, self.location)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn alloc(&self, kind: DeclKind) -> Unbound {
        self.arena.alloc(kind, self.location)
    }

    pub fn root(&self, members: Vec<Unbound>) -> Unbound {
        self.alloc(DeclKind::Namespace(NamespaceDecl::root(members, Vec::new())))
    }

    pub fn root_with_attributes(
        &self,
        members: Vec<Unbound>,
        attributes: Vec<SourceAttribute>,
    ) -> Unbound {
        self.alloc(DeclKind::Namespace(NamespaceDecl::root(members, attributes)))
    }

    /// A namespace declaration. A dotted name nests one declaration per
    /// segment, the members going into the innermost.
    pub fn namespace(&self, path: &str, members: Vec<Unbound>) -> Unbound {
        let mut segments: Vec<&str> = path.split('.').collect();
        let innermost = segments.pop().unwrap_or(path);
        let mut node = self.alloc(DeclKind::Namespace(NamespaceDecl::nested(
            self.atom(innermost),
            members,
            Vec::new(),
        )));
        for segment in segments.into_iter().rev() {
            node = self.alloc(DeclKind::Namespace(NamespaceDecl::nested(
                self.atom(segment),
                vec![node],
                Vec::new(),
            )));
        }
        node
    }

    /// `using name = target;`
    pub fn alias(&self, name: &str, target: Expr) -> Unbound {
        self.alloc(DeclKind::Alias(AliasDecl {
            name: self.atom(name),
            target,
        }))
    }

    /// `using target;`
    pub fn import(&self, target: &str) -> Unbound {
        self.alloc(DeclKind::Import(ImportDecl {
            target: self.name(target),
        }))
    }

    pub fn class(&self, name: &str) -> TypeBuilder<'_, 'a> {
        self.type_decl(TypeKind::Class, name)
    }

    pub fn struct_(&self, name: &str) -> TypeBuilder<'_, 'a> {
        self.type_decl(TypeKind::Struct, name)
    }

    pub fn interface(&self, name: &str) -> TypeBuilder<'_, 'a> {
        self.type_decl(TypeKind::Interface, name)
    }

    pub fn enum_(&self, name: &str) -> TypeBuilder<'_, 'a> {
        self.type_decl(TypeKind::Enum, name)
    }

    /// A delegate with the given invoke signature.
    pub fn delegate(&self, name: &str, return_type: Expr, parameters: Vec<Unbound>) -> TypeBuilder<'_, 'a> {
        let mut builder = self.type_decl(TypeKind::Delegate, name);
        builder.parts.invoke = Some(DelegateSignature::new(return_type, parameters));
        builder
    }

    pub fn type_decl(&self, kind: TypeKind, name: &str) -> TypeBuilder<'_, 'a> {
        TypeBuilder {
            tree: self,
            kind,
            name: self.atom(name),
            parts: TypeDeclParts::default(),
        }
    }

    pub fn field(&self, name: &str, modifiers: Modifiers, ty: Expr) -> Unbound {
        self.field_with_initializer(name, modifiers, ty, None)
    }

    pub fn field_with_initializer(
        &self,
        name: &str,
        modifiers: Modifiers,
        ty: Expr,
        initializer: Option<Expr>,
    ) -> Unbound {
        self.alloc(DeclKind::Field(FieldDecl {
            name: self.atom(name),
            modifiers,
            ty,
            initializer,
            attributes: Vec::new(),
        }))
    }

    pub fn enum_member(&self, name: &str, initializer: Option<Expr>) -> Unbound {
        self.alloc(DeclKind::EnumMember(EnumMemberDecl::new(
            self.atom(name),
            initializer,
            Vec::new(),
        )))
    }

    pub fn method(&self, name: &str) -> MethodBuilder<'_, 'a> {
        MethodBuilder {
            tree: self,
            name: self.atom(name),
            parts: MethodDeclParts {
                modifiers: Modifiers::empty(),
                generic_params: Vec::new(),
                parameters: Vec::new(),
                return_type: self.builtin(BuiltinType::Void),
                body: None,
                contract: None,
                attributes: Vec::new(),
            },
        }
    }

    /// A property; `getter`/`setter` say which accessors are written.
    pub fn property(
        &self,
        name: &str,
        modifiers: Modifiers,
        ty: Expr,
        getter: bool,
        setter: bool,
    ) -> Unbound {
        let accessor = |present: bool| {
            present.then(|| AccessorTemplate::new(Modifiers::empty(), None, self.location))
        };
        self.alloc(DeclKind::Property(PropertyDecl::new(
            self.atom(name),
            modifiers,
            ty,
            Vec::new(),
            accessor(getter),
            accessor(setter),
            Vec::new(),
        )))
    }

    /// A field-like event.
    pub fn event(&self, name: &str, modifiers: Modifiers, ty: Expr) -> Unbound {
        self.alloc(DeclKind::Event(EventDecl::new(
            self.atom(name),
            modifiers,
            ty,
            None,
            None,
            Vec::new(),
        )))
    }

    pub fn parameter(&self, name: &str, index: u16, ty: Expr) -> Unbound {
        self.parameter_with(name, index, ty, ParameterModifier::None)
    }

    pub fn parameter_with(
        &self,
        name: &str,
        index: u16,
        ty: Expr,
        modifier: ParameterModifier,
    ) -> Unbound {
        self.alloc(DeclKind::Parameter(ParameterDecl {
            name: self.atom(name),
            index,
            ty,
            modifier,
            default_value: None,
            attributes: Vec::new(),
        }))
    }

    pub fn generic_param(
        &self,
        name: &str,
        index: u16,
        special: GenericConstraints,
        constraints: Vec<Expr>,
    ) -> Unbound {
        self.generic_param_with_variance(name, index, Variance::Invariant, special, constraints)
    }

    pub fn generic_param_with_variance(
        &self,
        name: &str,
        index: u16,
        variance: Variance,
        special: GenericConstraints,
        constraints: Vec<Expr>,
    ) -> Unbound {
        self.alloc(DeclKind::GenericParameter(GenericParamDecl {
            name: self.atom(name),
            index,
            variance,
            special,
            constraints,
        }))
    }
}

pub struct TypeBuilder<'t, 'a> {
    tree: &'t TreeBuilder<'a>,
    kind: TypeKind,
    name: Atom,
    parts: TypeDeclParts,
}

impl TypeBuilder<'_, '_> {
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.parts.modifiers |= modifiers;
        self
    }

    /// An unconstrained generic parameter.
    pub fn generic(mut self, name: &str) -> Self {
        let index = stored_position(self.parts.generic_params.len());
        let param = self
            .tree
            .generic_param(name, index, GenericConstraints::empty(), Vec::new());
        self.parts.generic_params.push(param);
        self
    }

    pub fn generic_param(mut self, param: Unbound) -> Self {
        self.parts.generic_params.push(param);
        self
    }

    pub fn base(mut self, base: Expr) -> Self {
        self.parts.base_types.push(base);
        self
    }

    pub fn member(mut self, member: Unbound) -> Self {
        self.parts.members.push(member);
        self
    }

    pub fn members(mut self, members: impl IntoIterator<Item = Unbound>) -> Self {
        self.parts.members.extend(members);
        self
    }

    pub fn attribute(mut self, attribute: SourceAttribute) -> Self {
        self.parts.attributes.push(attribute);
        self
    }

    pub fn underlying(mut self, ty: Expr) -> Self {
        self.parts.underlying_type = Some(ty);
        self
    }

    pub fn invariant(mut self, condition: Expr) -> Self {
        let location = self.tree.location;
        let contract = self.parts.contract.get_or_insert_with(|| TypeContractParts {
            location,
            ..TypeContractParts::default()
        });
        contract
            .invariants
            .push(TypeInvariant::new(condition, None, false, location));
        self
    }

    pub fn contract_field(mut self, field: Unbound) -> Self {
        let location = self.tree.location;
        self.parts
            .contract
            .get_or_insert_with(|| TypeContractParts {
                location,
                ..TypeContractParts::default()
            })
            .contract_fields
            .push(field);
        self
    }

    pub fn build(self) -> Unbound {
        self.tree
            .alloc(DeclKind::Type(TypeDecl::new(self.kind, self.name, self.parts)))
    }
}

pub struct MethodBuilder<'t, 'a> {
    tree: &'t TreeBuilder<'a>,
    name: Atom,
    parts: MethodDeclParts,
}

impl MethodBuilder<'_, '_> {
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.parts.modifiers |= modifiers;
        self
    }

    pub fn returns(mut self, ty: Expr) -> Self {
        self.parts.return_type = ty;
        self
    }

    pub fn param(mut self, name: &str, ty: Expr) -> Self {
        let index = stored_position(self.parts.parameters.len());
        let param = self.tree.parameter(name, index, ty);
        self.parts.parameters.push(param);
        self
    }

    pub fn param_with(mut self, name: &str, ty: Expr, modifier: ParameterModifier) -> Self {
        let index = stored_position(self.parts.parameters.len());
        let param = self.tree.parameter_with(name, index, ty, modifier);
        self.parts.parameters.push(param);
        self
    }

    pub fn generic_param(mut self, param: Unbound) -> Self {
        self.parts.generic_params.push(param);
        self
    }

    pub fn body(mut self, body: Block) -> Self {
        self.parts.body = Some(body);
        self
    }

    pub fn contract(mut self, contract: MethodContract) -> Self {
        self.parts.contract = Some(contract);
        self
    }

    pub fn attribute(mut self, attribute: SourceAttribute) -> Self {
        self.parts.attributes.push(attribute);
        self
    }

    pub fn build(self) -> Unbound {
        self.tree
            .alloc(DeclKind::Method(MethodDecl::new(self.name, self.parts)))
    }
}

#[cfg(test)]
#[path = "../tests/builder_tests.rs"]
mod tests;
