//! Name resolution for expressions.
//!
//! Resolution goes through the [`TypeExpressionResolver`] collaborator; the
//! result of every expression is cached on the expression under the build
//! lock. [`ScopeChainResolver`] is the default: it walks the declaration
//! chain outward from the expression's scope.
//!
//! Lookup order at each step of the walk:
//!
//! - method: parameters (value names only), then generic parameters
//! - type: generic parameters, nested types, members (value names only),
//!   then the same through the base class chain when the walk entered the
//!   type from one of its members
//! - namespace declaration: namespace members, aliases, imported types
//!   (nothing while the declaration is busy resolving its own aliases)
//!
//! and finally the keyword spellings of builtin types.

use crate::compilation::{Compilation, Lookup};
use crate::types::{NamedTypeDefinition, TypeMember};
use srcmodel_common::limits::MAX_BASE_CLASS_CHAIN;
use srcmodel_common::{Atom, BuiltinType, DeclId, Resolved, TypeRef};
use srcmodel_syntax::{
    BinaryOp, Container, DeclKind, Expr, ExprKind, Expression, Literal, MethodDecl, MethodRef,
    UnaryOp,
};
use std::sync::Arc;
use tracing::debug;

/// What kind of name an expression denotes.
///
/// A type name never sees parameters or field-like members; a value name
/// sees everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NameRole {
    Type,
    Value,
}

/// Resolves expressions to namespaces, types, members or parameters.
pub trait TypeExpressionResolver: Send + Sync {
    fn resolve(&self, comp: &Compilation, expr: &Expression, role: NameRole) -> Lookup<Resolved>;

    /// Static type of a value expression.
    fn type_of(&self, comp: &Compilation, expr: &Expression) -> Lookup<TypeRef>;
}

/// The default resolver: lexical scope chain lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeChainResolver;

impl TypeExpressionResolver for ScopeChainResolver {
    fn resolve(&self, comp: &Compilation, expr: &Expression, role: NameRole) -> Lookup<Resolved> {
        match &expr.kind {
            ExprKind::Name { name, type_args } => {
                let Some(scope) = expr.scope() else {
                    return Ok(Resolved::Nothing);
                };
                let head = comp.try_lookup_name(scope, *name, type_args.len(), role)?;
                comp.try_apply_type_args(head, type_args)
            }
            ExprKind::Qualified {
                qualifier,
                name,
                type_args,
            } => {
                let qualifier = comp.try_resolve_in(qualifier, role)?;
                let head = comp.try_lookup_member(qualifier, *name, type_args.len(), role)?;
                comp.try_apply_type_args(head, type_args)
            }
            ExprKind::AliasQualified { alias, name } => match expr.scope() {
                Some(scope) => comp.try_resolve_alias_qualified(scope, *alias, *name),
                None => Ok(Resolved::Nothing),
            },
            ExprKind::Builtin(builtin) => Ok(Resolved::Type(TypeRef::Builtin(*builtin))),
            ExprKind::Call { callee, .. } => comp.try_resolve_in(callee, NameRole::Value),
            ExprKind::ResolvedCall {
                method: MethodRef::Member(member),
                ..
            } => Ok(Resolved::Member(*member)),
            _ => Ok(Resolved::Nothing),
        }
    }

    fn type_of(&self, comp: &Compilation, expr: &Expression) -> Lookup<TypeRef> {
        let ty = match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Int(value) if i32::try_from(*value).is_ok() => TypeRef::INT32,
                Literal::Int(_) => TypeRef::Builtin(BuiltinType::Int64),
                Literal::Bool(_) => TypeRef::BOOLEAN,
                Literal::Str(_) => TypeRef::Builtin(BuiltinType::String),
                Literal::Null => TypeRef::OBJECT,
            },
            ExprKind::Name { .. } | ExprKind::Qualified { .. } | ExprKind::AliasQualified { .. } => {
                match comp.try_resolve_in(expr, NameRole::Value)? {
                    Resolved::Member(member) => match comp.member(member) {
                        Some(member) => member.try_value_type(comp)?,
                        None => TypeRef::Error,
                    },
                    Resolved::Parameter(param) => match comp.arena().node(param).as_parameter() {
                        Some(param) => comp.try_resolve_type(&param.ty)?,
                        None => TypeRef::Error,
                    },
                    Resolved::Type(ty) => ty,
                    Resolved::Namespace(_) | Resolved::Nothing => TypeRef::Error,
                }
            }
            ExprKind::Builtin(builtin) => TypeRef::Builtin(*builtin),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => TypeRef::BOOLEAN,
                _ => comp.try_type_of(operand)?,
            },
            ExprKind::Binary { op, left, .. } => {
                if op.is_comparison() || op.is_logical() {
                    TypeRef::BOOLEAN
                } else {
                    comp.try_type_of(left)?
                }
            }
            ExprKind::Assign { target, .. } => comp.try_type_of(target)?,
            ExprKind::Call { callee, .. } => match comp.try_resolve_in(callee, NameRole::Value)? {
                Resolved::Member(member) => match comp.member(member) {
                    Some(member) => member.try_value_type(comp)?,
                    None => TypeRef::Error,
                },
                _ => TypeRef::Error,
            },
            ExprKind::ResolvedCall { method, .. } => match method {
                MethodRef::Member(member) => match comp.member(*member) {
                    Some(member) => member.try_value_type(comp)?,
                    None => TypeRef::Error,
                },
                MethodRef::BuiltinConstructor(_) => TypeRef::VOID,
            },
            ExprKind::New { ty, .. } => comp.try_resolve_type(ty)?,
            ExprKind::This => match enclosing_type_def(comp, expr)? {
                Some(def) => def.instance_type(comp),
                None => TypeRef::Error,
            },
            ExprKind::Base => match enclosing_type_def(comp, expr)? {
                Some(def) => def.try_base_class(comp)?.unwrap_or(TypeRef::Error),
                None => TypeRef::Error,
            },
            ExprKind::IsTrue(_) => TypeRef::BOOLEAN,
            ExprKind::Old(inner) => comp.try_type_of(inner)?,
            ExprKind::ReturnValue => {
                let method = expr.scope().and_then(|scope| {
                    std::iter::once(scope)
                        .chain(comp.arena().ancestors(scope))
                        .find(|&d| comp.arena().node(d).as_method().is_some())
                });
                match method {
                    Some(method) => match comp.try_member_def_of(method)?.and_then(|m| comp.member(m)) {
                        Some(member) => member.try_value_type(comp)?,
                        None => TypeRef::Error,
                    },
                    None => TypeRef::Error,
                }
            }
            ExprKind::Dummy => TypeRef::Error,
        };
        Ok(ty)
    }
}

fn enclosing_type_def(comp: &Compilation, expr: &Expression) -> Lookup<Option<Arc<NamedTypeDefinition>>> {
    let Some(type_decl) = expr.scope().and_then(|s| comp.arena().enclosing_type(s)) else {
        return Ok(None);
    };
    Ok(comp.try_type_def_of(type_decl)?.and_then(|id| comp.type_def(id)))
}

/// Type arguments of a simple or qualified name.
pub(crate) fn type_args_of(expr: &Expression) -> &[Expr] {
    match &expr.kind {
        ExprKind::Name { type_args, .. } | ExprKind::Qualified { type_args, .. } => type_args,
        _ => &[],
    }
}

fn builtin_named(text: &str) -> Option<BuiltinType> {
    BuiltinType::from_keyword(text).or_else(|| {
        BuiltinType::ALL
            .into_iter()
            .find(|b| b.full_name().rsplit('.').next() == Some(text))
    })
}

impl Compilation {
    // =========================================================================
    // Cached entry points
    // =========================================================================

    /// What a value expression refers to. Unresolvable names give
    /// `Resolved::Nothing`.
    pub fn resolve(&self, expr: &Expression) -> Resolved {
        self.try_resolve_in(expr, NameRole::Value)
            .unwrap_or(Resolved::Nothing)
    }

    /// The type a type expression denotes, `TypeRef::Error` if it does not
    /// denote one.
    pub fn resolve_type(&self, expr: &Expression) -> TypeRef {
        self.try_resolve_type(expr).unwrap_or(TypeRef::Error)
    }

    /// Static type of a value expression.
    pub fn type_of(&self, expr: &Expression) -> TypeRef {
        self.try_type_of(expr).unwrap_or(TypeRef::Error)
    }

    pub(crate) fn try_resolve_in(&self, expr: &Expression, role: NameRole) -> Lookup<Resolved> {
        expr.resolved_cache()
            .try_get_or_init_locked(self.build_lock(), || {
                self.resolver().resolve(self, expr, role)
            })
            .copied()
    }

    pub(crate) fn try_resolve_type(&self, expr: &Expression) -> Lookup<TypeRef> {
        Ok(match self.try_resolve_in(expr, NameRole::Type)? {
            Resolved::Type(ty) => ty,
            _ => TypeRef::Error,
        })
    }

    pub(crate) fn try_type_of(&self, expr: &Expression) -> Lookup<TypeRef> {
        self.resolver().type_of(self, expr)
    }

    /// The generic type a constructed name applies its arguments to,
    /// without resolving the arguments.
    pub(crate) fn try_resolve_generic_head(&self, expr: &Expression) -> Lookup<TypeRef> {
        let head = match &expr.kind {
            ExprKind::Name { name, type_args } => match expr.scope() {
                Some(scope) => self.try_lookup_name(scope, *name, type_args.len(), NameRole::Type)?,
                None => Resolved::Nothing,
            },
            ExprKind::Qualified {
                qualifier,
                name,
                type_args,
            } => {
                let qualifier = self.try_resolve_in(qualifier, NameRole::Type)?;
                self.try_lookup_member(qualifier, *name, type_args.len(), NameRole::Type)?
            }
            _ => Resolved::Nothing,
        };
        Ok(head.as_type().unwrap_or(TypeRef::Error))
    }

    fn try_apply_type_args(&self, head: Resolved, type_args: &[Expr]) -> Lookup<Resolved> {
        if type_args.is_empty() {
            return Ok(head);
        }
        let Resolved::Type(TypeRef::Def(generic)) = head else {
            return Ok(head);
        };
        let args = type_args
            .iter()
            .map(|arg| self.try_resolve_type(arg))
            .collect::<Lookup<Vec<_>>>()?;
        Ok(Resolved::Type(TypeRef::Instance(
            self.store().intern_instance(generic, args),
        )))
    }

    // =========================================================================
    // Scope chain walk
    // =========================================================================

    /// Look `name` up from the declaration `start` outward.
    pub(crate) fn try_lookup_name(
        &self,
        start: DeclId,
        name: Atom,
        arity: usize,
        role: NameRole,
    ) -> Lookup<Resolved> {
        let arena = self.arena();
        // alias and import targets resolve with their namespace declaration busy
        let owner_scope = match &arena.node(start).kind {
            DeclKind::Alias(_) | DeclKind::Import(_) => arena
                .container(start)
                .and_then(Container::as_decl)
                .map(|ns| self.scope(ns)),
            _ => None,
        };
        let _busy = owner_scope.as_ref().map(|scope| scope.enter_busy());

        let mut from_member = false;
        let mut current = Some(start);
        let mut hops = 0u32;
        while let Some(decl) = current {
            hops += 1;
            if hops > self.options().max_resolution_depth {
                debug!(?start, hops, "name lookup exceeded the resolution depth");
                return Ok(Resolved::Nothing);
            }
            let node = arena.node(decl);
            match &node.kind {
                DeclKind::Method(method) => {
                    if let Some(found) = self.try_lookup_in_method(method, name, arity, role)? {
                        return Ok(found);
                    }
                    from_member = true;
                }
                DeclKind::Property(prop) => {
                    if role == NameRole::Value
                        && arity == 0
                        && let Some(&param) = prop
                            .parameters
                            .iter()
                            .find(|&&p| arena.node(p).name().is_some_and(|n| self.same_name(n, name)))
                    {
                        return Ok(Resolved::Parameter(param));
                    }
                    from_member = true;
                }
                DeclKind::Type(_) => {
                    if let Some(found) =
                        self.try_lookup_in_type_scope(decl, name, arity, role, from_member)?
                    {
                        return Ok(found);
                    }
                }
                DeclKind::Namespace(_) => {
                    if let Some(found) = self.try_scope_lookup(decl, name, arity)? {
                        return Ok(found);
                    }
                }
                DeclKind::Field(_)
                | DeclKind::EnumMember(_)
                | DeclKind::Event(_)
                | DeclKind::Parameter(_) => from_member = true,
                DeclKind::Alias(_) | DeclKind::Import(_) | DeclKind::GenericParameter(_) => {}
            }
            current = arena.container(decl).and_then(Container::as_decl);
        }
        if arity == 0
            && let Some(builtin) = builtin_named(&self.name(name))
        {
            return Ok(Resolved::Type(TypeRef::Builtin(builtin)));
        }
        Ok(Resolved::Nothing)
    }

    fn try_lookup_in_method(
        &self,
        method: &MethodDecl,
        name: Atom,
        arity: usize,
        role: NameRole,
    ) -> Lookup<Option<Resolved>> {
        if arity != 0 {
            return Ok(None);
        }
        let named = |decl: DeclId| {
            self.arena()
                .node(decl)
                .name()
                .is_some_and(|n| self.same_name(n, name))
        };
        if role == NameRole::Value
            && let Some(&param) = method.parameters.iter().find(|p| named(**p))
        {
            return Ok(Some(Resolved::Parameter(param)));
        }
        if let Some(&generic) = method.generic_params.iter().find(|g| named(**g)) {
            return Ok(self
                .try_generic_param_of(generic)?
                .map(|id| Resolved::Type(TypeRef::GenericParam(id))));
        }
        Ok(None)
    }

    fn try_lookup_in_type_scope(
        &self,
        type_decl: DeclId,
        name: Atom,
        arity: usize,
        role: NameRole,
        inherited: bool,
    ) -> Lookup<Option<Resolved>> {
        let Some(def) = self.try_type_def_of(type_decl)?.and_then(|id| self.type_def(id)) else {
            return Ok(None);
        };
        if arity == 0 {
            for id in def.generic_parameters() {
                if let Some(param) = self.generic_param(id)
                    && self.same_name(param.name, name)
                {
                    return Ok(Some(Resolved::Type(TypeRef::GenericParam(id))));
                }
            }
        }
        self.try_lookup_in_type(def, name, arity, role, inherited)
    }

    /// Nested types, then (for value names) members, optionally through
    /// the base class chain.
    fn try_lookup_in_type(
        &self,
        def: Arc<NamedTypeDefinition>,
        name: Atom,
        arity: usize,
        role: NameRole,
        inherited: bool,
    ) -> Lookup<Option<Resolved>> {
        let mut current = Some(def);
        let mut steps = 0;
        while let Some(ty) = current {
            if let Some(nested) = ty.try_nested_type(self, name, arity)? {
                return Ok(Some(Resolved::Type(TypeRef::Def(nested))));
            }
            if role == NameRole::Value
                && arity == 0
                && ty.declares_member_named(self, name)
                && let Some(member) = ty
                    .try_members_named(self, name)?
                    .into_iter()
                    .find_map(TypeMember::as_member)
            {
                return Ok(Some(Resolved::Member(member)));
            }
            steps += 1;
            if !inherited || steps > MAX_BASE_CLASS_CHAIN {
                break;
            }
            current = ty
                .try_base_class(self)?
                .and_then(|base| self.definition_of(base));
        }
        Ok(None)
    }

    /// `name` inside whatever `qualifier` resolved to.
    fn try_lookup_member(
        &self,
        qualifier: Resolved,
        name: Atom,
        arity: usize,
        role: NameRole,
    ) -> Lookup<Resolved> {
        let container = match qualifier {
            Resolved::Namespace(ns) => {
                return Ok(match self.namespace(ns) {
                    Some(ns) => ns.try_lookup(self, name, arity)?.unwrap_or(Resolved::Nothing),
                    None => Resolved::Nothing,
                });
            }
            Resolved::Type(ty) => ty,
            Resolved::Member(member) => match self.member(member) {
                Some(member) => member.try_value_type(self)?,
                None => TypeRef::Error,
            },
            Resolved::Parameter(param) => match self.arena().node(param).as_parameter() {
                Some(param) => self.try_resolve_type(&param.ty)?,
                None => TypeRef::Error,
            },
            Resolved::Nothing => return Ok(Resolved::Nothing),
        };
        let Some(def) = self.definition_of(container) else {
            return Ok(Resolved::Nothing);
        };
        Ok(self
            .try_lookup_in_type(def, name, arity, role, role == NameRole::Value)?
            .unwrap_or(Resolved::Nothing))
    }

    fn try_resolve_alias_qualified(&self, scope: DeclId, alias: Atom, name: Atom) -> Lookup<Resolved> {
        let target = if &*self.name(alias) == "global" {
            Resolved::Namespace(self.global_namespace().id)
        } else {
            let _guard = self.build_lock().enter();
            let mut found = Resolved::Nothing;
            let namespaces = std::iter::once(scope)
                .chain(self.arena().ancestors(scope))
                .filter(|&d| self.arena().node(d).as_namespace().is_some());
            for ns_decl in namespaces {
                if self.scope(ns_decl).is_busy() {
                    continue;
                }
                if let Some(alias_decl) = self.alias_named(ns_decl, alias, self.options().ignore_case) {
                    found = self.try_alias_target(alias_decl)?;
                    break;
                }
            }
            found
        };
        self.try_lookup_member(target, name, 0, NameRole::Type)
    }

    // =========================================================================
    // Diagnostics text
    // =========================================================================

    /// Source-like text of a name expression, for diagnostics.
    pub fn expr_text(&self, expr: &Expression) -> String {
        match &expr.kind {
            ExprKind::Name { name, type_args } => self.with_type_args(self.name(*name).to_string(), type_args),
            ExprKind::Qualified {
                qualifier,
                name,
                type_args,
            } => self.with_type_args(
                format!("{}.{}", self.expr_text(qualifier), self.name(*name)),
                type_args,
            ),
            ExprKind::AliasQualified { alias, name } => {
                format!("{}::{}", self.name(*alias), self.name(*name))
            }
            ExprKind::Builtin(builtin) => builtin
                .keyword()
                .unwrap_or_else(|| builtin.full_name())
                .to_string(),
            ExprKind::Literal(Literal::Int(value)) => value.to_string(),
            ExprKind::Literal(Literal::Bool(value)) => value.to_string(),
            ExprKind::Literal(Literal::Str(value)) => format!("\"{value}\""),
            ExprKind::Literal(Literal::Null) => "null".to_string(),
            ExprKind::Binary { op, left, right } => format!(
                "{} {} {}",
                self.expr_text(left),
                binary_op_text(*op),
                self.expr_text(right)
            ),
            ExprKind::This => "this".to_string(),
            ExprKind::Base => "base".to_string(),
            _ => "<expression>".to_string(),
        }
    }

    fn with_type_args(&self, head: String, type_args: &[Expr]) -> String {
        if type_args.is_empty() {
            return head;
        }
        let args: Vec<String> = type_args.iter().map(|a| self.expr_text(a)).collect();
        format!("{head}<{}>", args.join(", "))
    }
}

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::LogicalAnd => "&&",
        BinaryOp::LogicalOr => "||",
    }
}

#[cfg(test)]
#[path = "../tests/resolver_tests.rs"]
mod tests;
