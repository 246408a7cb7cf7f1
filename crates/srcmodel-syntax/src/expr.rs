//! Unresolved expressions owned by declarations.
//!
//! An expression is an `Arc` tree. Its containing scope is the declaration
//! that owns it and is recorded once, when that declaration is bound. The
//! resolution result and the error flag are cached on the node, so a tree
//! is specific to one binding; reparenting a declaration deep-copies the
//! expressions it owns.

use once_cell::sync::OnceCell;
use smallvec::SmallVec;
use srcmodel_common::{
    Atom, BuiltinType, DeclId, LazyCache, MemberDefId, Resolved, SourceLocation,
};
use std::sync::Arc;

pub type Expr = Arc<Expression>;

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(Arc<str>),
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOp {
    pub fn mutates(self) -> bool {
        !matches!(self, UnaryOp::Neg | UnaryOp::Not | UnaryOp::BitNot)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }
}

/// A method already chosen at construction time (synthesized bodies).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MethodRef {
    Member(MemberDefId),
    /// Parameterless constructor of a platform type.
    BuiltinConstructor(BuiltinType),
}

#[derive(Debug)]
pub enum ExprKind {
    Name {
        name: Atom,
        type_args: Vec<Expr>,
    },
    Qualified {
        qualifier: Expr,
        name: Atom,
        type_args: Vec<Expr>,
    },
    /// `alias::Name`
    AliasQualified {
        alias: Atom,
        name: Atom,
    },
    Builtin(BuiltinType),
    Literal(Literal),
    Unary {
        op: UnaryOp,
        operand: Expr,
    },
    Binary {
        op: BinaryOp,
        left: Expr,
        right: Expr,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    Call {
        callee: Expr,
        args: Vec<Expr>,
    },
    ResolvedCall {
        method: MethodRef,
        receiver: Option<Expr>,
        args: Vec<Expr>,
    },
    New {
        ty: Expr,
        args: Vec<Expr>,
    },
    This,
    Base,
    /// Explicit conversion of a condition to `bool`.
    IsTrue(Expr),
    /// `old(e)` in postconditions.
    Old(Expr),
    /// The method's return value in postconditions.
    ReturnValue,
    /// Placeholder substituted for something that failed to parse or resolve.
    Dummy,
}

pub struct Expression {
    pub kind: ExprKind,
    pub location: SourceLocation,
    scope: OnceCell<DeclId>,
    resolved: LazyCache<Resolved>,
    has_errors: LazyCache<bool>,
}

impl Expression {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Expr {
        Arc::new(Expression {
            kind,
            location,
            scope: OnceCell::new(),
            resolved: LazyCache::new(),
            has_errors: LazyCache::new(),
        })
    }

    /// A node whose children are already bound; only the node itself gets
    /// `scope`.
    pub fn new_in_scope(kind: ExprKind, location: SourceLocation, scope: DeclId) -> Expr {
        let expr = Expression {
            kind,
            location,
            scope: OnceCell::with_value(scope),
            resolved: LazyCache::new(),
            has_errors: LazyCache::new(),
        };
        Arc::new(expr)
    }

    /// The declaration owning this expression, once bound.
    #[inline]
    pub fn scope(&self) -> Option<DeclId> {
        self.scope.get().copied()
    }

    /// Phase (b): record the owning declaration on this node and every
    /// child.
    pub fn set_containing_scope(&self, scope: DeclId) {
        let previous = self.scope();
        debug_assert!(
            previous.is_none(),
            "expression bound twice (to {previous:?}, then {scope:?})"
        );
        if self.scope.set(scope).is_err() {
            tracing::warn!(?previous, ?scope, "expression bound twice");
            return;
        }
        self.for_each_child(|child| child.set_containing_scope(scope));
    }

    /// The same node when already scoped to `scope`, otherwise an unshared
    /// deep copy bound to `scope`.
    pub fn make_copy_for(self: &Arc<Self>, scope: DeclId) -> Expr {
        if self.scope() == Some(scope) {
            return Arc::clone(self);
        }
        let copy = self.deep_copy();
        copy.set_containing_scope(scope);
        copy
    }

    /// Unbound structural copy with fresh caches. Leaf data is shared.
    pub fn deep_copy(&self) -> Expr {
        let copy_all = |exprs: &[Expr]| exprs.iter().map(|e| e.deep_copy()).collect::<Vec<_>>();
        let kind = match &self.kind {
            ExprKind::Name { name, type_args } => ExprKind::Name {
                name: *name,
                type_args: copy_all(type_args),
            },
            ExprKind::Qualified {
                qualifier,
                name,
                type_args,
            } => ExprKind::Qualified {
                qualifier: qualifier.deep_copy(),
                name: *name,
                type_args: copy_all(type_args),
            },
            ExprKind::AliasQualified { alias, name } => ExprKind::AliasQualified {
                alias: *alias,
                name: *name,
            },
            ExprKind::Builtin(ty) => ExprKind::Builtin(*ty),
            ExprKind::Literal(lit) => ExprKind::Literal(lit.clone()),
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: operand.deep_copy(),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: left.deep_copy(),
                right: right.deep_copy(),
            },
            ExprKind::Assign { target, value } => ExprKind::Assign {
                target: target.deep_copy(),
                value: value.deep_copy(),
            },
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: callee.deep_copy(),
                args: copy_all(args),
            },
            ExprKind::ResolvedCall {
                method,
                receiver,
                args,
            } => ExprKind::ResolvedCall {
                method: *method,
                receiver: receiver.as_ref().map(|r| r.deep_copy()),
                args: copy_all(args),
            },
            ExprKind::New { ty, args } => ExprKind::New {
                ty: ty.deep_copy(),
                args: copy_all(args),
            },
            ExprKind::This => ExprKind::This,
            ExprKind::Base => ExprKind::Base,
            ExprKind::IsTrue(inner) => ExprKind::IsTrue(inner.deep_copy()),
            ExprKind::Old(inner) => ExprKind::Old(inner.deep_copy()),
            ExprKind::ReturnValue => ExprKind::ReturnValue,
            ExprKind::Dummy => ExprKind::Dummy,
        };
        Expression::new(kind, self.location)
    }

    pub fn for_each_child(&self, mut f: impl FnMut(&Expr)) {
        match &self.kind {
            ExprKind::Name { type_args, .. } => type_args.iter().for_each(f),
            ExprKind::Qualified {
                qualifier,
                type_args,
                ..
            } => {
                f(qualifier);
                type_args.iter().for_each(f);
            }
            ExprKind::Unary { operand, .. } => f(operand),
            ExprKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            ExprKind::Assign { target, value } => {
                f(target);
                f(value);
            }
            ExprKind::Call { callee, args } => {
                f(callee);
                args.iter().for_each(f);
            }
            ExprKind::ResolvedCall { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    f(receiver);
                }
                args.iter().for_each(f);
            }
            ExprKind::New { ty, args } => {
                f(ty);
                args.iter().for_each(f);
            }
            ExprKind::IsTrue(inner) | ExprKind::Old(inner) => f(inner),
            ExprKind::AliasQualified { .. }
            | ExprKind::Builtin(_)
            | ExprKind::Literal(_)
            | ExprKind::This
            | ExprKind::Base
            | ExprKind::ReturnValue
            | ExprKind::Dummy => {}
        }
    }

    pub fn children(&self) -> SmallVec<[Expr; 4]> {
        let mut out = SmallVec::new();
        self.for_each_child(|c| out.push(Arc::clone(c)));
        out
    }

    /// Side effects visible without resolving anything: assignments,
    /// increments, object creation. Calls are judged by the binder, which
    /// knows whether the callee is pure.
    pub fn has_syntactic_side_effect(&self) -> bool {
        let local = match &self.kind {
            ExprKind::Assign { .. } | ExprKind::New { .. } => true,
            ExprKind::Unary { op, .. } => op.mutates(),
            _ => false,
        };
        if local {
            return true;
        }
        let mut any = false;
        self.for_each_child(|c| any |= c.has_syntactic_side_effect());
        any
    }

    /// Calls below this node, outermost first.
    pub fn calls(&self) -> Vec<Expr> {
        let mut out = Vec::new();
        self.collect_calls(&mut out);
        out
    }

    fn collect_calls(&self, out: &mut Vec<Expr>) {
        self.for_each_child(|c| {
            if matches!(c.kind, ExprKind::Call { .. } | ExprKind::ResolvedCall { .. }) {
                out.push(Arc::clone(c));
            }
            c.collect_calls(out);
        });
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_))
    }

    /// The last name segment of a simple, qualified or alias-qualified name.
    pub fn simple_name(&self) -> Option<Atom> {
        match &self.kind {
            ExprKind::Name { name, .. }
            | ExprKind::Qualified { name, .. }
            | ExprKind::AliasQualified { name, .. } => Some(*name),
            _ => None,
        }
    }

    pub fn type_arg_count(&self) -> usize {
        match &self.kind {
            ExprKind::Name { type_args, .. } | ExprKind::Qualified { type_args, .. } => {
                type_args.len()
            }
            _ => 0,
        }
    }

    /// Resolution cache, filled by the binder.
    pub fn resolved_cache(&self) -> &LazyCache<Resolved> {
        &self.resolved
    }

    /// Error cache, filled by the binder.
    pub fn errors_cache(&self) -> &LazyCache<bool> {
        &self.has_errors
    }
}

impl std::fmt::Debug for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expression")
            .field("kind", &self.kind)
            .field("scope", &self.scope.get())
            .finish()
    }
}

/// A fresh `IsTrue(condition)` node in the condition's scope.
pub fn coerce_to_bool(condition: &Expr) -> Expr {
    let kind = ExprKind::IsTrue(Arc::clone(condition));
    match condition.scope() {
        Some(scope) => Expression::new_in_scope(kind, condition.location, scope),
        None => Expression::new(kind, condition.location),
    }
}

#[cfg(test)]
#[path = "../tests/expr_tests.rs"]
mod tests;
