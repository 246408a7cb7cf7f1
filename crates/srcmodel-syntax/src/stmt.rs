//! Statements in method bodies and accessor templates.
//!
//! Bodies are only as rich as the object model needs: synthesized
//! constructors are built from them and contracts attach to loops.

use crate::contracts::LoopContract;
use crate::expr::Expr;
use srcmodel_common::{Atom, DeclId, SourceLocation};
use std::sync::Arc;

#[derive(Debug)]
pub enum StmtKind {
    Expression(Expr),
    Return(Option<Expr>),
    Local {
        name: Atom,
        ty: Option<Expr>,
        initializer: Option<Expr>,
    },
    Loop {
        condition: Option<Expr>,
        contract: Option<Arc<LoopContract>>,
        body: Block,
    },
    Block(Block),
    /// Runs the instance field initializers of the containing type.
    FieldInitializers,
}

#[derive(Debug)]
pub struct Statement {
    pub kind: StmtKind,
    pub location: SourceLocation,
}

impl Statement {
    pub fn new(kind: StmtKind, location: SourceLocation) -> Self {
        Statement { kind, location }
    }

    pub fn expression(expr: Expr) -> Self {
        let location = expr.location;
        Statement::new(StmtKind::Expression(expr), location)
    }

    fn set_containing_scope(&self, scope: DeclId) {
        match &self.kind {
            StmtKind::Expression(e) => e.set_containing_scope(scope),
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    value.set_containing_scope(scope);
                }
            }
            StmtKind::Local {
                ty, initializer, ..
            } => {
                for e in ty.iter().chain(initializer.iter()) {
                    e.set_containing_scope(scope);
                }
            }
            StmtKind::Loop {
                condition,
                contract,
                body,
            } => {
                if let Some(condition) = condition {
                    condition.set_containing_scope(scope);
                }
                if let Some(contract) = contract {
                    contract.set_containing_scope(scope);
                }
                body.set_containing_scope(scope);
            }
            StmtKind::Block(block) => block.set_containing_scope(scope),
            StmtKind::FieldInitializers => {}
        }
    }

    fn deep_copy(&self) -> Statement {
        let kind = match &self.kind {
            StmtKind::Expression(e) => StmtKind::Expression(e.deep_copy()),
            StmtKind::Return(value) => StmtKind::Return(value.as_ref().map(|v| v.deep_copy())),
            StmtKind::Local {
                name,
                ty,
                initializer,
            } => StmtKind::Local {
                name: *name,
                ty: ty.as_ref().map(|t| t.deep_copy()),
                initializer: initializer.as_ref().map(|i| i.deep_copy()),
            },
            StmtKind::Loop {
                condition,
                contract,
                body,
            } => StmtKind::Loop {
                condition: condition.as_ref().map(|c| c.deep_copy()),
                contract: contract.as_ref().map(|c| Arc::new(c.copy_unbound())),
                body: body.deep_copy(),
            },
            StmtKind::Block(block) => StmtKind::Block(block.deep_copy()),
            StmtKind::FieldInitializers => StmtKind::FieldInitializers,
        };
        Statement::new(kind, self.location)
    }

    /// Every expression directly held by this statement (not nested blocks).
    pub fn for_each_expression(&self, f: &mut impl FnMut(&Expr)) {
        match &self.kind {
            StmtKind::Expression(e) => f(e),
            StmtKind::Return(value) => value.iter().for_each(|v| f(v)),
            StmtKind::Local {
                ty, initializer, ..
            } => ty.iter().chain(initializer.iter()).for_each(|e| f(e)),
            StmtKind::Loop {
                condition, body, ..
            } => {
                condition.iter().for_each(|c| f(c));
                body.for_each_expression(f);
            }
            StmtKind::Block(block) => block.for_each_expression(f),
            StmtKind::FieldInitializers => {}
        }
    }
}

#[derive(Debug, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Block { statements }
    }

    pub fn set_containing_scope(&self, scope: DeclId) {
        for statement in &self.statements {
            statement.set_containing_scope(scope);
        }
    }

    /// Unbound copy; every statement list is a fresh vector.
    pub fn deep_copy(&self) -> Block {
        Block {
            statements: self.statements.iter().map(Statement::deep_copy).collect(),
        }
    }

    pub fn for_each_expression(&self, f: &mut impl FnMut(&Expr)) {
        for statement in &self.statements {
            statement.for_each_expression(f);
        }
    }

    /// Loop contracts anywhere in this block.
    pub fn loop_contracts(&self) -> Vec<Arc<LoopContract>> {
        let mut out = Vec::new();
        for statement in &self.statements {
            match &statement.kind {
                StmtKind::Loop { contract, body, .. } => {
                    out.extend(contract.iter().cloned());
                    out.extend(body.loop_contracts());
                }
                StmtKind::Block(block) => out.extend(block.loop_contracts()),
                _ => {}
            }
        }
        out
    }
}
