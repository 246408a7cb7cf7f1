//! Declaration trees for the srcmodel object model.
//!
//! This crate holds the per-occurrence view of a program:
//! - Declaration nodes and the arena that stores them (`decl`, `arena`)
//! - Two-phase binding and the template copier (`DeclArena::bind`,
//!   `DeclArena::make_copy_for`)
//! - Unresolved expressions and statements (`expr`, `stmt`)
//! - Method, loop and type contracts (`contracts`)
//! - Builders for constructing trees (`builder`)

pub mod flags;
pub use flags::{
    AttributeTarget, GenericConstraints, Modifiers, ParameterModifier, TypeKind, Variance,
    Visibility,
};

pub mod expr;
pub use expr::{BinaryOp, Expr, ExprKind, Expression, Literal, MethodRef, UnaryOp, coerce_to_bool};

pub mod stmt;
pub use stmt::{Block, Statement, StmtKind};

pub mod contracts;
pub use contracts::{
    ContractCondition, ContractElement, ContractElementKind, LoopContract, LoopInvariant,
    MethodContract, Postcondition, Precondition, ThrownException, TypeContract, TypeInvariant,
};

pub mod attributes;
pub use attributes::SourceAttribute;

pub mod decl;
pub use decl::{
    AccessorPair, AccessorTemplate, AliasDecl, Container, DeclKind, Declaration,
    DelegateSignature, EnumMemberDecl, EventDecl, FieldDecl, GenericParamDecl, ImportDecl,
    MethodDecl, MethodDeclParts, NamespaceDecl, ParameterDecl, PropertyDecl, TypeContractParts,
    TypeDecl, TypeDeclParts, Unbound,
};

pub mod arena;
pub use arena::{DeclArena, MemberSlot};

pub mod builder;
pub use builder::{MethodBuilder, TreeBuilder, TypeBuilder};
