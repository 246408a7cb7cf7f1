//! srcmodel: declaration aggregation and lazy resolution for a source-level
//! object model.
//!
//! Parsers build declaration trees with [`TreeBuilder`] in an arena, hand
//! each root to a [`Compilation`] and query definitions lazily:
//!
//! ```
//! use srcmodel::{Compilation, DeclArena, DiagnosticBag, NameTable, TreeBuilder};
//! use std::sync::Arc;
//!
//! let arena = Arc::new(DeclArena::new(Arc::new(NameTable::new())));
//! let diagnostics = Arc::new(DiagnosticBag::new());
//! let b = TreeBuilder::new(&arena);
//! let root = b.root(vec![b.namespace("App", vec![b.class("Widget").build()])]);
//!
//! let comp = Compilation::new(Arc::clone(&arena), diagnostics.clone());
//! comp.add_part(root);
//! assert_eq!(comp.global_namespace().all_types(&comp).len(), 1);
//! ```

pub use srcmodel_binder as binder;
pub use srcmodel_common as common;
pub use srcmodel_syntax as syntax;

pub use srcmodel_common::{
    Atom, BuildLock, BuiltinType, DeclId, Diagnostic, DiagnosticBag, DiagnosticCategory,
    DocumentEdit, DocumentId, ErrorSink, LazyCache, MemberDefId, NameTable, NamespaceDefId,
    Reentrant, Resolved, SourceLocation, TypeDefId, TypeRef,
};
pub use srcmodel_common::diagnostics::codes;

pub use srcmodel_syntax::{
    Container, DeclArena, DeclKind, Expr, ExprKind, Expression, MemberSlot, Modifiers, TreeBuilder,
    Unbound,
};

pub use srcmodel_binder::{
    ArityOverloadResolver, Compilation, CompilationBuilder, CompilationOptions, CustomAttribute,
    Lookup, MemberDefinition, MemberKind, NameRole, NamedTypeDefinition, NamespaceMember,
    OverloadResolver, ScopeChainResolver, TypeExpressionResolver, TypeFlags, UnitNamespace,
};

// Tracing configuration (text / tree / json output via SRCMODEL_LOG_FORMAT)
pub mod tracing_config;
