//! Common types and utilities for the srcmodel object model.
//!
//! This crate provides foundational types used across all srcmodel crates:
//! - Name interning (`Atom`, `NameTable`)
//! - Source locations and document edits
//! - Stable handles for declarations and definitions, and `TypeRef`
//! - Diagnostics and the `ErrorSink` collaborator
//! - Compute-once caches and the per-unit build lock
//! - Recursion guards and centralized limits

// Name interning for identifier deduplication
pub mod interner;
pub use interner::{Atom, NameTable};

// Source locations (document + byte range) and edit remapping
pub mod location;
pub use location::{DocumentEdit, DocumentId, SourceLocation};

// Handles - shared to break circular dependencies between syntax and binder
pub mod ids;
pub use ids::{
    BuiltinType, DeclId, GenericParamId, InstanceId, MemberDefId, NamespaceDefId, Resolved,
    TypeDefId, TypeRef, UnitId,
};

// Diagnostics reported to the error sink
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCategory, ErrorSink};

// Compute-once caches
pub mod lazy;
pub use lazy::{BuildLock, LazyCache, Reentrant};

// Cycle detection and depth limiting
pub mod recursion;
pub use recursion::{RecursionGuard, RecursionResult};

// Centralized limits and thresholds
pub mod limits;
