//! Definitions aggregated from declarations, and lazy name resolution.
//!
//! This crate turns the per-occurrence declaration trees of
//! `srcmodel-syntax` into one definition per entity:
//! - The compilation unit, its generations and the definition store
//!   (`compilation`, `store`)
//! - Namespace, type, member and generic parameter folds (`namespaces`,
//!   `types`, `members`, `generics`)
//! - Namespace scopes with aliases, imports and extension methods (`scope`)
//! - Name resolution and overload applicability (`resolver`, `overloads`)
//! - Synthesized members, enum values and custom attributes (`synthesize`,
//!   `enums`, `attributes`)
//! - `has_errors` folds over declarations and contracts (`errors`,
//!   `contracts`)
//!
//! Every fold runs at most once per definition and is cached on it.

pub mod options;
pub use options::CompilationOptions;

pub mod compilation;
pub use compilation::{Compilation, CompilationBuilder, Lookup};

pub mod store;
pub use store::DefinitionStore;

pub mod generics;
pub use generics::{GenericInstance, GenericOwner, GenericParameter};

pub mod types;
pub use types::{DefContainer, NamedTypeDefinition, TypeFlags, TypeMember, TypeTable};

pub mod namespaces;
pub use namespaces::{NamespaceMember, NamespaceMembers, UnitNamespace};

pub mod members;
pub use members::{MemberDefinition, MemberKind};

pub mod scope;
pub use scope::{BusyGuard, NamespaceScope};

pub mod resolver;
pub use resolver::{NameRole, ScopeChainResolver, TypeExpressionResolver};

pub mod overloads;
pub use overloads::{ArityOverloadResolver, OverloadResolver};

mod synthesize;

mod enums;

pub mod attributes;
pub use attributes::CustomAttribute;

mod errors;

mod contracts;

#[cfg(test)]
#[path = "../tests/test_fixtures.rs"]
pub(crate) mod test_fixtures;
