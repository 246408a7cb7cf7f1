//! Declarative contracts attached to methods, loops and types.
//!
//! Every condition-bearing element wraps one [`ContractCondition`]. The
//! coerced condition is computed lazily without the build lock since
//! coercion is pure; the error flag is filled by the binder under it.
//!
//! Contracts follow the two-phase protocol like declarations. They are
//! allocated unbound, bound once through `set_containing_scope`, and
//! reparented with `make_copy_for`, which hands back the same `Arc` when the
//! scope is unchanged.

use crate::expr::{Expr, coerce_to_bool};
use once_cell::sync::OnceCell;
use srcmodel_common::{Atom, DeclId, LazyCache, SourceLocation};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractElementKind {
    Precondition,
    Postcondition,
    LoopInvariant,
    TypeInvariant,
}

/// A boolean condition with its lazily coerced form and error flag.
pub struct ContractCondition {
    condition: Expr,
    converted: LazyCache<Expr>,
    has_errors: LazyCache<bool>,
}

impl ContractCondition {
    pub fn new(condition: Expr) -> Self {
        ContractCondition {
            condition,
            converted: LazyCache::new(),
            has_errors: LazyCache::new(),
        }
    }

    #[inline]
    pub fn condition(&self) -> &Expr {
        &self.condition
    }

    /// The condition wrapped in an explicit conversion to `bool`.
    pub fn converted_condition(&self) -> &Expr {
        self.converted
            .get_or_init_racy(|| coerce_to_bool(&self.condition))
    }

    pub fn errors_cache(&self) -> &LazyCache<bool> {
        &self.has_errors
    }

    pub fn scope(&self) -> Option<DeclId> {
        self.condition.scope()
    }

    fn set_containing_scope(&self, scope: DeclId) {
        self.condition.set_containing_scope(scope);
    }

    fn copy_unbound(&self) -> Self {
        ContractCondition::new(self.condition.deep_copy())
    }
}

impl std::fmt::Debug for ContractCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContractCondition")
            .field(&self.condition)
            .finish()
    }
}

/// Shared surface of preconditions, postconditions and invariants.
pub trait ContractElement {
    fn element_kind(&self) -> ContractElementKind;
    fn contract_condition(&self) -> &ContractCondition;
    fn location(&self) -> SourceLocation;

    fn condition(&self) -> &Expr {
        self.contract_condition().condition()
    }

    fn converted_condition(&self) -> &Expr {
        self.contract_condition().converted_condition()
    }
}

macro_rules! contract_element {
    ($ty:ident, $kind:ident) => {
        impl ContractElement for $ty {
            fn element_kind(&self) -> ContractElementKind {
                ContractElementKind::$kind
            }

            fn contract_condition(&self) -> &ContractCondition {
                &self.condition
            }

            fn location(&self) -> SourceLocation {
                self.location
            }
        }
    };
}

#[derive(Debug)]
pub struct Precondition {
    condition: ContractCondition,
    /// Thrown instead of a contract failure when the condition is false.
    pub exception_to_throw: Option<Expr>,
    pub location: SourceLocation,
}

impl Precondition {
    pub fn new(condition: Expr, exception_to_throw: Option<Expr>, location: SourceLocation) -> Self {
        Precondition {
            condition: ContractCondition::new(condition),
            exception_to_throw,
            location,
        }
    }

    pub fn set_containing_scope(&self, scope: DeclId) {
        self.condition.set_containing_scope(scope);
        if let Some(exception) = &self.exception_to_throw {
            exception.set_containing_scope(scope);
        }
    }

    pub fn make_copy_for(self: &Arc<Self>, scope: DeclId) -> Arc<Self> {
        if self.condition.scope() == Some(scope) {
            return Arc::clone(self);
        }
        let copy = self.copy_unbound();
        copy.set_containing_scope(scope);
        Arc::new(copy)
    }

    fn copy_unbound(&self) -> Self {
        Precondition {
            condition: self.condition.copy_unbound(),
            exception_to_throw: self.exception_to_throw.as_ref().map(|e| e.deep_copy()),
            location: self.location,
        }
    }
}
contract_element!(Precondition, Precondition);

#[derive(Debug)]
pub struct Postcondition {
    condition: ContractCondition,
    pub location: SourceLocation,
}

impl Postcondition {
    pub fn new(condition: Expr, location: SourceLocation) -> Self {
        Postcondition {
            condition: ContractCondition::new(condition),
            location,
        }
    }

    pub fn set_containing_scope(&self, scope: DeclId) {
        self.condition.set_containing_scope(scope);
    }

    pub fn make_copy_for(self: &Arc<Self>, scope: DeclId) -> Arc<Self> {
        if self.condition.scope() == Some(scope) {
            return Arc::clone(self);
        }
        let copy = self.copy_unbound();
        copy.set_containing_scope(scope);
        Arc::new(copy)
    }

    fn copy_unbound(&self) -> Self {
        Postcondition {
            condition: self.condition.copy_unbound(),
            location: self.location,
        }
    }
}
contract_element!(Postcondition, Postcondition);

#[derive(Debug)]
pub struct LoopInvariant {
    condition: ContractCondition,
    pub location: SourceLocation,
}

impl LoopInvariant {
    pub fn new(condition: Expr, location: SourceLocation) -> Self {
        LoopInvariant {
            condition: ContractCondition::new(condition),
            location,
        }
    }

    fn copy_unbound(&self) -> Self {
        LoopInvariant {
            condition: self.condition.copy_unbound(),
            location: self.location,
        }
    }
}
contract_element!(LoopInvariant, LoopInvariant);

#[derive(Debug)]
pub struct TypeInvariant {
    condition: ContractCondition,
    pub name: Option<Atom>,
    /// Assumed rather than checked.
    pub is_axiom: bool,
    pub location: SourceLocation,
}

impl TypeInvariant {
    pub fn new(condition: Expr, name: Option<Atom>, is_axiom: bool, location: SourceLocation) -> Self {
        TypeInvariant {
            condition: ContractCondition::new(condition),
            name,
            is_axiom,
            location,
        }
    }

    pub fn set_containing_scope(&self, scope: DeclId) {
        self.condition.set_containing_scope(scope);
    }

    pub fn copy_unbound(&self) -> Self {
        TypeInvariant {
            condition: self.condition.copy_unbound(),
            name: self.name,
            is_axiom: self.is_axiom,
            location: self.location,
        }
    }
}
contract_element!(TypeInvariant, TypeInvariant);

/// An exception a method may throw, with the postcondition that holds when
/// it does.
#[derive(Debug)]
pub struct ThrownException {
    pub exception_type: Expr,
    pub postcondition: Postcondition,
}

impl ThrownException {
    pub fn new(exception_type: Expr, postcondition: Postcondition) -> Self {
        ThrownException {
            exception_type,
            postcondition,
        }
    }

    fn set_containing_scope(&self, scope: DeclId) {
        self.exception_type.set_containing_scope(scope);
        self.postcondition.set_containing_scope(scope);
    }

    fn copy_unbound(&self) -> Self {
        ThrownException {
            exception_type: self.exception_type.deep_copy(),
            postcondition: self.postcondition.copy_unbound(),
        }
    }
}

fn copy_exprs(exprs: &[Expr]) -> Vec<Expr> {
    exprs.iter().map(|e| e.deep_copy()).collect()
}

fn bind_exprs(exprs: &[Expr], scope: DeclId) {
    for e in exprs {
        e.set_containing_scope(scope);
    }
}

/// The contract of one method.
#[derive(Debug)]
pub struct MethodContract {
    pub allocates: Vec<Expr>,
    pub frees: Vec<Expr>,
    pub modified_variables: Vec<Expr>,
    pub postconditions: Vec<Arc<Postcondition>>,
    pub preconditions: Vec<Arc<Precondition>>,
    pub reads: Vec<Expr>,
    pub thrown_exceptions: Vec<Arc<ThrownException>>,
    pub writes: Vec<Expr>,
    pub variants: Vec<Expr>,
    pub is_pure: bool,
    pub location: SourceLocation,
    must_inline: bool,
    scope: OnceCell<DeclId>,
    has_errors: LazyCache<bool>,
}

impl MethodContract {
    pub fn new(location: SourceLocation) -> Self {
        MethodContract {
            allocates: Vec::new(),
            frees: Vec::new(),
            modified_variables: Vec::new(),
            postconditions: Vec::new(),
            preconditions: Vec::new(),
            reads: Vec::new(),
            thrown_exceptions: Vec::new(),
            writes: Vec::new(),
            variants: Vec::new(),
            is_pure: false,
            location,
            must_inline: false,
            scope: OnceCell::new(),
            has_errors: LazyCache::new(),
        }
    }

    /// The contract of a method whose body is its own contract.
    pub fn placeholder() -> Self {
        MethodContract {
            must_inline: true,
            ..MethodContract::new(SourceLocation::SYNTHETIC)
        }
    }

    #[inline]
    pub fn must_inline(&self) -> bool {
        self.must_inline
    }

    pub fn scope(&self) -> Option<DeclId> {
        self.scope.get().copied()
    }

    pub fn errors_cache(&self) -> &LazyCache<bool> {
        &self.has_errors
    }

    pub fn set_containing_scope(&self, scope: DeclId) {
        let previous = self.scope();
        debug_assert!(previous.is_none(), "method contract bound twice");
        if self.scope.set(scope).is_err() {
            tracing::warn!(?previous, ?scope, "method contract bound twice");
            return;
        }
        bind_exprs(&self.allocates, scope);
        bind_exprs(&self.frees, scope);
        bind_exprs(&self.modified_variables, scope);
        for post in &self.postconditions {
            post.set_containing_scope(scope);
        }
        for pre in &self.preconditions {
            pre.set_containing_scope(scope);
        }
        bind_exprs(&self.reads, scope);
        for thrown in &self.thrown_exceptions {
            thrown.set_containing_scope(scope);
        }
        bind_exprs(&self.writes, scope);
        bind_exprs(&self.variants, scope);
    }

    pub fn make_copy_for(self: &Arc<Self>, scope: DeclId) -> Arc<Self> {
        if self.scope() == Some(scope) {
            return Arc::clone(self);
        }
        let copy = self.copy_unbound();
        copy.set_containing_scope(scope);
        Arc::new(copy)
    }

    /// Unbound copy; every list is a fresh vector.
    pub fn copy_unbound(&self) -> Self {
        MethodContract {
            allocates: copy_exprs(&self.allocates),
            frees: copy_exprs(&self.frees),
            modified_variables: copy_exprs(&self.modified_variables),
            postconditions: self
                .postconditions
                .iter()
                .map(|p| Arc::new(p.copy_unbound()))
                .collect(),
            preconditions: self
                .preconditions
                .iter()
                .map(|p| Arc::new(p.copy_unbound()))
                .collect(),
            reads: copy_exprs(&self.reads),
            thrown_exceptions: self
                .thrown_exceptions
                .iter()
                .map(|t| Arc::new(t.copy_unbound()))
                .collect(),
            writes: copy_exprs(&self.writes),
            variants: copy_exprs(&self.variants),
            is_pure: self.is_pure,
            location: self.location,
            must_inline: self.must_inline,
            scope: OnceCell::new(),
            has_errors: LazyCache::new(),
        }
    }
}

/// The contract of one loop.
#[derive(Debug)]
pub struct LoopContract {
    pub invariants: Vec<Arc<LoopInvariant>>,
    pub writes: Vec<Expr>,
    pub variants: Vec<Expr>,
    pub location: SourceLocation,
    scope: OnceCell<DeclId>,
    has_errors: LazyCache<bool>,
}

impl LoopContract {
    pub fn new(location: SourceLocation) -> Self {
        LoopContract {
            invariants: Vec::new(),
            writes: Vec::new(),
            variants: Vec::new(),
            location,
            scope: OnceCell::new(),
            has_errors: LazyCache::new(),
        }
    }

    pub fn scope(&self) -> Option<DeclId> {
        self.scope.get().copied()
    }

    pub fn errors_cache(&self) -> &LazyCache<bool> {
        &self.has_errors
    }

    pub fn set_containing_scope(&self, scope: DeclId) {
        let previous = self.scope();
        debug_assert!(previous.is_none(), "loop contract bound twice");
        if self.scope.set(scope).is_err() {
            tracing::warn!(?previous, ?scope, "loop contract bound twice");
            return;
        }
        for invariant in &self.invariants {
            invariant.condition.set_containing_scope(scope);
        }
        bind_exprs(&self.writes, scope);
        bind_exprs(&self.variants, scope);
    }

    pub fn make_copy_for(self: &Arc<Self>, scope: DeclId) -> Arc<Self> {
        if self.scope() == Some(scope) {
            return Arc::clone(self);
        }
        let copy = self.copy_unbound();
        copy.set_containing_scope(scope);
        Arc::new(copy)
    }

    pub fn copy_unbound(&self) -> Self {
        LoopContract {
            invariants: self
                .invariants
                .iter()
                .map(|i| Arc::new(i.copy_unbound()))
                .collect(),
            writes: copy_exprs(&self.writes),
            variants: copy_exprs(&self.variants),
            location: self.location,
            scope: OnceCell::new(),
            has_errors: LazyCache::new(),
        }
    }
}

/// The contract of one type declaration.
///
/// Contract fields and methods are declarations; the arena binds and copies
/// them together with the owning type declaration.
#[derive(Debug)]
pub struct TypeContract {
    pub contract_fields: Vec<DeclId>,
    pub contract_methods: Vec<DeclId>,
    pub invariants: Vec<Arc<TypeInvariant>>,
    pub location: SourceLocation,
    container: OnceCell<DeclId>,
    has_errors: LazyCache<bool>,
}

impl TypeContract {
    pub(crate) fn from_parts(
        contract_fields: Vec<DeclId>,
        contract_methods: Vec<DeclId>,
        invariants: Vec<Arc<TypeInvariant>>,
        location: SourceLocation,
    ) -> Self {
        TypeContract {
            contract_fields,
            contract_methods,
            invariants,
            location,
            container: OnceCell::new(),
            has_errors: LazyCache::new(),
        }
    }

    pub fn containing_type(&self) -> Option<DeclId> {
        self.container.get().copied()
    }

    pub fn errors_cache(&self) -> &LazyCache<bool> {
        &self.has_errors
    }

    /// Records the containing type and binds the invariants. Contract
    /// fields and methods are bound by the arena.
    pub(crate) fn set_containing_type(&self, container: DeclId) {
        let previous = self.containing_type();
        debug_assert!(previous.is_none(), "type contract bound twice");
        if self.container.set(container).is_err() {
            tracing::warn!(?previous, ?container, "type contract bound twice");
            return;
        }
        for invariant in &self.invariants {
            invariant.set_containing_scope(container);
        }
    }
}

#[cfg(test)]
#[path = "../tests/contracts_tests.rs"]
mod tests;
