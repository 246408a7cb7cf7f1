//! Contract checks.
//!
//! A contract condition must have a boolean type and no side effects: no
//! assignment, increment or object creation, and no call to a method that
//! is not pure. Preconditions may not mention `out` parameters, and
//! location sets (`reads`, `writes`) may not hold constants. Each contract
//! and each condition caches its verdict under the build lock.

use crate::compilation::{Compilation, Lookup};
use crate::errors::Locals;
use crate::members::MemberKind;
use crate::resolver::NameRole;
use srcmodel_common::diagnostics::codes;
use srcmodel_common::{Resolved, TypeRef};
use srcmodel_syntax::{
    ContractElement, DeclKind, Expr, ExprKind, LoopContract, MethodContract, MethodRef,
    ParameterModifier, TypeContract,
};
use tracing::trace;

impl Compilation {
    pub fn method_contract_has_errors(&self, contract: &MethodContract) -> bool {
        self.try_method_contract_has_errors(contract).unwrap_or(false)
    }

    pub fn loop_contract_has_errors(&self, contract: &LoopContract) -> bool {
        self.try_loop_contract_has_errors(contract).unwrap_or(false)
    }

    pub fn type_contract_has_errors(&self, contract: &TypeContract) -> bool {
        self.try_type_contract_has_errors(contract).unwrap_or(false)
    }

    /// Whether one precondition, postcondition or invariant has errors.
    pub fn condition_has_errors(&self, element: &dyn ContractElement) -> bool {
        self.try_condition_has_errors(element).unwrap_or(false)
    }

    pub(crate) fn try_method_contract_has_errors(&self, contract: &MethodContract) -> Lookup<bool> {
        contract
            .errors_cache()
            .try_get_or_init_locked(self.build_lock(), || {
                let none = Locals::default();
                let mut errors = false;
                for pre in &contract.preconditions {
                    errors |= self.try_condition_has_errors(pre.as_ref())?;
                    errors |= self.try_out_parameters_in_precondition(pre.condition())?;
                    if let Some(exception) = &pre.exception_to_throw {
                        errors |= self.try_expr_has_errors(exception, NameRole::Type, &none)?;
                    }
                }
                for post in &contract.postconditions {
                    errors |= self.try_condition_has_errors(post.as_ref())?;
                }
                for thrown in &contract.thrown_exceptions {
                    errors |= self.try_expr_has_errors(&thrown.exception_type, NameRole::Type, &none)?;
                    errors |= self.try_condition_has_errors(&thrown.postcondition)?;
                }
                errors |= self.try_location_set_has_errors(&contract.reads, "reads")?;
                errors |= self.try_location_set_has_errors(&contract.writes, "writes")?;
                for expr in contract
                    .allocates
                    .iter()
                    .chain(&contract.frees)
                    .chain(&contract.modified_variables)
                    .chain(&contract.variants)
                {
                    errors |= self.try_expr_has_errors(expr, NameRole::Value, &none)?;
                }
                trace!(scope = ?contract.scope(), errors, "method contract checked");
                Ok(errors)
            })
            .copied()
    }

    pub(crate) fn try_loop_contract_has_errors(&self, contract: &LoopContract) -> Lookup<bool> {
        contract
            .errors_cache()
            .try_get_or_init_locked(self.build_lock(), || {
                let none = Locals::default();
                let mut errors = false;
                for invariant in &contract.invariants {
                    errors |= self.try_condition_has_errors(invariant.as_ref())?;
                }
                errors |= self.try_location_set_has_errors(&contract.writes, "writes")?;
                for variant in &contract.variants {
                    errors |= self.try_expr_has_errors(variant, NameRole::Value, &none)?;
                }
                Ok(errors)
            })
            .copied()
    }

    pub(crate) fn try_type_contract_has_errors(&self, contract: &TypeContract) -> Lookup<bool> {
        contract
            .errors_cache()
            .try_get_or_init_locked(self.build_lock(), || {
                let mut errors = false;
                for invariant in &contract.invariants {
                    errors |= self.try_condition_has_errors(invariant.as_ref())?;
                }
                for &decl in contract.contract_fields.iter().chain(&contract.contract_methods) {
                    errors |= self.try_has_errors(decl)?;
                }
                Ok(errors)
            })
            .copied()
    }

    pub(crate) fn try_condition_has_errors(&self, element: &dyn ContractElement) -> Lookup<bool> {
        let condition = element.contract_condition();
        condition
            .errors_cache()
            .try_get_or_init_locked(self.build_lock(), || {
                let expr = condition.condition();
                let mut errors = self.try_expr_has_errors(expr, NameRole::Value, &Locals::default())?;
                if !self.is_assignable(self.try_type_of(expr)?, TypeRef::BOOLEAN) {
                    self.report_code(element.location(), codes::CONDITION_NOT_BOOLEAN, &[]);
                    errors = true;
                }
                if self.try_has_side_effects(expr)? {
                    self.report_code(element.location(), codes::CONDITION_HAS_SIDE_EFFECTS, &[]);
                    errors = true;
                }
                trace!(kind = ?element.element_kind(), errors, "contract condition checked");
                Ok(errors)
            })
            .copied()
    }

    /// Syntactic side effects, or a call to a method that is not pure.
    fn try_has_side_effects(&self, expr: &Expr) -> Lookup<bool> {
        if expr.has_syntactic_side_effect() {
            return Ok(true);
        }
        let mut calls = expr.calls();
        if matches!(expr.kind, ExprKind::Call { .. } | ExprKind::ResolvedCall { .. }) {
            calls.insert(0, expr.clone());
        }
        for call in calls {
            let target = match &call.kind {
                ExprKind::ResolvedCall { method, .. } => match method {
                    MethodRef::Member(member) => Some(*member),
                    MethodRef::BuiltinConstructor(_) => None,
                },
                ExprKind::Call { callee, .. } => match self.try_resolve_in(callee, NameRole::Value)? {
                    Resolved::Member(member) => Some(member),
                    _ => None,
                },
                _ => None,
            };
            let pure = target
                .and_then(|member| self.member(member))
                .is_some_and(|member| member.is_pure(self));
            if !pure {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Reports every reference to an `out` parameter in a precondition.
    fn try_out_parameters_in_precondition(&self, expr: &Expr) -> Lookup<bool> {
        let mut errors = false;
        if let ExprKind::Name { name, type_args } = &expr.kind
            && type_args.is_empty()
            && let Resolved::Parameter(param) = self.try_resolve_in(expr, NameRole::Value)?
            && self
                .arena()
                .node(param)
                .as_parameter()
                .is_some_and(|p| p.modifier == ParameterModifier::Out)
        {
            let text = self.name(*name);
            self.report_code(expr.location, codes::OUT_PARAMETER_IN_PRECONDITION, &[&text]);
            errors = true;
        }
        for child in expr.children() {
            errors |= self.try_out_parameters_in_precondition(&child)?;
        }
        Ok(errors)
    }

    /// Literals, enum values and constant fields cannot be locations.
    fn try_location_set_has_errors(&self, set: &[Expr], clause: &str) -> Lookup<bool> {
        let none = Locals::default();
        let mut errors = false;
        for expr in set {
            errors |= self.try_expr_has_errors(expr, NameRole::Value, &none)?;
            if self.try_is_constant(expr)? {
                self.report_code(expr.location, codes::CONSTANT_IN_LOCATION_SET, &[clause]);
                errors = true;
            }
        }
        Ok(errors)
    }

    fn try_is_constant(&self, expr: &Expr) -> Lookup<bool> {
        if expr.is_literal() {
            return Ok(true);
        }
        if expr.simple_name().is_none() {
            return Ok(false);
        }
        let Resolved::Member(member) = self.try_resolve_in(expr, NameRole::Value)? else {
            return Ok(false);
        };
        let Some(def) = self.member(member) else {
            return Ok(false);
        };
        Ok(match def.kind {
            MemberKind::EnumValue => true,
            MemberKind::Field => def.declarations().into_iter().any(|decl| {
                matches!(&self.arena().node(decl).kind, DeclKind::Field(field) if field.is_const())
            }),
            _ => false,
        })
    }
}

#[cfg(test)]
#[path = "../tests/contracts_tests.rs"]
mod tests;
