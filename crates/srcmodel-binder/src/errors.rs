//! `has_errors` folds over declarations and expressions.
//!
//! Each fold is cached on the node under the build lock and reports what it
//! finds exactly once. Every child is evaluated even after an error was
//! found, so one pass reports everything.

use crate::compilation::{Compilation, Lookup};
use crate::resolver::NameRole;
use rustc_hash::FxHashSet;
use srcmodel_common::diagnostics::codes;
use srcmodel_common::{Atom, DeclId, Resolved, TypeRef};
use srcmodel_syntax::{Block, DeclKind, Declaration, Expr, ExprKind, SourceAttribute, StmtKind};
use tracing::trace;

/// Names of locals declared in a method body. The scope chain does not see
/// them, so a value name matching one is not reported.
pub(crate) type Locals = FxHashSet<Atom>;

impl Compilation {
    /// Whether the declaration or anything it owns has errors. Errors are
    /// reported the first time this is asked.
    pub fn has_errors(&self, decl: DeclId) -> bool {
        self.try_has_errors(decl).unwrap_or(false)
    }

    pub(crate) fn try_has_errors(&self, decl: DeclId) -> Lookup<bool> {
        let node = self.arena().node(decl);
        node.errors_cache()
            .try_get_or_init_locked(self.build_lock(), || {
                let errors = self.fold_declaration_errors(decl, &node)?;
                trace!(?decl, kind = node.kind_name(), errors, "declaration errors folded");
                Ok(errors)
            })
            .copied()
    }

    fn fold_declaration_errors(&self, decl: DeclId, node: &Declaration) -> Lookup<bool> {
        let none = Locals::default();
        let mut errors = false;
        match &node.kind {
            DeclKind::Namespace(ns) => {
                if let Some(def) = self.try_namespace_def_of(decl)?.and_then(|id| self.namespace(id)) {
                    def.attributes(self);
                }
                errors |= self.try_attributes_have_errors(&ns.attributes, false)?;
                for member in self.arena().members_of(decl) {
                    errors |= self.try_has_errors(member)?;
                }
            }
            DeclKind::Alias(_) => {
                errors |= matches!(
                    self.try_alias_target(decl)?,
                    Resolved::Nothing | Resolved::Type(TypeRef::Error)
                );
            }
            DeclKind::Import(_) => {
                errors |= self.try_import_target(decl)?.is_none();
            }
            DeclKind::Type(ty) => {
                if let Some(def) = self.try_type_def_of(decl)?.and_then(|id| self.type_def(id)) {
                    // base class and member folds report their own diagnostics
                    def.try_base_class(self)?;
                    def.try_interfaces(self)?;
                    def.try_members(self)?;
                    def.attributes(self);
                }
                for base in &ty.base_types {
                    errors |= self.try_expr_has_errors(base, NameRole::Type, &none)?;
                }
                for &param in &ty.generic_params {
                    errors |= self.try_has_errors(param)?;
                }
                if let Some(underlying) = &ty.underlying_type {
                    errors |= self.try_expr_has_errors(underlying, NameRole::Type, &none)?;
                }
                if let Some(invoke) = &ty.invoke {
                    errors |= self.try_expr_has_errors(&invoke.return_type, NameRole::Type, &none)?;
                    for &param in &invoke.parameters {
                        errors |= self.try_has_errors(param)?;
                    }
                }
                if let Some(contract) = &ty.contract {
                    errors |= self.try_type_contract_has_errors(contract)?;
                }
                errors |= self.try_attributes_have_errors(&ty.attributes, false)?;
                for member in self.arena().members_of(decl) {
                    errors |= self.try_has_errors(member)?;
                }
            }
            DeclKind::Field(field) => {
                self.touch_member_attributes(decl)?;
                errors |= self.try_expr_has_errors(&field.ty, NameRole::Type, &none)?;
                if let Some(init) = &field.initializer {
                    errors |= self.try_expr_has_errors(init, NameRole::Value, &none)?;
                }
                errors |= self.try_attributes_have_errors(&field.attributes, false)?;
            }
            DeclKind::EnumMember(member) => {
                self.touch_member_attributes(decl)?;
                if let Some(init) = &member.initializer {
                    errors |= self.try_expr_has_errors(init, NameRole::Value, &none)?;
                }
                errors |= self.try_attributes_have_errors(&member.attributes, false)?;
            }
            DeclKind::Method(method) => {
                self.touch_member_attributes(decl)?;
                for &param in method.generic_params.iter().chain(&method.parameters) {
                    errors |= self.try_has_errors(param)?;
                }
                errors |= self.try_expr_has_errors(&method.return_type, NameRole::Type, &none)?;
                if let Some(contract) = &method.contract {
                    errors |= self.try_method_contract_has_errors(contract)?;
                }
                if let Some(body) = &method.body {
                    errors |= self.try_body_has_errors(body)?;
                }
                errors |= self.try_attributes_have_errors(&method.attributes, false)?;
            }
            DeclKind::Property(prop) => {
                self.touch_member_attributes(decl)?;
                errors |= self.try_expr_has_errors(&prop.ty, NameRole::Type, &none)?;
                for &param in &prop.parameters {
                    errors |= self.try_has_errors(param)?;
                }
                for accessor in self.arena().property_accessors(decl).iter() {
                    errors |= self.try_has_errors(accessor)?;
                }
                errors |= self.try_attributes_have_errors(&prop.attributes, false)?;
            }
            DeclKind::Event(event) => {
                self.touch_member_attributes(decl)?;
                errors |= self.try_expr_has_errors(&event.ty, NameRole::Type, &none)?;
                for accessor in self.arena().event_accessors(decl).iter() {
                    errors |= self.try_has_errors(accessor)?;
                }
                errors |= self.try_attributes_have_errors(&event.attributes, false)?;
            }
            DeclKind::Parameter(param) => {
                errors |= self.try_expr_has_errors(&param.ty, NameRole::Type, &none)?;
                if let Some(default) = &param.default_value {
                    errors |= self.try_expr_has_errors(default, NameRole::Value, &none)?;
                }
                // parameters have no attribute fold of their own
                errors |= self.try_attributes_have_errors(&param.attributes, true)?;
            }
            DeclKind::GenericParameter(param) => {
                for constraint in &param.constraints {
                    errors |= self.try_expr_has_errors(constraint, NameRole::Type, &none)?;
                }
            }
        }
        Ok(errors)
    }

    /// Runs the attribute fold of the member `decl` belongs to so its
    /// diagnostics are reported.
    fn touch_member_attributes(&self, decl: DeclId) -> Lookup<()> {
        if let Some(member) = self.try_member_def_of(decl)?.and_then(|id| self.member(id)) {
            member.attributes(self);
        }
        Ok(())
    }

    /// Whether any attribute fails to resolve or has no applicable
    /// constructor. With `report`, unresolved attribute types are reported
    /// here; otherwise the definition's attribute fold reports them.
    fn try_attributes_have_errors(&self, attributes: &[SourceAttribute], report: bool) -> Lookup<bool> {
        let none = Locals::default();
        let mut errors = false;
        for attribute in attributes {
            let ty = self.try_resolve_attribute_type(attribute)?;
            if ty.is_error() {
                if report {
                    let text = self.expr_text(&attribute.attribute_type);
                    self.report_code(attribute.location, codes::ATTRIBUTE_TYPE_NOT_FOUND, &[&text]);
                }
                errors = true;
            } else if let Some(def) = self.definition_of(ty) {
                let candidates: Vec<_> = def.constructors(self).into_iter().map(|c| c.id).collect();
                errors |= self
                    .overload_resolver()
                    .select(self, &candidates, &attribute.args)
                    .is_none();
            }
            for arg in &attribute.args {
                errors |= self.try_expr_has_errors(arg, NameRole::Value, &none)?;
            }
        }
        Ok(errors)
    }

    fn try_body_has_errors(&self, body: &Block) -> Lookup<bool> {
        let mut locals = Locals::default();
        collect_locals(body, &mut locals);
        let mut errors = self.try_block_has_errors(body, &locals)?;
        for contract in body.loop_contracts() {
            errors |= self.try_loop_contract_has_errors(&contract)?;
        }
        Ok(errors)
    }

    fn try_block_has_errors(&self, block: &Block, locals: &Locals) -> Lookup<bool> {
        let mut errors = false;
        for statement in &block.statements {
            errors |= match &statement.kind {
                StmtKind::Expression(expr) | StmtKind::Return(Some(expr)) => {
                    self.try_expr_has_errors(expr, NameRole::Value, locals)?
                }
                StmtKind::Local { ty, initializer, .. } => {
                    let mut local = false;
                    if let Some(ty) = ty {
                        local |= self.try_expr_has_errors(ty, NameRole::Type, locals)?;
                    }
                    if let Some(init) = initializer {
                        local |= self.try_expr_has_errors(init, NameRole::Value, locals)?;
                    }
                    local
                }
                StmtKind::Loop { condition, body, .. } => {
                    let mut local = false;
                    if let Some(condition) = condition {
                        local |= self.try_expr_has_errors(condition, NameRole::Value, locals)?;
                    }
                    local | self.try_block_has_errors(body, locals)?
                }
                StmtKind::Block(inner) => self.try_block_has_errors(inner, locals)?,
                StmtKind::Return(None) | StmtKind::FieldInitializers => false,
            };
        }
        Ok(errors)
    }

    /// Whether an expression tree has errors, resolving names in `role`.
    pub(crate) fn try_expr_has_errors(&self, expr: &Expr, role: NameRole, locals: &Locals) -> Lookup<bool> {
        expr.errors_cache()
            .try_get_or_init_locked(self.build_lock(), || self.fold_expr_errors(expr, role, locals))
            .copied()
    }

    fn fold_expr_errors(&self, expr: &Expr, role: NameRole, locals: &Locals) -> Lookup<bool> {
        let mut errors = false;
        match &expr.kind {
            ExprKind::Name { name, type_args } => {
                for arg in type_args {
                    errors |= self.try_expr_has_errors(arg, NameRole::Type, locals)?;
                }
                let local = role == NameRole::Value && type_args.is_empty() && locals.contains(name);
                if !local {
                    errors |= self.try_name_has_errors(expr, role)?;
                }
            }
            ExprKind::Qualified {
                qualifier,
                type_args,
                ..
            } => {
                for arg in type_args {
                    errors |= self.try_expr_has_errors(arg, NameRole::Type, locals)?;
                }
                if self.try_expr_has_errors(qualifier, role, locals)? {
                    errors = true;
                } else {
                    errors |= self.try_name_has_errors(expr, role)?;
                }
            }
            ExprKind::AliasQualified { .. } => errors |= self.try_name_has_errors(expr, NameRole::Type)?,
            ExprKind::Call { callee, args } => {
                errors |= self.try_expr_has_errors(callee, NameRole::Value, locals)?;
                for arg in args {
                    errors |= self.try_expr_has_errors(arg, NameRole::Value, locals)?;
                }
            }
            ExprKind::New { ty, args } => {
                errors |= self.try_expr_has_errors(ty, NameRole::Type, locals)?;
                for arg in args {
                    errors |= self.try_expr_has_errors(arg, NameRole::Value, locals)?;
                }
            }
            ExprKind::Dummy => errors = true,
            _ => {
                for child in expr.children() {
                    errors |= self.try_expr_has_errors(&child, NameRole::Value, locals)?;
                }
            }
        }
        Ok(errors)
    }

    fn try_name_has_errors(&self, expr: &Expr, role: NameRole) -> Lookup<bool> {
        match self.try_resolve_in(expr, role)? {
            Resolved::Nothing => {
                let text = self.expr_text(expr);
                self.report_code(expr.location, codes::NAME_NOT_FOUND, &[&text]);
                Ok(true)
            }
            // an alias whose target failed; reported at the alias
            Resolved::Type(TypeRef::Error) => Ok(true),
            _ => Ok(false),
        }
    }
}

fn collect_locals(block: &Block, out: &mut Locals) {
    for statement in &block.statements {
        match &statement.kind {
            StmtKind::Local { name, .. } => {
                out.insert(*name);
            }
            StmtKind::Loop { body, .. } => collect_locals(body, out),
            StmtKind::Block(inner) => collect_locals(inner, out),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "../tests/errors_tests.rs"]
mod tests;
