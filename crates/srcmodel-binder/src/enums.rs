//! Enum member values.
//!
//! Every member of an enum is folded once, in declaration order, under the
//! build lock. Initializers are integer constant expressions over literals,
//! unary and binary operators, other enum members (of this or another
//! enum) and constant fields. A member without an initializer is the
//! previous member plus one.

use crate::compilation::{Compilation, Lookup};
use crate::members::MemberKind;
use crate::resolver::NameRole;
use crate::types::{NamedTypeDefinition, TypeMember};
use rustc_hash::FxHashMap;
use srcmodel_common::diagnostics::codes;
use srcmodel_common::limits::MAX_CONSTANT_EVAL_DEPTH;
use srcmodel_common::{DeclId, MemberDefId, RecursionGuard, RecursionResult, Resolved};
use srcmodel_syntax::{BinaryOp, DeclKind, Expr, ExprKind, Literal, TypeKind, UnaryOp};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConstError {
    NotConstant,
    Cycle,
}

type ConstResult = Result<i64, ConstError>;

struct ConstFolder<'c> {
    comp: &'c Compilation,
    owner: &'c NamedTypeDefinition,
    guard: RecursionGuard<DeclId>,
    values: FxHashMap<DeclId, i64>,
}

impl ConstFolder<'_> {
    /// Value of the declaration `decl` (enum member or constant field).
    fn eval_decl(&mut self, decl: DeclId) -> Lookup<ConstResult> {
        if let Some(&value) = self.values.get(&decl) {
            return Ok(Ok(value));
        }
        let initializer = match &self.comp.arena().node(decl).kind {
            DeclKind::EnumMember(_) => self.comp.arena().enum_member_initializer(decl),
            DeclKind::Field(field) if field.is_const() => field.initializer.clone(),
            _ => None,
        };
        let Some(initializer) = initializer else {
            return Ok(Err(ConstError::NotConstant));
        };
        match self.guard.enter(decl) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return Ok(Err(ConstError::Cycle)),
            RecursionResult::DepthExceeded => return Ok(Err(ConstError::NotConstant)),
        }
        let result = self.eval(&initializer);
        self.guard.leave(decl);
        let result = result?;
        if let Ok(value) = result {
            self.values.insert(decl, value);
        }
        Ok(result)
    }

    fn eval(&mut self, expr: &Expr) -> Lookup<ConstResult> {
        let result = match &expr.kind {
            ExprKind::Literal(Literal::Int(value)) => Ok(*value),
            ExprKind::Literal(Literal::Bool(value)) => Ok(i64::from(*value)),
            ExprKind::Unary { op, operand } => {
                let value = match self.eval(operand)? {
                    Ok(value) => value,
                    err => return Ok(err),
                };
                match op {
                    UnaryOp::Neg => Ok(value.wrapping_neg()),
                    UnaryOp::BitNot => Ok(!value),
                    UnaryOp::Not => Ok(i64::from(value == 0)),
                    _ => Err(ConstError::NotConstant),
                }
            }
            ExprKind::Binary { op, left, right } => {
                let left = match self.eval(left)? {
                    Ok(value) => value,
                    err => return Ok(err),
                };
                let right = match self.eval(right)? {
                    Ok(value) => value,
                    err => return Ok(err),
                };
                fold_binary(*op, left, right).ok_or(ConstError::NotConstant)
            }
            ExprKind::Name { .. } | ExprKind::Qualified { .. } => {
                match self.comp.try_resolve_in(expr, NameRole::Value)? {
                    Resolved::Member(member) => return self.eval_member(member),
                    _ => Err(ConstError::NotConstant),
                }
            }
            _ => Err(ConstError::NotConstant),
        };
        Ok(result)
    }

    fn eval_member(&mut self, member: MemberDefId) -> Lookup<ConstResult> {
        let Some(def) = self.comp.member(member) else {
            return Ok(Err(ConstError::NotConstant));
        };
        let Some(decl) = def.primary_declaration() else {
            return Ok(Err(ConstError::NotConstant));
        };
        match def.kind {
            MemberKind::EnumValue if def.owner == self.owner.id => self.eval_decl(decl),
            MemberKind::EnumValue => {
                let Some(other) = self.comp.type_def(def.owner) else {
                    return Ok(Err(ConstError::NotConstant));
                };
                // another enum folding on this thread means the enums refer
                // to each other
                match other.try_enum_value_map(self.comp) {
                    Ok(values) => Ok(values.get(&member).copied().ok_or(ConstError::NotConstant)),
                    Err(_) => Ok(Err(ConstError::Cycle)),
                }
            }
            MemberKind::Field => self.eval_decl(decl),
            _ => Ok(Err(ConstError::NotConstant)),
        }
    }
}

fn fold_binary(op: BinaryOp, left: i64, right: i64) -> Option<i64> {
    Some(match op {
        BinaryOp::Add => left.wrapping_add(right),
        BinaryOp::Sub => left.wrapping_sub(right),
        BinaryOp::Mul => left.wrapping_mul(right),
        BinaryOp::Div => left.checked_div(right)?,
        BinaryOp::Rem => left.checked_rem(right)?,
        BinaryOp::BitAnd => left & right,
        BinaryOp::BitOr => left | right,
        BinaryOp::BitXor => left ^ right,
        BinaryOp::Shl => left.wrapping_shl(u32::try_from(right).ok()?),
        BinaryOp::Shr => left.wrapping_shr(u32::try_from(right).ok()?),
        BinaryOp::Eq => i64::from(left == right),
        BinaryOp::Ne => i64::from(left != right),
        BinaryOp::Lt => i64::from(left < right),
        BinaryOp::Le => i64::from(left <= right),
        BinaryOp::Gt => i64::from(left > right),
        BinaryOp::Ge => i64::from(left >= right),
        BinaryOp::LogicalAnd => i64::from(left != 0 && right != 0),
        BinaryOp::LogicalOr => i64::from(left != 0 || right != 0),
    })
}

impl NamedTypeDefinition {
    /// Values of the enum's members in declaration order. Empty for
    /// anything that is not an enum.
    pub fn enum_values(&self, comp: &Compilation) -> Vec<(MemberDefId, i64)> {
        let Ok(values) = self.try_enum_value_map(comp) else {
            return Vec::new();
        };
        self.declared_members(comp)
            .into_iter()
            .filter_map(TypeMember::as_member)
            .filter_map(|id| values.get(&id).map(|&v| (id, v)))
            .collect()
    }

    pub fn enum_value(&self, comp: &Compilation, member: MemberDefId) -> Option<i64> {
        self.try_enum_value_map(comp).ok()?.get(&member).copied()
    }

    fn try_enum_value_map(&self, comp: &Compilation) -> Lookup<&FxHashMap<MemberDefId, i64>> {
        self.enum_values.try_get_or_init_locked(comp.build_lock(), || {
            let mut out = FxHashMap::default();
            if self.kind() != Some(TypeKind::Enum) {
                return Ok(out);
            }
            let mut folder = ConstFolder {
                comp,
                owner: self,
                guard: RecursionGuard::new(MAX_CONSTANT_EVAL_DEPTH),
                values: FxHashMap::default(),
            };
            for &member in self.try_declared_members(comp)? {
                let Some(def) = member.as_member().and_then(|id| comp.member(id)) else {
                    continue;
                };
                if def.kind != MemberKind::EnumValue {
                    continue;
                }
                let Some(decl) = def.primary_declaration() else {
                    continue;
                };
                let value = match folder.eval_decl(decl)? {
                    Ok(value) => value,
                    Err(err) => {
                        let code = match err {
                            ConstError::NotConstant => codes::ENUM_INITIALIZER_NOT_CONSTANT,
                            ConstError::Cycle => codes::ENUM_INITIALIZER_CYCLE,
                        };
                        let name = comp.name(def.name);
                        comp.report_code(def.location(comp), code, &[&name]);
                        folder.values.insert(decl, 0);
                        0
                    }
                };
                out.insert(def.id, value);
            }
            debug!(type_def = self.id.0, members = out.len(), "enum values folded");
            Ok(out)
        })
    }
}

impl Compilation {
    /// Value of an enum member, `None` for anything else.
    pub fn enum_value(&self, member: MemberDefId) -> Option<i64> {
        let def = self.member(member)?;
        if def.kind != MemberKind::EnumValue {
            return None;
        }
        self.type_def(def.owner)?.enum_value(self, member)
    }
}

#[cfg(test)]
#[path = "../tests/enums_tests.rs"]
mod tests;
