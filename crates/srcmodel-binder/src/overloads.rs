//! Overload applicability.
//!
//! The engine only needs to know whether a candidate can take a list of
//! arguments (extension method lookup, attribute constructors) and to pick
//! one applicable candidate. Anything smarter belongs to a real overload
//! resolver plugged in through [`OverloadResolver`].

use crate::compilation::Compilation;
use srcmodel_common::{BuiltinType, MemberDefId, TypeRef};
use srcmodel_syntax::{Expr, ParameterModifier};

pub trait OverloadResolver: Send + Sync {
    /// Whether `method` accepts `args`. For extension methods the receiver
    /// is the first argument.
    fn is_applicable(&self, comp: &Compilation, method: MemberDefId, args: &[Expr]) -> bool;

    /// One applicable candidate, if any.
    fn select(&self, comp: &Compilation, candidates: &[MemberDefId], args: &[Expr]) -> Option<MemberDefId> {
        candidates
            .iter()
            .copied()
            .find(|&candidate| self.is_applicable(comp, candidate, args))
    }
}

/// Arity plus argument type compatibility: identity, a base class, an
/// implemented interface, or `Object`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArityOverloadResolver;

impl OverloadResolver for ArityOverloadResolver {
    fn is_applicable(&self, comp: &Compilation, method: MemberDefId, args: &[Expr]) -> bool {
        let Some(member) = comp.member(method) else {
            return false;
        };
        let params = member.parameters(comp);
        let has_params_array = params.last().is_some_and(|&p| {
            comp.arena()
                .node(p)
                .as_parameter()
                .is_some_and(|p| p.modifier == ParameterModifier::Params)
        });
        let arity_ok = if has_params_array {
            args.len() + 1 >= params.len()
        } else {
            args.len() == params.len()
        };
        if !arity_ok {
            return false;
        }
        args.iter().zip(params.iter()).all(|(arg, &param)| {
            let node = comp.arena().node(param);
            let Some(param) = node.as_parameter() else {
                return false;
            };
            if param.modifier == ParameterModifier::Params {
                return true;
            }
            let target = comp.resolve_type(&param.ty);
            comp.is_assignable(comp.type_of(arg), target)
        })
    }
}

impl Compilation {
    /// Whether a value of type `from` can be passed where `to` is expected.
    /// Error types are compatible with everything.
    pub fn is_assignable(&self, from: TypeRef, to: TypeRef) -> bool {
        if from == to || from.is_error() || to.is_error() || to == TypeRef::OBJECT {
            return true;
        }
        if matches!(to, TypeRef::GenericParam(_)) || matches!(from, TypeRef::GenericParam(_)) {
            return true;
        }
        if from == TypeRef::INT32 && to == TypeRef::Builtin(BuiltinType::Int64) {
            return true;
        }
        if self.base_chain(from).contains(&to) {
            return true;
        }
        self.base_chain(from).into_iter().any(|ty| {
            self.definition_of(ty)
                .is_some_and(|def| def.interfaces(self).contains(&to))
        })
    }
}

#[cfg(test)]
#[path = "../tests/overloads_tests.rs"]
mod tests;
