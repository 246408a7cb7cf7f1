//! Generic parameters and generic instances.
//!
//! Partial declarations of one generic type (and the defining and
//! implementing halves of a partial method) each declare their own
//! generic parameter list. The unifier folds them positionally into one
//! `GenericParameter` per index: the first declaration fixes name,
//! variance and special constraints, every declaration attaches, and the
//! constraint type list is the de-duplicated union in first-seen order.

use crate::compilation::{Compilation, Lookup};
use srcmodel_common::diagnostics::codes;
use srcmodel_common::limits;
use srcmodel_common::{
    Atom, DeclId, GenericParamId, InstanceId, LazyCache, MemberDefId, TypeDefId, TypeRef,
};
use srcmodel_syntax::{GenericConstraints, Variance};
use std::sync::{PoisonError, RwLock};
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    Type(TypeDefId),
    Method(MemberDefId),
}

pub struct GenericParameter {
    pub id: GenericParamId,
    pub owner: GenericOwner,
    pub name: Atom,
    pub index: u16,
    pub variance: Variance,
    pub special: GenericConstraints,
    declarations: RwLock<Vec<DeclId>>,
    constraints: LazyCache<Vec<TypeRef>>,
}

impl GenericParameter {
    pub(crate) fn new(
        id: GenericParamId,
        owner: GenericOwner,
        name: Atom,
        index: u16,
        variance: Variance,
        special: GenericConstraints,
    ) -> Self {
        GenericParameter {
            id,
            owner,
            name,
            index,
            variance,
            special,
            declarations: RwLock::new(Vec::new()),
            constraints: LazyCache::new(),
        }
    }

    pub fn declarations(&self) -> Vec<DeclId> {
        self.declarations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn attach(&self, decl: DeclId) -> bool {
        let mut decls = self
            .declarations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if decls.contains(&decl) {
            return false;
        }
        decls.push(decl);
        true
    }

    pub fn has_reference_type_constraint(&self) -> bool {
        self.special.contains(GenericConstraints::REFERENCE_TYPE)
    }

    pub fn has_value_type_constraint(&self) -> bool {
        self.special.contains(GenericConstraints::VALUE_TYPE)
    }

    pub fn has_default_constructor_constraint(&self) -> bool {
        self.special.contains(GenericConstraints::DEFAULT_CONSTRUCTOR)
    }

    /// Resolved constraint types of every declaration, first-seen order,
    /// without duplicates. Unresolved constraints become `TypeRef::Error`.
    pub fn constraints(&self, comp: &Compilation) -> Vec<TypeRef> {
        self.try_constraints(comp).unwrap_or_default()
    }

    pub(crate) fn try_constraints(&self, comp: &Compilation) -> Lookup<Vec<TypeRef>> {
        self.constraints
            .try_get_or_init_locked(comp.build_lock(), || {
                let mut out: Vec<TypeRef> = Vec::new();
                for decl in self.declarations() {
                    let node = comp.arena().node(decl);
                    let Some(param) = node.as_generic_parameter() else {
                        continue;
                    };
                    for constraint in &param.constraints {
                        let ty = comp.try_resolve_type(constraint)?;
                        if !out.contains(&ty) {
                            out.push(ty);
                        }
                    }
                }
                Ok(out)
            })
            .cloned()
    }
}

impl std::fmt::Debug for GenericParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericParameter")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("index", &self.index)
            .field("declarations", &self.declarations())
            .finish()
    }
}

/// A generic type applied to type arguments. Interned per compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericInstance {
    pub id: InstanceId,
    pub generic: TypeDefId,
    pub args: Vec<TypeRef>,
}

/// Whether a later declaration spells out variance or special
/// constraints that differ from the ones the parameter was created with.
/// A declaration that leaves them out agrees with any earlier one.
fn restates_differently(
    param: &GenericParameter,
    variance: Variance,
    special: GenericConstraints,
) -> bool {
    let variance_conflict = variance != Variance::Invariant
        && param.variance != Variance::Invariant
        && variance != param.variance;
    let special_conflict =
        !special.is_empty() && !param.special.is_empty() && special != param.special;
    variance_conflict || special_conflict
}

/// Fold the generic parameter declarations `decls` of one more declaration
/// of `owner` into `params`.
///
/// Must run under the build lock; `params` is the owner's parameter list
/// and only ever grows.
pub(crate) fn unify_generic_params(
    comp: &Compilation,
    owner: GenericOwner,
    owner_name: Atom,
    params: &mut Vec<GenericParamId>,
    decls: &[DeclId],
) {
    for (index, &decl) in decls.iter().enumerate() {
        let node = comp.arena().node(decl);
        let Some(param_decl) = node.as_generic_parameter() else {
            continue;
        };
        let existing = params.get(index).and_then(|&id| comp.generic_param(id));
        let param = match existing {
            Some(param) => {
                if restates_differently(&param, param_decl.variance, param_decl.special)
                    && comp.options().report_generic_conflicts
                {
                    let owner_text = comp.name(owner_name);
                    let index_text = index.to_string();
                    comp.report_code(
                        node.location,
                        codes::CONFLICTING_GENERIC_PARAMETER,
                        &[&owner_text, &index_text],
                    );
                }
                param
            }
            None => {
                let Some(position) = limits::parameter_index(index) else {
                    let owner_text = comp.name(owner_name);
                    let limit = limits::MAX_PARAMETER_COUNT.to_string();
                    comp.report_code(
                        node.location,
                        codes::TOO_MANY_PARAMETERS,
                        &[&owner_text, &limit],
                    );
                    break;
                };
                let param = comp.store().register_generic_param(|id| {
                    GenericParameter::new(
                        id,
                        owner,
                        param_decl.name,
                        position,
                        param_decl.variance,
                        param_decl.special,
                    )
                });
                params.push(param.id);
                param
            }
        };
        if param.attach(decl) {
            trace!(?decl, param = param.id.0, index, "generic parameter declaration attached");
        }
        comp.record_generic_decl(decl, param.id);
    }
}

#[cfg(test)]
#[path = "../tests/generics_tests.rs"]
mod tests;
