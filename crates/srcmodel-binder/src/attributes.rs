//! Custom attribute folds.
//!
//! Source attributes are resolved to their attribute type (trying the
//! written name, then the name with an `Attribute` suffix) and, for
//! attribute types defined in source, to an applicable constructor.
//! Attributes whose type does not resolve are reported and left out.

use crate::compilation::{Compilation, Lookup};
use crate::members::MemberDefinition;
use crate::namespaces::{NamespaceMember, UnitNamespace};
use crate::resolver::NameRole;
use crate::types::NamedTypeDefinition;
use srcmodel_common::diagnostics::codes;
use srcmodel_common::{BuiltinType, MemberDefId, Resolved, SourceLocation, TypeRef};
use srcmodel_syntax::{
    AttributeTarget, DeclKind, Expr, ExprKind, Expression, SourceAttribute,
};
use std::sync::Arc;
use tracing::debug;

/// A resolved custom attribute.
#[derive(Clone, Debug)]
pub struct CustomAttribute {
    pub attribute_type: TypeRef,
    /// The constructor chosen for the arguments; `None` for platform
    /// attribute types.
    pub constructor: Option<MemberDefId>,
    pub args: Vec<Expr>,
    pub target: AttributeTarget,
    pub location: SourceLocation,
}

impl CustomAttribute {
    fn extension(target: AttributeTarget) -> Self {
        CustomAttribute {
            attribute_type: TypeRef::Builtin(BuiltinType::ExtensionAttribute),
            constructor: None,
            args: Vec::new(),
            target,
            location: SourceLocation::SYNTHETIC,
        }
    }

    pub fn is_extension(&self) -> bool {
        self.attribute_type == TypeRef::Builtin(BuiltinType::ExtensionAttribute)
    }
}

impl Compilation {
    /// The attribute type an attribute names: `X`, then `XAttribute`.
    pub(crate) fn try_resolve_attribute_type(&self, attribute: &SourceAttribute) -> Lookup<TypeRef> {
        let written = &attribute.attribute_type;
        if let Resolved::Type(ty) = self.try_resolve_in(written, NameRole::Type)?
            && !ty.is_error()
        {
            return Ok(ty);
        }
        let Some(suffixed) = self.with_attribute_suffix(written) else {
            return Ok(TypeRef::Error);
        };
        self.try_resolve_type(&suffixed)
    }

    fn with_attribute_suffix(&self, expr: &Expr) -> Option<Expr> {
        let scope = expr.scope()?;
        let suffixed = |name| self.names().intern(&format!("{}Attribute", self.name(name)));
        let kind = match &expr.kind {
            ExprKind::Name { name, type_args } if type_args.is_empty() => ExprKind::Name {
                name: suffixed(*name),
                type_args: Vec::new(),
            },
            ExprKind::Qualified {
                qualifier,
                name,
                type_args,
            } if type_args.is_empty() => ExprKind::Qualified {
                qualifier: Arc::clone(qualifier),
                name: suffixed(*name),
                type_args: Vec::new(),
            },
            _ => return None,
        };
        Some(Expression::new_in_scope(kind, expr.location, scope))
    }

    fn try_resolve_attribute(&self, attribute: &SourceAttribute) -> Lookup<Option<CustomAttribute>> {
        let ty = self.try_resolve_attribute_type(attribute)?;
        if ty.is_error() {
            let text = self.expr_text(&attribute.attribute_type);
            self.report_code(attribute.location, codes::ATTRIBUTE_TYPE_NOT_FOUND, &[&text]);
            return Ok(None);
        }
        let constructor = match self.definition_of(ty) {
            Some(def) => {
                let candidates: Vec<MemberDefId> =
                    def.constructors(self).into_iter().map(|c| c.id).collect();
                let chosen = self
                    .overload_resolver()
                    .select(self, &candidates, &attribute.args);
                if chosen.is_none() {
                    let name = def.full_name(self);
                    let count = attribute.args.len().to_string();
                    self.report_code(
                        attribute.location,
                        codes::NO_APPLICABLE_ATTRIBUTE_CONSTRUCTOR,
                        &[&name, &count],
                    );
                }
                chosen
            }
            None => None,
        };
        Ok(Some(CustomAttribute {
            attribute_type: ty,
            constructor,
            args: attribute.args.clone(),
            target: attribute.target,
            location: attribute.location,
        }))
    }

    fn try_resolve_attributes<'a>(
        &self,
        attributes: impl IntoIterator<Item = &'a SourceAttribute>,
    ) -> Lookup<Vec<CustomAttribute>> {
        let mut out = Vec::new();
        for attribute in attributes {
            if let Some(resolved) = self.try_resolve_attribute(attribute)? {
                out.push(resolved);
            }
        }
        Ok(out)
    }

    /// Assembly-targeted attributes of every namespace declaration, plus
    /// `ExtensionAttribute` when some type declares extension methods.
    pub fn assembly_attributes(&self) -> Vec<CustomAttribute> {
        self.assembly_attributes
            .get_or_try_init_locked(self.build_lock(), || {
                let mut out = self.unit_attributes(AttributeTarget::Assembly);
                let global = self.global_namespace();
                let has_extensions = global
                    .all_types(self)
                    .into_iter()
                    .filter_map(|id| self.type_def(id))
                    .any(|def| def.has_extension_method(self));
                if has_extensions && !out.iter().any(CustomAttribute::is_extension) {
                    out.push(CustomAttribute::extension(AttributeTarget::Assembly));
                }
                out
            })
            .cloned()
            .unwrap_or_default()
    }

    /// Module-targeted attributes of every namespace declaration.
    pub fn module_attributes(&self) -> Vec<CustomAttribute> {
        self.module_attributes
            .get_or_try_init_locked(self.build_lock(), || {
                self.unit_attributes(AttributeTarget::Module)
            })
            .cloned()
            .unwrap_or_default()
    }

    fn unit_attributes(&self, target: AttributeTarget) -> Vec<CustomAttribute> {
        let mut out = Vec::new();
        let mut pending = vec![self.global_namespace()];
        while let Some(ns) = pending.pop() {
            out.extend(
                ns.attributes(self)
                    .into_iter()
                    .filter(|a| a.target == target),
            );
            // reversed so namespaces are visited in declaration order
            let nested: Vec<_> = ns
                .members(self)
                .into_iter()
                .filter_map(|m| match m {
                    NamespaceMember::Namespace(id) => self.namespace(id),
                    NamespaceMember::Type(_) => None,
                })
                .collect();
            pending.extend(nested.into_iter().rev());
        }
        debug!(?target, count = out.len(), "unit attributes folded");
        out
    }
}

impl UnitNamespace {
    /// Attributes of every declaration of this namespace, in order.
    pub fn attributes(&self, comp: &Compilation) -> Vec<CustomAttribute> {
        self.attributes
            .try_get_or_init_locked(comp.build_lock(), || {
                let mut out = Vec::new();
                for decl in self.declarations() {
                    let node = comp.arena().node(decl);
                    if let Some(ns) = node.as_namespace() {
                        out.extend(comp.try_resolve_attributes(&ns.attributes)?);
                    }
                }
                Ok(out)
            })
            .cloned()
            .unwrap_or_default()
    }
}

impl NamedTypeDefinition {
    /// Attributes of every declaration, plus `ExtensionAttribute` when the
    /// type declares extension methods.
    pub fn attributes(&self, comp: &Compilation) -> Vec<CustomAttribute> {
        self.attributes
            .try_get_or_init_locked(comp.build_lock(), || {
                let mut out = Vec::new();
                for decl in self.declarations() {
                    let node = comp.arena().node(decl);
                    if let Some(ty) = node.as_type() {
                        out.extend(comp.try_resolve_attributes(&ty.attributes)?);
                    }
                }
                if self.has_extension_method(comp) && !out.iter().any(CustomAttribute::is_extension) {
                    out.push(CustomAttribute::extension(AttributeTarget::Type));
                }
                Ok(out)
            })
            .cloned()
            .unwrap_or_default()
    }
}

impl MemberDefinition {
    /// Attributes of every declaration of the member, in order.
    pub fn attributes(&self, comp: &Compilation) -> Vec<CustomAttribute> {
        self.attributes
            .try_get_or_init_locked(comp.build_lock(), || {
                let mut out = Vec::new();
                for decl in self.declarations() {
                    let node = comp.arena().node(decl);
                    let attributes = match &node.kind {
                        DeclKind::Field(field) => &field.attributes,
                        DeclKind::EnumMember(member) => &member.attributes,
                        DeclKind::Method(method) => &method.attributes,
                        DeclKind::Property(prop) => &prop.attributes,
                        DeclKind::Event(event) => &event.attributes,
                        _ => continue,
                    };
                    out.extend(comp.try_resolve_attributes(attributes)?);
                }
                if self.is_extension() && !out.iter().any(CustomAttribute::is_extension) {
                    out.push(CustomAttribute::extension(AttributeTarget::Method));
                }
                Ok(out)
            })
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "../tests/attributes_tests.rs"]
mod tests;
