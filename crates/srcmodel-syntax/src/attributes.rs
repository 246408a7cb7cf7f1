use crate::expr::Expr;
use crate::flags::AttributeTarget;
use srcmodel_common::{DeclId, SourceLocation};

/// A custom attribute as written in source, before its type and
/// constructor are resolved.
#[derive(Debug)]
pub struct SourceAttribute {
    pub target: AttributeTarget,
    pub attribute_type: Expr,
    pub args: Vec<Expr>,
    pub location: SourceLocation,
}

impl SourceAttribute {
    pub fn new(
        target: AttributeTarget,
        attribute_type: Expr,
        args: Vec<Expr>,
        location: SourceLocation,
    ) -> Self {
        SourceAttribute {
            target,
            attribute_type,
            args,
            location,
        }
    }

    pub(crate) fn set_containing_scope(&self, scope: DeclId) {
        self.attribute_type.set_containing_scope(scope);
        for arg in &self.args {
            arg.set_containing_scope(scope);
        }
    }

    pub(crate) fn copy_unbound(&self) -> SourceAttribute {
        SourceAttribute {
            target: self.target,
            attribute_type: self.attribute_type.deep_copy(),
            args: self.args.iter().map(|a| a.deep_copy()).collect(),
            location: self.location,
        }
    }
}
