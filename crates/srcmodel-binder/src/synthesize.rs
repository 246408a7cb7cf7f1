//! Members the engine adds to a type's member list.
//!
//! Synthesized methods are real declarations: they are allocated in the
//! arena, bound to the type's primary declaration and aggregated into
//! member definitions flagged `synthesized`. They run once, at the end of
//! the member fold.

use crate::compilation::{Compilation, Lookup};
use crate::members::{MemberDefinition, MemberKind};
use crate::types::{NamedTypeDefinition, TypeMember};
use srcmodel_common::diagnostics::codes;
use srcmodel_common::limits;
use srcmodel_common::{Atom, BuiltinType, DeclId, MemberDefId, SourceLocation, TypeRef};
use srcmodel_syntax::{
    Block, DeclKind, Expr, ExprKind, Expression, MethodDecl, MethodDeclParts, MethodRef,
    Modifiers, ParameterDecl, ParameterModifier, Statement, StmtKind, TypeKind, Unbound,
};
use tracing::debug;

/// Static constructor, default constructor and delegate members for
/// `def`, in that order. `declared` is the already folded member list.
pub(crate) fn synthesized_members(
    comp: &Compilation,
    def: &NamedTypeDefinition,
    declared: &[TypeMember],
) -> Lookup<Vec<MemberDefId>> {
    let Some(primary) = def.primary_declaration() else {
        return Ok(Vec::new());
    };
    let synth = Synthesizer {
        comp,
        def,
        primary,
        location: comp.arena().node(primary).location,
    };
    let declared: Vec<_> = declared
        .iter()
        .filter_map(|m| m.as_member())
        .filter_map(|id| comp.member(id))
        .collect();

    let mut out = Vec::new();
    match def.kind() {
        Some(TypeKind::Delegate) => out.extend(synth.delegate_members()),
        Some(TypeKind::Enum) | Some(TypeKind::Interface) | None => {}
        Some(kind) => {
            let has_static_ctor = declared.iter().any(|m| {
                m.kind == MemberKind::StaticConstructor && m.parameters(comp).is_empty()
            });
            if !has_static_ctor && let Some(cctor) = synth.static_constructor() {
                out.push(cctor);
            }
            let has_ctor = declared.iter().any(|m| m.kind == MemberKind::Constructor);
            if kind == TypeKind::Class && !has_ctor {
                out.push(synth.default_constructor()?);
            }
        }
    }
    Ok(out)
}

struct Synthesizer<'c> {
    comp: &'c Compilation,
    def: &'c NamedTypeDefinition,
    primary: DeclId,
    location: SourceLocation,
}

impl Synthesizer<'_> {
    fn atom(&self, text: &str) -> Atom {
        self.comp.names().intern(text)
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        Expression::new(kind, self.location)
    }

    fn builtin(&self, ty: BuiltinType) -> Expr {
        self.expr(ExprKind::Builtin(ty))
    }

    fn parameter(&self, name: &str, index: u16, ty: BuiltinType) -> Unbound {
        let param = ParameterDecl {
            name: self.atom(name),
            index,
            ty: self.builtin(ty),
            modifier: ParameterModifier::None,
            default_value: None,
            attributes: Vec::new(),
        };
        self.comp
            .arena()
            .alloc(DeclKind::Parameter(param), self.location)
    }

    /// Allocate, bind and aggregate one synthesized method.
    fn add_method(&self, name: &str, parts: MethodDeclParts) -> MemberDefId {
        let comp = self.comp;
        let name = self.atom(name);
        let method = MethodDecl::new(name, parts);
        let unbound = comp.arena().alloc(DeclKind::Method(method), self.location);
        let decl = comp.arena().bind(unbound, self.primary, true);
        let kind = crate::members::method_kind(comp, name);
        let member = comp
            .store()
            .register_member(|id| MemberDefinition::new(id, kind, name, self.def.id, None, true));
        member.add_declaration(comp, decl);
        debug!(
            type_def = self.def.id.0,
            member = member.id.0,
            name = &*comp.name(name),
            "synthesized member"
        );
        member.id
    }

    /// `.cctor` running the initializers of static non-constant fields,
    /// if there are any.
    fn static_constructor(&self) -> Option<MemberDefId> {
        let comp = self.comp;
        let mut statements = Vec::new();
        for decl in self.def.declarations() {
            for member in comp.arena().members_of(decl) {
                let node = comp.arena().node(member);
                let DeclKind::Field(field) = &node.kind else {
                    continue;
                };
                let Some(initializer) = &field.initializer else {
                    continue;
                };
                if !field.is_static() || field.is_const() {
                    continue;
                }
                let target = Expression::new(
                    ExprKind::Name {
                        name: field.name,
                        type_args: Vec::new(),
                    },
                    node.location,
                );
                let assign = Expression::new(
                    ExprKind::Assign {
                        target,
                        value: initializer.deep_copy(),
                    },
                    node.location,
                );
                statements.push(Statement::expression(assign));
            }
        }
        if statements.is_empty() {
            return None;
        }
        Some(self.add_method(
            ".cctor",
            MethodDeclParts {
                modifiers: Modifiers::PUBLIC
                    | Modifiers::STATIC
                    | Modifiers::SPECIAL_NAME
                    | Modifiers::COMPILER_GENERATED,
                generic_params: Vec::new(),
                parameters: Vec::new(),
                return_type: self.builtin(BuiltinType::Void),
                body: Some(Block::new(statements)),
                contract: None,
                attributes: Vec::new(),
            },
        ))
    }

    /// Public parameterless `.ctor` chaining to the base class's
    /// parameterless constructor.
    fn default_constructor(&self) -> Lookup<MemberDefId> {
        let mut statements = vec![Statement::new(StmtKind::FieldInitializers, self.location)];
        if let Some(method) = self.base_constructor()? {
            let call = self.expr(ExprKind::ResolvedCall {
                method,
                receiver: Some(self.expr(ExprKind::This)),
                args: Vec::new(),
            });
            statements.push(Statement::expression(call));
        }
        Ok(self.add_method(
            ".ctor",
            MethodDeclParts {
                modifiers: Modifiers::PUBLIC | Modifiers::SPECIAL_NAME | Modifiers::COMPILER_GENERATED,
                generic_params: Vec::new(),
                parameters: Vec::new(),
                return_type: self.builtin(BuiltinType::Void),
                body: Some(Block::new(statements)),
                contract: None,
                attributes: Vec::new(),
            },
        ))
    }

    /// The parameterless constructor of the base class. `None` (reported)
    /// when a source base class has none.
    fn base_constructor(&self) -> Lookup<Option<MethodRef>> {
        let comp = self.comp;
        let base = self.def.try_base_class(comp)?;
        let base_def = match base {
            None | Some(TypeRef::Error) | Some(TypeRef::GenericParam(_)) => {
                return Ok(Some(MethodRef::BuiltinConstructor(BuiltinType::Object)));
            }
            Some(TypeRef::Builtin(builtin)) => {
                return Ok(Some(MethodRef::BuiltinConstructor(builtin)));
            }
            Some(other) => comp.definition_of(other),
        };
        let Some(base_def) = base_def else {
            return Ok(Some(MethodRef::BuiltinConstructor(BuiltinType::Object)));
        };
        let ctor_name = self.atom(".ctor");
        let found = base_def
            .try_members_named(comp, ctor_name)?
            .into_iter()
            .filter_map(TypeMember::as_member)
            .filter_map(|id| comp.member(id))
            .find(|m| m.kind == MemberKind::Constructor && m.parameters(comp).is_empty());
        match found {
            Some(ctor) => Ok(Some(MethodRef::Member(ctor.id))),
            None => {
                let base_name = base_def.full_name(comp);
                comp.report_code(
                    self.def.location(comp),
                    codes::MISSING_BASE_CONSTRUCTOR,
                    &[&base_name],
                );
                Ok(None)
            }
        }
    }

    /// `.ctor(object, IntPtr)`, `Invoke`, `BeginInvoke` and `EndInvoke`
    /// from the invoke signature of the first delegate declaration.
    fn delegate_members(&self) -> Vec<MemberDefId> {
        let comp = self.comp;
        let signature_decl = self
            .def
            .declarations()
            .into_iter()
            .find(|&d| comp.arena().node(d).as_type().is_some_and(|t| t.invoke.is_some()));
        let Some(signature_decl) = signature_decl else {
            debug!(type_def = self.def.id.0, "delegate without an invoke signature");
            return Vec::new();
        };
        let node = comp.arena().node(signature_decl);
        let Some(signature) = node.as_type().and_then(|t| t.invoke.as_ref()) else {
            return Vec::new();
        };
        let copy_params = || -> Vec<Unbound> {
            signature
                .parameters
                .iter()
                .map(|&p| comp.arena().copy_unbound(p))
                .collect()
        };
        let empty_body = || Some(Block::new(Vec::new()));
        let virtual_public = Modifiers::PUBLIC | Modifiers::VIRTUAL | Modifiers::COMPILER_GENERATED;

        let ctor = self.add_method(
            ".ctor",
            MethodDeclParts {
                modifiers: Modifiers::PUBLIC | Modifiers::SPECIAL_NAME | Modifiers::COMPILER_GENERATED,
                generic_params: Vec::new(),
                parameters: vec![
                    self.parameter("object", 0, BuiltinType::Object),
                    self.parameter("method", 1, BuiltinType::IntPtr),
                ],
                return_type: self.builtin(BuiltinType::Void),
                body: empty_body(),
                contract: None,
                attributes: Vec::new(),
            },
        );
        let invoke = self.add_method(
            "Invoke",
            MethodDeclParts {
                modifiers: virtual_public,
                generic_params: Vec::new(),
                parameters: copy_params(),
                return_type: signature.return_type.deep_copy(),
                body: empty_body(),
                contract: None,
                attributes: Vec::new(),
            },
        );
        let count = signature.parameters.len();
        let (Some(callback_index), Some(object_index)) =
            (limits::parameter_index(count), limits::parameter_index(count + 1))
        else {
            let name = self.def.full_name(comp);
            let limit = limits::MAX_PARAMETER_COUNT.to_string();
            comp.report_code(self.location, codes::TOO_MANY_PARAMETERS, &[&name, &limit]);
            return vec![ctor, invoke];
        };
        let mut begin_params = copy_params();
        begin_params.push(self.parameter("callback", callback_index, BuiltinType::AsyncCallback));
        begin_params.push(self.parameter("object", object_index, BuiltinType::Object));
        let begin_invoke = self.add_method(
            "BeginInvoke",
            MethodDeclParts {
                modifiers: virtual_public,
                generic_params: Vec::new(),
                parameters: begin_params,
                return_type: self.builtin(BuiltinType::IAsyncResult),
                body: empty_body(),
                contract: None,
                attributes: Vec::new(),
            },
        );
        let end_invoke = self.add_method(
            "EndInvoke",
            MethodDeclParts {
                modifiers: virtual_public,
                generic_params: Vec::new(),
                parameters: vec![self.parameter("result", 0, BuiltinType::IAsyncResult)],
                return_type: self.builtin(BuiltinType::Void),
                body: empty_body(),
                contract: None,
                attributes: Vec::new(),
            },
        );
        vec![ctor, invoke, begin_invoke, end_invoke]
    }
}

#[cfg(test)]
#[path = "../tests/synthesize_tests.rs"]
mod tests;
