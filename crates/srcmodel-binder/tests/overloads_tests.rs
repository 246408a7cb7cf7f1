use super::*;
use crate::test_fixtures::*;
use srcmodel_syntax::{ExprKind, Literal, Modifiers};

#[test]
fn test_arity_must_match() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let int = || b.builtin(BuiltinType::Int32);
    let comp = ctx.compile([b.root(vec![
        b.class("C")
            .member(b.method("Two").param("a", int()).param("b", int()).build())
            .build(),
    ])]);

    let two = member_called(&comp, &type_at(&comp, "C", 0), "Two").id;
    let resolver = ArityOverloadResolver;
    assert!(resolver.is_applicable(&comp, two, &[b.int(1), b.int(2)]));
    assert!(!resolver.is_applicable(&comp, two, &[b.int(1)]));
    assert!(!resolver.is_applicable(&comp, two, &[b.int(1), b.int(2), b.int(3)]));
}

#[test]
fn test_params_array_accepts_any_tail() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("C")
            .member(
                b.method("Log")
                    .param("format", b.builtin(BuiltinType::String))
                    .param_with("args", b.builtin(BuiltinType::Object), ParameterModifier::Params)
                    .build(),
            )
            .build(),
    ])]);

    let log = member_called(&comp, &type_at(&comp, "C", 0), "Log").id;
    let text = || b.expr(ExprKind::Literal(Literal::Str("x".into())));
    let resolver = ArityOverloadResolver;
    assert!(resolver.is_applicable(&comp, log, &[text()]));
    assert!(resolver.is_applicable(&comp, log, &[text(), b.int(1), b.bool(true)]));
    assert!(!resolver.is_applicable(&comp, log, &[]));
    assert!(!resolver.is_applicable(&comp, log, &[b.int(1)]));
}

#[test]
fn test_select_picks_first_applicable() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("C")
            .member(b.method("M").param("flag", b.builtin(BuiltinType::Boolean)).build())
            .member(b.method("M").param("count", b.builtin(BuiltinType::Int32)).build())
            .member(b.method("M").param("wide", b.builtin(BuiltinType::Int64)).build())
            .build(),
    ])]);

    let candidates: Vec<_> = members_called(&comp, &type_at(&comp, "C", 0), "M")
        .iter()
        .map(|m| m.id)
        .collect();
    let resolver = ArityOverloadResolver;
    assert_eq!(resolver.select(&comp, &candidates, &[b.int(1)]), Some(candidates[1]));
    assert_eq!(resolver.select(&comp, &candidates, &[b.bool(false)]), Some(candidates[0]));
    assert_eq!(resolver.select(&comp, &candidates, &[]), None);
}

#[test]
fn test_assignability() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.interface("IShape").build(),
        b.class("Shape").base(b.name("IShape")).build(),
        b.class("Circle").base(b.name("Shape")).build(),
        b.class("Other").build(),
    ])]);

    let def = |name| TypeRef::Def(type_at(&comp, name, 0).id);
    let (shape, circle, other, ishape) = (def("Shape"), def("Circle"), def("Other"), def("IShape"));
    assert!(comp.is_assignable(circle, circle));
    assert!(comp.is_assignable(circle, shape));
    assert!(comp.is_assignable(circle, ishape));
    assert!(comp.is_assignable(circle, TypeRef::OBJECT));
    assert!(!comp.is_assignable(shape, circle));
    assert!(!comp.is_assignable(other, shape));
    assert!(comp.is_assignable(TypeRef::INT32, TypeRef::Builtin(BuiltinType::Int64)));
    assert!(!comp.is_assignable(TypeRef::Builtin(BuiltinType::Int64), TypeRef::INT32));
    assert!(!comp.is_assignable(TypeRef::INT32, TypeRef::BOOLEAN));
    assert!(comp.is_assignable(TypeRef::Error, TypeRef::BOOLEAN));
    assert!(comp.is_assignable(TypeRef::INT32, TypeRef::Builtin(BuiltinType::ValueType)));
}

#[test]
fn test_custom_overload_resolver_is_used() {
    struct NeverApplicable;

    impl OverloadResolver for NeverApplicable {
        fn is_applicable(&self, _: &Compilation, _: MemberDefId, _: &[Expr]) -> bool {
            false
        }
    }

    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = Compilation::builder(std::sync::Arc::clone(&ctx.arena), ctx.sink())
        .overload_resolver(std::sync::Arc::new(NeverApplicable))
        .build();
    comp.add_part(b.root(vec![b.namespace(
        "App",
        vec![
            b.class("Ext")
                .modifiers(Modifiers::STATIC)
                .member(
                    b.method("Twice")
                        .modifiers(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::EXTENSION)
                        .param("value", b.builtin(BuiltinType::Int32))
                        .build(),
                )
                .build(),
        ],
    )]));

    let app = comp.arena().members_of(comp.roots()[0])[0];
    assert!(comp.applicable_extension_methods(app, comp.names().intern("Twice"), &[b.int(1)]).is_empty());
}
