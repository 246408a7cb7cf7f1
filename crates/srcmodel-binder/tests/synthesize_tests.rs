use super::*;
use crate::test_fixtures::*;
use srcmodel_syntax::Visibility;

fn body_of(comp: &Compilation, member: &MemberDefinition) -> Vec<String> {
    let decl = member.primary_declaration().expect("declared");
    let node = comp.arena().node(decl);
    let method = node.as_method().expect("method");
    method
        .body
        .as_ref()
        .expect("body")
        .statements
        .iter()
        .map(|stmt| match &stmt.kind {
            StmtKind::FieldInitializers => "field initializers".to_string(),
            StmtKind::Expression(expr) => match &expr.kind {
                ExprKind::Assign { target, .. } => format!("assign {}", comp.expr_text(target)),
                ExprKind::ResolvedCall { method, .. } => format!("call {method:?}"),
                other => format!("{other:?}"),
            },
            other => format!("{other:?}"),
        })
        .collect()
}

fn parameter_types(comp: &Compilation, member: &MemberDefinition) -> Vec<TypeRef> {
    member
        .parameters(comp)
        .into_iter()
        .map(|p| {
            let node = comp.arena().node(p);
            comp.resolve_type(&node.as_parameter().expect("parameter").ty)
        })
        .collect()
}

#[test]
fn test_static_constructor_runs_static_initializers() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let int = || b.builtin(BuiltinType::Int32);
    let comp = ctx.compile([b.root(vec![
        b.class("Counter")
            .member(b.field_with_initializer("start", Modifiers::STATIC, int(), Some(b.int(1))))
            .member(b.field_with_initializer("Limit", Modifiers::CONST, int(), Some(b.int(9))))
            .member(b.field_with_initializer("step", Modifiers::empty(), int(), Some(b.int(2))))
            .build(),
    ])]);

    let counter = type_at(&comp, "Counter", 0);
    let cctor = member_called(&comp, &counter, ".cctor");
    assert_eq!(cctor.kind, MemberKind::StaticConstructor);
    assert!(cctor.synthesized);
    assert!(cctor.is_static());
    assert_eq!(cctor.visibility(), Visibility::Public);
    assert_eq!(body_of(&comp, &cctor), ["assign start"]);
    assert!(
        counter
            .declared_members(&comp)
            .iter()
            .all(|m| m.as_member() != Some(cctor.id))
    );
}

#[test]
fn test_no_static_constructor_without_initializers() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("Plain")
            .member(b.field("value", Modifiers::STATIC, b.builtin(BuiltinType::Int32)))
            .build(),
        b.struct_("Point").build(),
    ])]);

    for name in ["Plain", "Point"] {
        let def = type_at(&comp, name, 0);
        assert!(members_called(&comp, &def, ".cctor").is_empty(), "{name}");
    }
}

#[test]
fn test_default_constructor_chains_to_base() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("Base").build(),
        b.class("Derived").base(b.name("Base")).build(),
    ])]);

    let base = type_at(&comp, "Base", 0);
    let base_ctor = member_called(&comp, &base, ".ctor");
    assert!(base_ctor.synthesized);
    assert_eq!(base_ctor.visibility(), Visibility::Public);
    assert_eq!(
        body_of(&comp, &base_ctor),
        [
            "field initializers".to_string(),
            format!("call {:?}", MethodRef::BuiltinConstructor(BuiltinType::Object)),
        ]
    );

    let derived = type_at(&comp, "Derived", 0);
    let ctors = derived.constructors(&comp);
    assert_eq!(ctors.len(), 1);
    assert_eq!(body_of(&comp, &ctors[0])[1], format!("call {:?}", MethodRef::Member(base_ctor.id)));
    assert!(ctx.diagnostics.is_empty(), "{:?}", ctx.codes());
}

#[test]
fn test_default_constructor_only_when_none_declared() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("Explicit")
            .member(b.method(".ctor").param("seed", b.builtin(BuiltinType::Int32)).build())
            .build(),
        b.class("Utility").modifiers(Modifiers::STATIC).build(),
        b.interface("IShape").build(),
    ])]);

    let explicit = type_at(&comp, "Explicit", 0);
    let ctors = explicit.constructors(&comp);
    assert_eq!(ctors.len(), 1);
    assert!(!ctors[0].synthesized);
    let utility = type_at(&comp, "Utility", 0).constructors(&comp);
    assert_eq!(utility.len(), 1);
    assert!(utility[0].synthesized);
    assert!(type_at(&comp, "IShape", 0).member_definitions(&comp).is_empty());
}

#[test]
fn test_missing_base_constructor_is_reported() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("Base")
            .member(b.method(".ctor").param("seed", b.builtin(BuiltinType::Int32)).build())
            .build(),
        b.class("Derived").base(b.name("Base")).build(),
    ])]);

    let derived = type_at(&comp, "Derived", 0);
    let ctor = member_called(&comp, &derived, ".ctor");
    assert_eq!(body_of(&comp, &ctor), ["field initializers"]);
    assert_eq!(ctx.codes(), [codes::MISSING_BASE_CONSTRUCTOR]);
    // folded once
    derived.members(&comp);
    assert_eq!(ctx.count(codes::MISSING_BASE_CONSTRUCTOR), 1);
}

#[test]
fn test_delegate_members() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.delegate(
            "Handler",
            b.builtin(BuiltinType::Int32),
            vec![
                b.parameter("sender", 0, b.builtin(BuiltinType::Object)),
                b.parameter("flag", 1, b.builtin(BuiltinType::Boolean)),
            ],
        )
        .build(),
    ])]);

    let handler = type_at(&comp, "Handler", 0);
    let names: Vec<_> = handler
        .member_definitions(&comp)
        .iter()
        .map(|m| comp.name(m.name).to_string())
        .collect();
    assert_eq!(names, [".ctor", "Invoke", "BeginInvoke", "EndInvoke"]);

    let ctor = member_called(&comp, &handler, ".ctor");
    assert_eq!(
        parameter_types(&comp, &ctor),
        [TypeRef::OBJECT, TypeRef::Builtin(BuiltinType::IntPtr)]
    );

    let invoke = member_called(&comp, &handler, "Invoke");
    assert_eq!(invoke.value_type(&comp), TypeRef::INT32);
    assert_eq!(parameter_types(&comp, &invoke), [TypeRef::OBJECT, TypeRef::BOOLEAN]);
    assert!(invoke.modifiers().contains(Modifiers::VIRTUAL));

    let begin = member_called(&comp, &handler, "BeginInvoke");
    assert_eq!(begin.value_type(&comp), TypeRef::Builtin(BuiltinType::IAsyncResult));
    assert_eq!(
        parameter_types(&comp, &begin),
        [
            TypeRef::OBJECT,
            TypeRef::BOOLEAN,
            TypeRef::Builtin(BuiltinType::AsyncCallback),
            TypeRef::OBJECT,
        ]
    );

    let end = member_called(&comp, &handler, "EndInvoke");
    assert_eq!(end.value_type(&comp), TypeRef::VOID);
    assert_eq!(parameter_types(&comp, &end), [TypeRef::Builtin(BuiltinType::IAsyncResult)]);
    assert_eq!(handler.base_class(&comp), Some(TypeRef::Builtin(BuiltinType::MulticastDelegate)));
}

#[test]
fn test_delegate_past_parameter_limit_skips_async_members() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let params = (0..u16::MAX)
        .map(|i| b.parameter(&format!("p{i}"), i, b.builtin(BuiltinType::Int32)))
        .collect();
    let comp = ctx.compile([b.root(vec![
        b.delegate("Wide", b.builtin(BuiltinType::Void), params).build(),
    ])]);

    let wide = type_at(&comp, "Wide", 0);
    let names: Vec<_> = wide
        .member_definitions(&comp)
        .iter()
        .map(|m| comp.name(m.name).to_string())
        .collect();
    assert_eq!(names, [".ctor", "Invoke"]);
    assert_eq!(ctx.count(codes::TOO_MANY_PARAMETERS), 1);
}
