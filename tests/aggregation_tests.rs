//! End-to-end aggregation: template copies, deterministic folds, generic
//! unification and synthesized members.

use srcmodel::syntax::{GenericConstraints, MethodRef, StmtKind};
use srcmodel::{
    BuiltinType, Compilation, Container, DeclArena, DeclId, DeclKind, DiagnosticBag, MemberKind,
    Modifiers, NameTable, NamedTypeDefinition, TreeBuilder, TypeRef, Unbound,
};
use std::sync::Arc;

fn new_arena() -> Arc<DeclArena> {
    Arc::new(DeclArena::new(Arc::new(NameTable::new())))
}

fn compile(arena: &Arc<DeclArena>, roots: Vec<Unbound>) -> (Compilation, Arc<DiagnosticBag>) {
    let diagnostics = Arc::new(DiagnosticBag::new());
    let comp = Compilation::new(Arc::clone(arena), diagnostics.clone());
    for root in roots {
        comp.add_part(root);
    }
    (comp, diagnostics)
}

fn global_type(comp: &Compilation, name: &str, arity: usize) -> Arc<NamedTypeDefinition> {
    let id = comp
        .global_namespace()
        .type_named(comp, comp.names().intern(name), arity)
        .unwrap_or_else(|| panic!("type {name} not found"));
    comp.type_def(id).expect("registered")
}

fn child(comp: &Compilation, parent: DeclId, index: usize) -> DeclId {
    comp.arena().members_of(parent)[index]
}

#[test]
fn test_make_copy_for_same_container_is_identity() {
    let arena = new_arena();
    let b = TreeBuilder::new(&arena);
    let (comp, _) = compile(
        &arena,
        vec![b.root(vec![
            b.class("A")
                .member(b.field("value", Modifiers::PUBLIC, b.builtin(BuiltinType::Int32)))
                .build(),
            b.class("B").build(),
        ])],
    );
    let root = comp.roots()[0];
    let a = child(&comp, root, 0);
    let other = child(&comp, root, 1);
    let field = child(&comp, a, 0);

    assert_eq!(arena.make_copy_for(field, a), field);

    let copy = arena.make_copy_for(field, other);
    assert_ne!(copy, field);
    assert_eq!(arena.container(copy), Some(Container::Decl(other)));
    assert_eq!(arena.node(copy).template(), Some(field));
    let original = arena.node(field);
    let copied = arena.node(copy);
    assert_eq!(
        std::mem::discriminant(&original.kind),
        std::mem::discriminant(&copied.kind)
    );
    let (DeclKind::Field(before), DeclKind::Field(after)) = (&original.kind, &copied.kind) else {
        panic!("field copies stay fields");
    };
    assert_eq!(before.ty.scope(), Some(field));
    assert_eq!(after.ty.scope(), Some(copy));
    // copying again for the copy's own container is the identity
    assert_eq!(arena.make_copy_for(copy, other), copy);
}

#[test]
fn test_same_declarations_fold_to_equal_definitions() {
    let arena = new_arena();
    let b = TreeBuilder::new(&arena);
    let build = || {
        vec![
            b.root(vec![
                b.interface("IShape").build(),
                b.class("Base").build(),
                b.class("Shape")
                    .modifiers(Modifiers::PUBLIC | Modifiers::PARTIAL | Modifiers::ABSTRACT)
                    .base(b.name("Base"))
                    .member(b.field("x", Modifiers::PUBLIC, b.builtin(BuiltinType::Int32)))
                    .member(b.property("Area", Modifiers::PUBLIC, b.builtin(BuiltinType::Int64), true, false))
                    .build(),
            ]),
            b.root(vec![
                b.class("Shape")
                    .modifiers(Modifiers::PARTIAL)
                    .base(b.name("IShape"))
                    .member(b.method("Draw").build())
                    .build(),
            ]),
        ]
    };
    let (first, first_diagnostics) = compile(&arena, build());
    let (second, second_diagnostics) = compile(&arena, build());

    let summary = |comp: &Compilation| {
        let shape = global_type(comp, "Shape", 0);
        let members: Vec<(String, MemberKind)> = shape
            .member_definitions(comp)
            .iter()
            .map(|m| (comp.name(m.name).to_string(), m.kind))
            .collect();
        let base = shape.base_class(comp).map(|ty| comp.display_type(ty));
        let interfaces: Vec<String> = shape
            .interfaces(comp)
            .into_iter()
            .map(|ty| comp.display_type(ty))
            .collect();
        (members, base, interfaces, shape.flags(), shape.visibility())
    };

    let expected = summary(&first);
    assert_eq!(summary(&second), expected);
    let (members, base, interfaces, _, _) = expected;
    let names: Vec<&str> = members.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["x", "Area", "get_Area", "Draw", ".ctor"]);
    assert_eq!(base.as_deref(), Some("Base"));
    assert_eq!(interfaces, ["IShape"]);
    assert!(first_diagnostics.is_empty());
    assert!(second_diagnostics.is_empty());
}

#[test]
fn test_generic_parameter_unification_across_partials() {
    let arena = new_arena();
    let b = TreeBuilder::new(&arena);
    let part = |special: GenericConstraints, constraints: Vec<&str>| {
        let param = b.generic_param("T", 0, special, constraints.into_iter().map(|c| b.name(c)).collect());
        b.root(vec![b.class("Repo").modifiers(Modifiers::PARTIAL).generic_param(param).build()])
    };
    let (comp, diagnostics) = compile(
        &arena,
        vec![
            b.root(vec![b.interface("IEntity").build(), b.interface("IAudited").build()]),
            part(GenericConstraints::REFERENCE_TYPE, vec!["IEntity"]),
            part(GenericConstraints::empty(), vec!["IAudited"]),
        ],
    );

    let repo = global_type(&comp, "Repo", 1);
    let params = repo.generic_parameters();
    assert_eq!(params.len(), 1);
    let param = comp.generic_param(params[0]).expect("registered");
    assert!(param.has_reference_type_constraint());
    let constraints: Vec<String> = param
        .constraints(&comp)
        .into_iter()
        .map(|ty| comp.display_type(ty))
        .collect();
    assert_eq!(constraints, ["IEntity", "IAudited"]);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_default_constructor_only_without_explicit_one() {
    let arena = new_arena();
    let b = TreeBuilder::new(&arena);
    let (comp, diagnostics) = compile(
        &arena,
        vec![b.root(vec![
            b.class("Base").build(),
            b.class("Implicit").base(b.name("Base")).build(),
            b.class("Explicit")
                .base(b.name("Base"))
                .member(b.method(".ctor").param("seed", b.builtin(BuiltinType::Int32)).build())
                .build(),
        ])],
    );

    let base_ctor = global_type(&comp, "Base", 0).constructors(&comp);
    assert_eq!(base_ctor.len(), 1);

    let implicit = global_type(&comp, "Implicit", 0).constructors(&comp);
    assert_eq!(implicit.len(), 1);
    let ctor = &implicit[0];
    assert!(ctor.synthesized);
    assert!(ctor.modifiers().contains(Modifiers::PUBLIC));
    assert!(ctor.parameters(&comp).is_empty());
    let decl = ctor.primary_declaration().expect("declared");
    let node = comp.arena().node(decl);
    let body = node.as_method().and_then(|m| m.body.as_ref()).expect("body");
    let calls_base = body.statements.iter().any(|stmt| match &stmt.kind {
        StmtKind::Expression(expr) => matches!(
            &expr.kind,
            srcmodel::ExprKind::ResolvedCall { method: MethodRef::Member(id), .. } if *id == base_ctor[0].id
        ),
        _ => false,
    });
    assert!(calls_base);

    let explicit = global_type(&comp, "Explicit", 0).constructors(&comp);
    assert_eq!(explicit.len(), 1);
    assert!(!explicit[0].synthesized);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_enum_members_count_up() {
    let arena = new_arena();
    let b = TreeBuilder::new(&arena);
    let (comp, _) = compile(
        &arena,
        vec![b.root(vec![
            b.enum_("Plain")
                .member(b.enum_member("A", None))
                .member(b.enum_member("B", None))
                .member(b.enum_member("C", None))
                .build(),
            b.enum_("Jump")
                .member(b.enum_member("A", None))
                .member(b.enum_member("B", Some(b.int(5))))
                .member(b.enum_member("C", None))
                .build(),
        ])],
    );

    let values = |name: &str| -> Vec<i64> {
        global_type(&comp, name, 0)
            .enum_values(&comp)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    };
    assert_eq!(values("Plain"), [0, 1, 2]);
    assert_eq!(values("Jump"), [0, 5, 6]);
    let plain = global_type(&comp, "Plain", 0);
    assert_eq!(plain.base_class(&comp), Some(TypeRef::Builtin(BuiltinType::Enum)));
}
