use super::*;
use crate::options::CompilationOptions;
use crate::test_fixtures::*;
use srcmodel_syntax::Modifiers;
use std::sync::Arc;

#[test]
fn test_namespace_declarations_merge_across_parts() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([
        b.root(vec![b.namespace("Company.Core", vec![b.class("A").build()])]),
        b.root(vec![b.namespace("Company", vec![b.namespace("Core", vec![b.class("B").build()])])]),
    ]);

    let core = namespace_at(&comp, "Company.Core");
    assert_eq!(core.declarations().len(), 2);
    assert_eq!(core.full_name(&comp), "Company.Core");
    assert_eq!(core.types(&comp).len(), 2);
    let company = namespace_at(&comp, "Company");
    assert_eq!(company.declarations().len(), 2);
    assert_eq!(company.members(&comp), vec![NamespaceMember::Namespace(core.id)]);
    assert!(comp.global_namespace().is_root());
    assert_eq!(comp.global_namespace().full_name(&comp), "");
}

#[test]
fn test_members_named_lists_namespace_then_every_arity() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("Tuple").build(),
        b.class("Tuple").generic("T1").build(),
        b.class("Tuple").generic("T1").generic("T2").build(),
        b.namespace("Tuple", Vec::new()),
    ])]);

    let global = comp.global_namespace();
    let found = global.members_named(&comp, comp.names().intern("Tuple"));
    assert_eq!(found.len(), 4);
    assert!(matches!(found[0], NamespaceMember::Namespace(_)));
    let arities: Vec<_> = found[1..]
        .iter()
        .map(|member| match member {
            NamespaceMember::Type(id) => comp.type_def(*id).expect("registered").arity,
            NamespaceMember::Namespace(_) => usize::MAX,
        })
        .collect();
    assert_eq!(arities, [0, 1, 2]);
    assert!(global.members_named(&comp, comp.names().intern("Missing")).is_empty());
}

#[test]
fn test_all_types_walks_nested_namespaces_and_types() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("Top").member(b.class("Inner").build()).build(),
        b.namespace("N", vec![b.class("Deep").build()]),
    ])]);

    let names: Vec<_> = comp
        .global_namespace()
        .all_types(&comp)
        .into_iter()
        .filter_map(|id| comp.type_def(id))
        .map(|def| def.full_name(&comp))
        .collect();
    assert_eq!(names, ["Top", "Top.Inner", "N.Deep"]);
}

#[test]
fn test_ignore_case_merges_namespaces_and_types() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = Compilation::builder(Arc::clone(&ctx.arena), ctx.sink())
        .options(CompilationOptions {
            ignore_case: true,
            ..Default::default()
        })
        .build();
    comp.add_part(b.root(vec![b.namespace("Data", vec![b.class("Row").modifiers(Modifiers::PARTIAL).build()])]));
    comp.add_part(b.root(vec![b.namespace("DATA", vec![b.class("row").modifiers(Modifiers::PARTIAL).build()])]));

    let data = namespace_at(&comp, "data");
    assert_eq!(data.declarations().len(), 2);
    let row = data
        .type_named(&comp, comp.names().intern("ROW"), 0)
        .and_then(|id| comp.type_def(id))
        .expect("case-insensitive type lookup");
    assert_eq!(row.declarations().len(), 2);
    assert_eq!(&*comp.name(row.name), "Row");
}

#[test]
fn test_case_sensitive_by_default() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![b.class("Row").build(), b.class("row").build()])]);

    assert_eq!(comp.global_namespace().types(&comp).len(), 2);
    assert!(ctx.diagnostics.is_empty(), "{:?}", ctx.codes());
}

#[test]
fn test_tables_read_while_building_are_empty_and_not_cached() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![b.namespace("App", vec![b.class("Order").build()])])]);
    let app = namespace_at(&comp, "App");
    let order = comp.names().intern("Order");

    let outcome = app.members.try_get_or_init_locked(comp.build_lock(), || {
        assert!(app.members(&comp).is_empty());
        assert!(app.types(&comp).is_empty());
        assert!(app.members_named(&comp, order).is_empty());
        assert!(app.all_types(&comp).is_empty());
        Err(srcmodel_common::Reentrant)
    });
    assert!(outcome.is_err());

    assert_eq!(app.types(&comp).len(), 1);
    assert_eq!(app.members_named(&comp, order).len(), 1);
}
