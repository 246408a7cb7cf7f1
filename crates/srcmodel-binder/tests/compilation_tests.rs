use super::*;
use crate::test_fixtures::*;
use srcmodel_common::diagnostics::codes;
use srcmodel_common::{BuiltinType, DocumentEdit};
use srcmodel_syntax::{MemberSlot, Modifiers};

#[test]
fn test_add_part_binds_root_to_unit() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let root = b.root(vec![b.class("A").build()]);
    let comp = ctx.compile([]);
    let root = comp.add_part(root);

    assert_eq!(comp.roots(), vec![root]);
    assert_eq!(comp.arena().unit_of(root), Some(comp.unit()));
    assert_eq!(comp.namespace_def_of(root), Some(comp.global_namespace().id));
}

#[test]
fn test_partial_class_parts_aggregate_into_one_definition() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let part = |field: &str| {
        b.root(vec![b.namespace(
            "N",
            vec![
                b.class("C")
                    .modifiers(Modifiers::PUBLIC | Modifiers::PARTIAL)
                    .member(b.field(field, Modifiers::PUBLIC, b.builtin(BuiltinType::Int32)))
                    .build(),
            ],
        )])
    };
    let comp = ctx.compile([part("a"), part("b")]);

    let c = type_at(&comp, "N.C", 0);
    assert_eq!(c.declarations().len(), 2);
    let names: Vec<_> = c
        .member_definitions(&comp)
        .iter()
        .filter(|m| !m.synthesized)
        .map(|m| comp.name(m.name).to_string())
        .collect();
    assert_eq!(names, ["a", "b"]);
    for decl in c.declarations() {
        assert_eq!(comp.type_def_of(decl), Some(c.id));
    }
    assert!(ctx.diagnostics.is_empty(), "{:?}", ctx.codes());
}

#[test]
fn test_non_partial_duplicate_type_is_reported_and_merged() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([
        b.root(vec![b.class("Dup").build()]),
        b.root(vec![b.class("Dup").build()]),
    ]);

    let dup = type_at(&comp, "Dup", 0);
    assert_eq!(dup.declarations().len(), 2);
    assert_eq!(ctx.count(codes::DUPLICATE_TYPE_DECLARATION), 1);
}

#[test]
fn test_definition_of_declaration_is_found_without_prior_queries() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let method = b.method("Run").build();
    let comp = ctx.compile([b.root(vec![b.namespace("A.B", vec![b.class("C").member(method).build()])])]);

    let root = comp.roots()[0];
    let a = comp.arena().members_of(root)[0];
    let ab = comp.arena().members_of(a)[0];
    let class = comp.arena().members_of(ab)[0];
    let run = comp.arena().members_of(class)[0];

    let member = comp.member_def_of(run).and_then(|id| comp.member(id)).expect("member");
    assert_eq!(&*comp.name(member.name), "Run");
    let owner = comp.type_def(member.owner).expect("owner");
    assert_eq!(owner.full_name(&comp), "A.B.C");
}

#[test]
fn test_declaration_of_other_unit_has_no_definition() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let first = ctx.compile([b.root(vec![b.class("A").build()])]);
    let second = ctx.compile([b.root(vec![b.class("A").build()])]);

    let decl = first.arena().members_of(first.roots()[0])[0];
    assert!(first.type_def_of(decl).is_some());
    assert_eq!(second.type_def_of(decl), None);
}

#[test]
fn test_next_generation_replaces_updated_root_and_copies_others() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([
        b.root(vec![b.class("Kept").build()]),
        b.root(vec![b.class("Changed").build()]),
    ]);
    let kept_root = comp.roots()[0];
    let changed_root = comp.roots()[1];
    let changed = comp.arena().members_of(changed_root)[0];

    let update = comp
        .arena()
        .update_members(
            changed,
            vec![MemberSlot::New(b.field("added", Modifiers::PUBLIC, b.builtin(BuiltinType::Int32)))],
            None::<&DocumentEdit>,
        )
        .expect("type declarations have members");
    let next = comp.next_generation(vec![update]);

    assert_ne!(next.unit(), comp.unit());
    let roots = next.roots();
    assert_eq!(roots.len(), 2);
    assert_eq!(comp.arena().node(roots[0]).template(), Some(kept_root));
    assert_eq!(comp.arena().node(roots[1]).template(), Some(changed_root));

    let changed_next = type_at(&next, "Changed", 0);
    assert_eq!(member_called(&next, &changed_next, "added").kind, crate::members::MemberKind::Field);
    let changed_old = type_at(&comp, "Changed", 0);
    assert!(members_called(&comp, &changed_old, "added").is_empty());
}

#[test]
fn test_generations_do_not_share_definitions() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![b.class("A").build()])]);
    let a = type_at(&comp, "A", 0);
    let next = comp.next_generation(Vec::new());
    let a_next = type_at(&next, "A", 0);

    assert_ne!(a.declarations(), a_next.declarations());
    for decl in a_next.declarations() {
        assert_eq!(comp.type_def_of(decl), None);
    }
}

#[test]
fn test_display_type_names_instances() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![b.namespace("N", vec![b.class("List").generic("T").build()])])]);
    let list = type_at(&comp, "N.List", 1);
    let instance = comp.store().intern_instance(list.id, vec![TypeRef::INT32]);

    assert_eq!(comp.display_type(TypeRef::Instance(instance)), "N.List<System.Int32>");
    assert_eq!(comp.display_type(TypeRef::Error), "<error>");
}
