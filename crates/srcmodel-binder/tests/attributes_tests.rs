use super::*;
use crate::test_fixtures::*;
use srcmodel_syntax::{Modifiers, TreeBuilder, Unbound};

fn attribute_class(b: &TreeBuilder<'_>, name: &str, ctors: Vec<Unbound>) -> Unbound {
    b.class(name)
        .base(b.builtin(BuiltinType::Attribute))
        .members(ctors)
        .build()
}

fn attribute_types(comp: &Compilation, attributes: &[CustomAttribute]) -> Vec<String> {
    attributes
        .iter()
        .map(|a| comp.display_type(a.attribute_type))
        .collect()
}

#[test]
fn test_attribute_suffix_is_tried_second() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        attribute_class(&b, "ObsoleteAttribute", Vec::new()),
        attribute_class(&b, "Flag", Vec::new()),
        attribute_class(&b, "FlagAttribute", Vec::new()),
        b.class("Widget")
            .attribute(b.attribute(AttributeTarget::Type, "Obsolete", Vec::new()))
            .attribute(b.attribute(AttributeTarget::Type, "Flag", Vec::new()))
            .build(),
    ])]);

    let widget = type_at(&comp, "Widget", 0);
    let attributes = widget.attributes(&comp);
    assert_eq!(attribute_types(&comp, &attributes), ["ObsoleteAttribute", "Flag"]);

    let obsolete = type_at(&comp, "ObsoleteAttribute", 0);
    let default_ctor = member_called(&comp, &obsolete, ".ctor");
    assert_eq!(attributes[0].constructor, Some(default_ctor.id));
    assert_eq!(attributes[0].target, AttributeTarget::Type);
    assert!(!attributes[0].is_extension());
    assert!(ctx.diagnostics.is_empty(), "{:?}", ctx.codes());
}

#[test]
fn test_constructor_chosen_by_arguments() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let int = || b.builtin(BuiltinType::Int32);
    let comp = ctx.compile([b.root(vec![
        attribute_class(
            &b,
            "RangeAttribute",
            vec![
                b.method(".ctor").param("max", int()).build(),
                b.method(".ctor").param("min", int()).param("max", int()).build(),
            ],
        ),
        b.class("Config")
            .member(
                b.method("Limit")
                    .attribute(b.attribute(AttributeTarget::Method, "Range", vec![b.int(1), b.int(9)]))
                    .build(),
            )
            .build(),
    ])]);

    let range = type_at(&comp, "RangeAttribute", 0);
    let ctors = range.constructors(&comp);
    assert_eq!(ctors.len(), 2);

    let limit = member_called(&comp, &type_at(&comp, "Config", 0), "Limit");
    let attributes = limit.attributes(&comp);
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].constructor, Some(ctors[1].id));
    assert_eq!(attributes[0].args.len(), 2);
}

#[test]
fn test_unresolved_attribute_is_reported_and_dropped() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("Widget")
            .attribute(b.attribute(AttributeTarget::Type, "Missing", Vec::new()))
            .build(),
    ])]);

    let widget = type_at(&comp, "Widget", 0);
    assert!(widget.attributes(&comp).is_empty());
    assert!(widget.attributes(&comp).is_empty());
    assert_eq!(ctx.codes(), [codes::ATTRIBUTE_TYPE_NOT_FOUND]);
    let reported = &ctx.diagnostics.snapshot()[0];
    assert!(reported.message_text.contains("Missing"), "{}", reported.message_text);
}

#[test]
fn test_no_applicable_constructor_keeps_attribute() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        attribute_class(
            &b,
            "RangeAttribute",
            vec![b.method(".ctor").param("max", b.builtin(BuiltinType::Int32)).build()],
        ),
        b.class("Widget")
            .attribute(b.attribute(AttributeTarget::Type, "Range", vec![b.bool(true)]))
            .build(),
    ])]);

    let attributes = type_at(&comp, "Widget", 0).attributes(&comp);
    assert_eq!(attribute_types(&comp, &attributes), ["RangeAttribute"]);
    assert_eq!(attributes[0].constructor, None);
    assert_eq!(ctx.count(codes::NO_APPLICABLE_ATTRIBUTE_CONSTRUCTOR), 1);
}

#[test]
fn test_extension_attribute_is_added() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("Ext")
            .modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
            .member(
                b.method("Twice")
                    .modifiers(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::EXTENSION)
                    .param("value", b.builtin(BuiltinType::Int32))
                    .build(),
            )
            .member(b.method("Plain").modifiers(Modifiers::STATIC).build())
            .build(),
    ])]);

    let ext = type_at(&comp, "Ext", 0);
    let type_attributes = ext.attributes(&comp);
    assert_eq!(type_attributes.len(), 1);
    assert!(type_attributes[0].is_extension());
    assert_eq!(type_attributes[0].target, AttributeTarget::Type);

    let twice = member_called(&comp, &ext, "Twice").attributes(&comp);
    assert!(twice.iter().any(CustomAttribute::is_extension));
    assert!(member_called(&comp, &ext, "Plain").attributes(&comp).is_empty());

    let assembly = comp.assembly_attributes();
    assert_eq!(assembly.iter().filter(|a| a.is_extension()).count(), 1);
    assert_eq!(assembly[0].target, AttributeTarget::Assembly);
}

#[test]
fn test_assembly_and_module_attributes() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([
        b.root_with_attributes(
            vec![attribute_class(&b, "InfoAttribute", Vec::new())],
            vec![
                b.attribute(AttributeTarget::Assembly, "Info", Vec::new()),
                b.attribute(AttributeTarget::Module, "Info", Vec::new()),
            ],
        ),
        b.root_with_attributes(
            Vec::new(),
            vec![b.attribute(AttributeTarget::Assembly, "InfoAttribute", Vec::new())],
        ),
    ]);

    let assembly = comp.assembly_attributes();
    assert_eq!(attribute_types(&comp, &assembly), ["InfoAttribute", "InfoAttribute"]);
    assert!(assembly.iter().all(|a| a.target == AttributeTarget::Assembly));
    assert!(!assembly.iter().any(CustomAttribute::is_extension));

    let module = comp.module_attributes();
    assert_eq!(module.len(), 1);
    assert_eq!(module[0].target, AttributeTarget::Module);
    assert_eq!(comp.global_namespace().attributes(&comp).len(), 3);
}
