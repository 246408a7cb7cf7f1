//! End-to-end resolution: alias termination, extension method tiers and
//! error folds through the public facade.

use srcmodel::{
    ArityOverloadResolver, BuiltinType, Compilation, DeclArena, DeclId, DiagnosticBag, Expr,
    MemberDefId, Modifiers, NameTable, OverloadResolver, Resolved, TreeBuilder, TypeRef, Unbound,
    codes,
};
use std::sync::{Arc, Mutex};

fn new_arena() -> Arc<DeclArena> {
    Arc::new(DeclArena::new(Arc::new(NameTable::new())))
}

fn child(comp: &Compilation, parent: DeclId, index: usize) -> DeclId {
    comp.arena().members_of(parent)[index]
}

/// Records every method it is asked about, then defers to the default.
#[derive(Default)]
struct RecordingResolver {
    asked: Mutex<Vec<MemberDefId>>,
}

impl OverloadResolver for RecordingResolver {
    fn is_applicable(&self, comp: &Compilation, method: MemberDefId, args: &[Expr]) -> bool {
        self.asked
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(method);
        ArityOverloadResolver.is_applicable(comp, method, args)
    }
}

fn extension(b: &TreeBuilder<'_>, name: &str) -> Unbound {
    b.method(name)
        .modifiers(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::EXTENSION)
        .param("value", b.builtin(BuiltinType::Int32))
        .build()
}

#[test]
fn test_self_referencing_aliases_terminate() {
    let arena = new_arena();
    let b = TreeBuilder::new(&arena);
    let diagnostics = Arc::new(DiagnosticBag::new());
    let comp = Compilation::new(Arc::clone(&arena), diagnostics.clone());
    comp.add_part(b.root(vec![
        b.namespace("Y", vec![b.class("Other").build()]),
        b.namespace(
            "N",
            vec![
                b.alias("Y", b.name("Z")),
                b.alias("X", b.name("Y.X")),
                b.class("User").member(b.field("x", Modifiers::PUBLIC, b.name("X"))).build(),
            ],
        ),
    ]));

    let n = child(&comp, comp.roots()[0], 1);
    let x_alias = child(&comp, n, 1);
    let target = comp.alias_target(x_alias);
    assert!(matches!(target, Resolved::Type(TypeRef::Error)), "{target:?}");
    assert!(comp.has_errors(x_alias));
    assert!(!comp.scope(n).is_busy());

    let user = child(&comp, n, 2);
    assert!(comp.has_errors(user));
    assert!(diagnostics.count_code(codes::ALIAS_TARGET_NOT_FOUND) >= 1);
}

#[test]
fn test_nested_tier_shadows_imported_tier() {
    let arena = new_arena();
    let b = TreeBuilder::new(&arena);
    let recording = Arc::new(RecordingResolver::default());
    let comp = Compilation::builder(Arc::clone(&arena), Arc::new(DiagnosticBag::new()))
        .overload_resolver(recording.clone())
        .build();
    comp.add_part(b.root(vec![
        b.namespace(
            "Lib",
            vec![b.class("LibExtensions").modifiers(Modifiers::STATIC).member(extension(&b, "Twice")).build()],
        ),
        b.namespace(
            "App",
            vec![
                b.import("Lib"),
                b.class("AppExtensions").modifiers(Modifiers::STATIC).member(extension(&b, "Twice")).build(),
            ],
        ),
    ]));

    let root = comp.roots()[0];
    let app = child(&comp, root, 1);
    let found = comp.applicable_extension_methods(app, comp.names().intern("Twice"), &[b.int(3)]);

    let app_host = comp.type_def_of(child(&comp, app, 1)).and_then(|id| comp.type_def(id)).expect("host");
    let app_twice = app_host.member_definitions(&comp)[0].id;
    assert_eq!(found, vec![app_twice]);

    let lib = child(&comp, root, 0);
    let lib_host = comp.type_def_of(child(&comp, lib, 0)).and_then(|id| comp.type_def(id)).expect("host");
    let lib_twice = lib_host.member_definitions(&comp)[0].id;
    let asked = recording.asked.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
    assert_eq!(asked, vec![app_twice]);
    assert!(!asked.contains(&lib_twice));
}

#[test]
fn test_imported_tier_used_when_nested_tier_is_empty() {
    let arena = new_arena();
    let b = TreeBuilder::new(&arena);
    let recording = Arc::new(RecordingResolver::default());
    let comp = Compilation::builder(Arc::clone(&arena), Arc::new(DiagnosticBag::new()))
        .overload_resolver(recording.clone())
        .build();
    comp.add_part(b.root(vec![
        b.namespace(
            "Lib",
            vec![b.class("LibExtensions").modifiers(Modifiers::STATIC).member(extension(&b, "Twice")).build()],
        ),
        b.namespace("App", vec![b.import("Lib"), b.class("Plain").build()]),
    ]));

    let app = child(&comp, comp.roots()[0], 1);
    let found = comp.applicable_extension_methods(app, comp.names().intern("Twice"), &[b.int(3)]);
    assert_eq!(found.len(), 1);
    assert_eq!(recording.asked.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len(), 1);
}

#[test]
fn test_resolution_across_namespaces_and_imports() {
    let arena = new_arena();
    let b = TreeBuilder::new(&arena);
    let diagnostics = Arc::new(DiagnosticBag::new());
    let comp = Compilation::new(Arc::clone(&arena), diagnostics.clone());
    comp.add_part(b.root(vec![b.namespace(
        "Company.Model",
        vec![b.class("Order").generic("T").build()],
    )]));
    comp.add_part(b.root(vec![b.namespace(
        "Company.App",
        vec![
            b.import("Company.Model"),
            b.class("Service")
                .member(b.field(
                    "orders",
                    Modifiers::PUBLIC,
                    b.generic_name("Order", vec![b.builtin(BuiltinType::String)]),
                ))
                .member(b.field("lost", Modifiers::PUBLIC, b.name("Missing")))
                .build(),
        ],
    )]));

    let service_decl = {
        let company = child(&comp, comp.roots()[1], 0);
        let app = child(&comp, company, 0);
        child(&comp, app, 1)
    };
    let service = comp.type_def_of(service_decl).and_then(|id| comp.type_def(id)).expect("service");
    let members = service.member_definitions(&comp);
    assert_eq!(
        comp.display_type(members[0].value_type(&comp)),
        "Company.Model.Order<System.String>"
    );
    assert_eq!(members[1].value_type(&comp), TypeRef::Error);

    assert!(comp.has_errors(service_decl));
    assert!(!comp.has_errors(comp.roots()[0]));
    assert!(comp.has_errors(comp.roots()[1]));
    assert_eq!(diagnostics.count_code(codes::NAME_NOT_FOUND), 1);
}
