use super::*;
use crate::test_fixtures::*;
use srcmodel_common::{BuiltinType, SourceLocation};
use srcmodel_syntax::{
    BinaryOp, Block, Literal, LoopInvariant, Modifiers, Postcondition, Precondition, Statement,
    StmtKind, TreeBuilder,
};
use std::sync::Arc;

const AT: SourceLocation = SourceLocation::SYNTHETIC;

fn binary(b: &TreeBuilder<'_>, op: BinaryOp, left: Expr, right: Expr) -> Expr {
    b.expr(ExprKind::Binary { op, left, right })
}

fn requires(conditions: Vec<Expr>) -> MethodContract {
    let mut contract = MethodContract::new(AT);
    contract.preconditions = conditions
        .into_iter()
        .map(|condition| Arc::new(Precondition::new(condition, None, AT)))
        .collect();
    contract
}

fn method_decl(comp: &Compilation, type_name: &str, method: &str) -> srcmodel_common::DeclId {
    member_called(comp, &type_at(comp, type_name, 0), method)
        .primary_declaration()
        .expect("declared")
}

fn contract_of(comp: &Compilation, decl: srcmodel_common::DeclId) -> Arc<MethodContract> {
    let node = comp.arena().node(decl);
    node.as_method()
        .and_then(|m| m.contract.clone())
        .expect("method contract")
}

#[test]
fn test_condition_must_be_boolean() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let comp = ctx.compile([b.root(vec![
        b.class("C")
            .member(
                b.method("Good")
                    .param("x", b.builtin(BuiltinType::Int32))
                    .contract(requires(vec![binary(&b, BinaryOp::Gt, b.name("x"), b.int(0))]))
                    .build(),
            )
            .member(
                b.method("Bad")
                    .param("x", b.builtin(BuiltinType::Int32))
                    .contract(requires(vec![b.name("x")]))
                    .build(),
            )
            .build(),
    ])]);

    let good = method_decl(&comp, "C", "Good");
    assert!(!comp.method_contract_has_errors(&contract_of(&comp, good)));
    assert!(!comp.has_errors(good));

    let bad = method_decl(&comp, "C", "Bad");
    let contract = contract_of(&comp, bad);
    assert!(comp.method_contract_has_errors(&contract));
    assert!(comp.condition_has_errors(contract.preconditions[0].as_ref()));
    assert!(comp.has_errors(bad));
    assert_eq!(ctx.codes(), [codes::CONDITION_NOT_BOOLEAN]);
}

#[test]
fn test_side_effects_in_conditions() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let int = || b.builtin(BuiltinType::Int32);
    let assigns = binary(
        &b,
        BinaryOp::Eq,
        b.expr(ExprKind::Assign {
            target: b.name("x"),
            value: b.int(1),
        }),
        b.int(1),
    );
    let creates = binary(
        &b,
        BinaryOp::Ne,
        b.expr(ExprKind::New {
            ty: b.name("C"),
            args: Vec::new(),
        }),
        b.expr(ExprKind::Literal(Literal::Null)),
    );
    let calls = |name: &str| {
        b.expr(ExprKind::Call {
            callee: b.name(name),
            args: vec![b.name("x")],
        })
    };
    let comp = ctx.compile([b.root(vec![
        b.class("C")
            .member(
                b.method("Check")
                    .returns(b.builtin(BuiltinType::Boolean))
                    .param("value", int())
                    .build(),
            )
            .member(
                b.method("IsValid")
                    .modifiers(Modifiers::PURE)
                    .returns(b.builtin(BuiltinType::Boolean))
                    .param("value", int())
                    .build(),
            )
            .member(
                b.method("Impure")
                    .param("x", int())
                    .contract(requires(vec![assigns, creates, calls("Check")]))
                    .build(),
            )
            .member(
                b.method("Pure")
                    .param("x", int())
                    .contract(requires(vec![calls("IsValid")]))
                    .build(),
            )
            .build(),
    ])]);

    let impure = method_decl(&comp, "C", "Impure");
    assert!(comp.has_errors(impure));
    assert_eq!(ctx.count(codes::CONDITION_HAS_SIDE_EFFECTS), 3);
    assert_eq!(ctx.count(codes::CONDITION_NOT_BOOLEAN), 0);

    let pure = method_decl(&comp, "C", "Pure");
    assert!(!comp.has_errors(pure));
    assert_eq!(ctx.count(codes::CONDITION_HAS_SIDE_EFFECTS), 3);
}

#[test]
fn test_out_parameter_in_precondition() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let result_positive = || binary(&b, BinaryOp::Gt, b.name("result"), b.int(0));
    let mut contract = requires(vec![result_positive()]);
    contract
        .postconditions
        .push(Arc::new(Postcondition::new(result_positive(), AT)));
    let comp = ctx.compile([b.root(vec![
        b.class("C")
            .member(
                b.method("TryGet")
                    .returns(b.builtin(BuiltinType::Boolean))
                    .param_with("result", b.builtin(BuiltinType::Int32), ParameterModifier::Out)
                    .contract(contract)
                    .build(),
            )
            .build(),
    ])]);

    let decl = method_decl(&comp, "C", "TryGet");
    let contract = contract_of(&comp, decl);
    assert!(comp.method_contract_has_errors(&contract));
    assert!(!comp.condition_has_errors(contract.postconditions[0].as_ref()));
    assert_eq!(ctx.codes(), [codes::OUT_PARAMETER_IN_PRECONDITION]);
}

#[test]
fn test_constants_in_location_sets() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let int = || b.builtin(BuiltinType::Int32);
    let mut contract = MethodContract::new(AT);
    contract.reads = vec![b.name("count")];
    contract.writes = vec![b.name("count"), b.int(1), b.name("Max"), b.name("Mode.Fast")];
    let comp = ctx.compile([b.root(vec![
        b.enum_("Mode").member(b.enum_member("Fast", None)).build(),
        b.class("C")
            .member(b.field("count", Modifiers::empty(), int()))
            .member(b.field_with_initializer("Max", Modifiers::CONST, int(), Some(b.int(9))))
            .member(b.method("Update").contract(contract).build())
            .build(),
    ])]);

    let decl = method_decl(&comp, "C", "Update");
    assert!(comp.method_contract_has_errors(&contract_of(&comp, decl)));
    assert_eq!(ctx.count(codes::CONSTANT_IN_LOCATION_SET), 3);
    assert_eq!(ctx.count(codes::NAME_NOT_FOUND), 0);
    // cached: asking again reports nothing new
    assert!(comp.has_errors(decl));
    assert_eq!(ctx.count(codes::CONSTANT_IN_LOCATION_SET), 3);
}

#[test]
fn test_loop_contract_in_body() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let mut contract = LoopContract::new(AT);
    contract.invariants = vec![
        Arc::new(LoopInvariant::new(binary(&b, BinaryOp::Ge, b.name("i"), b.int(0)), AT)),
        Arc::new(LoopInvariant::new(b.name("i"), AT)),
    ];
    contract.writes = vec![b.int(3)];
    let body = Block::new(vec![
        Statement::new(
            StmtKind::Local {
                name: ctx.arena.names().intern("i"),
                ty: Some(b.builtin(BuiltinType::Int32)),
                initializer: Some(b.int(0)),
            },
            AT,
        ),
        Statement::new(
            StmtKind::Loop {
                condition: Some(binary(&b, BinaryOp::Lt, b.name("i"), b.int(10))),
                contract: Some(Arc::new(contract)),
                body: Block::new(Vec::new()),
            },
            AT,
        ),
    ]);
    let comp = ctx.compile([b.root(vec![
        b.class("C")
            .member(b.field("i", Modifiers::empty(), b.builtin(BuiltinType::Int32)))
            .member(b.method("Run").body(body).build())
            .build(),
    ])]);

    let decl = method_decl(&comp, "C", "Run");
    assert!(comp.has_errors(decl));
    let mut codes_seen = ctx.codes();
    codes_seen.sort_unstable();
    assert_eq!(codes_seen, [codes::CONDITION_NOT_BOOLEAN, codes::CONSTANT_IN_LOCATION_SET]);

    let node = comp.arena().node(decl);
    let loops = node.as_method().and_then(|m| m.body.as_ref()).expect("body").loop_contracts();
    assert_eq!(loops.len(), 1);
    assert!(comp.loop_contract_has_errors(&loops[0]));
    assert_eq!(ctx.codes().len(), 2);
}

#[test]
fn test_type_invariants() {
    let ctx = TestContext::new();
    let b = ctx.builder();
    let int = || b.builtin(BuiltinType::Int32);
    let comp = ctx.compile([b.root(vec![
        b.class("Good")
            .member(b.field("count", Modifiers::empty(), int()))
            .invariant(binary(&b, BinaryOp::Ge, b.name("count"), b.int(0)))
            .build(),
        b.class("Bad")
            .member(b.field("count", Modifiers::empty(), int()))
            .invariant(b.name("count"))
            .build(),
    ])]);

    let contract = |name: &str| {
        let decl = type_at(&comp, name, 0).primary_declaration().expect("declared");
        let node = comp.arena().node(decl);
        node.as_type().and_then(|t| t.contract.clone()).expect("type contract")
    };
    assert!(!comp.type_contract_has_errors(&contract("Good")));
    assert!(comp.type_contract_has_errors(&contract("Bad")));
    assert!(comp.type_contract_has_errors(&contract("Bad")));
    assert_eq!(ctx.codes(), [codes::CONDITION_NOT_BOOLEAN]);

    let bad_decl = type_at(&comp, "Bad", 0).primary_declaration().expect("declared");
    assert!(comp.has_errors(bad_decl));
    assert_eq!(ctx.codes().len(), 1);
}
