use super::*;
use srcmodel_common::NameTable;

fn name(names: &NameTable, s: &str) -> Expr {
    Expression::new(
        ExprKind::Name {
            name: names.intern(s),
            type_args: Vec::new(),
        },
        SourceLocation::SYNTHETIC,
    )
}

fn int(value: i64) -> Expr {
    Expression::new(ExprKind::Literal(Literal::Int(value)), SourceLocation::SYNTHETIC)
}

#[test]
fn test_set_containing_scope_reaches_children() {
    let names = NameTable::new();
    let sum = Expression::new(
        ExprKind::Binary {
            op: BinaryOp::Add,
            left: name(&names, "x"),
            right: int(1),
        },
        SourceLocation::SYNTHETIC,
    );
    assert_eq!(sum.scope(), None);

    sum.set_containing_scope(DeclId(7));

    assert_eq!(sum.scope(), Some(DeclId(7)));
    for child in sum.children() {
        assert_eq!(child.scope(), Some(DeclId(7)));
    }
}

#[test]
fn test_make_copy_for_same_scope_is_identity() {
    let names = NameTable::new();
    let e = name(&names, "value");
    e.set_containing_scope(DeclId(3));

    let same = e.make_copy_for(DeclId(3));
    assert!(Arc::ptr_eq(&e, &same));
}

#[test]
fn test_make_copy_for_other_scope_is_unshared() {
    let names = NameTable::new();
    let call = Expression::new(
        ExprKind::Call {
            callee: name(&names, "f"),
            args: vec![int(1), int(2)],
        },
        SourceLocation::SYNTHETIC,
    );
    call.set_containing_scope(DeclId(3));

    let copy = call.make_copy_for(DeclId(4));

    assert!(!Arc::ptr_eq(&call, &copy));
    assert_eq!(copy.scope(), Some(DeclId(4)));
    assert_eq!(call.scope(), Some(DeclId(3)));
    let (old, new) = (call.children(), copy.children());
    assert_eq!(old.len(), new.len());
    for (a, b) in old.iter().zip(new.iter()) {
        assert!(!Arc::ptr_eq(a, b));
        assert_eq!(b.scope(), Some(DeclId(4)));
    }
}

#[test]
fn test_deep_copy_has_fresh_caches() {
    let names = NameTable::new();
    let e = name(&names, "x");
    e.set_containing_scope(DeclId(1));
    e.resolved_cache().get_or_init(|| Resolved::Nothing);
    e.errors_cache().get_or_init(|| true);

    let copy = e.deep_copy();
    assert_eq!(copy.scope(), None);
    assert!(!copy.resolved_cache().is_computed());
    assert!(!copy.errors_cache().is_computed());
    assert_eq!(copy.simple_name(), Some(names.intern("x")));
}

#[test]
fn test_syntactic_side_effects() {
    let names = NameTable::new();
    let assign = Expression::new(
        ExprKind::Assign {
            target: name(&names, "x"),
            value: int(1),
        },
        SourceLocation::SYNTHETIC,
    );
    let nested = Expression::new(
        ExprKind::Binary {
            op: BinaryOp::Eq,
            left: assign,
            right: int(1),
        },
        SourceLocation::SYNTHETIC,
    );
    let increment = Expression::new(
        ExprKind::Unary {
            op: UnaryOp::PostIncrement,
            operand: name(&names, "i"),
        },
        SourceLocation::SYNTHETIC,
    );
    let negate = Expression::new(
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand: name(&names, "i"),
        },
        SourceLocation::SYNTHETIC,
    );

    assert!(nested.has_syntactic_side_effect());
    assert!(increment.has_syntactic_side_effect());
    assert!(!negate.has_syntactic_side_effect());
    assert!(!int(3).has_syntactic_side_effect());
}

#[test]
fn test_calls_are_collected_outermost_first() {
    let names = NameTable::new();
    let inner = Expression::new(
        ExprKind::Call {
            callee: name(&names, "g"),
            args: Vec::new(),
        },
        SourceLocation::SYNTHETIC,
    );
    let outer = Expression::new(
        ExprKind::Call {
            callee: name(&names, "f"),
            args: vec![Arc::clone(&inner)],
        },
        SourceLocation::SYNTHETIC,
    );
    let condition = Expression::new(ExprKind::IsTrue(Arc::clone(&outer)), SourceLocation::SYNTHETIC);

    let calls = condition.calls();
    assert_eq!(calls.len(), 2);
    assert!(Arc::ptr_eq(&calls[0], &outer));
    assert!(Arc::ptr_eq(&calls[1], &inner));
}

#[test]
fn test_coerce_to_bool_keeps_condition_scope() {
    let names = NameTable::new();
    let condition = name(&names, "ok");
    condition.set_containing_scope(DeclId(9));

    let converted = coerce_to_bool(&condition);

    assert_eq!(converted.scope(), Some(DeclId(9)));
    match &converted.kind {
        ExprKind::IsTrue(inner) => assert!(Arc::ptr_eq(inner, &condition)),
        other => panic!("expected IsTrue, got {other:?}"),
    }
}

#[test]
fn test_type_arg_count_and_simple_name() {
    let names = NameTable::new();
    let list = Expression::new(
        ExprKind::Qualified {
            qualifier: name(&names, "System"),
            name: names.intern("List"),
            type_args: vec![name(&names, "T")],
        },
        SourceLocation::SYNTHETIC,
    );
    assert_eq!(list.type_arg_count(), 1);
    assert_eq!(list.simple_name(), Some(names.intern("List")));
    assert_eq!(int(1).simple_name(), None);
}
