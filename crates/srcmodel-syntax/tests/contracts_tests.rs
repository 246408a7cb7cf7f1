use super::*;
use crate::expr::{BinaryOp, ExprKind, Expression, Literal};
use srcmodel_common::NameTable;
use std::sync::Barrier;
use std::thread;

fn condition(names: &NameTable, var: &str) -> Expr {
    Expression::new(
        ExprKind::Binary {
            op: BinaryOp::Gt,
            left: Expression::new(
                ExprKind::Name {
                    name: names.intern(var),
                    type_args: Vec::new(),
                },
                SourceLocation::SYNTHETIC,
            ),
            right: Expression::new(ExprKind::Literal(Literal::Int(0)), SourceLocation::SYNTHETIC),
        },
        SourceLocation::SYNTHETIC,
    )
}

#[test]
fn test_converted_condition_is_cached() {
    let names = NameTable::new();
    let pre = Precondition::new(condition(&names, "x"), None, SourceLocation::SYNTHETIC);
    pre.set_containing_scope(DeclId(5));

    let first = Arc::clone(pre.converted_condition());
    let second = Arc::clone(pre.converted_condition());

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.scope(), Some(DeclId(5)));
    assert!(matches!(first.kind, ExprKind::IsTrue(_)));
    assert_eq!(pre.element_kind(), ContractElementKind::Precondition);
}

#[test]
fn test_converted_condition_concurrent_readers_agree() {
    let names = NameTable::new();
    let post = Arc::new(Postcondition::new(condition(&names, "y"), SourceLocation::SYNTHETIC));
    post.set_containing_scope(DeclId(2));
    let barrier = Arc::new(Barrier::new(6));
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let (post, barrier) = (Arc::clone(&post), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                Arc::as_ptr(post.converted_condition()) as usize
            })
        })
        .collect();
    let ptrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ptrs.iter().all(|p| *p == ptrs[0]));
}

#[test]
fn test_precondition_make_copy_for() {
    let names = NameTable::new();
    let pre = Arc::new(Precondition::new(
        condition(&names, "x"),
        None,
        SourceLocation::SYNTHETIC,
    ));
    pre.set_containing_scope(DeclId(1));

    let same = pre.make_copy_for(DeclId(1));
    assert!(Arc::ptr_eq(&pre, &same));

    let moved = pre.make_copy_for(DeclId(2));
    assert!(!Arc::ptr_eq(&pre, &moved));
    assert_eq!(moved.condition().scope(), Some(DeclId(2)));
    assert!(!Arc::ptr_eq(pre.condition(), moved.condition()));
    assert_eq!(pre.condition().scope(), Some(DeclId(1)));
}

#[test]
fn test_method_contract_binding_reaches_every_list() {
    let names = NameTable::new();
    let mut contract = MethodContract::new(SourceLocation::SYNTHETIC);
    contract.preconditions.push(Arc::new(Precondition::new(
        condition(&names, "a"),
        None,
        SourceLocation::SYNTHETIC,
    )));
    contract.postconditions.push(Arc::new(Postcondition::new(
        condition(&names, "b"),
        SourceLocation::SYNTHETIC,
    )));
    contract.writes.push(condition(&names, "c"));
    let contract = Arc::new(contract);

    contract.set_containing_scope(DeclId(8));

    assert_eq!(contract.scope(), Some(DeclId(8)));
    assert_eq!(contract.preconditions[0].condition().scope(), Some(DeclId(8)));
    assert_eq!(contract.postconditions[0].condition().scope(), Some(DeclId(8)));
    assert_eq!(contract.writes[0].scope(), Some(DeclId(8)));

    let copy = contract.make_copy_for(DeclId(9));
    assert_eq!(copy.scope(), Some(DeclId(9)));
    assert_eq!(copy.preconditions[0].condition().scope(), Some(DeclId(9)));
    assert!(!Arc::ptr_eq(&contract.preconditions[0], &copy.preconditions[0]));
}

#[test]
fn test_placeholder_contract_must_inline() {
    let placeholder = MethodContract::placeholder();
    assert!(placeholder.must_inline());
    assert!(placeholder.preconditions.is_empty());
    assert!(!MethodContract::new(SourceLocation::SYNTHETIC).must_inline());
    assert!(placeholder.copy_unbound().must_inline());
}

#[test]
fn test_loop_contract_copy_rebinds_invariants() {
    let names = NameTable::new();
    let mut contract = LoopContract::new(SourceLocation::SYNTHETIC);
    contract.invariants.push(Arc::new(LoopInvariant::new(
        condition(&names, "i"),
        SourceLocation::SYNTHETIC,
    )));
    let contract = Arc::new(contract);
    contract.set_containing_scope(DeclId(3));
    assert_eq!(contract.invariants[0].condition().scope(), Some(DeclId(3)));
    assert_eq!(
        contract.invariants[0].element_kind(),
        ContractElementKind::LoopInvariant
    );

    assert!(Arc::ptr_eq(&contract, &contract.make_copy_for(DeclId(3))));
    let copy = contract.make_copy_for(DeclId(4));
    assert_eq!(copy.invariants[0].condition().scope(), Some(DeclId(4)));
}

#[test]
fn test_type_contract_binds_invariants() {
    let names = NameTable::new();
    let contract = TypeContract::from_parts(
        Vec::new(),
        Vec::new(),
        vec![Arc::new(TypeInvariant::new(
            condition(&names, "count"),
            Some(names.intern("NonNegative")),
            false,
            SourceLocation::SYNTHETIC,
        ))],
        SourceLocation::SYNTHETIC,
    );
    assert_eq!(contract.containing_type(), None);

    contract.set_containing_type(DeclId(11));

    assert_eq!(contract.containing_type(), Some(DeclId(11)));
    assert_eq!(contract.invariants[0].condition().scope(), Some(DeclId(11)));
}
