use crate::basic_types::SolverExecutionFlag;
use crate::engine::test_helper::TestSolver;
use crate::engine::SatSolver;
use crate::propagation::Propagator;
use crate::propagation::WeightConstraintPropagator;

#[test]
fn zero_loosable_forces_the_remaining_literals() {
    let mut solver = TestSolver::default();
    let lits = solver.new_literals(4);

    let mut propagator = WeightConstraintPropagator::default();
    propagator.on_new_variable();
    propagator.on_new_variable();
    propagator.on_new_variable();
    propagator.on_new_variable();
    propagator
        .add_greater_equal(
            &mut solver.simplification_context(),
            lits.clone(),
            vec![1, 1, 1, 1],
            3,
        )
        .unwrap();

    solver.decide(!lits[0]);
    assert!(solver.propagate(&mut propagator).is_ok());

    for &literal in &lits[1..] {
        assert!(solver.value(literal).is_true());
    }
}

#[test]
fn reasons_are_ordered_and_false() {
    let mut solver = TestSolver::default();
    let lits = solver.new_literals(3);

    let mut propagator = WeightConstraintPropagator::default();
    for _ in 0..3 {
        propagator.on_new_variable();
    }
    propagator
        .add_greater_equal(
            &mut solver.simplification_context(),
            lits.clone(),
            vec![1, 1, 1],
            2,
        )
        .unwrap();

    solver.decide(!lits[0]);
    assert!(solver.propagate(&mut propagator).is_ok());
    assert!(solver.value(lits[1]).is_true());

    let reason = solver.get_reason(&mut propagator, lits[1]);
    assert_eq!(reason[0], lits[1]);
    assert!(!reason[1..].is_empty());
    for &antecedent in &reason[1..] {
        assert!(solver.value(antecedent).is_false());
        assert!(
            solver.assignments.get_assigned_index(
                antecedent.get_propositional_variable()
            ) < solver
                .assignments
                .get_assigned_index(lits[1].get_propositional_variable())
        );
    }
}

#[test]
fn unassign_notifications_restore_the_slack() {
    let mut solver = TestSolver::default();
    let lits = solver.new_literals(3);

    let mut propagator = WeightConstraintPropagator::default();
    for _ in 0..3 {
        propagator.on_new_variable();
    }
    propagator
        .add_greater_equal(
            &mut solver.simplification_context(),
            lits.clone(),
            vec![1, 1, 1],
            2,
        )
        .unwrap();

    solver.decide(!lits[0]);
    assert!(solver.propagate(&mut propagator).is_ok());
    solver.backtrack(0, &mut propagator);

    // After the backjump the constraint must propagate from the other side
    // just as well.
    solver.decide(!lits[2]);
    assert!(solver.propagate(&mut propagator).is_ok());
    assert!(solver.value(lits[0]).is_true());
    assert!(solver.value(lits[1]).is_true());
}

#[test]
fn simultaneous_falsifications_conflict() {
    let mut solver = TestSolver::default();
    let lits = solver.new_literals(3);
    let trigger = solver.new_literal();

    let mut propagator = WeightConstraintPropagator::default();
    for _ in 0..4 {
        propagator.on_new_variable();
    }
    propagator
        .add_greater_equal(
            &mut solver.simplification_context(),
            lits.clone(),
            vec![1, 1, 1],
            2,
        )
        .unwrap();

    // The trigger falsifies two constraint literals in one propagation
    // batch.
    {
        let mut context = solver.simplification_context();
        context.add_clause(vec![!trigger, !lits[0]]).unwrap();
        context.add_clause(vec![!trigger, !lits[1]]).unwrap();
    }

    solver.decide(trigger);
    let conflict = solver.propagate(&mut propagator);
    let conflict = conflict.expect_err("two falsified literals exceed the slack");
    assert!(!conflict.literals.is_empty());
    for &literal in &conflict.literals {
        assert!(solver.value(literal).is_false());
    }
}

#[test]
fn weighted_propagation_forces_only_heavy_literals() {
    let mut solver = TestSolver::default();
    let lits = solver.new_literals(3);

    let mut propagator = WeightConstraintPropagator::default();
    for _ in 0..3 {
        propagator.on_new_variable();
    }
    // 4·a + 2·b + 1·c ≥ 4, loosable 3.
    propagator
        .add_greater_equal(
            &mut solver.simplification_context(),
            lits.clone(),
            vec![4, 2, 1],
            4,
        )
        .unwrap();

    // Falsifying b leaves loosable 1: only a (weight 4) is forced.
    solver.decide(!lits[1]);
    assert!(solver.propagate(&mut propagator).is_ok());
    assert!(solver.value(lits[0]).is_true());
    assert!(solver.value(lits[2]).is_undef());
}

#[test]
fn degenerate_forms_never_create_an_axiom() {
    // bound = Σw: every literal is forced at the root.
    let mut solver = SatSolver::default();
    let cardinality = solver.register_weight_constraints();
    let a = crate::basic_types::Literal::new(solver.new_variable(), true);
    let b = crate::basic_types::Literal::new(solver.new_variable(), true);

    solver
        .add_weight_constraint_ge(cardinality, vec![a, b], vec![1, 2], 3)
        .unwrap();
    assert!(solver.value(a).is_true());
    assert!(solver.value(b).is_true());

    // bound beyond Σw is infeasible and latches the solver.
    let mut solver = SatSolver::default();
    let cardinality = solver.register_weight_constraints();
    let a = crate::basic_types::Literal::new(solver.new_variable(), true);
    let result = solver.add_weight_constraint_ge(cardinality, vec![a], vec![1], 2);
    assert!(result.is_err());
    assert!(!solver.is_ok());

    // A nonpositive bound is trivially true.
    let mut solver = SatSolver::default();
    let cardinality = solver.register_weight_constraints();
    let a = crate::basic_types::Literal::new(solver.new_variable(), true);
    solver
        .add_weight_constraint_ge(cardinality, vec![a], vec![1], 0)
        .unwrap();
    assert!(solver.value(a).is_undef());
}

#[test]
fn complementary_pairs_cancel_against_the_bound() {
    let mut solver = SatSolver::default();
    let cardinality = solver.register_weight_constraints();
    let a = crate::basic_types::Literal::new(solver.new_variable(), true);

    // 1·a + 1·a + 1·¬a ≥ 2 canonicalises to 1·a ≥ 1: a unit.
    solver
        .add_weight_constraint_ge(cardinality, vec![a, a, !a], vec![1, 1, 1], 2)
        .unwrap();
    assert!(solver.value(a).is_true());
}

#[test]
fn equality_constraints_bound_from_both_sides() {
    let mut solver = SatSolver::default();
    let cardinality = solver.register_weight_constraints();
    let literals: Vec<_> = (0..3)
        .map(|_| crate::basic_types::Literal::new(solver.new_variable(), true))
        .collect();

    solver
        .add_weight_constraint_eq(cardinality, literals.clone(), vec![1, 1, 1], 1)
        .unwrap();
    assert!(solver.activate_propagators());

    assert_eq!(solver.solve(), SolverExecutionFlag::Feasible);
    let num_true = literals
        .iter()
        .filter(|&&literal| solver.value(literal).is_true())
        .count();
    assert_eq!(num_true, 1);
}
