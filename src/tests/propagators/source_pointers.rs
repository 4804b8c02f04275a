use crate::basic_types::Literal;
use crate::basic_types::SolverExecutionFlag;
use crate::engine::test_helper::TestSolver;
use crate::engine::SatSolver;
use crate::propagation::Propagator;
use crate::propagation::SourcePointerPropagator;

#[test]
fn mutually_supported_atoms_are_unfounded_at_the_root() {
    let mut solver = SatSolver::default();
    let source_pointers = solver.register_source_pointers();
    let a = Literal::new(solver.new_variable(), true);
    let b = Literal::new(solver.new_variable(), true);
    let body = Literal::new(solver.new_variable(), true);

    // a is supported through b, b through a; the body never grounds either.
    solver.add_source_pointer_support(
        source_pointers,
        a.get_propositional_variable(),
        body,
        vec![b.get_propositional_variable()],
    );
    solver.add_source_pointer_support(
        source_pointers,
        b.get_propositional_variable(),
        body,
        vec![a.get_propositional_variable()],
    );

    assert!(solver.activate_propagators());
    assert!(solver.value(a).is_false());
    assert!(solver.value(b).is_false());

    // Requiring one of the two is then inconsistent.
    assert!(solver.add_clause(vec![a, b]).is_err());
    assert_eq!(solver.solve(), SolverExecutionFlag::Infeasible);
}

#[test]
fn grounded_chains_survive_activation() {
    let mut solver = SatSolver::default();
    let source_pointers = solver.register_source_pointers();
    let a = Literal::new(solver.new_variable(), true);
    let b = Literal::new(solver.new_variable(), true);
    let body_a = Literal::new(solver.new_variable(), true);
    let body_b = Literal::new(solver.new_variable(), true);

    // a has a non-recursive support; b recursively depends on a.
    solver.add_source_pointer_support(
        source_pointers,
        a.get_propositional_variable(),
        body_a,
        vec![],
    );
    solver.add_source_pointer_support(
        source_pointers,
        b.get_propositional_variable(),
        body_b,
        vec![a.get_propositional_variable()],
    );

    assert!(solver.activate_propagators());
    assert!(solver.value(a).is_undef());
    assert!(solver.value(b).is_undef());

    solver.add_clause(vec![a, b]).unwrap();
    assert_eq!(solver.solve(), SolverExecutionFlag::Feasible);
}

#[test]
fn falsified_body_cascades_along_the_back_index() {
    let mut solver = TestSolver::default();
    let a = solver.new_literal();
    let b = solver.new_literal();
    let body = solver.new_literal();

    let mut propagator = SourcePointerPropagator::default();
    for _ in 0..3 {
        propagator.on_new_variable();
    }
    propagator.add(
        a.get_propositional_variable(),
        body,
        vec![],
        &solver.assignments,
    );
    propagator.add(
        b.get_propositional_variable(),
        body,
        vec![a.get_propositional_variable()],
        &solver.assignments,
    );
    propagator
        .activate(&mut solver.simplification_context())
        .unwrap();
    assert!(solver.value(a).is_undef());

    // Falsifying the shared body removes both sources transitively.
    solver.decide(!body);
    assert!(solver.propagate(&mut propagator).is_ok());
    assert!(solver.value(a).is_false());
    assert!(solver.value(b).is_false());

    // Reasons ground the unfoundedness in the falsified body.
    let reason = solver.get_reason(&mut propagator, !a);
    assert_eq!(reason[0], !a);
    assert!(reason[1..].contains(&body));

    // After the backjump the atoms are open again and the next cycle finds
    // no unfounded set.
    solver.backtrack(0, &mut propagator);
    assert!(solver.value(a).is_undef());
    solver.decide(body);
    assert!(solver.propagate(&mut propagator).is_ok());
    assert!(solver.value(a).is_undef());
    assert!(solver.value(b).is_undef());
}

#[test]
fn a_true_unfounded_atom_is_a_conflict() {
    let mut solver = TestSolver::default();
    let a = solver.new_literal();
    let body = solver.new_literal();

    let mut propagator = SourcePointerPropagator::default();
    propagator.on_new_variable();
    propagator.on_new_variable();
    propagator.add(
        a.get_propositional_variable(),
        body,
        vec![],
        &solver.assignments,
    );
    propagator
        .activate(&mut solver.simplification_context())
        .unwrap();

    solver.decide(a);
    solver.decide(!body);
    let conflict = solver.propagate(&mut propagator);
    let conflict = conflict.expect_err("a true atom without support must conflict");
    assert_eq!(conflict.literals[0], !a);
    for &literal in &conflict.literals {
        assert!(solver.value(literal).is_false());
    }
}

#[test]
fn alternative_supports_keep_atoms_founded() {
    let mut solver = TestSolver::default();
    let a = solver.new_literal();
    let body_one = solver.new_literal();
    let body_two = solver.new_literal();

    let mut propagator = SourcePointerPropagator::default();
    for _ in 0..3 {
        propagator.on_new_variable();
    }
    propagator.add(
        a.get_propositional_variable(),
        body_one,
        vec![],
        &solver.assignments,
    );
    propagator.add(
        a.get_propositional_variable(),
        body_two,
        vec![],
        &solver.assignments,
    );
    propagator
        .activate(&mut solver.simplification_context())
        .unwrap();

    // Losing one body is compensated by re-sourcing through the other.
    solver.decide(!body_one);
    assert!(solver.propagate(&mut propagator).is_ok());
    assert!(solver.value(a).is_undef());

    // Losing both is not.
    solver.decide(!body_two);
    assert!(solver.propagate(&mut propagator).is_ok());
    assert!(solver.value(a).is_false());
}
