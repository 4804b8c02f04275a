//! End-to-end scenarios driving the engines over in-memory program text.

use crate::basic_types::Literal;
use crate::basic_types::SolverExecutionFlag;
use crate::engine::SatSolver;
use crate::engines::AspEngine;
use crate::engines::CircumscriptionEngine;
use crate::engines::EngineAnswer;
use crate::engines::MaxSatEngine;
use crate::engines::SatEngine;
use crate::options::EngineOptions;
use crate::options::SolverOptions;
use crate::parse::read_prolog;
use crate::parse::ProgramIdentifier;
use crate::parse::StreamBuffer;

fn options(max_models: u64) -> EngineOptions {
    EngineOptions {
        max_models,
        print_model: false,
        ..EngineOptions::default()
    }
}

fn prepare(input: &str) -> (StreamBuffer<&[u8]>, crate::parse::Prolog) {
    let mut stream = StreamBuffer::new(input.as_bytes()).unwrap();
    let prolog = read_prolog(&mut stream).unwrap();
    (stream, prolog)
}

#[test]
fn trivial_satisfiable_cnf() {
    let (mut stream, prolog) = prepare("p cnf 2 2\n1 2 0\n-1 -2 0\n");
    assert_eq!(prolog.identifier, ProgramIdentifier::Cnf);

    let mut engine = SatEngine::new(SolverOptions::default(), options(1));
    engine.load(&mut stream, &prolog).unwrap();
    assert_eq!(engine.solve(), EngineAnswer::Satisfiable);
}

#[test]
fn contradictory_units_are_unsatisfiable() {
    let (mut stream, prolog) = prepare("p cnf 1 2\n1 0\n-1 0\n");

    let mut engine = SatEngine::new(SolverOptions::default(), options(1));
    engine.load(&mut stream, &prolog).unwrap();
    assert_eq!(engine.solve(), EngineAnswer::Unsatisfiable);
}

#[test]
fn core_guided_maxsat_reaches_the_optimum() {
    let (mut stream, prolog) = prepare(
        "p wcnf 3 4 10\n10 1 2 3 0\n1 -1 0\n1 -2 0\n1 -3 0\n",
    );
    assert_eq!(prolog.top, Some(10));

    let mut engine = MaxSatEngine::new(SolverOptions::default(), options(1));
    engine.load(&mut stream, &prolog).unwrap();
    assert_eq!(engine.solve(), EngineAnswer::Satisfiable);

    // The hard clause forces a variable to be true; every true variable
    // falsifies its soft unit clause.
    assert_eq!(engine.optimum(), 1);
    let num_true = (1..=3)
        .filter(|&index| {
            engine
                .solver()
                .model_value(Literal::from_dimacs(index))
                .is_true()
        })
        .count();
    assert_eq!(num_true, 1);
}

#[test]
fn cardinality_constraint_holds_in_every_model() {
    let mut solver = SatSolver::default();
    let cardinality = solver.register_weight_constraints();
    let literals: Vec<Literal> = (0..4)
        .map(|_| Literal::new(solver.new_variable(), true))
        .collect();

    solver
        .add_weight_constraint_ge(cardinality, literals.clone(), vec![1, 1, 1, 1], 3)
        .unwrap();
    assert!(solver.activate_propagators());

    assert_eq!(solver.solve(), SolverExecutionFlag::Feasible);
    let num_true = literals
        .iter()
        .filter(|&&literal| solver.value(literal).is_true())
        .count();
    assert!(num_true >= 3);
}

#[test]
fn mutual_supports_without_grounding_are_inconsistent() {
    let (mut stream, prolog) = prepare("p asp\ns 1 3 2 0\ns 2 3 1 0\n1 2 0\nn 3\n");
    assert_eq!(prolog.identifier, ProgramIdentifier::Asp);

    let mut engine = AspEngine::new(SolverOptions::default(), options(1));
    engine.load(&mut stream, &prolog).unwrap();
    assert_eq!(engine.solve(), EngineAnswer::Unsatisfiable);
}

#[test]
fn top_k_enumeration_terminates_at_the_bound() {
    let (mut stream, prolog) = prepare(
        "p wcnf 3 4 10\n10 1 2 3 0\n1 -1 0\n1 -2 0\n1 -3 0\n",
    );

    let mut engine = MaxSatEngine::new(SolverOptions::default(), options(3));
    engine.load(&mut stream, &prolog).unwrap();
    assert_eq!(engine.solve(), EngineAnswer::Satisfiable);
}

#[test]
fn head_cycle_declarations_are_rejected() {
    let (mut stream, prolog) = prepare("p asp\nh 0 1 2 0 3 0 0\nn 3\n");

    let mut engine = AspEngine::new(SolverOptions::default(), options(1));
    let result = engine.load(&mut stream, &prolog);
    assert!(result.is_err());
}

#[test]
fn circumscription_answers_a_query_on_minimal_models() {
    // Models of (1 ∨ 2), preferring those with 1 true. A minimal model with
    // 2 true exists (both true), so the query succeeds.
    let (mut stream, prolog) = prepare("p circ\nq 2\nw 1\n1 2 0\nn 2\n");
    assert_eq!(prolog.identifier, ProgramIdentifier::Circumscription);

    let mut engine = CircumscriptionEngine::new(SolverOptions::default(), options(1));
    engine.load(&mut stream, &prolog).unwrap();
    assert_eq!(engine.solve(), EngineAnswer::Satisfiable);
    assert_eq!(engine.num_models(), 1);
}

#[test]
fn circumscription_rejects_queries_false_in_all_minimal_models() {
    // Preferred models make 1 true, so ¬1 never holds in a minimal model.
    let (mut stream, prolog) = prepare("p circ\nq -1\nw 1\n1 2 0\nn 2\n");

    let mut engine = CircumscriptionEngine::new(SolverOptions::default(), options(1));
    engine.load(&mut stream, &prolog).unwrap();
    assert_eq!(engine.solve(), EngineAnswer::Unsatisfiable);
}

#[test]
fn circumscription_dynamic_iterations_replay_assumptions() {
    // Two ASSERT batches: one compatible with the theory, one contradicting
    // it. The first answers, the second is infeasible; the run as a whole
    // reports satisfiable.
    let (mut stream, prolog) = prepare("p circ\n1 2 0\ns 1 0\ns -1 -2 0\nn 2\n");

    let mut engine = CircumscriptionEngine::new(SolverOptions::default(), options(1));
    engine.load(&mut stream, &prolog).unwrap();
    assert_eq!(engine.solve(), EngineAnswer::Satisfiable);
}
