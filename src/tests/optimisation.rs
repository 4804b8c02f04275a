//! Properties of the core-guided machinery: bound arithmetic, hardening
//! idempotence, and optimum preservation across the k-dyn reformulation.

use crate::engines::AspEngine;
use crate::engines::EngineAnswer;
use crate::engines::MaxSatEngine;
use crate::options::EngineOptions;
use crate::options::SolverOptions;
use crate::parse::read_prolog;
use crate::parse::StreamBuffer;

fn options() -> EngineOptions {
    EngineOptions {
        print_model: false,
        ..EngineOptions::default()
    }
}

fn solve_maxsat(input: &str) -> (EngineAnswer, i64) {
    let mut stream = StreamBuffer::new(input.as_bytes()).unwrap();
    let prolog = read_prolog(&mut stream).unwrap();
    let mut engine = MaxSatEngine::new(SolverOptions::default(), options());
    engine.load(&mut stream, &prolog).unwrap();
    let answer = engine.solve();
    (answer, engine.optimum())
}

#[test]
fn weighted_optimum_picks_the_cheaper_violation() {
    // (x1 ∨ x2) hard; falsifying x1 costs 3, x2 costs 5.
    let (answer, optimum) = solve_maxsat("p wcnf 2 3 100\n100 1 2 0\n3 -1 0\n5 -2 0\n");
    assert_eq!(answer, EngineAnswer::Satisfiable);
    assert_eq!(optimum, 3);
}

#[test]
fn kdyn_reformulation_preserves_the_optimum() {
    // All pairwise clauses over five variables force at least four of them
    // true; the soft units prefer all of them false. The cores discharged
    // on the way are large enough to be chunked.
    let mut input = String::from("p wcnf 5 14 100\n");
    for i in 1..=5 {
        for j in (i + 1)..=5 {
            input.push_str(&format!("100 {i} {j} 0\n"));
        }
    }
    for i in 1..=5 {
        input.push_str(&format!("1 -{i} 0\n"));
    }

    let (answer, optimum) = solve_maxsat(&input);
    assert_eq!(answer, EngineAnswer::Satisfiable);
    assert_eq!(optimum, 4);
}

#[test]
fn weighted_strata_are_discharged_from_the_heaviest() {
    // Two independent conflicts with different weights; the optimum pays
    // both.
    let input = "p wcnf 4 6 100\n\
                 100 1 2 0\n\
                 100 3 4 0\n\
                 7 -1 0\n7 -2 0\n\
                 2 -3 0\n2 -4 0\n";
    let (answer, optimum) = solve_maxsat(input);
    assert_eq!(answer, EngineAnswer::Satisfiable);
    assert_eq!(optimum, 9);
}

#[test]
fn unsatisfiable_hard_clauses_are_reported() {
    let (answer, _) = solve_maxsat("p wcnf 1 3 10\n10 1 0\n10 -1 0\n1 1 0\n");
    assert_eq!(answer, EngineAnswer::Unsatisfiable);
}

#[test]
fn hardening_is_idempotent() {
    use crate::basic_types::Literal;
    use crate::engine::SatSolver;
    use crate::optimisation::CoreGuidedSearch;
    use crate::optimisation::OptimisationLevel;

    let mut solver = SatSolver::default();
    let cardinality = solver.register_weight_constraints();
    let mut search = CoreGuidedSearch::new(cardinality);

    let cheap = Literal::new(solver.new_variable(), true);
    let costly = Literal::new(solver.new_variable(), true);
    search.pool.add(cheap, 1, 0);
    search.pool.add(costly, 10, 0);

    let mut level = OptimisationLevel::new(0);
    level.lower_bound = 2;
    level.upper_bound = 8;

    // Only the costly literal crosses the bound gap.
    search.harden(&mut solver, &level, true);
    let after_first: Vec<_> = search.pool.literals().to_vec();
    assert_eq!(after_first, vec![cheap]);
    assert!(solver.value(costly).is_true());

    search.harden(&mut solver, &level, true);
    assert_eq!(search.pool.literals(), after_first.as_slice());
}

#[test]
fn asp_levels_are_optimized_lexicographically() {
    // Level 1 dominates: x1 stays false, forcing x2 true at level 0's
    // expense.
    let input = "p asp\nw -1 2 1\nw -2 3 0\n1 2 0\nn 2\n";
    let mut stream = StreamBuffer::new(input.as_bytes()).unwrap();
    let prolog = read_prolog(&mut stream).unwrap();
    let mut engine = AspEngine::new(SolverOptions::default(), options());
    engine.load(&mut stream, &prolog).unwrap();

    assert_eq!(engine.solve(), EngineAnswer::Satisfiable);

    let solved = engine.solved_levels();
    assert_eq!(solved.len(), 2);
    assert_eq!(solved[0].level, 1);
    assert_eq!(solved[0].lower_bound, 0);
    assert_eq!(solved[1].level, 0);
    assert_eq!(solved[1].lower_bound, 3);
}
