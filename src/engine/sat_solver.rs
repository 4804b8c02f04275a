//! The CDCL core with registered theory propagators: budgeted solving under
//! assumptions, clause learning, restarts, root simplification to fixpoint
//! and failed-assumption core extraction.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use log::debug;
use log::trace;

use super::assignments::Assignments;
use super::clausal_propagator::ClausalPropagator;
use super::clause_allocator::ClauseAllocator;
use super::conflict_analysis::ConflictAnalyser;
use super::conflict_analysis::StoredConflictInfo;
use super::restart::luby;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::ConstraintReference;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::basic_types::SolverExecutionFlag;
use crate::basic_types::TruthValue;
use crate::branching::Brancher;
use crate::options::SolverOptions;
use crate::propagation::PropagationContext;
use crate::propagation::PropagationContextMut;
use crate::propagation::Propagator;
use crate::propagation::PropagatorId;
use crate::propagation::PropagatorKind;
use crate::propagation::SimplificationContext;
use crate::statistics::log_statistic;
use crate::torrone_assert_moderate;
use crate::torrone_assert_simple;

/// The CDCL solver together with its theory propagators.
///
/// Propagators are polled in registration order once clausal propagation has
/// reached a fixpoint; any theory inference hands control back to the clausal
/// propagator. At the root, theory inferences go through the clause-add path
/// so they become persistent.
#[derive(Clone, Debug)]
pub struct SatSolver {
    state: SolverState,
    assignments: Assignments,
    clause_allocator: ClauseAllocator,
    clausal_propagator: ClausalPropagator,
    propagators: Vec<PropagatorKind>,
    /// Theory propagation is gated until the loaded program is closed;
    /// until then only clausal propagation runs.
    propagators_active: bool,
    analyser: ConflictAnalyser,
    brancher: Brancher,
    assumptions: Vec<Literal>,
    /// After an infeasible-under-assumptions outcome: the clause of negated
    /// responsible assumptions. Empty means proven infeasible outright.
    conflict_core: Vec<Literal>,
    /// The last model copied out; indexed by variable. Stable across
    /// subsequent solve calls.
    model: Vec<TruthValue>,
    counters: Counters,
    options: SolverOptions,
    conflict_budget: Option<u64>,
    interrupt: Arc<AtomicBool>,
    /// Persistent infeasibility flag; once false every solve call returns
    /// infeasible immediately.
    ok: bool,
}

impl Default for SatSolver {
    fn default() -> Self {
        SatSolver::new(SolverOptions::default())
    }
}

impl SatSolver {
    pub fn new(options: SolverOptions) -> SatSolver {
        SatSolver {
            state: SolverState::default(),
            assignments: Assignments::default(),
            clause_allocator: ClauseAllocator::default(),
            clausal_propagator: ClausalPropagator::default(),
            propagators: Vec::default(),
            propagators_active: false,
            analyser: ConflictAnalyser::default(),
            brancher: Brancher::default(),
            assumptions: Vec::default(),
            conflict_core: Vec::default(),
            model: Vec::default(),
            counters: Counters::default(),
            options,
            conflict_budget: None,
            interrupt: Arc::new(AtomicBool::new(false)),
            ok: true,
        }
    }

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn new_variable(&mut self) -> PropositionalVariable {
        let variable = self.assignments.grow();
        self.clausal_propagator.grow();
        self.brancher.grow(variable);
        self.analyser.grow();
        for propagator in &mut self.propagators {
            propagator.on_new_variable();
        }
        variable
    }

    pub fn num_variables(&self) -> usize {
        self.assignments.num_variables()
    }

    /// Make sure variables up to the DIMACS index `bound` exist.
    pub fn grow_to_dimacs(&mut self, bound: i64) {
        while (self.num_variables() as i64) < bound.abs() {
            let _ = self.new_variable();
        }
    }

    pub(crate) fn register_propagator(&mut self, mut propagator: PropagatorKind) -> PropagatorId {
        // Catch up on variables created before registration; from here on the
        // per-variable arrays grow in lockstep.
        for _ in 0..self.num_variables() {
            propagator.on_new_variable();
        }
        self.propagators.push(propagator);
        PropagatorId(self.propagators.len() as u32 - 1)
    }

    pub fn register_weight_constraints(&mut self) -> PropagatorId {
        self.register_propagator(PropagatorKind::WeightConstraints(Default::default()))
    }

    pub fn register_source_pointers(&mut self) -> PropagatorId {
        self.register_propagator(PropagatorKind::SourcePointers(Default::default()))
    }

    /// Close the loaded program: one-shot root simplification of every
    /// propagator, then root propagation to fixpoint. Returns `false` when
    /// the program is infeasible.
    pub fn activate_propagators(&mut self) -> bool {
        torrone_assert_simple!(self.assignments.is_at_the_root_level());
        if !self.ok {
            return false;
        }
        self.propagators_active = true;

        let SatSolver {
            propagators,
            assignments,
            clausal_propagator,
            clause_allocator,
            ..
        } = self;
        let mut context = SimplificationContext {
            assignments,
            clausal_propagator,
            clause_allocator,
        };
        for propagator in propagators.iter_mut() {
            if propagator.activate(&mut context).is_err() {
                self.ok = false;
                self.state.declare_infeasible();
                return false;
            }
        }

        self.propagate_at_root()
    }

    /// Add a clause to the current formula at the root level and propagate.
    /// Once this fails, every later call fails as well.
    pub fn add_clause(
        &mut self,
        literals: impl IntoIterator<Item = Literal>,
    ) -> Result<(), ConstraintOperationError> {
        if !self.ok {
            return Err(ConstraintOperationError::InfeasibleClause);
        }
        if !self.assignments.is_at_the_root_level() {
            self.cancel_until(0);
        }

        let literals: Vec<Literal> = literals.into_iter().collect();
        let result = self.clausal_propagator.add_permanent_clause(
            literals,
            &mut self.assignments,
            &mut self.clause_allocator,
        );
        if result.is_err() {
            self.ok = false;
            self.state.declare_infeasible();
            return result;
        }

        if !self.propagate_at_root() {
            return Err(ConstraintOperationError::InfeasibleClause);
        }
        Ok(())
    }

    /// Add `Σ wᵢ·[lᵢ] ≥ bound` through the given weight-constraint
    /// propagator.
    pub fn add_weight_constraint_ge(
        &mut self,
        propagator: PropagatorId,
        literals: Vec<Literal>,
        weights: Vec<i64>,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        self.with_weight_constraints(propagator, |weight_constraints, context| {
            weight_constraints.add_greater_equal(context, literals, weights, bound)
        })
    }

    pub fn add_weight_constraint_le(
        &mut self,
        propagator: PropagatorId,
        literals: Vec<Literal>,
        weights: Vec<i64>,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        self.with_weight_constraints(propagator, |weight_constraints, context| {
            weight_constraints.add_less_equal(context, literals, weights, bound)
        })
    }

    pub fn add_weight_constraint_eq(
        &mut self,
        propagator: PropagatorId,
        literals: Vec<Literal>,
        weights: Vec<i64>,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        self.with_weight_constraints(propagator, |weight_constraints, context| {
            weight_constraints.add_equal(context, literals, weights, bound)
        })
    }

    fn with_weight_constraints(
        &mut self,
        propagator: PropagatorId,
        operation: impl FnOnce(
            &mut crate::propagation::WeightConstraintPropagator,
            &mut SimplificationContext,
        ) -> Result<(), ConstraintOperationError>,
    ) -> Result<(), ConstraintOperationError> {
        if !self.ok {
            return Err(ConstraintOperationError::InfeasibleConstraint);
        }
        if !self.assignments.is_at_the_root_level() {
            self.cancel_until(0);
        }

        let result = {
            let SatSolver {
                propagators,
                assignments,
                clausal_propagator,
                clause_allocator,
                ..
            } = self;
            let mut context = SimplificationContext {
                assignments,
                clausal_propagator,
                clause_allocator,
            };
            operation(
                propagators[propagator.0 as usize].weight_constraints_mut(),
                &mut context,
            )
        };

        if result.is_err() {
            self.ok = false;
            self.state.declare_infeasible();
            return result;
        }
        if !self.propagate_at_root() {
            return Err(ConstraintOperationError::InfeasibleConstraint);
        }
        Ok(())
    }

    /// Declare a support of a recursive head atom with the given source
    /// pointer propagator.
    pub fn add_source_pointer_support(
        &mut self,
        propagator: PropagatorId,
        atom: PropositionalVariable,
        body: Literal,
        rec: Vec<PropositionalVariable>,
    ) {
        let SatSolver {
            propagators,
            assignments,
            ..
        } = self;
        propagators[propagator.0 as usize]
            .source_pointers_mut()
            .add(atom, body, rec, assignments);
    }

    /// Bound the number of conflicts of subsequent solve calls.
    pub fn set_conflict_budget(&mut self, conflicts: u64) {
        self.conflict_budget = Some(conflicts);
    }

    pub fn clear_conflict_budget(&mut self) {
        self.conflict_budget = None;
    }

    pub fn solve(&mut self) -> SolverExecutionFlag {
        self.solve_under_assumptions(&[])
    }

    /// Run the CDCL search under the given assumptions, within the conflict
    /// budget if one is set. On [`SolverExecutionFlag::Feasible`] the trail
    /// holds a full assignment; on [`SolverExecutionFlag::Infeasible`] the
    /// conflict core is available through [`SatSolver::extract_core`].
    pub fn solve_under_assumptions(&mut self, assumptions: &[Literal]) -> SolverExecutionFlag {
        self.conflict_core.clear();
        if !self.ok {
            return SolverExecutionFlag::Infeasible;
        }
        if !self.assignments.is_at_the_root_level() {
            self.cancel_until(0);
        }

        let start_time = Instant::now();
        assumptions.clone_into(&mut self.assumptions);
        self.state.declare_solving();

        let result = self.solve_internal();

        self.counters.time_spent_in_solver += start_time.elapsed().as_millis() as u64;
        result
    }

    fn solve_internal(&mut self) -> SolverExecutionFlag {
        let mut conflicts_this_call: u64 = 0;
        let mut conflicts_until_restart =
            luby(0) * self.options.luby_restart_unit;
        let mut num_restarts: u64 = 0;

        loop {
            let trail_size = self.assignments.num_trail_entries();
            let conflict = self.propagate_enqueued();
            self.counters.num_propagations +=
                (self.assignments.num_trail_entries() - trail_size) as u64;

            match conflict {
                Some(conflict) => {
                    self.counters.num_conflicts += 1;
                    conflicts_this_call += 1;

                    if self.assignments.is_at_the_root_level() {
                        self.ok = false;
                        self.state.declare_infeasible();
                        return SolverExecutionFlag::Infeasible;
                    }

                    self.resolve_conflict(&conflict);

                    if let Some(budget) = self.conflict_budget {
                        if conflicts_this_call >= budget {
                            debug!("conflict budget of {budget} exhausted");
                            self.state.declare_unknown();
                            return SolverExecutionFlag::Unknown;
                        }
                    }

                    if conflicts_this_call >= conflicts_until_restart {
                        num_restarts += 1;
                        self.counters.num_restarts += 1;
                        conflicts_until_restart = conflicts_this_call
                            + luby(num_restarts) * self.options.luby_restart_unit;
                        if self.is_interrupted() {
                            self.state.declare_unknown();
                            return SolverExecutionFlag::Unknown;
                        }
                        if self.assignments.get_decision_level() > 0 {
                            trace!("restart {num_restarts}");
                            self.cancel_until(0);
                        }
                    }
                }
                None => {
                    if let Some(flag) = self.enqueue_next_decision() {
                        return flag;
                    }
                }
            }
        }
    }

    /// Open a new decision level and place either the next assumption or a
    /// branching decision on it. Returns the final flag when the search is
    /// over.
    fn enqueue_next_decision(&mut self) -> Option<SolverExecutionFlag> {
        self.declare_new_decision_level();
        let level = self.assignments.get_decision_level();

        if level <= self.assumptions.len() {
            // By convention the i-th assumption is assigned at level i+1.
            let assumption = self.assumptions[level - 1];
            if self.assignments.is_literal_unassigned(assumption) {
                self.assignments
                    .enqueue(assumption, ConstraintReference::None);
                None
            } else if self.assignments.is_literal_assigned_true(assumption) {
                // Already propagated by earlier assumptions; the level stays
                // empty.
                None
            } else {
                self.conflict_core = self.analyser.analyse_final(
                    assumption,
                    &self.assignments,
                    &self.clause_allocator,
                    &mut self.propagators,
                );
                self.state.declare_infeasible_under_assumptions(assumption);
                Some(SolverExecutionFlag::Infeasible)
            }
        } else {
            let decision = self.brancher.next_decision(
                &self.assignments,
                &mut self.options.random_generator,
            );
            match decision {
                Some(literal) => {
                    self.counters.num_decisions += 1;
                    self.assignments.enqueue(literal, ConstraintReference::None);
                    None
                }
                None => {
                    self.state.declare_solution_found();
                    Some(SolverExecutionFlag::Feasible)
                }
            }
        }
    }

    fn declare_new_decision_level(&mut self) {
        self.assignments.increase_decision_level();
    }

    fn resolve_conflict(&mut self, conflict: &StoredConflictInfo) {
        let learned = self.analyser.analyse(
            conflict,
            &self.assignments,
            &self.clause_allocator,
            &mut self.propagators,
            &mut self.brancher,
        );
        self.brancher.on_conflict();
        self.counters
            .average_learned_clause_length
            .add_term(learned.literals.len() as u64);

        self.cancel_until(learned.backjump_level);

        let asserting = learned.literals[0];
        if learned.literals.len() == 1 {
            torrone_assert_simple!(self.assignments.is_at_the_root_level());
            self.counters.num_unit_clauses_learned += 1;
            self.assignments.enqueue(asserting, ConstraintReference::None);
        } else {
            let reference = self
                .clause_allocator
                .create_clause(learned.literals, true);
            self.clausal_propagator
                .attach_clause(reference, &self.clause_allocator);
            self.assignments
                .enqueue(asserting, ConstraintReference::Clause(reference));
        }
        self.state.declare_solving();
    }

    /// Propagation to fixpoint across the clausal propagator and every
    /// registered theory propagator. At the root the theory propagators run
    /// through their simplification path instead.
    fn propagate_enqueued(&mut self) -> Option<StoredConflictInfo> {
        loop {
            if let Err(reference) = self
                .clausal_propagator
                .propagate(&mut self.assignments, &mut self.clause_allocator)
            {
                return Some(StoredConflictInfo::Clause(reference));
            }

            if !self.propagators_active || self.propagators.is_empty() {
                return None;
            }

            let trail_size = self.assignments.num_trail_entries();

            if self.assignments.is_at_the_root_level() {
                let SatSolver {
                    propagators,
                    assignments,
                    clausal_propagator,
                    clause_allocator,
                    ..
                } = self;
                let mut context = SimplificationContext {
                    assignments,
                    clausal_propagator,
                    clause_allocator,
                };
                for propagator in propagators.iter_mut() {
                    if propagator.simplify(&mut context).is_err() {
                        return Some(StoredConflictInfo::Root);
                    }
                    if context.assignments.num_trail_entries() > trail_size {
                        break;
                    }
                }
            } else {
                let SatSolver {
                    propagators,
                    assignments,
                    ..
                } = self;
                let mut conflict = None;
                for (index, propagator) in propagators.iter_mut().enumerate() {
                    let mut context =
                        PropagationContextMut::new(assignments, PropagatorId(index as u32));
                    if let Err(failure) = propagator.propagate(&mut context) {
                        conflict = Some(failure);
                        break;
                    }
                    if assignments.num_trail_entries() > trail_size {
                        break;
                    }
                }
                if let Some(conflict) = conflict {
                    torrone_assert_moderate!(conflict
                        .literals
                        .iter()
                        .all(|&literal| self.assignments.is_literal_assigned_false(literal)));
                    return Some(StoredConflictInfo::Explanation(conflict.literals));
                }
            }

            if self.assignments.num_trail_entries() == trail_size {
                return None;
            }
        }
    }

    /// Root propagation after loading operations; failures latch `ok`.
    fn propagate_at_root(&mut self) -> bool {
        torrone_assert_simple!(self.assignments.is_at_the_root_level());
        if self.propagate_enqueued().is_some() {
            self.ok = false;
            self.state.declare_infeasible();
            return false;
        }
        true
    }

    /// Backjump to `level`, restoring branching state and notifying every
    /// propagator with the removed literals, newest first.
    pub fn cancel_until(&mut self, level: usize) {
        if self.assignments.get_decision_level() <= level {
            return;
        }
        trace!("cancel until level {level}");

        let unassigned = self.assignments.synchronise(level);
        for &literal in &unassigned {
            self.brancher.on_unassign(literal);
        }
        self.clausal_propagator
            .synchronise(self.assignments.num_trail_entries());

        let SatSolver {
            propagators,
            assignments,
            ..
        } = self;
        for propagator in propagators.iter_mut() {
            propagator.on_cancel(PropagationContext { assignments }, &unassigned);
        }
    }

    pub fn get_decision_level(&self) -> usize {
        self.assignments.get_decision_level()
    }

    /// The truth value of a literal under the current trail.
    pub fn value(&self, literal: Literal) -> TruthValue {
        self.assignments.value_of_literal(literal)
    }

    /// The clause of negated assumptions certified unsatisfiable by the last
    /// infeasible solve; empty when infeasibility does not depend on the
    /// assumptions.
    pub fn extract_core(&self) -> &[Literal] {
        &self.conflict_core
    }

    /// Copy the current full assignment into stable storage; it survives
    /// later solve calls.
    pub fn copy_model(&mut self) {
        self.model = (0..self.num_variables())
            .map(|index| {
                self.assignments
                    .value_of_variable(PropositionalVariable::new(index as u32))
            })
            .collect();
    }

    pub fn has_model(&self) -> bool {
        !self.model.is_empty()
    }

    /// The stored model value of a literal; variables created after the copy
    /// are reported undefined.
    pub fn model_value(&self, literal: Literal) -> TruthValue {
        let index = literal.get_propositional_variable().index();
        let value = self.model.get(index).copied().unwrap_or(TruthValue::Undef);
        if literal.is_positive() {
            value
        } else {
            value.negate()
        }
    }

    pub fn model_slice(&self) -> &[TruthValue] {
        &self.model
    }

    /// Install the given assignment as the stored model (used when a sibling
    /// instance found the preferable model).
    pub fn set_model(&mut self, model: Vec<TruthValue>) {
        self.model = model;
    }

    /// Block the current model by learning the negation of its decisions,
    /// then backtrack one level so the search can continue. Returns `false`
    /// when the model had no decisions, in which case the search space is
    /// exhausted and `ok` latches.
    pub fn learn_clause_from_model(&mut self) -> bool {
        let mut literals = Vec::new();
        for level in (0..self.assignments.get_decision_level()).rev() {
            let position = self.assignments.get_trail_delimiter(level);
            if position >= self.assignments.num_trail_entries() {
                continue;
            }
            let decision = self.assignments.get_trail_entry(position);
            let variable = decision.get_propositional_variable();
            // Levels without their own decision (dummy assumption levels)
            // share a delimiter with the next level.
            if self.assignments.get_assignment_level(variable) != level + 1 {
                continue;
            }
            torrone_assert_moderate!(self.assignments.get_reason(variable).is_none());
            literals.push(!decision);
        }
        debug!("blocking clause over {} decisions", literals.len());

        if literals.is_empty() {
            self.ok = false;
            return false;
        }

        self.cancel_until(self.assignments.get_decision_level() - 1);
        let asserting = literals[0];
        if literals.len() == 1 {
            self.assignments.enqueue(asserting, ConstraintReference::None);
        } else {
            let reference = self.clause_allocator.create_clause(literals, true);
            self.clausal_propagator
                .attach_clause(reference, &self.clause_allocator);
            self.assignments
                .enqueue(asserting, ConstraintReference::Clause(reference));
        }
        true
    }

    pub fn log_statistics(&self) {
        self.counters.log_statistics();
    }
}

/// Mean tracked incrementally, for statistic output.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CumulativeMovingAverage {
    sum: u64,
    num_terms: u64,
}

impl CumulativeMovingAverage {
    pub(crate) fn add_term(&mut self, new_term: u64) {
        self.sum += new_term;
        self.num_terms += 1;
    }

    pub(crate) fn value(&self) -> f64 {
        if self.num_terms > 0 {
            (self.sum as f64) / (self.num_terms as f64)
        } else {
            0.0
        }
    }
}

/// Counters updated during search.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Counters {
    num_decisions: u64,
    num_conflicts: u64,
    num_propagations: u64,
    num_restarts: u64,
    num_unit_clauses_learned: u64,
    average_learned_clause_length: CumulativeMovingAverage,
    time_spent_in_solver: u64,
}

impl Counters {
    fn log_statistics(&self) {
        log_statistic("numberOfDecisions", self.num_decisions);
        log_statistic("numberOfConflicts", self.num_conflicts);
        log_statistic("numberOfPropagations", self.num_propagations);
        log_statistic("numberOfRestarts", self.num_restarts);
        log_statistic("numberOfLearnedUnitClauses", self.num_unit_clauses_learned);
        log_statistic(
            "averageLearnedClauseLength",
            self.average_learned_clause_length.value(),
        );
        log_statistic("timeSpentInSolverInMilliseconds", self.time_spent_in_solver);
    }
}

#[derive(Clone, Debug, Default)]
enum SolverStateInternal {
    #[default]
    Ready,
    Solving,
    ContainsSolution,
    Infeasible,
    InfeasibleUnderAssumptions {
        #[allow(unused)]
        violated_assumption: Literal,
    },
    Unknown,
}

/// The solver continuously changes states during the search; the state
/// tracks which outcomes are meaningful to query.
#[derive(Clone, Debug, Default)]
struct SolverState {
    internal_state: SolverStateInternal,
}

impl SolverState {
    fn declare_solving(&mut self) {
        self.internal_state = SolverStateInternal::Solving;
    }

    fn declare_infeasible(&mut self) {
        self.internal_state = SolverStateInternal::Infeasible;
    }

    fn declare_infeasible_under_assumptions(&mut self, violated_assumption: Literal) {
        self.internal_state = SolverStateInternal::InfeasibleUnderAssumptions {
            violated_assumption,
        };
    }

    fn declare_solution_found(&mut self) {
        self.internal_state = SolverStateInternal::ContainsSolution;
    }

    fn declare_unknown(&mut self) {
        self.internal_state = SolverStateInternal::Unknown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literals(solver: &mut SatSolver, count: usize) -> Vec<Literal> {
        (0..count)
            .map(|_| Literal::new(solver.new_variable(), true))
            .collect()
    }

    #[test]
    fn a_satisfiable_formula_is_feasible() {
        let mut solver = SatSolver::default();
        let lits = literals(&mut solver, 2);

        solver.add_clause(vec![lits[0], lits[1]]).unwrap();
        solver.add_clause(vec![!lits[0], !lits[1]]).unwrap();

        assert_eq!(solver.solve(), SolverExecutionFlag::Feasible);
        let one_true = solver.value(lits[0]).is_true() ^ solver.value(lits[1]).is_true();
        assert!(one_true);
    }

    #[test]
    fn contradictory_units_are_infeasible_and_latch() {
        let mut solver = SatSolver::default();
        let lits = literals(&mut solver, 1);

        solver.add_clause(vec![lits[0]]).unwrap();
        let result = solver.add_clause(vec![!lits[0]]);
        assert!(result.is_err());

        assert_eq!(solver.solve(), SolverExecutionFlag::Infeasible);
        assert!(solver.extract_core().is_empty());
        assert!(!solver.is_ok());
    }

    #[test]
    fn failed_assumptions_produce_a_core() {
        let mut solver = SatSolver::default();
        let lits = literals(&mut solver, 3);

        // lits[0] ∧ lits[1] → ¬lits[2]
        solver
            .add_clause(vec![!lits[0], !lits[1], !lits[2]])
            .unwrap();

        let flag = solver.solve_under_assumptions(&[lits[0], lits[1], lits[2]]);
        assert_eq!(flag, SolverExecutionFlag::Infeasible);

        let core = solver.extract_core();
        assert!(!core.is_empty());
        // The core names the negated responsible assumptions.
        assert!(core.iter().all(|&literal| [lits[0], lits[1], lits[2]]
            .contains(&!literal)));

        // The same instance stays solvable without the assumptions.
        assert_eq!(solver.solve(), SolverExecutionFlag::Feasible);
    }

    #[test]
    fn conflict_budget_yields_unknown_on_hard_instances() {
        let mut solver = SatSolver::default();
        // A small pigeonhole-style instance: three variables, pairwise
        // conflicting constraints that force search.
        let lits = literals(&mut solver, 6);
        for i in 0..6 {
            for j in (i + 1)..6 {
                solver.add_clause(vec![!lits[i], !lits[j]]).unwrap();
            }
        }
        solver.add_clause(lits.clone()).unwrap();

        solver.set_conflict_budget(0);
        // With a zero budget the first conflict aborts the solve; instances
        // solvable without conflicts still come back feasible.
        let flag = solver.solve();
        assert!(
            flag == SolverExecutionFlag::Feasible || flag == SolverExecutionFlag::Unknown
        );
        solver.clear_conflict_budget();
        assert_eq!(solver.solve(), SolverExecutionFlag::Feasible);
    }
}
