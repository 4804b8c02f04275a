//! Reified linear inequalities `Σ wᵢ·[lᵢ] ≥ b` over literals with nonnegative
//! integer weights. Cardinality constraints are the all-weights-one special
//! case.

use fnv::FnvHashMap;
use log::trace;

use super::axioms::AxiomId;
use super::axioms::AxiomStore;
use super::axioms::Observation;
use super::propagator::Conflict;
use super::propagator::PropagationContext;
use super::propagator::PropagationContextMut;
use super::propagator::PropagationStatus;
use super::propagator::Propagator;
use super::propagator::SimplificationContext;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::engine::Assignments;
use crate::torrone_assert_moderate;
use crate::torrone_assert_simple;

/// A single weight constraint in canonical form: literals sorted by weight
/// descending, and `loosable` tracking how much weight may still be lost
/// before the bound is violated.
#[derive(Clone, Debug)]
pub(crate) struct WeightConstraint {
    literals: Vec<Literal>,
    weights: Vec<i64>,
    loosable: i64,
}

#[derive(Clone, Debug)]
pub(crate) struct WeightConstraintPropagator {
    axioms: KeyedVec<AxiomId, WeightConstraint>,
    store: AxiomStore,
}

impl Default for WeightConstraintPropagator {
    fn default() -> Self {
        WeightConstraintPropagator {
            axioms: KeyedVec::default(),
            store: AxiomStore::new(true),
        }
    }
}

impl WeightConstraintPropagator {
    /// Add `Σ wᵢ·[lᵢ] ≥ bound` at the root level.
    ///
    /// Preprocessing drops assigned literals (true ones pay into the bound),
    /// merges duplicates, and cancels complementary pairs against the bound.
    /// The degenerate forms never create an axiom: a trivially satisfied
    /// constraint is dropped, `bound = 1` becomes a clause, a tight bound
    /// forces every literal as a unit, and an unreachable bound is
    /// infeasible.
    pub(crate) fn add_greater_equal(
        &mut self,
        context: &mut SimplificationContext,
        literals: Vec<Literal>,
        weights: Vec<i64>,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        torrone_assert_simple!(context.assignments.is_at_the_root_level());
        torrone_assert_simple!(literals.len() == weights.len());
        torrone_assert_simple!(weights.iter().all(|&weight| weight >= 0));

        let mut bound = bound;
        let mut canonical: Vec<(Literal, i64)> = Vec::with_capacity(literals.len());
        let mut index_of_variable: FnvHashMap<PropositionalVariable, usize> =
            FnvHashMap::default();

        for (literal, weight) in literals.into_iter().zip(weights) {
            if weight == 0 {
                continue;
            }
            if context.assignments.is_literal_assigned_true(literal) {
                bound -= weight;
                continue;
            }
            if context.assignments.is_literal_assigned_false(literal) {
                continue;
            }

            let variable = literal.get_propositional_variable();
            match index_of_variable.get(&variable) {
                None => {
                    let _ = index_of_variable.insert(variable, canonical.len());
                    canonical.push((literal, weight));
                }
                Some(&position) => {
                    let (existing, existing_weight) = canonical[position];
                    if existing == literal {
                        canonical[position].1 += weight;
                    } else {
                        // Complementary pair: one of the two is always true,
                        // so the lesser weight is paid unconditionally.
                        let cancelled = existing_weight.min(weight);
                        bound -= cancelled;
                        if existing_weight >= weight {
                            canonical[position].1 -= weight;
                        } else {
                            canonical[position] = (literal, weight - existing_weight);
                        }
                    }
                }
            }
        }

        canonical.retain(|&(_, weight)| weight > 0);
        let total: i64 = canonical.iter().map(|&(_, weight)| weight).sum();

        if bound <= 0 {
            return Ok(());
        }
        if bound > total {
            return Err(ConstraintOperationError::InfeasibleConstraint);
        }
        if bound == total {
            for &(literal, _) in &canonical {
                context.add_clause(vec![literal])?;
            }
            return Ok(());
        }
        if bound == 1 {
            let clause = canonical.iter().map(|&(literal, _)| literal).collect();
            return context.add_clause(clause);
        }

        canonical.sort_by(|a, b| b.1.cmp(&a.1));

        let constraint = WeightConstraint {
            literals: canonical.iter().map(|&(literal, _)| literal).collect(),
            weights: canonical.iter().map(|&(_, weight)| weight).collect(),
            loosable: total - bound,
        };
        trace!(
            "new weight constraint over {} literals, loosable {}",
            constraint.literals.len(),
            constraint.loosable
        );

        let axiom = self.axioms.push(constraint);
        for (slot, &(literal, _)) in canonical.iter().enumerate() {
            self.store.watch(axiom, !literal, slot as u32);
        }

        Ok(())
    }

    /// `Σ wᵢ·[lᵢ] ≤ bound`, rewritten over the negated literals.
    pub(crate) fn add_less_equal(
        &mut self,
        context: &mut SimplificationContext,
        literals: Vec<Literal>,
        weights: Vec<i64>,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        let total: i64 = weights.iter().sum();
        let negated = literals.into_iter().map(|literal| !literal).collect();
        self.add_greater_equal(context, negated, weights, total - bound)
    }

    /// `Σ wᵢ·[lᵢ] = bound`, encoded as the conjunction of `≥` and `≤`.
    pub(crate) fn add_equal(
        &mut self,
        context: &mut SimplificationContext,
        literals: Vec<Literal>,
        weights: Vec<i64>,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        self.add_greater_equal(context, literals.clone(), weights.clone(), bound)?;
        self.add_less_equal(context, literals, weights, bound)
    }

    /// The conflict clause of a violated axiom: every falsified literal
    /// assigned above the root. The falsified literal of largest trail index
    /// acts as the pivot, so the clause is currently false in its entirety.
    fn conflict_clause(&self, axiom: AxiomId, assignments: &Assignments) -> Vec<Literal> {
        let constraint = &self.axioms[axiom];
        let clause: Vec<Literal> = constraint
            .literals
            .iter()
            .copied()
            .filter(|&literal| {
                assignments.is_literal_assigned_false(literal)
                    && assignments.get_assignment_level(literal.get_propositional_variable()) > 0
            })
            .collect();
        torrone_assert_moderate!(clause
            .iter()
            .all(|&literal| assignments.is_literal_assigned_false(literal)));
        clause
    }

    fn on_assign(
        &mut self,
        literal: Literal,
        observation: Observation,
        context: &mut PropagationContextMut,
    ) -> Result<(), ()> {
        let notified_index = context
            .assignments
            .get_assigned_index(literal.get_propositional_variable());

        let loosable = {
            let constraint = &mut self.axioms[observation.axiom];
            constraint.loosable -= constraint.weights[observation.slot as usize];
            constraint.loosable
        };
        trace!("weight constraint notified by {literal}, loosable now {loosable}");

        if loosable < 0 {
            let clause = self.conflict_clause(observation.axiom, context.assignments);
            self.store.store_conflict(clause);
            return Err(());
        }

        for position in 0..self.axioms[observation.axiom].literals.len() {
            let constraint = &self.axioms[observation.axiom];
            if constraint.weights[position] <= loosable {
                break;
            }
            let forced = constraint.literals[position];
            if context.assignments.is_literal_unassigned(forced) {
                trace!("weight constraint infers {forced}");
                self.store
                    .set_reason(forced.get_propositional_variable(), observation.axiom);
                context.enqueue_propagated_literal(forced);
            } else if context.assignments.is_literal_assigned_false(forced)
                && context
                    .assignments
                    .get_assignment_level(forced.get_propositional_variable())
                    > 0
                && context
                    .assignments
                    .get_assigned_index(forced.get_propositional_variable())
                    > notified_index
            {
                // A literal this constraint should have forced was falsified
                // later in the same propagation batch.
                let clause = self.conflict_clause(observation.axiom, context.assignments);
                self.store.store_conflict(clause);
                return Err(());
            }
        }

        Ok(())
    }

    fn on_simplify(
        &mut self,
        literal: Literal,
        observation: Observation,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError> {
        let constraint = &mut self.axioms[observation.axiom];
        constraint.loosable -= constraint.weights[observation.slot as usize];

        if constraint.loosable < 0 {
            // The constraint is violated by root assignments; the negated
            // notification literal closes the contradiction.
            return context.add_clause(vec![!literal]);
        }

        let loosable = constraint.loosable;
        for position in 0..self.axioms[observation.axiom].literals.len() {
            let constraint = &self.axioms[observation.axiom];
            if constraint.weights[position] <= loosable {
                break;
            }
            let forced = constraint.literals[position];
            if context.assignments.is_literal_unassigned(forced) {
                context.add_clause(vec![forced])?;
            }
        }

        Ok(())
    }
}

impl Propagator for WeightConstraintPropagator {
    fn name(&self) -> &str {
        "WeightConstraints"
    }

    fn on_new_variable(&mut self) {
        self.store.grow();
    }

    fn activate(
        &mut self,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError> {
        self.simplify(context)
    }

    fn simplify(
        &mut self,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError> {
        let trail_size = context.assignments.num_trail_entries();
        while let Some(literal) = self.store.next_literal(context.assignments) {
            for index in 0..self.store.num_observations(literal) {
                let observation = self.store.observation(literal, index);
                self.on_simplify(literal, observation, context)?;
            }
            if context.assignments.num_trail_entries() > trail_size {
                break;
            }
        }
        Ok(())
    }

    fn propagate(&mut self, context: &mut PropagationContextMut) -> PropagationStatus {
        let trail_size = context.assignments.num_trail_entries();
        while let Some(literal) = self.store.next_literal(context.assignments) {
            for index in 0..self.store.num_observations(literal) {
                let observation = self.store.observation(literal, index);
                if self.on_assign(literal, observation, context).is_err() {
                    self.store.record_partial_unassign(literal, index);
                    return Err(Conflict {
                        literals: self.store.take_conflict(),
                    });
                }
            }
            if context.assignments.num_trail_entries() > trail_size {
                break;
            }
        }
        Ok(())
    }

    fn get_reason(&mut self, literal: Literal, context: PropagationContext) -> Vec<Literal> {
        let axiom = self
            .store
            .reason_axiom(literal.get_propositional_variable())
            .expect("a reason is only requested for literals this propagator enqueued");
        let constraint = &self.axioms[axiom];
        let literal_index = context
            .assignments
            .get_assigned_index(literal.get_propositional_variable());

        let mut reason = vec![literal];
        reason.extend(constraint.literals.iter().copied().filter(|&other| {
            context.assignments.is_literal_assigned_false(other)
                && context
                    .assignments
                    .get_assignment_level(other.get_propositional_variable())
                    > 0
                && context
                    .assignments
                    .get_assigned_index(other.get_propositional_variable())
                    < literal_index
        }));
        reason
    }

    fn on_cancel(&mut self, context: PropagationContext, unassigned: &[Literal]) {
        let axioms = &mut self.axioms;
        self.store
            .on_cancel(context.assignments, unassigned, |_, observation| {
                let constraint = &mut axioms[observation.axiom];
                constraint.loosable += constraint.weights[observation.slot as usize];
            });
    }
}
