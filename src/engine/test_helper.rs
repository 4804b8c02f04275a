//! A barebones harness for stepwise propagator tests: a trail, a clausal
//! propagator and direct control over decision levels, without the full
//! search loop.

use super::Assignments;
use super::ClausalPropagator;
use super::ClauseAllocator;
use crate::basic_types::ConstraintReference;
use crate::basic_types::Literal;
use crate::basic_types::TruthValue;
use crate::propagation::PropagationContext;
use crate::propagation::PropagationContextMut;
use crate::propagation::PropagationStatus;
use crate::propagation::Propagator;
use crate::propagation::PropagatorId;
use crate::propagation::SimplificationContext;

#[derive(Debug, Default)]
pub(crate) struct TestSolver {
    pub(crate) assignments: Assignments,
    pub(crate) clausal_propagator: ClausalPropagator,
    pub(crate) clause_allocator: ClauseAllocator,
}

impl TestSolver {
    pub(crate) fn new_literal(&mut self) -> Literal {
        let variable = self.assignments.grow();
        self.clausal_propagator.grow();
        Literal::new(variable, true)
    }

    pub(crate) fn new_literals(&mut self, count: usize) -> Vec<Literal> {
        (0..count).map(|_| self.new_literal()).collect()
    }

    pub(crate) fn simplification_context(&mut self) -> SimplificationContext<'_> {
        SimplificationContext {
            assignments: &mut self.assignments,
            clausal_propagator: &mut self.clausal_propagator,
            clause_allocator: &mut self.clause_allocator,
        }
    }

    /// Open a new decision level and assign `literal`.
    pub(crate) fn decide(&mut self, literal: Literal) {
        self.assignments.increase_decision_level();
        self.assignments.enqueue(literal, ConstraintReference::None);
    }

    /// Run clausal propagation followed by the given propagator.
    pub(crate) fn propagate(&mut self, propagator: &mut impl Propagator) -> PropagationStatus {
        self.clausal_propagator
            .propagate(&mut self.assignments, &mut self.clause_allocator)
            .expect("clausal propagation is conflict-free in these tests");
        let mut context = PropagationContextMut::new(&mut self.assignments, PropagatorId(0));
        propagator.propagate(&mut context)
    }

    /// Backjump to `level`, forwarding the unassigned literals to the
    /// propagator as the solver would.
    pub(crate) fn backtrack(&mut self, level: usize, propagator: &mut impl Propagator) {
        let unassigned = self.assignments.synchronise(level);
        self.clausal_propagator
            .synchronise(self.assignments.num_trail_entries());
        propagator.on_cancel(
            PropagationContext {
                assignments: &self.assignments,
            },
            &unassigned,
        );
    }

    pub(crate) fn get_reason(
        &mut self,
        propagator: &mut impl Propagator,
        literal: Literal,
    ) -> Vec<Literal> {
        propagator.get_reason(
            literal,
            PropagationContext {
                assignments: &self.assignments,
            },
        )
    }

    pub(crate) fn value(&self, literal: Literal) -> TruthValue {
        self.assignments.value_of_literal(literal)
    }
}
