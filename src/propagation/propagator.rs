//! The contract between the solver and its theory propagators.

use crate::basic_types::ConstraintOperationError;
use crate::basic_types::ConstraintReference;
use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::basic_types::StorageKey;
use crate::engine::Assignments;
use crate::engine::ClausalPropagator;
use crate::engine::ClauseAllocator;
use crate::torrone_assert_moderate;
use crate::torrone_assert_simple;

/// Identifies a registered propagator; doubles as the theory reason marker on
/// the trail. Propagators are polled in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropagatorId(pub(crate) u32);

impl StorageKey for PropagatorId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> PropagatorId {
        PropagatorId(index as u32)
    }
}

/// A theory conflict: a clause whose literals are all false under the current
/// assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Conflict {
    pub(crate) literals: Vec<Literal>,
}

pub(crate) type PropagationStatus = Result<(), Conflict>;

/// Read-only view passed to propagators outside the propagation phase.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PropagationContext<'a> {
    pub(crate) assignments: &'a Assignments,
}

/// View passed to propagators while they propagate; enqueued literals carry
/// this propagator as their reason and are explained lazily through
/// [`Propagator::get_reason`].
#[derive(Debug)]
pub(crate) struct PropagationContextMut<'a> {
    pub(crate) assignments: &'a mut Assignments,
    propagator_id: PropagatorId,
}

impl<'a> PropagationContextMut<'a> {
    pub(crate) fn new(
        assignments: &'a mut Assignments,
        propagator_id: PropagatorId,
    ) -> PropagationContextMut<'a> {
        PropagationContextMut {
            assignments,
            propagator_id,
        }
    }

    pub(crate) fn enqueue_propagated_literal(&mut self, literal: Literal) {
        torrone_assert_simple!(self.assignments.is_literal_unassigned(literal));
        torrone_assert_moderate!(!self.assignments.is_at_the_root_level());
        self.assignments.enqueue(
            literal,
            ConstraintReference::Propagator(self.propagator_id),
        );
    }

    pub(crate) fn as_readonly(&self) -> PropagationContext<'_> {
        PropagationContext {
            assignments: self.assignments,
        }
    }
}

/// View passed to propagators at the root level. Inferences become permanent
/// clauses rather than trail entries with theory reasons.
#[derive(Debug)]
pub(crate) struct SimplificationContext<'a> {
    pub(crate) assignments: &'a mut Assignments,
    pub(crate) clausal_propagator: &'a mut ClausalPropagator,
    pub(crate) clause_allocator: &'a mut ClauseAllocator,
}

impl SimplificationContext<'_> {
    pub(crate) fn add_clause(
        &mut self,
        literals: Vec<Literal>,
    ) -> Result<(), ConstraintOperationError> {
        torrone_assert_simple!(self.assignments.is_at_the_root_level());
        self.clausal_propagator.add_permanent_clause(
            literals,
            self.assignments,
            self.clause_allocator,
        )
    }

    pub(crate) fn as_readonly(&self) -> PropagationContext<'_> {
        PropagationContext {
            assignments: self.assignments,
        }
    }
}

/// A theory propagator. Implementations observe literal assignments through
/// the trail, push inferences with lazily computed explanations, produce
/// conflict clauses and restore their state on backjumps.
///
/// Hard invariants of the contract:
/// - a propagated literal must be explained by literals assigned strictly
///   before it,
/// - a conflict clause must be false in its entirety,
/// - an already assigned literal must never be enqueued again.
pub(crate) trait Propagator {
    /// Convenience name used in logging.
    fn name(&self) -> &str;

    /// Grow per-variable storage; called synchronously whenever the solver
    /// creates a variable.
    fn on_new_variable(&mut self);

    /// One-shot root-level simplification once the program is closed; may add
    /// permanent clauses.
    fn activate(
        &mut self,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError>;

    /// Root-level propagation over new root assignments, through the
    /// clause-add path so inferences are persistent.
    fn simplify(
        &mut self,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError>;

    /// Propagate the unseen suffix of the trail. Called after clausal
    /// propagation has reached a fixpoint; returning an inference hands
    /// control back to the clausal propagator.
    fn propagate(&mut self, context: &mut PropagationContextMut) -> PropagationStatus;

    /// Fill the reason clause `(literal ∨ ¬a₁ ∨ … ∨ ¬aₖ)` for a literal this
    /// propagator enqueued; the first element is `literal` itself and the
    /// tail was assigned strictly before it.
    fn get_reason(&mut self, literal: Literal, context: PropagationContext) -> Vec<Literal>;

    /// Called after a backjump with the literals that were just removed from
    /// the trail, newest first.
    fn on_cancel(&mut self, context: PropagationContext, unassigned: &[Literal]);
}

/// Grow a literal-keyed vector to cover all literals of `num_variables`
/// variables.
pub(crate) fn grow_literal_keyed<V: Clone>(
    storage: &mut KeyedVec<Literal, V>,
    num_variables: usize,
    default: V,
) {
    storage.resize(num_variables * 2, default);
}
