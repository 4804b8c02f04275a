//! Theory propagators and the framework that couples them to the CDCL core.

pub(crate) mod axioms;
pub(crate) mod propagator;
mod source_pointers;
mod weight_constraint;

pub(crate) use propagator::Conflict;
pub(crate) use propagator::PropagationContext;
pub(crate) use propagator::PropagationContextMut;
pub(crate) use propagator::PropagationStatus;
pub(crate) use propagator::Propagator;
pub use propagator::PropagatorId;
pub(crate) use propagator::SimplificationContext;
pub(crate) use source_pointers::SourcePointerPropagator;
pub(crate) use weight_constraint::WeightConstraintPropagator;

use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Literal;

/// The bounded set of propagator variants. Dispatch goes through this enum;
/// registration order determines polling order within a propagation cycle.
#[derive(Clone, Debug)]
pub(crate) enum PropagatorKind {
    WeightConstraints(WeightConstraintPropagator),
    SourcePointers(SourcePointerPropagator),
}

impl PropagatorKind {
    fn as_propagator(&mut self) -> &mut dyn Propagator {
        match self {
            PropagatorKind::WeightConstraints(propagator) => propagator,
            PropagatorKind::SourcePointers(propagator) => propagator,
        }
    }

    pub(crate) fn weight_constraints_mut(&mut self) -> &mut WeightConstraintPropagator {
        match self {
            PropagatorKind::WeightConstraints(propagator) => propagator,
            PropagatorKind::SourcePointers(_) => {
                panic!("expected the weight-constraint propagator")
            }
        }
    }

    pub(crate) fn source_pointers_mut(&mut self) -> &mut SourcePointerPropagator {
        match self {
            PropagatorKind::SourcePointers(propagator) => propagator,
            PropagatorKind::WeightConstraints(_) => {
                panic!("expected the source-pointer propagator")
            }
        }
    }
}

impl Propagator for PropagatorKind {
    fn name(&self) -> &str {
        match self {
            PropagatorKind::WeightConstraints(propagator) => propagator.name(),
            PropagatorKind::SourcePointers(propagator) => propagator.name(),
        }
    }

    fn on_new_variable(&mut self) {
        self.as_propagator().on_new_variable();
    }

    fn activate(
        &mut self,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError> {
        self.as_propagator().activate(context)
    }

    fn simplify(
        &mut self,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError> {
        self.as_propagator().simplify(context)
    }

    fn propagate(&mut self, context: &mut PropagationContextMut) -> PropagationStatus {
        self.as_propagator().propagate(context)
    }

    fn get_reason(&mut self, literal: Literal, context: PropagationContext) -> Vec<Literal> {
        self.as_propagator().get_reason(literal, context)
    }

    fn on_cancel(&mut self, context: PropagationContext, unassigned: &[Literal]) {
        self.as_propagator().on_cancel(context, unassigned);
    }
}
