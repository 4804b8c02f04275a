use super::ClauseReference;
use crate::propagation::PropagatorId;

/// Why a variable was assigned: by a decision (or an assumption), by unit
/// propagation on a clause, or by a theory propagator. Theory reasons are
/// resolved lazily by asking the propagator for a reason clause during
/// conflict analysis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConstraintReference {
    #[default]
    None,
    Clause(ClauseReference),
    Propagator(PropagatorId),
}

impl ConstraintReference {
    pub fn is_none(&self) -> bool {
        matches!(self, ConstraintReference::None)
    }
}
