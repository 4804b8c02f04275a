use thiserror::Error;

/// Errors raised while loading constraints into the solver at the root level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConstraintOperationError {
    #[error("adding the clause failed because the solver is in an infeasible state")]
    InfeasibleClause,
    #[error("adding the constraint failed because the solver is in an infeasible state")]
    InfeasibleConstraint,
}
