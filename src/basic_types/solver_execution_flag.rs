/// The outcome of a single (budgeted) solve call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverExecutionFlag {
    /// A model was found under the current assumptions.
    Feasible,
    /// The instance is infeasible under the current assumptions; the conflict
    /// core can be extracted from the solver.
    Infeasible,
    /// The conflict budget ran out or an interrupt was observed.
    Unknown,
}
