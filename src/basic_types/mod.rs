mod clause_reference;
mod constraint_operation_error;
mod constraint_reference;
mod keyed_vec;
mod literal;
mod solver_execution_flag;
mod truth_value;

pub use clause_reference::ClauseReference;
pub use constraint_operation_error::ConstraintOperationError;
pub use constraint_reference::ConstraintReference;
pub(crate) use keyed_vec::KeyedVec;
pub(crate) use keyed_vec::StorageKey;
pub use literal::Literal;
pub use literal::PropositionalVariable;
pub use solver_execution_flag::SolverExecutionFlag;
pub use truth_value::TruthValue;
