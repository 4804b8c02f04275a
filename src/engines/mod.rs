//! The engine frontends: plain satisfiability, MaxSAT, ASP with weak
//! literals, and circumscription. Each engine owns its solver and printer,
//! reads the program body for its prolog identifier, and drives the solves.

mod asp;
mod circumscription;
mod maxsat;
mod sat;

pub use asp::AspEngine;
pub use circumscription::CircumscriptionEngine;
pub use maxsat::MaxSatEngine;
pub use sat::SatEngine;

/// The final verdict of an engine, mapped onto the conventional exit codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineAnswer {
    /// A model (or the optimum) was produced.
    Satisfiable,
    Unsatisfiable,
    /// Interrupted or out of budget.
    Unknown,
}

impl EngineAnswer {
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineAnswer::Satisfiable => 10,
            EngineAnswer::Unsatisfiable => 20,
            EngineAnswer::Unknown => 0,
        }
    }
}
