//! Explicit configuration records. There is no global option registry; the
//! solver and the engines receive their options at construction.

use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Options of the underlying CDCL solver.
#[derive(Clone, Debug)]
pub struct SolverOptions {
    /// A seeded random generator, used for occasional randomised decisions.
    pub random_generator: SmallRng,
    /// The base unit of the Luby restart sequence, in conflicts.
    pub luby_restart_unit: u64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            random_generator: SmallRng::seed_from_u64(42),
            luby_restart_unit: 100,
        }
    }
}

impl SolverOptions {
    pub fn with_seed(seed: u64) -> SolverOptions {
        SolverOptions {
            random_generator: SmallRng::seed_from_u64(seed),
            ..SolverOptions::default()
        }
    }
}

/// The strategy used to answer a circumscription query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum QueryStrategy {
    /// Add the query to the theory and check every model against the checker.
    #[default]
    CheckModels,
    /// Solve cardinality-minimal without the query first; if the query is
    /// already forced, accept, otherwise fall back to checking models.
    CardinalityFirst,
}

/// Options shared by the engine frontends.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// How many models to produce; `0` means all of them.
    pub max_models: u64,
    /// Whether models are printed at all.
    pub print_model: bool,
    /// How many witnesses to enumerate per circumscription answer; `0` means
    /// unbounded.
    pub witnesses: u64,
    pub query_strategy: QueryStrategy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_models: 1,
            print_model: true,
            witnesses: 1,
            query_strategy: QueryStrategy::default(),
        }
    }
}
