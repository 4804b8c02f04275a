use fnv::FnvHashMap;
use fnv::FnvHashSet;
use log::debug;
use log::trace;

use super::kdyn;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::basic_types::SolverExecutionFlag;
use crate::engine::SatSolver;
use crate::propagation::PropagatorId;
use crate::torrone_assert_simple;

/// Conflict budget of the individual solve calls inside core shrinking; an
/// exhausted budget just grows the progression window.
const SHRINK_CONFLICT_BUDGET: u64 = 1000;

/// Bounds of one lexicographic optimization layer. Within a pass the lower
/// bound never decreases and the upper bound never increases.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OptimisationLevel {
    pub(crate) level: usize,
    pub(crate) lower_bound: i64,
    pub(crate) upper_bound: i64,
}

impl OptimisationLevel {
    pub(crate) fn new(level: usize) -> OptimisationLevel {
        OptimisationLevel {
            level,
            lower_bound: 0,
            upper_bound: i64::MAX,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SoftData {
    weight: i64,
    level: usize,
}

/// The live pool of soft literals. Weights shrink as cores are discharged;
/// zero-weight literals leave the pool on compaction.
#[derive(Clone, Debug, Default)]
pub(crate) struct SoftLiteralPool {
    literals: Vec<Literal>,
    data: FnvHashMap<Literal, SoftData>,
}

impl SoftLiteralPool {
    /// Register a soft literal, merging weights of repeated declarations.
    pub(crate) fn add(&mut self, literal: Literal, weight: i64, level: usize) {
        torrone_assert_simple!(weight > 0);
        match self.data.get_mut(&literal) {
            Some(data) => data.weight += weight,
            None => {
                let _ = self.data.insert(literal, SoftData { weight, level });
                self.literals.push(literal);
            }
        }
    }

    pub(crate) fn weight(&self, literal: Literal) -> i64 {
        self.data.get(&literal).map_or(0, |data| data.weight)
    }

    pub(crate) fn level(&self, literal: Literal) -> usize {
        self.data.get(&literal).map_or(0, |data| data.level)
    }

    pub(crate) fn set_weight(&mut self, literal: Literal, weight: i64) {
        if let Some(data) = self.data.get_mut(&literal) {
            data.weight = weight;
        }
    }

    pub(crate) fn decrease_weight(&mut self, literal: Literal, amount: i64) {
        if let Some(data) = self.data.get_mut(&literal) {
            data.weight -= amount;
            torrone_assert_simple!(data.weight >= 0);
        }
    }

    pub(crate) fn contains(&self, literal: Literal) -> bool {
        self.weight(literal) > 0
    }

    /// The live soft literal over the given variable, if any.
    pub(crate) fn soft_on_variable(&self, variable: PropositionalVariable) -> Option<Literal> {
        self.literals
            .iter()
            .copied()
            .find(|literal| literal.get_propositional_variable() == variable && self.contains(*literal))
    }

    pub(crate) fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Drop zero-weight literals from the live list.
    pub(crate) fn compact(&mut self) {
        let data = &self.data;
        self.literals
            .retain(|literal| data.get(literal).is_some_and(|entry| entry.weight > 0));
    }

    /// Remove a literal from the pool entirely.
    pub(crate) fn remove(&mut self, literal: Literal) {
        let _ = self.data.remove(&literal);
        self.literals.retain(|&other| other != literal);
    }
}

/// The machinery shared by the optimizing engines: stratified assumption
/// sets, hardening, core trimming and shrinking, and the k-dyn
/// reformulation through a cardinality propagator.
#[derive(Clone, Debug)]
pub(crate) struct CoreGuidedSearch {
    pub(crate) pool: SoftLiteralPool,
    cardinality: PropagatorId,
}

impl CoreGuidedSearch {
    pub(crate) fn new(cardinality: PropagatorId) -> CoreGuidedSearch {
        CoreGuidedSearch {
            pool: SoftLiteralPool::default(),
            cardinality,
        }
    }

    /// Promote soft literals that can no longer be falsified within the
    /// bounds to hard units. With `allow_equal` (single-model search) a
    /// literal whose weight exactly closes the gap is hardened as well;
    /// during enumeration the margin stays strict. Hardening is idempotent.
    pub(crate) fn harden(
        &mut self,
        solver: &mut SatSolver,
        level: &OptimisationLevel,
        allow_equal: bool,
    ) {
        solver.cancel_until(0);
        if level.upper_bound == i64::MAX {
            return;
        }

        let mut hardened: Vec<Literal> = Vec::new();
        for &soft in self.pool.literals() {
            if self.pool.level(soft) != level.level || !self.pool.contains(soft) {
                continue;
            }
            let difference = self.pool.weight(soft) + level.lower_bound - level.upper_bound;
            let beyond_bound = if allow_equal {
                difference >= 0
            } else {
                difference > 0
            };
            if beyond_bound {
                hardened.push(soft);
            }
        }

        for soft in hardened {
            trace!("hardening {soft} of weight {}", self.pool.weight(soft));
            self.pool.set_weight(soft, 0);
            // An infeasible hardening unit latches `ok`; the outer loop
            // observes it on the next solve.
            let _ = solver.add_clause(vec![soft]);
        }
        self.pool.compact();
    }

    /// The next stratification limit: the largest live weight of the level
    /// strictly below `limit`, or `limit` when none exists.
    pub(crate) fn next_limit(&self, level: &OptimisationLevel, limit: i64) -> i64 {
        let mut next = limit;
        for &soft in self.pool.literals() {
            if self.pool.level(soft) != level.level {
                continue;
            }
            let weight = self.pool.weight(soft);
            if weight == 0 || weight >= limit {
                continue;
            }
            if next == limit || weight > next {
                next = weight;
            }
        }
        next
    }

    /// The assumption set of the current stratum: every live soft of the
    /// level whose weight reaches `limit`. Zero-weight literals are dropped
    /// from the pool on the way.
    pub(crate) fn assumptions(&mut self, level: &OptimisationLevel, limit: i64) -> Vec<Literal> {
        self.pool.compact();
        self.pool
            .literals()
            .iter()
            .copied()
            .filter(|&soft| {
                self.pool.level(soft) == level.level && self.pool.weight(soft) >= limit
            })
            .collect()
    }

    /// The weight of a core: the minimum weight over its (soft) literals.
    pub(crate) fn core_weight(&self, core: &[Literal]) -> i64 {
        core.iter()
            .map(|&literal| self.pool.weight(!literal))
            .min()
            .unwrap_or(i64::MAX)
    }

    /// Repeatedly re-solve under the core until its size stabilises; each
    /// round's conflict is a subset of the previous one.
    pub(crate) fn trim_core(&self, solver: &mut SatSolver, mut core: Vec<Literal>) -> Vec<Literal> {
        solver.cancel_until(0);
        if core.len() <= 1 {
            return core;
        }

        loop {
            let assumptions: Vec<Literal> = core.iter().map(|&literal| !literal).collect();
            match solver.solve_under_assumptions(&assumptions) {
                SolverExecutionFlag::Infeasible => {
                    let trimmed = solver.extract_core().to_vec();
                    solver.cancel_until(0);
                    trace!(
                        "trimmed {} literals from the core",
                        core.len() - trimmed.len()
                    );
                    let stable = trimmed.len() >= core.len();
                    core = trimmed;
                    if stable || core.len() <= 1 {
                        return core;
                    }
                }
                _ => {
                    // Budget or interrupt; the current core stays valid.
                    solver.cancel_until(0);
                    return core;
                }
            }
        }
    }

    /// Progression search: keep a committed prefix of the core's
    /// assumptions, repeatedly add an exponentially growing window, and
    /// intersect with every certified sub-core. `keep_going` stops the
    /// search once no profit is possible.
    pub(crate) fn shrink_core(
        &self,
        solver: &mut SatSolver,
        core: Vec<Literal>,
        mut keep_going: impl FnMut() -> bool,
    ) -> Vec<Literal> {
        solver.cancel_until(0);
        if core.len() <= 1 {
            return core;
        }

        let mut core = self.trim_core(solver, core);
        if core.len() <= 1 {
            return core;
        }

        let mut pool: Vec<Literal> = core.iter().map(|&literal| !literal).collect();
        let mut committed: Vec<Literal> = Vec::new();
        let mut fixed = 0usize;
        let mut progression = 1usize;

        while keep_going() {
            if fixed + progression >= pool.len() {
                if progression == 1 {
                    break;
                }
                progression = 1;
                fixed = committed.len();
                continue;
            }

            trace!("shrink: window {progression}, committed {fixed}");

            let previously_committed = committed.len();
            while committed.len() < fixed + progression {
                committed.push(pool[committed.len()]);
            }

            solver.set_conflict_budget(SHRINK_CONFLICT_BUDGET);
            let flag = solver.solve_under_assumptions(&committed);
            solver.clear_conflict_budget();

            if flag == SolverExecutionFlag::Infeasible {
                let sub_core = solver.extract_core().to_vec();
                solver.cancel_until(0);
                let sub_core = self.trim_core(solver, sub_core);
                debug!("shrink: reduced the core to {} literals", sub_core.len());
                if sub_core.len() <= 1 {
                    return sub_core;
                }

                let keep: FnvHashSet<Literal> =
                    sub_core.iter().map(|&literal| !literal).collect();
                committed.truncate(previously_committed);
                committed.retain(|literal| keep.contains(literal));
                fixed = committed.len();
                pool.retain(|literal| keep.contains(literal));
                core = sub_core;
                progression = 1;
            } else {
                progression *= 2;
            }
            solver.cancel_until(0);
        }

        core
    }

    /// Discharge a certified core: pay its weight out of every member,
    /// introduce relaxation variables bounded by fresh cardinality
    /// constraints, and return with the relaxations registered as new softs
    /// of the core's weight at the given level.
    pub(crate) fn reformulate_core(
        &mut self,
        solver: &mut SatSolver,
        core: &[Literal],
        weight: i64,
        level: usize,
    ) -> Result<(), ConstraintOperationError> {
        torrone_assert_simple!(!core.is_empty());

        let members: Vec<Literal> = core.iter().map(|&literal| !literal).collect();
        for &soft in &members {
            self.pool.decrease_weight(soft, weight);
        }

        let relaxations = kdyn::reformulate(solver, self.cardinality, &members)?;
        for relaxation in relaxations {
            self.pool.add(relaxation, weight, level);
        }
        self.pool.compact();
        Ok(())
    }
}
