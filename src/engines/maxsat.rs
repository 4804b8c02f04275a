//! Core-guided MaxSAT (stratified OLL with k-dyn reformulation), including
//! the unweighted static-core preprocessing and top-k model enumeration.

use std::io::BufRead;

use log::debug;
use log::trace;

use super::EngineAnswer;
use crate::basic_types::Literal;
use crate::basic_types::SolverExecutionFlag;
use crate::engine::SatSolver;
use crate::optimisation::CoreGuidedSearch;
use crate::optimisation::OptimisationLevel;
use crate::options::EngineOptions;
use crate::options::SolverOptions;
use crate::parse::read_clause;
use crate::parse::ParseError;
use crate::parse::Prolog;
use crate::parse::StreamBuffer;
use crate::torrone_assert_simple;

/// The outcome of one optimization descent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Descent {
    Optimum,
    Infeasible,
    Interrupted,
}

pub struct MaxSatEngine {
    solver: SatSolver,
    options: EngineOptions,
    search: CoreGuidedSearch,
    level: OptimisationLevel,
    num_input_variables: usize,
    /// Hard input clauses, kept while the unweighted preprocessing may still
    /// run.
    hard_clauses: Vec<Vec<Literal>>,
    /// The soft literals as declared by the input, for top-k blocking.
    original_softs: Vec<Literal>,
}

impl MaxSatEngine {
    pub fn new(solver_options: SolverOptions, options: EngineOptions) -> MaxSatEngine {
        let mut solver = SatSolver::new(solver_options);
        let cardinality = solver.register_weight_constraints();
        MaxSatEngine {
            solver,
            options,
            search: CoreGuidedSearch::new(cardinality),
            level: OptimisationLevel::new(0),
            num_input_variables: 0,
            hard_clauses: Vec::new(),
            original_softs: Vec::new(),
        }
    }

    pub fn interrupt_flag(&self) -> std::sync::Arc<std::sync::atomic::AtomicBool> {
        self.solver.interrupt_flag()
    }

    pub fn load<R: BufRead>(
        &mut self,
        stream: &mut StreamBuffer<R>,
        prolog: &Prolog,
    ) -> Result<(), ParseError> {
        self.solver.grow_to_dimacs(prolog.num_variables as i64);
        // Selector and relaxation variables created later stay invisible.
        self.num_input_variables = prolog.num_variables;
        let top = prolog.top;

        loop {
            stream.skip_whitespace()?;
            match stream.peek() {
                None => break,
                Some(b'c') => stream.skip_line()?,
                Some(_) => {
                    let weight = stream.parse_integer()?;
                    if weight < 0 {
                        return Err(ParseError::Invalid {
                            message: format!("clause weights must be nonnegative, got {weight}"),
                            position: stream.position(),
                        });
                    }
                    let literals = read_clause(stream, &mut self.solver)?;
                    if Some(weight) == top {
                        self.hard_clauses.push(literals.clone());
                        let _ = self.solver.add_clause(literals);
                    } else {
                        self.add_weighted_clause(literals, weight);
                    }
                }
            }
        }

        self.original_softs = self.search.pool.literals().to_vec();
        let _ = self.solver.activate_propagators();

        self.preprocess_static_cores();
        Ok(())
    }

    /// Install a soft clause of the given weight. Unit clauses become soft
    /// literals directly; longer clauses get a fresh selector. Opposite soft
    /// polarities on one variable cancel against the lower bound.
    fn add_weighted_clause(&mut self, mut literals: Vec<Literal>, weight: i64) {
        if weight == 0 {
            return;
        }

        let soft = if literals.len() == 1 {
            literals[0]
        } else {
            let selector = Literal::new(self.solver.new_variable(), true);
            literals.push(!selector);
            let _ = self.solver.add_clause(literals);
            selector
        };

        let variable = soft.get_propositional_variable();
        match self.search.pool.soft_on_variable(variable) {
            None => {
                self.search.pool.add(soft, weight, self.level.level);
            }
            Some(existing) if existing == soft => {
                self.search.pool.add(soft, weight, self.level.level);
            }
            Some(existing) => {
                // One of the pair is falsified in every model.
                let existing_weight = self.search.pool.weight(existing);
                if existing_weight == weight {
                    self.add_to_lower_bound(weight);
                    self.search.pool.remove(existing);
                } else if existing_weight < weight {
                    self.add_to_lower_bound(existing_weight);
                    self.search.pool.remove(existing);
                    self.search.pool.add(soft, weight - existing_weight, self.level.level);
                } else {
                    self.add_to_lower_bound(weight);
                    self.search.pool.decrease_weight(existing, weight);
                    self.search.pool.compact();
                }
            }
        }
    }

    /// Unweighted instances only: a hard clause consisting entirely of
    /// negated live soft literals is a statically derived core. Such clauses
    /// are discharged before the first search, smallest first.
    fn preprocess_static_cores(&mut self) {
        let weights: Vec<i64> = self
            .search
            .pool
            .literals()
            .iter()
            .map(|&soft| self.search.pool.weight(soft))
            .collect();
        let uniform = weights.windows(2).all(|pair| pair[0] == pair[1]);
        if !uniform || weights.is_empty() {
            self.hard_clauses.clear();
            return;
        }

        let mut clauses = std::mem::take(&mut self.hard_clauses);
        clauses.sort_by_key(Vec::len);

        for clause in clauses {
            let is_static_core = clause
                .iter()
                .all(|&literal| self.search.pool.contains(!literal));
            if !is_static_core {
                continue;
            }
            let weight = self.search.core_weight(&clause);
            trace!("static core of size {} and weight {weight}", clause.len());
            self.add_to_lower_bound(weight);
            let _ = self
                .search
                .reformulate_core(&mut self.solver, &clause, weight, self.level.level);
        }
    }

    fn add_to_lower_bound(&mut self, value: i64) {
        torrone_assert_simple!(value > 0);
        self.level.lower_bound += value;
        println!("o {}", self.level.lower_bound);
    }

    /// Tighten the upper bound from the full assignment on the trail; the
    /// improving model is copied into stable storage.
    fn update_upper_bound(&mut self) {
        let mut sum = self.level.lower_bound;
        for &soft in self.search.pool.literals() {
            if self.solver.value(soft).is_false() {
                sum += self.search.pool.weight(soft);
            }
        }
        if sum < self.level.upper_bound {
            self.level.upper_bound = sum;
            self.solver.copy_model();
            println!("c {} ub", self.level.upper_bound);
        }
    }

    fn single_model(&self) -> bool {
        self.options.max_models == 1
    }

    /// Run the stratified core-guided loop until the bounds meet.
    fn descend(&mut self) -> Descent {
        match self.solver.solve() {
            SolverExecutionFlag::Infeasible => return Descent::Infeasible,
            SolverExecutionFlag::Unknown => return Descent::Interrupted,
            SolverExecutionFlag::Feasible => self.update_upper_bound(),
        }
        let single_model = self.single_model();
        self.search
            .harden(&mut self.solver, &self.level, single_model);

        let mut limit = self.search.next_limit(&self.level, i64::MAX);

        while self.level.lower_bound < self.level.upper_bound {
            self.search
                .harden(&mut self.solver, &self.level, single_model);
            let assumptions = self.search.assumptions(&self.level, limit);
            self.solver.cancel_until(0);

            match self.solver.solve_under_assumptions(&assumptions) {
                SolverExecutionFlag::Feasible => {
                    self.update_upper_bound();
                    limit = self.search.next_limit(&self.level, limit);
                }
                SolverExecutionFlag::Unknown => return Descent::Interrupted,
                SolverExecutionFlag::Infeasible => {
                    let core = self.solver.extract_core().to_vec();
                    debug!("core of size {}", core.len());
                    if core.is_empty() {
                        self.level.lower_bound = self.level.upper_bound;
                        continue;
                    }

                    let (lower, upper) = (self.level.lower_bound, self.level.upper_bound);
                    let core = self.search.shrink_core(&mut self.solver, core, || {
                        lower + limit < upper
                    });
                    // One more trim: fresh learned clauses may reduce the
                    // core further.
                    let core = self.search.trim_core(&mut self.solver, core);
                    if core.is_empty() {
                        self.level.lower_bound = self.level.upper_bound;
                        continue;
                    }

                    let weight = self.search.core_weight(&core);
                    self.add_to_lower_bound(weight);
                    let _ = self.search.reformulate_core(
                        &mut self.solver,
                        &core,
                        weight,
                        self.level.level,
                    );
                }
            }
        }

        if self.level.upper_bound == i64::MAX {
            Descent::Infeasible
        } else {
            Descent::Optimum
        }
    }

    pub fn solve(&mut self) -> EngineAnswer {
        match self.descend() {
            Descent::Infeasible => {
                println!("s UNSATISFIABLE");
                self.solver.log_statistics();
                return EngineAnswer::Unsatisfiable;
            }
            Descent::Interrupted => return self.interrupted(),
            Descent::Optimum => {}
        }

        let single_model = self.single_model();
        self.search
            .harden(&mut self.solver, &self.level, single_model);

        println!("o {}", self.level.lower_bound);
        println!("s OPTIMUM FOUND");

        let answer = if self.single_model() {
            self.print_model();
            EngineAnswer::Satisfiable
        } else {
            self.enumerate_top_k()
        };
        self.solver.log_statistics();
        answer
    }

    /// After each optimum: emit the model, block it over the original soft
    /// literals at flipped polarities, drop the upper bound and optimise
    /// again. Ends at `k` models or once the blocked instance is infeasible.
    fn enumerate_top_k(&mut self) -> EngineAnswer {
        let mut count: u64 = 0;
        loop {
            count += 1;
            self.print_model();
            if self.options.max_models != 0 && count >= self.options.max_models {
                break;
            }

            let blocking: Vec<Literal> = self
                .original_softs
                .iter()
                .map(|&soft| {
                    if self.solver.model_value(soft).is_true() {
                        !soft
                    } else {
                        soft
                    }
                })
                .collect();
            if blocking.is_empty() || self.solver.add_clause(blocking).is_err() {
                break;
            }

            self.level.upper_bound = i64::MAX;
            match self.descend() {
                Descent::Optimum => {
                    println!("o {}", self.level.lower_bound);
                }
                Descent::Infeasible => break,
                Descent::Interrupted => return self.interrupted(),
            }
        }

        // End-of-stream marker.
        println!("v");
        EngineAnswer::Satisfiable
    }

    fn interrupted(&mut self) -> EngineAnswer {
        println!("s UNKNOWN");
        if self.solver.has_model() {
            self.print_model();
        }
        self.solver.log_statistics();
        EngineAnswer::Unknown
    }

    /// A DIMACS `v` line over the input variables of the stored model.
    fn print_model(&self) {
        if !self.options.print_model || !self.solver.has_model() {
            return;
        }
        let model = self.solver.model_slice();
        print!("v");
        for index in 0..self.num_input_variables.min(model.len()) {
            if model[index].is_false() {
                print!(" -{}", index + 1);
            } else {
                print!(" {}", index + 1);
            }
        }
        println!();
    }

    #[cfg(test)]
    pub(crate) fn optimum(&self) -> i64 {
        self.level.lower_bound
    }

    #[cfg(test)]
    pub(crate) fn solver(&self) -> &SatSolver {
        &self.solver
    }
}
