//! Circumscription: models minimal under the weak/group preference order,
//! optionally restricted to those satisfying a query literal. Minimality is
//! certified by a checker instance holding a copy of the theory; dynamic
//! iterations replay batches of assumptions and permanently added clauses.

use std::io::BufRead;

use log::debug;
use log::trace;

use super::EngineAnswer;
use crate::basic_types::Literal;
use crate::basic_types::SolverExecutionFlag;
use crate::engine::SatSolver;
use crate::optimisation::CoreGuidedSearch;
use crate::options::EngineOptions;
use crate::options::QueryStrategy;
use crate::options::SolverOptions;
use crate::output::OutputTemplates;
use crate::output::Printer;
use crate::parse::read_clause;
use crate::parse::read_literal;
use crate::parse::ParseError;
use crate::parse::Prolog;
use crate::parse::StreamBuffer;
use crate::torrone_assert_simple;

/// Conflict budget of candidate-pattern solves during dynamic iterations.
const DYNAMIC_CANDIDATE_BUDGET: u64 = 10_000;

/// One step of the dynamic-iteration queue.
#[derive(Clone, Debug)]
enum DynamicStep {
    /// Permanently add a clause to every instance.
    Add(Vec<Literal>),
    /// Solve once under this batch of assumptions, installed through a fresh
    /// activator variable.
    Assert(Vec<Literal>),
}

pub struct CircumscriptionEngine {
    solver: SatSolver,
    printer: Printer,
    options: EngineOptions,
    search: CoreGuidedSearch,
    query: Option<Literal>,
    group_literals: Vec<Literal>,
    weak_literals: Vec<Literal>,
    dynamic: Vec<DynamicStep>,
    checker: Option<SatSolver>,
    dyn_assumptions: Vec<Literal>,
}

impl CircumscriptionEngine {
    pub fn new(solver_options: SolverOptions, options: EngineOptions) -> CircumscriptionEngine {
        let mut solver = SatSolver::new(solver_options);
        let cardinality = solver.register_weight_constraints();
        let printer = Printer::new(OutputTemplates::default(), options.print_model);
        CircumscriptionEngine {
            solver,
            printer,
            options,
            search: CoreGuidedSearch::new(cardinality),
            query: None,
            group_literals: Vec::new(),
            weak_literals: Vec::new(),
            dynamic: Vec::new(),
            checker: None,
            dyn_assumptions: Vec::new(),
        }
    }

    pub fn interrupt_flag(&self) -> std::sync::Arc<std::sync::atomic::AtomicBool> {
        self.solver.interrupt_flag()
    }

    pub fn load<R: BufRead>(
        &mut self,
        stream: &mut StreamBuffer<R>,
        _prolog: &Prolog,
    ) -> Result<(), ParseError> {
        loop {
            stream.skip_whitespace()?;
            match stream.peek() {
                None => break,
                Some(b'c') => stream.skip_line()?,
                Some(b'v') => {
                    stream.advance()?;
                    let position = stream.position();
                    let line = stream.read_line()?;
                    if let Some(value) =
                        self.printer.parse_directive(line.trim_start(), position)?
                    {
                        self.solver.grow_to_dimacs(value);
                    }
                }
                Some(b'q') => {
                    stream.advance()?;
                    let literal = self.required_literal(stream)?;
                    if self.query.is_some() {
                        return Err(ParseError::Invalid {
                            message: "only one query literal may be declared".to_owned(),
                            position: stream.position(),
                        });
                    }
                    self.query = Some(literal);
                }
                Some(b'g') => {
                    stream.advance()?;
                    let literal = self.required_literal(stream)?;
                    self.group_literals.push(literal);
                }
                Some(b'w') => {
                    stream.advance()?;
                    let literal = self.required_literal(stream)?;
                    if self.search.pool.contains(literal) || self.search.pool.contains(!literal) {
                        return Err(ParseError::Invalid {
                            message: format!("repeated weak literal {literal}"),
                            position: stream.position(),
                        });
                    }
                    self.weak_literals.push(literal);
                    self.search.pool.add(literal, 1, 0);
                }
                Some(b'a') => {
                    stream.advance()?;
                    let literals = read_clause(stream, &mut self.solver)?;
                    self.dynamic.push(DynamicStep::Add(literals));
                }
                Some(b's') => {
                    stream.advance()?;
                    let literals = read_clause(stream, &mut self.solver)?;
                    self.dynamic.push(DynamicStep::Assert(literals));
                }
                Some(b'n') => {
                    stream.advance()?;
                    let num_variables = stream.parse_integer()?;
                    self.solver.grow_to_dimacs(num_variables);
                    self.printer
                        .set_last_visible_var(self.solver.num_variables());
                    let _ = self.solver.activate_propagators();
                }
                Some(_) => {
                    let literals = read_clause(stream, &mut self.solver)?;
                    let _ = self.solver.add_clause(literals);
                }
            }
        }
        Ok(())
    }

    fn required_literal<R: BufRead>(
        &mut self,
        stream: &mut StreamBuffer<R>,
    ) -> Result<Literal, ParseError> {
        match read_literal(stream, &mut self.solver)? {
            Some(literal) => Ok(literal),
            None => Err(ParseError::Invalid {
                message: "expected a nonzero literal".to_owned(),
                position: stream.position(),
            }),
        }
    }

    /// A query that is itself weak or grouped is answered directly by the
    /// preference order; no checker is required.
    fn query_needs_checker(&self) -> bool {
        match self.query {
            None => false,
            Some(query) => {
                if self.weak_literals.is_empty() && self.group_literals.is_empty() {
                    return false;
                }
                !(self.weak_literals.contains(&query)
                    || self.group_literals.contains(&query)
                    || self.group_literals.contains(&!query))
            }
        }
    }

    pub fn solve(&mut self) -> EngineAnswer {
        torrone_assert_simple!(self.checker.is_none());
        self.printer.on_start();

        let multiple_iterations = !self.dynamic.is_empty();
        if self.dynamic.is_empty() {
            trace!("configuring the solver for a single iteration");
            self.dynamic.push(DynamicStep::Assert(Vec::new()));
        } else {
            trace!("configuring the solver for multiple iterations");
            if self.query_needs_checker() {
                debug!("activating the checker");
                let mut checker = self.solver.clone();
                if let Some(query) = self.query {
                    let _ = checker.add_clause(vec![!query]);
                }
                self.checker = Some(checker);
            }
            if let Some(query) = self.query {
                let _ = self.solver.add_clause(vec![query]);
            }
        }

        let mut overall: Option<EngineAnswer> = None;
        let steps = std::mem::take(&mut self.dynamic);

        for step in steps {
            self.solver.cancel_until(0);
            if let Some(checker) = &mut self.checker {
                checker.cancel_until(0);
            }

            match step {
                DynamicStep::Add(literals) => {
                    debug!("dynamic ADD of a clause over {} literals", literals.len());
                    let _ = self.solver.add_clause(literals.clone());
                    if let Some(checker) = &mut self.checker {
                        let _ = checker.add_clause(literals);
                    }
                }
                DynamicStep::Assert(literals) => {
                    self.printer.on_start_iteration();
                    self.install_assert_batch(&literals);
                    let mut count: u64 = 0;

                    let answer = if !self.solver.is_ok() {
                        EngineAnswer::Unsatisfiable
                    } else if multiple_iterations {
                        self.solve_dynamic(&mut count)
                    } else if !self.query_needs_checker() {
                        self.solve_without_checker(&mut count)
                    } else {
                        match self.options.query_strategy {
                            QueryStrategy::CheckModels => self.solve_strategy_one(&mut count),
                            QueryStrategy::CardinalityFirst => {
                                self.solve_strategy_two(&mut count)
                            }
                        }
                    };

                    self.retire_assert_batch();
                    self.printer
                        .on_done_iteration(answer == EngineAnswer::Unknown);

                    overall = match (overall, answer) {
                        (_, EngineAnswer::Satisfiable) => Some(EngineAnswer::Satisfiable),
                        (Some(EngineAnswer::Satisfiable), _) => {
                            Some(EngineAnswer::Satisfiable)
                        }
                        (_, EngineAnswer::Unsatisfiable) => Some(EngineAnswer::Unsatisfiable),
                        (current, EngineAnswer::Unknown) => current,
                    };
                }
            }
        }

        self.printer.on_done();
        self.solver.log_statistics();
        overall.unwrap_or(EngineAnswer::Unknown)
    }

    /// Bind the batch to a fresh activator variable `a` (clauses `¬a ∨ l`)
    /// and assume `a` for this iteration.
    fn install_assert_batch(&mut self, literals: &[Literal]) {
        self.dyn_assumptions.clear();
        if literals.is_empty() {
            return;
        }

        let activator = Literal::new(self.solver.new_variable(), true);
        if let Some(checker) = &mut self.checker {
            let _ = checker.new_variable();
        }
        self.dyn_assumptions.push(activator);

        for &literal in literals {
            let _ = self.solver.add_clause(vec![!activator, literal]);
            if let Some(checker) = &mut self.checker {
                let _ = checker.add_clause(vec![!activator, literal]);
                torrone_assert_simple!(checker.num_variables() == self.solver.num_variables());
            }
        }
        debug!("dynamic ASSERT with activator {activator}");
    }

    /// The activator is spent: assert its negation permanently.
    fn retire_assert_batch(&mut self) {
        if let Some(&activator) = self.dyn_assumptions.first() {
            self.solver.cancel_until(0);
            let _ = self.solver.add_clause(vec![!activator]);
            if let Some(checker) = &mut self.checker {
                checker.cancel_until(0);
                let _ = checker.add_clause(vec![!activator]);
            }
        }
        self.dyn_assumptions.clear();
    }

    /// Repeatedly solve under the soft-literal assumptions, discharging each
    /// core, until a (minimal) model or infeasibility. `conflicts` counts
    /// the discharged cores.
    fn process_conflicts_until_model(&mut self, conflicts: &mut usize) -> SolverExecutionFlag {
        loop {
            let assumptions = self.soft_assumptions();
            torrone_assert_simple!(self.solver.get_decision_level() == 0);

            match self.solver.solve_under_assumptions(&assumptions) {
                SolverExecutionFlag::Feasible => return SolverExecutionFlag::Feasible,
                SolverExecutionFlag::Unknown => return SolverExecutionFlag::Unknown,
                SolverExecutionFlag::Infeasible => {
                    let core = self.solver.extract_core().to_vec();
                    debug!("conflict of size {}", core.len());
                    *conflicts += 1;
                    if core.is_empty() {
                        return SolverExecutionFlag::Infeasible;
                    }

                    let core = self.search.shrink_core(&mut self.solver, core, || true);
                    let core = self.search.trim_core(&mut self.solver, core);
                    if core.is_empty() {
                        return SolverExecutionFlag::Infeasible;
                    }

                    trace!("discharging a core of size {}", core.len());
                    let _ = self
                        .search
                        .reformulate_core(&mut self.solver, &core, 1, 0);
                }
            }
        }
    }

    /// The dynamic assumptions followed by every live soft literal; softs
    /// already decided at the root leave the pool.
    fn soft_assumptions(&mut self) -> Vec<Literal> {
        self.solver.cancel_until(0);
        let mut removed: Vec<Literal> = Vec::new();
        for &soft in self.search.pool.literals() {
            if !self.solver.value(soft).is_undef() {
                removed.push(soft);
            }
        }
        for soft in removed {
            trace!("removing the root-assigned soft literal {soft}");
            self.search.pool.remove(soft);
        }

        let mut assumptions = self.dyn_assumptions.clone();
        assumptions.extend(self.search.pool.literals().iter().copied());
        assumptions
    }

    fn solve_without_checker(&mut self, count: &mut u64) -> EngineAnswer {
        if let Some(query) = self.query {
            let _ = self.solver.add_clause(vec![query]);
        }

        let mut conflicts = 0usize;
        loop {
            match self.process_conflicts_until_model(&mut conflicts) {
                SolverExecutionFlag::Unknown => return EngineAnswer::Unknown,
                SolverExecutionFlag::Infeasible => break,
                SolverExecutionFlag::Feasible => {
                    self.solver.copy_model();
                    self.enumerate_answer(count);
                    if self.options.max_models != 0 && *count >= self.options.max_models {
                        break;
                    }
                }
            }
        }

        if *count > 0 {
            EngineAnswer::Satisfiable
        } else {
            EngineAnswer::Unsatisfiable
        }
    }

    /// Strategy 1: add the query to the theory; every candidate model is
    /// checked for minimality, counter-models are blocked.
    fn solve_strategy_one(&mut self, count: &mut u64) -> EngineAnswer {
        debug!("activating the checker");
        self.checker = Some(self.solver.clone());
        if let Some(query) = self.query {
            let _ = self.solver.add_clause(vec![query]);
        }

        let mut conflicts = 0usize;
        loop {
            match self.process_conflicts_until_model(&mut conflicts) {
                SolverExecutionFlag::Unknown => return EngineAnswer::Unknown,
                SolverExecutionFlag::Infeasible => break,
                SolverExecutionFlag::Feasible => match self.check() {
                    SolverExecutionFlag::Unknown => return EngineAnswer::Unknown,
                    SolverExecutionFlag::Feasible => {
                        trace!("check failed, blocking the counter-model");
                        self.learn_clause_from_counter_model();
                    }
                    SolverExecutionFlag::Infeasible => {
                        self.solver.copy_model();
                        self.enumerate_answer(count);
                        if self.options.max_models != 0 && *count >= self.options.max_models {
                            break;
                        }
                    }
                },
            }
        }

        if *count > 0 {
            EngineAnswer::Satisfiable
        } else {
            EngineAnswer::Unsatisfiable
        }
    }

    /// Strategy 2: optimize without the query first; models found before the
    /// first discharged core are minimal outright.
    fn solve_strategy_two(&mut self, count: &mut u64) -> EngineAnswer {
        debug!("activating the checker");
        self.checker = Some(self.solver.clone());

        let mut conflicts = 0usize;
        match self.process_conflicts_until_model(&mut conflicts) {
            SolverExecutionFlag::Feasible => {}
            other => {
                return match other {
                    SolverExecutionFlag::Unknown => EngineAnswer::Unknown,
                    _ => EngineAnswer::Unsatisfiable,
                }
            }
        }
        conflicts = 0;
        self.solver.cancel_until(0);

        if let Some(query) = self.query {
            let _ = self.solver.add_clause(vec![query]);
        }

        loop {
            match self.process_conflicts_until_model(&mut conflicts) {
                SolverExecutionFlag::Unknown => return EngineAnswer::Unknown,
                SolverExecutionFlag::Infeasible => break,
                SolverExecutionFlag::Feasible => {
                    let minimal = conflicts == 0 || {
                        match self.check() {
                            SolverExecutionFlag::Infeasible => true,
                            SolverExecutionFlag::Feasible => false,
                            SolverExecutionFlag::Unknown => return EngineAnswer::Unknown,
                        }
                    };
                    if minimal {
                        trace!("minimal model certified");
                        self.solver.copy_model();
                        self.enumerate_answer(count);
                        if self.options.max_models != 0 && *count >= self.options.max_models {
                            break;
                        }
                    } else {
                        trace!("check failed, blocking the counter-model");
                        self.learn_clause_from_counter_model();
                    }
                }
            }
        }

        if *count > 0 {
            EngineAnswer::Satisfiable
        } else {
            EngineAnswer::Unsatisfiable
        }
    }

    /// Dynamic iterations: alternate between finding candidate models,
    /// checking them, and re-solving under the preferable pattern proposed
    /// by the checker.
    fn solve_dynamic(&mut self, count: &mut u64) -> EngineAnswer {
        let mut candidate_pattern: Vec<Literal> = Vec::new();
        let mut pending_check = false;

        loop {
            let mut assumptions = self.dyn_assumptions.clone();
            assumptions.extend(candidate_pattern.iter().copied());

            let budgeted = !candidate_pattern.is_empty();
            if budgeted {
                self.solver.set_conflict_budget(DYNAMIC_CANDIDATE_BUDGET);
            }
            self.solver.cancel_until(0);
            let mut flag = self.solver.solve_under_assumptions(&assumptions);
            if budgeted {
                self.solver.clear_conflict_budget();
                if flag == SolverExecutionFlag::Unknown && !self.solver.is_interrupted() {
                    trace!("candidate pattern out of budget, falling back to blocking");
                    flag = SolverExecutionFlag::Infeasible;
                }
            }

            match flag {
                SolverExecutionFlag::Unknown => return EngineAnswer::Unknown,
                SolverExecutionFlag::Feasible => match self.check() {
                    SolverExecutionFlag::Unknown => return EngineAnswer::Unknown,
                    SolverExecutionFlag::Infeasible => {
                        self.solver.copy_model();
                        if !self.printer.has_visible() {
                            *count += 1;
                            self.printer.on_model(self.solver.model_slice());
                            return EngineAnswer::Satisfiable;
                        }
                        self.enumerate_answer(count);
                        if self.options.max_models != 0 && *count >= self.options.max_models {
                            break;
                        }
                        candidate_pattern.clear();
                        pending_check = false;
                    }
                    SolverExecutionFlag::Feasible => {
                        trace!("check failed, re-solving under the preferable pattern");
                        pending_check = true;
                        candidate_pattern = self.checker_pattern();
                    }
                },
                SolverExecutionFlag::Infeasible => {
                    if !pending_check {
                        if !self.printer.has_visible() {
                            return if *count > 0 {
                                EngineAnswer::Satisfiable
                            } else {
                                EngineAnswer::Unsatisfiable
                            };
                        }
                        break;
                    }
                    self.learn_clause_from_counter_model();
                    pending_check = false;
                    candidate_pattern.clear();
                }
            }
        }

        if *count > 0 {
            EngineAnswer::Satisfiable
        } else {
            EngineAnswer::Unsatisfiable
        }
    }

    /// Ask the checker for a model that agrees on the group literals and
    /// makes strictly more weak literals true than the current trail.
    fn check(&mut self) -> SolverExecutionFlag {
        let Some(checker) = &mut self.checker else {
            return SolverExecutionFlag::Infeasible;
        };
        checker.cancel_until(0);

        let mut assumptions = self.dyn_assumptions.clone();
        let mut improvement: Vec<Literal> = self
            .dyn_assumptions
            .iter()
            .map(|&activator| !activator)
            .collect();

        for &group in &self.group_literals {
            assumptions.push(if self.solver.value(group).is_true() {
                group
            } else {
                !group
            });
        }
        for &weak in &self.weak_literals {
            if self.solver.value(weak).is_false() {
                improvement.push(weak);
            } else {
                assumptions.push(weak);
            }
        }

        let _ = checker.add_clause(improvement);
        checker.solve_under_assumptions(&assumptions)
    }

    /// The pattern of the checker's counter-model: group values as found,
    /// plus every weak literal the checker made true.
    fn checker_pattern(&self) -> Vec<Literal> {
        let checker = self.checker.as_ref().unwrap();
        let mut pattern: Vec<Literal> = self
            .group_literals
            .iter()
            .map(|&group| {
                if checker.value(group).is_true() {
                    group
                } else {
                    !group
                }
            })
            .collect();
        for &weak in &self.weak_literals {
            if checker.value(weak).is_true() {
                pattern.push(weak);
            }
        }
        pattern
    }

    /// Block the counter-model's group/weak pattern in both instances.
    fn learn_clause_from_counter_model(&mut self) {
        let clause = {
            let checker = self.checker.as_ref().unwrap();
            let mut clause: Vec<Literal> = self
                .dyn_assumptions
                .iter()
                .map(|&activator| !activator)
                .collect();
            for &group in &self.group_literals {
                clause.push(if checker.value(group).is_true() {
                    !group
                } else {
                    group
                });
            }
            for &weak in &self.weak_literals {
                if !checker.value(weak).is_true() {
                    clause.push(weak);
                }
            }
            clause
        };
        debug!("blocking clause from the counter-model: {clause:?}");

        self.solver.cancel_until(0);
        let _ = self.solver.add_clause(clause.clone());
        if let Some(checker) = &mut self.checker {
            checker.cancel_until(0);
            let _ = checker.add_clause(clause);
        }
    }

    /// Block the stored model's group/weak pattern in the main instance.
    fn block_model_pattern(&mut self) {
        let mut clause: Vec<Literal> = self
            .dyn_assumptions
            .iter()
            .map(|&activator| !activator)
            .collect();
        for &group in &self.group_literals {
            clause.push(if self.solver.model_value(group).is_true() {
                !group
            } else {
                group
            });
        }
        for &weak in &self.weak_literals {
            if !self.solver.model_value(weak).is_true() {
                clause.push(weak);
            }
        }
        let _ = self.solver.add_clause(clause);
    }

    /// Publish the stored (minimal) model; with witness enumeration, models
    /// sharing its group/weak pattern are produced as well before the whole
    /// pattern is blocked.
    fn enumerate_answer(&mut self, count: &mut u64) {
        if self.options.witnesses == 1 {
            *count += 1;
            self.printer.on_model(self.solver.model_slice());
            self.block_model_pattern();
            return;
        }

        let mut assumptions = self.dyn_assumptions.clone();
        for &group in &self.group_literals {
            assumptions.push(if self.solver.model_value(group).is_true() {
                group
            } else {
                !group
            });
        }
        for &weak in &self.weak_literals {
            assumptions.push(if self.solver.model_value(weak).is_true() {
                weak
            } else {
                !weak
            });
        }
        for &soft in self.search.pool.literals() {
            if !self.weak_literals.contains(&soft) {
                assumptions.push(!soft);
            }
        }

        self.solver.cancel_until(0);
        let mut witnesses: u64 = 0;
        loop {
            if self.solver.solve_under_assumptions(&assumptions)
                != SolverExecutionFlag::Feasible
            {
                break;
            }
            *count += 1;
            witnesses += 1;
            self.solver.copy_model();
            self.printer.on_model(self.solver.model_slice());
            if self.options.witnesses != 0 && witnesses >= self.options.witnesses {
                break;
            }
            if self.options.max_models != 0 && *count >= self.options.max_models {
                break;
            }
            if self.solver.get_decision_level() == assumptions.len() {
                break;
            }
            if !self.solver.learn_clause_from_model() {
                break;
            }
        }

        self.block_model_pattern();
    }

    #[cfg(test)]
    pub(crate) fn num_models(&self) -> u64 {
        self.printer.num_models()
    }
}
