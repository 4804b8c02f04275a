//! Answer-set solving: unfoundedness through source pointers, weight
//! constraints, and multi-level (lexicographic) optimization of weak
//! literals with the core-guided machinery.

use std::io::BufRead;

use log::debug;

use super::EngineAnswer;
use crate::basic_types::Literal;
use crate::basic_types::SolverExecutionFlag;
use crate::engine::SatSolver;
use crate::optimisation::CoreGuidedSearch;
use crate::optimisation::OptimisationLevel;
use crate::options::EngineOptions;
use crate::options::SolverOptions;
use crate::output::OutputTemplates;
use crate::output::Printer;
use crate::parse::read_clause;
use crate::parse::read_literal;
use crate::parse::ParseError;
use crate::parse::Prolog;
use crate::parse::StreamBuffer;
use crate::propagation::PropagatorId;
use crate::torrone_assert_simple;

fn asp_templates() -> OutputTemplates {
    OutputTemplates {
        models_unknown: "UNKNOWN\\n".to_owned(),
        models_none: "INCONSISTENT\\n".to_owned(),
        models_start: String::new(),
        models_end: String::new(),
        model_start: "ANSWER\\n".to_owned(),
        model_sep: String::new(),
        model_end: "\\n".to_owned(),
        lit_start: String::new(),
        lit_sep: " ".to_owned(),
        lit_end: ".".to_owned(),
        ..OutputTemplates::default()
    }
}

pub struct AspEngine {
    solver: SatSolver,
    printer: Printer,
    options: EngineOptions,
    search: CoreGuidedSearch,
    weight_constraints: PropagatorId,
    source_pointers: Option<PropagatorId>,
    /// Pending levels, sorted ascending; the highest level is optimized
    /// first.
    levels: Vec<OptimisationLevel>,
    /// Completed levels with their frozen bounds, in completion order.
    solved: Vec<OptimisationLevel>,
    optimization: bool,
    program_closed: bool,
}

impl AspEngine {
    pub fn new(solver_options: SolverOptions, options: EngineOptions) -> AspEngine {
        let mut solver = SatSolver::new(solver_options);
        let weight_constraints = solver.register_weight_constraints();
        let printer = Printer::new(asp_templates(), options.print_model);
        AspEngine {
            solver,
            printer,
            options,
            search: CoreGuidedSearch::new(weight_constraints),
            weight_constraints,
            source_pointers: None,
            levels: Vec::new(),
            solved: Vec::new(),
            optimization: false,
            program_closed: false,
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
                Some(b'w') => {
                    stream.advance()?;
                    self.parse_weak_literal(stream)?;
                }
                Some(b'a') => {
                    stream.advance()?;
                    self.parse_weight_constraint(stream)?;
                }
                Some(b's') => {
                    stream.advance()?;
                    self.parse_support(stream)?;
                }
                Some(b'h') => {
                    return Err(ParseError::Invalid {
                        message:
                            "head-cycle components require the companion propagator, \
                             which this build does not provide"
                                .to_owned(),
                        position: stream.position(),
                    });
                }
                Some(b'n') => {
                    stream.advance()?;
                    let num_variables = stream.parse_integer()?;
                    self.end_program(num_variables);
                }
                Some(_) => {
                    let literals = read_clause(stream, &mut self.solver)?;
                    let _ = self.solver.add_clause(literals);
                }
            }
        }
        Ok(())
    }

    /// `w <lit> <weight> <level>`: a weak literal, or with literal `0` a
    /// constant cost at the level.
    fn parse_weak_literal<R: BufRead>(
        &mut self,
        stream: &mut StreamBuffer<R>,
    ) -> Result<(), ParseError> {
        let literal = read_literal(stream, &mut self.solver)?;
        let weight = stream.parse_integer()?;
        let level = stream.parse_integer()?;
        if weight < 0 {
            return Err(ParseError::Invalid {
                message: "weights of weak literals must be nonnegative".to_owned(),
                position: stream.position(),
            });
        }
        if level < 0 {
            return Err(ParseError::Invalid {
                message: "levels of weak literals must be nonnegative".to_owned(),
                position: stream.position(),
            });
        }
        if let Some(literal) = literal {
            if self.search.pool.contains(literal) || self.search.pool.contains(!literal) {
                return Err(ParseError::Invalid {
                    message: format!("repeated weak literal {literal}"),
                    position: stream.position(),
                });
            }
        }
        self.add_weak_literal(literal, weight, level as usize);
        Ok(())
    }

    fn add_weak_literal(&mut self, literal: Option<Literal>, weight: i64, level: usize) {
        if let Some(literal) = literal {
            if weight > 0 {
                self.search.pool.add(literal, weight, level);
            }
        }

        let record = match self
            .levels
            .iter_mut()
            .find(|record| record.level == level)
        {
            Some(record) => record,
            None => {
                let position = self
                    .levels
                    .iter()
                    .position(|record| record.level > level)
                    .unwrap_or(self.levels.len());
                self.levels.insert(position, OptimisationLevel::new(level));
                &mut self.levels[position]
            }
        };
        if literal.is_none() {
            record.lower_bound += weight;
        }

        self.optimization = true;
    }

    /// `a <lits…0> <weights…> <bound>`: the constraint `Σ wᵢ·[lᵢ] ≥ bound`.
    fn parse_weight_constraint<R: BufRead>(
        &mut self,
        stream: &mut StreamBuffer<R>,
    ) -> Result<(), ParseError> {
        let literals = read_clause(stream, &mut self.solver)?;
        let mut weights = Vec::with_capacity(literals.len());
        for _ in 0..literals.len() {
            let weight = stream.parse_integer()?;
            if weight < 0 {
                return Err(ParseError::Invalid {
                    message: "weight-constraint weights must be nonnegative".to_owned(),
                    position: stream.position(),
                });
            }
            weights.push(weight);
        }
        let bound = stream.parse_integer()?;
        let _ = self.solver.add_weight_constraint_ge(
            self.weight_constraints,
            literals,
            weights,
            bound,
        );
        Ok(())
    }

    /// `s <head> <body> <rec…0>`: a support of a recursive head atom.
    fn parse_support<R: BufRead>(
        &mut self,
        stream: &mut StreamBuffer<R>,
    ) -> Result<(), ParseError> {
        let literals = read_clause(stream, &mut self.solver)?;
        if literals.len() < 2 {
            return Err(ParseError::Invalid {
                message: "expected two or more literals in a support declaration".to_owned(),
                position: stream.position(),
            });
        }
        let propagator = match self.source_pointers {
            Some(propagator) => propagator,
            None => {
                let propagator = self.solver.register_source_pointers();
                self.source_pointers = Some(propagator);
                propagator
            }
        };
        let atom = literals[0].get_propositional_variable();
        let body = literals[1];
        let rec = literals[2..]
            .iter()
            .map(|literal| literal.get_propositional_variable())
            .collect();
        self.solver
            .add_source_pointer_support(propagator, atom, body, rec);
        Ok(())
    }

    /// `n <numVars>` closes the program: the variable count is finalised and
    /// the propagators activate.
    fn end_program(&mut self, num_variables: i64) {
        self.program_closed = true;
        self.solver.grow_to_dimacs(num_variables);
        self.printer
            .set_last_visible_var(self.solver.num_variables());
        if self.levels.is_empty() {
            self.levels.push(OptimisationLevel::new(0));
        }
        let _ = self.solver.activate_propagators();
    }

    fn add_to_lower_bound(&mut self, value: i64) {
        torrone_assert_simple!(value > 0);
        let record = self.levels.last_mut().unwrap();
        record.lower_bound += value;
        println!("% lb {}@{}", record.lower_bound, record.level);
    }

    /// Lexicographic upper-bound update: levels are compared from the
    /// highest down, and the model is kept only when no higher level gets
    /// worse.
    fn update_upper_bound(&mut self) {
        let mut better = false;
        for index in (0..self.levels.len()).rev() {
            let record = self.levels[index];
            let mut sum = record.lower_bound;
            for &soft in self.search.pool.literals() {
                if self.search.pool.level(soft) == record.level
                    && self.solver.value(soft).is_false()
                {
                    sum += self.search.pool.weight(soft);
                }
            }
            if sum > record.upper_bound {
                return;
            }
            if sum < record.upper_bound {
                better = true;
            }
            if better {
                if self.optimization {
                    println!("% ub {sum}@{}", record.level);
                }
                self.levels[index].upper_bound = sum;
            }
        }
        if better {
            self.solver.copy_model();
        }
    }

    fn allow_equal_hardening(&self) -> bool {
        self.options.max_models == 1 && self.levels.len() == 1
    }

    fn solve_internal(&mut self) -> EngineAnswer {
        if !self.program_closed {
            // Inputs without an explicit end-of-program line.
            self.end_program(self.solver.num_variables() as i64);
        }
        if !self.solver.is_ok() {
            return EngineAnswer::Unsatisfiable;
        }

        if self.optimization {
            // Two warm starts: unconstrained, then with every weak literal
            // assumed.
            match self.solver.solve() {
                SolverExecutionFlag::Feasible => self.update_upper_bound(),
                SolverExecutionFlag::Unknown => return EngineAnswer::Unknown,
                SolverExecutionFlag::Infeasible => {}
            }
            self.solver.cancel_until(0);
            let assumptions = self.search.pool.literals().to_vec();
            if let SolverExecutionFlag::Feasible =
                self.solver.solve_under_assumptions(&assumptions)
            {
                self.update_upper_bound();
            }
            self.solver.cancel_until(0);
        }

        while !self.levels.is_empty() {
            let mut limit = {
                let level = *self.levels.last().unwrap();
                self.search.next_limit(&level, i64::MAX)
            };

            loop {
                let allow_equal = self.allow_equal_hardening();
                let level = *self.levels.last().unwrap();
                self.search.harden(&mut self.solver, &level, allow_equal);
                let assumptions = self.search.assumptions(&level, limit);

                let level = *self.levels.last().unwrap();
                if level.lower_bound >= level.upper_bound {
                    break;
                }

                self.solver.cancel_until(0);
                match self.solver.solve_under_assumptions(&assumptions) {
                    SolverExecutionFlag::Unknown => return EngineAnswer::Unknown,
                    SolverExecutionFlag::Feasible => {
                        self.update_upper_bound();
                        let level = *self.levels.last().unwrap();
                        limit = self.search.next_limit(&level, limit);
                    }
                    SolverExecutionFlag::Infeasible => {
                        let core = self.solver.extract_core().to_vec();
                        debug!("level {} core of size {}", level.level, core.len());
                        if core.is_empty() {
                            let record = self.levels.last_mut().unwrap();
                            record.lower_bound = record.upper_bound;
                            limit = 1;
                            continue;
                        }

                        let (lower, upper) = (level.lower_bound, level.upper_bound);
                        let core = self.search.shrink_core(&mut self.solver, core, || {
                            lower + limit < upper
                        });
                        let core = self.search.trim_core(&mut self.solver, core);
                        if core.is_empty() {
                            let record = self.levels.last_mut().unwrap();
                            record.lower_bound = record.upper_bound;
                            limit = 1;
                            continue;
                        }

                        let weight = self.search.core_weight(&core);
                        self.add_to_lower_bound(weight);
                        let _ = self.search.reformulate_core(
                            &mut self.solver,
                            &core,
                            weight,
                            level.level,
                        );
                    }
                }
            }

            let completed = *self.levels.last().unwrap();
            if completed.upper_bound == i64::MAX {
                return EngineAnswer::Unsatisfiable;
            }
            self.solved.push(completed);
            let _ = self.levels.pop();
        }

        // Hardening at equality may have cut the stored optimum away from the
        // solver; a single answer is published from stable storage.
        if self.options.max_models == 1 {
            self.print_model();
        } else {
            self.enumerate_models();
        }
        EngineAnswer::Satisfiable
    }

    fn enumerate_models(&mut self) {
        self.solver.cancel_until(0);
        loop {
            match self.solver.solve() {
                SolverExecutionFlag::Feasible => {
                    self.solver.copy_model();
                    self.print_model();
                    if self.options.max_models != 0
                        && self.printer.num_models() >= self.options.max_models
                    {
                        break;
                    }
                    if self.solver.get_decision_level() == 0 {
                        break;
                    }
                    if !self.solver.learn_clause_from_model() {
                        break;
                    }
                }
                SolverExecutionFlag::Unknown | SolverExecutionFlag::Infeasible => break,
            }
        }
    }

    fn print_model(&mut self) {
        self.printer.on_model(self.solver.model_slice());
        if self.optimization {
            print!("COST");
            for record in &self.solved {
                print!(" {}@{}", record.lower_bound, record.level);
            }
            for record in self.levels.iter().rev() {
                print!(" {}@{}", record.upper_bound, record.level);
            }
            println!();
            if self.levels.is_empty() {
                println!("OPTIMUM");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn solved_levels(&self) -> &[OptimisationLevel] {
        &self.solved
    }

    pub fn solve(&mut self) -> EngineAnswer {
        self.printer.on_start();
        self.printer.on_start_iteration();

        let answer = self.solve_internal();

        self.printer
            .on_done_iteration(answer == EngineAnswer::Unknown);
        self.printer.on_done();
        self.solver.log_statistics();
        answer
    }
}
