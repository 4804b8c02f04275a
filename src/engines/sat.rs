//! Plain CNF satisfiability with model enumeration.

use std::io::BufRead;

use log::debug;

use super::EngineAnswer;
use crate::basic_types::SolverExecutionFlag;
use crate::engine::SatSolver;
use crate::options::EngineOptions;
use crate::options::SolverOptions;
use crate::output::OutputTemplates;
use crate::output::Printer;
use crate::parse::read_clause;
use crate::parse::ParseError;
use crate::parse::Prolog;
use crate::parse::StreamBuffer;

pub struct SatEngine {
    solver: SatSolver,
    printer: Printer,
    options: EngineOptions,
    num_input_variables: usize,
}

impl SatEngine {
    pub fn new(solver_options: SolverOptions, options: EngineOptions) -> SatEngine {
        let printer = Printer::new(OutputTemplates::default(), options.print_model);
        SatEngine {
            solver: SatSolver::new(solver_options),
            printer,
            options,
            num_input_variables: 0,
        }
    }

    pub fn solver_mut(&mut self) -> &mut SatSolver {
        &mut self.solver
    }

    pub fn interrupt_flag(&self) -> std::sync::Arc<std::sync::atomic::AtomicBool> {
        self.solver.interrupt_flag()
    }

    /// Read the program body: clauses, comments and `v` directives.
    pub fn load<R: BufRead>(
        &mut self,
        stream: &mut StreamBuffer<R>,
        prolog: &Prolog,
    ) -> Result<(), ParseError> {
        self.solver.grow_to_dimacs(prolog.num_variables as i64);

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
                Some(_) => {
                    let literals = read_clause(stream, &mut self.solver)?;
                    // An infeasible addition latches the solver; keep reading
                    // so diagnostics cover the whole input.
                    let _ = self.solver.add_clause(literals);
                }
            }
        }

        self.num_input_variables = self.solver.num_variables();
        self.printer.set_last_visible_var(self.num_input_variables);
        Ok(())
    }

    /// Enumerate up to the configured number of models.
    pub fn solve(&mut self) -> EngineAnswer {
        self.printer.on_start();
        self.printer.on_start_iteration();

        let mut interrupted = false;
        loop {
            match self.solver.solve() {
                SolverExecutionFlag::Feasible => {
                    self.solver.copy_model();
                    self.printer.on_model(self.solver.model_slice());
                    if self.options.max_models != 0
                        && self.printer.num_models() >= self.options.max_models
                    {
                        break;
                    }
                    if self.solver.get_decision_level() == 0 {
                        // The model is forced; there is nothing left to
                        // enumerate.
                        break;
                    }
                    if !self.solver.learn_clause_from_model() {
                        break;
                    }
                }
                SolverExecutionFlag::Infeasible => break,
                SolverExecutionFlag::Unknown => {
                    interrupted = true;
                    break;
                }
            }
        }

        let num_models = self.printer.num_models();
        debug!("enumeration finished with {num_models} models");
        self.printer.on_done_iteration(interrupted);
        self.printer.on_done();
        self.solver.log_statistics();

        if num_models > 0 {
            EngineAnswer::Satisfiable
        } else if interrupted {
            EngineAnswer::Unknown
        } else {
            EngineAnswer::Unsatisfiable
        }
    }
}
