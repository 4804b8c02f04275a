//! Variable and value selection: VSIDS activities paired with phase saving.

mod phase_saving;
mod vsids;

pub(crate) use phase_saving::PhaseSaving;
pub(crate) use vsids::Vsids;

use rand::rngs::SmallRng;
use rand::Rng;

use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::engine::Assignments;

/// How often a decision picks a uniformly random unassigned variable instead
/// of the most active one.
const RANDOM_DECISION_FREQUENCY: f64 = 0.02;

#[derive(Clone, Debug, Default)]
pub(crate) struct Brancher {
    variable_selector: Vsids,
    value_selector: PhaseSaving,
}

impl Brancher {
    pub(crate) fn grow(&mut self, variable: PropositionalVariable) {
        self.variable_selector.grow(variable);
        self.value_selector.grow(variable);
    }

    /// Pick the next decision literal, or `None` when every variable is
    /// assigned.
    pub(crate) fn next_decision(
        &mut self,
        assignments: &Assignments,
        random_generator: &mut SmallRng,
    ) -> Option<Literal> {
        if random_generator.gen_bool(RANDOM_DECISION_FREQUENCY) {
            if let Some(variable) = self.random_unassigned(assignments, random_generator) {
                return Some(self.value_selector.select(variable));
            }
        }

        self.variable_selector
            .pop_next_unassigned(assignments)
            .map(|variable| self.value_selector.select(variable))
    }

    fn random_unassigned(
        &self,
        assignments: &Assignments,
        random_generator: &mut SmallRng,
    ) -> Option<PropositionalVariable> {
        let num_variables = assignments.num_variables();
        if num_variables == 0 {
            return None;
        }
        let candidate =
            PropositionalVariable::new(random_generator.gen_range(0..num_variables) as u32);
        if assignments.value_of_variable(candidate).is_undef() {
            Some(candidate)
        } else {
            None
        }
    }

    /// Called for every variable appearing in conflict analysis.
    pub(crate) fn on_appearance_in_conflict(&mut self, variable: PropositionalVariable) {
        self.variable_selector.bump_activity(variable);
    }

    /// Called once per conflict, after the learned clause is derived.
    pub(crate) fn on_conflict(&mut self) {
        self.variable_selector.decay_activities();
    }

    /// Called for every literal removed from the trail during backtracking.
    pub(crate) fn on_unassign(&mut self, literal: Literal) {
        self.value_selector.save(literal);
        self.variable_selector
            .push(literal.get_propositional_variable());
    }
}
