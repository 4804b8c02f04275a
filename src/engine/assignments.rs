//! The trail and everything indexed by it: assignment values, decision
//! levels, reasons and trail positions of variables.

use crate::basic_types::ConstraintReference;
use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::basic_types::TruthValue;
use crate::torrone_assert_simple;

/// Sentinel trail position of an unassigned variable.
const UNASSIGNED_POSITION: usize = usize::MAX;

#[derive(Clone, Debug, Default)]
pub(crate) struct Assignments {
    values: KeyedVec<PropositionalVariable, TruthValue>,
    levels: KeyedVec<PropositionalVariable, u32>,
    reasons: KeyedVec<PropositionalVariable, ConstraintReference>,
    /// The insertion order of each assignment; [`UNASSIGNED_POSITION`] when
    /// the variable is unassigned. Propagators use these indices to order
    /// their reason clauses.
    positions: KeyedVec<PropositionalVariable, usize>,
    trail: Vec<Literal>,
    trail_delimiters: Vec<usize>,
}

impl Assignments {
    pub(crate) fn grow(&mut self) -> PropositionalVariable {
        let _ = self.values.push(TruthValue::Undef);
        let _ = self.levels.push(0);
        let _ = self.reasons.push(ConstraintReference::None);
        self.positions.push(UNASSIGNED_POSITION)
    }

    pub(crate) fn num_variables(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn value_of_variable(&self, variable: PropositionalVariable) -> TruthValue {
        self.values[variable]
    }

    pub(crate) fn value_of_literal(&self, literal: Literal) -> TruthValue {
        let value = self.values[literal.get_propositional_variable()];
        if literal.is_positive() {
            value
        } else {
            value.negate()
        }
    }

    pub(crate) fn is_literal_assigned_true(&self, literal: Literal) -> bool {
        self.value_of_literal(literal).is_true()
    }

    pub(crate) fn is_literal_assigned_false(&self, literal: Literal) -> bool {
        self.value_of_literal(literal).is_false()
    }

    pub(crate) fn is_literal_unassigned(&self, literal: Literal) -> bool {
        self.value_of_literal(literal).is_undef()
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.trail_delimiters.len()
    }

    pub(crate) fn is_at_the_root_level(&self) -> bool {
        self.trail_delimiters.is_empty()
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.trail_delimiters.push(self.trail.len());
    }

    pub(crate) fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    pub(crate) fn get_trail_entry(&self, index: usize) -> Literal {
        self.trail[index]
    }

    /// The trail index of the first assignment of the given decision level.
    pub(crate) fn get_trail_delimiter(&self, level: usize) -> usize {
        self.trail_delimiters[level]
    }

    /// The insertion order of the assignment of `variable`, or `usize::MAX`
    /// for an unassigned variable.
    pub(crate) fn get_assigned_index(&self, variable: PropositionalVariable) -> usize {
        self.positions[variable]
    }

    pub(crate) fn get_assignment_level(&self, variable: PropositionalVariable) -> usize {
        self.levels[variable] as usize
    }

    pub(crate) fn get_reason(&self, variable: PropositionalVariable) -> ConstraintReference {
        self.reasons[variable]
    }

    /// Place `literal` on the trail. The caller guarantees the literal is
    /// currently unassigned; decisions and root-level facts use
    /// [`ConstraintReference::None`].
    pub(crate) fn enqueue(&mut self, literal: Literal, reason: ConstraintReference) {
        torrone_assert_simple!(self.is_literal_unassigned(literal));

        let variable = literal.get_propositional_variable();
        self.values[variable] = TruthValue::from_bool(literal.is_positive());
        self.levels[variable] = self.get_decision_level() as u32;
        self.reasons[variable] = reason;
        self.positions[variable] = self.trail.len();
        self.trail.push(literal);
    }

    /// Undo all assignments made after `target_level`. Returns the unassigned
    /// literals, newest first, so the caller can restore phase saving and the
    /// branching heap.
    pub(crate) fn synchronise(&mut self, target_level: usize) -> Vec<Literal> {
        torrone_assert_simple!(target_level < self.get_decision_level());

        let new_size = self.trail_delimiters[target_level];
        let mut unassigned = Vec::with_capacity(self.trail.len() - new_size);

        while self.trail.len() > new_size {
            let literal = self.trail.pop().unwrap();
            let variable = literal.get_propositional_variable();
            self.values[variable] = TruthValue::Undef;
            self.reasons[variable] = ConstraintReference::None;
            self.positions[variable] = UNASSIGNED_POSITION;
            unassigned.push(literal);
        }
        self.trail_delimiters.truncate(target_level);

        unassigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(assignments: &mut Assignments, positive: bool) -> Literal {
        let variable = assignments.grow();
        Literal::new(variable, positive)
    }

    #[test]
    fn enqueue_records_level_position_and_value() {
        let mut assignments = Assignments::default();
        let a = literal(&mut assignments, true);
        let b = literal(&mut assignments, false);

        assignments.enqueue(a, ConstraintReference::None);
        assignments.increase_decision_level();
        assignments.enqueue(b, ConstraintReference::None);

        assert!(assignments.is_literal_assigned_true(a));
        assert!(assignments.is_literal_assigned_false(!b));
        assert_eq!(assignments.get_assignment_level(a.get_propositional_variable()), 0);
        assert_eq!(assignments.get_assignment_level(b.get_propositional_variable()), 1);
        assert!(
            assignments.get_assigned_index(a.get_propositional_variable())
                < assignments.get_assigned_index(b.get_propositional_variable())
        );
    }

    #[test]
    fn synchronise_unassigns_everything_after_the_target_level() {
        let mut assignments = Assignments::default();
        let a = literal(&mut assignments, true);
        let b = literal(&mut assignments, true);
        let c = literal(&mut assignments, true);

        assignments.enqueue(a, ConstraintReference::None);
        assignments.increase_decision_level();
        assignments.enqueue(b, ConstraintReference::None);
        assignments.enqueue(c, ConstraintReference::None);

        let unassigned = assignments.synchronise(0);

        assert_eq!(unassigned, vec![c, b]);
        assert!(assignments.is_literal_assigned_true(a));
        assert!(assignments.is_literal_unassigned(b));
        assert!(assignments.is_literal_unassigned(c));
        assert_eq!(assignments.get_decision_level(), 0);
    }
}
