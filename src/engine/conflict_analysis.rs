//! 1UIP conflict analysis and failed-assumption (core) analysis. Clausal and
//! theory reasons are resolved uniformly; theory reasons are fetched from the
//! responsible propagator on demand.

use super::assignments::Assignments;
use super::clause_allocator::ClauseAllocator;
use crate::basic_types::ClauseReference;
use crate::basic_types::ConstraintReference;
use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::branching::Brancher;
use crate::propagation::PropagationContext;
use crate::propagation::Propagator;
use crate::propagation::PropagatorKind;
use crate::torrone_assert_moderate;
use crate::torrone_assert_simple;

/// A conflict as reported by propagation: either a falsified clause or a
/// theory explanation (a clause whose literals are all false).
#[derive(Clone, Debug)]
pub(crate) enum StoredConflictInfo {
    Clause(ClauseReference),
    Explanation(Vec<Literal>),
    /// Root-level falsity derived during simplification; there is nothing to
    /// learn from it.
    Root,
}

#[derive(Clone, Debug)]
pub(crate) struct LearnedClause {
    /// The asserting literal sits at index 0, a literal of the backjump
    /// level at index 1.
    pub(crate) literals: Vec<Literal>,
    pub(crate) backjump_level: usize,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ConflictAnalyser {
    seen: KeyedVec<PropositionalVariable, bool>,
    to_clear: Vec<PropositionalVariable>,
}

impl ConflictAnalyser {
    pub(crate) fn grow(&mut self) {
        let _ = self.seen.push(false);
    }

    /// Derive the first-unique-implication-point clause for the given
    /// conflict.
    pub(crate) fn analyse(
        &mut self,
        conflict: &StoredConflictInfo,
        assignments: &Assignments,
        clause_allocator: &ClauseAllocator,
        propagators: &mut [PropagatorKind],
        brancher: &mut Brancher,
    ) -> LearnedClause {
        torrone_assert_simple!(!assignments.is_at_the_root_level());

        let current_level = assignments.get_decision_level();
        let mut tail: Vec<Literal> = Vec::new();
        let mut path_count = 0usize;
        let mut trail_index = assignments.num_trail_entries();

        let initial: Vec<Literal> = match conflict {
            StoredConflictInfo::Clause(reference) => {
                clause_allocator[*reference].get_literal_slice().to_vec()
            }
            StoredConflictInfo::Explanation(literals) => literals.clone(),
            StoredConflictInfo::Root => unreachable!("root falsity is never analysed"),
        };
        for literal in initial {
            self.mark(
                literal,
                assignments,
                brancher,
                current_level,
                &mut path_count,
                &mut tail,
            );
        }
        torrone_assert_simple!(path_count > 0);

        let uip = loop {
            // Walk backwards to the next marked trail literal.
            let propagated = loop {
                trail_index -= 1;
                let candidate = assignments.get_trail_entry(trail_index);
                if self.seen[candidate.get_propositional_variable()] {
                    break candidate;
                }
            };

            path_count -= 1;
            if path_count == 0 {
                break propagated;
            }

            let reason = reason_literals(
                propagated,
                assignments,
                clause_allocator,
                propagators,
            );
            for literal in reason {
                self.mark(
                    literal,
                    assignments,
                    brancher,
                    current_level,
                    &mut path_count,
                    &mut tail,
                );
            }
        };

        self.clear_seen();

        let mut literals = Vec::with_capacity(tail.len() + 1);
        literals.push(!uip);
        literals.extend(tail);

        let backjump_level = if literals.len() == 1 {
            0
        } else {
            // The literal of the second-highest level moves to the other
            // watch position.
            let mut widest = 1;
            for position in 2..literals.len() {
                let level = assignments
                    .get_assignment_level(literals[position].get_propositional_variable());
                if level
                    > assignments
                        .get_assignment_level(literals[widest].get_propositional_variable())
                {
                    widest = position;
                }
            }
            literals.swap(1, widest);
            assignments.get_assignment_level(literals[1].get_propositional_variable())
        };

        LearnedClause {
            literals,
            backjump_level,
        }
    }

    /// Explain why `failed_assumption` cannot hold: the clause of negated
    /// assumptions responsible for its falsification.
    pub(crate) fn analyse_final(
        &mut self,
        failed_assumption: Literal,
        assignments: &Assignments,
        clause_allocator: &ClauseAllocator,
        propagators: &mut [PropagatorKind],
    ) -> Vec<Literal> {
        torrone_assert_simple!(assignments.is_literal_assigned_false(failed_assumption));

        let mut core = vec![!failed_assumption];
        if assignments.is_at_the_root_level() {
            return core;
        }

        let variable = failed_assumption.get_propositional_variable();
        self.seen[variable] = true;

        let first_choice_entry = assignments.get_trail_delimiter(0);
        for trail_index in (first_choice_entry..assignments.num_trail_entries()).rev() {
            let literal = assignments.get_trail_entry(trail_index);
            let current = literal.get_propositional_variable();
            if !self.seen[current] {
                continue;
            }

            if assignments.get_reason(current).is_none() {
                torrone_assert_moderate!(assignments.get_assignment_level(current) > 0);
                core.push(!literal);
            } else {
                let reason =
                    reason_literals(literal, assignments, clause_allocator, propagators);
                for reason_literal in reason {
                    let reason_variable = reason_literal.get_propositional_variable();
                    if assignments.get_assignment_level(reason_variable) > 0 {
                        self.seen[reason_variable] = true;
                        self.to_clear.push(reason_variable);
                    }
                }
            }
            self.seen[current] = false;
        }

        self.seen[variable] = false;
        self.clear_seen();

        core
    }

    fn mark(
        &mut self,
        literal: Literal,
        assignments: &Assignments,
        brancher: &mut Brancher,
        current_level: usize,
        path_count: &mut usize,
        tail: &mut Vec<Literal>,
    ) {
        let variable = literal.get_propositional_variable();
        let level = assignments.get_assignment_level(variable);
        if self.seen[variable] || level == 0 {
            return;
        }
        torrone_assert_moderate!(assignments.is_literal_assigned_false(literal));

        self.seen[variable] = true;
        self.to_clear.push(variable);
        brancher.on_appearance_in_conflict(variable);

        if level >= current_level {
            *path_count += 1;
        } else {
            tail.push(literal);
        }
    }

    fn clear_seen(&mut self) {
        while let Some(variable) = self.to_clear.pop() {
            self.seen[variable] = false;
        }
    }
}

/// The reason tail of a propagated literal: the falsified literals that
/// forced it. The propagating literal itself is not included.
fn reason_literals(
    propagated: Literal,
    assignments: &Assignments,
    clause_allocator: &ClauseAllocator,
    propagators: &mut [PropagatorKind],
) -> Vec<Literal> {
    match assignments.get_reason(propagated.get_propositional_variable()) {
        ConstraintReference::Clause(reference) => {
            let clause = &clause_allocator[reference];
            torrone_assert_moderate!(clause.literal(0) == propagated);
            clause.get_literal_slice()[1..].to_vec()
        }
        ConstraintReference::Propagator(propagator_id) => {
            let context = PropagationContext { assignments };
            let mut reason = propagators[propagator_id.0 as usize]
                .get_reason(propagated, context);
            torrone_assert_simple!(reason.first() == Some(&propagated));
            reason.remove(0);
            reason
        }
        ConstraintReference::None => {
            unreachable!("decisions are unique implication points and are never expanded")
        }
    }
}
