//! Unit propagation on clauses with the two-watched-literal scheme.

use super::assignments::Assignments;
use super::clause_allocator::ClauseAllocator;
use crate::basic_types::ClauseReference;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::ConstraintReference;
use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::torrone_assert_moderate;
use crate::torrone_assert_simple;

#[derive(Clone, Copy, Debug)]
struct Watcher {
    clause: ClauseReference,
    /// A cached literal of the clause; when the blocker is already true the
    /// clause cannot propagate and the watch list walk skips it.
    blocker: Literal,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ClausalPropagator {
    /// Indexed by the literal that just became true; holds the clauses in
    /// which the negation of that literal is watched.
    watch_lists: KeyedVec<Literal, Vec<Watcher>>,
    next_to_propagate: usize,
}

impl ClausalPropagator {
    pub(crate) fn grow(&mut self) {
        let _ = self.watch_lists.push(Vec::new());
        let _ = self.watch_lists.push(Vec::new());
    }

    pub(crate) fn attach_clause(
        &mut self,
        reference: ClauseReference,
        clause_allocator: &ClauseAllocator,
    ) {
        let clause = &clause_allocator[reference];
        torrone_assert_simple!(clause.len() >= 2);

        self.watch_lists[!clause.literal(0)].push(Watcher {
            clause: reference,
            blocker: clause.literal(1),
        });
        self.watch_lists[!clause.literal(1)].push(Watcher {
            clause: reference,
            blocker: clause.literal(0),
        });
    }

    /// Add an input clause at the root level. True literals make the clause
    /// vacuous, false literals are dropped, duplicates are merged and
    /// tautologies are detected. An empty result is an error, a unit result
    /// goes directly onto the trail.
    pub(crate) fn add_permanent_clause(
        &mut self,
        literals: Vec<Literal>,
        assignments: &mut Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) -> Result<(), ConstraintOperationError> {
        torrone_assert_simple!(assignments.is_at_the_root_level());

        let mut simplified: Vec<Literal> = Vec::with_capacity(literals.len());
        for literal in literals {
            if assignments.is_literal_assigned_true(literal) || simplified.contains(&!literal) {
                return Ok(());
            }
            if assignments.is_literal_assigned_false(literal) || simplified.contains(&literal) {
                continue;
            }
            simplified.push(literal);
        }

        match simplified.len() {
            0 => Err(ConstraintOperationError::InfeasibleClause),
            1 => {
                assignments.enqueue(simplified[0], ConstraintReference::None);
                Ok(())
            }
            _ => {
                let reference = clause_allocator.create_clause(simplified, false);
                self.attach_clause(reference, clause_allocator);
                Ok(())
            }
        }
    }

    /// Propagate every trail entry that has not been inspected yet. On
    /// conflict the conflicting clause is returned and the trail cursor stays
    /// behind the conflicting entry.
    pub(crate) fn propagate(
        &mut self,
        assignments: &mut Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) -> Result<(), ClauseReference> {
        while self.next_to_propagate < assignments.num_trail_entries() {
            let propagated = assignments.get_trail_entry(self.next_to_propagate);
            self.next_to_propagate += 1;

            if let Err(conflict) =
                self.propagate_literal(propagated, assignments, clause_allocator)
            {
                return Err(conflict);
            }
        }
        Ok(())
    }

    fn propagate_literal(
        &mut self,
        true_literal: Literal,
        assignments: &mut Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) -> Result<(), ClauseReference> {
        let mut watchers = std::mem::take(&mut self.watch_lists[true_literal]);
        let mut kept = 0;
        let mut result = Ok(());

        'watchers: for current in 0..watchers.len() {
            let watcher = watchers[current];

            if assignments.is_literal_assigned_true(watcher.blocker) {
                watchers[kept] = watcher;
                kept += 1;
                continue;
            }

            let reference = watcher.clause;
            let clause = &mut clause_allocator[reference];

            // Normalise so that the falsified watched literal sits at index 1.
            if clause.literal(0) == !true_literal {
                clause.swap(0, 1);
            }
            torrone_assert_moderate!(clause.literal(1) == !true_literal);

            let first = clause.literal(0);
            if assignments.is_literal_assigned_true(first) {
                watchers[kept] = Watcher {
                    clause: reference,
                    blocker: first,
                };
                kept += 1;
                continue;
            }

            for candidate in 2..clause.len() {
                if !assignments.is_literal_assigned_false(clause.literal(candidate)) {
                    clause.swap(1, candidate);
                    let new_watch = clause.literal(1);
                    self.watch_lists[!new_watch].push(Watcher {
                        clause: reference,
                        blocker: first,
                    });
                    continue 'watchers;
                }
            }

            // No replacement watch: the clause is unit or conflicting.
            watchers[kept] = watcher;
            kept += 1;
            if assignments.is_literal_assigned_false(first) {
                // Keep the remaining watchers and stop; the backjump resets
                // the trail cursor through `synchronise`.
                for later in current + 1..watchers.len() {
                    watchers[kept] = watchers[later];
                    kept += 1;
                }
                self.next_to_propagate = assignments.num_trail_entries();
                result = Err(reference);
                break;
            }
            assignments.enqueue(first, ConstraintReference::Clause(reference));
        }

        watchers.truncate(kept);
        self.watch_lists[true_literal] = watchers;
        result
    }

    pub(crate) fn synchronise(&mut self, num_trail_entries: usize) {
        self.next_to_propagate = self.next_to_propagate.min(num_trail_entries);
    }

    pub(crate) fn is_propagation_complete(&self, num_trail_entries: usize) -> bool {
        self.next_to_propagate == num_trail_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(num_variables: usize) -> (ClausalPropagator, Assignments, ClauseAllocator) {
        let mut propagator = ClausalPropagator::default();
        let mut assignments = Assignments::default();
        for _ in 0..num_variables {
            let _ = assignments.grow();
            propagator.grow();
        }
        (propagator, assignments, ClauseAllocator::default())
    }

    #[test]
    fn unit_propagation_over_a_chain_of_binary_clauses() {
        let (mut propagator, mut assignments, mut allocator) = setup(3);
        let lits: Vec<Literal> = (1..=3).map(Literal::from_dimacs).collect();

        propagator
            .add_permanent_clause(vec![!lits[0], lits[1]], &mut assignments, &mut allocator)
            .unwrap();
        propagator
            .add_permanent_clause(vec![!lits[1], lits[2]], &mut assignments, &mut allocator)
            .unwrap();

        assignments.increase_decision_level();
        assignments.enqueue(lits[0], ConstraintReference::None);
        assert!(propagator.propagate(&mut assignments, &mut allocator).is_ok());

        assert!(assignments.is_literal_assigned_true(lits[1]));
        assert!(assignments.is_literal_assigned_true(lits[2]));
    }

    #[test]
    fn conflicting_clause_is_reported() {
        let (mut propagator, mut assignments, mut allocator) = setup(2);
        let a = Literal::from_dimacs(1);
        let b = Literal::from_dimacs(2);

        propagator
            .add_permanent_clause(vec![a, b], &mut assignments, &mut allocator)
            .unwrap();

        assignments.increase_decision_level();
        assignments.enqueue(!a, ConstraintReference::None);
        assignments.enqueue(!b, ConstraintReference::None);

        let conflict = propagator.propagate(&mut assignments, &mut allocator);
        assert!(conflict.is_err());
    }

    #[test]
    fn root_level_simplification_of_added_clauses() {
        let (mut propagator, mut assignments, mut allocator) = setup(3);
        let a = Literal::from_dimacs(1);
        let b = Literal::from_dimacs(2);

        // Unit clause goes straight to the trail.
        propagator
            .add_permanent_clause(vec![a], &mut assignments, &mut allocator)
            .unwrap();
        assert!(assignments.is_literal_assigned_true(a));

        // A clause containing a root-level true literal is dropped.
        propagator
            .add_permanent_clause(vec![a, b], &mut assignments, &mut allocator)
            .unwrap();
        assert_eq!(allocator.num_clauses(), 0);

        // A clause whose literals are all false is an error.
        let result = propagator.add_permanent_clause(vec![!a], &mut assignments, &mut allocator);
        assert_eq!(result, Err(ConstraintOperationError::InfeasibleClause));
    }
}
