//! Shared machinery for propagators whose state is organised around axioms:
//! per-literal observation lists, per-variable axiom reasons, the conflict
//! buffer and the trail-synchronised cursor with partial-unassign
//! bookkeeping.

use super::propagator::grow_literal_keyed;
use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::basic_types::StorageKey;
use crate::engine::Assignments;
use crate::torrone_assert_simple;

/// Index of an axiom within its owning propagator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AxiomId(u32);

impl StorageKey for AxiomId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> AxiomId {
        AxiomId(index as u32)
    }
}

/// One entry of a watch list: when the watched literal becomes true, `axiom`
/// is notified; `slot` identifies which of the axiom's literals fired.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Observation {
    pub(crate) axiom: AxiomId,
    pub(crate) slot: u32,
}

/// The axiom-independent part of an axioms propagator. The owning propagator
/// keeps its axioms next to this store so that the cancellation walk can
/// mutate axiom state through a plain closure.
#[derive(Clone, Debug)]
pub(crate) struct AxiomStore {
    observed: KeyedVec<Literal, Vec<Observation>>,
    reasons: KeyedVec<PropositionalVariable, Option<AxiomId>>,
    conflict_clause: Vec<Literal>,
    next_to_propagate: usize,
    /// When a notification at observation index `i` produced a conflict, the
    /// pair `(literal, i)` is remembered so the cancellation walk first
    /// revisits observations `0..=i` of that literal.
    partial_unassign: Option<(Literal, usize)>,
    notify_on_cancel: bool,
}

impl AxiomStore {
    /// A store for a propagator that restores axiom state through unassign
    /// notifications. Propagators whose state is derivable from the trail
    /// pass `notify_on_cancel = false` and only get their cursor
    /// resynchronised.
    pub(crate) fn new(notify_on_cancel: bool) -> AxiomStore {
        AxiomStore {
            observed: KeyedVec::default(),
            reasons: KeyedVec::default(),
            conflict_clause: Vec::default(),
            next_to_propagate: 0,
            partial_unassign: None,
            notify_on_cancel,
        }
    }

    pub(crate) fn grow(&mut self) {
        let _ = self.reasons.push(None);
        grow_literal_keyed(&mut self.observed, self.reasons.len(), Vec::new());
    }

    /// Register the observations of a new axiom. Registration is append-only
    /// for the lifetime of the propagator.
    pub(crate) fn watch(&mut self, axiom: AxiomId, literal: Literal, slot: u32) {
        self.observed[literal].push(Observation { axiom, slot });
    }

    pub(crate) fn num_observations(&self, literal: Literal) -> usize {
        self.observed[literal].len()
    }

    pub(crate) fn observation(&self, literal: Literal, index: usize) -> Observation {
        self.observed[literal][index]
    }

    pub(crate) fn set_reason(&mut self, variable: PropositionalVariable, axiom: AxiomId) {
        self.reasons[variable] = Some(axiom);
    }

    pub(crate) fn reason_axiom(&self, variable: PropositionalVariable) -> Option<AxiomId> {
        self.reasons[variable]
    }

    pub(crate) fn store_conflict(&mut self, literals: Vec<Literal>) {
        self.conflict_clause = literals;
    }

    pub(crate) fn record_partial_unassign(&mut self, literal: Literal, index: usize) {
        torrone_assert_simple!(self.partial_unassign.is_none());
        if self.notify_on_cancel {
            self.partial_unassign = Some((literal, index));
        }
    }

    /// The next unseen trail entry, advancing the cursor.
    pub(crate) fn next_literal(&mut self, assignments: &Assignments) -> Option<Literal> {
        if self.next_to_propagate < assignments.num_trail_entries() {
            let literal = assignments.get_trail_entry(self.next_to_propagate);
            self.next_to_propagate += 1;
            Some(literal)
        } else {
            None
        }
    }

    /// Restore the cursor after a backjump, invoking `on_unassign` for every
    /// observation of every removed literal (newest first). A partially
    /// notified literal is revisited up to and including the observation that
    /// conflicted.
    pub(crate) fn on_cancel(
        &mut self,
        assignments: &Assignments,
        unassigned: &[Literal],
        mut on_unassign: impl FnMut(Literal, Observation),
    ) {
        let new_length = assignments.num_trail_entries();

        if !self.notify_on_cancel {
            self.next_to_propagate = self.next_to_propagate.min(new_length);
            return;
        }

        let old_length = new_length + unassigned.len();
        let literal_at = |position: usize| unassigned[old_length - 1 - position];

        if let Some((literal, index)) = self.partial_unassign.take() {
            torrone_assert_simple!(self.next_to_propagate > new_length);
            self.next_to_propagate -= 1;
            torrone_assert_simple!(literal_at(self.next_to_propagate) == literal);
            for slot_index in (0..=index).rev() {
                on_unassign(literal, self.observed[literal][slot_index]);
            }
        }

        while self.next_to_propagate > new_length {
            self.next_to_propagate -= 1;
            let literal = literal_at(self.next_to_propagate);
            for index in 0..self.observed[literal].len() {
                on_unassign(literal, self.observed[literal][index]);
            }
        }
    }

    pub(crate) fn take_conflict(&mut self) -> Vec<Literal> {
        torrone_assert_simple!(!self.conflict_clause.is_empty());
        std::mem::take(&mut self.conflict_clause)
    }
}
