//! Unfounded-set detection over recursive head atoms via source pointers.
//!
//! Every recursive atom carries a set of supports, each a pair of a body
//! literal and the recursive atoms that support depends on. The propagator
//! maintains a source pointer per atom such that following source pointers
//! always reaches a non-recursive derivation. Atoms for which no such chain
//! survives the current assignment form an unfounded set and are falsified.

use bitfield::bitfield;
use log::trace;

use super::propagator::Conflict;
use super::propagator::PropagationContext;
use super::propagator::PropagationContextMut;
use super::propagator::PropagationStatus;
use super::propagator::Propagator;
use super::propagator::SimplificationContext;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;
use crate::engine::Assignments;
use crate::propagation::propagator::grow_literal_keyed;
use crate::torrone_assert_moderate;
use crate::torrone_assert_simple;

bitfield! {
    /// Per-atom flags packed into one word: the unfoundedness epoch (30
    /// bits), the worklist flag, and whether the atom is temporarily removed
    /// from the reverse map of its source.
    #[derive(Clone, Copy)]
    pub struct AtomFlags(u32);
    impl Debug;
    u32;
    pub unfounded_at_call, set_unfounded_at_call: 29, 0;
    pub flag, set_flag: 30;
    pub removed_from_sp_of, set_removed_from_sp_of: 31;
}

/// The epoch counter wraps before the 30-bit field overflows; all stamps are
/// cleared and every atom is re-flagged on the (rare) reset.
const UNFOUNDED_CALL_LIMIT: u32 = (1 << 30) - 1;

/// One support of an atom: a body literal plus the recursive head atoms the
/// body depends on.
#[derive(Clone, Debug)]
struct Support {
    body: Literal,
    rec: Vec<PropositionalVariable>,
}

/// Back-index entry: the referenced atom's support at `index` has the owning
/// atom among its recursive dependencies.
#[derive(Clone, Copy, Debug)]
struct SupportIndex {
    atom: PropositionalVariable,
    index: u32,
}

#[derive(Clone, Debug, Default)]
struct AtomData {
    source_pointer: Option<Literal>,
    supports: Vec<Support>,
    in_rec_body: Vec<SupportIndex>,
    flags: AtomFlags,
}

impl Default for AtomFlags {
    fn default() -> Self {
        AtomFlags(0)
    }
}

#[derive(Clone, Debug, Default)]
struct BodyData {
    /// Atoms currently source-pointing at this body literal. Maintained
    /// lazily: stale entries appear and are filtered on use.
    sp_of: Vec<PropositionalVariable>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct SourcePointerPropagator {
    atom_ids: KeyedVec<PropositionalVariable, Option<u32>>,
    body_ids: KeyedVec<Literal, Option<u32>>,
    atoms: Vec<AtomData>,
    bodies: Vec<BodyData>,
    /// Atoms by variable id, in registration order; used by the epoch reset.
    atom_variables: Vec<PropositionalVariable>,
    flagged: Vec<PropositionalVariable>,
    next_to_propagate: usize,
    unfounded_at_call: u32,
}

impl SourcePointerPropagator {
    /// Register a support of `atom`: a body literal and the recursive atoms
    /// it depends on.
    pub(crate) fn add(
        &mut self,
        atom: PropositionalVariable,
        body: Literal,
        rec: Vec<PropositionalVariable>,
        assignments: &Assignments,
    ) {
        self.ensure_atom(atom, assignments);
        self.ensure_body(body);
        for &member in &rec {
            self.ensure_atom(member, assignments);
        }

        let support_index = self.atom_data(atom).supports.len() as u32;
        for &member in &rec {
            self.atom_data_mut(member).in_rec_body.push(SupportIndex {
                atom,
                index: support_index,
            });
        }
        self.atom_data_mut(atom).supports.push(Support { body, rec });
    }

    fn ensure_atom(&mut self, variable: PropositionalVariable, assignments: &Assignments) {
        if self.atom_ids[variable].is_some() {
            return;
        }
        self.atom_ids[variable] = Some(self.atoms.len() as u32);
        self.atoms.push(AtomData::default());
        self.atom_variables.push(variable);
        // Freshly registered atoms have no source yet.
        let _ = self.add_to_sp_lost(variable, assignments);
    }

    fn ensure_body(&mut self, literal: Literal) {
        if self.body_ids[literal].is_none() {
            self.body_ids[literal] = Some(self.bodies.len() as u32);
            self.bodies.push(BodyData::default());
        }
    }

    fn atom_data(&self, variable: PropositionalVariable) -> &AtomData {
        &self.atoms[self.atom_ids[variable].unwrap() as usize]
    }

    fn atom_data_mut(&mut self, variable: PropositionalVariable) -> &mut AtomData {
        &mut self.atoms[self.atom_ids[variable].unwrap() as usize]
    }

    fn is_body(&self, literal: Literal) -> bool {
        self.body_ids[literal].is_some()
    }

    fn flag(&self, variable: PropositionalVariable) -> bool {
        self.atom_data(variable).flags.flag()
    }

    fn set_flag(&mut self, variable: PropositionalVariable, value: bool) {
        self.atom_data_mut(variable).flags.set_flag(value);
    }

    fn epoch_of(&self, variable: PropositionalVariable) -> u32 {
        self.atom_data(variable).flags.unfounded_at_call()
    }

    /// The worklist of atoms that lost their source: false atoms never enter
    /// it.
    fn add_to_sp_lost(
        &mut self,
        variable: PropositionalVariable,
        assignments: &Assignments,
    ) -> bool {
        if assignments
            .value_of_variable(variable)
            .is_false()
            || self.flag(variable)
        {
            return false;
        }
        self.set_flag(variable, true);
        self.flagged.push(variable);
        true
    }

    /// The visited set of the reason traversal reuses the same flag bit.
    fn add_to_flagged(&mut self, variable: PropositionalVariable) -> bool {
        if self.flag(variable) {
            return false;
        }
        self.set_flag(variable, true);
        self.flagged.push(variable);
        true
    }

    fn reset_flagged(&mut self) {
        while let Some(variable) = self.flagged.pop() {
            self.set_flag(variable, false);
        }
    }

    /// Clear the worklist; atoms that stayed unfounded keep their (stale)
    /// source pointer and are re-listed in the reverse map of that source.
    fn reset_sp_lost(&mut self) {
        while let Some(variable) = self.flagged.pop() {
            if self.atom_data(variable).flags.removed_from_sp_of() {
                let source = self.atom_data(variable).source_pointer.unwrap();
                let body = self.body_ids[source].unwrap() as usize;
                self.bodies[body].sp_of.push(variable);
                self.atom_data_mut(variable)
                    .flags
                    .set_removed_from_sp_of(false);
            }
            self.set_flag(variable, false);
        }
    }

    /// A support is usable as a source when its body is not falsified and
    /// none of its recursive members is currently in the unfounded worklist.
    fn can_be_source(&self, support: &Support, assignments: &Assignments) -> bool {
        if assignments.is_literal_assigned_false(support.body) {
            return false;
        }
        support.rec.iter().all(|&member| !self.flag(member))
    }

    /// Install `body` as the source of `atom` and re-source every flagged
    /// descendant reachable through the back-index.
    fn set_source(&mut self, atom: PropositionalVariable, body: Literal, assignments: &Assignments) {
        let mut stack = vec![(atom, body)];
        self.set_flag(atom, false);

        while let Some((variable, source)) = stack.pop() {
            trace!("source of {variable} set to {source}");
            self.ensure_body(source);
            self.atom_data_mut(variable).source_pointer = Some(source);
            let body_id = self.body_ids[source].unwrap() as usize;
            self.bodies[body_id].sp_of.push(variable);

            for entry_index in 0..self.atom_data(variable).in_rec_body.len() {
                let entry = self.atom_data(variable).in_rec_body[entry_index];
                if !self.flag(entry.atom) {
                    continue;
                }
                let candidate_body = {
                    let support = &self.atom_data(entry.atom).supports[entry.index as usize];
                    if self.can_be_source(support, assignments) {
                        Some(support.body)
                    } else {
                        None
                    }
                };
                if let Some(candidate_body) = candidate_body {
                    stack.push((entry.atom, candidate_body));
                    self.set_flag(entry.atom, false);
                }
            }
        }
    }

    /// Remove the source of `atom` and cascade along the back-index to every
    /// atom whose chosen support depends on it.
    fn unset_source(
        &mut self,
        atom: PropositionalVariable,
        assignments: &Assignments,
    ) -> bool {
        trace!("source of {atom} lost");
        if !self.add_to_sp_lost(atom, assignments) {
            return false;
        }
        let mut stack = vec![atom];
        while let Some(variable) = stack.pop() {
            for entry_index in 0..self.atom_data(variable).in_rec_body.len() {
                let entry = self.atom_data(variable).in_rec_body[entry_index];
                let depends = {
                    let data = self.atom_data(entry.atom);
                    data.source_pointer == Some(data.supports[entry.index as usize].body)
                };
                if depends && self.add_to_sp_lost(entry.atom, assignments) {
                    stack.push(entry.atom);
                }
            }
        }
        true
    }

    /// Walk the unseen trail suffix; every falsified body literal invalidates
    /// the atoms source-pointing at it.
    fn remove_sources(&mut self, assignments: &Assignments) {
        while self.next_to_propagate < assignments.num_trail_entries() {
            let falsified = !assignments.get_trail_entry(self.next_to_propagate);
            self.next_to_propagate += 1;

            if !self.is_body(falsified) {
                continue;
            }
            let body_id = self.body_ids[falsified].unwrap() as usize;
            let mut pointing = std::mem::take(&mut self.bodies[body_id].sp_of);
            pointing.retain(|&variable| {
                if self.atom_data(variable).source_pointer != Some(falsified) {
                    // Stale reverse-map entry.
                    return true;
                }
                if self.unset_source(variable, assignments) {
                    self.atom_data_mut(variable)
                        .flags
                        .set_removed_from_sp_of(true);
                    false
                } else {
                    true
                }
            });
            self.bodies[body_id].sp_of = pointing;
        }
    }

    /// Try to find a new source for every flagged atom; atoms still flagged
    /// afterwards are unfounded in this epoch.
    fn rebuild_sources(&mut self, assignments: &Assignments) {
        for position in 0..self.flagged.len() {
            let variable = self.flagged[position];
            if !self.flag(variable) {
                continue;
            }
            trace!("searching a source for {variable}");
            let usable = {
                let data = self.atom_data(variable);
                data.supports
                    .iter()
                    .find(|support| self.can_be_source(support, assignments))
                    .map(|support| support.body)
            };
            if let Some(body) = usable {
                self.set_source(variable, body, assignments);
            }
        }

        let atoms = &self.atoms;
        let atom_ids = &self.atom_ids;
        self.flagged
            .retain(|&variable| atoms[atom_ids[variable].unwrap() as usize].flags.flag());
    }

    /// Advance the epoch counter, handling the rare wrap-around.
    fn next_call(&mut self, assignments: &Assignments) {
        torrone_assert_simple!(self.flagged.is_empty());
        if self.unfounded_at_call == UNFOUNDED_CALL_LIMIT {
            self.unfounded_at_call = 0;
            for atom in &mut self.atoms {
                atom.flags.set_unfounded_at_call(0);
            }
            for position in 0..self.atom_variables.len() {
                let variable = self.atom_variables[position];
                let _ = self.add_to_sp_lost(variable, assignments);
            }
        }
        self.unfounded_at_call += 1;
    }

    /// The reason an unfounded atom is false: the atom itself plus, per
    /// support, either its falsified body or a recursive member proven
    /// unfounded at an equal-or-older epoch. The traversal terminates
    /// because epochs are nondecreasing along the chain.
    fn compute_reason(
        &mut self,
        literal: Literal,
        index_bound: usize,
        epoch: u32,
        assignments: &Assignments,
    ) -> Vec<Literal> {
        torrone_assert_simple!(literal.is_negative());
        torrone_assert_moderate!(self.flagged.is_empty());

        let mut reason = vec![literal];
        let mut stack = vec![(
            literal.get_propositional_variable(),
            index_bound,
            epoch,
        )];

        while let Some((variable, index_bound, epoch)) = stack.pop() {
            if !self.add_to_flagged(variable) {
                continue;
            }
            for support_index in 0..self.atom_data(variable).supports.len() {
                let (body, rec_len) = {
                    let support = &self.atom_data(variable).supports[support_index];
                    (support.body, support.rec.len())
                };
                if assignments.is_literal_assigned_false(body)
                    && assignments.get_assigned_index(body.get_propositional_variable())
                        < index_bound
                {
                    reason.push(body);
                    continue;
                }
                for rec_index in 0..rec_len {
                    let member =
                        self.atom_data(variable).supports[support_index].rec[rec_index];
                    let member_epoch = self.epoch_of(member);
                    if member_epoch <= epoch {
                        let member_index = assignments
                            .get_assigned_index(member);
                        stack.push((member, member_index, member_epoch));
                        break;
                    }
                }
            }
        }
        self.reset_flagged();

        trace!("unfoundedness reason for {literal}: {reason:?}");
        reason
    }

    fn on_simplify(
        &mut self,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError> {
        self.rebuild_sources(context.assignments);

        for position in 0..self.flagged.len() {
            let unfounded = self.flagged[position];
            torrone_assert_simple!(self.flag(unfounded));
            context.add_clause(vec![!Literal::new(unfounded, true)])?;
        }
        self.reset_sp_lost();

        Ok(())
    }
}

impl Propagator for SourcePointerPropagator {
    fn name(&self) -> &str {
        "SourcePointers"
    }

    fn on_new_variable(&mut self) {
        let _ = self.atom_ids.push(None);
        grow_literal_keyed(&mut self.body_ids, self.atom_ids.len(), None);
    }

    fn activate(
        &mut self,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError> {
        trace!("activating source pointers over {} atoms", self.atoms.len());
        self.on_simplify(context)
    }

    fn simplify(
        &mut self,
        context: &mut SimplificationContext,
    ) -> Result<(), ConstraintOperationError> {
        torrone_assert_simple!(context.assignments.is_at_the_root_level());
        self.remove_sources(context.assignments);
        self.on_simplify(context)
    }

    fn propagate(&mut self, context: &mut PropagationContextMut) -> PropagationStatus {
        torrone_assert_simple!(!context.assignments.is_at_the_root_level());
        self.next_call(context.assignments);
        self.remove_sources(context.assignments);
        self.rebuild_sources(context.assignments);

        if self.flagged.is_empty() {
            return Ok(());
        }

        for position in 0..self.flagged.len() {
            let unfounded = self.flagged[position];
            if context
                .assignments
                .value_of_variable(unfounded)
                .is_true()
            {
                let conflicting = !Literal::new(unfounded, true);
                trace!("unfounded conflict on {conflicting}");
                self.reset_sp_lost();
                let clause = self.compute_reason(
                    conflicting,
                    usize::MAX,
                    self.unfounded_at_call,
                    context.assignments,
                );
                return Err(Conflict { literals: clause });
            }
        }

        let epoch = self.unfounded_at_call;
        for position in 0..self.flagged.len() {
            let unfounded = self.flagged[position];
            torrone_assert_moderate!(context
                .assignments
                .value_of_variable(unfounded)
                .is_undef());
            let inferred = !Literal::new(unfounded, true);
            trace!("unfoundedness infers {inferred}");
            context.enqueue_propagated_literal(inferred);
            self.atom_data_mut(unfounded)
                .flags
                .set_unfounded_at_call(epoch);
        }
        self.reset_sp_lost();

        Ok(())
    }

    fn get_reason(&mut self, literal: Literal, context: PropagationContext) -> Vec<Literal> {
        let variable = literal.get_propositional_variable();
        let index = context.assignments.get_assigned_index(variable);
        let epoch = self.epoch_of(variable);
        self.compute_reason(literal, index, epoch, context.assignments)
    }

    fn on_cancel(&mut self, context: PropagationContext, _unassigned: &[Literal]) {
        // All state is derivable from the trail: the next propagation cycle
        // re-finds sources. The preserved invariant is that a set source
        // pointer is never a falsified literal.
        self.next_to_propagate = self
            .next_to_propagate
            .min(context.assignments.num_trail_entries());
    }
}
