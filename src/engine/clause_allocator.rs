use std::ops::Index;
use std::ops::IndexMut;

use super::clause::Clause;
use crate::basic_types::ClauseReference;
use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::torrone_assert_simple;

/// Owns every clause of the solver; all clause allocation goes through here.
/// Unit clauses are the exception: they live directly on the trail as
/// root-level assignments.
#[derive(Clone, Debug, Default)]
pub(crate) struct ClauseAllocator {
    clauses: KeyedVec<ClauseReference, Clause>,
}

impl ClauseAllocator {
    pub(crate) fn create_clause(
        &mut self,
        literals: Vec<Literal>,
        is_learned: bool,
    ) -> ClauseReference {
        torrone_assert_simple!(literals.len() >= 2);
        self.clauses.push(Clause::new(literals, is_learned))
    }

    pub(crate) fn num_clauses(&self) -> usize {
        self.clauses.len()
    }
}

impl Index<ClauseReference> for ClauseAllocator {
    type Output = Clause;

    fn index(&self, reference: ClauseReference) -> &Clause {
        &self.clauses[reference]
    }
}

impl IndexMut<ClauseReference> for ClauseAllocator {
    fn index_mut(&mut self, reference: ClauseReference) -> &mut Clause {
        &mut self.clauses[reference]
    }
}
