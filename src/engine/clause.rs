use crate::basic_types::Literal;

/// A clause stored in the [`ClauseAllocator`](super::ClauseAllocator). The
/// first two literals are the watched ones; unit propagation keeps the
/// invariant that a watched literal is only false when the other watched
/// literal is true or the clause is conflicting.
#[derive(Clone, Debug)]
pub(crate) struct Clause {
    literals: Vec<Literal>,
    is_learned: bool,
}

impl Clause {
    pub(crate) fn new(literals: Vec<Literal>, is_learned: bool) -> Clause {
        Clause {
            literals,
            is_learned,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.literals.len()
    }

    pub(crate) fn get_literal_slice(&self) -> &[Literal] {
        &self.literals
    }

    pub(crate) fn literal(&self, index: usize) -> Literal {
        self.literals[index]
    }

    pub(crate) fn swap(&mut self, i: usize, j: usize) {
        self.literals.swap(i, j);
    }

    #[allow(unused)]
    pub(crate) fn is_learned(&self) -> bool {
        self.is_learned
    }
}
