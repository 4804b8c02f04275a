use crate::basic_types::KeyedVec;
use crate::basic_types::Literal;
use crate::basic_types::PropositionalVariable;

/// Remembers the last assigned polarity of every variable; decisions reuse
/// it. Fresh variables start negative.
#[derive(Clone, Debug, Default)]
pub(crate) struct PhaseSaving {
    saved: KeyedVec<PropositionalVariable, bool>,
}

impl PhaseSaving {
    pub(crate) fn grow(&mut self, _variable: PropositionalVariable) {
        let _ = self.saved.push(false);
    }

    pub(crate) fn save(&mut self, literal: Literal) {
        self.saved[literal.get_propositional_variable()] = literal.is_positive();
    }

    pub(crate) fn select(&self, variable: PropositionalVariable) -> Literal {
        Literal::new(variable, self.saved[variable])
    }
}
