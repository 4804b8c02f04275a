/// Three-valued assignment state of a variable or literal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TruthValue {
    True,
    False,
    #[default]
    Undef,
}

impl TruthValue {
    pub fn is_true(self) -> bool {
        self == TruthValue::True
    }

    pub fn is_false(self) -> bool {
        self == TruthValue::False
    }

    pub fn is_undef(self) -> bool {
        self == TruthValue::Undef
    }

    /// The value of the negated literal: `True` and `False` swap, `Undef`
    /// stays.
    pub fn negate(self) -> TruthValue {
        match self {
            TruthValue::True => TruthValue::False,
            TruthValue::False => TruthValue::True,
            TruthValue::Undef => TruthValue::Undef,
        }
    }

    pub fn from_bool(value: bool) -> TruthValue {
        if value {
            TruthValue::True
        } else {
            TruthValue::False
        }
    }
}
