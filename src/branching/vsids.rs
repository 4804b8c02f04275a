use crate::basic_types::KeyedVec;
use crate::basic_types::PropositionalVariable;
use crate::engine::Assignments;
use crate::torrone_assert_moderate;

const MAX_ACTIVITY: f64 = 1e100;
const DECAY_FACTOR: f64 = 0.95;

/// Variable State Independent Decaying Sum. Activities are bumped for
/// variables seen during conflict analysis and decayed once per conflict;
/// the next decision variable is the unassigned variable of highest activity,
/// maintained in an indexed binary max-heap.
#[derive(Clone, Debug)]
pub(crate) struct Vsids {
    activities: KeyedVec<PropositionalVariable, f64>,
    heap: Vec<PropositionalVariable>,
    /// Position of each variable in `heap`; `usize::MAX` when absent.
    positions: KeyedVec<PropositionalVariable, usize>,
    increment: f64,
}

const NOT_IN_HEAP: usize = usize::MAX;

impl Default for Vsids {
    fn default() -> Self {
        Vsids {
            activities: KeyedVec::default(),
            heap: Vec::default(),
            positions: KeyedVec::default(),
            increment: 1.0,
        }
    }
}

impl Vsids {
    pub(crate) fn grow(&mut self, variable: PropositionalVariable) {
        let _ = self.activities.push(0.0);
        let _ = self.positions.push(NOT_IN_HEAP);
        self.push(variable);
    }

    pub(crate) fn bump_activity(&mut self, variable: PropositionalVariable) {
        self.activities[variable] += self.increment;

        if self.activities[variable] > MAX_ACTIVITY {
            for value in 0..self.activities.len() {
                let key = PropositionalVariable::new(value as u32);
                self.activities[key] /= MAX_ACTIVITY;
            }
            self.increment /= MAX_ACTIVITY;
        }

        if self.positions[variable] != NOT_IN_HEAP {
            self.sift_up(self.positions[variable]);
        }
    }

    pub(crate) fn decay_activities(&mut self) {
        self.increment /= DECAY_FACTOR;
    }

    pub(crate) fn push(&mut self, variable: PropositionalVariable) {
        if self.positions[variable] != NOT_IN_HEAP {
            return;
        }
        self.heap.push(variable);
        self.positions[variable] = self.heap.len() - 1;
        self.sift_up(self.heap.len() - 1);
    }

    /// Pop variables until an unassigned one surfaces.
    pub(crate) fn pop_next_unassigned(
        &mut self,
        assignments: &Assignments,
    ) -> Option<PropositionalVariable> {
        while let Some(variable) = self.pop_max() {
            if assignments.value_of_variable(variable).is_undef() {
                return Some(variable);
            }
        }
        None
    }

    fn pop_max(&mut self) -> Option<PropositionalVariable> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap[0];
        let last = self.heap.pop().unwrap();
        self.positions[top] = NOT_IN_HEAP;
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.positions[last] = 0;
            self.sift_down(0);
        }
        Some(top)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.activities[self.heap[index]] <= self.activities[self.heap[parent]] {
                break;
            }
            self.swap_entries(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            let mut largest = index;
            if left < self.heap.len()
                && self.activities[self.heap[left]] > self.activities[self.heap[largest]]
            {
                largest = left;
            }
            if right < self.heap.len()
                && self.activities[self.heap[right]] > self.activities[self.heap[largest]]
            {
                largest = right;
            }
            if largest == index {
                break;
            }
            self.swap_entries(index, largest);
            index = largest;
        }
    }

    fn swap_entries(&mut self, i: usize, j: usize) {
        torrone_assert_moderate!(i < self.heap.len() && j < self.heap.len());
        self.heap.swap(i, j);
        self.positions[self.heap[i]] = i;
        self.positions[self.heap[j]] = j;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_most_active_unassigned_variable_is_selected() {
        let mut assignments = Assignments::default();
        let mut vsids = Vsids::default();
        let variables: Vec<_> = (0..4)
            .map(|_| {
                let v = assignments.grow();
                vsids.grow(v);
                v
            })
            .collect();

        vsids.bump_activity(variables[2]);
        vsids.bump_activity(variables[2]);
        vsids.bump_activity(variables[1]);

        assert_eq!(vsids.pop_next_unassigned(&assignments), Some(variables[2]));
    }

    #[test]
    fn assigned_variables_are_skipped() {
        let mut assignments = Assignments::default();
        let mut vsids = Vsids::default();
        let a = assignments.grow();
        let b = assignments.grow();
        vsids.grow(a);
        vsids.grow(b);

        vsids.bump_activity(a);
        assignments.enqueue(
            crate::basic_types::Literal::new(a, true),
            crate::basic_types::ConstraintReference::None,
        );

        assert_eq!(vsids.pop_next_unassigned(&assignments), Some(b));
        assert_eq!(vsids.pop_next_unassigned(&assignments), None);
    }
}
