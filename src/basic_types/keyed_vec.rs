use std::marker::PhantomData;
use std::ops::Index;
use std::ops::IndexMut;

/// Types that can be used as keys into a [`KeyedVec`].
pub(crate) trait StorageKey {
    fn index(&self) -> usize;

    fn create_from_index(index: usize) -> Self;
}

/// A dense vector indexed by a typed key instead of a bare `usize`. Used for
/// all per-variable and per-literal arrays so that a variable cannot
/// accidentally index literal-keyed storage and vice versa.
#[derive(Clone, Debug)]
pub(crate) struct KeyedVec<Key, Value> {
    key: PhantomData<Key>,
    elements: Vec<Value>,
}

impl<Key, Value> Default for KeyedVec<Key, Value> {
    fn default() -> Self {
        KeyedVec {
            key: PhantomData,
            elements: Vec::default(),
        }
    }
}

impl<Key: StorageKey, Value> KeyedVec<Key, Value> {
    pub(crate) fn len(&self) -> usize {
        self.elements.len()
    }

    pub(crate) fn push(&mut self, value: Value) -> Key {
        self.elements.push(value);
        Key::create_from_index(self.elements.len() - 1)
    }
}

impl<Key: StorageKey, Value: Clone> KeyedVec<Key, Value> {
    pub(crate) fn resize(&mut self, new_len: usize, default: Value) {
        self.elements.resize(new_len, default);
    }
}

impl<Key: StorageKey, Value> Index<Key> for KeyedVec<Key, Value> {
    type Output = Value;

    fn index(&self, key: Key) -> &Value {
        &self.elements[key.index()]
    }
}

impl<Key: StorageKey, Value> IndexMut<Key> for KeyedVec<Key, Value> {
    fn index_mut(&mut self, key: Key) -> &mut Value {
        &mut self.elements[key.index()]
    }
}
