use std::{collections::VecDeque, marker::PhantomData};

/// Generational handle into an [`IndexingContainer`].
#[derive(Debug)]
pub struct Handle<T> {
    index: usize,
    generation: usize,
    phantom_data: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: usize, generation: usize) -> Self {
        Self {
            index,
            generation,
            phantom_data: PhantomData,
        }
    }

    /// Returns the index of the handle.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the generation of the handle.
    pub fn generation(&self) -> usize {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

/// Slot storage that hands out [`Handle`]s. A removed slot is reused, and handles
/// to the removed value become stale instead of aliasing the new value.
pub struct IndexingContainer<T> {
    data: Vec<Option<T>>,
    generations: Vec<usize>,
    free_list: VecDeque<usize>,
}

impl<T> Default for IndexingContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndexingContainer<T> {
    /// Creates a new empty container.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
        }
    }

    /// Inserts a new element into the container.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        if let Some(free_index) = self.free_list.pop_front() {
            self.data[free_index] = Some(value);
            Handle::new(free_index, self.generations[free_index])
        } else {
            let index = self.data.len();
            self.data.push(Some(value));
            self.generations.push(0);
            Handle::new(index, 0)
        }
    }

    /// Removes the element at the given handle and returns it.
    pub fn remove(&mut self, handle: &Handle<T>) -> Option<T> {
        if !self.is_current(handle) {
            return None;
        }
        let value = self.data[handle.index()].take()?;
        self.generations[handle.index()] += 1;
        self.free_list.push_back(handle.index());
        Some(value)
    }

    /// Returns a reference to the element at the given handle.
    pub fn get(&self, handle: &Handle<T>) -> Option<&T> {
        if self.is_current(handle) {
            self.data[handle.index()].as_ref()
        } else {
            None
        }
    }

    /// Returns a mutable reference to the element at the given handle.
    pub fn get_mut(&mut self, handle: &Handle<T>) -> Option<&mut T> {
        if self.is_current(handle) {
            self.data[handle.index()].as_mut()
        } else {
            None
        }
    }

    /// Iterates over all occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.data
            .iter()
            .zip(&self.generations)
            .enumerate()
            .filter_map(|(index, (value, generation))| value.as_ref().map(|value| (Handle::new(index, *generation), value)))
    }

    /// Iterates mutably over all occupied slots.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.data
            .iter_mut()
            .zip(&self.generations)
            .enumerate()
            .filter_map(|(index, (value, generation))| value.as_mut().map(|value| (Handle::new(index, *generation), value)))
    }

    /// Returns the number of elements in the container.
    pub fn len(&self) -> usize {
        self.data.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of slots that can be reused without growing.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    fn is_current(&self, handle: &Handle<T>) -> bool {
        self.generations.get(handle.index()) == Some(&handle.generation())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn test_insert() {
        let mut container = IndexingContainer::<usize>::new();
        assert_eq!(container.len(), 0);
        assert!(container.is_empty());

        let handle = container.insert(0);
        assert_eq!(handle.index(), 0);
        assert_eq!(handle.generation(), 0);
        assert_eq!(container.len(), 1);
        assert_eq!(container.free_count(), 0);
    }

    #[test]
    fn test_remove() {
        let mut container = IndexingContainer::<usize>::new();
        let handle = container.insert(7);

        assert_eq!(container.remove(&handle), Some(7));
        assert_eq!(container.len(), 0);
        assert_eq!(container.free_count(), 1);

        assert_eq!(container.remove(&handle), None);
        assert_eq!(container.len(), 0);
        assert_eq!(container.free_count(), 1);
    }

    #[test]
    fn test_stale_handle_after_reinsert() {
        let mut container = IndexingContainer::<usize>::new();

        let handle1 = container.insert(7);
        container.remove(&handle1).unwrap();

        let handle2 = container.insert(8);
        assert_eq!(handle2.index(), handle1.index());
        assert_eq!(handle2.generation(), 1);
        assert_eq!(container.get(&handle1), None);
        assert_eq!(container.get(&handle2), Some(&8));
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut container = IndexingContainer::<usize>::new();
        let a = container.insert(1);
        let _b = container.insert(2);
        let _c = container.insert(3);
        container.remove(&a);

        for (_, value) in container.iter_mut() {
            *value *= 10;
        }
        let values = container.iter().map(|(_, value)| *value).collect::<Vec<_>>();
        assert_eq!(values, vec![20, 30]);
    }

    #[test]
    fn test_drop() {
        struct Test(Arc<AtomicUsize>);
        impl Drop for Test {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = Arc::new(AtomicUsize::new(0));

        let mut container = IndexingContainer::<Test>::new();
        container.insert(Test(counter.clone()));
        container.insert(Test(counter.clone()));
        container.insert(Test(counter.clone()));
        drop(container);

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
