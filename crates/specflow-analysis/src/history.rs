//! Fixed-capacity rolling history of display columns.

use std::collections::VecDeque;

/// The most recent `capacity` items, oldest first.
///
/// Used to repaint a scrolling display after a resize instead of starting
/// from blank columns. Growing the capacity never invents history; the
/// extra room fills as new items arrive.
///
/// # Example
///
/// ```
/// use specflow_analysis::HistoryCache;
///
/// let mut history = HistoryCache::new(2);
/// history.push(1);
/// history.push(2);
/// assert_eq!(history.push(3), Some(1));
/// assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct HistoryCache<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> HistoryCache<T> {
    /// Creates an empty cache holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of items retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items currently retained.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends `item`, returning the evicted oldest item when full.
    ///
    /// The returned item can be reused as the next column buffer.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    /// Changes the capacity, dropping the oldest items when shrinking.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        if self.items.len() > capacity {
            let excess = self.items.len() - capacity;
            self.items.drain(..excess);
        }
    }

    /// Item `age` steps back from the newest (0 = newest).
    pub fn get(&self, age: usize) -> Option<&T> {
        let len = self.items.len();
        if age < len {
            self.items.get(len - 1 - age)
        } else {
            None
        }
    }

    /// The newest item.
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Drops every item, keeping the capacity.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest() {
        let mut cache = HistoryCache::new(3);
        for i in 0..5 {
            cache.push(i);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(cache.latest(), Some(&4));
        assert_eq!(cache.get(2), Some(&2));
        assert_eq!(cache.get(3), None);
    }

    #[test]
    fn shrink_drops_front() {
        let mut cache = HistoryCache::new(5);
        for i in 0..5 {
            cache.push(i);
        }
        cache.resize(2);
        assert_eq!(cache.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn grow_keeps_everything() {
        let mut cache = HistoryCache::new(2);
        cache.push('a');
        cache.push('b');
        cache.resize(4);
        assert_eq!(cache.len(), 2);
        cache.push('c');
        cache.push('d');
        assert_eq!(cache.push('e'), Some('a'));
        assert_eq!(cache.iter().collect::<String>(), "bcde");
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut cache = HistoryCache::new(0);
        assert_eq!(cache.push(7), Some(7));
        assert!(cache.is_empty());
    }
}
