/// Entries that carry a lookup key
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Append-only collection. Duplicate keys are kept.
#[derive(Debug)]
pub struct FlatRegistry<T> {
    entries: Vec<T>,
}

impl<T> FlatRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.entries.iter_mut()
    }

    #[must_use]
    pub fn all(&self) -> &[T] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Keyed> FlatRegistry<T> {
    /// First entry registered under `key`
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries.iter_mut().find(|entry| entry.key() == key)
    }

    /// Every entry registered under `key`, in registration order
    pub fn find_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a T> + 'a {
        self.entries.iter().filter(move |entry| entry.key() == key)
    }
}

impl<T> Default for FlatRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a FlatRegistry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Collection iterated in ascending priority. Entries with equal priority keep
/// their registration order.
#[derive(Debug)]
pub struct PriorityRegistry<T> {
    entries: Vec<(u32, T)>,
}

impl<T> PriorityRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, priority: u32, entry: T) {
        // Insert after every entry of the same priority
        let index = self.entries.partition_point(|(existing, _)| *existing <= priority);
        self.entries.insert(index, (priority, entry));
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.entries.iter().map(|(priority, entry)| (*priority, entry))
    }

    /// Entries without their priorities, in iteration order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, entry)| entry)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for PriorityRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Named(&'static str, u32);

    impl Keyed for Named {
        fn key(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_flat_registry_keeps_duplicates() {
        let mut registry = FlatRegistry::new();
        registry.add(Named("a", 1));
        registry.add(Named("b", 2));
        registry.add(Named("a", 3));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.find("a").map(|n| n.1), Some(1));
        assert_eq!(registry.find_all("a").map(|n| n.1).collect::<Vec<_>>(), vec![1, 3]);
        assert!(registry.find("c").is_none());
    }

    #[test]
    fn test_priority_registry_orders_entries() {
        let mut registry = PriorityRegistry::new();
        registry.add(2000, "edit");
        registry.add(1000, "file");
        registry.add(2000, "edit-2");
        registry.add(0, "first");

        let order: Vec<_> = registry.values().copied().collect();
        assert_eq!(order, vec!["first", "file", "edit", "edit-2"]);
    }

    proptest! {
        #[test]
        fn prop_priority_iteration_is_sorted_and_stable(priorities in proptest::collection::vec(0u32..8, 0..64)) {
            let mut registry = PriorityRegistry::new();
            for (index, priority) in priorities.iter().enumerate() {
                registry.add(*priority, index);
            }

            let items: Vec<(u32, usize)> = registry.iter().map(|(p, i)| (p, *i)).collect();
            prop_assert_eq!(items.len(), priorities.len());
            for pair in items.windows(2) {
                prop_assert!(pair[0].0 <= pair[1].0);
                if pair[0].0 == pair[1].0 {
                    prop_assert!(pair[0].1 < pair[1].1);
                }
            }
        }
    }
}
