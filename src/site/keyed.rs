//! Key-indexed list kept in key order.

use std::sync::Arc;

pub trait Keyed {
    fn key(&self) -> &str;
}

impl<T: Keyed + ?Sized> Keyed for Arc<T> {
    fn key(&self) -> &str {
        (**self).key()
    }
}

/// A list sorted by `Keyed::key`; inserting an existing key replaces the
/// entry in place.
#[derive(Debug, Clone)]
pub struct KeyedList<T> {
    items: Vec<T>,
}

impl<T> Default for KeyedList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> KeyedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item`, returning the entry it replaced.
    pub fn insert(&mut self, item: T) -> Option<T> {
        match self.items.binary_search_by(|probe| probe.key().cmp(item.key())) {
            Ok(i) => Some(std::mem::replace(&mut self.items[i], item)),
            Err(i) => {
                self.items.insert(i, item);
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.items
            .binary_search_by(|probe| probe.key().cmp(key))
            .ok()
            .map(|i| &self.items[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a KeyedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Entry(&'static str, u32);

    impl Keyed for Entry {
        fn key(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_sorted_insert() {
        let mut list = KeyedList::new();
        for key in ["b.html", "a.html", "c/d.html", "a/b.html"] {
            list.insert(Entry(key, 0));
        }
        let keys: Vec<_> = list.iter().map(|e| e.0).collect();
        assert_eq!(keys, vec!["a.html", "a/b.html", "b.html", "c/d.html"]);
    }

    #[test]
    fn test_replace_by_key() {
        let mut list = KeyedList::new();
        list.insert(Entry("a", 1));
        list.insert(Entry("b", 1));
        assert_eq!(list.insert(Entry("a", 2)), Some(Entry("a", 1)));
        assert_eq!(list.len(), 2);
        assert_eq!(list.get("a"), Some(&Entry("a", 2)));
        assert!(list.get("z").is_none());
    }

    #[test]
    fn test_arc_entries() {
        let mut list: KeyedList<Arc<Entry>> = KeyedList::new();
        list.insert(Arc::new(Entry("x", 1)));
        assert_eq!(list.get("x").map(|e| e.1), Some(1));
    }
}
