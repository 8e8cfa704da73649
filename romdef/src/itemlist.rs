use crate::RomObjectName;
use fnv::FnvBuildHasher;
use std::{collections::HashMap, ops::Index};

/// A list of named definition items
///
/// The `ItemList` keeps its items in document order and additionally maintains an index from
/// each name to the position of the item, so that lookups by name are fast.
/// Names are unique: adding an item with a name that is already present replaces the old item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemList<T: RomObjectName> {
    items: Vec<T>,
    map: HashMap<String, usize, FnvBuildHasher>,
}

impl<T: RomObjectName> ItemList<T> {
    /// create a new, empty `ItemList`
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            map: HashMap::default(),
        }
    }

    /// add an item, or replace the existing item of the same name
    ///
    /// A replaced item keeps its position in the list. The previous item is returned.
    pub fn insert_or_replace(&mut self, value: T) -> Option<T> {
        if let Some(&index) = self.map.get(value.get_name()) {
            Some(std::mem::replace(&mut self.items[index], value))
        } else {
            self.map
                .insert(value.get_name().to_string(), self.items.len());
            self.items.push(value);
            None
        }
    }

    /// get an item by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        let index = self.map.get(name)?;
        Some(&self.items[*index])
    }

    /// get a mutable reference to an item by name
    ///
    /// The name of the item must not be changed through this reference.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        let index = self.map.get(name)?;
        Some(&mut self.items[*index])
    }

    /// Checks if the `ItemList` contains an item with the given name
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// remove an item by name, keeping the order of the remaining items
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let index = self.map.remove(name)?;
        let item = self.items.remove(index);
        // every item after the removed one moved down by one position
        for position in self.map.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        Some(item)
    }

    /// Returns an iterator over references to the items
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Returns an iterator over mutable references to the items
    ///
    /// The names of the items must not be changed through these references.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Returns the number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the `ItemList` is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: RomObjectName> Default for ItemList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RomObjectName> Index<usize> for ItemList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<'a, T: RomObjectName> IntoIterator for &'a ItemList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: RomObjectName> IntoIterator for ItemList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<T: RomObjectName> FromIterator<T> for ItemList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = ItemList::new();
        for item in iter {
            list.insert_or_replace(item);
        }
        list
    }
}
